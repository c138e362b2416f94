// SPDX-License-Identifier: MIT OR Apache-2.0
//! URL keyed texture cache shared across consumers.
//!
//! Entries are keyed by URL and layout (2D or cube). The first request for
//! a key fetches and decodes it; concurrent requests for the same key await
//! that load instead of starting their own. Failed loads leave no entry and
//! the next request retries.

use crate::error::{TextureError, TextureResult};
use crate::loader::{LoadOptions, TextureLoaderRegistry};
use crate::texture::InternalTexture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

type Entry = Arc<OnceCell<Arc<InternalTexture>>>;
type Key = (String, bool);

/// Cache of loaded textures keyed by URL
pub struct TextureCache {
    registry: Arc<TextureLoaderRegistry>,
    options: LoadOptions,
    entries: Mutex<HashMap<Key, Entry>>,
}

impl TextureCache {
    /// Cache backed by the default loaders
    pub fn new(options: LoadOptions) -> Self {
        Self::with_registry(Arc::new(TextureLoaderRegistry::with_default_loaders()), options)
    }

    /// Cache backed by a custom loader registry
    pub fn with_registry(registry: Arc<TextureLoaderRegistry>, options: LoadOptions) -> Self {
        Self {
            registry,
            options,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entry(&self, key: &Key) -> Entry {
        self.entries.lock().entry(key.clone()).or_default().clone()
    }

    /// Drop `cell` if it is still the uninitialised entry for `key`
    fn forget_failed(&self, key: &Key, cell: &Entry) {
        let mut entries = self.entries.lock();
        if entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, cell) && !current.initialized())
        {
            entries.remove(key);
        }
    }

    /// Return the cached texture for `url` in the requested layout, loading
    /// it with bytes from `fetch` on first use
    pub async fn get_or_load<F, Fut>(&self, url: &str, cube: bool, fetch: F) -> TextureResult<Arc<InternalTexture>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = TextureResult<Vec<u8>>>,
    {
        let key = (url.to_string(), cube);
        let cell = self.entry(&key);
        let result = cell
            .get_or_try_init(|| async {
                let data = fetch(url.to_string()).await?;
                let texture = InternalTexture::new();
                let info = self
                    .registry
                    .load(url, None, &data, &texture, &self.options, cube)
                    .await?;
                tracing::info!("Cached texture {} ({}x{})", url, info.width, info.height);
                Ok::<_, TextureError>(Arc::new(texture))
            })
            .await
            .map(Arc::clone);
        if result.is_err() {
            self.forget_failed(&key, &cell);
        }
        result
    }

    /// [`get_or_load`](Self::get_or_load) reading the file at `path`
    pub async fn load_file(&self, path: &Path, cube: bool) -> TextureResult<Arc<InternalTexture>> {
        let url = path.to_string_lossy();
        self.get_or_load(&url, cube, |_| async move { Ok(tokio::fs::read(path).await?) })
            .await
    }

    /// Texture for `url` in the given layout if it has finished loading
    pub fn get(&self, url: &str, cube: bool) -> Option<Arc<InternalTexture>> {
        self.entries.lock().get(&(url.to_string(), cube))?.get().cloned()
    }

    /// Number of loaded or loading entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop the entries for `url` in both layouts and release their storage
    pub fn dispose(&self, url: &str) -> bool {
        let removed: Vec<Entry> = {
            let mut entries = self.entries.lock();
            [false, true]
                .into_iter()
                .filter_map(|cube| entries.remove(&(url.to_string(), cube)))
                .collect()
        };
        if removed.is_empty() {
            return false;
        }
        for texture in removed.iter().filter_map(|entry| entry.get()) {
            texture.dispose();
        }
        tracing::debug!("Disposed texture {}", url);
        true
    }

    /// Dispose every entry
    pub fn clear(&self) {
        let entries: Vec<Entry> = self.entries.lock().drain().map(|(_, entry)| entry).collect();
        for texture in entries.iter().filter_map(|entry| entry.get()) {
            texture.dispose();
        }
    }
}

impl Default for TextureCache {
    fn default() -> Self {
        Self::new(LoadOptions::default())
    }
}
