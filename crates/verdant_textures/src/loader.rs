// SPDX-License-Identifier: MIT OR Apache-2.0
//! Loader plugin contract and the ordered loader registry.

use crate::dds::DdsLoader;
use crate::error::{TextureError, TextureResult};
use crate::format::TextureFormat;
use crate::ktx::KtxLoader;
use crate::texture::{InternalTexture, TextureInfo};
use crate::tga::TgaLoader;
use futures::channel::oneshot;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Terminal callback of a load, invoked exactly once
pub type LoadCallback = Box<dyn FnOnce(TextureResult<TextureInfo>) + Send>;

/// Options applied while allocating a texture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Allocate sRGB formats as their linear counterpart
    pub srgb_to_linear: bool,
    /// Upload at most this many mip levels
    pub max_mip_levels: Option<u32>,
}

impl LoadOptions {
    /// Format and mip count to allocate for a parsed container
    pub fn resolve(&self, format: TextureFormat, mip_levels: u32) -> (TextureFormat, u32) {
        let format = if self.srgb_to_linear { format.to_linear() } else { format };
        let mip_levels = match self.max_mip_levels {
            Some(max) => mip_levels.min(max.max(1)),
            None => mip_levels,
        };
        (format, mip_levels.max(1))
    }
}

/// A container format plugin.
///
/// Loaders parse a header, [`allocate`](InternalTexture::allocate) the
/// target and upload every level. The outcome always reaches `callback`;
/// loaders never panic on malformed input.
pub trait TextureLoader: Send + Sync {
    /// Display name
    fn name(&self) -> &'static str;

    /// Lower-case file extensions without the dot
    fn extensions(&self) -> &'static [&'static str];

    /// MIME types recognised in addition to the extensions
    fn mime_types(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether [`load_cube_data`](Self::load_cube_data) is supported
    fn supports_cube(&self) -> bool;

    /// Whether this loader accepts a file
    fn can_load(&self, extension: &str, mime_type: Option<&str>) -> bool {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.extensions().contains(&extension.as_str())
            || mime_type.is_some_and(|mime| self.mime_types().iter().any(|m| m.eq_ignore_ascii_case(mime)))
    }

    /// Load a 2D texture
    fn load_data(&self, data: &[u8], texture: &InternalTexture, options: &LoadOptions, callback: LoadCallback);

    /// Load a six-face cube texture
    fn load_cube_data(&self, data: &[u8], texture: &InternalTexture, options: &LoadOptions, callback: LoadCallback) {
        let _ = (data, texture, options);
        finish(
            self.name(),
            Err(TextureError::UnsupportedCube(format!("{} has no cube support", self.name()))),
            callback,
        );
    }
}

/// Log a failure and deliver the outcome
pub(crate) fn finish(loader: &str, result: TextureResult<TextureInfo>, callback: LoadCallback) {
    match &result {
        Ok(info) => tracing::debug!(
            "{} loaded {}x{} {:?} with {} mips",
            loader,
            info.width,
            info.height,
            info.format,
            info.mip_levels
        ),
        Err(e) => tracing::warn!("{} load failed: {}", loader, e),
    }
    callback(result);
}

/// Lower-case extension of a file name or URL
pub fn extension_of(name: &str) -> String {
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    file.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Ordered list of loader plugins; earlier registrations win ties
#[derive(Default)]
pub struct TextureLoaderRegistry {
    loaders: RwLock<Vec<Arc<dyn TextureLoader>>>,
}

static GLOBAL: OnceLock<TextureLoaderRegistry> = OnceLock::new();

impl TextureLoaderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the DDS, KTX and TGA loaders in that order
    pub fn with_default_loaders() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(DdsLoader));
        registry.register(Arc::new(KtxLoader));
        registry.register(Arc::new(TgaLoader));
        registry
    }

    /// Process-wide registry, created with the default loaders on first use
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::with_default_loaders)
    }

    /// Append a loader
    pub fn register(&self, loader: Arc<dyn TextureLoader>) {
        tracing::debug!("Registered texture loader: {}", loader.name());
        self.loaders.write().push(loader);
    }

    /// First loader accepting the extension or MIME type
    pub fn find(&self, extension: &str, mime_type: Option<&str>) -> Option<Arc<dyn TextureLoader>> {
        self.loaders
            .read()
            .iter()
            .find(|loader| loader.can_load(extension, mime_type))
            .cloned()
    }

    /// Names of the registered loaders in precedence order
    pub fn names(&self) -> Vec<&'static str> {
        self.loaders.read().iter().map(|loader| loader.name()).collect()
    }

    /// Route `data` to the matching loader; `callback` always fires
    pub fn dispatch(
        &self,
        url: &str,
        mime_type: Option<&str>,
        data: &[u8],
        texture: &InternalTexture,
        options: &LoadOptions,
        cube: bool,
        callback: LoadCallback,
    ) {
        let Some(loader) = self.find(&extension_of(url), mime_type) else {
            finish("registry", Err(TextureError::NoLoader(url.to_string())), callback);
            return;
        };
        if cube {
            loader.load_cube_data(data, texture, options, callback);
        } else {
            loader.load_data(data, texture, options, callback);
        }
    }

    /// [`dispatch`](Self::dispatch) and await the terminal callback
    pub async fn load(
        &self,
        url: &str,
        mime_type: Option<&str>,
        data: &[u8],
        texture: &InternalTexture,
        options: &LoadOptions,
        cube: bool,
    ) -> TextureResult<TextureInfo> {
        let (sender, receiver) = oneshot::channel();
        self.dispatch(
            url,
            mime_type,
            data,
            texture,
            options,
            cube,
            Box::new(move |result| {
                let _ = sender.send(result);
            }),
        );
        receiver
            .await
            .map_err(|_| TextureError::Io(format!("loader for '{url}' dropped its callback")))?
    }
}

/// Run a loader synchronously, checking the callback fires exactly once
#[cfg(test)]
pub(crate) fn run_loader(
    loader: &dyn TextureLoader,
    data: &[u8],
    options: &LoadOptions,
    cube: bool,
) -> (TextureResult<TextureInfo>, InternalTexture) {
    let texture = InternalTexture::new();
    let (sender, receiver) = std::sync::mpsc::channel();
    let callback: LoadCallback = Box::new(move |result| sender.send(result).unwrap());
    if cube {
        loader.load_cube_data(data, &texture, options, callback);
    } else {
        loader.load_data(data, &texture, options, callback);
    }
    let result = receiver.recv().unwrap();
    assert!(receiver.try_recv().is_err());
    (result, texture)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("textures/Albedo.DDS"), "dds");
        assert_eq!(extension_of("https://cdn/x/env.ktx?v=2"), "ktx");
        assert_eq!(extension_of("no_extension"), "");
    }

    #[test]
    fn test_resolve_options() {
        let options = LoadOptions {
            srgb_to_linear: true,
            max_mip_levels: Some(2),
        };
        assert_eq!(
            options.resolve(TextureFormat::Bc1RgbaUnormSrgb, 8),
            (TextureFormat::Bc1RgbaUnorm, 2)
        );
        assert_eq!(
            LoadOptions::default().resolve(TextureFormat::Rgba8UnormSrgb, 0),
            (TextureFormat::Rgba8UnormSrgb, 1)
        );
    }

    #[test]
    fn test_registry_precedence() {
        let registry = TextureLoaderRegistry::with_default_loaders();
        assert_eq!(registry.names(), ["DDS", "KTX", "TGA"]);
        assert_eq!(registry.find(".DDS", None).unwrap().name(), "DDS");
        assert_eq!(registry.find("bin", Some("image/ktx")).unwrap().name(), "KTX");
        assert!(registry.find("png", None).is_none());

        // A later loader claiming the same extension never wins.
        registry.register(Arc::new(TgaLoader));
        assert_eq!(registry.find("tga", None).unwrap().name(), "TGA");
        assert_eq!(registry.names().len(), 4);
    }

    #[test]
    fn test_dispatch_without_loader_fails_through_callback() {
        let registry = TextureLoaderRegistry::new();
        let texture = InternalTexture::new();
        let (sender, receiver) = std::sync::mpsc::channel();
        registry.dispatch(
            "a.png",
            None,
            &[],
            &texture,
            &LoadOptions::default(),
            false,
            Box::new(move |result| sender.send(result).unwrap()),
        );
        assert_eq!(receiver.recv().unwrap(), Err(TextureError::NoLoader("a.png".into())));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_tga_has_no_cube_support() {
        let texture = InternalTexture::new();
        let result = futures::executor::block_on(TextureLoaderRegistry::global().load(
            "sky.tga",
            None,
            &[0; 32],
            &texture,
            &LoadOptions::default(),
            true,
        ));
        assert!(matches!(result, Err(TextureError::UnsupportedCube(_))));
        assert!(texture.info().is_none());
    }
}
