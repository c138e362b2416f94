// SPDX-License-Identifier: MIT OR Apache-2.0
//! Texture container loading for Verdant.
//!
//! Loader plugins parse DDS, KTX 1 and TGA containers into an
//! [`InternalTexture`], reporting the outcome through a terminal callback.
//! Loaders are looked up by extension or MIME type in a
//! [`TextureLoaderRegistry`]; a [`TextureCache`] shares loaded textures
//! between consumers.

pub mod cache;
pub mod dds;
pub mod error;
pub mod format;
pub mod ktx;
pub mod loader;
pub mod texture;
pub mod tga;

pub use cache::TextureCache;
pub use dds::DdsLoader;
pub use error::{TextureError, TextureResult};
pub use format::TextureFormat;
pub use ktx::KtxLoader;
pub use loader::{extension_of, LoadCallback, LoadOptions, TextureLoader, TextureLoaderRegistry};
pub use texture::{InternalTexture, TextureInfo};
pub use tga::TgaLoader;
