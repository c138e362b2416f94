// SPDX-License-Identifier: MIT OR Apache-2.0
//! Truevision TGA loader.

use crate::error::{TextureError, TextureResult};
use crate::format::TextureFormat;
use crate::loader::{finish, LoadCallback, LoadOptions, TextureLoader};
use crate::texture::{InternalTexture, TextureInfo};
use image::ImageFormat;

/// TGA images, decoded to RGBA8 with a single level
pub struct TgaLoader;

impl TgaLoader {
    fn load(&self, data: &[u8], texture: &InternalTexture) -> TextureResult<TextureInfo> {
        let img = image::load_from_memory_with_format(data, ImageFormat::Tga)
            .map_err(|e| TextureError::Decode(e.to_string()))?;
        let rgba = img.to_rgba8();
        let info = TextureInfo {
            width: rgba.width(),
            height: rgba.height(),
            mip_levels: 1,
            format: TextureFormat::Rgba8Unorm,
            compressed: false,
            cube: false,
        };
        info.validate("TGA")?;
        texture.allocate(info);
        texture.upload(0, 0, rgba.as_raw())?;
        Ok(info)
    }
}

impl TextureLoader for TgaLoader {
    fn name(&self) -> &'static str {
        "TGA"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["tga"]
    }

    fn mime_types(&self) -> &'static [&'static str] {
        &["image/x-tga", "image/x-targa"]
    }

    fn supports_cube(&self) -> bool {
        false
    }

    fn load_data(&self, data: &[u8], texture: &InternalTexture, _options: &LoadOptions, callback: LoadCallback) {
        finish(self.name(), self.load(data, texture), callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::run_loader;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(img: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Tga).unwrap();
        bytes
    }

    #[test]
    fn test_rgba_pixels() {
        let bytes = encode(DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 40]))));
        let (result, texture) = run_loader(&TgaLoader, &bytes, &LoadOptions::default(), false);
        let info = result.unwrap();
        assert_eq!((info.width, info.height, info.mip_levels), (3, 2, 1));
        assert_eq!(info.format, TextureFormat::Rgba8Unorm);
        assert_eq!(&texture.level(0, 0).unwrap()[..4], &[10, 20, 30, 40]);
    }

    #[test]
    fn test_rgb_gains_opaque_alpha() {
        let bytes = encode(DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([1, 2, 3]))));
        let (result, texture) = run_loader(&TgaLoader, &bytes, &LoadOptions::default(), false);
        assert!(result.is_ok());
        assert_eq!(texture.level(0, 0).unwrap(), vec![1, 2, 3, 255]);
    }

    #[test]
    fn test_corrupt_data_reports_decode_error() {
        let (result, texture) = run_loader(&TgaLoader, &[0xFF; 6], &LoadOptions::default(), false);
        assert!(matches!(result, Err(TextureError::Decode(_))));
        assert!(texture.info().is_none());
        assert!(!TgaLoader.supports_cube());
    }
}
