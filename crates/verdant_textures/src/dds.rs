// SPDX-License-Identifier: MIT OR Apache-2.0
//! DirectDraw Surface loader.

use crate::error::{TextureError, TextureResult};
use crate::format::TextureFormat;
use crate::loader::{finish, LoadCallback, LoadOptions, TextureLoader};
use crate::texture::{level_slice, InternalTexture, TextureInfo};
use ddsfile::{Caps2, Dds, MiscFlag};

const CONTAINER: &str = "DDS";

/// DDS files with DX10 (DXGI) or legacy FourCC headers, 2D or cube
pub struct DdsLoader;

impl DdsLoader {
    fn load(&self, data: &[u8], texture: &InternalTexture, options: &LoadOptions, cube: bool) -> TextureResult<TextureInfo> {
        let dds = Dds::read(data).map_err(|e| TextureError::malformed(CONTAINER, e.to_string()))?;

        let format = match dds.get_dxgi_format() {
            Some(dxgi) => TextureFormat::from_dxgi(dxgi).ok_or_else(|| TextureError::unsupported(CONTAINER, dxgi))?,
            None => {
                let d3d = dds
                    .get_d3d_format()
                    .ok_or_else(|| TextureError::unsupported(CONTAINER, &dds.header.spf))?;
                TextureFormat::from_d3d(&d3d).ok_or_else(|| TextureError::unsupported(CONTAINER, &d3d))?
            }
        };
        if dds.get_depth() > 1 {
            return Err(TextureError::unsupported(CONTAINER, "volume texture"));
        }

        let is_cube = dds.header.caps2.contains(Caps2::CUBEMAP)
            || dds
                .header10
                .as_ref()
                .is_some_and(|h| h.misc_flag.contains(MiscFlag::TEXTURECUBE));
        if cube {
            if !is_cube {
                return Err(TextureError::UnsupportedCube("DDS file is not a cube map".into()));
            }
            // DX10 headers count cubes, some writers count faces.
            if let Some(h10) = &dds.header10 {
                if !matches!(h10.array_size, 0 | 1 | 6) {
                    return Err(TextureError::UnsupportedCube(format!(
                        "cube arrays are not supported ({} layers)",
                        h10.array_size
                    )));
                }
            }
        }

        let stored_levels = dds.get_num_mipmap_levels().max(1);
        if stored_levels > TextureInfo::max_mip_levels(dds.get_width(), dds.get_height()) {
            return Err(TextureError::malformed(CONTAINER, format!("{stored_levels} mip levels")));
        }
        let (allocated_format, mip_levels) = options.resolve(format, stored_levels);
        let info = TextureInfo {
            width: dds.get_width(),
            height: dds.get_height(),
            mip_levels,
            format: allocated_format,
            compressed: format.is_compressed(),
            cube,
        };
        info.validate(CONTAINER)?;
        texture.allocate(info);

        // Faces are stored one after another, each with its full mip chain.
        let mut offset = 0;
        for face in 0..info.faces() {
            for level in 0..stored_levels {
                let (width, height) = info.level_extent(level);
                let size = format
                    .level_size(width, height)
                    .ok_or_else(|| TextureError::malformed(CONTAINER, "level size overflows"))?;
                let bytes = level_slice(&dds.data, offset, size, face, level)?;
                if level < mip_levels {
                    texture.upload(face, level, bytes)?;
                }
                offset += size;
            }
        }
        Ok(info)
    }
}

impl TextureLoader for DdsLoader {
    fn name(&self) -> &'static str {
        "DDS"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["dds"]
    }

    fn mime_types(&self) -> &'static [&'static str] {
        &["image/vnd-ms.dds", "image/x-dds"]
    }

    fn supports_cube(&self) -> bool {
        true
    }

    fn load_data(&self, data: &[u8], texture: &InternalTexture, options: &LoadOptions, callback: LoadCallback) {
        finish(self.name(), self.load(data, texture, options, false), callback);
    }

    fn load_cube_data(&self, data: &[u8], texture: &InternalTexture, options: &LoadOptions, callback: LoadCallback) {
        finish(self.name(), self.load(data, texture, options, true), callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::run_loader;
    use ddsfile::{AlphaMode, D3D10ResourceDimension, D3DFormat, DxgiFormat, NewD3dParams, NewDxgiParams};

    fn dxgi_file(format: DxgiFormat, width: u32, height: u32, mips: u32, cube: bool, data_len: usize) -> Vec<u8> {
        let mut dds = Dds::new_dxgi(NewDxgiParams {
            height,
            width,
            depth: None,
            format,
            mipmap_levels: Some(mips),
            array_layers: Some(1),
            caps2: cube.then_some(Caps2::CUBEMAP),
            is_cubemap: cube,
            resource_dimension: D3D10ResourceDimension::Texture2D,
            alpha_mode: AlphaMode::Unknown,
        })
        .unwrap();
        dds.data = (0..data_len).map(|i| i as u8).collect();
        let mut bytes = Vec::new();
        dds.write(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_rgba_mip_chain() {
        // 4x4 + 2x2 + 1x1 texels of four bytes
        let bytes = dxgi_file(DxgiFormat::R8G8B8A8_UNorm_sRGB, 4, 4, 3, false, 84);
        let (result, texture) = run_loader(&DdsLoader, &bytes, &LoadOptions::default(), false);
        let info = result.unwrap();
        assert_eq!((info.width, info.height, info.mip_levels), (4, 4, 3));
        assert_eq!(info.format, TextureFormat::Rgba8UnormSrgb);
        assert!(!info.compressed && !info.cube);
        assert!(texture.is_complete());
        assert_eq!(texture.level(0, 2).unwrap(), vec![80, 81, 82, 83]);
    }

    #[test]
    fn test_options_convert_and_limit_mips() {
        let bytes = dxgi_file(DxgiFormat::BC1_UNorm_sRGB, 8, 8, 4, false, 32 + 8 + 8 + 8);
        let options = LoadOptions {
            srgb_to_linear: true,
            max_mip_levels: Some(2),
        };
        let (result, texture) = run_loader(&DdsLoader, &bytes, &options, false);
        let info = result.unwrap();
        assert_eq!(info.format, TextureFormat::Bc1RgbaUnorm);
        assert_eq!(info.mip_levels, 2);
        assert!(info.compressed);
        assert_eq!(texture.byte_size(), 40);
    }

    #[test]
    fn test_cube_faces() {
        let bytes = dxgi_file(DxgiFormat::R8G8B8A8_UNorm, 2, 2, 1, true, 6 * 16);
        let (result, texture) = run_loader(&DdsLoader, &bytes, &LoadOptions::default(), true);
        assert!(result.unwrap().cube);
        assert_eq!(texture.level(5, 0).unwrap()[0], 80);
    }

    #[test]
    fn test_legacy_dxt5() {
        let mut dds = Dds::new_d3d(NewD3dParams {
            height: 4,
            width: 4,
            depth: None,
            format: D3DFormat::DXT5,
            mipmap_levels: Some(1),
            caps2: None,
        })
        .unwrap();
        dds.data = vec![0xAB; 16];
        let mut bytes = Vec::new();
        dds.write(&mut bytes).unwrap();

        let (result, _) = run_loader(&DdsLoader, &bytes, &LoadOptions::default(), false);
        assert_eq!(result.unwrap().format, TextureFormat::Bc3RgbaUnorm);
    }

    #[test]
    fn test_hostile_header_is_malformed() {
        let mut dds = Dds::read(dxgi_file(DxgiFormat::R8G8B8A8_UNorm, 4, 4, 1, false, 64).as_slice()).unwrap();
        dds.header.width = u32::MAX;
        dds.header.height = u32::MAX;
        let mut huge = Vec::new();
        dds.write(&mut huge).unwrap();

        let mut dds = Dds::read(dxgi_file(DxgiFormat::R8G8B8A8_UNorm, 4, 4, 1, false, 64).as_slice()).unwrap();
        dds.header.mip_map_count = Some(40);
        let mut deep = Vec::new();
        dds.write(&mut deep).unwrap();

        for bytes in [huge, deep] {
            let (result, texture) = run_loader(&DdsLoader, &bytes, &LoadOptions::default(), false);
            assert!(matches!(result, Err(TextureError::Malformed { .. })), "{result:?}");
            assert!(texture.info().is_none());
        }
    }

    #[test]
    fn test_2d_file_as_cube_is_rejected() {
        let bytes = dxgi_file(DxgiFormat::R8G8B8A8_UNorm, 2, 2, 1, false, 16);
        let (result, texture) = run_loader(&DdsLoader, &bytes, &LoadOptions::default(), true);
        assert!(matches!(result, Err(TextureError::UnsupportedCube(_))));
        assert!(texture.info().is_none());
    }

    #[test]
    fn test_truncated_level() {
        let bytes = dxgi_file(DxgiFormat::R8G8B8A8_UNorm, 4, 4, 2, false, 70);
        let (result, _) = run_loader(&DdsLoader, &bytes, &LoadOptions::default(), false);
        assert_eq!(
            result,
            Err(TextureError::Truncated {
                face: 0,
                level: 1,
                expected: 16,
                available: 6,
            })
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let (result, _) = run_loader(&DdsLoader, b"not a dds file at all", &LoadOptions::default(), false);
        assert!(matches!(result, Err(TextureError::Malformed { container: "DDS", .. })));
    }
}
