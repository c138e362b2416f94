// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pixel formats and the container format tables.

use ddsfile::{D3DFormat, DxgiFormat};
use serde::{Deserialize, Serialize};

/// GPU pixel format of an allocated texture
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    R8Unorm,
    Rg8Unorm,
    Rgb8Unorm,
    Rgb8UnormSrgb,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    R32Float,
    Rgba16Float,
    Rgba32Float,
    Bc1RgbaUnorm,
    Bc1RgbaUnormSrgb,
    Bc2RgbaUnorm,
    Bc2RgbaUnormSrgb,
    Bc3RgbaUnorm,
    Bc3RgbaUnormSrgb,
    Bc4RUnorm,
    Bc5RgUnorm,
    Bc6hRgbUfloat,
    Bc7RgbaUnorm,
    Bc7RgbaUnormSrgb,
    Etc2Rgb8Unorm,
    Etc2Rgb8UnormSrgb,
    Etc2Rgba8Unorm,
    Etc2Rgba8UnormSrgb,
}

/// sRGB format and its linear counterpart
const SRGB_TO_LINEAR: &[(TextureFormat, TextureFormat)] = &[
    (TextureFormat::Rgb8UnormSrgb, TextureFormat::Rgb8Unorm),
    (TextureFormat::Rgba8UnormSrgb, TextureFormat::Rgba8Unorm),
    (TextureFormat::Bgra8UnormSrgb, TextureFormat::Bgra8Unorm),
    (TextureFormat::Bc1RgbaUnormSrgb, TextureFormat::Bc1RgbaUnorm),
    (TextureFormat::Bc2RgbaUnormSrgb, TextureFormat::Bc2RgbaUnorm),
    (TextureFormat::Bc3RgbaUnormSrgb, TextureFormat::Bc3RgbaUnorm),
    (TextureFormat::Bc7RgbaUnormSrgb, TextureFormat::Bc7RgbaUnorm),
    (TextureFormat::Etc2Rgb8UnormSrgb, TextureFormat::Etc2Rgb8Unorm),
    (TextureFormat::Etc2Rgba8UnormSrgb, TextureFormat::Etc2Rgba8Unorm),
];

impl TextureFormat {
    /// Linear counterpart of an sRGB format; linear formats map to themselves
    pub fn to_linear(self) -> Self {
        SRGB_TO_LINEAR
            .iter()
            .find(|(srgb, _)| *srgb == self)
            .map_or(self, |(_, linear)| *linear)
    }

    /// Whether texels are stored gamma encoded
    pub fn is_srgb(self) -> bool {
        SRGB_TO_LINEAR.iter().any(|(srgb, _)| *srgb == self)
    }

    /// Whether the format is block compressed
    pub fn is_compressed(self) -> bool {
        self.block_bytes().is_some()
    }

    /// Bytes per 4x4 block of a compressed format
    fn block_bytes(self) -> Option<usize> {
        use TextureFormat::*;
        match self {
            Bc1RgbaUnorm | Bc1RgbaUnormSrgb | Bc4RUnorm | Etc2Rgb8Unorm | Etc2Rgb8UnormSrgb => Some(8),
            Bc2RgbaUnorm | Bc2RgbaUnormSrgb | Bc3RgbaUnorm | Bc3RgbaUnormSrgb | Bc5RgUnorm
            | Bc6hRgbUfloat | Bc7RgbaUnorm | Bc7RgbaUnormSrgb | Etc2Rgba8Unorm
            | Etc2Rgba8UnormSrgb => Some(16),
            _ => None,
        }
    }

    /// Bytes per texel of an uncompressed format
    fn texel_bytes(self) -> usize {
        use TextureFormat::*;
        match self {
            R8Unorm => 1,
            Rg8Unorm => 2,
            Rgb8Unorm | Rgb8UnormSrgb => 3,
            Rgba8Unorm | Rgba8UnormSrgb | Bgra8Unorm | Bgra8UnormSrgb | R32Float => 4,
            Rgba16Float => 8,
            Rgba32Float => 16,
            _ => 0,
        }
    }

    /// Size in bytes of one mip level with the given dimensions, `None` when
    /// it does not fit in `usize`
    pub fn level_size(self, width: u32, height: u32) -> Option<usize> {
        let (width, height) = (width.max(1) as usize, height.max(1) as usize);
        match self.block_bytes() {
            Some(bytes) => width.div_ceil(4).checked_mul(height.div_ceil(4))?.checked_mul(bytes),
            None => width.checked_mul(height)?.checked_mul(self.texel_bytes()),
        }
    }

    /// Format for a DXGI (DX10 header) DDS surface
    pub fn from_dxgi(format: DxgiFormat) -> Option<Self> {
        use TextureFormat::*;
        Some(match format {
            DxgiFormat::R8_UNorm => R8Unorm,
            DxgiFormat::R8G8_UNorm => Rg8Unorm,
            DxgiFormat::R8G8B8A8_UNorm => Rgba8Unorm,
            DxgiFormat::R8G8B8A8_UNorm_sRGB => Rgba8UnormSrgb,
            DxgiFormat::B8G8R8A8_UNorm => Bgra8Unorm,
            DxgiFormat::B8G8R8A8_UNorm_sRGB => Bgra8UnormSrgb,
            DxgiFormat::R32_Float => R32Float,
            DxgiFormat::R16G16B16A16_Float => Rgba16Float,
            DxgiFormat::R32G32B32A32_Float => Rgba32Float,
            DxgiFormat::BC1_UNorm => Bc1RgbaUnorm,
            DxgiFormat::BC1_UNorm_sRGB => Bc1RgbaUnormSrgb,
            DxgiFormat::BC2_UNorm => Bc2RgbaUnorm,
            DxgiFormat::BC2_UNorm_sRGB => Bc2RgbaUnormSrgb,
            DxgiFormat::BC3_UNorm => Bc3RgbaUnorm,
            DxgiFormat::BC3_UNorm_sRGB => Bc3RgbaUnormSrgb,
            DxgiFormat::BC4_UNorm => Bc4RUnorm,
            DxgiFormat::BC5_UNorm => Bc5RgUnorm,
            DxgiFormat::BC6H_UF16 => Bc6hRgbUfloat,
            DxgiFormat::BC7_UNorm => Bc7RgbaUnorm,
            DxgiFormat::BC7_UNorm_sRGB => Bc7RgbaUnormSrgb,
            _ => return None,
        })
    }

    /// Format for a legacy FourCC / bitmask DDS surface
    pub fn from_d3d(format: &D3DFormat) -> Option<Self> {
        use TextureFormat::*;
        Some(match format {
            D3DFormat::L8 | D3DFormat::A8 => R8Unorm,
            D3DFormat::A8B8G8R8 => Rgba8Unorm,
            D3DFormat::A8R8G8B8 | D3DFormat::X8R8G8B8 => Bgra8Unorm,
            D3DFormat::R32F => R32Float,
            D3DFormat::A16B16G16R16F => Rgba16Float,
            D3DFormat::A32B32G32R32F => Rgba32Float,
            D3DFormat::DXT1 => Bc1RgbaUnorm,
            D3DFormat::DXT2 | D3DFormat::DXT3 => Bc2RgbaUnorm,
            D3DFormat::DXT4 | D3DFormat::DXT5 => Bc3RgbaUnorm,
            _ => return None,
        })
    }

    /// Format for a KTX 1 surface.
    ///
    /// Sized internal formats are looked up first; unsized ones fall back to
    /// the `(glFormat, glType)` pair.
    pub fn from_gl(internal_format: u32, format: u32, ty: u32) -> Option<Self> {
        use TextureFormat::*;
        let sized = match internal_format {
            gl::R8 => Some(R8Unorm),
            gl::RG8 => Some(Rg8Unorm),
            gl::RGB8 => Some(Rgb8Unorm),
            gl::SRGB8 => Some(Rgb8UnormSrgb),
            gl::RGBA8 => Some(Rgba8Unorm),
            gl::SRGB8_ALPHA8 => Some(Rgba8UnormSrgb),
            gl::R32F => Some(R32Float),
            gl::RGBA16F => Some(Rgba16Float),
            gl::RGBA32F => Some(Rgba32Float),
            gl::COMPRESSED_RGB_S3TC_DXT1 | gl::COMPRESSED_RGBA_S3TC_DXT1 => Some(Bc1RgbaUnorm),
            gl::COMPRESSED_SRGB_S3TC_DXT1 | gl::COMPRESSED_SRGB_ALPHA_S3TC_DXT1 => Some(Bc1RgbaUnormSrgb),
            gl::COMPRESSED_RGBA_S3TC_DXT3 => Some(Bc2RgbaUnorm),
            gl::COMPRESSED_SRGB_ALPHA_S3TC_DXT3 => Some(Bc2RgbaUnormSrgb),
            gl::COMPRESSED_RGBA_S3TC_DXT5 => Some(Bc3RgbaUnorm),
            gl::COMPRESSED_SRGB_ALPHA_S3TC_DXT5 => Some(Bc3RgbaUnormSrgb),
            gl::COMPRESSED_RGBA_BPTC_UNORM => Some(Bc7RgbaUnorm),
            gl::COMPRESSED_SRGB_ALPHA_BPTC_UNORM => Some(Bc7RgbaUnormSrgb),
            gl::ETC1_RGB8 | gl::COMPRESSED_RGB8_ETC2 => Some(Etc2Rgb8Unorm),
            gl::COMPRESSED_SRGB8_ETC2 => Some(Etc2Rgb8UnormSrgb),
            gl::COMPRESSED_RGBA8_ETC2_EAC => Some(Etc2Rgba8Unorm),
            gl::COMPRESSED_SRGB8_ALPHA8_ETC2_EAC => Some(Etc2Rgba8UnormSrgb),
            _ => None,
        };
        sized.or(match (format, ty) {
            (gl::RED | gl::LUMINANCE, gl::UNSIGNED_BYTE) => Some(R8Unorm),
            (gl::RG, gl::UNSIGNED_BYTE) => Some(Rg8Unorm),
            (gl::RGB, gl::UNSIGNED_BYTE) => Some(Rgb8Unorm),
            (gl::RGBA, gl::UNSIGNED_BYTE) => Some(Rgba8Unorm),
            (gl::RGBA, gl::HALF_FLOAT | gl::HALF_FLOAT_OES) => Some(Rgba16Float),
            (gl::RGBA, gl::FLOAT) => Some(Rgba32Float),
            _ => None,
        })
    }
}

/// OpenGL enumerants used by KTX headers
pub mod gl {
    #![allow(missing_docs)]

    pub const UNSIGNED_BYTE: u32 = 0x1401;
    pub const FLOAT: u32 = 0x1406;
    pub const HALF_FLOAT: u32 = 0x140B;
    pub const HALF_FLOAT_OES: u32 = 0x8D61;

    pub const RED: u32 = 0x1903;
    pub const RGB: u32 = 0x1907;
    pub const RGBA: u32 = 0x1908;
    pub const LUMINANCE: u32 = 0x1909;
    pub const RG: u32 = 0x8227;

    pub const R8: u32 = 0x8229;
    pub const RG8: u32 = 0x822B;
    pub const RGB8: u32 = 0x8051;
    pub const RGBA8: u32 = 0x8058;
    pub const SRGB8: u32 = 0x8C41;
    pub const SRGB8_ALPHA8: u32 = 0x8C43;
    pub const R32F: u32 = 0x822E;
    pub const RGBA32F: u32 = 0x8814;
    pub const RGBA16F: u32 = 0x881A;

    pub const COMPRESSED_RGB_S3TC_DXT1: u32 = 0x83F0;
    pub const COMPRESSED_RGBA_S3TC_DXT1: u32 = 0x83F1;
    pub const COMPRESSED_RGBA_S3TC_DXT3: u32 = 0x83F2;
    pub const COMPRESSED_RGBA_S3TC_DXT5: u32 = 0x83F3;
    pub const COMPRESSED_SRGB_S3TC_DXT1: u32 = 0x8C4C;
    pub const COMPRESSED_SRGB_ALPHA_S3TC_DXT1: u32 = 0x8C4D;
    pub const COMPRESSED_SRGB_ALPHA_S3TC_DXT3: u32 = 0x8C4E;
    pub const COMPRESSED_SRGB_ALPHA_S3TC_DXT5: u32 = 0x8C4F;
    pub const COMPRESSED_RGBA_BPTC_UNORM: u32 = 0x8E8C;
    pub const COMPRESSED_SRGB_ALPHA_BPTC_UNORM: u32 = 0x8E8D;
    pub const ETC1_RGB8: u32 = 0x8D64;
    pub const COMPRESSED_RGB8_ETC2: u32 = 0x9274;
    pub const COMPRESSED_SRGB8_ETC2: u32 = 0x9275;
    pub const COMPRESSED_RGBA8_ETC2_EAC: u32 = 0x9278;
    pub const COMPRESSED_SRGB8_ALPHA8_ETC2_EAC: u32 = 0x9279;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_maps_to_linear() {
        assert_eq!(TextureFormat::Bc3RgbaUnormSrgb.to_linear(), TextureFormat::Bc3RgbaUnorm);
        assert_eq!(TextureFormat::Rgba8Unorm.to_linear(), TextureFormat::Rgba8Unorm);
        assert!(TextureFormat::Bgra8UnormSrgb.is_srgb());
        assert!(!TextureFormat::Bc6hRgbUfloat.is_srgb());
    }

    #[test]
    fn test_level_sizes() {
        assert_eq!(TextureFormat::Rgba8Unorm.level_size(4, 2), Some(32));
        assert_eq!(TextureFormat::Bc1RgbaUnorm.level_size(8, 8), Some(32));
        // Partial blocks round up, zero dimensions clamp to one.
        assert_eq!(TextureFormat::Bc3RgbaUnorm.level_size(1, 1), Some(16));
        assert_eq!(TextureFormat::Bc7RgbaUnorm.level_size(5, 0), Some(32));
        assert_eq!(TextureFormat::Rgb8Unorm.level_size(0, 0), Some(3));
        assert_eq!(TextureFormat::Rgba32Float.level_size(u32::MAX, u32::MAX), None);
    }

    #[test]
    fn test_gl_lookup() {
        assert_eq!(
            TextureFormat::from_gl(gl::SRGB8_ALPHA8, gl::RGBA, gl::UNSIGNED_BYTE),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(
            TextureFormat::from_gl(gl::RGBA, gl::RGBA, gl::HALF_FLOAT),
            Some(TextureFormat::Rgba16Float)
        );
        assert_eq!(
            TextureFormat::from_gl(gl::COMPRESSED_RGBA_S3TC_DXT5, 0, 0),
            Some(TextureFormat::Bc3RgbaUnorm)
        );
        assert_eq!(TextureFormat::from_gl(0x1234, 0, 0), None);
    }

    #[test]
    fn test_dds_lookup() {
        assert_eq!(TextureFormat::from_dxgi(DxgiFormat::BC7_UNorm_sRGB), Some(TextureFormat::Bc7RgbaUnormSrgb));
        assert_eq!(TextureFormat::from_d3d(&D3DFormat::DXT5), Some(TextureFormat::Bc3RgbaUnorm));
        assert_eq!(TextureFormat::from_dxgi(DxgiFormat::Unknown), None);
    }
}
