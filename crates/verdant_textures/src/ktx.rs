// SPDX-License-Identifier: MIT OR Apache-2.0
//! Khronos KTX 1 loader.

use crate::error::{TextureError, TextureResult};
use crate::format::TextureFormat;
use crate::loader::{finish, LoadCallback, LoadOptions, TextureLoader};
use crate::texture::{level_slice, InternalTexture, TextureInfo};
use bytemuck::{Pod, Zeroable};

const CONTAINER: &str = "KTX";

/// `«KTX 11»\r\n\x1A\n`
pub const IDENTIFIER: [u8; 12] = [0xAB, 0x4B, 0x54, 0x58, 0x20, 0x31, 0x31, 0xBB, 0x0D, 0x0A, 0x1A, 0x0A];
const ENDIANNESS: u32 = 0x0403_0201;
const HEADER_SIZE: usize = std::mem::size_of::<KtxHeader>();

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct KtxHeader {
    identifier: [u8; 12],
    endianness: u32,
    gl_type: u32,
    gl_type_size: u32,
    gl_format: u32,
    gl_internal_format: u32,
    gl_base_internal_format: u32,
    pixel_width: u32,
    pixel_height: u32,
    pixel_depth: u32,
    number_of_array_elements: u32,
    number_of_faces: u32,
    number_of_mipmap_levels: u32,
    bytes_of_key_value_data: u32,
}

impl KtxHeader {
    fn parse(data: &[u8]) -> TextureResult<(Self, bool)> {
        let bytes = data
            .get(..HEADER_SIZE)
            .ok_or_else(|| TextureError::malformed(CONTAINER, "file shorter than header"))?;
        let mut header: Self = bytemuck::pod_read_unaligned(bytes);
        if header.identifier != IDENTIFIER {
            return Err(TextureError::malformed(CONTAINER, "bad identifier"));
        }
        let swap = match header.endianness {
            ENDIANNESS => false,
            e if e.swap_bytes() == ENDIANNESS => true,
            e => return Err(TextureError::malformed(CONTAINER, format!("bad endianness marker {e:#010x}"))),
        };
        if swap {
            for word in [
                &mut header.endianness,
                &mut header.gl_type,
                &mut header.gl_type_size,
                &mut header.gl_format,
                &mut header.gl_internal_format,
                &mut header.gl_base_internal_format,
                &mut header.pixel_width,
                &mut header.pixel_height,
                &mut header.pixel_depth,
                &mut header.number_of_array_elements,
                &mut header.number_of_faces,
                &mut header.number_of_mipmap_levels,
                &mut header.bytes_of_key_value_data,
            ] {
                *word = word.swap_bytes();
            }
        }
        Ok((header, swap))
    }
}

/// Little reader over the image section
struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
    swap: bool,
}

impl<'a> Cursor<'a> {
    fn u32(&mut self, face: u32, level: u32) -> TextureResult<u32> {
        let bytes = level_slice(self.data, self.offset, 4, face, level)?;
        self.offset += 4;
        let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(if self.swap { value.swap_bytes() } else { value })
    }

    fn take(&mut self, size: usize, face: u32, level: u32) -> TextureResult<&'a [u8]> {
        let bytes = level_slice(self.data, self.offset, size, face, level)?;
        self.offset += size;
        Ok(bytes)
    }

    fn align4(&mut self) {
        self.offset = self.offset.next_multiple_of(4);
    }
}

/// KTX 1 files with GL internal formats, 2D or cube
pub struct KtxLoader;

impl KtxLoader {
    fn load(&self, data: &[u8], texture: &InternalTexture, options: &LoadOptions, cube: bool) -> TextureResult<TextureInfo> {
        let (header, swap) = KtxHeader::parse(data)?;

        let format = TextureFormat::from_gl(header.gl_internal_format, header.gl_format, header.gl_type)
            .ok_or_else(|| TextureError::UnsupportedFormat {
                container: CONTAINER,
                format: format!("{:#06x}", header.gl_internal_format),
            })?;
        if header.pixel_depth > 1 {
            return Err(TextureError::unsupported(CONTAINER, "volume texture"));
        }
        if header.number_of_array_elements > 0 {
            return Err(TextureError::unsupported(CONTAINER, "texture array"));
        }
        let stored_faces = match header.number_of_faces {
            1 | 6 => header.number_of_faces,
            n => return Err(TextureError::malformed(CONTAINER, format!("{n} faces"))),
        };
        if cube && stored_faces != 6 {
            return Err(TextureError::UnsupportedCube(format!("KTX file has {stored_faces} face(s)")));
        }

        let stored_levels = header.number_of_mipmap_levels.max(1);
        if stored_levels > TextureInfo::max_mip_levels(header.pixel_width, header.pixel_height) {
            return Err(TextureError::malformed(CONTAINER, format!("{stored_levels} mip levels")));
        }
        let (allocated_format, mip_levels) = options.resolve(format, stored_levels);
        let info = TextureInfo {
            width: header.pixel_width,
            height: header.pixel_height.max(1),
            mip_levels,
            format: allocated_format,
            compressed: format.is_compressed(),
            cube,
        };
        info.validate(CONTAINER)?;

        let mut cursor = Cursor {
            data,
            offset: HEADER_SIZE,
            swap,
        };
        cursor
            .take(header.bytes_of_key_value_data as usize, 0, 0)
            .map_err(|_| TextureError::malformed(CONTAINER, "key/value data runs past the end of the file"))?;
        texture.allocate(info);

        // Levels are stored in order; each face is padded to four bytes.
        for level in 0..mip_levels {
            let image_size = cursor.u32(0, level)? as usize;
            for face in 0..stored_faces {
                let bytes = cursor.take(image_size, face, level)?;
                if face < info.faces() {
                    texture.upload(face, level, bytes)?;
                }
                cursor.align4();
            }
        }
        Ok(info)
    }
}

impl TextureLoader for KtxLoader {
    fn name(&self) -> &'static str {
        "KTX"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ktx"]
    }

    fn mime_types(&self) -> &'static [&'static str] {
        &["image/ktx"]
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
    use crate::format::gl;
    use crate::loader::run_loader;

    struct Fixture {
        internal_format: u32,
        format: u32,
        ty: u32,
        width: u32,
        height: u32,
        faces: u32,
        big_endian: bool,
        /// Image data per level, repeated for every face
        levels: Vec<Vec<u8>>,
    }

    impl Fixture {
        fn rgba(width: u32, height: u32, levels: Vec<Vec<u8>>) -> Self {
            Self {
                internal_format: gl::RGBA8,
                format: gl::RGBA,
                ty: gl::UNSIGNED_BYTE,
                width,
                height,
                faces: 1,
                big_endian: false,
                levels,
            }
        }

        fn encode(&self) -> Vec<u8> {
            let word = |v: u32| if self.big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
            let mut out = IDENTIFIER.to_vec();
            let key_values = b"KTXorientation\0S=r,T=d\0\0";
            for value in [
                ENDIANNESS,
                self.ty,
                1,
                self.format,
                self.internal_format,
                self.format,
                self.width,
                self.height,
                0,
                0,
                self.faces,
                self.levels.len() as u32,
                key_values.len() as u32,
            ] {
                out.extend_from_slice(&word(value));
            }
            out.extend_from_slice(key_values);
            for level in &self.levels {
                out.extend_from_slice(&word(level.len() as u32));
                for _ in 0..self.faces {
                    out.extend_from_slice(level);
                    out.resize(out.len().next_multiple_of(4), 0);
                }
            }
            out
        }
    }

    #[test]
    fn test_header_is_64_bytes() {
        assert_eq!(HEADER_SIZE, 64);
    }

    #[test]
    fn test_mip_chain() {
        let bytes = Fixture::rgba(2, 2, vec![vec![1; 16], vec![2; 4]]).encode();
        let (result, texture) = run_loader(&KtxLoader, &bytes, &LoadOptions::default(), false);
        let info = result.unwrap();
        assert_eq!((info.width, info.height, info.mip_levels), (2, 2, 2));
        assert_eq!(info.format, TextureFormat::Rgba8Unorm);
        assert_eq!(texture.level(0, 1).unwrap(), vec![2; 4]);
    }

    #[test]
    fn test_big_endian_rgb_padding() {
        // 1x1 RGB levels are three bytes and get padded.
        let mut fixture = Fixture::rgba(2, 1, vec![vec![7; 6], vec![9; 3]]);
        fixture.internal_format = gl::RGB8;
        fixture.format = gl::RGB;
        fixture.big_endian = true;
        let (result, texture) = run_loader(&KtxLoader, &fixture.encode(), &LoadOptions::default(), false);
        assert_eq!(result.unwrap().format, TextureFormat::Rgb8Unorm);
        assert_eq!(texture.level(0, 1).unwrap(), vec![9; 3]);
    }

    #[test]
    fn test_cube_of_compressed_faces() {
        let mut fixture = Fixture::rgba(4, 4, vec![vec![5; 8]]);
        fixture.internal_format = gl::COMPRESSED_SRGB8_ETC2;
        fixture.format = 0;
        fixture.ty = 0;
        fixture.faces = 6;
        let options = LoadOptions {
            srgb_to_linear: true,
            ..LoadOptions::default()
        };
        let (result, texture) = run_loader(&KtxLoader, &fixture.encode(), &options, true);
        let info = result.unwrap();
        assert!(info.cube && info.compressed);
        assert_eq!(info.format, TextureFormat::Etc2Rgb8Unorm);
        assert!(texture.is_complete());
    }

    #[test]
    fn test_hostile_header_is_malformed() {
        let huge = Fixture::rgba(u32::MAX, u32::MAX, vec![vec![0; 4]]).encode();
        let deep = Fixture::rgba(2, 2, vec![vec![0; 4]; 5]).encode();
        for bytes in [huge, deep] {
            let (result, texture) = run_loader(&KtxLoader, &bytes, &LoadOptions::default(), false);
            assert!(matches!(result, Err(TextureError::Malformed { .. })), "{result:?}");
            assert!(texture.info().is_none());
        }
    }

    #[test]
    fn test_2d_as_cube_is_rejected() {
        let bytes = Fixture::rgba(1, 1, vec![vec![0; 4]]).encode();
        let (result, _) = run_loader(&KtxLoader, &bytes, &LoadOptions::default(), true);
        assert!(matches!(result, Err(TextureError::UnsupportedCube(_))));
    }

    #[test]
    fn test_unknown_gl_format() {
        let mut fixture = Fixture::rgba(1, 1, vec![vec![0; 4]]);
        fixture.internal_format = 0xDEAD;
        fixture.ty = 0;
        let (result, _) = run_loader(&KtxLoader, &fixture.encode(), &LoadOptions::default(), false);
        assert_eq!(
            result,
            Err(TextureError::UnsupportedFormat {
                container: "KTX",
                format: "0xdead".into(),
            })
        );
    }

    #[test]
    fn test_truncated_and_malformed() {
        let mut bytes = Fixture::rgba(2, 2, vec![vec![1; 16]]).encode();
        bytes.truncate(bytes.len() - 4);
        let (result, _) = run_loader(&KtxLoader, &bytes, &LoadOptions::default(), false);
        assert!(matches!(result, Err(TextureError::Truncated { level: 0, .. })));

        let (result, _) = run_loader(&KtxLoader, &IDENTIFIER, &LoadOptions::default(), false);
        assert!(matches!(result, Err(TextureError::Malformed { .. })));

        let mut bytes = Fixture::rgba(1, 1, vec![vec![0; 4]]).encode();
        bytes[12] = 0x55;
        let (result, _) = run_loader(&KtxLoader, &bytes, &LoadOptions::default(), false);
        assert!(matches!(result, Err(TextureError::Malformed { .. })));
    }
}
