// SPDX-License-Identifier: MIT OR Apache-2.0
//! Target texture storage that loaders allocate and upload into.

use crate::error::{TextureError, TextureResult};
use crate::format::TextureFormat;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Resolved shape of a loaded texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureInfo {
    /// Width of mip 0 in texels
    pub width: u32,
    /// Height of mip 0 in texels
    pub height: u32,
    /// Number of mip levels stored
    pub mip_levels: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Whether the format is block compressed
    pub compressed: bool,
    /// Whether the texture holds six cube faces
    pub cube: bool,
}

impl TextureInfo {
    /// Number of faces (6 for cubes)
    pub fn faces(&self) -> u32 {
        if self.cube {
            6
        } else {
            1
        }
    }

    /// Dimensions of a mip level
    pub fn level_extent(&self, level: u32) -> (u32, u32) {
        ((self.width >> level).max(1), (self.height >> level).max(1))
    }

    /// Byte size of one level of one face, `None` when it overflows
    pub fn level_size(&self, level: u32) -> Option<usize> {
        let (width, height) = self.level_extent(level);
        self.format.level_size(width, height)
    }

    /// Longest mip chain a `width` x `height` surface has
    pub fn max_mip_levels(width: u32, height: u32) -> u32 {
        u32::BITS - width.max(height).max(1).leading_zeros()
    }

    /// Reject shapes a well-formed `container` cannot describe
    pub fn validate(&self, container: &'static str) -> TextureResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TextureError::malformed(container, "zero sized surface"));
        }
        let max_levels = Self::max_mip_levels(self.width, self.height);
        if self.mip_levels == 0 || self.mip_levels > max_levels {
            return Err(TextureError::malformed(
                container,
                format!(
                    "{} mip levels for a {}x{} surface",
                    self.mip_levels, self.width, self.height
                ),
            ));
        }
        if self.level_size(0).is_none() {
            return Err(TextureError::malformed(
                container,
                format!("{}x{} surface is too large", self.width, self.height),
            ));
        }
        Ok(())
    }
}

/// Bytes of one level starting at `offset`
pub(crate) fn level_slice(data: &[u8], offset: usize, size: usize, face: u32, level: u32) -> TextureResult<&[u8]> {
    data.get(offset..offset.saturating_add(size)).ok_or(TextureError::Truncated {
        face,
        level,
        expected: size,
        available: data.len().saturating_sub(offset),
    })
}

#[derive(Default)]
struct Storage {
    info: Option<TextureInfo>,
    /// Level data indexed `[face][level]`
    faces: Vec<Vec<Option<Vec<u8>>>>,
    disposed: bool,
}

/// CPU side staging for one texture.
///
/// A loader first calls [`allocate`](Self::allocate) with the parsed shape and
/// then [`upload`](Self::upload)s every level of every face.
#[derive(Default)]
pub struct InternalTexture {
    storage: RwLock<Storage>,
}

impl InternalTexture {
    /// Create an empty, unallocated texture
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve storage for `info`, discarding any previous contents
    pub fn allocate(&self, info: TextureInfo) {
        let mut storage = self.storage.write();
        storage.faces = (0..info.faces())
            .map(|_| vec![None; info.mip_levels as usize])
            .collect();
        storage.info = Some(info);
        storage.disposed = false;
    }

    /// Copy one level into the allocated storage
    pub fn upload(&self, face: u32, level: u32, data: &[u8]) -> TextureResult<()> {
        let mut storage = self.storage.write();
        let info = storage
            .info
            .ok_or_else(|| TextureError::Io("upload into unallocated texture".into()))?;
        let expected = info
            .level_size(level)
            .ok_or_else(|| TextureError::Io(format!("level {level} size overflows")))?;
        if data.len() < expected {
            return Err(TextureError::Truncated {
                face,
                level,
                expected,
                available: data.len(),
            });
        }
        let slot = storage
            .faces
            .get_mut(face as usize)
            .and_then(|levels| levels.get_mut(level as usize))
            .ok_or_else(|| TextureError::Io(format!("face {face} level {level} out of range")))?;
        *slot = Some(data[..expected].to_vec());
        Ok(())
    }

    /// Shape of the allocated texture
    pub fn info(&self) -> Option<TextureInfo> {
        self.storage.read().info
    }

    /// Whether every level of every face has been uploaded
    pub fn is_complete(&self) -> bool {
        let storage = self.storage.read();
        storage.info.is_some() && storage.faces.iter().flatten().all(Option::is_some)
    }

    /// Copy of an uploaded level
    pub fn level(&self, face: u32, level: u32) -> Option<Vec<u8>> {
        self.storage
            .read()
            .faces
            .get(face as usize)?
            .get(level as usize)?
            .clone()
    }

    /// Bytes currently held
    pub fn byte_size(&self) -> usize {
        self.storage
            .read()
            .faces
            .iter()
            .flatten()
            .flatten()
            .map(Vec::len)
            .sum()
    }

    /// Release all storage
    pub fn dispose(&self) {
        let mut storage = self.storage.write();
        storage.faces = Vec::new();
        storage.info = None;
        storage.disposed = true;
    }

    /// Whether [`dispose`](Self::dispose) has been called since the last allocation
    pub fn is_disposed(&self) -> bool {
        self.storage.read().disposed
    }
}

impl std::fmt::Debug for InternalTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalTexture")
            .field("info", &self.info())
            .field("bytes", &self.byte_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba_info(cube: bool) -> TextureInfo {
        TextureInfo {
            width: 4,
            height: 2,
            mip_levels: 3,
            format: TextureFormat::Rgba8Unorm,
            compressed: false,
            cube,
        }
    }

    #[test]
    fn test_level_extent_clamps() {
        let info = rgba_info(false);
        assert_eq!(info.level_extent(1), (2, 1));
        assert_eq!(info.level_extent(2), (1, 1));
        assert_eq!(info.level_size(2), Some(4));
    }

    #[test]
    fn test_validate_rejects_hostile_shapes() {
        assert_eq!(TextureInfo::max_mip_levels(4, 2), 3);
        assert_eq!(TextureInfo::max_mip_levels(1, 1), 1);
        assert_eq!(TextureInfo::max_mip_levels(u32::MAX, 1), 32);
        assert!(rgba_info(false).validate("test").is_ok());

        let too_many_levels = TextureInfo {
            mip_levels: 4,
            ..rgba_info(false)
        };
        let huge = TextureInfo {
            width: u32::MAX,
            height: u32::MAX,
            mip_levels: 1,
            ..rgba_info(false)
        };
        let empty = TextureInfo {
            height: 0,
            ..rgba_info(false)
        };
        for info in [too_many_levels, huge, empty] {
            assert!(matches!(info.validate("test"), Err(TextureError::Malformed { .. })));
        }
    }

    #[test]
    fn test_allocate_and_upload() {
        let texture = InternalTexture::new();
        texture.allocate(rgba_info(false));
        assert!(!texture.is_complete());

        texture.upload(0, 0, &[1; 32]).unwrap();
        texture.upload(0, 1, &[2; 8]).unwrap();
        texture.upload(0, 2, &[3; 6]).unwrap();
        assert!(texture.is_complete());
        // Trailing bytes beyond the level size are not kept.
        assert_eq!(texture.level(0, 2).unwrap(), vec![3; 4]);
        assert_eq!(texture.byte_size(), 44);
    }

    #[test]
    fn test_short_upload_is_rejected() {
        let texture = InternalTexture::new();
        texture.allocate(rgba_info(true));
        let err = texture.upload(5, 0, &[0; 10]).unwrap_err();
        assert!(matches!(err, TextureError::Truncated { face: 5, expected: 32, .. }));
        assert!(texture.upload(6, 0, &[0; 32]).is_err());
    }

    #[test]
    fn test_dispose_releases_storage() {
        let texture = InternalTexture::new();
        texture.allocate(rgba_info(false));
        texture.upload(0, 0, &[0; 32]).unwrap();
        texture.dispose();
        assert!(texture.is_disposed());
        assert_eq!(texture.byte_size(), 0);
        assert!(texture.info().is_none());
    }
}
