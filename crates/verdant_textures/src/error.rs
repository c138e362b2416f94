// SPDX-License-Identifier: MIT OR Apache-2.0
//! Texture loading errors.

/// Errors reported through a loader's terminal callback
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TextureError {
    /// Header could not be parsed
    #[error("Malformed {container} container: {reason}")]
    Malformed {
        /// Container kind (DDS, KTX, TGA)
        container: &'static str,
        /// What was wrong
        reason: String,
    },
    /// Pixel format has no entry in the format table
    #[error("Unsupported {container} pixel format: {format}")]
    UnsupportedFormat {
        /// Container kind
        container: &'static str,
        /// Format as named by the container
        format: String,
    },
    /// Fewer bytes than the header promises
    #[error("Truncated data: mip {level} of face {face} needs {expected} bytes, {available} available")]
    Truncated {
        /// Cube face (0 for 2D textures)
        face: u32,
        /// Mip level
        level: u32,
        /// Bytes required
        expected: usize,
        /// Bytes left in the buffer
        available: usize,
    },
    /// Cube requested from a container that does not hold six faces
    #[error("Unsupported cube layout: {0}")]
    UnsupportedCube(String),
    /// Image decoder failure
    #[error("Failed to decode image: {0}")]
    Decode(String),
    /// No registered loader accepts the file
    #[error("No texture loader for '{0}'")]
    NoLoader(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl TextureError {
    pub(crate) fn malformed(container: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            container,
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(container: &'static str, format: impl std::fmt::Debug) -> Self {
        Self::UnsupportedFormat {
            container,
            format: format!("{format:?}"),
        }
    }
}

impl From<std::io::Error> for TextureError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Result alias used by loader internals
pub type TextureResult<T> = Result<T, TextureError>;
