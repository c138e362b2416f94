// SPDX-License-Identifier: MIT OR Apache-2.0
//! Renderer configuration passed to every shader compilation.
//!
//! Texture categories are switched on and off here instead of through
//! process-wide flags, so two compilations with different settings can run
//! side by side.

use serde::{Deserialize, Serialize};

/// Target shading language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderLanguage {
    /// GLSL ES 3.00
    #[default]
    Glsl,
    /// WebGPU shading language
    Wgsl,
}

impl ShaderLanguage {
    /// Parse a language name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "glsl" => Some(Self::Glsl),
            "wgsl" => Some(Self::Wgsl),
            _ => None,
        }
    }

    /// File extension for generated sources
    pub fn extension(self) -> &'static str {
        match self {
            Self::Glsl => "glsl",
            Self::Wgsl => "wgsl",
        }
    }
}

/// Default float precision (GLSL only)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    /// `lowp`
    Low,
    /// `mediump`
    Medium,
    /// `highp`
    #[default]
    High,
}

impl Precision {
    /// GLSL qualifier
    pub fn glsl_qualifier(self) -> &'static str {
        match self {
            Self::Low => "lowp",
            Self::Medium => "mediump",
            Self::High => "highp",
        }
    }
}

/// Texture slot a sampling block feeds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureCategory {
    /// Base color
    #[default]
    Diffuse,
    /// Detail overlay
    Detail,
    /// Normal/bump map
    Bump,
    /// Emissive color
    Emissive,
    /// Opacity mask
    Opacity,
    /// Environment reflection
    Reflection,
    /// Baked lighting
    Lightmap,
}

impl TextureCategory {
    /// Every category, in declaration order
    pub const ALL: [TextureCategory; 7] = [
        Self::Diffuse,
        Self::Detail,
        Self::Bump,
        Self::Emissive,
        Self::Opacity,
        Self::Reflection,
        Self::Lightmap,
    ];

    /// Category names, matching [`TextureCategory::name`]
    pub const NAMES: &'static [&'static str] = &[
        "Diffuse",
        "Detail",
        "Bump",
        "Emissive",
        "Opacity",
        "Reflection",
        "Lightmap",
    ];

    /// Display name
    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }

    /// Parse a display name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

/// Which texture categories shaders may sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureToggles {
    /// Base color textures
    pub diffuse: bool,
    /// Detail textures
    pub detail: bool,
    /// Bump/normal textures
    pub bump: bool,
    /// Emissive textures
    pub emissive: bool,
    /// Opacity textures
    pub opacity: bool,
    /// Reflection textures
    pub reflection: bool,
    /// Lightmaps
    pub lightmap: bool,
}

impl Default for TextureToggles {
    fn default() -> Self {
        Self {
            diffuse: true,
            detail: true,
            bump: true,
            emissive: true,
            opacity: true,
            reflection: true,
            lightmap: true,
        }
    }
}

impl TextureToggles {
    /// Whether a category is enabled
    pub fn is_enabled(&self, category: TextureCategory) -> bool {
        match category {
            TextureCategory::Diffuse => self.diffuse,
            TextureCategory::Detail => self.detail,
            TextureCategory::Bump => self.bump,
            TextureCategory::Emissive => self.emissive,
            TextureCategory::Opacity => self.opacity,
            TextureCategory::Reflection => self.reflection,
            TextureCategory::Lightmap => self.lightmap,
        }
    }

    /// Switch a category
    pub fn set(&mut self, category: TextureCategory, enabled: bool) {
        let slot = match category {
            TextureCategory::Diffuse => &mut self.diffuse,
            TextureCategory::Detail => &mut self.detail,
            TextureCategory::Bump => &mut self.bump,
            TextureCategory::Emissive => &mut self.emissive,
            TextureCategory::Opacity => &mut self.opacity,
            TextureCategory::Reflection => &mut self.reflection,
            TextureCategory::Lightmap => &mut self.lightmap,
        };
        *slot = enabled;
    }
}

/// Settings consumed by shader compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output language
    pub language: ShaderLanguage,
    /// GLSL float precision
    pub precision: Precision,
    /// Enabled texture categories
    pub textures: TextureToggles,
}

impl RenderConfig {
    /// Config targeting a language with default settings
    pub fn for_language(language: ShaderLanguage) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        for category in TextureCategory::ALL {
            assert_eq!(TextureCategory::from_name(category.name()), Some(category));
        }
    }

    #[test]
    fn test_toggles() {
        let mut toggles = TextureToggles::default();
        assert!(toggles.is_enabled(TextureCategory::Detail));
        toggles.set(TextureCategory::Detail, false);
        assert!(!toggles.is_enabled(TextureCategory::Detail));
        assert!(toggles.is_enabled(TextureCategory::Diffuse));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RenderConfig = ron::from_str("(language: Wgsl)").unwrap();
        assert_eq!(config.language, ShaderLanguage::Wgsl);
        assert_eq!(config.precision, Precision::High);
        assert!(config.textures.bump);
    }
}
