// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI configuration stored as RON.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use verdant_graph::RenderConfig;
use verdant_textures::LoadOptions;

/// Current configuration format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "verdant.ron";

/// Settings shared by all commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerdantConfig {
    /// Format version
    pub version: u32,
    /// Shader compilation settings
    pub render: RenderConfig,
    /// Texture loading settings
    pub textures: LoadOptions,
}

impl Default for VerdantConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            render: RenderConfig::default(),
            textures: LoadOptions::default(),
        }
    }
}

impl VerdantConfig {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load from `path`
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = ron::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        if config.version > CONFIG_FORMAT_VERSION {
            bail!(
                "Config version {} is newer than supported version {}",
                config.version,
                CONFIG_FORMAT_VERSION
            );
        }
        Ok(config)
    }

    /// Save to `path` as pretty RON
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, pretty)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use verdant_graph::{ShaderLanguage, TextureCategory};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("verdant-{}-{name}.ron", std::process::id()))
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = VerdantConfig::load_or_default(&temp_path("missing")).unwrap();
        assert_eq!(config, VerdantConfig::default());
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let mut config = VerdantConfig::default();
        config.render.language = ShaderLanguage::Wgsl;
        config.render.textures.set(TextureCategory::Detail, false);
        config.textures.max_mip_levels = Some(4);
        config.save(&path).unwrap();

        let loaded = VerdantConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let path = temp_path("newer");
        std::fs::write(&path, "(version: 99)").unwrap();
        let err = VerdantConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial");
        std::fs::write(&path, "(textures: (srgb_to_linear: true))").unwrap();
        let config = VerdantConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(config.textures.srgb_to_linear);
        assert_eq!(config.render, RenderConfig::default());
    }
}
