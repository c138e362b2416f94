// SPDX-License-Identifier: MIT OR Apache-2.0
//! Load a texture container and describe it.

use super::common::format_bytes;
use crate::config::VerdantConfig;
use clap::Args;
use std::path::PathBuf;
use verdant_textures::{TextureCache, TextureInfo, TextureLoaderRegistry};

/// Load a texture container.
#[derive(Args)]
pub struct TextureArgs {
    /// DDS, KTX or TGA file
    pub file: PathBuf,

    /// Load as a six-face cube map
    #[arg(long)]
    pub cube: bool,
}

/// Run the texture command.
pub fn run(args: TextureArgs, config: &VerdantConfig) -> anyhow::Result<()> {
    let (info, bytes) = load(&args, config)?;
    let loader = TextureLoaderRegistry::global()
        .find(&verdant_textures::extension_of(&args.file.to_string_lossy()), None)
        .map_or("?", |loader| loader.name());

    println!("File:        {}", args.file.display());
    println!("Loader:      {loader}");
    println!("Size:        {}x{}", info.width, info.height);
    println!("Format:      {:?}{}", info.format, if info.compressed { " (compressed)" } else { "" });
    println!("Mip levels:  {}", info.mip_levels);
    println!("Cube:        {}", if info.cube { "yes" } else { "no" });
    println!("Data:        {}", format_bytes(bytes));
    Ok(())
}

fn load(args: &TextureArgs, config: &VerdantConfig) -> anyhow::Result<(TextureInfo, usize)> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let cache = TextureCache::new(config.textures.clone());
    let texture = runtime.block_on(cache.load_file(&args.file, args.cube))?;
    let info = texture
        .info()
        .ok_or_else(|| anyhow::anyhow!("Texture {} was not allocated", args.file.display()))?;
    let bytes = texture.byte_size();
    cache.clear();
    Ok((info, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    #[test]
    fn test_loads_tga_file() {
        let path = std::env::temp_dir().join(format!("verdant-{}-swatch.tga", std::process::id()));
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([0, 128, 255, 255])))
            .save_with_format(&path, ImageFormat::Tga)
            .unwrap();

        let args = TextureArgs {
            file: path.clone(),
            cube: false,
        };
        let (info, bytes) = load(&args, &VerdantConfig::default()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!((info.width, info.height), (4, 2));
        assert_eq!(bytes, 32);
    }

    #[test]
    fn test_cube_tga_is_rejected() {
        let args = TextureArgs {
            file: PathBuf::from("/nonexistent/verdant/sky.tga"),
            cube: true,
        };
        assert!(load(&args, &VerdantConfig::default()).is_err());
    }
}
