// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compile a material graph to shader sources.

use super::common::{output_stem, read_graph};
use crate::config::VerdantConfig;
use anyhow::Context;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use verdant_graph::{CompiledShader, NodeMaterial, ShaderLanguage};

/// Target language flag
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LanguageArg {
    /// GLSL ES 3.00
    Glsl,
    /// WGSL
    Wgsl,
}

impl From<LanguageArg> for ShaderLanguage {
    fn from(language: LanguageArg) -> Self {
        match language {
            LanguageArg::Glsl => Self::Glsl,
            LanguageArg::Wgsl => Self::Wgsl,
        }
    }
}

/// Compile a material graph.
#[derive(Args)]
pub struct CompileArgs {
    /// Material graph (.ron, .json or .bin)
    pub graph: PathBuf,

    /// Output language (defaults to the configured one)
    #[arg(short, long)]
    pub language: Option<LanguageArg>,

    /// Directory to write `<name>.vert.<ext>` and `<name>.frag.<ext>` into;
    /// sources are printed when omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Run the compile command.
pub fn run(args: CompileArgs, config: &VerdantConfig) -> anyhow::Result<()> {
    let shader = compile(&args, config)?;

    match &args.out {
        Some(dir) => {
            let written = write_sources(&shader, dir, &output_stem(&args.graph))?;
            for path in written {
                println!("Wrote {}", path.display());
            }
        }
        None => {
            println!("// ---- vertex ----");
            print!("{}", shader.vertex);
            println!("// ---- fragment ----");
            print!("{}", shader.fragment);
        }
    }

    if !shader.uniforms.is_empty() {
        eprintln!("Uniforms:");
        for (name, port_type) in &shader.uniforms {
            eprintln!("  {name}: {port_type:?}");
        }
    }
    if !shader.samplers.is_empty() {
        eprintln!("Textures:");
        for sampler in &shader.samplers {
            eprintln!("  {} <- '{}' ({})", sampler.name, sampler.texture, sampler.category.name());
        }
    }
    Ok(())
}

fn compile(args: &CompileArgs, config: &VerdantConfig) -> anyhow::Result<CompiledShader> {
    let material = NodeMaterial::from_serialized(&read_graph(&args.graph)?)
        .with_context(|| format!("Failed to load material {}", args.graph.display()))?;

    let mut render = config.render.clone();
    if let Some(language) = args.language {
        render.language = language.into();
    }
    tracing::info!("Compiling {} to {:?}", args.graph.display(), render.language);
    Ok(material.compile(&render)?)
}

fn write_sources(shader: &CompiledShader, dir: &std::path::Path, stem: &str) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let extension = shader.language.extension();
    let mut written = Vec::new();
    for (stage, source) in [("vert", &shader.vertex), ("frag", &shader.fragment)] {
        let path = dir.join(format!("{stem}.{stage}.{extension}"));
        std::fs::write(&path, source).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_graph::PropertyValue;

    fn material_file(name: &str) -> PathBuf {
        let mut material = NodeMaterial::new("brick");
        let texture = material.add_block("TextureBlock").unwrap();
        material
            .set_property(texture, "texture", PropertyValue::Text("brick.dds".into()))
            .unwrap();
        let output = material.fragment_output();
        material.connect(texture, "rgba", output, "rgba").unwrap();

        let path = std::env::temp_dir().join(format!("verdant-{}-{name}.ron", std::process::id()));
        std::fs::write(&path, material.to_serialized().to_ron().unwrap()).unwrap();
        path
    }

    #[test]
    fn test_language_override() {
        let graph = material_file("override");
        let args = CompileArgs {
            graph: graph.clone(),
            language: Some(LanguageArg::Wgsl),
            out: None,
        };
        let shader = compile(&args, &VerdantConfig::default()).unwrap();
        std::fs::remove_file(&graph).unwrap();
        assert_eq!(shader.language, ShaderLanguage::Wgsl);
        assert!(shader.fragment.contains("@fragment"));
        assert_eq!(shader.samplers[0].texture, "brick.dds");
    }

    #[test]
    fn test_sources_written_to_directory() {
        let graph = material_file("write");
        let out = std::env::temp_dir().join(format!("verdant-{}-shaders", std::process::id()));
        let args = CompileArgs {
            graph: graph.clone(),
            language: None,
            out: Some(out.clone()),
        };
        let shader = compile(&args, &VerdantConfig::default()).unwrap();
        let written = write_sources(&shader, &out, "brick").unwrap();
        assert_eq!(written[0].file_name().unwrap(), "brick.vert.glsl");
        assert_eq!(std::fs::read_to_string(&written[1]).unwrap(), shader.fragment);

        std::fs::remove_file(&graph).unwrap();
        std::fs::remove_dir_all(&out).unwrap();
    }

    #[test]
    fn test_geometry_graph_is_rejected() {
        let path = std::env::temp_dir().join(format!("verdant-{}-geometry.ron", std::process::id()));
        let geometry = verdant_graph::NodeGeometry::new("g").to_serialized();
        std::fs::write(&path, geometry.to_ron().unwrap()).unwrap();
        let args = CompileArgs {
            graph: path.clone(),
            language: None,
            out: None,
        };
        let result = compile(&args, &VerdantConfig::default());
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
