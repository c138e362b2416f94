// SPDX-License-Identifier: MIT OR Apache-2.0
//! Verdant CLI - compile shader graphs, evaluate geometry graphs and inspect
//! textures.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "verdant")]
#[command(author, version, about = "Verdant node graph toolkit", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log library internals at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a material graph to shader sources
    Compile(commands::compile::CompileArgs),

    /// Evaluate a geometry graph into a mesh
    Mesh(commands::mesh::MeshArgs),

    /// Load a texture container and describe it
    Texture(commands::texture::TextureArgs),

    /// List available block classes
    Blocks(commands::blocks::BlocksArgs),

    /// Show or write the configuration
    Config(commands::config::ConfigArgs),
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    for target in ["verdant_cli", "verdant_graph", "verdant_textures"] {
        env_filter = env_filter.add_directive(format!("{target}={level}").parse()?);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;
    tracing::debug!("Starting Verdant v{}", env!("CARGO_PKG_VERSION"));

    let config = config::VerdantConfig::load_or_default(&cli.config)?;
    match cli.command {
        Commands::Compile(args) => commands::compile::run(args, &config),
        Commands::Mesh(args) => commands::mesh::run(args),
        Commands::Texture(args) => commands::texture::run(args, &config),
        Commands::Blocks(args) => commands::blocks::run(args),
        Commands::Config(args) => commands::config::run(args, &config, &cli.config),
    }
}
