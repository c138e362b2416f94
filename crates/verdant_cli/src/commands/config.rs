// SPDX-License-Identifier: MIT OR Apache-2.0
//! Show or write the configuration.

use crate::config::VerdantConfig;
use clap::Args;
use std::path::Path;

/// Show or write the configuration.
#[derive(Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config file
    #[arg(long)]
    pub write: bool,
}

/// Run the config command.
pub fn run(args: ConfigArgs, config: &VerdantConfig, path: &Path) -> anyhow::Result<()> {
    if args.write {
        config.save(path)?;
        println!("Wrote {}", path.display());
    } else {
        let pretty = ron::ser::PrettyConfig::default().struct_names(true);
        println!("{}", ron::ser::to_string_pretty(config, pretty)?);
    }
    Ok(())
}
