// SPDX-License-Identifier: MIT OR Apache-2.0
//! List available block classes.

use clap::{Args, ValueEnum};
use verdant_graph::graphs::geometry::create_geometry_registry;
use verdant_graph::graphs::material::create_material_registry;
use verdant_graph::{BlockCategory, BlockDefinition, BlockRegistry};

/// Graph kind filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphArg {
    /// Geometry graph blocks
    Geometry,
    /// Material graph blocks
    Material,
}

/// List block classes.
#[derive(Args)]
pub struct BlocksArgs {
    /// Only list blocks of this graph kind
    pub kind: Option<GraphArg>,
}

/// One listed block class
#[derive(Debug, Clone, PartialEq)]
pub struct BlockRow {
    /// Registered class name
    pub class_name: &'static str,
    /// Category
    pub category: BlockCategory,
    /// Description
    pub description: &'static str,
}

fn rows<D: BlockDefinition + ?Sized>(registry: &BlockRegistry<D>) -> Vec<BlockRow> {
    let mut rows: Vec<BlockRow> = registry
        .definitions()
        .map(|definition| BlockRow {
            class_name: definition.class_name(),
            category: definition.category(),
            description: definition.description(),
        })
        .collect();
    rows.sort_by_key(|row| row.class_name);
    rows
}

/// Block classes of one graph kind, sorted by name
pub fn list(kind: GraphArg) -> Vec<BlockRow> {
    match kind {
        GraphArg::Geometry => rows(&create_geometry_registry()),
        GraphArg::Material => rows(&create_material_registry()),
    }
}

/// Run the blocks command.
pub fn run(args: BlocksArgs) -> anyhow::Result<()> {
    let kinds = match args.kind {
        Some(kind) => vec![kind],
        None => vec![GraphArg::Geometry, GraphArg::Material],
    };

    for kind in kinds {
        let rows = list(kind);
        println!("{kind:?} blocks ({}):", rows.len());
        for row in rows {
            println!(
                "  {:<28} {:<10} {}",
                row.class_name,
                format!("{:?}", row.category),
                row.description
            );
        }
        println!();
    }
    Ok(())
}
