// SPDX-License-Identifier: MIT OR Apache-2.0
//! Evaluate a geometry graph.

use super::common::read_graph;
use anyhow::{bail, Context};
use clap::Args;
use std::path::{Path, PathBuf};
use verdant_graph::{NodeGeometry, VertexData};

/// Evaluate a geometry graph into a mesh.
#[derive(Args)]
pub struct MeshArgs {
    /// Geometry graph (.ron, .json or .bin)
    pub graph: PathBuf,

    /// Write the mesh as JSON
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Run the mesh command.
pub fn run(args: MeshArgs) -> anyhow::Result<()> {
    let mesh = evaluate(&args.graph)?;

    println!("Vertices: {}", mesh.vertex_count());
    println!("Faces:    {}", mesh.face_count());
    println!("Normals:  {}", if mesh.has_normals() { "yes" } else { "no" });
    println!("UVs:      {}", if mesh.has_uvs() { "yes" } else { "no" });
    if let Some((min, max)) = mesh.bounds() {
        println!(
            "Bounds:   ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3})",
            min[0], min[1], min[2], max[0], max[1], max[2]
        );
    }

    if let Some(out) = &args.out {
        let json = serde_json::to_string_pretty(&mesh)?;
        std::fs::write(out, json).with_context(|| format!("Failed to write {}", out.display()))?;
        println!("Wrote {}", out.display());
    }
    Ok(())
}

fn evaluate(path: &Path) -> anyhow::Result<VertexData> {
    let geometry = NodeGeometry::from_serialized(&read_graph(path)?)
        .with_context(|| format!("Failed to load geometry {}", path.display()))?;
    match geometry.build()? {
        Some(mesh) => Ok(mesh),
        None => bail!("Geometry graph {} produced no mesh", path.display()),
    }
}
