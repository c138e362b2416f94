// SPDX-License-Identifier: MIT OR Apache-2.0
//! Procedural mesh sources.

use super::state::{GeometryBlockContext, GeometryBuildState, Stored};
use super::GeometryBlock;
use crate::block::{Block, BlockCategory};
use crate::evaluation::BuildError;
use crate::graphs::ops::scalar_input;
use crate::mesh::VertexData;
use crate::port::PortType;
use crate::registry::BlockDefinition;
use crate::value::Value;
use std::f64::consts::PI;

fn float(stored: &Stored, state: &GeometryBuildState) -> Option<f64> {
    stored.get(state)?.as_float()
}

fn register_int(block: &mut Block, name: &str, default: i64) {
    let index = block.register_input(name, PortType::Int, false, Some(Value::Int(default)));
    block.inputs[index].accepted_types.push(PortType::Float);
}

/// Axis aligned box centered on the origin
pub struct BoxBlock;

impl BlockDefinition for BoxBlock {
    fn class_name(&self) -> &'static str {
        "BoxBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Source
    }

    fn description(&self) -> &'static str {
        "Box with per-face normals and UVs"
    }

    fn register_ports(&self, block: &mut Block) {
        scalar_input(block, "size", false, Some(1.0));
        scalar_input(block, "width", true, None);
        scalar_input(block, "height", true, None);
        scalar_input(block, "depth", true, None);
        block.register_output("geometry", PortType::Geometry);
    }

    fn evaluates_per_context(&self) -> bool {
        false
    }
}

impl GeometryBlock for BoxBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let size = ctx.input("size");
        let width = ctx.input("width");
        let height = ctx.input("height");
        let depth = ctx.input("depth");
        ctx.set_deferred("geometry", move |state| {
            let size = float(&size, state)?;
            let extent = |s: &Stored| float(s, state).unwrap_or(size);
            Some(Value::from(box_mesh([
                extent(&width),
                extent(&height),
                extent(&depth),
            ])))
        })
    }
}

/// Box mesh with 4 vertices per face
pub fn box_mesh(extents: [f64; 3]) -> VertexData {
    // (normal, u axis, v axis) with normal = u x v
    const FACES: [([f64; 3], [f64; 3], [f64; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    const CORNERS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    let half = extents.map(|e| e / 2.0);
    let mut mesh = VertexData::default();
    for (normal, u, v) in FACES {
        let base = mesh.vertex_count() as u32;
        for (su, sv) in CORNERS {
            for axis in 0..3 {
                let p = normal[axis] + su * u[axis] + sv * v[axis];
                mesh.positions.push(p * half[axis]);
            }
            mesh.normals.extend_from_slice(&normal);
            mesh.uvs.extend_from_slice(&[(su + 1.0) / 2.0, (sv + 1.0) / 2.0]);
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// Subdivided plane in XZ facing +Y
pub struct PlaneBlock;

impl BlockDefinition for PlaneBlock {
    fn class_name(&self) -> &'static str {
        "PlaneBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Source
    }

    fn description(&self) -> &'static str {
        "Flat grid in the XZ plane"
    }

    fn register_ports(&self, block: &mut Block) {
        scalar_input(block, "size", false, Some(1.0));
        scalar_input(block, "width", true, None);
        scalar_input(block, "height", true, None);
        register_int(block, "subdivisions", 1);
        block.register_output("geometry", PortType::Geometry);
    }

    fn evaluates_per_context(&self) -> bool {
        false
    }
}

impl GeometryBlock for PlaneBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let size = ctx.input("size");
        let width = ctx.input("width");
        let height = ctx.input("height");
        let subdivisions = ctx.input("subdivisions");
        ctx.set_deferred("geometry", move |state| {
            let size = float(&size, state)?;
            let subdivisions = subdivisions.get(state)?.as_int()?.max(1) as usize;
            Some(Value::from(plane_mesh(
                float(&width, state).unwrap_or(size),
                float(&height, state).unwrap_or(size),
                subdivisions,
            )))
        })
    }
}

/// Plane mesh with `(n + 1)^2` vertices
pub fn plane_mesh(width: f64, height: f64, subdivisions: usize) -> VertexData {
    let n = subdivisions;
    let mut mesh = VertexData::default();
    for iz in 0..=n {
        for ix in 0..=n {
            let u = ix as f64 / n as f64;
            let v = iz as f64 / n as f64;
            mesh.positions
                .extend_from_slice(&[(u - 0.5) * width, 0.0, (v - 0.5) * height]);
            mesh.normals.extend_from_slice(&[0.0, 1.0, 0.0]);
            mesh.uvs.extend_from_slice(&[u, 1.0 - v]);
        }
    }
    let row = (n + 1) as u32;
    for iz in 0..n as u32 {
        for ix in 0..n as u32 {
            let a = iz * row + ix;
            let b = a + 1;
            let c = a + row;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }
    mesh
}

/// UV sphere centered on the origin
pub struct SphereBlock;

impl BlockDefinition for SphereBlock {
    fn class_name(&self) -> &'static str {
        "SphereBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Source
    }

    fn description(&self) -> &'static str {
        "Latitude/longitude sphere"
    }

    fn register_ports(&self, block: &mut Block) {
        register_int(block, "segments", 32);
        scalar_input(block, "diameter", false, Some(1.0));
        block.register_output("geometry", PortType::Geometry);
    }

    fn evaluates_per_context(&self) -> bool {
        false
    }
}

impl GeometryBlock for SphereBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let segments = ctx.input("segments");
        let diameter = ctx.input("diameter");
        ctx.set_deferred("geometry", move |state| {
            let segments = segments.get(state)?.as_int()?.max(3) as usize;
            let diameter = float(&diameter, state)?;
            Some(Value::from(sphere_mesh(diameter / 2.0, segments)))
        })
    }
}

/// Sphere mesh with `(segments + 1)^2` vertices
pub fn sphere_mesh(radius: f64, segments: usize) -> VertexData {
    let mut mesh = VertexData::default();
    for lat in 0..=segments {
        let theta = lat as f64 * PI / segments as f64;
        for lon in 0..=segments {
            let phi = lon as f64 * 2.0 * PI / segments as f64;
            let normal = [theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin()];
            mesh.positions.extend(normal.iter().map(|n| n * radius));
            mesh.normals.extend_from_slice(&normal);
            mesh.uvs.extend_from_slice(&[
                lon as f64 / segments as f64,
                1.0 - lat as f64 / segments as f64,
            ]);
        }
    }
    let row = (segments + 1) as u32;
    for lat in 0..segments as u32 {
        for lon in 0..segments as u32 {
            let a = lat * row + lon;
            let b = a + row;
            mesh.indices
                .extend_from_slice(&[a, a + 1, b, b, a + 1, b + 1]);
        }
    }
    mesh
}
