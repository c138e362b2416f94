// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blocks rewriting a vertex attribute per vertex.

use super::state::GeometryBlockContext;
use super::GeometryBlock;
use crate::block::{Block, BlockCategory};
use crate::evaluation::BuildError;
use crate::mesh::{self, VertexData};
use crate::port::PortType;
use crate::registry::BlockDefinition;
use crate::value::Value;

/// Attribute a [`SetAttributeBlock`] writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexAttribute {
    /// Vertex positions
    Positions,
    /// Vertex normals
    Normals,
    /// Texture coordinates
    Uvs,
}

impl VertexAttribute {
    fn input_name(self) -> &'static str {
        match self {
            Self::Positions => "positions",
            Self::Normals => "normals",
            Self::Uvs => "uvs",
        }
    }

    fn port_type(self) -> PortType {
        match self {
            Self::Uvs => PortType::Vector2,
            _ => PortType::Vector3,
        }
    }

    fn prepare(self, mesh: &mut VertexData) {
        let count = mesh.vertex_count();
        match self {
            Self::Normals if !mesh.has_normals() => mesh.normals = vec![0.0; count * 3],
            Self::Uvs if !mesh.has_uvs() => mesh.uvs = vec![0.0; count * 2],
            _ => {}
        }
    }

    fn write(self, mesh: &mut VertexData, vertex: usize, value: &Value) -> Option<()> {
        match self {
            Self::Positions => mesh::write3(&mut mesh.positions, vertex, value.as_vector3()?),
            Self::Normals => mesh::write3(&mut mesh.normals, vertex, value.as_vector3()?),
            Self::Uvs => {
                let uv = value.as_vector2()?;
                mesh.uvs[vertex * 2..vertex * 2 + 2].copy_from_slice(&uv);
            }
        }
        Some(())
    }
}

/// First face using each vertex
fn vertex_faces(mesh: &VertexData) -> Vec<Option<usize>> {
    let mut faces = vec![None; mesh.vertex_count()];
    for (i, index) in mesh.indices.iter().enumerate() {
        if let Some(slot) = faces.get_mut(*index as usize) {
            slot.get_or_insert(i / 3);
        }
    }
    faces
}

/// Evaluates its value input once per vertex and writes it into the mesh.
///
/// The value is evaluated with the vertex, its face and the source geometry
/// in context, so contextual inputs read the vertex being processed.
pub struct SetAttributeBlock(pub VertexAttribute);

impl BlockDefinition for SetAttributeBlock {
    fn class_name(&self) -> &'static str {
        match self.0 {
            VertexAttribute::Positions => "SetPositionsBlock",
            VertexAttribute::Normals => "SetNormalsBlock",
            VertexAttribute::Uvs => "SetUVsBlock",
        }
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Transform
    }

    fn description(&self) -> &'static str {
        match self.0 {
            VertexAttribute::Positions => "Set vertex positions",
            VertexAttribute::Normals => "Set vertex normals",
            VertexAttribute::Uvs => "Set texture coordinates",
        }
    }

    fn register_ports(&self, block: &mut Block) {
        block.register_input("geometry", PortType::Geometry, false, None);
        block.register_input(self.0.input_name(), self.0.port_type(), true, None);
        block.register_output("output", PortType::Geometry);
    }
}

impl GeometryBlock for SetAttributeBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let attribute = self.0;
        let geometry = ctx.input("geometry");
        let values = ctx.input(attribute.input_name());

        ctx.set_deferred("output", move |state| {
            let source = geometry.get(state)?.as_geometry()?.clone();
            if !values.is_present() {
                return Some(Value::Geometry(source));
            }

            let faces = vertex_faces(&source);
            let mut result = (*source).clone();
            attribute.prepare(&mut result);
            for (vertex, face) in faces.into_iter().enumerate() {
                let value = state.scoped(
                    |c| {
                        c.geometry = Some(source.clone());
                        c.vertex = Some(vertex);
                        c.face = face;
                    },
                    || values.get(state),
                )?;
                attribute.write(&mut result, vertex, &value)?;
            }
            Some(Value::from(result))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::geometry::sources::box_mesh;

    #[test]
    fn test_vertex_faces() {
        let mesh = box_mesh([1.0; 3]);
        let faces = vertex_faces(&mesh);
        assert_eq!(faces[0], Some(0));
        assert_eq!(faces[3], Some(1));
        assert_eq!(faces[4], Some(2));
    }

    #[test]
    fn test_uvs_are_created() {
        let mut mesh = VertexData {
            positions: vec![0.0; 6],
            ..VertexData::default()
        };
        VertexAttribute::Uvs.prepare(&mut mesh);
        VertexAttribute::Uvs
            .write(&mut mesh, 1, &Value::Vector2([0.25, 0.75]))
            .unwrap();
        assert_eq!(mesh.uv(1), [0.25, 0.75]);
        assert!(VertexAttribute::Positions
            .write(&mut mesh, 0, &Value::Matrix([0.0; 16]))
            .is_none());
    }
}
