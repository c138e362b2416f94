// SPDX-License-Identifier: MIT OR Apache-2.0
//! Transforming, merging and instancing geometry.

use super::state::{GeometryBlockContext, GeometryBuildState, Stored};
use super::GeometryBlock;
use crate::block::{Block, BlockCategory};
use crate::evaluation::BuildError;
use crate::math::{self, Matrix4};
use crate::mesh::VertexData;
use crate::port::PortType;
use crate::registry::BlockDefinition;
use crate::value::Value;
use std::sync::Arc;

const MERGE_SLOTS: [&str; 5] = ["geometry0", "geometry1", "geometry2", "geometry3", "geometry4"];

fn vector3(stored: &Stored, state: &GeometryBuildState) -> Option<[f64; 3]> {
    stored.get(state)?.as_vector3()
}

/// Applies a matrix (or translation/rotation/scaling) to geometry or a vector
pub struct GeometryTransformBlock;

impl BlockDefinition for GeometryTransformBlock {
    fn class_name(&self) -> &'static str {
        "GeometryTransformBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Transform
    }

    fn description(&self) -> &'static str {
        "Transform geometry or a vector"
    }

    fn register_ports(&self, block: &mut Block) {
        let value = block.register_input("value", PortType::AutoDetect, false, None);
        block.inputs[value].default_type = PortType::Geometry;
        block.inputs[value].excluded_types.extend_from_slice(&[
            PortType::Int,
            PortType::Float,
            PortType::Vector2,
            PortType::Matrix,
            PortType::Texture,
        ]);
        block.register_input("matrix", PortType::Matrix, true, None);
        block.register_input("translation", PortType::Vector3, false, Some(Value::Vector3([0.0; 3])));
        block.register_input("rotation", PortType::Vector3, false, Some(Value::Vector3([0.0; 3])));
        block.register_input("scaling", PortType::Vector3, false, Some(Value::Vector3([1.0; 3])));
        let output = block.register_output("output", PortType::Geometry);
        block.output_type_from(output, value);
    }
}

impl GeometryBlock for GeometryTransformBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let value = ctx.input("value");
        let matrix = ctx.input("matrix");
        let translation = ctx.input("translation");
        let rotation = ctx.input("rotation");
        let scaling = ctx.input("scaling");

        ctx.set_deferred("output", move |state| {
            let value = value.get(state)?;
            let m: Matrix4 = match matrix.get(state) {
                Some(Value::Matrix(m)) => m,
                _ => math::compose(
                    vector3(&scaling, state)?,
                    vector3(&rotation, state)?,
                    vector3(&translation, state)?,
                ),
            };
            match value {
                Value::Geometry(geometry) => {
                    let mut mesh = Arc::unwrap_or_clone(geometry);
                    mesh.transform(&m);
                    Some(Value::from(mesh))
                }
                Value::Vector3(p) => Some(Value::Vector3(math::transform_point(&m, p))),
                Value::Color3(p) => Some(Value::Color3(math::transform_point(&m, p))),
                Value::Vector4(v) => Some(Value::Vector4(math::transform_vector4(&m, v))),
                Value::Color4(v) => Some(Value::Color4(math::transform_vector4(&m, v))),
                _ => None,
            }
        })
    }
}

/// Concatenates up to five meshes; absent inputs are skipped
pub struct MergeGeometryBlock;

impl BlockDefinition for MergeGeometryBlock {
    fn class_name(&self) -> &'static str {
        "MergeGeometryBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Transform
    }

    fn description(&self) -> &'static str {
        "Merge several meshes into one"
    }

    fn register_ports(&self, block: &mut Block) {
        for slot in MERGE_SLOTS {
            block.register_input(slot, PortType::Geometry, true, None);
        }
        block.register_output("output", PortType::Geometry);
    }
}

impl GeometryBlock for MergeGeometryBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let slots: Vec<Stored> = MERGE_SLOTS.iter().map(|name| ctx.input(name)).collect();

        ctx.set_deferred("output", move |state| {
            let mut merged: Option<VertexData> = None;
            for (index, slot) in slots.iter().enumerate() {
                let geometry = state.scoped(|c| c.geometry_index = Some(index), || slot.get(state));
                if let Some(Value::Geometry(geometry)) = geometry {
                    merged.get_or_insert_with(VertexData::default).merge(&geometry);
                }
            }
            merged.map(Value::from)
        })
    }
}

/// Repeats a mesh along a direction.
///
/// Instance `i` is evaluated with loop and instance index `i`, translated by
/// `direction * i`, rotated by `rotation * i` and scaled by
/// `1 + (scaling - 1) * i`.
pub struct InstantiateLinearBlock;

impl BlockDefinition for InstantiateLinearBlock {
    fn class_name(&self) -> &'static str {
        "InstantiateLinearBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Transform
    }

    fn description(&self) -> &'static str {
        "Instantiate a mesh along a line"
    }

    fn register_ports(&self, block: &mut Block) {
        block.register_input("instance", PortType::Geometry, false, None);
        let count = block.register_input("count", PortType::Int, false, Some(Value::Int(10)));
        block.inputs[count].accepted_types.push(PortType::Float);
        block.register_input("direction", PortType::Vector3, false, Some(Value::Vector3([1.0, 0.0, 0.0])));
        block.register_input("rotation", PortType::Vector3, false, Some(Value::Vector3([0.0; 3])));
        block.register_input("scaling", PortType::Vector3, false, Some(Value::Vector3([1.0; 3])));
        block.register_output("output", PortType::Geometry);
    }
}

impl GeometryBlock for InstantiateLinearBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let instance = ctx.input("instance");
        let count = ctx.input("count");
        let direction = ctx.input("direction");
        let rotation = ctx.input("rotation");
        let scaling = ctx.input("scaling");

        ctx.set_deferred("output", move |state| {
            let count = count.get(state)?.as_int()?;
            let mut merged: Option<VertexData> = None;
            for i in 0..count.max(0) as usize {
                let mesh = state.scoped(
                    |c| {
                        c.loop_index = Some(i);
                        c.instance = Some(i);
                    },
                    || -> Option<VertexData> {
                        let geometry = instance.get(state)?.as_geometry()?.clone();
                        let f = i as f64;
                        let m = math::compose(
                            vector3(&scaling, state)?.map(|s| 1.0 + (s - 1.0) * f),
                            vector3(&rotation, state)?.map(|r| r * f),
                            vector3(&direction, state)?.map(|d| d * f),
                        );
                        let mut mesh = Arc::unwrap_or_clone(geometry);
                        mesh.transform(&m);
                        Some(mesh)
                    },
                );
                if let Some(mesh) = mesh {
                    merged.get_or_insert_with(VertexData::default).merge(&mesh);
                }
            }
            merged.map(Value::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::geometry::sources::box_mesh;
    use crate::types::ResolvedTypes;

    fn build_output<B: GeometryBlock>(definition: &B, inputs: &[(&str, Stored)]) -> Stored {
        let mut block = Block::new(definition.class_name(), "test");
        definition.register_ports(&mut block);
        let stored = block
            .inputs
            .iter()
            .map(|port| {
                inputs
                    .iter()
                    .find(|(name, _)| *name == port.name)
                    .map(|(_, s)| s.clone())
                    .or_else(|| port.default_value.clone().map(Stored::Literal))
                    .unwrap_or_default()
            })
            .collect();
        let types = ResolvedTypes::default();
        let mut ctx = GeometryBlockContext::new(&block, &types, stored);
        definition.build(&mut ctx).unwrap();
        ctx.into_outputs().remove(0)
    }

    #[test]
    fn test_transform_vector() {
        let out = build_output(
            &GeometryTransformBlock,
            &[
                ("value", Stored::Literal(Value::Vector3([1.0, 0.0, 0.0]))),
                ("translation", Stored::Literal(Value::Vector3([0.0, 1.0, 0.0]))),
                ("scaling", Stored::Literal(Value::Vector3([2.0; 3]))),
            ],
        );
        assert_eq!(
            out.get(&GeometryBuildState::new()),
            Some(Value::Vector3([2.0, 1.0, 0.0]))
        );
    }

    #[test]
    fn test_merge_skips_absent_slots() {
        let cube = Stored::Literal(Value::from(box_mesh([1.0; 3])));
        let out = build_output(
            &MergeGeometryBlock,
            &[("geometry0", cube.clone()), ("geometry3", cube)],
        );
        let merged = out.get(&GeometryBuildState::new()).unwrap();
        assert_eq!(merged.as_geometry().unwrap().vertex_count(), 48);

        let empty = build_output(&MergeGeometryBlock, &[]);
        assert_eq!(empty.get(&GeometryBuildState::new()), None);
    }

    #[test]
    fn test_merge_sets_geometry_index() {
        let tagged = Stored::deferred(|state| {
            let index = state.context().geometry_index? as f64;
            Some(Value::from(box_mesh([index + 1.0; 3])))
        });
        let out = build_output(
            &MergeGeometryBlock,
            &[("geometry0", tagged.clone()), ("geometry1", tagged)],
        );
        let merged = out.get(&GeometryBuildState::new()).unwrap();
        let (_, max) = merged.as_geometry().unwrap().bounds().unwrap();
        assert_eq!(max, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_instantiate_linear_scaling() {
        let out = build_output(
            &InstantiateLinearBlock,
            &[
                ("instance", Stored::Literal(Value::from(box_mesh([1.0; 3])))),
                ("count", Stored::Literal(Value::Int(3))),
                ("direction", Stored::Literal(Value::Vector3([0.0; 3]))),
                ("scaling", Stored::Literal(Value::Vector3([2.0; 3]))),
            ],
        );
        let mesh = out.get(&GeometryBuildState::new()).unwrap();
        let mesh = mesh.as_geometry().unwrap();
        assert_eq!(mesh.vertex_count(), 72);
        // Third instance is scaled by 1 + (2 - 1) * 2 = 3
        let (_, max) = mesh.bounds().unwrap();
        assert_eq!(max, [1.5, 1.5, 1.5]);
    }

    #[test]
    fn test_instantiate_zero_count_is_absent() {
        let out = build_output(
            &InstantiateLinearBlock,
            &[
                ("instance", Stored::Literal(Value::from(box_mesh([1.0; 3])))),
                ("count", Stored::Literal(Value::Int(0))),
            ],
        );
        assert_eq!(out.get(&GeometryBuildState::new()), None);
    }
}
