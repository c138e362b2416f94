// SPDX-License-Identifier: MIT OR Apache-2.0
//! Building, splitting and transforming vectors.

use super::state::{
    convert, float_literal, type_name, ShaderBlockContext, ShaderBuildState, ShaderValue,
};
use super::ShaderBlock;
use crate::block::{Block, BlockCategory};
use crate::evaluation::BuildError;
use crate::graphs::ops::scalar_input;
use crate::port::PortType;
use crate::property::{PropertyDefault, PropertyDescriptor, PropertyKind};
use crate::registry::BlockDefinition;

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];
const ZERO_FILL: [&str; 3] = ["0.0", "0.0", "0.0"];

/// Swizzled outputs shared by the merger and the splitter
const SWIZZLES: [(&str, &str, PortType); 8] = [
    ("xyzw", "", PortType::Vector4),
    ("xyz", ".xyz", PortType::Vector3),
    ("xy", ".xy", PortType::Vector2),
    ("zw", ".zw", PortType::Vector2),
    ("x", ".x", PortType::Float),
    ("y", ".y", PortType::Float),
    ("z", ".z", PortType::Float),
    ("w", ".w", PortType::Float),
];

/// Bind every swizzle of `vector` that the block declares as an output
fn bind_swizzles(ctx: &mut ShaderBlockContext<'_>, vector: &ShaderValue) -> Result<(), BuildError> {
    for (name, swizzle, port_type) in SWIZZLES {
        if ctx.block().output(name).is_some() {
            ctx.set(name, ShaderValue::new(format!("{}{swizzle}", vector.expr), port_type))?;
        }
    }
    Ok(())
}

/// Builds a vector from the widest connected input.
///
/// `xyzw` wins, then `xyz` (w = 0), then `xy` with `zw`, then the scalar
/// components. Missing components are zero.
pub struct VectorMergerBlock;

impl BlockDefinition for VectorMergerBlock {
    fn class_name(&self) -> &'static str {
        "VectorMergerBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Utility
    }

    fn description(&self) -> &'static str {
        "Merge components into vectors"
    }

    fn register_ports(&self, block: &mut Block) {
        let xyzw = block.register_input("xyzw", PortType::Vector4, true, None);
        block.inputs[xyzw].accepted_types.push(PortType::Color4);
        let xyz = block.register_input("xyz", PortType::Vector3, true, None);
        block.inputs[xyz].accepted_types.push(PortType::Color3);
        block.register_input("xy", PortType::Vector2, true, None);
        block.register_input("zw", PortType::Vector2, true, None);
        for name in COMPONENTS {
            scalar_input(block, name, true, None);
        }

        block.register_output("xyzw", PortType::Vector4);
        block.register_output("xyz", PortType::Vector3);
        block.register_output("xy", PortType::Vector2);
    }
}

impl ShaderBlock for VectorMergerBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let language = state.language();
        let vec4 = type_name(language, PortType::Vector4);
        let components = COMPONENTS.map(|name| ctx.input(name));

        let expr = if let Some(xyzw) = ctx.input("xyzw") {
            xyzw.expr
        } else if let Some(xyz) = ctx.input("xyz") {
            convert(language, &xyz, PortType::Vector4, ZERO_FILL)
        } else if let Some(xy) = ctx.input("xy") {
            let zw = ctx.input("zw").map_or_else(|| "0.0, 0.0".to_string(), |zw| zw.expr);
            format!("{vec4}({}, {zw})", xy.expr)
        } else if components.iter().any(Option::is_some) {
            let args: Vec<String> = components
                .iter()
                .map(|c| c.as_ref().map_or_else(|| "0.0".to_string(), |c| c.expr.clone()))
                .collect();
            format!("{vec4}({})", args.join(", "))
        } else {
            return Ok(());
        };

        let vector = state.declare(&ctx.block().name, PortType::Vector4, &expr);
        bind_swizzles(ctx, &vector)
    }
}

/// Splits the widest connected vector into components; narrower inputs
/// zero-fill
pub struct VectorSplitterBlock;

impl BlockDefinition for VectorSplitterBlock {
    fn class_name(&self) -> &'static str {
        "VectorSplitterBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Utility
    }

    fn description(&self) -> &'static str {
        "Split vectors into components"
    }

    fn register_ports(&self, block: &mut Block) {
        let xyzw = block.register_input("xyzw", PortType::Vector4, true, None);
        block.inputs[xyzw].accepted_types.push(PortType::Color4);
        let xyz = block.register_input("xyz", PortType::Vector3, true, None);
        block.inputs[xyz].accepted_types.push(PortType::Color3);
        block.register_input("xy", PortType::Vector2, true, None);

        for name in COMPONENTS {
            block.register_output(name, PortType::Float);
        }
        block.register_output("xy", PortType::Vector2);
        block.register_output("xyz", PortType::Vector3);
        block.register_output("zw", PortType::Vector2);
    }
}

impl ShaderBlock for VectorSplitterBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let Some(source) = ["xyzw", "xyz", "xy"].into_iter().find_map(|name| ctx.input(name)) else {
            return Ok(());
        };
        let expr = convert(state.language(), &source, PortType::Vector4, ZERO_FILL);
        let vector = state.declare(&ctx.block().name, PortType::Vector4, &expr);
        bind_swizzles(ctx, &vector)
    }
}

const TRANSFORM_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("complementZ", PropertyKind::Float, PropertyDefault::Float(0.0)),
    PropertyDescriptor::new("complementW", PropertyKind::Float, PropertyDefault::Float(1.0)),
];

/// `transform * vec4(vector, complementZ, complementW)`
pub struct TransformBlock;

impl BlockDefinition for TransformBlock {
    fn class_name(&self) -> &'static str {
        "TransformBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Transform
    }

    fn description(&self) -> &'static str {
        "Transform a vector by a matrix"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        TRANSFORM_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        let vector = block.register_input("vector", PortType::Vector4, false, None);
        block.inputs[vector].accepted_types.extend_from_slice(&[
            PortType::Vector2,
            PortType::Vector3,
            PortType::Color3,
            PortType::Color4,
        ]);
        block.register_input("transform", PortType::Matrix, false, None);
        block.register_output("output", PortType::Vector4);
        block.register_output("xyz", PortType::Vector3);
    }
}

impl ShaderBlock for TransformBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let block = ctx.block();
        let (Some(vector), Some(transform)) = (ctx.input("vector"), ctx.input("transform")) else {
            return Ok(());
        };
        let z = float_literal(block.property_float("complementZ", 0.0));
        let w = float_literal(block.property_float("complementW", 1.0));
        let widened = convert(state.language(), &vector, PortType::Vector4, [z.as_str(), w.as_str(), w.as_str()]);
        let expr = format!("{} * {widened}", transform.expr);
        let output = state.declare(&block.name, PortType::Vector4, &expr);
        ctx.set("xyz", ShaderValue::new(format!("{}.xyz", output.expr), PortType::Vector3))?;
        ctx.set("output", output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RenderConfig, ShaderLanguage};
    use crate::graphs::material::state::{ProgramInterface, ShaderStage};
    use crate::types::ResolvedTypes;

    fn emit(
        definition: &dyn ShaderBlock,
        inputs: &[(&str, ShaderValue)],
    ) -> (String, Block, Vec<Option<ShaderValue>>) {
        let mut block = Block::new(definition.class_name(), "v");
        for descriptor in definition.properties() {
            block
                .properties
                .insert(descriptor.name.to_string(), descriptor.default.to_value());
        }
        definition.register_ports(&mut block);
        let values = block
            .inputs
            .iter()
            .map(|port| {
                inputs
                    .iter()
                    .find(|(name, _)| *name == port.name)
                    .map(|(_, v)| v.clone())
            })
            .collect();
        let mut state = ShaderBuildState::new(
            ShaderStage::Vertex,
            RenderConfig::for_language(ShaderLanguage::Glsl),
            ProgramInterface::default(),
        );
        let types = ResolvedTypes::default();
        let mut ctx = ShaderBlockContext::new(&block, &types, values);
        definition.build(&mut state, &mut ctx).unwrap();
        let outputs = ctx.into_outputs();
        (state.finish().0.body, block, outputs)
    }

    fn output<'a>(block: &Block, outputs: &'a [Option<ShaderValue>], name: &str) -> Option<&'a ShaderValue> {
        let index = block.outputs.iter().position(|p| p.name == name)?;
        outputs[index].as_ref()
    }

    #[test]
    fn test_merger_from_xyz_sets_w_zero() {
        let (body, block, outputs) = emit(
            &VectorMergerBlock,
            &[("xyz", ShaderValue::new("p", PortType::Vector3))],
        );
        assert_eq!(body.trim(), "vec4 v = vec4(p, 0.0);");
        assert_eq!(output(&block, &outputs, "xy").unwrap().expr, "v.xy");
    }

    #[test]
    fn test_merger_from_components() {
        let (body, _, _) = emit(
            &VectorMergerBlock,
            &[
                ("x", ShaderValue::new("a", PortType::Float)),
                ("z", ShaderValue::new("b", PortType::Float)),
            ],
        );
        assert_eq!(body.trim(), "vec4 v = vec4(a, 0.0, b, 0.0);");

        let (body, block, outputs) = emit(&VectorMergerBlock, &[]);
        assert!(body.is_empty());
        assert!(output(&block, &outputs, "xyzw").is_none());
    }

    #[test]
    fn test_splitter_zero_fills() {
        let (body, block, outputs) = emit(
            &VectorSplitterBlock,
            &[("xy", ShaderValue::new("uv", PortType::Vector2))],
        );
        assert_eq!(body.trim(), "vec4 v = vec4(uv, 0.0, 0.0);");
        assert_eq!(output(&block, &outputs, "w").unwrap().expr, "v.w");
        assert_eq!(output(&block, &outputs, "zw").unwrap().port_type, PortType::Vector2);
    }

    #[test]
    fn test_transform_complements() {
        let (body, block, outputs) = emit(
            &TransformBlock,
            &[
                ("vector", ShaderValue::new("p", PortType::Vector3)),
                ("transform", ShaderValue::new("u_world", PortType::Matrix)),
            ],
        );
        assert_eq!(body.trim(), "vec4 v = u_world * vec4(p, 1.0);");
        assert_eq!(output(&block, &outputs, "xyz").unwrap().expr, "v.xyz");

        let (body, _, _) = emit(
            &TransformBlock,
            &[
                ("vector", ShaderValue::new("uv", PortType::Vector2)),
                ("transform", ShaderValue::new("m", PortType::Matrix)),
            ],
        );
        assert_eq!(body.trim(), "vec4 v = m * vec4(uv, 0.0, 1.0);");
    }
}
