// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader inputs and the two stage outputs.

use super::state::{convert, shader_type, ShaderBlockContext, ShaderBuildState, ShaderValue};
use super::ShaderBlock;
use crate::block::{Block, BlockCategory};
use crate::config::ShaderLanguage;
use crate::evaluation::BuildError;
use crate::port::PortType;
use crate::property::{PropertyDefault, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::registry::BlockDefinition;
use crate::value::Value;

/// Where an input block's value comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputMode {
    /// Literal baked into the code
    #[default]
    Constant,
    /// Uniform named after the block
    Uniform,
    /// Per-vertex attribute (varying in the fragment stage)
    Attribute,
    /// Engine-provided uniform
    SystemValue,
}

impl InputMode {
    /// Choice names
    pub const NAMES: &'static [&'static str] = &["Constant", "Uniform", "Attribute", "SystemValue"];

    /// Parse a choice name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Constant" => Self::Constant,
            "Uniform" => Self::Uniform,
            "Attribute" => Self::Attribute,
            "SystemValue" => Self::SystemValue,
            _ => return None,
        })
    }
}

/// Mesh attributes an input block can read
pub const ATTRIBUTES: &[&str] = &["position", "normal", "uv", "color"];

fn attribute_type(name: &str) -> PortType {
    match name {
        "uv" => PortType::Vector2,
        "color" => PortType::Color4,
        _ => PortType::Vector3,
    }
}

/// Engine-provided values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemValue {
    /// World matrix
    World,
    /// View matrix
    View,
    /// Projection matrix
    Projection,
    /// View * projection
    ViewProjection,
    /// World * view * projection
    #[default]
    WorldViewProjection,
    /// Camera position in world space
    CameraPosition,
    /// Seconds since start
    Time,
}

impl SystemValue {
    /// Choice names
    pub const NAMES: &'static [&'static str] = &[
        "World",
        "View",
        "Projection",
        "ViewProjection",
        "WorldViewProjection",
        "CameraPosition",
        "Time",
    ];

    const ALL: [Self; 7] = [
        Self::World,
        Self::View,
        Self::Projection,
        Self::ViewProjection,
        Self::WorldViewProjection,
        Self::CameraPosition,
        Self::Time,
    ];

    /// Whether `name` is the uniform of a system value
    pub fn is_uniform_name(name: &str) -> bool {
        Self::ALL.iter().any(|system| system.uniform_name() == name)
    }

    /// Parse a choice name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
    }

    /// Uniform name
    pub fn uniform_name(self) -> &'static str {
        match self {
            Self::World => "u_world",
            Self::View => "u_view",
            Self::Projection => "u_projection",
            Self::ViewProjection => "u_view_projection",
            Self::WorldViewProjection => "u_world_view_projection",
            Self::CameraPosition => "u_camera_position",
            Self::Time => "u_time",
        }
    }

    /// Type of the value
    pub fn port_type(self) -> PortType {
        match self {
            Self::CameraPosition => PortType::Vector3,
            Self::Time => PortType::Float,
            _ => PortType::Matrix,
        }
    }
}

const INPUT_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new(
        "mode",
        PropertyKind::Choice(InputMode::NAMES),
        PropertyDefault::Text("Constant"),
    ),
    PropertyDescriptor::new("value", PropertyKind::Value, PropertyDefault::Scalar(0.0)),
    PropertyDescriptor::new(
        "attribute",
        PropertyKind::Choice(ATTRIBUTES),
        PropertyDefault::Text("position"),
    ),
    PropertyDescriptor::new(
        "system_value",
        PropertyKind::Choice(SystemValue::NAMES),
        PropertyDefault::Text("WorldViewProjection"),
    ),
];

/// Constant, uniform, mesh attribute or system value
pub struct InputBlock;

impl InputBlock {
    fn mode(block: &Block) -> InputMode {
        InputMode::from_name(block.property_text("mode")).unwrap_or_default()
    }

    fn value(block: &Block) -> Option<&Value> {
        block.property("value").and_then(PropertyValue::as_value)
    }

    fn output_type(block: &Block) -> PortType {
        match Self::mode(block) {
            InputMode::Constant | InputMode::Uniform => {
                Self::value(block).map_or(PortType::Float, |v| shader_type(v.port_type()))
            }
            InputMode::Attribute => attribute_type(block.property_text("attribute")),
            InputMode::SystemValue => SystemValue::from_name(block.property_text("system_value"))
                .unwrap_or_default()
                .port_type(),
        }
    }
}

impl BlockDefinition for InputBlock {
    fn class_name(&self) -> &'static str {
        "InputBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Input
    }

    fn description(&self) -> &'static str {
        "Constant, uniform, attribute or system value"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        INPUT_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        block.register_output("output", PortType::Float);
    }

    fn update_ports(&self, block: &mut Block) {
        let port_type = Self::output_type(block);
        if let Some(output) = block.outputs.first_mut() {
            output.port_type = port_type;
            output.default_type = port_type;
        }
    }
}

impl ShaderBlock for InputBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let block = ctx.block();
        let port_type = Self::output_type(block);
        let value = match Self::mode(block) {
            InputMode::Constant => match Self::value(block).and_then(|v| ShaderValue::literal(v, state.language())) {
                Some(literal) => literal,
                None => return Ok(()),
            },
            InputMode::Uniform => state.block_uniform(block, port_type)?,
            InputMode::Attribute => state.attribute(block.property_text("attribute"), port_type),
            InputMode::SystemValue => {
                let system = SystemValue::from_name(block.property_text("system_value")).unwrap_or_default();
                state.uniform(system.uniform_name(), port_type)?
            }
        };
        ctx.set("output", value)
    }
}

/// Clip-space position of the vertex stage
pub struct VertexOutputBlock;

impl BlockDefinition for VertexOutputBlock {
    fn class_name(&self) -> &'static str {
        super::VERTEX_OUTPUT_CLASS
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Output
    }

    fn description(&self) -> &'static str {
        "Vertex stage output"
    }

    fn register_ports(&self, block: &mut Block) {
        let vector = block.register_input("vector", PortType::Vector4, false, None);
        block.inputs[vector]
            .accepted_types
            .extend_from_slice(&[PortType::Vector3, PortType::Color3, PortType::Color4]);
    }
}

impl ShaderBlock for VertexOutputBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        if let Some(vector) = ctx.input("vector") {
            let position = convert(state.language(), &vector, PortType::Vector4, ["0.0", "1.0", "1.0"]);
            state.set_result(position);
        }
        Ok(())
    }
}

/// Final color of the fragment stage
pub struct FragmentOutputBlock;

impl BlockDefinition for FragmentOutputBlock {
    fn class_name(&self) -> &'static str {
        super::FRAGMENT_OUTPUT_CLASS
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Output
    }

    fn description(&self) -> &'static str {
        "Fragment stage output"
    }

    fn register_ports(&self, block: &mut Block) {
        let rgba = block.register_input("rgba", PortType::Color4, true, None);
        block.inputs[rgba].accepted_types.push(PortType::Vector4);
        let rgb = block.register_input("rgb", PortType::Color3, true, None);
        block.inputs[rgb].accepted_types.push(PortType::Vector3);
        let a = block.register_input("a", PortType::Float, true, None);
        block.inputs[a].accepted_types.push(PortType::Int);
    }
}

impl ShaderBlock for FragmentOutputBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let vec4 = match state.language() {
            ShaderLanguage::Glsl => "vec4",
            ShaderLanguage::Wgsl => "vec4<f32>",
        };
        let color = if let Some(rgba) = ctx.input("rgba") {
            rgba.expr
        } else if let Some(rgb) = ctx.input("rgb") {
            let alpha = ctx.input("a").map_or_else(|| "1.0".to_string(), |a| a.expr);
            format!("{vec4}({}, {alpha})", rgb.expr)
        } else {
            tracing::warn!(
                "{} has no color input, writing opaque black",
                ctx.block().name
            );
            format!("{vec4}(0.0, 0.0, 0.0, 1.0)")
        };
        state.set_result(color);
        Ok(())
    }
}
