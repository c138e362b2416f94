// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph inputs and the output block.

use super::state::{ContextualSource, GeometryBlockContext, Stored};
use super::GeometryBlock;
use crate::block::{Block, BlockCategory};
use crate::evaluation::BuildError;
use crate::port::PortType;
use crate::property::{PropertyDefault, PropertyDescriptor, PropertyKind, PropertyValue};
use crate::registry::BlockDefinition;
use crate::value::Value;

const INPUT_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("value", PropertyKind::Value, PropertyDefault::Scalar(0.0)),
    PropertyDescriptor::new(
        "contextual",
        PropertyKind::Choice(ContextualSource::NAMES),
        PropertyDefault::Text("None"),
    ),
];

/// Constant value or a contextual value of the current vertex/instance
pub struct GeometryInputBlock;

impl GeometryInputBlock {
    fn contextual(block: &Block) -> Option<ContextualSource> {
        ContextualSource::from_name(block.property_text("contextual"))
    }
}

impl BlockDefinition for GeometryInputBlock {
    fn class_name(&self) -> &'static str {
        "GeometryInputBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Input
    }

    fn description(&self) -> &'static str {
        "Constant or contextual value"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        INPUT_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        block.register_output("output", PortType::Float);
    }

    fn update_ports(&self, block: &mut Block) {
        let port_type = match Self::contextual(block) {
            Some(source) => source.port_type(),
            None => block
                .property("value")
                .and_then(PropertyValue::as_value)
                .map_or(PortType::Float, Value::port_type),
        };
        if let Some(output) = block.outputs.first_mut() {
            output.port_type = port_type;
            output.default_type = port_type;
        }
    }
}

impl GeometryBlock for GeometryInputBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let block = ctx.block();
        match Self::contextual(block) {
            Some(source) => ctx.set_deferred("output", move |state| state.contextual_value(source)),
            None => {
                let value = block.property("value").and_then(PropertyValue::as_value);
                ctx.set("output", value.cloned().map_or(Stored::Empty, Stored::Literal))
            }
        }
    }
}

/// Receives the graph result
pub struct GeometryOutputBlock;

impl BlockDefinition for GeometryOutputBlock {
    fn class_name(&self) -> &'static str {
        super::GEOMETRY_OUTPUT_CLASS
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Output
    }

    fn description(&self) -> &'static str {
        "Final geometry of the graph"
    }

    fn register_ports(&self, block: &mut Block) {
        block.register_input("geometry", PortType::Geometry, false, None);
    }
}

impl GeometryBlock for GeometryOutputBlock {
    fn build(&self, _ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        Ok(())
    }
}
