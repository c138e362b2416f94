// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block definitions for the graph framework.

use crate::port::{Port, PortDirection, PortId, PortType};
use crate::property::PropertyValue;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub Uuid);

impl BlockId {
    /// Create a new random block ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

/// Block category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockCategory {
    /// Input blocks (constants, uniforms, contextual values)
    Input,
    /// Output blocks (graph results)
    Output,
    /// Math operations
    Math,
    /// Procedural mesh sources
    Source,
    /// Geometry and vector transforms
    Transform,
    /// Texture sampling
    Texture,
    /// Logic/flow control
    Logic,
    /// Utility blocks
    Utility,
}

/// A block instance in the graph
#[derive(Debug, Clone)]
pub struct Block {
    /// Unique instance ID
    pub id: BlockId,
    /// Registered class name
    pub class_name: String,
    /// Display name (can be customized)
    pub name: String,
    /// Position in an authoring tool
    pub position: [f32; 2],
    /// Input ports
    pub inputs: Vec<Port>,
    /// Output ports
    pub outputs: Vec<Port>,
    /// Declared property values
    pub properties: IndexMap<String, PropertyValue>,
    /// Re-run deferred outputs for every evaluation context
    pub evaluate_context: bool,
}

impl Block {
    /// Create an empty block with a fresh ID
    pub fn new(class_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_id(BlockId::new(), class_name, name)
    }

    /// Create an empty block with a known ID
    pub fn with_id(id: BlockId, class_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            class_name: class_name.into(),
            name: name.into(),
            position: [0.0, 0.0],
            inputs: Vec::new(),
            outputs: Vec::new(),
            properties: IndexMap::new(),
            evaluate_context: true,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = [x, y];
        self
    }

    /// Declare an input port, returning its index
    pub fn register_input(
        &mut self,
        name: impl Into<String>,
        port_type: PortType,
        optional: bool,
        default_value: Option<Value>,
    ) -> usize {
        let mut port = Port::input(self.id, name, port_type);
        port.optional = optional;
        port.default_value = default_value;
        self.inputs.push(port);
        self.inputs.len() - 1
    }

    /// Declare an output port, returning its index
    pub fn register_output(&mut self, name: impl Into<String>, port_type: PortType) -> usize {
        self.outputs.push(Port::output(self.id, name, port_type));
        self.outputs.len() - 1
    }

    /// Share the auto-detected type of two inputs
    pub fn link_input_types(&mut self, a: usize, b: usize) {
        self.inputs[a].linked_input = Some(b);
        self.inputs[b].linked_input = Some(a);
    }

    /// Make an output follow the type of an input
    pub fn output_type_from(&mut self, output: usize, input: usize) {
        let port = &mut self.outputs[output];
        port.port_type = PortType::BasedOnInput;
        port.type_source = Some(input);
    }

    /// Get an input port by name
    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Get a mutable input port by name
    pub fn input_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.inputs.iter_mut().find(|p| p.name == name)
    }

    /// Get an output port by name
    pub fn output(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Get a mutable output port by name
    pub fn output_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.outputs.iter_mut().find(|p| p.name == name)
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == port_id)
    }

    /// Locate a port by ID: direction and index
    pub fn port_position(&self, port_id: PortId) -> Option<(PortDirection, usize)> {
        if let Some(i) = self.inputs.iter().position(|p| p.id == port_id) {
            return Some((PortDirection::Input, i));
        }
        self.outputs
            .iter()
            .position(|p| p.id == port_id)
            .map(|i| (PortDirection::Output, i))
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Get a property value
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Numeric property, `fallback` when absent
    pub fn property_float(&self, name: &str, fallback: f64) -> f64 {
        self.property(name)
            .and_then(PropertyValue::as_float)
            .unwrap_or(fallback)
    }

    /// Boolean property, `fallback` when absent
    pub fn property_bool(&self, name: &str, fallback: bool) -> bool {
        self.property(name)
            .and_then(PropertyValue::as_bool)
            .unwrap_or(fallback)
    }

    /// Text property, empty when absent
    pub fn property_text(&self, name: &str) -> &str {
        self.property(name)
            .and_then(PropertyValue::as_text)
            .unwrap_or_default()
    }
}
