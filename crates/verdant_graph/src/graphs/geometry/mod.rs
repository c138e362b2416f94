// SPDX-License-Identifier: MIT OR Apache-2.0
//! Procedural geometry graph.
//!
//! Each block publishes its outputs as either a literal value or a deferred
//! evaluator. Deferred outputs are re-run for every evaluation context
//! (vertex loops, instancing) unless the block's `evaluate_context` flag is
//! off, in which case they run once right after the block builds.

mod attributes;
mod instancing;
mod io;
mod logic;
mod math;
mod sources;
mod state;

pub use attributes::{SetAttributeBlock, VertexAttribute};
pub use instancing::{GeometryTransformBlock, InstantiateLinearBlock, MergeGeometryBlock};
pub use io::{GeometryInputBlock, GeometryOutputBlock};
pub use logic::{ConditionBlock, RandomLockMode, RandomNumberBlock};
pub use math::{
    GeometryClampBlock, GeometryDotBlock, GeometryLengthBlock, GeometryLerpBlock,
    GeometryMathBlock, GeometryModBlock, GeometrySmoothStepBlock, GeometryStepBlock,
    GeometryTrigonometryBlock, VectorConverterBlock,
};
pub use sources::{BoxBlock, PlaneBlock, SphereBlock};
pub use state::{
    ContextualSource, Evaluator, ExecutionContext, GeometryBlockContext, GeometryBuildState,
    Stored,
};

use crate::block::{Block, BlockId};
use crate::connection::ConnectionId;
use crate::evaluation::{BuildError, BuildPlan};
use crate::graph::{ConnectionError, Graph};
use crate::mesh::VertexData;
use crate::port::PortId;
use crate::property::PropertyValue;
use crate::registry::{BlockDefinition, BlockRegistry};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Class name of the block holding the graph result
pub const GEOMETRY_OUTPUT_CLASS: &str = "GeometryOutputBlock";

/// A block class that can build inside a geometry graph
pub trait GeometryBlock: BlockDefinition {
    /// Populate the block's outputs from its inputs.
    ///
    /// Not called when a required input is absent; the driver leaves every
    /// output empty instead.
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError>;
}

/// Create the geometry graph block registry with all available block classes
pub fn create_geometry_registry() -> BlockRegistry<dyn GeometryBlock> {
    let mut registry: BlockRegistry<dyn GeometryBlock> = BlockRegistry::new();

    // Inputs and outputs
    registry.register(Box::new(GeometryInputBlock));
    registry.register(Box::new(GeometryOutputBlock));

    // Sources
    registry.register(Box::new(BoxBlock));
    registry.register(Box::new(PlaneBlock));
    registry.register(Box::new(SphereBlock));

    // Vertex attributes
    registry.register(Box::new(SetAttributeBlock(VertexAttribute::Positions)));
    registry.register(Box::new(SetAttributeBlock(VertexAttribute::Normals)));
    registry.register(Box::new(SetAttributeBlock(VertexAttribute::Uvs)));

    // Transforms and instancing
    registry.register(Box::new(GeometryTransformBlock));
    registry.register(Box::new(MergeGeometryBlock));
    registry.register(Box::new(InstantiateLinearBlock));

    // Math
    registry.register(Box::new(GeometryMathBlock));
    registry.register(Box::new(GeometryModBlock));
    registry.register(Box::new(GeometryClampBlock));
    registry.register(Box::new(GeometryStepBlock));
    registry.register(Box::new(GeometrySmoothStepBlock));
    registry.register(Box::new(GeometryLerpBlock));
    registry.register(Box::new(GeometryTrigonometryBlock));
    registry.register(Box::new(GeometryLengthBlock));
    registry.register(Box::new(GeometryDotBlock));
    registry.register(Box::new(VectorConverterBlock));

    // Logic
    registry.register(Box::new(ConditionBlock));
    registry.register(Box::new(RandomNumberBlock));

    registry
}

/// A geometry graph and the registry its blocks come from
pub struct NodeGeometry {
    /// Blocks and connections
    pub graph: Graph,
    registry: BlockRegistry<dyn GeometryBlock>,
    output: BlockId,
}

impl NodeGeometry {
    /// Create an empty graph holding only an output block
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = Graph::new(name);
        let mut output = Block::new(GEOMETRY_OUTPUT_CLASS, "GeometryOutput");
        GeometryOutputBlock.register_ports(&mut output);
        let output = graph.add_block(output);
        Self {
            graph,
            registry: create_geometry_registry(),
            output,
        }
    }

    /// Wrap an existing graph, which must contain an output block
    pub fn from_graph(graph: Graph) -> Result<Self, BuildError> {
        let output = graph
            .find_block(GEOMETRY_OUTPUT_CLASS)
            .ok_or(BuildError::MissingOutputBlock(GEOMETRY_OUTPUT_CLASS))?
            .id;
        Ok(Self {
            graph,
            registry: create_geometry_registry(),
            output,
        })
    }

    /// The block registry
    pub fn registry(&self) -> &BlockRegistry<dyn GeometryBlock> {
        &self.registry
    }

    /// The output block
    pub fn output_block(&self) -> BlockId {
        self.output
    }

    /// Add a block of a registered class
    pub fn add_block(&mut self, class_name: &str) -> Result<BlockId, BuildError> {
        let block = self
            .registry
            .create_block(class_name)
            .ok_or_else(|| BuildError::UnknownBlockClass(class_name.to_string()))?;
        Ok(self.graph.add_block(block))
    }

    /// Connect an output to an input by name
    pub fn connect(
        &mut self,
        from_block: BlockId,
        output: &str,
        to_block: BlockId,
        input: &str,
    ) -> Result<ConnectionId, ConnectionError> {
        self.graph.connect_named(from_block, output, to_block, input)
    }

    /// Set a declared property
    pub fn set_property(
        &mut self,
        block_id: BlockId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), BuildError> {
        let registry = &self.registry;
        self.graph
            .update_block(block_id, |block| registry.set_property(block, name, value))
            .ok_or(BuildError::BlockNotFound(block_id))??;
        Ok(())
    }

    /// Choose whether a block's outputs are re-evaluated per context
    pub fn set_evaluate_context(&mut self, block_id: BlockId, enabled: bool) -> Result<(), BuildError> {
        self.graph
            .update_block(block_id, |block| block.evaluate_context = enabled)
            .ok_or(BuildError::BlockNotFound(block_id))
    }

    /// Evaluate the graph into a mesh; `None` when the output is absent
    pub fn build(&self) -> Result<Option<VertexData>, BuildError> {
        tracing::debug!("Building geometry graph '{}'", self.graph.name);
        let plan = BuildPlan::new(&self.graph, self.output)?;
        let built = self.build_outputs(&plan)?;

        let output = self
            .graph
            .block(self.output)
            .ok_or(BuildError::BlockNotFound(self.output))?;
        let geometry = self
            .input_sources(output, &built)
            .first()
            .and_then(|stored| stored.get(&GeometryBuildState::new()));

        match geometry {
            Some(Value::Geometry(mesh)) => {
                let mesh = Arc::unwrap_or_clone(mesh);
                tracing::debug!(
                    "Geometry graph '{}' produced {} vertices, {} faces",
                    self.graph.name,
                    mesh.vertex_count(),
                    mesh.face_count()
                );
                Ok(Some(mesh))
            }
            _ => {
                tracing::warn!("Geometry graph '{}' produced no geometry", self.graph.name);
                Ok(None)
            }
        }
    }

    /// Evaluate one output of a block outside any context
    pub fn evaluate(&self, block_id: BlockId, output: &str) -> Result<Option<Value>, BuildError> {
        let plan = BuildPlan::new(&self.graph, block_id)?;
        let port = self
            .graph
            .block(block_id)
            .and_then(|b| b.output(output))
            .ok_or_else(|| BuildError::Custom(format!("Unknown output: {output}")))?;
        let built = self.build_outputs(&plan)?;
        Ok(built
            .get(&port.id)
            .and_then(|stored| stored.get(&GeometryBuildState::new())))
    }

    fn build_outputs(&self, plan: &BuildPlan) -> Result<HashMap<PortId, Stored>, BuildError> {
        let mut built: HashMap<PortId, Stored> = HashMap::new();

        for block_id in &plan.order {
            let block = self
                .graph
                .block(*block_id)
                .ok_or(BuildError::BlockNotFound(*block_id))?;
            let definition = self
                .registry
                .get(&block.class_name)
                .ok_or_else(|| BuildError::UnknownBlockClass(block.class_name.clone()))?;

            let inputs = self.input_sources(block, &built);
            let missing = block
                .inputs
                .iter()
                .zip(&inputs)
                .find(|(port, stored)| !port.optional && !stored.is_present());
            if let Some((port, _)) = missing {
                tracing::debug!(
                    "{} ({}) has no value for input '{}', outputs left empty",
                    block.name,
                    block.class_name,
                    port.name
                );
                for output in &block.outputs {
                    built.insert(output.id, Stored::Empty);
                }
                continue;
            }

            let mut ctx = GeometryBlockContext::new(block, &plan.types, inputs);
            definition.build(&mut ctx)?;

            for (port, stored) in block.outputs.iter().zip(ctx.into_outputs()) {
                let stored = if block.evaluate_context {
                    stored
                } else {
                    stored.freeze(&GeometryBuildState::new())
                };
                built.insert(port.id, stored);
            }
        }

        Ok(built)
    }

    fn input_sources(&self, block: &Block, built: &HashMap<PortId, Stored>) -> Vec<Stored> {
        block
            .inputs
            .iter()
            .map(|port| match self.graph.connected_point(port.id) {
                Some(source) => built.get(&source).cloned().unwrap_or_default(),
                None => port
                    .default_value
                    .clone()
                    .map_or(Stored::Empty, Stored::Literal),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_input(geometry: &mut NodeGeometry, value: [f64; 3]) -> BlockId {
        let id = geometry.add_block("GeometryInputBlock").unwrap();
        geometry
            .set_property(id, "value", PropertyValue::Value(Value::Vector3(value)))
            .unwrap();
        id
    }

    fn float_input(geometry: &mut NodeGeometry, value: f64) -> BlockId {
        let id = geometry.add_block("GeometryInputBlock").unwrap();
        geometry
            .set_property(id, "value", PropertyValue::Float(value))
            .unwrap();
        id
    }

    #[test]
    fn test_registry_covers_all_classes() {
        let registry = create_geometry_registry();
        for class in [
            "BoxBlock",
            "SetPositionsBlock",
            "SetUVsBlock",
            "InstantiateLinearBlock",
            "GeometryClampBlock",
            "RandomNumberBlock",
            "VectorConverterBlock",
        ] {
            assert!(registry.get(class).is_some(), "{class} missing");
        }
        assert_eq!(registry.definitions().count(), 23);
    }

    #[test]
    fn test_empty_graph_builds_nothing() {
        let geometry = NodeGeometry::new("empty");
        assert_eq!(geometry.build().unwrap(), None);
    }

    #[test]
    fn test_box_to_output() {
        let mut geometry = NodeGeometry::new("box");
        let cube = geometry.add_block("BoxBlock").unwrap();
        let output = geometry.output_block();
        geometry.connect(cube, "geometry", output, "geometry").unwrap();

        let mesh = geometry.build().unwrap().unwrap();
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.face_count(), 12);
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, [-0.5, -0.5, -0.5]);
        assert_eq!(max, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_clamp_example() {
        let mut geometry = NodeGeometry::new("clamp");
        let value = vector_input(&mut geometry, [-1.0, 2.0, 0.5]);
        let clamp = geometry.add_block("GeometryClampBlock").unwrap();
        geometry
            .set_property(clamp, "minimum", PropertyValue::Float(0.0))
            .unwrap();
        geometry
            .set_property(clamp, "maximum", PropertyValue::Float(1.0))
            .unwrap();
        geometry.connect(value, "output", clamp, "value").unwrap();

        assert_eq!(
            geometry.evaluate(clamp, "output").unwrap(),
            Some(Value::Vector3([0.0, 1.0, 0.5]))
        );
    }

    #[test]
    fn test_retyped_output_drops_incompatible_links() {
        let mut geometry = NodeGeometry::new("retype");
        let value = float_input(&mut geometry, 2.0);
        let condition = geometry.add_block("ConditionBlock").unwrap();
        geometry.connect(value, "output", condition, "left").unwrap();

        geometry
            .set_property(value, "value", PropertyValue::Value(Value::Float(3.0)))
            .unwrap();
        assert_eq!(geometry.graph.connection_count(), 1);

        geometry
            .set_property(value, "value", PropertyValue::Value(Value::Vector3([1.0, 2.0, 3.0])))
            .unwrap();
        let left = geometry.graph.block(condition).unwrap().input("left").unwrap().id;
        assert!(!geometry.graph.is_connected(left));
        assert_eq!(geometry.graph.connection_count(), 0);
    }

    #[test]
    fn test_step_example() {
        for (input, expected) in [(0.3, 0.0), (0.7, 1.0)] {
            let mut geometry = NodeGeometry::new("step");
            let value = float_input(&mut geometry, input);
            let step = geometry.add_block("GeometryStepBlock").unwrap();
            geometry.connect(value, "output", step, "value").unwrap();
            assert_eq!(
                geometry.evaluate(step, "output").unwrap(),
                Some(Value::Float(expected))
            );
        }
    }

    #[test]
    fn test_unconnected_required_input_is_absent() {
        let mut geometry = NodeGeometry::new("absent");
        let math = geometry.add_block("GeometryMathBlock").unwrap();
        let value = float_input(&mut geometry, 2.0);
        geometry.connect(value, "output", math, "left").unwrap();
        assert_eq!(geometry.evaluate(math, "output").unwrap(), None);

        // Absence flows downstream instead of turning into zero
        let trig = geometry.add_block("GeometryTrigonometryBlock").unwrap();
        geometry.connect(math, "output", trig, "input").unwrap();
        assert_eq!(geometry.evaluate(trig, "output").unwrap(), None);
    }

    #[test]
    fn test_mod_uses_literal_fallback() {
        let mut geometry = NodeGeometry::new("mod");
        let value = float_input(&mut geometry, 3.5);
        let modulo = geometry.add_block("GeometryModBlock").unwrap();
        geometry.connect(value, "output", modulo, "left").unwrap();
        assert_eq!(
            geometry.evaluate(modulo, "output").unwrap(),
            Some(Value::Float(0.5))
        );
    }

    #[test]
    fn test_set_positions_per_vertex() {
        let mut geometry = NodeGeometry::new("offset");
        let plane = geometry.add_block("PlaneBlock").unwrap();
        let positions = geometry.add_block("GeometryInputBlock").unwrap();
        geometry
            .set_property(positions, "contextual", PropertyValue::Text("Positions".into()))
            .unwrap();
        let lift = vector_input(&mut geometry, [0.0, 2.0, 0.0]);
        let add = geometry.add_block("GeometryMathBlock").unwrap();
        let set = geometry.add_block("SetPositionsBlock").unwrap();
        let output = geometry.output_block();

        geometry.connect(positions, "output", add, "left").unwrap();
        geometry.connect(lift, "output", add, "right").unwrap();
        geometry.connect(plane, "geometry", set, "geometry").unwrap();
        geometry.connect(add, "output", set, "positions").unwrap();
        geometry.connect(set, "output", output, "geometry").unwrap();

        let mesh = geometry.build().unwrap().unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert!((0..4).all(|i| mesh.position(i)[1] == 2.0));
    }

    #[test]
    fn test_evaluate_context_off_freezes_value() {
        let mut geometry = NodeGeometry::new("instances");
        let plane = geometry.add_block("PlaneBlock").unwrap();
        let instance_id = geometry.add_block("GeometryInputBlock").unwrap();
        geometry
            .set_property(instance_id, "contextual", PropertyValue::Text("InstanceID".into()))
            .unwrap();
        let to_size = geometry.add_block("GeometryMathBlock").unwrap();
        let one = geometry.add_block("GeometryInputBlock").unwrap();
        geometry
            .set_property(one, "value", PropertyValue::Int(1))
            .unwrap();
        let instances = geometry.add_block("InstantiateLinearBlock").unwrap();
        let output = geometry.output_block();

        geometry.connect(instance_id, "output", to_size, "left").unwrap();
        geometry.connect(one, "output", to_size, "right").unwrap();
        geometry.connect(to_size, "output", plane, "size").unwrap();
        geometry.connect(plane, "geometry", instances, "instance").unwrap();
        geometry.connect(instances, "output", output, "geometry").unwrap();

        // Sources are frozen by default: outside any instance the size is absent
        assert_eq!(geometry.build().unwrap(), None);

        geometry.set_evaluate_context(plane, true).unwrap();
        let mesh = geometry.build().unwrap().unwrap();
        assert_eq!(mesh.vertex_count(), 40);
        let (min, max) = mesh.bounds().unwrap();
        // Instance 9 has size 10 and sits at x = 9
        assert_eq!(max[0], 9.0 + 5.0);
        assert_eq!(min[0], -0.5);
    }
}
