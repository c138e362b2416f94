// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted form of geometry and shader graphs.
//!
//! Blocks are stored by class name with their declared properties only.
//! Ports are rebuilt by the block class on load and connections are restored
//! by port name.

use crate::block::{Block, BlockId};
use crate::evaluation::BuildError;
use crate::graph::{ConnectionError, Graph};
use crate::graphs::geometry::{GeometryBlock, NodeGeometry};
use crate::graphs::material::{NodeMaterial, ShaderBlock};
use crate::property::{PropertyError, PropertyValue};
use crate::registry::{BlockDefinition, BlockRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Current format version
pub const FORMAT_VERSION: u32 = 1;

/// Which evaluator a graph belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphKind {
    /// Procedural geometry
    Geometry,
    /// Shader material
    Material,
}

/// Source of a connected input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedLink {
    /// Input port name on the owning block
    pub input: String,
    /// Source block
    pub block: BlockId,
    /// Output port name on the source block
    pub output: String,
}

/// A persisted block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedBlock {
    /// Instance ID
    pub id: BlockId,
    /// Registered class name
    pub class_name: String,
    /// Display name
    pub name: String,
    /// Position in an authoring tool
    #[serde(default)]
    pub position: [f32; 2],
    /// Re-evaluate per context (geometry graphs)
    #[serde(default = "default_true")]
    pub evaluate_context: bool,
    /// Declared property values
    #[serde(default)]
    pub properties: IndexMap<String, PropertyValue>,
    /// Connected inputs
    #[serde(default)]
    pub inputs: Vec<SerializedLink>,
}

fn default_true() -> bool {
    true
}

/// A persisted graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    /// Format version
    pub format_version: u32,
    /// Evaluator the graph belongs to
    pub kind: GraphKind,
    /// Graph name
    pub name: String,
    /// Blocks, in graph order
    pub blocks: Vec<SerializedBlock>,
}

/// Error when saving or loading a graph
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    /// RON encoding failed
    #[error("RON serialization error: {0}")]
    RonEncode(#[from] ron::Error),

    /// RON decoding failed
    #[error("RON parse error: {0}")]
    RonDecode(#[from] ron::error::SpannedError),

    /// JSON codec failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary codec failed
    #[error("Binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    /// Data written by a newer version
    #[error("Unsupported format version {found} (supported up to {supported})")]
    UnsupportedVersion {
        /// Version in the data
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// Graph is of another kind
    #[error("Expected a {expected:?} graph, found {found:?}")]
    WrongKind {
        /// Kind the caller asked for
        expected: GraphKind,
        /// Kind stored in the data
        found: GraphKind,
    },

    /// Block class not in the registry
    #[error("Unknown block class: {0}")]
    UnknownClass(String),

    /// Property value rejected by its descriptor
    #[error("Invalid property on {block}: {source}")]
    Property {
        /// Block name
        block: String,
        /// Descriptor error
        source: PropertyError,
    },

    /// A connection could not be restored
    #[error("Cannot restore connection {block}.{input}: {source}")]
    Connection {
        /// Target block name
        block: String,
        /// Target input name
        input: String,
        /// Connection error
        source: ConnectionError,
    },

    /// Restored graph is not a valid graph of its kind
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl SerializedGraph {
    /// Capture a graph; only properties the block class declares are kept
    pub fn capture<D: BlockDefinition + ?Sized>(
        graph: &Graph,
        kind: GraphKind,
        registry: &BlockRegistry<D>,
    ) -> Self {
        let blocks = graph
            .blocks()
            .map(|block| SerializedBlock {
                id: block.id,
                class_name: block.class_name.clone(),
                name: block.name.clone(),
                position: block.position,
                evaluate_context: block.evaluate_context,
                properties: declared_properties(block, registry),
                inputs: links(graph, block),
            })
            .collect();
        Self {
            format_version: FORMAT_VERSION,
            kind,
            name: graph.name.clone(),
            blocks,
        }
    }

    /// Rebuild the graph with a registry
    pub fn restore<D: BlockDefinition + ?Sized>(
        &self,
        registry: &BlockRegistry<D>,
    ) -> Result<Graph, SerializationError> {
        if self.format_version > FORMAT_VERSION {
            return Err(SerializationError::UnsupportedVersion {
                found: self.format_version,
                supported: FORMAT_VERSION,
            });
        }

        let mut graph = Graph::new(self.name.clone());
        for saved in &self.blocks {
            let mut block = registry
                .create_block_with_id(&saved.class_name, saved.id)
                .ok_or_else(|| SerializationError::UnknownClass(saved.class_name.clone()))?;
            block.name = saved.name.clone();
            block.position = saved.position;
            block.evaluate_context = saved.evaluate_context;

            for (name, value) in &saved.properties {
                match registry.set_property(&mut block, name, value.clone()) {
                    Ok(()) => {}
                    Err(PropertyError::Unknown(_)) => {
                        tracing::warn!(
                            "Skipping unknown property '{}' on {} ({})",
                            name,
                            saved.name,
                            saved.class_name
                        );
                    }
                    Err(source) => {
                        return Err(SerializationError::Property {
                            block: saved.name.clone(),
                            source,
                        });
                    }
                }
            }
            graph.add_block(block);
        }

        for saved in &self.blocks {
            for link in &saved.inputs {
                graph
                    .connect_named(link.block, &link.output, saved.id, &link.input)
                    .map_err(|source| SerializationError::Connection {
                        block: saved.name.clone(),
                        input: link.input.clone(),
                        source,
                    })?;
            }
        }

        tracing::debug!(
            "Restored graph '{}': {} blocks, {} connections",
            graph.name,
            graph.block_count(),
            graph.connection_count()
        );
        Ok(graph)
    }

    fn expect_kind(&self, expected: GraphKind) -> Result<(), SerializationError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(SerializationError::WrongKind {
                expected,
                found: self.kind,
            })
        }
    }

    /// Pretty RON
    pub fn to_ron(&self) -> Result<String, SerializationError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Parse RON
    pub fn from_ron(s: &str) -> Result<Self, SerializationError> {
        Ok(ron::from_str(s)?)
    }

    /// Pretty JSON
    pub fn to_json(&self) -> Result<String, SerializationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON
    pub fn from_json(s: &str) -> Result<Self, SerializationError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Compact binary form
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
        Ok(bincode::serialize(self)?)
    }

    /// Parse the binary form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

fn declared_properties<D: BlockDefinition + ?Sized>(
    block: &Block,
    registry: &BlockRegistry<D>,
) -> IndexMap<String, PropertyValue> {
    let Some(definition) = registry.get(&block.class_name) else {
        return IndexMap::new();
    };
    definition
        .properties()
        .iter()
        .filter_map(|d| Some((d.name.to_string(), block.property(d.name)?.clone())))
        .collect()
}

fn links(graph: &Graph, block: &Block) -> Vec<SerializedLink> {
    block
        .inputs
        .iter()
        .filter_map(|input| {
            let source = graph.connected_point(input.id)?;
            let location = graph.locate(source)?;
            let output = graph.port(source)?;
            Some(SerializedLink {
                input: input.name.clone(),
                block: location.block,
                output: output.name.clone(),
            })
        })
        .collect()
}

impl NodeGeometry {
    /// Persisted form of the graph
    pub fn to_serialized(&self) -> SerializedGraph {
        SerializedGraph::capture(&self.graph, GraphKind::Geometry, self.registry())
    }

    /// Rebuild from a persisted geometry graph
    pub fn from_serialized(data: &SerializedGraph) -> Result<Self, SerializationError> {
        data.expect_kind(GraphKind::Geometry)?;
        let registry = crate::graphs::geometry::create_geometry_registry();
        let graph = data.restore::<dyn GeometryBlock>(&registry)?;
        Ok(Self::from_graph(graph)?)
    }
}

impl NodeMaterial {
    /// Persisted form of the graph
    pub fn to_serialized(&self) -> SerializedGraph {
        SerializedGraph::capture(&self.graph, GraphKind::Material, self.registry())
    }

    /// Rebuild from a persisted material graph
    pub fn from_serialized(data: &SerializedGraph) -> Result<Self, SerializationError> {
        data.expect_kind(GraphKind::Material)?;
        let registry = crate::graphs::material::create_material_registry();
        let graph = data.restore::<dyn ShaderBlock>(&registry)?;
        Ok(Self::from_graph(graph)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::value::Value;

    fn sample_geometry() -> NodeGeometry {
        let mut geometry = NodeGeometry::new("saved");
        let sphere = geometry.add_block("SphereBlock").unwrap();
        let transform = geometry.add_block("GeometryTransformBlock").unwrap();
        let offset = geometry.add_block("GeometryInputBlock").unwrap();
        geometry
            .set_property(offset, "value", PropertyValue::Value(Value::Vector3([0.0, 1.0, 0.0])))
            .unwrap();
        geometry.set_evaluate_context(offset, false).unwrap();
        geometry.connect(sphere, "geometry", transform, "value").unwrap();
        geometry.connect(offset, "output", transform, "translation").unwrap();
        let output = geometry.output_block();
        geometry.connect(transform, "output", output, "geometry").unwrap();
        geometry
    }

    #[test]
    fn test_round_trip_all_codecs() {
        let geometry = sample_geometry();
        let saved = geometry.to_serialized();

        let ron = SerializedGraph::from_ron(&saved.to_ron().unwrap()).unwrap();
        let json = SerializedGraph::from_json(&saved.to_json().unwrap()).unwrap();
        let binary = SerializedGraph::from_bytes(&saved.to_bytes().unwrap()).unwrap();
        assert_eq!(ron, saved);
        assert_eq!(json, saved);
        assert_eq!(binary, saved);
    }

    #[test]
    fn test_restored_geometry_builds_the_same_mesh() {
        let geometry = sample_geometry();
        let restored = NodeGeometry::from_serialized(&geometry.to_serialized()).unwrap();
        assert_eq!(restored.graph.block_count(), geometry.graph.block_count());
        assert_eq!(restored.graph.connection_count(), 3);
        assert_eq!(restored.build().unwrap(), geometry.build().unwrap());

        let offset = restored
            .graph
            .find_block("GeometryInputBlock")
            .unwrap();
        assert!(!offset.evaluate_context);
        assert_eq!(offset.outputs[0].port_type, crate::port::PortType::Vector3);
    }

    #[test]
    fn test_restored_material_compiles_the_same() {
        let mut material = NodeMaterial::new("saved");
        let texture = material.add_block("TextureBlock").unwrap();
        material
            .set_property(texture, "texture", PropertyValue::Text("wood.ktx".into()))
            .unwrap();
        let output = material.fragment_output();
        material.connect(texture, "rgba", output, "rgba").unwrap();

        let text = material.to_serialized().to_ron().unwrap();
        let restored = NodeMaterial::from_serialized(&SerializedGraph::from_ron(&text).unwrap()).unwrap();
        let config = RenderConfig::default();
        assert_eq!(restored.compile(&config).unwrap(), material.compile(&config).unwrap());
    }

    #[test]
    fn test_unknown_property_is_skipped() {
        let mut saved = sample_geometry().to_serialized();
        saved.blocks[1]
            .properties
            .insert("legacy".into(), PropertyValue::Bool(true));
        assert!(NodeGeometry::from_serialized(&saved).is_ok());
    }

    #[test]
    fn test_load_errors() {
        let mut saved = sample_geometry().to_serialized();
        assert!(matches!(
            NodeMaterial::from_serialized(&saved),
            Err(SerializationError::WrongKind { .. })
        ));

        saved.format_version = FORMAT_VERSION + 1;
        assert!(matches!(
            NodeGeometry::from_serialized(&saved),
            Err(SerializationError::UnsupportedVersion { .. })
        ));

        let mut saved = sample_geometry().to_serialized();
        saved.blocks[1].class_name = "TeapotBlock".into();
        assert!(matches!(
            NodeGeometry::from_serialized(&saved),
            Err(SerializationError::UnknownClass(_))
        ));

        let mut saved = sample_geometry().to_serialized();
        let link = saved
            .blocks
            .iter_mut()
            .find_map(|b| b.inputs.first_mut())
            .unwrap();
        link.output = "missing".into();
        assert!(matches!(
            NodeGeometry::from_serialized(&saved),
            Err(SerializationError::Connection { .. })
        ));
    }
}
