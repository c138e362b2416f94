// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph framework for Verdant.
//!
//! This crate provides the graph model shared by:
//! - Procedural geometry graphs, evaluated into meshes
//! - Shader (material) graphs, compiled to GLSL ES 3.00 or WGSL
//!
//! ## Architecture
//!
//! The framework is built on a generic graph model with:
//! - Typed input/output ports with a type resolution pass
//! - Connection validation, including cycle rejection
//! - Evaluation scheduling from an output block
//! - Serialization support (RON, JSON, binary)

pub mod block;
pub mod config;
pub mod connection;
pub mod evaluation;
pub mod graph;
pub mod graphs;
pub mod math;
pub mod mesh;
pub mod port;
pub mod property;
pub mod registry;
pub mod serialization;
pub mod types;
pub mod value;

pub use block::{Block, BlockCategory, BlockId};
pub use config::{Precision, RenderConfig, ShaderLanguage, TextureCategory, TextureToggles};
pub use connection::{Connection, ConnectionId};
pub use evaluation::{BuildError, BuildPlan};
pub use graph::{ConnectionError, CycleError, Graph};
pub use graphs::geometry::NodeGeometry;
pub use graphs::material::{CompiledShader, NodeMaterial};
pub use mesh::VertexData;
pub use port::{Port, PortDirection, PortId, PortType};
pub use property::{PropertyError, PropertyValue};
pub use registry::{BlockDefinition, BlockRegistry};
pub use serialization::{GraphKind, SerializationError, SerializedGraph};
pub use value::Value;
