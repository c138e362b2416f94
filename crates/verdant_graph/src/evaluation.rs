// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation scheduling shared by the geometry and shader graphs.

use crate::block::BlockId;
use crate::graph::Graph;
use crate::property::PropertyError;
use crate::types::ResolvedTypes;

/// Blocks to build for one pass, dependencies first, plus resolved types
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Block whose result the pass produces
    pub root: BlockId,
    /// Build order, `root` last
    pub order: Vec<BlockId>,
    /// Effective port types
    pub types: ResolvedTypes,
}

impl BuildPlan {
    /// Plan a pass ending at `root`
    pub fn new(graph: &Graph, root: BlockId) -> Result<Self, BuildError> {
        if graph.block(root).is_none() {
            return Err(BuildError::BlockNotFound(root));
        }
        let order = graph
            .build_order(root)
            .map_err(|_| BuildError::CycleDetected)?;
        let types = graph
            .resolve_types()
            .map_err(|_| BuildError::CycleDetected)?;
        Ok(Self { root, order, types })
    }

    /// Number of blocks in the pass
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the pass builds nothing
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Error during evaluation.
///
/// Absent inputs are not errors; they propagate as absent outputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// Graph contains a cycle
    #[error("Graph contains a cycle")]
    CycleDetected,

    /// Block not found
    #[error("Block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// The graph has no block of a required output class
    #[error("Missing output block: {0}")]
    MissingOutputBlock(&'static str),

    /// A block's class is not in the registry
    #[error("Unknown block class: {0}")]
    UnknownBlockClass(String),

    /// A property holds a value of the wrong kind
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}
