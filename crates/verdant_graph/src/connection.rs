// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::block::BlockId;
use crate::port::PortId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A connection from an output port to an input port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source block ID
    pub from_block: BlockId,
    /// Source (output) port ID
    pub from_port: PortId,
    /// Target block ID
    pub to_block: BlockId,
    /// Target (input) port ID
    pub to_port: PortId,
}

impl Connection {
    /// Create a new connection
    pub fn new(from_block: BlockId, from_port: PortId, to_block: BlockId, to_port: PortId) -> Self {
        Self {
            id: ConnectionId::new(),
            from_block,
            from_port,
            to_block,
            to_port,
        }
    }

    /// Check if this connection involves a specific block
    pub fn involves_block(&self, block_id: BlockId) -> bool {
        self.from_block == block_id || self.to_block == block_id
    }

    /// Check if this connection involves a specific port
    pub fn involves_port(&self, port_id: PortId) -> bool {
        self.from_port == port_id || self.to_port == port_id
    }
}
