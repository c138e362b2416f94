// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing blocks and connections.

use crate::block::{Block, BlockId};
use crate::connection::{Connection, ConnectionId};
use crate::port::{Compatibility, Port, PortDirection, PortId, PortType};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Where a port lives inside the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortLocation {
    /// Owning block
    pub block: BlockId,
    /// Port direction
    pub direction: PortDirection,
    /// Index in the block's input or output list
    pub index: usize,
}

/// A block graph
#[derive(Debug, Clone)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Blocks in the graph
    blocks: IndexMap<BlockId, Block>,
    /// Connections between blocks
    connections: IndexMap<ConnectionId, Connection>,
    /// Port lookup
    port_index: HashMap<PortId, PortLocation>,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: IndexMap::new(),
            connections: IndexMap::new(),
            port_index: HashMap::new(),
        }
    }

    /// Add a block to the graph
    pub fn add_block(&mut self, block: Block) -> BlockId {
        let id = block.id;
        self.index_ports(&block);
        self.blocks.insert(id, block);
        id
    }

    /// Remove a block and its connections
    pub fn remove_block(&mut self, block_id: BlockId) -> Option<Block> {
        self.connections.retain(|_, c| !c.involves_block(block_id));
        self.port_index.retain(|_, loc| loc.block != block_id);
        self.blocks.shift_remove(&block_id)
    }

    /// Get a block by ID
    pub fn block(&self, block_id: BlockId) -> Option<&Block> {
        self.blocks.get(&block_id)
    }

    /// Mutate a block; its ports are re-indexed afterwards and connections
    /// its new port types no longer allow are removed
    pub fn update_block<R>(&mut self, block_id: BlockId, f: impl FnOnce(&mut Block) -> R) -> Option<R> {
        let block = self.blocks.get_mut(&block_id)?;
        let result = f(block);
        let block = self.blocks.get(&block_id)?.clone();
        self.port_index.retain(|_, loc| loc.block != block_id);
        self.index_ports(&block);
        self.prune_invalid_connections();
        Some(result)
    }

    /// Get all blocks
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Get all block IDs
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys().copied()
    }

    /// Get the number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Find the first block of a class
    pub fn find_block(&self, class_name: &str) -> Option<&Block> {
        self.blocks.values().find(|b| b.class_name == class_name)
    }

    /// Locate a port
    pub fn locate(&self, port_id: PortId) -> Option<PortLocation> {
        self.port_index.get(&port_id).copied()
    }

    /// Get a port by ID
    pub fn port(&self, port_id: PortId) -> Option<&Port> {
        let loc = self.locate(port_id)?;
        let block = self.blocks.get(&loc.block)?;
        match loc.direction {
            PortDirection::Input => block.inputs.get(loc.index),
            PortDirection::Output => block.outputs.get(loc.index),
        }
    }

    /// Add a connection from an output port to an input port.
    ///
    /// On error the graph is left untouched.
    pub fn connect(&mut self, from: PortId, to: PortId) -> Result<ConnectionId, ConnectionError> {
        let source = self.locate(from).ok_or(ConnectionError::PortNotFound(from))?;
        let target = self.locate(to).ok_or(ConnectionError::PortNotFound(to))?;

        if source.direction != PortDirection::Output || target.direction != PortDirection::Input {
            return Err(ConnectionError::DirectionMismatch);
        }

        if self.connected_point(to).is_some() {
            return Err(ConnectionError::PortAlreadyConnected(to));
        }

        if source.block == target.block {
            return Err(ConnectionError::SelfLoop);
        }

        if self.is_ancestor_of(target.block, source.block) {
            return Err(ConnectionError::CycleDetected);
        }

        self.check_types(from, to)?;

        let connection = Connection::new(source.block, from, target.block, to);
        let id = connection.id;
        self.connections.insert(id, connection);
        tracing::debug!("Connected {:?} -> {:?}", from, to);
        Ok(id)
    }

    /// Type checks of a link from `from` into `to`
    fn check_types(&self, from: PortId, to: PortId) -> Result<(), ConnectionError> {
        let target = self.locate(to).ok_or(ConnectionError::PortNotFound(to))?;
        let target_port = self.port(to).ok_or(ConnectionError::PortNotFound(to))?;
        let source_type = self.resolved_type(from);
        match target_port.check_compatibility(source_type) {
            Compatibility::Compatible => {}
            Compatibility::Excluded => {
                return Err(ConnectionError::ExcludedType {
                    offered: source_type.unwrap_or(PortType::AutoDetect),
                    input: target_port.name.clone(),
                });
            }
            Compatibility::TypeIncompatible => {
                return Err(ConnectionError::IncompatiblePorts {
                    offered: source_type.unwrap_or(PortType::AutoDetect),
                    expected: target_port.port_type,
                });
            }
        }

        // An auto-detect input must agree with its already connected sibling
        if let (PortType::AutoDetect, Some(linked), Some(source_type)) =
            (target_port.port_type, target_port.linked_input, source_type)
        {
            let sibling_type = self
                .block(target.block)
                .and_then(|b| b.inputs.get(linked))
                .and_then(|sibling| self.connected_point(sibling.id))
                .and_then(|p| self.resolved_type(p));
            if let Some(sibling_type) = sibling_type {
                if !sibling_type.is_equivalent(source_type) {
                    return Err(ConnectionError::IncompatiblePorts {
                        offered: source_type,
                        expected: sibling_type,
                    });
                }
            }
        }
        Ok(())
    }

    /// Remove connections whose types no longer check, returning them
    pub fn prune_invalid_connections(&mut self) -> Vec<Connection> {
        let mut removed = Vec::new();
        // Removing a link can re-resolve auto-detect ports downstream
        while let Some(id) = self
            .connections
            .values()
            .find(|c| self.check_types(c.from_port, c.to_port).is_err())
            .map(|c| c.id)
        {
            if let Some(connection) = self.connections.shift_remove(&id) {
                tracing::warn!(
                    "Removed connection {:?} -> {:?}, port types no longer match",
                    connection.from_port,
                    connection.to_port
                );
                removed.push(connection);
            }
        }
        removed
    }

    /// Connect ports addressed by block and port name
    pub fn connect_named(
        &mut self,
        from_block: BlockId,
        output: &str,
        to_block: BlockId,
        input: &str,
    ) -> Result<ConnectionId, ConnectionError> {
        let from = self
            .block(from_block)
            .ok_or(ConnectionError::BlockNotFound(from_block))?
            .output(output)
            .ok_or_else(|| ConnectionError::UnknownPort(output.to_string()))?
            .id;
        let to = self
            .block(to_block)
            .ok_or(ConnectionError::BlockNotFound(to_block))?
            .input(input)
            .ok_or_else(|| ConnectionError::UnknownPort(input.to_string()))?
            .id;
        self.connect(from, to)
    }

    /// Remove a connection
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> Option<Connection> {
        self.connections.shift_remove(&connection_id)
    }

    /// Remove whatever feeds an input
    pub fn disconnect_input(&mut self, input: PortId) -> Option<Connection> {
        let id = self.connections_to(input).next()?.id;
        self.disconnect(id)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections from a specific port
    pub fn connections_from(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.from_port == port_id)
    }

    /// Get connections to a specific port
    pub fn connections_to(&self, port_id: PortId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.to_port == port_id)
    }

    /// Get connections involving a block
    pub fn connections_for_block(&self, block_id: BlockId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_block(block_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether a port takes part in any connection
    pub fn is_connected(&self, port_id: PortId) -> bool {
        self.connections.values().any(|c| c.involves_port(port_id))
    }

    /// The output feeding an input
    pub fn connected_point(&self, input: PortId) -> Option<PortId> {
        self.connections_to(input).next().map(|c| c.from_port)
    }

    /// The inputs fed by an output
    pub fn consumers(&self, output: PortId) -> Vec<PortId> {
        self.connections_from(output).map(|c| c.to_port).collect()
    }

    /// Whether `descendant` (transitively) reads from `ancestor`
    pub fn is_ancestor_of(&self, ancestor: BlockId, descendant: BlockId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![descendant];
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(
                self.connections
                    .values()
                    .filter(|c| c.to_block == current)
                    .map(|c| c.from_block),
            );
        }
        false
    }

    /// Get all blocks in dependency order (dependencies first)
    pub fn topological_order(&self) -> Result<Vec<BlockId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::new();

        for block_id in self.blocks.keys() {
            if !visited.contains(block_id) {
                self.visit(*block_id, &mut visited, &mut temp_mark, &mut order)?;
            }
        }

        Ok(order)
    }

    /// Get the blocks `root` depends on, dependencies first, `root` last
    pub fn build_order(&self, root: BlockId) -> Result<Vec<BlockId>, CycleError> {
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        let mut order = Vec::new();
        self.visit(root, &mut visited, &mut temp_mark, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        block_id: BlockId,
        visited: &mut HashSet<BlockId>,
        temp_mark: &mut HashSet<BlockId>,
        order: &mut Vec<BlockId>,
    ) -> Result<(), CycleError> {
        if temp_mark.contains(&block_id) {
            return Err(CycleError);
        }
        if visited.contains(&block_id) {
            return Ok(());
        }

        temp_mark.insert(block_id);

        // Visit inputs in port order so the build order is stable
        if let Some(block) = self.blocks.get(&block_id) {
            for input in &block.inputs {
                if let Some(connection) = self.connections_to(input.id).next() {
                    self.visit(connection.from_block, visited, temp_mark, order)?;
                }
            }
        }

        temp_mark.remove(&block_id);
        visited.insert(block_id);
        order.push(block_id);

        Ok(())
    }

    fn index_ports(&mut self, block: &Block) {
        for (index, port) in block.inputs.iter().enumerate() {
            self.port_index.insert(
                port.id,
                PortLocation {
                    block: block.id,
                    direction: PortDirection::Input,
                    index,
                },
            );
        }
        for (index, port) in block.outputs.iter().enumerate() {
            self.port_index.insert(
                port.id,
                PortLocation {
                    block: block.id,
                    direction: PortDirection::Output,
                    index,
                },
            );
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Block not found
    #[error("Block not found: {0:?}")]
    BlockNotFound(BlockId),

    /// Port not found
    #[error("Port not found: {0:?}")]
    PortNotFound(PortId),

    /// No port with that name on the block
    #[error("Unknown port: {0}")]
    UnknownPort(String),

    /// Connections run from an output to an input
    #[error("Connections must go from an output to an input")]
    DirectionMismatch,

    /// Incompatible port types
    #[error("Incompatible port types: {offered:?} -> {expected:?}")]
    IncompatiblePorts {
        /// Type offered by the source
        offered: PortType,
        /// Type required by the target
        expected: PortType,
    },

    /// The input refuses the source type
    #[error("Input {input} does not accept {offered:?}")]
    ExcludedType {
        /// Type offered by the source
        offered: PortType,
        /// Input name
        input: String,
    },

    /// Port is already connected
    #[error("Port already connected: {0:?}")]
    PortAlreadyConnected(PortId),

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// The connection would close a cycle
    #[error("Connection would create a cycle")]
    CycleDetected,
}

/// Error when graph contains a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Graph contains a cycle")]
pub struct CycleError;
