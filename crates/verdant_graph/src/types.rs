// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port type resolution.
//!
//! A port's effective type is its declared type when that is concrete.
//! Otherwise:
//! - an auto-detect input takes its source's type, or the type feeding its
//!   linked sibling input;
//! - an auto-detect output takes the type of its linked input;
//! - a based-on-input output takes the type of its type-source input.
//!
//! Ports that stay unresolved fall back to their default type. Because the
//! graph is a DAG one pass in dependency order reaches the fixed point.

use crate::graph::{CycleError, Graph};
use crate::port::{PortDirection, PortId, PortType};
use std::collections::HashMap;

type Memo = HashMap<PortId, Option<PortType>>;

/// Effective type of every port in a graph
#[derive(Debug, Clone, Default)]
pub struct ResolvedTypes {
    types: HashMap<PortId, PortType>,
}

impl ResolvedTypes {
    /// Effective type of a port
    pub fn get(&self, port_id: PortId) -> Option<PortType> {
        self.types.get(&port_id).copied()
    }

    /// Number of ports covered
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no ports are covered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Graph {
    /// Type a port resolves to, `None` when it is still undetermined
    pub fn resolved_type(&self, port_id: PortId) -> Option<PortType> {
        self.resolve(port_id, &mut Memo::new())
    }

    /// Effective type of a port, falling back to defaults
    pub fn port_type(&self, port_id: PortId) -> Option<PortType> {
        self.effective(port_id, &mut Memo::new())
    }

    /// Resolve every port, dependencies first
    pub fn resolve_types(&self) -> Result<ResolvedTypes, CycleError> {
        let order = self.topological_order()?;
        let mut memo = Memo::new();
        let mut types = HashMap::new();
        for block_id in order {
            let Some(block) = self.block(block_id) else {
                continue;
            };
            for port in block.ports() {
                if let Some(t) = self.effective(port.id, &mut memo) {
                    types.insert(port.id, t);
                }
            }
        }
        Ok(ResolvedTypes { types })
    }

    fn effective(&self, port_id: PortId, memo: &mut Memo) -> Option<PortType> {
        if let Some(t) = self.resolve(port_id, memo) {
            return Some(t);
        }
        let loc = self.locate(port_id)?;
        let block = self.block(loc.block)?;
        match loc.direction {
            PortDirection::Input => block.inputs.get(loc.index).map(|p| p.default_type),
            PortDirection::Output => {
                let port = block.outputs.get(loc.index)?;
                match port.type_source.or(port.linked_input) {
                    Some(source) => block
                        .inputs
                        .get(source)
                        .and_then(|input| self.effective(input.id, memo)),
                    None => Some(port.default_type),
                }
            }
        }
    }

    fn resolve(&self, port_id: PortId, memo: &mut Memo) -> Option<PortType> {
        if let Some(cached) = memo.get(&port_id) {
            return *cached;
        }

        let resolved = self.resolve_uncached(port_id, memo);
        memo.insert(port_id, resolved);
        resolved
    }

    fn resolve_uncached(&self, port_id: PortId, memo: &mut Memo) -> Option<PortType> {
        let loc = self.locate(port_id)?;
        let block = self.block(loc.block)?;
        match loc.direction {
            PortDirection::Input => {
                let port = block.inputs.get(loc.index)?;
                if port.port_type.is_concrete() {
                    return Some(port.port_type);
                }
                if let Some(source) = self.connected_point(port_id) {
                    return self.resolve(source, memo);
                }
                // Only the sibling's connection counts, never its own link
                let sibling = block.inputs.get(port.linked_input?)?;
                let source = self.connected_point(sibling.id)?;
                self.resolve(source, memo)
            }
            PortDirection::Output => {
                let port = block.outputs.get(loc.index)?;
                if port.port_type.is_concrete() {
                    return Some(port.port_type);
                }
                let source = match port.port_type {
                    PortType::BasedOnInput => port.type_source?,
                    _ => port.linked_input?,
                };
                let input = block.inputs.get(source)?;
                self.resolve(input.id, memo)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockId};

    fn constant(graph: &mut Graph, port_type: PortType) -> BlockId {
        let mut block = Block::new("Input", "Input");
        block.register_output("output", port_type);
        graph.add_block(block)
    }

    fn conditional(graph: &mut Graph) -> BlockId {
        let mut block = Block::new("Condition", "Condition");
        block.register_input("left", PortType::Float, false, None);
        let t = block.register_input("if_true", PortType::AutoDetect, true, None);
        let f = block.register_input("if_false", PortType::AutoDetect, true, None);
        let o = block.register_output("output", PortType::BasedOnInput);
        block.link_input_types(t, f);
        block.output_type_from(o, t);
        graph.add_block(block)
    }

    fn port(graph: &Graph, block: BlockId, name: &str) -> PortId {
        let b = graph.block(block).unwrap();
        b.input(name).or_else(|| b.output(name)).unwrap().id
    }

    #[test]
    fn test_unresolved_falls_back_to_default() {
        let mut graph = Graph::new("types");
        let c = conditional(&mut graph);
        let out = port(&graph, c, "output");
        assert_eq!(graph.resolved_type(out), None);
        assert_eq!(graph.port_type(out), Some(PortType::Float));
    }

    #[test]
    fn test_linked_inputs_share_type() {
        let mut graph = Graph::new("types");
        let v = constant(&mut graph, PortType::Vector3);
        let c = conditional(&mut graph);

        // Connecting the false branch also types the true branch and the output
        graph
            .connect(port(&graph, v, "output"), port(&graph, c, "if_false"))
            .unwrap();
        assert_eq!(graph.port_type(port(&graph, c, "if_true")), Some(PortType::Vector3));
        assert_eq!(graph.port_type(port(&graph, c, "output")), Some(PortType::Vector3));

        let resolved = graph.resolve_types().unwrap();
        assert_eq!(resolved.get(port(&graph, c, "output")), Some(PortType::Vector3));
        assert_eq!(resolved.len(), 5);
    }

    #[test]
    fn test_auto_detect_chain() {
        let mut graph = Graph::new("types");
        let v = constant(&mut graph, PortType::Color4);
        let c1 = conditional(&mut graph);
        let c2 = conditional(&mut graph);
        graph
            .connect(port(&graph, v, "output"), port(&graph, c1, "if_true"))
            .unwrap();
        graph
            .connect(port(&graph, c1, "output"), port(&graph, c2, "if_true"))
            .unwrap();
        assert_eq!(graph.resolved_type(port(&graph, c2, "output")), Some(PortType::Color4));
    }
}
