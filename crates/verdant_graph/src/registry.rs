// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block classes and the registry that instantiates them.

use crate::block::{Block, BlockCategory, BlockId};
use crate::property::{PropertyDescriptor, PropertyError, PropertyValue};
use indexmap::IndexMap;

/// Static shape and property table of a block class.
///
/// Evaluation lives in the graph-specific capability traits
/// ([`GeometryBlock`](crate::graphs::geometry::GeometryBlock),
/// [`ShaderBlock`](crate::graphs::material::ShaderBlock)).
pub trait BlockDefinition: Send + Sync {
    /// Unique class name, also the serialized type key
    fn class_name(&self) -> &'static str;

    /// Category for tooling
    fn category(&self) -> BlockCategory;

    /// One-line description
    fn description(&self) -> &'static str;

    /// Serializable properties
    fn properties(&self) -> &'static [PropertyDescriptor] {
        &[]
    }

    /// Declare the block's ports
    fn register_ports(&self, block: &mut Block);

    /// Initial value of [`Block::evaluate_context`]
    fn evaluates_per_context(&self) -> bool {
        true
    }

    /// Re-derive port types after a property changed
    fn update_ports(&self, _block: &mut Block) {}
}

/// Registry of available block classes
pub struct BlockRegistry<D: ?Sized> {
    /// Registered classes by name, in registration order
    types: IndexMap<&'static str, Box<D>>,
}

impl<D: BlockDefinition + ?Sized> BlockRegistry<D> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Register a block class
    pub fn register(&mut self, definition: Box<D>) {
        self.types.insert(definition.class_name(), definition);
    }

    /// Get a block class by name
    pub fn get(&self, class_name: &str) -> Option<&D> {
        self.types.get(class_name).map(|d| &**d)
    }

    /// Get all registered classes
    pub fn definitions(&self) -> impl Iterator<Item = &D> {
        self.types.values().map(|d| &**d)
    }

    /// Get classes by category
    pub fn in_category(&self, category: BlockCategory) -> impl Iterator<Item = &D> {
        self.definitions().filter(move |d| d.category() == category)
    }

    /// Create a block from a class name
    pub fn create_block(&self, class_name: &str) -> Option<Block> {
        self.create_block_with_id(class_name, BlockId::new())
    }

    /// Create a block with a known ID (used when restoring saved graphs)
    pub fn create_block_with_id(&self, class_name: &str, id: BlockId) -> Option<Block> {
        let definition = self.get(class_name)?;
        let name = definition
            .class_name()
            .strip_suffix("Block")
            .unwrap_or(definition.class_name());
        let mut block = Block::with_id(id, definition.class_name(), name);
        block.evaluate_context = definition.evaluates_per_context();
        for descriptor in definition.properties() {
            block
                .properties
                .insert(descriptor.name.to_string(), descriptor.default.to_value());
        }
        definition.register_ports(&mut block);
        definition.update_ports(&mut block);
        Some(block)
    }

    /// Validate and store a property, then let the class refresh its ports
    pub fn set_property(
        &self,
        block: &mut Block,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), PropertyError> {
        let definition = self
            .get(&block.class_name)
            .ok_or_else(|| PropertyError::UnknownClass(block.class_name.clone()))?;
        let descriptor = definition
            .properties()
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()))?;
        let value = descriptor.coerce(value)?;
        block.properties.insert(name.to_string(), value);
        definition.update_ports(block);
        Ok(())
    }
}

impl<D: BlockDefinition + ?Sized> Default for BlockRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}
