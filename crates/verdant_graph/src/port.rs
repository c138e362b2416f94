// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port (connection point) definitions for block inputs/outputs.

use crate::block::BlockId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortId(pub Uuid);

impl PortId {
    /// Create a new random port ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PortId {
    fn default() -> Self {
        Self::new()
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Data type that can flow through ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// 2D vector
    Vector2,
    /// 3D vector
    Vector3,
    /// 4D vector
    Vector4,
    /// RGB color
    Color3,
    /// RGBA color
    Color4,
    /// Matrix 4x4
    Matrix,
    /// Mesh data
    Geometry,
    /// Texture sampler
    Texture,
    /// Resolved from the connection or the linked input
    AutoDetect,
    /// Follows the type of another input on the same block
    BasedOnInput,
}

impl PortType {
    /// Whether this is a real data type rather than a resolution rule
    pub fn is_concrete(self) -> bool {
        !matches!(self, Self::AutoDetect | Self::BasedOnInput)
    }

    /// Number of scalar components, `None` for non-numeric types
    pub fn component_count(self) -> Option<usize> {
        match self {
            Self::Int | Self::Float => Some(1),
            Self::Vector2 => Some(2),
            Self::Vector3 | Self::Color3 => Some(3),
            Self::Vector4 | Self::Color4 => Some(4),
            Self::Matrix => Some(16),
            Self::Geometry | Self::Texture | Self::AutoDetect | Self::BasedOnInput => None,
        }
    }

    /// Vector3/Color3 and Vector4/Color4 are interchangeable
    pub fn is_equivalent(self, other: PortType) -> bool {
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (Self::Vector3, Self::Color3)
                | (Self::Color3, Self::Vector3)
                | (Self::Vector4, Self::Color4)
                | (Self::Color4, Self::Vector4)
        )
    }

    /// Vector type with the given number of components
    pub fn vector_of(count: usize) -> Option<PortType> {
        match count {
            1 => Some(Self::Float),
            2 => Some(Self::Vector2),
            3 => Some(Self::Vector3),
            4 => Some(Self::Vector4),
            _ => None,
        }
    }
}

/// Result of checking whether a source type may feed an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Types match, are equivalent, or are accepted
    Compatible,
    /// Types differ and the input does not accept the source type
    TypeIncompatible,
    /// The input explicitly excludes the source type
    Excluded,
}

/// A port on a block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    /// Unique port ID
    pub id: PortId,
    /// Block this port belongs to
    pub owner: BlockId,
    /// Port name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Declared data type
    pub port_type: PortType,
    /// Type used when an auto-detect port cannot be resolved
    pub default_type: PortType,
    /// Whether the block can build without this input
    pub optional: bool,
    /// Literal used when the input is unconnected
    pub default_value: Option<Value>,
    /// Extra source types an input accepts besides its own
    pub accepted_types: Vec<PortType>,
    /// Source types an input refuses
    pub excluded_types: Vec<PortType>,
    /// Index of a sibling input sharing this port's auto-detected type
    pub linked_input: Option<usize>,
    /// Index of the input a `BasedOnInput` output follows
    pub type_source: Option<usize>,
}

impl Port {
    /// Create a new port
    pub fn new(
        owner: BlockId,
        name: impl Into<String>,
        port_type: PortType,
        direction: PortDirection,
    ) -> Self {
        let default_type = if port_type.is_concrete() {
            port_type
        } else {
            PortType::Float
        };
        Self {
            id: PortId::new(),
            owner,
            name: name.into(),
            direction,
            port_type,
            default_type,
            optional: direction == PortDirection::Output,
            default_value: None,
            accepted_types: Vec::new(),
            excluded_types: Vec::new(),
            linked_input: None,
            type_source: None,
        }
    }

    /// Create a new input port
    pub fn input(owner: BlockId, name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(owner, name, port_type, PortDirection::Input)
    }

    /// Create a new output port
    pub fn output(owner: BlockId, name: impl Into<String>, port_type: PortType) -> Self {
        Self::new(owner, name, port_type, PortDirection::Output)
    }

    /// Set the default value
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Set the fallback type for an unresolved auto-detect port
    pub fn with_default_type(mut self, port_type: PortType) -> Self {
        self.default_type = port_type;
        self
    }

    /// Accept additional source types
    pub fn accepting(mut self, types: &[PortType]) -> Self {
        self.accepted_types.extend_from_slice(types);
        self
    }

    /// Refuse source types
    pub fn excluding(mut self, types: &[PortType]) -> Self {
        self.excluded_types.extend_from_slice(types);
        self
    }

    /// Whether this is an input
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Check whether a source of `source_type` may connect to this input.
    ///
    /// `None` means the source is an unresolved auto-detect port, which
    /// adopts whatever this input wants.
    pub fn check_compatibility(&self, source_type: Option<PortType>) -> Compatibility {
        let Some(source_type) = source_type else {
            return Compatibility::Compatible;
        };

        if self
            .excluded_types
            .iter()
            .any(|t| t.is_equivalent(source_type))
        {
            return Compatibility::Excluded;
        }

        if self.port_type == PortType::AutoDetect || self.port_type.is_equivalent(source_type) {
            return Compatibility::Compatible;
        }

        if self
            .accepted_types
            .iter()
            .any(|t| t.is_equivalent(source_type))
        {
            Compatibility::Compatible
        } else {
            Compatibility::TypeIncompatible
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_types() {
        assert!(PortType::Vector3.is_equivalent(PortType::Color3));
        assert!(PortType::Color4.is_equivalent(PortType::Vector4));
        assert!(!PortType::Vector3.is_equivalent(PortType::Vector4));
    }

    #[test]
    fn test_compatibility_rules() {
        let owner = BlockId::new();
        let input = Port::input(owner, "value", PortType::Vector3).accepting(&[PortType::Float]);
        assert_eq!(input.check_compatibility(Some(PortType::Color3)), Compatibility::Compatible);
        assert_eq!(input.check_compatibility(Some(PortType::Float)), Compatibility::Compatible);
        assert_eq!(
            input.check_compatibility(Some(PortType::Matrix)),
            Compatibility::TypeIncompatible
        );
        assert_eq!(input.check_compatibility(None), Compatibility::Compatible);

        let auto = Port::input(owner, "left", PortType::AutoDetect).excluding(&[PortType::Geometry]);
        assert_eq!(auto.check_compatibility(Some(PortType::Matrix)), Compatibility::Compatible);
        assert_eq!(auto.check_compatibility(Some(PortType::Geometry)), Compatibility::Excluded);
    }
}
