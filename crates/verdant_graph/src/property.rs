// SPDX-License-Identifier: MIT OR Apache-2.0
//! Serializable block properties.
//!
//! Every block class publishes a static table of [`PropertyDescriptor`]s.
//! The table is the only thing the serializer and the property setter
//! consult; blocks never expose fields by reflection.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A stored property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Free text or one of a choice list
    Text(String),
    /// Literal port value
    Value(Value),
}

impl PropertyValue {
    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view (int or float)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Literal value view
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Kind of a declared property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Boolean flag
    Bool,
    /// Integer
    Int,
    /// Float (ints are accepted)
    Float,
    /// Free text
    Text,
    /// One of a fixed list of names
    Choice(&'static [&'static str]),
    /// Literal port value
    Value,
}

/// Compile-time default of a declared property
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyDefault {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Text or choice
    Text(&'static str),
    /// Scalar literal value
    Scalar(f64),
}

impl PropertyDefault {
    /// Materialize the default
    pub fn to_value(self) -> PropertyValue {
        match self {
            Self::Bool(b) => PropertyValue::Bool(b),
            Self::Int(v) => PropertyValue::Int(v),
            Self::Float(v) => PropertyValue::Float(v),
            Self::Text(s) => PropertyValue::Text(s.to_string()),
            Self::Scalar(v) => PropertyValue::Value(Value::Float(v)),
        }
    }
}

/// One entry of a block's static property table
#[derive(Debug, Clone, Copy)]
pub struct PropertyDescriptor {
    /// Property name, also the serialized key
    pub name: &'static str,
    /// Property kind
    pub kind: PropertyKind,
    /// Default value
    pub default: PropertyDefault,
}

impl PropertyDescriptor {
    /// Declare a property
    pub const fn new(name: &'static str, kind: PropertyKind, default: PropertyDefault) -> Self {
        Self {
            name,
            kind,
            default,
        }
    }

    /// Validate and normalize a value for this property
    pub fn coerce(&self, value: PropertyValue) -> Result<PropertyValue, PropertyError> {
        match (self.kind, value) {
            (PropertyKind::Bool, v @ PropertyValue::Bool(_))
            | (PropertyKind::Int, v @ PropertyValue::Int(_))
            | (PropertyKind::Float, v @ PropertyValue::Float(_))
            | (PropertyKind::Text, v @ PropertyValue::Text(_))
            | (PropertyKind::Value, v @ PropertyValue::Value(_)) => Ok(v),
            (PropertyKind::Float, PropertyValue::Int(i)) => Ok(PropertyValue::Float(i as f64)),
            (PropertyKind::Value, PropertyValue::Float(f)) => {
                Ok(PropertyValue::Value(Value::Float(f)))
            }
            (PropertyKind::Value, PropertyValue::Int(i)) => Ok(PropertyValue::Value(Value::Int(i))),
            (PropertyKind::Choice(options), PropertyValue::Text(s)) => {
                if options.contains(&s.as_str()) {
                    Ok(PropertyValue::Text(s))
                } else {
                    Err(PropertyError::InvalidChoice {
                        property: self.name.to_string(),
                        value: s,
                    })
                }
            }
            _ => Err(PropertyError::WrongKind(self.name.to_string())),
        }
    }
}

/// Error when reading or writing a block property
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    /// The block class is not registered
    #[error("Unknown block class: {0}")]
    UnknownClass(String),

    /// The block class does not declare this property
    #[error("Unknown property: {0}")]
    Unknown(String),

    /// Value kind does not match the declaration
    #[error("Wrong value kind for property {0}")]
    WrongKind(String),

    /// Value is not one of the declared choices
    #[error("Invalid value {value:?} for property {property}")]
    InvalidChoice {
        /// Property name
        property: String,
        /// Rejected value
        value: String,
    },
}
