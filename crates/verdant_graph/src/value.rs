// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values flowing through ports and the scalar helpers shared by the
//! evaluators.
//!
//! All arithmetic is IEEE-754 double precision and applied component-wise
//! for vector, color and matrix values. A scalar operand broadcasts over
//! the components of a wider one.

use crate::mesh::VertexData;
use crate::port::PortType;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A concrete value produced or consumed by a port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// 2D vector
    Vector2([f64; 2]),
    /// 3D vector
    Vector3([f64; 3]),
    /// 4D vector
    Vector4([f64; 4]),
    /// RGB color
    Color3([f64; 3]),
    /// RGBA color
    Color4([f64; 4]),
    /// 4x4 matrix, column-major
    Matrix([f64; 16]),
    /// Mesh data (never persisted)
    #[serde(skip)]
    Geometry(Arc<VertexData>),
}

impl Value {
    /// Get the port type for this value
    pub fn port_type(&self) -> PortType {
        match self {
            Self::Int(_) => PortType::Int,
            Self::Float(_) => PortType::Float,
            Self::Vector2(_) => PortType::Vector2,
            Self::Vector3(_) => PortType::Vector3,
            Self::Vector4(_) => PortType::Vector4,
            Self::Color3(_) => PortType::Color3,
            Self::Color4(_) => PortType::Color4,
            Self::Matrix(_) => PortType::Matrix,
            Self::Geometry(_) => PortType::Geometry,
        }
    }

    /// Zero value of a numeric type
    pub fn zero(port_type: PortType) -> Option<Self> {
        let count = port_type.component_count()?;
        Self::from_components(port_type, &vec![0.0; count])
    }

    /// Numeric components, `None` for geometry
    pub fn components(&self) -> Option<Vec<f64>> {
        Some(match self {
            Self::Int(v) => vec![*v as f64],
            Self::Float(v) => vec![*v],
            Self::Vector2(v) => v.to_vec(),
            Self::Vector3(v) | Self::Color3(v) => v.to_vec(),
            Self::Vector4(v) | Self::Color4(v) => v.to_vec(),
            Self::Matrix(m) => m.to_vec(),
            Self::Geometry(_) => return None,
        })
    }

    /// Build a value of `port_type` from its components.
    ///
    /// Integer results truncate toward zero.
    pub fn from_components(port_type: PortType, c: &[f64]) -> Option<Self> {
        let count = port_type.component_count()?;
        if c.len() < count {
            return None;
        }
        Some(match port_type {
            PortType::Int => Self::Int(c[0].trunc() as i64),
            PortType::Float => Self::Float(c[0]),
            PortType::Vector2 => Self::Vector2([c[0], c[1]]),
            PortType::Vector3 => Self::Vector3([c[0], c[1], c[2]]),
            PortType::Color3 => Self::Color3([c[0], c[1], c[2]]),
            PortType::Vector4 => Self::Vector4([c[0], c[1], c[2], c[3]]),
            PortType::Color4 => Self::Color4([c[0], c[1], c[2], c[3]]),
            PortType::Matrix => {
                let mut m = [0.0; 16];
                m.copy_from_slice(&c[..16]);
                Self::Matrix(m)
            }
            _ => return None,
        })
    }

    /// Apply `f` to every component
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Option<Self> {
        let c: Vec<f64> = self.components()?.into_iter().map(f).collect();
        Self::from_components(self.port_type(), &c)
    }

    /// Combine two values component-wise
    pub fn zip_with(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> Option<Self> {
        Self::combine(&[self, other], |c| f(c[0], c[1]))
    }

    /// Combine any number of values component-wise.
    ///
    /// The result takes the type of the first non-scalar operand; scalars
    /// broadcast. Operands of different widths do not combine.
    pub fn combine(values: &[&Value], mut f: impl FnMut(&[f64]) -> f64) -> Option<Self> {
        let components = values
            .iter()
            .map(|v| v.components())
            .collect::<Option<Vec<_>>>()?;

        let wide = values.iter().zip(&components).find(|(_, c)| c.len() > 1);
        let (result_type, len) = match wide {
            Some((value, c)) => (value.port_type(), c.len()),
            None if values.iter().all(|v| matches!(v, Value::Int(_))) => (PortType::Int, 1),
            None => (PortType::Float, 1),
        };
        if components.iter().any(|c| c.len() != 1 && c.len() != len) {
            return None;
        }

        let mut scratch = vec![0.0; values.len()];
        let out: Vec<f64> = (0..len)
            .map(|i| {
                for (slot, c) in scratch.iter_mut().zip(&components) {
                    *slot = if c.len() == 1 { c[0] } else { c[i] };
                }
                f(&scratch)
            })
            .collect();
        Self::from_components(result_type, &out)
    }

    /// Scalar view (int or float)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view, floats truncate
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) => Some(v.trunc() as i64),
            _ => None,
        }
    }

    /// Three-component view; a scalar is splatted
    pub fn as_vector3(&self) -> Option<[f64; 3]> {
        match self {
            Self::Vector3(v) | Self::Color3(v) => Some(*v),
            Self::Vector4(v) | Self::Color4(v) => Some([v[0], v[1], v[2]]),
            Self::Int(_) | Self::Float(_) => self.as_float().map(|s| [s, s, s]),
            _ => None,
        }
    }

    /// Two-component view
    pub fn as_vector2(&self) -> Option<[f64; 2]> {
        match self {
            Self::Vector2(v) => Some(*v),
            Self::Vector3(v) | Self::Color3(v) => Some([v[0], v[1]]),
            Self::Int(_) | Self::Float(_) => self.as_float().map(|s| [s, s]),
            _ => None,
        }
    }

    /// Matrix view
    pub fn as_matrix(&self) -> Option<&[f64; 16]> {
        match self {
            Self::Matrix(m) => Some(m),
            _ => None,
        }
    }

    /// Geometry view
    pub fn as_geometry(&self) -> Option<&Arc<VertexData>> {
        match self {
            Self::Geometry(g) => Some(g),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<[f64; 2]> for Value {
    fn from(v: [f64; 2]) -> Self {
        Self::Vector2(v)
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Self::Vector3(v)
    }
}

impl From<[f64; 4]> for Value {
    fn from(v: [f64; 4]) -> Self {
        Self::Vector4(v)
    }
}

impl From<VertexData> for Value {
    fn from(v: VertexData) -> Self {
        Self::Geometry(Arc::new(v))
    }
}

/// Floor-based modulo: `a - floor(a / b) * b`, with the sign of `b`.
///
/// Results that round to `b` itself are folded to zero so the result stays
/// in `[0, b)` (or `(b, 0]` for negative `b`).
pub fn modulo(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r == 0.0 || (r < 0.0) == (b < 0.0) {
        return r;
    }
    let wrapped = r + b;
    if wrapped == b {
        0.0
    } else {
        wrapped
    }
}

/// `max(lo, min(value, hi))`
pub fn clamp(value: f64, lo: f64, hi: f64) -> f64 {
    lo.max(value.min(hi))
}

/// 0 below the edge, 1 at or above it
pub fn step(edge: f64, value: f64) -> f64 {
    if value < edge {
        0.0
    } else {
        1.0
    }
}

/// Hermite interpolation between two edges
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = clamp((x - edge0) / (edge1 - edge0), 0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Linear interpolation
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
