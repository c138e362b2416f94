// SPDX-License-Identifier: MIT OR Apache-2.0
//! Operations shared by geometry and shader blocks.

use crate::block::Block;
use crate::port::PortType;
use crate::value::Value;

/// Types a numeric auto-detect input refuses
pub(crate) const NON_NUMERIC: &[PortType] = &[PortType::Geometry, PortType::Texture];

/// Declare an auto-detect input restricted to numeric types
pub(crate) fn numeric_input(block: &mut Block, name: &str, default: Option<Value>) -> usize {
    let index = block.register_input(name, PortType::AutoDetect, false, default);
    block.inputs[index].excluded_types.extend_from_slice(NON_NUMERIC);
    index
}

/// Declare a float input that also takes integers
pub(crate) fn scalar_input(block: &mut Block, name: &str, optional: bool, default: Option<f64>) -> usize {
    let index = block.register_input(name, PortType::Float, optional, default.map(Value::Float));
    block.inputs[index].accepted_types.push(PortType::Int);
    index
}

/// Binary arithmetic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MathOperation {
    /// `a + b`
    #[default]
    Add,
    /// `a - b`
    Subtract,
    /// `a * b`
    Multiply,
    /// `a / b`
    Divide,
    /// `max(a, b)`
    Max,
    /// `min(a, b)`
    Min,
}

impl MathOperation {
    /// Choice names
    pub const NAMES: &'static [&'static str] =
        &["Add", "Subtract", "Multiply", "Divide", "Max", "Min"];

    /// Parse a choice name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Add" => Self::Add,
            "Subtract" => Self::Subtract,
            "Multiply" => Self::Multiply,
            "Divide" => Self::Divide,
            "Max" => Self::Max,
            "Min" => Self::Min,
            _ => return None,
        })
    }

    /// Apply to one component
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
            Self::Max => a.max(b),
            Self::Min => a.min(b),
        }
    }
}

/// Unary component-wise function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrigonometryOperation {
    /// Cosine
    #[default]
    Cos,
    /// Sine
    Sin,
    /// Absolute value
    Abs,
    /// Natural exponent
    Exp,
    /// Round to nearest
    Round,
    /// Round down
    Floor,
    /// Round up
    Ceiling,
    /// Square root
    Sqrt,
    /// Natural logarithm
    Log,
    /// Tangent
    Tan,
    /// Arc tangent
    ArcTan,
    /// Arc cosine
    ArcCos,
    /// Arc sine
    ArcSin,
    /// Fractional part
    Fract,
    /// -1, 0 or 1
    Sign,
    /// `-x`
    Negate,
    /// `1 - x`
    OneMinus,
    /// `1 / x`
    Reciprocal,
    /// Radians to degrees
    ToDegrees,
    /// Degrees to radians
    ToRadians,
}

impl TrigonometryOperation {
    /// Choice names
    pub const NAMES: &'static [&'static str] = &[
        "Cos",
        "Sin",
        "Abs",
        "Exp",
        "Round",
        "Floor",
        "Ceiling",
        "Sqrt",
        "Log",
        "Tan",
        "ArcTan",
        "ArcCos",
        "ArcSin",
        "Fract",
        "Sign",
        "Negate",
        "OneMinus",
        "Reciprocal",
        "ToDegrees",
        "ToRadians",
    ];

    const ALL: [Self; 20] = [
        Self::Cos,
        Self::Sin,
        Self::Abs,
        Self::Exp,
        Self::Round,
        Self::Floor,
        Self::Ceiling,
        Self::Sqrt,
        Self::Log,
        Self::Tan,
        Self::ArcTan,
        Self::ArcCos,
        Self::ArcSin,
        Self::Fract,
        Self::Sign,
        Self::Negate,
        Self::OneMinus,
        Self::Reciprocal,
        Self::ToDegrees,
        Self::ToRadians,
    ];

    /// Parse a choice name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| Self::ALL[i])
    }

    /// Apply to one component
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Cos => x.cos(),
            Self::Sin => x.sin(),
            Self::Abs => x.abs(),
            Self::Exp => x.exp(),
            Self::Round => x.round(),
            Self::Floor => x.floor(),
            Self::Ceiling => x.ceil(),
            Self::Sqrt => x.sqrt(),
            Self::Log => x.ln(),
            Self::Tan => x.tan(),
            Self::ArcTan => x.atan(),
            Self::ArcCos => x.acos(),
            Self::ArcSin => x.asin(),
            Self::Fract => x - x.floor(),
            Self::Sign => {
                if x > 0.0 {
                    1.0
                } else if x < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Self::Negate => -x,
            Self::OneMinus => 1.0 - x,
            Self::Reciprocal => 1.0 / x,
            Self::ToDegrees => x.to_degrees(),
            Self::ToRadians => x.to_radians(),
        }
    }

    /// Shader expression applying the operation to `arg`.
    ///
    /// GLSL and WGSL share every builtin used here.
    pub fn expression(self, arg: &str) -> String {
        let function = match self {
            Self::Cos => "cos",
            Self::Sin => "sin",
            Self::Abs => "abs",
            Self::Exp => "exp",
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceiling => "ceil",
            Self::Sqrt => "sqrt",
            Self::Log => "log",
            Self::Tan => "tan",
            Self::ArcTan => "atan",
            Self::ArcCos => "acos",
            Self::ArcSin => "asin",
            Self::Fract => "fract",
            Self::Sign => "sign",
            Self::ToDegrees => "degrees",
            Self::ToRadians => "radians",
            Self::Negate => return format!("-({arg})"),
            Self::OneMinus => return format!("(1.0 - {arg})"),
            Self::Reciprocal => return format!("(1.0 / {arg})"),
        };
        format!("{function}({arg})")
    }
}

/// Comparison or logic test of a condition block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConditionTest {
    /// `|a - b| <= epsilon`
    #[default]
    Equal,
    /// `|a - b| > epsilon`
    NotEqual,
    /// `a < b`
    LessThan,
    /// `a > b`
    GreaterThan,
    /// `a <= b`
    LessOrEqual,
    /// `a >= b`
    GreaterOrEqual,
    /// Exactly one operand non-zero
    Xor,
    /// Either operand non-zero
    Or,
    /// Both operands non-zero
    And,
}

impl ConditionTest {
    /// Choice names
    pub const NAMES: &'static [&'static str] = &[
        "Equal",
        "NotEqual",
        "LessThan",
        "GreaterThan",
        "LessOrEqual",
        "GreaterOrEqual",
        "Xor",
        "Or",
        "And",
    ];

    /// Parse a choice name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Equal" => Self::Equal,
            "NotEqual" => Self::NotEqual,
            "LessThan" => Self::LessThan,
            "GreaterThan" => Self::GreaterThan,
            "LessOrEqual" => Self::LessOrEqual,
            "GreaterOrEqual" => Self::GreaterOrEqual,
            "Xor" => Self::Xor,
            "Or" => Self::Or,
            "And" => Self::And,
            _ => return None,
        })
    }

    /// Evaluate the test
    pub fn evaluate(self, a: f64, b: f64, epsilon: f64) -> bool {
        match self {
            Self::Equal => (a - b).abs() <= epsilon,
            Self::NotEqual => (a - b).abs() > epsilon,
            Self::LessThan => a < b,
            Self::GreaterThan => a > b,
            Self::LessOrEqual => a <= b,
            Self::GreaterOrEqual => a >= b,
            Self::Xor => (a != 0.0) != (b != 0.0),
            Self::Or => a != 0.0 || b != 0.0,
            Self::And => a != 0.0 && b != 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigonometry_names_round_trip() {
        for name in TrigonometryOperation::NAMES {
            let op = TrigonometryOperation::from_name(name).unwrap();
            assert_eq!(TrigonometryOperation::NAMES[op as usize], *name);
        }
        assert!(TrigonometryOperation::from_name("Pow").is_none());
    }

    #[test]
    fn test_sign_of_zero() {
        assert_eq!(TrigonometryOperation::Sign.apply(0.0), 0.0);
        assert_eq!(TrigonometryOperation::Sign.apply(-3.0), -1.0);
        assert_eq!(TrigonometryOperation::Fract.apply(-0.25), 0.75);
    }

    #[test]
    fn test_condition_tests() {
        assert!(ConditionTest::Equal.evaluate(1.0, 1.05, 0.1));
        assert!(!ConditionTest::Equal.evaluate(1.0, 1.05, 0.0));
        assert!(ConditionTest::Xor.evaluate(1.0, 0.0, 0.0));
        assert!(!ConditionTest::Xor.evaluate(1.0, 2.0, 0.0));
        assert!(ConditionTest::GreaterOrEqual.evaluate(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_expression() {
        assert_eq!(TrigonometryOperation::Ceiling.expression("v"), "ceil(v)");
        assert_eq!(TrigonometryOperation::OneMinus.expression("v"), "(1.0 - v)");
    }
}
