// SPDX-License-Identifier: MIT OR Apache-2.0
//! Math blocks emitting component-wise shader expressions.

use super::state::{float_literal, splat, ShaderBlockContext, ShaderBuildState, ShaderValue};
use super::ShaderBlock;
use crate::block::{Block, BlockCategory};
use crate::config::ShaderLanguage;
use crate::evaluation::BuildError;
use crate::graphs::ops::{numeric_input, MathOperation, TrigonometryOperation};
use crate::port::PortType;
use crate::property::{PropertyDefault, PropertyDescriptor, PropertyKind};
use crate::registry::BlockDefinition;
use crate::value::Value;

fn register_binary(block: &mut Block) {
    let left = numeric_input(block, "left", None);
    let right = numeric_input(block, "right", None);
    block.link_input_types(left, right);
    let output = block.register_output("output", PortType::Float);
    block.output_type_from(output, left);
}

fn register_unary(block: &mut Block, input: &str) {
    let index = numeric_input(block, input, None);
    let output = block.register_output("output", PortType::Float);
    block.output_type_from(output, index);
}

/// Type of the wider operand; scalars broadcast
fn widest(values: &[&ShaderValue]) -> PortType {
    values
        .iter()
        .max_by_key(|v| v.width())
        .map_or(PortType::Float, |v| v.port_type)
}

/// Operand expression widened to `port_type` when it is a scalar
fn widened(language: ShaderLanguage, value: &ShaderValue, port_type: PortType) -> String {
    if value.width() == 1 {
        splat(language, port_type, &value.expr)
    } else {
        value.expr.clone()
    }
}

/// Fetch an input the driver guarantees is present
fn required(ctx: &ShaderBlockContext<'_>, name: &str) -> Result<ShaderValue, BuildError> {
    ctx.input(name).ok_or_else(|| {
        BuildError::Custom(format!("{} built without input {name}", ctx.block().class_name))
    })
}

/// Declare the block's result and bind it to `output`
fn bind(
    state: &mut ShaderBuildState,
    ctx: &mut ShaderBlockContext<'_>,
    port_type: PortType,
    expr: &str,
) -> Result<(), BuildError> {
    let value = state.declare(&ctx.block().name, port_type, expr);
    ctx.set("output", value)
}

/// `left <op> right`, one class per operation
pub struct ArithmeticBlock(pub MathOperation);

impl BlockDefinition for ArithmeticBlock {
    fn class_name(&self) -> &'static str {
        match self.0 {
            MathOperation::Add => "AddBlock",
            MathOperation::Subtract => "SubtractBlock",
            MathOperation::Multiply => "MultiplyBlock",
            MathOperation::Divide => "DivideBlock",
            MathOperation::Max => "MaxBlock",
            MathOperation::Min => "MinBlock",
        }
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        match self.0 {
            MathOperation::Add => "left + right",
            MathOperation::Subtract => "left - right",
            MathOperation::Multiply => "left * right",
            MathOperation::Divide => "left / right",
            MathOperation::Max => "max(left, right)",
            MathOperation::Min => "min(left, right)",
        }
    }

    fn register_ports(&self, block: &mut Block) {
        register_binary(block);
    }
}

impl ShaderBlock for ArithmeticBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let left = required(ctx, "left")?;
        let right = required(ctx, "right")?;
        let port_type = widest(&[&left, &right]);
        let language = state.language();
        let expr = match self.0 {
            MathOperation::Add => format!("{} + {}", left.expr, right.expr),
            MathOperation::Subtract => format!("{} - {}", left.expr, right.expr),
            MathOperation::Multiply => format!("{} * {}", left.expr, right.expr),
            MathOperation::Divide => format!("{} / {}", left.expr, right.expr),
            MathOperation::Max | MathOperation::Min => format!(
                "{}({}, {})",
                if self.0 == MathOperation::Max { "max" } else { "min" },
                widened(language, &left, port_type),
                widened(language, &right, port_type)
            ),
        };
        bind(state, ctx, port_type, &expr)
    }
}

/// Floor-based modulo; `right` defaults to 1
pub struct ModBlock;

impl BlockDefinition for ModBlock {
    fn class_name(&self) -> &'static str {
        "ModBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "a - b * floor(a / b)"
    }

    fn register_ports(&self, block: &mut Block) {
        let left = numeric_input(block, "left", None);
        numeric_input(block, "right", Some(Value::Float(1.0)));
        let output = block.register_output("output", PortType::Float);
        block.output_type_from(output, left);
    }
}

impl ShaderBlock for ModBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let left = required(ctx, "left")?;
        let right = required(ctx, "right")?;
        let port_type = widest(&[&left, &right]);
        // WGSL `%` truncates, so both languages spell out the floor form
        let expr = format!(
            "{a} - {b} * floor({a} / {b})",
            a = left.expr,
            b = right.expr
        );
        bind(state, ctx, port_type, &expr)
    }
}

const CLAMP_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("minimum", PropertyKind::Float, PropertyDefault::Float(0.0)),
    PropertyDescriptor::new("maximum", PropertyKind::Float, PropertyDefault::Float(1.0)),
];

/// Clamp to the `minimum`/`maximum` properties
pub struct ClampBlock;

impl BlockDefinition for ClampBlock {
    fn class_name(&self) -> &'static str {
        "ClampBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Clamp a value to a range"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        CLAMP_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        register_unary(block, "value");
    }
}

impl ShaderBlock for ClampBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let block = ctx.block();
        let value = required(ctx, "value")?;
        let language = state.language();
        let bound = |v: f64| splat(language, value.port_type, &float_literal(v));
        let expr = format!(
            "clamp({}, {}, {})",
            value.expr,
            bound(block.property_float("minimum", 0.0)),
            bound(block.property_float("maximum", 1.0))
        );
        bind(state, ctx, value.port_type, &expr)
    }
}

/// 0 below `edge` (0.5), 1 at or above
pub struct StepBlock;

impl BlockDefinition for StepBlock {
    fn class_name(&self) -> &'static str {
        "StepBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Step function"
    }

    fn register_ports(&self, block: &mut Block) {
        register_unary(block, "value");
        numeric_input(block, "edge", Some(Value::Float(0.5)));
    }
}

impl ShaderBlock for StepBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let value = required(ctx, "value")?;
        let edge = required(ctx, "edge")?;
        let language = state.language();
        let expr = format!(
            "step({}, {})",
            widened(language, &edge, value.port_type),
            value.expr
        );
        bind(state, ctx, value.port_type, &expr)
    }
}

/// Hermite interpolation between `edge0` (0) and `edge1` (1)
pub struct SmoothStepBlock;

impl BlockDefinition for SmoothStepBlock {
    fn class_name(&self) -> &'static str {
        "SmoothStepBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Smooth step between two edges"
    }

    fn register_ports(&self, block: &mut Block) {
        register_unary(block, "value");
        numeric_input(block, "edge0", Some(Value::Float(0.0)));
        numeric_input(block, "edge1", Some(Value::Float(1.0)));
    }
}

impl ShaderBlock for SmoothStepBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let value = required(ctx, "value")?;
        let edge0 = required(ctx, "edge0")?;
        let edge1 = required(ctx, "edge1")?;
        let language = state.language();
        let expr = format!(
            "smoothstep({}, {}, {})",
            widened(language, &edge0, value.port_type),
            widened(language, &edge1, value.port_type),
            value.expr
        );
        bind(state, ctx, value.port_type, &expr)
    }
}

/// `mix(left, right, gradient)`
pub struct LerpBlock;

impl BlockDefinition for LerpBlock {
    fn class_name(&self) -> &'static str {
        "LerpBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Linear interpolation"
    }

    fn register_ports(&self, block: &mut Block) {
        register_binary(block);
        numeric_input(block, "gradient", None);
    }
}

impl ShaderBlock for LerpBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let left = required(ctx, "left")?;
        let right = required(ctx, "right")?;
        let gradient = required(ctx, "gradient")?;
        let port_type = widest(&[&left, &right]);
        let language = state.language();
        // A scalar gradient is valid for both languages' mix overloads
        let gradient = if gradient.width() == 1 {
            gradient.expr
        } else {
            widened(language, &gradient, port_type)
        };
        let expr = format!(
            "mix({}, {}, {gradient})",
            widened(language, &left, port_type),
            widened(language, &right, port_type)
        );
        bind(state, ctx, port_type, &expr)
    }
}

const TRIGONOMETRY_PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new(
    "operation",
    PropertyKind::Choice(TrigonometryOperation::NAMES),
    PropertyDefault::Text("Cos"),
)];

/// Unary function picked by the `operation` property
pub struct TrigonometryBlock;

impl BlockDefinition for TrigonometryBlock {
    fn class_name(&self) -> &'static str {
        "TrigonometryBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Trigonometric and rounding functions"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        TRIGONOMETRY_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        register_unary(block, "input");
    }
}

impl ShaderBlock for TrigonometryBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let operation =
            TrigonometryOperation::from_name(ctx.block().property_text("operation")).unwrap_or_default();
        let input = required(ctx, "input")?;
        let expr = operation.expression(&input.expr);
        bind(state, ctx, input.port_type, &expr)
    }
}

/// Dot product of two vectors
pub struct DotBlock;

impl BlockDefinition for DotBlock {
    fn class_name(&self) -> &'static str {
        "DotBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Dot product"
    }

    fn register_ports(&self, block: &mut Block) {
        let left = numeric_input(block, "left", None);
        let right = numeric_input(block, "right", None);
        block.link_input_types(left, right);
        block.register_output("output", PortType::Float);
    }
}

impl ShaderBlock for DotBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let left = required(ctx, "left")?;
        let right = required(ctx, "right")?;
        let expr = if left.width() == 1 && right.width() == 1 {
            format!("{} * {}", left.expr, right.expr)
        } else {
            format!("dot({}, {})", left.expr, right.expr)
        };
        bind(state, ctx, PortType::Float, &expr)
    }
}

/// Euclidean length
pub struct LengthBlock;

impl BlockDefinition for LengthBlock {
    fn class_name(&self) -> &'static str {
        "LengthBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Length of a vector"
    }

    fn register_ports(&self, block: &mut Block) {
        numeric_input(block, "value", None);
        block.register_output("output", PortType::Float);
    }
}

impl ShaderBlock for LengthBlock {
    fn build(&self, state: &mut ShaderBuildState, ctx: &mut ShaderBlockContext<'_>) -> Result<(), BuildError> {
        let value = required(ctx, "value")?;
        let expr = format!("length({})", value.expr);
        bind(state, ctx, PortType::Float, &expr)
    }
}
