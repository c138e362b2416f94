// SPDX-License-Identifier: MIT OR Apache-2.0
//! Component-wise math blocks.

use super::state::{GeometryBlockContext, GeometryBuildState, Stored};
use super::GeometryBlock;
use crate::block::{Block, BlockCategory};
use crate::evaluation::BuildError;
use crate::graphs::ops::{numeric_input, scalar_input, MathOperation, TrigonometryOperation};
use crate::port::PortType;
use crate::property::{PropertyDefault, PropertyDescriptor, PropertyKind};
use crate::registry::BlockDefinition;
use crate::value::{self, Value};
use std::rc::Rc;

/// Declare two linked numeric inputs and an output following the first
fn register_binary(block: &mut Block, left: &str, right: &str) {
    let l = numeric_input(block, left, None);
    let r = numeric_input(block, right, None);
    block.link_input_types(l, r);
    let output = block.register_output("output", PortType::Float);
    block.output_type_from(output, l);
}

/// Declare a numeric input and an output following it
fn register_unary(block: &mut Block, input: &str) {
    let i = numeric_input(block, input, None);
    let output = block.register_output("output", PortType::Float);
    block.output_type_from(output, i);
}

fn combine(
    inputs: Vec<Stored>,
    f: impl Fn(&[f64]) -> f64 + 'static,
) -> impl Fn(&GeometryBuildState) -> Option<Value> {
    move |state| {
        let values = inputs
            .iter()
            .map(|s| s.get(state))
            .collect::<Option<Vec<_>>>()?;
        let refs: Vec<&Value> = values.iter().collect();
        Value::combine(&refs, &f)
    }
}

const MATH_PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new(
    "operation",
    PropertyKind::Choice(MathOperation::NAMES),
    PropertyDefault::Text("Add"),
)];

/// Binary arithmetic on scalars, vectors or matrices
pub struct GeometryMathBlock;

impl BlockDefinition for GeometryMathBlock {
    fn class_name(&self) -> &'static str {
        "GeometryMathBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Add, subtract, multiply, divide, max or min"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        MATH_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        register_binary(block, "left", "right");
    }
}

impl GeometryBlock for GeometryMathBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let operation = MathOperation::from_name(ctx.block().property_text("operation")).unwrap_or_default();
        let inputs = vec![ctx.input("left"), ctx.input("right")];
        ctx.set_deferred("output", combine(inputs, move |c| operation.apply(c[0], c[1])))
    }
}

/// Floor-based modulo; `right` defaults to 1
pub struct GeometryModBlock;

impl BlockDefinition for GeometryModBlock {
    fn class_name(&self) -> &'static str {
        "GeometryModBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "a - floor(a / b) * b"
    }

    fn register_ports(&self, block: &mut Block) {
        let left = numeric_input(block, "left", None);
        numeric_input(block, "right", Some(Value::Float(1.0)));
        let output = block.register_output("output", PortType::Float);
        block.output_type_from(output, left);
    }
}

impl GeometryBlock for GeometryModBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let inputs = vec![ctx.input("left"), ctx.input("right")];
        ctx.set_deferred("output", combine(inputs, |c| value::modulo(c[0], c[1])))
    }
}

const CLAMP_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new("minimum", PropertyKind::Float, PropertyDefault::Float(0.0)),
    PropertyDescriptor::new("maximum", PropertyKind::Float, PropertyDefault::Float(1.0)),
];

/// Clamp between `min`/`max` inputs, or the `minimum`/`maximum` properties
/// when those inputs are absent
pub struct GeometryClampBlock;

impl BlockDefinition for GeometryClampBlock {
    fn class_name(&self) -> &'static str {
        "GeometryClampBlock"
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
        scalar_input(block, "min", true, None);
        scalar_input(block, "max", true, None);
    }
}

impl GeometryBlock for GeometryClampBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let block = ctx.block();
        let minimum = block.property_float("minimum", 0.0);
        let maximum = block.property_float("maximum", 1.0);
        let value = ctx.input("value");
        let min = ctx.input("min");
        let max = ctx.input("max");

        ctx.set_deferred("output", move |state| {
            let lo = min.get(state).and_then(|v| v.as_float()).unwrap_or(minimum);
            let hi = max.get(state).and_then(|v| v.as_float()).unwrap_or(maximum);
            value.get(state)?.map(|x| value::clamp(x, lo, hi))
        })
    }
}

/// 0 below `edge` (default 0.5), 1 at or above it
pub struct GeometryStepBlock;

impl BlockDefinition for GeometryStepBlock {
    fn class_name(&self) -> &'static str {
        "GeometryStepBlock"
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

impl GeometryBlock for GeometryStepBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let inputs = vec![ctx.input("value"), ctx.input("edge")];
        ctx.set_deferred("output", combine(inputs, |c| value::step(c[1], c[0])))
    }
}

/// Hermite interpolation between `edge0` (0) and `edge1` (1)
pub struct GeometrySmoothStepBlock;

impl BlockDefinition for GeometrySmoothStepBlock {
    fn class_name(&self) -> &'static str {
        "GeometrySmoothStepBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Smooth Hermite step"
    }

    fn register_ports(&self, block: &mut Block) {
        register_unary(block, "value");
        numeric_input(block, "edge0", Some(Value::Float(0.0)));
        numeric_input(block, "edge1", Some(Value::Float(1.0)));
    }
}

impl GeometryBlock for GeometrySmoothStepBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let inputs = vec![ctx.input("value"), ctx.input("edge0"), ctx.input("edge1")];
        ctx.set_deferred(
            "output",
            combine(inputs, |c| value::smoothstep(c[1], c[2], c[0])),
        )
    }
}

/// Linear interpolation `left + (right - left) * gradient`
pub struct GeometryLerpBlock;

impl BlockDefinition for GeometryLerpBlock {
    fn class_name(&self) -> &'static str {
        "GeometryLerpBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Linear interpolation"
    }

    fn register_ports(&self, block: &mut Block) {
        register_binary(block, "left", "right");
        numeric_input(block, "gradient", None);
    }
}

impl GeometryBlock for GeometryLerpBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let inputs = vec![ctx.input("left"), ctx.input("right"), ctx.input("gradient")];
        ctx.set_deferred("output", combine(inputs, |c| value::lerp(c[0], c[1], c[2])))
    }
}

const TRIGONOMETRY_PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new(
    "operation",
    PropertyKind::Choice(TrigonometryOperation::NAMES),
    PropertyDefault::Text("Cos"),
)];

/// Unary function applied to every component
pub struct GeometryTrigonometryBlock;

impl BlockDefinition for GeometryTrigonometryBlock {
    fn class_name(&self) -> &'static str {
        "GeometryTrigonometryBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Trigonometry and rounding functions"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        TRIGONOMETRY_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        register_unary(block, "input");
    }
}

impl GeometryBlock for GeometryTrigonometryBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let operation =
            TrigonometryOperation::from_name(ctx.block().property_text("operation")).unwrap_or_default();
        let input = ctx.input("input");
        ctx.set_deferred("output", move |state| {
            input.get(state)?.map(|x| operation.apply(x))
        })
    }
}

/// Euclidean length of a vector
pub struct GeometryLengthBlock;

impl BlockDefinition for GeometryLengthBlock {
    fn class_name(&self) -> &'static str {
        "GeometryLengthBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Vector length"
    }

    fn register_ports(&self, block: &mut Block) {
        numeric_input(block, "value", None);
        block.register_output("output", PortType::Float);
    }
}

impl GeometryBlock for GeometryLengthBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let input = ctx.input("value");
        ctx.set_deferred("output", move |state| {
            let c = input.get(state)?.components()?;
            Some(Value::Float(c.iter().map(|x| x * x).sum::<f64>().sqrt()))
        })
    }
}

/// Dot product of two vectors of the same width
pub struct GeometryDotBlock;

impl BlockDefinition for GeometryDotBlock {
    fn class_name(&self) -> &'static str {
        "GeometryDotBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Dot product"
    }

    fn register_ports(&self, block: &mut Block) {
        let l = numeric_input(block, "left", None);
        let r = numeric_input(block, "right", None);
        block.link_input_types(l, r);
        block.register_output("output", PortType::Float);
    }
}

impl GeometryBlock for GeometryDotBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let left = ctx.input("left");
        let right = ctx.input("right");
        ctx.set_deferred("output", move |state| {
            let a = left.get(state)?.components()?;
            let b = right.get(state)?.components()?;
            if a.len() != b.len() {
                return None;
            }
            Some(Value::Float(a.iter().zip(&b).map(|(x, y)| x * y).sum()))
        })
    }
}

const COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

struct VectorSources {
    xyzw: Stored,
    xyz: Stored,
    xy: Stored,
    zw: Stored,
    components: [Stored; 4],
}

impl VectorSources {
    /// Compose the four components. The widest connected vector input wins;
    /// otherwise the scalar inputs are used. Missing components are zero.
    fn compose(&self, state: &GeometryBuildState) -> Option<[f64; 4]> {
        let mut out = [0.0; 4];
        let fill = |out: &mut [f64; 4], offset: usize, value: Value| -> Option<()> {
            for (slot, c) in out[offset..].iter_mut().zip(value.components()?) {
                *slot = c;
            }
            Some(())
        };

        if let Some(v) = self.xyzw.get(state) {
            fill(&mut out, 0, v)?;
        } else if let Some(v) = self.xyz.get(state) {
            fill(&mut out, 0, v)?;
        } else if let Some(v) = self.xy.get(state) {
            fill(&mut out, 0, v)?;
            if let Some(zw) = self.zw.get(state) {
                fill(&mut out, 2, zw)?;
            }
        } else if self.components.iter().any(Stored::is_present) {
            for (slot, component) in out.iter_mut().zip(&self.components) {
                if let Some(v) = component.get(state) {
                    *slot = v.as_float()?;
                }
            }
        } else {
            return None;
        }
        Some(out)
    }
}

/// Builds vectors from components and splits them back apart
pub struct VectorConverterBlock;

impl BlockDefinition for VectorConverterBlock {
    fn class_name(&self) -> &'static str {
        "VectorConverterBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Utility
    }

    fn description(&self) -> &'static str {
        "Convert between vectors and components"
    }

    fn register_ports(&self, block: &mut Block) {
        block.register_input("xyzw", PortType::Vector4, true, None);
        block.register_input("xyz", PortType::Vector3, true, None);
        block.register_input("xy", PortType::Vector2, true, None);
        block.register_input("zw", PortType::Vector2, true, None);
        for name in COMPONENTS {
            scalar_input(block, name, true, None);
        }

        block.register_output("xyzw", PortType::Vector4);
        block.register_output("xyz", PortType::Vector3);
        block.register_output("xy", PortType::Vector2);
        block.register_output("zw", PortType::Vector2);
        for name in COMPONENTS {
            block.register_output(name, PortType::Float);
        }
    }
}

impl GeometryBlock for VectorConverterBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let sources = Rc::new(VectorSources {
            xyzw: ctx.input("xyzw"),
            xyz: ctx.input("xyz"),
            xy: ctx.input("xy"),
            zw: ctx.input("zw"),
            components: COMPONENTS.map(|name| ctx.input(name)),
        });

        let outputs: [(&str, fn([f64; 4]) -> Value); 8] = [
            ("xyzw", Value::Vector4),
            ("xyz", |v| Value::Vector3([v[0], v[1], v[2]])),
            ("xy", |v| Value::Vector2([v[0], v[1]])),
            ("zw", |v| Value::Vector2([v[2], v[3]])),
            ("x", |v| Value::Float(v[0])),
            ("y", |v| Value::Float(v[1])),
            ("z", |v| Value::Float(v[2])),
            ("w", |v| Value::Float(v[3])),
        ];
        for (name, extract) in outputs {
            let sources = Rc::clone(&sources);
            ctx.set_deferred(name, move |state| sources.compose(state).map(extract))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolvedTypes;

    fn literal(v: impl Into<Value>) -> Stored {
        Stored::Literal(v.into())
    }

    fn run<B: GeometryBlock>(definition: &B, inputs: &[(&str, Stored)], output: &str) -> Option<Value> {
        let mut block = Block::new(definition.class_name(), "test");
        for descriptor in definition.properties() {
            block
                .properties
                .insert(descriptor.name.to_string(), descriptor.default.to_value());
        }
        definition.register_ports(&mut block);
        let stored = block
            .inputs
            .iter()
            .map(|port| {
                inputs
                    .iter()
                    .find(|(name, _)| *name == port.name)
                    .map(|(_, s)| s.clone())
                    .or_else(|| port.default_value.clone().map(Stored::Literal))
                    .unwrap_or_default()
            })
            .collect();
        let types = ResolvedTypes::default();
        let mut ctx = GeometryBlockContext::new(&block, &types, stored);
        definition.build(&mut ctx).unwrap();
        let index = block.outputs.iter().position(|p| p.name == output).unwrap();
        ctx.into_outputs()[index].get(&GeometryBuildState::new())
    }

    #[test]
    fn test_math_broadcasts_scalar() {
        let out = run(
            &GeometryMathBlock,
            &[("left", literal([1.0, 2.0, 3.0])), ("right", literal(2.0))],
            "output",
        );
        assert_eq!(out, Some(Value::Vector3([3.0, 4.0, 5.0])));
    }

    #[test]
    fn test_clamp_inputs_override_properties() {
        let out = run(
            &GeometryClampBlock,
            &[("value", literal(5.0)), ("max", literal(3.0))],
            "output",
        );
        assert_eq!(out, Some(Value::Float(3.0)));
    }

    #[test]
    fn test_smoothstep_and_lerp() {
        let out = run(&GeometrySmoothStepBlock, &[("value", literal(0.5))], "output");
        assert_eq!(out, Some(Value::Float(0.5)));

        let out = run(
            &GeometryLerpBlock,
            &[
                ("left", literal([0.0, 10.0])),
                ("right", literal([10.0, 20.0])),
                ("gradient", literal(0.25)),
            ],
            "output",
        );
        assert_eq!(out, Some(Value::Vector2([2.5, 12.5])));
    }

    #[test]
    fn test_length_and_dot() {
        let out = run(&GeometryLengthBlock, &[("value", literal([3.0, 4.0]))], "output");
        assert_eq!(out, Some(Value::Float(5.0)));

        let out = run(
            &GeometryDotBlock,
            &[("left", literal([1.0, 2.0, 3.0])), ("right", literal([4.0, 5.0, 6.0]))],
            "output",
        );
        assert_eq!(out, Some(Value::Float(32.0)));
    }

    #[test]
    fn test_trigonometry() {
        let out = run(&GeometryTrigonometryBlock, &[("input", literal([0.0, 0.0]))], "output");
        assert_eq!(out, Some(Value::Vector2([1.0, 1.0])));
    }

    #[test]
    fn test_vector_converter() {
        let inputs = [("xy", literal([1.0, 2.0])), ("zw", literal([3.0, 4.0]))];
        assert_eq!(
            run(&VectorConverterBlock, &inputs, "xyzw"),
            Some(Value::Vector4([1.0, 2.0, 3.0, 4.0]))
        );
        assert_eq!(run(&VectorConverterBlock, &inputs, "z"), Some(Value::Float(3.0)));

        let inputs = [("y", literal(5.0))];
        assert_eq!(
            run(&VectorConverterBlock, &inputs, "xyz"),
            Some(Value::Vector3([0.0, 5.0, 0.0]))
        );
        assert_eq!(run(&VectorConverterBlock, &[], "x"), None);
    }
}
