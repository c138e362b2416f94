// SPDX-License-Identifier: MIT OR Apache-2.0
//! Conditions and random numbers.

use super::state::GeometryBlockContext;
use super::GeometryBlock;
use crate::block::{Block, BlockCategory};
use crate::evaluation::BuildError;
use crate::graphs::ops::{numeric_input, scalar_input, ConditionTest};
use crate::port::PortType;
use crate::property::{PropertyDefault, PropertyDescriptor, PropertyKind};
use crate::registry::BlockDefinition;
use crate::value::Value;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;

const CONDITION_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::new(
        "test",
        PropertyKind::Choice(ConditionTest::NAMES),
        PropertyDefault::Text("Equal"),
    ),
    PropertyDescriptor::new("epsilon", PropertyKind::Float, PropertyDefault::Float(0.0)),
];

/// Picks `if_true` or `if_false` by comparing `left` with `right`.
///
/// Unconnected branches fall back to 1 and 0.
pub struct ConditionBlock;

impl BlockDefinition for ConditionBlock {
    fn class_name(&self) -> &'static str {
        "ConditionBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Logic
    }

    fn description(&self) -> &'static str {
        "Choose between two values"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        CONDITION_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        scalar_input(block, "left", false, None);
        scalar_input(block, "right", false, Some(0.0));
        let if_true = numeric_input(block, "if_true", Some(Value::Float(1.0)));
        let if_false = numeric_input(block, "if_false", Some(Value::Float(0.0)));
        block.inputs[if_true].optional = true;
        block.inputs[if_false].optional = true;
        block.link_input_types(if_true, if_false);
        let output = block.register_output("output", PortType::Float);
        block.output_type_from(output, if_true);
    }
}

impl GeometryBlock for ConditionBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let block = ctx.block();
        let test = ConditionTest::from_name(block.property_text("test")).unwrap_or_default();
        let epsilon = block.property_float("epsilon", 0.0);
        let left = ctx.input("left");
        let right = ctx.input("right");
        let if_true = ctx.input("if_true");
        let if_false = ctx.input("if_false");

        ctx.set_deferred("output", move |state| {
            let a = left.get(state)?.as_float()?;
            let b = right.get(state)?.as_float()?;
            if test.evaluate(a, b, epsilon) {
                if_true.get(state)
            } else {
                if_false.get(state)
            }
        })
    }
}

/// When a random block draws a new number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RandomLockMode {
    /// Every evaluation draws the next number of the seeded sequence
    #[default]
    NoLock,
    /// One number per loop iteration
    LoopId,
    /// One number per instance
    InstanceId,
    /// One number for the whole pass
    Once,
}

impl RandomLockMode {
    /// Choice names
    pub const NAMES: &'static [&'static str] = &["NoLock", "LoopID", "InstanceID", "Once"];

    /// Parse a choice name
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "NoLock" => Self::NoLock,
            "LoopID" => Self::LoopId,
            "InstanceID" => Self::InstanceId,
            "Once" => Self::Once,
            _ => return None,
        })
    }
}

const RANDOM_PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new(
    "lock_mode",
    PropertyKind::Choice(RandomLockMode::NAMES),
    PropertyDefault::Text("NoLock"),
)];

/// Seed for a context-locked draw
fn context_seed(seed: i64, context: usize) -> u64 {
    (seed as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ context as u64
}

/// Uniform random value between `min` (0) and `max` (1), per component.
///
/// Sequences are deterministic for a given seed and context.
pub struct RandomNumberBlock;

impl BlockDefinition for RandomNumberBlock {
    fn class_name(&self) -> &'static str {
        "RandomNumberBlock"
    }

    fn category(&self) -> BlockCategory {
        BlockCategory::Math
    }

    fn description(&self) -> &'static str {
        "Random number in a range"
    }

    fn properties(&self) -> &'static [PropertyDescriptor] {
        RANDOM_PROPERTIES
    }

    fn register_ports(&self, block: &mut Block) {
        let min = numeric_input(block, "min", Some(Value::Float(0.0)));
        let max = numeric_input(block, "max", Some(Value::Float(1.0)));
        block.link_input_types(min, max);
        let seed = block.register_input("seed", PortType::Int, true, Some(Value::Int(0)));
        block.inputs[seed].accepted_types.push(PortType::Float);
        let output = block.register_output("output", PortType::Float);
        block.output_type_from(output, min);
    }
}

impl GeometryBlock for RandomNumberBlock {
    fn build(&self, ctx: &mut GeometryBlockContext<'_>) -> Result<(), BuildError> {
        let lock = RandomLockMode::from_name(ctx.block().property_text("lock_mode")).unwrap_or_default();
        let min = ctx.input("min");
        let max = ctx.input("max");
        let seed = ctx.input("seed");
        let sequence: RefCell<Option<(i64, StdRng)>> = RefCell::new(None);
        let once: RefCell<Option<Value>> = RefCell::new(None);

        ctx.set_deferred("output", move |state| {
            let min = min.get(state)?;
            let max = max.get(state)?;
            let seed = seed.get(state).and_then(|v| v.as_int()).unwrap_or(0);
            let draw = |rng: &mut StdRng| {
                Value::combine(&[&min, &max], |c| c[0] + (c[1] - c[0]) * rng.gen::<f64>())
            };

            match lock {
                RandomLockMode::NoLock => {
                    let mut sequence = sequence.borrow_mut();
                    if sequence.as_ref().map(|(s, _)| *s) != Some(seed) {
                        *sequence = Some((seed, StdRng::seed_from_u64(seed as u64)));
                    }
                    let (_, rng) = sequence.as_mut()?;
                    draw(rng)
                }
                RandomLockMode::LoopId => {
                    let context = state.loop_index().unwrap_or(0);
                    draw(&mut StdRng::seed_from_u64(context_seed(seed, context)))
                }
                RandomLockMode::InstanceId => {
                    let context = state.instance().unwrap_or(0);
                    draw(&mut StdRng::seed_from_u64(context_seed(seed, context)))
                }
                RandomLockMode::Once => {
                    let cached = once.borrow().clone();
                    if cached.is_some() {
                        return cached;
                    }
                    let value = draw(&mut StdRng::seed_from_u64(seed as u64))?;
                    *once.borrow_mut() = Some(value.clone());
                    Some(value)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphs::geometry::state::{GeometryBuildState, Stored};
    use crate::property::PropertyValue;
    use crate::types::ResolvedTypes;

    fn build(definition: &dyn GeometryBlock, properties: &[(&str, &str)], inputs: &[(&str, Value)]) -> Stored {
        let mut block = Block::new(definition.class_name(), "test");
        for descriptor in definition.properties() {
            block
                .properties
                .insert(descriptor.name.to_string(), descriptor.default.to_value());
        }
        for (name, value) in properties {
            block
                .properties
                .insert(name.to_string(), PropertyValue::Text(value.to_string()));
        }
        definition.register_ports(&mut block);
        let stored = block
            .inputs
            .iter()
            .map(|port| {
                inputs
                    .iter()
                    .find(|(name, _)| *name == port.name)
                    .map(|(_, v)| Stored::Literal(v.clone()))
                    .or_else(|| port.default_value.clone().map(Stored::Literal))
                    .unwrap_or_default()
            })
            .collect();
        let types = ResolvedTypes::default();
        let mut ctx = GeometryBlockContext::new(&block, &types, stored);
        definition.build(&mut ctx).unwrap();
        ctx.into_outputs().remove(0)
    }

    #[test]
    fn test_condition_branches() {
        let state = GeometryBuildState::new();
        let inputs = [
            ("left", Value::Float(2.0)),
            ("right", Value::Float(1.0)),
            ("if_true", Value::Vector2([1.0, 1.0])),
            ("if_false", Value::Vector2([0.0, 0.0])),
        ];
        let out = build(&ConditionBlock, &[("test", "GreaterThan")], &inputs);
        assert_eq!(out.get(&state), Some(Value::Vector2([1.0, 1.0])));
        let out = build(&ConditionBlock, &[("test", "LessThan")], &inputs);
        assert_eq!(out.get(&state), Some(Value::Vector2([0.0, 0.0])));

        // Unconnected branches use their literal fallbacks
        let out = build(&ConditionBlock, &[], &[("left", Value::Float(0.0))]);
        assert_eq!(out.get(&state), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_random_in_range_and_deterministic() {
        let inputs = [("min", Value::Float(2.0)), ("max", Value::Float(3.0)), ("seed", Value::Int(7))];
        let a = build(&RandomNumberBlock, &[], &inputs);
        let b = build(&RandomNumberBlock, &[], &inputs);
        let state = GeometryBuildState::new();
        for _ in 0..20 {
            let x = a.get(&state).and_then(|v| v.as_float()).unwrap();
            assert!((2.0..3.0).contains(&x));
            assert_eq!(Some(x), b.get(&state).and_then(|v| v.as_float()));
        }
    }

    #[test]
    fn test_random_lock_modes() {
        let state = GeometryBuildState::new();
        let once = build(&RandomNumberBlock, &[("lock_mode", "Once")], &[]);
        let first = once.get(&state);
        assert_eq!(once.get(&state), first);

        let free = build(&RandomNumberBlock, &[], &[]);
        assert_ne!(free.get(&state), free.get(&state));

        let locked = build(&RandomNumberBlock, &[("lock_mode", "InstanceID")], &[]);
        let at = |i| state.scoped(|c| c.instance = Some(i), || locked.get(&state));
        assert_eq!(at(3), at(3));
        assert_ne!(at(3), at(4));
    }
}
