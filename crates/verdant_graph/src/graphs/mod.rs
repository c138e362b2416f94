// SPDX-License-Identifier: MIT OR Apache-2.0
//! Specialized graph types built on the core framework.

pub mod geometry;
pub mod material;
pub(crate) mod ops;

pub use ops::{ConditionTest, MathOperation, TrigonometryOperation};
