// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI command implementations.

pub mod blocks;
pub mod common;
pub mod compile;
pub mod config;
pub mod mesh;
pub mod texture;
