//! Quarry indexing layer: umbrella crate.
//!
//! This crate re-exports all Quarry components for convenience.

#![doc = include_str!("../README.md")]

pub use quarry_core as core;
pub use quarry_index as index;
