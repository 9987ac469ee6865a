//! Integration test suite for quarry-index.
//!
//! Exercises complete index definitions against the in-memory record source
//! and backend: schema building, document preparation with translatable
//! fields, and the index lifecycle.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

mod common;
mod integration;
