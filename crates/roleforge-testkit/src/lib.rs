//! # Roleforge Testkit
//!
//! Testing utilities for the roleforge engine: prebuilt fixtures over
//! the in-memory store and a map-backed label source.

pub mod fixtures;

pub use fixtures::{StaticLabels, TestFixture};
