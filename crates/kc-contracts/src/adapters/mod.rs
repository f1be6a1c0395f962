//! # Adapters Layer (Outer Hexagon)
//!
//! In-memory implementations of the driven ports.

pub mod fixture_parser;
pub mod registry_store;

pub use fixture_parser::*;
pub use registry_store::*;
