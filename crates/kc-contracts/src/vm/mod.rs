//! # Virtual Machine
//!
//! Gas metering, checked arithmetic and the tree-walking interpreter.

pub mod arith;
pub mod gas;
pub mod interpreter;

pub use gas::*;
pub use interpreter::*;
