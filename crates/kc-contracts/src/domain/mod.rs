//! # Domain Layer (Inner Hexagon)
//!
//! Type model, value model, syntax trees and the entities the engine
//! passes around. No I/O and no async code.

pub mod ast;
pub mod builtins;
pub mod entities;
pub mod invariants;
pub mod services;
pub mod types;
pub mod values;

pub use ast::*;
pub use builtins::*;
pub use entities::*;
pub use invariants::*;
pub use services::*;
pub use types::*;
pub use values::*;
