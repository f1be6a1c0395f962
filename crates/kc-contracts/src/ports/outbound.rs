//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the engine depends on:
//! - Source parsing, provided by the external lexer/parser
//! - Registry persistence, holding deployed contracts and balances

use crate::domain::ast::Expr;
use crate::domain::entities::Registry;
use crate::errors::ParseError;
use async_trait::async_trait;

// =============================================================================
// SOURCE PARSER
// =============================================================================

/// Turns contract source into an untyped syntax tree.
///
/// Parsing is pure computation, so the port is synchronous.
pub trait SourceParser: Send + Sync {
    /// Parses `code`.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the source is not a valid program.
    fn parse(&self, code: &[u8]) -> Result<Expr, ParseError>;
}

// =============================================================================
// REGISTRY STORE
// =============================================================================

/// Holds the authoritative registry.
///
/// Implementations only need to make `load` and `store` individually
/// atomic; the service serializes writers so that a load, a call and the
/// following store form one transaction.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Snapshot of the current registry.
    async fn load(&self) -> Registry;

    /// Replaces the registry with `registry`.
    async fn store(&self, registry: Registry);
}
