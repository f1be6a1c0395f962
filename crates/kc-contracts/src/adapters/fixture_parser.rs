//! # Fixture Parser
//!
//! In-memory `SourceParser` mapping known source texts to prebuilt trees.
//! Stands in for the external lexer/parser in tests and tooling.

use crate::domain::ast::Expr;
use crate::errors::ParseError;
use crate::ports::outbound::SourceParser;
use std::collections::HashMap;

/// Parser backed by a fixed table of sources.
#[derive(Clone, Debug, Default)]
pub struct FixtureParser {
    sources: HashMap<Vec<u8>, Expr>,
}

impl FixtureParser {
    /// Empty parser; every source is a syntax error.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the tree `code` parses to.
    pub fn register(&mut self, code: impl Into<Vec<u8>>, tree: Expr) {
        self.sources.insert(code.into(), tree);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, code: impl Into<Vec<u8>>, tree: Expr) -> Self {
        self.register(code, tree);
        self
    }
}

impl SourceParser for FixtureParser {
    fn parse(&self, code: &[u8]) -> Result<Expr, ParseError> {
        let text = std::str::from_utf8(code).map_err(|_| ParseError::InvalidEncoding)?;
        self.sources
            .get(code)
            .cloned()
            .ok_or_else(|| ParseError::Syntax(format!("unrecognized source {text:?}")))
    }
}
