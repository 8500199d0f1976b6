//! Error types shared by every stage of the query pipeline.
//!
//! Each stage owns one error type; [`QueryError`] is the single
//! discriminated failure value handed back to callers.

use std::fmt;

use thiserror::Error;

use crate::lexer::{LexError, Position};

/// Malformed query text. Surfaced verbatim, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Parse error at {position}: {message}")]
pub struct ParseError {
    pub position: Position,
    pub message: String,
}

impl ParseError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        ParseError {
            position,
            message: message.into(),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            position: e.position,
            message: e.message,
        }
    }
}

/// Category of a binding failure found by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    UnknownType,
    UnknownAttribute,
    TypeMismatch,
    InvalidTraitCombination,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticErrorKind::UnknownType => "unknown type",
            SemanticErrorKind::UnknownAttribute => "unknown attribute",
            SemanticErrorKind::TypeMismatch => "type mismatch",
            SemanticErrorKind::InvalidTraitCombination => "invalid trait combination",
        };
        f.write_str(name)
    }
}

/// A query whose identifiers do not bind against the type registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Semantic error: {kind} '{identifier}'")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub identifier: String,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, identifier: impl Into<String>) -> Self {
        SemanticError {
            kind,
            identifier: identifier.into(),
        }
    }

    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::new(SemanticErrorKind::UnknownType, name)
    }

    pub fn unknown_attribute(name: impl Into<String>) -> Self {
        Self::new(SemanticErrorKind::UnknownAttribute, name)
    }

    pub fn type_mismatch(name: impl Into<String>) -> Self {
        Self::new(SemanticErrorKind::TypeMismatch, name)
    }

    pub fn invalid_trait(name: impl Into<String>) -> Self {
        Self::new(SemanticErrorKind::InvalidTraitCombination, name)
    }
}

/// Internal invariant violation: a tree shape reached a later stage that
/// earlier stages should have excluded. Indicates a defect, not user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// A node reached the translator without a resolved type
    #[error("Unresolved node reached the translator: {0}")]
    Unresolved(String),

    /// A node of this kind cannot appear at this position
    #[error("Unexpected {found} where {expected} was required")]
    UnexpectedNode {
        expected: &'static str,
        found: String,
    },

    /// `with_children` was given the wrong number of children
    #[error("Node '{node}' expects {expected} children, got {found}")]
    ArityMismatch {
        node: &'static str,
        expected: usize,
        found: usize,
    },

    /// Range bounds do not fit the integer domain
    #[error("Range overflow: offset {offset} + count {count}")]
    RangeOverflow { offset: u64, count: u64 },
}

/// Failure reported by the external execution engine or index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        EngineError {
            message: message.into(),
        }
    }
}

/// Wraps any engine failure (script error, timeout, connectivity).
/// The core performs no retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Execution of script failed: {source}")]
pub struct ExecutionError {
    pub script: String,
    #[source]
    pub source: EngineError,
}

/// The raw result did not have the shape the compiled query implies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot extract result: {0}")]
pub struct ExtractionError(pub String);

/// The single failure value returned by the public entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
