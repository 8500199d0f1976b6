//! Boundary to the graph store that runs compiled scripts.
//!
//! Connection handling, transactions and retries belong to the
//! implementations of these traits.

use std::collections::HashMap;

use crate::error::EngineError;
use crate::value::{RawValue, Vertex};

/// Named values made available to a script.
pub type Bindings = HashMap<String, RawValue>;

pub trait ScriptEngine: Send + Sync {
    fn execute(&self, script: &str, bindings: &Bindings) -> Result<RawValue, EngineError>;
}

/// Access to a full-text index of entity vertices.
pub trait IndexQuery: Send + Sync {
    /// Runs `query` against `index`, returning matching vertices with
    /// their relevance scores.
    fn index_query(&self, index: &str, query: &str) -> Result<Vec<(Vertex, f64)>, EngineError>;
}
