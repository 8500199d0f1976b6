//! # Metadata Query Language - Abstract Syntax Tree
//!
//! This module defines the source tree of the query language: the parsed
//! (and, after validation, type-annotated) representation of a query over
//! the entities of a metadata repository.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Query nodes ([`Expr`] and its [`ExprKind`]s)
//! - **[operators]** - Comparison and logical operators, sort direction
//! - **[display]** - Canonical query text for a tree
//!
//! ## Quick Start
//!
//! ```text
//! from Table isa Encrypted where db.name = "sales" select name as table orderby name limit 10
//! ```
//!
//! This query returns the names of encrypted tables of the `sales` database.
//!
//! ## Core Concepts
//!
//! ### Clause Nesting
//!
//! Every clause wraps the clause before it. The query above is the tree
//!
//! ```text
//! SelectList
//! └── Limit(10, 0)
//!     └── OrderBy(name asc)
//!         └── Filter(db.name = "sales")
//!             └── TraitFilter(Encrypted)
//!                 └── TypeSelect(Table)
//! ```
//!
//! ### Paths
//!
//! Dotted paths navigate reference attributes: `db.name` is the `name` of the
//! entity the `db` attribute points to. Paths are resolved against the type
//! of the clause they appear in.
//!
//! ### Pagination
//!
//! Every parsed query carries exactly one `limit`. When the text has none,
//! the parser injects the caller's page size, so traversals are always
//! bounded.
pub mod display;
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{Expr, ExprKind, Literal, Resolved, SelectItem};
pub use operators::{CompareOp, LogicalOp, SortDirection};
pub use tokens::Token;
