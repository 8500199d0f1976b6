pub mod ast;
pub mod config;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod optimizer;
pub mod output;
pub mod parser;
pub mod result;
pub mod schema;
pub mod script;
pub mod service;
pub mod strategy;
pub mod translator;
pub mod validator;
pub mod value;
pub mod visitor;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{CompareOp, Expr, ExprKind, Literal, LogicalOp, SortDirection, Token};
pub use config::{PersistenceConfig, QueryConfig, Settings};
pub use engine::{Bindings, IndexQuery, ScriptEngine};
pub use error::{
    EngineError, ExecutionError, ExtractionError, ParseError, QueryError, SemanticError,
    SemanticErrorKind, TranslationError,
};
pub use lexer::{LexError, Lexer, Position};
pub use optimizer::{Optimizer, OrderFinder};
pub use output::{to_script, to_script_pretty};
pub use parser::{Pagination, Parser, parse_query};
pub use result::{EntityHeader, QueryResult, ResultExtractor, ResultShape};
pub use schema::{InMemoryTypeRegistry, TypeDef, TypeRegistry};
pub use script::ScriptExpr;
pub use service::{CompiledQuery, Compiler, QueryService};
pub use strategy::{DefaultGraphPersistence, EdgeDirection, PersistenceStrategy};
pub use translator::Translator;
pub use validator::Validator;
pub use value::{RawValue, Vertex};
