//! Check, compile and extract metaquery queries

use super::{CliError, json_to_raw, result_to_json};
use crate::{
    Compiler, DefaultGraphPersistence, InMemoryTypeRegistry, Lexer, Parser, ResultExtractor,
    Settings, output::to_script_pretty,
};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The query to check
    pub query: String,
    /// Type definitions as a JSON array; without them only syntax is checked
    pub types: Option<String>,
}

/// Result of a check operation
#[derive(Debug, PartialEq, Eq)]
pub enum CheckResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Syntax and type validation passed; holds the canonical query text
    Valid(String),
}

/// Options for the compile command
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub query: String,
    /// Type definitions as a JSON array
    pub types: String,
    pub settings: Settings,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Put each traversal step on its own line
    pub pretty: bool,
}

/// Options for the extract command
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub query: String,
    /// Type definitions as a JSON array
    pub types: String,
    pub settings: Settings,
    /// Raw engine result as JSON
    pub input: Option<String>,
}

/// Execute a check operation
pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let lexer = Lexer::new(&options.query);
    let mut parser = Parser::new(lexer)?;
    let parsed = parser.parse_query()?;

    let Some(types) = &options.types else {
        return Ok(CheckResult::SyntaxValid);
    };
    let registry = InMemoryTypeRegistry::from_json(types)?;
    let validated = crate::Validator::new(&registry)
        .validate(&parsed)
        .map_err(crate::QueryError::from)?;
    Ok(CheckResult::Valid(validated.to_string()))
}

/// Execute a compile operation, returning the traversal script
pub fn execute_compile(options: &CompileOptions) -> Result<String, CliError> {
    let registry = InMemoryTypeRegistry::from_json(&options.types)?;
    let strategy = DefaultGraphPersistence::new(options.settings.persistence.clone());
    let compiler = Compiler::new(&registry, &strategy, &options.settings.query);

    if !options.pretty {
        let compiled = compiler.compile(&options.query, options.limit, options.offset)?;
        return Ok(compiled.script);
    }

    let validated = compiler.validate(&options.query, options.limit, options.offset)?;
    let script = compiler
        .script_tree(&validated)
        .map_err(crate::QueryError::from)?;
    Ok(to_script_pretty(&script))
}

/// Execute an extract operation: classify a raw engine result for a query
pub fn execute_extract(options: &ExtractOptions) -> Result<serde_json::Value, CliError> {
    let json_str = options.input.as_ref().ok_or(CliError::NoInput)?;
    let raw = json_to_raw(serde_json::from_str(json_str)?)?;

    let registry = InMemoryTypeRegistry::from_json(&options.types)?;
    let strategy = DefaultGraphPersistence::new(options.settings.persistence.clone());
    let compiled =
        Compiler::new(&registry, &strategy, &options.settings.query).compile(&options.query, None, None)?;

    let result = ResultExtractor::new(&strategy, &options.settings.query)
        .extract(&compiled.shape, &raw)
        .map_err(crate::QueryError::from)?;
    result_to_json(&result)
}
