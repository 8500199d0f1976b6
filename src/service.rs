//! The query pipeline and the service running it.
//!
//! ```text
//! text ─parse─▶ Expr ─validate─▶ Expr ─translate─▶ ScriptExpr ─optimize─▶ ScriptExpr ─print─▶ String
//! ```
//!
//! [`Compiler`] owns the pipeline up to the script text. [`QueryService`]
//! adds execution, result extraction and full-text search.

use std::sync::Arc;

use crate::ast::Expr;
use crate::config::QueryConfig;
use crate::engine::{Bindings, IndexQuery, ScriptEngine};
use crate::error::{ExecutionError, QueryError, TranslationError};
use crate::optimizer::Optimizer;
use crate::output::to_script;
use crate::parser::{Pagination, parse_query};
use crate::result::{EntityHeader, QueryResult, ResultExtractor, ResultShape};
use crate::schema::{DataType, TypeRegistry};
use crate::script::ScriptExpr;
use crate::strategy::PersistenceStrategy;
use crate::translator::Translator;
use crate::validator::Validator;

/// A query ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub script: String,
    pub has_select: bool,
    /// Select aliases in order, empty without a select list
    pub aliases: Vec<String>,
    pub shape: ResultShape,
}

pub struct Compiler<'a> {
    registry: &'a dyn TypeRegistry,
    strategy: &'a dyn PersistenceStrategy,
    config: &'a QueryConfig,
}

impl<'a> Compiler<'a> {
    pub fn new(
        registry: &'a dyn TypeRegistry,
        strategy: &'a dyn PersistenceStrategy,
        config: &'a QueryConfig,
    ) -> Self {
        Compiler {
            registry,
            strategy,
            config,
        }
    }

    /// Compiles query text. `limit` and `offset` page the results when the
    /// text has no `limit` clause of its own.
    pub fn compile(
        &self,
        dsl: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<CompiledQuery, QueryError> {
        let validated = self.validate(dsl, limit, offset)?;
        Ok(self.compile_validated(&validated)?)
    }

    /// Parses and validates query text without translating it.
    pub fn validate(
        &self,
        dsl: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Expr, QueryError> {
        let parsed = parse_query(dsl, Pagination::new(self.config, limit, offset))?;
        Ok(Validator::new(self.registry).validate(&parsed)?)
    }

    /// Translates and optimizes a validated tree.
    pub fn script_tree(&self, query: &Expr) -> Result<ScriptExpr, TranslationError> {
        let script = Translator::new(self.strategy, self.config).translate(query)?;
        Optimizer::new(self.config, self.strategy).optimize(&script)
    }

    /// Compiles an already validated tree.
    pub fn compile_validated(&self, query: &Expr) -> Result<CompiledQuery, TranslationError> {
        let script = to_script(&self.script_tree(query)?);
        tracing::debug!(script_len = script.len(), "compiled query");

        let aliases: Vec<String> = query
            .select_items()
            .map(|items| items.iter().map(|item| item.alias.clone()).collect())
            .unwrap_or_default();
        let has_select = query.select_items().is_some();
        let trait_source = query
            .source_type()
            .and_then(|s| s.resolved.as_ref())
            .is_some_and(|r| matches!(r.data_type, DataType::Trait(_)));

        let shape = if has_select {
            ResultShape::Attributes(aliases.clone())
        } else if trait_source {
            ResultShape::TraitRows
        } else {
            ResultShape::Entities
        };

        Ok(CompiledQuery {
            script,
            has_select,
            aliases,
            shape,
        })
    }
}

/// Compiles, runs and extracts queries against one graph store.
///
/// All collaborators are shared, so a service can be cloned into worker
/// threads cheaply.
#[derive(Clone)]
pub struct QueryService {
    registry: Arc<dyn TypeRegistry>,
    strategy: Arc<dyn PersistenceStrategy>,
    engine: Arc<dyn ScriptEngine>,
    index: Arc<dyn IndexQuery>,
    config: QueryConfig,
}

impl QueryService {
    pub fn new(
        registry: Arc<dyn TypeRegistry>,
        strategy: Arc<dyn PersistenceStrategy>,
        engine: Arc<dyn ScriptEngine>,
        index: Arc<dyn IndexQuery>,
        config: QueryConfig,
    ) -> Self {
        QueryService {
            registry,
            strategy,
            engine,
            index,
            config,
        }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(self.registry.as_ref(), self.strategy.as_ref(), &self.config)
    }

    fn extractor(&self) -> ResultExtractor<'_> {
        ResultExtractor::new(self.strategy.as_ref(), &self.config)
    }

    /// Compiles and runs `dsl`.
    pub fn query(
        &self,
        dsl: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<QueryResult, QueryError> {
        let compiled = self.compiler().compile(dsl, limit, offset)?;
        self.execute(&compiled)
    }

    pub fn execute(&self, compiled: &CompiledQuery) -> Result<QueryResult, QueryError> {
        let raw = self
            .engine
            .execute(&compiled.script, &Bindings::new())
            .map_err(|source| ExecutionError {
                script: compiled.script.clone(),
                source,
            })?;
        let result = self.extractor().extract(&compiled.shape, &raw)?;
        tracing::debug!(rows = result.len(), "executed query");
        Ok(result)
    }

    /// Searches the full-text index. Hits are ordered by descending score,
    /// hits without a numeric score last, and paged like query results.
    pub fn search_full_text(
        &self,
        text: &str,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<(EntityHeader, f64)>, QueryError> {
        let query = full_text_query(&self.config.fulltext_field, text);
        let mut hits = self
            .index
            .index_query(&self.config.fulltext_index, &query)
            .map_err(|source| ExecutionError {
                script: query.clone(),
                source,
            })?;

        let guid_key = self.strategy.guid_key();
        hits.retain(|(vertex, _)| vertex.property_text(guid_key).is_some());
        // Unscored (NaN) hits go last
        hits.sort_by(|a, b| {
            a.1.is_nan()
                .cmp(&b.1.is_nan())
                .then_with(|| b.1.total_cmp(&a.1))
        });

        let (count, skip) = Pagination::new(&self.config, limit, offset).page();
        let extractor = self.extractor();
        let page = hits
            .iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(count).unwrap_or(usize::MAX))
            .map(|(vertex, score)| extractor.header(vertex).map(|header| (header, *score)))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(hits = hits.len(), returned = page.len(), "full-text search");
        Ok(page)
    }
}

/// Builds the index query for `text` on `field`.
///
/// ```
/// use metaquery::service::full_text_query;
///
/// assert_eq!(full_text_query("entityText", "sales:db"), r#"v."entityText":(sales\:db)"#);
/// ```
pub fn full_text_query(field: &str, text: &str) -> String {
    format!("v.\"{}\":({})", field, escape_lucene(text))
}

/// Backslash-escapes the characters the index query syntax reserves.
pub fn escape_lucene(text: &str) -> String {
    const RESERVED: &str = "+-&|!(){}[]^\"~*?:\\/";
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
