// tests/common/mod.rs
//
// Shared fixtures: a small data catalog type system and helpers that run
// the pipeline stages with default settings.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use metaquery::ast::Expr;
use metaquery::error::{EngineError, QueryError};
use metaquery::schema::InMemoryTypeRegistry;
use metaquery::{
    Bindings, Compiler, DefaultGraphPersistence, IndexQuery, Pagination, PersistenceConfig,
    QueryConfig, RawValue, ScriptEngine, Validator, Vertex, parse_query,
};

pub const TYPES_JSON: &str = r#"[
    {"name": "Asset", "category": "class", "attributes": [
        {"name": "name", "type": "string"},
        {"name": "qualifiedName", "type": "string"},
        {"name": "owner", "type": "string"}
    ]},
    {"name": "Database", "category": "class", "supertypes": ["Asset"], "attributes": [
        {"name": "createTime", "type": "long"}
    ]},
    {"name": "Table", "category": "class", "supertypes": ["Asset"], "attributes": [
        {"name": "db", "type": "Database"},
        {"name": "columns", "type": "array<Column>"},
        {"name": "parent", "type": "Table"},
        {"name": "retention", "type": "int"},
        {"name": "temporary", "type": "boolean"},
        {"name": "location", "type": "Address"}
    ]},
    {"name": "Column", "category": "class", "supertypes": ["Asset"], "attributes": [
        {"name": "table", "type": "Table"},
        {"name": "dataType", "type": "string"}
    ]},
    {"name": "Encrypted", "category": "trait", "attributes": [
        {"name": "algorithm", "type": "string"}
    ]},
    {"name": "PII", "category": "trait"},
    {"name": "Address", "category": "struct", "attributes": [
        {"name": "city", "type": "string"}
    ]}
]"#;

pub fn registry() -> InMemoryTypeRegistry {
    InMemoryTypeRegistry::from_json(TYPES_JSON).unwrap()
}

pub fn strategy() -> DefaultGraphPersistence {
    DefaultGraphPersistence::new(PersistenceConfig::default())
}

pub fn parse(text: &str) -> Expr {
    parse_query(text, Pagination::default()).unwrap()
}

pub fn validate(text: &str) -> Expr {
    let registry = registry();
    Validator::new(&registry).validate(&parse(text)).unwrap()
}

/// Compiles `text` with default settings and returns the script text.
pub fn compile(text: &str) -> String {
    compile_with(text, &QueryConfig::default())
}

pub fn compile_with(text: &str, config: &QueryConfig) -> String {
    try_compile_with(text, config).unwrap()
}

pub fn try_compile_with(text: &str, config: &QueryConfig) -> Result<String, QueryError> {
    let registry = registry();
    let strategy = strategy();
    Compiler::new(&registry, &strategy, config)
        .compile(text, None, None)
        .map(|compiled| compiled.script)
}

pub fn entity(id: &str, type_name: &str, guid: &str, name: &str) -> Vertex {
    Vertex::new(id)
        .with_property("__typeName", RawValue::from(type_name))
        .with_property("__guid", RawValue::from(guid))
        .with_property("__state", RawValue::from("ACTIVE"))
        .with_property("Asset.name", RawValue::from(name))
}

pub fn map(entries: &[(&str, RawValue)]) -> RawValue {
    RawValue::Map(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<HashMap<_, _>>(),
    )
}

/// Script engine returning one canned result and recording every script.
pub struct FakeEngine {
    pub result: Result<RawValue, EngineError>,
    pub scripts: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn returning(result: RawValue) -> Self {
        FakeEngine {
            result: Ok(result),
            scripts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        FakeEngine {
            result: Err(EngineError::new(message)),
            scripts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_script(&self) -> Option<String> {
        self.scripts.lock().unwrap().last().cloned()
    }
}

impl ScriptEngine for FakeEngine {
    fn execute(&self, script: &str, _bindings: &Bindings) -> Result<RawValue, EngineError> {
        self.scripts.lock().unwrap().push(script.to_string());
        self.result.clone()
    }
}

/// Full-text index returning canned hits and recording every query.
pub struct FakeIndex {
    pub hits: Vec<(Vertex, f64)>,
    pub queries: Mutex<Vec<(String, String)>>,
}

impl FakeIndex {
    pub fn with_hits(hits: Vec<(Vertex, f64)>) -> Self {
        FakeIndex {
            hits,
            queries: Mutex::new(Vec::new()),
        }
    }
}

impl IndexQuery for FakeIndex {
    fn index_query(&self, index: &str, query: &str) -> Result<Vec<(Vertex, f64)>, EngineError> {
        self.queries
            .lock()
            .unwrap()
            .push((index.to_string(), query.to_string()));
        Ok(self.hits.clone())
    }
}
