use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

// --- Defaults ---
pub const DEFAULT_LIMIT: u64 = 100;
pub const DEFAULT_MAX_LIMIT: u64 = 10_000;
pub const DEFAULT_MAX_LOOP_DEPTH: u32 = 10;
pub const DEFAULT_FULLTEXT_INDEX: &str = "fulltext_index";
pub const DEFAULT_FULLTEXT_FIELD: &str = "entityText";

pub const DEFAULT_TYPE_KEY: &str = "__typeName";
pub const DEFAULT_GUID_KEY: &str = "__guid";
pub const DEFAULT_STATE_KEY: &str = "__state";
pub const DEFAULT_TRAIT_NAMES_KEY: &str = "__traitNames";
pub const DEFAULT_EDGE_LABEL_PREFIX: &str = "__";

/// Compiler and search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page size used when neither the query nor the caller gives one
    pub default_limit: u64,
    /// Hard upper bound on any page size
    pub max_limit: u64,
    /// Depth of a `loop` without `times`, and the cap on explicit depths
    pub max_loop_depth: u32,
    /// Order paged results by GUID when the query has no ordering
    pub stable_pagination: bool,
    pub fulltext_index: String,
    pub fulltext_field: String,
    /// Attributes tried, in order, for an entity's display text
    pub display_attributes: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            max_loop_depth: DEFAULT_MAX_LOOP_DEPTH,
            stable_pagination: true,
            fulltext_index: DEFAULT_FULLTEXT_INDEX.to_string(),
            fulltext_field: DEFAULT_FULLTEXT_FIELD.to_string(),
            display_attributes: vec!["name".to_string(), "qualifiedName".to_string()],
        }
    }
}

/// A reference attribute stored as the incoming edge of another attribute.
///
/// `Column.table` declared as the inverse of `Table.columns` is traversed
/// over the `Table.columns` edge in the incoming direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseReference {
    pub type_name: String,
    pub attribute: String,
    pub inverse_of_type: String,
    pub inverse_of_attribute: String,
}

/// Physical naming used by the graph schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub type_key: String,
    pub guid_key: String,
    pub state_key: String,
    pub trait_names_key: String,
    pub edge_label_prefix: String,
    /// Store attributes as `Type.attr` instead of the bare attribute name
    pub qualify_property_keys: bool,
    pub inverse_references: Vec<InverseReference>,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            type_key: DEFAULT_TYPE_KEY.to_string(),
            guid_key: DEFAULT_GUID_KEY.to_string(),
            state_key: DEFAULT_STATE_KEY.to_string(),
            trait_names_key: DEFAULT_TRAIT_NAMES_KEY.to_string(),
            edge_label_prefix: DEFAULT_EDGE_LABEL_PREFIX.to_string(),
            qualify_property_keys: true,
            inverse_references: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub query: QueryConfig,
    pub persistence: PersistenceConfig,
}

impl Settings {
    /// Loads settings: built-in defaults, then the optional file, then
    /// `METAQUERY__*` environment variables
    /// (`METAQUERY__QUERY__MAX_LIMIT=500` sets `query.max_limit`).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder
            .add_source(Environment::with_prefix("METAQUERY").separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"query": {"max_limit": 50}}"#).unwrap();
        assert_eq!(settings.query.max_limit, 50);
        assert_eq!(settings.query.default_limit, DEFAULT_LIMIT);
        assert_eq!(settings.persistence.type_key, DEFAULT_TYPE_KEY);
    }
}
