//! Typed results built from raw engine output.

use serde::Serialize;

use crate::config::QueryConfig;
use crate::error::ExtractionError;
use crate::strategy::PersistenceStrategy;
use crate::value::{RawValue, Vertex};

/// Status reported for entities without a stored state.
pub const DEFAULT_STATUS: &str = "ACTIVE";

/// Key of the entity list in trait instance rows.
pub const INSTANCE_KEY: &str = "theInstance";

/// Summary of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityHeader {
    pub type_name: String,
    pub guid: String,
    pub display_text: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Entities matched by a query without a select list
    EntityList(Vec<EntityHeader>),

    /// Entities carrying the trait a trait query selected, one per row
    TraitRows(Vec<EntityHeader>),

    /// Selected attribute values; each row follows `columns`
    AttributeTable {
        columns: Vec<String>,
        rows: Vec<Vec<RawValue>>,
    },
}

impl QueryResult {
    pub fn len(&self) -> usize {
        match self {
            QueryResult::EntityList(headers) | QueryResult::TraitRows(headers) => headers.len(),
            QueryResult::AttributeTable { rows, .. } => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result shape known from the query before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultShape {
    Entities,
    TraitRows,
    /// Select list aliases, in order
    Attributes(Vec<String>),
}

pub struct ResultExtractor<'a> {
    strategy: &'a dyn PersistenceStrategy,
    config: &'a QueryConfig,
}

impl<'a> ResultExtractor<'a> {
    pub fn new(strategy: &'a dyn PersistenceStrategy, config: &'a QueryConfig) -> Self {
        ResultExtractor { strategy, config }
    }

    /// Classifies `raw` according to `shape`. The shape decides; the data
    /// only has to fit it, so an empty list extracts as an empty result of
    /// the expected kind.
    pub fn extract(&self, shape: &ResultShape, raw: &RawValue) -> Result<QueryResult, ExtractionError> {
        let items: &[RawValue] = match raw {
            RawValue::Null => &[],
            RawValue::List(items) => items.as_slice(),
            other => {
                return Err(ExtractionError(format!(
                    "expected a list of results, got {}",
                    kind_of(other)
                )));
            }
        };

        match shape {
            ResultShape::Entities => items
                .iter()
                .map(|item| match item {
                    RawValue::Vertex(vertex) => self.header(vertex),
                    other => Err(ExtractionError(format!(
                        "expected an entity vertex, got {}",
                        kind_of(other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(QueryResult::EntityList),

            ResultShape::TraitRows => items
                .iter()
                .map(|item| self.trait_row(item))
                .collect::<Result<Vec<_>, _>>()
                .map(QueryResult::TraitRows),

            ResultShape::Attributes(columns) => {
                let rows = items
                    .iter()
                    .map(|item| -> Result<Vec<RawValue>, ExtractionError> {
                        let entries = item.as_map().ok_or_else(|| {
                            ExtractionError(format!("expected a row map, got {}", kind_of(item)))
                        })?;
                        Ok(columns
                            .iter()
                            .map(|c| entries.get(c).cloned().unwrap_or(RawValue::Null))
                            .collect())
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(QueryResult::AttributeTable {
                    columns: columns.clone(),
                    rows,
                })
            }
        }
    }

    fn trait_row(&self, item: &RawValue) -> Result<EntityHeader, ExtractionError> {
        let instance = item
            .as_map()
            .and_then(|entries| entries.get(INSTANCE_KEY))
            .ok_or_else(|| ExtractionError(format!("trait row without '{}'", INSTANCE_KEY)))?;

        let vertex = match instance {
            RawValue::Vertex(vertex) => Some(vertex),
            RawValue::List(list) => list.first().and_then(RawValue::as_vertex),
            _ => None,
        };
        vertex
            .ok_or_else(|| ExtractionError(format!("'{}' does not hold an entity", INSTANCE_KEY)))
            .and_then(|v| self.header(v))
    }

    /// Builds the header of one entity vertex.
    pub fn header(&self, vertex: &Vertex) -> Result<EntityHeader, ExtractionError> {
        let guid = vertex
            .property_text(self.strategy.guid_key())
            .ok_or_else(|| ExtractionError(format!("vertex {} has no GUID", vertex.id)))?;
        let type_name = vertex
            .property_text(self.strategy.type_key())
            .unwrap_or_default();
        let status = vertex
            .property_text(self.strategy.state_key())
            .unwrap_or_else(|| DEFAULT_STATUS.to_string());
        let display_text = self
            .display_text(vertex, &type_name)
            .unwrap_or_else(|| guid.clone());

        Ok(EntityHeader {
            type_name,
            guid,
            display_text,
            status,
        })
    }

    fn display_text(&self, vertex: &Vertex, type_name: &str) -> Option<String> {
        self.config.display_attributes.iter().find_map(|attr| {
            let key = self.strategy.resolve_property(type_name, attr);
            vertex.property_text(&key).or_else(|| {
                // Attribute inherited from a supertype
                let suffix = format!(".{}", attr);
                let mut keys: Vec<&String> = vertex
                    .properties
                    .keys()
                    .filter(|k| k.ends_with(&suffix))
                    .collect();
                keys.sort();
                keys.into_iter().find_map(|k| vertex.property_text(k))
            })
        })
    }
}

fn kind_of(value: &RawValue) -> &'static str {
    match value {
        RawValue::Null => "null",
        RawValue::Boolean(_) => "boolean",
        RawValue::Integer(_) => "integer",
        RawValue::Decimal(_) => "decimal",
        RawValue::String(_) => "string",
        RawValue::List(_) => "list",
        RawValue::Map(_) => "map",
        RawValue::Vertex(_) => "vertex",
    }
}
