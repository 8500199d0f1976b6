use std::collections::HashMap;

use rust_decimal::Decimal;

/// A graph vertex as returned by the script engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vertex {
    pub id: String,
    pub properties: HashMap<String, RawValue>,
}

impl Vertex {
    pub fn new(id: impl Into<String>) -> Self {
        Vertex {
            id: id.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: RawValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn property(&self, key: &str) -> Option<&RawValue> {
        self.properties.get(key)
    }

    /// String value of a property, if it is a non-null scalar.
    pub fn property_text(&self, key: &str) -> Option<String> {
        self.property(key).and_then(RawValue::as_text)
    }
}

/// A value produced by executing a traversal script.
///
/// Like the query literals this keeps integers apart from decimals, and
/// adds [`RawValue::Vertex`] for graph elements.
///
/// # Examples
///
/// ```
/// use metaquery::{RawValue, Vertex};
///
/// let table = Vertex::new("1")
///     .with_property("__guid", RawValue::from("a1b2"))
///     .with_property("Table.name", RawValue::from("orders"));
/// let result = RawValue::List(vec![RawValue::Vertex(table)]);
/// assert_eq!(result.as_list().map(|l| l.len()), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,

    Boolean(bool),

    Integer(i64),

    /// Exact decimal number
    Decimal(Decimal),

    String(String),

    List(Vec<RawValue>),

    /// Map with string keys, as produced by `map { ... }` projections
    Map(HashMap<String, RawValue>),

    Vertex(Vertex),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_list(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, RawValue>> {
        match self {
            RawValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_vertex(&self) -> Option<&Vertex> {
        match self {
            RawValue::Vertex(v) => Some(v),
            _ => None,
        }
    }

    /// Text form of a scalar. Null and containers have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::String(s) => Some(s.clone()),
            RawValue::Integer(n) => Some(n.to_string()),
            RawValue::Decimal(d) => Some(d.to_string()),
            RawValue::Boolean(b) => Some(b.to_string()),
            RawValue::Null | RawValue::List(_) | RawValue::Map(_) | RawValue::Vertex(_) => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

impl From<Vertex> for RawValue {
    fn from(value: Vertex) -> Self {
        RawValue::Vertex(value)
    }
}
