//! Type registry interface consumed by the validator.
//!
//! The registry is owned by the metadata repository; this crate only reads
//! it. [`InMemoryTypeRegistry`] is a simple implementation used by the CLI
//! and tests, loadable from a JSON list of [`TypeDef`]s.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of type a [`TypeDef`] declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeCategory {
    /// Entity type, stored as a vertex
    Class,
    /// Attachable classification
    Trait,
    /// Value type embedded in an entity
    Struct,
    Enum,
}

/// Resolved type of an attribute or expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    String,
    Date,
    Enum(String),
    Array(Box<DataType>),
    Map(Box<DataType>, Box<DataType>),
    Class(String),
    Struct(String),
    Trait(String),
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        self.is_integral()
            || matches!(self, DataType::Float | DataType::Double | DataType::BigDecimal)
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            DataType::Byte
                | DataType::Short
                | DataType::Int
                | DataType::Long
                | DataType::BigInteger
        )
    }

    /// Scalar types that are stored as vertex properties.
    pub fn is_primitive(&self) -> bool {
        self.is_numeric()
            || matches!(
                self,
                DataType::Boolean | DataType::String | DataType::Date | DataType::Enum(_)
            )
    }

    /// Entity type reached by navigating an attribute of this type.
    ///
    /// Both single references and arrays of references navigate.
    pub fn reference_target(&self) -> Option<&str> {
        match self {
            DataType::Class(name) => Some(name),
            DataType::Array(element) => match element.as_ref() {
                DataType::Class(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => f.write_str("boolean"),
            DataType::Byte => f.write_str("byte"),
            DataType::Short => f.write_str("short"),
            DataType::Int => f.write_str("int"),
            DataType::Long => f.write_str("long"),
            DataType::Float => f.write_str("float"),
            DataType::Double => f.write_str("double"),
            DataType::BigInteger => f.write_str("biginteger"),
            DataType::BigDecimal => f.write_str("bigdecimal"),
            DataType::String => f.write_str("string"),
            DataType::Date => f.write_str("date"),
            DataType::Array(element) => write!(f, "array<{}>", element),
            DataType::Map(key, value) => write!(f, "map<{},{}>", key, value),
            DataType::Enum(name)
            | DataType::Class(name)
            | DataType::Struct(name)
            | DataType::Trait(name) => f.write_str(name),
        }
    }
}

/// Declaration of one attribute. `type_name` is the textual type, e.g.
/// `string`, `array<Column>` or `DB`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub category: TypeCategory,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDef>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>, category: TypeCategory) -> Self {
        TypeDef {
            name: name.into(),
            category,
            supertypes: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, TypeCategory::Class)
    }

    pub fn trait_type(name: impl Into<String>) -> Self {
        Self::new(name, TypeCategory::Trait)
    }

    pub fn supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.attributes.push(AttributeDef {
            name: name.into(),
            type_name: type_name.into(),
        });
        self
    }
}

/// An attribute located through a type's hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttribute {
    /// The type that declares the attribute (may be a supertype)
    pub declared_in: String,
    pub data_type: DataType,
}

/// Read access to the type system.
pub trait TypeRegistry: Send + Sync {
    fn type_def(&self, name: &str) -> Option<&TypeDef>;

    /// Parses a textual attribute type into a [`DataType`].
    fn data_type(&self, type_name: &str) -> Option<DataType> {
        let name = type_name.trim();
        let primitive = match name.to_lowercase().as_str() {
            "boolean" => Some(DataType::Boolean),
            "byte" => Some(DataType::Byte),
            "short" => Some(DataType::Short),
            "int" => Some(DataType::Int),
            "long" => Some(DataType::Long),
            "float" => Some(DataType::Float),
            "double" => Some(DataType::Double),
            "biginteger" => Some(DataType::BigInteger),
            "bigdecimal" => Some(DataType::BigDecimal),
            "string" => Some(DataType::String),
            "date" => Some(DataType::Date),
            _ => None,
        };
        if primitive.is_some() {
            return primitive;
        }

        if let Some(inner) = name.strip_prefix("array<").and_then(|s| s.strip_suffix('>')) {
            return self.data_type(inner).map(|t| DataType::Array(Box::new(t)));
        }
        if let Some(inner) = name.strip_prefix("map<").and_then(|s| s.strip_suffix('>')) {
            let (key, value) = inner.split_once(',')?;
            return Some(DataType::Map(
                Box::new(self.data_type(key)?),
                Box::new(self.data_type(value)?),
            ));
        }

        let def = self.type_def(name)?;
        Some(match def.category {
            TypeCategory::Class => DataType::Class(def.name.clone()),
            TypeCategory::Trait => DataType::Trait(def.name.clone()),
            TypeCategory::Struct => DataType::Struct(def.name.clone()),
            TypeCategory::Enum => DataType::Enum(def.name.clone()),
        })
    }

    /// Finds an attribute on `type_name` or, depth first, on its supertypes.
    fn attribute(&self, type_name: &str, attr: &str) -> Option<ResolvedAttribute> {
        let mut pending = vec![type_name.to_string()];
        let mut seen = HashSet::new();

        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(def) = self.type_def(&current) else {
                continue;
            };
            if let Some(found) = def.attributes.iter().find(|a| a.name == attr) {
                return Some(ResolvedAttribute {
                    declared_in: def.name.clone(),
                    data_type: self.data_type(&found.type_name)?,
                });
            }
            pending.extend(def.supertypes.iter().rev().cloned());
        }
        None
    }

    /// True if `sub` is `sup` or inherits from it.
    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let mut pending = vec![sub.to_string()];
        let mut seen = HashSet::new();

        while let Some(current) = pending.pop() {
            if current == sup {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(def) = self.type_def(&current) {
                pending.extend(def.supertypes.iter().cloned());
            }
        }
        false
    }
}

/// Mutable registry held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTypeRegistry {
    types: HashMap<String, TypeDef>,
}

impl InMemoryTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type, replacing any previous definition with the same name.
    pub fn register(&mut self, def: TypeDef) -> &mut Self {
        self.types.insert(def.name.clone(), def);
        self
    }

    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.register(def);
        self
    }

    /// Loads a JSON array of type definitions.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let defs: Vec<TypeDef> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for def in defs {
            registry.register(def);
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeRegistry for InMemoryTypeRegistry {
    fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> InMemoryTypeRegistry {
        InMemoryTypeRegistry::new()
            .with_type(TypeDef::class("Referenceable").attribute("qualifiedName", "string"))
            .with_type(
                TypeDef::class("Table")
                    .supertype("Referenceable")
                    .attribute("name", "string")
                    .attribute("columns", "array<Column>"),
            )
            .with_type(TypeDef::class("Column").attribute("name", "string"))
    }

    #[test]
    fn test_attribute_found_on_supertype() {
        let found = registry().attribute("Table", "qualifiedName").unwrap();
        assert_eq!(found.declared_in, "Referenceable");
        assert_eq!(found.data_type, DataType::String);
    }

    #[test]
    fn test_array_of_references() {
        let found = registry().attribute("Table", "columns").unwrap();
        assert_eq!(found.data_type.reference_target(), Some("Column"));
    }

    #[test]
    fn test_subtype_cycle_terminates() {
        let registry = InMemoryTypeRegistry::new()
            .with_type(TypeDef::class("A").supertype("B"))
            .with_type(TypeDef::class("B").supertype("A"));
        assert!(!registry.is_subtype("A", "C"));
        assert!(registry.is_subtype("A", "B"));
    }
}
