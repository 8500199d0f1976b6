//! Mapping from the logical type system to the physical graph schema.
//!
//! A [`PersistenceStrategy`] decides how types, attributes and traits are
//! named in the graph and which traversal idioms reach them. The translator
//! never hard-codes a property key or edge label; everything physical comes
//! from the strategy chosen at startup.

use crate::ast::SortDirection;
use crate::config::PersistenceConfig;
use crate::script::ScriptExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Out,
    In,
}

impl EdgeDirection {
    /// Name of the navigation step (`out` / `in`).
    pub fn step_name(self) -> &'static str {
        match self {
            EdgeDirection::Out => "out",
            EdgeDirection::In => "in",
        }
    }

    /// Name of the direction constant used inside closures.
    pub fn constant(self) -> &'static str {
        match self {
            EdgeDirection::Out => "Direction.OUT",
            EdgeDirection::In => "Direction.IN",
        }
    }
}

pub trait PersistenceStrategy: Send + Sync {
    /// Vertex property holding the entity's type name.
    fn type_key(&self) -> &str;

    fn guid_key(&self) -> &str;

    /// Vertex property holding the entity's lifecycle state.
    fn state_key(&self) -> &str;

    /// Value stored under [`type_key`](Self::type_key) for `type_name`.
    fn resolve_label(&self, type_name: &str) -> String;

    /// Property key of a primitive attribute declared on `type_name`.
    fn resolve_property(&self, type_name: &str, attr: &str) -> String;

    /// Edge label of a reference attribute declared on `type_name`.
    fn edge_label(&self, type_name: &str, attr: &str) -> String;

    /// Direction in which a reference attribute's edge is traversed.
    fn edge_direction(&self, type_name: &str, attr: &str) -> EdgeDirection;

    /// Step template matching vertices of `type_name`.
    fn type_match_step(&self, type_name: &str) -> ScriptExpr {
        ScriptExpr::call(
            "has",
            vec![
                ScriptExpr::string(self.type_key()),
                ScriptExpr::string(self.resolve_label(type_name)),
            ],
        )
    }

    /// Step template keeping entities that carry `trait_name`.
    fn trait_membership_step(&self, trait_name: &str) -> ScriptExpr;

    /// Step template moving from a vertex over an edge.
    fn navigation_step(&self, label: &str, direction: EdgeDirection) -> ScriptExpr {
        ScriptExpr::call(direction.step_name(), vec![ScriptExpr::string(label)])
    }

    /// Closure idiom: the property `key` of the element `base`, or null.
    fn property_value(&self, base: ScriptExpr, key: &str) -> ScriptExpr {
        base.dot("property", vec![ScriptExpr::string(key)])
            .dot("orElse", vec![ScriptExpr::null()])
    }

    /// Closure idiom: `value` computed on the vertex reached from `base` over
    /// one edge, or null when the edge is absent. Inside `value` that vertex
    /// is [`neighbour(binding)`](Self::neighbour).
    fn navigate_value(
        &self,
        base: ScriptExpr,
        label: &str,
        direction: EdgeDirection,
        binding: &str,
        value: ScriptExpr,
    ) -> ScriptExpr {
        let edges = base.dot(
            "vertices",
            vec![ScriptExpr::ident(direction.constant()), ScriptExpr::string(label)],
        );
        let guarded = ScriptExpr::conditional(
            ScriptExpr::ident(binding).dot("hasNext", vec![]),
            value,
            ScriptExpr::null(),
        );
        edges.dot("with", vec![ScriptExpr::closure(&[binding], vec![guarded])])
    }

    /// The vertex a [`navigate_value`](Self::navigate_value) binding stands for.
    fn neighbour(&self, binding: &str) -> ScriptExpr {
        ScriptExpr::ident(binding).dot("next", vec![])
    }

    /// Step template sorting by the closure `value`, null values last in
    /// either direction.
    fn order_step(&self, value: ScriptExpr, direction: SortDirection) -> ScriptExpr {
        let order = match direction {
            SortDirection::Asc => "incr",
            SortDirection::Desc => "decr",
        };
        ScriptExpr::call("order", vec![]).dot(
            "by",
            vec![
                ScriptExpr::closure(&["it"], vec![value]),
                ScriptExpr::ident("Comparator").dot("nullsLast", vec![ScriptExpr::ident(order)]),
            ],
        )
    }

    /// Step template turning trait instance vertices into rows whose
    /// `theInstance` entry lists the entity carrying the trait.
    fn trait_instance_projection(&self, trait_name: &str) -> ScriptExpr;
}

/// Strategy for the default graph layout: system properties prefixed with
/// `__`, attributes stored as `Type.attr`, references as `__Type.attr` edges.
#[derive(Debug, Clone, Default)]
pub struct DefaultGraphPersistence {
    config: PersistenceConfig,
}

impl DefaultGraphPersistence {
    pub fn new(config: PersistenceConfig) -> Self {
        DefaultGraphPersistence { config }
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    fn inverse_of(&self, type_name: &str, attr: &str) -> Option<(&str, &str)> {
        self.config
            .inverse_references
            .iter()
            .find(|r| r.type_name == type_name && r.attribute == attr)
            .map(|r| (r.inverse_of_type.as_str(), r.inverse_of_attribute.as_str()))
    }

    fn trait_edge_label(&self, trait_name: &str) -> String {
        format!("{}trait.{}", self.config.edge_label_prefix, trait_name)
    }
}

impl PersistenceStrategy for DefaultGraphPersistence {
    fn type_key(&self) -> &str {
        &self.config.type_key
    }

    fn guid_key(&self) -> &str {
        &self.config.guid_key
    }

    fn state_key(&self) -> &str {
        &self.config.state_key
    }

    fn resolve_label(&self, type_name: &str) -> String {
        type_name.to_string()
    }

    fn resolve_property(&self, type_name: &str, attr: &str) -> String {
        if self.config.qualify_property_keys {
            format!("{}.{}", type_name, attr)
        } else {
            attr.to_string()
        }
    }

    fn edge_label(&self, type_name: &str, attr: &str) -> String {
        let (owner, attr) = self.inverse_of(type_name, attr).unwrap_or((type_name, attr));
        format!("{}{}.{}", self.config.edge_label_prefix, owner, attr)
    }

    fn edge_direction(&self, type_name: &str, attr: &str) -> EdgeDirection {
        if self.inverse_of(type_name, attr).is_some() {
            EdgeDirection::In
        } else {
            EdgeDirection::Out
        }
    }

    fn trait_membership_step(&self, trait_name: &str) -> ScriptExpr {
        ScriptExpr::call(
            "has",
            vec![
                ScriptExpr::string(&self.config.trait_names_key),
                ScriptExpr::string(trait_name),
            ],
        )
    }

    fn trait_instance_projection(&self, trait_name: &str) -> ScriptExpr {
        let instance = ScriptExpr::ident("it")
            .dot("get", vec![])
            .dot(
                "vertices",
                vec![
                    ScriptExpr::ident(EdgeDirection::In.constant()),
                    ScriptExpr::string(self.trait_edge_label(trait_name)),
                ],
            )
            .dot("toList", vec![]);
        let row = ScriptExpr::Map(vec![(ScriptExpr::string("theInstance"), instance)]);
        ScriptExpr::call("map", vec![ScriptExpr::closure(&["it"], vec![row])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InverseReference;

    fn strategy() -> DefaultGraphPersistence {
        DefaultGraphPersistence::new(PersistenceConfig {
            inverse_references: vec![InverseReference {
                type_name: "Column".to_string(),
                attribute: "table".to_string(),
                inverse_of_type: "Table".to_string(),
                inverse_of_attribute: "columns".to_string(),
            }],
            ..PersistenceConfig::default()
        })
    }

    #[test]
    fn test_inverse_reference_uses_forward_edge_incoming() {
        let strategy = strategy();
        assert_eq!(strategy.edge_label("Column", "table"), "__Table.columns");
        assert_eq!(strategy.edge_direction("Column", "table"), EdgeDirection::In);
        assert_eq!(strategy.edge_label("Table", "columns"), "__Table.columns");
        assert_eq!(strategy.edge_direction("Table", "columns"), EdgeDirection::Out);
    }

    #[test]
    fn test_missing_reference_reads_as_null() {
        let strategy = strategy();
        let value = strategy.navigate_value(
            ScriptExpr::ident("it"),
            "__Table.db",
            EdgeDirection::Out,
            "n1",
            strategy.neighbour("n1"),
        );
        assert_eq!(
            crate::output::to_script(&value),
            "it.vertices(Direction.OUT, '__Table.db').with { n1 -> n1.hasNext() ? n1.next() : null }"
        );
    }

    #[test]
    fn test_order_step_puts_nulls_last() {
        let step = strategy().order_step(ScriptExpr::ident("v"), SortDirection::Desc);
        assert_eq!(
            crate::output::to_script(&step),
            "order().by({ it -> v }, Comparator.nullsLast(decr))"
        );
    }

    #[test]
    fn test_unqualified_property_keys() {
        let strategy = DefaultGraphPersistence::new(PersistenceConfig {
            qualify_property_keys: false,
            ..PersistenceConfig::default()
        });
        assert_eq!(strategy.resolve_property("Table", "name"), "name");
    }
}
