// tests/result_tests.rs

mod common;

use common::{entity, map, strategy};
use metaquery::result::{DEFAULT_STATUS, INSTANCE_KEY};
use metaquery::{
    EntityHeader, QueryConfig, QueryResult, RawValue, ResultExtractor, ResultShape, Vertex,
};

fn extract(shape: &ResultShape, raw: &RawValue) -> Result<QueryResult, String> {
    let strategy = strategy();
    let config = QueryConfig::default();
    ResultExtractor::new(&strategy, &config)
        .extract(shape, raw)
        .map_err(|e| e.to_string())
}

fn header(type_name: &str, guid: &str, display_text: &str) -> EntityHeader {
    EntityHeader {
        type_name: type_name.to_string(),
        guid: guid.to_string(),
        display_text: display_text.to_string(),
        status: "ACTIVE".to_string(),
    }
}

fn list(items: Vec<RawValue>) -> RawValue {
    RawValue::List(items)
}

// ============================================================================
// Entity Lists
// ============================================================================

#[test]
fn test_entity_list() {
    let raw = list(vec![
        entity("1", "Table", "g1", "orders").into(),
        entity("2", "Table", "g2", "customers").into(),
    ]);
    assert_eq!(
        extract(&ResultShape::Entities, &raw).unwrap(),
        QueryResult::EntityList(vec![
            header("Table", "g1", "orders"),
            header("Table", "g2", "customers"),
        ])
    );
}

#[test]
fn test_empty_results() {
    let test_cases = vec![
        (ResultShape::Entities, QueryResult::EntityList(vec![])),
        (ResultShape::TraitRows, QueryResult::TraitRows(vec![])),
        (
            ResultShape::Attributes(vec!["name".to_string()]),
            QueryResult::AttributeTable {
                columns: vec!["name".to_string()],
                rows: vec![],
            },
        ),
    ];

    for (shape, expected) in test_cases {
        assert_eq!(extract(&shape, &list(vec![])).unwrap(), expected);
        assert_eq!(extract(&shape, &RawValue::Null).unwrap(), expected);
    }
}

#[test]
fn test_non_list_result_rejected() {
    let err = extract(&ResultShape::Entities, &RawValue::from("oops")).unwrap_err();
    assert!(err.contains("expected a list of results, got string"));
}

#[test]
fn test_non_vertex_entity_rejected() {
    let err = extract(&ResultShape::Entities, &list(vec![RawValue::from(3)])).unwrap_err();
    assert!(err.contains("expected an entity vertex, got integer"));
}

#[test]
fn test_missing_guid_rejected() {
    let vertex = Vertex::new("7").with_property("__typeName", RawValue::from("Table"));
    let err = extract(&ResultShape::Entities, &list(vec![vertex.into()])).unwrap_err();
    assert!(err.contains("vertex 7 has no GUID"));
}

// ============================================================================
// Headers
// ============================================================================

#[test]
fn test_header_defaults() {
    let vertex = Vertex::new("1").with_property("__guid", RawValue::from("g1"));
    let strategy = strategy();
    let config = QueryConfig::default();
    let header = ResultExtractor::new(&strategy, &config).header(&vertex).unwrap();
    assert_eq!(header.type_name, "");
    assert_eq!(header.status, DEFAULT_STATUS);
    // Falls back to the GUID
    assert_eq!(header.display_text, "g1");
}

#[test]
fn test_header_keeps_stored_status() {
    let vertex = entity("1", "Table", "g1", "orders").with_property("__state", RawValue::from("DELETED"));
    let strategy = strategy();
    let config = QueryConfig::default();
    let header = ResultExtractor::new(&strategy, &config).header(&vertex).unwrap();
    assert_eq!(header.status, "DELETED");
}

#[test]
fn test_display_text_order() {
    let strategy = strategy();
    let config = QueryConfig::default();
    let extractor = ResultExtractor::new(&strategy, &config);

    // Attribute qualified by the entity's own type wins
    let own = entity("1", "Table", "g1", "inherited").with_property("Table.name", RawValue::from("own"));
    assert_eq!(extractor.header(&own).unwrap().display_text, "own");

    // Then the next display attribute
    let qualified = Vertex::new("2")
        .with_property("__guid", RawValue::from("g2"))
        .with_property("__typeName", RawValue::from("Table"))
        .with_property("Asset.qualifiedName", RawValue::from("sales.orders@prod"));
    assert_eq!(extractor.header(&qualified).unwrap().display_text, "sales.orders@prod");

    // Null values are skipped
    let null_name = Vertex::new("3")
        .with_property("__guid", RawValue::from("g3"))
        .with_property("Asset.name", RawValue::Null);
    assert_eq!(extractor.header(&null_name).unwrap().display_text, "g3");
}

#[test]
fn test_custom_display_attributes() {
    let strategy = strategy();
    let config = QueryConfig {
        display_attributes: vec!["owner".to_string()],
        ..QueryConfig::default()
    };
    let vertex = entity("1", "Table", "g1", "orders").with_property("Asset.owner", RawValue::from("etl"));
    let header = ResultExtractor::new(&strategy, &config).header(&vertex).unwrap();
    assert_eq!(header.display_text, "etl");
}

// ============================================================================
// Trait Rows
// ============================================================================

#[test]
fn test_trait_rows_follow_instance_order() {
    let v1 = entity("1", "Table", "g1", "orders");
    let v2 = entity("2", "Column", "g2", "ssn");
    let raw = list(vec![
        map(&[(INSTANCE_KEY, list(vec![v1.clone().into()]))]),
        map(&[(INSTANCE_KEY, list(vec![v2.clone().into()]))]),
    ]);
    assert_eq!(
        extract(&ResultShape::TraitRows, &raw).unwrap(),
        QueryResult::TraitRows(vec![
            header("Table", "g1", "orders"),
            header("Column", "g2", "ssn"),
        ])
    );
}

#[test]
fn test_trait_row_with_single_vertex() {
    let raw = list(vec![map(&[(INSTANCE_KEY, entity("1", "Table", "g1", "orders").into())])]);
    assert_eq!(extract(&ResultShape::TraitRows, &raw).unwrap().len(), 1);
}

#[test]
fn test_trait_row_without_instance() {
    let raw = list(vec![map(&[("other", RawValue::Null)])]);
    let err = extract(&ResultShape::TraitRows, &raw).unwrap_err();
    assert!(err.contains("trait row without 'theInstance'"));

    let raw = list(vec![map(&[(INSTANCE_KEY, list(vec![]))])]);
    let err = extract(&ResultShape::TraitRows, &raw).unwrap_err();
    assert!(err.contains("does not hold an entity"));
}

// ============================================================================
// Attribute Tables
// ============================================================================

#[test]
fn test_attribute_table_follows_columns() {
    let shape = ResultShape::Attributes(vec!["name".to_string(), "dbName".to_string()]);
    let raw = list(vec![
        map(&[("dbName", RawValue::from("sales")), ("name", RawValue::from("orders"))]),
        map(&[("name", RawValue::from("customers"))]),
    ]);
    assert_eq!(
        extract(&shape, &raw).unwrap(),
        QueryResult::AttributeTable {
            columns: vec!["name".to_string(), "dbName".to_string()],
            rows: vec![
                vec![RawValue::from("orders"), RawValue::from("sales")],
                vec![RawValue::from("customers"), RawValue::Null],
            ],
        }
    );
}

#[test]
fn test_attribute_row_must_be_map() {
    let shape = ResultShape::Attributes(vec!["name".to_string()]);
    let err = extract(&shape, &list(vec![RawValue::from("orders")])).unwrap_err();
    assert!(err.contains("expected a row map, got string"));
}
