// tests/parser_tests.rs

use metaquery::ast::{CompareOp, Expr, ExprKind, Literal, LogicalOp, SortDirection};
use metaquery::config::QueryConfig;
use metaquery::lexer::Lexer;
use metaquery::parser::{Pagination, Parser, parse_query};

fn parse(text: &str) -> Expr {
    parse_query(text, Pagination::default()).unwrap()
}

fn parse_err(text: &str) -> String {
    parse_query(text, Pagination::default()).unwrap_err().message
}

fn predicate(text: &str) -> Expr {
    let mut parser = Parser::new(Lexer::new(text)).unwrap();
    parser.parse().unwrap()
}

fn field(name: &str) -> Expr {
    Expr::field_path(&[name])
}

// ============================================================================
// Query Sources
// ============================================================================

#[test]
fn test_type_select_with_and_without_from() {
    let with_from = parse("from Table");
    let without = parse("Table");
    assert_eq!(with_from, without);
    assert_eq!(with_from.source_type(), Some(&Expr::type_select("Table")));
}

#[test]
fn test_trait_filters_nest_in_order() {
    let query = parse("Table isa PII is Encrypted");
    let traits: Vec<&str> = query
        .clauses()
        .filter_map(|c| match &c.kind {
            ExprKind::TraitFilter { trait_name, .. } => Some(trait_name.as_str()),
            _ => None,
        })
        .collect();
    // Outermost first
    assert_eq!(traits, vec!["Encrypted", "PII"]);
}

#[test]
fn test_missing_type_name() {
    assert!(parse_err("from where name = 1").contains("type name"));
}

// ============================================================================
// Predicates
// ============================================================================

#[test]
fn test_comparison() {
    let expr = predicate("retention > 7");
    match expr.kind {
        ExprKind::Comparison { op, left, right } => {
            assert_eq!(op, CompareOp::GreaterThan);
            assert_eq!(*left, field("retention"));
            assert_eq!(*right, Expr::literal(Literal::Integer(7)));
        }
        other => panic!("Expected comparison, got {:?}", other),
    }
}

#[test]
fn test_literal_first_comparison_is_mirrored() {
    assert_eq!(predicate("7 < retention"), predicate("retention > 7"));
    assert_eq!(predicate("7 <= retention"), predicate("retention >= 7"));
    assert_eq!(predicate("'a' = name"), predicate("name = 'a'"));
}

#[test]
fn test_dotted_path() {
    let expr = predicate("db.name = \"sales\"");
    let ExprKind::Comparison { left, .. } = expr.kind else {
        panic!("Expected comparison");
    };
    assert_eq!(left.path_segments(), Some(vec!["db", "name"]));
}

#[test]
fn test_negative_and_null_literals() {
    let ExprKind::Comparison { right, .. } = predicate("retention = -3").kind else {
        panic!("Expected comparison");
    };
    assert_eq!(*right, Expr::literal(Literal::Integer(-3)));

    let ExprKind::Comparison { right, .. } = predicate("owner != null").kind else {
        panic!("Expected comparison");
    };
    assert_eq!(*right, Expr::literal(Literal::Null));
}

#[test]
fn test_and_binds_tighter_than_or() {
    // a or (b and c)
    let expr = predicate("name = 'a' or name = 'b' and retention = 1");
    match expr.kind {
        ExprKind::Logical { op: LogicalOp::Or, operands } => {
            assert_eq!(operands.len(), 2);
            assert!(matches!(operands[1].kind, ExprKind::Logical { op: LogicalOp::And, .. }));
        }
        other => panic!("Expected OR, got {:?}", other),
    }
}

#[test]
fn test_parentheses_override_precedence() {
    let expr = predicate("(name = 'a' or name = 'b') and retention = 1");
    match expr.kind {
        ExprKind::Logical { op: LogicalOp::And, operands } => {
            assert!(matches!(operands[0].kind, ExprKind::Logical { op: LogicalOp::Or, .. }));
        }
        other => panic!("Expected AND, got {:?}", other),
    }
}

#[test]
fn test_not() {
    let expr = predicate("not name like 'tmp_*'");
    match expr.kind {
        ExprKind::Logical { op: LogicalOp::Not, operands } => {
            assert_eq!(operands.len(), 1);
            assert!(matches!(operands[0].kind, ExprKind::Comparison { op: CompareOp::Like, .. }));
        }
        other => panic!("Expected NOT, got {:?}", other),
    }
}

#[test]
fn test_comparison_requires_a_path() {
    let mut parser = Parser::new(Lexer::new("1 = 2")).unwrap();
    assert!(parser.parse().is_err());
}

#[test]
fn test_dangling_operator() {
    assert!(parse_err("Table where name =").contains("Expected literal"));
}

// ============================================================================
// Clauses
// ============================================================================

#[test]
fn test_clause_nesting() {
    let query = parse("from Table where name = 'a' loop(parent) select name orderby name limit 5");
    let kinds: Vec<&str> = query
        .clauses()
        .map(|c| match c.kind {
            ExprKind::SelectList { .. } => "select",
            ExprKind::Limit { .. } => "limit",
            ExprKind::OrderBy { .. } => "orderby",
            ExprKind::PathLoop { .. } => "loop",
            ExprKind::Filter { .. } => "where",
            ExprKind::TypeSelect { .. } => "from",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["select", "limit", "orderby", "loop", "where", "from"]);
}

#[test]
fn test_loop_times() {
    let query = parse("Table loop(parent, times=3)");
    assert!(query
        .clauses()
        .any(|c| matches!(c.kind, ExprKind::PathLoop { times: Some(3), .. })));

    let query = parse("Table loop(parent)");
    assert!(query
        .clauses()
        .any(|c| matches!(c.kind, ExprKind::PathLoop { times: None, .. })));
}

#[test]
fn test_loop_times_must_be_positive() {
    assert!(parse_err("Table loop(parent, times=0)").contains("Loop times"));
}

#[test]
fn test_select_default_and_explicit_aliases() {
    let query = parse("Table select name, db.name as dbName, db.qualifiedName");
    let aliases: Vec<&str> = query
        .select_items()
        .unwrap()
        .iter()
        .map(|item| item.alias.as_str())
        .collect();
    assert_eq!(aliases, vec!["name", "dbName", "db.qualifiedName"]);
}

#[test]
fn test_duplicate_alias() {
    assert!(parse_err("Table select name, owner as name").contains("Duplicate select alias"));
}

#[test]
fn test_orderby_alias_uses_aliased_path() {
    let query = parse("Table select db.name as dbName orderby dbName desc");
    let order = query
        .clauses()
        .find_map(|c| match &c.kind {
            ExprKind::OrderBy { key, direction, .. } => Some(((**key).clone(), *direction)),
            _ => None,
        })
        .unwrap();
    assert_eq!(order, (Expr::field_path(&["db", "name"]), SortDirection::Desc));
}

#[test]
fn test_orderby_defaults_to_ascending() {
    let query = parse("Table orderby name");
    assert!(query
        .clauses()
        .any(|c| matches!(c.kind, ExprKind::OrderBy { direction: SortDirection::Asc, .. })));
}

#[test]
fn test_trailing_tokens_rejected() {
    assert!(parse_err("Table limit 5 where name = 'a'").contains("after end of query"));
}

// ============================================================================
// Pagination
// ============================================================================

fn limit_of(query: &Expr) -> (u64, u64) {
    query
        .clauses()
        .find_map(|c| match c.kind {
            ExprKind::Limit { count, offset, .. } => Some((count, offset)),
            _ => None,
        })
        .unwrap()
}

#[test]
fn test_default_limit_injected() {
    assert_eq!(limit_of(&parse("Table")), (100, 0));
}

#[test]
fn test_caller_page_used_without_limit_clause() {
    let pagination = Pagination::new(&QueryConfig::default(), Some(20), Some(40));
    let query = parse_query("Table", pagination).unwrap();
    assert_eq!(limit_of(&query), (20, 40));
}

#[test]
fn test_query_limit_wins_over_caller_page() {
    let pagination = Pagination::new(&QueryConfig::default(), Some(20), Some(40));
    let query = parse_query("Table limit 5 offset 1", pagination).unwrap();
    assert_eq!(limit_of(&query), (5, 1));
}

#[test]
fn test_limit_clamped_to_maximum() {
    let config = QueryConfig {
        max_limit: 50,
        ..QueryConfig::default()
    };
    let query = parse_query("Table limit 1000", Pagination::new(&config, None, None)).unwrap();
    assert_eq!(limit_of(&query), (50, 0));

    let query = parse_query("Table", Pagination::new(&config, Some(70), None)).unwrap();
    assert_eq!(limit_of(&query), (50, 0));
}

#[test]
fn test_exactly_one_limit_node() {
    let query = parse("Table where name = 'a' limit 3");
    let count = query
        .clauses()
        .filter(|c| matches!(c.kind, ExprKind::Limit { .. }))
        .count();
    assert_eq!(count, 1);
}

// ============================================================================
// Printing
// ============================================================================

#[test]
fn test_canonical_text() {
    let query = parse("Table isa PII where name = 'a' and retention >= 7 select name as n limit 10");
    assert_eq!(
        query.to_string(),
        "from Table isa PII where name = \"a\" and retention >= 7 select name as n limit 10 offset 0"
    );
}

#[test]
fn test_non_ascii_names_are_quoted() {
    assert_eq!(
        parse("from `Tablé` where `naïve` = 1").to_string(),
        "from `Tablé` where `naïve` = 1 limit 100 offset 0"
    );
}

#[test]
fn test_orderby_key_printed_as_alias_when_shadowed() {
    let query = parse("from Table select owner as name, name as owner orderby owner");
    assert_eq!(
        query.to_string(),
        "from Table select owner as name, name as owner orderby owner asc limit 100 offset 0"
    );
}

#[test]
fn test_print_then_parse_is_identity() {
    let queries = vec![
        "from Table",
        "Table isa PII isa Encrypted",
        "Table where name = 'orders' or (retention > 7 and temporary = false)",
        "Table where not (name like 'tmp_*' or owner = null)",
        "Table where (name = 'a' or name = 'b') and retention < -1",
        "Table where db.name = \"it's \\\"quoted\\\"\" loop(parent, times=4)",
        "Column select table.name as tableName, dataType orderby tableName desc limit 20 offset 40",
        "`from` where `select` = 1.50",
        "from Table select owner as name, name as owner orderby owner",
        "from Table select owner as name, name as x orderby x desc",
        "from `Tablé` where `naïve` = 1",
    ];

    for text in queries {
        let first = parse(text);
        let printed = first.to_string();
        let second = parse(&printed);
        assert_eq!(first, second, "Round trip failed for: {} (printed: {})", text, printed);
    }
}
