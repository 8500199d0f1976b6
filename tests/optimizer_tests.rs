// tests/optimizer_tests.rs

use metaquery::optimizer::{
    CoalesceRanges, DefaultOrdering, FlattenCalls, OptimizationPass, Optimizer, OrderFinder,
};
use metaquery::script::{FunctionCall, ScriptExpr};
use metaquery::visitor::{CallHierarchyVisitor, visit_call_hierarchy};
use metaquery::{DefaultGraphPersistence, PersistenceConfig, QueryConfig, to_script};

fn g_v() -> ScriptExpr {
    ScriptExpr::ident("g").dot("V", vec![])
}

fn has(key: &str) -> ScriptExpr {
    ScriptExpr::call("has", vec![ScriptExpr::string(key)])
}

fn anon(step: ScriptExpr) -> ScriptExpr {
    ScriptExpr::anonymous(step)
}

fn range(chain: ScriptExpr, start: i64, end: i64) -> ScriptExpr {
    chain.dot("range", vec![ScriptExpr::range(start, end)])
}

fn apply(pass: &dyn OptimizationPass, script: &ScriptExpr) -> String {
    to_script(&pass.apply(script).unwrap())
}

// ============================================================================
// Order Finder
// ============================================================================

#[test]
fn test_order_finder_detects_order() {
    let chain = g_v()
        .dot("has", vec![ScriptExpr::string("x")])
        .dot("order", vec![])
        .dot("limit", vec![ScriptExpr::range(1, 10)]);
    assert!(OrderFinder::find(Some(&chain)));
}

#[test]
fn test_order_finder_without_order() {
    let chain = g_v()
        .dot("has", vec![ScriptExpr::string("x")])
        .dot("limit", vec![ScriptExpr::range(1, 10)]);
    assert!(!OrderFinder::find(Some(&chain)));
}

#[test]
fn test_order_finder_empty_chain() {
    assert!(!OrderFinder::find(None));
    assert!(!OrderFinder::find(Some(&ScriptExpr::ident("g"))));
}

#[test]
fn test_order_finder_ignores_arguments() {
    // Only the caller chain is searched, not nested traversals
    let chain = g_v().dot("where", vec![anon(ScriptExpr::call("order", vec![]))]);
    assert!(!OrderFinder::find(Some(&chain)));
}

// ============================================================================
// Call Hierarchy Visitor
// ============================================================================

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
    stop_at: Option<&'static str>,
}

impl CallHierarchyVisitor for Recorder {
    fn pre_visit_function_caller(&mut self, call: &FunctionCall) -> bool {
        self.events.push(format!("pre {}", call.name));
        self.stop_at != Some(call.name.as_str())
    }

    fn visit_non_function_caller(&mut self, expr: &ScriptExpr) {
        self.events.push(format!("root {}", to_script(expr)));
    }

    fn visit_null_caller(&mut self) {
        self.events.push("null".to_string());
    }

    fn post_visit_function_caller(&mut self, call: &FunctionCall) -> bool {
        self.events.push(format!("post {}", call.name));
        true
    }
}

#[test]
fn test_visitor_walks_outermost_first() {
    let chain = g_v().dot("has", vec![ScriptExpr::string("x")]);
    let mut recorder = Recorder::default();
    visit_call_hierarchy(Some(&chain), &mut recorder);
    assert_eq!(
        recorder.events,
        vec!["pre has", "pre V", "root g", "post V", "post has"]
    );
}

#[test]
fn test_visitor_reports_null_caller() {
    let template = ScriptExpr::call("out", vec![]).dot("has", vec![]);
    let mut recorder = Recorder::default();
    visit_call_hierarchy(Some(&template), &mut recorder);
    assert_eq!(recorder.events, vec!["pre has", "pre out", "null", "post out", "post has"]);
}

#[test]
fn test_visitor_stops_when_asked() {
    let chain = g_v().dot("order", vec![]).dot("toList", vec![]);
    let mut recorder = Recorder {
        stop_at: Some("order"),
        ..Recorder::default()
    };
    visit_call_hierarchy(Some(&chain), &mut recorder);
    assert_eq!(recorder.events, vec!["pre toList", "pre order"]);
}

// ============================================================================
// Flatten Calls
// ============================================================================

#[test]
fn test_flatten_nested_and() {
    let inner = anon(ScriptExpr::call("and", vec![anon(has("a")), anon(has("b"))]));
    let outer = anon(ScriptExpr::call("and", vec![inner, anon(has("c"))]));
    assert_eq!(
        apply(&FlattenCalls, &outer),
        "__.and(__.has('a'), __.has('b'), __.has('c'))"
    );
}

#[test]
fn test_flatten_keeps_mixed_operators() {
    let inner = anon(ScriptExpr::call("or", vec![anon(has("a")), anon(has("b"))]));
    let outer = anon(ScriptExpr::call("and", vec![inner, anon(has("c"))]));
    assert_eq!(
        apply(&FlattenCalls, &outer),
        "__.and(__.or(__.has('a'), __.has('b')), __.has('c'))"
    );
}

#[test]
fn test_inline_pure_where() {
    let script = g_v().dot("where", vec![anon(has("a").dot("hasNot", vec![ScriptExpr::string("b")]))]);
    assert_eq!(apply(&FlattenCalls, &script), "g.V().has('a').hasNot('b')");
}

#[test]
fn test_where_with_navigation_kept() {
    let nav = ScriptExpr::call("out", vec![ScriptExpr::string("e")]).chain(has("a"));
    let script = g_v().dot("where", vec![anon(nav)]);
    assert_eq!(apply(&FlattenCalls, &script), "g.V().where(__.out('e').has('a'))");
}

// ============================================================================
// Coalesce Ranges
// ============================================================================

#[test]
fn test_adjacent_ranges_merge() {
    let script = range(range(g_v(), 10, 20), 2, 5);
    assert_eq!(apply(&CoalesceRanges, &script), "g.V().range(12..<15)");
}

#[test]
fn test_inner_range_bounds_outer() {
    let script = range(range(g_v(), 10, 20), 5, 50);
    assert_eq!(apply(&CoalesceRanges, &script), "g.V().range(15..<20)");
}

#[test]
fn test_disjoint_ranges_are_empty() {
    let script = range(range(g_v(), 0, 5), 10, 20);
    assert_eq!(apply(&CoalesceRanges, &script), "g.V().range(10..<10)");
}

#[test]
fn test_repeated_dedup_dropped() {
    let script = g_v().dot("dedup", vec![]).dot("dedup", vec![]).dot("toList", vec![]);
    assert_eq!(apply(&CoalesceRanges, &script), "g.V().dedup().toList()");
}

// ============================================================================
// Default Ordering
// ============================================================================

#[test]
fn test_default_ordering_inserted_before_range() {
    let script = range(g_v(), 0, 10).dot("toList", vec![]);
    assert_eq!(
        apply(&DefaultOrdering::new("__guid"), &script),
        "g.V().order().by('__guid', incr).range(0..<10).toList()"
    );
}

#[test]
fn test_existing_order_kept() {
    let ordered = g_v()
        .dot("order", vec![])
        .dot("by", vec![ScriptExpr::string("Asset.name")]);
    let script = range(ordered, 0, 10);
    assert_eq!(
        apply(&DefaultOrdering::new("__guid"), &script),
        "g.V().order().by('Asset.name').range(0..<10)"
    );
}

#[test]
fn test_optimizer_respects_stable_pagination() {
    let strategy = DefaultGraphPersistence::new(PersistenceConfig::default());
    let script = range(g_v(), 0, 10);

    let stable = Optimizer::new(&QueryConfig::default(), &strategy);
    assert_eq!(
        to_script(&stable.optimize(&script).unwrap()),
        "g.V().order().by('__guid', incr).range(0..<10)"
    );

    let config = QueryConfig {
        stable_pagination: false,
        ..QueryConfig::default()
    };
    let unstable = Optimizer::new(&config, &strategy);
    assert_eq!(to_script(&unstable.optimize(&script).unwrap()), "g.V().range(0..<10)");
}

#[test]
fn test_custom_pass_list() {
    let optimizer = Optimizer::with_passes(vec![Box::new(CoalesceRanges)]);
    let script = range(range(g_v(), 0, 10), 0, 5);
    assert_eq!(to_script(&optimizer.optimize(&script).unwrap()), "g.V().range(0..<5)");
}
