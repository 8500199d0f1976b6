//! Rewrites over the script tree, run between translation and rendering.
//!
//! Each [`OptimizationPass`] maps a script to an equivalent script. The
//! [`Optimizer`] runs its passes in a fixed order, once each.

use crate::config::QueryConfig;
use crate::error::TranslationError;
use crate::script::{ANONYMOUS, FunctionCall, ScriptExpr, ScriptLiteral};
use crate::strategy::PersistenceStrategy;
use crate::visitor::{CallHierarchyVisitor, transform_up, visit_call_hierarchy};

/// Steps that only filter the current element and never move away from it.
const FILTER_STEPS: &[&str] = &["has", "hasNot", "and", "or", "not", "where"];

/// Reports whether a call chain contains an `order` step.
///
/// The walk stops at the first `order` call found.
#[derive(Debug, Default)]
pub struct OrderFinder {
    found: bool,
}

impl OrderFinder {
    pub fn new() -> Self {
        OrderFinder::default()
    }

    pub fn has_order_expression(&self) -> bool {
        self.found
    }

    /// Runs a fresh finder over `expr`.
    pub fn find(expr: Option<&ScriptExpr>) -> bool {
        let mut finder = OrderFinder::new();
        visit_call_hierarchy(expr, &mut finder);
        finder.has_order_expression()
    }
}

impl CallHierarchyVisitor for OrderFinder {
    fn pre_visit_function_caller(&mut self, call: &FunctionCall) -> bool {
        if call.name == "order" {
            self.found = true;
            return false;
        }
        true
    }

    fn visit_non_function_caller(&mut self, _expr: &ScriptExpr) {}

    fn visit_null_caller(&mut self) {}

    fn post_visit_function_caller(&mut self, _call: &FunctionCall) -> bool {
        true
    }
}

pub trait OptimizationPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, script: &ScriptExpr) -> Result<ScriptExpr, TranslationError>;
}

/// Merges nested `and`/`or` calls and inlines `where` filters made only of
/// filter steps.
///
/// ```text
/// __.and(__.and(a, b), c)       =>  __.and(a, b, c)
/// x.where(__.has('k', eq(1)))   =>  x.has('k', eq(1))
/// ```
#[derive(Debug, Default)]
pub struct FlattenCalls;

impl FlattenCalls {
    fn flatten_logical(call: &FunctionCall) -> Option<ScriptExpr> {
        if !matches!(call.name.as_str(), "and" | "or") {
            return None;
        }
        let nested = |arg: &ScriptExpr| match arg {
            ScriptExpr::Call(inner) if inner.name == call.name && is_anonymous_root(inner) => {
                Some(inner.args.clone())
            }
            _ => None,
        };
        if !call.args.iter().any(|arg| nested(arg).is_some()) {
            return None;
        }

        let args = call
            .args
            .iter()
            .flat_map(|arg| nested(arg).unwrap_or_else(|| vec![arg.clone()]))
            .collect();
        Some(ScriptExpr::Call(FunctionCall {
            caller: call.caller.clone(),
            name: call.name.clone(),
            args,
        }))
    }

    fn inline_where(call: &FunctionCall) -> Option<ScriptExpr> {
        let (Some(caller), [predicate]) = (&call.caller, call.args.as_slice()) else {
            return None;
        };
        if call.name != "where" {
            return None;
        }

        let steps = predicate.chain_steps();
        let (root, rest) = steps.split_first()?;
        let pure = !rest.is_empty()
            && rest
                .iter()
                .all(|s| s.as_call().is_some_and(|c| FILTER_STEPS.contains(&c.name.as_str())));
        if !pure || !matches!(root, ScriptExpr::Identifier(id) if id == ANONYMOUS) {
            return None;
        }

        Some(caller.as_ref().clone().chain(detach_root(predicate)))
    }
}

impl OptimizationPass for FlattenCalls {
    fn name(&self) -> &'static str {
        "flatten-calls"
    }

    fn apply(&self, script: &ScriptExpr) -> Result<ScriptExpr, TranslationError> {
        transform_up(script, &mut |node: ScriptExpr| {
            let rewritten = match &node {
                ScriptExpr::Call(call) => {
                    Self::flatten_logical(call).or_else(|| Self::inline_where(call))
                }
                _ => None,
            };
            Ok(rewritten.unwrap_or(node))
        })
    }
}

/// Merges adjacent `range` steps and drops repeated `dedup` steps.
///
/// ```text
/// x.range(10..<20).range(2..<5)  =>  x.range(12..<15)
/// x.dedup().dedup()              =>  x.dedup()
/// ```
#[derive(Debug, Default)]
pub struct CoalesceRanges;

impl CoalesceRanges {
    fn merge(outer: &FunctionCall) -> Option<ScriptExpr> {
        let inner = outer.caller.as_deref()?.as_call()?;

        match (outer.name.as_str(), inner.name.as_str()) {
            ("range", "range") => {
                let (a, b) = range_bounds(inner)?;
                let (c, d) = range_bounds(outer)?;
                let start = a.saturating_add(c);
                let end = b.min(a.saturating_add(d)).max(start);
                Some(ScriptExpr::Call(FunctionCall {
                    caller: inner.caller.clone(),
                    name: "range".to_string(),
                    args: vec![ScriptExpr::range(start, end)],
                }))
            }
            ("dedup", "dedup") if outer.args.is_empty() && inner.args.is_empty() => {
                outer.caller.as_deref().cloned()
            }
            _ => None,
        }
    }
}

impl OptimizationPass for CoalesceRanges {
    fn name(&self) -> &'static str {
        "coalesce-ranges"
    }

    fn apply(&self, script: &ScriptExpr) -> Result<ScriptExpr, TranslationError> {
        transform_up(script, &mut |node: ScriptExpr| {
            let rewritten = match &node {
                ScriptExpr::Call(call) => Self::merge(call),
                _ => None,
            };
            Ok(rewritten.unwrap_or(node))
        })
    }
}

/// Orders paged traversals by GUID so that consecutive pages do not
/// overlap. Chains that already contain an `order` step are left alone,
/// whatever their sort key.
#[derive(Debug)]
pub struct DefaultOrdering {
    guid_key: String,
}

impl DefaultOrdering {
    pub fn new(guid_key: impl Into<String>) -> Self {
        DefaultOrdering {
            guid_key: guid_key.into(),
        }
    }
}

impl OptimizationPass for DefaultOrdering {
    fn name(&self) -> &'static str {
        "default-ordering"
    }

    fn apply(&self, script: &ScriptExpr) -> Result<ScriptExpr, TranslationError> {
        transform_up(script, &mut |node: ScriptExpr| {
            let ScriptExpr::Call(call) = &node else {
                return Ok(node);
            };
            let Some(caller) = call.caller.as_deref() else {
                return Ok(node);
            };
            if call.name != "range" || OrderFinder::find(Some(caller)) {
                return Ok(node);
            }

            let ordered = caller.clone().dot("order", vec![]).dot(
                "by",
                vec![ScriptExpr::string(&self.guid_key), ScriptExpr::ident("incr")],
            );
            Ok(call.with_caller(Some(ordered)))
        })
    }
}

/// The full pass pipeline.
pub struct Optimizer {
    passes: Vec<Box<dyn OptimizationPass>>,
}

impl Optimizer {
    pub fn new(config: &QueryConfig, strategy: &dyn PersistenceStrategy) -> Self {
        let mut passes: Vec<Box<dyn OptimizationPass>> =
            vec![Box::new(FlattenCalls), Box::new(CoalesceRanges)];
        if config.stable_pagination {
            passes.push(Box::new(DefaultOrdering::new(strategy.guid_key())));
        }
        Optimizer { passes }
    }

    pub fn with_passes(passes: Vec<Box<dyn OptimizationPass>>) -> Self {
        Optimizer { passes }
    }

    pub fn optimize(&self, script: &ScriptExpr) -> Result<ScriptExpr, TranslationError> {
        let mut current = script.clone();
        for pass in &self.passes {
            let next = pass.apply(&current)?;
            if next != current {
                tracing::trace!(pass = pass.name(), "pass rewrote script");
            }
            current = next;
        }
        Ok(current)
    }
}

fn is_anonymous_root(call: &FunctionCall) -> bool {
    matches!(call.caller.as_deref(), Some(ScriptExpr::Identifier(id)) if id == ANONYMOUS)
}

/// Turns `__.a().b()` into the step template `a().b()`.
fn detach_root(expr: &ScriptExpr) -> ScriptExpr {
    match expr {
        ScriptExpr::Call(call) => match call.caller.as_deref() {
            Some(ScriptExpr::Identifier(id)) if id == ANONYMOUS => call.with_caller(None),
            Some(caller) => call.with_caller(Some(detach_root(caller))),
            None => expr.clone(),
        },
        other => other.clone(),
    }
}

fn range_bounds(call: &FunctionCall) -> Option<(i64, i64)> {
    match call.args.as_slice() {
        [ScriptExpr::Range { offset, end }] => match (offset.as_ref(), end.as_ref()) {
            (
                ScriptExpr::Literal(ScriptLiteral::Integer(a)),
                ScriptExpr::Literal(ScriptLiteral::Integer(b)),
            ) => Some((*a, *b)),
            _ => None,
        },
        _ => None,
    }
}
