//! Translation of a validated query tree into a traversal script tree.
//!
//! Every query clause becomes one or more steps chained onto the script of
//! the clause it wraps:
//!
//! ```text
//! from Table where db.name = "sales" limit 10
//!
//! g.V().has('__typeName', 'Table')
//!     .where(__.out('__Table.db').has('Database.name', eq('sales')))
//!     .range(0..<10)
//!     .toList()
//! ```
//!
//! Physical names and traversal idioms come from the [`PersistenceStrategy`].

use rust_decimal::prelude::ToPrimitive;

use crate::ast::{CompareOp, Expr, ExprKind, Literal, LogicalOp};
use crate::config::QueryConfig;
use crate::error::TranslationError;
use crate::schema::DataType;
use crate::script::{ScriptExpr, ScriptLiteral};
use crate::strategy::{EdgeDirection, PersistenceStrategy};
use crate::visitor::TreeNode;

/// One segment of a resolved attribute path.
#[derive(Debug, Clone)]
struct PathStep<'e> {
    owner: &'e str,
    field: &'e str,
    data_type: &'e DataType,
}

pub struct Translator<'a> {
    strategy: &'a dyn PersistenceStrategy,
    config: &'a QueryConfig,
}

impl<'a> Translator<'a> {
    pub fn new(strategy: &'a dyn PersistenceStrategy, config: &'a QueryConfig) -> Self {
        Translator { strategy, config }
    }

    /// Translates a validated query into a complete script ending in
    /// `.toList()`.
    pub fn translate(&self, query: &Expr) -> Result<ScriptExpr, TranslationError> {
        let mut script = self.translate_clause(query)?;

        if query.select_items().is_none() {
            if let Some(DataType::Trait(trait_name)) = query
                .source_type()
                .and_then(|s| s.resolved.as_ref())
                .map(|r| &r.data_type)
            {
                script = script.chain(self.strategy.trait_instance_projection(trait_name));
            }
        }

        Ok(script.dot("toList", vec![]))
    }

    fn translate_clause(&self, expr: &Expr) -> Result<ScriptExpr, TranslationError> {
        require_resolved(expr)?;

        match &expr.kind {
            ExprKind::TypeSelect { type_name } => Ok(ScriptExpr::ident("g")
                .dot("V", vec![])
                .chain(self.strategy.type_match_step(type_name))),

            ExprKind::TraitFilter { input, trait_name } => Ok(self
                .translate_clause(input)?
                .chain(self.strategy.trait_membership_step(trait_name))),

            ExprKind::Filter { input, predicate } => {
                let input = self.translate_clause(input)?;
                let predicate = self.translate_predicate(predicate)?;
                Ok(input.dot("where", vec![predicate]))
            }

            ExprKind::PathLoop { input, path, times } => {
                let input = self.translate_clause(input)?;
                let steps = path_steps(path)?;
                let navigation = self
                    .navigation(&steps)
                    .ok_or_else(|| TranslationError::Unresolved(path.to_string()))?;

                let max_depth = self.config.max_loop_depth;
                let depth = match *times {
                    Some(n) if n > max_depth => {
                        tracing::warn!(times = n, max_depth, "loop depth above maximum, clamping");
                        max_depth
                    }
                    Some(n) => n,
                    None => max_depth,
                };

                Ok(input
                    .dot("repeat", vec![ScriptExpr::anonymous(navigation)])
                    .dot("emit", vec![])
                    .dot("times", vec![ScriptExpr::integer(i64::from(depth))])
                    .dot("dedup", vec![]))
            }

            ExprKind::OrderBy {
                input,
                key,
                direction,
            } => {
                let input = self.translate_clause(input)?;
                let value = self.value_of(ScriptExpr::ident("it"), &path_steps(key)?);
                Ok(input.chain(self.strategy.order_step(value, *direction)))
            }

            ExprKind::Limit {
                input,
                count,
                offset,
            } => {
                let input = self.translate_clause(input)?;
                let overflow = TranslationError::RangeOverflow {
                    offset: *offset,
                    count: *count,
                };
                let end = offset
                    .checked_add(*count)
                    .and_then(|end| i64::try_from(end).ok())
                    .ok_or_else(|| overflow.clone())?;
                let start = i64::try_from(*offset).map_err(|_| overflow)?;
                Ok(input.dot("range", vec![ScriptExpr::range(start, end)]))
            }

            ExprKind::SelectList { input, items } => {
                let input = self.translate_clause(input)?;
                let element = ScriptExpr::ident("it").dot("get", vec![]);
                let entries = items
                    .iter()
                    .map(|item| {
                        let steps = path_steps(&item.expr)?;
                        Ok((
                            ScriptExpr::string(&item.alias),
                            self.value_of(element.clone(), &steps),
                        ))
                    })
                    .collect::<Result<Vec<_>, TranslationError>>()?;
                Ok(input.dot(
                    "map",
                    vec![ScriptExpr::closure(&["it"], vec![ScriptExpr::Map(entries)])],
                ))
            }

            _ => Err(TranslationError::UnexpectedNode {
                expected: "query clause",
                found: expr.kind_name().to_string(),
            }),
        }
    }

    /// Translates a predicate into an anonymous traversal.
    fn translate_predicate(&self, expr: &Expr) -> Result<ScriptExpr, TranslationError> {
        require_resolved(expr)?;

        match &expr.kind {
            ExprKind::Logical { op, operands } => {
                let operands = operands
                    .iter()
                    .map(|operand| self.translate_predicate(operand))
                    .collect::<Result<Vec<_>, _>>()?;
                let name = match op {
                    LogicalOp::And => "and",
                    LogicalOp::Or => "or",
                    LogicalOp::Not => "not",
                };
                Ok(ScriptExpr::anonymous(ScriptExpr::call(name, operands)))
            }

            ExprKind::Comparison { op, left, right } => {
                let steps = path_steps(left)?;
                let (last, prefix) = steps
                    .split_last()
                    .ok_or_else(|| TranslationError::Unresolved(left.to_string()))?;
                let key = self.strategy.resolve_property(last.owner, last.field);

                let ExprKind::Literal(literal) = &right.kind else {
                    return Err(TranslationError::UnexpectedNode {
                        expected: "literal",
                        found: right.kind_name().to_string(),
                    });
                };

                let test = match (op, literal) {
                    (CompareOp::Equal, Literal::Null) => {
                        ScriptExpr::call("hasNot", vec![ScriptExpr::string(key)])
                    }
                    (CompareOp::NotEqual, Literal::Null) => {
                        ScriptExpr::call("has", vec![ScriptExpr::string(key)])
                    }
                    (CompareOp::Like, Literal::String(pattern)) => ScriptExpr::call(
                        "has",
                        vec![
                            ScriptExpr::string(key),
                            ScriptExpr::call("textRegex", vec![ScriptExpr::string(glob_to_regex(pattern))]),
                        ],
                    ),
                    (op, literal) => {
                        let value = script_literal(literal, last.data_type);
                        ScriptExpr::call(
                            "has",
                            vec![
                                ScriptExpr::string(key),
                                ScriptExpr::call(predicate_name(*op), vec![ScriptExpr::Literal(value)]),
                            ],
                        )
                    }
                };

                let traversal = match self.navigation(prefix) {
                    Some(navigation) => navigation.chain(test),
                    None => test,
                };
                Ok(ScriptExpr::anonymous(traversal))
            }

            _ => Err(TranslationError::UnexpectedNode {
                expected: "predicate",
                found: expr.kind_name().to_string(),
            }),
        }
    }

    /// Step template navigating every segment of `steps`, or `None` for an
    /// empty path.
    fn navigation(&self, steps: &[PathStep<'_>]) -> Option<ScriptExpr> {
        steps.iter().fold(None, |template, step| {
            let (label, direction) = self.edge(step);
            let nav = self.strategy.navigation_step(&label, direction);
            Some(match template {
                Some(template) => template.chain(nav),
                None => nav,
            })
        })
    }

    /// Closure expression reading `steps` from the element `base`.
    fn value_of(&self, base: ScriptExpr, steps: &[PathStep<'_>]) -> ScriptExpr {
        self.value_at(base, steps, 1)
    }

    // Each reference hop binds its neighbour as `n<depth>`.
    fn value_at(&self, base: ScriptExpr, steps: &[PathStep<'_>], depth: usize) -> ScriptExpr {
        match steps {
            [] => base,
            [last] if last.data_type.reference_target().is_none() => {
                let key = self.strategy.resolve_property(last.owner, last.field);
                self.strategy.property_value(base, &key)
            }
            [step, rest @ ..] => {
                let (label, direction) = self.edge(step);
                let binding = format!("n{}", depth);
                let value = self.value_at(self.strategy.neighbour(&binding), rest, depth + 1);
                self.strategy
                    .navigate_value(base, &label, direction, &binding, value)
            }
        }
    }

    fn edge(&self, step: &PathStep<'_>) -> (String, EdgeDirection) {
        (
            self.strategy.edge_label(step.owner, step.field),
            self.strategy.edge_direction(step.owner, step.field),
        )
    }
}

fn require_resolved(expr: &Expr) -> Result<(), TranslationError> {
    if expr.resolved.is_some() {
        Ok(())
    } else {
        Err(TranslationError::Unresolved(expr.to_string()))
    }
}

/// Flattens a resolved path, outermost segment first.
fn path_steps(expr: &Expr) -> Result<Vec<PathStep<'_>>, TranslationError> {
    let ExprKind::FieldAccess { input, field } = &expr.kind else {
        return Err(TranslationError::UnexpectedNode {
            expected: "field access",
            found: expr.kind_name().to_string(),
        });
    };
    let resolved = expr
        .resolved
        .as_ref()
        .ok_or_else(|| TranslationError::Unresolved(expr.to_string()))?;
    let owner = resolved
        .declared_in
        .as_deref()
        .ok_or_else(|| TranslationError::Unresolved(expr.to_string()))?;

    let mut steps = match input {
        Some(inner) => path_steps(inner)?,
        None => Vec::new(),
    };
    steps.push(PathStep {
        owner,
        field,
        data_type: &resolved.data_type,
    });
    Ok(steps)
}

fn predicate_name(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Equal => "eq",
        CompareOp::NotEqual => "neq",
        CompareOp::LessThan => "lt",
        CompareOp::LessEqual => "lte",
        CompareOp::GreaterThan => "gt",
        CompareOp::GreaterEqual => "gte",
        CompareOp::Like => "textRegex",
    }
}

fn script_literal(literal: &Literal, attribute: &DataType) -> ScriptLiteral {
    match literal {
        Literal::Integer(n) => ScriptLiteral::Integer(*n),
        // Whole decimals compared with integral attributes
        Literal::Decimal(d) if attribute.is_integral() => match d.to_i64() {
            Some(n) if d.fract().is_zero() => ScriptLiteral::Integer(n),
            _ => ScriptLiteral::Decimal(*d),
        },
        Literal::Decimal(d) => ScriptLiteral::Decimal(*d),
        Literal::String(s) => ScriptLiteral::String(s.clone()),
        Literal::Boolean(b) => ScriptLiteral::Boolean(*b),
        Literal::Null => ScriptLiteral::Null,
    }
}

/// Converts a `like` pattern (`*` any run, `?` one character) into an
/// anchored regular expression.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            c => regex.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_to_regex_escapes_metacharacters() {
        assert_eq!(glob_to_regex("sales_*"), "^sales_.*$");
        assert_eq!(glob_to_regex("a.b?"), "^a\\.b.$");
        assert_eq!(glob_to_regex("(x)"), "^\\(x\\)$");
    }
}
