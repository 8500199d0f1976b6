//! Target tree: the traversal script before it is rendered to text.
//!
//! ```text
//! g.V().has('__typeName', 'Table').range(0..<10).toList()
//! ```
//!
//! is a chain of [`FunctionCall`]s, each holding the previous call as its
//! `caller`. A call without a caller is a free function (or a step
//! template waiting to be attached with [`ScriptExpr::chain`]).

use rust_decimal::Decimal;

use crate::error::TranslationError;
use crate::visitor::{TreeNode, expect_arity};

/// Name of the anonymous traversal root used inside predicates.
pub const ANONYMOUS: &str = "__";

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptLiteral {
    String(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub caller: Option<Box<ScriptExpr>>,
    pub name: String,
    pub args: Vec<ScriptExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptExpr {
    /// `caller.name(args)` or `name(args)`
    Call(FunctionCall),

    /// `{ params -> statement; statement }`
    Closure {
        params: Vec<String>,
        body: Vec<ScriptExpr>,
    },

    Identifier(String),

    Literal(ScriptLiteral),

    /// `offset..<end`, end exclusive
    Range {
        offset: Box<ScriptExpr>,
        end: Box<ScriptExpr>,
    },

    /// `[a, b]`
    List(Vec<ScriptExpr>),

    /// `['key': value]`, entries in insertion order
    Map(Vec<(ScriptExpr, ScriptExpr)>),

    /// `condition ? then : otherwise`
    Conditional {
        condition: Box<ScriptExpr>,
        then: Box<ScriptExpr>,
        otherwise: Box<ScriptExpr>,
    },
}

impl ScriptExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        ScriptExpr::Identifier(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        ScriptExpr::Literal(ScriptLiteral::String(value.into()))
    }

    pub fn integer(value: i64) -> Self {
        ScriptExpr::Literal(ScriptLiteral::Integer(value))
    }

    pub fn null() -> Self {
        ScriptExpr::Literal(ScriptLiteral::Null)
    }

    /// A free call, or a step template before it is chained.
    pub fn call(name: impl Into<String>, args: Vec<ScriptExpr>) -> Self {
        ScriptExpr::Call(FunctionCall {
            caller: None,
            name: name.into(),
            args,
        })
    }

    /// `self.name(args)`
    pub fn dot(self, name: impl Into<String>, args: Vec<ScriptExpr>) -> Self {
        ScriptExpr::Call(FunctionCall {
            caller: Some(Box::new(self)),
            name: name.into(),
            args,
        })
    }

    pub fn closure(params: &[&str], body: Vec<ScriptExpr>) -> Self {
        ScriptExpr::Closure {
            params: params.iter().map(|p| p.to_string()).collect(),
            body,
        }
    }

    pub fn range(offset: i64, end: i64) -> Self {
        ScriptExpr::Range {
            offset: Box::new(ScriptExpr::integer(offset)),
            end: Box::new(ScriptExpr::integer(end)),
        }
    }

    pub fn conditional(condition: ScriptExpr, then: ScriptExpr, otherwise: ScriptExpr) -> Self {
        ScriptExpr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Starts an anonymous traversal: `__.step`.
    pub fn anonymous(step: ScriptExpr) -> Self {
        ScriptExpr::ident(ANONYMOUS).chain(step)
    }

    /// Attaches a step template (a call chain whose innermost call has no
    /// caller) to `self`. Non-call steps are returned unchanged.
    pub fn chain(self, step: ScriptExpr) -> ScriptExpr {
        match step {
            ScriptExpr::Call(FunctionCall { caller, name, args }) => {
                let caller = match caller {
                    None => self,
                    Some(inner) => self.chain(*inner),
                };
                ScriptExpr::Call(FunctionCall {
                    caller: Some(Box::new(caller)),
                    name,
                    args,
                })
            }
            other => other,
        }
    }

    pub fn as_call(&self) -> Option<&FunctionCall> {
        match self {
            ScriptExpr::Call(call) => Some(call),
            _ => None,
        }
    }

    /// True for a call named `name`.
    pub fn is_call(&self, name: &str) -> bool {
        self.as_call().is_some_and(|c| c.name == name)
    }

    /// The innermost element of a call chain.
    pub fn chain_root(&self) -> &ScriptExpr {
        let mut current = self;
        while let ScriptExpr::Call(FunctionCall {
            caller: Some(caller),
            ..
        }) = current
        {
            current = caller;
        }
        current
    }

    /// The call chain flattened innermost first, the terminal included.
    pub fn chain_steps(&self) -> Vec<&ScriptExpr> {
        let mut steps = vec![self];
        let mut current = self;
        while let ScriptExpr::Call(FunctionCall {
            caller: Some(caller),
            ..
        }) = current
        {
            steps.push(caller);
            current = caller;
        }
        steps.reverse();
        steps
    }
}

impl FunctionCall {
    /// Copies the call onto a different caller.
    pub fn with_caller(&self, caller: Option<ScriptExpr>) -> ScriptExpr {
        ScriptExpr::Call(FunctionCall {
            caller: caller.map(Box::new),
            name: self.name.clone(),
            args: self.args.clone(),
        })
    }
}

impl TreeNode for ScriptExpr {
    fn children(&self) -> Vec<&ScriptExpr> {
        match self {
            ScriptExpr::Call(call) => call.caller.as_deref().into_iter().chain(call.args.iter()).collect(),
            ScriptExpr::Closure { body, .. } => body.iter().collect(),
            ScriptExpr::Identifier(_) | ScriptExpr::Literal(_) => Vec::new(),
            ScriptExpr::Range { offset, end } => vec![offset.as_ref(), end.as_ref()],
            ScriptExpr::List(items) => items.iter().collect(),
            ScriptExpr::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            ScriptExpr::Conditional {
                condition,
                then,
                otherwise,
            } => vec![condition.as_ref(), then.as_ref(), otherwise.as_ref()],
        }
    }

    fn with_children(&self, children: Vec<ScriptExpr>) -> Result<ScriptExpr, TranslationError> {
        let expected = self.children().len();
        expect_arity(self.kind_name(), &children, expected)?;

        let mut children = children.into_iter();
        let rebuilt = match self {
            ScriptExpr::Call(call) => {
                let caller = if call.caller.is_some() {
                    children.next().map(Box::new)
                } else {
                    None
                };
                ScriptExpr::Call(FunctionCall {
                    caller,
                    name: call.name.clone(),
                    args: children.collect(),
                })
            }
            ScriptExpr::Closure { params, .. } => ScriptExpr::Closure {
                params: params.clone(),
                body: children.collect(),
            },
            ScriptExpr::Identifier(_) | ScriptExpr::Literal(_) => self.clone(),
            ScriptExpr::Range { .. } => match (children.next(), children.next()) {
                (Some(offset), Some(end)) => ScriptExpr::Range {
                    offset: Box::new(offset),
                    end: Box::new(end),
                },
                _ => {
                    return Err(TranslationError::ArityMismatch {
                        node: "range",
                        expected: 2,
                        found: expected,
                    });
                }
            },
            ScriptExpr::List(_) => ScriptExpr::List(children.collect()),
            ScriptExpr::Map(_) => {
                let mut entries = Vec::with_capacity(expected / 2);
                while let (Some(key), Some(value)) = (children.next(), children.next()) {
                    entries.push((key, value));
                }
                ScriptExpr::Map(entries)
            }
            ScriptExpr::Conditional { .. } => {
                match (children.next(), children.next(), children.next()) {
                    (Some(condition), Some(then), Some(otherwise)) => {
                        ScriptExpr::conditional(condition, then, otherwise)
                    }
                    _ => {
                        return Err(TranslationError::ArityMismatch {
                            node: "conditional",
                            expected: 3,
                            found: expected,
                        });
                    }
                }
            }
        };
        Ok(rebuilt)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            ScriptExpr::Call(_) => "call",
            ScriptExpr::Closure { .. } => "closure",
            ScriptExpr::Identifier(_) => "identifier",
            ScriptExpr::Literal(_) => "literal",
            ScriptExpr::Range { .. } => "range",
            ScriptExpr::List(_) => "list",
            ScriptExpr::Map(_) => "map",
            ScriptExpr::Conditional { .. } => "conditional",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_attaches_innermost_caller() {
        let step = ScriptExpr::call("out", vec![ScriptExpr::string("e")])
            .dot("has", vec![ScriptExpr::string("k")]);
        let chained = ScriptExpr::ident("g").dot("V", vec![]).chain(step);

        let names: Vec<_> = chained
            .chain_steps()
            .iter()
            .map(|s| match s {
                ScriptExpr::Call(c) => c.name.clone(),
                ScriptExpr::Identifier(i) => i.clone(),
                _ => String::new(),
            })
            .collect();
        assert_eq!(names, vec!["g", "V", "out", "has"]);
    }

    #[test]
    fn test_conditional_children_rebuild() {
        let node = ScriptExpr::conditional(ScriptExpr::ident("c"), ScriptExpr::integer(1), ScriptExpr::null());
        let children: Vec<ScriptExpr> = node.children().into_iter().cloned().collect();
        assert_eq!(children.len(), 3);
        assert_eq!(node.with_children(children).unwrap(), node);
    }

    #[test]
    fn test_with_children_rejects_wrong_arity() {
        let range = ScriptExpr::range(0, 10);
        let err = range.with_children(vec![ScriptExpr::integer(1)]).unwrap_err();
        assert!(matches!(err, TranslationError::ArityMismatch { expected: 2, found: 1, .. }));
    }
}
