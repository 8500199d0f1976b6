use rust_decimal::Decimal;

use crate::ast::{CompareOp, LogicalOp, SortDirection};
use crate::error::TranslationError;
use crate::schema::DataType;
use crate::visitor::{TreeNode, expect_arity};

/// Literal values in predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Boolean(bool),
    Null,
}

/// Annotation attached by the validator.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub data_type: DataType,
    /// For attribute references, the type that declares the attribute
    pub declared_in: Option<String>,
}

/// One `expr as alias` entry of a select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub alias: String,
    pub expr: Expr,
}

/// Node of the source query tree.
///
/// Query clauses wrap their input, so
///
/// ```text
/// from Table where name = "t1" select name limit 5
/// ```
///
/// parses to `SelectList(Limit(Filter(TypeSelect)))`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    /// `None` until the validator has bound the node
    pub resolved: Option<Resolved>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Entities (or trait instances) of a named type
    ///
    /// # Example
    /// ```text
    /// from Table
    /// ```
    TypeSelect { type_name: String },

    /// Restricts the input to entities carrying a trait
    ///
    /// # Example
    /// ```text
    /// Table isa Encrypted
    /// ```
    TraitFilter { input: Box<Expr>, trait_name: String },

    /// `where` clause
    Filter {
        input: Box<Expr>,
        predicate: Box<Expr>,
    },

    /// Attribute compared with a literal
    ///
    /// # Example
    /// ```text
    /// db.name = "sales"
    /// ```
    Comparison {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// AND/OR take two or more operands, NOT takes one
    Logical { op: LogicalOp, operands: Vec<Expr> },

    /// Attribute of the current entity, or of the entity `input` navigates to
    ///
    /// # Examples
    /// ```text
    /// name        // FieldAccess { input: None, field: "name" }
    /// db.name     // FieldAccess { input: Some(db), field: "name" }
    /// ```
    FieldAccess {
        input: Option<Box<Expr>>,
        field: String,
    },

    /// Repeated navigation along a reference path
    ///
    /// # Example
    /// ```text
    /// Table loop(parent, times=3)
    /// ```
    PathLoop {
        input: Box<Expr>,
        path: Box<Expr>,
        times: Option<u32>,
    },

    OrderBy {
        input: Box<Expr>,
        key: Box<Expr>,
        direction: SortDirection,
    },

    Limit {
        input: Box<Expr>,
        count: u64,
        offset: u64,
    },

    SelectList {
        input: Box<Expr>,
        items: Vec<SelectItem>,
    },

    Literal(Literal),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr { kind, resolved: None }
    }

    pub fn with_resolved(mut self, resolved: Resolved) -> Self {
        self.resolved = Some(resolved);
        self
    }

    pub fn type_select(type_name: impl Into<String>) -> Self {
        Expr::new(ExprKind::TypeSelect {
            type_name: type_name.into(),
        })
    }

    /// Builds a dotted path: `field_path(&["db", "name"])` is `db.name`.
    pub fn field_path(segments: &[&str]) -> Self {
        let mut expr: Option<Expr> = None;
        for segment in segments {
            expr = Some(Expr::new(ExprKind::FieldAccess {
                input: expr.map(Box::new),
                field: segment.to_string(),
            }));
        }
        expr.unwrap_or_else(|| Expr::literal(Literal::Null))
    }

    pub fn literal(literal: Literal) -> Self {
        Expr::new(ExprKind::Literal(literal))
    }

    /// The clause this node wraps, for query clause nodes.
    pub fn input(&self) -> Option<&Expr> {
        match &self.kind {
            ExprKind::TraitFilter { input, .. }
            | ExprKind::Filter { input, .. }
            | ExprKind::PathLoop { input, .. }
            | ExprKind::OrderBy { input, .. }
            | ExprKind::Limit { input, .. }
            | ExprKind::SelectList { input, .. } => Some(input.as_ref()),
            _ => None,
        }
    }

    /// Segments of a field path, or `None` if this is not a pure path.
    pub fn path_segments(&self) -> Option<Vec<&str>> {
        match &self.kind {
            ExprKind::FieldAccess { input, field } => {
                let mut segments = match input {
                    Some(inner) => inner.path_segments()?,
                    None => Vec::new(),
                };
                segments.push(field.as_str());
                Some(segments)
            }
            _ => None,
        }
    }

    /// Iterates the query clause chain, outermost clause first.
    pub fn clauses(&self) -> impl Iterator<Item = &Expr> {
        std::iter::successors(Some(self), |e| e.input())
    }

    /// The select list of a query tree, if it has one.
    pub fn select_items(&self) -> Option<&[SelectItem]> {
        self.clauses().find_map(|e| match &e.kind {
            ExprKind::SelectList { items, .. } => Some(items.as_slice()),
            _ => None,
        })
    }

    /// The TypeSelect at the bottom of a query tree.
    pub fn source_type(&self) -> Option<&Expr> {
        self.clauses()
            .find(|e| matches!(e.kind, ExprKind::TypeSelect { .. }))
    }
}

impl TreeNode for Expr {
    fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::TypeSelect { .. } | ExprKind::Literal(_) => Vec::new(),
            ExprKind::TraitFilter { input, .. } | ExprKind::Limit { input, .. } => {
                vec![input.as_ref()]
            }
            ExprKind::Filter { input, predicate } => vec![input.as_ref(), predicate.as_ref()],
            ExprKind::Comparison { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ExprKind::Logical { operands, .. } => operands.iter().collect(),
            ExprKind::FieldAccess { input, .. } => input.as_deref().into_iter().collect(),
            ExprKind::PathLoop { input, path, .. } => vec![input.as_ref(), path.as_ref()],
            ExprKind::OrderBy { input, key, .. } => vec![input.as_ref(), key.as_ref()],
            ExprKind::SelectList { input, items } => std::iter::once(input.as_ref())
                .chain(items.iter().map(|item| &item.expr))
                .collect(),
        }
    }

    fn with_children(&self, children: Vec<Expr>) -> Result<Expr, TranslationError> {
        let expected = self.children().len();
        expect_arity(self.kind_name(), &children, expected)?;

        let mut children = children.into_iter().map(Box::new);
        let mut next = || {
            children.next().ok_or(TranslationError::ArityMismatch {
                node: "expr",
                expected,
                found: 0,
            })
        };

        let kind = match &self.kind {
            ExprKind::TypeSelect { .. } | ExprKind::Literal(_) => self.kind.clone(),
            ExprKind::TraitFilter { trait_name, .. } => ExprKind::TraitFilter {
                input: next()?,
                trait_name: trait_name.clone(),
            },
            ExprKind::Filter { .. } => ExprKind::Filter {
                input: next()?,
                predicate: next()?,
            },
            ExprKind::Comparison { op, .. } => ExprKind::Comparison {
                op: *op,
                left: next()?,
                right: next()?,
            },
            ExprKind::Logical { op, operands } => ExprKind::Logical {
                op: *op,
                operands: (0..operands.len())
                    .map(|_| next().map(|b| *b))
                    .collect::<Result<_, _>>()?,
            },
            ExprKind::FieldAccess { input, field } => ExprKind::FieldAccess {
                input: if input.is_some() { Some(next()?) } else { None },
                field: field.clone(),
            },
            ExprKind::PathLoop { times, .. } => ExprKind::PathLoop {
                input: next()?,
                path: next()?,
                times: *times,
            },
            ExprKind::OrderBy { direction, .. } => ExprKind::OrderBy {
                input: next()?,
                key: next()?,
                direction: *direction,
            },
            ExprKind::Limit { count, offset, .. } => ExprKind::Limit {
                input: next()?,
                count: *count,
                offset: *offset,
            },
            ExprKind::SelectList { items, .. } => {
                let input = next()?;
                let items = items
                    .iter()
                    .map(|item| {
                        next().map(|expr| SelectItem {
                            alias: item.alias.clone(),
                            expr: *expr,
                        })
                    })
                    .collect::<Result<_, _>>()?;
                ExprKind::SelectList { input, items }
            }
        };

        Ok(Expr {
            kind,
            resolved: self.resolved.clone(),
        })
    }

    fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::TypeSelect { .. } => "type select",
            ExprKind::TraitFilter { .. } => "trait filter",
            ExprKind::Filter { .. } => "where clause",
            ExprKind::Comparison { .. } => "comparison",
            ExprKind::Logical { .. } => "logical expression",
            ExprKind::FieldAccess { .. } => "field access",
            ExprKind::PathLoop { .. } => "loop",
            ExprKind::OrderBy { .. } => "orderby",
            ExprKind::Limit { .. } => "limit",
            ExprKind::SelectList { .. } => "select list",
            ExprKind::Literal(_) => "literal",
        }
    }
}
