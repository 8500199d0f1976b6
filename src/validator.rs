//! Semantic binding of a parsed query against the type registry.
//!
//! The validator makes one bottom-up pass. Query clauses are bound before
//! the clauses that wrap them; predicates, paths and select items are bound
//! against the entity type produced by the clause they belong to. The input
//! tree is left untouched; the result is an annotated copy.

use rust_decimal::Decimal;

use crate::ast::{CompareOp, Expr, ExprKind, Literal, LogicalOp, Resolved, SelectItem};
use crate::error::SemanticError;
use crate::schema::{DataType, TypeCategory, TypeRegistry};

pub struct Validator<'r> {
    registry: &'r dyn TypeRegistry,
}

impl<'r> Validator<'r> {
    pub fn new(registry: &'r dyn TypeRegistry) -> Self {
        Validator { registry }
    }

    /// Binds every identifier in `query`.
    pub fn validate(&self, query: &Expr) -> Result<Expr, SemanticError> {
        let validated = self.validate_clause(query)?;
        tracing::debug!(query = %query, "validated query");
        Ok(validated)
    }

    fn resolved(data_type: DataType) -> Resolved {
        Resolved {
            data_type,
            declared_in: None,
        }
    }

    fn validate_clause(&self, expr: &Expr) -> Result<Expr, SemanticError> {
        match &expr.kind {
            ExprKind::TypeSelect { type_name } => {
                let def = self
                    .registry
                    .type_def(type_name)
                    .ok_or_else(|| SemanticError::unknown_type(type_name))?;
                let data_type = match def.category {
                    TypeCategory::Class => DataType::Class(def.name.clone()),
                    TypeCategory::Trait => DataType::Trait(def.name.clone()),
                    TypeCategory::Struct | TypeCategory::Enum => {
                        return Err(SemanticError::type_mismatch(type_name));
                    }
                };
                Ok(expr.clone().with_resolved(Self::resolved(data_type)))
            }

            ExprKind::TraitFilter { input, trait_name } => {
                let input = self.validate_clause(input)?;
                let input_type = clause_type(&input)?;

                let def = self
                    .registry
                    .type_def(trait_name)
                    .ok_or_else(|| SemanticError::unknown_type(trait_name))?;
                let already_applied = input.clauses().any(|c| {
                    matches!(&c.kind, ExprKind::TraitFilter { trait_name: t, .. } if t == trait_name)
                });
                if def.category != TypeCategory::Trait
                    || matches!(input_type, DataType::Trait(_))
                    || already_applied
                {
                    return Err(SemanticError::invalid_trait(trait_name));
                }

                let resolved = Self::resolved(input_type.clone());
                Ok(Expr::new(ExprKind::TraitFilter {
                    input: Box::new(input),
                    trait_name: trait_name.clone(),
                })
                .with_resolved(resolved))
            }

            ExprKind::Filter { input, predicate } => {
                let input = self.validate_clause(input)?;
                let scope = entity_name(&input)?;
                let predicate = self.validate_predicate(predicate, &scope)?;
                let resolved = input.resolved.clone();
                Ok(Expr {
                    kind: ExprKind::Filter {
                        input: Box::new(input),
                        predicate: Box::new(predicate),
                    },
                    resolved,
                })
            }

            ExprKind::PathLoop { input, path, times } => {
                let input = self.validate_clause(input)?;
                let scope = entity_name(&input)?;
                let path = self.validate_path(path, &scope)?;

                let target = path
                    .resolved
                    .as_ref()
                    .and_then(|r| r.data_type.reference_target())
                    .ok_or_else(|| SemanticError::type_mismatch(path.to_string()))?;
                let loops_back = self.registry.is_subtype(target, &scope)
                    || self.registry.is_subtype(&scope, target);
                if !loops_back {
                    return Err(SemanticError::type_mismatch(path.to_string()));
                }

                let resolved = input.resolved.clone();
                Ok(Expr {
                    kind: ExprKind::PathLoop {
                        input: Box::new(input),
                        path: Box::new(path),
                        times: *times,
                    },
                    resolved,
                })
            }

            ExprKind::OrderBy {
                input,
                key,
                direction,
            } => {
                let input = self.validate_clause(input)?;
                let scope = entity_name(&input)?;
                let key = self.validate_path(key, &scope)?;
                if !key.resolved.as_ref().is_some_and(|r| r.data_type.is_primitive()) {
                    return Err(SemanticError::type_mismatch(key.to_string()));
                }

                let resolved = input.resolved.clone();
                Ok(Expr {
                    kind: ExprKind::OrderBy {
                        input: Box::new(input),
                        key: Box::new(key),
                        direction: *direction,
                    },
                    resolved,
                })
            }

            ExprKind::Limit {
                input,
                count,
                offset,
            } => {
                let input = self.validate_clause(input)?;
                let resolved = input.resolved.clone();
                Ok(Expr {
                    kind: ExprKind::Limit {
                        input: Box::new(input),
                        count: *count,
                        offset: *offset,
                    },
                    resolved,
                })
            }

            ExprKind::SelectList { input, items } => {
                let input = self.validate_clause(input)?;
                let scope = entity_name(&input)?;
                let items = items
                    .iter()
                    .map(|item| {
                        Ok(SelectItem {
                            alias: item.alias.clone(),
                            expr: self.validate_path(&item.expr, &scope)?,
                        })
                    })
                    .collect::<Result<Vec<_>, SemanticError>>()?;

                let resolved = input.resolved.clone();
                Ok(Expr {
                    kind: ExprKind::SelectList {
                        input: Box::new(input),
                        items,
                    },
                    resolved,
                })
            }

            // Predicates and paths outside a clause
            _ => Err(SemanticError::type_mismatch(expr.to_string())),
        }
    }

    fn validate_predicate(&self, expr: &Expr, scope: &str) -> Result<Expr, SemanticError> {
        match &expr.kind {
            ExprKind::Logical { op, operands } => {
                let expected = if *op == LogicalOp::Not { 1 } else { 2 };
                if operands.len() < expected || (*op == LogicalOp::Not && operands.len() != 1) {
                    return Err(SemanticError::type_mismatch(expr.to_string()));
                }
                let operands = operands
                    .iter()
                    .map(|operand| self.validate_predicate(operand, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::new(ExprKind::Logical { op: *op, operands })
                    .with_resolved(Self::resolved(DataType::Boolean)))
            }

            ExprKind::Comparison { op, left, right } => {
                let left = self.validate_path(left, scope)?;
                let attribute_type = left
                    .resolved
                    .as_ref()
                    .map(|r| r.data_type.clone())
                    .ok_or_else(|| SemanticError::type_mismatch(left.to_string()))?;
                let attribute = left
                    .path_segments()
                    .and_then(|s| s.last().map(|f| f.to_string()))
                    .unwrap_or_else(|| left.to_string());

                let ExprKind::Literal(literal) = &right.kind else {
                    return Err(SemanticError::type_mismatch(right.to_string()));
                };
                if !compatible(&attribute_type, *op, literal) {
                    return Err(SemanticError::type_mismatch(attribute));
                }

                let literal_type = literal_type(literal);
                Ok(Expr::new(ExprKind::Comparison {
                    op: *op,
                    left: Box::new(left),
                    right: Box::new(right.as_ref().clone().with_resolved(Self::resolved(literal_type))),
                })
                .with_resolved(Self::resolved(DataType::Boolean)))
            }

            _ => Err(SemanticError::type_mismatch(expr.to_string())),
        }
    }

    /// Binds a dotted path. Every segment but the last must be a reference.
    fn validate_path(&self, expr: &Expr, scope: &str) -> Result<Expr, SemanticError> {
        let ExprKind::FieldAccess { input, field } = &expr.kind else {
            return Err(SemanticError::type_mismatch(expr.to_string()));
        };

        let (input, owner) = match input {
            None => (None, scope.to_string()),
            Some(inner) => {
                let inner = self.validate_path(inner, scope)?;
                let owner = inner
                    .resolved
                    .as_ref()
                    .and_then(|r| r.data_type.reference_target())
                    .map(str::to_string)
                    .ok_or_else(|| SemanticError::type_mismatch(field))?;
                (Some(Box::new(inner)), owner)
            }
        };

        let attribute = self
            .registry
            .attribute(&owner, field)
            .ok_or_else(|| SemanticError::unknown_attribute(field))?;

        Ok(Expr::new(ExprKind::FieldAccess {
            input,
            field: field.clone(),
        })
        .with_resolved(Resolved {
            data_type: attribute.data_type,
            declared_in: Some(attribute.declared_in),
        }))
    }
}

fn clause_type(expr: &Expr) -> Result<&DataType, SemanticError> {
    expr.resolved
        .as_ref()
        .map(|r| &r.data_type)
        .ok_or_else(|| SemanticError::type_mismatch(expr.to_string()))
}

/// Name of the entity (or trait) type a clause produces.
fn entity_name(expr: &Expr) -> Result<String, SemanticError> {
    match clause_type(expr)? {
        DataType::Class(name) | DataType::Trait(name) => Ok(name.clone()),
        _ => Err(SemanticError::type_mismatch(expr.to_string())),
    }
}

fn literal_type(literal: &Literal) -> DataType {
    match literal {
        Literal::Integer(_) => DataType::Long,
        Literal::Decimal(_) => DataType::BigDecimal,
        Literal::String(_) | Literal::Null => DataType::String,
        Literal::Boolean(_) => DataType::Boolean,
    }
}

/// Whether `attribute op literal` is a meaningful comparison.
fn compatible(attribute: &DataType, op: CompareOp, literal: &Literal) -> bool {
    if !attribute.is_primitive() {
        return false;
    }
    if let Literal::Null = literal {
        return matches!(op, CompareOp::Equal | CompareOp::NotEqual);
    }
    if op == CompareOp::Like {
        return *attribute == DataType::String && matches!(literal, Literal::String(_));
    }

    match attribute {
        t if t.is_integral() => match literal {
            Literal::Integer(_) => true,
            Literal::Decimal(d) => d.fract() == Decimal::ZERO,
            _ => false,
        },
        t if t.is_numeric() => matches!(literal, Literal::Integer(_) | Literal::Decimal(_)),
        DataType::String | DataType::Enum(_) => matches!(literal, Literal::String(_)),
        DataType::Boolean => {
            !op.is_ordering() && matches!(literal, Literal::Boolean(_))
        }
        DataType::Date => matches!(literal, Literal::String(_) | Literal::Integer(_)),
        _ => false,
    }
}
