//! Canonical query text for source trees.
//!
//! Printing a parsed tree and parsing the text again yields an equal tree.

use std::fmt;

use crate::ast::{Expr, ExprKind, Literal, LogicalOp, SelectItem, Token};

/// Writes a name, back-quoting it when it is not a plain identifier.
pub fn write_identifier(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && Token::keyword(&name.to_lowercase()).is_none();
    if plain {
        f.write_str(name)
    } else {
        write!(f, "`{}`", name)
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Decimal(d) => write!(f, "{}", d),
            Literal::String(s) => write_string(f, s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::TypeSelect { type_name } => {
                f.write_str("from ")?;
                write_identifier(f, type_name)
            }
            ExprKind::TraitFilter { input, trait_name } => {
                write!(f, "{} isa ", input)?;
                write_identifier(f, trait_name)
            }
            ExprKind::Filter { input, predicate } => write!(f, "{} where {}", input, predicate),
            ExprKind::Comparison { op, left, right } => write!(f, "{} {} {}", left, op, right),
            ExprKind::Logical {
                op: LogicalOp::Not,
                operands,
            } => {
                f.write_str("not ")?;
                for operand in operands {
                    write_operand(f, operand, true)?;
                }
                Ok(())
            }
            ExprKind::Logical { op, operands } => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    let same_op_first = i == 0
                        && matches!(&operand.kind, ExprKind::Logical { op: inner, .. } if inner == op);
                    write_operand(f, operand, !same_op_first)?;
                }
                Ok(())
            }
            ExprKind::FieldAccess { input, field } => {
                if let Some(inner) = input {
                    write!(f, "{}.", inner)?;
                }
                write_identifier(f, field)
            }
            ExprKind::PathLoop { input, path, times } => match times {
                Some(n) => write!(f, "{} loop({}, times={})", input, path, n),
                None => write!(f, "{} loop({})", input, path),
            },
            ExprKind::OrderBy {
                input,
                key,
                direction,
            } => write!(f, "{} orderby {} {}", input, key, direction),
            ExprKind::Limit {
                input,
                count,
                offset,
            } => write!(f, "{} limit {} offset {}", input, count, offset),
            ExprKind::SelectList { input, items } => write_select(f, input, items),
            ExprKind::Literal(literal) => write!(f, "{}", literal),
        }
    }
}

// Parenthesizes AND/OR operands when `nested` is set.
fn write_operand(f: &mut fmt::Formatter<'_>, operand: &Expr, nested: bool) -> fmt::Result {
    let binary = matches!(
        &operand.kind,
        ExprKind::Logical {
            op: LogicalOp::And | LogicalOp::Or,
            ..
        }
    );
    if binary && nested {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}

// The select list is the outermost node but is written before the orderby and
// limit clauses it wraps.
fn write_select(
    f: &mut fmt::Formatter<'_>,
    input: &Expr,
    items: &[SelectItem],
) -> fmt::Result {
    let mut trailing = Vec::new();
    let mut core = input;
    loop {
        match &core.kind {
            ExprKind::Limit { input, .. } | ExprKind::OrderBy { input, .. } => {
                trailing.push(core);
                core = input.as_ref();
            }
            _ => break,
        }
    }

    write!(f, "{} select ", core)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{} as ", item.expr)?;
        write_identifier(f, &item.alias)?;
    }

    for clause in trailing.iter().rev() {
        match &clause.kind {
            ExprKind::OrderBy { key, direction, .. } => {
                f.write_str(" orderby ")?;
                write_order_key(f, key, items)?;
                write!(f, " {}", direction)?;
            }
            ExprKind::Limit { count, offset, .. } => write!(f, " limit {} offset {}", count, offset)?,
            _ => {}
        }
    }
    Ok(())
}

// A bare key that names a select alias would be read back as that alias, so
// such keys are written as the alias of the item selecting them.
fn write_order_key(f: &mut fmt::Formatter<'_>, key: &Expr, items: &[SelectItem]) -> fmt::Result {
    let shadowed = matches!(
        &key.kind,
        ExprKind::FieldAccess { input: None, field } if items.iter().any(|item| &item.alias == field)
    );
    let alias = items.iter().find(|item| item.expr.kind == key.kind);
    match alias {
        Some(item) if shadowed => write_identifier(f, &item.alias),
        _ => write!(f, "{}", key),
    }
}
