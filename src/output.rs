//! Script text rendering.
//!
//! This module turns a [`ScriptExpr`] tree into the text handed to the
//! script engine. Output is deterministic: the same tree always renders to
//! the same bytes, and map entries keep their insertion order.
//!
//! # Features
//!
//! - **Compact output** via [`to_script()`] - the whole script on one line
//! - **Pretty output** via [`to_script_pretty()`] - one top-level step per line
//! - **String escaping** - single-quoted literals with backslash escapes
//!
//! # Examples
//!
//! ```
//! use metaquery::script::ScriptExpr;
//! use metaquery::output::{to_script, to_script_pretty};
//!
//! let script = ScriptExpr::ident("g")
//!     .dot("V", vec![])
//!     .dot("has", vec![ScriptExpr::string("__typeName"), ScriptExpr::string("Table")])
//!     .dot("toList", vec![]);
//!
//! assert_eq!(to_script(&script), "g.V().has('__typeName', 'Table').toList()");
//! assert_eq!(
//!     to_script_pretty(&script),
//!     "g.V()\n  .has('__typeName', 'Table')\n  .toList()"
//! );
//! ```

use crate::script::{FunctionCall, ScriptExpr, ScriptLiteral};

pub struct ScriptPrinter {
    pretty: bool,
}

impl ScriptPrinter {
    pub fn new(pretty: bool) -> Self {
        ScriptPrinter { pretty }
    }

    pub fn print(&self, script: &ScriptExpr) -> String {
        if !self.pretty {
            return self.print_expr(script);
        }

        // Only the outermost chain is broken across lines
        let steps = script.chain_steps();
        let mut result = String::new();
        for (i, step) in steps.iter().enumerate() {
            match step {
                ScriptExpr::Call(call) if i > 0 => {
                    // The first step stays on the line of a bare root (`g.V()`)
                    let after_root = i == 1 && matches!(steps[0], ScriptExpr::Identifier(_));
                    if !after_root {
                        result.push('\n');
                        result.push_str(&self.indent(1));
                    }
                    result.push('.');
                    result.push_str(&self.print_invocation(call));
                }
                first => result.push_str(&self.print_expr(first)),
            }
        }
        result
    }

    fn print_expr(&self, expr: &ScriptExpr) -> String {
        match expr {
            ScriptExpr::Call(call) => match &call.caller {
                Some(caller) => format!("{}.{}", self.print_expr(caller), self.print_invocation(call)),
                None => self.print_invocation(call),
            },
            ScriptExpr::Closure { params, body } => self.print_closure(params, body),
            ScriptExpr::Identifier(name) => name.clone(),
            ScriptExpr::Literal(literal) => self.print_literal(literal),
            ScriptExpr::Range { offset, end } => {
                format!("{}..<{}", self.print_expr(offset), self.print_expr(end))
            }
            ScriptExpr::List(items) => format!("[{}]", self.print_list(items)),
            ScriptExpr::Map(entries) => self.print_map(entries),
            ScriptExpr::Conditional {
                condition,
                then,
                otherwise,
            } => format!(
                "{} ? {} : {}",
                self.print_expr(condition),
                self.print_expr(then),
                self.print_expr(otherwise)
            ),
        }
    }

    fn print_invocation(&self, call: &FunctionCall) -> String {
        format!("{}({})", call.name, self.print_list(&call.args))
    }

    fn print_list(&self, items: &[ScriptExpr]) -> String {
        items
            .iter()
            .map(|item| self.print_expr(item))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn print_closure(&self, params: &[String], body: &[ScriptExpr]) -> String {
        let statements = body
            .iter()
            .map(|s| self.print_expr(s))
            .collect::<Vec<_>>()
            .join("; ");
        if params.is_empty() {
            format!("{{ {} }}", statements)
        } else {
            format!("{{ {} -> {} }}", params.join(", "), statements)
        }
    }

    fn print_map(&self, entries: &[(ScriptExpr, ScriptExpr)]) -> String {
        if entries.is_empty() {
            return "[:]".to_string();
        }
        let items: Vec<String> = entries
            .iter()
            .map(|(k, v)| format!("{}: {}", self.print_expr(k), self.print_expr(v)))
            .collect();
        format!("[{}]", items.join(", "))
    }

    fn print_literal(&self, literal: &ScriptLiteral) -> String {
        match literal {
            ScriptLiteral::String(s) => format!("'{}'", self.escape_string(s)),
            ScriptLiteral::Integer(n) => n.to_string(),
            ScriptLiteral::Decimal(d) => d.to_string(),
            ScriptLiteral::Boolean(b) => b.to_string(),
            ScriptLiteral::Null => "null".to_string(),
        }
    }

    fn indent(&self, level: usize) -> String {
        "  ".repeat(level)
    }

    fn escape_string(&self, s: &str) -> String {
        s.chars()
            .flat_map(|c| match c {
                '\'' => vec!['\\', '\''],
                '\\' => vec!['\\', '\\'],
                '\n' => vec!['\\', 'n'],
                '\r' => vec!['\\', 'r'],
                '\t' => vec!['\\', 't'],
                c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
                c => vec![c],
            })
            .collect()
    }
}

/// Renders a script on a single line.
pub fn to_script(script: &ScriptExpr) -> String {
    ScriptPrinter::new(false).print(script)
}

/// Renders a script with each top-level step on its own line.
pub fn to_script_pretty(script: &ScriptExpr) -> String {
    ScriptPrinter::new(true).print(script)
}
