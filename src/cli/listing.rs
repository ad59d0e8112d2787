//! Listings of the builtin namespace and the rule tables

use std::fmt::Write;

use super::CliError;
use crate::Dialect;
use crate::namespace::{Constructor, Namespace};
use crate::rules::registry;

/// One line per namespace entry: name and what it builds
pub fn list_functions() -> String {
    let mut out = String::new();
    for (name, constructor) in Namespace::global().entries() {
        let what = match constructor {
            Constructor::Unary(op) => format!("unary operator `{}`", op.symbol().trim_end()),
            Constructor::Binary(op) => format!("binary operator `{}`", op.symbol()),
            Constructor::IfElse => "conditional `a if c else b`".to_string(),
            Constructor::Func(_) => "function".to_string(),
            Constructor::Aggregate(_) => "aggregate".to_string(),
        };
        let operands = match constructor.arity() {
            Some(n) => format!("{} operand(s)", n),
            None => "any arguments".to_string(),
        };
        let _ = writeln!(out, "  {:<14}{:<32}{}", name, what, operands);
    }
    out
}

/// All rules of a dialect, optionally only those of one operator or call name
///
/// `filter` matches the operator encoding (`binop_add`) or the name of a
/// function, method or attribute (`lower`).
pub fn list_rules(dialect: Dialect, filter: Option<&str>) -> Result<String, CliError> {
    let table = registry(dialect)?;
    let mut out = String::new();
    for rule in table.rules() {
        if let Some(filter) = filter {
            if rule.operator.to_string() != filter && rule.name() != Some(filter) {
                continue;
            }
        }
        let _ = writeln!(out, "{}", rule);
    }
    Ok(out)
}
