//! Canonical vSQL source rendering.
//!
//! Used for diagnostics and SQL comments whenever a node carries no origin.
//! Child nodes that do carry an origin are rendered with their original text.

use crate::ast::{Expr, Node};

const PREC_IF: u8 = 1;
const PREC_POSTFIX: u8 = 14;
const PREC_ATOM: u8 = 15;

/// Render a node as vSQL source text
pub fn render(node: &Node) -> String {
    match &node.expr {
        Expr::None => "None".to_string(),
        Expr::Bool(true) => "True".to_string(),
        Expr::Bool(false) => "False".to_string(),
        Expr::Int(n) => n.to_string(),
        Expr::Number(n) => {
            let s = n.to_string();
            if s.contains('.') { s } else { format!("{}.0", s) }
        }
        Expr::Str(s) => repr_str(s),
        Expr::Date(d) => format!("@({})", d.format("%Y-%m-%d")),
        Expr::DateTime(dt) => format!("@({})", dt.format("%Y-%m-%dT%H:%M:%S")),
        Expr::Field(name) => name.clone(),
        Expr::Unary { op, operand } => {
            format!("{}{}", op.symbol(), wrap(operand, op.precedence()))
        }
        Expr::Binary { op, left, right } => {
            if *op == crate::ast::BinaryOp::Item {
                return format!("{}[{}]", wrap(left, PREC_POSTFIX), right.source());
            }
            let prec = op.precedence();
            let left_min = if op.is_comparison() { prec + 1 } else { prec };
            format!(
                "{} {} {}",
                wrap(left, left_min),
                op.symbol(),
                wrap(right, prec + 1)
            )
        }
        Expr::IfElse {
            then,
            cond,
            otherwise,
        } => format!(
            "{} if {} else {}",
            wrap(then, PREC_IF + 1),
            wrap(cond, PREC_IF + 1),
            wrap(otherwise, PREC_IF)
        ),
        Expr::Func { name, args } => format!("{}({})", name, render_args(args)),
        Expr::Aggregate { kind, args } => format!("{}({})", kind, render_args(args)),
        Expr::Meth { obj, name, args } => {
            format!("{}.{}({})", wrap(obj, PREC_POSTFIX), name, render_args(args))
        }
        Expr::Attr { obj, name } => format!("{}.{}", wrap(obj, PREC_POSTFIX), name),
    }
}

fn render_args(args: &[Node]) -> String {
    args.iter().map(Node::source).collect::<Vec<_>>().join(", ")
}

/// Render a child, parenthesized if it binds weaker than `min`
fn wrap(node: &Node, min: u8) -> String {
    let text = node.source();
    if precedence(node) < min {
        format!("({})", text)
    } else {
        text
    }
}

fn precedence(node: &Node) -> u8 {
    match &node.expr {
        Expr::Unary { op, .. } => op.precedence(),
        Expr::Binary { op, .. } => op.precedence(),
        Expr::IfElse { .. } => PREC_IF,
        Expr::Int(n) if *n < 0 => 12,
        Expr::Number(n) if n.is_sign_negative() => 12,
        Expr::Func { .. } | Expr::Meth { .. } | Expr::Attr { .. } | Expr::Aggregate { .. } => {
            PREC_POSTFIX
        }
        _ => PREC_ATOM,
    }
}

/// Quote a string the way vSQL string literals are written
pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut result = String::with_capacity(s.len() + 2);
    result.push(quote);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c == quote => {
                result.push('\\');
                result.push(c);
            }
            c if c.is_control() => result.push_str(&format!("\\x{:02x}", c as u32)),
            c => result.push(c),
        }
    }
    result.push(quote);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, UnaryOp};

    #[test]
    fn test_repr_str_picks_quotes() {
        assert_eq!(repr_str("foo"), "'foo'");
        assert_eq!(repr_str("'"), "\"'\"");
        assert_eq!(repr_str("'\""), "'\\'\"'");
        assert_eq!(repr_str("a\nb"), "'a\\nb'");
    }

    #[test]
    fn test_precedence_parentheses() {
        let sum = Node::binary(BinaryOp::Add, Node::field("a"), Node::field("b"));
        let product = Node::binary(BinaryOp::Mul, sum.clone(), Node::int(2));
        assert_eq!(render(&product), "(a + b) * 2");

        let nested = Node::binary(BinaryOp::Sub, Node::field("a"), sum);
        assert_eq!(render(&nested), "a - (a + b)");

        let negated = Node::unary(UnaryOp::Not, Node::binary(BinaryOp::Eq, Node::field("x"), Node::none()));
        assert_eq!(render(&negated), "not x == None");
    }

    #[test]
    fn test_postfix_forms() {
        let meth = Node::meth(Node::field("name"), "startswith", vec![Node::str("A")]);
        assert_eq!(render(&meth), "name.startswith('A')");

        let neg = Node::attr(Node::int(-1), "year");
        assert_eq!(render(&neg), "(-1).year");

        let item = Node::binary(BinaryOp::Item, Node::field("s"), Node::int(0));
        assert_eq!(render(&item), "s[0]");
    }
}
