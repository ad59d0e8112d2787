//! The builtin function table.
//!
//! Maps the names a host language uses for vSQL calls to constructors of the
//! matching node variant. The table is built on first use and read-only
//! afterwards.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::aggregate::AggregationKind;
use crate::ast::{BinaryOp, Node, UnaryOp};
use crate::error::CompileError;

/// Builtin functions compiled through the rule tables
pub const FUNCTIONS: &[&str] = &[
    "bool", "date", "datetime", "days", "float", "hours", "int", "len", "lower", "minutes", "months",
    "now", "seconds", "str", "today", "upper", "weeks", "years",
];

/// How to build the node for one namespace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constructor {
    Unary(UnaryOp),
    Binary(BinaryOp),
    IfElse,
    Func(&'static str),
    Aggregate(AggregationKind),
}

impl Constructor {
    /// Required operand count; `None` for calls, whose arity is checked later
    pub fn arity(self) -> Option<usize> {
        match self {
            Constructor::Unary(_) => Some(1),
            Constructor::Binary(_) => Some(2),
            Constructor::IfElse => Some(3),
            Constructor::Func(_) | Constructor::Aggregate(_) => None,
        }
    }

    /// Build the node.
    ///
    /// Aggregates accept any number of arguments here, so that a wrong count
    /// surfaces as `MalformedAggregation` during validation.
    pub fn build(self, args: Vec<Node>) -> Result<Node, CompileError> {
        Ok(match self {
            Constructor::Unary(op) => {
                let [operand] = self.operands(args)?;
                Node::unary(op, operand)
            }
            Constructor::Binary(op) => {
                let [left, right] = self.operands(args)?;
                Node::binary(op, left, right)
            }
            Constructor::IfElse => {
                let [then, cond, otherwise] = self.operands(args)?;
                Node::if_else(then, cond, otherwise)
            }
            Constructor::Func(name) => Node::func(name, args),
            Constructor::Aggregate(kind) => Node::aggregate(kind, args),
        })
    }

    fn operands<const N: usize>(self, args: Vec<Node>) -> Result<[Node; N], CompileError> {
        <[Node; N]>::try_from(args).map_err(|args| {
            CompileError::UnsupportedAstShape(format!(
                "{:?} takes {} operand(s), got {}",
                self,
                N,
                args.len()
            ))
        })
    }
}

/// Result of a namespace lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Constructor),
    Undefined(String),
}

#[derive(Debug)]
pub struct Namespace {
    entries: BTreeMap<&'static str, Constructor>,
}

static NAMESPACE: LazyLock<Namespace> = LazyLock::new(Namespace::build);

impl Namespace {
    /// The process-wide namespace
    pub fn global() -> &'static Namespace {
        &NAMESPACE
    }

    fn build() -> Namespace {
        let mut entries = BTreeMap::new();
        for op in UnaryOp::ALL {
            entries.insert(op.name(), Constructor::Unary(op));
        }
        for op in BinaryOp::ALL {
            entries.insert(op.name(), Constructor::Binary(op));
        }
        entries.insert("ifelse", Constructor::IfElse);
        for &name in FUNCTIONS {
            entries.insert(name, Constructor::Func(name));
        }
        for kind in AggregationKind::ALL {
            entries.insert(kind.as_str(), Constructor::Aggregate(kind));
        }
        Namespace { entries }
    }

    /// Look up a name
    ///
    /// # Examples
    ///
    /// ```
    /// use vsql::namespace::{Lookup, Namespace};
    ///
    /// let ns = Namespace::global();
    /// assert!(matches!(ns.lookup("today"), Lookup::Found(_)));
    /// assert_eq!(ns.lookup("frobnicate"), Lookup::Undefined("frobnicate".to_string()));
    /// ```
    pub fn lookup(&self, name: &str) -> Lookup {
        match self.entries.get(name) {
            Some(constructor) => Lookup::Found(*constructor),
            None => Lookup::Undefined(name.to_string()),
        }
    }

    /// Build the node for `name` applied to `args`; `Ok(None)` if the name is undefined
    pub fn call(&self, name: &str, args: Vec<Node>) -> Result<Option<Node>, CompileError> {
        match self.lookup(name) {
            Lookup::Found(constructor) => constructor.build(args).map(Some),
            Lookup::Undefined(_) => Ok(None),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, Constructor)> + '_ {
        self.entries.iter().map(|(name, constructor)| (*name, *constructor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    #[test]
    fn test_no_name_collisions() {
        let expected = UnaryOp::ALL.len() + BinaryOp::ALL.len() + 1 + FUNCTIONS.len() + AggregationKind::ALL.len();
        assert_eq!(Namespace::global().names().count(), expected);
    }

    #[test]
    fn test_operator_arity_is_checked() {
        let result = Constructor::Binary(BinaryOp::Add).build(vec![Node::int(1)]);
        assert!(matches!(result, Err(CompileError::UnsupportedAstShape(_))));
    }

    #[test]
    fn test_build_function_of_any_arity() {
        let node = Constructor::Func("today").build(vec![]).unwrap();
        assert_eq!(
            node.expr,
            Expr::Func {
                name: "today".to_string(),
                args: vec![]
            }
        );
    }
}
