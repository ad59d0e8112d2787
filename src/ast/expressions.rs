use std::ops::Range;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::aggregate::AggregationKind;
use crate::ast::{BinaryOp, NodeKind, UnaryOp, source};

/// Where a node came from in the user's expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    /// The source text of this node
    pub source: String,
    /// Byte range of `source` inside the full expression, if the parser knows it
    pub span: Option<Range<usize>>,
}

/// An expression tree node: the expression itself plus its origin.
///
/// Nodes are immutable input to the compiler. Validation results live in a
/// separate [`Checked`](crate::Checked) tree with the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub expr: Expr,
    pub origin: Option<Origin>,
}

/// The vSQL expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Constants
    /// The `None` constant
    None,

    /// Boolean constant
    ///
    /// # Example
    /// ```text
    /// True
    /// ```
    Bool(bool),

    /// Integer constant
    Int(i64),

    /// Number constant, kept as an exact decimal
    ///
    /// # Example
    /// ```text
    /// 42.5
    /// ```
    Number(Decimal),

    /// String constant
    ///
    /// # Example
    /// ```text
    /// 'gurk'
    /// ```
    Str(String),

    /// Date constant
    ///
    /// # Example
    /// ```text
    /// @(2000-02-29)
    /// ```
    Date(NaiveDate),

    /// Datetime constant (second precision)
    ///
    /// # Example
    /// ```text
    /// @(2000-02-29T12:34:56)
    /// ```
    DateTime(NaiveDateTime),

    // References
    /// Reference to a field of the query context
    Field(String),

    // Operations
    /// Unary operation
    Unary { op: UnaryOp, operand: Box<Node> },

    /// Binary operation (arithmetic, comparison, logical, item access, ...)
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Conditional expression
    ///
    /// # Example
    /// ```text
    /// a if c else b
    /// ```
    IfElse {
        then: Box<Node>,
        cond: Box<Node>,
        otherwise: Box<Node>,
    },

    // Calls
    /// Builtin function call
    ///
    /// # Examples
    /// ```text
    /// today()
    /// lower(name)
    /// ```
    Func { name: String, args: Vec<Node> },

    /// Method call
    ///
    /// # Example
    /// ```text
    /// name.startswith('A')
    /// ```
    Meth {
        obj: Box<Node>,
        name: String,
        args: Vec<Node>,
    },

    /// Attribute access
    ///
    /// # Example
    /// ```text
    /// birthday.year
    /// ```
    Attr { obj: Box<Node>, name: String },

    /// Aggregate call. The arity is checked during validation, so malformed
    /// calls can be represented.
    ///
    /// # Examples
    /// ```text
    /// sum(amount)
    /// group(category)
    /// ```
    Aggregate {
        kind: AggregationKind,
        args: Vec<Node>,
    },
}

impl Node {
    pub fn new(expr: Expr) -> Self {
        Node { expr, origin: None }
    }

    /// Attach the source text (and optionally its position) this node was parsed from
    pub fn with_origin(mut self, source: impl Into<String>, span: Option<Range<usize>>) -> Self {
        self.origin = Some(Origin {
            source: source.into(),
            span,
        });
        self
    }

    pub fn none() -> Self {
        Node::new(Expr::None)
    }

    pub fn bool(value: bool) -> Self {
        Node::new(Expr::Bool(value))
    }

    pub fn int(value: i64) -> Self {
        Node::new(Expr::Int(value))
    }

    pub fn number(value: Decimal) -> Self {
        Node::new(Expr::Number(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Node::new(Expr::Str(value.into()))
    }

    pub fn date(value: NaiveDate) -> Self {
        Node::new(Expr::Date(value))
    }

    pub fn datetime(value: NaiveDateTime) -> Self {
        Node::new(Expr::DateTime(value))
    }

    pub fn field(name: impl Into<String>) -> Self {
        Node::new(Expr::Field(name.into()))
    }

    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Node::new(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::new(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn if_else(then: Node, cond: Node, otherwise: Node) -> Self {
        Node::new(Expr::IfElse {
            then: Box::new(then),
            cond: Box::new(cond),
            otherwise: Box::new(otherwise),
        })
    }

    pub fn func(name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::new(Expr::Func {
            name: name.into(),
            args,
        })
    }

    pub fn meth(obj: Node, name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::new(Expr::Meth {
            obj: Box::new(obj),
            name: name.into(),
            args,
        })
    }

    pub fn attr(obj: Node, name: impl Into<String>) -> Self {
        Node::new(Expr::Attr {
            obj: Box::new(obj),
            name: name.into(),
        })
    }

    pub fn aggregate(kind: AggregationKind, args: Vec<Node>) -> Self {
        Node::new(Expr::Aggregate { kind, args })
    }

    pub fn kind(&self) -> NodeKind {
        match &self.expr {
            Expr::None => NodeKind::ConstNone,
            Expr::Bool(_) => NodeKind::ConstBool,
            Expr::Int(_) => NodeKind::ConstInt,
            Expr::Number(_) => NodeKind::ConstNumber,
            Expr::Str(_) => NodeKind::ConstStr,
            Expr::Date(_) => NodeKind::ConstDate,
            Expr::DateTime(_) => NodeKind::ConstDateTime,
            Expr::Field(_) => NodeKind::Field,
            Expr::Unary { op, .. } => NodeKind::Unary(*op),
            Expr::Binary { op, .. } => NodeKind::Binary(*op),
            Expr::IfElse { .. } => NodeKind::IfElse,
            Expr::Func { .. } => NodeKind::Func,
            Expr::Meth { .. } => NodeKind::Meth,
            Expr::Attr { .. } => NodeKind::Attr,
            Expr::Aggregate { .. } => NodeKind::Aggregate,
        }
    }

    /// The literal value of a leaf, or the name carried by a call node.
    ///
    /// Returns `None` for operators and for the `None` constant.
    pub fn value(&self) -> Option<String> {
        match &self.expr {
            Expr::None => None,
            Expr::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
            Expr::Int(n) => Some(n.to_string()),
            Expr::Number(n) => Some(n.to_string()),
            Expr::Str(s) => Some(s.clone()),
            Expr::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Expr::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Expr::Field(name)
            | Expr::Func { name, .. }
            | Expr::Meth { name, .. }
            | Expr::Attr { name, .. } => Some(name.clone()),
            Expr::Aggregate { kind, .. } => Some(kind.to_string()),
            Expr::Unary { .. } | Expr::Binary { .. } | Expr::IfElse { .. } => None,
        }
    }

    /// Human readable label used in diagnostics
    pub fn description(&self) -> &'static str {
        match &self.expr {
            Expr::None => "None constant",
            Expr::Bool(_) => "Bool constant",
            Expr::Int(_) => "Integer constant",
            Expr::Number(_) => "Number constant",
            Expr::Str(_) => "String constant",
            Expr::Date(_) => "Date constant",
            Expr::DateTime(_) => "Datetime constant",
            Expr::Field(_) => "Field reference",
            Expr::Unary { op, .. } => op.description(),
            Expr::Binary { op, .. } => op.description(),
            Expr::IfElse { .. } => "Ternary if/else",
            Expr::Func { .. } => "Function call",
            Expr::Meth { .. } => "Method call",
            Expr::Attr { .. } => "Attribute access",
            Expr::Aggregate { .. } => "Aggregate call",
        }
    }

    /// Child nodes in operand order.
    ///
    /// This is the order rule templates refer to: the object of a method call
    /// comes before its arguments, the condition of `a if c else b` is second.
    pub fn children(&self) -> Vec<&Node> {
        match &self.expr {
            Expr::None
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::Number(_)
            | Expr::Str(_)
            | Expr::Date(_)
            | Expr::DateTime(_)
            | Expr::Field(_) => Vec::new(),
            Expr::Unary { operand, .. } => vec![operand.as_ref()],
            Expr::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Expr::IfElse {
                then,
                cond,
                otherwise,
            } => vec![then.as_ref(), cond.as_ref(), otherwise.as_ref()],
            Expr::Func { args, .. } | Expr::Aggregate { args, .. } => args.iter().collect(),
            Expr::Meth { obj, args, .. } => {
                let mut children = vec![obj.as_ref()];
                children.extend(args.iter());
                children
            }
            Expr::Attr { obj, .. } => vec![obj.as_ref()],
        }
    }

    /// The source text of this node.
    ///
    /// Uses the origin if the parser supplied one, otherwise renders canonical
    /// vSQL source from the tree.
    pub fn source(&self) -> String {
        match &self.origin {
            Some(origin) => origin.source.clone(),
            None => source::render(self),
        }
    }

    pub fn span(&self) -> Option<Range<usize>> {
        self.origin.as_ref().and_then(|o| o.span.clone())
    }
}
