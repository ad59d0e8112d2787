//! User-facing validation problems.
//!
//! A [`Diagnostic`] is attached to a node of the validated tree and never
//! aborts validation: the same expression can be fixed and re-validated by the
//! end user. Compiler faults are [`CompileError`](crate::CompileError)s instead.

use std::ops::Range;

use crate::ast::{Expr, Node};
use crate::types::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A child node has errors
    SubnodeError,
    /// No rule accepts the operand types
    SubnodeTypes,
    /// The referenced field does not exist
    Field,
    /// No function, method or attribute of that name exists
    Name,
    /// An aggregate inside the argument of another aggregate
    AggregateNested,
    /// Aggregated and row-level operands combined in one expression
    AggregateMixed,
    /// An aggregate in a `where` condition
    AggregateWhere,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::SubnodeError => "subnodeerror",
            DiagnosticKind::SubnodeTypes => "subnodetypes",
            DiagnosticKind::Field => "field",
            DiagnosticKind::Name => "name",
            DiagnosticKind::AggregateNested => "aggregate_nested",
            DiagnosticKind::AggregateMixed => "aggregate_mixed",
            DiagnosticKind::AggregateWhere => "aggregate_where",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node-local validation problem
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn subnode_error(node: &Node) -> Self {
        Diagnostic {
            kind: DiagnosticKind::SubnodeError,
            message: format!(
                "Subexpressions of {} `{}` have errors.",
                lowercase_first(node.description()),
                node.source()
            ),
        }
    }

    pub fn subnode_types(node: &Node, types: &[DataType]) -> Self {
        Diagnostic {
            kind: DiagnosticKind::SubnodeTypes,
            message: format!(
                "{} `{}` uses unsupported types of operands: {}.",
                node.description(),
                node.source(),
                signature(node, types)
            ),
        }
    }

    pub fn field_unknown(node: &Node, name: &str) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Field,
            message: format!("Field `{}` in `{}` is unknown.", name, node.source()),
        }
    }

    pub fn name_unknown(node: &Node) -> Self {
        let what = match &node.expr {
            Expr::Meth { .. } => "method",
            Expr::Attr { .. } => "attribute",
            _ => "function",
        };
        Diagnostic {
            kind: DiagnosticKind::Name,
            message: format!(
                "Unknown {} name `{}` in `{}`.",
                what,
                node.value().unwrap_or_default(),
                node.source()
            ),
        }
    }

    pub fn aggregate_nested(node: &Node) -> Self {
        Diagnostic {
            kind: DiagnosticKind::AggregateNested,
            message: format!("Aggregate call `{}` contains another aggregate.", node.source()),
        }
    }

    /// An aggregate inside a `group by` key
    pub fn aggregate_group(node: &Node) -> Self {
        Diagnostic {
            kind: DiagnosticKind::AggregateNested,
            message: format!("Group key `{}` must not use aggregates.", node.source()),
        }
    }

    pub fn aggregate_mixed(node: &Node) -> Self {
        Diagnostic {
            kind: DiagnosticKind::AggregateMixed,
            message: format!(
                "{} `{}` mixes aggregated and non-aggregated operands.",
                node.description(),
                node.source()
            ),
        }
    }

    pub fn aggregate_where(node: &Node) -> Self {
        Diagnostic {
            kind: DiagnosticKind::AggregateWhere,
            message: format!("Condition `{}` must not use aggregates.", node.source()),
        }
    }

    /// Whether this diagnostic describes a problem of the node itself rather
    /// than of one of its children
    pub fn is_root_cause(&self) -> bool {
        self.kind != DiagnosticKind::SubnodeError
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A root-cause diagnostic together with the location it points at
#[derive(Debug, Clone, PartialEq)]
pub struct Reported {
    pub kind: DiagnosticKind,
    pub message: String,
    pub source: String,
    pub span: Option<Range<usize>>,
}

impl Reported {
    pub fn new(node: &Node, diagnostic: &Diagnostic) -> Self {
        Reported {
            kind: diagnostic.kind,
            message: diagnostic.message.clone(),
            source: node.source(),
            span: node.span(),
        }
    }
}

impl std::fmt::Display for Reported {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.span {
            Some(span) => write!(f, "[{}..{}] {}", span.start, span.end, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Render the operand types of a node in the shape of the node
pub fn signature(node: &Node, types: &[DataType]) -> String {
    let labels: Vec<String> = types.iter().map(|t| t.label()).collect();
    let label = |i: usize| labels.get(i).cloned().unwrap_or_else(|| "?".to_string());
    match &node.expr {
        Expr::Unary { op, .. } => format!("{}{}", op.symbol(), label(0)),
        Expr::Binary { op, .. } if *op == crate::ast::BinaryOp::Item => {
            format!("{}[{}]", label(0), label(1))
        }
        Expr::Binary { op, .. } => format!("{} {} {}", label(0), op.symbol(), label(1)),
        Expr::IfElse { .. } => format!("{} if {} else {}", label(0), label(1), label(2)),
        Expr::Func { name, .. } => format!("{}({})", name, labels.join(", ")),
        Expr::Aggregate { kind, .. } => format!("{}({})", kind, labels.join(", ")),
        Expr::Meth { name, .. } => {
            format!("{}.{}({})", label(0), name, labels[1.min(labels.len())..].join(", "))
        }
        Expr::Attr { name, .. } => format!("{}.{}", label(0), name),
        _ => labels.join(", "),
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
