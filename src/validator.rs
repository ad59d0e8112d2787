//! Type checking and aggregation analysis.
//!
//! Validation never touches the input tree. It returns a [`Checked`] tree of
//! the same shape that records, per node, the inferred type, the resolved
//! rule, the aggregation class and the diagnostic (if any).
//!
//! User mistakes become diagnostics so that every problem of an expression can
//! be reported at once. Only faults of the caller (malformed aggregate calls,
//! inconsistent rule tables) abort validation with a [`CompileError`].

use std::sync::Arc;

use tracing::debug;

use crate::aggregate::{AggregationKind, ExprClass};
use crate::ast::{Expr, Node};
use crate::context::QueryContext;
use crate::diagnostic::{Diagnostic, Reported};
use crate::error::CompileError;
use crate::rules::{Operator, Piece, Resolution, Rule, Sig, Template};
use crate::types::DataType;

/// Validation result of one node, mirroring the node's children
#[derive(Debug, Clone, PartialEq)]
pub struct Checked {
    data_type: Option<DataType>,
    diagnostic: Option<Diagnostic>,
    rule: Option<Arc<Rule>>,
    class: ExprClass,
    children: Vec<Checked>,
}

impl Checked {
    fn leaf(data_type: DataType, class: ExprClass) -> Self {
        Checked {
            data_type: Some(data_type),
            diagnostic: None,
            rule: None,
            class,
            children: Vec::new(),
        }
    }

    fn failed(diagnostic: Diagnostic, class: ExprClass, children: Vec<Checked>) -> Self {
        Checked {
            data_type: None,
            diagnostic: Some(diagnostic),
            rule: None,
            class,
            children,
        }
    }

    fn resolved(rule: Arc<Rule>, class: ExprClass, children: Vec<Checked>) -> Self {
        Checked {
            data_type: Some(rule.result),
            diagnostic: None,
            rule: Some(rule),
            class,
            children,
        }
    }

    /// The inferred type; `None` iff the node has a diagnostic
    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }

    /// The rule the node compiles with (composite nodes only)
    pub fn rule(&self) -> Option<&Rule> {
        self.rule.as_deref()
    }

    pub fn class(&self) -> ExprClass {
        self.class
    }

    pub fn children(&self) -> &[Checked] {
        &self.children
    }

    pub fn is_valid(&self) -> bool {
        self.diagnostic.is_none()
    }

    /// The first node (in pre-order) whose problem is its own rather than one
    /// of its children's
    pub fn first_error<'a, 'n>(&'a self, node: &'n Node) -> Option<(&'n Node, &'a Diagnostic)> {
        let diagnostic = self.diagnostic.as_ref()?;
        if diagnostic.is_root_cause() {
            return Some((node, diagnostic));
        }
        node.children()
            .into_iter()
            .zip(&self.children)
            .find_map(|(child, checked)| checked.first_error(child))
    }

    /// All root-cause diagnostics of the tree, in pre-order
    pub fn report(&self, node: &Node) -> Vec<Reported> {
        let mut reports = Vec::new();
        self.collect(node, &mut reports);
        reports
    }

    fn collect(&self, node: &Node, reports: &mut Vec<Reported>) {
        if let Some(diagnostic) = &self.diagnostic {
            if diagnostic.is_root_cause() {
                reports.push(Reported::new(node, diagnostic));
            }
            for (child, checked) in node.children().into_iter().zip(&self.children) {
                checked.collect(child, reports);
            }
        }
    }
}

/// Validate an expression against the context's schema and rules
pub fn validate(node: &Node, ctx: &QueryContext) -> Result<Checked, CompileError> {
    let checked = Validator { ctx }.check(node)?;
    if let Some((at, diagnostic)) = checked.first_error(node) {
        debug!(
            source = %node.source(),
            at = %at.source(),
            kind = %diagnostic.kind,
            "expression has diagnostics"
        );
    }
    Ok(checked)
}

struct Validator<'a> {
    ctx: &'a QueryContext,
}

impl Validator<'_> {
    fn check(&self, node: &Node) -> Result<Checked, CompileError> {
        match &node.expr {
            Expr::None => Ok(Checked::leaf(DataType::Null, ExprClass::Constant)),
            Expr::Bool(_) => Ok(Checked::leaf(DataType::Bool, ExprClass::Constant)),
            Expr::Int(_) => Ok(Checked::leaf(DataType::Int, ExprClass::Constant)),
            Expr::Number(_) => Ok(Checked::leaf(DataType::Number, ExprClass::Constant)),
            Expr::Str(_) => Ok(Checked::leaf(DataType::Str, ExprClass::Constant)),
            Expr::Date(_) => Ok(Checked::leaf(DataType::Date, ExprClass::Constant)),
            Expr::DateTime(_) => Ok(Checked::leaf(DataType::DateTime, ExprClass::Constant)),
            Expr::Field(name) => Ok(match self.ctx.field(name) {
                Some(field) => Checked::leaf(field.data_type, ExprClass::Row),
                None => Checked::failed(Diagnostic::field_unknown(node, name), ExprClass::Row, Vec::new()),
            }),
            Expr::Unary { op, .. } => self.composite(node, Operator::Unary(*op), None),
            Expr::Binary { op, .. } => self.composite(node, Operator::Binary(*op), None),
            Expr::IfElse { .. } => self.if_else(node),
            Expr::Func { name, .. } => self.composite(node, Operator::Func, Some(name)),
            Expr::Meth { name, .. } => self.composite(node, Operator::Meth, Some(name)),
            Expr::Attr { name, .. } => self.composite(node, Operator::Attr, Some(name)),
            Expr::Aggregate { kind, args } => self.aggregate(node, *kind, args),
        }
    }

    fn check_children(&self, node: &Node) -> Result<Vec<Checked>, CompileError> {
        node.children().into_iter().map(|child| self.check(child)).collect()
    }

    /// Steps shared by all composite nodes: child errors first, then mixing of
    /// aggregated and row-level operands
    fn precheck(&self, node: &Node, children: &[Checked]) -> (ExprClass, Option<Diagnostic>) {
        let mut class = Some(ExprClass::Constant);
        for child in children {
            class = class.and_then(|c| c.combine(child.class));
        }
        let fallback = children
            .iter()
            .map(|child| child.class)
            .find(|c| matches!(c, ExprClass::Aggregated(_)))
            .unwrap_or(ExprClass::Row);

        if children.iter().any(|child| !child.is_valid()) {
            return (class.unwrap_or(fallback), Some(Diagnostic::subnode_error(node)));
        }
        match class {
            Some(class) => (class, None),
            None => (fallback, Some(Diagnostic::aggregate_mixed(node))),
        }
    }

    fn composite(&self, node: &Node, operator: Operator, name: Option<&String>) -> Result<Checked, CompileError> {
        let children = self.check_children(node)?;
        let (class, problem) = self.precheck(node, &children);
        if let Some(diagnostic) = problem {
            return Ok(Checked::failed(diagnostic, class, children));
        }
        self.resolve(node, operator, name.map(String::as_str), class, children)
    }

    fn resolve(
        &self,
        node: &Node,
        operator: Operator,
        name: Option<&str>,
        class: ExprClass,
        children: Vec<Checked>,
    ) -> Result<Checked, CompileError> {
        let types = operand_types(&children);
        Ok(match self.ctx.rules().resolve(operator, name, &types)? {
            Resolution::Rule(rule) => Checked::resolved(rule, class, children),
            Resolution::NoMatch => Checked::failed(Diagnostic::subnode_types(node, &types), class, children),
            Resolution::UnknownName => Checked::failed(Diagnostic::name_unknown(node), class, children),
        })
    }

    fn aggregate(&self, node: &Node, kind: AggregationKind, args: &[Node]) -> Result<Checked, CompileError> {
        if args.len() != kind.arity() {
            return Err(CompileError::MalformedAggregation {
                kind,
                arity: args.len(),
                source: node.source(),
            });
        }

        let class = ExprClass::Aggregated(kind);
        let children = self.check_children(node)?;
        if children.iter().any(|child| !child.is_valid()) {
            return Ok(Checked::failed(Diagnostic::subnode_error(node), class, children));
        }
        if children.iter().any(|child| matches!(child.class, ExprClass::Aggregated(_))) {
            return Ok(Checked::failed(Diagnostic::aggregate_nested(node), class, children));
        }
        self.resolve(node, Operator::Aggregate(kind), None, class, children)
    }

    /// `a if c else b` has no table rules: the result is the wider of both
    /// branches and the condition goes through its truth conversion.
    fn if_else(&self, node: &Node) -> Result<Checked, CompileError> {
        let children = self.check_children(node)?;
        let (class, problem) = self.precheck(node, &children);
        if let Some(diagnostic) = problem {
            return Ok(Checked::failed(diagnostic, class, children));
        }

        let types = operand_types(&children);
        let result = DataType::widen(types[0], types[2]);
        let truth = self.ctx.rules().truth(types[1])?;
        let (Some(result), Some(truth)) = (result, truth) else {
            return Ok(Checked::failed(Diagnostic::subnode_types(node, &types), class, children));
        };

        let mut pieces = vec![Piece::Text("(case when ".to_string())];
        pieces.extend(truth.remap(&[1]).pieces().iter().cloned());
        pieces.extend([
            Piece::Text(" = 1 then ".to_string()),
            Piece::Child(0),
            Piece::Text(" else ".to_string()),
            Piece::Child(2),
            Piece::Text(" end)".to_string()),
        ]);
        let rule = Rule {
            operator: Operator::IfElse,
            result,
            signature: types.iter().map(|t| Sig::Type(*t)).collect(),
            template: Template::from_pieces(pieces),
        };
        Ok(Checked::resolved(Arc::new(rule), class, children))
    }
}

fn operand_types(children: &[Checked]) -> Vec<DataType> {
    children.iter().filter_map(|child| child.data_type).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::dialect::Dialect;
    use crate::diagnostic::DiagnosticKind;
    use crate::schema::{Field, Schema};

    fn ctx() -> QueryContext {
        let schema = Schema::new()
            .with_field(Field::new("a", DataType::Int))
            .with_field(Field::new("s", DataType::Str));
        QueryContext::new(schema, Dialect::Oracle).unwrap()
    }

    #[test]
    fn test_subnode_error_wraps_root_cause() {
        let expr = Node::binary(BinaryOp::Add, Node::field("missing"), Node::int(1));
        let checked = ctx().validate(&expr).unwrap();

        assert_eq!(checked.diagnostic().unwrap().kind, DiagnosticKind::SubnodeError);
        let (at, diagnostic) = checked.first_error(&expr).unwrap();
        assert_eq!(at.source(), "missing");
        assert_eq!(diagnostic.kind, DiagnosticKind::Field);
    }

    #[test]
    fn test_class_of_constant_expression() {
        let expr = Node::binary(BinaryOp::Add, Node::int(1), Node::int(2));
        let checked = ctx().validate(&expr).unwrap();
        assert_eq!(checked.class(), ExprClass::Constant);
        assert_eq!(checked.data_type(), Some(DataType::Int));
    }

    #[test]
    fn test_report_collects_all_root_causes() {
        let expr = Node::binary(
            BinaryOp::Add,
            Node::field("x"),
            Node::binary(BinaryOp::Add, Node::field("y"), Node::int(1)),
        );
        let checked = ctx().validate(&expr).unwrap();
        let reports = checked.report(&expr);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].source, "x");
        assert_eq!(reports[1].source, "y");
    }
}
