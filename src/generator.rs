//! SQL generation from a validated tree.
//!
//! Literals are emitted by the generator itself, composite nodes by expanding
//! the template of the rule validation resolved for them. Nothing else ever
//! produces SQL text, so every piece of user text passes through the quoting
//! of the [`Dialect`](crate::Dialect) or becomes a bound parameter.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::trace;

use crate::aggregate::AggregationKind;
use crate::ast::{Expr, Node};
use crate::context::{LiteralMode, QueryContext};
use crate::diagnostic::{Diagnostic, Reported};
use crate::error::CompileError;
use crate::rules::{Piece, Template};
use crate::validator::Checked;

/// A value bound to a placeholder in [`LiteralMode::Bind`]
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Param::Str(s) => f.write_str(s),
            Param::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Param::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Generated SQL plus the parameters its placeholders refer to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Param>,
}

/// Generate SQL for one validated expression
pub fn generate(node: &Node, checked: &Checked, ctx: &QueryContext) -> Result<SqlFragment, CompileError> {
    let mut generator = Generator::new(ctx);
    let sql = generator.expression(node, checked)?;
    Ok(SqlFragment {
        sql,
        params: generator.finish(),
    })
}

/// Table aliases of joined field paths; `None` for groups without a table
pub type JoinAliases = BTreeMap<String, Option<String>>;

/// Generates SQL for several expressions that share one parameter list
#[derive(Debug)]
pub struct Generator<'a> {
    ctx: &'a QueryContext,
    aliases: Option<&'a JoinAliases>,
    params: Vec<Param>,
    /// Set while emitting grouping keys, which must produce the same text in
    /// `select` and `group by`
    inline: bool,
}

impl<'a> Generator<'a> {
    pub fn new(ctx: &'a QueryContext) -> Self {
        Generator {
            ctx,
            aliases: None,
            params: Vec::new(),
            inline: false,
        }
    }

    /// A generator resolving dotted field paths through `aliases`
    pub fn with_aliases(ctx: &'a QueryContext, aliases: &'a JoinAliases) -> Self {
        Generator {
            aliases: Some(aliases),
            ..Generator::new(ctx)
        }
    }

    /// SQL computing the value of the expression
    pub fn expression(&mut self, node: &Node, checked: &Checked) -> Result<String, CompileError> {
        ensure_valid(node, checked)?;
        let mut out = String::new();
        self.emit(node, checked, &mut out)?;
        trace!(source = %node.source(), sql = %out, "generated expression");
        Ok(out)
    }

    /// SQL condition that holds when the expression is truthy
    pub fn condition(&mut self, node: &Node, checked: &Checked) -> Result<String, CompileError> {
        ensure_valid(node, checked)?;
        let truth = match checked.data_type() {
            Some(t) => self.ctx.rules().truth(t)?,
            None => None,
        };
        let Some(truth) = truth else {
            let types: Vec<_> = checked.data_type().into_iter().collect();
            let diagnostic = Diagnostic::subnode_types(node, &types);
            return Err(CompileError::Unresolved(vec![Reported::new(node, &diagnostic)]));
        };

        let mut out = String::new();
        self.emit_template(&truth, &[node], std::slice::from_ref(checked), &mut out)?;
        out.push_str(" = 1");
        trace!(source = %node.source(), sql = %out, "generated condition");
        Ok(out)
    }

    /// SQL for a `group by` key. Constants are always inlined, so the key
    /// matches the `group(...)` select item it came from.
    pub fn group_key(&mut self, node: &Node, checked: &Checked) -> Result<String, CompileError> {
        self.inlined(|generator| generator.expression(node, checked))
    }

    pub fn finish(self) -> Vec<Param> {
        self.params
    }

    fn inlined<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.inline, true);
        let result = f(self);
        self.inline = saved;
        result
    }

    fn literal_mode(&self) -> LiteralMode {
        if self.inline {
            LiteralMode::Inline
        } else {
            self.ctx.literal_mode()
        }
    }

    fn emit(&mut self, node: &Node, checked: &Checked, out: &mut String) -> Result<(), CompileError> {
        let dialect = self.ctx.dialect();
        match &node.expr {
            Expr::None => out.push_str("null"),
            Expr::Bool(value) => out.push_str(if *value { "1" } else { "0" }),
            Expr::Int(value) => push_numeral(out, &value.to_string()),
            Expr::Number(value) => push_numeral(out, &value.to_string()),
            Expr::Str(value) => match self.literal_mode() {
                LiteralMode::Inline => out.push_str(&dialect.quote_str(value)),
                LiteralMode::Bind => self.bind(Param::Str(value.clone()), out),
            },
            Expr::Date(value) => match self.literal_mode() {
                LiteralMode::Inline => out.push_str(&dialect.date_literal(*value)),
                LiteralMode::Bind => self.bind(Param::Date(*value), out),
            },
            Expr::DateTime(value) => match self.literal_mode() {
                LiteralMode::Inline => out.push_str(&dialect.datetime_literal(*value)),
                LiteralMode::Bind => self.bind(Param::DateTime(*value), out),
            },
            Expr::Field(path) => self.emit_field(path, out)?,
            Expr::Aggregate {
                kind: AggregationKind::Group,
                ..
            } => self.inlined(|generator| generator.emit_rule(node, checked, out))?,
            _ => self.emit_rule(node, checked, out)?,
        }
        Ok(())
    }

    fn emit_field(&self, path: &str, out: &mut String) -> Result<(), CompileError> {
        let field = self.ctx.require_field(path)?;
        let (alias, identifier) = match path.rsplit_once('.') {
            None => (None, path),
            Some((parent, identifier)) => {
                let alias = self
                    .aliases
                    .and_then(|aliases| aliases.get(parent))
                    .ok_or_else(|| CompileError::UnjoinedField(path.to_string()))?;
                (alias.as_deref(), identifier)
            }
        };
        out.push_str(&field.reference_sql(self.ctx.dialect(), identifier, alias));
        Ok(())
    }

    fn emit_rule(&mut self, node: &Node, checked: &Checked, out: &mut String) -> Result<(), CompileError> {
        let rule = checked.rule().ok_or_else(|| {
            CompileError::UnsupportedAstShape(format!(
                "{} `{}` has no resolved rule",
                node.description(),
                node.source()
            ))
        })?;
        let children = node.children();
        self.emit_template(&rule.template, &children, checked.children(), out)
    }

    fn emit_template(
        &mut self,
        template: &Template,
        nodes: &[&Node],
        checked: &[Checked],
        out: &mut String,
    ) -> Result<(), CompileError> {
        for piece in template.pieces() {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Child(index) => {
                    let (node, checked) = nodes.get(*index).zip(checked.get(*index)).ok_or_else(|| {
                        CompileError::UnsupportedAstShape(format!(
                            "template `{}` refers to missing child {}",
                            template,
                            index + 1
                        ))
                    })?;
                    self.emit(node, checked, out)?;
                }
            }
        }
        Ok(())
    }

    fn bind(&mut self, param: Param, out: &mut String) {
        self.params.push(param);
        out.push_str(&self.ctx.dialect().placeholder(self.params.len()));
    }
}

fn ensure_valid(node: &Node, checked: &Checked) -> Result<(), CompileError> {
    if checked.is_valid() {
        Ok(())
    } else {
        Err(CompileError::Unresolved(checked.report(node)))
    }
}

/// Negative numerals are parenthesized so that templates like `{1} - {2}`
/// never produce `--`, which starts an SQL comment.
fn push_numeral(out: &mut String, text: &str) {
    if text.starts_with('-') {
        out.push('(');
        out.push_str(text);
        out.push(')');
    } else {
        out.push_str(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_numeral() {
        let mut out = String::new();
        push_numeral(&mut out, "-5");
        push_numeral(&mut out, "7");
        assert_eq!(out, "(-5)7");
    }

    #[test]
    fn test_dotted_field_needs_join_aliases() {
        use crate::dialect::Dialect;
        use crate::schema::{Field, Group, Schema};
        use crate::types::DataType;
        use std::sync::Arc;

        let dept = Arc::new(Group::new(Some("dept")).with_field(Field::new("title", DataType::Str)));
        let schema = Schema::new().with_field(Field::new("dept", DataType::Int).with_join("{m}.x = {d}.id", dept));
        let ctx = QueryContext::new(schema, Dialect::Oracle).unwrap();
        let node = Node::field("dept.title");
        let checked = ctx.validate(&node).unwrap();

        assert_eq!(
            ctx.generate(&node, &checked),
            Err(CompileError::UnjoinedField("dept.title".to_string()))
        );

        let aliases = JoinAliases::from([("dept".to_string(), Some("t1".to_string()))]);
        let mut generator = Generator::with_aliases(&ctx, &aliases);
        assert_eq!(generator.expression(&node, &checked).unwrap(), "t1.\"title\"");
    }

    #[test]
    fn test_group_key_inlines_constants() {
        use crate::ast::BinaryOp;
        use crate::dialect::Dialect;
        use crate::schema::Schema;

        let ctx = QueryContext::new(Schema::new(), Dialect::Postgres)
            .unwrap()
            .with_literal_mode(LiteralMode::Bind);
        let node = Node::binary(BinaryOp::Add, Node::str("a"), Node::str("b"));
        let checked = ctx.validate(&node).unwrap();

        let mut generator = Generator::new(&ctx);
        assert_eq!(generator.expression(&node, &checked).unwrap(), "($1 || $2)");
        assert_eq!(generator.group_key(&node, &checked).unwrap(), "('a' || 'b')");
        assert_eq!(generator.finish().len(), 2);
    }

    #[test]
    fn test_param_display() {
        let date = NaiveDate::from_ymd_opt(2000, 2, 29).unwrap();
        assert_eq!(Param::Date(date).to_string(), "2000-02-29");
        assert_eq!(Param::Str("x".to_string()).to_string(), "x");
    }
}
