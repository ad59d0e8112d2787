//! Assembly of complete `select` statements from vSQL expressions.
//!
//! A [`Query`] owns its [`QueryContext`], validates every vSQL expression as
//! it is added and generates the statement text in one pass at the end, so
//! that bound parameters are numbered in statement order.
//!
//! Dotted field paths (`dept.head.name`) join one table per path prefix. The
//! join is added once per prefix, as a `from` entry aliased `t1`, `t2`, ...
//! and a `where` condition with `{m}` and `{d}` replaced by the aliases of the
//! referring and the joined table.
//!
//! # Example
//!
//! ```
//! use vsql::ast::{BinaryOp, Node};
//! use vsql::{DataType, Dialect, Field, Query, QueryContext, Schema};
//!
//! let schema = Schema::new().with_field(Field::new("age", DataType::Int));
//! let ctx = QueryContext::new(schema, Dialect::Oracle).unwrap();
//!
//! let mut query = Query::new(ctx);
//! query.select_vsql(Node::field("age"), None).unwrap();
//! query.from_sql("person", Some("p")).unwrap();
//! query
//!     .where_vsql(Node::binary(BinaryOp::Gt, Node::field("age"), Node::int(17)))
//!     .unwrap();
//!
//! let sql = query.sql().unwrap().sql;
//! assert!(sql.starts_with("select\n\t\"age\" /* age */\nfrom\n\tperson p\nwhere\n"));
//! ```

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::aggregate::{AggregationKind, ExprClass};
use crate::ast::{Expr, Node};
use crate::context::QueryContext;
use crate::diagnostic::{Diagnostic, Reported};
use crate::dialect::make_comment;
use crate::error::CompileError;
use crate::generator::{Generator, JoinAliases, SqlFragment};
use crate::validator::Checked;

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER_REGEX: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$#]*$").expect("valid identifier regex"))
}

fn check_identifier(name: &str) -> Result<(), CompileError> {
    if identifier_regex().is_match(name) {
        Ok(())
    } else {
        Err(CompileError::InvalidIdentifier(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

/// Split a trailing ` asc`/` desc` and ` nulls first`/` nulls last` off an
/// `order by` entry.
///
/// # Examples
///
/// ```
/// use vsql::query::{Direction, Nulls, split_order_suffix};
///
/// assert_eq!(
///     split_order_suffix("name desc nulls last"),
///     ("name", Some(Direction::Desc), Some(Nulls::Last))
/// );
/// assert_eq!(split_order_suffix("descent"), ("descent", None, None));
/// ```
pub fn split_order_suffix(text: &str) -> (&str, Option<Direction>, Option<Nulls>) {
    let mut rest = text.trim_end();

    let mut nulls = None;
    for (suffix, value) in [(" nulls first", Nulls::First), (" nulls last", Nulls::Last)] {
        if let Some(stripped) = strip_suffix_ignore_case(rest, suffix) {
            rest = stripped.trim_end();
            nulls = Some(value);
            break;
        }
    }

    let mut direction = None;
    for (suffix, value) in [(" asc", Direction::Asc), (" desc", Direction::Desc)] {
        if let Some(stripped) = strip_suffix_ignore_case(rest, suffix) {
            rest = stripped.trim_end();
            direction = Some(value);
            break;
        }
    }

    (rest, direction, nulls)
}

fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let split = text.len().checked_sub(suffix.len())?;
    let tail = text.get(split..)?;
    tail.eq_ignore_ascii_case(suffix).then(|| &text[..split])
}

/// A statement entry given either as vSQL or as raw SQL
#[derive(Debug, Clone)]
enum Expression {
    Vsql { node: Node, checked: Checked },
    Sql(String),
}

impl Expression {
    /// Identity used to drop repeated `where` and `group by` entries
    fn key(&self) -> String {
        match self {
            Expression::Vsql { node, .. } => node.source(),
            Expression::Sql(sql) => sql.clone(),
        }
    }

    fn comment(&self) -> Option<String> {
        match self {
            Expression::Vsql { node, .. } => Some(make_comment(&node.source())),
            Expression::Sql(_) => None,
        }
    }

    fn value(&self, generator: &mut Generator<'_>) -> Result<String, CompileError> {
        match self {
            Expression::Vsql { node, checked } => generator.expression(node, checked),
            Expression::Sql(sql) => Ok(sql.clone()),
        }
    }

    fn group_key(&self, generator: &mut Generator<'_>) -> Result<String, CompileError> {
        match self {
            Expression::Vsql { node, checked } => generator.group_key(node, checked),
            Expression::Sql(sql) => Ok(sql.clone()),
        }
    }

    fn condition(&self, generator: &mut Generator<'_>) -> Result<String, CompileError> {
        match self {
            Expression::Vsql { node, checked } => generator.condition(node, checked),
            Expression::Sql(sql) => Ok(sql.clone()),
        }
    }
}

#[derive(Debug, Clone)]
struct SelectItem {
    expr: Expression,
    alias: Option<String>,
}

#[derive(Debug, Clone)]
struct FromItem {
    sql: String,
    alias: Option<String>,
}

#[derive(Debug, Clone)]
struct OrderItem {
    expr: Expression,
    direction: Option<Direction>,
    nulls: Option<Nulls>,
}

/// A `select` statement under construction
#[derive(Debug, Clone)]
pub struct Query {
    ctx: QueryContext,
    comment: Option<String>,
    select: Vec<SelectItem>,
    from: Vec<FromItem>,
    conditions: Vec<Expression>,
    group_by: Vec<Expression>,
    order_by: Vec<OrderItem>,
    offset: Option<u64>,
    limit: Option<u64>,
    aliases: JoinAliases,
}

impl Query {
    pub fn new(ctx: QueryContext) -> Self {
        Query {
            ctx,
            comment: None,
            select: Vec::new(),
            from: Vec::new(),
            conditions: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            limit: None,
            aliases: JoinAliases::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn context(&self) -> &QueryContext {
        &self.ctx
    }

    /// Whether the select list is aggregated
    pub fn is_aggregated(&self) -> bool {
        self.ctx.aggregation().is_aggregated()
    }

    fn checked(&self, node: &Node) -> Result<Checked, CompileError> {
        let checked = self.ctx.validate(node)?;
        if checked.is_valid() {
            Ok(checked)
        } else {
            Err(CompileError::Unresolved(checked.report(node)))
        }
    }

    /// Add a vSQL expression to the select list.
    ///
    /// `group(x)` calls inside the expression add `x` to `group by`.
    pub fn select_vsql(&mut self, node: Node, alias: Option<&str>) -> Result<&mut Self, CompileError> {
        if let Some(alias) = alias {
            check_identifier(alias)?;
        }
        let checked = self.checked(&node)?;
        self.ctx.classify(&node, &checked)?;
        self.join_fields(&node)?;

        let mut keys = Vec::new();
        collect_group_keys(&node, &checked, &mut keys);
        for (key, key_checked) in keys {
            self.push_group_by(Expression::Vsql {
                node: key,
                checked: key_checked,
            });
        }

        self.select.push(SelectItem {
            expr: Expression::Vsql { node, checked },
            alias: alias.map(str::to_string),
        });
        Ok(self)
    }

    /// Add raw SQL to the select list. It counts as a row-level expression.
    pub fn select_sql(&mut self, sql: impl Into<String>, alias: Option<&str>) -> Result<&mut Self, CompileError> {
        if let Some(alias) = alias {
            check_identifier(alias)?;
        }
        let sql = sql.into();
        self.ctx.accept(ExprClass::Row, &sql)?;
        self.select.push(SelectItem {
            expr: Expression::Sql(sql),
            alias: alias.map(str::to_string),
        });
        Ok(self)
    }

    pub fn from_sql(&mut self, sql: impl Into<String>, alias: Option<&str>) -> Result<&mut Self, CompileError> {
        if let Some(alias) = alias {
            check_identifier(alias)?;
        }
        self.from.push(FromItem {
            sql: sql.into(),
            alias: alias.map(str::to_string),
        });
        Ok(self)
    }

    /// Join the table a field refers to, as `from_sql` would with the
    /// group's table and an alias of its own
    pub fn from_vsql(&mut self, path: &str) -> Result<&mut Self, CompileError> {
        self.join(path)?;
        Ok(self)
    }

    /// Add a vSQL condition. Conditions must not contain aggregates.
    pub fn where_vsql(&mut self, node: Node) -> Result<&mut Self, CompileError> {
        let checked = self.checked(&node)?;
        if matches!(checked.class(), ExprClass::Aggregated(_)) {
            let diagnostic = Diagnostic::aggregate_where(&node);
            return Err(CompileError::Unresolved(vec![Reported::new(&node, &diagnostic)]));
        }
        self.join_fields(&node)?;
        self.push_condition(Expression::Vsql { node, checked });
        Ok(self)
    }

    pub fn where_sql(&mut self, sql: impl Into<String>) -> &mut Self {
        self.push_condition(Expression::Sql(sql.into()));
        self
    }

    /// Add a vSQL `group by` key. This makes the query aggregated, so it
    /// fails once row-level expressions have been selected.
    pub fn group_by_vsql(&mut self, node: Node) -> Result<&mut Self, CompileError> {
        let checked = self.checked(&node)?;
        if matches!(checked.class(), ExprClass::Aggregated(_)) {
            let diagnostic = Diagnostic::aggregate_group(&node);
            return Err(CompileError::Unresolved(vec![Reported::new(&node, &diagnostic)]));
        }
        self.ctx
            .accept(ExprClass::Aggregated(AggregationKind::Group), &node.source())?;
        self.join_fields(&node)?;
        self.push_group_by(Expression::Vsql { node, checked });
        Ok(self)
    }

    pub fn group_by_sql(&mut self, sql: impl Into<String>) -> Result<&mut Self, CompileError> {
        let sql = sql.into();
        self.ctx
            .accept(ExprClass::Aggregated(AggregationKind::Group), &sql)?;
        self.push_group_by(Expression::Sql(sql));
        Ok(self)
    }

    pub fn order_vsql(
        &mut self,
        node: Node,
        direction: Option<Direction>,
        nulls: Option<Nulls>,
    ) -> Result<&mut Self, CompileError> {
        let checked = self.checked(&node)?;
        self.join_fields(&node)?;
        self.order_by.push(OrderItem {
            expr: Expression::Vsql { node, checked },
            direction,
            nulls,
        });
        Ok(self)
    }

    /// Add a raw `order by` entry; a trailing direction and nulls placement
    /// are recognized
    pub fn order_sql(&mut self, sql: &str) -> &mut Self {
        let (expr, direction, nulls) = split_order_suffix(sql);
        self.order_by.push(OrderItem {
            expr: Expression::Sql(expr.to_string()),
            direction,
            nulls,
        });
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    fn join_fields(&mut self, node: &Node) -> Result<(), CompileError> {
        let mut parents = Vec::new();
        collect_field_parents(node, &mut parents);
        for parent in parents {
            self.join(&parent)?;
        }
        Ok(())
    }

    /// Join the tables along `path`, returning the alias of the table its
    /// last field refers to
    fn join(&mut self, path: &str) -> Result<Option<String>, CompileError> {
        if let Some(alias) = self.aliases.get(path) {
            return Ok(alias.clone());
        }
        let parent_alias = match path.rsplit_once('.') {
            Some((parent, _)) => self.join(parent)?,
            None => None,
        };
        let (join_sql, table_sql) = {
            let field = self.ctx.require_field(path)?;
            let reference = field
                .reference()
                .ok_or_else(|| CompileError::NoReference(path.to_string()))?;
            (reference.join_sql.clone(), reference.group.table_sql().map(str::to_string))
        };

        let alias = format!("t{}", self.from.len() + 1);
        let mut condition = join_sql;
        if let Some(parent_alias) = &parent_alias {
            condition = condition.replace("{m}", parent_alias);
        }
        condition = condition.replace("{d}", &alias);
        if !condition.is_empty() {
            self.push_condition(Expression::Sql(condition));
        }

        let alias = table_sql.map(|table_sql| {
            self.from.push(FromItem {
                sql: table_sql,
                alias: Some(alias.clone()),
            });
            alias
        });
        debug!(path, alias = ?alias, "joined field path");
        self.aliases.insert(path.to_string(), alias.clone());
        Ok(alias)
    }

    fn push_condition(&mut self, expr: Expression) {
        let key = expr.key();
        if !self.conditions.iter().any(|c| c.key() == key) {
            self.conditions.push(expr);
        }
    }

    fn push_group_by(&mut self, expr: Expression) {
        let key = expr.key();
        if !self.group_by.iter().any(|g| g.key() == key) {
            self.group_by.push(expr);
        }
    }

    /// Generate the statement
    pub fn sql(&self) -> Result<SqlFragment, CompileError> {
        let mut generator = Generator::with_aliases(&self.ctx, &self.aliases);
        let mut out = String::new();

        if let Some(comment) = &self.comment {
            out.push_str(&make_comment(comment));
            out.push('\n');
        }

        out.push_str("select\n");
        if self.select.is_empty() {
            out.push_str("\t42\n");
        } else {
            let mut lines = Vec::with_capacity(self.select.len());
            for item in &self.select {
                let mut line = format!("\t{}", item.expr.value(&mut generator)?);
                if let Some(comment) = item.expr.comment() {
                    line.push(' ');
                    line.push_str(&comment);
                }
                if let Some(alias) = &item.alias {
                    line.push_str(" as ");
                    line.push_str(alias);
                }
                lines.push(line);
            }
            push_lines(&mut out, &lines);
        }

        let tables: Vec<String> = self
            .from
            .iter()
            .map(|item| match &item.alias {
                Some(alias) => format!("\t{} {}", item.sql, alias),
                None => format!("\t{}", item.sql),
            })
            .collect();
        if !tables.is_empty() {
            out.push_str("from\n");
            push_lines(&mut out, &tables);
        } else if let Some(table) = self.ctx.dialect().empty_from() {
            out.push_str("from\n\t");
            out.push_str(table);
            out.push('\n');
        }

        if !self.conditions.is_empty() {
            out.push_str("where\n");
            let many = self.conditions.len() > 1;
            let mut lines = Vec::with_capacity(self.conditions.len());
            for condition in &self.conditions {
                let sql = condition.condition(&mut generator)?;
                lines.push(if many { format!("\t({})", sql) } else { format!("\t{}", sql) });
            }
            out.push_str(&lines.join(" and\n"));
            out.push('\n');
        }

        if !self.group_by.is_empty() {
            out.push_str("group by\n");
            let mut lines = Vec::with_capacity(self.group_by.len());
            for key in &self.group_by {
                lines.push(format!("\t{}", key.group_key(&mut generator)?));
            }
            push_lines(&mut out, &lines);
        }

        if !self.order_by.is_empty() {
            out.push_str("order by\n");
            let mut lines = Vec::with_capacity(self.order_by.len());
            for item in &self.order_by {
                let mut line = format!("\t{}", item.expr.value(&mut generator)?);
                match item.direction {
                    Some(Direction::Asc) => line.push_str(" asc"),
                    Some(Direction::Desc) => line.push_str(" desc"),
                    None => {}
                }
                match item.nulls {
                    Some(Nulls::First) => line.push_str(" nulls first"),
                    Some(Nulls::Last) => line.push_str(" nulls last"),
                    None => {}
                }
                lines.push(line);
            }
            push_lines(&mut out, &lines);
        }

        if let Some(offset) = self.offset {
            out.push_str(&format!("offset {} rows\n", offset));
        }
        if let Some(limit) = self.limit {
            out.push_str(&format!("fetch next {} rows only\n", limit));
        }

        let params = generator.finish();
        debug!(
            dialect = %self.ctx.dialect(),
            columns = self.select.len(),
            params = params.len(),
            "generated query"
        );
        Ok(SqlFragment { sql: out, params })
    }
}

fn push_lines(out: &mut String, lines: &[String]) {
    out.push_str(&lines.join(",\n"));
    out.push('\n');
}

/// Parent paths of the dotted field references in a tree
fn collect_field_parents(node: &Node, parents: &mut Vec<String>) {
    if let Expr::Field(path) = &node.expr {
        if let Some((parent, _)) = path.rsplit_once('.') {
            parents.push(parent.to_string());
        }
    }
    for child in node.children() {
        collect_field_parents(child, parents);
    }
}

/// Arguments of the outermost `group(x)` calls, with their validation results
fn collect_group_keys(node: &Node, checked: &Checked, keys: &mut Vec<(Node, Checked)>) {
    if let Expr::Aggregate {
        kind: AggregationKind::Group,
        args,
    } = &node.expr
    {
        if let (Some(arg), Some(arg_checked)) = (args.first(), checked.children().first()) {
            keys.push((arg.clone(), arg_checked.clone()));
        }
        return;
    }
    for (child, child_checked) in node.children().into_iter().zip(checked.children()) {
        collect_group_keys(child, child_checked, keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_order_suffix_case_insensitive() {
        assert_eq!(
            split_order_suffix("x ASC NULLS FIRST"),
            ("x", Some(Direction::Asc), Some(Nulls::First))
        );
        assert_eq!(split_order_suffix("x nulls last"), ("x", None, Some(Nulls::Last)));
    }

    #[test]
    fn test_identifier_check() {
        assert!(check_identifier("answer").is_ok());
        assert!(check_identifier("a_1$").is_ok());
        assert!(check_identifier("1a").is_err());
        assert!(check_identifier("a b").is_err());
        assert!(check_identifier("x--").is_err());
    }
}
