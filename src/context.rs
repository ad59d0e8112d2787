use tracing::debug;

use crate::aggregate::{AggregationState, ExprClass};
use crate::ast::Node;
use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::generator::{self, SqlFragment};
use crate::rules::{self, RuleTable};
use crate::schema::{Field, Schema};
use crate::validator::{self, Checked};

/// How string and date constants end up in generated SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralMode {
    /// Quoted literals in the SQL text
    #[default]
    Inline,
    /// Placeholders, with the values collected as parameters
    Bind,
}

/// Everything a compilation needs besides the expression itself.
///
/// Validation and generation only borrow the context. The aggregation state
/// is the only mutable part and is advanced between expressions by
/// [`classify`](Self::classify).
#[derive(Debug, Clone)]
pub struct QueryContext {
    schema: Schema,
    dialect: Dialect,
    rules: &'static RuleTable,
    literals: LiteralMode,
    aggregation: AggregationState,
}

impl QueryContext {
    /// A context using the shared rule table of `dialect`
    pub fn new(schema: Schema, dialect: Dialect) -> Result<Self, CompileError> {
        Ok(QueryContext::with_rule_table(schema, rules::registry(dialect)?))
    }

    /// A context using a custom rule table
    pub fn with_rule_table(schema: Schema, rules: &'static RuleTable) -> Self {
        QueryContext {
            schema,
            dialect: rules.dialect(),
            rules,
            literals: LiteralMode::default(),
            aggregation: AggregationState::default(),
        }
    }

    pub fn with_literal_mode(mut self, literals: LiteralMode) -> Self {
        self.literals = literals;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn rules(&self) -> &'static RuleTable {
        self.rules
    }

    pub fn literal_mode(&self) -> LiteralMode {
        self.literals
    }

    pub fn aggregation(&self) -> AggregationState {
        self.aggregation
    }

    /// The field a (possibly dotted) path refers to
    pub fn field(&self, path: &str) -> Option<&Field> {
        self.schema.resolve(path)
    }

    pub fn require_field(&self, path: &str) -> Result<&Field, CompileError> {
        self.schema.require(path)
    }

    pub fn validate(&self, node: &Node) -> Result<Checked, CompileError> {
        validator::validate(node, self)
    }

    pub fn generate(&self, node: &Node, checked: &Checked) -> Result<SqlFragment, CompileError> {
        generator::generate(node, checked, self)
    }

    /// Validate and generate in one go, failing on diagnostics
    ///
    /// # Examples
    ///
    /// ```
    /// use vsql::ast::{BinaryOp, Node};
    /// use vsql::{DataType, Dialect, Field, QueryContext, Schema};
    ///
    /// let schema = Schema::new().with_field(Field::new("age", DataType::Int));
    /// let ctx = QueryContext::new(schema, Dialect::Oracle).unwrap();
    /// let expr = Node::binary(BinaryOp::Add, Node::field("age"), Node::int(1));
    /// assert_eq!(ctx.compile(&expr).unwrap().sql, "(\"age\" + 1)");
    /// ```
    pub fn compile(&self, node: &Node) -> Result<SqlFragment, CompileError> {
        let checked = self.validate(node)?;
        self.generate(node, &checked)
    }

    /// Fold a validated top-level select expression into the aggregation state.
    ///
    /// Fails with `MixedAggregation` if the expression is row-level while
    /// earlier ones were aggregated, or the other way round.
    pub fn classify(&mut self, node: &Node, checked: &Checked) -> Result<(), CompileError> {
        self.accept(checked.class(), &node.source())
    }

    /// Fold an entry of the given class into the aggregation state; `source`
    /// names the entry in errors
    pub fn accept(&mut self, class: ExprClass, source: &str) -> Result<(), CompileError> {
        let state = self.aggregation.accept(class, source)?;
        if state != self.aggregation {
            debug!(from = ?self.aggregation, to = ?state, source, "aggregation state changed");
        }
        self.aggregation = state;
        Ok(())
    }
}
