//! # vSQL
//!
//! Compiles typed vSQL expression trees into SQL fragments for Oracle and
//! Postgres.
//!
//! A compilation is two passes over an immutable [`ast::Node`] tree:
//!
//! 1. [`QueryContext::validate`] type-checks the tree against a [`Schema`]
//!    and the dialect's [rule table](rules), producing a [`Checked`] tree
//!    with per-node types and [`Diagnostic`]s.
//! 2. [`QueryContext::generate`] turns a diagnostic-free tree into SQL,
//!    inlining or binding literals.
//!
//! [`Query`] assembles complete statements from several expressions and
//! enforces consistent aggregation across the select list.
//!
//! ```
//! use vsql::ast::Node;
//! use vsql::{Dialect, QueryContext, Schema};
//!
//! let ctx = QueryContext::new(Schema::new(), Dialect::Oracle).unwrap();
//! let sql = ctx.compile(&Node::func("today", vec![])).unwrap().sql;
//! assert_eq!(sql, "trunc(sysdate)");
//! ```

pub mod aggregate;
pub mod ast;
#[cfg(feature = "cli")]
pub mod cli;
pub mod context;
pub mod diagnostic;
pub mod dialect;
pub mod error;
pub mod generator;
pub mod namespace;
pub mod query;
pub mod rules;
pub mod schema;
pub mod types;
pub mod validator;

pub use aggregate::{AggregationKind, AggregationState, ExprClass};
pub use context::{LiteralMode, QueryContext};
pub use diagnostic::{Diagnostic, DiagnosticKind, Reported};
pub use dialect::Dialect;
pub use error::CompileError;
pub use generator::{Param, SqlFragment};
pub use query::Query;
pub use schema::{Field, Group, Schema};
pub use types::DataType;
pub use validator::Checked;
