//! # Rule tables
//!
//! A rule maps a typed call signature to a result type and an SQL template:
//!
//! ```text
//! INT <- binop_add(INT, INT): ({1} + {2})
//! STR <- meth(STR, lower): lower({1})
//! ```
//!
//! Every dialect has its own [`RuleTable`], built once on first use and shared
//! read-only by all compilations afterwards. Rules shared by all dialects are
//! registered by `common`, dialect specifics by `oracle` and `postgres`.
//!
//! ## Resolution
//!
//! Operand types match a rule if each of them [widens](crate::DataType::widens_to)
//! to the rule's parameter type. An exact match always wins; otherwise the
//! narrowest matching rule is taken. Building a table fails if that choice
//! could ever be ambiguous.

mod common;
mod oracle;
mod postgres;
pub mod table;
pub mod template;

use std::sync::LazyLock;

pub use table::{Operator, Resolution, Rule, RuleTable, RuleTableBuilder, Sig};
pub use template::{Piece, Template};

use crate::dialect::Dialect;
use crate::error::CompileError;

static ORACLE_RULES: LazyLock<Result<RuleTable, CompileError>> = LazyLock::new(oracle::build);
static POSTGRES_RULES: LazyLock<Result<RuleTable, CompileError>> = LazyLock::new(postgres::build);

/// The process-wide rule table of a dialect
///
/// # Examples
///
/// ```
/// use vsql::Dialect;
/// use vsql::rules::registry;
///
/// let rules = registry(Dialect::Oracle).unwrap();
/// assert!(rules.len() > 100);
/// ```
pub fn registry(dialect: Dialect) -> Result<&'static RuleTable, CompileError> {
    let table = match dialect {
        Dialect::Oracle => &ORACLE_RULES,
        Dialect::Postgres => &POSTGRES_RULES,
    };
    LazyLock::force(table).as_ref().map_err(Clone::clone)
}
