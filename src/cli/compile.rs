//! Compile an AST JSON document against a schema

use serde_json::{Value as JsonValue, json};

use super::CliError;
use crate::ast::json::{from_json, to_json};
use crate::{Dialect, LiteralMode, QueryContext, Schema, SqlFragment};

/// Options for the compile command
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Schema JSON text
    pub schema: String,
    /// AST JSON text
    pub ast: Option<String>,
    pub dialect: Dialect,
    /// Emit placeholders instead of inline literals
    pub bind: bool,
    /// Report as JSON, including diagnostics and the annotated tree
    pub json: bool,
}

/// Result of a compile operation
#[derive(Debug)]
pub enum CompileOutput {
    Sql(SqlFragment),
    Json(JsonValue),
}

/// Execute a vsql compile operation
pub fn execute_compile(options: &CompileOptions) -> Result<CompileOutput, CliError> {
    let ast_text = options.ast.as_ref().ok_or(CliError::NoInput)?;

    let schema = Schema::from_json(&serde_json::from_str(&options.schema)?)?;
    let node = from_json(&serde_json::from_str(ast_text)?)?;

    let literals = if options.bind {
        LiteralMode::Bind
    } else {
        LiteralMode::Inline
    };
    let ctx = QueryContext::new(schema, options.dialect)?.with_literal_mode(literals);
    let checked = ctx.validate(&node)?;

    if !options.json {
        return Ok(CompileOutput::Sql(ctx.generate(&node, &checked)?));
    }

    let errors: Vec<JsonValue> = checked
        .report(&node)
        .iter()
        .map(|report| {
            json!({
                "kind": report.kind.as_str(),
                "message": report.message,
                "source": report.source,
                "span": report.span.as_ref().map(|span| [span.start, span.end]),
            })
        })
        .collect();
    let fragment = if checked.is_valid() {
        Some(ctx.generate(&node, &checked)?)
    } else {
        None
    };

    Ok(CompileOutput::Json(json!({
        "dialect": options.dialect.name(),
        "datatype": checked.data_type().map(|t| t.name()),
        "sql": fragment.as_ref().map(|f| f.sql.as_str()),
        "params": fragment
            .as_ref()
            .map(|f| f.params.iter().map(|p| p.to_string()).collect::<Vec<_>>())
            .unwrap_or_default(),
        "errors": errors,
        "ast": to_json(&node, Some(&checked)),
    })))
}
