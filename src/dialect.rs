//! Target SQL dialects and their literal syntax.
//!
//! Every piece of user-controlled text that ends up in generated SQL goes
//! through one of the quoting routines in this module.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::CompileError;

/// The SQL dialect code is generated for.
///
/// Each dialect owns its own rule registry (see [`crate::rules`]). Adding a
/// dialect means adding a variant here and a registry builder there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Oracle,
    Postgres,
}

impl Dialect {
    pub const ALL: [Dialect; 2] = [Dialect::Oracle, Dialect::Postgres];

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Oracle => "oracle",
            Dialect::Postgres => "postgres",
        }
    }

    pub fn from_name(name: &str) -> Result<Dialect, CompileError> {
        match name.to_ascii_lowercase().as_str() {
            "oracle" => Ok(Dialect::Oracle),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            _ => Err(CompileError::UnknownDialect(name.to_string())),
        }
    }

    /// Quote a string literal.
    ///
    /// Single quotes are doubled. On Postgres a value containing a backslash
    /// becomes an escape string (`E'...'`) with the backslashes doubled too,
    /// so the literal reads the same whatever `standard_conforming_strings`
    /// is set to.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsql::Dialect;
    ///
    /// assert_eq!(Dialect::Oracle.quote_str("O'Neil"), "'O''Neil'");
    /// assert_eq!(Dialect::Postgres.quote_str("a\\'b"), "E'a\\\\''b'");
    /// ```
    pub fn quote_str(self, value: &str) -> String {
        let quoted = value.replace('\'', "''");
        match self {
            Dialect::Postgres if value.contains('\\') => format!("E'{}'", quoted.replace('\\', "\\\\")),
            _ => format!("'{}'", quoted),
        }
    }

    pub fn date_literal(self, value: NaiveDate) -> String {
        let text = self.quote_str(&value.format("%Y-%m-%d").to_string());
        match self {
            Dialect::Oracle => format!("to_date({}, 'YYYY-MM-DD')", text),
            Dialect::Postgres => format!("date {}", text),
        }
    }

    pub fn datetime_literal(self, value: NaiveDateTime) -> String {
        let text = self.quote_str(&value.format("%Y-%m-%d %H:%M:%S").to_string());
        match self {
            Dialect::Oracle => format!("to_date({}, 'YYYY-MM-DD HH24:MI:SS')", text),
            Dialect::Postgres => format!("timestamp {}", text),
        }
    }

    /// Placeholder for the bound parameter at 1-based `index`
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Oracle => format!(":{}", index),
            Dialect::Postgres => format!("${}", index),
        }
    }

    /// Quote an identifier, doubling embedded double quotes
    pub fn quote_identifier(self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// The table to select from when a query has no `from` entries
    pub fn empty_from(self) -> Option<&'static str> {
        match self {
            Dialect::Oracle => Some("dual"),
            Dialect::Postgres => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dialect::from_name(s)
    }
}

/// Wrap text in an SQL block comment that it cannot terminate
pub fn make_comment(text: &str) -> String {
    format!("/* {} */", text.replace("/*", "/ *").replace("*/", "* /"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_str_doubles_quotes() {
        assert_eq!(Dialect::Oracle.quote_str("'"), "''''");
        assert_eq!(
            Dialect::Postgres.quote_str("x'; drop table t; --"),
            "'x''; drop table t; --'"
        );
    }

    #[test]
    fn test_backslashes_only_escaped_on_postgres() {
        assert_eq!(Dialect::Oracle.quote_str(r"a\"), r"'a\'");
        assert_eq!(Dialect::Postgres.quote_str(r"a\"), r"E'a\\'");
        assert_eq!(Dialect::Postgres.quote_str(r"\'; drop table t; --"), r"E'\\''; drop table t; --'");
        assert_eq!(Dialect::Postgres.quote_str("plain"), "'plain'");
    }

    #[test]
    fn test_date_literals() {
        let date = NaiveDate::from_ymd_opt(2000, 2, 29).unwrap();
        assert_eq!(Dialect::Oracle.date_literal(date), "to_date('2000-02-29', 'YYYY-MM-DD')");
        assert_eq!(Dialect::Postgres.date_literal(date), "date '2000-02-29'");

        let datetime = date.and_hms_opt(12, 34, 56).unwrap();
        assert_eq!(
            Dialect::Oracle.datetime_literal(datetime),
            "to_date('2000-02-29 12:34:56', 'YYYY-MM-DD HH24:MI:SS')"
        );
    }

    #[test]
    fn test_comment_cannot_be_closed() {
        assert_eq!(make_comment("/*bad*/"), "/* / *bad* / */");
        assert_eq!(make_comment("a */ drop"), "/* a * / drop */");
    }

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::from_name("PostgreSQL").unwrap(), Dialect::Postgres);
        assert_eq!(
            Dialect::from_name("mysql"),
            Err(CompileError::UnknownDialect("mysql".to_string()))
        );
    }
}
