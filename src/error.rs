use crate::aggregate::AggregationKind;
use crate::diagnostic::Reported;

/// Faults that abort a compilation.
///
/// These never originate from a mistake in the end user's expression: they
/// signal that the compiler and its caller disagree about the schema, the
/// shape of the tree or the rule tables. User mistakes are reported as
/// [`Diagnostic`](crate::Diagnostic)s on the validated tree instead.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A data type name that is not part of the lattice
    UnknownDataType(String),

    /// An enum encoding that does not name any variant
    EnumValue { enum_name: &'static str, value: String },

    /// A node (or JSON node) the compiler does not know how to handle
    UnsupportedAstShape(String),

    /// An aggregate call with the wrong number of arguments
    MalformedAggregation {
        kind: AggregationKind,
        arity: usize,
        source: String,
    },

    /// Aggregated and row-level expressions in the same select list
    MixedAggregation { source: String },

    /// Two rules with the same operator and signature
    DuplicateRule { operator: String, signature: String },

    /// Two overlapping rules without a narrower rule that decides between them
    AmbiguousRules {
        operator: String,
        first: String,
        second: String,
    },

    /// A rule template referencing a child that does not exist
    InvalidTemplate { operator: String, message: String },

    /// A field the caller asked for that the schema does not contain
    FieldUnknown(String),

    /// A dotted field path generated outside of a query that joins its tables
    UnjoinedField(String),

    /// A field used as a table that does not refer to a group
    NoReference(String),

    /// A field schema that does not have the expected structure
    InvalidSchema(String),

    /// A dialect name that is not supported
    UnknownDialect(String),

    /// An alias or table name that is not a plain SQL identifier
    InvalidIdentifier(String),

    /// SQL was requested for a tree that still carries diagnostics
    Unresolved(Vec<Reported>),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnknownDataType(name) => write!(f, "Unknown data type: '{}'", name),
            CompileError::EnumValue { enum_name, value } => {
                write!(f, "Value '{}' is not a valid {}", value, enum_name)
            }
            CompileError::UnsupportedAstShape(msg) => write!(f, "Unsupported AST shape: {}", msg),
            CompileError::MalformedAggregation {
                kind,
                arity,
                source,
            } => write!(
                f,
                "Aggregation call is malformed: `{}` passes {} argument(s) to {}, expected {}",
                source,
                arity,
                kind,
                kind.arity()
            ),
            CompileError::MixedAggregation { source } => write!(
                f,
                "Can't mix aggregated and non-aggregated expressions: `{}`",
                source
            ),
            CompileError::DuplicateRule {
                operator,
                signature,
            } => write!(f, "Duplicate rule for {}: {}", operator, signature),
            CompileError::AmbiguousRules {
                operator,
                first,
                second,
            } => write!(
                f,
                "Ambiguous rules for {}: {} and {} overlap without a narrower rule",
                operator, first, second
            ),
            CompileError::InvalidTemplate { operator, message } => {
                write!(f, "Invalid rule template for {}: {}", operator, message)
            }
            CompileError::FieldUnknown(name) => write!(f, "Field '{}' is unknown", name),
            CompileError::UnjoinedField(path) => {
                write!(f, "Field '{}' needs a query that joins its tables", path)
            }
            CompileError::NoReference(name) => write!(f, "Field '{}' does not refer to a group", name),
            CompileError::InvalidSchema(msg) => write!(f, "Invalid field schema: {}", msg),
            CompileError::UnknownDialect(name) => write!(f, "Unknown SQL dialect: '{}'", name),
            CompileError::InvalidIdentifier(name) => {
                write!(f, "'{}' is not a valid SQL identifier", name)
            }
            CompileError::Unresolved(reports) => {
                write!(f, "Expression has errors")?;
                for report in reports {
                    write!(f, "\n  {}", report)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CompileError {}
