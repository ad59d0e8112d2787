use std::str::FromStr;

use crate::error::CompileError;

/// The static type of a vSQL expression.
///
/// Types form a small lattice used for implicit widening during rule
/// matching. Widening only happens along these chains:
///
/// ```text
/// bool -> int -> number
/// str -> clob
/// date -> datetime
/// datedelta -> datetimedelta
/// ```
///
/// `monthdelta` stands on its own. `null` is the type of `None`; it joins with
/// any other type in [`DataType::widen`] but never widens into a rule operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Null,
    Bool,
    Int,
    Number,
    Str,
    Clob,
    Date,
    DateTime,
    DateDelta,
    DateTimeDelta,
    MonthDelta,
}

impl DataType {
    /// All types, in declaration order
    pub const ALL: [DataType; 11] = [
        DataType::Null,
        DataType::Bool,
        DataType::Int,
        DataType::Number,
        DataType::Str,
        DataType::Clob,
        DataType::Date,
        DataType::DateTime,
        DataType::DateDelta,
        DataType::DateTimeDelta,
        DataType::MonthDelta,
    ];

    /// The canonical lowercase encoding
    pub fn name(self) -> &'static str {
        match self {
            DataType::Null => "null",
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Number => "number",
            DataType::Str => "str",
            DataType::Clob => "clob",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::DateDelta => "datedelta",
            DataType::DateTimeDelta => "datetimedelta",
            DataType::MonthDelta => "monthdelta",
        }
    }

    /// Uppercase label used in user-facing messages
    pub fn label(self) -> String {
        self.name().to_uppercase()
    }

    /// Parse the canonical encoding.
    ///
    /// An unknown name means the schema or configuration handed to the
    /// compiler is corrupt, so this is a fault and not a diagnostic.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsql::DataType;
    ///
    /// assert_eq!(DataType::from_name("datetime").unwrap(), DataType::DateTime);
    /// assert!(DataType::from_name("timestamp").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<DataType, CompileError> {
        DataType::ALL
            .iter()
            .copied()
            .find(|t| t.name() == name)
            .ok_or_else(|| CompileError::UnknownDataType(name.to_string()))
    }

    /// Position in the widening chain as `(chain, rank)`
    fn chain(self) -> Option<(u8, u8)> {
        match self {
            DataType::Null => None,
            DataType::Bool => Some((0, 0)),
            DataType::Int => Some((0, 1)),
            DataType::Number => Some((0, 2)),
            DataType::Str => Some((1, 0)),
            DataType::Clob => Some((1, 1)),
            DataType::Date => Some((2, 0)),
            DataType::DateTime => Some((2, 1)),
            DataType::DateDelta => Some((3, 0)),
            DataType::DateTimeDelta => Some((3, 1)),
            DataType::MonthDelta => Some((4, 0)),
        }
    }

    /// Whether a value of this type may be passed where `target` is expected
    pub fn widens_to(self, target: DataType) -> bool {
        if self == target {
            return true;
        }
        match (self.chain(), target.chain()) {
            (Some((c1, r1)), Some((c2, r2))) => c1 == c2 && r1 <= r2,
            _ => false,
        }
    }

    /// The common type two operands coerce to, if any.
    ///
    /// # Examples
    ///
    /// ```
    /// use vsql::DataType;
    ///
    /// assert_eq!(DataType::widen(DataType::Int, DataType::Number), Some(DataType::Number));
    /// assert_eq!(DataType::widen(DataType::Null, DataType::Date), Some(DataType::Date));
    /// assert_eq!(DataType::widen(DataType::Str, DataType::Date), None);
    /// ```
    pub fn widen(a: DataType, b: DataType) -> Option<DataType> {
        match (a, b) {
            _ if a == b => Some(a),
            (DataType::Null, other) | (other, DataType::Null) => Some(other),
            _ if a.widens_to(b) => Some(b),
            _ if b.widens_to(a) => Some(a),
            _ => None,
        }
    }

    /// The narrower of two types on the same chain
    pub fn meet(a: DataType, b: DataType) -> Option<DataType> {
        if a.widens_to(b) {
            Some(a)
        } else if b.widens_to(a) {
            Some(b)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::from_name(s)
    }
}
