use std::str::FromStr;

use crate::error::CompileError;

/// The aggregate functions a select expression may be wrapped in.
///
/// `Group` is a pass-through: the wrapped expression is emitted as is and
/// becomes part of the `group by` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationKind {
    Group,
    Count,
    Min,
    Max,
    Sum,
}

impl AggregationKind {
    pub const ALL: [AggregationKind; 5] = [
        AggregationKind::Group,
        AggregationKind::Count,
        AggregationKind::Min,
        AggregationKind::Max,
        AggregationKind::Sum,
    ];

    /// The canonical lowercase encoding
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationKind::Group => "group",
            AggregationKind::Count => "count",
            AggregationKind::Min => "min",
            AggregationKind::Max => "max",
            AggregationKind::Sum => "sum",
        }
    }

    /// Number of arguments a call of this aggregate takes
    pub fn arity(self) -> usize {
        1
    }
}

impl std::fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationKind {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AggregationKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CompileError::EnumValue {
                enum_name: "AggregationKind",
                value: s.to_string(),
            })
    }
}

/// How a (sub)expression relates to aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprClass {
    /// Only constants, valid in both aggregated and row-level queries
    Constant,
    /// Refers to row-level fields outside of any aggregate
    Row,
    /// Contains an aggregate; the kind is the one of the first outermost aggregate
    Aggregated(AggregationKind),
}

impl ExprClass {
    /// Combine the classes of sibling operands, left to right.
    ///
    /// Returns `None` if aggregated and row-level operands meet.
    pub fn combine(self, other: ExprClass) -> Option<ExprClass> {
        match (self, other) {
            (ExprClass::Constant, c) | (c, ExprClass::Constant) => Some(c),
            (ExprClass::Row, ExprClass::Row) => Some(ExprClass::Row),
            (ExprClass::Aggregated(k), ExprClass::Aggregated(_)) => Some(ExprClass::Aggregated(k)),
            _ => None,
        }
    }
}

/// The aggregation state of a query's select list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationState {
    /// No row-level or aggregated expression has been seen yet
    #[default]
    None,
    NonAggregated,
    /// Aggregated, remembering the kind of the first aggregated expression
    Aggregated(AggregationKind),
}

impl AggregationState {
    /// Fold one more top-level select expression into the state
    pub fn accept(self, class: ExprClass, source: &str) -> Result<AggregationState, CompileError> {
        match (self, class) {
            (state, ExprClass::Constant) => Ok(state),
            (AggregationState::None, ExprClass::Row) => Ok(AggregationState::NonAggregated),
            (AggregationState::None, ExprClass::Aggregated(kind)) => {
                Ok(AggregationState::Aggregated(kind))
            }
            (AggregationState::NonAggregated, ExprClass::Row) => Ok(self),
            (AggregationState::Aggregated(_), ExprClass::Aggregated(_)) => Ok(self),
            _ => Err(CompileError::MixedAggregation {
                source: source.to_string(),
            }),
        }
    }

    pub fn is_aggregated(self) -> bool {
        matches!(self, AggregationState::Aggregated(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_is_defined_for_every_kind() {
        for kind in AggregationKind::ALL {
            assert_eq!(kind.as_str().parse::<AggregationKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_encoding() {
        let err = "avg".parse::<AggregationKind>().unwrap_err();
        assert_eq!(
            err,
            CompileError::EnumValue {
                enum_name: "AggregationKind",
                value: "avg".to_string()
            }
        );
    }

    #[test]
    fn test_state_rejects_mixing() {
        let state = AggregationState::None
            .accept(ExprClass::Aggregated(AggregationKind::Sum), "sum(x)")
            .unwrap();
        let state = state.accept(ExprClass::Constant, "42").unwrap();
        assert!(state.is_aggregated());
        assert!(matches!(
            state.accept(ExprClass::Row, "y"),
            Err(CompileError::MixedAggregation { .. })
        ));
    }
}
