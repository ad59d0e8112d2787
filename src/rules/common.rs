//! Rules whose SQL is the same (or only differs in truthiness tests) in every dialect.

use crate::aggregate::AggregationKind;
use crate::ast::BinaryOp::*;
use crate::ast::UnaryOp::{BitNot, Neg, Not};
use crate::dialect::Dialect;
use crate::rules::RuleTableBuilder;
use crate::types::DataType::{self, *};

/// All non-null types the dialect can represent
pub(super) fn value_types(dialect: Dialect) -> Vec<DataType> {
    DataType::ALL
        .into_iter()
        .filter(|t| *t != Null)
        .filter(|t| dialect != Dialect::Postgres || *t != DateTimeDelta)
        .collect()
}

/// Types with a natural order (excluding `clob`, which needs dialect support)
pub(super) fn ordered_types(dialect: Dialect) -> Vec<DataType> {
    value_types(dialect)
        .into_iter()
        .filter(|t| !matches!(t, Bool | Clob))
        .collect()
}

/// Types that can be summed up
pub(super) fn summable_types(dialect: Dialect) -> Vec<DataType> {
    value_types(dialect)
        .into_iter()
        .filter(|t| matches!(t, Int | Number | DateDelta | DateTimeDelta | MonthDelta))
        .collect()
}

/// SQL condition that holds when `arg`, a value of type `t`, is truthy.
///
/// Oracle stores the empty string as null, so a null check suffices there.
pub(super) fn truthy(dialect: Dialect, t: DataType, arg: &str) -> String {
    match t {
        Null => "1 = 0".to_string(),
        Bool => format!("{} = 1", arg),
        Int | Number | DateDelta | DateTimeDelta | MonthDelta => format!("coalesce({}, 0) <> 0", arg),
        Str | Clob => match dialect {
            Dialect::Oracle => format!("{} is not null", arg),
            Dialect::Postgres => format!("coalesce({}, '') <> ''", arg),
        },
        Date | DateTime => format!("{} is not null", arg),
    }
}

pub(super) fn register(b: &mut RuleTableBuilder) {
    let dialect = b.dialect();
    let types = value_types(dialect);

    // Arithmetic
    for t in [Int, Number] {
        b.binary(Add, t, t, t, "({1} + {2})");
        b.binary(Sub, t, t, t, "({1} - {2})");
        b.binary(Mul, t, t, t, "({1} * {2})");
        b.unary(Neg, t, t, "(-{1})");
    }
    b.unary(BitNot, Int, Int, "(-{1} - 1)");
    b.binary(Add, Str, Str, Str, "({1} || {2})");
    b.binary(Add, Clob, Clob, Clob, "({1} || {2})");
    b.binary(Sub, DateDelta, Date, Date, "({1} - {2})");
    for t in [DateDelta, MonthDelta] {
        b.binary(Add, t, t, t, "({1} + {2})");
        b.binary(Sub, t, t, t, "({1} - {2})");
        b.binary(Mul, t, Int, t, "({1} * {2})");
        b.unary(Neg, t, t, "(-{1})");
    }

    // Comparison with None and identity tests
    b.binary(Eq, Bool, Null, Null, "1");
    b.binary(Ne, Bool, Null, Null, "0");
    b.binary(Is, Bool, Null, Null, "1");
    b.binary(IsNot, Bool, Null, Null, "0");
    for &t in &types {
        for op in [Eq, Is] {
            b.binary(op, Bool, Null, t, "(case when {2} is null then 1 else 0 end)");
            b.binary(op, Bool, t, Null, "(case when {1} is null then 1 else 0 end)");
        }
        for op in [Ne, IsNot] {
            b.binary(op, Bool, Null, t, "(case when {2} is null then 0 else 1 end)");
            b.binary(op, Bool, t, Null, "(case when {1} is null then 0 else 1 end)");
        }
    }

    // Ordering
    for t in ordered_types(dialect) {
        for (op, symbol) in [(Lt, "<"), (Le, "<="), (Gt, ">"), (Ge, ">=")] {
            b.binary(
                op,
                Bool,
                t,
                t,
                &format!("(case when {{1}} {} {{2}} then 1 else 0 end)", symbol),
            );
        }
    }

    // Truthiness: `and`/`or` return one of their operands, like in the host language
    b.binary(And, Null, Null, Null, "null");
    b.binary(Or, Null, Null, Null, "null");
    b.unary(Not, Bool, Null, "1");
    b.func("bool", Bool, &[], "0");
    b.func("bool", Bool, &[Null], "0");
    for &t in &types {
        let cond = truthy(dialect, t, "{1}");
        b.binary(And, t, t, t, &format!("(case when {} then {{2}} else {{1}} end)", cond));
        b.binary(Or, t, t, t, &format!("(case when {} then {{1}} else {{2}} end)", cond));
        b.binary(And, t, Null, t, "null");
        b.binary(And, t, t, Null, &format!("(case when {} then null else {{1}} end)", cond));
        b.binary(Or, t, Null, t, "{2}");
        b.binary(Or, t, t, Null, &format!("(case when {} then {{1}} else null end)", cond));
        b.unary(Not, Bool, t, &format!("(case when {} then 0 else 1 end)", cond));
        b.func("bool", Bool, &[t], &format!("(case when {} then 1 else 0 end)", cond));
    }

    // Conversions
    b.func("int", Int, &[], "0");
    b.func("int", Int, &[Int], "{1}");
    b.func("float", Number, &[], "0.0");
    b.func("float", Number, &[Number], "{1}");
    b.func("str", Str, &[Null], "null");
    b.func(
        "str",
        Str,
        &[Bool],
        "(case {1} when 0 then 'False' when 1 then 'True' else 'None' end)",
    );
    b.func("str", Str, &[Str], "{1}");
    b.func("str", Clob, &[Clob], "{1}");
    b.func("str", Str, &[Date], "to_char({1}, 'YYYY-MM-DD')");
    b.func("str", Str, &[DateTime], "to_char({1}, 'YYYY-MM-DD HH24:MI:SS')");
    b.func("date", Date, &[Date], "{1}");
    b.func("datetime", DateTime, &[DateTime], "{1}");
    b.func("days", DateDelta, &[Int], "{1}");
    b.func("weeks", DateDelta, &[Int], "(7 * {1})");
    b.func("months", MonthDelta, &[Int], "{1}");
    b.func("years", MonthDelta, &[Int], "(12 * {1})");

    // Strings
    b.func("len", Int, &[Str], "coalesce(length({1}), 0)");
    for t in [Str, Clob] {
        b.func("lower", t, &[t], "lower({1})");
        b.func("upper", t, &[t], "upper({1})");
        b.meth(t, "lower", t, &[], "lower({1})");
        b.meth(t, "upper", t, &[], "upper({1})");
    }
    b.meth(Str, "strip", Str, &[], "trim({1})");
    b.meth(Str, "lstrip", Str, &[], "ltrim({1})");
    b.meth(Str, "rstrip", Str, &[], "rtrim({1})");
    b.meth(Str, "replace", Str, &[Str, Str], "replace({1}, {2}, {3})");

    // Aggregates
    for t in std::iter::once(Null).chain(types.iter().copied()) {
        b.aggregate(AggregationKind::Count, Int, t, "count({1})");
        b.aggregate(AggregationKind::Group, t, t, "{1}");
    }
    for t in ordered_types(dialect) {
        b.aggregate(AggregationKind::Min, t, t, "min({1})");
        b.aggregate(AggregationKind::Max, t, t, "max({1})");
    }
    for t in summable_types(dialect) {
        b.aggregate(AggregationKind::Sum, t, t, "sum({1})");
    }
}
