use crate::ast::BinaryOp::*;
use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::rules::{RuleTable, RuleTableBuilder, common};
use crate::types::DataType::*;

pub(super) fn build() -> Result<RuleTable, CompileError> {
    let mut b = RuleTable::builder(Dialect::Postgres);
    common::register(&mut b);
    register(&mut b);
    b.build()
}

/// Postgres has no `datetimedelta`; date deltas are integer days and month
/// deltas integer months, turned into intervals where a timestamp is involved.
fn register(b: &mut RuleTableBuilder) {
    // Arithmetic; integer division truncates in Postgres
    b.binary(TrueDiv, Number, Number, Number, "(cast({1} as numeric) / {2})");
    for t in [Int, Number] {
        b.binary(FloorDiv, t, t, t, "floor(cast({1} as numeric) / {2})");
        b.binary(Mod, t, t, t, "({1} - {2} * floor(cast({1} as numeric) / {2}))");
    }
    b.binary(Mul, Str, Int, Str, "repeat({2}, cast({1} as integer))");
    b.binary(Mul, Str, Str, Int, "repeat({1}, cast({2} as integer))");

    // Date arithmetic
    b.binary(Add, Date, Date, DateDelta, "({1} + cast({2} as integer))");
    b.binary(Sub, Date, Date, DateDelta, "({1} - cast({2} as integer))");
    b.binary(
        Add,
        DateTime,
        DateTime,
        DateDelta,
        "({1} + make_interval(days => cast({2} as integer)))",
    );
    b.binary(
        Sub,
        DateTime,
        DateTime,
        DateDelta,
        "({1} - make_interval(days => cast({2} as integer)))",
    );
    b.binary(
        Add,
        Date,
        Date,
        MonthDelta,
        "cast({1} + make_interval(months => cast({2} as integer)) as date)",
    );
    b.binary(
        Sub,
        Date,
        Date,
        MonthDelta,
        "cast({1} - make_interval(months => cast({2} as integer)) as date)",
    );
    b.binary(
        Add,
        DateTime,
        DateTime,
        MonthDelta,
        "({1} + make_interval(months => cast({2} as integer)))",
    );
    b.binary(
        Sub,
        DateTime,
        DateTime,
        MonthDelta,
        "({1} - make_interval(months => cast({2} as integer)))",
    );

    // Equality
    for t in [Int, Number, Str, Clob, Date, DateTime, DateDelta, MonthDelta] {
        b.binary(Eq, Bool, t, t, "(case when {1} is not distinct from {2} then 1 else 0 end)");
        b.binary(Ne, Bool, t, t, "(case when {1} is distinct from {2} then 1 else 0 end)");
    }
    for (op, symbol) in [(Lt, "<"), (Le, "<="), (Gt, ">"), (Ge, ">=")] {
        b.binary(
            op,
            Bool,
            Clob,
            Clob,
            &format!("(case when {{1}} {} {{2}} then 1 else 0 end)", symbol),
        );
    }

    // Containment and item access
    for container in [Str, Clob] {
        b.binary(Contains, Bool, Str, container, "(case when strpos({2}, {1}) > 0 then 1 else 0 end)");
        b.binary(NotContains, Bool, Str, container, "(case when strpos({2}, {1}) > 0 then 0 else 1 end)");
    }
    b.binary(
        Item,
        Str,
        Str,
        Int,
        "substr({1}, (case when {2} < 0 then length({1}) + {2} else {2} end) + 1, 1)",
    );

    // Bit operations
    b.binary(BitAnd, Int, Int, Int, "({1} & {2})");
    b.binary(BitOr, Int, Int, Int, "({1} | {2})");
    b.binary(BitXor, Int, Int, Int, "({1} # {2})");
    b.binary(ShiftLeft, Int, Int, Int, "({1} << cast({2} as integer))");
    b.binary(ShiftRight, Int, Int, Int, "({1} >> cast({2} as integer))");

    // Functions
    b.func("now", DateTime, &[], "localtimestamp(0)");
    b.func("today", Date, &[], "current_date");
    b.func("int", Int, &[Number], "trunc({1})");
    b.func("int", Int, &[Str], "cast({1} as bigint)");
    b.func("float", Number, &[Str], "cast({1} as numeric)");
    b.func("str", Str, &[], "''");
    b.func("str", Str, &[Int], "cast({1} as text)");
    b.func("str", Str, &[Number], "cast({1} as text)");
    b.func("len", Int, &[Clob], "coalesce(length({1}), 0)");
    b.func("date", Date, &[DateTime], "cast({1} as date)");
    b.func(
        "date",
        Date,
        &[Int, Int, Int],
        "make_date(cast({1} as integer), cast({2} as integer), cast({3} as integer))",
    );
    b.func("datetime", DateTime, &[Date], "cast({1} as timestamp)");

    // Methods
    b.meth(Str, "startswith", Bool, &[Str], "(case when starts_with({1}, {2}) then 1 else 0 end)");
    b.meth(
        Str,
        "endswith",
        Bool,
        &[Str],
        "(case when right({1}, length({2})) = {2} then 1 else 0 end)",
    );
    b.meth(Str, "find", Int, &[Str], "(strpos({1}, {2}) - 1)");
    b.meth(DateTime, "weekday", Int, &[], "(cast(extract(isodow from {1}) as integer) - 1)");
    b.meth(DateTime, "yearday", Int, &[], "cast(extract(doy from {1}) as integer)");

    // Attributes
    for part in ["year", "month", "day", "hour", "minute"] {
        b.attr(DateTime, part, Int, &format!("cast(extract({} from {{1}}) as integer)", part));
    }
    b.attr(DateTime, "second", Int, "cast(floor(extract(second from {1})) as integer)");
}
