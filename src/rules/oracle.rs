use crate::ast::BinaryOp::*;
use crate::ast::UnaryOp::Neg;
use crate::dialect::Dialect;
use crate::error::CompileError;
use crate::rules::{RuleTable, RuleTableBuilder, common};
use crate::types::DataType::*;

pub(super) fn build() -> Result<RuleTable, CompileError> {
    let mut b = RuleTable::builder(Dialect::Oracle);
    common::register(&mut b);
    register(&mut b);
    b.build()
}

/// Call of a function in the vSQL support package
fn pkg(function: &str, args: &str) -> String {
    format!("vsqlimpl_pkg.{}({})", function, args)
}

fn register(b: &mut RuleTableBuilder) {
    // Arithmetic
    b.binary(TrueDiv, Number, Number, Number, "({1} / {2})");
    for t in [Int, Number] {
        b.binary(FloorDiv, t, t, t, "floor({1} / {2})");
        b.binary(Mod, t, t, t, "({1} - {2} * floor({1} / {2}))");
    }
    b.binary(Mul, Str, Int, Str, &pkg("mul_int_str", "{1}, {2}"));
    b.binary(Mul, Str, Str, Int, &pkg("mul_str_int", "{1}, {2}"));

    // Date arithmetic; deltas are numbers of days, month deltas numbers of months
    b.binary(Add, Date, Date, DateDelta, "({1} + {2})");
    b.binary(Sub, Date, Date, DateDelta, "({1} - {2})");
    b.binary(Add, DateTime, DateTime, DateTimeDelta, "({1} + {2})");
    b.binary(Sub, DateTime, DateTime, DateTimeDelta, "({1} - {2})");
    b.binary(Sub, DateTimeDelta, DateTime, DateTime, "({1} - {2})");
    b.binary(Add, Date, Date, MonthDelta, "add_months({1}, {2})");
    b.binary(Sub, Date, Date, MonthDelta, "add_months({1}, -{2})");
    b.binary(Add, DateTime, DateTime, MonthDelta, "add_months({1}, {2})");
    b.binary(Sub, DateTime, DateTime, MonthDelta, "add_months({1}, -{2})");
    b.binary(Add, DateTimeDelta, DateTimeDelta, DateTimeDelta, "({1} + {2})");
    b.binary(Sub, DateTimeDelta, DateTimeDelta, DateTimeDelta, "({1} - {2})");
    b.binary(Mul, DateTimeDelta, Number, DateTimeDelta, "({1} * {2})");
    b.unary(Neg, DateTimeDelta, DateTimeDelta, "(-{1})");

    // Equality: decode treats two nulls as equal
    for t in [Int, Number, Str, Date, DateTime, DateDelta, DateTimeDelta, MonthDelta] {
        b.binary(Eq, Bool, t, t, "decode({1}, {2}, 1, 0)");
        b.binary(Ne, Bool, t, t, "decode({1}, {2}, 0, 1)");
    }
    b.binary(Eq, Bool, Clob, Clob, &pkg("eq_clob_clob", "{1}, {2}"));
    b.binary(Ne, Bool, Clob, Clob, &format!("(1 - {})", pkg("eq_clob_clob", "{1}, {2}")));
    for (op, symbol) in [(Lt, "<"), (Le, "<="), (Gt, ">"), (Ge, ">=")] {
        b.binary(
            op,
            Bool,
            Clob,
            Clob,
            &format!("(case when dbms_lob.compare({{1}}, {{2}}) {} 0 then 1 else 0 end)", symbol),
        );
    }

    // Containment and item access
    b.binary(Contains, Bool, Str, Str, &pkg("contains_str_str", "{1}, {2}"));
    b.binary(Contains, Bool, Str, Clob, &pkg("contains_str_clob", "{1}, {2}"));
    b.binary(NotContains, Bool, Str, Str, &format!("(1 - {})", pkg("contains_str_str", "{1}, {2}")));
    b.binary(NotContains, Bool, Str, Clob, &format!("(1 - {})", pkg("contains_str_clob", "{1}, {2}")));
    b.binary(Item, Str, Str, Int, &pkg("item_str", "{1}, {2}"));

    // Bit operations
    b.binary(BitAnd, Int, Int, Int, "bitand({1}, {2})");
    b.binary(BitOr, Int, Int, Int, "({1} + {2} - bitand({1}, {2}))");
    b.binary(BitXor, Int, Int, Int, "({1} + {2} - 2 * bitand({1}, {2}))");
    b.binary(ShiftLeft, Int, Int, Int, "trunc({1} * power(2, {2}))");
    b.binary(ShiftRight, Int, Int, Int, "floor({1} / power(2, {2}))");

    // Functions
    b.func("now", DateTime, &[], "sysdate");
    b.func("today", Date, &[], "trunc(sysdate)");
    b.func("int", Int, &[Number], "trunc({1})");
    b.func("int", Int, &[Str], "to_number({1})");
    b.func("float", Number, &[Str], "to_number({1})");
    b.func("str", Str, &[], "null");
    b.func("str", Str, &[Int], "to_char({1})");
    b.func("str", Str, &[Number], "to_char({1})");
    b.func("len", Int, &[Clob], "coalesce(dbms_lob.getlength({1}), 0)");
    b.func("date", Date, &[DateTime], "trunc({1})");
    b.func(
        "date",
        Date,
        &[Int, Int, Int],
        "to_date({1} || '-' || {2} || '-' || {3}, 'YYYY-MM-DD')",
    );
    b.func("datetime", DateTime, &[Date], "{1}");
    b.func("hours", DateTimeDelta, &[Int], "({1} / 24)");
    b.func("minutes", DateTimeDelta, &[Int], "({1} / 1440)");
    b.func("seconds", DateTimeDelta, &[Number], "({1} / 86400)");

    // Methods
    b.meth(Str, "startswith", Bool, &[Str], &pkg("startswith_str_str", "{1}, {2}"));
    b.meth(Str, "endswith", Bool, &[Str], &pkg("endswith_str_str", "{1}, {2}"));
    b.meth(Str, "find", Int, &[Str], "(instr({1}, {2}) - 1)");
    b.meth(DateTime, "weekday", Int, &[], "(trunc({1}) - trunc({1}, 'IW'))");
    b.meth(DateTime, "yearday", Int, &[], "to_number(to_char({1}, 'DDD'))");

    // Attributes
    for part in ["year", "month", "day"] {
        b.attr(DateTime, part, Int, &format!("extract({} from {{1}})", part));
    }
    for (part, format) in [("hour", "HH24"), ("minute", "MI"), ("second", "SS")] {
        b.attr(DateTime, part, Int, &format!("to_number(to_char({{1}}, '{}'))", format));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_table_builds() {
        let table = build().unwrap();
        assert_eq!(table.dialect(), Dialect::Oracle);
        assert!(table.rules().any(|rule| rule.template.to_string() == "trunc(sysdate)"));
    }
}
