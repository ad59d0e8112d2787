use chrono::NaiveDate;
use rust_decimal::Decimal;
use vsql::ast::json::from_json;
use vsql::ast::{BinaryOp, Node, UnaryOp};
use vsql::{
    AggregationKind, CompileError, DataType, Dialect, DiagnosticKind, ExprClass, Field, LiteralMode, Param,
    QueryContext, Schema,
};

fn schema() -> Schema {
    Schema::new()
        .with_field(Field::new("age", DataType::Int))
        .with_field(Field::new("name", DataType::Str))
        .with_field(Field::new("price", DataType::Number))
        .with_field(Field::new("born", DataType::Date))
        .with_field(Field::new("seen", DataType::DateTime))
        .with_field(Field::new("notes", DataType::Clob).with_sql("p.notes"))
}

fn oracle() -> QueryContext {
    QueryContext::new(schema(), Dialect::Oracle).unwrap()
}

fn postgres() -> QueryContext {
    QueryContext::new(schema(), Dialect::Postgres).unwrap()
}

fn compile(ctx: &QueryContext, node: &Node) -> String {
    ctx.compile(node).unwrap().sql
}

fn first_error_kind(ctx: &QueryContext, node: &Node) -> Option<DiagnosticKind> {
    let checked = ctx.validate(node).unwrap();
    checked.first_error(node).map(|(_, diagnostic)| diagnostic.kind)
}

fn field(name: &str) -> Node {
    Node::field(name)
}

fn add(left: Node, right: Node) -> Node {
    Node::binary(BinaryOp::Add, left, right)
}

fn agg(kind: AggregationKind, args: Vec<Node>) -> Node {
    Node::aggregate(kind, args)
}

// ============================================================================
// Constants
// ============================================================================

#[test]
fn test_int_and_number_constants() {
    let ctx = oracle();
    assert_eq!(compile(&ctx, &Node::int(42)), "42");
    assert_eq!(compile(&ctx, &Node::number(Decimal::new(425, 1))), "42.5");
    assert_eq!(compile(&ctx, &Node::none()), "null");
    assert_eq!(compile(&ctx, &Node::bool(true)), "1");
    assert_eq!(compile(&ctx, &Node::bool(false)), "0");
}

#[test]
fn test_negative_constant_is_parenthesized() {
    let expr = Node::binary(BinaryOp::Sub, field("age"), Node::int(-5));
    assert_eq!(compile(&oracle(), &expr), "(\"age\" - (-5))");
}

#[test]
fn test_date_constants_per_dialect() {
    let date = Node::date(NaiveDate::from_ymd_opt(2000, 2, 29).unwrap());
    assert_eq!(compile(&oracle(), &date), "to_date('2000-02-29', 'YYYY-MM-DD')");
    assert_eq!(compile(&postgres(), &date), "date '2000-02-29'");

    let datetime = Node::datetime(
        NaiveDate::from_ymd_opt(2000, 2, 29)
            .unwrap()
            .and_hms_opt(12, 34, 56)
            .unwrap(),
    );
    assert_eq!(
        compile(&oracle(), &datetime),
        "to_date('2000-02-29 12:34:56', 'YYYY-MM-DD HH24:MI:SS')"
    );
    assert_eq!(compile(&postgres(), &datetime), "timestamp '2000-02-29 12:34:56'");
}

// ============================================================================
// Injection Safety
// ============================================================================

#[test]
fn test_string_constant_quotes_are_doubled() {
    let sql = compile(&oracle(), &Node::str("x'; drop table person; --"));
    assert_eq!(sql, "'x''; drop table person; --'");

    let inner = &sql[1..sql.len() - 1];
    assert!(!inner.replace("''", "").contains('\''));
}

#[test]
fn test_comment_delimiters_stay_inside_literal() {
    let sql = compile(&postgres(), &Node::str("*/ or 1 = 1 /*"));
    assert_eq!(sql, "'*/ or 1 = 1 /*'");
}

#[test]
fn test_bind_mode_emits_placeholders() {
    let expr = Node::binary(BinaryOp::Eq, field("name"), Node::str("O'Neil"));

    let ctx = oracle().with_literal_mode(LiteralMode::Bind);
    let fragment = ctx.compile(&expr).unwrap();
    assert_eq!(fragment.sql, "decode(\"name\", :1, 1, 0)");
    assert_eq!(fragment.params, vec![Param::Str("O'Neil".to_string())]);

    let ctx = postgres().with_literal_mode(LiteralMode::Bind);
    let fragment = ctx.compile(&expr).unwrap();
    assert_eq!(
        fragment.sql,
        "(case when \"name\" is not distinct from $1 then 1 else 0 end)"
    );
    assert_eq!(fragment.params.len(), 1);
}

#[test]
fn test_bind_mode_numbers_parameters_in_order() {
    let expr = add(add(Node::str("a"), field("name")), Node::str("b"));
    let ctx = oracle().with_literal_mode(LiteralMode::Bind);
    let fragment = ctx.compile(&expr).unwrap();
    assert_eq!(fragment.sql, "((:1 || \"name\") || :2)");
    assert_eq!(
        fragment.params,
        vec![Param::Str("a".to_string()), Param::Str("b".to_string())]
    );
}

// ============================================================================
// Operators and Calls
// ============================================================================

#[test]
fn test_arithmetic_widens_int_to_number() {
    let ctx = oracle();
    let expr = add(field("age"), field("price"));
    let checked = ctx.validate(&expr).unwrap();
    assert_eq!(checked.data_type(), Some(DataType::Number));
    assert_eq!(compile(&ctx, &expr), "(\"age\" + \"price\")");
}

#[test]
fn test_string_concatenation() {
    assert_eq!(compile(&oracle(), &add(field("name"), Node::str("!"))), "(\"name\" || '!')");
}

#[test]
fn test_today_and_now_oracle() {
    let ctx = oracle();
    assert_eq!(compile(&ctx, &Node::func("today", vec![])), "trunc(sysdate)");
    assert_eq!(compile(&ctx, &Node::func("now", vec![])), "sysdate");
    assert_eq!(
        ctx.validate(&Node::func("today", vec![])).unwrap().data_type(),
        Some(DataType::Date)
    );
}

#[test]
fn test_today_and_now_postgres() {
    let ctx = postgres();
    assert_eq!(compile(&ctx, &Node::func("today", vec![])), "current_date");
    assert_eq!(compile(&ctx, &Node::func("now", vec![])), "localtimestamp(0)");
}

#[test]
fn test_method_and_attribute() {
    let ctx = oracle();
    assert_eq!(compile(&ctx, &Node::meth(field("name"), "lower", vec![])), "lower(\"name\")");
    assert_eq!(
        compile(&ctx, &Node::attr(field("born"), "year")),
        "extract(year from \"born\")"
    );
}

#[test]
fn test_field_with_custom_sql() {
    assert_eq!(
        compile(&oracle(), &Node::func("len", vec![field("notes")])),
        "coalesce(dbms_lob.getlength(p.notes), 0)"
    );
}

#[test]
fn test_unary_not_on_string() {
    let expr = Node::unary(UnaryOp::Not, field("name"));
    assert_eq!(
        compile(&oracle(), &expr),
        "(case when \"name\" is not null then 0 else 1 end)"
    );
}

#[test]
fn test_if_else_uses_truth_of_condition() {
    let expr = Node::if_else(field("age"), field("name"), Node::int(0));
    let ctx = oracle();
    assert_eq!(
        compile(&ctx, &expr),
        "(case when (case when \"name\" is not null then 1 else 0 end) = 1 then \"age\" else 0 end)"
    );
    assert_eq!(ctx.validate(&expr).unwrap().data_type(), Some(DataType::Int));
}

#[test]
fn test_if_else_with_bool_condition() {
    let cond = Node::binary(BinaryOp::Gt, field("age"), Node::int(17));
    let expr = Node::if_else(Node::str("adult"), cond, Node::none());
    assert_eq!(
        compile(&oracle(), &expr),
        "(case when (case when \"age\" > 17 then 1 else 0 end) = 1 then 'adult' else null end)"
    );
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_unsupported_operand_types() {
    let ctx = oracle();
    let expr = add(field("name"), field("born"));
    let checked = ctx.validate(&expr).unwrap();

    let diagnostic = checked.diagnostic().unwrap();
    assert_eq!(diagnostic.kind, DiagnosticKind::SubnodeTypes);
    assert_eq!(
        diagnostic.message,
        "Addition `name + born` uses unsupported types of operands: STR + DATE."
    );
    assert_eq!(checked.data_type(), None);
}

#[test]
fn test_if_else_incompatible_branches() {
    let expr = Node::if_else(field("name"), field("age"), field("born"));
    assert_eq!(first_error_kind(&oracle(), &expr), Some(DiagnosticKind::SubnodeTypes));
}

#[test]
fn test_unknown_field_only_marks_its_node() {
    let ctx = oracle();
    let expr = add(field("age"), field("agee"));
    let checked = ctx.validate(&expr).unwrap();

    assert_eq!(checked.diagnostic().unwrap().kind, DiagnosticKind::SubnodeError);
    assert!(checked.children()[0].is_valid());
    assert_eq!(checked.children()[0].data_type(), Some(DataType::Int));
    assert_eq!(
        checked.children()[1].diagnostic().unwrap().kind,
        DiagnosticKind::Field
    );

    let reports = checked.report(&expr);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].source, "agee");
}

#[test]
fn test_unknown_method_name() {
    let expr = Node::meth(field("name"), "frobnicate", vec![]);
    assert_eq!(first_error_kind(&oracle(), &expr), Some(DiagnosticKind::Name));
}

#[test]
fn test_diagnostic_points_at_origin() {
    let expr = add(
        field("age"),
        field("nope").with_origin("nope", Some(6..10)),
    )
    .with_origin("age + nope", Some(0..10));
    let checked = oracle().validate(&expr).unwrap();
    let reports = checked.report(&expr);
    assert_eq!(reports[0].span, Some(6..10));
    assert_eq!(reports[0].to_string(), "[6..10] Field `nope` in `nope` is unknown.");
}

#[test]
fn test_generate_refuses_tree_with_diagnostics() {
    let ctx = oracle();
    let expr = add(field("name"), Node::int(1));
    let checked = ctx.validate(&expr).unwrap();

    match ctx.generate(&expr, &checked) {
        Err(CompileError::Unresolved(reports)) => {
            assert_eq!(reports.len(), 1);
            assert_eq!(reports[0].kind, DiagnosticKind::SubnodeTypes);
        }
        other => panic!("expected Unresolved, got {:?}", other),
    }
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_aggregate_calls() {
    let ctx = oracle();
    let sum = agg(AggregationKind::Sum, vec![field("price")]);
    let checked = ctx.validate(&sum).unwrap();
    assert_eq!(checked.class(), ExprClass::Aggregated(AggregationKind::Sum));
    assert_eq!(compile(&ctx, &sum), "sum(\"price\")");

    let count = agg(AggregationKind::Count, vec![field("name")]);
    assert_eq!(ctx.validate(&count).unwrap().data_type(), Some(DataType::Int));
    assert_eq!(compile(&ctx, &count), "count(\"name\")");
}

#[test]
fn test_constant_combines_with_aggregate() {
    let ctx = oracle();
    let expr = add(Node::int(1), agg(AggregationKind::Sum, vec![field("price")]));
    let checked = ctx.validate(&expr).unwrap();
    assert_eq!(checked.class(), ExprClass::Aggregated(AggregationKind::Sum));
    assert_eq!(compile(&ctx, &expr), "(1 + sum(\"price\"))");
}

#[test]
fn test_count_without_argument_is_malformed() {
    let result = oracle().validate(&agg(AggregationKind::Count, vec![]));
    assert!(matches!(
        result,
        Err(CompileError::MalformedAggregation {
            kind: AggregationKind::Count,
            arity: 0,
            ..
        })
    ));
}

#[test]
fn test_min_with_two_arguments_is_malformed() {
    let result = oracle().validate(&agg(AggregationKind::Min, vec![field("age"), field("price")]));
    assert!(matches!(
        result,
        Err(CompileError::MalformedAggregation {
            kind: AggregationKind::Min,
            arity: 2,
            ..
        })
    ));
}

#[test]
fn test_nested_aggregate() {
    let expr = agg(
        AggregationKind::Sum,
        vec![agg(AggregationKind::Max, vec![field("price")])],
    );
    assert_eq!(first_error_kind(&oracle(), &expr), Some(DiagnosticKind::AggregateNested));
}

#[test]
fn test_mixed_operands_in_one_expression() {
    let expr = add(field("age"), agg(AggregationKind::Sum, vec![field("price")]));
    assert_eq!(first_error_kind(&oracle(), &expr), Some(DiagnosticKind::AggregateMixed));
}

#[test]
fn test_sum_of_strings_is_unsupported() {
    let expr = agg(AggregationKind::Sum, vec![field("name")]);
    assert_eq!(first_error_kind(&oracle(), &expr), Some(DiagnosticKind::SubnodeTypes));
}

#[test]
fn test_mixed_aggregation_across_select_list() {
    let mut ctx = oracle();
    let sum = agg(AggregationKind::Sum, vec![field("price")]);
    let checked = ctx.validate(&sum).unwrap();
    ctx.classify(&sum, &checked).unwrap();

    let row = field("age");
    let checked = ctx.validate(&row).unwrap();
    assert_eq!(
        ctx.classify(&row, &checked),
        Err(CompileError::MixedAggregation {
            source: "age".to_string()
        })
    );
}

// ============================================================================
// JSON Input
// ============================================================================

#[test]
fn test_compile_from_json() {
    let node = from_json(&serde_json::json!({
        "nodetype": "binop_mul",
        "source": "age * 2",
        "children": [
            {"nodetype": "field", "value": "age"},
            {"nodetype": "const_int", "value": 2}
        ]
    }))
    .unwrap();
    assert_eq!(compile(&postgres(), &node), "(\"age\" * 2)");
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_parallel_compilations_are_independent() {
    let handles: Vec<_> = (0..2)
        .map(|i| {
            std::thread::spawn(move || {
                let ctx = oracle();
                let mut results = Vec::new();
                for n in 0..200 {
                    let expr = if i == 0 {
                        add(field("age"), Node::int(n))
                    } else {
                        Node::meth(add(field("name"), Node::str(n.to_string())), "upper", vec![])
                    };
                    results.push(ctx.compile(&expr).unwrap().sql);
                }
                results
            })
        })
        .collect();

    let results: Vec<Vec<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for n in 0..200 {
        assert_eq!(results[0][n], format!("(\"age\" + {})", n));
        assert_eq!(results[1][n], format!("upper((\"name\" || '{}'))", n));
    }
}
