use std::sync::Arc;

use vsql::ast::{BinaryOp, Node};
use vsql::query::{Direction, Nulls};
use vsql::{
    AggregationKind, CompileError, DataType, Dialect, DiagnosticKind, Field, Group, LiteralMode, Param,
    Query, QueryContext, Schema,
};

fn schema() -> Schema {
    Schema::new()
        .with_field(Field::new("age", DataType::Int))
        .with_field(Field::new("name", DataType::Str).with_sql("p.name"))
        .with_field(Field::new("price", DataType::Number))
}

/// `dept` joins a department, whose `head` joins a person again
fn joined_schema() -> Schema {
    let person = Arc::new(
        Group::new(Some("person"))
            .with_field(Field::new("name", DataType::Str).with_sql("{a}.name"))
            .with_field(Field::new("*", DataType::Str)),
    );
    let dept = Arc::new(
        Group::new(Some("dept"))
            .with_field(Field::new("title", DataType::Str).with_sql("{a}.title"))
            .with_field(
                Field::new("head", DataType::Int)
                    .with_sql("{a}.head_id")
                    .with_join("{m}.head_id = {d}.id", person),
            ),
    );
    let params = Arc::new(
        Group::new(None).with_field(Field::new("lang", DataType::Str).with_sql("sys_context('app', 'lang')")),
    );
    Schema::new()
        .with_field(Field::new("age", DataType::Int).with_sql("p.age"))
        .with_field(
            Field::new("dept", DataType::Int)
                .with_sql("p.dept_id")
                .with_join("p.dept_id = {d}.id", dept),
        )
        .with_field(Field::new("params", DataType::Int).with_join("", params))
}

fn joined_query() -> Query {
    Query::new(QueryContext::new(joined_schema(), Dialect::Oracle).unwrap())
}

fn query(dialect: Dialect) -> Query {
    Query::new(QueryContext::new(schema(), dialect).unwrap())
}

fn sql(query: &Query) -> String {
    query.sql().unwrap().sql
}

fn agg(kind: AggregationKind, arg: Node) -> Node {
    Node::aggregate(kind, vec![arg])
}

// ============================================================================
// Select List
// ============================================================================

#[test]
fn test_empty_query() {
    assert_eq!(sql(&query(Dialect::Oracle)), "select\n\t42\nfrom\n\tdual\n");
    assert_eq!(sql(&query(Dialect::Postgres)), "select\n\t42\n");
}

#[test]
fn test_statement_comment_is_escaped() {
    let q = query(Dialect::Oracle).with_comment("all */ people");
    assert!(sql(&q).starts_with("/* all * / people */\nselect\n"));
}

#[test]
fn test_select_none_with_source_comment() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(Node::none(), None).unwrap();
    assert_eq!(sql(&q), "select\n\tnull /* None */\nfrom\n\tdual\n");
}

#[test]
fn test_select_with_alias_and_hostile_source() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(Node::int(42).with_origin("/*bad*/", None), Some("answer"))
        .unwrap();
    assert_eq!(sql(&q), "select\n\t42 /* / *bad* / */ as answer\nfrom\n\tdual\n");
}

#[test]
fn test_invalid_alias() {
    let mut q = query(Dialect::Oracle);
    let result = q.select_vsql(Node::int(1), Some("x from dual --"));
    assert!(matches!(result, Err(CompileError::InvalidIdentifier(_))));
}

#[test]
fn test_select_expression_with_diagnostics() {
    let mut q = query(Dialect::Oracle);
    match q.select_vsql(Node::field("nope"), None) {
        Err(CompileError::Unresolved(reports)) => assert_eq!(reports[0].kind, DiagnosticKind::Field),
        other => panic!("expected Unresolved, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_from_and_raw_select() {
    let mut q = query(Dialect::Postgres);
    q.select_sql("p.id", Some("id")).unwrap();
    q.select_vsql(Node::field("name"), None).unwrap();
    q.from_sql("person", Some("p")).unwrap();
    assert_eq!(
        sql(&q),
        "select\n\tp.id as id,\n\tp.name /* name */\nfrom\n\tperson p\n"
    );
}

// ============================================================================
// Where Conditions
// ============================================================================

#[test]
fn test_single_condition() {
    let mut q = query(Dialect::Oracle);
    q.where_vsql(Node::binary(BinaryOp::Gt, Node::field("age"), Node::int(17)))
        .unwrap();
    assert!(sql(&q).ends_with("where\n\t(case when \"age\" > 17 then 1 else 0 end) = 1\n"));
}

#[test]
fn test_non_bool_condition_goes_through_bool() {
    let mut q = query(Dialect::Oracle);
    q.where_vsql(Node::field("age")).unwrap();
    assert!(sql(&q).ends_with("where\n\t(case when coalesce(\"age\", 0) <> 0 then 1 else 0 end) = 1\n"));
}

#[test]
fn test_several_conditions_are_parenthesized_and_deduplicated() {
    let mut q = query(Dialect::Oracle);
    q.where_sql("p.active = 1");
    q.where_vsql(Node::field("age")).unwrap();
    q.where_sql("p.active = 1");
    q.where_vsql(Node::field("age")).unwrap();
    assert!(sql(&q).ends_with(
        "where\n\t(p.active = 1) and\n\t((case when coalesce(\"age\", 0) <> 0 then 1 else 0 end) = 1)\n"
    ));
}

#[test]
fn test_aggregate_in_condition() {
    let mut q = query(Dialect::Oracle);
    match q.where_vsql(agg(AggregationKind::Sum, Node::field("price"))) {
        Err(CompileError::Unresolved(reports)) => {
            assert_eq!(reports[0].kind, DiagnosticKind::AggregateWhere)
        }
        other => panic!("expected Unresolved, got {:?}", other.map(|_| ())),
    }
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_group_adds_group_by() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(agg(AggregationKind::Group, Node::field("name")), None)
        .unwrap();
    q.select_vsql(agg(AggregationKind::Count, Node::field("age")), Some("n"))
        .unwrap();
    q.select_vsql(agg(AggregationKind::Group, Node::field("name")), Some("again"))
        .unwrap();

    assert!(q.is_aggregated());
    assert_eq!(
        sql(&q),
        "select\n\
         \tp.name /* group(name) */,\n\
         \tcount(\"age\") /* count(age) */ as n,\n\
         \tp.name /* group(name) */ as again\n\
         from\n\
         \tdual\n\
         group by\n\
         \tp.name\n"
    );
}

#[test]
fn test_mixed_aggregation_fails_query() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(agg(AggregationKind::Sum, Node::field("price")), None)
        .unwrap();
    let result = q.select_vsql(Node::field("age"), None);
    assert!(matches!(result, Err(CompileError::MixedAggregation { .. })));
}

#[test]
fn test_constants_fit_aggregated_query() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(Node::int(1), None).unwrap();
    q.select_vsql(agg(AggregationKind::Max, Node::field("age")), None)
        .unwrap();
    q.select_vsql(Node::str("x"), None).unwrap();
    assert!(q.is_aggregated());
}

#[test]
fn test_group_by_sql_after_row_level_select_fails() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(Node::field("age"), None).unwrap();
    let result = q.group_by_sql("p.dept");
    assert!(matches!(result, Err(CompileError::MixedAggregation { .. })));
}

#[test]
fn test_raw_select_after_group_by_fails() {
    let mut q = query(Dialect::Oracle);
    q.group_by_sql("p.dept").unwrap();
    assert!(q.is_aggregated());
    let result = q.select_sql("p.id", None);
    assert!(matches!(result, Err(CompileError::MixedAggregation { .. })));
}

#[test]
fn test_raw_select_in_aggregated_query_fails() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(agg(AggregationKind::Sum, Node::field("price")), None)
        .unwrap();
    let result = q.select_sql("p.id", None);
    assert!(matches!(result, Err(CompileError::MixedAggregation { .. })));
}

#[test]
fn test_group_by_vsql() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(agg(AggregationKind::Sum, Node::field("price")), Some("total"))
        .unwrap();
    q.group_by_vsql(Node::field("name")).unwrap();
    q.group_by_vsql(Node::field("name")).unwrap();
    assert_eq!(
        sql(&q),
        "select\n\tsum(\"price\") /* sum(price) */ as total\nfrom\n\tdual\ngroup by\n\tp.name\n"
    );

    let result = q.select_vsql(Node::field("age"), None);
    assert!(matches!(result, Err(CompileError::MixedAggregation { .. })));
}

#[test]
fn test_group_by_vsql_rejects_aggregates() {
    let mut q = query(Dialect::Oracle);
    match q.group_by_vsql(agg(AggregationKind::Max, Node::field("age"))) {
        Err(CompileError::Unresolved(reports)) => {
            assert_eq!(reports[0].kind, DiagnosticKind::AggregateNested)
        }
        other => panic!("expected Unresolved, got {:?}", other.map(|_| ())),
    }
}

// ============================================================================
// Joined Fields
// ============================================================================

#[test]
fn test_each_path_prefix_is_joined_once() {
    let mut q = joined_query();
    q.from_sql("person", Some("p")).unwrap();
    q.select_vsql(Node::field("dept.title"), None).unwrap();
    q.select_vsql(Node::field("dept.head.name"), None).unwrap();
    q.select_vsql(Node::field("dept.head.email"), None).unwrap();

    assert_eq!(
        sql(&q),
        "select\n\
         \tt2.title /* dept.title */,\n\
         \tt3.name /* dept.head.name */,\n\
         \tt3.\"email\" /* dept.head.email */\n\
         from\n\
         \tperson p,\n\
         \tdept t2,\n\
         \tperson t3\n\
         where\n\
         \t(p.dept_id = t2.id) and\n\
         \t(t2.head_id = t3.id)\n"
    );
}

#[test]
fn test_from_vsql_registers_the_join() {
    let mut q = joined_query();
    q.from_vsql("dept").unwrap();
    q.select_vsql(Node::field("dept.title"), None).unwrap();
    assert_eq!(
        sql(&q),
        "select\n\tt1.title /* dept.title */\nfrom\n\tdept t1\nwhere\n\tp.dept_id = t1.id\n"
    );
}

#[test]
fn test_from_vsql_needs_a_reference() {
    let mut q = joined_query();
    assert_eq!(
        q.from_vsql("age").map(|_| ()),
        Err(CompileError::NoReference("age".to_string()))
    );
    assert_eq!(
        q.from_vsql("nope").map(|_| ()),
        Err(CompileError::FieldUnknown("nope".to_string()))
    );
}

#[test]
fn test_group_without_table_is_not_joined() {
    let mut q = joined_query();
    q.select_vsql(Node::field("params.lang"), None).unwrap();
    assert_eq!(
        sql(&q),
        "select\n\tsys_context('app', 'lang') /* params.lang */\nfrom\n\tdual\n"
    );
}

#[test]
fn test_unknown_path_segment_is_a_diagnostic() {
    let mut q = joined_query();
    match q.select_vsql(Node::field("dept.budget"), None) {
        Err(CompileError::Unresolved(reports)) => assert_eq!(reports[0].kind, DiagnosticKind::Field),
        other => panic!("expected Unresolved, got {:?}", other.map(|_| ())),
    }
    assert_eq!(sql(&q), "select\n\t42\nfrom\n\tdual\n");
}

#[test]
fn test_joined_field_in_condition_and_order() {
    let mut q = joined_query();
    q.where_vsql(Node::binary(BinaryOp::Gt, Node::field("dept.head.age"), Node::str("x")))
        .unwrap();
    q.order_vsql(Node::field("dept.title"), Some(Direction::Asc), None)
        .unwrap();
    let text = sql(&q);
    assert!(text.contains("from\n\tdept t1,\n\tperson t2\n"));
    assert!(text.contains("\t(p.dept_id = t1.id) and\n\t(t1.head_id = t2.id) and\n"));
    assert!(text.ends_with("order by\n\tt1.title asc\n"));
}

// ============================================================================
// Ordering and Paging
// ============================================================================

#[test]
fn test_order_offset_limit() {
    let mut q = query(Dialect::Postgres);
    q.order_vsql(Node::field("age"), Some(Direction::Desc), Some(Nulls::Last))
        .unwrap();
    q.order_sql("p.id ASC");
    q.offset(10).limit(5);
    assert_eq!(
        sql(&q),
        "select\n\t42\norder by\n\t\"age\" desc nulls last,\n\tp.id asc\noffset 10 rows\nfetch next 5 rows only\n"
    );
}

#[test]
fn test_group_by_precedes_order_by() {
    let mut q = query(Dialect::Oracle);
    q.select_vsql(agg(AggregationKind::Group, Node::field("age")), None)
        .unwrap();
    q.order_sql("1");
    let text = sql(&q);
    assert!(text.find("group by").unwrap() < text.find("order by").unwrap());
}

// ============================================================================
// Bound Parameters
// ============================================================================

#[test]
fn test_parameters_follow_statement_order() {
    let ctx = QueryContext::new(schema(), Dialect::Oracle)
        .unwrap()
        .with_literal_mode(LiteralMode::Bind);
    let mut q = Query::new(ctx);
    q.where_vsql(Node::binary(BinaryOp::Eq, Node::field("name"), Node::str("b")))
        .unwrap();
    q.select_vsql(Node::str("a"), None).unwrap();

    let fragment = q.sql().unwrap();
    assert!(fragment.sql.find(":1").unwrap() < fragment.sql.find(":2").unwrap());
    assert_eq!(
        fragment.params,
        vec![Param::Str("a".to_string()), Param::Str("b".to_string())]
    );
}

#[test]
fn test_group_key_constants_are_inlined_in_bind_mode() {
    let ctx = QueryContext::new(schema(), Dialect::Postgres)
        .unwrap()
        .with_literal_mode(LiteralMode::Bind);
    let mut q = Query::new(ctx);
    let key = Node::binary(BinaryOp::Add, Node::field("name"), Node::str("x"));
    q.select_vsql(agg(AggregationKind::Group, key), None).unwrap();
    q.select_vsql(agg(AggregationKind::Count, Node::field("name")), None)
        .unwrap();
    q.where_vsql(Node::binary(BinaryOp::Eq, Node::field("name"), Node::str("b")))
        .unwrap();

    let fragment = q.sql().unwrap();
    assert!(fragment.sql.starts_with("select\n\t(p.name || 'x') /* "));
    assert!(fragment.sql.ends_with("group by\n\t(p.name || 'x')\n"));
    assert!(fragment.sql.contains("$1"));
    assert_eq!(fragment.params, vec![Param::Str("b".to_string())]);
}
