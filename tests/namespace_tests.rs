use vsql::ast::Node;
use vsql::namespace::{Constructor, Lookup, Namespace};
use vsql::{AggregationKind, CompileError, Dialect, QueryContext, Schema};

fn call(name: &str, args: Vec<Node>) -> Node {
    Namespace::global().call(name, args).unwrap().unwrap()
}

fn compile(node: &Node) -> String {
    let ctx = QueryContext::new(Schema::new(), Dialect::Oracle).unwrap();
    ctx.compile(node).unwrap().sql
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_lookup_builtins() {
    let ns = Namespace::global();
    assert_eq!(ns.lookup("today"), Lookup::Found(Constructor::Func("today")));
    assert_eq!(
        ns.lookup("sum"),
        Lookup::Found(Constructor::Aggregate(AggregationKind::Sum))
    );
    assert_eq!(ns.lookup("ifelse"), Lookup::Found(Constructor::IfElse));
}

#[test]
fn test_lookup_undefined() {
    assert_eq!(
        Namespace::global().lookup("TODAY"),
        Lookup::Undefined("TODAY".to_string())
    );
    assert_eq!(Namespace::global().call("nope", vec![]).unwrap(), None);
}

#[test]
fn test_names_are_sorted() {
    let names: Vec<&str> = Namespace::global().names().collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_operator_constructors() {
    let node = call("add", vec![Node::int(1), Node::int(2)]);
    assert_eq!(compile(&node), "(1 + 2)");

    let node = call("neg", vec![Node::int(3)]);
    assert_eq!(compile(&node), "(-3)");
}

#[test]
fn test_operator_arity_mismatch() {
    let result = Namespace::global().call("add", vec![Node::int(1)]);
    assert!(matches!(result, Err(CompileError::UnsupportedAstShape(_))));
}

#[test]
fn test_function_constructors() {
    assert_eq!(compile(&call("today", vec![])), "trunc(sysdate)");
    assert_eq!(compile(&call("upper", vec![Node::str("x")])), "upper('x')");
}

#[test]
fn test_malformed_aggregate_surfaces_at_validation() {
    let node = call("count", vec![]);
    let ctx = QueryContext::new(Schema::new(), Dialect::Oracle).unwrap();
    assert!(matches!(
        ctx.validate(&node),
        Err(CompileError::MalformedAggregation { arity: 0, .. })
    ));
}

#[test]
fn test_concurrent_lookups() {
    let handles: Vec<_> = (0..4)
        .map(|_| std::thread::spawn(|| Namespace::global().names().count()))
        .collect();
    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(counts.windows(2).all(|w| w[0] == w[1]));
}
