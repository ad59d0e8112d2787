//! JSON interchange form of expression trees.
//!
//! ```json
//! {
//!     "nodetype": "binop_add",
//!     "source": "price + 1",
//!     "children": [
//!         {"nodetype": "field", "value": "price"},
//!         {"nodetype": "const_int", "value": 1}
//!     ]
//! }
//! ```
//!
//! Call nodes carry their name as `value`, aggregates their kind. Decimal
//! numbers are written as strings so that no precision is lost; both strings
//! and JSON numbers are accepted on input.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::{Map, Value as JsonValue, json};

use crate::aggregate::AggregationKind;
use crate::ast::{Expr, Node, NodeKind};
use crate::error::CompileError;
use crate::validator::Checked;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Decode a node from its JSON form
pub fn from_json(value: &JsonValue) -> Result<Node, CompileError> {
    let object = value
        .as_object()
        .ok_or_else(|| shape("expected a node object", value))?;
    let nodetype = object
        .get("nodetype")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| shape("node without nodetype", value))?;
    let kind = NodeKind::from_name(nodetype)
        .ok_or_else(|| CompileError::UnsupportedAstShape(format!("unknown node type '{}'", nodetype)))?;

    let children = match object.get("children") {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::Array(items)) => items.iter().map(from_json).collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(shape("children must be an array", other)),
    };
    let item = object.get("value").unwrap_or(&JsonValue::Null);

    let mut node = build(kind, item, children)?;
    if let Some(source) = object.get("source").and_then(JsonValue::as_str) {
        node = node.with_origin(source, span(object));
    }
    Ok(node)
}

pub fn from_json_str(text: &str) -> Result<Node, CompileError> {
    let value: JsonValue =
        serde_json::from_str(text).map_err(|e| CompileError::UnsupportedAstShape(e.to_string()))?;
    from_json(&value)
}

fn build(kind: NodeKind, value: &JsonValue, children: Vec<Node>) -> Result<Node, CompileError> {
    if kind.is_leaf() && !children.is_empty() {
        return Err(CompileError::UnsupportedAstShape(format!("{} node with children", kind)));
    }

    let node = match kind {
        NodeKind::ConstNone => Node::none(),
        NodeKind::ConstBool => Node::bool(value.as_bool().ok_or_else(|| shape("bool expected", value))?),
        NodeKind::ConstInt => Node::int(value.as_i64().ok_or_else(|| shape("integer expected", value))?),
        NodeKind::ConstNumber => Node::number(decimal(value)?),
        NodeKind::ConstStr => Node::str(text(value)?),
        NodeKind::ConstDate => {
            let date = NaiveDate::parse_from_str(text(value)?, DATE_FORMAT)
                .map_err(|e| shape(&format!("bad date ({})", e), value))?;
            Node::date(date)
        }
        NodeKind::ConstDateTime => {
            let datetime = NaiveDateTime::parse_from_str(text(value)?, DATETIME_FORMAT)
                .map_err(|e| shape(&format!("bad datetime ({})", e), value))?;
            Node::datetime(datetime)
        }
        NodeKind::Field => Node::field(text(value)?),
        NodeKind::Unary(op) => {
            let [operand] = operands(kind, children)?;
            Node::unary(op, operand)
        }
        NodeKind::Binary(op) => {
            let [left, right] = operands(kind, children)?;
            Node::binary(op, left, right)
        }
        NodeKind::IfElse => {
            let [then, cond, otherwise] = operands(kind, children)?;
            Node::if_else(then, cond, otherwise)
        }
        NodeKind::Func => Node::func(text(value)?, children),
        NodeKind::Meth => {
            let mut children = children.into_iter();
            let obj = children
                .next()
                .ok_or_else(|| CompileError::UnsupportedAstShape("meth node without object".to_string()))?;
            Node::meth(obj, text(value)?, children.collect())
        }
        NodeKind::Attr => {
            let [obj] = operands(kind, children)?;
            Node::attr(obj, text(value)?)
        }
        NodeKind::Aggregate => Node::aggregate(AggregationKind::from_str(text(value)?)?, children),
    };
    Ok(node)
}

fn operands<const N: usize>(kind: NodeKind, children: Vec<Node>) -> Result<[Node; N], CompileError> {
    <[Node; N]>::try_from(children).map_err(|children| {
        CompileError::UnsupportedAstShape(format!(
            "{} node needs {} children, got {}",
            kind,
            N,
            children.len()
        ))
    })
}

fn text(value: &JsonValue) -> Result<&str, CompileError> {
    value.as_str().ok_or_else(|| shape("string expected", value))
}

fn decimal(value: &JsonValue) -> Result<Decimal, CompileError> {
    let repr = match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        _ => return Err(shape("decimal expected", value)),
    };
    Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .map_err(|e| shape(&format!("bad decimal ({})", e), value))
}

fn span(object: &Map<String, JsonValue>) -> Option<std::ops::Range<usize>> {
    let bounds = object.get("span")?.as_array()?;
    match bounds.as_slice() {
        [start, end] => Some(start.as_u64()? as usize..end.as_u64()? as usize),
        _ => None,
    }
}

fn shape(message: &str, value: &JsonValue) -> CompileError {
    CompileError::UnsupportedAstShape(format!("{}: {}", message, value))
}

/// Encode a node, optionally annotated with its validation result
pub fn to_json(node: &Node, checked: Option<&Checked>) -> JsonValue {
    let mut object = Map::new();
    object.insert("nodetype".to_string(), json!(node.kind().to_string()));

    let value = match &node.expr {
        Expr::None => None,
        Expr::Bool(b) => Some(json!(b)),
        Expr::Int(n) => Some(json!(n)),
        Expr::Number(n) => Some(json!(n.to_string())),
        Expr::Unary { .. } | Expr::Binary { .. } | Expr::IfElse { .. } => None,
        _ => node.value().map(JsonValue::String),
    };
    if let Some(value) = value {
        object.insert("value".to_string(), value);
    }

    if let Some(origin) = &node.origin {
        object.insert("source".to_string(), json!(origin.source));
        if let Some(span) = &origin.span {
            object.insert("span".to_string(), json!([span.start, span.end]));
        }
    }

    if let Some(checked) = checked {
        if let Some(data_type) = checked.data_type() {
            object.insert("datatype".to_string(), json!(data_type.name()));
        }
        if let Some(diagnostic) = checked.diagnostic() {
            object.insert(
                "error".to_string(),
                json!({"kind": diagnostic.kind.as_str(), "message": diagnostic.message}),
            );
        }
    }

    let children: Vec<JsonValue> = node
        .children()
        .into_iter()
        .enumerate()
        .map(|(i, child)| to_json(child, checked.and_then(|c| c.children().get(i))))
        .collect();
    if !children.is_empty() {
        object.insert("children".to_string(), JsonValue::Array(children));
    }

    JsonValue::Object(object)
}
