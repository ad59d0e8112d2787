use crate::ast::{BinaryOp, UnaryOp};

/// Discriminator for the concrete node variant.
///
/// The string encoding is used by the JSON interchange format and by tooling
/// (`const_int`, `binop_add`, `unop_not`, `ternop_if`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    ConstNone,
    ConstBool,
    ConstInt,
    ConstNumber,
    ConstStr,
    ConstDate,
    ConstDateTime,
    Field,
    Unary(UnaryOp),
    Binary(BinaryOp),
    IfElse,
    Func,
    Meth,
    Attr,
    Aggregate,
}

impl NodeKind {
    /// Parse a kind from its encoding
    pub fn from_name(name: &str) -> Option<NodeKind> {
        let kind = match name {
            "const_none" => NodeKind::ConstNone,
            "const_bool" => NodeKind::ConstBool,
            "const_int" => NodeKind::ConstInt,
            "const_number" => NodeKind::ConstNumber,
            "const_str" => NodeKind::ConstStr,
            "const_date" => NodeKind::ConstDate,
            "const_datetime" => NodeKind::ConstDateTime,
            "field" => NodeKind::Field,
            "ternop_if" => NodeKind::IfElse,
            "func" => NodeKind::Func,
            "meth" => NodeKind::Meth,
            "attr" => NodeKind::Attr,
            "aggregate" => NodeKind::Aggregate,
            _ => {
                if let Some(op) = name.strip_prefix("unop_") {
                    return UnaryOp::from_name(op).map(NodeKind::Unary);
                }
                if let Some(op) = name.strip_prefix("binop_") {
                    return BinaryOp::from_name(op).map(NodeKind::Binary);
                }
                return None;
            }
        };
        Some(kind)
    }

    /// Whether nodes of this kind are leaves
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeKind::ConstNone
                | NodeKind::ConstBool
                | NodeKind::ConstInt
                | NodeKind::ConstNumber
                | NodeKind::ConstStr
                | NodeKind::ConstDate
                | NodeKind::ConstDateTime
                | NodeKind::Field
        )
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::ConstNone => write!(f, "const_none"),
            NodeKind::ConstBool => write!(f, "const_bool"),
            NodeKind::ConstInt => write!(f, "const_int"),
            NodeKind::ConstNumber => write!(f, "const_number"),
            NodeKind::ConstStr => write!(f, "const_str"),
            NodeKind::ConstDate => write!(f, "const_date"),
            NodeKind::ConstDateTime => write!(f, "const_datetime"),
            NodeKind::Field => write!(f, "field"),
            NodeKind::Unary(op) => write!(f, "unop_{}", op.name()),
            NodeKind::Binary(op) => write!(f, "binop_{}", op.name()),
            NodeKind::IfElse => write!(f, "ternop_if"),
            NodeKind::Func => write!(f, "func"),
            NodeKind::Meth => write!(f, "meth"),
            NodeKind::Attr => write!(f, "attr"),
            NodeKind::Aggregate => write!(f, "aggregate"),
        }
    }
}
