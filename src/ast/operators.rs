/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation (`not`)
    Not,
    /// Arithmetic negation (`-`)
    Neg,
    /// Bitwise inversion (`~`)
    BitNot,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 3] = [UnaryOp::Not, UnaryOp::Neg, UnaryOp::BitNot];

    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "neg",
            UnaryOp::BitNot => "bitnot",
        }
    }

    /// Prefix used when rendering vSQL source
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "not ",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            UnaryOp::Not => "Logical negation",
            UnaryOp::Neg => "Arithmetic negation",
            UnaryOp::BitNot => "Bitwise not",
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            UnaryOp::Not => 4,
            UnaryOp::Neg | UnaryOp::BitNot => 12,
        }
    }

    pub fn from_name(name: &str) -> Option<UnaryOp> {
        UnaryOp::ALL.iter().copied().find(|op| op.name() == name)
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Sub,
    /// Multiplication (`*`)
    Mul,
    /// True division (`/`)
    TrueDiv,
    /// Floor division (`//`)
    FloorDiv,
    /// Modulo (`%`)
    Mod,

    // Comparison
    /// Equal (`==`)
    Eq,
    /// Not equal (`!=`)
    Ne,
    /// Less than (`<`)
    Lt,
    /// Less than or equal (`<=`)
    Le,
    /// Greater than (`>`)
    Gt,
    /// Greater than or equal (`>=`)
    Ge,

    // Logical
    /// Logical AND (`and`), returns one of its operands
    And,
    /// Logical OR (`or`), returns one of its operands
    Or,

    // Tests
    /// Containment (`in`)
    Contains,
    /// Inverted containment (`not in`)
    NotContains,
    /// Identity (`is`)
    Is,
    /// Inverted identity (`is not`)
    IsNot,

    /// Item access (`a[b]`)
    Item,

    // Bitwise
    /// Bitwise and (`&`)
    BitAnd,
    /// Bitwise or (`|`)
    BitOr,
    /// Bitwise exclusive or (`^`)
    BitXor,
    /// Left shift (`<<`)
    ShiftLeft,
    /// Right shift (`>>`)
    ShiftRight,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 24] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::TrueDiv,
        BinaryOp::FloorDiv,
        BinaryOp::Mod,
        BinaryOp::Eq,
        BinaryOp::Ne,
        BinaryOp::Lt,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Ge,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Contains,
        BinaryOp::NotContains,
        BinaryOp::Is,
        BinaryOp::IsNot,
        BinaryOp::Item,
        BinaryOp::BitAnd,
        BinaryOp::BitOr,
        BinaryOp::BitXor,
        BinaryOp::ShiftLeft,
        BinaryOp::ShiftRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::TrueDiv => "truediv",
            BinaryOp::FloorDiv => "floordiv",
            BinaryOp::Mod => "mod",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Contains => "contains",
            BinaryOp::NotContains => "notcontains",
            BinaryOp::Is => "is",
            BinaryOp::IsNot => "isnot",
            BinaryOp::Item => "item",
            BinaryOp::BitAnd => "bitand",
            BinaryOp::BitOr => "bitor",
            BinaryOp::BitXor => "bitxor",
            BinaryOp::ShiftLeft => "shiftleft",
            BinaryOp::ShiftRight => "shiftright",
        }
    }

    /// Infix operator used when rendering vSQL source.
    ///
    /// `Item` is rendered as `a[b]` and has no infix symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::TrueDiv => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Contains => "in",
            BinaryOp::NotContains => "not in",
            BinaryOp::Is => "is",
            BinaryOp::IsNot => "is not",
            BinaryOp::Item => "[]",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            BinaryOp::Add => "Addition",
            BinaryOp::Sub => "Subtraction",
            BinaryOp::Mul => "Multiplication",
            BinaryOp::TrueDiv => "True division",
            BinaryOp::FloorDiv => "Floor division",
            BinaryOp::Mod => "Modulo operation",
            BinaryOp::Eq => "Equality comparison",
            BinaryOp::Ne => "Inequality comparison",
            BinaryOp::Lt => "Less-than comparison",
            BinaryOp::Le => "Less-than-or-equal comparison",
            BinaryOp::Gt => "Greater-than comparison",
            BinaryOp::Ge => "Greater-than-or-equal comparison",
            BinaryOp::And => "Logical and",
            BinaryOp::Or => "Logical or",
            BinaryOp::Contains => "Containment test",
            BinaryOp::NotContains => "Inverted containment test",
            BinaryOp::Is => "Identity test",
            BinaryOp::IsNot => "Inverted identity test",
            BinaryOp::Item => "Item access",
            BinaryOp::BitAnd => "Bitwise and",
            BinaryOp::BitOr => "Bitwise or",
            BinaryOp::BitXor => "Bitwise exclusive or",
            BinaryOp::ShiftLeft => "Left shift",
            BinaryOp::ShiftRight => "Right shift",
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Contains
            | BinaryOp::NotContains
            | BinaryOp::Is
            | BinaryOp::IsNot => 5,
            BinaryOp::BitOr => 6,
            BinaryOp::BitXor => 7,
            BinaryOp::BitAnd => 8,
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight => 9,
            BinaryOp::Add | BinaryOp::Sub => 10,
            BinaryOp::Mul | BinaryOp::TrueDiv | BinaryOp::FloorDiv | BinaryOp::Mod => 11,
            BinaryOp::Item => 14,
        }
    }

    /// Comparisons chain in vSQL, so `(a < b) < c` must keep its parentheses
    pub fn is_comparison(self) -> bool {
        self.precedence() == 5
    }

    pub fn from_name(name: &str) -> Option<BinaryOp> {
        BinaryOp::ALL.iter().copied().find(|op| op.name() == name)
    }
}
