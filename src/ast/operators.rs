/// Binary operator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulus (`%`)
    Modulus,

    // Bitwise
    /// Bitwise AND (`&`)
    BitwiseAnd,
    /// Bitwise OR (`|`)
    BitwiseOr,
    /// Bitwise exclusive OR (`^`)
    BitwiseXor,
    /// Left shift (`<<`)
    LeftShift,
    /// Right shift (`>>`)
    RightShift,

    // Relational
    /// Less than (`<`)
    LessThan,
    /// Less than or equal (`<=`)
    LessThanOrEqual,
    /// Greater than (`>`)
    GreaterThan,
    /// Greater than or equal (`>=`)
    GreaterThanOrEqual,

    // Equality
    /// Equal (`==`, `=`)
    Equal,
    /// Not equal (`!=`, `<>`)
    NotEqual,

    // Logical
    /// Logical AND (`&&`, `and`), short-circuiting
    And,
    /// Logical OR (`||`, `or`), short-circuiting
    Or,

    // Conditional
    /// Null-coalescing (`??`)
    NullCoalesce,
}

impl BinaryOp {
    /// Canonical tag, used in error messages
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulus => "%",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::BitwiseXor => "^",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::NullCoalesce => "??",
        }
    }
}

/// Unary operator kinds.
///
/// Unary `-` and `+` do not appear here; the parser desugars them to binary
/// operations with a zero left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation (`!`, `not`)
    Not,
}
