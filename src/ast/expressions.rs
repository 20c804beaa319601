use crate::ast::{BinaryOp, UnaryOp};
use crate::value::Value;

/// A node in the compiled expression tree.
///
/// Nodes are immutable once built and own their children. Every node is
/// evaluated through the same contract (see [`crate::evaluator::evaluate`])
/// and a compiled tree may be re-evaluated against different variable
/// mappings, including concurrently.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant value parsed from a literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 'hello'
    /// #2024-01-15#
    /// null
    /// ```
    Literal(Value),

    /// Variable lookup by name against the supplied mapping.
    ///
    /// A missing name evaluates to null rather than failing.
    Variable(String),

    /// The current element reference (`.` prefix, or `this`).
    ///
    /// Bound by per-element functions such as `SumOf` and `SelectWhere`
    /// while they iterate a collection.
    CurrentData,

    /// Property access (`object.name`)
    Property {
        object: Box<Expression>,
        name: String,
    },

    /// Index access (`object[index]`): integer index into a collection or
    /// key lookup into a structured node
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },

    /// Collection literal
    ///
    /// # Example
    /// ```text
    /// [1, 2, 3]
    /// ```
    Collection(Vec<Expression>),

    /// Unary operation (`not`, `!`)
    ///
    /// The operand slot is optional so a structurally absent participant is
    /// representable; evaluating it fails with a missing-participant error.
    Unary {
        op: UnaryOp,
        operand: Option<Box<Expression>>,
    },

    /// Binary operation (arithmetic, bitwise, relational, logical).
    ///
    /// The left operand is evaluated eagerly; the right operand only inside
    /// the node's combination logic, which is what enables short-circuiting
    /// and the null-guard on the left side of equality.
    Binary {
        op: BinaryOp,
        left: Option<Box<Expression>>,
        right: Option<Box<Expression>>,
    },

    /// Function call. The callee is resolved by name in the function
    /// registry at evaluation time, so registrations made after parsing
    /// still take effect. Arguments are kept unevaluated.
    Call { name: String, args: Vec<Expression> },
}

impl Expression {
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
        Expression::Binary {
            op,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// Collect the names of all variables referenced anywhere in the tree
    pub fn collect_variables(&self, out: &mut Vec<String>) {
        match self {
            Expression::Variable(name) => {
                if !out.iter().any(|n| n == name) {
                    out.push(name.clone());
                }
            }
            Expression::Property { object, .. } => object.collect_variables(out),
            Expression::Index { object, index } => {
                object.collect_variables(out);
                index.collect_variables(out);
            }
            Expression::Collection(items) => {
                for item in items {
                    item.collect_variables(out);
                }
            }
            Expression::Unary { operand, .. } => {
                if let Some(operand) = operand {
                    operand.collect_variables(out);
                }
            }
            Expression::Binary { left, right, .. } => {
                if let Some(left) = left {
                    left.collect_variables(out);
                }
                if let Some(right) = right {
                    right.collect_variables(out);
                }
            }
            Expression::Call { args, .. } => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
            Expression::Literal(_) | Expression::CurrentData => {}
        }
    }
}
