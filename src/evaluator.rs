use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::coerce;
use crate::context::Context;
use crate::functions::Arity;
use crate::value::Value;

/// The variable mapping supplied by the host for one evaluation.
pub type Variables = HashMap<String, Value>;

/// Evaluation scope: the active variable mapping plus the current element
/// binding used by per-element sub-expressions (`.price`).
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    variables: &'a Variables,
    current: Option<&'a Value>,
    index: Option<usize>,
}

impl<'a> Scope<'a> {
    pub fn new(variables: &'a Variables) -> Self {
        Scope {
            variables,
            current: None,
            index: None,
        }
    }

    /// A child scope with `value` bound as the current element
    pub fn with_current<'b>(&self, value: &'b Value, index: usize) -> Scope<'b>
    where
        'a: 'b,
    {
        Scope {
            variables: self.variables,
            current: Some(value),
            index: Some(index),
        }
    }

    pub fn variables(&self) -> &'a Variables {
        self.variables
    }

    pub fn current(&self) -> Option<&'a Value> {
        self.current
    }

    pub fn current_index(&self) -> Option<usize> {
        self.index
    }
}

/// Errors that can occur while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A binary or unary node's operand slot is structurally absent
    MissingParticipant { operator: String },

    /// A function was called with the wrong number of arguments
    ArityMismatch {
        function: String,
        expected: String,
        supplied: usize,
    },

    /// Integer index out of range, or key absent, on index access
    IndexOrKey { detail: String },

    /// The named function is not present in the registry
    UnknownFunction { name: String },

    /// An operation received operand types it cannot combine
    TypeMismatch { detail: String },

    /// Integer or decimal division or modulus by zero
    DivisionByZero,

    /// A function received an argument value it cannot work with
    InvalidArgument { function: String, detail: String },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::MissingParticipant { operator } => {
                write!(f, "Missing operand for operator '{}'", operator)
            }
            EvalError::ArityMismatch {
                function,
                expected,
                supplied,
            } => write!(
                f,
                "{}() expects {} argument(s), got {}",
                function, expected, supplied
            ),
            EvalError::IndexOrKey { detail } => write!(f, "Index or key error: {}", detail),
            EvalError::UnknownFunction { name } => {
                write!(f, "No function called '{}' is registered", name)
            }
            EvalError::TypeMismatch { detail } => write!(f, "Type mismatch: {}", detail),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
            EvalError::InvalidArgument { function, detail } => {
                write!(f, "{}(): {}", function, detail)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluate an expression tree node against the scope and context.
///
/// This is the single contract every node kind implements; no node mutates
/// shared state, so a compiled tree can be evaluated concurrently against
/// distinct variable mappings.
pub fn evaluate(expr: &Expression, scope: &Scope, context: &Context) -> Result<Value, EvalError> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Variable(name) => Ok(lookup_variable(name, scope, context)),
        Expression::CurrentData => Ok(scope.current().cloned().unwrap_or(Value::Null)),
        Expression::Property { object, name } => {
            let value = evaluate(object, scope, context)?;
            get_property(&value, name, context)
        }
        Expression::Index { object, index } => {
            let value = evaluate(object, scope, context)?;
            let key = evaluate(index, scope, context)?;
            get_index(&value, &key)
        }
        Expression::Collection(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(evaluate(item, scope, context)?);
            }
            Ok(Value::Collection(values))
        }
        Expression::Unary { op, operand } => {
            let operand = operand.as_deref().ok_or(EvalError::MissingParticipant {
                operator: "!".to_string(),
            })?;
            let value = evaluate(operand, scope, context)?;
            match op {
                UnaryOp::Not => {
                    if value.is_null() {
                        Ok(Value::Null)
                    } else {
                        Ok(Value::Boolean(!value.is_truthy()))
                    }
                }
            }
        }
        Expression::Binary { op, left, right } => eval_binary(*op, left, right, scope, context),
        Expression::Call { name, args } => eval_call(name, args, scope, context),
    }
}

/// Variable lookup honoring the context case rule; missing names are null
fn lookup_variable(name: &str, scope: &Scope, context: &Context) -> Value {
    if let Some(value) = scope.variables().get(name) {
        return value.clone();
    }
    if context.parsing_ignore_case() {
        for (key, value) in scope.variables() {
            if key.eq_ignore_ascii_case(name) {
                return value.clone();
            }
        }
    }
    Value::Null
}

fn get_property(value: &Value, name: &str, context: &Context) -> Result<Value, EvalError> {
    match value {
        Value::Null | Value::Node(serde_json::Value::Null) => Ok(Value::Null),
        Value::Node(serde_json::Value::Object(map)) => {
            if let Some(found) = map.get(name) {
                return Ok(coerce::extract_primitive(Value::Node(found.clone())));
            }
            if context.parsing_ignore_case() {
                for (key, found) in map {
                    if key.eq_ignore_ascii_case(name) {
                        return Ok(coerce::extract_primitive(Value::Node(found.clone())));
                    }
                }
            }
            // Absent properties follow the variable-lookup policy
            Ok(Value::Null)
        }
        // Property access distributes over a collection of nodes
        Value::Collection(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(get_property(item, name, context)?);
            }
            Ok(Value::Collection(out))
        }
        Value::Node(serde_json::Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(get_property(&Value::Node(item.clone()), name, context)?);
            }
            Ok(Value::Collection(out))
        }
        other => Err(EvalError::IndexOrKey {
            detail: format!("cannot read property '{}' of a {}", name, other.type_label()),
        }),
    }
}

fn get_index(value: &Value, key: &Value) -> Result<Value, EvalError> {
    let key = coerce::extract_primitive(key.clone());

    match value {
        Value::Collection(items) => index_into(items.len(), &key)
            .map(|i| coerce::extract_primitive(items[i].clone())),
        Value::Node(serde_json::Value::Array(items)) => index_into(items.len(), &key)
            .map(|i| coerce::extract_primitive(Value::Node(items[i].clone()))),
        Value::Node(serde_json::Value::Object(map)) => {
            let name = key.display_string();
            map.get(&name)
                .map(|found| coerce::extract_primitive(Value::Node(found.clone())))
                .ok_or_else(|| EvalError::IndexOrKey {
                    detail: format!("no key '{}' in node", name),
                })
        }
        other => Err(EvalError::IndexOrKey {
            detail: format!("cannot index into a {}", other.type_label()),
        }),
    }
}

fn index_into(len: usize, key: &Value) -> Result<usize, EvalError> {
    let index = key.as_long().ok_or_else(|| EvalError::IndexOrKey {
        detail: format!("'{}' is not a valid index", key.display_string()),
    })?;
    if index < 0 || index as usize >= len {
        return Err(EvalError::IndexOrKey {
            detail: format!("index {} out of range (length {})", index, len),
        });
    }
    Ok(index as usize)
}

fn eval_binary(
    op: BinaryOp,
    left: &Option<Box<Expression>>,
    right: &Option<Box<Expression>>,
    scope: &Scope,
    context: &Context,
) -> Result<Value, EvalError> {
    let missing = || EvalError::MissingParticipant {
        operator: op.symbol().to_string(),
    };
    let left = left.as_deref().ok_or_else(missing)?;
    let right = right.as_deref().ok_or_else(missing)?;

    match op {
        BinaryOp::And => {
            let left = evaluate(left, scope, context)?;
            if !left.is_truthy() {
                return Ok(Value::Boolean(false));
            }
            let right = evaluate(right, scope, context)?;
            Ok(Value::Boolean(right.is_truthy()))
        }
        BinaryOp::Or => {
            let left = evaluate(left, scope, context)?;
            if left.is_truthy() {
                return Ok(Value::Boolean(true));
            }
            let right = evaluate(right, scope, context)?;
            Ok(Value::Boolean(right.is_truthy()))
        }
        BinaryOp::NullCoalesce => {
            let left = evaluate(left, scope, context)?;
            if left.is_null() {
                evaluate(right, scope, context)
            } else {
                Ok(left)
            }
        }
        BinaryOp::Equal | BinaryOp::NotEqual => {
            // The equality operators alone convert an absent-operand failure
            // on the left side into a null operand.
            let left = match evaluate(left, scope, context) {
                Ok(value) => value,
                Err(EvalError::IndexOrKey { .. }) => Value::Null,
                Err(other) => return Err(other),
            };
            let right = evaluate(right, scope, context)?;
            broadcast(op, left, right, context)
        }
        _ => {
            let left = evaluate(left, scope, context)?;
            let right = evaluate(right, scope, context)?;
            broadcast(op, left, right, context)
        }
    }
}

/// Materialize a collection operand into an element list; scalars give None
fn collection_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Collection(items) => Some(items.clone()),
        Value::Node(serde_json::Value::Array(items)) => {
            Some(items.iter().cloned().map(Value::Node).collect())
        }
        _ => None,
    }
}

/// Element-wise application of a binary operator across collection
/// operands:
///
/// - scalar ∘ scalar applies directly
/// - equal-length collections combine pairwise
/// - a scalar broadcasts against every element of the other side
/// - collections of different length have no defined combination: null
fn broadcast(op: BinaryOp, left: Value, right: Value, context: &Context) -> Result<Value, EvalError> {
    match (collection_items(&left), collection_items(&right)) {
        (None, None) => apply_scalar(op, left, right, context),
        (Some(ls), Some(rs)) => {
            if ls.len() != rs.len() {
                return Ok(Value::Null);
            }
            let mut out = Vec::with_capacity(ls.len());
            for (l, r) in ls.into_iter().zip(rs) {
                out.push(apply_scalar(op, l, r, context)?);
            }
            Ok(Value::Collection(out))
        }
        (Some(ls), None) => {
            let mut out = Vec::with_capacity(ls.len());
            for l in ls {
                out.push(apply_scalar(op, l, right.clone(), context)?);
            }
            Ok(Value::Collection(out))
        }
        (None, Some(rs)) => {
            let mut out = Vec::with_capacity(rs.len());
            for r in rs {
                out.push(apply_scalar(op, left.clone(), r, context)?);
            }
            Ok(Value::Collection(out))
        }
    }
}

/// Combine two scalar operands.
///
/// Exposed within the crate so aggregate builtins (`Sum`, `SumOf`) reuse
/// the exact operator semantics.
pub(crate) fn apply_scalar(
    op: BinaryOp,
    left: Value,
    right: Value,
    context: &Context,
) -> Result<Value, EvalError> {
    let left = coerce::extract_primitive(left);
    let right = coerce::extract_primitive(right);

    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulus => arithmetic(op, left, right),
        BinaryOp::BitwiseAnd
        | BinaryOp::BitwiseOr
        | BinaryOp::BitwiseXor
        | BinaryOp::LeftShift
        | BinaryOp::RightShift => bitwise(op, left, right),
        BinaryOp::LessThan => relational(left, right, context, |o| o == Ordering::Less),
        BinaryOp::LessThanOrEqual => relational(left, right, context, |o| o != Ordering::Greater),
        BinaryOp::GreaterThan => relational(left, right, context, |o| o == Ordering::Greater),
        BinaryOp::GreaterThanOrEqual => relational(left, right, context, |o| o != Ordering::Less),
        BinaryOp::Equal => Ok(Value::Boolean(
            coerce::compare(&left, &right, context) == Ordering::Equal,
        )),
        BinaryOp::NotEqual => Ok(Value::Boolean(
            coerce::compare(&left, &right, context) != Ordering::Equal,
        )),
        // Logical and coalescing operators never reach scalar combination
        BinaryOp::And | BinaryOp::Or | BinaryOp::NullCoalesce => Err(EvalError::TypeMismatch {
            detail: format!("operator '{}' cannot broadcast", op.symbol()),
        }),
    }
}

fn relational(
    left: Value,
    right: Value,
    context: &Context,
    accept: fn(Ordering) -> bool,
) -> Result<Value, EvalError> {
    Ok(Value::Boolean(accept(coerce::compare(
        &left, &right, context,
    ))))
}

fn arithmetic(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    // String concatenation wins for '+' when either side is text
    if op == BinaryOp::Add
        && (matches!(left, Value::String(_)) || matches!(right, Value::String(_)))
    {
        let mut out = left.display_string();
        out.push_str(&right.display_string());
        return Ok(Value::String(out));
    }

    let type_error = || EvalError::TypeMismatch {
        detail: format!(
            "cannot apply '{}' to {} and {}",
            op.symbol(),
            left.type_label(),
            right.type_label()
        ),
    };

    match promote_pair(&left, &right).ok_or_else(type_error)? {
        NumericPair::Integer(a, b) => integer_arithmetic(op, a as i64, b as i64),
        NumericPair::Long(a, b) => integer_arithmetic(op, a, b),
        NumericPair::Double(a, b) => double_arithmetic(op, a, b),
        NumericPair::Decimal(a, b) => decimal_arithmetic(op, a, b),
        NumericPair::Mixed(da, db, fa, fb) => {
            if matches!(op, BinaryOp::Divide | BinaryOp::Modulus) && db.is_zero() {
                // Keep IEEE semantics when a double participates
                return double_arithmetic(op, fa, fb);
            }
            match decimal_arithmetic(op, da, db)? {
                Value::Decimal(d) => match d.to_f64() {
                    Some(out) => Ok(Value::Double(out)),
                    None => double_arithmetic(op, fa, fb),
                },
                whole => Ok(whole),
            }
        }
    }
}

enum NumericPair {
    Integer(i32, i32),
    Long(i64, i64),
    Double(f64, f64),
    Decimal(Decimal, Decimal),
    /// An integral operand mixed with a double: computed exactly in
    /// decimal so whole results come back integral, rendered as a double
    /// otherwise
    Mixed(Decimal, Decimal, f64, f64),
}

/// Promote two numeric operands to their most precise common type.
///
/// A whole-and-float pair goes through decimal first so results that are
/// mathematically whole come back as integers instead of floats.
fn promote_pair(left: &Value, right: &Value) -> Option<NumericPair> {
    use Value::*;

    let pair = match (left, right) {
        (Integer(a), Integer(b)) => NumericPair::Integer(*a, *b),
        (Integer(a), Long(b)) => NumericPair::Long(*a as i64, *b),
        (Long(a), Integer(b)) => NumericPair::Long(*a, *b as i64),
        (Long(a), Long(b)) => NumericPair::Long(*a, *b),
        (Double(a), Double(b)) => NumericPair::Double(*a, *b),
        (Decimal(a), Decimal(b)) => NumericPair::Decimal(*a, *b),
        (Decimal(a), other) => NumericPair::Decimal(*a, coerce::to_decimal(other)?),
        (other, Decimal(b)) => NumericPair::Decimal(coerce::to_decimal(other)?, *b),
        (Double(a), other) => {
            let b = numeric_like(other)?;
            let fb = b.as_double()?;
            match (rust_decimal::Decimal::from_f64(*a), coerce::to_decimal(&b)) {
                (Some(da), Some(db)) => NumericPair::Mixed(da, db, *a, fb),
                _ => NumericPair::Double(*a, fb),
            }
        }
        (other, Double(b)) => {
            let a = numeric_like(other)?;
            let fa = a.as_double()?;
            match (coerce::to_decimal(&a), rust_decimal::Decimal::from_f64(*b)) {
                (Some(da), Some(db)) => NumericPair::Mixed(da, db, fa, *b),
                _ => NumericPair::Double(fa, *b),
            }
        }
        (Boolean(a), other) => return promote_pair(&Integer(*a as i32), other),
        (other, Boolean(b)) => return promote_pair(other, &Integer(*b as i32)),
        _ => return None,
    };
    Some(pair)
}

fn numeric_like(value: &Value) -> Option<Value> {
    match value {
        Value::Integer(_) | Value::Long(_) | Value::Double(_) | Value::Decimal(_) => {
            Some(value.clone())
        }
        Value::Boolean(b) => Some(Value::Integer(*b as i32)),
        _ => None,
    }
}

fn integer_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let out = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            // Exact division stays integral; otherwise fall through to float
            if a % b == 0 {
                Some(a / b)
            } else {
                return double_arithmetic(op, a as f64, b as f64);
            }
        }
        BinaryOp::Modulus => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Some(a % b)
        }
        _ => None,
    };
    match out {
        Some(n) => Ok(shrink_integer(n)),
        None => double_arithmetic(op, a as f64, b as f64),
    }
}

fn shrink_integer(n: i64) -> Value {
    match i32::try_from(n) {
        Ok(small) => Value::Integer(small),
        Err(_) => Value::Long(n),
    }
}

fn double_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let out = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Modulus => a % b,
        _ => {
            return Err(EvalError::TypeMismatch {
                detail: format!("'{}' is not an arithmetic operator", op.symbol()),
            });
        }
    };
    Ok(Value::Double(out))
}

fn decimal_arithmetic(op: BinaryOp, a: Decimal, b: Decimal) -> Result<Value, EvalError> {
    let out = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_div(b)
        }
        BinaryOp::Modulus => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a.checked_rem(b)
        }
        _ => None,
    };
    let out = out.ok_or(EvalError::TypeMismatch {
        detail: "decimal arithmetic overflow".to_string(),
    })?;

    // Whole results shrink back to integers
    if out.is_integer() {
        if let Some(n) = out.to_i64() {
            return Ok(shrink_integer(n));
        }
    }
    Ok(Value::Decimal(out))
}

fn bitwise(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    let integral = |value: &Value| match value {
        Value::Integer(_) | Value::Long(_) | Value::Boolean(_) => value.as_long(),
        _ => None,
    };
    let type_error = || EvalError::TypeMismatch {
        detail: format!(
            "'{}' requires integral operands, got {} and {}",
            op.symbol(),
            left.type_label(),
            right.type_label()
        ),
    };

    let a = integral(&left).ok_or_else(type_error)?;
    let b = integral(&right).ok_or_else(type_error)?;

    let out = match op {
        BinaryOp::BitwiseAnd => a & b,
        BinaryOp::BitwiseOr => a | b,
        BinaryOp::BitwiseXor => a ^ b,
        BinaryOp::LeftShift => a.wrapping_shl(b as u32 & 63),
        BinaryOp::RightShift => a.wrapping_shr(b as u32 & 63),
        _ => {
            return Err(EvalError::TypeMismatch {
                detail: format!("'{}' is not a bitwise operator", op.symbol()),
            });
        }
    };
    Ok(shrink_integer(out))
}

fn eval_call(
    name: &str,
    args: &[Expression],
    scope: &Scope,
    context: &Context,
) -> Result<Value, EvalError> {
    let def = context
        .functions()
        .get(name)
        .ok_or_else(|| EvalError::UnknownFunction {
            name: name.to_string(),
        })?;

    match def.arity() {
        Arity::Exact(n) if args.len() != n => {
            return Err(EvalError::ArityMismatch {
                function: def.name().to_string(),
                expected: format!("exactly {}", n),
                supplied: args.len(),
            });
        }
        Arity::AtLeast(n) if args.len() < n => {
            return Err(EvalError::ArityMismatch {
                function: def.name().to_string(),
                expected: format!("at least {}", n),
                supplied: args.len(),
            });
        }
        _ => {}
    }

    def.invoke(args, scope, context)
}
