//! Relational functions: `Min`/`Max` over loose values or collections,
//! and the `*Of` variants that apply a sub-expression to every element
//! before comparing.
//!
//! The null policies here are part of the compatibility contract: `Max`
//! aborts the whole computation to null as soon as any participant is
//! null, while `Min` ignores null participants and continues.

use std::cmp::Ordering;

use crate::ast::Expression;
use crate::coerce;
use crate::context::Context;
use crate::evaluator::{self, EvalError, Scope};
use crate::functions::{
    Arity, FunctionDef, FunctionRegistry, double_arg, eval_arg, flatten_args, items_of,
};
use crate::functions::math::sum_values;
use crate::value::Value;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.install(FunctionDef::new(
        "Max",
        Arity::AtLeast(1),
        |args, scope, context| {
            let values = flatten_args(args, scope, context)?;
            Ok(max_of(values.into_iter(), context))
        },
    ));

    registry.install(FunctionDef::new(
        "Min",
        Arity::AtLeast(1),
        |args, scope, context| {
            let values = flatten_args(args, scope, context)?;
            Ok(min_of(values.into_iter(), context))
        },
    ));

    registry.install(FunctionDef::new(
        "MaxOf",
        Arity::Exact(2),
        |args, scope, context| {
            let projected = project(args, scope, context)?;
            Ok(max_of(projected.into_iter(), context))
        },
    ));

    registry.install(FunctionDef::new(
        "MinOf",
        Arity::Exact(2),
        |args, scope, context| {
            let projected = project(args, scope, context)?;
            Ok(min_of(projected.into_iter(), context))
        },
    ));

    registry.install(FunctionDef::new(
        "SumOf",
        Arity::Exact(2),
        |args, scope, context| {
            let projected = project(args, scope, context)?;
            sum_values("SumOf", projected.into_iter(), context)
        },
    ));

    registry.install(FunctionDef::new(
        "AverageOf",
        Arity::Exact(2),
        |args, scope, context| {
            let projected = project(args, scope, context)?;
            if projected.is_empty() {
                return Ok(Value::Null);
            }
            let mut sum = 0.0;
            for value in &projected {
                if value.is_null() {
                    continue; // contributes zero, still counted
                }
                sum += double_arg("AverageOf", value)?;
            }
            Ok(Value::Double(sum / projected.len() as f64))
        },
    ));

    // Counts the elements whose projection is truthy
    registry.install(FunctionDef::new(
        "CountOf",
        Arity::Exact(2),
        |args, scope, context| {
            let projected = project(args, scope, context)?;
            let count = projected.iter().filter(|v| v.is_truthy()).count();
            Ok(Value::Integer(count as i32))
        },
    ));
}

/// Evaluate the second argument once per element of the first, with the
/// element bound as the current data
fn project(
    args: &[Expression],
    scope: &Scope,
    context: &Context,
) -> Result<Vec<Value>, EvalError> {
    let source = eval_arg(args, 0, scope, context)?;
    let items = items_of(source);
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let element_scope = scope.with_current(item, index);
        let value = evaluator::evaluate(&args[1], &element_scope, context)?;
        out.push(coerce::extract_primitive(value));
    }
    Ok(out)
}

/// Greatest participant; any null poisons the whole result to null
fn max_of(values: impl Iterator<Item = Value>, context: &Context) -> Value {
    let mut best: Option<Value> = None;
    for value in values {
        if value.is_null() {
            return Value::Null;
        }
        best = Some(match best {
            None => value,
            Some(current) => {
                if coerce::compare(&value, &current, context) == Ordering::Greater {
                    value
                } else {
                    current
                }
            }
        });
    }
    best.unwrap_or(Value::Null)
}

/// Smallest non-null participant; nulls are ignored
fn min_of(values: impl Iterator<Item = Value>, context: &Context) -> Value {
    let mut best: Option<Value> = None;
    for value in values {
        if value.is_null() {
            continue;
        }
        best = Some(match best {
            None => value,
            Some(current) => {
                if coerce::compare(&value, &current, context) == Ordering::Less {
                    value
                } else {
                    current
                }
            }
        });
    }
    best.unwrap_or(Value::Null)
}
