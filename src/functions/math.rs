//! Mathematical functions: trigonometry, rounding, logarithms, powers,
//! random numbers, the constants, and the `Sum`/`Count` aggregates.

use rand::Rng;

use crate::ast::BinaryOp;
use crate::coerce;
use crate::evaluator::{self, EvalError};
use crate::functions::{
    Arity, FunctionDef, FunctionRegistry, double_arg, eval_arg, flatten_args, long_arg,
    too_many_args,
};
use crate::value::Value;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    install_unary(registry, "Acos", f64::acos);
    install_unary(registry, "Asin", f64::asin);
    install_unary(registry, "Atan", f64::atan);
    install_unary(registry, "Cos", f64::cos);
    install_unary(registry, "Sin", f64::sin);
    install_unary(registry, "Tan", f64::tan);
    install_unary(registry, "Exp", f64::exp);
    install_unary(registry, "Sqrt", f64::sqrt);
    install_unary(registry, "Log10", f64::log10);
    install_unary(registry, "Deg", f64::to_degrees);
    install_unary(registry, "Rad", f64::to_radians);

    registry.install(FunctionDef::new(
        "Log",
        Arity::Exact(2),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            let base = eval_arg(args, 1, scope, context)?;
            if value.is_null() || base.is_null() {
                return Ok(Value::Null);
            }
            let value = double_arg("Log", &value)?;
            let base = double_arg("Log", &base)?;
            Ok(Value::Double(value.log(base)))
        },
    ));

    registry.install(FunctionDef::new(
        "Pow",
        Arity::Exact(2),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            let exponent = eval_arg(args, 1, scope, context)?;
            if value.is_null() || exponent.is_null() {
                return Ok(Value::Null);
            }
            let value = double_arg("Pow", &value)?;
            let exponent = double_arg("Pow", &exponent)?;
            Ok(Value::Double(value.powf(exponent)))
        },
    ));

    registry.install(FunctionDef::new(
        "IEEERemainder",
        Arity::Exact(2),
        |args, scope, context| {
            let x = eval_arg(args, 0, scope, context)?;
            let y = eval_arg(args, 1, scope, context)?;
            if x.is_null() || y.is_null() {
                return Ok(Value::Null);
            }
            let x = double_arg("IEEERemainder", &x)?;
            let y = double_arg("IEEERemainder", &y)?;
            Ok(Value::Double(x - y * (x / y).round_ties_even()))
        },
    ));

    registry.install(FunctionDef::new(
        "Abs",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            match value {
                Value::Null => Ok(Value::Null),
                Value::Integer(n) => Ok(Value::Integer(n.abs())),
                Value::Long(n) => Ok(Value::Long(n.abs())),
                Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
                other => Ok(Value::Double(double_arg("Abs", &other)?.abs())),
            }
        },
    ));

    install_rounding(registry, "Ceiling", f64::ceil, |d| d.ceil());
    install_rounding(registry, "Floor", f64::floor, |d| d.floor());
    install_rounding(registry, "Truncate", f64::trunc, |d| d.trunc());

    registry.install(FunctionDef::new(
        "Round",
        Arity::AtLeast(1),
        |args, scope, context| {
            if args.len() > 2 {
                return Err(too_many_args("Round", 2, args.len()));
            }
            let value = eval_arg(args, 0, scope, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let digits = if args.len() == 2 {
                let digits = eval_arg(args, 1, scope, context)?;
                long_arg("Round", &digits)? as u32
            } else {
                0
            };

            // Midpoints round to even, matching the decimal strategy
            match value {
                Value::Decimal(d) => Ok(shrink_decimal(d.round_dp(digits))),
                Value::Integer(_) | Value::Long(_) => Ok(value),
                other => {
                    let x = double_arg("Round", &other)?;
                    let scale = 10f64.powi(digits as i32);
                    Ok(Value::Double((x * scale).round_ties_even() / scale))
                }
            }
        },
    ));

    registry.install(FunctionDef::new(
        "Sign",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let x = double_arg("Sign", &value)?;
            let sign = if x > 0.0 {
                1
            } else if x < 0.0 {
                -1
            } else {
                0
            };
            Ok(Value::Integer(sign))
        },
    ));

    registry.install(FunctionDef::new(
        "Random",
        Arity::AtLeast(0),
        |args, scope, context| {
            let mut rng = rand::thread_rng();
            match args.len() {
                0 => Ok(Value::Double(rng.r#gen::<f64>())),
                1 => {
                    let max = eval_arg(args, 0, scope, context)?;
                    let max = long_arg("Random", &max)?;
                    if max <= 0 {
                        return Err(EvalError::InvalidArgument {
                            function: "Random".to_string(),
                            detail: "upper bound must be positive".to_string(),
                        });
                    }
                    Ok(Value::Long(rng.gen_range(0..max)))
                }
                2 => {
                    let min = eval_arg(args, 0, scope, context)?;
                    let max = eval_arg(args, 1, scope, context)?;
                    let min = long_arg("Random", &min)?;
                    let max = long_arg("Random", &max)?;
                    if min >= max {
                        return Err(EvalError::InvalidArgument {
                            function: "Random".to_string(),
                            detail: "lower bound must be below the upper bound".to_string(),
                        });
                    }
                    Ok(Value::Long(rng.gen_range(min..max)))
                }
                more => Err(too_many_args("Random", 2, more)),
            }
        },
    ));

    registry.install(FunctionDef::new("E", Arity::Exact(0), |_, _, _| {
        Ok(Value::Double(std::f64::consts::E))
    }));
    registry.install(FunctionDef::new("PI", Arity::Exact(0), |_, _, _| {
        Ok(Value::Double(std::f64::consts::PI))
    }));

    registry.install(FunctionDef::new(
        "Sum",
        Arity::AtLeast(1),
        |args, scope, context| {
            let values = flatten_args(args, scope, context)?;
            sum_values("Sum", values.into_iter(), context)
        },
    ));

    registry.install(FunctionDef::new(
        "Count",
        Arity::AtLeast(1),
        |args, scope, context| {
            let values = flatten_args(args, scope, context)?;
            // Null participants are skipped, not counted as zero
            let count = values.iter().filter(|v| !v.is_null()).count();
            Ok(Value::Integer(count as i32))
        },
    ));
}

fn install_unary(registry: &mut FunctionRegistry, name: &'static str, apply: fn(f64) -> f64) {
    registry.install(FunctionDef::new(
        name,
        Arity::Exact(1),
        move |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::Double(apply(double_arg(name, &value)?)))
        },
    ));
}

fn install_rounding(
    registry: &mut FunctionRegistry,
    name: &'static str,
    apply: fn(f64) -> f64,
    apply_decimal: fn(&rust_decimal::Decimal) -> rust_decimal::Decimal,
) {
    registry.install(FunctionDef::new(
        name,
        Arity::Exact(1),
        move |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            match value {
                Value::Null => Ok(Value::Null),
                Value::Integer(_) | Value::Long(_) => Ok(value),
                Value::Decimal(d) => Ok(shrink_decimal(apply_decimal(&d))),
                other => Ok(Value::Double(apply(double_arg(name, &other)?))),
            }
        },
    ));
}

/// Whole decimal results come back as integers, matching arithmetic
fn shrink_decimal(d: rust_decimal::Decimal) -> Value {
    use rust_decimal::prelude::ToPrimitive;
    if d.is_integer() {
        if let Some(n) = d.to_i64() {
            return match i32::try_from(n) {
                Ok(small) => Value::Integer(small),
                Err(_) => Value::Long(n),
            };
        }
    }
    Value::Decimal(d)
}

/// Shared aggregation for `Sum` and `SumOf`: nulls act as the additive
/// identity, and the accumulator keeps operator `+` semantics (so numeric
/// precision promotes exactly as it would in an expression)
pub(crate) fn sum_values(
    function: &str,
    values: impl Iterator<Item = Value>,
    context: &crate::context::Context,
) -> Result<Value, EvalError> {
    let mut acc = Value::Integer(0);
    for value in values {
        if value.is_null() {
            continue;
        }
        if coerce::to_double(&value).is_none() || matches!(value, Value::String(_)) {
            return Err(EvalError::InvalidArgument {
                function: function.to_string(),
                detail: format!("cannot sum a {}", value.type_label()),
            });
        }
        acc = evaluator::apply_scalar(BinaryOp::Add, acc, value, context)?;
    }
    Ok(acc)
}
