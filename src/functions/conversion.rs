//! Conversion functions: `Bool`, `Date`, `Decimal`, `Double`, `Integer`,
//! `Long`, `String`, `TypeOf`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::coerce;
use crate::evaluator::EvalError;
use crate::functions::{
    Arity, FunctionDef, FunctionRegistry, eval_arg, string_arg, too_many_args,
};
use crate::value::Value;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    let bool_fn = FunctionDef::new("Bool", Arity::Exact(1), |args, scope, context| {
        let value = eval_arg(args, 0, scope, context)?;
        if value.is_null() {
            return Ok(Value::Boolean(false));
        }
        match coerce::to_boolean(&value) {
            Some(b) => Ok(Value::Boolean(b)),
            None => Ok(Value::Boolean(value.is_truthy())),
        }
    });
    registry.install(bool_fn.alias("Boolean"));
    registry.install(bool_fn);

    registry.install(FunctionDef::new(
        "Integer",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            let long = parse_integral("Integer", &value)?;
            i32::try_from(long)
                .map(Value::Integer)
                .map_err(|_| EvalError::InvalidArgument {
                    function: "Integer".to_string(),
                    detail: format!("{} does not fit a 32-bit integer", long),
                })
        },
    ));

    registry.install(FunctionDef::new(
        "Long",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            parse_integral("Long", &value).map(Value::Long)
        },
    ));

    registry.install(FunctionDef::new(
        "Double",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            coerce::to_double(&value)
                .map(Value::Double)
                .ok_or_else(|| invalid("Double", &value))
        },
    ));

    registry.install(FunctionDef::new(
        "Decimal",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            coerce::to_decimal(&value)
                .map(Value::Decimal)
                .ok_or_else(|| invalid("Decimal", &value))
        },
    ));

    registry.install(FunctionDef::new(
        "String",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            if value.is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::String(value.display_string()))
        },
    ));

    registry.install(FunctionDef::new(
        "Date",
        Arity::AtLeast(0),
        |args, scope, context| {
            match args.len() {
                0 => Ok(Value::Date(chrono::Local::now().naive_local())),
                1 => {
                    let value = eval_arg(args, 0, scope, context)?;
                    if value.is_null() {
                        return Ok(Value::Null);
                    }
                    match &value {
                        Value::Date(d) => Ok(Value::Date(*d)),
                        Value::String(s) => coerce::parse_date_string(s)
                            .map(Value::Date)
                            .ok_or_else(|| invalid("Date", &value)),
                        // A numeric argument is epoch milliseconds
                        other => {
                            let millis = other.as_long().ok_or_else(|| invalid("Date", other))?;
                            chrono::DateTime::from_timestamp_millis(millis)
                                .map(|d| Value::Date(d.naive_utc()))
                                .ok_or_else(|| invalid("Date", other))
                        }
                    }
                }
                2 => {
                    let value = eval_arg(args, 0, scope, context)?;
                    let format = eval_arg(args, 1, scope, context)?;
                    if value.is_null() {
                        return Ok(Value::Null);
                    }
                    let text = value.display_string();
                    let format = string_arg(&format).ok_or_else(|| invalid("Date", &format))?;
                    parse_with_format(&text, &format)
                        .map(Value::Date)
                        .ok_or_else(|| EvalError::InvalidArgument {
                            function: "Date".to_string(),
                            detail: format!("'{}' does not match the format '{}'", text, format),
                        })
                }
                more => Err(too_many_args("Date", 2, more)),
            }
        },
    ));

    registry.install(FunctionDef::new(
        "TypeOf",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            Ok(Value::String(value.type_label().to_string()))
        },
    ));
}

fn invalid(function: &str, value: &Value) -> EvalError {
    EvalError::InvalidArgument {
        function: function.to_string(),
        detail: format!(
            "cannot convert {} '{}'",
            value.type_label(),
            value.display_string()
        ),
    }
}

/// Integral parsing shared by `Integer` and `Long`: accepts numbers
/// (rounded half-to-even), booleans, and strings in decimal, `0x`, or
/// `0b` form
fn parse_integral(function: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16).ok()
            } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
                i64::from_str_radix(bin, 2).ok()
            } else {
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(coerce::round_half_even))
            };
            parsed.ok_or_else(|| invalid(function, value))
        }
        Value::Double(n) => Ok(coerce::round_half_even(*n)),
        other => other.as_long().ok_or_else(|| invalid(function, other)),
    }
}

fn parse_with_format(text: &str, format: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
        return Some(parsed);
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}
