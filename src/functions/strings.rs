//! String functions, including the regex family.

use regex::Regex;

use crate::evaluator::EvalError;
use crate::functions::{
    Arity, FunctionDef, FunctionRegistry, eval_arg, flatten_args, long_arg, string_arg,
    too_many_args,
};
use crate::value::Value;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.install(FunctionDef::new(
        "Concat",
        Arity::AtLeast(1),
        |args, scope, context| {
            let values = flatten_args(args, scope, context)?;
            let mut out = String::new();
            for value in values {
                out.push_str(&value.display_string());
            }
            Ok(Value::String(out))
        },
    ));

    install_pair(registry, "Contains", |haystack, needle| {
        Value::Boolean(haystack.contains(needle))
    });
    install_pair(registry, "StartsWith", |haystack, needle| {
        Value::Boolean(haystack.starts_with(needle))
    });
    install_pair(registry, "EndsWith", |haystack, needle| {
        Value::Boolean(haystack.ends_with(needle))
    });

    install_pair(registry, "IndexOf", |haystack, needle| {
        match haystack.find(needle) {
            Some(byte_offset) => Value::Integer(haystack[..byte_offset].chars().count() as i32),
            None => Value::Integer(-1),
        }
    });

    registry.install(FunctionDef::new(
        "Join",
        Arity::AtLeast(2),
        |args, scope, context| {
            let separator = eval_arg(args, 0, scope, context)?;
            let separator = string_arg(&separator).unwrap_or_default();
            let values = flatten_args(&args[1..], scope, context)?;
            let parts: Vec<String> = values
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| v.display_string())
                .collect();
            Ok(Value::String(parts.join(&separator)))
        },
    ));

    registry.install(FunctionDef::new(
        "Length",
        Arity::Exact(1),
        |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            let length = match &value {
                Value::Null => 0,
                Value::Collection(items) => items.len(),
                other => other.display_string().chars().count(),
            };
            Ok(Value::Integer(length as i32))
        },
    ));

    install_pad(registry, "PadLeft", true);
    install_pad(registry, "PadRight", false);

    registry.install(FunctionDef::new(
        "Replace",
        Arity::Exact(3),
        |args, scope, context| {
            let text = eval_arg(args, 0, scope, context)?;
            let from = eval_arg(args, 1, scope, context)?;
            let to = eval_arg(args, 2, scope, context)?;
            let (Some(text), Some(from)) = (string_arg(&text), string_arg(&from)) else {
                return Ok(Value::Null);
            };
            let to = string_arg(&to).unwrap_or_default();
            Ok(Value::String(text.replace(&from, &to)))
        },
    ));

    registry.install(FunctionDef::new(
        "Split",
        Arity::Exact(2),
        |args, scope, context| {
            let text = eval_arg(args, 0, scope, context)?;
            let separator = eval_arg(args, 1, scope, context)?;
            let (Some(text), Some(separator)) = (string_arg(&text), string_arg(&separator)) else {
                return Ok(Value::Null);
            };
            let parts: Vec<Value> = if separator.is_empty() {
                text.chars().map(|c| Value::String(c.to_string())).collect()
            } else {
                text.split(&separator)
                    .map(|p| Value::String(p.to_string()))
                    .collect()
            };
            Ok(Value::Collection(parts))
        },
    ));

    registry.install(FunctionDef::new(
        "Substring",
        Arity::AtLeast(2),
        |args, scope, context| {
            if args.len() > 3 {
                return Err(too_many_args("Substring", 3, args.len()));
            }
            let text = eval_arg(args, 0, scope, context)?;
            let Some(text) = string_arg(&text) else {
                return Ok(Value::Null);
            };
            let chars: Vec<char> = text.chars().collect();

            let start = eval_arg(args, 1, scope, context)?;
            let start = long_arg("Substring", &start)?;
            if start < 0 || start as usize > chars.len() {
                return Err(out_of_range("Substring", start, chars.len()));
            }
            let start = start as usize;

            let end = if args.len() == 3 {
                let length = eval_arg(args, 2, scope, context)?;
                let length = long_arg("Substring", &length)?;
                if length < 0 || start + length as usize > chars.len() {
                    return Err(out_of_range("Substring", start as i64 + length, chars.len()));
                }
                start + length as usize
            } else {
                chars.len()
            };

            Ok(Value::String(chars[start..end].iter().collect()))
        },
    ));

    install_map(registry, "ToLower", |s| s.to_lowercase());
    install_map(registry, "ToUpper", |s| s.to_uppercase());
    install_map(registry, "Trim", |s| s.trim().to_string());
    install_map(registry, "TrimStart", |s| s.trim_start().to_string());
    install_map(registry, "TrimEnd", |s| s.trim_end().to_string());

    // Regex family
    registry.install(FunctionDef::new(
        "IsMatch",
        Arity::Exact(2),
        |args, scope, context| {
            let (input, pattern) = regex_args(args, scope, context)?;
            let (Some(input), Some(pattern)) = (input, pattern) else {
                return Ok(Value::Boolean(false));
            };
            Ok(Value::Boolean(pattern.is_match(&input)))
        },
    ));

    registry.install(FunctionDef::new(
        "Matches",
        Arity::Exact(2),
        |args, scope, context| {
            let (input, pattern) = regex_args(args, scope, context)?;
            let (Some(input), Some(pattern)) = (input, pattern) else {
                return Ok(Value::Collection(Vec::new()));
            };
            let found: Vec<Value> = pattern
                .find_iter(&input)
                .map(|m| Value::String(m.as_str().to_string()))
                .collect();
            Ok(Value::Collection(found))
        },
    ));

    registry.install(FunctionDef::new(
        "Regex",
        Arity::Exact(2),
        |args, scope, context| {
            let (input, pattern) = regex_args(args, scope, context)?;
            let (Some(input), Some(pattern)) = (input, pattern) else {
                return Ok(Value::Null);
            };
            match pattern.find(&input) {
                Some(m) => Ok(Value::String(m.as_str().to_string())),
                None => Ok(Value::Null),
            }
        },
    ));
}

fn out_of_range(function: &str, position: i64, length: usize) -> EvalError {
    EvalError::InvalidArgument {
        function: function.to_string(),
        detail: format!(
            "position {} is outside the string (length {})",
            position, length
        ),
    }
}

/// Two-string functions that pass nulls through
fn install_pair(
    registry: &mut FunctionRegistry,
    name: &'static str,
    apply: fn(&str, &str) -> Value,
) {
    registry.install(FunctionDef::new(
        name,
        Arity::Exact(2),
        move |args, scope, context| {
            let a = eval_arg(args, 0, scope, context)?;
            let b = eval_arg(args, 1, scope, context)?;
            match (string_arg(&a), string_arg(&b)) {
                (Some(a), Some(b)) => Ok(apply(&a, &b)),
                _ => Ok(Value::Null),
            }
        },
    ));
}

/// One-string transformations that pass nulls through
fn install_map(
    registry: &mut FunctionRegistry,
    name: &'static str,
    apply: fn(&str) -> String,
) {
    registry.install(FunctionDef::new(
        name,
        Arity::Exact(1),
        move |args, scope, context| {
            let value = eval_arg(args, 0, scope, context)?;
            match string_arg(&value) {
                Some(text) => Ok(Value::String(apply(&text))),
                None => Ok(Value::Null),
            }
        },
    ));
}

fn install_pad(registry: &mut FunctionRegistry, name: &'static str, left: bool) {
    registry.install(FunctionDef::new(
        name,
        Arity::AtLeast(2),
        move |args, scope, context| {
            if args.len() > 3 {
                return Err(too_many_args(name, 3, args.len()));
            }
            let text = eval_arg(args, 0, scope, context)?;
            let Some(text) = string_arg(&text) else {
                return Ok(Value::Null);
            };
            let width = eval_arg(args, 1, scope, context)?;
            let width = long_arg(name, &width)?.max(0) as usize;
            let pad = if args.len() == 3 {
                let pad = eval_arg(args, 2, scope, context)?;
                string_arg(&pad)
                    .and_then(|s| s.chars().next())
                    .unwrap_or(' ')
            } else {
                ' '
            };

            let current = text.chars().count();
            if current >= width {
                return Ok(Value::String(text));
            }
            let padding: String = std::iter::repeat(pad).take(width - current).collect();
            let padded = if left {
                format!("{}{}", padding, text)
            } else {
                format!("{}{}", text, padding)
            };
            Ok(Value::String(padded))
        },
    ));
}

fn regex_args(
    args: &[crate::ast::Expression],
    scope: &crate::evaluator::Scope,
    context: &crate::context::Context,
) -> Result<(Option<String>, Option<Regex>), EvalError> {
    let input = eval_arg(args, 0, scope, context)?;
    let pattern = eval_arg(args, 1, scope, context)?;
    let Some(pattern) = string_arg(&pattern) else {
        return Ok((string_arg(&input), None));
    };
    let compiled = Regex::new(&pattern).map_err(|err| EvalError::InvalidArgument {
        function: "Regex".to_string(),
        detail: format!("invalid pattern: {}", err),
    })?;
    Ok((string_arg(&input), Some(compiled)))
}
