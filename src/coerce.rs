//! Type coercion and cross-type comparison.
//!
//! Heterogeneous operands are reconciled by choosing the single most
//! precise of their two types (`Date > Decimal > Double > Long > Integer >
//! Boolean > String`) and converting both operands toward it before
//! comparing. Conversion failure in either direction falls back to ordinal
//! string comparison as a last resort, so `compare` is total.

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::context::Context;
use crate::value::Value;

/// Relative precision of a value's type, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypePriority {
    String,
    Boolean,
    Integer,
    Long,
    Double,
    Decimal,
    Date,
}

/// True for ordered sequences and structured array nodes; explicitly false
/// for strings, which are never iterated as character collections.
pub fn is_collection(value: &Value) -> bool {
    matches!(value, Value::Collection(_))
        || matches!(value, Value::Node(serde_json::Value::Array(_)))
}

/// Unwrap a structured node to the nearest primitive value. Arrays become
/// collections of node elements, objects stay wrapped, and every other
/// value passes through unchanged.
pub fn extract_primitive(value: Value) -> Value {
    match value {
        Value::Node(node) => node_to_value(node),
        other => other,
    }
}

/// Convert a JSON node into the runtime value model, one level deep
pub fn node_to_value(node: serde_json::Value) -> Value {
    match node {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if let Ok(small) = i32::try_from(i) {
                    Value::Integer(small)
                } else {
                    Value::Long(i)
                }
            } else {
                Value::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::Collection(items.into_iter().map(Value::Node).collect())
        }
        object @ serde_json::Value::Object(_) => Value::Node(object),
    }
}

/// The type priority of a primitive value, if it has one
pub fn priority_of(value: &Value) -> Option<TypePriority> {
    match value {
        Value::String(_) => Some(TypePriority::String),
        Value::Boolean(_) => Some(TypePriority::Boolean),
        Value::Integer(_) => Some(TypePriority::Integer),
        Value::Long(_) => Some(TypePriority::Long),
        Value::Double(_) => Some(TypePriority::Double),
        Value::Decimal(_) => Some(TypePriority::Decimal),
        Value::Date(_) => Some(TypePriority::Date),
        _ => None,
    }
}

/// Compare two values after coercing both toward their most precise common
/// type. Null is strictly less than any non-null value; two nulls compare
/// equal. String comparison uses the context's configured equality case
/// rule.
pub fn compare(a: &Value, b: &Value, context: &Context) -> Ordering {
    let a = extract_primitive(a.clone());
    let b = extract_primitive(b.clone());

    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    let target = match (priority_of(&a), priority_of(&b)) {
        (Some(pa), Some(pb)) => pa.max(pb),
        // Collections and object nodes have no priority; compare textually
        _ => return compare_strings(&a.display_string(), &b.display_string(), context),
    };

    match target {
        TypePriority::Date => match (to_date(&a), to_date(&b)) {
            (Some(da), Some(db)) => da.cmp(&db),
            _ => compare_strings(&a.display_string(), &b.display_string(), context),
        },
        TypePriority::Decimal => match (to_decimal(&a), to_decimal(&b)) {
            (Some(da), Some(db)) => da.cmp(&db),
            _ => compare_strings(&a.display_string(), &b.display_string(), context),
        },
        TypePriority::Double => match (to_double(&a), to_double(&b)) {
            (Some(da), Some(db)) => da
                .partial_cmp(&db)
                .unwrap_or_else(|| compare_strings(&a.display_string(), &b.display_string(), context)),
            _ => compare_strings(&a.display_string(), &b.display_string(), context),
        },
        TypePriority::Long | TypePriority::Integer => match (to_long(&a), to_long(&b)) {
            (Some(la), Some(lb)) => la.cmp(&lb),
            _ => compare_strings(&a.display_string(), &b.display_string(), context),
        },
        TypePriority::Boolean => match (to_boolean(&a), to_boolean(&b)) {
            (Some(ba), Some(bb)) => ba.cmp(&bb),
            _ => compare_strings(&a.display_string(), &b.display_string(), context),
        },
        TypePriority::String => {
            compare_strings(&a.display_string(), &b.display_string(), context)
        }
    }
}

fn compare_strings(a: &str, b: &str, context: &Context) -> Ordering {
    if context.equality_ignore_case() {
        a.to_lowercase().cmp(&b.to_lowercase())
    } else {
        a.cmp(b)
    }
}

/// Convert toward a date: dates pass through, strings are parsed against
/// the accepted literal formats
pub fn to_date(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Date(d) => Some(*d),
        Value::String(s) => parse_date_string(s),
        _ => None,
    }
}

/// Parse a date-time string against the accepted formats, most specific
/// first
pub fn parse_date_string(text: &str) -> Option<NaiveDateTime> {
    const DATE_TIME_FORMATS: [&str; 8] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d %B %Y"];

    let text = text.trim();
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(text, format) {
            return Some(parsed.and_time(NaiveTime::MIN));
        }
    }
    None
}

pub fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Boolean(b) => Some(Decimal::from(*b as i32)),
        Value::Integer(n) => Some(Decimal::from(*n)),
        Value::Long(n) => Some(Decimal::from(*n)),
        Value::Double(n) => Decimal::from_f64(*n),
        Value::Decimal(d) => Some(*d),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn to_double(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        other => other.as_double(),
    }
}

pub fn to_long(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(round_half_even))
        }
        other => other.as_long(),
    }
}

pub fn to_integer(value: &Value) -> Option<i32> {
    to_long(value).and_then(|n| i32::try_from(n).ok())
}

pub fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Integer(_) | Value::Long(_) | Value::Double(_) | Value::Decimal(_) => {
            Some(value.is_truthy())
        }
        Value::String(s) => {
            if s.eq_ignore_ascii_case("true") {
                Some(true)
            } else if s.eq_ignore_ascii_case("false") {
                Some(false)
            } else {
                s.trim().parse::<f64>().ok().map(|n| n != 0.0)
            }
        }
        _ => None,
    }
}

/// Round to the nearest integer, ties to even (the rounding the `Round`
/// builtin and integer conversions use)
pub fn round_half_even(value: f64) -> i64 {
    let floor = value.floor();
    let fraction = value - floor;
    if fraction > 0.5 {
        floor as i64 + 1
    } else if fraction < 0.5 {
        floor as i64
    } else {
        let low = floor as i64;
        if low % 2 == 0 { low } else { low + 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    #[test]
    fn test_null_orders_below_everything() {
        let context = Context::default();
        assert_eq!(
            compare(&Value::Null, &Value::Integer(-100), &context),
            Ordering::Less
        );
        assert_eq!(compare(&Value::Null, &Value::Null, &context), Ordering::Equal);
    }

    #[test]
    fn test_numeric_string_coerces_to_number() {
        let context = Context::default();
        assert_eq!(
            compare(&Value::String("10".into()), &Value::Integer(9), &context),
            Ordering::Greater
        );
    }

    #[test]
    fn test_unconvertible_falls_back_to_string() {
        let context = Context::default();
        // "abc" cannot become an integer, so both sides compare as text
        assert_eq!(
            compare(&Value::String("abc".into()), &Value::Integer(5), &context),
            Ordering::Greater
        );
    }

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(2.5), 2);
        assert_eq!(round_half_even(3.5), 4);
        assert_eq!(round_half_even(-2.5), -2);
        assert_eq!(round_half_even(2.6), 3);
    }
}
