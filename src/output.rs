//! JSON conversion for runtime values.
//!
//! The host hands variables in as JSON and reads results back out as JSON;
//! these conversions keep the numeric kinds distinct where JSON can
//! express them and render dates as ISO text.

use serde_json::json;

use crate::coerce;
use crate::value::Value;

/// Convert a runtime value to JSON.
///
/// Decimals are rendered through their exact string form when they do not
/// fit a JSON number; dates become `YYYY-MM-DD HH:MM:SS` strings.
///
/// # Examples
///
/// ```
/// use vellum_expr::Value;
/// use vellum_expr::output::to_json;
///
/// assert_eq!(to_json(&Value::Integer(42)), serde_json::json!(42));
/// assert_eq!(
///     to_json(&Value::Collection(vec![Value::Boolean(true), Value::Null])),
///     serde_json::json!([true, null])
/// );
/// ```
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => json!(b),
        Value::Integer(n) => json!(n),
        Value::Long(n) => json!(n),
        Value::Double(n) => json!(n),
        Value::Decimal(d) => {
            let text = d.to_string();
            match text.parse::<serde_json::Number>() {
                Ok(number) => serde_json::Value::Number(number),
                Err(_) => serde_json::Value::String(text),
            }
        }
        Value::String(s) => json!(s),
        Value::Date(d) => json!(d.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Collection(items) => {
            serde_json::Value::Array(items.iter().map(to_json).collect())
        }
        Value::Node(node) => node.clone(),
    }
}

/// Wrap a JSON document as a runtime value.
///
/// Scalars convert directly; arrays and objects stay wrapped as structured
/// nodes so their leaves unwrap lazily during evaluation.
pub fn from_json(node: serde_json::Value) -> Value {
    match node {
        composite @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
            Value::Node(composite)
        }
        scalar => coerce::node_to_value(scalar),
    }
}
