use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// The runtime value exchanged between expression-tree nodes.
///
/// This type is a closed union over every value shape the language can
/// produce or consume, with numeric kinds kept distinct so arithmetic and
/// comparison can promote to the most precise participating type instead of
/// collapsing everything to a float.
///
/// # Type Precision
///
/// Comparison and mixed arithmetic resolve two operands to a single
/// "most precise" type, in this fixed priority order:
///
/// `Date > Decimal > Double > Long > Integer > Boolean > String`
///
/// Relational operators, equality, and the `Min`/`Max` family all depend on
/// this order.
///
/// # Examples
///
/// ```
/// use vellum_expr::Value;
///
/// // Scalar values
/// let null = Value::Null;
/// let boolean = Value::Boolean(true);
/// let integer = Value::Integer(42);
/// let double = Value::Double(3.14);
/// let string = Value::String("hello".to_string());
///
/// // An ordered collection
/// let coll = Value::Collection(vec![Value::Integer(1), Value::Integer(2)]);
///
/// // A structured JSON-like node, unwrapped lazily during evaluation
/// let node = Value::Node(serde_json::json!({"name": "Ava"}));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent / unknown value
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// 32-bit integer (the default integer literal type)
    Integer(i32),

    /// 64-bit integer
    Long(i64),

    /// Floating-point number
    Double(f64),

    /// High-precision decimal number
    Decimal(Decimal),

    /// UTF-8 string
    String(String),

    /// Date-time without timezone
    Date(NaiveDateTime),

    /// Ordered sequence of values
    Collection(Vec<Value>),

    /// Structured JSON-like node whose primitive leaves are unwrapped on demand
    Node(serde_json::Value),
}

impl Value {
    /// Check if the value is truthy (for conditions and logical operators).
    ///
    /// Null is falsy, numbers are truthy when non-zero, strings when
    /// non-empty (with `"true"`/`"false"` honored literally), collections
    /// when non-empty.
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Integer(n) => *n != 0,
            Long(n) => *n != 0,
            Double(n) => *n != 0.0,
            Decimal(d) => !d.is_zero(),
            String(s) => {
                if s.eq_ignore_ascii_case("true") {
                    true
                } else if s.eq_ignore_ascii_case("false") {
                    false
                } else {
                    !s.is_empty()
                }
            }
            Date(_) => true,
            Collection(items) => !items.is_empty(),
            Node(node) => match node {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
                serde_json::Value::String(s) => !s.is_empty(),
                serde_json::Value::Array(items) => !items.is_empty(),
                serde_json::Value::Object(map) => !map.is_empty(),
            },
        }
    }

    /// Get as float, when the value is numeric
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Integer(n) => Some(*n as f64),
            Value::Long(n) => Some(*n as f64),
            Value::Double(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Get as a 64-bit integer, when the value is numeric
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Boolean(b) => Some(*b as i64),
            Value::Integer(n) => Some(*n as i64),
            Value::Long(n) => Some(*n),
            Value::Double(n) => Some(n.round() as i64),
            Value::Decimal(d) => d.round().to_i64(),
            _ => None,
        }
    }

    /// Render the value as display text (string conversion and concatenation)
    pub fn display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Long(n) => n.to_string(),
            Value::Double(n) => n.to_string(),
            Value::Decimal(d) => d.to_string(),
            Value::String(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Collection(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.display_string()).collect();
                parts.join(", ")
            }
            Value::Node(node) => match node {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }

    /// Human-readable type name, used by `TypeOf` and error messages
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Integer(_) => "Integer",
            Value::Long(_) => "Long",
            Value::Double(_) => "Double",
            Value::Decimal(_) => "Decimal",
            Value::String(_) => "String",
            Value::Date(_) => "DateTime",
            Value::Collection(_) => "Collection",
            Value::Node(_) => "Node",
        }
    }

    /// True for the null value, including a structured node holding JSON null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null) || matches!(self, Value::Node(serde_json::Value::Null))
    }
}
