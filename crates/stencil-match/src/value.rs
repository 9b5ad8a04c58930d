//! Typed token values and the value types tokens convert to.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Parsed fields keyed by token name.
pub type Fields = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

/// A user supplied value type.
///
/// The pattern must accept every string produced by [`CustomType::to_text`],
/// and [`CustomType::from_text`] must accept every string the pattern matches.
pub trait CustomType: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Pattern used when a token of this type has no explicit pattern.
    fn base_pattern(&self) -> &str;

    fn description(&self) -> String {
        format!("Must be a {} value", self.name())
    }

    fn from_text(&self, text: &str) -> Option<Value>;

    fn to_text(&self, value: &Value) -> Option<String>;
}

#[derive(Debug, Clone)]
pub enum ValueType {
    Text,
    Int,
    Float,
    Custom(Arc<dyn CustomType>),
}

impl ValueType {
    pub fn name(&self) -> &str {
        match self {
            ValueType::Text => "str",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Custom(custom) => custom.name(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float)
    }

    /// Character class (without brackets) for the padding shorthand.
    pub(crate) fn char_class(&self) -> Option<&'static str> {
        match self {
            ValueType::Text => Some("a-zA-Z"),
            ValueType::Int => Some("0-9"),
            ValueType::Float => Some("0-9."),
            ValueType::Custom(_) => None,
        }
    }

    pub fn base_pattern(&self) -> &str {
        match self {
            ValueType::Text => "[a-zA-Z]+",
            ValueType::Int => "[0-9]+",
            ValueType::Float => r"[0-9]+(?:\.[0-9]+)?",
            ValueType::Custom(custom) => custom.base_pattern(),
        }
    }

    pub(crate) fn expected(&self) -> String {
        match self {
            ValueType::Text => "text".to_string(),
            ValueType::Int => "int".to_string(),
            ValueType::Float => "float".to_string(),
            ValueType::Custom(custom) => custom.name().to_string(),
        }
    }

    pub(crate) fn from_text(&self, text: &str) -> Option<Value> {
        match self {
            ValueType::Text => Some(Value::Text(text.to_string())),
            ValueType::Int => text.parse().ok().map(Value::Int),
            ValueType::Float => text.parse().ok().map(Value::Float),
            ValueType::Custom(custom) => custom.from_text(text),
        }
    }

    /// Unpadded text for a value, or `None` if the value has the wrong type.
    pub(crate) fn to_text(&self, value: &Value, precision: Option<usize>) -> Option<String> {
        match (self, value) {
            (ValueType::Text, Value::Text(s)) => Some(s.clone()),
            (ValueType::Int, Value::Int(n)) => Some(n.to_string()),
            (ValueType::Float, value) => {
                let n = value.as_float()?;
                Some(match precision {
                    Some(p) => format!("{:.*}", p, n),
                    None => n.to_string(),
                })
            }
            (ValueType::Custom(custom), value) => custom.to_text(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Hex;

    impl CustomType for Hex {
        fn name(&self) -> &str {
            "hex"
        }

        fn base_pattern(&self) -> &str {
            "[0-9a-f]+"
        }

        fn from_text(&self, text: &str) -> Option<Value> {
            i64::from_str_radix(text, 16).ok().map(Value::Int)
        }

        fn to_text(&self, value: &Value) -> Option<String> {
            value.as_int().map(|n| format!("{:x}", n))
        }
    }

    #[test]
    fn test_int_conversion_ignores_leading_zeros() {
        assert_eq!(ValueType::Int.from_text("007"), Some(Value::Int(7)));
        assert_eq!(ValueType::Int.from_text("7"), ValueType::Int.from_text("007"));
        assert_eq!(ValueType::Int.from_text("7a"), None);
    }

    #[test]
    fn test_float_accepts_ints() {
        assert_eq!(
            ValueType::Float.to_text(&Value::Int(2), Some(2)),
            Some("2.00".to_string())
        );
        assert_eq!(
            ValueType::Float.to_text(&Value::Float(1.5), None),
            Some("1.5".to_string())
        );
    }

    #[test]
    fn test_type_mismatch_yields_none() {
        assert_eq!(ValueType::Int.to_text(&Value::from("12"), None), None);
        assert_eq!(ValueType::Text.to_text(&Value::Int(12), None), None);
    }

    #[test]
    fn test_custom_type() {
        let hex = ValueType::Custom(Arc::new(Hex));
        assert_eq!(hex.name(), "hex");
        assert_eq!(hex.from_text("ff"), Some(Value::Int(255)));
        assert_eq!(hex.to_text(&Value::Int(255), None), Some("ff".to_string()));
        assert_eq!(hex.char_class(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::from(12).to_string(), "12");
        assert_eq!(Value::from(1.25).to_string(), "1.25");
    }
}
