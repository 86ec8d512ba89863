use serde::{Deserialize, Serialize};

/// A value bound to a positional placeholder in a compiled SQL fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Json(serde_json::Value),
    Null,
}

impl Value {
    /// Converts a raw filter operand into a bindable value.
    ///
    /// Scalars map onto their natural variant; arrays and objects are kept
    /// as JSON so the caller decides how to expand them.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            other => Value::Json(other.clone()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(v) => v.trim().parse::<f64>().ok(),
            Value::Boolean(_) => None,
            Value::Json(v) => v.as_f64(),
            Value::Null => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::String(v) => Some(v.clone()),
            Value::Boolean(v) => Some(v.to_string()),
            Value::Json(v) => match v {
                serde_json::Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            },
            Value::Null => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Int(v) => Some(*v != 0),
            Value::Float(v) => Some(*v != 0.0),
            Value::String(v) => match v.to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            Value::Boolean(v) => Some(*v),
            Value::Json(v) => v.as_bool(),
            Value::Null => None,
        }
    }

    /// True when the value reads as a finite floating-point number.
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some_and(f64::is_finite)
    }

    /// Numeric coercion used by range comparisons: strings that parse as
    /// numbers become `Int`/`Float`, everything else passes through.
    pub fn coerce_numeric(self) -> Value {
        match self {
            Value::String(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Value::Int(i)
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(f) if f.is_finite() => Value::Float(f),
                        _ => Value::String(s),
                    }
                }
            }
            other => other,
        }
    }

    /// Lossy conversion to the string form a JSON-extracted text value takes.
    pub fn into_text(self) -> Value {
        match self {
            Value::String(_) | Value::Null => self,
            other => other.as_string().map(Value::String).unwrap_or(Value::Null),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&json!(3)), Value::Int(3));
        assert_eq!(Value::from_json(&json!(2.5)), Value::Float(2.5));
        assert_eq!(Value::from_json(&json!("a")), Value::String("a".into()));
        assert_eq!(Value::from_json(&json!(true)), Value::Boolean(true));
        assert_eq!(Value::from_json(&json!(null)), Value::Null);
        assert_eq!(Value::from_json(&json!([1])), Value::Json(json!([1])));
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(Value::from("42").coerce_numeric(), Value::Int(42));
        assert_eq!(Value::from("4.5").coerce_numeric(), Value::Float(4.5));
        assert_eq!(
            Value::from("2024-01-01").coerce_numeric(),
            Value::String("2024-01-01".into())
        );
        assert_eq!(Value::Boolean(true).coerce_numeric(), Value::Boolean(true));
    }

    #[test]
    fn test_is_numeric() {
        assert!(Value::Int(2).is_numeric());
        assert!(Value::from(" 7.25 ").is_numeric());
        assert!(!Value::from("inf").is_numeric());
        assert!(!Value::from("type_1").is_numeric());
        assert!(!Value::Boolean(true).is_numeric());
        assert!(!Value::Null.is_numeric());
    }

    #[test]
    fn test_into_text() {
        assert_eq!(Value::Boolean(true).into_text(), Value::String("true".into()));
        assert_eq!(Value::Int(5).into_text(), Value::String("5".into()));
        assert_eq!(Value::Null.into_text(), Value::Null);
    }
}
