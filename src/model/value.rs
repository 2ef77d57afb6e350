//! Typed configuration values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Declared data type of a feature or property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Boolean,
    String,
    Numeric,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Boolean => "BOOLEAN",
            DataType::String => "STRING",
            DataType::Numeric => "NUMERIC",
        }
    }
}

/// A resolved feature or property value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Boolean(bool),
    Numeric(serde_json::Number),
    String(String),
}

impl ConfigValue {
    /// Converts a raw document value, checking it against the declared type.
    ///
    /// Returns `None` when the JSON value does not fit `data_type`.
    pub fn from_json(data_type: DataType, raw: &Value) -> Option<Self> {
        match (data_type, raw) {
            (DataType::Boolean, Value::Bool(b)) => Some(ConfigValue::Boolean(*b)),
            (DataType::Numeric, Value::Number(n)) => Some(ConfigValue::Numeric(n.clone())),
            (DataType::String, Value::String(s)) => Some(ConfigValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ConfigValue::Boolean(_) => DataType::Boolean,
            ConfigValue::Numeric(_) => DataType::Numeric,
            ConfigValue::String(_) => DataType::String,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Numeric(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Boolean(b) => write!(f, "{}", b),
            ConfigValue::Numeric(n) => write!(f, "{}", n),
            ConfigValue::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(n: i64) -> Self {
        ConfigValue::Numeric(n.into())
    }
}
