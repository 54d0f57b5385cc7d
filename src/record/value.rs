//! Record data values.

use serde::{Deserialize, Serialize};

/// Data carried by one node of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Count(i64),
    Quantity(f64),
    Category(String),
    Text(String),
    /// Seconds since the Unix epoch.
    Time(f64),
    Vector(Vec<f64>),
    Array(Vec<Value>),
    Choice { item: String, value: Box<Value> },
    Record(Vec<(String, Value)>),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "Boolean",
            Value::Count(_) => "Count",
            Value::Quantity(_) => "Quantity",
            Value::Category(_) => "Category",
            Value::Text(_) => "Text",
            Value::Time(_) => "Time",
            Value::Vector(_) => "Vector",
            Value::Array(_) => "Array",
            Value::Choice { .. } => "Choice",
            Value::Record(_) => "Record",
        }
    }

    /// Numeric view of quantities, counts and times.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Quantity(v) | Value::Time(v) => Some(*v),
            Value::Count(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Count(v) => Some(*v),
            Value::Quantity(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) | Value::Category(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Look up a record field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Record(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// One structured measurement tuple flowing through a port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn boolean(v: bool) -> Self {
        Self(Value::Boolean(v))
    }

    pub fn count(v: i64) -> Self {
        Self(Value::Count(v))
    }

    pub fn quantity(v: f64) -> Self {
        Self(Value::Quantity(v))
    }

    pub fn text(v: impl Into<String>) -> Self {
        Self(Value::Text(v.into()))
    }

    pub fn category(v: impl Into<String>) -> Self {
        Self(Value::Category(v.into()))
    }

    pub fn vector(v: Vec<f64>) -> Self {
        Self(Value::Vector(v))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.0.as_bool()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<f64> for Record {
    fn from(v: f64) -> Self {
        Self::quantity(v)
    }
}

impl From<bool> for Record {
    fn from(v: bool) -> Self {
        Self::boolean(v)
    }
}

impl From<&str> for Record {
    fn from(v: &str) -> Self {
        Self::text(v)
    }
}
