//! Recommended wire encodings for output ports.
//!
//! The engine does not own any serialization format; these descriptors are
//! what an output advertises to the service layer that will actually encode
//! its records. `encode_text`/`encode_json` are provided for logging and
//! simple consumers.

use crate::error::{ChainError, Result};
use crate::record::value::{Record, Value};
use serde::{Deserialize, Serialize};

/// Byte order for binary encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOrder {
    BigEndian,
    LittleEndian,
}

/// Encoding an output recommends for its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedEncoding {
    Text {
        token_separator: String,
        block_separator: String,
        decimal_separator: char,
    },
    Json,
    Binary {
        byte_order: ByteOrder,
    },
}

impl Default for RecommendedEncoding {
    fn default() -> Self {
        RecommendedEncoding::Text {
            token_separator: ",".to_string(),
            block_separator: "\n".to_string(),
            decimal_separator: '.',
        }
    }
}

impl RecommendedEncoding {
    /// Render a record as text tokens using this encoding's separators.
    ///
    /// JSON and binary encodings fall back to the default text separators.
    pub fn encode_text(&self, record: &Record) -> String {
        let (token, block, decimal) = match self {
            RecommendedEncoding::Text {
                token_separator,
                block_separator,
                decimal_separator,
            } => (token_separator.as_str(), block_separator.as_str(), *decimal_separator),
            _ => (",", "\n", '.'),
        };

        let mut tokens = Vec::new();
        flatten(record.value(), decimal, &mut tokens);
        let mut out = tokens.join(token);
        out.push_str(block);
        out
    }

    /// Render a record as JSON.
    pub fn encode_json(record: &Record) -> Result<String> {
        serde_json::to_string(record)
            .map_err(|e| ChainError::Transform(format!("JSON encoding failed: {}", e)))
    }
}

fn flatten(value: &Value, decimal: char, out: &mut Vec<String>) {
    let number = |v: f64| {
        let s = v.to_string();
        if decimal == '.' {
            s
        } else {
            s.replace('.', &decimal.to_string())
        }
    };

    match value {
        Value::Boolean(b) => out.push(b.to_string()),
        Value::Count(c) => out.push(c.to_string()),
        Value::Quantity(v) | Value::Time(v) => out.push(number(*v)),
        Value::Category(s) | Value::Text(s) => out.push(s.clone()),
        Value::Vector(v) => out.extend(v.iter().map(|x| number(*x))),
        Value::Array(items) => {
            // Variable-size arrays carry their element count first.
            out.push(items.len().to_string());
            for item in items {
                flatten(item, decimal, out);
            }
        }
        Value::Choice { item, value } => {
            out.push(item.clone());
            flatten(value, decimal, out);
        }
        Value::Record(fields) => {
            for (_, v) in fields {
                flatten(v, decimal, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_text_encoding() {
        let record = Record::new(Value::Record(vec![
            ("time".into(), Value::Time(10.0)),
            ("temp".into(), Value::Quantity(21.5)),
            ("ok".into(), Value::Boolean(true)),
        ]));
        assert_eq!(RecommendedEncoding::default().encode_text(&record), "10,21.5,true\n");
    }

    #[test]
    fn test_custom_separators() {
        let encoding = RecommendedEncoding::Text {
            token_separator: ";".into(),
            block_separator: "|".into(),
            decimal_separator: ',',
        };
        let record = Record::vector(vec![1.5, 2.0]);
        assert_eq!(encoding.encode_text(&record), "1,5;2|");
    }

    #[test]
    fn test_json_encoding() {
        let json = RecommendedEncoding::encode_json(&Record::boolean(false)).unwrap();
        assert_eq!(json, r#"{"Boolean":false}"#);
    }
}
