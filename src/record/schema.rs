//! Record schema tree.
//!
//! A schema is an immutable tree of named, typed fields. Descriptive
//! metadata (labels, definitions) rides along for consumers but never takes
//! part in compatibility checks.

use crate::error::{ChainError, Result};
use crate::record::value::{Record, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a scalar component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Boolean,
    Count,
    Quantity,
    Category,
    Text,
    Time,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Count => "Count",
            ScalarKind::Quantity => "Quantity",
            ScalarKind::Category => "Category",
            ScalarKind::Text => "Text",
            ScalarKind::Time => "Time",
        };
        f.write_str(name)
    }
}

/// A named child of a record or choice component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub component: DataComponent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, component: DataComponent) -> Self {
        Self {
            name: name.into(),
            component,
            label: None,
            definition: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }
}

/// One node of the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataComponent {
    Scalar {
        kind: ScalarKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uom: Option<String>,
    },
    Vector {
        coordinates: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uom: Option<String>,
    },
    Array {
        element: Box<DataComponent>,
        /// Fixed element count, `None` for variable size.
        size: Option<usize>,
    },
    Choice {
        items: Vec<Field>,
    },
    Record {
        fields: Vec<Field>,
    },
}

impl DataComponent {
    pub fn boolean() -> Self {
        Self::scalar(ScalarKind::Boolean, None)
    }

    pub fn count() -> Self {
        Self::scalar(ScalarKind::Count, None)
    }

    pub fn quantity(uom: Option<&str>) -> Self {
        Self::scalar(ScalarKind::Quantity, uom)
    }

    pub fn category() -> Self {
        Self::scalar(ScalarKind::Category, None)
    }

    pub fn text() -> Self {
        Self::scalar(ScalarKind::Text, None)
    }

    pub fn time() -> Self {
        Self::scalar(ScalarKind::Time, Some("s"))
    }

    pub fn scalar(kind: ScalarKind, uom: Option<&str>) -> Self {
        DataComponent::Scalar {
            kind,
            uom: uom.map(str::to_string),
        }
    }

    pub fn vector(coordinates: &[&str], uom: Option<&str>) -> Self {
        DataComponent::Vector {
            coordinates: coordinates.iter().map(|c| c.to_string()).collect(),
            uom: uom.map(str::to_string),
        }
    }

    pub fn array(element: DataComponent, size: Option<usize>) -> Self {
        DataComponent::Array {
            element: Box::new(element),
            size,
        }
    }

    pub fn record(fields: Vec<Field>) -> Self {
        DataComponent::Record { fields }
    }

    pub fn choice(items: Vec<Field>) -> Self {
        DataComponent::Choice { items }
    }

    /// Short structural description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            DataComponent::Scalar { kind, uom: Some(uom) } => format!("{}[{}]", kind, uom),
            DataComponent::Scalar { kind, uom: None } => kind.to_string(),
            DataComponent::Vector { coordinates, .. } => format!("Vector{}", coordinates.len()),
            DataComponent::Array { element, size } => match size {
                Some(n) => format!("Array<{}; {}>", element.describe(), n),
                None => format!("Array<{}>", element.describe()),
            },
            DataComponent::Choice { items } => format!("Choice({} items)", items.len()),
            DataComponent::Record { fields } => format!("Record({} fields)", fields.len()),
        }
    }

    /// Check that data produced as `producer` can be consumed as `self`.
    ///
    /// Returns the location and reason of the first mismatch.
    pub fn check_assignable_from(&self, producer: &DataComponent) -> std::result::Result<(), String> {
        self.check_assignable_at(producer, "")
    }

    fn check_assignable_at(
        &self,
        producer: &DataComponent,
        at: &str,
    ) -> std::result::Result<(), String> {
        let mismatch = || {
            format!(
                "{}expected {}, found {}",
                location(at),
                self.describe(),
                producer.describe()
            )
        };

        match (self, producer) {
            (
                DataComponent::Scalar { kind, uom },
                DataComponent::Scalar {
                    kind: p_kind,
                    uom: p_uom,
                },
            ) => {
                if kind != p_kind || !uom_compatible(uom, p_uom) {
                    return Err(mismatch());
                }
                Ok(())
            }
            (
                DataComponent::Vector { coordinates, uom },
                DataComponent::Vector {
                    coordinates: p_coords,
                    uom: p_uom,
                },
            ) => {
                if coordinates != p_coords || !uom_compatible(uom, p_uom) {
                    return Err(mismatch());
                }
                Ok(())
            }
            (
                DataComponent::Array { element, size },
                DataComponent::Array {
                    element: p_element,
                    size: p_size,
                },
            ) => {
                if let (Some(a), Some(b)) = (size, p_size) {
                    if a != b {
                        return Err(mismatch());
                    }
                }
                element.check_assignable_at(p_element, &join(at, "[]"))
            }
            (DataComponent::Choice { items }, DataComponent::Choice { items: p_items })
            | (DataComponent::Record { fields: items }, DataComponent::Record { fields: p_items }) => {
                if items.len() != p_items.len() {
                    return Err(mismatch());
                }
                for field in items {
                    let other = p_items
                        .iter()
                        .find(|f| f.name == field.name)
                        .ok_or_else(|| {
                            format!("{}missing field '{}'", location(at), field.name)
                        })?;
                    field
                        .component
                        .check_assignable_at(&other.component, &join(at, &field.name))?;
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }

    /// Check that `value` is an instance of this component.
    pub fn check_value(&self, value: &Value) -> std::result::Result<(), String> {
        self.check_value_at(value, "")
    }

    fn check_value_at(&self, value: &Value, at: &str) -> std::result::Result<(), String> {
        let mismatch = || {
            format!(
                "{}expected {}, found {}",
                location(at),
                self.describe(),
                value.kind_name()
            )
        };

        match (self, value) {
            (DataComponent::Scalar { kind, .. }, v) => {
                let ok = matches!(
                    (kind, v),
                    (ScalarKind::Boolean, Value::Boolean(_))
                        | (ScalarKind::Count, Value::Count(_))
                        | (ScalarKind::Quantity, Value::Quantity(_))
                        | (ScalarKind::Category, Value::Category(_))
                        | (ScalarKind::Text, Value::Text(_))
                        | (ScalarKind::Time, Value::Time(_))
                );
                if ok {
                    Ok(())
                } else {
                    Err(mismatch())
                }
            }
            (DataComponent::Vector { coordinates, .. }, Value::Vector(v)) => {
                if v.len() == coordinates.len() {
                    Ok(())
                } else {
                    Err(format!(
                        "{}expected {} coordinates, found {}",
                        location(at),
                        coordinates.len(),
                        v.len()
                    ))
                }
            }
            (DataComponent::Array { element, size }, Value::Array(items)) => {
                if let Some(n) = size {
                    if items.len() != *n {
                        return Err(format!(
                            "{}expected {} elements, found {}",
                            location(at),
                            n,
                            items.len()
                        ));
                    }
                }
                for item in items {
                    element.check_value_at(item, &join(at, "[]"))?;
                }
                Ok(())
            }
            (DataComponent::Choice { items }, Value::Choice { item, value }) => {
                let field = items
                    .iter()
                    .find(|f| &f.name == item)
                    .ok_or_else(|| format!("{}unknown choice item '{}'", location(at), item))?;
                field.component.check_value_at(value, &join(at, item))
            }
            (DataComponent::Record { fields }, Value::Record(values)) => {
                if values.len() != fields.len() {
                    return Err(format!(
                        "{}expected {} fields, found {}",
                        location(at),
                        fields.len(),
                        values.len()
                    ));
                }
                for field in fields {
                    let value = values
                        .iter()
                        .find(|(name, _)| name == &field.name)
                        .map(|(_, v)| v)
                        .ok_or_else(|| {
                            format!("{}missing field '{}'", location(at), field.name)
                        })?;
                    field.component.check_value_at(value, &join(at, &field.name))?;
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }
}

fn uom_compatible(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn join(at: &str, segment: &str) -> String {
    if at.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", at, segment)
    }
}

fn location(at: &str) -> String {
    if at.is_empty() {
        String::new()
    } else {
        format!("at '{}': ", at)
    }
}

/// Typed description of the records flowing through a port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    pub root: DataComponent,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, root: DataComponent) -> Self {
        Self {
            name: name.into(),
            label: None,
            definition: None,
            root,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Whether records described by `producer` can be consumed through this schema.
    pub fn is_assignable_from(&self, producer: &RecordSchema) -> bool {
        self.root.check_assignable_from(&producer.root).is_ok()
    }

    /// Like [`is_assignable_from`](Self::is_assignable_from) but reports why not.
    pub fn check_assignable_from(&self, producer: &RecordSchema) -> Result<()> {
        self.root
            .check_assignable_from(&producer.root)
            .map_err(|reason| {
                ChainError::Schema(format!(
                    "'{}' cannot accept '{}': {}",
                    self.name, producer.name, reason
                ))
            })
    }

    /// Check that `record` is an instance of this schema.
    pub fn validate(&self, record: &Record) -> Result<()> {
        self.root.check_value(record.value()).map_err(|reason| {
            ChainError::Schema(format!("record does not match '{}': {}", self.name, reason))
        })
    }
}
