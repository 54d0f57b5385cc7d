//! Port descriptors and link path parsing.
//!
//! Each process declares its ports (inputs, outputs, parameters) as
//! `PortDescriptor`s. Composites use these to validate link endpoints, and
//! links name their endpoints with `PortPath`s.

use crate::error::{ChainError, Result};
use crate::record::{RecommendedEncoding, RecordSchema};
use std::fmt;

/// Whether a port is an input, output or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
    Parameter,
}

impl PortDirection {
    pub fn section(self) -> &'static str {
        match self {
            PortDirection::Input => "inputs",
            PortDirection::Output => "outputs",
            PortDirection::Parameter => "parameters",
        }
    }
}

/// Descriptor for a process port.
#[derive(Debug, Clone, PartialEq)]
pub struct PortDescriptor {
    pub name: String,
    pub direction: PortDirection,
    pub schema: RecordSchema,
    /// Inputs and parameters only: executing without a record is an error.
    pub required: bool,
    /// Outputs only: encoding advertised to consumers.
    pub encoding: RecommendedEncoding,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, direction: PortDirection, schema: RecordSchema) -> Self {
        Self {
            name: name.into(),
            direction,
            schema,
            required: true,
            encoding: RecommendedEncoding::default(),
        }
    }

    pub fn input(name: impl Into<String>, schema: RecordSchema) -> Self {
        Self::new(name, PortDirection::Input, schema)
    }

    pub fn output(name: impl Into<String>, schema: RecordSchema) -> Self {
        Self::new(name, PortDirection::Output, schema)
    }

    pub fn parameter(name: impl Into<String>, schema: RecordSchema) -> Self {
        Self::new(name, PortDirection::Parameter, schema)
    }

    /// Mark an input or parameter as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_encoding(mut self, encoding: RecommendedEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Who owns the port a path points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOwner {
    /// The composite's own boundary ports.
    Boundary,
    /// A named child component.
    Child(String),
}

/// Symbolic reference to a port, as written in a link.
///
/// Accepted forms:
/// - `components/<child>/{inputs,outputs,parameters}/<port>`
/// - `{inputs,outputs,parameters}/<port>` for the composite's own ports
/// - `<child>/<port>` and `<child>.<port>`, direction taken from the link end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPath {
    pub owner: PathOwner,
    pub direction: Option<PortDirection>,
    pub port: String,
    raw: String,
}

impl PortPath {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_matches('/');
        let segments: Vec<&str> = if trimmed.contains('/') {
            trimmed.split('/').collect()
        } else {
            trimmed.splitn(2, '.').collect()
        };

        if segments.iter().any(|s| s.is_empty()) {
            return Err(ChainError::unresolved(raw, "empty path segment"));
        }

        let section = |s: &str| match s {
            "inputs" => Some(PortDirection::Input),
            "outputs" => Some(PortDirection::Output),
            "parameters" => Some(PortDirection::Parameter),
            _ => None,
        };

        let (owner, direction, port) = match segments.as_slice() {
            ["components", child, dir, port] => {
                let direction = section(dir).ok_or_else(|| {
                    ChainError::unresolved(raw, format!("unknown port section '{}'", dir))
                })?;
                (PathOwner::Child(child.to_string()), Some(direction), *port)
            }
            ["components", child, port] => (PathOwner::Child(child.to_string()), None, *port),
            [first, port] => match section(first) {
                Some(direction) => (PathOwner::Boundary, Some(direction), *port),
                None => (PathOwner::Child(first.to_string()), None, *port),
            },
            _ => {
                return Err(ChainError::unresolved(
                    raw,
                    "expected '<component>/<port>' or 'components/<component>/<section>/<port>'",
                ))
            }
        };

        Ok(Self {
            owner,
            direction,
            port: port.to_string(),
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for PortPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
