//! Fluent chain assembly.

use crate::config::EngineConfig;
use crate::error::{ChainError, Result};
use crate::process::component::Component;
use crate::process::composite::CompositeProcess;
use crate::record::{Record, RecordSchema};

/// Builder for a `CompositeProcess`.
///
/// The first assembly error is kept and returned by `build`, so calls can
/// be chained without checking each one:
///
/// ```text
/// source ──value──> threshold ──outputIfTrue──> alarms
/// ```
///
/// ```ignore
/// let chain = ChainBuilder::new("alarm")
///     .component("source", DataSourceProcess::new(quantity_schema("value")))
///     .component("threshold", CompareProcess::new().with_operator(">"))
///     .component("alarms", CollectorProcess::new(quantity_schema("value")))
///     .connect("source/value", "threshold/value")
///     .connect("threshold/outputIfTrue", "alarms/value")
///     .constant("threshold/threshold", Record::quantity(10.0))
///     .build()?;
/// ```
pub struct ChainBuilder {
    composite: CompositeProcess,
    error: Option<ChainError>,
}

impl ChainBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, EngineConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            composite: CompositeProcess::with_config(name, config),
            error: None,
        }
    }

    fn apply<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut CompositeProcess) -> Result<()>,
    {
        if self.error.is_none() {
            if let Err(e) = f(&mut self.composite) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn component(self, name: &str, component: impl Into<Component>) -> Self {
        let component = component.into();
        self.apply(|c| c.add_component(name, component).map(|_| ()))
    }

    pub fn connect(self, source: &str, dest: &str) -> Self {
        self.apply(|c| c.add_connection(source, dest).map(|_| ()))
    }

    pub fn input(self, name: &str, schema: RecordSchema) -> Self {
        self.apply(|c| c.add_input(name, schema).map(|_| ()))
    }

    pub fn output(self, name: &str, schema: RecordSchema) -> Self {
        self.apply(|c| c.add_output(name, schema).map(|_| ()))
    }

    /// Constant on an unlinked input.
    pub fn constant(self, path: &str, record: Record) -> Self {
        self.apply(|c| c.set_input(path, record))
    }

    pub fn parameter(self, path: &str, record: Record) -> Self {
        self.apply(|c| c.set_parameter(path, record))
    }

    /// Assembled but not initialized, e.g. for nesting into another chain.
    pub fn assemble(self) -> Result<CompositeProcess> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.composite),
        }
    }

    /// Assemble and `init`.
    pub fn build(self) -> Result<CompositeProcess> {
        let mut composite = self.assemble()?;
        composite.init()?;
        Ok(composite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::processes::{quantity_schema, LinearTransformProcess};

    #[test]
    fn test_first_error_wins() {
        let err = ChainBuilder::new("chain")
            .component("a", LinearTransformProcess::new())
            .component("a", LinearTransformProcess::new())
            .connect("nowhere/value", "a/value")
            .build()
            .unwrap_err();
        assert!(matches!(err, ChainError::DuplicateName(_)));
    }

    #[test]
    fn test_nested_build() {
        let inner = ChainBuilder::new("inner")
            .input("x", quantity_schema("x"))
            .output("y", quantity_schema("y"))
            .component("double", LinearTransformProcess::with_coefficients(2.0, 0.0))
            .connect("inputs/x", "double/value")
            .connect("double/value", "outputs/y")
            .assemble()
            .unwrap();

        let mut outer = ChainBuilder::new("outer")
            .component("first", inner)
            .component("offset", LinearTransformProcess::with_coefficients(1.0, 1.0))
            .connect("first/y", "offset/value")
            .constant("first/x", Record::quantity(4.0))
            .build()
            .unwrap();

        outer.execute().unwrap();
        let out = outer.component_output("offset/value").unwrap();
        assert_eq!(out.latest_record(), Some(Record::quantity(9.0)));
        assert_eq!(outer.component("first/double").unwrap().type_tag(), "linear");
        assert_eq!(outer.component("first").unwrap().as_composite().unwrap().path(), "outer/first");
    }
}
