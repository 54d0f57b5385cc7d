use crate::error::{ChainError, Result};
use crate::process::node::{ExecContext, InitContext, Process};
use crate::process::port::PortDescriptor;
use crate::process::processes::quantity_schema;
use crate::record::{DataComponent, Record, RecordSchema, Value};
use std::collections::VecDeque;

/// Collects the last `windowSize` input values into an array.
///
/// Each new input record is appended once. Nothing is published until the
/// window has filled, then every new value publishes the sliding window.
pub struct AccumulatorProcess {
    declared_size: Option<usize>,
    size: usize,
    window: VecDeque<f64>,
}

impl AccumulatorProcess {
    pub fn new() -> Self {
        Self {
            declared_size: None,
            size: 0,
            window: VecDeque::new(),
        }
    }

    /// Fix the window size at construction, giving the output a fixed array size.
    pub fn with_window(size: usize) -> Self {
        Self {
            declared_size: Some(size),
            ..Self::new()
        }
    }

    fn window_schema(&self) -> RecordSchema {
        RecordSchema::new(
            "window",
            DataComponent::array(DataComponent::quantity(None), self.declared_size),
        )
    }
}

impl Default for AccumulatorProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for AccumulatorProcess {
    fn type_tag(&self) -> &str {
        "accumulator"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input("value", quantity_schema("value")),
            PortDescriptor::parameter(
                "windowSize",
                RecordSchema::new("windowSize", DataComponent::count()),
            )
            .optional(),
            PortDescriptor::output("window", self.window_schema()),
        ]
    }

    fn init(&mut self, ctx: &InitContext) -> Result<()> {
        let requested = match ctx.param("windowSize") {
            Some(record) => Some(record.value().as_i64().ok_or_else(|| {
                ChainError::invalid_parameter("windowSize", "expected an integer")
            })?),
            None => self.declared_size.map(|n| n as i64),
        };

        let size = requested.ok_or_else(|| {
            ChainError::Schema(format!(
                "{}: output 'window' size cannot be determined without 'windowSize'",
                ctx.path()
            ))
        })?;
        if size <= 0 {
            return Err(ChainError::invalid_parameter(
                "windowSize",
                format!("must be positive, found {}", size),
            ));
        }
        let size = size as usize;
        if let Some(declared) = self.declared_size {
            if declared != size {
                return Err(ChainError::Schema(format!(
                    "windowSize {} differs from the declared output size {}",
                    size, declared
                )));
            }
        }

        self.size = size;
        self.window = VecDeque::with_capacity(size);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        ctx.input("value")?;
        let Some(record) = ctx.fresh_input("value") else {
            return Ok(());
        };
        let x = record
            .as_f64()
            .ok_or_else(|| ChainError::Transform("'value' is not numeric".into()))?;

        if self.window.len() == self.size {
            self.window.pop_front();
        }
        self.window.push_back(x);

        if self.window.len() == self.size {
            let values = self.window.iter().map(|v| Value::Quantity(*v)).collect();
            ctx.publish("window", Record::new(Value::Array(values)))?;
        }
        Ok(())
    }
}
