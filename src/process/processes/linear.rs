use crate::error::{ChainError, Result};
use crate::process::node::{ExecContext, InitContext, Process};
use crate::process::port::PortDescriptor;
use crate::process::processes::quantity_schema;
use crate::record::Record;

/// `value * gain + bias`.
pub struct LinearTransformProcess {
    gain: f64,
    bias: f64,
}

impl LinearTransformProcess {
    pub fn new() -> Self {
        Self { gain: 1.0, bias: 0.0 }
    }

    /// Defaults used when the parameters are not set.
    pub fn with_coefficients(gain: f64, bias: f64) -> Self {
        Self { gain, bias }
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

impl Default for LinearTransformProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for LinearTransformProcess {
    fn type_tag(&self) -> &str {
        "linear"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input("value", quantity_schema("value")),
            PortDescriptor::parameter("gain", quantity_schema("gain")).optional(),
            PortDescriptor::parameter("bias", quantity_schema("bias")).optional(),
            PortDescriptor::output("value", quantity_schema("value")),
        ]
    }

    fn init(&mut self, ctx: &InitContext) -> Result<()> {
        if let Some(gain) = ctx.param_f64("gain")? {
            self.gain = gain;
        }
        if let Some(bias) = ctx.param_f64("bias")? {
            self.bias = bias;
        }
        if !self.gain.is_finite() || !self.bias.is_finite() {
            return Err(ChainError::invalid_parameter("gain", "coefficients must be finite"));
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let value = ctx.input("value")?;
        let x = value
            .as_f64()
            .ok_or_else(|| ChainError::Transform("'value' is not numeric".into()))?;
        ctx.publish("value", Record::quantity(x * self.gain + self.bias))
    }
}
