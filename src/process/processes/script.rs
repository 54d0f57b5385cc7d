use crate::error::{ChainError, Result};
use crate::process::node::{ExecContext, InitContext, Process};
use crate::process::port::PortDescriptor;
use crate::process::processes::{quantity_schema, text_schema};
use crate::record::Record;
use crate::scripting::{CompiledScript, SampleContext, ScriptEngine};

/// Applies a rhai expression to each new input value.
///
/// See [`crate::scripting`] for the functions available to the expression.
pub struct ScriptProcess {
    default_expression: Option<String>,
    engine: ScriptEngine,
    script: Option<CompiledScript>,
    first_millis: Option<i64>,
    last_millis: Option<i64>,
    prev_raw: f64,
    prev_output: f64,
}

impl ScriptProcess {
    pub fn new() -> Self {
        Self {
            default_expression: None,
            engine: ScriptEngine::new(),
            script: None,
            first_millis: None,
            last_millis: None,
            prev_raw: f64::NAN,
            prev_output: f64::NAN,
        }
    }

    /// Expression used when the `expression` parameter is not set.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.default_expression = Some(expression.into());
        self
    }

    fn reset(&mut self) {
        self.first_millis = None;
        self.last_millis = None;
        self.prev_raw = f64::NAN;
        self.prev_output = f64::NAN;
    }

    fn sample_at(&mut self, now_millis: i64) -> SampleContext {
        let first = *self.first_millis.get_or_insert(now_millis);
        let dt_secs = match self.last_millis {
            Some(last) => (now_millis - last) as f64 / 1000.0,
            None => 0.0,
        };
        self.last_millis = Some(now_millis);
        SampleContext {
            time_secs: (now_millis - first) as f64 / 1000.0,
            dt_secs,
            prev_raw: self.prev_raw,
            prev_output: self.prev_output,
        }
    }
}

impl Default for ScriptProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for ScriptProcess {
    fn type_tag(&self) -> &str {
        "script"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input("value", quantity_schema("value")),
            PortDescriptor::parameter("expression", text_schema("expression")).optional(),
            PortDescriptor::output("value", quantity_schema("value")),
        ]
    }

    fn init(&mut self, ctx: &InitContext) -> Result<()> {
        let source = ctx
            .param_str("expression")?
            .or_else(|| self.default_expression.clone())
            .ok_or_else(|| ChainError::invalid_parameter("expression", "no expression configured"))?;
        let script = self
            .engine
            .compile(ctx.path(), &source)
            .map_err(|e| ChainError::invalid_parameter("expression", e.to_string()))?;
        self.script = Some(script);
        self.reset();
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

        let sample = self.sample_at(chrono::Utc::now().timestamp_millis());
        let script = self.script.as_ref().ok_or(ChainError::InvalidState {
            expected: "Initialized",
            actual: "Created",
        })?;
        let y = self.engine.execute(script, x, sample)?;

        self.prev_raw = x;
        self.prev_output = y;
        ctx.publish("value", Record::quantity(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_timing() {
        let mut process = ScriptProcess::new();
        let first = process.sample_at(10_000);
        assert_eq!(first.time_secs, 0.0);
        assert_eq!(first.dt_secs, 0.0);
        assert!(first.prev_output.is_nan());

        let second = process.sample_at(10_500);
        assert_eq!(second.time_secs, 0.5);
        assert_eq!(second.dt_secs, 0.5);
    }

    #[test]
    fn test_ports() {
        let ports = ScriptProcess::new().ports();
        assert_eq!(ports.len(), 3);
        assert!(!ports[1].required);
    }
}
