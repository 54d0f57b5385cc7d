//! Rhai engine setup and evaluation.

use crate::error::{ChainError, Result};
use crate::scripting::{CompiledScript, ENTRY_POINT};
use rhai::{Dynamic, Engine, Scope};
use std::f64::consts::PI;
use std::sync::{Arc, RwLock};

/// Per-sample values exposed to scripts through `time()`, `dt()`, `prev()`.
#[derive(Debug, Clone, Copy)]
pub struct SampleContext {
    /// Seconds since the first sample.
    pub time_secs: f64,
    /// Seconds since the previous sample.
    pub dt_secs: f64,
    /// Previous input (NaN if not available)
    pub prev_raw: f64,
    /// Previous output (NaN if not available)
    pub prev_output: f64,
}

impl SampleContext {
    pub fn first_sample() -> Self {
        Self {
            time_secs: 0.0,
            dt_secs: 0.0,
            prev_raw: f64::NAN,
            prev_output: f64::NAN,
        }
    }
}

impl Default for SampleContext {
    fn default() -> Self {
        Self::first_sample()
    }
}

type SharedContext = Arc<RwLock<SampleContext>>;

/// Sandboxed Rhai engine with the signal helpers registered.
pub struct ScriptEngine {
    engine: Engine,
    context: SharedContext,
}

impl ScriptEngine {
    pub fn new() -> Self {
        let context = Arc::new(RwLock::new(SampleContext::first_sample()));
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, context.clone());
        Self { engine, context }
    }

    fn configure_engine(engine: &mut Engine, context: SharedContext) {
        // Scripts run inside a pass, keep them bounded.
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(10_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(1_000);

        let read = move |f: fn(&SampleContext) -> f64, fallback: f64| {
            let ctx = context.clone();
            move || -> f64 { ctx.read().map(|c| f(&c)).unwrap_or(fallback) }
        };

        engine.register_fn("time", read(|c| c.time_secs, 0.0));
        engine.register_fn("dt", read(|c| c.dt_secs, 0.0));
        engine.register_fn("prev", read(|c| c.prev_output, f64::NAN));
        engine.register_fn("prev_raw", read(|c| c.prev_raw, f64::NAN));
        {
            let prev = read(|c| c.prev_output, f64::NAN);
            engine.register_fn("has_prev", move || -> bool { !prev().is_nan() });
        }

        // ===== Signal helpers =====

        {
            let prev = read(|c| c.prev_output, f64::NAN);
            let dt = read(|c| c.dt_secs, 0.0);
            engine.register_fn("derivative", move |current: f64| -> f64 {
                derivative(current, prev(), dt())
            });
        }
        engine.register_fn("derivative", derivative);

        {
            let prev = read(|c| c.prev_output, f64::NAN);
            let dt = read(|c| c.dt_secs, 0.0);
            engine.register_fn("integrate", move |current: f64| -> f64 {
                integrate(current, prev(), dt())
            });
        }
        engine.register_fn("integrate", integrate);

        {
            let prev = read(|c| c.prev_output, f64::NAN);
            engine.register_fn("smooth", move |current: f64, alpha: f64| -> f64 {
                smooth(current, prev(), alpha)
            });
        }
        engine.register_fn("smooth", smooth);

        {
            let prev = read(|c| c.prev_output, f64::NAN);
            let dt = read(|c| c.dt_secs, 0.0);
            engine.register_fn("lowpass", move |current: f64, cutoff_hz: f64| -> f64 {
                lowpass(current, prev(), cutoff_hz, dt())
            });
        }
        engine.register_fn("lowpass", lowpass);

        {
            let prev = read(|c| c.prev_output, f64::NAN);
            let dt = read(|c| c.dt_secs, 0.0);
            engine.register_fn("rate_limit", move |current: f64, max_rate: f64| -> f64 {
                rate_limit(current, prev(), max_rate, dt())
            });
        }
        engine.register_fn("rate_limit", rate_limit);

        engine.register_fn("deadband", |value: f64, center: f64, width: f64| -> f64 {
            if (value - center).abs() < width / 2.0 {
                center
            } else {
                value
            }
        });

        // ===== Math =====

        engine.register_fn("abs", |x: f64| x.abs());
        engine.register_fn("sqrt", |x: f64| x.sqrt());
        engine.register_fn("pow", |x: f64, y: f64| x.powf(y));
        engine.register_fn("exp", |x: f64| x.exp());
        engine.register_fn("ln", |x: f64| x.ln());
        engine.register_fn("log10", |x: f64| x.log10());
        engine.register_fn("sin", |x: f64| x.sin());
        engine.register_fn("cos", |x: f64| x.cos());
        engine.register_fn("tan", |x: f64| x.tan());
        engine.register_fn("atan2", |y: f64, x: f64| y.atan2(x));
        engine.register_fn("floor", |x: f64| x.floor());
        engine.register_fn("ceil", |x: f64| x.ceil());
        engine.register_fn("round", |x: f64| x.round());
        engine.register_fn("clamp", |x: f64, min: f64, max: f64| x.clamp(min, max));
        engine.register_fn("min", |a: f64, b: f64| a.min(b));
        engine.register_fn("max", |a: f64, b: f64| a.max(b));
        engine.register_fn("pi", || PI);
        engine.register_fn("is_nan", |x: f64| x.is_nan());
        engine.register_fn("lerp", |a: f64, b: f64, t: f64| a + (b - a) * t);
        engine.register_fn(
            "map_range",
            |x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64| {
                (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
            },
        );
    }

    /// Compile a script. Syntax errors are reported as `ChainError::Script`.
    pub fn compile(&self, name: &str, source: &str) -> Result<CompiledScript> {
        let ast = self
            .engine
            .compile(source)
            .map_err(|e| ChainError::Script(format!("{}: {}", name, e)))?;
        let has_entry_point = ast
            .iter_functions()
            .any(|f| f.name == ENTRY_POINT && f.params.len() == 1);
        Ok(CompiledScript {
            ast,
            source: source.to_string(),
            name: name.to_string(),
            has_entry_point,
        })
    }

    /// Evaluate `script` for one input value.
    pub fn execute(&self, script: &CompiledScript, value: f64, sample: SampleContext) -> Result<f64> {
        {
            let mut ctx = self
                .context
                .write()
                .map_err(|e| ChainError::Script(format!("Failed to acquire context lock: {}", e)))?;
            *ctx = sample;
        }

        let mut scope = Scope::new();
        scope.push("value", value);

        let result = if script.has_entry_point {
            self.engine
                .call_fn::<Dynamic>(&mut scope, &script.ast, ENTRY_POINT, (value,))
        } else {
            self.engine
                .eval_ast_with_scope::<Dynamic>(&mut scope, &script.ast)
        }
        .map_err(|e| ChainError::Script(format!("{}: {}", script.name, e)))?;

        if let Ok(f) = result.as_float() {
            Ok(f)
        } else if let Ok(i) = result.as_int() {
            Ok(i as f64)
        } else {
            Err(ChainError::Script(format!(
                "{}: script must return a number, got {}",
                script.name,
                result.type_name()
            )))
        }
    }

    /// Compile and evaluate in one step.
    pub fn eval(&self, source: &str, value: f64) -> Result<f64> {
        let script = self.compile("inline", source)?;
        self.execute(&script, value, SampleContext::first_sample())
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine").finish_non_exhaustive()
    }
}

fn derivative(current: f64, previous: f64, dt: f64) -> f64 {
    if dt > 0.0 && !previous.is_nan() {
        (current - previous) / dt
    } else {
        0.0
    }
}

fn integrate(current: f64, accumulated: f64, dt: f64) -> f64 {
    if accumulated.is_nan() {
        current * dt
    } else {
        accumulated + current * dt
    }
}

fn smooth(current: f64, previous: f64, alpha: f64) -> f64 {
    let alpha = alpha.clamp(0.0, 1.0);
    if previous.is_nan() {
        current
    } else {
        alpha * previous + (1.0 - alpha) * current
    }
}

fn lowpass(current: f64, previous: f64, cutoff_hz: f64, dt: f64) -> f64 {
    if previous.is_nan() || dt <= 0.0 || cutoff_hz <= 0.0 {
        return current;
    }
    let rc = 1.0 / (2.0 * PI * cutoff_hz);
    let alpha = dt / (rc + dt);
    previous + alpha * (current - previous)
}

fn rate_limit(current: f64, previous: f64, max_rate: f64, dt: f64) -> f64 {
    if previous.is_nan() || dt <= 0.0 {
        return current;
    }
    let max_change = max_rate * dt;
    let change = current - previous;
    if change.abs() > max_change {
        previous + change.signum() * max_change
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression() {
        let engine = ScriptEngine::new();
        assert_eq!(engine.eval("value * 2.0 + 1.0", 3.0).unwrap(), 7.0);
    }

    #[test]
    fn test_entry_point() {
        let engine = ScriptEngine::new();
        let script = engine
            .compile("c2f", "fn transform(c) { c * 9.0 / 5.0 + 32.0 }")
            .unwrap();
        assert!(script.has_entry_point());
        let sample = SampleContext::first_sample();
        assert_eq!(engine.execute(&script, 100.0, sample).unwrap(), 212.0);
    }

    #[test]
    fn test_integer_result() {
        let engine = ScriptEngine::new();
        assert_eq!(engine.eval("42", 0.0).unwrap(), 42.0);
    }

    #[test]
    fn test_syntax_error() {
        let engine = ScriptEngine::new();
        assert!(matches!(
            engine.compile("bad", "value * (2.0"),
            Err(ChainError::Script(_))
        ));
    }

    #[test]
    fn test_non_numeric_result() {
        let engine = ScriptEngine::new();
        assert!(engine.eval("\"text\"", 1.0).is_err());
    }

    #[test]
    fn test_context_functions() {
        let engine = ScriptEngine::new();
        let script = engine.compile("d", "derivative(value)").unwrap();
        let sample = SampleContext {
            time_secs: 1.0,
            dt_secs: 0.5,
            prev_raw: 1.0,
            prev_output: 1.0,
        };
        assert_eq!(engine.execute(&script, 2.0, sample).unwrap(), 2.0);

        let first = engine
            .execute(&script, 2.0, SampleContext::first_sample())
            .unwrap();
        assert_eq!(first, 0.0);
    }

    #[test]
    fn test_helpers() {
        assert_eq!(smooth(10.0, 0.0, 0.5), 5.0);
        assert_eq!(deadband_fn(0.1), 0.0);
        assert_eq!(rate_limit(10.0, 0.0, 1.0, 2.0), 2.0);
        assert_eq!(lowpass(1.0, f64::NAN, 10.0, 0.1), 1.0);
    }

    fn deadband_fn(x: f64) -> f64 {
        let engine = ScriptEngine::new();
        engine.eval(&format!("deadband({:?}, 0.0, 1.0)", x), 0.0).unwrap()
    }
}
