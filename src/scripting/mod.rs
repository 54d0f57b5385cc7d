//! Rhai expressions for the `script` process.
//!
//! A script either evaluates to a number with the input bound to `value`,
//! or defines `fn transform(x)` which is called with the input.
//!
//! ## Sample Context
//!
//! - `value` - The current input value
//! - `time()` - Seconds since the first sample seen by the process
//! - `dt()` - Seconds since the previous sample
//! - `prev()` - Previous output (NaN if not available)
//! - `prev_raw()` - Previous input (NaN if not available)
//! - `has_prev()` - Whether a previous output exists
//!
//! ## Signal Helpers
//!
//! - `derivative(value)` - Rate of change against `prev()` and `dt()`
//! - `integrate(value)` - Running integral
//! - `smooth(value, alpha)` - Exponential smoothing (alpha 0-1, higher = smoother)
//! - `lowpass(value, cutoff_hz)` - First-order lowpass
//! - `deadband(value, center, width)` - Snap to center within the band
//! - `rate_limit(value, max_rate)` - Bound the change per second
//! - `clamp`, `map_range`, `lerp` and the usual math functions
//!
//! ## Example
//!
//! ```rhai
//! // Dew point from temperature, fixed 60% humidity
//! fn transform(t) {
//!     let a = 17.27;
//!     let b = 237.7;
//!     let g = a * t / (b + t) + ln(0.6);
//!     b * g / (a - g)
//! }
//! ```

mod engine;

pub use engine::{SampleContext, ScriptEngine};

use rhai::AST;

/// Name of the optional entry point.
pub const ENTRY_POINT: &str = "transform";

/// A compiled script.
#[derive(Clone)]
pub struct CompiledScript {
    ast: AST,
    source: String,
    name: String,
    has_entry_point: bool,
}

impl CompiledScript {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the script defines `fn transform(x)`.
    pub fn has_entry_point(&self) -> bool {
        self.has_entry_point
    }
}

impl std::fmt::Debug for CompiledScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledScript")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}
