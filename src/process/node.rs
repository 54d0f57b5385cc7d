//! Process abstraction.
//!
//! Two-layer design, as for any pluggable unit in the engine:
//! - **`Process` trait** for user-defined leaves.
//! - **`BuiltinProcess` enum** for the leaves shipped with the crate, so the
//!   per-pass call is a plain `match` instead of a virtual call.
//!
//! `AnyProcess` wraps either variant so components handle both uniformly.

use crate::config::EngineConfig;
use crate::error::{ChainError, Result};
use crate::process::bindings::PortBindings;
use crate::process::driver::Waker;
use crate::process::output::OutputHandle;
use crate::process::port::{PortDescriptor, PortDirection};
use crate::process::processes::{
    AccumulatorProcess, CollectorHandle, CollectorProcess, CompareProcess, DataSourceProcess,
    FeedHandle, LinearTransformProcess, LookupTableProcess, ScriptProcess, UnitConversionProcess,
    VectorOpProcess,
};
use crate::record::Record;

/// Context handed to `Process::init`.
///
/// Only parameters are readable at this point; no data has flowed yet.
pub struct InitContext {
    path: String,
    bindings: PortBindings,
    config: EngineConfig,
}

impl InitContext {
    pub(crate) fn new(path: &str, bindings: &PortBindings, config: &EngineConfig) -> Self {
        Self {
            path: path.to_string(),
            bindings: bindings.clone(),
            config: config.clone(),
        }
    }

    /// Full component path, e.g. `outer/inner/threshold`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current value of a parameter, `None` if unset or undeclared.
    pub fn param(&self, name: &str) -> Option<Record> {
        self.bindings.parameter(name).and_then(|s| s.cell().read())
    }

    /// Numeric parameter. Wrong record type is an `InvalidParameter`.
    pub fn param_f64(&self, name: &str) -> Result<Option<f64>> {
        match self.param(name) {
            None => Ok(None),
            Some(record) => record.as_f64().map(Some).ok_or_else(|| {
                ChainError::invalid_parameter(
                    name,
                    format!("expected a number, found {}", record.value().kind_name()),
                )
            }),
        }
    }

    /// Text or category parameter.
    pub fn param_str(&self, name: &str) -> Result<Option<String>> {
        match self.param(name) {
            None => Ok(None),
            Some(record) => record.as_str().map(|s| Some(s.to_string())).ok_or_else(|| {
                ChainError::invalid_parameter(
                    name,
                    format!("expected text, found {}", record.value().kind_name()),
                )
            }),
        }
    }
}

/// Context handed to `Process::execute` on every pass.
///
/// Owned by the leaf component and reused across passes.
pub struct ExecContext {
    path: String,
    bindings: PortBindings,
    /// Generation last returned by `fresh_input`, per input slot.
    seen: Vec<u64>,
    pass: u64,
    /// Time of the newest input that changed since the previous execute.
    input_time: i64,
}

impl ExecContext {
    pub(crate) fn new(path: String, bindings: PortBindings) -> Self {
        let seen = vec![0; bindings.inputs().len()];
        Self {
            path,
            bindings,
            seen,
            pass: 0,
            input_time: 0,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of passes this process has been executed in, starting at 1.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Epoch millis stamped on records published this pass: the time of the
    /// newest changed input, 0 when the process has no inputs.
    pub fn input_time(&self) -> i64 {
        self.input_time
    }

    pub(crate) fn begin_pass(&mut self, input_time: i64) {
        self.pass += 1;
        self.input_time = input_time;
    }

    /// Generation of every input cell, in slot order.
    pub(crate) fn input_generations(&self) -> Vec<u64> {
        self.bindings
            .inputs()
            .iter()
            .map(|slot| slot.cell().generation())
            .collect()
    }

    pub(crate) fn set_path(&mut self, path: String) {
        self.path = path;
    }

    pub(crate) fn bindings(&self) -> &PortBindings {
        &self.bindings
    }

    pub(crate) fn bindings_mut(&mut self) -> &mut PortBindings {
        &mut self.bindings
    }

    fn port_path(&self, name: &str) -> String {
        format!("{}/{}", self.path, name)
    }

    fn unknown_port(&self, direction: PortDirection, name: &str) -> ChainError {
        ChainError::unresolved(
            format!("{}/{}/{}", self.path, direction.section(), name),
            "no such port",
        )
    }

    /// Current record of a required input.
    pub fn input(&self, name: &str) -> Result<Record> {
        let slot = self
            .bindings
            .input(name)
            .ok_or_else(|| self.unknown_port(PortDirection::Input, name))?;
        slot.cell().read().ok_or_else(|| ChainError::MissingInput {
            port: self.port_path(name),
        })
    }

    /// Current record of an input, `None` when empty.
    pub fn optional_input(&self, name: &str) -> Option<Record> {
        self.bindings.input(name).and_then(|s| s.cell().read())
    }

    /// Record of an input only if it changed since the last call.
    pub fn fresh_input(&mut self, name: &str) -> Option<Record> {
        let index = self.bindings.find(PortDirection::Input, name)?;
        let (record, generation) = self.bindings.inputs()[index].cell().snapshot();
        if generation == self.seen[index] {
            return None;
        }
        self.seen[index] = generation;
        record
    }

    pub fn param(&self, name: &str) -> Option<Record> {
        self.bindings.parameter(name).and_then(|s| s.cell().read())
    }

    pub fn output(&self, name: &str) -> Result<&OutputHandle> {
        self.bindings
            .output(name)
            .ok_or_else(|| self.unknown_port(PortDirection::Output, name))
    }

    /// Publish a record on an output port, stamped with `input_time`, or
    /// the wall clock for processes without inputs.
    pub fn publish(&self, name: &str, record: Record) -> Result<()> {
        let output = self.output(name)?;
        match self.input_time {
            0 => output.publish(record),
            time_millis => output.publish_at(record, time_millis),
        }
    }

    /// Mark an output as absent for this pass.
    pub fn retract(&self, name: &str) -> Result<()> {
        self.output(name)?.retract();
        Ok(())
    }
}

/// Trait for user-defined processes.
pub trait Process: Send {
    /// Registry tag of this process type.
    fn type_tag(&self) -> &str {
        "plugin"
    }

    /// Ports of this process. Must not change once constructed.
    fn ports(&self) -> Vec<PortDescriptor>;

    /// Validate parameters and prepare internal state. No data is available.
    fn init(&mut self, _ctx: &InitContext) -> Result<()> {
        Ok(())
    }

    /// Read inputs, transform, publish outputs.
    ///
    /// Called on a pass only when an input changed since the previous call.
    /// Processes without inputs are called on every pass.
    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()>;

    /// Called with the streaming worker's waker on start and `None` on stop.
    /// Only processes fed from outside the chain need it.
    fn bind_waker(&mut self, _waker: Option<Waker>) {}

    fn on_start(&mut self) {}

    fn on_stop(&mut self) {}
}

/// Enum dispatch for built-in processes.
pub enum BuiltinProcess {
    Compare(CompareProcess),
    Linear(LinearTransformProcess),
    UnitConversion(UnitConversionProcess),
    LookupTable(LookupTableProcess),
    VectorOp(VectorOpProcess),
    Accumulator(AccumulatorProcess),
    Script(ScriptProcess),
    DataSource(DataSourceProcess),
    Collector(CollectorProcess),
}

macro_rules! dispatch {
    ($self:expr, $p:ident => $body:expr) => {
        match $self {
            BuiltinProcess::Compare($p) => $body,
            BuiltinProcess::Linear($p) => $body,
            BuiltinProcess::UnitConversion($p) => $body,
            BuiltinProcess::LookupTable($p) => $body,
            BuiltinProcess::VectorOp($p) => $body,
            BuiltinProcess::Accumulator($p) => $body,
            BuiltinProcess::Script($p) => $body,
            BuiltinProcess::DataSource($p) => $body,
            BuiltinProcess::Collector($p) => $body,
        }
    };
}

impl BuiltinProcess {
    pub fn type_tag(&self) -> &str {
        dispatch!(self, p => p.type_tag())
    }

    pub fn ports(&self) -> Vec<PortDescriptor> {
        dispatch!(self, p => p.ports())
    }

    pub fn init(&mut self, ctx: &InitContext) -> Result<()> {
        dispatch!(self, p => p.init(ctx))
    }

    pub fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        dispatch!(self, p => p.execute(ctx))
    }

    pub fn bind_waker(&mut self, waker: Option<Waker>) {
        dispatch!(self, p => p.bind_waker(waker))
    }

    pub fn on_start(&mut self) {
        dispatch!(self, p => p.on_start())
    }

    pub fn on_stop(&mut self) {
        dispatch!(self, p => p.on_stop())
    }
}

/// Holds either a built-in process (enum dispatch) or a plugin (trait object).
pub enum AnyProcess {
    Builtin(BuiltinProcess),
    Plugin(Box<dyn Process>),
}

impl AnyProcess {
    pub fn type_tag(&self) -> &str {
        match self {
            AnyProcess::Builtin(p) => p.type_tag(),
            AnyProcess::Plugin(p) => p.type_tag(),
        }
    }

    pub fn ports(&self) -> Vec<PortDescriptor> {
        match self {
            AnyProcess::Builtin(p) => p.ports(),
            AnyProcess::Plugin(p) => p.ports(),
        }
    }

    pub fn init(&mut self, ctx: &InitContext) -> Result<()> {
        match self {
            AnyProcess::Builtin(p) => p.init(ctx),
            AnyProcess::Plugin(p) => p.init(ctx),
        }
    }

    pub fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        match self {
            AnyProcess::Builtin(p) => p.execute(ctx),
            AnyProcess::Plugin(p) => p.execute(ctx),
        }
    }

    pub fn bind_waker(&mut self, waker: Option<Waker>) {
        match self {
            AnyProcess::Builtin(p) => p.bind_waker(waker),
            AnyProcess::Plugin(p) => p.bind_waker(waker),
        }
    }

    pub fn on_start(&mut self) {
        match self {
            AnyProcess::Builtin(p) => p.on_start(),
            AnyProcess::Plugin(p) => p.on_start(),
        }
    }

    pub fn on_stop(&mut self) {
        match self {
            AnyProcess::Builtin(p) => p.on_stop(),
            AnyProcess::Plugin(p) => p.on_stop(),
        }
    }

    /// Feed of a `data_source` process.
    pub fn feed_handle(&self) -> Option<FeedHandle> {
        match self {
            AnyProcess::Builtin(BuiltinProcess::DataSource(p)) => Some(p.feed()),
            _ => None,
        }
    }

    /// Received records of a `collector` process.
    pub fn collector_handle(&self) -> Option<CollectorHandle> {
        match self {
            AnyProcess::Builtin(BuiltinProcess::Collector(p)) => Some(p.handle()),
            _ => None,
        }
    }
}
