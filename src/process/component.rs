//! Children of a composite: leaf processes or nested composites.

use crate::config::EngineConfig;
use crate::error::{ChainError, Result};
use crate::process::bindings::PortBindings;
use crate::process::composite::CompositeProcess;
use crate::process::driver::Waker;
use crate::process::node::{AnyProcess, BuiltinProcess, ExecContext, InitContext, Process};
use crate::process::output::OutputHandle;
use crate::process::port::PortDirection;
use crate::process::processes::{
    AccumulatorProcess, CollectorHandle, CollectorProcess, CompareProcess, DataSourceProcess,
    FeedHandle, LinearTransformProcess, LookupTableProcess, ScriptProcess, UnitConversionProcess,
    VectorOpProcess,
};
use crate::record::Record;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Lifecycle state. Only `Started` and `Stopped` may alternate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Created,
    Initialized,
    Started,
    Stopped,
}

impl ProcessState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Created => "Created",
            ProcessState::Initialized => "Initialized",
            ProcessState::Started => "Started",
            ProcessState::Stopped => "Stopped",
        }
    }

    /// Whether `init` has completed.
    pub fn is_ready(self) -> bool {
        !matches!(self, ProcessState::Created)
    }
}

/// A leaf process together with its port bindings.
pub struct LeafComponent {
    process: AnyProcess,
    ctx: ExecContext,
    state: ProcessState,
    /// Input generations seen by the last execute.
    last_inputs: Option<Vec<u64>>,
}

impl LeafComponent {
    pub fn new(process: AnyProcess) -> Self {
        let bindings = PortBindings::from_ports(&process.ports());
        Self {
            process,
            ctx: ExecContext::new(String::new(), bindings),
            state: ProcessState::Created,
            last_inputs: None,
        }
    }

    pub fn process(&self) -> &AnyProcess {
        &self.process
    }

    pub fn path(&self) -> &str {
        self.ctx.path()
    }

    fn init(&mut self, path: &str, config: &EngineConfig) -> Result<()> {
        match self.state {
            ProcessState::Created => {}
            ProcessState::Initialized | ProcessState::Stopped => {
                self.ctx.set_path(path.to_string());
                return Ok(());
            }
            ProcessState::Started => {
                return Err(ChainError::InvalidState {
                    expected: "Created",
                    actual: self.state.as_str(),
                })
            }
        }

        self.ctx.bindings().check_unique()?;
        self.ctx.set_path(path.to_string());
        let init_ctx = InitContext::new(path, self.ctx.bindings(), config);
        self.process.init(&init_ctx)?;
        self.ctx.bindings().configure_outputs(config);

        self.state = ProcessState::Initialized;
        tracing::debug!("Initialized '{}' ({})", path, self.process.type_tag());
        Ok(())
    }

    fn run_pass(&mut self, faults: &mut Vec<ChainError>) -> bool {
        let generations = self.ctx.input_generations();
        if !generations.is_empty() && self.last_inputs.as_ref() == Some(&generations) {
            return true;
        }

        let input_time = self
            .ctx
            .bindings()
            .inputs()
            .iter()
            .zip(&generations)
            .enumerate()
            .filter(|(i, (_, generation))| {
                self.last_inputs.as_ref().and_then(|last| last.get(*i)) != Some(*generation)
            })
            .map(|(_, (slot, _))| slot.cell().time_millis())
            .max()
            .unwrap_or(0);
        self.last_inputs = Some(generations);
        self.ctx.begin_pass(input_time);

        let process = &mut self.process;
        let ctx = &mut self.ctx;
        let result = panic::catch_unwind(AssertUnwindSafe(|| process.execute(ctx)))
            .unwrap_or_else(|payload| {
                Err(ChainError::Transform(format!("panicked: {}", panic_message(&*payload))))
            });
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("'{}' failed on pass {}: {}", self.ctx.path(), self.ctx.pass(), e);
                faults.push(e.with_context(self.ctx.path().to_string()));
                false
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// A child of a composite.
pub enum Component {
    Leaf(LeafComponent),
    Composite(Box<CompositeProcess>),
}

impl Component {
    pub fn leaf(process: AnyProcess) -> Self {
        Component::Leaf(LeafComponent::new(process))
    }

    pub fn plugin<P: Process + 'static>(process: P) -> Self {
        Self::leaf(AnyProcess::Plugin(Box::new(process)))
    }

    pub fn type_tag(&self) -> &str {
        match self {
            Component::Leaf(leaf) => leaf.process.type_tag(),
            Component::Composite(_) => "composite",
        }
    }

    pub fn state(&self) -> ProcessState {
        match self {
            Component::Leaf(leaf) => leaf.state,
            Component::Composite(composite) => composite.state(),
        }
    }

    /// Ports as seen from the enclosing composite.
    pub fn bindings(&self) -> &PortBindings {
        match self {
            Component::Leaf(leaf) => leaf.ctx.bindings(),
            Component::Composite(composite) => composite.bindings(),
        }
    }

    pub(crate) fn bindings_mut(&mut self) -> &mut PortBindings {
        match self {
            Component::Leaf(leaf) => leaf.ctx.bindings_mut(),
            Component::Composite(composite) => composite.bindings_mut(),
        }
    }

    pub(crate) fn init(&mut self, path: &str, config: &EngineConfig) -> Result<()> {
        match self {
            Component::Leaf(leaf) => leaf.init(path, config),
            Component::Composite(composite) => composite.init_at(path, config),
        }
    }

    /// Execute once as part of the parent's pass. Returns false if a fault
    /// was raised, so the parent can skip dependents.
    pub(crate) fn run_pass(&mut self, faults: &mut Vec<ChainError>) -> bool {
        match self {
            Component::Leaf(leaf) => leaf.run_pass(faults),
            // Runs on its own worker; the parent only reads its boundary cells.
            Component::Composite(composite) if composite.is_running() => true,
            Component::Composite(composite) => {
                let before = faults.len();
                composite.run_nested_pass(faults);
                faults.len() == before
            }
        }
    }

    pub(crate) fn attach_waker(&mut self, waker: Option<Waker>) {
        match self {
            Component::Leaf(leaf) => leaf.process.bind_waker(waker),
            Component::Composite(composite) if composite.is_running() => {}
            Component::Composite(composite) => composite.attach_nested_wakers(waker),
        }
    }

    pub(crate) fn notify_start(&mut self) {
        match self {
            Component::Leaf(leaf) => {
                leaf.process.on_start();
                leaf.state = ProcessState::Started;
            }
            Component::Composite(composite) if composite.is_running() => {}
            Component::Composite(composite) => composite.notify_nested(true),
        }
    }

    pub(crate) fn notify_stop(&mut self) {
        match self {
            Component::Leaf(leaf) => {
                leaf.process.on_stop();
                leaf.state = ProcessState::Stopped;
            }
            Component::Composite(composite) if composite.is_running() => {}
            Component::Composite(composite) => composite.notify_nested(false),
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafComponent> {
        match self {
            Component::Leaf(leaf) => Some(leaf),
            Component::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeProcess> {
        match self {
            Component::Composite(composite) => Some(composite),
            Component::Leaf(_) => None,
        }
    }

    pub fn as_composite_mut(&mut self) -> Option<&mut CompositeProcess> {
        match self {
            Component::Composite(composite) => Some(composite),
            Component::Leaf(_) => None,
        }
    }

    pub fn feed_handle(&self) -> Option<FeedHandle> {
        self.as_leaf().and_then(|leaf| leaf.process.feed_handle())
    }

    pub fn collector_handle(&self) -> Option<CollectorHandle> {
        self.as_leaf().and_then(|leaf| leaf.process.collector_handle())
    }

    /// Set a constant on an unlinked input.
    pub fn set_input(&self, name: &str, record: Record) -> Result<()> {
        self.bindings().set(PortDirection::Input, name, record)
    }

    pub fn set_parameter(&self, name: &str, record: Record) -> Result<()> {
        self.bindings().set(PortDirection::Parameter, name, record)
    }

    pub fn output(&self, name: &str) -> Option<OutputHandle> {
        self.bindings().output(name).cloned()
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Component::Leaf(leaf) => f
                .debug_struct("Leaf")
                .field("type_tag", &leaf.process.type_tag())
                .field("state", &leaf.state)
                .finish(),
            Component::Composite(composite) => {
                f.debug_tuple("Composite").field(composite).finish()
            }
        }
    }
}

impl From<CompositeProcess> for Component {
    fn from(composite: CompositeProcess) -> Self {
        Component::Composite(Box::new(composite))
    }
}

impl From<Box<dyn Process>> for Component {
    fn from(process: Box<dyn Process>) -> Self {
        Component::leaf(AnyProcess::Plugin(process))
    }
}

impl From<BuiltinProcess> for Component {
    fn from(process: BuiltinProcess) -> Self {
        Component::leaf(AnyProcess::Builtin(process))
    }
}

macro_rules! builtin_component {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BuiltinProcess {
                fn from(process: $ty) -> Self {
                    BuiltinProcess::$variant(process)
                }
            }

            impl From<$ty> for Component {
                fn from(process: $ty) -> Self {
                    Component::from(BuiltinProcess::$variant(process))
                }
            }
        )*
    };
}

builtin_component! {
    Compare => CompareProcess,
    Linear => LinearTransformProcess,
    UnitConversion => UnitConversionProcess,
    LookupTable => LookupTableProcess,
    VectorOp => VectorOpProcess,
    Accumulator => AccumulatorProcess,
    Script => ScriptProcess,
    DataSource => DataSourceProcess,
    Collector => CollectorProcess,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::processes::quantity_schema;

    #[test]
    fn test_leaf_lifecycle() {
        let mut component = Component::from(LinearTransformProcess::with_coefficients(2.0, 1.0));
        assert_eq!(component.state(), ProcessState::Created);
        assert_eq!(component.type_tag(), "linear");

        component.init("chain/scale", &EngineConfig::default()).unwrap();
        assert_eq!(component.state(), ProcessState::Initialized);
        // Second init is a no-op.
        component.init("chain/scale", &EngineConfig::default()).unwrap();

        component.set_input("value", Record::quantity(3.0)).unwrap();
        let mut faults = Vec::new();
        assert!(component.run_pass(&mut faults));
        assert_eq!(
            component.output("value").unwrap().latest_record(),
            Some(Record::quantity(7.0))
        );
    }

    #[test]
    fn test_fault_carries_path() {
        let mut component = Component::from(LinearTransformProcess::new());
        component.init("outer/inner/scale", &EngineConfig::default()).unwrap();

        let mut faults = Vec::new();
        assert!(!component.run_pass(&mut faults));
        assert_eq!(faults.len(), 1);
        assert!(faults[0].to_string().starts_with("outer/inner/scale"));
        assert!(matches!(faults[0].root(), ChainError::MissingInput { .. }));
    }

    #[test]
    fn test_init_rejected_while_started() {
        let mut component = Component::from(CollectorProcess::new(quantity_schema("v")));
        component.init("c", &EngineConfig::default()).unwrap();
        component.notify_start();
        assert!(matches!(
            component.init("c", &EngineConfig::default()),
            Err(ChainError::InvalidState { .. })
        ));
        component.notify_stop();
        assert_eq!(component.state(), ProcessState::Stopped);
    }
}
