//! Composite processes.
//!
//! A composite owns named child components and the links between their
//! ports. Assembly only records names and paths; `init` resolves the links,
//! orders the children and binds one `DataCell` per link. After that the
//! composite runs either one pass at a time (`execute`) or on its own
//! worker thread (see `driver`).

use crate::config::EngineConfig;
use crate::error::{ChainError, Result, ResultExt};
use crate::process::bindings::PortBindings;
use crate::process::cell::DataCell;
use crate::process::component::{Component, ProcessState};
use crate::process::driver::{Waker, Worker};
use crate::process::id::{ComponentId, LinkId, PortId};
use crate::process::output::OutputHandle;
use crate::process::plan::ExecutionPlan;
use crate::process::port::{PathOwner, PortDescriptor, PortDirection, PortPath};
use crate::process::processes::{CollectorHandle, FeedHandle};
use crate::process::resolver::{Endpoint, LinkResolver};
use crate::record::{Record, RecordSchema};

/// Names reserved for the composite's own port sections.
const RESERVED_NAMES: [&str; 4] = ["components", "inputs", "outputs", "parameters"];

/// A link as declared during assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub source: String,
    pub dest: String,
}

/// A link after `init`, with its data cell.
#[derive(Debug, Clone)]
pub struct ResolvedLink {
    pub id: LinkId,
    pub source: String,
    pub dest: String,
    pub from: Endpoint,
    pub to: Endpoint,
    pub cell: DataCell,
}

/// Counters for one pass over a composite's children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub executed: usize,
    /// Children not run because something upstream failed this pass.
    pub skipped: usize,
    pub faulted: usize,
}

/// Result of one pull-mode pass.
#[derive(Debug, Default)]
pub struct PassReport {
    pub stats: PassStats,
    /// Every fault raised during the pass, in execution order.
    pub faults: Vec<ChainError>,
}

pub(crate) struct Child {
    pub(crate) name: String,
    pub(crate) component: Component,
}

/// Boundary input copied into the link cells it feeds.
struct InputForward {
    slot: usize,
    cells: Vec<DataCell>,
    last_generation: u64,
}

/// Link cell copied to a boundary output.
struct OutputForward {
    cell: DataCell,
    output: usize,
    last_generation: u64,
}

/// Children and wiring of a composite. Moves to the worker thread while
/// the composite is started.
pub(crate) struct Graph {
    path: String,
    children: Vec<Child>,
    plan: ExecutionPlan,
    resolved: Vec<ResolvedLink>,
    input_forwards: Vec<InputForward>,
    output_forwards: Vec<OutputForward>,
}

impl Graph {
    fn new() -> Self {
        Self {
            path: String::new(),
            children: Vec::new(),
            plan: ExecutionPlan::default(),
            resolved: Vec::new(),
            input_forwards: Vec::new(),
            output_forwards: Vec::new(),
        }
    }

    fn child(&self, name: &str) -> Option<&Component> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.component)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.children
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.component)
    }

    /// One pass: boundary inputs in, children in plan order, boundary outputs out.
    pub(crate) fn run_pass(
        &mut self,
        boundary: &PortBindings,
        faults: &mut Vec<ChainError>,
    ) -> PassStats {
        let mut stats = PassStats::default();

        for forward in &mut self.input_forwards {
            let Some(slot) = boundary.inputs().get(forward.slot) else {
                continue;
            };
            let (record, generation) = slot.cell().snapshot();
            if generation == forward.last_generation {
                continue;
            }
            forward.last_generation = generation;
            let time_millis = slot.cell().time_millis();
            for cell in &forward.cells {
                match &record {
                    Some(record) => cell.publish(record.clone(), time_millis),
                    None => cell.clear(),
                }
            }
        }

        let mut blocked = vec![false; self.children.len()];
        for &id in &self.plan.order {
            let index = id.index();
            let child = &mut self.children[index];
            let ok = if blocked[index] {
                tracing::debug!("Skipping '{}/{}': upstream fault", self.path, child.name);
                stats.skipped += 1;
                false
            } else if child.component.run_pass(faults) {
                stats.executed += 1;
                true
            } else {
                stats.faulted += 1;
                false
            };
            if !ok {
                for consumer in &self.plan.downstream[index] {
                    blocked[consumer.index()] = true;
                }
            }
        }

        for forward in &mut self.output_forwards {
            let (record, generation) = forward.cell.snapshot();
            if generation == forward.last_generation {
                continue;
            }
            forward.last_generation = generation;
            let Some(output) = boundary.outputs().get(forward.output) else {
                continue;
            };
            match record {
                Some(record) => {
                    if let Err(e) = output.publish_at(record, forward.cell.time_millis()) {
                        tracing::warn!("'{}' could not forward '{}': {}", self.path, output.name(), e);
                        faults.push(e.with_context(self.path.clone()));
                    }
                }
                None => output.retract(),
            }
        }

        tracing::trace!(
            "Pass over '{}': {} executed, {} skipped, {} faulted",
            self.path,
            stats.executed,
            stats.skipped,
            stats.faulted
        );
        stats
    }

    pub(crate) fn attach_wakers(&mut self, waker: Option<Waker>) {
        for child in &mut self.children {
            child.component.attach_waker(waker.clone());
        }
    }

    pub(crate) fn notify(&mut self, started: bool) {
        for child in &mut self.children {
            if started {
                child.component.notify_start();
            } else {
                child.component.notify_stop();
            }
        }
    }
}

/// A process built from named children and links among their ports.
pub struct CompositeProcess {
    pub(super) name: String,
    pub(super) path: String,
    pub(super) config: EngineConfig,
    pub(super) state: ProcessState,
    pub(super) boundary: PortBindings,
    links: Vec<Link>,
    /// `None` while the graph runs on the worker.
    pub(super) graph: Option<Graph>,
    pub(super) worker: Option<Worker>,
}

impl CompositeProcess {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, EngineConfig::default())
    }

    /// Composite using `config`. Nested composites inherit their parent's
    /// config at `init`.
    pub fn with_config(name: impl Into<String>, config: EngineConfig) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            config,
            state: ProcessState::Created,
            boundary: PortBindings::default(),
            links: Vec::new(),
            graph: Some(Graph::new()),
            worker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path, set at `init` when nested.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The composite's own ports.
    pub fn bindings(&self) -> &PortBindings {
        &self.boundary
    }

    pub(crate) fn bindings_mut(&mut self) -> &mut PortBindings {
        &mut self.boundary
    }

    fn ensure_assembling(&self) -> Result<()> {
        match self.state {
            ProcessState::Created => Ok(()),
            other => Err(ChainError::InvalidState {
                expected: "Created",
                actual: other.as_str(),
            }),
        }
    }

    fn graph_ref(&self) -> Result<&Graph> {
        self.graph.as_ref().ok_or(ChainError::InvalidState {
            expected: "Initialized",
            actual: "Started",
        })
    }

    // ===== Assembly =====

    /// Register a child under `name`.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        component: impl Into<Component>,
    ) -> Result<ComponentId> {
        self.ensure_assembling()?;
        let name = name.into();
        if name.is_empty() || name.contains(['/', '.']) || RESERVED_NAMES.contains(&name.as_str()) {
            return Err(ChainError::invalid_parameter(
                "name",
                format!("'{}' cannot be used as a component name", name),
            ));
        }
        let graph = self.graph.as_mut().ok_or(ChainError::InvalidState {
            expected: "Created",
            actual: "Started",
        })?;
        if graph.children.iter().any(|c| c.name == name) {
            return Err(ChainError::DuplicateName(name));
        }

        let id = ComponentId::from_index(graph.children.len())?;
        let component = component.into();
        let ports = component.bindings();
        let widest = ports
            .inputs()
            .len()
            .max(ports.parameters().len())
            .max(ports.outputs().len());
        if widest > PortId::MAX_PORTS {
            return Err(ChainError::Schema(format!(
                "component '{}' declares {} ports in one direction, at most {} are supported",
                name,
                widest,
                PortId::MAX_PORTS
            )));
        }

        tracing::trace!("Added component '{}' to '{}'", name, self.name);
        graph.children.push(Child { name, component });
        Ok(id)
    }

    /// Record a link from `source` to `dest`. Paths are resolved at `init`.
    pub fn add_connection(
        &mut self,
        source: impl Into<String>,
        dest: impl Into<String>,
    ) -> Result<LinkId> {
        self.ensure_assembling()?;
        let id = LinkId(self.links.len() as u32);
        self.links.push(Link {
            source: source.into(),
            dest: dest.into(),
        });
        Ok(id)
    }

    /// Declare a boundary input, linked from inside as `inputs/<name>`.
    pub fn add_input(&mut self, name: impl Into<String>, schema: RecordSchema) -> Result<usize> {
        self.add_port(PortDescriptor::input(name, schema))
    }

    /// Declare a boundary output, linked from inside as `outputs/<name>`.
    pub fn add_output(&mut self, name: impl Into<String>, schema: RecordSchema) -> Result<usize> {
        self.add_port(PortDescriptor::output(name, schema))
    }

    pub fn add_port(&mut self, descriptor: PortDescriptor) -> Result<usize> {
        self.ensure_assembling()?;
        if descriptor.direction == PortDirection::Parameter {
            return Err(ChainError::Schema(format!(
                "composite '{}' cannot declare parameter '{}'",
                self.name, descriptor.name
            )));
        }
        self.boundary.add(descriptor)
    }

    // ===== Constants =====

    /// Write a record into an unlinked input, e.g. `threshold/threshold`
    /// or `inputs/raw` for the composite's own input.
    pub fn set_input(&self, path: &str, record: Record) -> Result<()> {
        self.set_port(path, PortDirection::Input, record)
    }

    /// Write a parameter. Processes read parameters at `init`.
    pub fn set_parameter(&self, path: &str, record: Record) -> Result<()> {
        self.set_port(path, PortDirection::Parameter, record)
    }

    fn set_port(&self, path: &str, default: PortDirection, record: Record) -> Result<()> {
        let port_path = PortPath::parse(path)?;
        let direction = port_path.direction.unwrap_or(default);
        let bindings = self.owner_bindings(path, &port_path.owner)?;
        bindings
            .set(direction, &port_path.port, record)
            .with_context(|| format!("setting '{}' on '{}'", path, self.name))
    }

    fn owner_bindings(&self, path: &str, owner: &PathOwner) -> Result<&PortBindings> {
        match owner {
            PathOwner::Boundary => Ok(&self.boundary),
            PathOwner::Child(name) => {
                let graph = self.graph_ref()?;
                graph
                    .child(name)
                    .map(Component::bindings)
                    .ok_or_else(|| {
                        ChainError::unresolved(path, format!("no component named '{}'", name))
                    })
            }
        }
    }

    // ===== Lifecycle =====

    /// Initialize children, resolve links and fix the execution order.
    ///
    /// Build errors leave the composite in `Created`; nothing is bound.
    pub fn init(&mut self) -> Result<()> {
        let path = self.name.clone();
        let config = self.config.clone();
        self.init_at(&path, &config)
    }

    pub(crate) fn init_at(&mut self, path: &str, config: &EngineConfig) -> Result<()> {
        match self.state {
            ProcessState::Created => {}
            ProcessState::Initialized | ProcessState::Stopped => {
                // Initialized on its own before being nested.
                if self.path != path {
                    self.repath(path, config)?;
                }
                return Ok(());
            }
            ProcessState::Started => {
                return Err(ChainError::InvalidState {
                    expected: "Created",
                    actual: "Started",
                })
            }
        }
        config.validate()?;
        self.boundary.check_unique()?;

        let graph = self.graph.as_mut().ok_or(ChainError::InvalidState {
            expected: "Created",
            actual: "Started",
        })?;
        for child in &graph.children {
            if let Component::Composite(inner) = &child.component {
                if inner.is_running() {
                    return Err(ChainError::InvalidState {
                        expected: "Created",
                        actual: "Started",
                    }
                    .with_context(format!("initializing '{}/{}'", path, child.name)));
                }
            }
        }

        let (endpoints, plan) = {
            let names: Vec<&str> = graph.children.iter().map(|c| c.name.as_str()).collect();
            let ports: Vec<(&str, &PortBindings)> = graph
                .children
                .iter()
                .map(|c| (c.name.as_str(), c.component.bindings()))
                .collect();
            let resolver = LinkResolver::new(&ports, &self.boundary);
            let pairs = self.links.iter().map(|l| (l.source.as_str(), l.dest.as_str()));

            let endpoints = resolver.resolve_all(pairs.clone())?;
            let edges: Vec<(ComponentId, ComponentId)> = endpoints
                .iter()
                .filter_map(|(from, to)| Some((from.component()?, to.component()?)))
                .collect();
            let plan = ExecutionPlan::compute(&names, &edges)?;
            resolver.check(pairs, &endpoints)?;
            (endpoints, plan)
        };

        for child in &mut graph.children {
            let child_path = format!("{}/{}", path, child.name);
            child
                .component
                .init(&child_path, config)
                .with_context(|| format!("initializing '{}'", child_path))?;
        }

        let mut resolved = Vec::with_capacity(endpoints.len());
        let mut input_forwards: Vec<InputForward> = Vec::new();
        let mut output_forwards = Vec::new();
        for (index, (link, (from, to))) in self.links.iter().zip(endpoints).enumerate() {
            let cell = DataCell::new();
            match from {
                Endpoint::ChildPort { port, .. } => {
                    let producer = &graph.children[port.component().index()].component;
                    if let Some(output) = producer.bindings().outputs().get(port.port_index()) {
                        output.add_fanout(cell.clone());
                    }
                }
                Endpoint::BoundaryInput(slot) => {
                    match input_forwards.iter_mut().find(|f| f.slot == slot) {
                        Some(forward) => forward.cells.push(cell.clone()),
                        None => input_forwards.push(InputForward {
                            slot,
                            cells: vec![cell.clone()],
                            last_generation: 0,
                        }),
                    }
                }
                Endpoint::BoundaryOutput(_) => {}
            }
            match to {
                Endpoint::ChildPort { port, direction } => {
                    graph.children[port.component().index()]
                        .component
                        .bindings_mut()
                        .bind(direction, port.port_index(), cell.clone());
                }
                Endpoint::BoundaryOutput(output) => output_forwards.push(OutputForward {
                    cell: cell.clone(),
                    output,
                    last_generation: 0,
                }),
                Endpoint::BoundaryInput(_) => {}
            }
            tracing::debug!("Bound link {} -> {} in '{}'", link.source, link.dest, path);
            resolved.push(ResolvedLink {
                id: LinkId(index as u32),
                source: link.source.clone(),
                dest: link.dest.clone(),
                from,
                to,
                cell,
            });
        }

        self.boundary.configure_outputs(config);
        tracing::info!(
            "Initialized chain '{}': {} components, {} links, order computed in {}us",
            path,
            plan.stats.components,
            resolved.len(),
            plan.stats.compile_time_us
        );

        graph.path = path.to_string();
        graph.plan = plan;
        graph.resolved = resolved;
        graph.input_forwards = input_forwards;
        graph.output_forwards = output_forwards;
        self.path = path.to_string();
        self.config = config.clone();
        self.state = ProcessState::Initialized;
        Ok(())
    }

    fn repath(&mut self, path: &str, config: &EngineConfig) -> Result<()> {
        let graph = self.graph.as_mut().ok_or(ChainError::InvalidState {
            expected: "Initialized",
            actual: "Started",
        })?;
        tracing::debug!("Moving '{}' to '{}'", self.path, path);
        for child in &mut graph.children {
            child
                .component
                .init(&format!("{}/{}", path, child.name), config)?;
        }
        graph.path = path.to_string();
        self.path = path.to_string();
        Ok(())
    }

    /// Run every child once and collect all faults of the pass.
    pub fn run_pass(&mut self) -> Result<PassReport> {
        match self.state {
            ProcessState::Initialized | ProcessState::Stopped => {}
            other => {
                return Err(ChainError::InvalidState {
                    expected: "Initialized",
                    actual: other.as_str(),
                })
            }
        }
        let graph = self.graph.as_mut().ok_or(ChainError::InvalidState {
            expected: "Initialized",
            actual: "Started",
        })?;
        let mut faults = Vec::new();
        let stats = graph.run_pass(&self.boundary, &mut faults);
        Ok(PassReport { stats, faults })
    }

    /// Single-shot execution. Returns the first fault of the pass.
    pub fn execute(&mut self) -> Result<()> {
        let report = self.run_pass()?;
        match report.faults.into_iter().next() {
            Some(fault) => Err(fault),
            None => Ok(()),
        }
    }

    /// Pass run as part of the parent's pass.
    pub(crate) fn run_nested_pass(&mut self, faults: &mut Vec<ChainError>) {
        if let Some(graph) = self.graph.as_mut() {
            graph.run_pass(&self.boundary, faults);
        }
    }

    pub(crate) fn attach_nested_wakers(&mut self, waker: Option<Waker>) {
        if let Some(graph) = self.graph.as_mut() {
            graph.attach_wakers(waker);
        }
    }

    pub(crate) fn notify_nested(&mut self, started: bool) {
        if let Some(graph) = self.graph.as_mut() {
            graph.notify(started);
        }
        self.state = if started {
            ProcessState::Started
        } else {
            ProcessState::Stopped
        };
    }

    // ===== Inspection =====

    /// Handle to a boundary output.
    pub fn output(&self, name: &str) -> Option<OutputHandle> {
        self.boundary.output(name).cloned()
    }

    /// Handle to any output reachable by path, e.g. `threshold/result`.
    pub fn component_output(&self, path: &str) -> Result<OutputHandle> {
        let port_path = PortPath::parse(path)?;
        if matches!(port_path.direction, Some(d) if d != PortDirection::Output) {
            return Err(ChainError::unresolved(path, "not an output port"));
        }
        self.owner_bindings(path, &port_path.owner)?
            .output(&port_path.port)
            .cloned()
            .ok_or_else(|| ChainError::unresolved(path, "no such port"))
    }

    /// Child by name; `outer/inner` descends into nested composites.
    /// `None` while the composite is started.
    pub fn component(&self, path: &str) -> Option<&Component> {
        let (head, rest) = match path.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let child = self.graph.as_ref()?.child(head)?;
        match rest {
            None => Some(child),
            Some(rest) => child.as_composite()?.component(rest),
        }
    }

    pub fn component_mut(&mut self, path: &str) -> Option<&mut Component> {
        let (head, rest) = match path.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let child = self.graph.as_mut()?.child_mut(head)?;
        match rest {
            None => Some(child),
            Some(rest) => child.as_composite_mut()?.component_mut(rest),
        }
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.graph
            .as_ref()
            .map(|g| g.children.iter().map(|c| c.name.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Links with their cells; empty before `init` and while started.
    pub fn resolved_links(&self) -> &[ResolvedLink] {
        self.graph
            .as_ref()
            .map(|g| g.resolved.as_slice())
            .unwrap_or(&[])
    }

    pub fn plan(&self) -> Option<&ExecutionPlan> {
        self.graph
            .as_ref()
            .filter(|_| self.state.is_ready())
            .map(|g| &g.plan)
    }

    /// Feed of the `data_source` child at `path`.
    pub fn feed(&self, path: &str) -> Option<FeedHandle> {
        self.component(path)?.feed_handle()
    }

    /// Records of the `collector` child at `path`.
    pub fn collector(&self, path: &str) -> Option<CollectorHandle> {
        self.component(path)?.collector_handle()
    }
}

impl std::fmt::Debug for CompositeProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeProcess")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("components", &self.component_names())
            .field("links", &self.links)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::processes::{
        quantity_schema, CompareProcess, DataSourceProcess, LinearTransformProcess,
    };

    fn scaler(gain: f64) -> LinearTransformProcess {
        LinearTransformProcess::with_coefficients(gain, 0.0)
    }

    #[test]
    fn test_duplicate_component() {
        let mut chain = CompositeProcess::new("chain");
        chain.add_component("a", scaler(1.0)).unwrap();
        assert!(matches!(
            chain.add_component("a", scaler(2.0)),
            Err(ChainError::DuplicateName(_))
        ));
        assert!(chain.add_component("inputs", scaler(2.0)).is_err());
        assert!(chain.add_component("a.b", scaler(2.0)).is_err());
    }

    struct WideOutputs(usize);

    impl crate::process::node::Process for WideOutputs {
        fn ports(&self) -> Vec<PortDescriptor> {
            (0..self.0)
                .map(|i| PortDescriptor::output(format!("o{}", i), quantity_schema("o")))
                .collect()
        }

        fn execute(&mut self, _ctx: &mut crate::process::node::ExecContext) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_port_limit_rejected() {
        let mut chain = CompositeProcess::new("wide");
        chain
            .add_component("fits", Component::plugin(WideOutputs(PortId::MAX_PORTS)))
            .unwrap();
        assert!(matches!(
            chain.add_component("too_wide", Component::plugin(WideOutputs(PortId::MAX_PORTS + 1))),
            Err(ChainError::Schema(_))
        ));
        assert_eq!(chain.component_names(), vec!["fits"]);
    }

    #[test]
    fn test_linear_chain_order() {
        let mut chain = CompositeProcess::new("chain");
        chain.add_component("c", scaler(10.0)).unwrap();
        chain.add_component("b", scaler(3.0)).unwrap();
        chain.add_component("a", scaler(2.0)).unwrap();
        chain.add_connection("a/value", "b/value").unwrap();
        chain.add_connection("b/value", "c/value").unwrap();
        chain.init().unwrap();

        let order: Vec<_> = chain.plan().unwrap().order.clone();
        assert_eq!(order, vec![ComponentId(2), ComponentId(1), ComponentId(0)]);

        chain.set_input("a/value", Record::quantity(1.0)).unwrap();
        chain.execute().unwrap();
        let out = chain.component_output("c/value").unwrap();
        assert_eq!(out.latest_record(), Some(Record::quantity(60.0)));
    }

    #[test]
    fn test_boundary_ports() {
        let mut chain = CompositeProcess::new("chain");
        chain.add_input("raw", quantity_schema("raw")).unwrap();
        chain.add_output("scaled", quantity_schema("scaled")).unwrap();
        chain.add_component("scale", scaler(4.0)).unwrap();
        chain.add_connection("inputs/raw", "scale/value").unwrap();
        chain.add_connection("scale/value", "outputs/scaled").unwrap();
        chain.init().unwrap();

        chain.set_input("inputs/raw", Record::quantity(2.5)).unwrap();
        chain.execute().unwrap();
        assert_eq!(
            chain.output("scaled").unwrap().latest_record(),
            Some(Record::quantity(10.0))
        );
    }

    #[test]
    fn test_assembly_closed_after_init() {
        let mut chain = CompositeProcess::new("chain");
        chain.add_component("a", scaler(1.0)).unwrap();
        chain.init().unwrap();
        assert!(matches!(
            chain.add_component("b", scaler(1.0)),
            Err(ChainError::InvalidState { .. })
        ));
        assert!(chain.add_connection("a/value", "a/value").is_err());
    }

    #[test]
    fn test_failed_branch_skips_dependents_only() {
        let mut chain = CompositeProcess::new("chain");
        chain.add_component("broken", scaler(1.0)).unwrap();
        chain.add_component("after", scaler(1.0)).unwrap();
        chain.add_component("other", scaler(2.0)).unwrap();
        chain.add_connection("broken/value", "after/value").unwrap();
        chain.init().unwrap();
        chain.set_input("other/value", Record::quantity(1.0)).unwrap();

        let report = chain.run_pass().unwrap();
        assert_eq!(report.faults.len(), 1);
        assert_eq!(
            report.stats,
            PassStats {
                executed: 1,
                skipped: 1,
                faulted: 1
            }
        );
        assert!(chain.execute().is_err());
        assert_eq!(
            chain.component_output("other/value").unwrap().latest_record(),
            Some(Record::quantity(2.0))
        );
    }

    #[test]
    fn test_conditional_outputs() {
        let mut chain = CompositeProcess::new("chain");
        chain
            .add_component("source", DataSourceProcess::new(quantity_schema("value")))
            .unwrap();
        chain
            .add_component("threshold", CompareProcess::new().with_operator(">"))
            .unwrap();
        chain.add_connection("source/value", "threshold/value").unwrap();
        chain.init().unwrap();
        chain
            .set_input("threshold/threshold", Record::quantity(10.0))
            .unwrap();

        let feed = chain.feed("source").unwrap();
        feed.push(Record::quantity(15.0)).unwrap();
        chain.execute().unwrap();
        let if_true = chain.component_output("threshold/outputIfTrue").unwrap();
        let if_false = chain.component_output("threshold/outputIfFalse").unwrap();
        assert_eq!(if_true.latest_record(), Some(Record::quantity(15.0)));
        assert_eq!(if_false.latest_record(), None);

        feed.push(Record::quantity(5.0)).unwrap();
        chain.execute().unwrap();
        assert_eq!(if_true.latest_record(), None);
        assert_eq!(if_false.latest_record(), Some(Record::quantity(5.0)));
    }
}
