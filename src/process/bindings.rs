//! Per-process port bindings.
//!
//! Every input and parameter port starts with a private local cell so that
//! constants can be set on unlinked ports. Link resolution swaps that cell
//! for the link's own cell. Output ports are `OutputHandle`s.

use crate::config::EngineConfig;
use crate::error::{ChainError, Result};
use crate::process::cell::DataCell;
use crate::process::driver::Waker;
use crate::process::output::OutputHandle;
use crate::process::port::{PortDescriptor, PortDirection};
use crate::record::Record;
use std::collections::HashSet;

/// Consumer-side slot of an input or parameter port.
#[derive(Debug, Clone)]
pub struct InputSlot {
    descriptor: PortDescriptor,
    cell: DataCell,
    linked: bool,
}

impl InputSlot {
    fn new(descriptor: PortDescriptor) -> Self {
        Self {
            descriptor,
            cell: DataCell::new(),
            linked: false,
        }
    }

    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn cell(&self) -> &DataCell {
        &self.cell
    }

    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

/// All ports of one process.
#[derive(Debug, Clone, Default)]
pub struct PortBindings {
    inputs: Vec<InputSlot>,
    parameters: Vec<InputSlot>,
    outputs: Vec<OutputHandle>,
}

impl PortBindings {
    pub fn from_ports(ports: &[PortDescriptor]) -> Self {
        let mut bindings = Self::default();
        for port in ports {
            bindings.push(port.clone());
        }
        bindings
    }

    fn push(&mut self, descriptor: PortDescriptor) -> usize {
        match descriptor.direction {
            PortDirection::Input => {
                self.inputs.push(InputSlot::new(descriptor));
                self.inputs.len() - 1
            }
            PortDirection::Parameter => {
                self.parameters.push(InputSlot::new(descriptor));
                self.parameters.len() - 1
            }
            PortDirection::Output => {
                self.outputs.push(OutputHandle::new(descriptor));
                self.outputs.len() - 1
            }
        }
    }

    /// Add a port, rejecting a name already used in the same direction.
    pub fn add(&mut self, descriptor: PortDescriptor) -> Result<usize> {
        if self.find(descriptor.direction, &descriptor.name).is_some() {
            return Err(ChainError::DuplicateName(format!(
                "{}/{}",
                descriptor.direction.section(),
                descriptor.name
            )));
        }
        Ok(self.push(descriptor))
    }

    /// Fail if two ports of the same direction share a name.
    pub fn check_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let names = self
            .inputs
            .iter()
            .map(|s| (PortDirection::Input, s.name()))
            .chain(self.parameters.iter().map(|s| (PortDirection::Parameter, s.name())))
            .chain(self.outputs.iter().map(|o| (PortDirection::Output, o.name())));
        for (direction, name) in names {
            if !seen.insert((direction, name)) {
                return Err(ChainError::Schema(format!(
                    "port '{}/{}' declared twice",
                    direction.section(),
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn find(&self, direction: PortDirection, name: &str) -> Option<usize> {
        match direction {
            PortDirection::Input => self.inputs.iter().position(|s| s.name() == name),
            PortDirection::Parameter => self.parameters.iter().position(|s| s.name() == name),
            PortDirection::Output => self.outputs.iter().position(|o| o.name() == name),
        }
    }

    pub fn descriptor(&self, direction: PortDirection, index: usize) -> Option<&PortDescriptor> {
        match direction {
            PortDirection::Input => self.inputs.get(index).map(InputSlot::descriptor),
            PortDirection::Parameter => self.parameters.get(index).map(InputSlot::descriptor),
            PortDirection::Output => self.outputs.get(index).map(OutputHandle::descriptor),
        }
    }

    pub fn inputs(&self) -> &[InputSlot] {
        &self.inputs
    }

    pub fn parameters(&self) -> &[InputSlot] {
        &self.parameters
    }

    pub fn outputs(&self) -> &[OutputHandle] {
        &self.outputs
    }

    pub fn input(&self, name: &str) -> Option<&InputSlot> {
        self.inputs.iter().find(|s| s.name() == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&InputSlot> {
        self.parameters.iter().find(|s| s.name() == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputHandle> {
        self.outputs.iter().find(|o| o.name() == name)
    }

    pub(crate) fn slot(&self, direction: PortDirection, name: &str) -> Option<&InputSlot> {
        match direction {
            PortDirection::Input => self.input(name),
            PortDirection::Parameter => self.parameter(name),
            PortDirection::Output => None,
        }
    }

    /// Write a record into an input or parameter slot.
    pub fn set(&self, direction: PortDirection, name: &str, record: Record) -> Result<()> {
        let slot = self.slot(direction, name).ok_or_else(|| {
            ChainError::unresolved(
                format!("{}/{}", direction.section(), name),
                "no such port",
            )
        })?;
        slot.descriptor.schema.validate(&record)?;
        slot.cell
            .publish(record, chrono::Utc::now().timestamp_millis());
        Ok(())
    }

    /// Replace the cell behind an input or parameter slot with a link cell.
    pub(crate) fn bind(&mut self, direction: PortDirection, index: usize, cell: DataCell) {
        let slot = match direction {
            PortDirection::Input => self.inputs.get_mut(index),
            PortDirection::Parameter => self.parameters.get_mut(index),
            PortDirection::Output => None,
        };
        if let Some(slot) = slot {
            slot.cell = cell;
            slot.linked = true;
        }
    }

    pub(crate) fn configure_outputs(&self, config: &EngineConfig) {
        for output in &self.outputs {
            output.configure(config.telemetry_window, config.listener_queue_depth);
        }
    }

    pub(crate) fn set_input_waker(&self, waker: Option<Waker>) {
        for slot in &self.inputs {
            slot.cell.set_waker(waker.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DataComponent, RecordSchema};

    fn schema() -> RecordSchema {
        RecordSchema::new("v", DataComponent::quantity(None))
    }

    fn bindings() -> PortBindings {
        PortBindings::from_ports(&[
            PortDescriptor::input("value", schema()),
            PortDescriptor::parameter("gain", schema()),
            PortDescriptor::output("value", schema()),
        ])
    }

    #[test]
    fn test_same_name_different_direction() {
        let b = bindings();
        assert!(b.check_unique().is_ok());
        assert_eq!(b.find(PortDirection::Input, "value"), Some(0));
        assert_eq!(b.find(PortDirection::Output, "value"), Some(0));
        assert_eq!(b.find(PortDirection::Parameter, "value"), None);
    }

    #[test]
    fn test_duplicate_port_rejected() {
        let mut b = bindings();
        let err = b.add(PortDescriptor::input("value", schema())).unwrap_err();
        assert!(matches!(err, ChainError::DuplicateName(_)));

        let dup = PortBindings::from_ports(&[
            PortDescriptor::output("x", schema()),
            PortDescriptor::output("x", schema()),
        ]);
        assert!(matches!(dup.check_unique(), Err(ChainError::Schema(_))));
    }

    #[test]
    fn test_set_validates_schema() {
        let b = bindings();
        b.set(PortDirection::Parameter, "gain", Record::quantity(2.0)).unwrap();
        assert_eq!(b.parameter("gain").unwrap().cell().read(), Some(Record::quantity(2.0)));
        assert!(b.set(PortDirection::Input, "value", Record::text("x")).is_err());
        assert!(b.set(PortDirection::Input, "missing", Record::quantity(1.0)).is_err());
    }

    #[test]
    fn test_bind_replaces_local_cell() {
        let mut b = bindings();
        let link = DataCell::new();
        b.bind(PortDirection::Input, 0, link.clone());
        let slot = b.input("value").unwrap();
        assert!(slot.is_linked());
        assert!(slot.cell().same_cell(&link));
    }
}
