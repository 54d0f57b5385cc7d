//! Arena indices of a composite.
//!
//! Children, ports and links are addressed by position in their owning
//! composite. A `PortId` packs the child index and the port's position
//! within one direction into a single `u32`, so both limits are enforced
//! when the ids are made rather than masked later.

use crate::error::{ChainError, Result};
use std::fmt;

/// Position of a child in its composite.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Children one composite can hold.
    pub const MAX_COMPONENTS: usize = 1 << (32 - PortId::PORT_BITS);

    /// Id of the child at `index`, failing past `MAX_COMPONENTS`.
    pub fn from_index(index: usize) -> Result<Self> {
        if index >= Self::MAX_COMPONENTS {
            return Err(ChainError::Schema(format!(
                "a composite holds at most {} components",
                Self::MAX_COMPONENTS
            )));
        }
        Ok(ComponentId(index as u32))
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A child's port: child index in the high 20 bits, the port's position
/// among ports of the same direction in the low 12.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(u32);

impl PortId {
    const PORT_BITS: u32 = 12;
    const PORT_MASK: u32 = (1 << Self::PORT_BITS) - 1;

    /// Ports one component can declare per direction.
    pub const MAX_PORTS: usize = 1 << Self::PORT_BITS;

    pub fn new(component: ComponentId, port_index: usize) -> Result<Self> {
        if port_index >= Self::MAX_PORTS {
            return Err(ChainError::Schema(format!(
                "component {:?} port {} exceeds the limit of {} ports per direction",
                component,
                port_index,
                Self::MAX_PORTS
            )));
        }
        Ok(Self((component.0 << Self::PORT_BITS) | port_index as u32))
    }

    #[inline]
    pub fn component(self) -> ComponentId {
        ComponentId(self.0 >> Self::PORT_BITS)
    }

    #[inline]
    pub fn port_index(self) -> usize {
        (self.0 & Self::PORT_MASK) as usize
    }
}

impl fmt::Debug for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.component().0, self.port_index())
    }
}

/// Position of a link in its composite's link list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u32);

impl LinkId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_id_packing() {
        let component = ComponentId(100);
        let port = PortId::new(component, 7).unwrap();
        assert_eq!(port.component(), component);
        assert_eq!(port.port_index(), 7);
        assert_eq!(format!("{:?}", port), "#100:7");
    }

    #[test]
    fn test_largest_ids_round_trip() {
        let component = ComponentId::from_index(ComponentId::MAX_COMPONENTS - 1).unwrap();
        let port = PortId::new(component, PortId::MAX_PORTS - 1).unwrap();
        assert_eq!(port.component(), component);
        assert_eq!(port.port_index(), 4095);
    }

    #[test]
    fn test_limits_rejected() {
        assert!(matches!(
            PortId::new(ComponentId(0), PortId::MAX_PORTS),
            Err(ChainError::Schema(_))
        ));
        assert!(matches!(
            ComponentId::from_index(ComponentId::MAX_COMPONENTS),
            Err(ChainError::Schema(_))
        ));
    }
}
