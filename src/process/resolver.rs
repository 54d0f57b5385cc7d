//! Link path resolution.
//!
//! Turns the symbolic `source -> dest` paths recorded during assembly into
//! concrete port endpoints, and checks that every destination is bound at
//! most once and accepts its producer's schema. Resolution never mutates
//! the ports; binding cells is left to the composite.

use crate::error::{ChainError, Result, ResultExt};
use crate::process::bindings::PortBindings;
use crate::process::id::{ComponentId, PortId};
use crate::process::port::{PathOwner, PortDirection, PortPath};
use crate::record::RecordSchema;
use std::collections::HashSet;

/// A resolved link end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Port of a child component.
    ChildPort { port: PortId, direction: PortDirection },
    /// The composite's own input, read from inside.
    BoundaryInput(usize),
    /// The composite's own output, written from inside.
    BoundaryOutput(usize),
}

impl Endpoint {
    /// Child owning this end, if any.
    pub fn component(&self) -> Option<ComponentId> {
        match self {
            Endpoint::ChildPort { port, .. } => Some(port.component()),
            _ => None,
        }
    }
}

/// Resolves link paths against a composite's children and boundary ports.
pub struct LinkResolver<'a> {
    children: &'a [(&'a str, &'a PortBindings)],
    boundary: &'a PortBindings,
}

impl<'a> LinkResolver<'a> {
    pub fn new(children: &'a [(&'a str, &'a PortBindings)], boundary: &'a PortBindings) -> Self {
        Self { children, boundary }
    }

    fn child(&self, raw: &str, name: &str) -> Result<ComponentId> {
        let index = self
            .children
            .iter()
            .position(|(child, _)| *child == name)
            .ok_or_else(|| ChainError::unresolved(raw, format!("no component named '{}'", name)))?;
        ComponentId::from_index(index)
    }

    fn child_port(
        &self,
        component: ComponentId,
        direction: PortDirection,
        port: &str,
    ) -> Result<Option<Endpoint>> {
        let Some((_, bindings)) = self.children.get(component.index()) else {
            return Ok(None);
        };
        bindings
            .find(direction, port)
            .map(|index| {
                PortId::new(component, index).map(|port| Endpoint::ChildPort { port, direction })
            })
            .transpose()
    }

    fn missing_port(raw: &str) -> ChainError {
        ChainError::unresolved(raw, "no such port")
    }

    /// Resolve the producing end of a link.
    pub fn resolve_source(&self, raw: &str) -> Result<Endpoint> {
        let path = PortPath::parse(raw)?;
        match (&path.owner, path.direction) {
            (PathOwner::Boundary, Some(PortDirection::Input)) => self
                .boundary
                .find(PortDirection::Input, &path.port)
                .map(Endpoint::BoundaryInput)
                .ok_or_else(|| Self::missing_port(raw)),
            (PathOwner::Child(name), None | Some(PortDirection::Output)) => {
                let component = self.child(raw, name)?;
                self.child_port(component, PortDirection::Output, &path.port)?
                    .ok_or_else(|| Self::missing_port(raw))
            }
            _ => Err(ChainError::unresolved(
                raw,
                "a link source must be a component output or a boundary input",
            )),
        }
    }

    /// Resolve the consuming end of a link.
    ///
    /// A shorthand path names an input first, then a parameter.
    pub fn resolve_dest(&self, raw: &str) -> Result<Endpoint> {
        let path = PortPath::parse(raw)?;
        match (&path.owner, path.direction) {
            (PathOwner::Boundary, Some(PortDirection::Output)) => self
                .boundary
                .find(PortDirection::Output, &path.port)
                .map(Endpoint::BoundaryOutput)
                .ok_or_else(|| Self::missing_port(raw)),
            (PathOwner::Child(name), Some(direction @ (PortDirection::Input | PortDirection::Parameter))) => {
                let component = self.child(raw, name)?;
                self.child_port(component, direction, &path.port)?
                    .ok_or_else(|| Self::missing_port(raw))
            }
            (PathOwner::Child(name), None) => {
                let component = self.child(raw, name)?;
                match self.child_port(component, PortDirection::Input, &path.port)? {
                    Some(endpoint) => Ok(endpoint),
                    None => self
                        .child_port(component, PortDirection::Parameter, &path.port)?
                        .ok_or_else(|| Self::missing_port(raw)),
                }
            }
            _ => Err(ChainError::unresolved(
                raw,
                "a link destination must be a component input or parameter, or a boundary output",
            )),
        }
    }

    /// Resolve both ends of every link, in link order.
    pub fn resolve_all<'l>(
        &self,
        links: impl IntoIterator<Item = (&'l str, &'l str)>,
    ) -> Result<Vec<(Endpoint, Endpoint)>> {
        links
            .into_iter()
            .map(|(source, dest)| -> Result<(Endpoint, Endpoint)> {
                Ok((self.resolve_source(source)?, self.resolve_dest(dest)?))
            })
            .collect()
    }

    /// Schema declared by the port behind `endpoint`.
    pub fn schema(&self, endpoint: &Endpoint) -> Option<&'a RecordSchema> {
        let descriptor = match *endpoint {
            Endpoint::ChildPort { port, direction } => {
                let bindings: &'a PortBindings = self.children.get(port.component().index())?.1;
                bindings.descriptor(direction, port.port_index())
            }
            Endpoint::BoundaryInput(index) => self.boundary.descriptor(PortDirection::Input, index),
            Endpoint::BoundaryOutput(index) => {
                self.boundary.descriptor(PortDirection::Output, index)
            }
        }?;
        Some(&descriptor.schema)
    }

    /// Check schema compatibility and single binding of each destination.
    pub fn check<'l>(
        &self,
        links: impl IntoIterator<Item = (&'l str, &'l str)>,
        resolved: &[(Endpoint, Endpoint)],
    ) -> Result<()> {
        let mut bound = HashSet::new();
        for ((source, dest), (from, to)) in links.into_iter().zip(resolved) {
            let producer = self.schema(from).ok_or_else(|| Self::missing_port(source))?;
            let consumer = self.schema(to).ok_or_else(|| Self::missing_port(dest))?;
            consumer
                .check_assignable_from(producer)
                .with_context(|| format!("link {} -> {}", source, dest))?;

            if !bound.insert(*to) {
                return Err(ChainError::DuplicateLink {
                    dest: dest.to_string(),
                });
            }
            tracing::trace!("Resolved link {} -> {}", source, dest);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::port::PortDescriptor;
    use crate::record::DataComponent;

    fn quantity() -> RecordSchema {
        RecordSchema::new("v", DataComponent::quantity(None))
    }

    fn leaf() -> PortBindings {
        PortBindings::from_ports(&[
            PortDescriptor::input("value", quantity()),
            PortDescriptor::parameter("gain", quantity()),
            PortDescriptor::output("value", quantity()),
            PortDescriptor::output("flag", RecordSchema::new("f", DataComponent::boolean())),
        ])
    }

    fn boundary() -> PortBindings {
        PortBindings::from_ports(&[
            PortDescriptor::input("raw", quantity()),
            PortDescriptor::output("scaled", quantity()),
        ])
    }

    #[test]
    fn test_path_forms() {
        let (a, b, outer) = (leaf(), leaf(), boundary());
        let children = [("a", &a), ("b", &b)];
        let resolver = LinkResolver::new(&children, &outer);

        let expected = Endpoint::ChildPort {
            port: PortId::new(ComponentId(0), 0).unwrap(),
            direction: PortDirection::Output,
        };
        assert_eq!(resolver.resolve_source("a/value").unwrap(), expected);
        assert_eq!(resolver.resolve_source("a.value").unwrap(), expected);
        assert_eq!(
            resolver.resolve_source("components/a/outputs/value").unwrap(),
            expected
        );
        assert_eq!(resolver.resolve_source("inputs/raw").unwrap(), Endpoint::BoundaryInput(0));
        assert_eq!(resolver.resolve_dest("outputs/scaled").unwrap(), Endpoint::BoundaryOutput(0));
        assert_eq!(
            resolver.resolve_dest("b/gain").unwrap(),
            Endpoint::ChildPort {
                port: PortId::new(ComponentId(1), 0).unwrap(),
                direction: PortDirection::Parameter,
            }
        );
    }

    #[test]
    fn test_unresolved_ends() {
        let (a, outer) = (leaf(), boundary());
        let children = [("a", &a)];
        let resolver = LinkResolver::new(&children, &outer);

        for (source, dest) in [
            ("x/value", "a/value"),
            ("a/missing", "a/value"),
            ("a/value", "a/missing"),
            ("outputs/scaled", "a/value"),
            ("a/value", "inputs/raw"),
            ("components/a/inputs/value", "a/value"),
        ] {
            let err = resolver.resolve_all([(source, dest)]).unwrap_err();
            assert!(
                matches!(err, ChainError::UnresolvedPath { .. }),
                "{} -> {}: {}",
                source,
                dest,
                err
            );
        }
    }

    #[test]
    fn test_schema_mismatch() {
        let (a, b, outer) = (leaf(), leaf(), boundary());
        let children = [("a", &a), ("b", &b)];
        let resolver = LinkResolver::new(&children, &outer);

        let links = [("a/flag", "b/value")];
        let resolved = resolver.resolve_all(links).unwrap();
        let err = resolver.check(links, &resolved).unwrap_err();
        assert!(matches!(err.root(), ChainError::Schema(_)));
        assert!(err.to_string().contains("a/flag -> b/value"));
    }

    #[test]
    fn test_duplicate_destination() {
        let (a, b, outer) = (leaf(), leaf(), boundary());
        let children = [("a", &a), ("b", &b)];
        let resolver = LinkResolver::new(&children, &outer);

        let links = [("a/value", "b/value"), ("inputs/raw", "components/b/inputs/value")];
        let resolved = resolver.resolve_all(links).unwrap();
        assert!(matches!(
            resolver.check(links, &resolved),
            Err(ChainError::DuplicateLink { .. })
        ));
    }

    #[test]
    fn test_fan_out_allowed() {
        let (a, b, outer) = (leaf(), leaf(), boundary());
        let children = [("a", &a), ("b", &b)];
        let resolver = LinkResolver::new(&children, &outer);

        let links = [("a/value", "b/value"), ("a/value", "outputs/scaled")];
        let resolved = resolver.resolve_all(links).unwrap();
        resolver.check(links, &resolved).unwrap();
        assert_eq!(resolved[0].1.component(), Some(ComponentId(1)));
        assert_eq!(resolved[1].1.component(), None);
    }
}
