//! Hierarchical processing chains.
//!
//! Data flows from sources through leaf processes into sinks. Composites
//! group children and links into a reusable process with its own boundary
//! ports, and may be nested inside other composites.
//!
//! # Architecture
//!
//! ```text
//! [DataSource] ──► [Compare] ──outputIfTrue──► [Collector]
//!                           └──result───────► outputs/alarm
//! ```
//!
//! # Design
//!
//! - **One cell per link**: each link owns a latest-value `DataCell`; fan-out
//!   copies the record into every consumer's cell.
//! - **Enum dispatch on hot path**: built-in leaves live in `BuiltinProcess`,
//!   user leaves implement `Process`.
//! - **Plan fixed at init**: children run in topological order, cycles are
//!   rejected with their path.
//! - **Dedicated thread**: a started composite runs on its own worker, woken
//!   by sources over a coalescing channel.

pub mod bindings;
pub mod builder;
pub mod cell;
pub mod component;
pub mod composite;
pub mod driver;
pub mod id;
pub mod node;
pub mod output;
pub mod plan;
pub mod port;
pub mod process_type;
pub mod processes;
pub mod resolver;
pub mod telemetry;

pub use bindings::{InputSlot, PortBindings};
pub use builder::ChainBuilder;
pub use cell::DataCell;
pub use component::{Component, LeafComponent, ProcessState};
pub use composite::{CompositeProcess, Link, PassReport, PassStats, ResolvedLink};
pub use driver::Waker;
pub use id::{ComponentId, LinkId, PortId};
pub use node::{AnyProcess, BuiltinProcess, ExecContext, InitContext, Process};
pub use output::{OutputEvent, OutputHandle, Subscription};
pub use plan::{ExecutionPlan, PlanStats};
pub use port::{PathOwner, PortDescriptor, PortDirection, PortPath};
pub use process_type::{ComponentSpec, ProcessFactory, ProcessRegistry, ProcessType};
pub use processes::{quantity_schema, CollectorHandle, FeedHandle};
pub use resolver::{Endpoint, LinkResolver};
pub use telemetry::OutputTelemetry;
