//! # sensorchain: Dataflow Processing Chains for Sensor Records
//!
//! Builds processing chains out of leaf processes and nested composites,
//! connected by typed links that each carry the latest record. A chain runs
//! either one pass at a time on the caller's thread, or on its own worker
//! thread that wakes whenever a source has new data.
//!
//! ## Architecture
//!
//! - **Records**: self-describing values checked against `RecordSchema`s
//! - **Processes**: built-in leaves (compare, linear, lookup, script...) plus user plugins
//! - **Composites**: named children, links, boundary ports and an execution plan
//! - **Driver**: crossbeam-channel worker loop with coalescing wakes
//! - **Scripting**: Rhai expressions for the `script` leaf
//!
//! ## Example
//!
//! ```ignore
//! use sensorchain::process::processes::{CollectorProcess, CompareProcess, DataSourceProcess};
//! use sensorchain::{quantity_schema, ChainBuilder, Record};
//!
//! let mut chain = ChainBuilder::new("alarm")
//!     .component("source", DataSourceProcess::new(quantity_schema("value")))
//!     .component("threshold", CompareProcess::new().with_operator(">"))
//!     .component("alarms", CollectorProcess::new(quantity_schema("value")))
//!     .connect("source/value", "threshold/value")
//!     .connect("threshold/outputIfTrue", "alarms/value")
//!     .constant("threshold/threshold", Record::quantity(10.0))
//!     .build()?;
//!
//! let feed = chain.feed("source").unwrap();
//! let alarms = chain.collector("alarms").unwrap();
//! let faults = chain.start_with_channel()?;
//!
//! feed.push(Record::quantity(12.5))?;
//! ```

pub mod config;
pub mod error;
pub mod process;
pub mod record;
pub mod scripting;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{ChainError, Result, ResultExt};
pub use process::{
    quantity_schema, ChainBuilder, CollectorHandle, Component, ComponentSpec, CompositeProcess,
    ExecContext, FeedHandle, InitContext, OutputHandle, PassReport, Process, ProcessRegistry,
    ProcessState, ProcessType,
};
pub use record::{DataComponent, Record, RecordSchema, Value};
