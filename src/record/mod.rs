//! Record model: schemas, values and encodings.
//!
//! Schemas are produced by whoever hosts a chain (a sensor driver, a service
//! layer, a test harness). The engine only compares them structurally and
//! checks records against them.

pub mod encoding;
pub mod schema;
pub mod value;

pub use encoding::{ByteOrder, RecommendedEncoding};
pub use schema::{DataComponent, Field, RecordSchema, ScalarKind};
pub use value::{Record, Value};
