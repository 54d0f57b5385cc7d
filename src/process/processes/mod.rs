//! Built-in leaf processes.

mod accumulator;
mod compare;
mod linear;
mod lookup;
mod script;
mod sink;
mod source;
mod unit_conversion;
mod vecmath;

pub use accumulator::AccumulatorProcess;
pub use compare::{CompareOperator, CompareProcess};
pub use linear::LinearTransformProcess;
pub use lookup::LookupTableProcess;
pub use script::ScriptProcess;
pub use sink::{CollectorHandle, CollectorProcess};
pub use source::{DataSourceProcess, FeedHandle};
pub use unit_conversion::{Unit, UnitConversionProcess};
pub use vecmath::{VectorOp, VectorOpProcess};

use crate::record::{DataComponent, RecordSchema};

/// Plain numeric schema used by the scalar built-ins.
pub fn quantity_schema(name: &str) -> RecordSchema {
    RecordSchema::new(name, DataComponent::quantity(None))
}

pub(crate) fn text_schema(name: &str) -> RecordSchema {
    RecordSchema::new(name, DataComponent::text())
}
