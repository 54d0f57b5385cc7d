//! Process type tags for late-bound chain construction.
//!
//! An importer that reads chains from an external description only knows a
//! process by its tag. `ProcessRegistry` maps each tag to a constructor.

use crate::error::{ChainError, Result, ResultExt};
use crate::process::component::Component;
use crate::process::processes::{
    quantity_schema, AccumulatorProcess, CollectorProcess, CompareProcess, DataSourceProcess,
    LinearTransformProcess, LookupTableProcess, ScriptProcess, UnitConversionProcess,
    VectorOpProcess,
};
use crate::record::{Record, RecordSchema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Built-in process types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Compare,
    Linear,
    UnitConversion,
    #[serde(rename = "lookup_table_1d")]
    LookupTable1D,
    VectorOp,
    Accumulator,
    Script,
    DataSource,
    Collector,
}

impl ProcessType {
    /// Stable tag, as reported by `Process::type_tag`.
    pub fn tag(&self) -> &'static str {
        match self {
            ProcessType::Compare => "compare",
            ProcessType::Linear => "linear",
            ProcessType::UnitConversion => "unit_conversion",
            ProcessType::LookupTable1D => "lookup_table_1d",
            ProcessType::VectorOp => "vector_op",
            ProcessType::Accumulator => "accumulator",
            ProcessType::Script => "script",
            ProcessType::DataSource => "data_source",
            ProcessType::Collector => "collector",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProcessType::Compare => "Compare",
            ProcessType::Linear => "Linear Transform",
            ProcessType::UnitConversion => "Unit Conversion",
            ProcessType::LookupTable1D => "Lookup Table (1D)",
            ProcessType::VectorOp => "Vector Operation",
            ProcessType::Accumulator => "Accumulator",
            ProcessType::Script => "Script",
            ProcessType::DataSource => "Data Source",
            ProcessType::Collector => "Collector",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProcessType::Compare => {
                "Compares a value against a threshold.\n\
                 Routes the value to outputIfTrue or outputIfFalse."
            }
            ProcessType::Linear => "Computes gain * value + bias.",
            ProcessType::UnitConversion => "Converts a quantity between two known units.",
            ProcessType::LookupTable1D => {
                "Interpolates a value in a table of [x, y...] rows.\n\
                 Inputs outside the table are clamped."
            }
            ProcessType::VectorOp => "Applies add, sub, dot, cross, scale, norm or normalize.",
            ProcessType::Accumulator => "Publishes the last windowSize values as an array.",
            ProcessType::Script => "Evaluates a Rhai expression on each new value.",
            ProcessType::DataSource => "Publishes records pushed through its feed.",
            ProcessType::Collector => "Keeps every record it receives.",
        }
    }

    pub fn all() -> &'static [ProcessType] {
        &[
            ProcessType::Compare,
            ProcessType::Linear,
            ProcessType::UnitConversion,
            ProcessType::LookupTable1D,
            ProcessType::VectorOp,
            ProcessType::Accumulator,
            ProcessType::Script,
            ProcessType::DataSource,
            ProcessType::Collector,
        ]
    }

    pub fn from_tag(tag: &str) -> Option<ProcessType> {
        Self::all().iter().copied().find(|t| t.tag() == tag)
    }
}

impl std::fmt::Display for ProcessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Description of one component to construct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub tag: String,
    /// Parameter values, applied after construction.
    #[serde(default)]
    pub parameters: BTreeMap<String, Record>,
    /// Port schema for sources and collectors; a plain quantity if unset.
    #[serde(default)]
    pub schema: Option<RecordSchema>,
}

impl ComponentSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            parameters: BTreeMap::new(),
            schema: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Record>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_schema(mut self, schema: RecordSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    fn value_schema(&self) -> RecordSchema {
        self.schema.clone().unwrap_or_else(|| quantity_schema("value"))
    }
}

/// Constructor registered for a tag.
pub type ProcessFactory = fn(&ComponentSpec) -> Result<Component>;

/// Maps process tags to constructors.
#[derive(Clone, Default)]
pub struct ProcessRegistry {
    factories: HashMap<String, ProcessFactory>,
}

impl ProcessRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in process.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for process_type in ProcessType::all() {
            let factory: ProcessFactory = match process_type {
                ProcessType::Compare => |spec| {
                    Ok(CompareProcess::new()
                        .with_value_schema(spec.value_schema())
                        .into())
                },
                ProcessType::Linear => |_| Ok(LinearTransformProcess::new().into()),
                ProcessType::UnitConversion => |_| Ok(UnitConversionProcess::new().into()),
                ProcessType::LookupTable1D => |spec| {
                    let columns = spec
                        .parameters
                        .get("table")
                        .and_then(table_columns)
                        .unwrap_or(1);
                    Ok(LookupTableProcess::with_columns(columns).into())
                },
                ProcessType::VectorOp => |_| Ok(VectorOpProcess::new().into()),
                ProcessType::Accumulator => |_| Ok(AccumulatorProcess::new().into()),
                ProcessType::Script => |_| Ok(ScriptProcess::new().into()),
                ProcessType::DataSource => {
                    |spec| Ok(DataSourceProcess::new(spec.value_schema()).into())
                }
                ProcessType::Collector => {
                    |spec| Ok(CollectorProcess::new(spec.value_schema()).into())
                }
            };
            registry.register(process_type.tag(), factory);
        }
        registry
    }

    /// Add or replace the constructor for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, factory: ProcessFactory) {
        self.factories.insert(tag.into(), factory);
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Construct the component described by `spec` and apply its parameters.
    pub fn create(&self, spec: &ComponentSpec) -> Result<Component> {
        let factory = self.factories.get(&spec.tag).ok_or_else(|| {
            ChainError::invalid_parameter("tag", format!("unknown process type '{}'", spec.tag))
        })?;
        let component = factory(spec)?;
        for (name, value) in &spec.parameters {
            component
                .set_parameter(name, value.clone())
                .with_context(|| format!("creating '{}'", spec.tag))?;
        }
        Ok(component)
    }
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

/// Dependent columns of a `table` parameter: row width minus the x column.
fn table_columns(table: &Record) -> Option<usize> {
    match table.value() {
        crate::record::Value::Array(rows) => match rows.first()? {
            crate::record::Value::Array(row) if row.len() > 1 => Some(row.len() - 1),
            _ => None,
        },
        _ => None,
    }
}
