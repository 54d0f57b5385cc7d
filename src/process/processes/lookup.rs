use crate::error::{ChainError, Result};
use crate::process::node::{ExecContext, InitContext, Process};
use crate::process::port::PortDescriptor;
use crate::process::processes::{quantity_schema, text_schema};
use crate::record::{DataComponent, Record, RecordSchema, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpolation {
    Step,
    Linear,
}

/// One-dimensional lookup table.
///
/// Each table row is `[x, y1, y2, ...]`, sorted by `x`. Inputs between two
/// rows are interpolated, inputs outside the table take the nearest row.
/// The output is a quantity for one dependent column, a vector otherwise.
pub struct LookupTableProcess {
    columns: usize,
    default_table: Option<Vec<Vec<f64>>>,
    table: Vec<Vec<f64>>,
    interpolation: Interpolation,
    // Search shortcut for monotonically increasing inputs.
    last_input: f64,
    last_row: usize,
}

impl LookupTableProcess {
    pub fn new() -> Self {
        Self::with_columns(1)
    }

    /// Table with `columns` dependent values per row.
    pub fn with_columns(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
            default_table: None,
            table: Vec::new(),
            interpolation: Interpolation::Linear,
            last_input: f64::INFINITY,
            last_row: 0,
        }
    }

    /// Table used when the `table` parameter is not set.
    pub fn with_table(mut self, rows: Vec<Vec<f64>>) -> Self {
        self.default_table = Some(rows);
        self
    }

    pub fn table_schema() -> RecordSchema {
        RecordSchema::new(
            "table",
            DataComponent::array(DataComponent::array(DataComponent::quantity(None), None), None),
        )
    }

    /// Encode rows as a `table` parameter record.
    pub fn table_record(rows: &[Vec<f64>]) -> Record {
        Record::new(Value::Array(
            rows.iter()
                .map(|row| Value::Array(row.iter().map(|v| Value::Quantity(*v)).collect()))
                .collect(),
        ))
    }

    fn output_schema(&self) -> RecordSchema {
        if self.columns == 1 {
            quantity_schema("value")
        } else {
            let names: Vec<String> = (1..=self.columns).map(|i| format!("y{}", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            RecordSchema::new("value", DataComponent::vector(&refs, None))
        }
    }

    fn parse_table(&self, record: &Record) -> Result<Vec<Vec<f64>>> {
        let rows = record
            .value()
            .as_array()
            .ok_or_else(|| ChainError::invalid_parameter("table", "expected an array of rows"))?;
        rows.iter()
            .map(|row| {
                row.as_array()
                    .ok_or_else(|| ChainError::invalid_parameter("table", "row is not an array"))?
                    .iter()
                    .map(|v| {
                        v.as_f64().ok_or_else(|| {
                            ChainError::invalid_parameter("table", "row holds a non-numeric value")
                        })
                    })
                    .collect()
            })
            .collect()
    }

    fn check_table(&self, table: &[Vec<f64>]) -> Result<()> {
        if table.is_empty() {
            return Err(ChainError::invalid_parameter("table", "table is empty"));
        }
        for row in table {
            if row.len() != self.columns + 1 {
                return Err(ChainError::invalid_parameter(
                    "table",
                    format!("rows must have {} values, found {}", self.columns + 1, row.len()),
                ));
            }
        }
        if table.windows(2).any(|w| w[1][0] <= w[0][0]) {
            return Err(ChainError::invalid_parameter(
                "table",
                "rows must be sorted by strictly increasing x",
            ));
        }
        Ok(())
    }

    /// Dependent values at `x`, which must be finite.
    pub fn lookup(&mut self, x: f64) -> Vec<f64> {
        let table = &self.table;
        let last = table.len() - 1;

        if x >= table[last][0] {
            return table[last][1..].to_vec();
        }
        if x <= table[0][0] {
            return table[0][1..].to_vec();
        }

        let mut next = if x >= self.last_input { self.last_row } else { 0 };
        while x > table[next][0] {
            next += 1;
        }
        self.last_row = next;
        self.last_input = x;

        let upper = &table[next];
        if x == upper[0] {
            return upper[1..].to_vec();
        }
        let lower = &table[next - 1];
        match self.interpolation {
            Interpolation::Step => lower[1..].to_vec(),
            Interpolation::Linear => {
                let a = (x - lower[0]) / (upper[0] - lower[0]);
                lower[1..]
                    .iter()
                    .zip(&upper[1..])
                    .map(|(lo, hi)| lo + a * (hi - lo))
                    .collect()
            }
        }
    }
}

impl Default for LookupTableProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for LookupTableProcess {
    fn type_tag(&self) -> &str {
        "lookup_table_1d"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input("value", quantity_schema("value")),
            PortDescriptor::parameter("table", Self::table_schema()).optional(),
            PortDescriptor::parameter("interpolationMethod", text_schema("interpolationMethod"))
                .optional(),
            PortDescriptor::output("value", self.output_schema()),
        ]
    }

    fn init(&mut self, ctx: &InitContext) -> Result<()> {
        let table = match ctx.param("table") {
            Some(record) => self.parse_table(&record)?,
            None => self.default_table.clone().ok_or_else(|| {
                ChainError::invalid_parameter("table", "no table configured")
            })?,
        };
        self.check_table(&table)?;

        self.interpolation = match ctx.param_str("interpolationMethod")?.as_deref() {
            None => Interpolation::Linear,
            Some(m) if m.eq_ignore_ascii_case("linear") => Interpolation::Linear,
            Some(m) if m.eq_ignore_ascii_case("step") => Interpolation::Step,
            Some(other) => {
                return Err(ChainError::invalid_parameter(
                    "interpolationMethod",
                    format!("unsupported method '{}'", other),
                ))
            }
        };

        self.table = table;
        self.last_input = f64::INFINITY;
        self.last_row = 0;
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        if self.table.is_empty() {
            return Err(ChainError::InvalidState {
                expected: "Initialized",
                actual: "Created",
            });
        }
        let input = ctx.input("value")?;
        let x = input
            .as_f64()
            .ok_or_else(|| ChainError::Transform("'value' is not numeric".into()))?;
        if !x.is_finite() {
            return Err(ChainError::Transform(format!("'value' is not finite ({})", x)));
        }
        let ys = self.lookup(x);
        let record = if self.columns == 1 {
            Record::quantity(ys[0])
        } else {
            Record::vector(ys)
        };
        ctx.publish("value", record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CompositeProcess;

    fn table(rows: Vec<Vec<f64>>, columns: usize) -> LookupTableProcess {
        let mut process = LookupTableProcess::with_columns(columns);
        process.check_table(&rows).unwrap();
        process.table = rows;
        process
    }

    #[test]
    fn test_interpolation() {
        let mut lut = table(vec![vec![0.0, 0.0], vec![10.0, 100.0], vec![20.0, 400.0]], 1);
        assert_eq!(lut.lookup(5.0), vec![50.0]);
        assert_eq!(lut.lookup(15.0), vec![250.0]);
        assert_eq!(lut.lookup(10.0), vec![100.0]);
    }

    #[test]
    fn test_clamped_extrapolation() {
        let mut lut = table(vec![vec![0.0, 1.0], vec![1.0, 2.0]], 1);
        assert_eq!(lut.lookup(-5.0), vec![1.0]);
        assert_eq!(lut.lookup(7.0), vec![2.0]);
    }

    #[test]
    fn test_decreasing_input_restarts_search() {
        let mut lut = table(
            vec![vec![0.0, 0.0], vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]],
            1,
        );
        assert_eq!(lut.lookup(2.5), vec![2.5]);
        assert_eq!(lut.lookup(2.75), vec![2.75]);
        assert_eq!(lut.lookup(0.5), vec![0.5]);
    }

    #[test]
    fn test_vector_output() {
        let mut lut = table(vec![vec![0.0, 0.0, 10.0], vec![2.0, 2.0, 30.0]], 2);
        assert_eq!(lut.lookup(1.0), vec![1.0, 20.0]);
    }

    #[test]
    fn test_non_finite_input_faults() {
        let mut chain = CompositeProcess::new("lut");
        chain
            .add_component(
                "curve",
                LookupTableProcess::new().with_table(vec![vec![0.0, 0.0], vec![10.0, 100.0]]),
            )
            .unwrap();
        chain.init().unwrap();

        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            chain.set_input("curve/value", Record::quantity(x)).unwrap();
            let err = chain.execute().unwrap_err();
            assert!(matches!(err.root(), ChainError::Transform(_)), "{}: {}", x, err);
        }

        chain.set_input("curve/value", Record::quantity(5.0)).unwrap();
        chain.execute().unwrap();
        assert_eq!(
            chain.component_output("curve/value").unwrap().latest_record(),
            Some(Record::quantity(50.0))
        );
    }

    #[test]
    fn test_table_validation() {
        let lut = LookupTableProcess::new();
        assert!(lut.check_table(&[]).is_err());
        assert!(lut.check_table(&[vec![0.0, 1.0, 2.0]]).is_err());
        assert!(lut.check_table(&[vec![1.0, 0.0], vec![0.0, 1.0]]).is_err());
    }

    #[test]
    fn test_table_record_round_trip() {
        let rows = vec![vec![0.0, 1.0], vec![1.0, 3.0]];
        let lut = LookupTableProcess::new();
        let record = LookupTableProcess::table_record(&rows);
        assert!(LookupTableProcess::table_schema().validate(&record).is_ok());
        assert_eq!(lut.parse_table(&record).unwrap(), rows);
    }
}
