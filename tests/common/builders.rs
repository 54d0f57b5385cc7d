//! Test data builders for schemas and chains

use sensorchain::process::processes::{CompareProcess, DataSourceProcess};
use sensorchain::record::Field;
use sensorchain::{quantity_schema, ChainBuilder, CompositeProcess, DataComponent, Record, RecordSchema, Value};

/// Builder for structured test schemas
pub struct SchemaBuilder {
    name: String,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn quantity(mut self, name: &str, uom: &str) -> Self {
        self.fields.push(Field::new(name, DataComponent::quantity(Some(uom))));
        self
    }

    pub fn boolean(mut self, name: &str) -> Self {
        self.fields.push(Field::new(name, DataComponent::boolean()));
        self
    }

    pub fn text(mut self, name: &str) -> Self {
        self.fields.push(Field::new(name, DataComponent::text()));
        self
    }

    pub fn build(self) -> RecordSchema {
        RecordSchema::new(self.name, DataComponent::record(self.fields))
    }
}

/// Weather-station sample matching `weather_schema`.
pub fn weather_record(temperature: f64, pressure: f64, station: &str) -> Record {
    Record::new(Value::Record(vec![
        ("temperature".to_string(), Value::Quantity(temperature)),
        ("pressure".to_string(), Value::Quantity(pressure)),
        ("station".to_string(), Value::Text(station.to_string())),
    ]))
}

pub fn weather_schema(name: &str) -> RecordSchema {
    SchemaBuilder::new(name)
        .quantity("temperature", "Cel")
        .quantity("pressure", "hPa")
        .text("station")
        .build()
}

/// `source -> threshold` with `threshold.threshold` fixed at `threshold`.
pub fn threshold_chain(operator: &str, threshold: f64) -> CompositeProcess {
    ChainBuilder::new("alarm")
        .component("threshold", CompareProcess::new().with_operator(operator))
        .component("source", DataSourceProcess::new(quantity_schema("value")))
        .connect("source/value", "threshold/value")
        .constant("threshold/threshold", Record::quantity(threshold))
        .build()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder() {
        let schema = weather_schema("station");
        schema.validate(&weather_record(12.0, 1013.0, "north")).unwrap();
        assert!(schema.validate(&Record::quantity(1.0)).is_err());
    }
}
