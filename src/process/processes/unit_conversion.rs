use crate::error::{ChainError, Result};
use crate::process::node::{ExecContext, InitContext, Process};
use crate::process::port::PortDescriptor;
use crate::process::processes::text_schema;
use crate::record::{DataComponent, Record, RecordSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Temperature,
    Length,
    Speed,
    Pressure,
}

/// A known unit of measure: `base = value * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    pub code: &'static str,
    dimension: Dimension,
    scale: f64,
    offset: f64,
}

const UNITS: &[Unit] = &[
    Unit { code: "K", dimension: Dimension::Temperature, scale: 1.0, offset: 0.0 },
    Unit { code: "Cel", dimension: Dimension::Temperature, scale: 1.0, offset: 273.15 },
    Unit {
        code: "[degF]",
        dimension: Dimension::Temperature,
        scale: 5.0 / 9.0,
        offset: 273.15 - 32.0 * 5.0 / 9.0,
    },
    Unit { code: "m", dimension: Dimension::Length, scale: 1.0, offset: 0.0 },
    Unit { code: "km", dimension: Dimension::Length, scale: 1000.0, offset: 0.0 },
    Unit { code: "[ft_i]", dimension: Dimension::Length, scale: 0.3048, offset: 0.0 },
    Unit { code: "m/s", dimension: Dimension::Speed, scale: 1.0, offset: 0.0 },
    Unit { code: "km/h", dimension: Dimension::Speed, scale: 1.0 / 3.6, offset: 0.0 },
    Unit { code: "[kn_i]", dimension: Dimension::Speed, scale: 1852.0 / 3600.0, offset: 0.0 },
    Unit { code: "Pa", dimension: Dimension::Pressure, scale: 1.0, offset: 0.0 },
    Unit { code: "hPa", dimension: Dimension::Pressure, scale: 100.0, offset: 0.0 },
    Unit { code: "bar", dimension: Dimension::Pressure, scale: 1.0e5, offset: 0.0 },
];

impl Unit {
    pub fn lookup(code: &str) -> Option<Unit> {
        UNITS.iter().find(|u| u.code == code).copied()
    }

    pub fn all() -> &'static [Unit] {
        UNITS
    }

    pub fn convert(value: f64, from: &Unit, to: &Unit) -> f64 {
        let base = value * from.scale + from.offset;
        (base - to.offset) / to.scale
    }
}

/// Converts a quantity between two units of the same dimension.
pub struct UnitConversionProcess {
    default_from: Option<String>,
    default_to: Option<String>,
    conversion: Option<(Unit, Unit)>,
}

impl UnitConversionProcess {
    pub fn new() -> Self {
        Self {
            default_from: None,
            default_to: None,
            conversion: None,
        }
    }

    /// Preconfigured conversion. Port schemas carry the unit codes.
    pub fn between(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            default_from: Some(from.into()),
            default_to: Some(to.into()),
            conversion: None,
        }
    }
}

impl Default for UnitConversionProcess {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve(name: &str, code: Option<String>) -> Result<Unit> {
    let code = code.ok_or_else(|| ChainError::invalid_parameter(name, "unit not set"))?;
    Unit::lookup(&code)
        .ok_or_else(|| ChainError::invalid_parameter(name, format!("unknown unit '{}'", code)))
}

impl Process for UnitConversionProcess {
    fn type_tag(&self) -> &str {
        "unit_conversion"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        let quantity = |name: &str, uom: &Option<String>| {
            RecordSchema::new(name, DataComponent::quantity(uom.as_deref()))
        };
        vec![
            PortDescriptor::input("value", quantity("value", &self.default_from)),
            PortDescriptor::parameter("from", text_schema("from")).optional(),
            PortDescriptor::parameter("to", text_schema("to")).optional(),
            PortDescriptor::output("value", quantity("value", &self.default_to)),
        ]
    }

    fn init(&mut self, ctx: &InitContext) -> Result<()> {
        let from = resolve("from", ctx.param_str("from")?.or_else(|| self.default_from.clone()))?;
        let to = resolve("to", ctx.param_str("to")?.or_else(|| self.default_to.clone()))?;
        if from.dimension != to.dimension {
            return Err(ChainError::invalid_parameter(
                "to",
                format!("cannot convert '{}' to '{}'", from.code, to.code),
            ));
        }
        self.conversion = Some((from, to));
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let (from, to) = self.conversion.ok_or(ChainError::InvalidState {
            expected: "Initialized",
            actual: "Created",
        })?;
        let value = ctx.input("value")?;
        let x = value
            .as_f64()
            .ok_or_else(|| ChainError::Transform("'value' is not numeric".into()))?;
        ctx.publish("value", Record::quantity(Unit::convert(x, &from, &to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_temperature() {
        let cel = Unit::lookup("Cel").unwrap();
        let fahr = Unit::lookup("[degF]").unwrap();
        let kelvin = Unit::lookup("K").unwrap();
        assert!(close(Unit::convert(100.0, &cel, &fahr), 212.0));
        assert!(close(Unit::convert(32.0, &fahr, &cel), 0.0));
        assert!(close(Unit::convert(0.0, &cel, &kelvin), 273.15));
    }

    #[test]
    fn test_speed_and_pressure() {
        let kmh = Unit::lookup("km/h").unwrap();
        let ms = Unit::lookup("m/s").unwrap();
        let hpa = Unit::lookup("hPa").unwrap();
        let bar = Unit::lookup("bar").unwrap();
        assert!(close(Unit::convert(36.0, &kmh, &ms), 10.0));
        assert!(close(Unit::convert(1013.25, &hpa, &bar), 1.01325));
    }

    #[test]
    fn test_unknown_unit() {
        assert!(Unit::lookup("furlong").is_none());
        assert!(matches!(
            resolve("from", Some("furlong".into())),
            Err(ChainError::InvalidParameter { .. })
        ));
        assert!(resolve("from", None).is_err());
    }
}
