use crate::error::{ChainError, Result};
use crate::process::node::{ExecContext, InitContext, Process};
use crate::process::port::PortDescriptor;
use crate::process::processes::{quantity_schema, text_schema};
use crate::record::{DataComponent, Record, RecordSchema};
use std::fmt;
use std::str::FromStr;

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

impl CompareOperator {
    pub fn apply(self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOperator::Greater => value > threshold,
            CompareOperator::Less => value < threshold,
            CompareOperator::GreaterOrEqual => value >= threshold,
            CompareOperator::LessOrEqual => value <= threshold,
        }
    }
}

impl FromStr for CompareOperator {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ">" => Ok(CompareOperator::Greater),
            "<" => Ok(CompareOperator::Less),
            ">=" | "≥" => Ok(CompareOperator::GreaterOrEqual),
            "<=" | "≤" => Ok(CompareOperator::LessOrEqual),
            other => Err(ChainError::invalid_parameter(
                "operator",
                format!("'{}' is not one of >, <, >=, <=", other),
            )),
        }
    }
}

impl fmt::Display for CompareOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            CompareOperator::Greater => ">",
            CompareOperator::Less => "<",
            CompareOperator::GreaterOrEqual => ">=",
            CompareOperator::LessOrEqual => "<=",
        };
        f.write_str(token)
    }
}

/// Compares `value` against `threshold`.
///
/// Publishes the boolean `result`, and routes the value to `outputIfTrue`
/// or `outputIfFalse`. The other conditional output is retracted.
pub struct CompareProcess {
    value_schema: RecordSchema,
    default_operator: Option<String>,
    operator: Option<CompareOperator>,
}

impl CompareProcess {
    pub fn new() -> Self {
        Self {
            value_schema: quantity_schema("value"),
            default_operator: None,
            operator: None,
        }
    }

    /// Operator used when the `operator` parameter is not set.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.default_operator = Some(operator.into());
        self
    }

    /// Schema of `value` and of both conditional outputs.
    pub fn with_value_schema(mut self, schema: RecordSchema) -> Self {
        self.value_schema = schema;
        self
    }

    pub fn operator(&self) -> Option<CompareOperator> {
        self.operator
    }
}

impl Default for CompareProcess {
    fn default() -> Self {
        Self::new()
    }
}

fn number(record: &Record, port: &str) -> Result<f64> {
    record.as_f64().ok_or_else(|| {
        ChainError::Transform(format!(
            "'{}' is not numeric ({})",
            port,
            record.value().kind_name()
        ))
    })
}

impl Process for CompareProcess {
    fn type_tag(&self) -> &str {
        "compare"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![
            PortDescriptor::input("value", self.value_schema.clone()),
            PortDescriptor::input("threshold", quantity_schema("threshold")),
            PortDescriptor::parameter("operator", text_schema("operator")),
            PortDescriptor::output(
                "result",
                RecordSchema::new("result", DataComponent::boolean()),
            ),
            PortDescriptor::output("outputIfTrue", self.value_schema.clone()),
            PortDescriptor::output("outputIfFalse", self.value_schema.clone()),
        ]
    }

    fn init(&mut self, ctx: &InitContext) -> Result<()> {
        let token = match ctx.param_str("operator")? {
            Some(token) => token,
            None => self.default_operator.clone().ok_or_else(|| {
                ChainError::invalid_parameter("operator", "no operator configured")
            })?,
        };
        self.operator = Some(token.parse()?);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let operator = self.operator.ok_or(ChainError::InvalidState {
            expected: "Initialized",
            actual: "Created",
        })?;
        let value = ctx.input("value")?;
        let threshold = ctx.input("threshold")?;

        let result = operator.apply(number(&value, "value")?, number(&threshold, "threshold")?);

        ctx.publish("result", Record::boolean(result))?;
        if result {
            ctx.publish("outputIfTrue", value)?;
            ctx.retract("outputIfFalse")?;
        } else {
            ctx.publish("outputIfFalse", value)?;
            ctx.retract("outputIfTrue")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_tokens() {
        assert_eq!(">".parse::<CompareOperator>().unwrap(), CompareOperator::Greater);
        assert_eq!("≥".parse::<CompareOperator>().unwrap(), CompareOperator::GreaterOrEqual);
        assert_eq!("<=".parse::<CompareOperator>().unwrap(), CompareOperator::LessOrEqual);
        assert!(matches!(
            "==".parse::<CompareOperator>(),
            Err(ChainError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_apply() {
        assert!(CompareOperator::Greater.apply(15.0, 10.0));
        assert!(!CompareOperator::Greater.apply(10.0, 10.0));
        assert!(CompareOperator::GreaterOrEqual.apply(10.0, 10.0));
        assert!(CompareOperator::Less.apply(5.0, 10.0));
    }

    #[test]
    fn test_ports() {
        let ports = CompareProcess::new().ports();
        let names: Vec<_> = ports.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["value", "threshold", "operator", "result", "outputIfTrue", "outputIfFalse"]
        );
    }
}
