use crate::error::{ChainError, Result};
use crate::process::node::{ExecContext, InitContext, Process};
use crate::process::port::PortDescriptor;
use crate::process::processes::{quantity_schema, text_schema};
use crate::record::{DataComponent, Record, RecordSchema};
use std::str::FromStr;

/// Operation applied by `VectorOpProcess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOp {
    Add,
    Sub,
    Dot,
    Cross,
    /// `a * b` where `b` is a scalar.
    Scale,
    Norm,
    Normalize,
}

impl VectorOp {
    /// Whether `b` is read.
    pub fn is_binary(self) -> bool {
        !matches!(self, VectorOp::Norm | VectorOp::Normalize)
    }

    /// Whether the result is a scalar.
    pub fn is_scalar(self) -> bool {
        matches!(self, VectorOp::Dot | VectorOp::Norm)
    }
}

impl FromStr for VectorOp {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(VectorOp::Add),
            "sub" => Ok(VectorOp::Sub),
            "dot" => Ok(VectorOp::Dot),
            "cross" => Ok(VectorOp::Cross),
            "scale" => Ok(VectorOp::Scale),
            "norm" => Ok(VectorOp::Norm),
            "normalize" => Ok(VectorOp::Normalize),
            other => Err(ChainError::invalid_parameter(
                "operation",
                format!("unknown vector operation '{}'", other),
            )),
        }
    }
}

fn same_len(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(ChainError::Transform(format!(
            "vector sizes differ ({} vs {})",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

fn norm(a: &[f64]) -> f64 {
    a.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Apply `op` to raw coordinates. `b` is ignored by unary operations.
pub fn apply(op: VectorOp, a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
    match op {
        VectorOp::Add => {
            same_len(a, b)?;
            Ok(a.iter().zip(b).map(|(x, y)| x + y).collect())
        }
        VectorOp::Sub => {
            same_len(a, b)?;
            Ok(a.iter().zip(b).map(|(x, y)| x - y).collect())
        }
        VectorOp::Dot => {
            same_len(a, b)?;
            Ok(vec![a.iter().zip(b).map(|(x, y)| x * y).sum()])
        }
        VectorOp::Cross => {
            if a.len() != 3 || b.len() != 3 {
                return Err(ChainError::Transform("cross product needs 3D vectors".into()));
            }
            Ok(vec![
                a[1] * b[2] - a[2] * b[1],
                a[2] * b[0] - a[0] * b[2],
                a[0] * b[1] - a[1] * b[0],
            ])
        }
        VectorOp::Scale => {
            let k = *b
                .first()
                .ok_or_else(|| ChainError::Transform("scale factor missing".into()))?;
            Ok(a.iter().map(|x| x * k).collect())
        }
        VectorOp::Norm => Ok(vec![norm(a)]),
        VectorOp::Normalize => {
            let n = norm(a);
            if n == 0.0 {
                return Err(ChainError::Transform("cannot normalize a zero vector".into()));
            }
            Ok(a.iter().map(|x| x / n).collect())
        }
    }
}

/// Vector arithmetic on `a` and `b`.
pub struct VectorOpProcess {
    coordinates: Vec<String>,
    default_operation: Option<String>,
    operation: Option<VectorOp>,
}

impl VectorOpProcess {
    /// Operates on 3D `x`, `y`, `z` vectors.
    pub fn new() -> Self {
        Self::with_coordinates(&["x", "y", "z"])
    }

    pub fn with_coordinates(coordinates: &[&str]) -> Self {
        Self {
            coordinates: coordinates.iter().map(|c| c.to_string()).collect(),
            default_operation: None,
            operation: None,
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.default_operation = Some(operation.into());
        self
    }

    fn declared_operation(&self) -> Option<VectorOp> {
        self.default_operation.as_deref().and_then(|op| op.parse().ok())
    }

    fn vector_schema(&self, name: &str) -> RecordSchema {
        let refs: Vec<&str> = self.coordinates.iter().map(String::as_str).collect();
        RecordSchema::new(name, DataComponent::vector(&refs, None))
    }

    fn operand(&self, ctx: &ExecContext, name: &str) -> Result<Vec<f64>> {
        let record = ctx.input(name)?;
        match record.value().as_vector() {
            Some(v) => Ok(v.to_vec()),
            None => record.as_f64().map(|x| vec![x]).ok_or_else(|| {
                ChainError::Transform(format!("'{}' is neither a vector nor a number", name))
            }),
        }
    }
}

impl Default for VectorOpProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for VectorOpProcess {
    fn type_tag(&self) -> &str {
        "vector_op"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        // Port types follow the operation given at construction.
        let declared = self.declared_operation();
        let result = match declared {
            Some(op) if op.is_scalar() => quantity_schema("result"),
            _ => self.vector_schema("result"),
        };
        let b = match declared {
            Some(VectorOp::Scale) => quantity_schema("b"),
            _ => self.vector_schema("b"),
        };
        vec![
            PortDescriptor::input("a", self.vector_schema("a")),
            PortDescriptor::input("b", b).optional(),
            PortDescriptor::parameter("operation", text_schema("operation")).optional(),
            PortDescriptor::output("result", result),
        ]
    }

    fn init(&mut self, ctx: &InitContext) -> Result<()> {
        let token = ctx
            .param_str("operation")?
            .or_else(|| self.default_operation.clone())
            .ok_or_else(|| ChainError::invalid_parameter("operation", "no operation configured"))?;
        let op: VectorOp = token.parse()?;

        let declared_scalar = self.declared_operation().map_or(false, VectorOp::is_scalar);
        if op.is_scalar() != declared_scalar {
            return Err(ChainError::Schema(format!(
                "operation '{}' does not match the declared result port; construct with with_operation(\"{}\")",
                token, token
            )));
        }
        self.operation = Some(op);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let op = self.operation.ok_or(ChainError::InvalidState {
            expected: "Initialized",
            actual: "Created",
        })?;
        let a = self.operand(ctx, "a")?;
        let b = if op.is_binary() {
            self.operand(ctx, "b")?
        } else {
            Vec::new()
        };
        let out = apply(op, &a, &b)?;
        let record = if op.is_scalar() {
            Record::quantity(out[0])
        } else {
            Record::vector(out)
        };
        ctx.publish("result", record)
    }
}
