//! Mock construction helpers

use mockall::mock;
use sensorchain::process::{ExecContext, PortDescriptor};
use sensorchain::{quantity_schema, ChainError, Process, Result};

mock! {
    pub Leaf {}

    impl Process for Leaf {
        fn ports(&self) -> Vec<PortDescriptor>;
        fn execute(&mut self, ctx: &mut ExecContext) -> Result<()>;
    }
}

/// Ports of a quantity pass-through: input `value`, output `value`.
pub fn pass_through_ports() -> Vec<PortDescriptor> {
    vec![
        PortDescriptor::input("value", quantity_schema("value")),
        PortDescriptor::output("value", quantity_schema("value")),
    ]
}

/// Mock leaf doubling its input, failing on pass `fail_on`.
pub fn doubler_failing_on(fail_on: u64) -> MockLeaf {
    let mut leaf = MockLeaf::new();
    leaf.expect_ports().returning(pass_through_ports);
    leaf.expect_execute().returning(move |ctx| {
        if ctx.pass() == fail_on {
            return Err(ChainError::Transform(format!("sensor glitch on pass {}", fail_on)));
        }
        let value = ctx.input("value")?.as_f64().unwrap_or_default();
        ctx.publish("value", sensorchain::Record::quantity(value * 2.0))
    });
    leaf
}

/// Leaf doubling its input that panics on pass `panic_on`.
pub struct PanickingDoubler {
    pub panic_on: u64,
}

impl Process for PanickingDoubler {
    fn ports(&self) -> Vec<PortDescriptor> {
        pass_through_ports()
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        if ctx.pass() == self.panic_on {
            panic!("sensor driver crashed on pass {}", self.panic_on);
        }
        let value = ctx.input("value")?.as_f64().unwrap_or_default();
        ctx.publish("value", sensorchain::Record::quantity(value * 2.0))
    }
}

/// Mock leaf that always fails, counting its calls.
pub fn always_failing(calls: std::sync::Arc<std::sync::atomic::AtomicUsize>) -> MockLeaf {
    let mut leaf = MockLeaf::new();
    leaf.expect_ports().returning(pass_through_ports);
    leaf.expect_execute().returning(move |ctx| {
        calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Err(ChainError::Transform(format!("bad reading on pass {}", ctx.pass())))
    });
    leaf
}
