use crate::error::Result;
use crate::process::cell::DataCell;
use crate::process::driver::Waker;
use crate::process::node::{ExecContext, Process};
use crate::process::port::PortDescriptor;
use crate::record::{Record, RecordSchema};

/// Push side of a `data_source` process.
///
/// Held by whatever produces the records (a sensor driver, a test). Each
/// push overwrites the pending record and wakes the streaming worker.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    cell: DataCell,
    schema: RecordSchema,
}

impl FeedHandle {
    pub fn push(&self, record: Record) -> Result<()> {
        self.push_at(record, chrono::Utc::now().timestamp_millis())
    }

    pub fn push_at(&self, record: Record, time_millis: i64) -> Result<()> {
        self.schema.validate(&record)?;
        self.cell.publish(record, time_millis);
        Ok(())
    }

    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Last pushed record.
    pub fn pending(&self) -> Option<Record> {
        self.cell.read()
    }
}

/// Entry point for records coming from outside the chain.
pub struct DataSourceProcess {
    feed: FeedHandle,
    seen: u64,
}

impl DataSourceProcess {
    pub fn new(schema: RecordSchema) -> Self {
        Self {
            feed: FeedHandle {
                cell: DataCell::new(),
                schema,
            },
            seen: 0,
        }
    }

    pub fn feed(&self) -> FeedHandle {
        self.feed.clone()
    }
}

impl Process for DataSourceProcess {
    fn type_tag(&self) -> &str {
        "data_source"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::output("value", self.feed.schema.clone())]
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        let (record, generation) = self.feed.cell.snapshot();
        if generation == self.seen {
            return Ok(());
        }
        self.seen = generation;
        let output = ctx.output("value")?;
        match record {
            Some(record) => output.publish_at(record, self.feed.cell.time_millis()),
            None => {
                output.retract();
                Ok(())
            }
        }
    }

    fn bind_waker(&mut self, waker: Option<Waker>) {
        self.feed.cell.set_waker(waker);
    }
}
