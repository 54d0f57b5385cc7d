use crate::error::Result;
use crate::process::node::{ExecContext, InitContext, Process};
use crate::process::port::PortDescriptor;
use crate::record::{Record, RecordSchema};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Collected {
    records: VecDeque<Record>,
    capacity: usize,
    dropped: u64,
}

/// Read side of a `collector` process.
#[derive(Debug, Clone, Default)]
pub struct CollectorHandle {
    inner: Arc<Mutex<Collected>>,
}

impl CollectorHandle {
    fn lock(&self) -> MutexGuard<'_, Collected> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, record: Record) {
        let mut collected = self.lock();
        // Capacity is 0 only before init.
        let capacity = collected.capacity.max(1);
        while collected.records.len() >= capacity {
            collected.records.pop_front();
            collected.dropped += 1;
        }
        collected.records.push_back(record);
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> Vec<Record> {
        self.lock().records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn last(&self) -> Option<Record> {
        self.lock().records.back().cloned()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Records evicted because the collector was full.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    pub fn clear(&self) {
        let mut collected = self.lock();
        collected.records.clear();
        collected.dropped = 0;
    }
}

/// Terminal process keeping the most recent records it receives.
///
/// Holds `collector_capacity` records from the engine config unless
/// built `with_capacity`; the oldest record is evicted when full.
pub struct CollectorProcess {
    schema: RecordSchema,
    capacity: Option<usize>,
    handle: CollectorHandle,
}

impl CollectorProcess {
    pub fn new(schema: RecordSchema) -> Self {
        Self {
            schema,
            capacity: None,
            handle: CollectorHandle::default(),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity.max(1));
        self
    }

    pub fn handle(&self) -> CollectorHandle {
        self.handle.clone()
    }
}

impl Process for CollectorProcess {
    fn type_tag(&self) -> &str {
        "collector"
    }

    fn ports(&self) -> Vec<PortDescriptor> {
        vec![PortDescriptor::input("value", self.schema.clone()).optional()]
    }

    fn init(&mut self, ctx: &InitContext) -> Result<()> {
        let capacity = self.capacity.unwrap_or(ctx.config().collector_capacity);
        let mut collected = self.handle.lock();
        collected.capacity = capacity;
        while collected.records.len() > capacity {
            collected.records.pop_front();
            collected.dropped += 1;
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut ExecContext) -> Result<()> {
        if let Some(record) = ctx.fresh_input("value") {
            self.handle.push(record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::process::processes::quantity_schema;
    use crate::process::CompositeProcess;

    #[test]
    fn test_oldest_records_evicted() {
        let mut chain = CompositeProcess::new("c");
        chain
            .add_component(
                "log",
                CollectorProcess::new(quantity_schema("value")).with_capacity(3),
            )
            .unwrap();
        chain.init().unwrap();

        for i in 0..5 {
            chain.set_input("log/value", Record::quantity(i as f64)).unwrap();
            chain.execute().unwrap();
        }

        let log = chain.collector("log").unwrap();
        assert_eq!(
            log.records(),
            vec![Record::quantity(2.0), Record::quantity(3.0), Record::quantity(4.0)]
        );
        assert_eq!(log.dropped(), 2);
        assert_eq!(log.last(), Some(Record::quantity(4.0)));
    }

    #[test]
    fn test_capacity_from_config() {
        let config = EngineConfig {
            collector_capacity: 2,
            ..Default::default()
        };
        let mut chain = CompositeProcess::with_config("c", config);
        chain
            .add_component("log", CollectorProcess::new(quantity_schema("value")))
            .unwrap();
        chain.init().unwrap();

        let log = chain.collector("log").unwrap();
        assert_eq!(log.capacity(), 2);
        for i in 0..4 {
            chain.set_input("log/value", Record::quantity(i as f64)).unwrap();
            chain.execute().unwrap();
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 2);
    }
}
