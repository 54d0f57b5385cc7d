//! Output ports and their outbound interface.
//!
//! An `OutputHandle` is the producer end of every link leaving a port. On
//! publish it validates the record, stores it as the port's latest value,
//! copies it into each fan-out link cell, updates telemetry and notifies
//! subscribers. Handles are cheap `Arc` clones, so a hosting service can
//! keep one while the chain runs on a worker thread.

use crate::error::{ChainError, Result};
use crate::process::cell::DataCell;
use crate::process::port::PortDescriptor;
use crate::process::telemetry::OutputTelemetry;
use crate::record::{RecommendedEncoding, Record, RecordSchema};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Notification delivered to subscribers on each publish.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEvent {
    pub port: String,
    pub record: Record,
    pub time_millis: i64,
}

/// Receiving end of an output subscription.
///
/// The queue is bounded; events published while it is full are dropped for
/// this subscriber only.
pub struct Subscription {
    id: u64,
    receiver: Receiver<OutputEvent>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn receiver(&self) -> &Receiver<OutputEvent> {
        &self.receiver
    }

    pub fn try_recv(&self) -> Option<OutputEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<OutputEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

struct OutputShared {
    descriptor: PortDescriptor,
    latest: DataCell,
    fanout: Mutex<Vec<DataCell>>,
    telemetry: Mutex<OutputTelemetry>,
    listeners: Mutex<Vec<(u64, Sender<OutputEvent>)>>,
    next_listener_id: AtomicU64,
    queue_depth: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared handle to one output port.
#[derive(Clone)]
pub struct OutputHandle {
    shared: Arc<OutputShared>,
}

impl OutputHandle {
    pub fn new(descriptor: PortDescriptor) -> Self {
        Self {
            shared: Arc::new(OutputShared {
                descriptor,
                latest: DataCell::new(),
                fanout: Mutex::new(Vec::new()),
                telemetry: Mutex::new(OutputTelemetry::default()),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
                queue_depth: AtomicUsize::new(crate::config::DEFAULT_LISTENER_QUEUE_DEPTH),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.descriptor.name
    }

    pub fn descriptor(&self) -> &PortDescriptor {
        &self.shared.descriptor
    }

    pub fn record_description(&self) -> &RecordSchema {
        &self.shared.descriptor.schema
    }

    pub fn recommended_encoding(&self) -> &RecommendedEncoding {
        &self.shared.descriptor.encoding
    }

    pub fn latest_record(&self) -> Option<Record> {
        self.shared.latest.read()
    }

    /// Epoch millis of the latest publish, 0 if nothing was published yet.
    pub fn latest_record_time(&self) -> i64 {
        self.shared.latest.time_millis()
    }

    pub fn latest_record_datetime(&self) -> Option<DateTime<Utc>> {
        match self.latest_record_time() {
            0 => None,
            millis => DateTime::from_timestamp_millis(millis),
        }
    }

    /// Mean publish interval in milliseconds over the telemetry window.
    pub fn average_sampling_period(&self) -> f64 {
        lock(&self.shared.telemetry).average_period()
    }

    pub fn subscribe(&self) -> Subscription {
        let depth = self.shared.queue_depth.load(Ordering::Relaxed).max(1);
        let (tx, rx) = bounded(depth);
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.listeners).push((id, tx));
        Subscription { id, receiver: rx }
    }

    /// Remove a subscription. Returns whether it was registered.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut listeners = lock(&self.shared.listeners);
        let before = listeners.len();
        listeners.retain(|(listener, _)| *listener != id);
        listeners.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.listeners).len()
    }

    /// Publish with the current wall-clock time.
    pub fn publish(&self, record: Record) -> Result<()> {
        self.publish_at(record, Utc::now().timestamp_millis())
    }

    pub fn publish_at(&self, record: Record, time_millis: i64) -> Result<()> {
        self.shared
            .descriptor
            .schema
            .validate(&record)
            .map_err(|e| match e {
                ChainError::Schema(msg) => {
                    ChainError::Schema(format!("output '{}': {}", self.name(), msg))
                }
                other => other,
            })?;

        for cell in lock(&self.shared.fanout).iter() {
            cell.publish(record.clone(), time_millis);
        }
        self.shared.latest.publish(record.clone(), time_millis);
        lock(&self.shared.telemetry).record_publish(time_millis);
        self.notify(&record, time_millis);
        Ok(())
    }

    /// Clear the latest value and every fan-out cell.
    pub fn retract(&self) {
        self.shared.latest.clear();
        for cell in lock(&self.shared.fanout).iter() {
            cell.clear();
        }
    }

    fn notify(&self, record: &Record, time_millis: i64) {
        let mut listeners = lock(&self.shared.listeners);
        if listeners.is_empty() {
            return;
        }
        listeners.retain(|(id, tx)| {
            let event = OutputEvent {
                port: self.shared.descriptor.name.clone(),
                record: record.clone(),
                time_millis,
            };
            match tx.try_send(event) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => {
                    tracing::trace!("Dropping closed subscription {} on '{}'", id, self.name());
                    false
                }
            }
        });
    }

    /// Attach a link cell fed by this output.
    pub(crate) fn add_fanout(&self, cell: DataCell) {
        lock(&self.shared.fanout).push(cell);
    }

    pub fn fanout_count(&self) -> usize {
        lock(&self.shared.fanout).len()
    }

    /// Apply engine settings. Resets telemetry.
    pub(crate) fn configure(&self, telemetry_window: usize, listener_queue_depth: usize) {
        *lock(&self.shared.telemetry) = OutputTelemetry::new(telemetry_window);
        self.shared
            .queue_depth
            .store(listener_queue_depth, Ordering::Relaxed);
    }

    pub fn same_port(&self, other: &OutputHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for OutputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputHandle")
            .field("name", &self.name())
            .field("latest", &self.latest_record())
            .finish()
    }
}
