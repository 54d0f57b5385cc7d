//! Latest-value data cells.
//!
//! A `DataCell` holds at most one record. Publishing overwrites whatever is
//! there, readers never block and see whatever is current. One cell exists
//! per bound link, so fan-out consumers never share a cell.

use crate::process::driver::Waker;
use crate::record::Record;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct CellState {
    record: Option<Record>,
    time_millis: i64,
    /// Bumped on every publish and clear.
    generation: u64,
    waker: Option<Waker>,
}

/// Shared single-slot record holder.
#[derive(Clone, Default)]
pub struct DataCell {
    state: Arc<Mutex<CellState>>,
}

impl DataCell {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CellState> {
        // A panicking writer never leaves the slot half-written, so keep going.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the held record and wake the attached worker, if any.
    pub fn publish(&self, record: Record, time_millis: i64) {
        let waker = {
            let mut state = self.lock();
            state.record = Some(record);
            state.time_millis = time_millis;
            state.generation += 1;
            state.waker.clone()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Drop the held record.
    pub fn clear(&self) {
        let mut state = self.lock();
        if state.record.is_some() {
            state.record = None;
            state.generation += 1;
        }
    }

    pub fn read(&self) -> Option<Record> {
        self.lock().record.clone()
    }

    /// Record and generation read under one lock.
    pub fn snapshot(&self) -> (Option<Record>, u64) {
        let state = self.lock();
        (state.record.clone(), state.generation)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().record.is_none()
    }

    /// Epoch millis of the last publish, 0 before the first.
    pub fn time_millis(&self) -> i64 {
        self.lock().time_millis
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub(crate) fn set_waker(&self, waker: Option<Waker>) {
        self.lock().waker = waker;
    }

    /// Whether two handles point at the same cell.
    pub fn same_cell(&self, other: &DataCell) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl std::fmt::Debug for DataCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("DataCell")
            .field("record", &state.record)
            .field("time_millis", &state.time_millis)
            .field("generation", &state.generation)
            .finish()
    }
}
