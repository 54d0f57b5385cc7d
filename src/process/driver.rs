//! Streaming execution.
//!
//! `start` moves a composite's graph onto one dedicated worker thread. The
//! worker sleeps until a source signals new data, runs one full pass, hands
//! every fault of the pass to the error callback and goes back to sleep.
//! Faults never end the loop; only `stop` does.
//!
//! Wake signals travel over a bounded(1) channel, so any number of publishes
//! between two passes collapse into a single pending wake. Stopping drops the
//! stop sender, which the worker observes as a disconnect.

use crate::error::{ChainError, Result};
use crate::process::component::ProcessState;
use crate::process::composite::{CompositeProcess, Graph};
use crate::process::bindings::PortBindings;
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Signals the worker that new source data is available.
#[derive(Debug, Clone)]
pub struct Waker {
    tx: Sender<()>,
}

impl Waker {
    pub(crate) fn channel() -> (Waker, Receiver<()>) {
        let (tx, rx) = bounded(1);
        (Waker { tx }, rx)
    }

    /// Request a pass. Never blocks; a pending wake absorbs this one.
    pub fn wake(&self) {
        let _ = self.tx.try_send(());
    }
}

type GraphSlot = Arc<Mutex<Option<Graph>>>;

/// Running worker of a started composite.
pub(crate) struct Worker {
    handle: JoinHandle<()>,
    stop_tx: Sender<()>,
    slot: GraphSlot,
    // Keeps the wake channel connected while no source holds a waker.
    _waker: Waker,
}

fn run_worker<F>(
    slot: GraphSlot,
    boundary: PortBindings,
    stop_rx: Receiver<()>,
    wake_rx: Receiver<()>,
    mut on_error: F,
) where
    F: FnMut(ChainError),
{
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(graph) = guard.as_mut() else {
        return;
    };
    let mut faults = Vec::new();
    let mut passes: u64 = 0;

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(wake_rx) -> msg => {
                if msg.is_err() {
                    break;
                }
            }
        }

        passes += 1;
        graph.run_pass(&boundary, &mut faults);
        for fault in faults.drain(..) {
            on_error(fault);
        }
    }

    tracing::debug!("Worker exiting after {} passes", passes);
}

impl CompositeProcess {
    /// Launch the streaming worker. Every fault raised by a pass is passed
    /// to `on_error`; the worker keeps running.
    pub fn start<F>(&mut self, on_error: F) -> Result<()>
    where
        F: FnMut(ChainError) + Send + 'static,
    {
        match self.state {
            ProcessState::Initialized | ProcessState::Stopped => {}
            other => {
                return Err(ChainError::InvalidState {
                    expected: "Initialized",
                    actual: other.as_str(),
                })
            }
        }
        let mut graph = self.graph.take().ok_or(ChainError::InvalidState {
            expected: "Initialized",
            actual: "Started",
        })?;

        let (waker, wake_rx) = Waker::channel();
        graph.attach_wakers(Some(waker.clone()));
        self.boundary.set_input_waker(Some(waker.clone()));
        graph.notify(true);

        let (stop_tx, stop_rx) = bounded::<()>(0);
        let slot: GraphSlot = Arc::new(Mutex::new(Some(graph)));
        let worker_slot = Arc::clone(&slot);
        let boundary = self.boundary.clone();
        let thread_name = format!("{}-{}", self.config.worker_name_prefix, self.name);

        let spawned = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_worker(worker_slot, boundary, stop_rx, wake_rx, on_error));

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker {
                    handle,
                    stop_tx,
                    slot,
                    _waker: waker,
                });
                self.state = ProcessState::Started;
                tracing::info!("Started chain '{}' on thread '{}'", self.path, thread_name);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to spawn worker for '{}': {}", self.path, e);
                self.graph = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                self.detach();
                Err(ChainError::Io(e))
            }
        }
    }

    /// Like `start`, delivering faults on a channel instead of a callback.
    ///
    /// The channel holds `fault_queue_depth` faults; while it is full, new
    /// faults are dropped so an undrained receiver never stalls the worker.
    pub fn start_with_channel(&mut self) -> Result<Receiver<ChainError>> {
        let (tx, rx) = bounded(self.config.fault_queue_depth);
        let path = self.path.clone();
        self.start(move |fault| {
            if let Err(TrySendError::Full(fault)) = tx.try_send(fault) {
                tracing::debug!("Fault queue of '{}' full, dropping: {}", path, fault);
            }
        })?;
        Ok(rx)
    }

    /// Stop the worker and wait for it to exit. No pass runs after this returns.
    pub fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Err(ChainError::InvalidState {
                expected: "Started",
                actual: self.state.as_str(),
            });
        };

        drop(worker.stop_tx);
        let joined = worker.handle.join();
        self.graph = worker
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.detach();
        self.state = ProcessState::Stopped;
        tracing::info!("Stopped chain '{}'", self.path);

        joined.map_err(|_| ChainError::Transform(format!("worker of '{}' panicked", self.path)))
    }

    fn detach(&mut self) {
        self.boundary.set_input_waker(None);
        if let Some(graph) = self.graph.as_mut() {
            graph.attach_wakers(None);
            graph.notify(false);
        }
    }

    /// Whether this composite has its own worker running.
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for CompositeProcess {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                tracing::warn!("Stopping '{}' on drop: {}", self.path, e);
            }
        }
    }
}
