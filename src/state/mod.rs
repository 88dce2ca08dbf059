// Run monitoring module
//
// This module provides the RunMonitor which keeps a live RunStatus behind
// Arc<RwLock<T>> and broadcasts RunEvents to any number of observers.

use crate::models::PageKind;
use crate::services::{ActionOutcome, Verdict};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Events emitted while a run progresses
///
/// Delivery is fire-and-forget: a run never waits for, or retries, an observer.
/// Events are sent in processing order.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    /// A run has been accepted and is starting
    Started { page_kind: PageKind, dry_run: bool },

    /// An entity was passed over during the seek phase
    EntitySkipped { identifier: String },

    /// The seek phase has ended
    SeekFinished { found: bool },

    /// An entity has been fully processed
    EntityProcessed {
        identifier: String,
        verdict: Verdict,
        outcome: ActionOutcome,
    },

    /// Counters after each processed entity
    Progress { kept: usize, removed: usize },

    /// The run reached the end of the list or was cancelled
    Completed {
        kept: usize,
        removed: usize,
        cancelled: bool,
    },

    /// The run stopped on an unrecoverable error
    Failed { reason: String },
}

/// Live view of the current (or last) run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStatus {
    pub is_running: bool,
    pub page_kind: Option<PageKind>,
    pub dry_run: bool,
    pub kept: usize,
    pub removed: usize,
    pub last_identifier: Option<String>,
    pub last_error: Option<String>,
}

impl RunStatus {
    fn apply(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Started { page_kind, dry_run } => {
                *self = RunStatus {
                    is_running: true,
                    page_kind: Some(*page_kind),
                    dry_run: *dry_run,
                    ..Default::default()
                };
            }
            RunEvent::EntitySkipped { identifier } => {
                self.last_identifier = Some(identifier.clone());
            }
            RunEvent::SeekFinished { .. } => {}
            RunEvent::EntityProcessed { identifier, .. } => {
                self.last_identifier = Some(identifier.clone());
            }
            RunEvent::Progress { kept, removed } => {
                self.kept = *kept;
                self.removed = *removed;
            }
            RunEvent::Completed { kept, removed, .. } => {
                self.is_running = false;
                self.kept = *kept;
                self.removed = *removed;
            }
            RunEvent::Failed { reason } => {
                self.is_running = false;
                self.last_error = Some(reason.clone());
            }
        }
    }
}

/// Thread-safe run status with event broadcasting
///
/// Cloning a `RunMonitor` yields another handle to the same status and channel, so
/// the worker, the run task and the front end can all hold one.
///
/// - [`emit()`](Self::emit) updates the status and notifies subscribers
/// - [`snapshot()`](Self::snapshot) reads the status without holding a lock
/// - [`subscribe()`](Self::subscribe) listens for events
#[derive(Clone)]
pub struct RunMonitor {
    status: Arc<RwLock<RunStatus>>,
    event_tx: broadcast::Sender<RunEvent>,
}

impl RunMonitor {
    /// Create a monitor with a broadcast buffer of 256 events
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            status: Arc::new(RwLock::new(RunStatus::default())),
            event_tx,
        }
    }

    pub fn snapshot(&self) -> RunStatus {
        self.status.read().unwrap().clone()
    }

    pub fn is_running(&self) -> bool {
        self.status.read().unwrap().is_running
    }

    /// Record an event and broadcast it
    pub fn emit(&self, event: RunEvent) {
        self.status.write().unwrap().apply(&event);

        // No subscribers is fine; nobody is required to listen
        let _ = self.event_tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.event_tx.subscribe()
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new()
    }
}
