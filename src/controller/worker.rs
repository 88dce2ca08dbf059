use crate::controller::{RunController, RunHandle, RunReport};
use crate::models::{CriteriaConfig, Location, PageKind, TimingSettings};
use crate::services::{InspectorError, PageInspector};
use crate::state::RunMonitor;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Inbound control commands
#[derive(Debug, Clone)]
pub enum Command {
    Start {
        page_kind: PageKind,
        criteria: CriteriaConfig,
    },
    Cancel,
}

/// Reply to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Started,
    /// Cancellation was requested (or there was nothing to cancel)
    Stopped,
    Rejected(String),
}

/// A command together with the channel its reply goes to
pub struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<Ack>,
}

/// Reasons a start command is refused
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("A run is already in progress")]
    AlreadyRunning,

    #[error("No removal criterion is enabled")]
    NoCriteria,

    #[error("Current page {url} is not a {expected} list")]
    WrongPage { expected: PageKind, url: String },

    #[error("Page error: {0}")]
    Page(#[from] InspectorError),
}

/// Accepts start/cancel commands and owns at most one active run.
///
/// There is no global instance: each front end creates its own worker around the
/// page it drives.
pub struct Worker {
    page: Arc<dyn PageInspector>,
    timing: TimingSettings,
    monitor: RunMonitor,
    active: Option<RunHandle>,
}

impl Worker {
    pub fn new(page: Arc<dyn PageInspector>, timing: TimingSettings, monitor: RunMonitor) -> Self {
        Self {
            page,
            timing,
            monitor,
            active: None,
        }
    }

    pub fn monitor(&self) -> &RunMonitor {
        &self.monitor
    }

    pub fn is_active(&self) -> bool {
        self.active.as_ref().is_some_and(|run| !run.is_finished())
    }

    /// Validate and spawn a new run
    pub async fn start(
        &mut self,
        page_kind: PageKind,
        criteria: CriteriaConfig,
    ) -> Result<(), WorkerError> {
        if self.is_active() {
            return Err(WorkerError::AlreadyRunning);
        }
        if !criteria.has_enabled_criterion() {
            return Err(WorkerError::NoCriteria);
        }

        let url = self.page.current_url().await?;
        if !Location::List(page_kind).matches(&url) {
            return Err(WorkerError::WrongPage {
                expected: page_kind,
                url,
            });
        }

        let controller = RunController::new(
            self.page.clone(),
            page_kind,
            criteria,
            self.timing.clone(),
            self.monitor.clone(),
        );
        self.active = Some(controller.start());
        Ok(())
    }

    /// Request cancellation of the active run. Returns `false` when idle.
    pub fn cancel(&self) -> bool {
        match &self.active {
            Some(run) if !run.is_finished() => {
                tracing::info!("Received stop request");
                run.cancel();
                true
            }
            _ => false,
        }
    }

    pub async fn handle(&mut self, command: Command) -> Ack {
        match command {
            Command::Start {
                page_kind,
                criteria,
            } => match self.start(page_kind, criteria).await {
                Ok(()) => Ack::Started,
                Err(e) => {
                    tracing::warn!("Start rejected: {}", e);
                    Ack::Rejected(e.to_string())
                }
            },
            Command::Cancel => {
                self.cancel();
                Ack::Stopped
            }
        }
    }

    /// Wait for the active run, if any, and return its report
    pub async fn wait(&mut self) -> Option<RunReport> {
        let run = self.active.take()?;
        match run.join().await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::error!("Run task join error: {}", e);
                None
            }
        }
    }

    /// Serve requests until every sender is dropped, then stop the active run.
    pub async fn serve(mut self, mut requests: mpsc::Receiver<Request>) -> Option<RunReport> {
        while let Some(Request { command, reply }) = requests.recv().await {
            let ack = self.handle(command).await;
            let _ = reply.send(ack);
        }

        self.cancel();
        self.wait().await
    }
}
