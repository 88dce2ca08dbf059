//! Run orchestration.
//!
//! A [`RunController`] owns exactly one run: its counters, its cancellation signal and
//! the engine components bound to the page. The [`Worker`] accepts start/cancel
//! commands and creates a fresh controller for every accepted start.

pub mod worker;

pub use worker::{Ack, Command, Request, Worker, WorkerError};

use crate::models::{CriteriaConfig, EntityRef, PageKind, RunState, TimingSettings};
use crate::services::{
    ActionExecutor, ActionOutcome, AttributeExtractor, CancelHandle, Checkpoint, DecisionEngine,
    Extracted, InspectorError, KeepReason, ListWalker, Pacer, PageInspector, SeekOutcome, Stage,
    TextPatterns, Verdict, Walk, cancellation,
};
use crate::state::{RunEvent, RunMonitor};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    EndOfList,
    Cancelled,
    Failed(String),
}

/// Final counters of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub kept: usize,
    pub removed: usize,
    pub removed_identifiers: Vec<String>,
    pub termination: Termination,
}

impl RunReport {
    pub fn processed(&self) -> usize {
        self.kept + self.removed
    }
}

/// Handle to a spawned run
pub struct RunHandle {
    cancel: CancelHandle,
    join: JoinHandle<RunReport>,
}

impl RunHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to finish
    pub async fn join(self) -> Result<RunReport, JoinError> {
        self.join.await
    }
}

/// Drives one cleaning run from the top of the list to its end or cancellation.
pub struct RunController {
    page: Arc<dyn PageInspector>,
    kind: PageKind,
    timing: TimingSettings,
    engine: DecisionEngine,
    monitor: RunMonitor,
    cancel: CancelHandle,
    pacer: Pacer,
    patterns: Arc<TextPatterns>,
    state: RunState,
}

impl RunController {
    pub fn new(
        page: Arc<dyn PageInspector>,
        kind: PageKind,
        criteria: CriteriaConfig,
        timing: TimingSettings,
        monitor: RunMonitor,
    ) -> Self {
        let (cancel, token) = cancellation();
        let patterns = Arc::new(TextPatterns::new());

        Self {
            page,
            kind,
            timing,
            engine: DecisionEngine::new(criteria, patterns.clone()),
            monitor,
            cancel,
            pacer: Pacer::new(token),
            patterns,
            state: RunState::new(),
        }
    }

    /// Handle that requests cancellation of this run
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    fn criteria(&self) -> &CriteriaConfig {
        self.engine.criteria()
    }

    /// Spawn the run on the tokio runtime
    pub fn start(self) -> RunHandle {
        let cancel = self.cancel_handle();
        let join = tokio::spawn(self.run());
        RunHandle { cancel, join }
    }

    /// Run to completion and report the final counters.
    ///
    /// Emits `Completed` at the end of the list or on cancellation, and `Failed` when
    /// the page returned an error.
    pub async fn run(mut self) -> RunReport {
        let dry_run = self.criteria().is_dry_run;
        tracing::info!(
            "Starting {} run{}",
            self.kind,
            if dry_run { " (dry run)" } else { "" }
        );
        self.monitor.emit(RunEvent::Started {
            page_kind: self.kind,
            dry_run,
        });

        let termination = match self.drive().await {
            Ok(termination) => termination,
            Err(e) => {
                tracing::error!("Run aborted: {}", e);
                Termination::Failed(e.to_string())
            }
        };

        let report = RunReport {
            kept: self.state.kept_count,
            removed: self.state.removed_count,
            removed_identifiers: self.state.removed_identifiers.clone(),
            termination,
        };

        match &report.termination {
            Termination::Failed(reason) => self.monitor.emit(RunEvent::Failed {
                reason: reason.clone(),
            }),
            termination => {
                tracing::info!(
                    "Run finished ({}): processed {}, kept {}, removed {}",
                    if *termination == Termination::Cancelled {
                        "cancelled"
                    } else {
                        "end of list"
                    },
                    report.processed(),
                    report.kept,
                    report.removed
                );
                tracing::info!("Removed profiles: {:?}", report.removed_identifiers);
                self.monitor.emit(RunEvent::Completed {
                    kept: report.kept,
                    removed: report.removed,
                    cancelled: *termination == Termination::Cancelled,
                });
            }
        }

        report
    }

    async fn drive(&mut self) -> Result<Termination, InspectorError> {
        let mut walker = ListWalker::new(self.page.clone(), self.timing.clone(), self.pacer.clone());
        let extractor = AttributeExtractor::new(
            self.page.clone(),
            self.kind,
            self.timing.clone(),
            self.pacer.clone(),
            self.patterns.clone(),
        );
        let executor = ActionExecutor::for_kind(self.page.clone(), self.kind, self.timing.clone());

        walker.rewind_to_top().await?;

        if let Some(target) = self.criteria().skip_until_identifier.clone() {
            let monitor = self.monitor.clone();
            let outcome = walker
                .seek(&target, |entry| {
                    monitor.emit(RunEvent::EntitySkipped {
                        identifier: entry.identifier.clone(),
                    })
                })
                .await?;

            self.monitor.emit(RunEvent::SeekFinished {
                found: outcome == SeekOutcome::Found,
            });
            if outcome == SeekOutcome::Cancelled {
                return Ok(Termination::Cancelled);
            }
        }

        loop {
            if self.pacer.is_cancelled() {
                return Ok(Termination::Cancelled);
            }

            tracing::debug!(
                "Looking for next entity after {}",
                walker.cursor().unwrap_or("start")
            );
            let entity = match walker.next().await? {
                Walk::Found(entity) => entity,
                Walk::EndOfList => return Ok(Termination::EndOfList),
                Walk::Cancelled => return Ok(Termination::Cancelled),
            };

            if self.pacer.is_cancelled() {
                return Ok(Termination::Cancelled);
            }

            tracing::info!("Processing {}", entity.identifier);
            let (verdict, outcome) = match self.process(&entity, &extractor, &executor).await? {
                Stage::Done(result) => result,
                Stage::Interrupted => return Ok(Termination::Cancelled),
            };

            self.monitor.emit(RunEvent::EntityProcessed {
                identifier: entity.identifier.clone(),
                verdict,
                outcome,
            });
            self.monitor.emit(RunEvent::Progress {
                kept: self.state.kept_count,
                removed: self.state.removed_count,
            });

            walker.advance_past(&entity.identifier);
            self.pacer.pause(self.timing.action_delay()).await;
        }
    }

    /// Decide and act on one entity, recording it in exactly one counter.
    async fn process(
        &mut self,
        entity: &EntityRef,
        extractor: &AttributeExtractor,
        executor: &ActionExecutor,
    ) -> Result<Stage<(Verdict, ActionOutcome)>, InspectorError> {
        let verdict = match self.evaluate(entity, extractor).await? {
            Stage::Done(verdict) => verdict,
            Stage::Interrupted => return Ok(Stage::Interrupted),
        };
        tracing::info!("{}: {}", entity.identifier, verdict);

        let outcome = executor
            .execute(&entity.identifier, &verdict, self.criteria().is_dry_run)
            .await?;

        if outcome.counts_as_removed() {
            self.state.record_removed(&entity.identifier);
        } else {
            self.state.record_kept();
        }

        Ok(Stage::Done((verdict, outcome)))
    }

    /// Apply the rules in precedence order, probing the page only as far as needed.
    async fn evaluate(
        &self,
        entity: &EntityRef,
        extractor: &AttributeExtractor,
    ) -> Result<Stage<Verdict>, InspectorError> {
        let identifier = entity.identifier.as_str();
        let criteria = self.criteria();

        if let Some(verdict) = self.engine.forced(identifier) {
            return Ok(Stage::Done(verdict));
        }

        let engine = &self.engine;
        let extracted = extractor
            .extract(
                entity,
                criteria.required_fields(),
                criteria.min_inactivity_days,
                criteria.bio_substring.is_some(),
                |checkpoint| match checkpoint {
                    Checkpoint::Country(country) => engine
                        .country(country)
                        .or_else(|| engine.username(identifier)),
                    Checkpoint::Hover(stats) => engine.prefilter(stats),
                },
            )
            .await?;

        let verdict = match extracted {
            Stage::Done(Extracted::Decided(verdict)) => verdict,
            Stage::Done(Extracted::HoverFailed) => {
                tracing::info!("Could not get stats for {}, keeping", identifier);
                Verdict::kept(KeepReason::ProbeFailed)
            }
            Stage::Done(Extracted::Snapshot(snapshot)) => self.engine.decide(identifier, &snapshot),
            Stage::Interrupted => return Ok(Stage::Interrupted),
        };

        Ok(Stage::Done(verdict))
    }
}
