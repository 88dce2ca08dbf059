use crate::models::{EntityRef, TimingSettings};
use crate::services::inspector::{InspectorError, PageInspector, ScrollStep};
use crate::services::pacing::{Flow, Pacer};
use std::sync::Arc;

/// Result of a single bounded scan-and-nudge pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Found(EntityRef),
    NotFoundYet,
    Cancelled,
}

/// Result of asking the walker for the next entity to process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Walk {
    Found(EntityRef),
    EndOfList,
    Cancelled,
}

/// How the seek phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The resume identifier was seen; processing starts after it
    Found,
    /// Gave up after repeated empty scrolls; processing starts at the cursor
    Abandoned,
    Cancelled,
}

/// Cursor over a virtualised, infinitely scrolling list.
///
/// The list re-renders as it scrolls, so the walker never trusts indices or handles
/// from an earlier scan. It remembers only the identifier of the last processed
/// entity and, on every scan, treats entries after that identifier as candidates.
/// Only entries fully inside the viewport are returned so that hover probes on them
/// behave.
pub struct ListWalker {
    page: Arc<dyn PageInspector>,
    timing: TimingSettings,
    pacer: Pacer,
    cursor: Option<String>,
    no_progress: u32,
}

impl ListWalker {
    pub fn new(page: Arc<dyn PageInspector>, timing: TimingSettings, pacer: Pacer) -> Self {
        Self {
            page,
            timing,
            pacer,
            cursor: None,
            no_progress: 0,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Consecutive page scrolls that found nothing new
    pub fn no_progress(&self) -> u32 {
        self.no_progress
    }

    /// Move the cursor past `identifier`
    pub fn advance_past(&mut self, identifier: &str) {
        self.cursor = Some(identifier.to_string());
    }

    pub async fn rewind_to_top(&mut self) -> Result<(), InspectorError> {
        self.page.scroll_to_top().await?;
        self.cursor = None;
        self.no_progress = 0;
        self.pacer.pause(self.timing.scroll_delay()).await;
        Ok(())
    }

    /// First rendered, fully visible entry after the cursor
    async fn scan(&self) -> Result<Option<EntityRef>, InspectorError> {
        let entries = self.page.rendered_entries().await?;
        let mut eligible = self.cursor.is_none();

        for entry in entries {
            if eligible && self.page.is_visible(&entry.handle).await? {
                return Ok(Some(entry));
            }

            if self.cursor.as_deref() == Some(entry.identifier.as_str()) {
                eligible = true;
            }
        }

        Ok(None)
    }

    /// Scan for the next entity, nudging the list between a bounded number of scans.
    pub async fn find_next(&self) -> Result<Probe, InspectorError> {
        let max_attempts = self.timing.max_follower_attempts.max(1);

        for attempt in 0..max_attempts {
            if self.pacer.is_cancelled() {
                return Ok(Probe::Cancelled);
            }

            if let Some(entry) = self.scan().await? {
                return Ok(Probe::Found(entry));
            }

            if attempt + 1 < max_attempts {
                tracing::debug!(
                    "No entity after {:?}, attempt {}/{}; nudging list",
                    self.cursor,
                    attempt + 1,
                    max_attempts
                );
                if self.pacer.pause(self.timing.scroll_delay()).await == Flow::Cancelled {
                    return Ok(Probe::Cancelled);
                }
                self.page.scroll_ahead(ScrollStep::Nudge).await?;
                if self.pacer.pause(self.timing.hover_delay()).await == Flow::Cancelled {
                    return Ok(Probe::Cancelled);
                }
            }
        }

        Ok(Probe::NotFoundYet)
    }

    /// Next entity to process, scrolling a page at a time while nothing new shows up.
    ///
    /// Ends the list once `max_scroll_attempts` consecutive page scrolls found nothing.
    pub async fn next(&mut self) -> Result<Walk, InspectorError> {
        loop {
            match self.find_next().await? {
                Probe::Found(entry) => {
                    self.no_progress = 0;
                    return Ok(Walk::Found(entry));
                }
                Probe::Cancelled => return Ok(Walk::Cancelled),
                Probe::NotFoundYet => {
                    self.page.scroll_ahead(ScrollStep::Page).await?;
                    self.no_progress += 1;
                    tracing::debug!(
                        "Scrolled a page without new entities ({}/{})",
                        self.no_progress,
                        self.timing.max_scroll_attempts
                    );

                    if self.no_progress >= self.timing.max_scroll_attempts {
                        tracing::info!("No new entities after {} scrolls, end of list", self.no_progress);
                        return Ok(Walk::EndOfList);
                    }

                    if self.pacer.pause(self.timing.scroll_delay()).await == Flow::Cancelled {
                        return Ok(Walk::Cancelled);
                    }
                }
            }
        }
    }

    /// Advance the cursor without processing until `target` has been passed.
    ///
    /// `on_skip` is called for every entity passed over, including `target` itself.
    pub async fn seek<F>(&mut self, target: &str, mut on_skip: F) -> Result<SeekOutcome, InspectorError>
    where
        F: FnMut(&EntityRef),
    {
        tracing::info!("Skipping ahead until {}", target);

        let outcome = loop {
            match self.next().await? {
                Walk::Found(entry) => {
                    tracing::debug!("Skipping {}", entry.identifier);
                    on_skip(&entry);
                    self.advance_past(&entry.identifier);

                    if entry.identifier == target {
                        tracing::info!("Found {}, processing starts with the next entity", target);
                        break SeekOutcome::Found;
                    }
                }
                Walk::EndOfList => {
                    tracing::warn!(
                        "Could not find {}, processing starts from the current position",
                        target
                    );
                    break SeekOutcome::Abandoned;
                }
                Walk::Cancelled => break SeekOutcome::Cancelled,
            }
        };

        self.no_progress = 0;
        Ok(outcome)
    }
}
