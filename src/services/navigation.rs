use crate::models::{Location, TimingSettings};
use crate::services::inspector::{InspectorError, PageInspector};
use crate::services::pacing::{Pacer, Wait};
use std::sync::Arc;

/// Forward navigation away from the list, and the way back.
///
/// Every forward step records the location it left. [`unwind`](Navigator::unwind)
/// walks the record backwards with verified back steps, ignoring cancellation, so a
/// run never stops with the page parked on a profile or about view.
pub struct Navigator {
    page: Arc<dyn PageInspector>,
    timing: TimingSettings,
    pacer: Pacer,
    trail: Vec<Location>,
}

impl Navigator {
    pub fn new(page: Arc<dyn PageInspector>, timing: TimingSettings, pacer: Pacer) -> Self {
        Self {
            page,
            timing,
            pacer,
            trail: Vec::new(),
        }
    }

    /// Number of recorded forward steps not yet unwound
    pub fn depth(&self) -> usize {
        self.trail.len()
    }

    pub async fn is_at(&self, target: &Location) -> Result<bool, InspectorError> {
        let url = self.page.current_url().await?;
        Ok(target.matches(&url))
    }

    /// Record that the page is about to leave `origin`
    pub fn departed(&mut self, origin: Location) {
        tracing::debug!("Leaving {}", origin);
        self.trail.push(origin);
    }

    /// Poll the current location until it matches `target`.
    pub async fn arrive(&self, target: &Location) -> Result<Wait<()>, InspectorError> {
        let outcome = self
            .pacer
            .await_true(
                || self.is_at(target),
                self.timing.navigation_poll(),
                self.timing.max_navigation_attempts,
            )
            .await?;

        match outcome {
            Wait::Satisfied(()) => tracing::debug!("Arrived at {}", target),
            Wait::TimedOut => tracing::warn!("Timed out waiting for {}", target),
            Wait::Cancelled => tracing::debug!("Stopped waiting for {}: cancelled", target),
        }

        Ok(outcome)
    }

    /// Go back one recorded step and verify the page arrived there.
    ///
    /// Returns `false` when the origin could not be confirmed. A step whose origin is
    /// already the current location is popped without navigating.
    pub async fn back(&mut self) -> Result<bool, InspectorError> {
        let Some(origin) = self.trail.pop() else {
            return Ok(true);
        };

        let nav: &Navigator = self;
        if nav.is_at(&origin).await? {
            tracing::debug!("Already at {}, no back step needed", origin);
            return Ok(true);
        }

        nav.page.navigate_back().await?;
        let settle = Pacer::uninterruptible();
        settle.settle(nav.timing.back_settle()).await;

        let outcome = settle
            .await_true(
                || nav.is_at(&origin),
                nav.timing.navigation_poll(),
                nav.timing.max_navigation_attempts,
            )
            .await?;

        if outcome == Wait::Satisfied(()) {
            tracing::debug!("Back at {}", origin);
            Ok(true)
        } else {
            tracing::warn!("Could not confirm return to {}", origin);
            Ok(false)
        }
    }

    /// Undo every recorded forward step.
    pub async fn unwind(&mut self) -> Result<bool, InspectorError> {
        let mut confirmed = true;
        while !self.trail.is_empty() {
            confirmed &= self.back().await?;
        }
        Ok(confirmed)
    }
}
