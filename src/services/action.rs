use crate::models::{EntityRef, PageKind, TimingSettings};
use crate::services::decision::Verdict;
use crate::services::inspector::{InspectorError, PageInspector};
use crate::services::pacing::{Pacer, Wait};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Entry menu item that removes a follower
pub const REMOVE_FOLLOWER_ITEM: &str = "Remove this follower";
/// Confirmation button of the remove-follower dialog
pub const REMOVE_CONFIRM: &str = "Remove";
/// Confirmation button of the unfollow dialog
pub const UNFOLLOW_CONFIRM: &str = "Unfollow";

/// What happened to an entity after its verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The terminal action was performed and confirmed
    Applied,
    /// Dry run: the action would have been performed
    Simulated,
    /// The action could not be confirmed
    Unconfirmed,
    /// The verdict keeps the entity
    Skipped,
}

impl ActionOutcome {
    /// Whether the entity counts towards the removed total
    pub fn counts_as_removed(self) -> bool {
        matches!(self, ActionOutcome::Applied | ActionOutcome::Simulated)
    }
}

/// Bounded, uninterruptible sub-steps of a terminal action.
///
/// A half-finished action would leave a menu or dialog open on the list, so these
/// steps ignore cancellation; each is short and retried a few times at most.
pub struct ActionSteps<'a> {
    pub page: &'a dyn PageInspector,
    timing: &'a TimingSettings,
    pacer: Pacer,
}

impl<'a> ActionSteps<'a> {
    pub fn new(page: &'a dyn PageInspector, timing: &'a TimingSettings) -> Self {
        Self {
            page,
            timing,
            pacer: Pacer::uninterruptible(),
        }
    }

    /// Retry a boolean step up to `max_action_attempts` times
    pub async fn attempt<F, Fut>(&self, step: F) -> Result<bool, InspectorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, InspectorError>>,
    {
        let outcome = self
            .pacer
            .await_true(step, self.timing.action_delay(), self.timing.max_action_attempts)
            .await?;
        Ok(outcome == Wait::Satisfied(()))
    }

    /// Wait for the page to react to the previous step
    pub async fn settle(&self) {
        self.pacer.settle(self.timing.action_delay()).await;
    }
}

/// Terminal action for one kind of list.
#[async_trait]
pub trait ActionStrategy: Send + Sync {
    /// Verb used in log lines
    fn verb(&self) -> &'static str;

    /// Perform the action on a freshly resolved entry. `Ok(false)` when unconfirmed.
    async fn apply(&self, steps: &ActionSteps<'_>, entry: &EntityRef) -> Result<bool, InspectorError>;
}

/// Entry "More" menu, "Remove this follower", confirm "Remove"
pub struct RemoveFollower;

#[async_trait]
impl ActionStrategy for RemoveFollower {
    fn verb(&self) -> &'static str {
        PageKind::Followers.action_verb()
    }

    async fn apply(&self, steps: &ActionSteps<'_>, entry: &EntityRef) -> Result<bool, InspectorError> {
        let page = steps.page;
        let handle = &entry.handle;

        if !steps.attempt(move || page.open_entry_menu(handle)).await? {
            tracing::warn!("More button not found for {}", entry.identifier);
            return Ok(false);
        }
        steps.settle().await;

        if !steps
            .attempt(move || page.click_menu_item(REMOVE_FOLLOWER_ITEM))
            .await?
        {
            tracing::warn!("'{}' not found for {}", REMOVE_FOLLOWER_ITEM, entry.identifier);
            return Ok(false);
        }
        steps.settle().await;

        if !steps
            .attempt(move || page.confirm_dialog(REMOVE_CONFIRM))
            .await?
        {
            tracing::warn!("Confirmation button not found for {}", entry.identifier);
            return Ok(false);
        }
        steps.settle().await;

        Ok(true)
    }
}

/// Follow-state control, confirm "Unfollow"; a control that flipped back to
/// "Follow" also counts as success when no dialog shows up.
pub struct Unfollow;

impl Unfollow {
    fn label_flipped(label: &str) -> bool {
        label.contains("Follow") && !label.contains("Following")
    }
}

#[async_trait]
impl ActionStrategy for Unfollow {
    fn verb(&self) -> &'static str {
        PageKind::Following.action_verb()
    }

    async fn apply(&self, steps: &ActionSteps<'_>, entry: &EntityRef) -> Result<bool, InspectorError> {
        let page = steps.page;
        let handle = &entry.handle;

        if !steps.attempt(move || page.press_entry_control(handle)).await? {
            tracing::warn!("Unfollow button not found for {}", entry.identifier);
            return Ok(false);
        }
        steps.settle().await;

        if steps
            .attempt(move || page.confirm_dialog(UNFOLLOW_CONFIRM))
            .await?
        {
            steps.settle().await;
            return Ok(true);
        }

        tracing::info!(
            "No unfollow confirmation for {}, checking button state",
            entry.identifier
        );
        let flipped = page
            .entry_control_label(handle)
            .await?
            .is_some_and(|label| Self::label_flipped(&label));

        if flipped {
            tracing::info!("Button for {} now reads Follow, assuming success", entry.identifier);
        }
        Ok(flipped)
    }
}

/// Choose the terminal action for a list kind
pub fn strategy_for(kind: PageKind) -> Box<dyn ActionStrategy> {
    match kind {
        PageKind::Followers => Box::new(RemoveFollower),
        PageKind::Following => Box::new(Unfollow),
    }
}

/// Performs or simulates the terminal action for a verdict.
pub struct ActionExecutor {
    page: Arc<dyn PageInspector>,
    timing: TimingSettings,
    strategy: Box<dyn ActionStrategy>,
}

impl ActionExecutor {
    pub fn new(
        page: Arc<dyn PageInspector>,
        timing: TimingSettings,
        strategy: Box<dyn ActionStrategy>,
    ) -> Self {
        Self {
            page,
            timing,
            strategy,
        }
    }

    pub fn for_kind(page: Arc<dyn PageInspector>, kind: PageKind, timing: TimingSettings) -> Self {
        Self::new(page, timing, strategy_for(kind))
    }

    /// Apply `verdict` to the entity. Dry runs never touch the page.
    pub async fn execute(
        &self,
        identifier: &str,
        verdict: &Verdict,
        dry_run: bool,
    ) -> Result<ActionOutcome, InspectorError> {
        if !verdict.is_removal() {
            return Ok(ActionOutcome::Skipped);
        }

        if dry_run {
            tracing::info!(
                "[DRY RUN] Would {} {} ({})",
                self.strategy.verb(),
                identifier,
                verdict
            );
            return Ok(ActionOutcome::Simulated);
        }

        let steps = ActionSteps::new(self.page.as_ref(), &self.timing);
        let page = self.page.as_ref();

        let entry = steps
            .pacer
            .await_condition(
                move || page.find_entry(identifier),
                self.timing.action_delay(),
                self.timing.max_action_attempts,
            )
            .await?;

        let Wait::Satisfied(entry) = entry else {
            tracing::warn!("Entry for {} not found, cannot {}", identifier, self.strategy.verb());
            return Ok(ActionOutcome::Unconfirmed);
        };

        tracing::info!("Attempting to {} {} ({})", self.strategy.verb(), identifier, verdict);
        if self.strategy.apply(&steps, &entry).await? {
            tracing::info!("{}: {} confirmed", identifier, self.strategy.verb());
            Ok(ActionOutcome::Applied)
        } else {
            tracing::warn!(
                "{}: {} could not be confirmed, keeping",
                identifier,
                self.strategy.verb()
            );
            Ok(ActionOutcome::Unconfirmed)
        }
    }
}
