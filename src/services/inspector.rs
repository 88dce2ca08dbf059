use crate::models::{ElementHandle, EntityRef};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a page backend.
///
/// A missing element or an overlay that never appears is *not* an error: those come
/// back as `Ok(false)` / `Ok(None)` and the engine degrades locally. An `Err` means
/// the page itself misbehaved and aborts the run.
#[derive(Error, Debug)]
pub enum InspectorError {
    #[error("Page is no longer available: {0}")]
    Detached(String),

    #[error("Page script failed: {0}")]
    Script(String),

    #[error("Unexpected page state: {0}")]
    UnexpectedState(String),
}

/// How far to scroll the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollStep {
    /// Small step between scans of a single walker call
    Nudge,
    /// Larger step taken when a whole walker call found nothing
    Page,
}

/// Views reachable by following a link for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subpage {
    Profile,
    Replies,
}

/// Which timestamps to read from a profile view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampScope {
    Posts,
    Replies,
}

/// Raw texts of a hover card overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoverCard {
    pub followers_text: Option<String>,
    pub following_text: Option<String>,
    /// Free-text fragments of the card in document order
    pub fragments: Vec<String>,
}

/// Capability interface over the rendered page.
///
/// The engine drives the page only through these verbs; retry ladders, delays and
/// parsing of the returned text all live in the engine. Implementations are called
/// from a single task and never concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageInspector: Send + Sync {
    /// Full URL of the current view
    async fn current_url(&self) -> Result<String, InspectorError>;

    /// Currently rendered list entries, in visual order
    async fn rendered_entries(&self) -> Result<Vec<EntityRef>, InspectorError>;

    /// Whether the entry's bounding box lies fully inside the viewport
    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, InspectorError>;

    async fn scroll_to_top(&self) -> Result<(), InspectorError>;

    async fn scroll_ahead(&self, step: ScrollStep) -> Result<(), InspectorError>;

    /// Start a hover interaction on the entry's account link
    async fn hover(&self, handle: &ElementHandle) -> Result<(), InspectorError>;

    /// Leave the hover interaction started by [`hover`](Self::hover)
    async fn unhover(&self, handle: &ElementHandle) -> Result<(), InspectorError>;

    /// The hover card overlay, if one is currently shown
    async fn hover_card(&self) -> Result<Option<HoverCard>, InspectorError>;

    /// Follow the link to an entity's sub-page. `false` when the link is missing.
    async fn open_subpage(
        &self,
        identifier: &str,
        subpage: Subpage,
    ) -> Result<bool, InspectorError>;

    /// Open the account menu of the profile being viewed. `false` when not present yet.
    async fn open_account_menu(&self) -> Result<bool, InspectorError>;

    /// Click a menu item by its exact label. `false` when no such item is shown.
    async fn click_menu_item(&self, label: &str) -> Result<bool, InspectorError>;

    /// Up to `limit` short text fragments following the first element whose text is
    /// exactly `label`. `None` when the label is not on the page.
    async fn texts_after_label(
        &self,
        label: &str,
        limit: usize,
    ) -> Result<Option<Vec<String>>, InspectorError>;

    /// Leaf texts of the profile header bar
    async fn header_texts(&self) -> Result<Vec<String>, InspectorError>;

    /// Raw `datetime` attributes of the timestamps rendered in the given scope
    async fn timestamps(&self, scope: TimestampScope) -> Result<Vec<String>, InspectorError>;

    /// One step back in the page history
    async fn navigate_back(&self) -> Result<(), InspectorError>;

    /// Re-resolve a rendered list entry by identifier
    async fn find_entry(&self, identifier: &str) -> Result<Option<EntityRef>, InspectorError>;

    /// Open the entry's contextual ("More") menu
    async fn open_entry_menu(&self, handle: &ElementHandle) -> Result<bool, InspectorError>;

    /// Press the entry's follow-state control
    async fn press_entry_control(&self, handle: &ElementHandle) -> Result<bool, InspectorError>;

    /// Current label of the entry's follow-state control
    async fn entry_control_label(
        &self,
        handle: &ElementHandle,
    ) -> Result<Option<String>, InspectorError>;

    /// Click the confirmation button of an open dialog. `false` when none is shown.
    async fn confirm_dialog(&self, label: &str) -> Result<bool, InspectorError>;
}
