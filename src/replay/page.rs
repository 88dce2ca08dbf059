use crate::models::{ElementHandle, EntityRef, Location, PageKind};
use crate::replay::fixture::{AccountFixture, ActionMode, Fixture};
use crate::services::action::{REMOVE_CONFIRM, REMOVE_FOLLOWER_ITEM, UNFOLLOW_CONFIRM};
use crate::services::extraction::ABOUT_MENU_ITEM;
use crate::services::parsing::COUNTRY_LABEL;
use crate::services::{HoverCard, InspectorError, PageInspector, ScrollStep, Subpage, TimestampScope};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};

const BASE_URL: &str = "https://x.com";

/// Interaction counts recorded by a [`ReplayPage`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayCounters {
    pub hovers: usize,
    pub nudges: usize,
    pub page_scrolls: usize,
    pub profile_visits: usize,
    pub about_visits: usize,
    pub reply_visits: usize,
    /// Presses of an entry's menu or follow-state control
    pub action_attempts: usize,
    pub removals: usize,
}

#[derive(Debug)]
struct PageState {
    top: usize,
    history: Vec<String>,
    hovered: Option<usize>,
    account_menu_open: bool,
    entry_menu: Option<usize>,
    dialog: Option<(usize, &'static str)>,
    removed: Vec<bool>,
    calls: usize,
    counters: ReplayCounters,
}

/// In-memory page that replays a recorded list.
///
/// Only a window of the list is rendered at a time: entries
/// `[top - viewport, top + 2 * viewport)` exist, and `[top, top + viewport)` are
/// fully visible. A nudge scrolls half a viewport, a page scroll a full one.
/// Removed accounts stay rendered, the way the site keeps them until reload.
pub struct ReplayPage {
    fixture: Fixture,
    created_at: DateTime<Utc>,
    state: Mutex<PageState>,
}

impl ReplayPage {
    pub fn new(fixture: Fixture) -> Self {
        let list_url = format!("{}/{}/{}", BASE_URL, fixture.owner, fixture.page_kind);
        let removed = vec![false; fixture.accounts.len()];

        Self {
            fixture,
            created_at: Utc::now(),
            state: Mutex::new(PageState {
                top: 0,
                history: vec![list_url],
                hovered: None,
                account_menu_open: false,
                entry_menu: None,
                dialog: None,
                removed,
                calls: 0,
                counters: ReplayCounters::default(),
            }),
        }
    }

    pub fn page_kind(&self) -> PageKind {
        self.fixture.page_kind
    }

    pub fn counters(&self) -> ReplayCounters {
        self.state.lock().unwrap().counters
    }

    /// Accounts whose terminal action went through, in list order
    pub fn removed_identifiers(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        self.fixture
            .accounts
            .iter()
            .zip(&state.removed)
            .filter(|(_, removed)| **removed)
            .map(|(account, _)| account.username.clone())
            .collect()
    }

    /// Whether the page is back on the originating list
    pub fn is_on_list(&self) -> bool {
        self.state.lock().unwrap().history.len() == 1
    }

    fn enter(&self) -> Result<MutexGuard<'_, PageState>, InspectorError> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;

        match self.fixture.fail_after_calls {
            Some(limit) if state.calls > limit => {
                Err(InspectorError::Detached("replay page closed".to_string()))
            }
            _ => Ok(state),
        }
    }

    fn viewport(&self) -> usize {
        self.fixture.viewport.max(1)
    }

    fn max_top(&self) -> usize {
        self.fixture.accounts.len().saturating_sub(self.viewport())
    }

    fn rendered(&self, state: &PageState) -> std::ops::Range<usize> {
        let start = state.top.saturating_sub(self.viewport());
        let end = (state.top + 2 * self.viewport()).min(self.fixture.accounts.len());
        start..end.max(start)
    }

    fn entry_at(&self, index: usize) -> EntityRef {
        EntityRef::new(
            self.fixture.accounts[index].username.clone(),
            ElementHandle::new(format!("entry-{}", index)),
        )
    }

    /// Index of a handle that is currently rendered on the list
    fn resolve(&self, state: &PageState, handle: &ElementHandle) -> Option<usize> {
        if state.history.len() != 1 {
            return None;
        }
        let index = handle.as_str().strip_prefix("entry-")?.parse::<usize>().ok()?;
        self.rendered(state).contains(&index).then_some(index)
    }

    fn current<'s>(&self, state: &'s PageState) -> &'s str {
        state.history.last().map(String::as_str).unwrap_or(BASE_URL)
    }

    /// Account whose profile (or nested view) is currently shown
    fn viewed_account(&self, state: &PageState) -> Option<&AccountFixture> {
        if state.history.len() < 2 {
            return None;
        }
        let url = self.current(state);
        self.fixture.accounts.iter().find(|account| {
            let profile = format!("{}/{}", BASE_URL, account.username);
            url == profile || url.starts_with(&format!("{}/", profile))
        })
    }

    fn at(&self, state: &PageState, location: &Location) -> bool {
        location.matches(self.current(state))
    }

    fn push(&self, state: &mut PageState, url: String) {
        state.history.push(url);
        state.hovered = None;
        state.account_menu_open = false;
        state.entry_menu = None;
        state.dialog = None;
    }

    fn mark_removed(&self, state: &mut PageState, index: usize) {
        if !state.removed[index] {
            state.removed[index] = true;
            state.counters.removals += 1;
        }
    }

    fn timestamp(&self, days_ago: i64) -> String {
        let at = if days_ago > 0 {
            // Slightly inside the day so rounding up lands on `days_ago`
            self.created_at - Duration::days(days_ago) + Duration::minutes(10)
        } else {
            self.created_at
        };
        at.to_rfc3339()
    }
}

#[async_trait]
impl PageInspector for ReplayPage {
    async fn current_url(&self) -> Result<String, InspectorError> {
        let state = self.enter()?;
        Ok(self.current(&state).to_string())
    }

    async fn rendered_entries(&self) -> Result<Vec<EntityRef>, InspectorError> {
        let state = self.enter()?;
        if state.history.len() != 1 {
            return Ok(Vec::new());
        }
        Ok(self.rendered(&state).map(|i| self.entry_at(i)).collect())
    }

    async fn is_visible(&self, handle: &ElementHandle) -> Result<bool, InspectorError> {
        let state = self.enter()?;
        Ok(self
            .resolve(&state, handle)
            .is_some_and(|i| i >= state.top && i < state.top + self.viewport()))
    }

    async fn scroll_to_top(&self) -> Result<(), InspectorError> {
        let mut state = self.enter()?;
        state.top = 0;
        Ok(())
    }

    async fn scroll_ahead(&self, step: ScrollStep) -> Result<(), InspectorError> {
        let mut state = self.enter()?;
        let distance = match step {
            ScrollStep::Nudge => {
                state.counters.nudges += 1;
                (self.viewport() / 2).max(1)
            }
            ScrollStep::Page => {
                state.counters.page_scrolls += 1;
                self.viewport()
            }
        };
        state.top = (state.top + distance).min(self.max_top());
        Ok(())
    }

    async fn hover(&self, handle: &ElementHandle) -> Result<(), InspectorError> {
        let mut state = self.enter()?;
        let hovered = self.resolve(&state, handle);
        state.counters.hovers += 1;
        state.hovered = hovered;
        Ok(())
    }

    async fn unhover(&self, _handle: &ElementHandle) -> Result<(), InspectorError> {
        let mut state = self.enter()?;
        state.hovered = None;
        Ok(())
    }

    async fn hover_card(&self) -> Result<Option<HoverCard>, InspectorError> {
        let state = self.enter()?;
        let Some(account) = state.hovered.map(|i| &self.fixture.accounts[i]) else {
            return Ok(None);
        };
        if !account.hover_card {
            return Ok(None);
        }

        let mut fragments = vec![format!("@{}", account.username)];
        fragments.extend(account.bio.clone());
        if let Some(following) = &account.following {
            fragments.push(format!("{} Following", following));
        }

        Ok(Some(HoverCard {
            followers_text: account.followers.clone(),
            following_text: account.following.clone(),
            fragments,
        }))
    }

    async fn open_subpage(&self, identifier: &str, subpage: Subpage) -> Result<bool, InspectorError> {
        let mut state = self.enter()?;

        match subpage {
            Subpage::Profile => {
                let on_list = state.history.len() == 1;
                let Some(index) = self
                    .rendered(&state)
                    .find(|&i| self.fixture.accounts[i].username == identifier)
                else {
                    return Ok(false);
                };
                if !on_list {
                    return Ok(false);
                }
                state.counters.profile_visits += 1;
                // The click lands but the profile never renders
                if !self.fixture.accounts[index].profile_reachable {
                    return Ok(true);
                }
                self.push(&mut state, format!("{}/{}", BASE_URL, identifier));
            }
            Subpage::Replies => {
                if !self.at(&state, &Location::Profile(identifier.to_string())) {
                    return Ok(false);
                }
                state.counters.reply_visits += 1;
                self.push(&mut state, format!("{}/{}/with_replies", BASE_URL, identifier));
            }
        }
        Ok(true)
    }

    async fn open_account_menu(&self) -> Result<bool, InspectorError> {
        let mut state = self.enter()?;
        let on_profile = self
            .viewed_account(&state)
            .is_some_and(|account| self.at(&state, &Location::Profile(account.username.clone())));

        if on_profile {
            state.account_menu_open = true;
        }
        Ok(on_profile)
    }

    async fn click_menu_item(&self, label: &str) -> Result<bool, InspectorError> {
        let mut state = self.enter()?;

        if state.account_menu_open && label == ABOUT_MENU_ITEM {
            let Some(account) = self.viewed_account(&state) else {
                return Ok(false);
            };
            let url = format!("{}/{}/about", BASE_URL, account.username);
            state.counters.about_visits += 1;
            self.push(&mut state, url);
            return Ok(true);
        }

        if let Some(index) = state.entry_menu {
            if label == REMOVE_FOLLOWER_ITEM && self.fixture.page_kind == PageKind::Followers {
                state.entry_menu = None;
                state.dialog = Some((index, REMOVE_CONFIRM));
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn texts_after_label(
        &self,
        label: &str,
        limit: usize,
    ) -> Result<Option<Vec<String>>, InspectorError> {
        let state = self.enter()?;
        if label != COUNTRY_LABEL || !self.at(&state, &Location::About) {
            return Ok(None);
        }

        Ok(self
            .viewed_account(&state)
            .and_then(|account| account.country.clone())
            .map(|country| {
                vec![country, "Date joined".to_string(), "March 2019".to_string()]
                    .into_iter()
                    .take(limit)
                    .collect()
            }))
    }

    async fn header_texts(&self) -> Result<Vec<String>, InspectorError> {
        let state = self.enter()?;
        let Some(account) = self.viewed_account(&state) else {
            return Ok(Vec::new());
        };

        let mut texts = vec![account.username.clone()];
        texts.extend(account.posts.clone());
        Ok(texts)
    }

    async fn timestamps(&self, scope: TimestampScope) -> Result<Vec<String>, InspectorError> {
        let state = self.enter()?;
        let Some(account) = self.viewed_account(&state) else {
            return Ok(Vec::new());
        };

        let (location, days) = match scope {
            TimestampScope::Posts => (
                Location::Profile(account.username.clone()),
                vec![account.latest_post_days_ago],
            ),
            TimestampScope::Replies => (
                Location::Replies,
                vec![account.latest_post_days_ago, account.latest_reply_days_ago],
            ),
        };
        if !self.at(&state, &location) {
            return Ok(Vec::new());
        }

        Ok(days.into_iter().flatten().map(|d| self.timestamp(d)).collect())
    }

    async fn navigate_back(&self) -> Result<(), InspectorError> {
        let mut state = self.enter()?;
        if state.history.len() > 1 {
            state.history.pop();
        }
        state.account_menu_open = false;
        state.entry_menu = None;
        state.dialog = None;
        Ok(())
    }

    async fn find_entry(&self, identifier: &str) -> Result<Option<EntityRef>, InspectorError> {
        let state = self.enter()?;
        if state.history.len() != 1 {
            return Ok(None);
        }
        Ok(self
            .rendered(&state)
            .find(|&i| self.fixture.accounts[i].username == identifier)
            .map(|i| self.entry_at(i)))
    }

    async fn open_entry_menu(&self, handle: &ElementHandle) -> Result<bool, InspectorError> {
        let mut state = self.enter()?;
        state.counters.action_attempts += 1;

        let Some(index) = self.resolve(&state, handle) else {
            return Ok(false);
        };
        if self.fixture.accounts[index].action == ActionMode::Broken {
            return Ok(false);
        }

        state.entry_menu = Some(index);
        Ok(true)
    }

    async fn press_entry_control(&self, handle: &ElementHandle) -> Result<bool, InspectorError> {
        let mut state = self.enter()?;
        state.counters.action_attempts += 1;

        let Some(index) = self.resolve(&state, handle) else {
            return Ok(false);
        };

        match self.fixture.accounts[index].action {
            ActionMode::Broken => Ok(false),
            ActionMode::Confirm => {
                state.dialog = Some((index, UNFOLLOW_CONFIRM));
                Ok(true)
            }
            ActionMode::LabelFlip => {
                self.mark_removed(&mut state, index);
                Ok(true)
            }
        }
    }

    async fn entry_control_label(
        &self,
        handle: &ElementHandle,
    ) -> Result<Option<String>, InspectorError> {
        let state = self.enter()?;
        Ok(self.resolve(&state, handle).map(|index| {
            if state.removed[index] {
                "Follow".to_string()
            } else {
                "Following".to_string()
            }
        }))
    }

    async fn confirm_dialog(&self, label: &str) -> Result<bool, InspectorError> {
        let mut state = self.enter()?;
        let dialog = state.dialog;

        match dialog {
            Some((index, expected)) if expected == label => {
                state.dialog = None;
                self.mark_removed(&mut state, index);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
