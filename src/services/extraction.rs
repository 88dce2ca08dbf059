//! Attribute extraction for a single entity.
//!
//! Each stage drives the [`PageInspector`] through one probe (hover card, about view,
//! profile view), bounded by the retry budgets in [`TimingSettings`]. Missing data
//! degrades to "unknown" locally; only inspector errors escape. A stage that observes
//! cancellation returns the page to the list before reporting [`Stage::Interrupted`].
//! A return to the list that cannot be confirmed is an error.

use crate::models::{
    AttributeSnapshot, EntityRef, HoverStats, Location, PageKind, ProfileStats, RequiredFields,
    TimingSettings,
};
use crate::services::inspector::{HoverCard, InspectorError, PageInspector, Subpage, TimestampScope};
use crate::services::navigation::Navigator;
use crate::services::pacing::{Flow, Pacer, Wait};
use crate::services::parsing::{self, COUNTRY_LABEL, TextPatterns};
use chrono::Utc;
use std::sync::Arc;

/// Menu entry leading to the about view
pub const ABOUT_MENU_ITEM: &str = "About this account";

/// Number of fragments read after the country label
const COUNTRY_FRAGMENT_LIMIT: usize = 10;

/// Outcome of an extraction stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage<T> {
    Done(T),
    /// Cancellation was observed; the page is back on the list
    Interrupted,
}

/// Point during [`AttributeExtractor::extract`] where the caller may already decide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint<'a> {
    /// After the about view, or first thing when the country is not needed
    Country(Option<&'a str>),
    /// After a hover card was read
    Hover(&'a HoverStats),
}

/// What an extraction produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<T> {
    Snapshot(AttributeSnapshot),
    /// A checkpoint decided; later stages never ran
    Decided(T),
    /// A required hover card never appeared
    HoverFailed,
}

pub struct AttributeExtractor {
    page: Arc<dyn PageInspector>,
    timing: TimingSettings,
    pacer: Pacer,
    patterns: Arc<TextPatterns>,
    list: Location,
}

impl AttributeExtractor {
    pub fn new(
        page: Arc<dyn PageInspector>,
        kind: PageKind,
        timing: TimingSettings,
        pacer: Pacer,
        patterns: Arc<TextPatterns>,
    ) -> Self {
        Self {
            page,
            timing,
            pacer,
            patterns,
            list: Location::List(kind),
        }
    }

    fn navigator(&self) -> Navigator {
        Navigator::new(self.page.clone(), self.timing.clone(), self.pacer.clone())
    }

    async fn abandon<T>(&self, nav: &mut Navigator) -> Result<Stage<T>, InspectorError> {
        tracing::info!("Cancellation requested, returning to {}", self.list);
        self.return_to_list(nav).await?;
        Ok(Stage::Interrupted)
    }

    /// Undo every forward step; the walker must not scan anything but the list.
    async fn return_to_list(&self, nav: &mut Navigator) -> Result<(), InspectorError> {
        if nav.unwind().await? {
            Ok(())
        } else {
            Err(InspectorError::UnexpectedState(format!(
                "could not return to {}",
                self.list
            )))
        }
    }

    /// Read follower/following counts (and the bio when `want_bio`) from the hover card.
    ///
    /// `Done(None)` means the card never appeared.
    pub async fn hover_stats(
        &self,
        entity: &EntityRef,
        want_bio: bool,
    ) -> Result<Stage<Option<HoverStats>>, InspectorError> {
        let page = self.page.as_ref();
        page.hover(&entity.handle).await?;

        let card = if self.pacer.pause(self.timing.hover_delay()).await == Flow::Cancelled {
            Wait::Cancelled
        } else {
            self.pacer
                .await_condition(
                    move || async move { page.hover_card().await },
                    self.timing.hover_delay(),
                    self.timing.max_hover_attempts,
                )
                .await?
        };

        let stats = match card {
            Wait::Satisfied(card) => Some(self.read_card(&card, want_bio)),
            Wait::TimedOut => {
                tracing::info!(
                    "Hover card not found for {} after {} attempts",
                    entity.identifier,
                    self.timing.max_hover_attempts
                );
                None
            }
            Wait::Cancelled => {
                self.dismiss_card(entity).await?;
                return Ok(Stage::Interrupted);
            }
        };

        self.dismiss_card(entity).await?;

        if let Some(stats) = &stats {
            tracing::info!(
                "Stats retrieved for {}: followers={}, following={}{}",
                entity.identifier,
                stats.followers,
                stats.following,
                stats
                    .bio
                    .as_deref()
                    .map(|b| format!(", bio={}", b.chars().take(50).collect::<String>()))
                    .unwrap_or_default()
            );
        }

        Ok(Stage::Done(stats))
    }

    fn read_card(&self, card: &HoverCard, want_bio: bool) -> HoverStats {
        let count = |text: &Option<String>| {
            text.as_deref()
                .map(|t| self.patterns.parse_count(t))
                .unwrap_or(0)
        };

        HoverStats {
            followers: count(&card.followers_text),
            following: count(&card.following_text),
            bio: if want_bio {
                self.patterns.pick_bio(&card.fragments)
            } else {
                None
            },
        }
    }

    async fn dismiss_card(&self, entity: &EntityRef) -> Result<(), InspectorError> {
        let page = self.page.as_ref();
        page.unhover(&entity.handle).await?;

        // Runs after cancellation too; the card must not stay over the list
        let gone = Pacer::uninterruptible()
            .await_true(
                move || async move { page.hover_card().await.map(|card| card.is_none()) },
                self.timing.hover_delay(),
                self.timing.max_hover_unload_attempts,
            )
            .await?;

        if gone == Wait::TimedOut {
            tracing::debug!("Hover card for {} still shown after leaving", entity.identifier);
        }
        Ok(())
    }

    /// Read the account country from the about view.
    ///
    /// Path: profile, account menu, "About this account". The page always returns to
    /// the list afterwards. `Done(None)` when any step fails or the label is missing.
    pub async fn country(&self, entity: &EntityRef) -> Result<Stage<Option<String>>, InspectorError> {
        let page = self.page.as_ref();
        let mut nav = self.navigator();
        let profile = Location::Profile(entity.identifier.clone());

        if nav.is_at(&profile).await? {
            tracing::debug!("Already on profile of {}", entity.identifier);
        } else {
            if !page.open_subpage(&entity.identifier, Subpage::Profile).await? {
                tracing::warn!("Profile link not found for {}", entity.identifier);
                return Ok(Stage::Done(None));
            }
            nav.departed(self.list.clone());

            if self.pacer.pause(self.timing.profile_load_delay()).await == Flow::Cancelled {
                return self.abandon(&mut nav).await;
            }
            match nav.arrive(&profile).await? {
                Wait::Satisfied(()) => {}
                Wait::TimedOut => {
                    tracing::warn!("Could not reach profile of {}", entity.identifier);
                    self.return_to_list(&mut nav).await?;
                    return Ok(Stage::Done(None));
                }
                Wait::Cancelled => return self.abandon(&mut nav).await,
            }
        }

        let menu = self
            .pacer
            .await_true(
                move || async move { page.open_account_menu().await },
                self.timing.navigation_poll(),
                self.timing.max_menu_attempts,
            )
            .await?;

        match menu {
            Wait::Satisfied(()) => {}
            Wait::TimedOut => {
                tracing::warn!("Account menu not found for {}", entity.identifier);
                self.return_to_list(&mut nav).await?;
                return Ok(Stage::Done(None));
            }
            Wait::Cancelled => return self.abandon(&mut nav).await,
        }

        if self.pacer.pause(self.timing.action_delay()).await == Flow::Cancelled {
            return self.abandon(&mut nav).await;
        }

        if !page.click_menu_item(ABOUT_MENU_ITEM).await? {
            tracing::warn!("'{}' menu item not found for {}", ABOUT_MENU_ITEM, entity.identifier);
            self.return_to_list(&mut nav).await?;
            return Ok(Stage::Done(None));
        }
        nav.departed(profile);

        if self.pacer.pause(self.timing.profile_load_delay()).await == Flow::Cancelled {
            return self.abandon(&mut nav).await;
        }
        match nav.arrive(&Location::About).await? {
            Wait::Satisfied(()) => {}
            Wait::TimedOut => {
                tracing::warn!("About view of {} did not open", entity.identifier);
                self.return_to_list(&mut nav).await?;
                return Ok(Stage::Done(None));
            }
            Wait::Cancelled => return self.abandon(&mut nav).await,
        }

        tracing::debug!(
            "Waiting {:?} on the about view of {}",
            self.timing.about_cooldown(),
            entity.identifier
        );
        Pacer::uninterruptible()
            .settle(self.timing.about_cooldown())
            .await;

        let country = page
            .texts_after_label(COUNTRY_LABEL, COUNTRY_FRAGMENT_LIMIT)
            .await?
            .and_then(|fragments| self.patterns.pick_country(&fragments));

        match &country {
            Some(country) => tracing::info!("Country for {}: {}", entity.identifier, country),
            None => tracing::info!("Country not available for {}", entity.identifier),
        }

        self.return_to_list(&mut nav).await?;
        Ok(Stage::Done(country))
    }

    /// Read post count and, when `activity_threshold` is set, the latest activity age.
    ///
    /// Missing timestamps fall back to [`parsing::inactivity_sentinel`]. When the posts
    /// alone make the account look older than the threshold, the replies tab is checked
    /// and a more recent reply replaces the post timestamp.
    pub async fn profile_stats(
        &self,
        entity: &EntityRef,
        activity_threshold: Option<i64>,
    ) -> Result<Stage<ProfileStats>, InspectorError> {
        let page = self.page.as_ref();
        let mut nav = self.navigator();
        let profile = Location::Profile(entity.identifier.clone());

        if !page.open_subpage(&entity.identifier, Subpage::Profile).await? {
            tracing::warn!("Profile link not found for {}", entity.identifier);
            return Ok(Stage::Done(ProfileStats::default()));
        }
        nav.departed(self.list.clone());

        if self.pacer.pause(self.timing.profile_load_delay()).await == Flow::Cancelled {
            return self.abandon(&mut nav).await;
        }
        match nav.arrive(&profile).await? {
            Wait::Satisfied(()) => {}
            Wait::TimedOut => {
                tracing::warn!("Could not reach profile of {}", entity.identifier);
                self.return_to_list(&mut nav).await?;
                return Ok(Stage::Done(ProfileStats::default()));
            }
            Wait::Cancelled => return self.abandon(&mut nav).await,
        }

        let header = page.header_texts().await?;
        let posts = self.patterns.parse_post_count(&header);
        if posts.is_none() {
            tracing::info!("Post count not found for {}", entity.identifier);
        }

        let mut stats = ProfileStats {
            posts,
            latest_activity_age_days: None,
        };

        if let Some(threshold) = activity_threshold {
            match self.activity_age(entity, &mut nav, threshold).await? {
                Stage::Done(age) => stats.latest_activity_age_days = Some(age),
                Stage::Interrupted => return Ok(Stage::Interrupted),
            }
        }

        self.return_to_list(&mut nav).await?;

        tracing::info!(
            "{}: posts={}, latest activity {} days ago",
            entity.identifier,
            stats
                .posts
                .map(|p| p.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            stats
                .latest_activity_age_days
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        Ok(Stage::Done(stats))
    }

    async fn activity_age(
        &self,
        entity: &EntityRef,
        nav: &mut Navigator,
        threshold: i64,
    ) -> Result<Stage<i64>, InspectorError> {
        let page = self.page.as_ref();
        let profile = Location::Profile(entity.identifier.clone());

        let latest_post = self
            .pacer
            .await_condition(
                move || async move {
                    page.timestamps(TimestampScope::Posts)
                        .await
                        .map(|raw| parsing::latest_timestamp(&raw))
                },
                self.timing.timestamp_poll(),
                self.timing.max_timestamp_attempts,
            )
            .await?;

        let latest_post = match latest_post {
            Wait::Satisfied(at) => at,
            Wait::TimedOut => {
                tracing::warn!(
                    "No post timestamps for {}, treating latest activity as {}",
                    entity.identifier,
                    parsing::inactivity_sentinel().date_naive()
                );
                parsing::inactivity_sentinel()
            }
            Wait::Cancelled => return self.abandon(nav).await,
        };

        let now = Utc::now();
        let mut age = parsing::age_in_days(latest_post, now);
        if age <= threshold {
            return Ok(Stage::Done(age));
        }

        tracing::debug!(
            "Latest post of {} is {} days old, checking replies",
            entity.identifier,
            age
        );

        if !page.open_subpage(&entity.identifier, Subpage::Replies).await? {
            tracing::debug!("Replies tab not found for {}", entity.identifier);
            return Ok(Stage::Done(age));
        }
        nav.departed(profile);

        if self.pacer.pause(self.timing.replies_load_delay()).await == Flow::Cancelled {
            return self.abandon(nav).await;
        }
        match nav.arrive(&Location::Replies).await? {
            Wait::Cancelled => return self.abandon(nav).await,
            Wait::TimedOut => {
                nav.back().await?;
                return Ok(Stage::Done(age));
            }
            Wait::Satisfied(()) => {}
        }

        let replies = page.timestamps(TimestampScope::Replies).await?;
        if let Some(latest_reply) = parsing::latest_timestamp(&replies) {
            if latest_reply > latest_post {
                age = parsing::age_in_days(latest_reply, now);
                tracing::debug!("Latest reply of {} is {} days old", entity.identifier, age);
            }
        }

        nav.back().await?;
        Ok(Stage::Done(age))
    }

    /// Run the stages `fields` asks for: about view, hover card, then profile.
    ///
    /// `checkpoint` is consulted after the country stage and after the hover card; a
    /// `Some` stops extraction there. `activity_threshold` is only read when
    /// `fields.activity` is set.
    pub async fn extract<T>(
        &self,
        entity: &EntityRef,
        fields: RequiredFields,
        activity_threshold: Option<i64>,
        want_bio: bool,
        mut checkpoint: impl FnMut(Checkpoint<'_>) -> Option<T>,
    ) -> Result<Stage<Extracted<T>>, InspectorError> {
        let country = if fields.country {
            match self.country(entity).await? {
                Stage::Done(country) => country,
                Stage::Interrupted => return Ok(Stage::Interrupted),
            }
        } else {
            None
        };

        if let Some(decided) = checkpoint(Checkpoint::Country(country.as_deref())) {
            return Ok(Stage::Done(Extracted::Decided(decided)));
        }
        if self.pacer.is_cancelled() {
            return Ok(Stage::Interrupted);
        }

        // The about view re-renders the list; look the entry up again
        let entity = if fields.country && (fields.hover || fields.profile) {
            self.page
                .find_entry(&entity.identifier)
                .await?
                .unwrap_or_else(|| entity.clone())
        } else {
            entity.clone()
        };

        let hover = if fields.hover {
            let stats = match self.hover_stats(&entity, want_bio).await? {
                Stage::Done(Some(stats)) => stats,
                Stage::Done(None) => return Ok(Stage::Done(Extracted::HoverFailed)),
                Stage::Interrupted => return Ok(Stage::Interrupted),
            };
            if let Some(decided) = checkpoint(Checkpoint::Hover(&stats)) {
                return Ok(Stage::Done(Extracted::Decided(decided)));
            }
            Some(stats)
        } else {
            None
        };

        let profile = if fields.profile {
            if self.pacer.is_cancelled() {
                return Ok(Stage::Interrupted);
            }
            let threshold = if fields.activity { activity_threshold } else { None };
            match self.profile_stats(&entity, threshold).await? {
                Stage::Done(stats) => stats,
                Stage::Interrupted => return Ok(Stage::Interrupted),
            }
        } else {
            tracing::debug!("No profile data needed for {}", entity.identifier);
            ProfileStats::default()
        };

        let snapshot = AttributeSnapshot::assemble(hover.as_ref(), &profile, country.as_deref());
        tracing::debug!("{}: {}", entity.identifier, snapshot.summary());
        Ok(Stage::Done(Extracted::Snapshot(snapshot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ElementHandle;
    use crate::services::inspector::MockPageInspector;
    use crate::services::pacing::cancellation;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;

    fn bob() -> EntityRef {
        EntityRef::new("bob", ElementHandle::new("cell-bob"))
    }

    fn fast_timing() -> TimingSettings {
        TimingSettings {
            hover_delay_ms: 10,
            profile_load_delay_ms: 10,
            navigation_poll_ms: 10,
            back_settle_ms: 10,
            action_delay_ms: 10,
            about_cooldown_ms: 10,
            timestamp_poll_ms: 10,
            replies_load_delay_ms: 10,
            ..Default::default()
        }
    }

    fn extractor(mock: MockPageInspector) -> AttributeExtractor {
        AttributeExtractor::new(
            Arc::new(mock),
            PageKind::Followers,
            fast_timing(),
            Pacer::uninterruptible(),
            Arc::new(TextPatterns::new()),
        )
    }

    /// URL history shared by the mock's navigation expectations
    fn with_history(mock: &mut MockPageInspector, start: &str) -> Arc<Mutex<Vec<String>>> {
        let history = Arc::new(Mutex::new(vec![start.to_string()]));

        let current = history.clone();
        mock.expect_current_url()
            .returning(move || Ok(current.lock().unwrap().last().cloned().unwrap_or_default()));

        let back = history.clone();
        mock.expect_navigate_back().returning(move || {
            back.lock().unwrap().pop();
            Ok(())
        });

        history
    }

    fn card() -> HoverCard {
        HoverCard {
            followers_text: Some("1.2K".to_string()),
            following_text: Some("310".to_string()),
            fragments: vec![
                "@bob".to_string(),
                "310 Following".to_string(),
                "1.2K Followers".to_string(),
                "Daily crypto signals".to_string(),
            ],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_reads_counts_and_bio() {
        let mut mock = MockPageInspector::new();
        let shown = Arc::new(Mutex::new(false));

        let on = shown.clone();
        mock.expect_hover().times(1).returning(move |_| {
            *on.lock().unwrap() = true;
            Ok(())
        });
        let off = shown.clone();
        mock.expect_unhover().times(1).returning(move |_| {
            *off.lock().unwrap() = false;
            Ok(())
        });
        let read = shown.clone();
        mock.expect_hover_card()
            .returning(move || Ok((*read.lock().unwrap()).then(card)));

        let stage = extractor(mock).hover_stats(&bob(), true).await.unwrap();
        assert_eq!(
            stage,
            Stage::Done(Some(HoverStats {
                followers: 1200,
                following: 310,
                bio: Some("Daily crypto signals".to_string()),
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_card_missing_is_not_an_error() {
        let mut mock = MockPageInspector::new();
        mock.expect_hover().returning(|_| Ok(()));
        mock.expect_unhover().returning(|_| Ok(()));
        mock.expect_hover_card().returning(|| Ok(None));

        let stage = extractor(mock).hover_stats(&bob(), false).await.unwrap();
        assert_eq!(stage, Stage::Done(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hover_interrupted_by_cancellation() {
        let mut mock = MockPageInspector::new();
        mock.expect_hover().returning(|_| Ok(()));
        mock.expect_unhover().times(1).returning(|_| Ok(()));
        mock.expect_hover_card().returning(|| Ok(None));

        let (handle, token) = cancellation();
        handle.cancel();
        let extractor = AttributeExtractor::new(
            Arc::new(mock),
            PageKind::Following,
            fast_timing(),
            Pacer::new(token),
            Arc::new(TextPatterns::new()),
        );

        assert_eq!(extractor.hover_stats(&bob(), false).await.unwrap(), Stage::Interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_country_reads_label_and_returns_to_list() {
        let mut mock = MockPageInspector::new();
        let history = with_history(&mut mock, "https://x.com/owner/followers");

        let nav = history.clone();
        mock.expect_open_subpage()
            .withf(|id, subpage| id == "bob" && *subpage == Subpage::Profile)
            .times(1)
            .returning(move |_, _| {
                nav.lock().unwrap().push("https://x.com/bob".to_string());
                Ok(true)
            });
        mock.expect_open_account_menu().returning(|| Ok(true));
        let nav = history.clone();
        mock.expect_click_menu_item()
            .withf(|label| label == ABOUT_MENU_ITEM)
            .returning(move |_| {
                nav.lock().unwrap().push("https://x.com/bob/about".to_string());
                Ok(true)
            });
        mock.expect_texts_after_label()
            .withf(|label, limit| label == COUNTRY_LABEL && *limit == 10)
            .returning(|_, _| Ok(Some(vec!["Since 2019".to_string(), "Japan".to_string()])));

        let stage = extractor(mock).country(&bob()).await.unwrap();
        assert_eq!(stage, Stage::Done(Some("Japan".to_string())));
        assert_eq!(history.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_country_menu_missing_yields_unknown() {
        let mut mock = MockPageInspector::new();
        let history = with_history(&mut mock, "https://x.com/owner/followers");

        let nav = history.clone();
        mock.expect_open_subpage().returning(move |_, _| {
            nav.lock().unwrap().push("https://x.com/bob".to_string());
            Ok(true)
        });
        mock.expect_open_account_menu().times(5).returning(|| Ok(false));
        mock.expect_click_menu_item().never();

        let stage = extractor(mock).country(&bob()).await.unwrap();
        assert_eq!(stage, Stage::Done(None));
        assert_eq!(history.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profile_stats_with_reply_override() {
        let mut mock = MockPageInspector::new();
        let history = with_history(&mut mock, "https://x.com/owner/followers");

        let nav = history.clone();
        mock.expect_open_subpage().returning(move |_, subpage| {
            let url = match subpage {
                Subpage::Profile => "https://x.com/bob",
                Subpage::Replies => "https://x.com/bob/with_replies",
            };
            nav.lock().unwrap().push(url.to_string());
            Ok(true)
        });
        mock.expect_header_texts()
            .returning(|| Ok(vec!["Bob".to_string(), "42 posts".to_string()]));

        let old_post = (Utc::now() - ChronoDuration::days(400)).to_rfc3339();
        let recent_reply = (Utc::now() - ChronoDuration::days(3)).to_rfc3339();
        mock.expect_timestamps()
            .withf(|scope| *scope == TimestampScope::Posts)
            .returning(move |_| Ok(vec![old_post.clone()]));
        mock.expect_timestamps()
            .withf(|scope| *scope == TimestampScope::Replies)
            .returning(move |_| Ok(vec![recent_reply.clone()]));

        let stage = extractor(mock).profile_stats(&bob(), Some(365)).await.unwrap();
        let Stage::Done(stats) = stage else {
            panic!("profile stage was interrupted");
        };

        assert_eq!(stats.posts, Some(42));
        let age = stats.latest_activity_age_days.unwrap();
        assert!((3..=4).contains(&age), "reply age was {}", age);
        assert_eq!(history.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_timestamps_fall_back_to_sentinel() {
        let mut mock = MockPageInspector::new();
        let history = with_history(&mut mock, "https://x.com/owner/following");

        let nav = history.clone();
        mock.expect_open_subpage()
            .withf(|_, subpage| *subpage == Subpage::Profile)
            .returning(move |_, _| {
                nav.lock().unwrap().push("https://x.com/bob".to_string());
                Ok(true)
            });
        mock.expect_open_subpage()
            .withf(|_, subpage| *subpage == Subpage::Replies)
            .returning(|_, _| Ok(false));
        mock.expect_header_texts().returning(|| Ok(Vec::new()));
        mock.expect_timestamps()
            .withf(|scope| *scope == TimestampScope::Posts)
            .times(5)
            .returning(|_| Ok(Vec::new()));

        let extractor = AttributeExtractor::new(
            Arc::new(mock),
            PageKind::Following,
            fast_timing(),
            Pacer::uninterruptible(),
            Arc::new(TextPatterns::new()),
        );
        let Stage::Done(stats) = extractor.profile_stats(&bob(), Some(30)).await.unwrap() else {
            panic!("profile stage was interrupted");
        };

        assert_eq!(stats.posts, None);
        assert!(stats.latest_activity_age_days.unwrap() > 3000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_hover_still_waits_for_card_to_close() {
        let mut mock = MockPageInspector::new();
        let polls = Arc::new(Mutex::new(0u32));

        mock.expect_hover().returning(|_| Ok(()));
        mock.expect_unhover().times(1).returning(|_| Ok(()));
        let count = polls.clone();
        mock.expect_hover_card().returning(move || {
            let mut polls = count.lock().unwrap();
            *polls += 1;
            Ok((*polls < 3).then(card))
        });

        let (handle, token) = cancellation();
        handle.cancel();
        let extractor = AttributeExtractor::new(
            Arc::new(mock),
            PageKind::Followers,
            fast_timing(),
            Pacer::new(token),
            Arc::new(TextPatterns::new()),
        );

        assert_eq!(extractor.hover_stats(&bob(), true).await.unwrap(), Stage::Interrupted);
        assert_eq!(*polls.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_country_skipped_when_profile_never_loads() {
        let mut mock = MockPageInspector::new();
        let history = with_history(&mut mock, "https://x.com/owner/followers");

        mock.expect_open_subpage().times(1).returning(|_, _| Ok(true));
        mock.expect_open_account_menu().never();
        mock.expect_click_menu_item().never();
        mock.expect_texts_after_label().never();

        let stage = extractor(mock).country(&bob()).await.unwrap();
        assert_eq!(stage, Stage::Done(None));
        assert_eq!(history.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_country_skipped_when_about_view_never_loads() {
        let mut mock = MockPageInspector::new();
        let history = with_history(&mut mock, "https://x.com/owner/followers");

        let nav = history.clone();
        mock.expect_open_subpage().returning(move |_, _| {
            nav.lock().unwrap().push("https://x.com/bob".to_string());
            Ok(true)
        });
        mock.expect_open_account_menu().returning(|| Ok(true));
        mock.expect_click_menu_item().times(1).returning(|_| Ok(true));
        mock.expect_texts_after_label().never();

        let stage = extractor(mock).country(&bob()).await.unwrap();
        assert_eq!(stage, Stage::Done(None));
        assert_eq!(history.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfirmed_return_to_list_is_an_error() {
        let mut mock = MockPageInspector::new();
        let history = Arc::new(Mutex::new(vec!["https://x.com/owner/followers".to_string()]));

        let current = history.clone();
        mock.expect_current_url()
            .returning(move || Ok(current.lock().unwrap().last().cloned().unwrap_or_default()));
        let nav = history.clone();
        mock.expect_open_subpage().returning(move |_, _| {
            nav.lock().unwrap().push("https://x.com/bob".to_string());
            Ok(true)
        });
        // Back presses are swallowed; the page stays on the profile
        mock.expect_navigate_back().returning(|| Ok(()));
        mock.expect_header_texts()
            .returning(|| Ok(vec!["Bob".to_string(), "7 posts".to_string()]));

        let result = extractor(mock).profile_stats(&bob(), None).await;
        assert!(matches!(result, Err(InspectorError::UnexpectedState(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_skips_unrequested_stages() {
        let mut mock = MockPageInspector::new();
        mock.expect_hover().never();
        mock.expect_open_subpage().never();

        let stage = extractor(mock)
            .extract(&bob(), RequiredFields::none(), None, false, |_| None::<()>)
            .await
            .unwrap();
        assert_eq!(stage, Stage::Done(Extracted::Snapshot(AttributeSnapshot::default())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_stops_at_deciding_checkpoint() {
        let mut mock = MockPageInspector::new();
        let shown = Arc::new(Mutex::new(false));

        let on = shown.clone();
        mock.expect_hover().times(1).returning(move |_| {
            *on.lock().unwrap() = true;
            Ok(())
        });
        let off = shown.clone();
        mock.expect_unhover().returning(move |_| {
            *off.lock().unwrap() = false;
            Ok(())
        });
        let read = shown.clone();
        mock.expect_hover_card()
            .returning(move || Ok((*read.lock().unwrap()).then(card)));
        mock.expect_open_subpage().never();

        let fields = RequiredFields {
            hover: true,
            profile: true,
            ..RequiredFields::none()
        };
        let mut seen = Vec::new();
        let stage = extractor(mock)
            .extract(&bob(), fields, None, true, |checkpoint| match checkpoint {
                Checkpoint::Country(country) => {
                    seen.push(format!("country={:?}", country));
                    None
                }
                Checkpoint::Hover(stats) => {
                    seen.push(format!("followers={}", stats.followers));
                    (stats.followers > 1000).then_some("large")
                }
            })
            .await
            .unwrap();

        assert_eq!(stage, Stage::Done(Extracted::Decided("large")));
        assert_eq!(seen, vec!["country=None", "followers=1200"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_reports_missing_hover_card() {
        let mut mock = MockPageInspector::new();
        mock.expect_hover().returning(|_| Ok(()));
        mock.expect_unhover().returning(|_| Ok(()));
        mock.expect_hover_card().returning(|| Ok(None));
        mock.expect_open_subpage().never();

        let fields = RequiredFields {
            hover: true,
            profile: true,
            ..RequiredFields::none()
        };
        let stage = extractor(mock)
            .extract(&bob(), fields, None, false, |_| None::<()>)
            .await
            .unwrap();
        assert_eq!(stage, Stage::Done(Extracted::HoverFailed));
    }
}
