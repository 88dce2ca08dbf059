use crate::models::{AttributeSnapshot, CriteriaConfig, HoverStats};
use crate::services::parsing::TextPatterns;
use std::fmt;
use std::sync::Arc;

/// A single threshold rule that fired during the final evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    FewFollowers { count: u64, max: u64 },
    ManyFollowing { count: u64, min: u64 },
    FewPosts { count: u64, max: u64 },
    Inactive { days: i64, min: i64 },
    BioMatch { needle: String },
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::FewFollowers { count, max } => write!(f, "followers {} < {}", count, max),
            Trigger::ManyFollowing { count, min } => write!(f, "following {} > {}", count, min),
            Trigger::FewPosts { count, max } => write!(f, "posts {} <= {}", count, max),
            Trigger::Inactive { days, min } => write!(f, "inactive {} >= {} days", days, min),
            Trigger::BioMatch { needle } => write!(f, "bio contains \"{}\"", needle),
        }
    }
}

/// Why an entity stays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    /// No enabled rule fired
    NoTrigger,
    /// A bio was read and does not contain the configured text
    BioMismatch,
    /// The hover counts already rule out every enabled trigger
    BelowThresholds,
    /// The hover probe failed; missing data never removes
    ProbeFailed,
}

/// Classification of one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    ForcedRemove,
    CountryBlacklisted { country: String },
    UsernameDigitRule { run: usize, threshold: usize },
    CriteriaMatch { triggers: Vec<Trigger> },
    Kept { reason: KeepReason },
}

impl Verdict {
    pub fn is_removal(&self) -> bool {
        !matches!(self, Verdict::Kept { .. })
    }

    pub fn kept(reason: KeepReason) -> Self {
        Verdict::Kept { reason }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::ForcedRemove => write!(f, "in forced removal list"),
            Verdict::CountryBlacklisted { country } => write!(f, "blacklisted country: {}", country),
            Verdict::UsernameDigitRule { run, threshold } => {
                write!(f, "{} consecutive digits in username (threshold {})", run, threshold)
            }
            Verdict::CriteriaMatch { triggers } => {
                let reasons: Vec<String> = triggers.iter().map(Trigger::to_string).collect();
                write!(f, "matched criteria: {}", reasons.join(", "))
            }
            Verdict::Kept { reason } => match reason {
                KeepReason::NoTrigger => write!(f, "kept: no criteria matched"),
                KeepReason::BioMismatch => write!(f, "kept: bio does not match"),
                KeepReason::BelowThresholds => write!(f, "kept: counts outside removal thresholds"),
                KeepReason::ProbeFailed => write!(f, "kept: could not read stats"),
            },
        }
    }
}

/// Pure keep/remove policy.
///
/// Rules apply in a fixed precedence and the first one that decides wins:
///
/// 1. forced removal list
/// 2. country blacklist (unknown country never matches)
/// 3. username digit run
/// 4. hover-count pre-filter (an early exit only, never changes the outcome)
/// 5. bio mismatch keeps
/// 6. any enabled threshold trigger removes
///
/// Rules 1 to 3 need no page data beyond the country, so the controller checks
/// them before any hover or profile probe.
#[derive(Clone)]
pub struct DecisionEngine {
    criteria: CriteriaConfig,
    patterns: Arc<TextPatterns>,
}

impl DecisionEngine {
    pub fn new(criteria: CriteriaConfig, patterns: Arc<TextPatterns>) -> Self {
        Self { criteria, patterns }
    }

    pub fn criteria(&self) -> &CriteriaConfig {
        &self.criteria
    }

    /// Rule 1
    pub fn forced(&self, identifier: &str) -> Option<Verdict> {
        self.criteria
            .forced_removal
            .contains(identifier)
            .then_some(Verdict::ForcedRemove)
    }

    /// Rule 2. `None` when the rule is disabled, the country is unknown or not listed.
    pub fn country(&self, country: Option<&str>) -> Option<Verdict> {
        if !self.criteria.country_blacklist_enabled() {
            return None;
        }

        let country = country.map(str::trim).filter(|c| !c.is_empty())?;
        let normalized = country.to_lowercase();

        self.criteria
            .country_blacklist
            .iter()
            .any(|blocked| blocked.trim().to_lowercase() == normalized)
            .then(|| Verdict::CountryBlacklisted {
                country: country.to_string(),
            })
    }

    /// Rule 3
    pub fn username(&self, identifier: &str) -> Option<Verdict> {
        let threshold = self.criteria.username_digit_run?;
        let run = self.patterns.longest_digit_run(identifier);

        (run >= threshold).then_some(Verdict::UsernameDigitRule { run, threshold })
    }

    /// Rule 5. Only a bio that was actually read can keep an entity.
    pub fn bio_gate(&self, bio: Option<&str>) -> Option<Verdict> {
        let needle = self.criteria.bio_substring.as_deref()?;
        let bio = bio?;

        (!contains_ignore_case(bio, needle)).then_some(Verdict::kept(KeepReason::BioMismatch))
    }

    fn cheap_bounds_enabled(&self) -> bool {
        self.criteria.max_followers.is_some() || self.criteria.min_following.is_some()
    }

    fn profile_criteria_enabled(&self) -> bool {
        self.criteria.max_posts.is_some() || self.criteria.min_inactivity_days.is_some()
    }

    fn count_triggers(&self, followers: u64, following: u64) -> Vec<Trigger> {
        let mut triggers = Vec::new();

        if let Some(max) = self.criteria.max_followers {
            if followers < max {
                triggers.push(Trigger::FewFollowers {
                    count: followers,
                    max,
                });
            }
        }
        if let Some(min) = self.criteria.min_following {
            if following > min {
                triggers.push(Trigger::ManyFollowing {
                    count: following,
                    min,
                });
            }
        }

        triggers
    }

    fn bio_trigger(&self, bio: Option<&str>) -> Option<Trigger> {
        let needle = self.criteria.bio_substring.as_deref()?;
        let bio = bio?;

        contains_ignore_case(bio, needle).then(|| Trigger::BioMatch {
            needle: needle.to_string(),
        })
    }

    /// Rule 4 followed by rule 5, using only the hover card.
    ///
    /// Returns a verdict when the hover data alone already settles the outcome, so
    /// the profile probe can be skipped. A removal is returned early when a count
    /// trigger fires; a keep is returned early only when no trigger the profile
    /// could still contribute is enabled. `None` means the profile must be read.
    pub fn prefilter(&self, hover: &HoverStats) -> Option<Verdict> {
        let bio_gate = self.bio_gate(hover.bio.as_deref());

        if self.cheap_bounds_enabled() {
            let triggers = self.count_triggers(hover.followers, hover.following);

            if !triggers.is_empty() {
                return Some(bio_gate.unwrap_or(Verdict::CriteriaMatch { triggers }));
            }

            if !self.profile_criteria_enabled() && self.bio_trigger(hover.bio.as_deref()).is_none() {
                return Some(Verdict::kept(KeepReason::BelowThresholds));
            }
        }

        bio_gate
    }

    /// Rule 6: remove when any enabled trigger fires on the full snapshot.
    pub fn conclude(&self, snapshot: &AttributeSnapshot) -> Verdict {
        let mut triggers = self.count_triggers(snapshot.follower_count, snapshot.following_count);

        if let (Some(max), Some(count)) = (self.criteria.max_posts, snapshot.post_count) {
            if count <= max {
                triggers.push(Trigger::FewPosts { count, max });
            }
        }
        if let (Some(min), Some(days)) = (
            self.criteria.min_inactivity_days,
            snapshot.latest_activity_age_days,
        ) {
            if days >= min {
                triggers.push(Trigger::Inactive { days, min });
            }
        }
        if let Some(trigger) = self.bio_trigger(snapshot.bio.as_deref()) {
            triggers.push(trigger);
        }

        if triggers.is_empty() {
            Verdict::kept(KeepReason::NoTrigger)
        } else {
            Verdict::CriteriaMatch { triggers }
        }
    }

    /// Full evaluation in precedence order, without the pre-filter.
    pub fn decide(&self, identifier: &str, snapshot: &AttributeSnapshot) -> Verdict {
        self.forced(identifier)
            .or_else(|| self.country(snapshot.country.as_deref()))
            .or_else(|| self.username(identifier))
            .or_else(|| self.bio_gate(snapshot.bio.as_deref()))
            .unwrap_or_else(|| self.conclude(snapshot))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
