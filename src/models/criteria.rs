use indexmap::IndexSet;

/// Normalised removal criteria for one run.
///
/// Every threshold is independently optional; `None` means the rule is disabled.
/// The configuration layer does all raw-text cleanup (splitting identifier lists,
/// trimming) before building this structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriteriaConfig {
    /// Remove when follower count is strictly below this value
    pub max_followers: Option<u64>,
    /// Remove when following count is strictly above this value
    pub min_following: Option<u64>,
    /// Remove when the known post count is at most this value
    pub max_posts: Option<u64>,
    /// Remove when the latest known activity is at least this many days old
    pub min_inactivity_days: Option<i64>,
    /// Case-insensitive substring searched in the hover-card bio
    pub bio_substring: Option<String>,
    /// Remove when the identifier contains a digit run at least this long
    pub username_digit_run: Option<usize>,
    pub forced_removal: IndexSet<String>,
    pub country_blacklist: IndexSet<String>,
    pub is_dry_run: bool,
    pub skip_until_identifier: Option<String>,
}

impl CriteriaConfig {
    /// True when at least one rule could ever remove an entity.
    ///
    /// Callers refuse to start a run otherwise.
    pub fn has_enabled_criterion(&self) -> bool {
        self.max_followers.is_some()
            || self.min_following.is_some()
            || self.max_posts.is_some()
            || self.min_inactivity_days.is_some()
            || self.bio_substring.is_some()
            || self.username_digit_run.is_some()
            || !self.forced_removal.is_empty()
            || self.country_blacklist_enabled()
    }

    pub fn country_blacklist_enabled(&self) -> bool {
        !self.country_blacklist.is_empty()
    }

    /// Which extraction stages the active criteria need.
    pub fn required_fields(&self) -> RequiredFields {
        RequiredFields {
            hover: self.max_followers.is_some()
                || self.min_following.is_some()
                || self.bio_substring.is_some(),
            profile: self.max_posts.is_some() || self.min_inactivity_days.is_some(),
            activity: self.min_inactivity_days.is_some(),
            country: self.country_blacklist_enabled(),
        }
    }
}

/// Extraction stages to run for an entity.
///
/// Hover probes and sub-page navigation are the slowest and flakiest page
/// interactions, so each is skipped entirely when no active rule reads its output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequiredFields {
    /// Hover card: follower/following counts and bio
    pub hover: bool,
    /// Profile view: post count
    pub profile: bool,
    /// Profile view: latest activity timestamp (implies `profile`)
    pub activity: bool,
    /// About view: account country
    pub country: bool,
}

impl RequiredFields {
    pub fn none() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_criteria_cannot_start() {
        let criteria = CriteriaConfig::default();
        assert!(!criteria.has_enabled_criterion());

        let dry_run_only = CriteriaConfig {
            is_dry_run: true,
            skip_until_identifier: Some("alice".to_string()),
            ..Default::default()
        };
        assert!(!dry_run_only.has_enabled_criterion());
    }

    #[test]
    fn test_forced_list_alone_is_a_criterion() {
        let mut criteria = CriteriaConfig::default();
        criteria.forced_removal.insert("spammer".to_string());
        assert!(criteria.has_enabled_criterion());
        assert_eq!(criteria.required_fields(), RequiredFields::none());
    }

    #[test]
    fn test_required_fields_follow_criteria() {
        let criteria = CriteriaConfig {
            max_followers: Some(50),
            min_inactivity_days: Some(365),
            ..Default::default()
        };
        let fields = criteria.required_fields();

        assert!(fields.hover);
        assert!(fields.profile);
        assert!(fields.activity);
        assert!(!fields.country);
    }

    #[test]
    fn test_post_count_does_not_need_activity() {
        let criteria = CriteriaConfig {
            max_posts: Some(5),
            ..Default::default()
        };
        let fields = criteria.required_fields();

        assert!(!fields.hover);
        assert!(fields.profile);
        assert!(!fields.activity);
    }
}
