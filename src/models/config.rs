use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User configuration stored in `Cleaner Settings.yaml`
///
/// Contains technical timings, the saved criteria form and logging preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub timing: TimingSettings,
    pub criteria: CriteriaSettings,
    pub logging: LoggingSettings,
}

/// Delays and retry budgets for page interactions.
///
/// All delays are in milliseconds. The defaults are tuned for the target site and
/// are safe to raise on slow connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub scroll_delay_ms: u64,
    pub action_delay_ms: u64,
    pub hover_delay_ms: u64,
    pub profile_load_delay_ms: u64,

    /// Scans (with a small scroll between them) before the walker gives up for this step
    pub max_follower_attempts: u32,
    pub max_hover_attempts: u32,
    pub max_hover_unload_attempts: u32,

    /// Consecutive scroll steps without a new entity before the list is considered done
    pub max_scroll_attempts: u32,

    pub navigation_poll_ms: u64,
    pub max_navigation_attempts: u32,
    pub max_menu_attempts: u32,
    pub back_settle_ms: u64,

    /// Pause after reaching the about view; the target site throttles that endpoint
    pub about_cooldown_ms: u64,

    pub timestamp_poll_ms: u64,
    pub max_timestamp_attempts: u32,
    pub replies_load_delay_ms: u64,

    pub max_action_attempts: u32,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            scroll_delay_ms: 250,
            action_delay_ms: 450,
            hover_delay_ms: 350,
            profile_load_delay_ms: 2000,
            max_follower_attempts: 3,
            max_hover_attempts: 5,
            max_hover_unload_attempts: 5,
            max_scroll_attempts: 5,
            navigation_poll_ms: 500,
            max_navigation_attempts: 10,
            max_menu_attempts: 5,
            back_settle_ms: 1000,
            about_cooldown_ms: 7000,
            timestamp_poll_ms: 1000,
            max_timestamp_attempts: 5,
            replies_load_delay_ms: 3500,
            max_action_attempts: 3,
        }
    }
}

impl TimingSettings {
    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn action_delay(&self) -> Duration {
        Duration::from_millis(self.action_delay_ms)
    }

    pub fn hover_delay(&self) -> Duration {
        Duration::from_millis(self.hover_delay_ms)
    }

    pub fn profile_load_delay(&self) -> Duration {
        Duration::from_millis(self.profile_load_delay_ms)
    }

    pub fn navigation_poll(&self) -> Duration {
        Duration::from_millis(self.navigation_poll_ms)
    }

    pub fn back_settle(&self) -> Duration {
        Duration::from_millis(self.back_settle_ms)
    }

    pub fn about_cooldown(&self) -> Duration {
        Duration::from_millis(self.about_cooldown_ms)
    }

    pub fn timestamp_poll(&self) -> Duration {
        Duration::from_millis(self.timestamp_poll_ms)
    }

    pub fn replies_load_delay(&self) -> Duration {
        Duration::from_millis(self.replies_load_delay_ms)
    }
}

/// Saved state of the criteria form, before normalisation.
///
/// Each rule has an enable flag next to its value so a disabled rule keeps the
/// last value the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaSettings {
    pub enable_max_followers: bool,
    pub max_followers: u64,

    pub enable_min_following: bool,
    pub min_following: u64,

    pub enable_max_posts: bool,
    pub max_posts: u64,

    pub enable_inactivity_days: bool,
    pub min_inactivity_days: i64,

    pub enable_bio_matches: bool,
    pub bio_matches_text: String,

    pub enable_username_digits: bool,
    pub username_digits: usize,

    pub enable_skip_until_username: bool,
    pub skip_until_username: String,

    /// Free text; identifiers separated by whitespace and/or commas
    pub usernames_to_remove: String,

    pub remove_blacklisted_countries: bool,
    pub blacklisted_countries: Vec<String>,

    pub dry_run: bool,
}

impl Default for CriteriaSettings {
    fn default() -> Self {
        Self {
            enable_max_followers: false,
            max_followers: 100,
            enable_min_following: false,
            min_following: 1000,
            enable_max_posts: false,
            max_posts: 10,
            enable_inactivity_days: false,
            min_inactivity_days: 365,
            enable_bio_matches: false,
            bio_matches_text: String::new(),
            enable_username_digits: false,
            username_digits: 6,
            enable_skip_until_username: false,
            skip_until_username: String::new(),
            usernames_to_remove: String::new(),
            remove_blacklisted_countries: false,
            blacklisted_countries: Vec::new(),
            dry_run: true,
        }
    }
}

/// Logging preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub directory: String,
    pub file_prefix: String,
    pub debug: bool,
    pub console: bool,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "audience-cleaner".to_string(),
            debug: false,
            console: true,
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_defaults() {
        let timing = TimingSettings::default();
        assert_eq!(timing.scroll_delay(), Duration::from_millis(250));
        assert_eq!(timing.max_follower_attempts, 3);
        assert_eq!(timing.max_scroll_attempts, 5);
        assert_eq!(timing.about_cooldown(), Duration::from_secs(7));
    }

    #[test]
    fn test_criteria_defaults_are_dry_run() {
        let criteria = CriteriaSettings::default();
        assert!(criteria.dry_run);
        assert!(!criteria.enable_max_followers);
        assert!(criteria.blacklisted_countries.is_empty());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "timing:\n  scroll_delay_ms: 900\n";
        let config: UserConfig = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(config.timing.scroll_delay_ms, 900);
        assert_eq!(config.timing.hover_delay_ms, 350);
        assert_eq!(config.logging, LoggingSettings::default());
    }
}
