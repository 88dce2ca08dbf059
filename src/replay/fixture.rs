use crate::models::PageKind;
use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fs;

/// How an account's terminal action behaves in the replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    /// Menu/control works and a confirmation dialog appears
    #[default]
    Confirm,
    /// No dialog; the follow-state control flips to "Follow" immediately
    LabelFlip,
    /// The entry's menu or control never responds
    Broken,
}

/// One account in a recorded list.
///
/// Count fields hold the text as the site renders it (`"1,234"`, `"12.5K"`). A `None`
/// text means the element is missing from the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountFixture {
    pub username: String,
    pub followers: Option<String>,
    pub following: Option<String>,
    pub bio: Option<String>,
    /// Header text such as `"1,234 posts"`
    pub posts: Option<String>,
    pub country: Option<String>,
    pub latest_post_days_ago: Option<i64>,
    pub latest_reply_days_ago: Option<i64>,
    /// Whether hovering the entry shows a card at all
    pub hover_card: bool,
    /// Whether following the profile link ever loads the profile
    pub profile_reachable: bool,
    pub action: ActionMode,
}

impl Default for AccountFixture {
    fn default() -> Self {
        Self {
            username: String::new(),
            followers: None,
            following: None,
            bio: None,
            posts: None,
            country: None,
            latest_post_days_ago: None,
            latest_reply_days_ago: None,
            hover_card: true,
            profile_reachable: true,
            action: ActionMode::Confirm,
        }
    }
}

impl AccountFixture {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_counts(mut self, followers: &str, following: &str) -> Self {
        self.followers = Some(followers.to_string());
        self.following = Some(following.to_string());
        self
    }
}

/// A recorded follower/following list for offline runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fixture {
    /// Account whose list this is
    pub owner: String,
    pub page_kind: PageKind,
    /// Number of entries fully visible at once
    pub viewport: usize,
    /// Fail every page call after this many calls, simulating a closed tab
    pub fail_after_calls: Option<usize>,
    pub accounts: Vec<AccountFixture>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            owner: "owner".to_string(),
            page_kind: PageKind::Followers,
            viewport: 4,
            fail_after_calls: None,
            accounts: Vec::new(),
        }
    }
}

impl Fixture {
    pub fn new(page_kind: PageKind, accounts: Vec<AccountFixture>) -> Self {
        Self {
            page_kind,
            accounts,
            ..Default::default()
        }
    }

    /// Load a fixture from a YAML file
    pub fn load<P: AsRef<Utf8Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture: {}", path))?;

        let fixture: Fixture = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse fixture: {}", path))?;

        tracing::info!(
            "Loaded fixture {} ({} {}, {} accounts)",
            path,
            fixture.owner,
            fixture.page_kind,
            fixture.accounts.len()
        );
        Ok(fixture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_yaml_defaults() {
        let yaml = r#"
page_kind: following
accounts:
  - username: alice
    followers: "1.2K"
  - username: bob
    hover_card: false
    profile_reachable: false
    action: label_flip
"#;
        let fixture: Fixture = serde_yaml_ng::from_str(yaml).unwrap();

        assert_eq!(fixture.page_kind, PageKind::Following);
        assert_eq!(fixture.viewport, 4);
        assert_eq!(fixture.accounts[0].followers.as_deref(), Some("1.2K"));
        assert!(fixture.accounts[0].hover_card);
        assert_eq!(fixture.accounts[1].action, ActionMode::LabelFlip);
        assert!(!fixture.accounts[1].hover_card);
        assert!(fixture.accounts[0].profile_reachable);
        assert!(!fixture.accounts[1].profile_reachable);
    }
}
