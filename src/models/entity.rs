use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Opaque reference to a rendered list entry.
///
/// The value is only meaningful to the [`PageInspector`](crate::services::PageInspector)
/// that produced it. Handles go stale after navigation, so the engine never keeps
/// one across scans and re-resolves by identifier before acting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One account entry in the scrolling list, as found by the list walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef {
    /// Unique account handle (username without the leading slash)
    pub identifier: String,
    pub handle: ElementHandle,
}

impl EntityRef {
    pub fn new(identifier: impl Into<String>, handle: ElementHandle) -> Self {
        Self {
            identifier: identifier.into(),
            handle,
        }
    }
}

/// Which list the run walks.
///
/// The kind decides which terminal action applies (remove a follower vs. unfollow)
/// and which location counts as the originating list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Followers,
    Following,
}

impl PageKind {
    /// Verb used in logs and dry-run messages
    pub fn action_verb(self) -> &'static str {
        match self {
            PageKind::Followers => "remove",
            PageKind::Following => "unfollow",
        }
    }
}

impl fmt::Display for PageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageKind::Followers => write!(f, "followers"),
            PageKind::Following => write!(f, "following"),
        }
    }
}

/// Symbolic page location used to verify navigation steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// The originating list view
    List(PageKind),
    /// An account's main profile
    Profile(String),
    /// The nested "about this account" view
    About,
    /// An account's replies tab
    Replies,
}

impl Location {
    /// Check whether a page URL (absolute or path-only) is at this location.
    pub fn matches(&self, page_url: &str) -> bool {
        let segments = path_segments(page_url);
        let second = segments.get(1).map(String::as_str);

        match self {
            Location::List(PageKind::Followers) => {
                segments.len() == 2 && matches!(second, Some("followers" | "verified_followers"))
            }
            Location::List(PageKind::Following) => {
                segments.len() == 2 && second == Some("following")
            }
            Location::Profile(identifier) => {
                segments.len() == 1 && segments[0].eq_ignore_ascii_case(identifier)
            }
            Location::About => second == Some("about"),
            Location::Replies => second == Some("with_replies"),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::List(kind) => write!(f, "{} list", kind),
            Location::Profile(identifier) => write!(f, "profile of {}", identifier),
            Location::About => write!(f, "about view"),
            Location::Replies => write!(f, "replies view"),
        }
    }
}

fn path_segments(page_url: &str) -> Vec<String> {
    let parsed = Url::parse(page_url)
        .or_else(|_| Url::parse("https://localhost").and_then(|base| base.join(page_url)));

    match parsed {
        Ok(parsed) => parsed
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Err(_) => Vec::new(),
    }
}
