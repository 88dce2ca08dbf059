/// Counts and bio read from an entity's hover card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoverStats {
    pub followers: u64,
    pub following: u64,
    /// First free-text fragment of the card, only read when a bio criterion is active
    pub bio: Option<String>,
}

/// Data read from an entity's profile view.
///
/// `None` means the value could not be determined, which is never the same as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileStats {
    pub posts: Option<u64>,
    pub latest_activity_age_days: Option<i64>,
}

/// Everything known about one entity at decision time.
///
/// Built once per entity from the extraction stages that actually ran. Raw counts
/// default to 0 when the hover probe was not needed or could not be parsed; every
/// other attribute stays unknown (`None`) instead of being coerced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSnapshot {
    pub follower_count: u64,
    pub following_count: u64,
    pub bio: Option<String>,
    pub post_count: Option<u64>,
    pub latest_activity_age_days: Option<i64>,
    pub country: Option<String>,
}

impl AttributeSnapshot {
    /// Assemble a snapshot from the stages that ran
    pub fn assemble(
        hover: Option<&HoverStats>,
        profile: &ProfileStats,
        country: Option<&str>,
    ) -> Self {
        Self {
            follower_count: hover.map(|h| h.followers).unwrap_or(0),
            following_count: hover.map(|h| h.following).unwrap_or(0),
            bio: hover.and_then(|h| h.bio.clone()),
            post_count: profile.posts,
            latest_activity_age_days: profile.latest_activity_age_days,
            country: country.map(str::to_string),
        }
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        fn known<T: std::fmt::Display>(value: Option<T>) -> String {
            value
                .map(|v| v.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        }

        format!(
            "followers={}, following={}, posts={}, inactive_days={}, country={}, bio={}",
            self.follower_count,
            self.following_count,
            known(self.post_count),
            known(self.latest_activity_age_days),
            known(self.country.as_deref()),
            self.bio
                .as_deref()
                .map(|b| b.chars().take(50).collect::<String>())
                .unwrap_or_else(|| "absent".to_string()),
        )
    }
}
