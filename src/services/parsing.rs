use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;

/// Label that precedes the country on the about view
pub const COUNTRY_LABEL: &str = "Account based in";

/// Reader for the loosely formatted text the page renders.
///
/// Patterns are compiled once at construction time:
///
/// - `count_pattern`: `<digits[.digits]><optional K|M|B>` after separators are stripped
/// - `following_label` / `followers_label`: hover-card count labels, excluded from bio
/// - `mention_pattern`: a bare `@handle` fragment, excluded from bio
/// - `post_patterns`: profile header "N posts" variants, strictest first
pub struct TextPatterns {
    count_pattern: Regex,
    following_label: Regex,
    followers_label: Regex,
    mention_pattern: Regex,
    digit_run: Regex,
    post_patterns: Vec<Regex>,
}

impl Default for TextPatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl TextPatterns {
    pub fn new() -> Self {
        Self {
            count_pattern: Regex::new(r"^(\d+(?:\.\d+)?)\s*([KMB])?$").expect("Invalid count regex"),
            following_label: Regex::new(r"(?i)^[\d.,]+\s*[KMB]?\s*Following$")
                .expect("Invalid following label regex"),
            followers_label: Regex::new(r"(?i)^[\d.,]+\s*[KMB]?\s*Followers$")
                .expect("Invalid followers label regex"),
            mention_pattern: Regex::new(r"^@\w+$").expect("Invalid mention regex"),
            digit_run: Regex::new(r"\d+").expect("Invalid digit run regex"),
            post_patterns: vec![
                Regex::new(r"^[\d,.]+ posts$").expect("Invalid strict posts regex"),
                Regex::new(r"(?i)^[\d,.]+[KMB]?\s*posts$").expect("Invalid suffixed posts regex"),
                Regex::new(r"(?i)^[\d,.]+\s*post$").expect("Invalid singular post regex"),
            ],
        }
    }

    /// Parse a display count such as `1,234`, `12.5K` or `3M`.
    ///
    /// Unparseable text yields 0, which reads as a small account to the threshold rules.
    pub fn parse_count(&self, text: &str) -> u64 {
        let cleaned = text.trim().replace(',', "").to_uppercase();

        let Some(caps) = self.count_pattern.captures(&cleaned) else {
            tracing::debug!("Unparseable count text '{}', using 0", text);
            return 0;
        };

        let Ok(base) = caps[1].parse::<f64>() else {
            return 0;
        };

        let multiplier = match caps.get(2).map(|m| m.as_str()) {
            Some("K") => 1e3,
            Some("M") => 1e6,
            Some("B") => 1e9,
            _ => 1.0,
        };

        (base * multiplier).round() as u64
    }

    /// Length of the longest run of consecutive ASCII digits
    pub fn longest_digit_run(&self, identifier: &str) -> usize {
        self.digit_run
            .find_iter(identifier)
            .map(|m| m.as_str().len())
            .max()
            .unwrap_or(0)
    }

    /// First hover-card fragment that reads like a bio
    pub fn pick_bio(&self, fragments: &[String]) -> Option<String> {
        fragments
            .iter()
            .map(|f| f.trim())
            .find(|f| {
                f.chars().count() > 2
                    && !self.following_label.is_match(f)
                    && !self.followers_label.is_match(f)
                    && !self.mention_pattern.is_match(f)
            })
            .map(str::to_string)
    }

    /// Country from the fragments that follow the "Account based in" label
    pub fn pick_country(&self, fragments: &[String]) -> Option<String> {
        fragments
            .iter()
            .map(|f| f.trim())
            .find(|f| {
                !f.is_empty()
                    && *f != COUNTRY_LABEL
                    && f.chars().count() < 100
                    && !f.starts_with(|c: char| c.is_ascii_digit())
                    && !f.contains('@')
                    && !f.contains("http")
                    && !f.contains("Since")
                    && !f.contains("Date joined")
            })
            .map(str::to_string)
    }

    /// Post count from the profile header leaf texts.
    ///
    /// Each pattern is tried against every text before moving to the next, looser one.
    pub fn parse_post_count(&self, texts: &[String]) -> Option<u64> {
        let matched = self
            .post_patterns
            .iter()
            .find_map(|pattern| texts.iter().map(|t| t.trim()).find(|t| pattern.is_match(t)))?;

        let lower = matched.to_lowercase();
        let number = lower
            .trim_end_matches("posts")
            .trim_end_matches("post")
            .trim();

        Some(self.parse_count(number))
    }
}

/// Reference date used when no activity timestamp could be found
pub fn inactivity_sentinel() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Most recent of the given RFC 3339 timestamps; unparseable values are ignored.
pub fn latest_timestamp(raw: &[String]) -> Option<DateTime<Utc>> {
    raw.iter()
        .filter_map(|value| DateTime::parse_from_rfc3339(value.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .max()
}

/// Whole days between `then` and `now`, rounded up
pub fn age_in_days(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    const DAY_MS: i64 = 24 * 60 * 60 * 1000;
    let elapsed = (now - then).num_milliseconds().abs();
    (elapsed + DAY_MS - 1) / DAY_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_parse_count_suffixes() {
        let patterns = TextPatterns::new();
        assert_eq!(patterns.parse_count("1,234"), 1234);
        assert_eq!(patterns.parse_count("12.5K"), 12_500);
        assert_eq!(patterns.parse_count("3m"), 3_000_000);
        assert_eq!(patterns.parse_count("1.2B"), 1_200_000_000);
        assert_eq!(patterns.parse_count("2.75K"), 2_750);
    }

    #[test]
    fn test_parse_count_fails_open_to_zero() {
        let patterns = TextPatterns::new();
        assert_eq!(patterns.parse_count(""), 0);
        assert_eq!(patterns.parse_count("lots"), 0);
        assert_eq!(patterns.parse_count("12 Followers"), 0);
    }

    #[test]
    fn test_longest_digit_run() {
        let patterns = TextPatterns::new();
        assert_eq!(patterns.longest_digit_run("user1234567"), 7);
        assert_eq!(patterns.longest_digit_run("a12b345c9"), 3);
        assert_eq!(patterns.longest_digit_run("plain"), 0);
    }

    #[test]
    fn test_pick_bio_skips_labels_and_mentions() {
        let patterns = TextPatterns::new();
        let fragments = texts(&["@bot_42", "12 Following", "3,400 Followers", "ok", "Crypto signals daily"]);
        assert_eq!(
            patterns.pick_bio(&fragments).as_deref(),
            Some("Crypto signals daily")
        );
        assert_eq!(patterns.pick_bio(&texts(&["@a", "hi"])), None);
    }

    #[test]
    fn test_pick_bio_skips_suffixed_count_labels() {
        let patterns = TextPatterns::new();
        let fragments = texts(&[
            "12.5K Following",
            "1.2M followers",
            "3 K Followers",
            "Crypto signals daily",
        ]);
        assert_eq!(
            patterns.pick_bio(&fragments).as_deref(),
            Some("Crypto signals daily")
        );
        assert_eq!(
            patterns.pick_bio(&texts(&["Following the money"])).as_deref(),
            Some("Following the money")
        );
    }

    #[test]
    fn test_pick_country_skips_dates_and_links() {
        let patterns = TextPatterns::new();
        let fragments = texts(&[
            "Account based in",
            "",
            "2019",
            "https://example.com",
            "Since March 2020",
            "  Japan ",
            "Verified",
        ]);
        assert_eq!(patterns.pick_country(&fragments).as_deref(), Some("Japan"));
        assert_eq!(patterns.pick_country(&texts(&["Date joined May 2011"])), None);
    }

    #[test]
    fn test_post_count_prefers_strict_pattern() {
        let patterns = TextPatterns::new();
        assert_eq!(
            patterns.parse_post_count(&texts(&["Bob", "1,024 posts", "3K Posts"])),
            Some(1024)
        );
        assert_eq!(patterns.parse_post_count(&texts(&["Bob", "3.1K posts"])), Some(3100));
        assert_eq!(patterns.parse_post_count(&texts(&["1 post"])), Some(1));
        assert_eq!(patterns.parse_post_count(&texts(&["Joined 2020"])), None);
    }

    #[test]
    fn test_latest_timestamp_and_age() {
        let raw = texts(&[
            "2024-01-01T00:00:00.000Z",
            "not a date",
            "2024-03-01T12:00:00Z",
        ]);
        let latest = latest_timestamp(&raw).unwrap();
        assert_eq!(latest.to_rfc3339(), "2024-03-01T12:00:00+00:00");

        let now = Utc.with_ymd_and_hms(2024, 3, 11, 12, 0, 1).unwrap();
        assert_eq!(age_in_days(latest, now), 11);
        assert_eq!(age_in_days(latest, latest), 0);
        assert!(latest_timestamp(&[]).is_none());
    }

    #[test]
    fn test_sentinel_is_very_old() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(age_in_days(inactivity_sentinel(), now) > 3000);
    }
}
