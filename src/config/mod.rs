use crate::models::{CriteriaConfig, CriteriaSettings, UserConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::fs;

/// File name of the settings file inside the config directory
pub const SETTINGS_FILE: &str = "Cleaner Settings.yaml";

/// Prefix of environment overrides, e.g. `CLEANER_TIMING__SCROLL_DELAY_MS=400`
pub const ENV_PREFIX: &str = "CLEANER";

/// Configuration manager for loading and saving the settings file.
///
/// Settings are layered: built-in defaults, then `Cleaner Settings.yaml`, then
/// `CLEANER_`-prefixed environment variables (`__` separates nested keys).
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` when missing.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Load settings from the file and the process environment.
    pub fn load_user_config(&self) -> Result<UserConfig> {
        self.load_with_env(None)
    }

    /// Load settings with an explicit environment map instead of the process environment.
    pub fn load_with_env(&self, env: Option<HashMap<String, String>>) -> Result<UserConfig> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings = Config::builder()
            .add_source(
                File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("criteria.blacklisted_countries")
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let config: UserConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(config)
    }

    /// Save the settings file.
    pub fn save_user_config(&self, config: &UserConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write a default settings file unless one exists. Returns whether it was written.
    pub fn create_default_user_config(&self) -> Result<bool> {
        if self.settings_path.exists() {
            tracing::info!("Settings file already exists at {}", self.settings_path);
            return Ok(false);
        }

        self.save_user_config(&UserConfig::default())?;
        Ok(true)
    }

    /// Load settings and normalise the criteria section.
    pub fn load_criteria(&self) -> Result<CriteriaConfig> {
        Ok(normalize_criteria(&self.load_user_config()?.criteria))
    }
}

/// Split a free-text identifier list on whitespace and commas.
///
/// A leading `@` is dropped so pasted handles match list identifiers.
pub fn parse_identifier_list(raw: &str) -> IndexSet<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .map(|s| s.trim().trim_start_matches('@'))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turn the saved form state into the criteria a run consumes.
///
/// Disabled rules become `None`; empty text fields count as disabled.
pub fn normalize_criteria(settings: &CriteriaSettings) -> CriteriaConfig {
    fn text(enabled: bool, value: &str) -> Option<String> {
        let value = value.trim();
        (enabled && !value.is_empty()).then(|| value.to_string())
    }

    let country_blacklist = if settings.remove_blacklisted_countries {
        settings
            .blacklisted_countries
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        IndexSet::new()
    };

    CriteriaConfig {
        max_followers: settings
            .enable_max_followers
            .then_some(settings.max_followers),
        min_following: settings
            .enable_min_following
            .then_some(settings.min_following),
        max_posts: settings.enable_max_posts.then_some(settings.max_posts),
        min_inactivity_days: settings
            .enable_inactivity_days
            .then_some(settings.min_inactivity_days),
        bio_substring: text(settings.enable_bio_matches, &settings.bio_matches_text),
        username_digit_run: settings
            .enable_username_digits
            .then_some(settings.username_digits),
        forced_removal: parse_identifier_list(&settings.usernames_to_remove),
        country_blacklist,
        is_dry_run: settings.dry_run,
        skip_until_identifier: text(
            settings.enable_skip_until_username,
            settings.skip_until_username.trim_start_matches('@'),
        ),
    }
}
