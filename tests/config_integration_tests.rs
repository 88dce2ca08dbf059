//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Configuration loading and saving
//! - Default configuration generation
//! - Environment overrides
//! - Normalisation of the criteria form into run criteria

use audience_cleaner::ConfigManager;
use audience_cleaner::config::{SETTINGS_FILE, normalize_criteria};
use audience_cleaner::models::UserConfig;
use camino::Utf8PathBuf;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join(SETTINGS_FILE));
}

#[test]
fn test_load_default_user_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    // Settings file doesn't exist, should return defaults
    let config = manager.load_with_env(env(&[])).unwrap();
    assert_eq!(config, UserConfig::default());
    assert!(config.criteria.dry_run);
}

#[test]
fn test_save_and_load_user_config() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut config = UserConfig::default();
    config.timing.scroll_delay_ms = 600;
    config.criteria.enable_max_followers = true;
    config.criteria.max_followers = 25;
    config.criteria.usernames_to_remove = "spam_one, spam_two\nspam_three".to_string();
    config.criteria.blacklisted_countries = vec!["Japan".to_string(), "Brazil".to_string()];
    config.logging.json = true;

    manager.save_user_config(&config).unwrap();
    assert!(manager.settings_path().exists());

    let loaded = manager.load_with_env(env(&[])).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_create_default_user_config_once() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert!(manager.create_default_user_config().unwrap());
    assert!(!manager.create_default_user_config().unwrap());

    let content = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(content.contains("scroll_delay_ms"));
    assert!(content.contains("dry_run: true"));
}

#[test]
fn test_partial_file_keeps_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "criteria:\n  enable_min_following: true\n  min_following: 3000\n",
    )
    .unwrap();

    let config = manager.load_with_env(env(&[])).unwrap();
    assert!(config.criteria.enable_min_following);
    assert_eq!(config.criteria.min_following, 3000);
    assert_eq!(config.timing.hover_delay_ms, 350);
    assert_eq!(config.logging.file_prefix, "audience-cleaner");
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "timing:\n  scroll_delay_ms: 900\ncriteria:\n  dry_run: true\n",
    )
    .unwrap();

    let config = manager
        .load_with_env(env(&[
            ("CLEANER_TIMING__SCROLL_DELAY_MS", "400"),
            ("CLEANER_CRITERIA__DRY_RUN", "false"),
            ("CLEANER_CRITERIA__BLACKLISTED_COUNTRIES", "Japan,Brazil"),
        ]))
        .unwrap();

    assert_eq!(config.timing.scroll_delay_ms, 400);
    assert!(!config.criteria.dry_run);
    assert_eq!(
        config.criteria.blacklisted_countries,
        vec!["Japan".to_string(), "Brazil".to_string()]
    );
}

#[test]
fn test_invalid_yaml_handling() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(manager.settings_path(), "invalid: yaml: content: {{").unwrap();

    let result = manager.load_with_env(env(&[]));
    assert!(result.is_err(), "Should fail to parse invalid YAML");
}

#[test]
fn test_normalized_criteria_from_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        r#"
criteria:
  enable_max_followers: true
  max_followers: 50
  enable_max_posts: false
  max_posts: 3
  usernames_to_remove: "  bot_one,bot_two   bot_three "
  remove_blacklisted_countries: false
  blacklisted_countries: [Japan]
  dry_run: false
"#,
    )
    .unwrap();

    let config = manager.load_with_env(env(&[])).unwrap();
    let criteria = normalize_criteria(&config.criteria);

    assert_eq!(criteria.max_followers, Some(50));
    assert_eq!(criteria.max_posts, None);
    assert_eq!(
        criteria.forced_removal.iter().collect::<Vec<_>>(),
        vec!["bot_one", "bot_two", "bot_three"]
    );
    assert!(criteria.country_blacklist.is_empty());
    assert!(!criteria.is_dry_run);
    assert!(criteria.has_enabled_criterion());
}

#[test]
fn test_concurrent_config_access() {
    use std::sync::Arc;

    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = Arc::new(ConfigManager::new(&config_path).unwrap());
    manager.create_default_user_config().unwrap();

    // Spawn multiple threads reading config concurrently
    let mut handles = vec![];

    for _ in 0..10 {
        let manager_clone = manager.clone();
        let handle = std::thread::spawn(move || {
            let _config = manager_clone.load_with_env(env(&[])).unwrap();
        });
        handles.push(handle);
    }

    // All threads should complete successfully
    for handle in handles {
        handle.join().unwrap();
    }
}
