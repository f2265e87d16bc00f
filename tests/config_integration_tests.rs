//! Integration tests for ConfigManager and configuration file handling
//!
//! These tests verify:
//! - Configuration loading and saving
//! - Default configuration generation
//! - Profile record round trips and name sanitization
//! - Integration with StateManager
//! - Concurrent access

use camino::Utf8PathBuf;
use std::fs;
use steampipe::config::sanitize_profile_name;
use steampipe::{AppProfile, ConfigManager, DepotConfig, ToolConfig};
use tempfile::TempDir;

fn create_test_data_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let data_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, data_path)
}

fn sample_profile(name: &str, app_id: &str) -> AppProfile {
    let mut profile = AppProfile::new(name);
    profile.app_id = app_id.to_string();
    profile.description = "Nightly build".to_string();
    let mut depot = DepotConfig::default();
    depot.name = "Content".to_string();
    depot.depot_id = format!("{}1", app_id);
    depot.content_root = "/tmp/content".to_string();
    profile.depots.push(depot);
    profile
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    assert_eq!(manager.data_dir(), &data_path);
    assert_eq!(manager.profiles_dir(), data_path.join("profiles"));
}

#[test]
fn test_data_directory_creation() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf())
        .unwrap()
        .join("nonexistent_dir");

    // Directory doesn't exist yet
    assert!(!data_path.exists());

    // Creating ConfigManager should create it along with profiles/
    let _manager = ConfigManager::new(&data_path).unwrap();

    assert!(data_path.exists());
    assert!(data_path.join("profiles").exists());
}

#[test]
fn test_load_default_config() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    // Config file doesn't exist, should return defaults
    let config = manager.load_config().unwrap();

    assert!(config.builder_path.is_empty());
    assert!(config.login_name.is_empty());
    assert!(!config.remember_password);
    assert!(!config.has_builder_path());
    assert!(!config.has_login());
}

#[test]
fn test_save_and_load_config() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    let config = ToolConfig {
        builder_path: "/opt/sdk/tools/ContentBuilder".to_string(),
        login_name: "steamuser".to_string(),
        remember_password: true,
    };
    manager.save_config(&config).unwrap();

    let loaded = manager.load_config().unwrap();
    assert_eq!(loaded.builder_path, "/opt/sdk/tools/ContentBuilder");
    assert_eq!(loaded.login_name, "steamuser");
    assert!(loaded.remember_password);
}

#[test]
fn test_config_record_uses_original_field_names() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    manager.save_config(&ToolConfig::default()).unwrap();

    let raw = fs::read_to_string(data_path.join("config.json")).unwrap();
    assert!(raw.contains("\"builderPath\""));
    assert!(raw.contains("\"loginName\""));
    assert!(raw.contains("\"rememberPassword\""));
    // The password itself never lands in the config record
    assert!(!raw.to_lowercase().contains("\"password\""));
}

#[test]
fn test_profile_round_trip() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    let profile = sample_profile("My Game", "480");
    let path = manager.save_profile(&profile).unwrap();
    assert!(path.exists());

    let loaded = manager.load_profile("My Game").unwrap().unwrap();
    assert_eq!(loaded.name, "My Game");
    assert_eq!(loaded.app_id, "480");
    assert_eq!(loaded.depots.len(), 1);
    assert_eq!(loaded.depots[0].depot_id, "4801");
    assert_eq!(loaded.id, profile.id);
}

#[test]
fn test_profile_record_uses_original_field_names() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    let path = manager.save_profile(&sample_profile("My Game", "480")).unwrap();
    let raw = fs::read_to_string(path).unwrap();

    assert!(raw.contains("\"appName\""));
    assert!(raw.contains("\"appID\""));
    assert!(raw.contains("\"depotProfiles\""));
    assert!(raw.contains("\"DepotID\""));
    assert!(raw.contains("\"ContentRoot\""));
}

#[test]
fn test_load_missing_profile_returns_none() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    assert!(manager.load_profile("nope").unwrap().is_none());
}

#[test]
fn test_list_profiles_sorted_by_file_name() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    manager.save_profile(&sample_profile("Zeta", "3")).unwrap();
    manager.save_profile(&sample_profile("Alpha", "1")).unwrap();
    manager.save_profile(&sample_profile("Mid", "2")).unwrap();

    let names: Vec<String> = manager
        .list_profiles()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
}

#[test]
fn test_list_profiles_skips_unparseable_records() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    manager.save_profile(&sample_profile("Good", "480")).unwrap();
    fs::write(manager.profiles_dir().join("broken.json"), "{not json").unwrap();
    fs::write(manager.profiles_dir().join("notes.txt"), "ignored").unwrap();

    let profiles = manager.list_profiles().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].name, "Good");
}

#[test]
fn test_delete_profile() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    manager.save_profile(&sample_profile("Gone Soon", "480")).unwrap();
    assert!(manager.delete_profile("Gone Soon").unwrap());
    assert!(manager.load_profile("Gone Soon").unwrap().is_none());

    // Second delete finds nothing
    assert!(!manager.delete_profile("Gone Soon").unwrap());
}

#[test]
fn test_profile_name_sanitization() {
    assert_eq!(sanitize_profile_name("My Game"), "My Game");
    assert_eq!(sanitize_profile_name("a/b\\c"), "a_b_c");
    assert_eq!(sanitize_profile_name(".hidden"), "_hidden");
    assert_eq!(sanitize_profile_name(""), "_");
}

#[test]
fn test_save_and_delete_agree_on_sanitized_names() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    let profile = sample_profile("demo/build", "480");
    let path = manager.save_profile(&profile).unwrap();
    assert_eq!(path.file_name(), Some("demo_build.json"));

    // Loaded and deleted by display name, not file name
    assert!(manager.load_profile("demo/build").unwrap().is_some());
    assert!(manager.delete_profile("demo/build").unwrap());
    assert!(!path.exists());
}

#[test]
fn test_save_all_persists_config_and_profiles() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    let config = ToolConfig {
        builder_path: "/opt/builder".to_string(),
        login_name: "steamuser".to_string(),
        remember_password: false,
    };
    let profiles = vec![sample_profile("One", "1"), sample_profile("Two", "2")];

    manager.save_all(&config, profiles.iter()).unwrap();

    assert_eq!(manager.load_config().unwrap().builder_path, "/opt/builder");
    assert_eq!(manager.list_profiles().unwrap().len(), 2);
}

#[test]
fn test_invalid_config_json_is_an_error() {
    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    fs::write(data_path.join("config.json"), "{{not json").unwrap();

    let result = manager.load_config();
    assert!(result.is_err(), "Should fail to parse invalid JSON");
}

#[test]
fn test_config_integration_with_state() {
    use std::sync::Arc;
    use steampipe::StateManager;

    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = ConfigManager::new(&data_path).unwrap();

    let config = ToolConfig {
        builder_path: "/opt/sdk/tools/ContentBuilder".to_string(),
        login_name: "steamuser".to_string(),
        remember_password: true,
    };
    manager.save_config(&config).unwrap();
    manager.save_profile(&sample_profile("My Game", "480")).unwrap();

    // Load everything into StateManager the way the front end does
    let state = Arc::new(StateManager::new());
    state.load_config(manager.load_config().unwrap());
    state.set_profiles(manager.list_profiles().unwrap());

    let snapshot = state.snapshot();
    assert!(snapshot.is_build_ready());
    assert!(snapshot.config.remember_password);
    assert_eq!(snapshot.profiles.len(), 1);
    assert!(snapshot.profile("My Game").is_some());
}

#[test]
fn test_concurrent_config_access() {
    use std::sync::Arc;

    let (_temp_dir, data_path) = create_test_data_dir();
    let manager = Arc::new(ConfigManager::new(&data_path).unwrap());
    manager.save_config(&ToolConfig::default()).unwrap();

    // Spawn multiple threads reading config concurrently
    let mut handles = vec![];

    for _ in 0..10 {
        let manager_clone = manager.clone();
        let handle = std::thread::spawn(move || {
            let _config = manager_clone.load_config().unwrap();
        });
        handles.push(handle);
    }

    // All threads should complete successfully
    for handle in handles {
        handle.join().unwrap();
    }
}
