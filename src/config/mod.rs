use crate::models::{AppProfile, ToolConfig};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Replace path-hostile characters in a profile name so it can be used as a
/// file name. Separators become `_`, a leading dot is masked, and an empty
/// name falls back to `_`.
///
/// Save and delete must both go through this so a profile saved under a
/// sanitized name can also be deleted by its display name.
pub fn sanitize_profile_name(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if let Some(rest) = safe.strip_prefix('.') {
        safe = format!("_{}", rest);
    }
    if safe.is_empty() {
        safe.push('_');
    }
    safe
}

/// Configuration manager for loading and saving JSON records.
///
/// Manages the files under the tool's data directory:
/// - Tool config (`config.json`): builder path, login name, remember flag
/// - Profiles (`profiles/<name>.json`): one record per app profile
#[derive(Debug, Clone)]
pub struct ConfigManager {
    data_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
    profiles_dir: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager rooted at the specified data directory.
    ///
    /// The directory and its `profiles/` subdirectory are created if absent.
    ///
    /// # Arguments
    /// * `data_dir` - Directory containing the managed files
    ///
    /// # Returns
    /// A new ConfigManager instance
    pub fn new<P: AsRef<Utf8Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let profiles_dir = data_dir.join("profiles");

        for dir in [&data_dir, &profiles_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create data directory: {}", dir))?;
            }
        }

        Ok(Self {
            config_path: data_dir.join("config.json"),
            profiles_dir,
            data_dir,
        })
    }

    /// Create a ConfigManager rooted at the platform data directory.
    pub fn with_default_dir() -> Result<Self> {
        Self::new(default_data_dir())
    }

    /// Load the tool configuration.
    ///
    /// # Returns
    /// The loaded ToolConfig, or defaults if the file doesn't exist
    pub fn load_config(&self) -> Result<ToolConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
            return Ok(ToolConfig::default());
        }

        let file_contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: ToolConfig = serde_json::from_str(&file_contents)
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the tool configuration.
    ///
    /// # Arguments
    /// * `config` - The ToolConfig to save
    pub fn save_config(&self, config: &ToolConfig) -> Result<()> {
        let json_string =
            serde_json::to_string_pretty(config).context("Failed to serialize config to JSON")?;

        fs::write(&self.config_path, json_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Load every profile record from the profiles directory.
    ///
    /// Records that fail to parse are skipped with a warning; a directory
    /// with no usable records yields an empty list. Results are ordered by
    /// file name so startup order is stable.
    pub fn list_profiles(&self) -> Result<Vec<AppProfile>> {
        let mut paths: Vec<Utf8PathBuf> = Vec::new();
        let entries = fs::read_dir(&self.profiles_dir)
            .with_context(|| format!("Failed to read profiles dir: {}", self.profiles_dir))?;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to read profiles dir: {}", self.profiles_dir))?;
            let path = Utf8PathBuf::try_from(entry.path())
                .context("Profile path is not valid UTF-8")?;
            if path.extension() == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut profiles = Vec::new();
        for path in paths {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read profile: {}", path))?;
            match serde_json::from_str::<AppProfile>(&contents) {
                Ok(profile) => profiles.push(profile),
                Err(e) => {
                    tracing::warn!("Skipping unreadable profile {}: {}", path, e);
                }
            }
        }

        tracing::info!(
            "Loaded {} profiles from {}",
            profiles.len(),
            self.profiles_dir
        );
        Ok(profiles)
    }

    /// Load one profile by display name.
    ///
    /// # Returns
    /// `Ok(None)` when no record exists under that name
    pub fn load_profile(&self, name: &str) -> Result<Option<AppProfile>> {
        let path = self.profile_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read profile: {}", path))?;
        let profile: AppProfile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse profile: {}", path))?;
        Ok(Some(profile))
    }

    /// Save one profile under its (sanitized) display name.
    ///
    /// # Returns
    /// The path the record was written to
    pub fn save_profile(&self, profile: &AppProfile) -> Result<Utf8PathBuf> {
        let path = self.profile_path(&profile.name);
        let json_string = serde_json::to_string_pretty(profile)
            .with_context(|| format!("Failed to serialize profile: {}", profile.name))?;

        fs::write(&path, json_string)
            .with_context(|| format!("Failed to write profile: {}", path))?;

        tracing::info!("Saved profile {:?} to {}", profile.name, path);
        Ok(path)
    }

    /// Delete one profile record by display name.
    ///
    /// # Returns
    /// `true` if a record was removed, `false` if none existed
    pub fn delete_profile(&self, name: &str) -> Result<bool> {
        let path = self.profile_path(name);
        if !path.exists() {
            return Ok(false);
        }

        fs::remove_file(&path).with_context(|| format!("Failed to delete profile: {}", path))?;
        tracing::info!("Deleted profile {:?} at {}", name, path);
        Ok(true)
    }

    /// Persist the config and every given profile in one pass.
    ///
    /// Invoked by the front end on exit paths that mutated state.
    pub fn save_all<'a>(
        &self,
        config: &ToolConfig,
        profiles: impl IntoIterator<Item = &'a AppProfile>,
    ) -> Result<()> {
        self.save_config(config)?;
        for profile in profiles {
            self.save_profile(profile)?;
        }
        Ok(())
    }

    fn profile_path(&self, name: &str) -> Utf8PathBuf {
        self.profiles_dir
            .join(format!("{}.json", sanitize_profile_name(name)))
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }

    /// Get the profiles directory path.
    pub fn profiles_dir(&self) -> &Utf8Path {
        &self.profiles_dir
    }
}

/// Platform data directory for this tool, with a relative fallback when the
/// platform location is unavailable or not valid UTF-8.
pub fn default_data_dir() -> Utf8PathBuf {
    dirs::data_dir()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .map(|p| p.join(crate::APP_NAME))
        .unwrap_or_else(|| Utf8PathBuf::from("steampipe-data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let data_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&data_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.profiles_dir().exists());
    }

    #[test]
    fn test_missing_config_yields_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        let config = manager.load_config().unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_load_save_config() {
        let (manager, _temp_dir) = create_test_config_manager();

        let config = ToolConfig {
            builder_path: "/sdk/ContentBuilder".to_string(),
            login_name: "builder_bot".to_string(),
            remember_password: true,
        };
        manager.save_config(&config).unwrap();

        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_profile_roundtrip() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut profile = AppProfile::new("My Game");
        profile.app_id = "480".to_string();
        let path = manager.save_profile(&profile).unwrap();
        assert!(path.as_str().ends_with("My Game.json"));

        let loaded = manager.load_profile("My Game").unwrap().unwrap();
        assert_eq!(loaded, profile);
    }

    #[test]
    fn test_load_missing_profile() {
        let (manager, _temp_dir) = create_test_config_manager();
        assert!(manager.load_profile("absent").unwrap().is_none());
    }

    #[test]
    fn test_delete_profile_uses_same_sanitization_as_save() {
        let (manager, _temp_dir) = create_test_config_manager();

        let profile = AppProfile::new("dlc/episode one");
        let path = manager.save_profile(&profile).unwrap();
        assert!(path.as_str().ends_with("dlc_episode one.json"));

        assert!(manager.delete_profile("dlc/episode one").unwrap());
        assert!(!path.exists());
        assert!(!manager.delete_profile("dlc/episode one").unwrap());
    }

    #[test]
    fn test_list_profiles_sorted_and_skips_garbage() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut beta = AppProfile::new("beta");
        beta.app_id = "2".to_string();
        let mut alpha = AppProfile::new("alpha");
        alpha.app_id = "1".to_string();
        manager.save_profile(&beta).unwrap();
        manager.save_profile(&alpha).unwrap();

        // Unparseable record and a non-JSON file are both ignored
        fs::write(manager.profiles_dir().join("broken.json"), "{not json").unwrap();
        fs::write(manager.profiles_dir().join("notes.txt"), "hello").unwrap();

        let profiles = manager.list_profiles().unwrap();
        let names: Vec<_> = profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_save_all() {
        let (manager, _temp_dir) = create_test_config_manager();

        let config = ToolConfig {
            login_name: "builder_bot".to_string(),
            ..Default::default()
        };
        let profiles = vec![AppProfile::new("one"), AppProfile::new("two")];

        manager.save_all(&config, &profiles).unwrap();

        assert_eq!(manager.load_config().unwrap().login_name, "builder_bot");
        assert_eq!(manager.list_profiles().unwrap().len(), 2);
    }

    #[test]
    fn test_sanitize_profile_name() {
        assert_eq!(sanitize_profile_name("My Game"), "My Game");
        assert_eq!(sanitize_profile_name("dlc/ep1"), "dlc_ep1");
        assert_eq!(sanitize_profile_name("win\\x64"), "win_x64");
        assert_eq!(sanitize_profile_name(".hidden"), "_hidden");
        assert_eq!(sanitize_profile_name(""), "_");
    }
}
