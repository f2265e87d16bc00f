use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Global tool configuration persisted as `config.json`
///
/// Field names keep the on-disk spelling of existing config records. The
/// SteamCMD login password is never a field here: it lives in the secret
/// store keyed by `login_name` (see `services::secrets`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Base directory of the Steamworks ContentBuilder tree
    #[serde(rename = "builderPath", default)]
    pub builder_path: String,

    /// Steam account used for `+login`
    #[serde(rename = "loginName", default)]
    pub login_name: String,

    /// Persist the password across restarts (secret store), or session-only
    #[serde(rename = "rememberPassword", default)]
    pub remember_password: bool,
}

impl ToolConfig {
    /// Builder base as a typed path
    pub fn builder_base(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(&self.builder_path)
    }

    /// Directory the rendered VDF scripts are written to
    pub fn scripts_dir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{}/scripts", self.builder_path))
    }

    /// Path of the app descriptor for a given App ID
    pub fn app_script_path(&self, app_id: &str) -> Utf8PathBuf {
        self.scripts_dir().join(format!("app_{}.vdf", app_id))
    }

    pub fn has_builder_path(&self) -> bool {
        !self.builder_path.is_empty()
    }

    pub fn has_login(&self) -> bool {
        !self.login_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_config_defaults() {
        let config = ToolConfig::default();
        assert!(config.builder_path.is_empty());
        assert!(config.login_name.is_empty());
        assert!(!config.remember_password);
        assert!(!config.has_builder_path());
        assert!(!config.has_login());
    }

    #[test]
    fn test_legacy_record_keys() {
        let json = r#"{
            "builderPath": "/opt/sdk/tools/ContentBuilder",
            "loginName": "builder_bot",
            "rememberPassword": true
        }"#;
        let config: ToolConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.builder_path, "/opt/sdk/tools/ContentBuilder");
        assert_eq!(config.login_name, "builder_bot");
        assert!(config.remember_password);
    }

    #[test]
    fn test_partial_record_uses_defaults() {
        let config: ToolConfig = serde_json::from_str(r#"{"loginName": "x"}"#).unwrap();
        assert_eq!(config.login_name, "x");
        assert!(config.builder_path.is_empty());
        assert!(!config.remember_password);
    }

    #[test]
    fn test_script_paths() {
        let config = ToolConfig {
            builder_path: "/sdk/ContentBuilder".to_string(),
            ..Default::default()
        };
        assert_eq!(config.scripts_dir(), "/sdk/ContentBuilder/scripts");
        assert_eq!(
            config.app_script_path("480"),
            "/sdk/ContentBuilder/scripts/app_480.vdf"
        );
    }
}
