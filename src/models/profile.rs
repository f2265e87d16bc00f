use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One content depot under an app build
///
/// Owned exclusively by its parent [`AppProfile`]; depots are never shared
/// across profiles. Field names keep the on-disk spelling of existing
/// profile records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepotConfig {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    #[serde(rename = "DepotName", default)]
    pub name: String,

    /// Steam Depot ID, kept as a string and rendered verbatim
    #[serde(rename = "DepotID", default)]
    pub depot_id: String,

    /// Directory whose contents get uploaded for this depot
    #[serde(rename = "ContentRoot", default)]
    pub content_root: String,
}

impl DepotConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            depot_id: String::new(),
            content_root: String::new(),
        }
    }

    /// Both the Depot ID and the content root must be non-empty
    pub fn is_buildable(&self) -> bool {
        !self.depot_id.is_empty() && !self.content_root.is_empty()
    }
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// A named Steam app build profile: App ID plus its depots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProfile {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    #[serde(rename = "appName", default)]
    pub name: String,

    /// Steam App ID, kept as a string and rendered verbatim
    #[serde(rename = "appID", default)]
    pub app_id: String,

    /// Free-text build description (`Desc` in the app VDF)
    #[serde(default)]
    pub description: String,

    /// Ordered depot list; render order follows this order
    #[serde(rename = "depotProfiles", default)]
    pub depots: Vec<DepotConfig>,
}

impl AppProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            app_id: String::new(),
            description: String::new(),
            depots: Vec::new(),
        }
    }

    /// A profile needs a non-empty App ID before it can be built
    pub fn is_buildable(&self) -> bool {
        !self.app_id.is_empty()
    }

    /// Depots that fail their field checks, in list order
    pub fn invalid_depots(&self) -> impl Iterator<Item = &DepotConfig> {
        self.depots.iter().filter(|d| !d.is_buildable())
    }
}

impl Default for AppProfile {
    fn default() -> Self {
        Self::new("")
    }
}
