use serde::{Deserialize, Serialize};

use crate::bootstrap::{CartographyInitConfig, GeneralOptions};

/// Admin-side safe mode settings; the secret never reaches the viewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeModeConfig {
    pub enabled: bool,
    pub hcaptcha_secret: String,
    pub hcaptcha_sitekey: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartographyClusterConfig {
    pub characteristic_distance: f64,
    pub declustering_speed: f64,
    pub minimal_cluster_size: i32,
}

/// `GET /api/admin/options`: every option group, with server defaults
/// filled in for groups never saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeHavenOptions {
    pub general: GeneralOptions,
    #[serde(default)]
    pub safe_mode: SafeModeConfig,
    #[serde(default)]
    pub cartography_init: CartographyInitConfig,
    #[serde(default)]
    pub cartography_cluster: CartographyClusterConfig,
}

impl Default for SafeHavenOptions {
    fn default() -> Self {
        Self {
            general: GeneralOptions {
                title: "SafeHaven".to_string(),
                subtitle: Some("Carte associative".to_string()),
                logo_url: None,
                information: None,
                redirect_url: None,
            },
            safe_mode: SafeModeConfig::default(),
            cartography_init: CartographyInitConfig::default(),
            cartography_cluster: CartographyClusterConfig::default(),
        }
    }
}

/// One option group, as sent to `PUT /api/admin/options/{name}`. Only the
/// inner value goes on the wire; the group travels in the path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigurationOption {
    General(GeneralOptions),
    SafeMode(SafeModeConfig),
    CartographyInit(CartographyInitConfig),
    CartographyCluster(CartographyClusterConfig),
}

impl ConfigurationOption {
    pub const NAMES: [&'static str; 4] = [
        "general",
        "safe_mode",
        "cartography_init",
        "cartography_cluster",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::General(_) => "general",
            Self::SafeMode(_) => "safe_mode",
            Self::CartographyInit(_) => "cartography_init",
            Self::CartographyCluster(_) => "cartography_cluster",
        }
    }
}

/// `GET /api/version`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeHavenVersion {
    pub version: String,
    #[serde(default)]
    pub git_hash: Option<String>,
}
