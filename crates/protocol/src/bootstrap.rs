use catalog::{Category, Family, Tag};
use foundation::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralOptions {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub information: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeMode {
    pub enabled: bool,
    #[serde(default)]
    pub hcaptcha_sitekey: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CartographyInitConfig {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: u8,
}

/// `GET /api/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub general: GeneralOptions,
    pub safe_mode: SafeMode,
    pub cartography_init: CartographyInitConfig,
}

/// Capabilities granted to the access token used at bootstrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicPermissions {
    pub can_list_entities: bool,
    pub can_access_entity: bool,
    pub can_add_entity: bool,
    pub can_access_comments: bool,
    pub can_add_comment: bool,
    pub can_list_without_query: bool,
    pub can_list_with_filters: bool,
    pub can_list_with_enum_constraints: bool,
}

/// `GET /api/bootstrap/{token}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResponse {
    pub signed_token: String,
    pub families: Vec<Family>,
    pub categories: Vec<Category>,
    pub tags: Vec<Tag>,
    pub allowed_categories: Vec<Id>,
    pub allowed_tags: Vec<Id>,
    pub permissions: PublicPermissions,
    pub cartography_init_config: CartographyInitConfig,
}
