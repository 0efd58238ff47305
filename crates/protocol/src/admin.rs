use std::collections::BTreeMap;

use catalog::Form;
use foundation::Id;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUserTokenClaims {
    pub username: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrUpdateFamily {
    pub title: String,
    #[serde(default)]
    pub icon_hash: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    pub entity_form: Form,
    pub comment_form: Form,
    #[serde(default)]
    pub version: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrUpdateCategory {
    pub title: String,
    pub family_id: Id,
    pub default_status: bool,
    #[serde(default)]
    pub icon_hash: Option<String>,
    pub fill_color: String,
    pub border_color: String,
    #[serde(default)]
    pub version: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrUpdateTag {
    pub title: String,
    pub is_filter: bool,
    pub default_filter_status: bool,
    #[serde(default)]
    pub filter_description: Option<String>,
    pub fill_color: String,
    pub border_color: String,
    #[serde(default)]
    pub version: Option<i32>,
}

/// `GET /api/admin/stats/counts`: per-family and per-category count vectors
/// (entities, comments, pending entities, pending comments).
pub type EntitiesCommentsCounts = (BTreeMap<Id, Vec<u64>>, BTreeMap<Id, Vec<u64>>);
