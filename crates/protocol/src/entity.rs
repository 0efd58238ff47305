use foundation::Id;
use serde::{Deserialize, Serialize};

use crate::filters::Filters;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub plain_text: String,
    pub lat: f64,
    pub long: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicEntity {
    pub id: Id,
    pub family_id: Id,
    pub category_id: Id,
    pub display_name: String,
    #[serde(default)]
    pub tags: Vec<Id>,
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicComment {
    pub id: Id,
    pub entity_id: Id,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Parent/child link summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedEntity {
    pub id: Id,
    pub display_name: String,
    pub family_id: Id,
    pub category_id: Id,
}

/// `POST /api/map/entities/{id}` body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchEntityRequest {
    #[serde(flatten)]
    pub filters: Filters,
}

/// `POST /api/map/entities/{id}` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedEntity {
    pub entity: PublicEntity,
    #[serde(default)]
    pub comments: Vec<PublicComment>,
    #[serde(default)]
    pub parents: Vec<ListedEntity>,
    #[serde(default)]
    pub children: Vec<ListedEntity>,
}

/// A public submission, pending moderation once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntity {
    pub display_name: String,
    pub category_id: Id,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `POST /api/map/entities` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntityRequest {
    pub entity: NewEntity,
}

/// `POST /api/map/entities` response. `moderated_at` stays empty until an
/// admin approves the submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedEntity {
    pub id: Id,
    pub display_name: String,
    pub category_id: Id,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub moderated_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub entity_id: Id,
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `POST /api/map/comments` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCommentRequest {
    pub comment: NewComment,
}
