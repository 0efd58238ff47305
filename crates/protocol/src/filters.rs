use std::collections::BTreeMap;

use foundation::Id;
use serde::{Deserialize, Serialize};

/// Filter projections sent alongside view, search and entity requests.
///
/// The server performs the actual attribute filtering; the client only ships
/// id lists. `enums_constraints` never carries an empty value list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default)]
    pub active_categories_ids: Vec<Id>,
    #[serde(default)]
    pub required_tags_ids: Vec<Id>,
    #[serde(default)]
    pub exclude_tags_ids: Vec<Id>,
    #[serde(default)]
    pub enums_constraints: BTreeMap<String, Vec<String>>,
}
