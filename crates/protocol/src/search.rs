use foundation::Id;
use serde::{Deserialize, Serialize};

use crate::filters::Filters;

/// Query-string pagination for search endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

/// `POST /api/map/search` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub search_query: String,
    pub family_id: Id,
    #[serde(flatten)]
    pub filters: Filters,
    #[serde(default)]
    pub require_locations: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLocation {
    pub plain_text: String,
    pub web_mercator_x: f64,
    pub web_mercator_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchedEntity {
    pub id: Id,
    pub entity_id: Id,
    pub family_id: Id,
    pub category_id: Id,
    #[serde(default)]
    pub tags_ids: Vec<Id>,
    pub display_name: String,
    #[serde(default)]
    pub locations: Vec<CachedLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub entities: Vec<T>,
    pub total_results: u64,
    pub total_pages: u32,
    pub response_current_page: u32,
}

impl<T> Paginated<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            entities: self.entities.into_iter().map(f).collect(),
            total_results: self.total_results,
            total_pages: self.total_pages,
            response_current_page: self.response_current_page,
        }
    }

    /// Like [`Paginated::map`] but stops at the first error.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Paginated<U>, E> {
        Ok(Paginated {
            entities: self.entities.into_iter().map(f).collect::<Result<_, _>>()?,
            total_results: self.total_results,
            total_pages: self.total_pages,
            response_current_page: self.response_current_page,
        })
    }
}
