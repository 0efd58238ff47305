use std::collections::BTreeMap;
use std::sync::Arc;

use catalog::{CatalogIndex, Category, Family, Tag};
use foundation::Id;
use protocol::{FetchedEntity, SearchedEntity};
use tracing::debug;

use crate::ViewerError;

/// Entity detail with its catalog references resolved for display.
#[derive(Debug, Clone)]
pub struct ResolvedEntity {
    pub fetched: FetchedEntity,
    pub family: Arc<Family>,
    pub category: Arc<Category>,
    pub tags: BTreeMap<Id, Arc<Tag>>,
}

impl ResolvedEntity {
    pub fn id(&self) -> &Id {
        &self.fetched.entity.id
    }

    /// Tags unknown to the catalog (e.g. restricted for this token) are left
    /// out of `tags`.
    pub fn resolve(fetched: FetchedEntity, catalog: &CatalogIndex) -> Result<Self, ViewerError> {
        let (family, category) = resolve_refs(
            catalog,
            &fetched.entity.id,
            &fetched.entity.family_id,
            &fetched.entity.category_id,
        )?;

        let mut tags = BTreeMap::new();
        for tag_id in &fetched.entity.tags {
            match catalog.tag(tag_id) {
                Some(tag) => {
                    tags.insert(tag_id.clone(), Arc::clone(tag));
                }
                None => debug!(entity = %fetched.entity.id, tag = %tag_id, "skipping unknown tag"),
            }
        }

        Ok(Self {
            fetched,
            family,
            category,
            tags,
        })
    }
}

/// Search hit with its family and category resolved.
#[derive(Debug, Clone)]
pub struct ResolvedSearchResult {
    pub entity: SearchedEntity,
    pub family: Arc<Family>,
    pub category: Arc<Category>,
}

impl ResolvedSearchResult {
    pub fn resolve(entity: SearchedEntity, catalog: &CatalogIndex) -> Result<Self, ViewerError> {
        let (family, category) =
            resolve_refs(catalog, &entity.id, &entity.family_id, &entity.category_id)?;
        Ok(Self {
            entity,
            family,
            category,
        })
    }
}

fn resolve_refs(
    catalog: &CatalogIndex,
    entity_id: &Id,
    family_id: &Id,
    category_id: &Id,
) -> Result<(Arc<Family>, Arc<Category>), ViewerError> {
    let family = catalog.family(family_id).ok_or_else(|| {
        ViewerError::BrokenInvariant(format!(
            "entity {entity_id} references unknown family {family_id}"
        ))
    })?;
    let category = catalog.category(category_id).ok_or_else(|| {
        ViewerError::BrokenInvariant(format!(
            "entity {entity_id} references unknown category {category_id}"
        ))
    })?;
    Ok((Arc::clone(family), Arc::clone(category)))
}
