use std::collections::HashSet;
use std::sync::Arc;

use foundation::Id;

use crate::collection::Collection;
use crate::model::{Category, Family, Tag};

/// Bootstrapped family/category/tag catalogs with their lookup tables and the
/// caller's allow-lists.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    families: Collection<Family>,
    categories: Collection<Category>,
    tags: Collection<Tag>,
    allowed_categories: HashSet<Id>,
    allowed_tags: HashSet<Id>,
}

impl CatalogIndex {
    /// Families are kept ordered by `sort_order`, then title.
    pub fn new(
        families: Vec<Family>,
        categories: Vec<Category>,
        tags: Vec<Tag>,
        allowed_categories: impl IntoIterator<Item = Id>,
        allowed_tags: impl IntoIterator<Item = Id>,
    ) -> Self {
        let mut families = Collection::from_vec(families);
        families.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.title.cmp(&b.title))
        });
        Self {
            families,
            categories: Collection::from_vec(categories),
            tags: Collection::from_vec(tags),
            allowed_categories: allowed_categories.into_iter().collect(),
            allowed_tags: allowed_tags.into_iter().collect(),
        }
    }

    pub fn families(&self) -> &[Arc<Family>] {
        self.families.list()
    }

    pub fn categories(&self) -> &[Arc<Category>] {
        self.categories.list()
    }

    pub fn tags(&self) -> &[Arc<Tag>] {
        self.tags.list()
    }

    pub fn family(&self, id: &Id) -> Option<&Arc<Family>> {
        self.families.get(id)
    }

    pub fn category(&self, id: &Id) -> Option<&Arc<Category>> {
        self.categories.get(id)
    }

    pub fn tag(&self, id: &Id) -> Option<&Arc<Tag>> {
        self.tags.get(id)
    }

    pub fn categories_of_family<'a>(
        &'a self,
        family_id: &'a Id,
    ) -> impl Iterator<Item = &'a Arc<Category>> + 'a {
        self.categories
            .iter()
            .filter(move |c| &c.family_id == family_id)
    }

    pub fn is_category_allowed(&self, id: &Id) -> bool {
        self.allowed_categories.contains(id)
    }

    pub fn is_tag_allowed(&self, id: &Id) -> bool {
        self.allowed_tags.contains(id)
    }
}
