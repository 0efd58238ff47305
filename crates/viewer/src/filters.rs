use std::collections::BTreeMap;
use std::sync::Arc;

use catalog::{CatalogIndex, Category, EnumOption, Tag};
use foundation::Id;
use protocol::Filters;
use tracing::debug;

use crate::ViewerError;

/// Tri-state tag constraint. Not a boolean: `Indifferent` is distinct from
/// both `Required` and `Hidden`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagFilter {
    /// Entity must carry the tag.
    Required,
    /// Entity must not carry the tag.
    Hidden,
    Indifferent,
}

impl TagFilter {
    pub fn from_default_status(default_filter_status: bool) -> Self {
        if default_filter_status {
            TagFilter::Indifferent
        } else {
            TagFilter::Hidden
        }
    }

    /// `Indifferent -> Required -> Hidden -> Indifferent`
    pub fn next(self) -> Self {
        match self {
            TagFilter::Indifferent => TagFilter::Required,
            TagFilter::Required => TagFilter::Hidden,
            TagFilter::Hidden => TagFilter::Indifferent,
        }
    }

    /// `Some(true)` required, `Some(false)` hidden, `None` indifferent.
    pub fn as_option(self) -> Option<bool> {
        match self {
            TagFilter::Required => Some(true),
            TagFilter::Hidden => Some(false),
            TagFilter::Indifferent => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilteringCategory {
    pub category: Arc<Category>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct FilteringTag {
    pub tag: Arc<Tag>,
    pub active: TagFilter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteringEnum {
    pub key: String,
    pub display_name: String,
    pub multiple: bool,
    pub options: Vec<EnumOption>,
    pub selected: Vec<String>,
}

/// Filter projection bound to a family; the payload of every filtered request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterProjection {
    pub family_id: Id,
    pub filters: Filters,
}

/// The user's current filter selections.
///
/// Categories and enum constraints are scoped to the active family and are
/// rebuilt on every family switch. Tag filters are family-independent and
/// survive switches.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    active_family_id: Option<Id>,
    can_filter_enums: bool,
    categories: Vec<FilteringCategory>,
    tags: Vec<FilteringTag>,
    enums: Vec<FilteringEnum>,
}

impl FilterState {
    /// Seeds tag filters from their default status. Only allowed tags flagged
    /// `is_filter` take part in filtering.
    pub fn new(catalog: &CatalogIndex, can_filter_enums: bool) -> Self {
        let tags = catalog
            .tags()
            .iter()
            .filter(|t| t.is_filter && catalog.is_tag_allowed(&t.id))
            .map(|t| FilteringTag {
                tag: Arc::clone(t),
                active: TagFilter::from_default_status(t.default_filter_status),
            })
            .collect();
        Self {
            active_family_id: None,
            can_filter_enums,
            categories: Vec::new(),
            tags,
            enums: Vec::new(),
        }
    }

    pub fn active_family_id(&self) -> Option<&Id> {
        self.active_family_id.as_ref()
    }

    /// Switches family and resets category and enum filters to that family's
    /// defaults. Tag filters are left untouched.
    pub fn set_active_family(
        &mut self,
        catalog: &CatalogIndex,
        family_id: &Id,
    ) -> Result<(), ViewerError> {
        let family = catalog
            .family(family_id)
            .ok_or_else(|| ViewerError::FamilyNotFound(family_id.clone()))?;

        self.categories = catalog
            .categories_of_family(&family.id)
            .filter(|c| catalog.is_category_allowed(&c.id))
            .map(|c| FilteringCategory {
                category: Arc::clone(c),
                active: c.default_status,
            })
            .collect();

        self.enums = if self.can_filter_enums {
            family
                .enum_filter_fields()
                .map(|f| FilteringEnum {
                    key: f.key.clone(),
                    display_name: f.display_name.clone(),
                    multiple: matches!(f.kind, catalog::FieldKind::EnumMultiOption { .. }),
                    options: f.kind.enum_options().unwrap_or_default().to_vec(),
                    selected: Vec::new(),
                })
                .collect()
        } else {
            Vec::new()
        };

        self.active_family_id = Some(family.id.clone());
        debug!(
            family = %family.id,
            categories = self.categories.len(),
            enums = self.enums.len(),
            "active family changed"
        );
        Ok(())
    }

    pub fn filtering_categories(&self) -> &[FilteringCategory] {
        &self.categories
    }

    pub fn filtering_tags(&self) -> &[FilteringTag] {
        &self.tags
    }

    pub fn filtering_enums(&self) -> &[FilteringEnum] {
        &self.enums
    }

    pub fn active_filtering_categories(&self) -> Vec<Id> {
        self.categories
            .iter()
            .filter(|c| c.active)
            .map(|c| c.category.id.clone())
            .collect()
    }

    pub fn active_required_tags(&self) -> Vec<Id> {
        self.tags_with(TagFilter::Required)
    }

    pub fn active_hidden_tags(&self) -> Vec<Id> {
        self.tags_with(TagFilter::Hidden)
    }

    /// Enum constraints with at least one selected value.
    pub fn active_filtering_enums(&self) -> BTreeMap<String, Vec<String>> {
        self.enums
            .iter()
            .filter(|e| !e.selected.is_empty())
            .map(|e| (e.key.clone(), e.selected.clone()))
            .collect()
    }

    fn tags_with(&self, state: TagFilter) -> Vec<Id> {
        self.tags
            .iter()
            .filter(|t| t.active == state)
            .map(|t| t.tag.id.clone())
            .collect()
    }

    pub fn filters(&self) -> Filters {
        Filters {
            active_categories_ids: self.active_filtering_categories(),
            required_tags_ids: self.active_required_tags(),
            exclude_tags_ids: self.active_hidden_tags(),
            enums_constraints: self.active_filtering_enums(),
        }
    }

    pub fn projection(&self) -> Result<FilterProjection, ViewerError> {
        let family_id = self
            .active_family_id
            .clone()
            .ok_or(ViewerError::NotBootstrapped)?;
        Ok(FilterProjection {
            family_id,
            filters: self.filters(),
        })
    }

    /// Returns the new state, `None` when the category is not filterable.
    pub fn toggle_category(&mut self, id: &Id) -> Option<bool> {
        let entry = self.categories.iter_mut().find(|c| &c.category.id == id)?;
        entry.active = !entry.active;
        Some(entry.active)
    }

    pub fn set_category_active(&mut self, id: &Id, active: bool) -> bool {
        match self.categories.iter_mut().find(|c| &c.category.id == id) {
            Some(entry) => {
                entry.active = active;
                true
            }
            None => false,
        }
    }

    /// Advances a tag along `Indifferent -> Required -> Hidden`.
    pub fn cycle_tag(&mut self, id: &Id) -> Option<TagFilter> {
        let entry = self.tags.iter_mut().find(|t| &t.tag.id == id)?;
        entry.active = entry.active.next();
        Some(entry.active)
    }

    pub fn set_tag_filter(&mut self, id: &Id, state: TagFilter) -> bool {
        match self.tags.iter_mut().find(|t| &t.tag.id == id) {
            Some(entry) => {
                entry.active = state;
                true
            }
            None => false,
        }
    }

    pub fn reset_tags(&mut self) {
        for entry in &mut self.tags {
            entry.active = TagFilter::from_default_status(entry.tag.default_filter_status);
        }
    }

    /// Replaces the selection of an enum filter. Values that are not options
    /// of the field are rejected; single-option fields accept at most one.
    pub fn set_enum_values(&mut self, key: &str, values: Vec<String>) -> Result<(), ViewerError> {
        let entry = self
            .enums
            .iter_mut()
            .find(|e| e.key == key)
            .ok_or_else(|| ViewerError::Validation(format!("unknown enum filter `{key}`")))?;

        if let Some(bad) = values
            .iter()
            .find(|v| !entry.options.iter().any(|o| &o.value == *v))
        {
            return Err(ViewerError::Validation(format!(
                "`{bad}` is not an option of `{key}`"
            )));
        }
        if !entry.multiple && values.len() > 1 {
            return Err(ViewerError::Validation(format!(
                "`{key}` accepts a single value"
            )));
        }

        entry.selected = values;
        Ok(())
    }
}
