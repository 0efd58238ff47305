use std::borrow::Cow;
use std::collections::BTreeMap;

use catalog::validation::{is_valid_hex_color, is_valid_number, is_valid_text, is_valid_url};
use catalog::{Category, Collection, Family, Tag};
use client::AdminClient;
use foundation::Id;
use protocol::{
    AdminUserTokenClaims, ConfigurationOption, NewOrUpdateCategory, NewOrUpdateFamily,
    NewOrUpdateTag, SafeHavenOptions, SafeHavenVersion,
};
use tracing::{debug, info};

use crate::ViewerError;
use crate::filters::TagFilter;

/// Saved paging and filter state of one back-office table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQueryParams {
    pub search_query: String,
    pub current_page: u32,
    pub page_size: u32,
    pub category_filters: Vec<(Id, bool)>,
    pub tag_filters: Vec<(Id, TagFilter)>,
    pub enum_filters: BTreeMap<String, Vec<String>>,
}

impl Default for TableQueryParams {
    fn default() -> Self {
        Self {
            search_query: String::new(),
            current_page: 1,
            page_size: 20,
            category_filters: Vec::new(),
            tag_filters: Vec::new(),
            enum_filters: BTreeMap::new(),
        }
    }
}

/// Back-office catalog state.
///
/// Lists and id lookups stay consistent after every create, update and delete.
/// Saved table parameters embed category and tag filter lists, so they are
/// dropped whenever the category or tag catalogs change shape.
pub struct AdminSession {
    client: AdminClient,
    user: Option<AdminUserTokenClaims>,
    families: Collection<Family>,
    categories: Collection<Category>,
    tags: Collection<Tag>,
    counts_by_family: BTreeMap<Id, Vec<u64>>,
    counts_by_category: BTreeMap<Id, Vec<u64>>,
    tables_query_params: BTreeMap<String, TableQueryParams>,
    options: Option<SafeHavenOptions>,
    version_information: Option<SafeHavenVersion>,
}

impl AdminSession {
    pub fn new(client: AdminClient) -> Self {
        Self {
            client,
            user: None,
            families: Collection::new(),
            categories: Collection::new(),
            tags: Collection::new(),
            counts_by_family: BTreeMap::new(),
            counts_by_category: BTreeMap::new(),
            tables_query_params: BTreeMap::new(),
            options: None,
            version_information: None,
        }
    }

    pub fn client(&self) -> &AdminClient {
        &self.client
    }

    // Auth

    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<&AdminUserTokenClaims, ViewerError> {
        let claims = self.client.login(username, password, remember_me).await?;
        Ok(&*self.user.insert(claims))
    }

    pub async fn logout(&mut self) -> Result<(), ViewerError> {
        self.client.logout().await?;
        self.user = None;
        info!("admin logged out");
        Ok(())
    }

    /// Returns whether a valid session exists, refreshing the cached user.
    pub async fn check_login(&mut self) -> Result<bool, ViewerError> {
        self.user = self.client.check_login().await?;
        Ok(self.user.is_some())
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    // Table parameters

    pub fn table_query_params(&self, table: &str) -> Option<&TableQueryParams> {
        self.tables_query_params.get(table)
    }

    pub fn save_table_query_params(&mut self, table: impl Into<String>, params: TableQueryParams) {
        self.tables_query_params.insert(table.into(), params);
    }

    fn reset_tables(&mut self, reason: &str) {
        if !self.tables_query_params.is_empty() {
            debug!(reason, tables = self.tables_query_params.len(), "resetting table parameters");
            self.tables_query_params.clear();
        }
    }

    // Families

    pub fn families(&self) -> &Collection<Family> {
        &self.families
    }

    pub fn family_by_id(&self, id: &Id) -> Option<&Family> {
        self.families.get(id).map(|f| f.as_ref())
    }

    pub async fn fetch_families(&mut self) -> Result<(), ViewerError> {
        let mut families = self.client.list_families().await?;
        families.sort_by(|a, b| a.sort_order.cmp(&b.sort_order));
        self.families = Collection::from_vec(families);
        Ok(())
    }

    pub async fn create_family(&mut self, family: &NewOrUpdateFamily) -> Result<Id, ViewerError> {
        validate_title(&family.title)?;
        let created = self.client.create_family(family).await?;
        let id = created.id.clone();
        self.families.upsert(created);
        Ok(id)
    }

    pub async fn update_family(
        &mut self,
        id: &Id,
        family: &NewOrUpdateFamily,
    ) -> Result<(), ViewerError> {
        validate_title(&family.title)?;
        let updated = self.client.update_family(id, family).await?;
        self.families.upsert(updated);
        Ok(())
    }

    /// Categories of the family are deleted server-side along with it.
    pub async fn delete_family(&mut self, id: &Id) -> Result<(), ViewerError> {
        self.client.delete_family(id).await?;
        self.families.delete(id);
        let before = self.categories.len();
        self.categories.retain(|c| &c.family_id != id);
        if self.categories.len() != before {
            self.reset_tables("family categories removed");
        }
        Ok(())
    }

    // Categories

    pub fn categories(&self) -> &Collection<Category> {
        &self.categories
    }

    pub fn category_by_id(&self, id: &Id) -> Option<&Category> {
        self.categories.get(id).map(|c| c.as_ref())
    }

    pub async fn fetch_categories(&mut self) -> Result<(), ViewerError> {
        let categories = self.client.list_categories().await?;
        if !self.categories.same_ids(&categories) {
            self.reset_tables("category set changed");
        }
        self.categories = Collection::from_vec(categories);
        Ok(())
    }

    pub async fn create_category(
        &mut self,
        category: &NewOrUpdateCategory,
    ) -> Result<Id, ViewerError> {
        validate_title(&category.title)?;
        validate_colors(&category.fill_color, &category.border_color)?;
        if !self.families.is_empty() && !self.families.contains(&category.family_id) {
            return Err(ViewerError::FamilyNotFound(category.family_id.clone()));
        }
        let created = self.client.create_category(category).await?;
        let id = created.id.clone();
        self.categories.upsert(created);
        Ok(id)
    }

    pub async fn update_category(
        &mut self,
        id: &Id,
        category: &NewOrUpdateCategory,
    ) -> Result<(), ViewerError> {
        validate_title(&category.title)?;
        validate_colors(&category.fill_color, &category.border_color)?;
        let updated = self.client.update_category(id, category).await?;
        self.categories.upsert(updated);
        self.reset_tables("category updated");
        Ok(())
    }

    pub async fn delete_category(&mut self, id: &Id) -> Result<(), ViewerError> {
        self.client.delete_category(id).await?;
        self.categories.delete(id);
        self.counts_by_category.remove(id);
        self.reset_tables("category deleted");
        Ok(())
    }

    // Tags

    pub fn tags(&self) -> &Collection<Tag> {
        &self.tags
    }

    pub fn tag_by_id(&self, id: &Id) -> Option<&Tag> {
        self.tags.get(id).map(|t| t.as_ref())
    }

    pub async fn fetch_tags(&mut self) -> Result<(), ViewerError> {
        let tags = self.client.list_tags().await?;
        if !self.tags.same_ids(&tags) {
            self.reset_tables("tag set changed");
        }
        self.tags = Collection::from_vec(tags);
        Ok(())
    }

    pub async fn create_tag(&mut self, tag: &NewOrUpdateTag) -> Result<Id, ViewerError> {
        validate_title(&tag.title)?;
        validate_colors(&tag.fill_color, &tag.border_color)?;
        let created = self.client.create_tag(tag).await?;
        let id = created.id.clone();
        self.tags.upsert(created);
        Ok(id)
    }

    pub async fn update_tag(&mut self, id: &Id, tag: &NewOrUpdateTag) -> Result<(), ViewerError> {
        validate_title(&tag.title)?;
        validate_colors(&tag.fill_color, &tag.border_color)?;
        let updated = self.client.update_tag(id, tag).await?;
        self.tags.upsert(updated);
        self.reset_tables("tag updated");
        Ok(())
    }

    pub async fn delete_tag(&mut self, id: &Id) -> Result<(), ViewerError> {
        self.client.delete_tag(id).await?;
        self.tags.delete(id);
        self.reset_tables("tag deleted");
        Ok(())
    }

    // Stats

    pub async fn fetch_entities_comments_counts(&mut self) -> Result<(), ViewerError> {
        let (by_family, by_category) = self.client.entities_comments_counts().await?;
        self.counts_by_family = by_family;
        self.counts_by_category = by_category;
        Ok(())
    }

    pub fn counts_by_family(&self) -> &BTreeMap<Id, Vec<u64>> {
        &self.counts_by_family
    }

    pub fn counts_by_category(&self) -> &BTreeMap<Id, Vec<u64>> {
        &self.counts_by_category
    }

    // Options

    pub async fn fetch_options(&mut self) -> Result<(), ViewerError> {
        self.options = Some(self.client.options().await?);
        Ok(())
    }

    /// Loaded options, or the defaults until the first fetch.
    pub fn options(&self) -> Cow<'_, SafeHavenOptions> {
        self.options
            .as_ref()
            .map_or_else(|| Cow::Owned(SafeHavenOptions::default()), Cow::Borrowed)
    }

    pub fn has_safe_mode(&self) -> bool {
        self.options.as_ref().is_some_and(|o| o.safe_mode.enabled)
    }

    pub async fn update_option(&mut self, option: &ConfigurationOption) -> Result<(), ViewerError> {
        validate_option(option)?;
        self.options = Some(self.client.update_option(option).await?);
        info!(option = option.name(), "option saved");
        Ok(())
    }

    /// Reverts one option group to the server default.
    pub async fn delete_option(&mut self, name: &str) -> Result<(), ViewerError> {
        if !ConfigurationOption::NAMES.contains(&name) {
            return Err(ViewerError::Validation(format!("unknown option group `{name}`")));
        }
        self.options = Some(self.client.delete_option(name).await?);
        info!(option = name, "option reset");
        Ok(())
    }

    // Version

    pub async fn fetch_version_information(&mut self) -> Result<&SafeHavenVersion, ViewerError> {
        let version = self.client.version().await?;
        Ok(&*self.version_information.insert(version))
    }

    pub fn version_information(&self) -> Option<&SafeHavenVersion> {
        self.version_information.as_ref()
    }
}

fn validate_option(option: &ConfigurationOption) -> Result<(), ViewerError> {
    match option {
        ConfigurationOption::General(general) => {
            validate_title(&general.title)?;
            for url in [&general.logo_url, &general.redirect_url].into_iter().flatten() {
                if !is_valid_url(Some(url.as_str())) {
                    return Err(ViewerError::Validation(format!("`{url}` is not a valid URL")));
                }
            }
        }
        ConfigurationOption::CartographyInit(init) => {
            let valid = is_valid_number(Some(init.center_lat), Some(-90.0), Some(90.0))
                && is_valid_number(Some(init.center_lng), Some(-180.0), Some(180.0))
                && is_valid_number(Some(f64::from(init.zoom)), Some(2.0), Some(20.0));
            if !valid {
                return Err(ViewerError::Validation(
                    "map start must be a WGS84 point with zoom 2 to 20".into(),
                ));
            }
        }
        ConfigurationOption::CartographyCluster(cluster) => {
            if cluster.minimal_cluster_size < 1 || cluster.declustering_speed <= 1.0 {
                return Err(ViewerError::Validation(
                    "clusters need a size of at least 1 and a declustering speed above 1".into(),
                ));
            }
        }
        ConfigurationOption::SafeMode(_) => {}
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ViewerError> {
    if is_valid_text(Some(title)) {
        Ok(())
    } else {
        Err(ViewerError::Validation("title must not be blank".into()))
    }
}

fn validate_colors(fill: &str, border: &str) -> Result<(), ViewerError> {
    for color in [fill, border] {
        if !is_valid_hex_color(Some(color)) {
            return Err(ViewerError::Validation(format!(
                "`{color}` is not a #rrggbb color"
            )));
        }
    }
    Ok(())
}
