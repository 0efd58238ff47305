use std::sync::Arc;

use catalog::validation::{is_valid_rich_text, is_valid_text};
use catalog::{CatalogIndex, Family};
use client::ViewerApi;
use foundation::math::lon_lat_to_web_mercator;
use foundation::{Extent, Id};
use protocol::{
    CartographyInitConfig, EntitiesAndClusters, FetchEntityRequest, Filters, NewComment,
    NewEntity, Paginated, Pagination, PublicComment, PublicPermissions, SafeMode, SearchRequest,
    StatusResponse, SubmittedEntity, ViewRequest,
};
use runtime::{EventBus, SubscriptionId};
use tracing::{debug, info, warn};

use crate::ViewerError;
use crate::filters::FilterState;
use crate::reconcile::{
    ApplyOutcome, DisplayableCluster, DisplayableEntity, ReconcileStats, ViewId, ViewTicket,
    ViewportReconciler,
};
use crate::selection::{ResolvedEntity, ResolvedSearchResult};

/// State changes observable by the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusLoaded { online: bool },
    Bootstrapped { families: usize },
    ActiveFamilyChanged(Id),
    FiltersChanged,
    ViewApplied { view_id: ViewId, stats: ReconcileStats },
    ViewDropped { view_id: ViewId },
    ActiveEntityChanged(Option<Id>),
}

#[derive(Debug)]
struct Booted {
    catalog: CatalogIndex,
    filters: FilterState,
    permissions: PublicPermissions,
    cartography: CartographyInitConfig,
}

/// One viewer session: server status, bootstrapped catalog, filters, the
/// on-screen entity set and the selected entity.
pub struct ViewerSession<A> {
    api: A,
    status: Option<StatusResponse>,
    booted: Option<Booted>,
    reconciler: ViewportReconciler,
    active_entity: Option<ResolvedEntity>,
    events: EventBus<SessionEvent>,
}

impl<A: ViewerApi> ViewerSession<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            status: None,
            booted: None,
            reconciler: ViewportReconciler::new(),
            active_entity: None,
            events: EventBus::new(),
        }
    }

    /// Creates the session and loads the server status.
    pub async fn init(api: A) -> Result<Self, ViewerError> {
        let mut session = Self::new(api);
        session.load_status().await?;
        Ok(session)
    }

    pub async fn load_status(&mut self) -> Result<&StatusResponse, ViewerError> {
        let status = self.api.check_status().await?;
        let online = status.status == "ok";
        if !online {
            warn!(status = %status.status, "server reports degraded status");
        }
        self.events.emit(SessionEvent::StatusLoaded { online });
        Ok(&*self.status.insert(status))
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn events(&self) -> &EventBus<SessionEvent> {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus<SessionEvent> {
        &mut self.events
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    // Status

    pub fn status(&self) -> Option<&StatusResponse> {
        self.status.as_ref()
    }

    pub fn loaded(&self) -> bool {
        self.status.is_some()
    }

    pub fn online(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.status == "ok")
    }

    pub fn safe_mode(&self) -> Option<&SafeMode> {
        self.status.as_ref().map(|s| &s.safe_mode)
    }

    pub fn has_safe_mode(&self) -> bool {
        self.safe_mode().is_some_and(|m| m.enabled)
    }

    pub fn title(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.general.title.as_str())
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.status.as_ref()?.general.subtitle.as_deref()
    }

    pub fn logo(&self) -> Option<&str> {
        self.status.as_ref()?.general.logo_url.as_deref()
    }

    // Bootstrap

    /// Exchanges an access token for the catalog and permissions, then
    /// activates the first family. The client adopts the new credentials only
    /// once the response is accepted; on error the previous state and
    /// credentials are kept.
    pub async fn bootstrap_with_token(
        &mut self,
        token: &str,
        referrer: Option<&str>,
    ) -> Result<(), ViewerError> {
        let data = self.api.bootstrap(token, referrer).await?;
        if data.families.is_empty() {
            return Err(ViewerError::NoFamilies);
        }

        let catalog = CatalogIndex::new(
            data.families,
            data.categories,
            data.tags,
            data.allowed_categories,
            data.allowed_tags,
        );
        let mut filters =
            FilterState::new(&catalog, data.permissions.can_list_with_enum_constraints);
        let first = catalog
            .families()
            .first()
            .map(|f| f.id.clone())
            .ok_or(ViewerError::NoFamilies)?;
        filters.set_active_family(&catalog, &first)?;

        let families = catalog.families().len();
        self.api.adopt_credentials(&data.signed_token, token);
        self.booted = Some(Booted {
            catalog,
            filters,
            permissions: data.permissions,
            cartography: data.cartography_init_config,
        });
        self.reconciler.reset();
        self.active_entity = None;

        info!(families, family = %first, "viewer session ready");
        self.events.emit(SessionEvent::Bootstrapped { families });
        self.events.emit(SessionEvent::ActiveFamilyChanged(first));
        Ok(())
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.booted.is_some()
    }

    fn booted(&self) -> Result<&Booted, ViewerError> {
        self.booted.as_ref().ok_or(ViewerError::NotBootstrapped)
    }

    fn booted_mut(&mut self) -> Result<&mut Booted, ViewerError> {
        self.booted.as_mut().ok_or(ViewerError::NotBootstrapped)
    }

    pub fn catalog(&self) -> Result<&CatalogIndex, ViewerError> {
        Ok(&self.booted()?.catalog)
    }

    pub fn permissions(&self) -> Result<&PublicPermissions, ViewerError> {
        Ok(&self.booted()?.permissions)
    }

    pub fn cartography_init_config(&self) -> Result<&CartographyInitConfig, ViewerError> {
        Ok(&self.booted()?.cartography)
    }

    /// Initial map center in Web Mercator; the configuration is in WGS84.
    pub fn start_center(&self) -> Result<[f64; 2], ViewerError> {
        let config = self.cartography_init_config()?;
        Ok(lon_lat_to_web_mercator(config.center_lng, config.center_lat))
    }

    pub fn start_zoom(&self) -> Result<u8, ViewerError> {
        Ok(self.cartography_init_config()?.zoom)
    }

    // Filters

    pub fn filters(&self) -> Result<&FilterState, ViewerError> {
        Ok(&self.booted()?.filters)
    }

    pub fn active_family(&self) -> Result<&Arc<Family>, ViewerError> {
        let booted = self.booted()?;
        let id = booted
            .filters
            .active_family_id()
            .ok_or(ViewerError::NotBootstrapped)?;
        booted
            .catalog
            .family(id)
            .ok_or_else(|| ViewerError::FamilyNotFound(id.clone()))
    }

    pub fn set_active_family(&mut self, family_id: &Id) -> Result<(), ViewerError> {
        let booted = self.booted_mut()?;
        booted.filters.set_active_family(&booted.catalog, family_id)?;
        self.events
            .emit(SessionEvent::ActiveFamilyChanged(family_id.clone()));
        Ok(())
    }

    /// Runs a filter mutation and announces it.
    pub fn update_filters<R>(
        &mut self,
        update: impl FnOnce(&mut FilterState) -> R,
    ) -> Result<R, ViewerError> {
        let out = update(&mut self.booted_mut()?.filters);
        self.events.emit(SessionEvent::FiltersChanged);
        Ok(out)
    }

    // Viewport

    /// Issues a viewport query for the current filters without sending it.
    pub fn begin_refresh(&mut self, extent: Extent, zoom_level: f64) -> Result<ViewTicket, ViewerError> {
        let booted = self.booted()?;
        require(booted.permissions.can_list_entities, "can_list_entities")?;
        let projection = booted.filters.projection()?;
        let request = ViewRequest::new(extent, zoom_level, projection.family_id, projection.filters);
        Ok(self.reconciler.begin(request))
    }

    pub fn apply_view(
        &mut self,
        ticket: &ViewTicket,
        response: EntitiesAndClusters,
    ) -> Result<ApplyOutcome, ViewerError> {
        let booted = self.booted.as_ref().ok_or(ViewerError::NotBootstrapped)?;
        let outcome = self.reconciler.apply(ticket, response, &booted.catalog)?;
        match outcome {
            ApplyOutcome::Applied(stats) => self.events.emit(SessionEvent::ViewApplied {
                view_id: ticket.view_id,
                stats,
            }),
            ApplyOutcome::Stale { view_id, .. } => {
                self.events.emit(SessionEvent::ViewDropped { view_id })
            }
        }
        Ok(outcome)
    }

    /// Fetches the entities and clusters inside `extent` and merges them into
    /// the on-screen set. A failed fetch leaves the display untouched.
    pub async fn refresh_view(
        &mut self,
        extent: Extent,
        zoom_level: f64,
    ) -> Result<ApplyOutcome, ViewerError> {
        let ticket = self.begin_refresh(extent, zoom_level)?;
        let response = self.api.fetch_view(ticket.request.clone()).await?;
        self.apply_view(&ticket, response)
    }

    pub fn entities(&self) -> &[DisplayableEntity] {
        self.reconciler.cache().entities()
    }

    pub fn clusters(&self) -> &[DisplayableCluster] {
        self.reconciler.cache().clusters()
    }

    pub fn highlight(&mut self, id: &Id) -> bool {
        self.reconciler.cache_mut().highlight(id)
    }

    pub fn clear_highlight(&mut self) {
        self.reconciler.cache_mut().clear_highlight();
    }

    // Selection

    pub fn active_entity(&self) -> Option<&ResolvedEntity> {
        self.active_entity.as_ref()
    }

    pub fn has_active_entity(&self) -> bool {
        self.active_entity.is_some()
    }

    /// `false` clears the selection; `true` does nothing.
    pub fn set_has_active_entity(&mut self, value: bool) {
        if !value && self.active_entity.take().is_some() {
            self.events.emit(SessionEvent::ActiveEntityChanged(None));
        }
    }

    /// Fetches and resolves entity detail under the current filters. Comments
    /// are dropped unless the token may read them.
    pub async fn select_entity(&mut self, entity_id: &Id) -> Result<&ResolvedEntity, ViewerError> {
        let booted = self.booted()?;
        require(booted.permissions.can_access_entity, "can_access_entity")?;
        let can_access_comments = booted.permissions.can_access_comments;
        let request = FetchEntityRequest {
            filters: booted.filters.projection()?.filters,
        };

        let mut fetched = self.api.fetch_entity(entity_id, request).await?;
        if !can_access_comments {
            fetched.comments.clear();
        }
        let resolved = ResolvedEntity::resolve(fetched, &self.booted()?.catalog)?;
        debug!(entity = %resolved.id(), "entity selected");
        self.events
            .emit(SessionEvent::ActiveEntityChanged(Some(resolved.id().clone())));
        Ok(&*self.active_entity.insert(resolved))
    }

    /// Selects the entity behind an on-screen item, by its cache id.
    pub async fn select_cached_entity(
        &mut self,
        cache_id: &Id,
    ) -> Result<&ResolvedEntity, ViewerError> {
        let entity_id = self
            .reconciler
            .cache()
            .entity(cache_id)
            .map(|e| e.entity_id.clone())
            .ok_or_else(|| ViewerError::Validation(format!("{cache_id} is not on screen")))?;
        self.select_entity(&entity_id).await
    }

    // Search

    /// Full-text search in the active family. Filters are only applied when
    /// the token may filter listings.
    pub async fn search(
        &self,
        query: &str,
        pagination: Pagination,
        require_locations: bool,
    ) -> Result<Paginated<ResolvedSearchResult>, ViewerError> {
        let booted = self.booted()?;
        let permissions = &booted.permissions;
        require(permissions.can_list_entities, "can_list_entities")?;
        if query.trim().is_empty() {
            require(permissions.can_list_without_query, "can_list_without_query")?;
        }

        let projection = booted.filters.projection()?;
        let request = SearchRequest {
            search_query: query.to_string(),
            family_id: projection.family_id,
            filters: if permissions.can_list_with_filters {
                projection.filters
            } else {
                Filters::default()
            },
            require_locations,
        };

        let page = self.api.search(request, pagination).await?;
        debug!(
            results = page.total_results,
            page = page.response_current_page,
            pages = page.total_pages,
            "search completed"
        );
        page.try_map(|entity| ResolvedSearchResult::resolve(entity, &booted.catalog))
    }

    // Submissions

    /// Proposes a new entity in the active family. The server keeps it off the
    /// map until a moderator approves it.
    pub async fn submit_entity(&self, entity: NewEntity) -> Result<SubmittedEntity, ViewerError> {
        let booted = self.booted()?;
        require(booted.permissions.can_add_entity, "can_add_entity")?;
        if !is_valid_text(Some(&entity.display_name)) {
            return Err(ViewerError::Validation("display name must not be blank".into()));
        }
        let category = booted
            .catalog
            .category(&entity.category_id)
            .filter(|c| booted.catalog.is_category_allowed(&c.id))
            .ok_or_else(|| {
                ViewerError::Validation(format!("unknown category {}", entity.category_id))
            })?;
        let family_id = booted
            .filters
            .active_family_id()
            .ok_or(ViewerError::NotBootstrapped)?;
        if &category.family_id != family_id {
            return Err(ViewerError::Validation(format!(
                "category {} is not in family {family_id}",
                category.id
            )));
        }

        Ok(self.api.submit_entity(entity).await?)
    }

    /// Posts a comment; like entities it is held for moderation.
    pub async fn submit_comment(&self, comment: NewComment) -> Result<PublicComment, ViewerError> {
        let booted = self.booted()?;
        require(booted.permissions.can_add_comment, "can_add_comment")?;
        if !is_valid_text(Some(&comment.author)) {
            return Err(ViewerError::Validation("author must not be blank".into()));
        }
        if !is_valid_rich_text(Some(&comment.text)) {
            return Err(ViewerError::Validation("comment text is empty".into()));
        }
        Ok(self.api.submit_comment(comment).await?)
    }
}

fn require(granted: bool, permission: &'static str) -> Result<(), ViewerError> {
    if granted {
        Ok(())
    } else {
        Err(ViewerError::Forbidden(permission))
    }
}

impl<A> std::fmt::Debug for ViewerSession<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("online", &self.status.as_ref().map(|s| s.status.as_str()))
            .field("bootstrapped", &self.booted.is_some())
            .field("entities", &self.reconciler.cache().entities().len())
            .field("clusters", &self.reconciler.cache().clusters().len())
            .field("active_entity", &self.active_entity.as_ref().map(|e| e.id()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::TagFilter;
    use crate::fixtures::{category, family, fetched, serve, tag};
    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use client::{BoundsFetcher, BoxFuture, ClientConfig, ClientError, ViewerClient};
    use serde_json::json;
    use pretty_assertions::assert_eq;
    use protocol::{
        BootstrapResponse, Cluster, FetchedEntity, GeneralOptions, SearchedEntity,
        ViewerCachedEntity,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorded {
        views: Vec<ViewRequest>,
        fetches: Vec<(Id, FetchEntityRequest)>,
        searches: Vec<(SearchRequest, Pagination)>,
        credentials: Vec<(String, String)>,
        entities: Vec<NewEntity>,
        comments: Vec<NewComment>,
    }

    struct MockApi {
        bootstrap: BootstrapResponse,
        views: Mutex<VecDeque<Result<EntitiesAndClusters, ClientError>>>,
        recorded: Mutex<Recorded>,
    }

    impl MockApi {
        fn new(permissions: PublicPermissions) -> Self {
            Self {
                bootstrap: BootstrapResponse {
                    signed_token: "signed".into(),
                    families: vec![family("b", 2, vec![]), family("a", 1, vec![])],
                    categories: vec![
                        category("a1", "a", true),
                        category("a2", "a", false),
                        category("b1", "b", true),
                    ],
                    tags: vec![tag("t1", true, true), tag("t2", true, false)],
                    allowed_categories: ["a1", "a2", "b1"].map(Id::from).to_vec(),
                    allowed_tags: ["t1", "t2"].map(Id::from).to_vec(),
                    permissions,
                    cartography_init_config: CartographyInitConfig {
                        center_lat: 48.8566,
                        center_lng: 2.3522,
                        zoom: 12,
                    },
                },
                views: Mutex::new(VecDeque::new()),
                recorded: Mutex::new(Recorded::default()),
            }
        }

        fn queue_view(&self, response: Result<EntitiesAndClusters, ClientError>) {
            self.views.lock().unwrap().push_back(response);
        }
    }

    impl BoundsFetcher for MockApi {
        fn fetch_view(
            &self,
            request: ViewRequest,
        ) -> BoxFuture<'_, Result<EntitiesAndClusters, ClientError>> {
            Box::pin(async move {
                self.recorded.lock().unwrap().views.push(request);
                self.views
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Ok(EntitiesAndClusters::default()))
            })
        }
    }

    impl ViewerApi for MockApi {
        fn check_status(&self) -> BoxFuture<'_, Result<StatusResponse, ClientError>> {
            Box::pin(async {
                Ok(StatusResponse {
                    status: "ok".into(),
                    general: GeneralOptions {
                        title: "SafeHaven".into(),
                        subtitle: Some("Shelters".into()),
                        logo_url: None,
                        information: None,
                        redirect_url: None,
                    },
                    safe_mode: SafeMode {
                        enabled: false,
                        hcaptcha_sitekey: None,
                    },
                    cartography_init: CartographyInitConfig {
                        center_lat: 0.0,
                        center_lng: 0.0,
                        zoom: 3,
                    },
                })
            })
        }

        fn bootstrap<'a>(
            &'a self,
            token: &'a str,
            _referrer: Option<&'a str>,
        ) -> BoxFuture<'a, Result<BootstrapResponse, ClientError>> {
            Box::pin(async move {
                match token {
                    "empty" => Ok(BootstrapResponse {
                        families: vec![],
                        ..self.bootstrap.clone()
                    }),
                    _ => Ok(self.bootstrap.clone()),
                }
            })
        }

        fn fetch_entity<'a>(
            &'a self,
            id: &'a Id,
            request: FetchEntityRequest,
        ) -> BoxFuture<'a, Result<FetchedEntity, ClientError>> {
            Box::pin(async move {
                self.recorded
                    .lock()
                    .unwrap()
                    .fetches
                    .push((id.clone(), request));
                let mut detail = fetched(id.as_str(), "a1", &["t1"]);
                detail.comments.push(PublicComment {
                    id: Id::from("c-1"),
                    entity_id: id.clone(),
                    author: "Ana".into(),
                    text: "<p>Open tonight</p>".into(),
                    data: serde_json::json!({}),
                    created_at: None,
                });
                Ok(detail)
            })
        }

        fn search(
            &self,
            request: SearchRequest,
            pagination: Pagination,
        ) -> BoxFuture<'_, Result<Paginated<SearchedEntity>, ClientError>> {
            Box::pin(async move {
                let family_id = request.family_id.clone();
                self.recorded
                    .lock()
                    .unwrap()
                    .searches
                    .push((request, pagination));
                Ok(Paginated {
                    entities: vec![SearchedEntity {
                        id: Id::from("s1"),
                        entity_id: Id::from("e1"),
                        family_id,
                        category_id: Id::from("a1"),
                        tags_ids: vec![],
                        display_name: "Hit".into(),
                        locations: vec![],
                    }],
                    total_results: 1,
                    total_pages: 1,
                    response_current_page: pagination.page,
                })
            })
        }

        fn adopt_credentials(&self, signed_token: &str, access_token: &str) {
            self.recorded
                .lock()
                .unwrap()
                .credentials
                .push((signed_token.to_string(), access_token.to_string()));
        }

        fn submit_entity(
            &self,
            entity: NewEntity,
        ) -> BoxFuture<'_, Result<SubmittedEntity, ClientError>> {
            Box::pin(async move {
                let submitted = SubmittedEntity {
                    id: Id::from("new-1"),
                    display_name: entity.display_name.clone(),
                    category_id: entity.category_id.clone(),
                    data: entity.data.clone(),
                    moderated_at: None,
                    created_at: None,
                };
                self.recorded.lock().unwrap().entities.push(entity);
                Ok(submitted)
            })
        }

        fn submit_comment(
            &self,
            comment: NewComment,
        ) -> BoxFuture<'_, Result<PublicComment, ClientError>> {
            Box::pin(async move {
                let submitted = PublicComment {
                    id: Id::from("c-new"),
                    entity_id: comment.entity_id.clone(),
                    author: comment.author.clone(),
                    text: comment.text.clone(),
                    data: comment.data.clone(),
                    created_at: None,
                };
                self.recorded.lock().unwrap().comments.push(comment);
                Ok(submitted)
            })
        }
    }

    fn all_permissions() -> PublicPermissions {
        PublicPermissions {
            can_list_entities: true,
            can_access_entity: true,
            can_add_entity: true,
            can_access_comments: true,
            can_add_comment: true,
            can_list_without_query: true,
            can_list_with_filters: true,
            can_list_with_enum_constraints: true,
        }
    }

    fn view(entities: &[&str], clusters: &[&str]) -> EntitiesAndClusters {
        EntitiesAndClusters {
            entities: entities
                .iter()
                .map(|id| ViewerCachedEntity {
                    id: Id::from(*id),
                    entity_id: Id::from(format!("e-{id}")),
                    family_id: Id::from("a"),
                    category_id: Id::from("a1"),
                    tags_ids: vec![],
                    display_name: id.to_string(),
                    web_mercator_x: 0.0,
                    web_mercator_y: 0.0,
                })
                .collect(),
            clusters: clusters
                .iter()
                .map(|id| Cluster {
                    id: Id::from(*id),
                    center_x: 0.0,
                    center_y: 0.0,
                    count: 2,
                })
                .collect(),
        }
    }

    fn extent() -> Extent {
        Extent::new(0.0, 0.0, 10.0, 10.0)
    }

    async fn booted(permissions: PublicPermissions) -> ViewerSession<MockApi> {
        let mut session = ViewerSession::init(MockApi::new(permissions)).await.unwrap();
        session.bootstrap_with_token("token", None).await.unwrap();
        session
    }

    fn ids(raw: &[&str]) -> Vec<Id> {
        raw.iter().map(|s| Id::from(*s)).collect()
    }

    #[tokio::test]
    async fn init_loads_status() {
        let session = ViewerSession::init(MockApi::new(all_permissions()))
            .await
            .unwrap();
        assert!(session.loaded());
        assert!(session.online());
        assert!(!session.has_safe_mode());
        assert_eq!(session.title(), Some("SafeHaven"));
        assert_eq!(session.subtitle(), Some("Shelters"));
        assert_eq!(session.logo(), None);
        assert!(matches!(session.catalog(), Err(ViewerError::NotBootstrapped)));
    }

    #[tokio::test]
    async fn bootstrap_activates_first_family_by_sort_order() {
        let session = booted(all_permissions()).await;
        assert_eq!(session.active_family().unwrap().id, Id::from("a"));
        assert_eq!(
            session.filters().unwrap().active_filtering_categories(),
            ids(&["a1"])
        );
        assert_eq!(session.start_zoom().unwrap(), 12);
        let [x, y] = session.start_center().unwrap();
        assert!((x - 261_845.7).abs() < 1.0, "x = {x}");
        assert!((y - 6_250_564.3).abs() < 1.0, "y = {y}");
        assert_eq!(
            session.events().events()[1..],
            [
                SessionEvent::Bootstrapped { families: 2 },
                SessionEvent::ActiveFamilyChanged(Id::from("a")),
            ]
        );
    }

    #[tokio::test]
    async fn bootstrap_without_families_fails() {
        let mut session = ViewerSession::new(MockApi::new(all_permissions()));
        let err = session
            .bootstrap_with_token("empty", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::NoFamilies));
        assert!(!session.is_bootstrapped());
    }

    #[tokio::test]
    async fn failed_rebootstrap_keeps_state_and_credentials() {
        let mut session = booted(all_permissions()).await;
        session.set_active_family(&Id::from("b")).unwrap();

        let err = session
            .bootstrap_with_token("empty", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::NoFamilies));
        assert!(session.is_bootstrapped());
        assert_eq!(session.active_family().unwrap().id, Id::from("b"));
        assert_eq!(
            session.api().recorded.lock().unwrap().credentials,
            vec![("signed".to_string(), "token".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_rebootstrap_keeps_client_credentials() {
        type Seen = Arc<Mutex<Vec<String>>>;
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/api/bootstrap/:token",
                get(|Path(token): Path<String>| async move {
                    let families = if token == "empty" {
                        json!([])
                    } else {
                        json!([{
                            "id": "a",
                            "title": "Shelters",
                            "entity_form": { "title": "", "fields": [] },
                            "comment_form": { "title": "", "fields": [] }
                        }])
                    };
                    Json(json!({
                        "signed_token": format!("jwt-{token}"),
                        "families": families,
                        "categories": [],
                        "tags": [],
                        "allowed_categories": [],
                        "allowed_tags": [],
                        "permissions": { "can_list_entities": true },
                        "cartography_init_config": { "center_lat": 0.0, "center_lng": 0.0, "zoom": 3 }
                    }))
                }),
            )
            .route(
                "/api/map/view",
                post(|State(seen): State<Seen>, headers: HeaderMap| async move {
                    let auth = format!(
                        "{} / {}",
                        headers["authorization"].to_str().unwrap(),
                        headers["x-sh-plain-accesstoken"].to_str().unwrap()
                    );
                    seen.lock().unwrap().push(auth);
                    Json(json!({ "entities": [], "clusters": [] }))
                }),
            )
            .with_state(seen.clone());

        let client = ViewerClient::new(&ClientConfig::new(serve(app).await)).unwrap();
        let mut session = ViewerSession::new(client);
        session.bootstrap_with_token("good", None).await.unwrap();
        session.refresh_view(extent(), 3.0).await.unwrap();

        let err = session
            .bootstrap_with_token("empty", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::NoFamilies));
        session.refresh_view(extent(), 3.0).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["Bearer jwt-good / good".to_string(); 2]
        );
    }

    #[tokio::test]
    async fn rebootstrap_invalidates_views_in_flight() {
        let mut session = booted(all_permissions()).await;
        let before = session.begin_refresh(extent(), 3.0).unwrap();
        session.bootstrap_with_token("token", None).await.unwrap();

        let outcome = session.apply_view(&before, view(&["x"], &[])).unwrap();
        assert!(matches!(outcome, ApplyOutcome::Stale { .. }));
        assert!(session.entities().is_empty());
    }

    #[tokio::test]
    async fn refresh_sends_projection_and_merges() {
        let mut session = booted(all_permissions()).await;
        session
            .update_filters(|f| f.cycle_tag(&Id::from("t1")))
            .unwrap();
        session.api().queue_view(Ok(view(&["x", "y"], &["c1"])));
        session.api().queue_view(Ok(view(&["z", "y"], &[])));

        session.refresh_view(extent(), 5.6).await.unwrap();
        session.highlight(&Id::from("y"));
        let outcome = session.refresh_view(extent(), 7.2).await.unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome::Applied(ReconcileStats {
                entities_added: 1,
                entities_removed: 1,
                clusters_added: 0,
                clusters_removed: 1,
            })
        );

        let on_screen: Vec<_> = session
            .entities()
            .iter()
            .map(|e| (e.id.as_str(), e.highlighted))
            .collect();
        assert_eq!(on_screen, vec![("y", true), ("z", false)]);
        assert!(session.clusters().is_empty());

        let recorded = session.api().recorded.lock().unwrap();
        let first = &recorded.views[0];
        assert_eq!(first.zoom_level, 6);
        assert_eq!(first.family_id, Id::from("a"));
        assert_eq!(first.filters.active_categories_ids, ids(&["a1"]));
        assert_eq!(first.filters.required_tags_ids, ids(&["t1"]));
        assert_eq!(first.filters.exclude_tags_ids, ids(&["t2"]));
        assert_eq!(recorded.views[1].zoom_level, 7);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_display() {
        let mut session = booted(all_permissions()).await;
        session.api().queue_view(Ok(view(&["x"], &["c1"])));
        session
            .api()
            .queue_view(Err(ClientError::Server {
                status: client::StatusCode::INTERNAL_SERVER_ERROR,
                error_code: "boom".into(),
                details: None,
            }));
        session.refresh_view(extent(), 4.0).await.unwrap();
        let err = session.refresh_view(extent(), 4.0).await.unwrap_err();
        assert!(matches!(err, ViewerError::Client(_)));
        assert_eq!(session.entities().len(), 1);
        assert_eq!(session.clusters().len(), 1);
    }

    #[tokio::test]
    async fn out_of_order_responses_do_not_regress() {
        let mut session = booted(all_permissions()).await;
        let early = session.begin_refresh(extent(), 3.0).unwrap();
        let late = session.begin_refresh(extent(), 9.0).unwrap();

        session.apply_view(&late, view(&["late"], &[])).unwrap();
        let outcome = session.apply_view(&early, view(&["early"], &[])).unwrap();
        assert!(matches!(outcome, ApplyOutcome::Stale { .. }));
        assert_eq!(session.entities()[0].id, Id::from("late"));
        assert_eq!(
            session.events().events().last(),
            Some(&SessionEvent::ViewDropped {
                view_id: early.view_id
            })
        );
    }

    #[tokio::test]
    async fn family_switch_changes_view_family() {
        let mut session = booted(all_permissions()).await;
        session
            .update_filters(|f| f.set_tag_filter(&Id::from("t1"), TagFilter::Required))
            .unwrap();
        session.set_active_family(&Id::from("b")).unwrap();
        session.refresh_view(extent(), 2.0).await.unwrap();

        let recorded = session.api().recorded.lock().unwrap();
        assert_eq!(recorded.views[0].family_id, Id::from("b"));
        assert_eq!(recorded.views[0].filters.active_categories_ids, ids(&["b1"]));
        assert_eq!(recorded.views[0].filters.required_tags_ids, ids(&["t1"]));
    }

    #[tokio::test]
    async fn listing_requires_permission() {
        let mut session = booted(PublicPermissions {
            can_list_entities: false,
            ..all_permissions()
        })
        .await;
        let err = session.refresh_view(extent(), 3.0).await.unwrap_err();
        assert!(matches!(err, ViewerError::Forbidden("can_list_entities")));
        assert!(session.api().recorded.lock().unwrap().views.is_empty());
    }

    #[tokio::test]
    async fn select_and_clear_entity() {
        let mut session = booted(all_permissions()).await;
        session.api().queue_view(Ok(view(&["x"], &[])));
        session.refresh_view(extent(), 3.0).await.unwrap();

        let selected = session.select_cached_entity(&Id::from("x")).await.unwrap();
        assert_eq!(selected.id(), &Id::from("e-x"));
        assert_eq!(selected.category.id, Id::from("a1"));
        assert!(selected.tags.contains_key(&Id::from("t1")));
        assert!(session.has_active_entity());

        session.set_has_active_entity(true);
        assert!(session.has_active_entity());
        session.set_has_active_entity(false);
        assert!(!session.has_active_entity());

        let recorded = session.api().recorded.lock().unwrap();
        assert_eq!(recorded.fetches[0].0, Id::from("e-x"));
        assert_eq!(
            recorded.fetches[0].1.filters.active_categories_ids,
            ids(&["a1"])
        );
    }

    #[tokio::test]
    async fn selecting_requires_access_permission() {
        let mut session = booted(PublicPermissions {
            can_access_entity: false,
            ..all_permissions()
        })
        .await;
        let err = session.select_entity(&Id::from("e1")).await.unwrap_err();
        assert!(matches!(err, ViewerError::Forbidden("can_access_entity")));
        assert!(!session.has_active_entity());
    }

    #[tokio::test]
    async fn comments_need_access_permission() {
        let mut session = booted(all_permissions()).await;
        let detail = session.select_entity(&Id::from("e1")).await.unwrap();
        assert_eq!(detail.fetched.comments.len(), 1);

        let mut session = booted(PublicPermissions {
            can_access_comments: false,
            ..all_permissions()
        })
        .await;
        let detail = session.select_entity(&Id::from("e1")).await.unwrap();
        assert!(detail.fetched.comments.is_empty());
    }

    fn new_entity(name: &str, category_id: &str) -> NewEntity {
        NewEntity {
            display_name: name.to_string(),
            category_id: Id::from(category_id),
            data: serde_json::json!({ "beds": 12 }),
        }
    }

    #[tokio::test]
    async fn entity_submission_is_checked_against_the_active_family() {
        let session = booted(all_permissions()).await;
        let submitted = session
            .submit_entity(new_entity("Night shelter", "a2"))
            .await
            .unwrap();
        assert_eq!(submitted.category_id, Id::from("a2"));

        let err = session
            .submit_entity(new_entity("Night shelter", "b1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Validation(msg) if msg.contains("not in family")));
        let err = session
            .submit_entity(new_entity("Night shelter", "ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Validation(_)));
        let err = session
            .submit_entity(new_entity("   ", "a1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Validation(_)));

        assert_eq!(session.api().recorded.lock().unwrap().entities.len(), 1);
    }

    #[tokio::test]
    async fn submissions_require_permissions() {
        let session = booted(PublicPermissions {
            can_add_entity: false,
            can_add_comment: false,
            ..all_permissions()
        })
        .await;
        let err = session
            .submit_entity(new_entity("Night shelter", "a1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Forbidden("can_add_entity")));

        let comment = NewComment {
            entity_id: Id::from("e1"),
            author: "Ana".into(),
            text: "<p>Open tonight</p>".into(),
            data: serde_json::json!({}),
        };
        let err = session.submit_comment(comment).await.unwrap_err();
        assert!(matches!(err, ViewerError::Forbidden("can_add_comment")));

        let recorded = session.api().recorded.lock().unwrap();
        assert!(recorded.entities.is_empty());
        assert!(recorded.comments.is_empty());
    }

    #[tokio::test]
    async fn comment_submission_validates_text() {
        let session = booted(all_permissions()).await;
        let mut comment = NewComment {
            entity_id: Id::from("e1"),
            author: "Ana".into(),
            text: "<p> </p>".into(),
            data: serde_json::json!({}),
        };
        let err = session.submit_comment(comment.clone()).await.unwrap_err();
        assert!(matches!(err, ViewerError::Validation(_)));

        comment.text = "<p>Open tonight</p>".into();
        let posted = session.submit_comment(comment).await.unwrap();
        assert_eq!(posted.entity_id, Id::from("e1"));
        assert_eq!(session.api().recorded.lock().unwrap().comments.len(), 1);
    }

    #[tokio::test]
    async fn search_resolves_and_gates_filters() {
        let session = booted(all_permissions()).await;
        let page = session
            .search("shelter", Pagination { page: 2, page_size: 10 }, true)
            .await
            .unwrap();
        assert_eq!(page.response_current_page, 2);
        assert_eq!(page.entities[0].family.id, Id::from("a"));
        assert_eq!(page.entities[0].category.id, Id::from("a1"));

        let unfiltered = booted(PublicPermissions {
            can_list_with_filters: false,
            ..all_permissions()
        })
        .await;
        unfiltered
            .search("shelter", Pagination::default(), false)
            .await
            .unwrap();

        let recorded = session.api().recorded.lock().unwrap();
        let (sent, pagination) = &recorded.searches[0];
        assert_eq!(sent.filters.active_categories_ids, ids(&["a1"]));
        assert!(sent.require_locations);
        assert_eq!(pagination.page_size, 10);

        let recorded = unfiltered.api().recorded.lock().unwrap();
        assert_eq!(recorded.searches[0].0.filters, Filters::default());
    }

    #[tokio::test]
    async fn empty_query_needs_listing_permission() {
        let session = booted(PublicPermissions {
            can_list_without_query: false,
            ..all_permissions()
        })
        .await;
        let err = session
            .search("  ", Pagination::default(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::Forbidden("can_list_without_query")));
        assert!(session.search("x", Pagination::default(), false).await.is_ok());
    }
}
