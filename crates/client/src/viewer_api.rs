//! Public map API: status, bootstrap, viewport queries, entity detail, search
//! and public submissions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use foundation::Id;
use parking_lot::Mutex;
use protocol::{
    BootstrapResponse, EntitiesAndClusters, FetchEntityRequest, FetchedEntity, NewComment,
    NewCommentRequest, NewEntity, NewEntityRequest, Paginated, Pagination, PublicComment,
    SearchRequest, SearchedEntity, StatusResponse, SubmittedEntity, ViewRequest,
};
use reqwest::Method;
use tracing::{debug, info};

use crate::auth::{AuthFailureCallback, BearerAuth};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::HttpClient;
use crate::pipeline::InterceptorId;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of the entities and clusters visible in a viewport.
///
/// The result is always the complete set for the request, never a delta.
pub trait BoundsFetcher: Send + Sync {
    fn fetch_view(&self, request: ViewRequest)
    -> BoxFuture<'_, Result<EntitiesAndClusters, ClientError>>;
}

/// Everything the viewer session needs from the server.
pub trait ViewerApi: BoundsFetcher {
    fn check_status(&self) -> BoxFuture<'_, Result<StatusResponse, ClientError>>;

    /// Fetches the catalog for `token`. Credentials are not adopted here.
    fn bootstrap<'a>(
        &'a self,
        token: &'a str,
        referrer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<BootstrapResponse, ClientError>>;

    /// Authenticates every later request with the given tokens, replacing
    /// any previous ones.
    fn adopt_credentials(&self, signed_token: &str, access_token: &str);

    fn fetch_entity<'a>(
        &'a self,
        id: &'a Id,
        request: FetchEntityRequest,
    ) -> BoxFuture<'a, Result<FetchedEntity, ClientError>>;

    fn search(
        &self,
        request: SearchRequest,
        pagination: Pagination,
    ) -> BoxFuture<'_, Result<Paginated<SearchedEntity>, ClientError>>;

    fn submit_entity(&self, entity: NewEntity)
    -> BoxFuture<'_, Result<SubmittedEntity, ClientError>>;

    fn submit_comment(&self, comment: NewComment)
    -> BoxFuture<'_, Result<PublicComment, ClientError>>;
}

/// HTTP implementation of [`ViewerApi`].
pub struct ViewerClient {
    http: HttpClient,
    auth: Mutex<Option<InterceptorId>>,
    on_auth_error: AuthFailureCallback,
}

impl ViewerClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(config)?,
            auth: Mutex::new(None),
            on_auth_error: Arc::new(|| {}),
        })
    }

    /// Called when the server rejects the viewer token.
    pub fn with_auth_failure(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_auth_error = Arc::new(callback);
        self
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth
            .lock()
            .is_some_and(|id| self.http.pipeline().contains(id))
    }

    fn ensure_authenticated(&self) -> Result<(), ClientError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }

    pub fn adopt_credentials(&self, signed_token: &str, access_token: &str) {
        let mut slot = self.auth.lock();
        if let Some(previous) = slot.take() {
            self.http.pipeline().eject(previous);
        }
        let interceptor = BearerAuth::new(signed_token, access_token, self.on_auth_error.clone());
        *slot = Some(self.http.pipeline().push(Arc::new(interceptor)));
        debug!("viewer credentials installed");
    }

    pub async fn check_status(&self) -> Result<StatusResponse, ClientError> {
        self.http.get_json(&["api", "status"], &[]).await
    }

    pub async fn bootstrap(
        &self,
        token: &str,
        referrer: Option<&str>,
    ) -> Result<BootstrapResponse, ClientError> {
        let query = [("referrer", referrer.unwrap_or_default().to_string())];
        let data: BootstrapResponse = self
            .http
            .get_json(&["api", "bootstrap", token], &query)
            .await?;
        info!(
            families = data.families.len(),
            categories = data.categories.len(),
            tags = data.tags.len(),
            "fetched bootstrap data"
        );
        Ok(data)
    }

    pub async fn fetch_view(
        &self,
        request: &ViewRequest,
    ) -> Result<EntitiesAndClusters, ClientError> {
        self.ensure_authenticated()?;
        debug!("{request}");
        self.http
            .send_json(Method::POST, &["api", "map", "view"], &[], request)
            .await
    }

    pub async fn fetch_entity(
        &self,
        id: &Id,
        request: &FetchEntityRequest,
    ) -> Result<FetchedEntity, ClientError> {
        self.ensure_authenticated()?;
        self.http
            .send_json(Method::POST, &["api", "map", "entities", id.as_str()], &[], request)
            .await
    }

    pub async fn search(
        &self,
        request: &SearchRequest,
        pagination: Pagination,
    ) -> Result<Paginated<SearchedEntity>, ClientError> {
        self.ensure_authenticated()?;
        let query = [
            ("page", pagination.page.to_string()),
            ("page_size", pagination.page_size.to_string()),
        ];
        self.http
            .send_json(Method::POST, &["api", "map", "search"], &query, request)
            .await
    }

    pub async fn submit_entity(&self, entity: NewEntity) -> Result<SubmittedEntity, ClientError> {
        self.ensure_authenticated()?;
        let submitted: SubmittedEntity = self
            .http
            .send_json(
                Method::POST,
                &["api", "map", "entities"],
                &[],
                &NewEntityRequest { entity },
            )
            .await?;
        info!(entity = %submitted.id, "entity submitted");
        Ok(submitted)
    }

    pub async fn submit_comment(&self, comment: NewComment) -> Result<PublicComment, ClientError> {
        self.ensure_authenticated()?;
        let submitted: PublicComment = self
            .http
            .send_json(
                Method::POST,
                &["api", "map", "comments"],
                &[],
                &NewCommentRequest { comment },
            )
            .await?;
        info!(comment = %submitted.id, entity = %submitted.entity_id, "comment submitted");
        Ok(submitted)
    }
}

impl BoundsFetcher for ViewerClient {
    fn fetch_view(
        &self,
        request: ViewRequest,
    ) -> BoxFuture<'_, Result<EntitiesAndClusters, ClientError>> {
        Box::pin(async move { ViewerClient::fetch_view(self, &request).await })
    }
}

impl ViewerApi for ViewerClient {
    fn check_status(&self) -> BoxFuture<'_, Result<StatusResponse, ClientError>> {
        Box::pin(ViewerClient::check_status(self))
    }

    fn bootstrap<'a>(
        &'a self,
        token: &'a str,
        referrer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<BootstrapResponse, ClientError>> {
        Box::pin(ViewerClient::bootstrap(self, token, referrer))
    }

    fn adopt_credentials(&self, signed_token: &str, access_token: &str) {
        ViewerClient::adopt_credentials(self, signed_token, access_token)
    }

    fn fetch_entity<'a>(
        &'a self,
        id: &'a Id,
        request: FetchEntityRequest,
    ) -> BoxFuture<'a, Result<FetchedEntity, ClientError>> {
        Box::pin(async move { ViewerClient::fetch_entity(self, id, &request).await })
    }

    fn search(
        &self,
        request: SearchRequest,
        pagination: Pagination,
    ) -> BoxFuture<'_, Result<Paginated<SearchedEntity>, ClientError>> {
        Box::pin(async move { ViewerClient::search(self, &request, pagination).await })
    }

    fn submit_entity(
        &self,
        entity: NewEntity,
    ) -> BoxFuture<'_, Result<SubmittedEntity, ClientError>> {
        Box::pin(ViewerClient::submit_entity(self, entity))
    }

    fn submit_comment(
        &self,
        comment: NewComment,
    ) -> BoxFuture<'_, Result<PublicComment, ClientError>> {
        Box::pin(ViewerClient::submit_comment(self, comment))
    }
}
