//! Back-office API. Authentication is a session cookie set by the login call;
//! the [`SessionExpiry`] interceptor routes 401s to the recovery callback.

use std::sync::Arc;

use catalog::{Category, Family, Tag};
use foundation::Id;
use protocol::{
    AdminUserTokenClaims, ConfigurationOption, EntitiesCommentsCounts, LoginRequest,
    NewOrUpdateCategory, NewOrUpdateFamily, NewOrUpdateTag, SafeHavenOptions, SafeHavenVersion,
};
use reqwest::Method;
use tracing::info;

use crate::auth::SessionExpiry;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::HttpClient;

pub struct AdminClient {
    http: HttpClient,
}

impl AdminClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    pub fn with_auth_failure(self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.http
            .pipeline()
            .push(Arc::new(SessionExpiry::new(Arc::new(callback))));
        self
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    // Session

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<AdminUserTokenClaims, ClientError> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            remember_me,
        };
        let claims: AdminUserTokenClaims = self
            .http
            .send_json(Method::POST, &["api", "admin", "session"], &[], &body)
            .await?;
        info!(username, is_admin = claims.is_admin, "admin logged in");
        Ok(claims)
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        self.http
            .send_empty::<()>(Method::DELETE, &["api", "admin", "session"], None)
            .await
    }

    /// `Ok(None)` when there is no valid session.
    pub async fn check_login(&self) -> Result<Option<AdminUserTokenClaims>, ClientError> {
        match self.http.get_json(&["api", "admin", "session"], &[]).await {
            Ok(claims) => Ok(Some(claims)),
            Err(ClientError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // Families

    pub async fn list_families(&self) -> Result<Vec<Family>, ClientError> {
        self.http.get_json(&["api", "admin", "families"], &[]).await
    }

    pub async fn create_family(&self, family: &NewOrUpdateFamily) -> Result<Family, ClientError> {
        self.http
            .send_json(Method::POST, &["api", "admin", "families"], &[], family)
            .await
    }

    pub async fn update_family(
        &self,
        id: &Id,
        family: &NewOrUpdateFamily,
    ) -> Result<Family, ClientError> {
        self.http
            .send_json(Method::PUT, &["api", "admin", "families", id.as_str()], &[], family)
            .await
    }

    pub async fn delete_family(&self, id: &Id) -> Result<(), ClientError> {
        self.http
            .send_empty::<()>(Method::DELETE, &["api", "admin", "families", id.as_str()], None)
            .await
    }

    // Categories

    pub async fn list_categories(&self) -> Result<Vec<Category>, ClientError> {
        self.http.get_json(&["api", "admin", "categories"], &[]).await
    }

    pub async fn create_category(
        &self,
        category: &NewOrUpdateCategory,
    ) -> Result<Category, ClientError> {
        self.http
            .send_json(Method::POST, &["api", "admin", "categories"], &[], category)
            .await
    }

    pub async fn update_category(
        &self,
        id: &Id,
        category: &NewOrUpdateCategory,
    ) -> Result<Category, ClientError> {
        self.http
            .send_json(Method::PUT, &["api", "admin", "categories", id.as_str()], &[], category)
            .await
    }

    pub async fn delete_category(&self, id: &Id) -> Result<(), ClientError> {
        self.http
            .send_empty::<()>(Method::DELETE, &["api", "admin", "categories", id.as_str()], None)
            .await
    }

    // Tags

    pub async fn list_tags(&self) -> Result<Vec<Tag>, ClientError> {
        self.http.get_json(&["api", "admin", "tags"], &[]).await
    }

    pub async fn create_tag(&self, tag: &NewOrUpdateTag) -> Result<Tag, ClientError> {
        self.http
            .send_json(Method::POST, &["api", "admin", "tags"], &[], tag)
            .await
    }

    pub async fn update_tag(&self, id: &Id, tag: &NewOrUpdateTag) -> Result<Tag, ClientError> {
        self.http
            .send_json(Method::PUT, &["api", "admin", "tags", id.as_str()], &[], tag)
            .await
    }

    pub async fn delete_tag(&self, id: &Id) -> Result<(), ClientError> {
        self.http
            .send_empty::<()>(Method::DELETE, &["api", "admin", "tags", id.as_str()], None)
            .await
    }

    // Stats

    pub async fn entities_comments_counts(&self) -> Result<EntitiesCommentsCounts, ClientError> {
        self.http.get_json(&["api", "admin", "stats", "counts"], &[]).await
    }

    // Options

    pub async fn options(&self) -> Result<SafeHavenOptions, ClientError> {
        self.http.get_json(&["api", "admin", "options"], &[]).await
    }

    /// Saves one option group and returns the whole option set.
    pub async fn update_option(
        &self,
        option: &ConfigurationOption,
    ) -> Result<SafeHavenOptions, ClientError> {
        self.http
            .send_json(Method::PUT, &["api", "admin", "options", option.name()], &[], option)
            .await
    }

    /// Restores the server default of one option group.
    pub async fn delete_option(&self, name: &str) -> Result<SafeHavenOptions, ClientError> {
        self.http
            .delete_json(&["api", "admin", "options", name])
            .await
    }

    pub async fn version(&self) -> Result<SafeHavenVersion, ClientError> {
        self.http.get_json(&["api", "version"], &[]).await
    }
}
