use bytes::Bytes;
use protocol::ErrorResponse;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::pipeline::Pipeline;

/// JSON-over-HTTP transport shared by the viewer and admin clients.
///
/// Every call goes through the interceptor [`Pipeline`]. Non-2xx responses are
/// decoded into [`ClientError::Server`] (or [`ClientError::Unauthorized`]);
/// nothing is retried.
#[derive(Debug)]
pub struct HttpClient {
    base_url: reqwest::Url,
    http: reqwest::Client,
    pipeline: Pipeline,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = reqwest::Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(format!("{base_url} cannot be a base")));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .build()?;
        Ok(Self {
            base_url,
            http,
            pipeline: Pipeline::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Appends `path` to the base URL, one percent-encoded segment each.
    pub fn url(&self, path: &[&str]) -> Result<reqwest::Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ResponseBody, ClientError> {
        let url = self.url(path)?;
        let path = url.path().to_string();
        let mut builder = self.http.request(method.clone(), url);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let mut request = builder.build()?;
        self.pipeline.apply_request(&mut request);

        trace!(%method, path = %path, "sending request");
        let response = self.http.execute(request).await?;
        let status = response.status();
        self.pipeline.apply_response(status, response.headers());

        let bytes = response.bytes().await?;
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let (error_code, details) = match serde_json::from_slice::<ErrorResponse>(&bytes) {
                Ok(e) => (e.error_code, e.details),
                Err(_) => (
                    "unknown_error".to_string(),
                    Some(String::from_utf8_lossy(&bytes).into_owned()).filter(|s| !s.is_empty()),
                ),
            };
            debug!(%method, path = %path, %status, error_code, "request failed");
            return Err(ClientError::Server {
                status,
                error_code,
                details,
            });
        }
        Ok(ResponseBody(bytes))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        self.execute::<()>(Method::GET, path, query, None)
            .await?
            .decode()
    }

    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, String)],
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(method, path, query, Some(body))
            .await?
            .decode()
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T, ClientError> {
        self.execute::<()>(Method::DELETE, path, &[], None)
            .await?
            .decode()
    }

    /// For endpoints whose success body is irrelevant.
    pub async fn send_empty<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &[&str],
        body: Option<&B>,
    ) -> Result<(), ClientError> {
        self.execute(method, path, &[], body).await.map(|_| ())
    }
}

struct ResponseBody(Bytes);

impl ResponseBody {
    fn decode<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        Ok(serde_json::from_slice(&self.0)?)
    }
}
