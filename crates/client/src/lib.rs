pub mod admin_api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod nominatim;
pub mod pipeline;
pub mod viewer_api;

pub use admin_api::AdminClient;
pub use auth::{BearerAuth, SessionExpiry};
pub use config::ClientConfig;
pub use ::http::StatusCode;
pub use error::ClientError;
pub use http::HttpClient;
pub use nominatim::{GeocodeResult, Geocoder};
pub use pipeline::{Control, Interceptor, InterceptorId, Pipeline};
pub use viewer_api::{BoundsFetcher, BoxFuture, ViewerApi, ViewerClient};
