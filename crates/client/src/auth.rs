use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue, StatusCode};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::pipeline::{Control, Interceptor};

/// Raw access token, sent so the server can mint a fresh signed token when
/// the current one has expired.
pub const PLAIN_ACCESS_TOKEN_HEADER: &str = "x-sh-plain-accesstoken";
/// Response header carrying a renewed signed token.
pub const RENEW_TOKEN_HEADER: &str = "x-sh-renew-token";

pub type AuthFailureCallback = Arc<dyn Fn() + Send + Sync>;

/// Viewer authentication: bearer token plus renewal handling.
///
/// A 401 calls the failure callback once and ejects the interceptor, so later
/// requests go out unauthenticated instead of looping on a dead token.
pub struct BearerAuth {
    signed_token: RwLock<String>,
    access_token: String,
    on_auth_error: AuthFailureCallback,
}

impl BearerAuth {
    pub fn new(
        signed_token: impl Into<String>,
        access_token: impl Into<String>,
        on_auth_error: AuthFailureCallback,
    ) -> Self {
        Self {
            signed_token: RwLock::new(signed_token.into()),
            access_token: access_token.into(),
            on_auth_error,
        }
    }

    pub fn signed_token(&self) -> String {
        self.signed_token.read().clone()
    }
}

impl Interceptor for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    fn on_request(&self, request: &mut reqwest::Request) {
        let bearer = format!("Bearer {}", self.signed_token.read());
        match HeaderValue::from_str(&bearer) {
            Ok(v) => {
                request.headers_mut().insert(AUTHORIZATION, v);
            }
            Err(_) => warn!("signed token is not a valid header value"),
        }
        if let Ok(v) = HeaderValue::from_str(&self.access_token) {
            request.headers_mut().insert(PLAIN_ACCESS_TOKEN_HEADER, v);
        }
    }

    fn on_response(&self, status: StatusCode, headers: &HeaderMap) -> Control {
        if let Some(renewed) = headers.get(RENEW_TOKEN_HEADER) {
            match renewed.to_str() {
                Ok(token) if !token.is_empty() => {
                    debug!("adopting renewed signed token");
                    *self.signed_token.write() = token.to_string();
                }
                _ => warn!("ignoring malformed {RENEW_TOKEN_HEADER} header"),
            }
        }

        if status == StatusCode::UNAUTHORIZED {
            warn!("viewer token rejected; dropping authentication");
            (self.on_auth_error)();
            return Control::Eject;
        }
        Control::Keep
    }
}

/// Admin session watcher: cookies carry the credentials, this only routes
/// 401s to the recovery callback (typically a redirect to the login page).
pub struct SessionExpiry {
    on_auth_error: AuthFailureCallback,
}

impl SessionExpiry {
    pub fn new(on_auth_error: AuthFailureCallback) -> Self {
        Self { on_auth_error }
    }
}

impl Interceptor for SessionExpiry {
    fn name(&self) -> &'static str {
        "admin-session-expiry"
    }

    fn on_response(&self, status: StatusCode, _headers: &HeaderMap) -> Control {
        if status == StatusCode::UNAUTHORIZED {
            warn!("admin session rejected");
            (self.on_auth_error)();
        }
        Control::Keep
    }
}
