use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:28669";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub nominatim_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: format!("safehaven-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// `SAFEHAVEN_API_URL`, `SAFEHAVEN_NOMINATIM_URL`, `SAFEHAVEN_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("SAFEHAVEN_API_URL").unwrap_or(defaults.base_url),
            nominatim_url: env::var("SAFEHAVEN_NOMINATIM_URL").unwrap_or(defaults.nominatim_url),
            timeout: Duration::from_millis(env_var_u64("SAFEHAVEN_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)),
            user_agent: defaults.user_agent,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_nominatim_url(mut self, url: impl Into<String>) -> Self {
        self.nominatim_url = url.into();
        self
    }
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = ClientConfig::new("http://example.org")
            .with_timeout(Duration::from_secs(2))
            .with_nominatim_url("http://geo.local");
        assert_eq!(cfg.base_url, "http://example.org");
        assert_eq!(cfg.timeout, Duration::from_secs(2));
        assert_eq!(cfg.nominatim_url, "http://geo.local");
    }

    #[test]
    fn unparsable_env_values_fall_back() {
        assert_eq!(env_var_u64("SAFEHAVEN_TEST_UNSET_VARIABLE", 7), 7);
    }
}
