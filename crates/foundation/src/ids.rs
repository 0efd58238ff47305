use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque server-assigned identifier.
///
/// The API hands out UUIDs, but the client never interprets them: equality is
/// the only operation that matters, so the raw string is kept as-is.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(raw: impl Into<String>) -> Self {
        Id(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(raw: &str) -> Self {
        Id(raw.to_string())
    }
}

impl From<String> for Id {
    fn from(raw: String) -> Self {
        Id(raw)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
