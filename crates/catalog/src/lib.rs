pub mod collection;
pub mod index;
pub mod model;
pub mod preferences;
pub mod validation;

pub use collection::*;
pub use index::*;
pub use model::*;
pub use preferences::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    StorageUnavailable,
    Io(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::StorageUnavailable => write!(f, "browser storage unavailable"),
            CatalogError::Io(msg) => write!(f, "preference storage error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}
