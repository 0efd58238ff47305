//! Viewer-side session state for the SafeHaven map.
//!
//! - [`filters`]: the user's family/category/tag/enum selections and the id
//!   projections sent to the server.
//! - [`reconcile`]: set-diff merge of viewport query results into the
//!   on-screen entity and cluster collections.
//! - [`selection`]: entity detail resolution.
//! - [`session`]: the explicit session object tying it together.
//! - [`admin`]: back-office catalog state kept consistent across CRUD calls.

pub mod admin;
pub mod filters;
pub mod reconcile;
pub mod selection;
pub mod session;

#[cfg(test)]
mod fixtures;

pub use admin::*;
pub use filters::*;
pub use reconcile::*;
pub use selection::*;
pub use session::*;

use client::ClientError;
use foundation::Id;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("no families available")]
    NoFamilies,

    #[error("family not found: {0}")]
    FamilyNotFound(Id),

    #[error("session is not bootstrapped")]
    NotBootstrapped,

    #[error("missing permission: {0}")]
    Forbidden(&'static str),

    #[error("broken invariant: {0}")]
    BrokenInvariant(String),

    #[error("invalid input: {0}")]
    Validation(String),
}
