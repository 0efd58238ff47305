//! Wire types for the SafeHaven REST API.
//!
//! Everything here is plain serde data: request bodies the client sends and
//! response payloads it decodes. No behavior beyond small conveniences.

pub mod admin;
pub mod bootstrap;
pub mod entity;
pub mod error;
pub mod filters;
pub mod options;
pub mod search;
pub mod view;

pub use admin::*;
pub use bootstrap::*;
pub use entity::*;
pub use error::*;
pub use filters::*;
pub use options::*;
pub use search::*;
pub use view::*;
