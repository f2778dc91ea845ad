//! Authenticated access to the WordPress REST API (`/wp-json/wp/v2`).

pub mod client;
pub mod error;
pub mod models;
pub mod pagination;
pub mod query;
pub mod resources;

pub use client::{API_PREFIX, ApiMethod, ApiRequest, MediaUpload, RequestBody, WpClient};
pub use error::WpError;
pub use pagination::{ListResult, PageInfo, Paginated};
pub use query::{QueryParams, QueryValue};
pub use resources::ResourceKind;
