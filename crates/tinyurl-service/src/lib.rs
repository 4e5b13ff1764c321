//! URL shortener service implementation.
//!
//! [`UrlService`] mints `<domain><code>` short URLs and resolves codes back
//! to the original URL. Core types are re-exported from `tinyurl_core`.

pub mod error;
pub mod service;
pub mod strategy;

pub use error::{Result, UrlServiceError};
pub use service::{parse_expire_date, GenerateRequest, Shortener, UrlService};
pub use strategy::IdStrategy;
pub use tinyurl_core::{merge_query, ShortCode};
