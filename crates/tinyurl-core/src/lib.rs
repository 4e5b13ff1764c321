//! Core types and traits for the tinyurl service.
//!
//! This crate holds the base62 short-code codec and the storage contracts
//! shared by the service and its storage backends.

pub mod base62;
pub mod error;
pub mod redirect;
pub mod repository;
pub mod shortcode;

pub use error::{CodecError, Result, StorageError};
pub use redirect::merge_query;
pub use repository::{DomainId, DomainRegistry, NewUrl, ReadRepository, UrlRecord, UrlRepository};
pub use shortcode::ShortCode;
