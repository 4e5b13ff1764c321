//! Storage backends for the tinyurl service.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use tinyurl_core::error::{Result, StorageError};
pub use tinyurl_core::repository::{
    DomainId, DomainRegistry, NewUrl, ReadRepository, UrlRecord, UrlRepository,
};
