use crate::error::Result;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Identifier of a registered short-URL domain.
pub type DomainId = u64;

/// A URL mapping about to be stored; the id is assigned on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUrl {
    /// The original URL that was shortened.
    pub origin_url: String,
    pub create_time: Timestamp,
    /// When the record expires, if ever.
    pub expire_time: Option<Timestamp>,
    /// The domain the short URL is served under, e.g. `t.ly/`.
    pub domain: String,
}

/// A stored URL record in the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub id: u64,
    pub origin_url: String,
    pub create_time: Timestamp,
    pub expire_time: Option<Timestamp>,
    pub domain: String,
}

impl UrlRecord {
    pub fn from_new(id: u64, url: NewUrl) -> Self {
        Self {
            id,
            origin_url: url.origin_url,
            create_time: url.create_time,
            expire_time: url.expire_time,
            domain: url.domain,
        }
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expire_time.is_some_and(|expire_time| now >= expire_time)
    }
}

/// A read-only view of a repository.
#[async_trait]
pub trait ReadRepository: Send + Sync + 'static {
    /// Retrieves the URL record with the given id.
    /// Returns `None` if the id does not exist.
    async fn get_by_id(&self, id: u64) -> Result<Option<UrlRecord>>;
}

/// Storage for URL records.
///
/// Each insert is atomic: either the record is stored under its id or
/// nothing is stored.
#[async_trait]
pub trait UrlRepository: ReadRepository {
    /// Inserts a record under a store-assigned, auto-incremented id and
    /// returns that id.
    async fn insert(&self, url: NewUrl) -> Result<u64>;

    /// Inserts a record under a caller-assigned id.
    /// Returns `Err(Conflict)` if the id already exists.
    async fn insert_with_id(&self, id: u64, url: NewUrl) -> Result<()>;
}

/// The set of domains short URLs may be minted under.
#[async_trait]
pub trait DomainRegistry: Send + Sync + 'static {
    /// Returns the registration id of `domain`, or `None` if it is unknown.
    async fn lookup(&self, domain: &str) -> Result<Option<DomainId>>;

    /// Registers `domain`, returning its id. Registering twice returns the
    /// existing id.
    async fn register(&self, domain: &str) -> Result<DomainId>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn record(expire_time: Option<Timestamp>) -> UrlRecord {
        UrlRecord::from_new(
            1,
            NewUrl {
                origin_url: "https://example.com".to_string(),
                create_time: Timestamp::now(),
                expire_time,
                domain: "t.ly/".to_string(),
            },
        )
    }

    #[test]
    fn never_expires_without_expire_time() {
        assert!(!record(None).is_expired_at(Timestamp::MAX));
    }

    #[test]
    fn expires_at_expire_time() {
        let expire = Timestamp::now() + SignedDuration::from_hours(1);
        let rec = record(Some(expire));
        assert!(!rec.is_expired_at(expire - SignedDuration::from_secs(1)));
        assert!(rec.is_expired_at(expire));
    }
}
