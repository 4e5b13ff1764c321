use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tinyurl_core::error::{Result, StorageError};
use tinyurl_core::repository::{
    DomainId, DomainRegistry, NewUrl, ReadRepository, UrlRecord, UrlRepository,
};

/// In-memory implementation of the repository and domain registry using
/// DashMap.
///
/// DashMap provides better concurrency than RwLock<HashMap> because it
/// uses sharded locks, allowing concurrent reads and writes to different
/// buckets without blocking.
#[derive(Debug)]
pub struct InMemoryRepository {
    records: DashMap<u64, UrlRecord>,
    next_id: AtomicU64,
    domains: DashMap<String, DomainId>,
    next_domain_id: AtomicU64,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
            // auto-increment keys start at 1, like a SQL store
            next_id: AtomicU64::new(1),
            domains: DashMap::new(),
            next_domain_id: AtomicU64::new(1),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert_vacant(&self, id: u64, url: NewUrl) -> Result<()> {
        match self.records.entry(id) {
            Entry::Occupied(_) => Err(StorageError::Conflict(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(UrlRecord::from_new(id, url));
                Ok(())
            }
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn get_by_id(&self, id: u64) -> Result<Option<UrlRecord>> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }
}

#[async_trait]
impl UrlRepository for InMemoryRepository {
    async fn insert(&self, url: NewUrl) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.insert_vacant(id, url)?;
        Ok(id)
    }

    async fn insert_with_id(&self, id: u64, url: NewUrl) -> Result<()> {
        self.insert_vacant(id, url)
    }
}

#[async_trait]
impl DomainRegistry for InMemoryRepository {
    async fn lookup(&self, domain: &str) -> Result<Option<DomainId>> {
        Ok(self.domains.get(domain).map(|entry| *entry.value()))
    }

    async fn register(&self, domain: &str) -> Result<DomainId> {
        let id = *self
            .domains
            .entry(domain.to_owned())
            .or_insert_with(|| self.next_domain_id.fetch_add(1, Ordering::SeqCst));
        Ok(id)
    }
}
