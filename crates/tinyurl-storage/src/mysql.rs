use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tinyurl_core::error::{Result, StorageError};
use tinyurl_core::repository::{
    DomainId, DomainRegistry, NewUrl, ReadRepository, UrlRecord, UrlRepository,
};
use tracing::debug;

const DOMAIN_DDL: &str = include_str!("../ddl/mysql/domain.sql");
const URL_DDL: &str = include_str!("../ddl/mysql/url.sql");

/// MySQL implementation of the repository and domain registry contracts.
///
/// Every insert runs in its own transaction; if any statement fails the
/// transaction is dropped uncommitted and MySQL rolls it back, so an id is
/// never visible without its record. Timestamps are stored as unix
/// milliseconds.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    /// Creates a repository from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Creates the `domain` and `url` tables if they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        for ddl in [DOMAIN_DDL, URL_DDL] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        debug!("mysql schema is ready");
        Ok(())
    }
}

fn to_timestamp(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
    })
}

fn record_from_row(row: &MySqlRow) -> Result<UrlRecord> {
    let id: u64 = row.try_get("id").map_err(map_sqlx_error)?;
    let origin_url: String = row.try_get("origin_url").map_err(map_sqlx_error)?;
    let create_time: i64 = row.try_get("create_time").map_err(map_sqlx_error)?;
    let expire_time: Option<i64> = row.try_get("expire_time").map_err(map_sqlx_error)?;
    let domain: String = row.try_get("domain").map_err(map_sqlx_error)?;

    Ok(UrlRecord {
        id,
        origin_url,
        create_time: to_timestamp("create_time", create_time)?,
        expire_time: expire_time
            .map(|millis| to_timestamp("expire_time", millis))
            .transpose()?,
        domain,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn get_by_id(&self, id: u64) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, origin_url, create_time, expire_time, domain
            FROM url
            WHERE id = ?
            LIMIT 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(record_from_row).transpose()
    }
}

#[async_trait]
impl UrlRepository for MySqlRepository {
    async fn insert(&self, url: NewUrl) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            INSERT INTO url (origin_url, create_time, expire_time, domain)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(url.origin_url)
        .bind(url.create_time.as_millisecond())
        .bind(url.expire_time.map(|ts| ts.as_millisecond()))
        .bind(url.domain)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_id();
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(id)
    }

    async fn insert_with_id(&self, id: u64, url: NewUrl) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            INSERT INTO url (id, origin_url, create_time, expire_time, domain)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(url.origin_url)
        .bind(url.create_time.as_millisecond())
        .bind(url.expire_time.map(|ts| ts.as_millisecond()))
        .bind(url.domain)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Conflict(id.to_string()))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        }

        tx.commit().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl DomainRegistry for MySqlRepository {
    async fn lookup(&self, domain: &str) -> Result<Option<DomainId>> {
        let row = sqlx::query(
            r#"
            SELECT id
            FROM domain
            WHERE domain = ?
            LIMIT 1
            "#,
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| row.try_get("id").map_err(map_sqlx_error))
            .transpose()
    }

    async fn register(&self, domain: &str) -> Result<DomainId> {
        // LAST_INSERT_ID(id) makes an existing row report its own id
        let result = sqlx::query(
            r#"
            INSERT INTO domain (domain, create_time)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE id = LAST_INSERT_ID(id)
            "#,
        )
        .bind(domain)
        .bind(Timestamp::now().as_millisecond())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.last_insert_id())
    }
}
