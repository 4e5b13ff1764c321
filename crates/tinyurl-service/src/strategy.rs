use crate::error::Result;
use std::fmt::{Display, Formatter};
use tinyurl_core::{NewUrl, UrlRepository};
use tinyurl_snowflake::{Clock, Snowflake, SystemClock};
use tracing::trace;

/// How a new record gets its id.
///
/// Pick one per deployment. Store-assigned keys count up from 1 while
/// Snowflake ids live high in the 64-bit space, but a store that has seen
/// generator-assigned ids may continue its auto-increment from them.
pub enum IdStrategy<C: Clock = SystemClock> {
    /// The store's auto-increment key becomes the id.
    StoreAssigned,
    /// The id comes from a [`Snowflake`] and the record is inserted under it.
    Snowflake(Snowflake<C>),
}

impl<C: Clock> IdStrategy<C> {
    /// Assigns an id to `url` and persists it, as one atomic store operation.
    ///
    /// The generator lock is released before the store is called.
    pub(crate) async fn insert<R: UrlRepository>(&self, repository: &R, url: NewUrl) -> Result<u64> {
        match self {
            IdStrategy::StoreAssigned => Ok(repository.insert(url).await?),
            IdStrategy::Snowflake(generator) => {
                let id = generator.next_id()?;
                trace!(id = %id, "assigned snowflake id");
                repository.insert_with_id(id.as_u64(), url).await?;
                Ok(id.as_u64())
            }
        }
    }
}

impl<C: Clock> Display for IdStrategy<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IdStrategy::StoreAssigned => write!(f, "store"),
            IdStrategy::Snowflake(_) => write!(f, "snowflake"),
        }
    }
}
