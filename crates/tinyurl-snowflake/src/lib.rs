//! Time-ordered 64-bit identifiers for the tinyurl service.
//!
//! A [`Snowflake`] hands out [`SnowflakeId`]s that never repeat and never go
//! backwards for a given `(datacenter_id, worker_id)` pair.

mod clock;
pub mod error;
mod snowflake;
mod snowflake_id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Error;
pub use snowflake::{
    Snowflake, SnowflakeSettings, DATACENTER_ID_BITS, DATACENTER_ID_SHIFT, DEFAULT_EPOCH_MILLIS,
    SEQUENCE_BITS, TIMESTAMP_BITS, TIMESTAMP_SHIFT, WORKER_ID_BITS, WORKER_ID_SHIFT,
};
pub use snowflake_id::SnowflakeId;
