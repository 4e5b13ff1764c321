use jiff::Timestamp;
use thiserror::Error;

/// Errors returned by Snowflake initialization and ID generation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid worker id {worker_id}; expected 0..={max_worker_id}")]
    InvalidWorkerId { worker_id: u64, max_worker_id: u8 },
    #[error("invalid datacenter id {datacenter_id}; expected 0..={max_datacenter_id}")]
    InvalidDatacenterId {
        datacenter_id: u64,
        max_datacenter_id: u8,
    },
    #[error("epoch is ahead of current clock time: epoch={epoch}, now={now}")]
    EpochAhead { epoch: Timestamp, now: Timestamp },
    /// Timestamps are unix milliseconds.
    #[error(
        "clock moved backwards by {}ms; refusing to generate ids until {last}",
        .last - .now
    )]
    ClockRegression { last: i64, now: i64 },
    #[error("overtime limit")]
    OverTimeLimit,
    #[error("generator state lock is poisoned")]
    StatePoisoned,
}

impl Error {
    /// How far the clock moved backwards, for [`Error::ClockRegression`].
    pub fn regression_millis(&self) -> Option<i64> {
        match self {
            Error::ClockRegression { last, now } => Some(last - now),
            _ => None,
        }
    }
}
