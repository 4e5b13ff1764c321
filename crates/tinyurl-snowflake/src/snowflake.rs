use crate::{
    clock::{Clock, SystemClock},
    error::Error,
    SnowflakeId,
};
use jiff::Timestamp;
use std::sync::Mutex;
use tracing::{error, trace};
use typed_builder::TypedBuilder;

pub const WORKER_ID_BITS: u32 = 5;
pub const DATACENTER_ID_BITS: u32 = 5;
pub const SEQUENCE_BITS: u32 = 12;
pub const TIMESTAMP_BITS: u32 = 41;

pub const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
pub const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
pub const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

const MAX_WORKER_ID: u8 = (1 << WORKER_ID_BITS) - 1;
const MAX_DATACENTER_ID: u8 = (1 << DATACENTER_ID_BITS) - 1;
const MAX_SEQUENCE: u16 = (1 << SEQUENCE_BITS) - 1;
const MAX_TIMESTAMP_MILLIS: u64 = (1_u64 << TIMESTAMP_BITS) - 1;

/// Default epoch, 2020-07-14T10:01:01.895Z, in unix milliseconds.
pub const DEFAULT_EPOCH_MILLIS: i64 = 1_594_720_861_895;

fn default_epoch() -> Timestamp {
    Timestamp::constant(
        DEFAULT_EPOCH_MILLIS / 1_000,
        (DEFAULT_EPOCH_MILLIS % 1_000) as i32 * 1_000_000,
    )
}

/// Configures a Snowflake generator instance.
///
/// The epoch and bit layout must be identical for every instance in a
/// deployment; only the `(datacenter_id, worker_id)` pair tells them apart.
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct SnowflakeSettings {
    /// Worker index in the range `[0, 31]`.
    pub worker_id: u64,
    /// Datacenter index in the range `[0, 31]`.
    pub datacenter_id: u64,
    /// Custom epoch used as the zero point for the 41-bit timestamp field.
    #[builder(default = default_epoch())]
    pub epoch: Timestamp,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_millis: Option<i64>,
    sequence: u16,
}

enum Attempt {
    Ready(SnowflakeId),
    /// Every sequence number of `last` millisecond has been handed out.
    Exhausted { last: i64 },
}

/// Snowflake ID generator.
///
/// Rejects requests while the clock is behind the last timestamp it issued,
/// and waits for the next millisecond once the per-millisecond sequence is
/// spent. The wait happens outside the state lock.
pub struct Snowflake<C: Clock = SystemClock> {
    epoch: Timestamp,
    worker_id: u8,
    datacenter_id: u8,
    clock: C,
    state: Mutex<GeneratorState>,
}

impl Snowflake<SystemClock> {
    /// Creates a generator backed by the real system clock.
    pub fn new(settings: SnowflakeSettings) -> Result<Self, Error> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> Snowflake<C> {
    /// Creates a generator reading time from `clock`.
    pub fn with_clock(settings: SnowflakeSettings, clock: C) -> Result<Self, Error> {
        let worker_id = u8::try_from(settings.worker_id)
            .ok()
            .filter(|id| *id <= MAX_WORKER_ID)
            .ok_or(Error::InvalidWorkerId {
                worker_id: settings.worker_id,
                max_worker_id: MAX_WORKER_ID,
            })?;

        let datacenter_id = u8::try_from(settings.datacenter_id)
            .ok()
            .filter(|id| *id <= MAX_DATACENTER_ID)
            .ok_or(Error::InvalidDatacenterId {
                datacenter_id: settings.datacenter_id,
                max_datacenter_id: MAX_DATACENTER_ID,
            })?;

        let now = clock.now();
        if settings.epoch > now {
            return Err(Error::EpochAhead {
                epoch: settings.epoch,
                now,
            });
        }

        Ok(Self {
            epoch: settings.epoch,
            worker_id,
            datacenter_id,
            clock,
            state: Mutex::new(GeneratorState::default()),
        })
    }

    pub fn worker_id(&self) -> u8 {
        self.worker_id
    }

    pub fn datacenter_id(&self) -> u8 {
        self.datacenter_id
    }

    /// Generates the next unique SnowflakeId.
    ///
    /// Every id is strictly greater than the ones this instance returned
    /// before it. Fails with [`Error::ClockRegression`] while the clock reads
    /// earlier than the last issued timestamp; that state persists until wall
    /// time catches up, so callers should not retry blindly.
    pub fn next_id(&self) -> Result<SnowflakeId, Error> {
        loop {
            match self.try_next_id()? {
                Attempt::Ready(id) => return Ok(id),
                Attempt::Exhausted { last } => {
                    trace!(last, "sequence exhausted, waiting for next millisecond");
                    let next = Timestamp::from_millisecond(last + 1)
                        .map_err(|_| Error::OverTimeLimit)?;
                    self.clock.wait_until(next);
                }
            }
        }
    }

    fn try_next_id(&self) -> Result<Attempt, Error> {
        let mut state = self.state.lock().map_err(|_| Error::StatePoisoned)?;

        let now_ts = self.clock.now();
        let now = now_ts.as_millisecond();

        let sequence = match state.last_millis {
            Some(last) if now < last => {
                error!(
                    last,
                    now,
                    "clock is moving backwards, rejecting requests until {last}"
                );
                return Err(Error::ClockRegression { last, now });
            }
            Some(last) if now == last => {
                if state.sequence == MAX_SEQUENCE {
                    return Ok(Attempt::Exhausted { last });
                }
                state.sequence + 1
            }
            // first call, or a new millisecond: the sequence counter resets
            _ => 0,
        };

        let elapsed = now - self.epoch.as_millisecond();
        if elapsed < 0 {
            return Err(Error::EpochAhead {
                epoch: self.epoch,
                now: now_ts,
            });
        }
        if elapsed as u64 > MAX_TIMESTAMP_MILLIS {
            return Err(Error::OverTimeLimit);
        }

        state.sequence = sequence;
        state.last_millis = Some(now);

        Ok(Attempt::Ready(
            SnowflakeId::new()
                .with_timestamp(elapsed as u64)
                .with_datacenter_id(self.datacenter_id)
                .with_worker_id(self.worker_id)
                .with_sequence(sequence),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use jiff::SignedDuration;
    use std::collections::HashSet;
    use std::sync::Arc;

    const EPOCH_MILLIS: i64 = 1_000_000;

    fn make_generator(worker_id: u64, datacenter_id: u64) -> (Snowflake<ManualClock>, ManualClock) {
        let settings = SnowflakeSettings::builder()
            .worker_id(worker_id)
            .datacenter_id(datacenter_id)
            .epoch(Timestamp::from_millisecond(EPOCH_MILLIS).unwrap())
            .build();
        let clock = ManualClock::new(Timestamp::from_millisecond(EPOCH_MILLIS + 100).unwrap());
        let generator = Snowflake::with_clock(settings, clock.clone()).unwrap();
        (generator, clock)
    }

    #[test]
    fn first_id_has_sequence_zero() {
        let (gen, _) = make_generator(0, 0);
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 100);
    }

    #[test]
    fn same_millisecond_increments_sequence() {
        let (gen, _) = make_generator(0, 0);
        let id0 = gen.next_id().unwrap();
        let id1 = gen.next_id().unwrap();
        let id2 = gen.next_id().unwrap();
        assert_eq!(id0.sequence(), 0);
        assert_eq!(id1.sequence(), 1);
        assert_eq!(id2.sequence(), 2);
        assert_eq!(id2.timestamp(), 100);
    }

    #[test]
    fn new_millisecond_resets_sequence() {
        let (gen, clock) = make_generator(0, 0);
        gen.next_id().unwrap();
        gen.next_id().unwrap();
        clock.advance(SignedDuration::from_millis(1));
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 101);
    }

    #[test]
    fn sequence_overflow_advances_clock() {
        let (gen, clock) = make_generator(31, 31);
        // Exhaust all 4096 IDs allocated to millisecond 100.
        let mut last = None;
        for _ in 0..=MAX_SEQUENCE {
            last = Some(gen.next_id().unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.sequence(), MAX_SEQUENCE);
        assert_eq!(last.timestamp(), 100);

        // The next call must wait for millisecond 101 instead of spilling
        // into the worker and datacenter bits.
        let id = gen.next_id().unwrap();
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), 101);
        assert_eq!(id.worker_id(), 31);
        assert_eq!(id.datacenter_id(), 31);
        assert!(id > last);
        assert_eq!(clock.now().as_millisecond(), EPOCH_MILLIS + 101);
    }

    #[test]
    fn clock_regression_is_rejected() {
        let (gen, clock) = make_generator(0, 0);
        let before = gen.next_id().unwrap();
        gen.next_id().unwrap();

        clock.advance(SignedDuration::from_millis(-5));
        let err = gen.next_id().unwrap_err();
        assert_eq!(
            err,
            Error::ClockRegression {
                last: EPOCH_MILLIS + 100,
                now: EPOCH_MILLIS + 95,
            }
        );
        assert_eq!(err.regression_millis(), Some(5));

        // State is untouched: once the clock is back, the sequence continues.
        clock.advance(SignedDuration::from_millis(5));
        let after = gen.next_id().unwrap();
        assert_eq!(after.sequence(), 2);
        assert!(after > before);
    }

    #[test]
    fn worker_and_datacenter_ids_are_embedded() {
        let (gen, _) = make_generator(7, 19);
        let id = gen.next_id().unwrap();
        assert_eq!(id.worker_id(), 7);
        assert_eq!(id.datacenter_id(), 19);
        assert_eq!(
            id.as_u64(),
            (100 << TIMESTAMP_SHIFT) | (19 << DATACENTER_ID_SHIFT) | (7 << WORKER_ID_SHIFT)
        );
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let clock = ManualClock::new(Timestamp::from_millisecond(EPOCH_MILLIS).unwrap());
        let epoch = Timestamp::from_millisecond(EPOCH_MILLIS).unwrap();

        let settings = SnowflakeSettings::builder()
            .worker_id(32)
            .datacenter_id(0)
            .epoch(epoch)
            .build();
        assert_eq!(
            Snowflake::with_clock(settings, clock.clone()).err(),
            Some(Error::InvalidWorkerId {
                worker_id: 32,
                max_worker_id: 31
            })
        );

        let settings = SnowflakeSettings::builder()
            .worker_id(0)
            .datacenter_id(1 << 40)
            .epoch(epoch)
            .build();
        assert_eq!(
            Snowflake::with_clock(settings, clock).err(),
            Some(Error::InvalidDatacenterId {
                datacenter_id: 1 << 40,
                max_datacenter_id: 31
            })
        );
    }

    #[test]
    fn epoch_ahead_is_rejected() {
        let now = Timestamp::from_millisecond(EPOCH_MILLIS).unwrap();
        let settings = SnowflakeSettings::builder()
            .worker_id(0)
            .datacenter_id(0)
            .epoch(now + SignedDuration::from_secs(1))
            .build();
        let result = Snowflake::with_clock(settings, ManualClock::new(now));
        assert!(matches!(result, Err(Error::EpochAhead { .. })));
    }

    #[test]
    fn overtime_limit_returns_error() {
        let (gen, clock) = make_generator(0, 0);
        // Place the clock one millisecond past the 41-bit timestamp limit.
        let over_limit = EPOCH_MILLIS + MAX_TIMESTAMP_MILLIS as i64 + 1;
        clock.set(Timestamp::from_millisecond(over_limit).unwrap());
        assert_eq!(gen.next_id(), Err(Error::OverTimeLimit));
    }

    #[test]
    fn default_epoch_is_used_when_unset() {
        let settings = SnowflakeSettings::builder()
            .worker_id(1)
            .datacenter_id(1)
            .build();
        assert_eq!(settings.epoch.as_millisecond(), DEFAULT_EPOCH_MILLIS);

        let gen = Snowflake::new(settings).unwrap();
        let id = gen.next_id().unwrap();
        assert!(id.timestamp() > 0);
    }

    #[test]
    fn system_clock_ids_are_unique_and_increasing() {
        let settings = SnowflakeSettings::builder()
            .worker_id(3)
            .datacenter_id(2)
            .build();
        let gen = Snowflake::new(settings).unwrap();

        let mut previous = gen.next_id().unwrap();
        for _ in 0..100_000 {
            let id = gen.next_id().unwrap();
            assert!(id > previous, "{id:?} should be greater than {previous:?}");
            previous = id;
        }
    }

    #[test]
    fn concurrent_callers_never_collide() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 20_000;

        let settings = SnowflakeSettings::builder()
            .worker_id(0)
            .datacenter_id(0)
            .build();
        let gen = Arc::new(Snowflake::new(settings).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let gen = Arc::clone(&gen);
                std::thread::spawn(move || {
                    let ids: Vec<u64> = (0..PER_THREAD)
                        .map(|_| gen.next_id().unwrap().as_u64())
                        .collect();
                    // each caller observes a strictly increasing series
                    assert!(ids.windows(2).all(|w| w[0] < w[1]));
                    ids
                })
            })
            .collect();

        let mut seen = HashSet::with_capacity(THREADS * PER_THREAD);
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), THREADS * PER_THREAD);
    }
}
