use modular_bitfield::prelude::*;
use std::cmp::Ordering;
use std::fmt;

/// A 64-bit, time-ordered identifier.
///
/// Fields are declared from the least significant bit upwards, so the packed
/// value reads (high to low) as
/// `0 | timestamp:41 | datacenter_id:5 | worker_id:5 | sequence:12`.
#[bitfield]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnowflakeId {
    /// 12 bits for sequence number (resets every millisecond).
    pub sequence: B12,
    /// 5 bits for worker ID (allows up to 32 workers per datacenter).
    pub worker_id: B5,
    /// 5 bits for datacenter ID (allows up to 32 datacenters).
    pub datacenter_id: B5,
    /// 41 bits for timestamp (milliseconds since a custom epoch).
    pub timestamp: B41,
    // sign bit, always zero
    #[skip]
    __: B1,
}

impl SnowflakeId {
    pub fn as_u64(self) -> u64 {
        u64::from_le_bytes(self.into_bytes())
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.as_u64()
    }
}

impl From<u64> for SnowflakeId {
    fn from(value: u64) -> Self {
        SnowflakeId::from_bytes(value.to_le_bytes())
    }
}

impl PartialOrd for SnowflakeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SnowflakeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_u64().cmp(&other.as_u64())
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_fields_high_to_low() {
        let id = SnowflakeId::new()
            .with_timestamp(0x1_2345_6789)
            .with_datacenter_id(0b10101)
            .with_worker_id(0b00111)
            .with_sequence(0xABC);

        let expected = (0x1_2345_6789_u64 << 22) | (0b10101 << 17) | (0b00111 << 12) | 0xABC;
        assert_eq!(id.as_u64(), expected);
    }

    #[test]
    fn sign_bit_stays_clear_at_max_timestamp() {
        let id = SnowflakeId::new().with_timestamp((1_u64 << 41) - 1);
        assert_eq!(id.as_u64() >> 63, 0);
    }

    #[test]
    fn converts_back_from_u64() {
        let raw = (1_000_u64 << 22) | (3 << 17) | (9 << 12) | 42;
        let id = SnowflakeId::from(raw);
        assert_eq!(id.timestamp(), 1_000);
        assert_eq!(id.datacenter_id(), 3);
        assert_eq!(id.worker_id(), 9);
        assert_eq!(id.sequence(), 42);
        assert_eq!(u64::from(id), raw);
    }

    #[test]
    fn orders_by_packed_value() {
        let earlier = SnowflakeId::new().with_timestamp(10).with_sequence(4095);
        let later = SnowflakeId::new().with_timestamp(11);
        assert!(earlier < later);
        assert_eq!(later.to_string(), (11_u64 << 22).to_string());
    }
}
