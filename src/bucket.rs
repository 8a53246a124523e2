//! Fixed-grid time bucketing
//!
//! Buckets are aligned to the Unix epoch, which puts every 5-minute
//! boundary on the wall-clock grid `:00, :05, :10, ...` of every hour.

use core::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::sample::Timestamp;

/// Width of one history bucket in seconds
pub const BUCKET_WIDTH_SECS: u32 = 300;

/// Start of the fixed-width interval that contains a timestamp
///
/// Two samples with equal keys belong to the same historical point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey(Timestamp);

impl BucketKey {
    /// The instant at which this bucket starts
    pub const fn start(self) -> Timestamp {
        self.0
    }
}

impl Display for BucketKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "bucket@{}", self.0)
    }
}

/// Bucket key on the default 5-minute grid
pub fn bucket_key(timestamp: Timestamp) -> BucketKey {
    bucket_key_with_width(timestamp, BUCKET_WIDTH_SECS)
}

/// Floor `timestamp` to the start of its `width_secs`-wide interval.
///
/// Total for every input: a zero width is treated as one second, and
/// instants before the epoch floor towards negative infinity. The first,
/// partial window of the `i64` range keys to `i64::MIN` itself.
pub fn bucket_key_with_width(timestamp: Timestamp, width_secs: u32) -> BucketKey {
    let width_ms = i64::from(width_secs.max(1)) * 1000;
    let millis = timestamp.as_millis();
    BucketKey(Timestamp::from_millis(millis.saturating_sub(millis.rem_euclid(width_ms))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: i64, m: i64, s: i64) -> Timestamp {
        Timestamp::from_secs(h * 3600 + m * 60 + s)
    }

    #[test]
    fn test_floors_to_five_minute_grid() {
        assert_eq!(bucket_key(at(12, 3, 0)).start(), at(12, 0, 0));
        assert_eq!(bucket_key(at(12, 4, 59)).start(), at(12, 0, 0));
        assert_eq!(bucket_key(at(12, 5, 0)).start(), at(12, 5, 0));
        assert_eq!(bucket_key(at(12, 59, 59)).start(), at(12, 55, 0));
    }

    #[test]
    fn test_sub_second_precision_is_dropped() {
        let ts = at(12, 7, 12).offset_millis(999);
        assert_eq!(bucket_key(ts).start(), at(12, 5, 0));
    }

    #[test]
    fn test_same_window_same_key() {
        let window_start = at(8, 25, 0);
        let key = bucket_key(window_start);
        for offset_secs in [1, 59, 60, 150, 299] {
            assert_eq!(bucket_key(window_start.offset_millis(offset_secs * 1000)), key);
        }
        assert_ne!(bucket_key(window_start.offset_millis(300 * 1000)), key);
    }

    #[test]
    fn test_grid_is_fixed_not_sliding() {
        // 12:04:59 and 12:05:01 are two seconds apart but in different windows
        assert_ne!(bucket_key(at(12, 4, 59)), bucket_key(at(12, 5, 1)));
    }

    #[test]
    fn test_pre_epoch_floors_downwards() {
        let ts = Timestamp::from_secs(-1);
        assert_eq!(bucket_key(ts).start(), Timestamp::from_secs(-300));
    }

    #[test]
    fn test_earliest_instant_keys_to_minimum() {
        let earliest = Timestamp::from_millis(i64::MIN);
        let key = bucket_key(earliest);

        assert_eq!(key.start(), earliest);
        assert_eq!(bucket_key(earliest.offset_millis(1)), key);
        assert!(key < bucket_key(Timestamp::from_secs(0)));
        assert_eq!(bucket_key_with_width(earliest, u32::MAX).start(), earliest);
    }

    #[test]
    fn test_latest_instant_keys_below_it() {
        let latest = Timestamp::from_millis(i64::MAX);
        assert!(bucket_key(latest).start() <= latest);
    }

    #[test]
    fn test_zero_width_is_total() {
        let ts = at(1, 2, 3).offset_millis(400);
        assert_eq!(bucket_key_with_width(ts, 0).start(), at(1, 2, 3));
    }
}
