//! Bounded, bucketed history of telemetry samples
//!
//! The buffer is stored newest-first: the front entry is the most recent
//! bucket and is the only one that late updates may overwrite. Keys are
//! strictly decreasing from front to back and never repeat.
//!
//! ## Merge rules
//!
//! | New sample's bucket       | Effect                                            |
//! |---------------------------|---------------------------------------------------|
//! | buffer empty              | becomes the only entry                            |
//! | equal to the front bucket | front sample replaced, original timestamp kept    |
//! | newer than the front      | prepended; oldest entries evicted past capacity   |
//! | older than the front      | discarded, buffer untouched                       |

extern crate alloc;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use log::debug;

use crate::bucket::{BUCKET_WIDTH_SECS, BucketKey, bucket_key_with_width};
use crate::sample::TelemetrySample;

/// Maximum number of buckets retained in the history
pub const MAX_POINTS: usize = 1000;

/// One consolidated historical point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub bucket: BucketKey,
    pub sample: TelemetrySample,
}

/// What a merge did to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new bucket was added at the front; `evicted` old buckets were dropped
    Appended { evicted: usize },
    /// The front bucket's sample was overwritten in place
    Updated,
    /// The sample belongs to a bucket older than the front and was dropped
    DiscardedStale,
}

/// Ring of bucketed samples, newest first
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    bucket_width_secs: u32,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(MAX_POINTS, BUCKET_WIDTH_SECS)
    }
}

impl HistoryBuffer {
    /// Create an empty buffer
    pub fn new(capacity: usize, bucket_width_secs: u32) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_POINTS)),
            capacity: capacity.max(1),
            bucket_width_secs,
        }
    }

    /// Build a buffer from a bulk historical load.
    ///
    /// Input order is arbitrary. Within a bucket the sample encountered last
    /// wins outright. No capacity trimming happens here; the next append
    /// brings the buffer back within bounds.
    pub fn seed<I>(samples: I, capacity: usize, bucket_width_secs: u32) -> Self
    where
        I: IntoIterator<Item = TelemetrySample>,
    {
        let mut by_bucket: BTreeMap<BucketKey, TelemetrySample> = BTreeMap::new();
        for sample in samples {
            by_bucket.insert(bucket_key_with_width(sample.timestamp, bucket_width_secs), sample);
        }

        let mut buffer = Self::new(capacity, bucket_width_secs);
        buffer.entries = by_bucket
            .into_iter()
            .rev()
            .map(|(bucket, sample)| HistoryEntry { bucket, sample })
            .collect();
        buffer
    }

    /// Fold one sample into the history according to the module-level rules
    pub fn merge(&mut self, sample: TelemetrySample) -> MergeOutcome {
        let key = self.key_for(&sample);

        let Some(front) = self.entries.front_mut() else {
            self.entries.push_front(HistoryEntry { bucket: key, sample });
            return MergeOutcome::Appended { evicted: 0 };
        };

        if key == front.bucket {
            // The time axis of the newest point stays where it first landed
            let original_ts = front.sample.timestamp;
            front.sample = TelemetrySample {
                timestamp: original_ts,
                ..sample
            };
            MergeOutcome::Updated
        } else if key > front.bucket {
            self.entries.push_front(HistoryEntry { bucket: key, sample });
            let evicted = self.evict_overflow();
            debug!("New bucket {} ({} entries, {} evicted)", key, self.entries.len(), evicted);
            MergeOutcome::Appended { evicted }
        } else {
            debug!("Discarding late sample for {} (front is {})", key, front.bucket);
            MergeOutcome::DiscardedStale
        }
    }

    fn key_for(&self, sample: &TelemetrySample) -> BucketKey {
        bucket_key_with_width(sample.timestamp, self.bucket_width_secs)
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
            evicted += 1;
        }
        evicted
    }

    /// Most recent bucket, if any
    pub fn front(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    /// Entries from oldest to newest, the order charts consume
    pub fn chronological(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    /// Copy the history out in chronological order
    pub fn to_chronological_vec(&self) -> Vec<HistoryEntry> {
        self.chronological().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys strictly decrease from front to back
    pub fn is_well_ordered(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(newer, older)| newer.bucket > older.bucket)
    }
}
