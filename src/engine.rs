//! Telemetry consolidation engine
//!
//! Owns the bucketed history and the most recent raw sample. Consumers only
//! ever see [`Snapshot`] copies, never references into engine storage.

extern crate alloc;
use alloc::vec::Vec;

use log::{info, warn};

use crate::config::EngineConfig;
use crate::history::{HistoryBuffer, HistoryEntry, MergeOutcome};
use crate::sample::{InvalidSampleError, TelemetrySample};

/// Read-only copy of the engine state for presentation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Most recent merged sample, `None` before the first successful merge
    pub latest: Option<TelemetrySample>,
    /// Consolidated history, oldest first
    pub history: Vec<HistoryEntry>,
}

/// Summary of a bulk historical load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Samples accepted into bucketing
    pub accepted: usize,
    /// Malformed samples that were skipped
    pub rejected: usize,
    /// Buckets in the resulting history
    pub buckets: usize,
}

pub struct TelemetryEngine {
    history: HistoryBuffer,
    latest: Option<TelemetrySample>,
    config: EngineConfig,
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl TelemetryEngine {
    /// Create an empty engine
    pub fn new(config: EngineConfig) -> Self {
        Self {
            history: HistoryBuffer::new(config.capacity(), config.bucket_width_secs),
            latest: None,
            config,
        }
    }

    /// Create an engine whose history is seeded from a historical load.
    ///
    /// Malformed samples are skipped rather than failing the load. `latest`
    /// stays empty until the first live merge.
    pub fn seeded<I>(config: EngineConfig, samples: I) -> (Self, SeedReport)
    where
        I: IntoIterator<Item = TelemetrySample>,
    {
        let mut report = SeedReport::default();
        let valid = samples.into_iter().filter(|sample| match sample.validate() {
            Ok(()) => {
                report.accepted += 1;
                true
            }
            Err(e) => {
                warn!("Skipping historical sample at {}: {}", sample.timestamp, e);
                report.rejected += 1;
                false
            }
        });
        let history = HistoryBuffer::seed(valid, config.capacity(), config.bucket_width_secs);
        report.buckets = history.len();

        info!(
            "Seeded history: {} samples into {} buckets ({} rejected)",
            report.accepted, report.buckets, report.rejected
        );

        let engine = Self {
            history,
            latest: None,
            config,
        };
        (engine, report)
    }

    /// Merge one live sample.
    ///
    /// A malformed sample is rejected and leaves the engine untouched.
    /// Otherwise `latest` always becomes `sample`, even when the history
    /// discards it as stale.
    pub fn merge(&mut self, sample: TelemetrySample) -> Result<MergeOutcome, InvalidSampleError> {
        sample.validate()?;
        let outcome = self.history.merge(sample);
        self.latest = Some(sample);
        Ok(outcome)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            latest: self.latest,
            history: self.history.to_chronological_vec(),
        }
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.latest.as_ref()
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::bucket_key;
    use crate::history::MAX_POINTS;
    use crate::sample::{GeoLocation, Reading, Timestamp};

    fn at(h: i64, m: i64, s: i64) -> Timestamp {
        Timestamp::from_secs(h * 3600 + m * 60 + s)
    }

    fn sample(ts: Timestamp, temperature: f64) -> TelemetrySample {
        TelemetrySample::new(ts, temperature, 1012.0, 40.0, GeoLocation::new(51.5, -0.12))
    }

    #[test]
    fn test_empty_snapshot() {
        let engine = TelemetryEngine::default();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.latest, None);
        assert!(snapshot.history.is_empty());
    }

    #[test]
    fn test_first_merge() {
        let mut engine = TelemetryEngine::default();
        let s = sample(at(12, 3, 0), 20.0);

        engine.merge(s).unwrap();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.latest, Some(s));
        assert_eq!(snapshot.history.len(), 1);
        assert_eq!(snapshot.history[0].bucket, bucket_key(at(12, 0, 0)));
        assert_eq!(snapshot.history[0].sample, s);
    }

    #[test]
    fn test_window_progression() {
        let mut engine = TelemetryEngine::default();
        let a = sample(at(12, 0, 0), 1.0);
        let b = sample(at(12, 4, 30), 2.0);
        let c = sample(at(12, 5, 10), 3.0);

        engine.merge(a).unwrap();
        assert_eq!(engine.merge(b), Ok(MergeOutcome::Updated));
        assert_eq!(engine.latest(), Some(&b));
        assert_eq!(engine.history().len(), 1);

        assert_eq!(engine.merge(c), Ok(MergeOutcome::Appended { evicted: 0 }));
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.latest, Some(c));
        assert_eq!(snapshot.history.len(), 2);
        assert_eq!(snapshot.history[0].bucket.start(), at(12, 0, 0));
        assert_eq!(snapshot.history[0].sample.temperature, Reading::Value(2.0));
        assert_eq!(snapshot.history[1].bucket.start(), at(12, 5, 0));
        assert_eq!(snapshot.history[1].sample, c);
    }

    #[test]
    fn test_repeated_merge_is_idempotent() {
        let mut engine = TelemetryEngine::default();
        let s = sample(at(9, 31, 0), 5.0);

        engine.merge(s).unwrap();
        let len = engine.history().len();
        engine.merge(s).unwrap();

        assert_eq!(engine.history().len(), len);
        assert_eq!(engine.latest(), Some(&s));
        assert_eq!(engine.snapshot().history[0].sample, s);
    }

    #[test]
    fn test_late_sample_updates_latest_only() {
        let mut engine = TelemetryEngine::default();
        engine.merge(sample(at(12, 10, 0), 1.0)).unwrap();
        let history_before = engine.snapshot().history;

        let late = sample(at(12, 2, 0), 99.0);
        assert_eq!(engine.merge(late), Ok(MergeOutcome::DiscardedStale));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.history, history_before);
        assert_eq!(snapshot.latest, Some(late));
    }

    #[test]
    fn test_invalid_sample_is_noop() {
        let mut engine = TelemetryEngine::default();
        let good = sample(at(12, 0, 0), 1.0);
        engine.merge(good).unwrap();
        let before = engine.snapshot();

        let mut bad = sample(at(12, 5, 0), 2.0);
        bad.humidity = Reading::Value(f64::NEG_INFINITY);

        assert!(engine.merge(bad).is_err());
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_bounded_at_capacity() {
        let mut engine = TelemetryEngine::default();
        for i in 0..(MAX_POINTS as i64 + 25) {
            engine.merge(sample(Timestamp::from_secs(i * 300 + 17), 0.0)).unwrap();
            assert!(engine.history().len() <= MAX_POINTS);
        }
        assert_eq!(engine.history().len(), MAX_POINTS);
        assert!(engine.history().is_well_ordered());
    }

    #[test]
    fn test_seed_then_live() {
        let mut bad = sample(at(11, 0, 0), 0.0);
        bad.location = Some(GeoLocation::new(f64::NAN, 0.0));
        let history = [
            sample(at(11, 55, 0), 1.0),
            bad,
            sample(at(11, 50, 0), 2.0),
            sample(at(11, 57, 0), 3.0),
        ];

        let (mut engine, report) = TelemetryEngine::seeded(EngineConfig::default(), history);

        assert_eq!(
            report,
            SeedReport {
                accepted: 3,
                rejected: 1,
                buckets: 2
            }
        );
        assert_eq!(engine.latest(), None);
        let front = engine.history().front().unwrap();
        assert_eq!(front.sample.temperature, Reading::Value(3.0));

        // Live sample lands in the seeded front bucket
        engine.merge(sample(at(11, 58, 0), 4.0)).unwrap();
        let front = engine.history().front().unwrap();
        assert_eq!(front.sample.temperature, Reading::Value(4.0));
        assert_eq!(front.sample.timestamp, at(11, 57, 0));
    }

    #[test]
    fn test_custom_width_and_capacity() {
        let config = EngineConfig {
            bucket_width_secs: 60,
            max_points: 3,
        };
        let mut engine = TelemetryEngine::new(config);
        for minute in 0..5 {
            engine.merge(sample(at(0, minute, 30), minute as f64)).unwrap();
        }
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.history.len(), 3);
        assert_eq!(snapshot.history[0].bucket.start(), at(0, 2, 0));
    }
}
