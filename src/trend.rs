//! Chart series and summary statistics over the consolidated history

extern crate alloc;
use alloc::vec::Vec;

use crate::history::HistoryEntry;
use crate::sample::{Field, Timestamp};

/// Data point for charting: (timestamp, value)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub x: Timestamp,
    pub y: f64,
}

/// Project a chronological history onto one field.
///
/// The x coordinate is the sample's own timestamp, which for the newest
/// bucket stays fixed while late updates land in it. Unavailable readings
/// leave a gap rather than a zero.
pub fn series(history: &[HistoryEntry], field: Field) -> Vec<SeriesPoint> {
    history
        .iter()
        .filter_map(|entry| {
            entry.sample.reading(field).value().map(|y| SeriesPoint {
                x: entry.sample.timestamp,
                y,
            })
        })
        .collect()
}

/// Statistics for a time window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Number of points
    pub count: usize,
}

impl TrendStats {
    /// Summarise the points at or after `since` (all points when `None`)
    pub fn from_points(points: &[SeriesPoint], since: Option<Timestamp>) -> Self {
        let mut sum = 0.0;
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        let mut count = 0;

        for point in points.iter().filter(|p| since.is_none_or(|s| p.x >= s)) {
            sum += point.y;
            min = min.min(point.y);
            max = max.max(point.y);
            count += 1;
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            avg: sum / count as f64,
            min,
            max,
            count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::bucket_key;
    use crate::sample::{GeoLocation, Reading, TelemetrySample};

    fn entry(secs: i64, temperature: Reading, pressure: f64) -> HistoryEntry {
        let ts = Timestamp::from_secs(secs);
        HistoryEntry {
            bucket: bucket_key(ts),
            sample: TelemetrySample::new(ts, temperature, pressure, 50.0, GeoLocation::default()),
        }
    }

    #[test]
    fn test_series_skips_unavailable() {
        let history = [
            entry(0, Reading::Value(10.0), 1000.0),
            entry(300, Reading::Unavailable, 1001.0),
            entry(600, Reading::Value(12.0), 1002.0),
        ];

        let temps = series(&history, Field::Temperature);
        assert_eq!(
            temps,
            [
                SeriesPoint {
                    x: Timestamp::from_secs(0),
                    y: 10.0
                },
                SeriesPoint {
                    x: Timestamp::from_secs(600),
                    y: 12.0
                },
            ]
        );
        assert_eq!(series(&history, Field::Pressure).len(), 3);
    }

    #[test]
    fn test_stats_window() {
        let history = [
            entry(0, Reading::Value(10.0), 0.0),
            entry(300, Reading::Value(20.0), 0.0),
            entry(600, Reading::Value(30.0), 0.0),
        ];
        let points = series(&history, Field::Temperature);

        let all = TrendStats::from_points(&points, None);
        assert_eq!(all.count, 3);
        assert_eq!(all.avg, 20.0);
        assert_eq!(all.min, 10.0);
        assert_eq!(all.max, 30.0);

        let recent = TrendStats::from_points(&points, Some(Timestamp::from_secs(300)));
        assert_eq!(recent.count, 2);
        assert_eq!(recent.avg, 25.0);
    }

    #[test]
    fn test_stats_empty() {
        let stats = TrendStats::from_points(&[], None);
        assert!(stats.is_empty());
        assert_eq!(stats, TrendStats::default());
    }
}
