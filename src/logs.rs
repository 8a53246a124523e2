//! Telemetry log records and log table pagination
//!
//! The log endpoint returns every stored record. The dashboard seeds its
//! history from them and shows them page by page.

extern crate alloc;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::sample::{GeoLocation, Reading, TelemetrySample, Timestamp};

/// Page sizes offered by the table
pub const PAGE_SIZE_OPTIONS: [usize; 5] = [10, 20, 30, 40, 50];

/// Page size on first load
pub const DEFAULT_PAGE_SIZE: usize = PAGE_SIZE_OPTIONS[0];

/// Number of leading page buttons shown before the ellipsis
const LEADING_PAGE_BUTTONS: usize = 5;

/// Which on-board unit produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogSource {
    Arduino,
    Gps,
}

impl LogSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Arduino => "Arduino",
            Self::Gps => "GPS",
        }
    }
}

/// One stored telemetry record as served by the log endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: u64,
    pub timestamp: Timestamp,
    pub source: LogSource,
    pub temperature: Reading,
    pub pressure: Reading,
    pub humidity: Reading,
    pub latitude: Reading,
    pub longitude: Reading,
    pub gx: Reading,
    pub gy: Reading,
    pub gz: Reading,
}

impl LogRecord {
    /// Position fix, when both coordinates are present
    pub fn location(&self) -> Option<GeoLocation> {
        Some(GeoLocation::new(self.latitude.value()?, self.longitude.value()?))
    }

    /// Convert to a telemetry sample. Records without a fix still carry
    /// their readings; only the location is left empty.
    pub fn to_sample(&self) -> TelemetrySample {
        TelemetrySample {
            timestamp: self.timestamp,
            temperature: self.temperature,
            pressure: self.pressure,
            humidity: self.humidity,
            location: self.location(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogDecodeError {
    #[error("Malformed log batch: {0}")]
    Malformed(postcard::Error),
    #[error("Failed to encode log batch: {0}")]
    Encode(postcard::Error),
}

/// Decode a postcard-encoded batch of log records
pub fn decode_log_batch(bytes: &[u8]) -> Result<Vec<LogRecord>, LogDecodeError> {
    postcard::from_bytes(bytes).map_err(LogDecodeError::Malformed)
}

pub fn encode_log_batch(records: &[LogRecord]) -> Result<Vec<u8>, LogDecodeError> {
    postcard::to_allocvec(records).map_err(LogDecodeError::Encode)
}

/// Every record as a seeding sample, in record order
pub fn samples_from_logs(records: &[LogRecord]) -> impl Iterator<Item = TelemetrySample> + '_ {
    records.iter().map(LogRecord::to_sample)
}

/// An entry in the pagination control strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageButton {
    Page(usize),
    Ellipsis,
}

/// Pagination state for the log table (pages are 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    per_page: usize,
    current: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PAGE_SIZE,
            current: 1,
        }
    }
}

impl Pagination {
    pub fn per_page(&self) -> usize {
        self.per_page
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn total_pages(&self, total_rows: usize) -> usize {
        total_rows.div_ceil(self.per_page)
    }

    /// Jump to `page`; out-of-range requests are ignored and return `false`
    pub fn go_to(&mut self, page: usize, total_rows: usize) -> bool {
        if page < 1 || page > self.total_pages(total_rows) {
            return false;
        }
        self.current = page;
        true
    }

    /// Change the page size and return to the first page.
    /// Sizes outside [`PAGE_SIZE_OPTIONS`] are ignored.
    pub fn set_per_page(&mut self, per_page: usize) -> bool {
        if !PAGE_SIZE_OPTIONS.contains(&per_page) {
            return false;
        }
        self.per_page = per_page;
        self.current = 1;
        true
    }

    /// Rows visible on the current page; empty when the page is past the end
    pub fn page_slice<'r, T>(&self, rows: &'r [T]) -> &'r [T] {
        let start = (self.current - 1).saturating_mul(self.per_page);
        if start >= rows.len() {
            return &[];
        }
        let end = start.saturating_add(self.per_page).min(rows.len());
        &rows[start..end]
    }

    /// Buttons for the first five pages, then an ellipsis and the last page
    /// for longer tables
    pub fn page_buttons(&self, total_rows: usize) -> heapless::Vec<PageButton, 7> {
        let total = self.total_pages(total_rows);
        let mut buttons = heapless::Vec::new();
        for page in 1..=total.min(LEADING_PAGE_BUTTONS) {
            let _ = buttons.push(PageButton::Page(page));
        }
        if total > LEADING_PAGE_BUTTONS + 1 {
            let _ = buttons.push(PageButton::Ellipsis);
        }
        if total > LEADING_PAGE_BUTTONS {
            let _ = buttons.push(PageButton::Page(total));
        }
        buttons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::TelemetryEngine;
    use crate::sample::Field;
    use crate::trend::series;

    fn record(id: u64, latitude: Reading) -> LogRecord {
        LogRecord {
            id,
            timestamp: Timestamp::from_secs(id as i64 * 60),
            source: LogSource::Gps,
            temperature: Reading::Value(20.0),
            pressure: Reading::Unavailable,
            humidity: Reading::Value(30.0),
            latitude,
            longitude: Reading::Value(-3.5),
            gx: Reading::Value(0.1),
            gy: Reading::Value(0.2),
            gz: Reading::Unavailable,
        }
    }

    #[test]
    fn test_record_to_sample() {
        let no_fix = record(1, Reading::Unavailable).to_sample();
        assert_eq!(no_fix.location, None);
        assert_eq!(no_fix.temperature, Reading::Value(20.0));

        let sample = record(2, Reading::Value(40.0)).to_sample();
        assert_eq!(sample.location, Some(GeoLocation::new(40.0, -3.5)));
        assert_eq!(sample.pressure, Reading::Unavailable);
        assert_eq!(sample.timestamp, Timestamp::from_secs(120));
    }

    #[test]
    fn test_mixed_batch_seeds_pressure() {
        // Arduino units report pressure without a fix, GPS units the reverse
        let arduino = |id: u64, pressure: f64| LogRecord {
            source: LogSource::Arduino,
            pressure: Reading::Value(pressure),
            longitude: Reading::Unavailable,
            ..record(id, Reading::Unavailable)
        };
        let records = [
            record(1, Reading::Value(41.0)),
            arduino(5, 1010.0),
            record(11, Reading::Value(42.0)),
            arduino(13, 1012.0),
        ];

        let (engine, report) =
            TelemetryEngine::seeded(EngineConfig::default(), samples_from_logs(&records));
        assert_eq!(report.accepted, 4);

        let history = engine.snapshot().history;
        assert_eq!(history.len(), 3);
        let pressure: Vec<f64> = series(&history, Field::Pressure).iter().map(|p| p.y).collect();
        assert_eq!(pressure, [1010.0, 1012.0]);
        assert_eq!(history[0].sample.location, Some(GeoLocation::new(41.0, -3.5)));
        assert_eq!(history[1].sample.location, None);
    }

    #[test]
    fn test_batch_decode() {
        let records = [record(1, Reading::Value(1.0)), record(2, Reading::Unavailable)];
        let bytes = encode_log_batch(&records).unwrap();

        let decoded = decode_log_batch(&bytes).unwrap();
        assert_eq!(decoded, records);
        assert_eq!(samples_from_logs(&decoded).count(), 2);
    }

    #[test]
    fn test_malformed_batch() {
        assert!(matches!(
            decode_log_batch(&[0x05, 0x01]),
            Err(LogDecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_page_slicing() {
        let rows: Vec<u32> = (0..25).collect();
        let mut pagination = Pagination::default();

        assert_eq!(pagination.total_pages(rows.len()), 3);
        assert_eq!(pagination.page_slice(&rows), &rows[0..10]);

        assert!(pagination.go_to(3, rows.len()));
        assert_eq!(pagination.page_slice(&rows), &rows[20..25]);

        assert!(!pagination.go_to(4, rows.len()));
        assert!(!pagination.go_to(0, rows.len()));
        assert_eq!(pagination.current(), 3);
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let mut pagination = Pagination::default();
        pagination.go_to(2, 100);

        assert!(pagination.set_per_page(30));
        assert_eq!(pagination.current(), 1);
        assert_eq!(pagination.total_pages(100), 4);

        assert!(!pagination.set_per_page(7));
        assert_eq!(pagination.per_page(), 30);
    }

    #[test]
    fn test_shrinking_data_leaves_empty_page() {
        let mut pagination = Pagination::default();
        pagination.go_to(5, 50);

        let rows = [1, 2, 3];
        assert!(pagination.page_slice(&rows).is_empty());
    }

    #[test]
    fn test_page_buttons() {
        let pagination = Pagination::default();
        use PageButton::*;

        assert!(pagination.page_buttons(0).is_empty());
        assert_eq!(pagination.page_buttons(30).as_slice(), &[Page(1), Page(2), Page(3)]);
        assert_eq!(
            pagination.page_buttons(60).as_slice(),
            &[Page(1), Page(2), Page(3), Page(4), Page(5), Page(6)]
        );
        assert_eq!(
            pagination.page_buttons(200).as_slice(),
            &[Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(20)]
        );
    }
}
