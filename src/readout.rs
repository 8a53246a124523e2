//! Display text for instantaneous readouts and log table cells

use core::fmt::Write;

use heapless::String;

use crate::orientation::Orientation;
use crate::sample::{Field, GeoLocation, Reading, TelemetrySample, UNAVAILABLE_MARKER};

/// Maximum length of one readout string
pub const READOUT_CAPACITY: usize = 72;

/// Maximum length of one formatted number inside a readout
const NUMBER_CAPACITY: usize = 32;

/// Placeholder shown before the first sample arrives
pub const NO_DATA: &str = "--";

pub type ReadoutText = String<READOUT_CAPACITY>;

type NumberText = String<NUMBER_CAPACITY>;

fn text(args: core::fmt::Arguments<'_>) -> ReadoutText {
    let mut out = ReadoutText::new();
    // Numbers are bounded by NUMBER_CAPACITY, so every readout fits
    let _ = out.write_fmt(args);
    out
}

/// Format `value` with `decimals` places (shortest form when `None`).
///
/// Values too wide for plain notation, like `1e60`, switch to scientific
/// notation instead of being truncated.
fn number(value: f64, decimals: Option<usize>) -> NumberText {
    let mut out = NumberText::new();
    let plain = match decimals {
        Some(places) => write!(out, "{:.*}", places, value),
        None => write!(out, "{}", value),
    };
    if plain.is_err() {
        out.clear();
        let _ = match decimals {
            Some(places) => write!(out, "{:.*e}", places, value),
            None => write!(out, "{:e}", value),
        };
    }
    out
}

/// Value line of a telemetry card, e.g. `21.5 °C`
pub fn card_value(latest: Option<&TelemetrySample>, field: Field) -> ReadoutText {
    match latest.map(|s| s.reading(field)) {
        None => text(format_args!("{} {}", NO_DATA, field.unit())),
        Some(Reading::Unavailable) => {
            text(format_args!("{} {}", UNAVAILABLE_MARKER, field.unit()))
        }
        Some(Reading::Value(v)) => text(format_args!("{} {}", number(v, None), field.unit())),
    }
}

/// Location card text, coordinates to four decimals.
/// Shows the placeholder until a sample with a position fix arrives.
pub fn card_location(latest: Option<&TelemetrySample>) -> ReadoutText {
    match latest.and_then(|sample| sample.location) {
        None => text(format_args!("{}", NO_DATA)),
        Some(location) => coordinates(location),
    }
}

pub fn coordinates(location: GeoLocation) -> ReadoutText {
    text(format_args!(
        "{}, {}",
        number(location.lat, Some(4)),
        number(location.lon, Some(4))
    ))
}

/// Roll, pitch and yaw lines of the attitude panel, two decimals each
pub fn attitude(orientation: Orientation) -> [ReadoutText; 3] {
    let axis = |label: &str, degrees: f64| {
        text(format_args!("{}: {}°", label, number(degrees, Some(2))))
    };
    [
        axis("Roll", orientation.roll),
        axis("Pitch", orientation.pitch),
        axis("Yaw", orientation.yaw),
    ]
}

/// How a log table column formats its numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Measurement,
    Coordinate,
}

/// Log table cell.
///
/// Measurements print whole numbers without decimals and everything else
/// with two; coordinates always carry four.
pub fn log_cell(reading: Reading, kind: CellKind) -> ReadoutText {
    let Reading::Value(v) = reading else {
        return text(format_args!("{}", UNAVAILABLE_MARKER));
    };
    let decimals = match kind {
        CellKind::Coordinate => 4,
        CellKind::Measurement if v % 1.0 == 0.0 => 0,
        CellKind::Measurement => 2,
    };
    text(format_args!("{}", number(v, Some(decimals))))
}
