//! Telemetry sample model
//!
//! A [`TelemetrySample`] is one timestamped reading from the satellite link.
//! Every numeric field is either a finite number or an explicit
//! [`Reading::Unavailable`] marker; a field is never simply missing.

use core::fmt::Display;

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Text used on the wire and in the UI for an unavailable reading
pub const UNAVAILABLE_MARKER: &str = "N/A";

/// Absolute instant in milliseconds since the Unix epoch (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Self(secs * 1000)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Shift this instant by a signed number of milliseconds
    pub const fn offset_millis(self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let secs_of_day = self.0.div_euclid(1000).rem_euclid(86_400);
        write!(
            f,
            "{:02}:{:02}:{:02}Z",
            secs_of_day / 3600,
            (secs_of_day / 60) % 60,
            secs_of_day % 60
        )
    }
}

/// A single numeric reading that may be marked unavailable by the source
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Reading {
    Value(f64),
    #[default]
    Unavailable,
}

impl Reading {
    /// Parse the textual form used by source adapters: either the
    /// `"N/A"` marker or a decimal number.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == UNAVAILABLE_MARKER {
            return Some(Self::Unavailable);
        }
        text.parse::<f64>().ok().map(Self::Value)
    }

    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unavailable => None,
        }
    }

    pub const fn is_available(self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// A reading is well-formed when it is the marker or a finite number
    pub fn is_well_formed(self) -> bool {
        match self {
            Self::Value(v) => v.is_finite(),
            Self::Unavailable => true,
        }
    }
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

/// Geographic position of the spacecraft ground track
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoLocation {
    pub lat: f64,
    pub lon: f64,
}

impl GeoLocation {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Charted telemetry channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Temperature,
    Pressure,
    Humidity,
}

impl Field {
    pub const ALL: [Field; 3] = [Self::Temperature, Self::Pressure, Self::Humidity];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Pressure => "Pressure",
            Self::Humidity => "Humidity",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Pressure => "hPa",
            Self::Humidity => "%",
        }
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Humidity => "humidity",
        }
    }
}

/// Returned when a sample carries a non-finite number where a finite value
/// or the unavailable marker was expected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidSampleError {
    #[error("Non-finite value in field `{field}`")]
    NonFinite {
        /// Name of the offending field
        field: &'static str,
    },
}

/// One point-in-time telemetry reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub timestamp: Timestamp,
    pub temperature: Reading,
    pub pressure: Reading,
    pub humidity: Reading,
    /// `None` when the producing unit has no position fix
    pub location: Option<GeoLocation>,
}

impl TelemetrySample {
    pub fn new(
        timestamp: Timestamp,
        temperature: impl Into<Reading>,
        pressure: impl Into<Reading>,
        humidity: impl Into<Reading>,
        location: impl Into<Option<GeoLocation>>,
    ) -> Self {
        Self {
            timestamp,
            temperature: temperature.into(),
            pressure: pressure.into(),
            humidity: humidity.into(),
            location: location.into(),
        }
    }

    pub const fn reading(&self, field: Field) -> Reading {
        match field {
            Field::Temperature => self.temperature,
            Field::Pressure => self.pressure,
            Field::Humidity => self.humidity,
        }
    }

    /// Check that every numeric field is finite or explicitly unavailable
    pub fn validate(&self) -> Result<(), InvalidSampleError> {
        for field in Field::ALL {
            if !self.reading(field).is_well_formed() {
                return Err(InvalidSampleError::NonFinite { field: field.key() });
            }
        }
        if let Some(location) = self.location {
            if !location.lat.is_finite() {
                return Err(InvalidSampleError::NonFinite { field: "location.lat" });
            }
            if !location.lon.is_finite() {
                return Err(InvalidSampleError::NonFinite { field: "location.lon" });
            }
        }
        Ok(())
    }
}

impl Display for TelemetrySample {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[TelemetrySample] timestamp: {}", self.timestamp)?;
        for field in Field::ALL {
            match self.reading(field) {
                Reading::Value(v) => write!(f, ", {}: {:.2}{}", field.key(), v, field.unit())?,
                Reading::Unavailable => {
                    write!(f, ", {}: {}", field.key(), UNAVAILABLE_MARKER)?
                }
            }
        }
        match self.location {
            Some(location) => write!(f, ", location: {:.4}, {:.4}", location.lat, location.lon),
            None => write!(f, ", location: {}", UNAVAILABLE_MARKER),
        }
    }
}
