//! Orientation stream
//!
//! Attitude readings drive a continuous animation, not a chart, so they are
//! never bucketed: only the latest valid reading is kept.

use serde::{Deserialize, Serialize};

use crate::sample::InvalidSampleError;

/// Attitude in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Orientation {
    pub const fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn validate(&self) -> Result<(), InvalidSampleError> {
        let axes = [("roll", self.roll), ("pitch", self.pitch), ("yaw", self.yaw)];
        for (field, value) in axes {
            if !value.is_finite() {
                return Err(InvalidSampleError::NonFinite { field });
            }
        }
        Ok(())
    }
}

/// Latest-value holder for the orientation stream
///
/// Starts level (all zeros) so the model has something to render before the
/// first reading arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationFeed {
    latest: Orientation,
    received: bool,
}

impl OrientationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the latest reading; malformed readings leave it unchanged
    pub fn update(&mut self, reading: Orientation) -> Result<(), InvalidSampleError> {
        reading.validate()?;
        self.latest = reading;
        self.received = true;
        Ok(())
    }

    pub fn latest(&self) -> Orientation {
        self.latest
    }

    /// Whether any reading has been accepted yet
    pub fn has_reading(&self) -> bool {
        self.received
    }
}

/// Normalise an angle in degrees to `(-180, 180]`
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

fn step_axis(current: f64, target: f64, factor: f64) -> f64 {
    let delta = wrap_degrees(target - current);
    wrap_degrees(current + delta * factor)
}

/// Move `current` a fraction of the way towards `target`.
///
/// Called once per rendered frame. Each axis follows the shortest arc, so a
/// yaw of 179° heading to -179° turns through 180°, not back through 0°.
/// `factor` is clamped to `[0, 1]`; 1 snaps straight to the target and a
/// non-finite factor holds the current attitude.
pub fn smooth(current: Orientation, target: Orientation, factor: f32) -> Orientation {
    let factor = if factor.is_finite() {
        f64::from(factor.clamp(0.0, 1.0))
    } else {
        0.0
    };
    Orientation {
        roll: step_axis(current.roll, target.roll, factor),
        pitch: step_axis(current.pitch, target.pitch, factor),
        yaw: step_axis(current.yaw, target.yaw, factor),
    }
}
