//! Real-time telemetry consolidation core for the cubesat ground dashboard
//!
//! This crate folds a periodic stream of telemetry samples into a bounded,
//! 5-minute-bucketed history and serves read-only snapshots of it alongside
//! the latest raw reading. The network client, the charts and the 3D model
//! live elsewhere; they talk to this crate through [`poller::SampleSource`]
//! and [`engine::Snapshot`].
//!
//! It is `#![no_std]` with `extern crate alloc` so the same engine runs on
//! embedded ground-station hardware and on desktop hosts (for the simulator
//! and tests).

#![no_std]

extern crate alloc;

pub mod bucket;
pub mod config;
pub mod engine;
pub mod history;
pub mod logs;
pub mod orientation;
pub mod poller;
pub mod readout;
pub mod sample;
pub mod trend;

pub use bucket::{BucketKey, bucket_key};
pub use engine::{Snapshot, TelemetryEngine};
pub use history::{HistoryEntry, MAX_POINTS, MergeOutcome};
pub use sample::{InvalidSampleError, Reading, TelemetrySample, Timestamp};
