//! Desktop simulator for the cubesat telemetry core.
//!
//! Stands in for every external collaborator of the consolidation engine: a
//! synthetic telemetry endpoint (with dropouts, slow responses, late and
//! malformed samples), a gyro endpoint, the periodic triggers, and a text
//! dashboard that logs what the cards and charts would show.
//!
//! Time is virtual: one simulated poll period passes in
//! `period / SIM_SPEEDUP` of real time.
//!
//! # Environment
//!
//! | Variable      | Meaning                                | Default   |
//! |---------------|----------------------------------------|-----------|
//! | `SIM_CYCLES`  | telemetry poll cycles to run           | 120       |
//! | `SIM_SPEEDUP` | virtual seconds per real second        | 50        |
//! | `SIM_CONFIG`  | path to a postcard configuration blob  | built-in  |
//! | `RUST_LOG`    | log filter                             | `info`    |

use std::str::FromStr;
use std::time::{Duration as StdDuration, SystemTime, UNIX_EPOCH};

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant};
use log::{debug, error, info, warn};

use cubesat_telemetry::config::TelemetryConfig;
use cubesat_telemetry::engine::{Snapshot, TelemetryEngine};
use cubesat_telemetry::logs::{
    LogRecord, LogSource, PageButton, Pagination, decode_log_batch, encode_log_batch,
    samples_from_logs,
};
use cubesat_telemetry::orientation::{Orientation, OrientationFeed, smooth, wrap_degrees};
use cubesat_telemetry::poller::{
    PollOutcome, Poller, SampleSource, Session, SharedSession, SourceHealth, TickSchedule,
};
use cubesat_telemetry::readout::{CellKind, attitude, card_location, card_value, log_cell};
use cubesat_telemetry::sample::{Field, GeoLocation, Reading, TelemetrySample, Timestamp};
use cubesat_telemetry::trend::{TrendStats, series};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Length of the bulk-loaded log history.
const HISTORY_SPAN_SECS: i64 = 2 * 3600;

/// Spacing between bulk-loaded log records.
const HISTORY_SPACING_SECS: i64 = 60;

/// Rendered frames between two orientation polls (~30 FPS at 1 Hz polling).
const FRAMES_PER_ORIENTATION_POLL: usize = 30;

/// Orbital period of the synthetic ground track.
const ORBIT_PERIOD_SECS: f64 = 5560.0;

/// Fault injection cadence, in telemetry polls
const DROPOUT_EVERY: u64 = 17;
const LATE_EVERY: u64 = 23;
const SLOW_EVERY: u64 = 29;
const MALFORMED_EVERY: u64 = 41;

/// Gyro endpoint fails once every this many polls.
const GYRO_DROPOUT_EVERY: u64 = 13;

/// How far in the past a late sample is stamped.
const LATE_SAMPLE_AGE_SECS: i64 = 7 * 60;

/// Latency of a slow telemetry response.
const SLOW_POLL_LATENCY: Duration = Duration::from_secs(12);

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum MockLinkError {
    Dropout { poll: u64 },
}

/// Synthetic reading for a wall-clock instant.
fn synthetic_sample(timestamp: Timestamp) -> TelemetrySample {
    let t = timestamp.as_millis() as f64 / 1000.0;

    // Temperature: 20–26 °C sinusoidal with slow drift
    let temperature = 23.0 + 3.0 * (t / 1200.0).sin() + 0.5 * (t / 370.0).cos();
    // Pressure: a slow weather front around standard pressure
    let pressure = 1013.0 + 4.0 * (t / 5400.0).sin();
    // Humidity: 40–60 %, with the sensor dropping out briefly every ~97 minutes
    let humidity = if (t as i64 / 60) % 97 == 0 {
        Reading::Unavailable
    } else {
        Reading::Value(50.0 + 10.0 * (t / 1800.0).sin() + 2.0 * (t / 230.0).cos())
    };

    let phase = t / ORBIT_PERIOD_SECS * std::f64::consts::TAU;
    let location = GeoLocation::new(51.6 * phase.sin(), wrap_degrees(t * 360.0 / ORBIT_PERIOD_SECS));

    TelemetrySample::new(timestamp, temperature, pressure, humidity, location)
}

fn synthetic_orientation(t: f64) -> Orientation {
    Orientation::new(
        25.0 * (t / 20.0).sin(),
        10.0 * (t / 13.0).sin(),
        wrap_degrees(t * 3.0),
    )
}

/// Generate the bulk log load served at startup.
///
/// Records come back newest-first, the way the log endpoint returns them.
/// The two units alternate: the Arduino reports attitude and pressure with
/// no position fix, the GPS reports temperature, humidity and position.
fn generate_log_history(end: Timestamp) -> Vec<LogRecord> {
    let count = HISTORY_SPAN_SECS / HISTORY_SPACING_SECS;
    (0..count)
        .rev()
        .map(|i| {
            let ts = end.offset_millis(-(count - i) * HISTORY_SPACING_SECS * 1000);
            let sample = synthetic_sample(ts);
            let location = sample.location.unwrap_or_default();
            let record = LogRecord {
                id: i as u64,
                timestamp: ts,
                source: LogSource::Gps,
                temperature: sample.temperature,
                pressure: Reading::Unavailable,
                humidity: sample.humidity,
                latitude: Reading::Value(location.lat),
                longitude: Reading::Value(location.lon),
                gx: Reading::Unavailable,
                gy: Reading::Unavailable,
                gz: Reading::Unavailable,
            };
            if i % 2 == 1 {
                return record;
            }

            let gyro = synthetic_orientation(ts.as_millis() as f64 / 1000.0);
            LogRecord {
                source: LogSource::Arduino,
                temperature: Reading::Unavailable,
                pressure: sample.pressure,
                humidity: Reading::Unavailable,
                latitude: Reading::Unavailable,
                longitude: Reading::Unavailable,
                gx: Reading::Value(gyro.roll),
                gy: Reading::Value(gyro.pitch),
                gz: Reading::Value(gyro.yaw),
                ..record
            }
        })
        .collect()
}

/// Telemetry endpoint with injected faults.
struct MockTelemetrySource {
    now: Timestamp,
    polls: u64,
    latency: Duration,
}

impl MockTelemetrySource {
    fn new(now: Timestamp) -> Self {
        Self {
            now,
            polls: 0,
            latency: Duration::from_ticks(0),
        }
    }

    fn set_time(&mut self, now: Timestamp) {
        self.now = now;
    }

    /// Virtual time the last poll took to answer.
    fn take_latency(&mut self) -> Duration {
        std::mem::replace(&mut self.latency, Duration::from_ticks(0))
    }
}

impl SampleSource for MockTelemetrySource {
    type Sample = TelemetrySample;
    type Error = MockLinkError;

    async fn poll(&mut self) -> Result<TelemetrySample, MockLinkError> {
        self.polls += 1;
        let n = self.polls;

        if n % SLOW_EVERY == 0 {
            self.latency = SLOW_POLL_LATENCY;
        }
        if n % DROPOUT_EVERY == 0 {
            return Err(MockLinkError::Dropout { poll: n });
        }

        let timestamp = if n % LATE_EVERY == 0 {
            self.now.offset_millis(-LATE_SAMPLE_AGE_SECS * 1000)
        } else {
            self.now
        };
        let mut sample = synthetic_sample(timestamp);
        if n % MALFORMED_EVERY == 0 {
            sample.pressure = Reading::Value(f64::NAN);
        }
        Ok(sample)
    }
}

/// Gyro endpoint, polled faster than telemetry.
struct MockGyroSource {
    elapsed_secs: f64,
    polls: u64,
}

impl MockGyroSource {
    fn new() -> Self {
        Self {
            elapsed_secs: 0.0,
            polls: 0,
        }
    }

    fn advance(&mut self, dt: Duration) {
        self.elapsed_secs += dt.as_micros() as f64 / 1_000_000.0;
    }
}

impl SampleSource for MockGyroSource {
    type Sample = Orientation;
    type Error = MockLinkError;

    async fn poll(&mut self) -> Result<Orientation, MockLinkError> {
        self.polls += 1;
        if self.polls % GYRO_DROPOUT_EVERY == 0 {
            return Err(MockLinkError::Dropout { poll: self.polls });
        }
        Ok(synthetic_orientation(self.elapsed_secs))
    }
}

// ---------------------------------------------------------------------------
// Virtual time
// ---------------------------------------------------------------------------

struct VirtualClock {
    /// Wall-clock time at virtual instant zero.
    epoch: Timestamp,
    now: Instant,
    speedup: u64,
}

impl VirtualClock {
    fn new(speedup: u64) -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        Self {
            epoch: Timestamp::from_millis(epoch_ms),
            now: Instant::from_ticks(0),
            speedup: speedup.max(1),
        }
    }

    fn wall(&self) -> Timestamp {
        self.epoch.offset_millis(self.now.as_millis() as i64)
    }

    /// Sleep (scaled) until `deadline` and move virtual time there.
    fn sleep_until(&mut self, deadline: Instant) {
        if deadline > self.now {
            let virtual_wait = deadline - self.now;
            std::thread::sleep(StdDuration::from_micros(
                virtual_wait.as_micros() / self.speedup,
            ));
            self.now = deadline;
        }
    }

    fn advance(&mut self, by: Duration) {
        self.now = self.now + by;
    }
}

// ---------------------------------------------------------------------------
// Dashboard output
// ---------------------------------------------------------------------------

fn render_dashboard(cycle: u32, snapshot: &Snapshot, orientation: Orientation) {
    let latest = snapshot.latest.as_ref();
    info!(
        "[{:>3}] T {} | P {} | H {} | @ {} | {} buckets",
        cycle,
        card_value(latest, Field::Temperature),
        card_value(latest, Field::Pressure),
        card_value(latest, Field::Humidity),
        card_location(latest),
        snapshot.history.len()
    );

    for field in Field::ALL {
        let points = series(&snapshot.history, field);
        let stats = TrendStats::from_points(&points, None);
        if stats.is_empty() {
            continue;
        }
        debug!(
            "      {:<11} {:>3} pts  min {:>8.2}  avg {:>8.2}  max {:>8.2} {}",
            field.label(),
            stats.count,
            stats.min,
            stats.avg,
            stats.max,
            field.unit()
        );
    }

    let [roll, pitch, yaw] = attitude(orientation);
    debug!("      attitude  {}  {}  {}", roll, pitch, yaw);
}

/// Re-fetch the log table and show the next page of it.
///
/// The records travel through the same postcard batch format the log
/// endpoint serves.
fn refresh_log_table(records: &[LogRecord], pagination: &mut Pagination) {
    let batch = match encode_log_batch(records).and_then(|bytes| decode_log_batch(&bytes)) {
        Ok(batch) => batch,
        Err(e) => {
            warn!("Log table refresh failed: {}", e);
            return;
        }
    };

    let total_pages = pagination.total_pages(batch.len());
    let next_page = pagination.current() % total_pages.max(1) + 1;
    pagination.go_to(next_page, batch.len());

    let mut strip = String::new();
    for button in pagination.page_buttons(batch.len()) {
        match button {
            PageButton::Page(page) if page == pagination.current() => {
                strip.push_str(&format!("[{page}] "))
            }
            PageButton::Page(page) => strip.push_str(&format!("{page} ")),
            PageButton::Ellipsis => strip.push_str("... "),
        }
    }
    info!(
        "Log table: {} records, {} per page | {}",
        batch.len(),
        pagination.per_page(),
        strip.trim_end()
    );

    for record in pagination.page_slice(&batch) {
        debug!(
            "      #{:<4} {} {:<7} T {:>6} P {:>8} H {:>6} @ {}, {}",
            record.id,
            record.timestamp,
            record.source.label(),
            log_cell(record.temperature, CellKind::Measurement),
            log_cell(record.pressure, CellKind::Measurement),
            log_cell(record.humidity, CellKind::Measurement),
            log_cell(record.latitude, CellKind::Coordinate),
            log_cell(record.longitude, CellKind::Coordinate),
        );
    }
}

fn report_health(health: SourceHealth, showing_stale: &mut bool) {
    match health {
        SourceHealth::Live if *showing_stale => {
            info!("Telemetry link recovered");
            *showing_stale = false;
        }
        SourceHealth::Live => {}
        SourceHealth::Stale {
            consecutive_failures,
        } => {
            warn!(
                "Showing stale data ({} failed poll(s) in a row)",
                consecutive_failures
            );
            *showing_stale = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn read_config_blob() -> Option<Vec<u8>> {
    let path = std::env::var("SIM_CONFIG").ok()?;
    match std::fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!("Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let blob = read_config_blob();
    let config = match blob.as_deref().map(TelemetryConfig::from_bytes).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let cycles: u32 = env_or("SIM_CYCLES", 120);
    let mut clock = VirtualClock::new(env_or("SIM_SPEEDUP", 50));

    info!("Starting cubesat telemetry simulator");
    info!(
        "Buckets of {}s, up to {} points; polling telemetry every {} ms, gyro every {} ms",
        config.engine.bucket_width_secs,
        config.engine.max_points,
        config.polling.telemetry_period_ms,
        config.polling.orientation_period_ms
    );

    // Bulk history load
    let records = generate_log_history(clock.wall());
    let (engine, _report) = TelemetryEngine::seeded(config.engine, samples_from_logs(&records));

    let telemetry_session: SharedSession<CriticalSectionRawMutex, TelemetryEngine> =
        Mutex::new(Session::new(engine));
    let orientation_session: SharedSession<CriticalSectionRawMutex, OrientationFeed> =
        Mutex::new(Session::new(OrientationFeed::new()));
    let health: Signal<CriticalSectionRawMutex, SourceHealth> = Signal::new();

    let mut telemetry = Poller::new(MockTelemetrySource::new(clock.wall()), &telemetry_session)
        .with_health_signal(&health);
    let mut gyro = Poller::new(MockGyroSource::new(), &orientation_session);

    let orientation_period = config.polling.orientation_period();
    let gyro_polls_per_tick = (config.polling.telemetry_period_ms
        / config.polling.orientation_period_ms)
        .max(1);

    let mut schedule = TickSchedule::new(clock.now, config.polling.telemetry_period());
    let mut logs_schedule = TickSchedule::new(clock.now, config.polling.logs_period());
    let mut pagination = Pagination::default();
    let mut rendered = Orientation::default();
    let mut showing_stale = false;

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------
    for cycle in 1..=cycles {
        clock.sleep_until(schedule.next_deadline());

        // --- Telemetry poll -----------------------------------------------
        telemetry.source_mut().set_time(clock.wall());
        match block_on(telemetry.poll_once()) {
            PollOutcome::Accepted(outcome) => debug!("Merged: {:?}", outcome),
            PollOutcome::Rejected(e) => warn!("Dropped sample: {}", e),
            PollOutcome::SourceUnavailable | PollOutcome::Ignored => {}
        }
        if let Some(status) = health.try_take() {
            report_health(status, &mut showing_stale);
        }

        // --- Orientation stream and animation frames ----------------------
        for _ in 0..gyro_polls_per_tick {
            gyro.source_mut().advance(orientation_period);
            if let PollOutcome::SourceUnavailable = block_on(gyro.poll_once()) {
                debug!("Gyro poll failed; animating towards the last reading");
            }
            let target = block_on(orientation_session.lock()).orientation();
            for _ in 0..FRAMES_PER_ORIENTATION_POLL {
                rendered = smooth(rendered, target, config.orientation.smoothing_factor);
            }
        }

        // --- Render -------------------------------------------------------
        let snapshot = block_on(telemetry_session.lock()).snapshot();
        render_dashboard(cycle, &snapshot, rendered);

        // --- Log table ----------------------------------------------------
        if clock.now >= logs_schedule.next_deadline() {
            refresh_log_table(&records, &mut pagination);
            logs_schedule.complete(clock.now);
        }

        // --- Tick pacing --------------------------------------------------
        let latency = telemetry.source_mut().take_latency();
        clock.advance(latency);
        let skipped = schedule.complete(clock.now);
        if skipped > 0 {
            warn!("Slow telemetry response, skipped {} poll(s)", skipped);
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------
    block_on(telemetry_session.lock()).end();
    block_on(orientation_session.lock()).end();

    if let PollOutcome::Ignored = block_on(telemetry.poll_once()) {
        info!("Post-teardown poll ignored");
    }

    let snapshot = block_on(telemetry_session.lock()).snapshot();
    if let (Some(first), Some(last)) = (snapshot.history.first(), snapshot.history.last()) {
        info!(
            "Final history: {} buckets from {} to {}",
            snapshot.history.len(),
            first.bucket,
            last.bucket
        );
    }
    info!("Simulator exiting");
}
