//! Polling glue between an external sample source and an ingest target
//!
//! The external trigger calls [`Poller::poll_once`] on its cadence. A poll
//! never returns an error: every cycle resolves to a [`PollOutcome`], and a
//! source failure just leaves the last snapshot in place as stale data.
//!
//! ## Usage
//!
//! ```rust,ignore
//! static SESSION: SharedSession<CriticalSectionRawMutex, TelemetryEngine> =
//!     Mutex::new(Session::new(...));
//! static HEALTH: Signal<CriticalSectionRawMutex, SourceHealth> = Signal::new();
//!
//! let mut poller = Poller::new(http_source, &SESSION).with_health_signal(&HEALTH);
//! loop {
//!     poller.poll_once().await;
//!     ticker.next().await;
//! }
//! ```

use core::fmt::Debug;
use core::future::Future;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::engine::{Snapshot, TelemetryEngine};
use crate::history::MergeOutcome;
use crate::orientation::{Orientation, OrientationFeed};
use crate::sample::{InvalidSampleError, TelemetrySample};

/// Asynchronous producer of samples, e.g. an HTTP endpoint
pub trait SampleSource {
    type Sample;
    type Error: Debug;

    /// Fetch one sample. Only this call suspends during a poll cycle.
    fn poll(&mut self) -> impl Future<Output = Result<Self::Sample, Self::Error>>;
}

/// State that folds in one sample at a time
pub trait Ingest {
    type Sample;
    type Outcome;

    fn ingest(&mut self, sample: Self::Sample) -> Result<Self::Outcome, InvalidSampleError>;
}

impl Ingest for TelemetryEngine {
    type Sample = TelemetrySample;
    type Outcome = MergeOutcome;

    fn ingest(&mut self, sample: TelemetrySample) -> Result<MergeOutcome, InvalidSampleError> {
        self.merge(sample)
    }
}

impl Ingest for OrientationFeed {
    type Sample = Orientation;
    type Outcome = ();

    fn ingest(&mut self, sample: Orientation) -> Result<(), InvalidSampleError> {
        self.update(sample)
    }
}

/// Result of one poll cycle
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<O> {
    /// The sample was folded into the target
    Accepted(O),
    /// The sample was malformed and dropped; the target is unchanged
    Rejected(InvalidSampleError),
    /// The source failed this cycle; the target is unchanged
    SourceUnavailable,
    /// The session had ended, so nothing was fetched or the result was dropped
    Ignored,
}

/// Freshness of the data behind the current snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceHealth {
    Live,
    Stale { consecutive_failures: u32 },
}

/// An ingest target bound to the lifetime of one dashboard session
pub struct Session<E> {
    target: E,
    active: bool,
}

/// Serialization point for a session shared between tasks
pub type SharedSession<M, E> = Mutex<M, Session<E>>;

impl<E: Ingest> Session<E> {
    pub const fn new(target: E) -> Self {
        Self {
            target,
            active: true,
        }
    }

    /// Tear the session down. Later results are ignored.
    pub fn end(&mut self) {
        if self.active {
            info!("Telemetry session ended");
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn target(&self) -> &E {
        &self.target
    }

    /// Fold in one fetched sample unless the session has ended
    pub fn accept(&mut self, sample: E::Sample) -> PollOutcome<E::Outcome> {
        if !self.active {
            debug!("Dropping poll result that arrived after teardown");
            return PollOutcome::Ignored;
        }
        match self.target.ingest(sample) {
            Ok(outcome) => PollOutcome::Accepted(outcome),
            Err(e) => {
                warn!("Rejected malformed sample: {}", e);
                PollOutcome::Rejected(e)
            }
        }
    }
}

impl Session<TelemetryEngine> {
    pub fn snapshot(&self) -> Snapshot {
        self.target.snapshot()
    }
}

impl Session<OrientationFeed> {
    pub fn orientation(&self) -> Orientation {
        self.target.latest()
    }
}

/// Drives one source into one shared session
pub struct Poller<'a, M, S, E>
where
    M: RawMutex,
    S: SampleSource,
    E: Ingest<Sample = S::Sample>,
{
    source: S,
    session: &'a SharedSession<M, E>,
    health: Option<&'a Signal<M, SourceHealth>>,
    consecutive_failures: u32,
}

impl<'a, M, S, E> Poller<'a, M, S, E>
where
    M: RawMutex,
    S: SampleSource,
    E: Ingest<Sample = S::Sample>,
{
    pub fn new(source: S, session: &'a SharedSession<M, E>) -> Self {
        Self {
            source,
            session,
            health: None,
            consecutive_failures: 0,
        }
    }

    /// Publish [`SourceHealth`] after every cycle that ran
    pub fn with_health_signal(mut self, signal: &'a Signal<M, SourceHealth>) -> Self {
        self.health = Some(signal);
        self
    }

    /// Run one poll cycle.
    ///
    /// The session lock is not held while the source is being awaited, so
    /// readers can keep taking snapshots during a slow fetch.
    pub async fn poll_once(&mut self) -> PollOutcome<E::Outcome> {
        if !self.session.lock().await.is_active() {
            return PollOutcome::Ignored;
        }

        let outcome = match self.source.poll().await {
            Ok(sample) => {
                self.consecutive_failures = 0;
                self.session.lock().await.accept(sample)
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!(
                    "Sample source unavailable ({} consecutive): {:?}",
                    self.consecutive_failures, e
                );
                PollOutcome::SourceUnavailable
            }
        };

        if !matches!(outcome, PollOutcome::Ignored)
            && let Some(signal) = self.health
        {
            signal.signal(self.health());
        }
        outcome
    }

    pub fn health(&self) -> SourceHealth {
        match self.consecutive_failures {
            0 => SourceHealth::Live,
            n => SourceHealth::Stale {
                consecutive_failures: n,
            },
        }
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

/// Fixed-cadence trigger that never overlaps polls.
///
/// If a poll overruns one or more periods, the deadlines it covered are
/// skipped and the schedule stays aligned to its original grid.
#[derive(Debug, Clone, Copy)]
pub struct TickSchedule {
    period: Duration,
    next: Instant,
}

impl TickSchedule {
    /// First tick fires at `start`
    pub fn new(start: Instant, period: Duration) -> Self {
        Self {
            period: if period.as_ticks() == 0 {
                Duration::from_ticks(1)
            } else {
                period
            },
            next: start,
        }
    }

    pub fn next_deadline(&self) -> Instant {
        self.next
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Record that the poll started at the current deadline finished at
    /// `now`. Returns how many ticks were skipped.
    pub fn complete(&mut self, now: Instant) -> u32 {
        let candidate = self.next + self.period;
        if now <= candidate {
            self.next = candidate;
            return 0;
        }

        let period = self.period.as_ticks();
        let steps = (now - self.next).as_ticks().div_ceil(period);
        self.next = self.next + Duration::from_ticks(steps * period);
        let skipped = u32::try_from(steps - 1).unwrap_or(u32::MAX);
        debug!("Poll overran its period, skipped {} tick(s)", skipped);
        skipped
    }
}
