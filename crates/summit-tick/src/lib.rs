//! Fixed-interval tick scheduler for Summit.
//!
//! A room arms one scheduler when its match countdown starts and disarms
//! it when the match begins. While disarmed, [`TickScheduler::wait_for_tick`]
//! pends forever, so the scheduler can sit permanently inside a room
//! actor's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* admit, remove, movement */ }
//!         tick = countdown.wait_for_tick() => {
//!             room.countdown_tick(tick.elapsed_ticks());
//!         }
//!     }
//! }
//! ```
//!
//! # Late wake-ups
//!
//! When the runtime is overloaded a tick can fire more than one interval
//! late. The scheduler does not replay the missed ticks; it reports them in
//! [`TickInfo::ticks_skipped`] and keeps its original cadence. Consumers
//! advance their own counters by [`TickInfo::elapsed_ticks`] so a late wake
//! never loses time.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`TickScheduler`].
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. Default: one second.
    pub interval: Duration,
    /// Random jitter (0–max µs) added to the *first* tick after arming, to
    /// desynchronize rooms that fill at the same instant.
    pub initial_jitter_us: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            initial_jitter_us: 2_000,
        }
    }
}

impl TickConfig {
    /// Shortest interval the scheduler accepts.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// A config ticking every `interval` with default jitter.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_us = self.interval.as_micros() as u64,
                "tick interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number since the scheduler was
    /// last armed (starts at 1).
    pub tick: u64,
    /// Whole intervals that passed without a tick because the wake-up
    /// was late (0 in normal operation).
    pub ticks_skipped: u64,
}

impl TickInfo {
    /// Intervals elapsed since the previous tick: this one plus the skipped.
    pub fn elapsed_ticks(&self) -> u64 {
        1 + self.ticks_skipped
    }
}

/// Counters for a scheduler's lifetime.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Total intervals skipped by late wake-ups.
    pub total_skipped: u64,
    /// How many times the scheduler was armed.
    pub arm_count: u64,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Cancellable fixed-interval ticker. One per room.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// When the next tick should fire. `None` while disarmed.
    next_tick: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a disarmed scheduler.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();
        debug!(interval_ms = config.interval.as_millis() as u64, "tick scheduler created");
        Self {
            config,
            tick_count: 0,
            next_tick: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Start ticking. The first tick fires one interval (plus jitter) from
    /// now. Re-arming an armed scheduler restarts it.
    pub fn arm(&mut self) {
        let jitter = if self.config.initial_jitter_us > 0 {
            let us = rand::rng().random_range(0..self.config.initial_jitter_us);
            Duration::from_micros(us)
        } else {
            Duration::ZERO
        };
        self.tick_count = 0;
        self.next_tick = Some(Instant::now() + self.config.interval + jitter);
        self.metrics.arm_count += 1;
        debug!(jitter_us = jitter.as_micros() as u64, "tick scheduler armed");
    }

    /// Stop ticking. Any pending [`wait_for_tick`](Self::wait_for_tick)
    /// future will never resolve. Idempotent.
    pub fn disarm(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(ticks = self.tick_count, "tick scheduler disarmed");
        }
    }

    /// Whether the scheduler is currently ticking.
    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Wait until the next tick is due.
    ///
    /// While disarmed this future pends forever; `tokio::select!` keeps
    /// servicing its other branches.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Some(next) = self.next_tick else {
            std::future::pending::<()>().await;
            unreachable!()
        };

        time::sleep_until(next).await;

        let interval = self.config.interval;
        let now = Instant::now();
        let late_by = now.saturating_duration_since(next);
        let ticks_skipped = (late_by.as_nanos() / interval.as_nanos()) as u64;
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count + 1,
                skipped = ticks_skipped,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "tick fired late, skipping ahead"
            );
        }

        // Keep the original cadence: the next deadline is the first one
        // still in the future.
        let steps = u32::try_from(ticks_skipped + 1).unwrap_or(u32::MAX);
        self.next_tick = Some(next + interval * steps);

        self.tick_count += 1;
        self.metrics.total_ticks += 1;
        self.metrics.total_skipped += ticks_skipped;
        trace!(tick = self.tick_count, ticks_skipped, "tick fired");

        TickInfo {
            tick: self.tick_count,
            ticks_skipped,
        }
    }

    /// Ticks fired since the scheduler was last armed.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Snapshot of lifetime counters.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
