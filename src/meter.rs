use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::instrument::Snapshot;

/// Interval at which the moving averages decay.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Exponentially-weighted moving average of events per second.
#[derive(Debug, Clone)]
struct Ewma {
    alpha: f64,
    rate: f64,
    uncounted: i64,
    initialized: bool,
}
impl Ewma {
    fn with_minutes(minutes: f64) -> Self {
        let alpha = 1.0 - (-TICK_INTERVAL.as_secs_f64() / 60.0 / minutes).exp();
        Self {
            alpha,
            rate: 0.0,
            uncounted: 0,
            initialized: false,
        }
    }

    fn update(&mut self, n: i64) {
        self.uncounted += n;
    }
    fn tick(&mut self) {
        let instant_rate = self.uncounted as f64 / TICK_INTERVAL.as_secs_f64();
        self.uncounted = 0;
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

/// Meter bookkeeping without its lock, so a timer can guard it together
/// with a reservoir.
#[derive(Debug)]
pub(crate) struct MeterState {
    start: Instant,
    count: i64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
    last_tick: Instant,
}
impl MeterState {
    pub(crate) fn new(start: Instant) -> Self {
        Self {
            start,
            count: 0,
            m1: Ewma::with_minutes(1.0),
            m5: Ewma::with_minutes(5.0),
            m15: Ewma::with_minutes(15.0),
            last_tick: start,
        }
    }

    pub(crate) fn mark(&mut self, n: i64, now: Instant) {
        self.tick_until(now);
        self.count += n;
        self.m1.update(n);
        self.m5.update(n);
        self.m15.update(n);
    }
    pub(crate) fn snapshot(&mut self, now: Instant) -> MeterSnapshot {
        self.tick_until(now);
        let elapsed = now.saturating_duration_since(self.start).as_secs_f64();
        let rate_mean = if elapsed > 0.0 {
            self.count as f64 / elapsed
        } else {
            0.0
        };
        MeterSnapshot {
            count: self.count,
            rate1: self.m1.rate,
            rate5: self.m5.rate,
            rate15: self.m15.rate,
            rate_mean,
        }
    }

    fn tick_until(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_tick);
        let ticks = elapsed.as_nanos() / TICK_INTERVAL.as_nanos();
        for _ in 0..ticks {
            self.m1.tick();
            self.m5.tick();
            self.m15.tick();
            self.last_tick += TICK_INTERVAL;
        }
    }
}

/// Counts events and tracks their 1, 5 and 15 minute rates.
///
/// The averages are advanced lazily whenever the meter is marked or read.
#[derive(Debug)]
pub struct Meter {
    state: Mutex<MeterState>,
}
impl Meter {
    pub fn new() -> Self {
        Self::started_at(Instant::now())
    }
    fn started_at(start: Instant) -> Self {
        Self {
            state: Mutex::new(MeterState::new(start)),
        }
    }

    pub fn mark(&self, n: i64) {
        self.mark_at(n, Instant::now());
    }
    pub fn snapshot(&self) -> MeterSnapshot {
        self.snapshot_at(Instant::now())
    }

    fn mark_at(&self, n: i64, now: Instant) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .mark(n, now);
    }
    fn snapshot_at(&self, now: Instant) -> MeterSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot(now)
    }
}
impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}
impl Snapshot<MeterSnapshot> for Meter {
    fn snapshot(&self) -> MeterSnapshot {
        Meter::snapshot(self)
    }
}

/// Rates are events per second.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeterSnapshot {
    pub count: i64,
    pub rate1: f64,
    pub rate5: f64,
    pub rate15: f64,
    pub rate_mean: f64,
}
