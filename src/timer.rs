use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::{
    histogram::{HistogramSnapshot, Reservoir, RESERVOIR_SIZE},
    instrument::Snapshot,
    meter::{MeterSnapshot, MeterState},
};

/// Histogram of durations in nanoseconds plus a meter of how often they
/// were recorded.
///
/// Both halves sit behind one lock, so a snapshot always has
/// `histogram.count() == meter.count`.
#[derive(Debug)]
pub struct Timer {
    state: Mutex<TimerState>,
}
#[derive(Debug)]
struct TimerState {
    reservoir: Reservoir,
    meter: MeterState,
}
impl Timer {
    pub fn new() -> Self {
        let state = TimerState {
            reservoir: Reservoir::new(RESERVOIR_SIZE),
            meter: MeterState::new(Instant::now()),
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn update(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.reservoir.update(nanos);
        state.meter.mark(1, now);
    }
    pub fn update_since(&self, start: Instant) {
        self.update(start.elapsed());
    }
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.update_since(start);
        out
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        TimerSnapshot {
            histogram: state.reservoir.snapshot(),
            meter: state.meter.snapshot(now),
        }
    }
}
impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
impl Snapshot<TimerSnapshot> for Timer {
    fn snapshot(&self) -> TimerSnapshot {
        Timer::snapshot(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerSnapshot {
    pub histogram: HistogramSnapshot,
    pub meter: MeterSnapshot,
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
    };

    use super::*;

    #[test]
    fn records_durations_and_calls() {
        let timer = Timer::new();
        timer.update(Duration::from_millis(2));
        timer.update(Duration::from_millis(4));
        let out = timer.time(|| 7);
        assert_eq!(out, 7);

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.histogram.count(), 3);
        assert_eq!(snapshot.meter.count, 3);
        assert!(snapshot.histogram.max() >= 4_000_000);
        assert!(snapshot.histogram.values().contains(&2_000_000));
    }

    #[test]
    fn counts_agree_under_concurrent_updates() {
        let timer = Arc::new(Timer::new());
        let done = Arc::new(AtomicBool::new(false));
        let updaters: Vec<_> = (0..4)
            .map(|i| {
                let timer = Arc::clone(&timer);
                thread::spawn(move || {
                    for n in 0..5_000 {
                        timer.update(Duration::from_nanos(i * 10_000 + n));
                    }
                })
            })
            .collect();
        let reader = {
            let timer = Arc::clone(&timer);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut reads = 0;
                loop {
                    let snapshot = timer.snapshot();
                    assert_eq!(snapshot.histogram.count(), snapshot.meter.count);
                    reads += 1;
                    if done.load(Ordering::Acquire) {
                        break reads;
                    }
                }
            })
        };

        for updater in updaters {
            updater.join().unwrap();
        }
        done.store(true, Ordering::Release);
        assert!(reader.join().unwrap() > 0);

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.histogram.count(), 20_000);
        assert_eq!(snapshot.meter.count, 20_000);
    }
}
