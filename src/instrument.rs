use std::{
    any::Any,
    sync::{
        atomic::{AtomicI64, AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use crate::{HistogramSnapshot, MeterSnapshot, TimerSnapshot};

/// Point-in-time read of an instrument.
///
/// Every plain value is its own snapshot, so frozen state such as `42_i64` or
/// a prepared [`MeterSnapshot`] can be registered wherever a live instrument
/// is expected.
pub trait Snapshot<T>: AsAny + Send + Sync {
    fn snapshot(&self) -> T;
}
macro_rules! frozen {
    ($($ty:ty),*) => {
        $(
            impl Snapshot<$ty> for $ty {
                #[allow(clippy::clone_on_copy)]
                fn snapshot(&self) -> $ty {
                    self.clone()
                }
            }
        )*
    };
}
frozen!(i64, f64, HistogramSnapshot, MeterSnapshot, TimerSnapshot);

pub trait AsAny {
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}
impl<T> AsAny for T
where
    T: Any + Send + Sync,
{
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Everything a registry can hold. Only the first six kinds are exported.
#[derive(Clone)]
pub enum Instrument {
    Counter(Arc<dyn Snapshot<i64>>),
    Gauge(Arc<dyn Snapshot<i64>>),
    GaugeFloat(Arc<dyn Snapshot<f64>>),
    Histogram(Arc<dyn Snapshot<HistogramSnapshot>>),
    Meter(Arc<dyn Snapshot<MeterSnapshot>>),
    Timer(Arc<dyn Snapshot<TimerSnapshot>>),
    Healthcheck(Arc<Healthcheck>),
}
impl Instrument {
    pub fn kind(&self) -> &'static str {
        match self {
            Instrument::Counter(_) => "counter",
            Instrument::Gauge(_) => "gauge",
            Instrument::GaugeFloat(_) => "gauge_float",
            Instrument::Histogram(_) => "histogram",
            Instrument::Meter(_) => "meter",
            Instrument::Timer(_) => "timer",
            Instrument::Healthcheck(_) => "healthcheck",
        }
    }

    /// Recovers the concrete instrument behind the variant.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let any: Arc<dyn Any + Send + Sync> = match self.clone() {
            Instrument::Counter(c) => c.into_any(),
            Instrument::Gauge(g) => g.into_any(),
            Instrument::GaugeFloat(g) => g.into_any(),
            Instrument::Histogram(h) => h.into_any(),
            Instrument::Meter(m) => m.into_any(),
            Instrument::Timer(t) => t.into_any(),
            Instrument::Healthcheck(h) => h,
        };
        any.downcast().ok()
    }
}
impl core::fmt::Debug for Instrument {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Instrument").field(&self.kind()).finish()
    }
}

#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicI64,
}
impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self, n: i64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }
    pub fn dec(&self, n: i64) {
        self.count.fetch_sub(n, Ordering::Relaxed);
    }
    pub fn clear(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }
}
impl Snapshot<i64> for Counter {
    fn snapshot(&self) -> i64 {
        self.count()
    }
}

#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}
impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: i64) {
        self.value.store(value, Ordering::Relaxed);
    }
    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}
impl Snapshot<i64> for Gauge {
    fn snapshot(&self) -> i64 {
        self.value()
    }
}

/// `f64` gauge stored as raw bits.
#[derive(Debug, Default)]
pub struct GaugeFloat {
    bits: AtomicU64,
}
impl GaugeFloat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
    pub fn value(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}
impl Snapshot<f64> for GaugeFloat {
    fn snapshot(&self) -> f64 {
        self.value()
    }
}

type Check = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Health status kept alongside metrics. Registrable, never exported.
pub struct Healthcheck {
    error: Mutex<Option<String>>,
    check: Check,
}
impl Healthcheck {
    pub fn new(check: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        Self {
            error: Mutex::new(None),
            check: Box::new(check),
        }
    }

    /// Runs the check and records its outcome.
    pub fn check(&self) {
        match (self.check)() {
            Ok(()) => self.healthy(),
            Err(e) => self.unhealthy(e),
        }
    }
    pub fn healthy(&self) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
    pub fn unhealthy(&self, error: anyhow::Error) {
        *self.error.lock().unwrap_or_else(PoisonError::into_inner) = Some(format!("{error:#}"));
    }
    pub fn error(&self) -> Option<String> {
        self.error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
impl core::fmt::Debug for Healthcheck {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Healthcheck")
            .field("error", &self.error())
            .finish()
    }
}
