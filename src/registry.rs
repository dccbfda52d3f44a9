use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use thiserror::Error;

use crate::{Counter, Gauge, GaugeFloat, Histogram, Instrument, Meter, Timer};

/// Read side of a metrics registry as seen by the exporter.
pub trait Registry: Send + Sync {
    /// Visits every instrument. Order is up to the implementation but stable
    /// within one call.
    fn for_each(&self, visit: &mut dyn FnMut(&str, &Instrument));
}
impl<T> Registry for Arc<T>
where
    T: Registry + ?Sized,
{
    fn for_each(&self, visit: &mut dyn FnMut(&str, &Instrument)) {
        T::for_each(self, visit)
    }
}
impl Registry for Vec<(String, Instrument)> {
    fn for_each(&self, visit: &mut dyn FnMut(&str, &Instrument)) {
        for (name, instrument) in self {
            visit(name, instrument);
        }
    }
}

#[derive(Debug, Error)]
#[error("metric '{0}' is already registered")]
pub struct DuplicateMetric(pub String);

/// Thread-safe name → instrument map.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: RwLock<HashMap<String, Instrument>>,
}
impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        instrument: Instrument,
    ) -> Result<(), DuplicateMetric> {
        let name = name.into();
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        if metrics.contains_key(&name) {
            return Err(DuplicateMetric(name));
        }
        metrics.insert(name, instrument);
        Ok(())
    }
    /// Returns the instrument under `name`, registering `make()` first if
    /// nothing is there yet.
    pub fn get_or_register(&self, name: &str, make: impl FnOnce() -> Instrument) -> Instrument {
        if let Some(instrument) = self.get(name) {
            return instrument;
        }
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        metrics.entry(name.to_owned()).or_insert_with(make).clone()
    }
    pub fn get(&self, name: &str) -> Option<Instrument> {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
    pub fn unregister(&self, name: &str) -> Option<Instrument> {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }
    pub fn len(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `None` when `name` is already bound to a different kind of
    /// instrument.
    pub fn counter(&self, name: &str) -> Option<Arc<Counter>> {
        self.typed(name, |c| Instrument::Counter(c))
    }
    pub fn gauge(&self, name: &str) -> Option<Arc<Gauge>> {
        self.typed(name, |g| Instrument::Gauge(g))
    }
    pub fn gauge_float(&self, name: &str) -> Option<Arc<GaugeFloat>> {
        self.typed(name, |g| Instrument::GaugeFloat(g))
    }
    pub fn histogram(&self, name: &str) -> Option<Arc<Histogram>> {
        self.typed(name, |h| Instrument::Histogram(h))
    }
    pub fn meter(&self, name: &str) -> Option<Arc<Meter>> {
        self.typed(name, |m| Instrument::Meter(m))
    }
    pub fn timer(&self, name: &str) -> Option<Arc<Timer>> {
        self.typed(name, |t| Instrument::Timer(t))
    }

    fn typed<T>(&self, name: &str, wrap: impl FnOnce(Arc<T>) -> Instrument) -> Option<Arc<T>>
    where
        T: Any + Default + Send + Sync,
    {
        self.get_or_register(name, || wrap(Arc::new(T::default())))
            .downcast()
    }
}
impl Registry for MetricRegistry {
    fn for_each(&self, visit: &mut dyn FnMut(&str, &Instrument)) {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        for (name, instrument) in metrics.iter() {
            visit(name, instrument);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_helpers_share_instances() {
        let registry = MetricRegistry::new();
        registry.counter("hits").unwrap().inc(2);
        registry.counter("hits").unwrap().inc(3);
        assert_eq!(registry.counter("hits").unwrap().count(), 5);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn kind_mismatch_yields_none() {
        let registry = MetricRegistry::new();
        registry.gauge("depth").unwrap().update(1);
        assert!(registry.counter("depth").is_none());
        assert!(registry.timer("depth").is_none());
        assert!(registry.gauge("depth").is_some());
    }

    #[test]
    fn register_rejects_duplicates() {
        let registry = MetricRegistry::new();
        registry
            .register("x", Instrument::Gauge(Arc::new(1_i64)))
            .unwrap();
        let err = registry
            .register("x", Instrument::Gauge(Arc::new(2_i64)))
            .unwrap_err();
        assert_eq!(err.to_string(), "metric 'x' is already registered");
    }

    #[test]
    fn for_each_visits_everything() {
        let registry = MetricRegistry::new();
        registry.counter("a");
        registry.meter("b");
        registry.histogram("c");
        let mut names = vec![];
        registry.for_each(&mut |name, _| names.push(name.to_owned()));
        names.sort();
        assert_eq!(names, ["a", "b", "c"]);

        assert!(registry.unregister("b").is_some());
        assert!(registry.get("b").is_none());
        assert_eq!(registry.len(), 2);
    }
}
