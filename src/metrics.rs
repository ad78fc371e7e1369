//! Metrics collection and export for specification pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use esox_specpool::{DelegateAssistant, SpecPool};
///
/// let assistant = DelegateAssistant::builder()
///     .with_create(|spec: &u32| *spec)
///     .build()
///     .unwrap();
/// let pool = SpecPool::new(assistant);
///
/// pool.release(5);
/// {
///     let _value = pool.acquire(&5).unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.hits, 1);
///     assert_eq!(metrics.live_handles, 1);
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Acquisitions served from the value bag
    pub hits: usize,

    /// Acquisitions whose probe run found nothing
    pub misses: usize,

    /// Candidates dequeued during probe runs
    pub probes: usize,

    /// Candidates the assistant turned down and requeued
    pub rejected_probes: usize,

    /// Values built through the assistant
    pub creations: usize,

    /// Values released into the value bag
    pub returns: usize,

    /// Times the value bag was drained
    pub clears: usize,

    /// Values disposed while draining
    pub disposed: usize,

    /// Shells returned to the shell bag
    pub shells_recycled: usize,

    /// Shells thrown away by shell bag flushes
    pub shells_discarded: usize,

    /// Current value bag length
    pub available_values: usize,

    /// Current shell bag length
    pub available_shells: usize,

    /// Handles currently checked out
    pub live_handles: usize,
}

impl PoolMetrics {
    /// Fraction of acquisitions served from the bag (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("hits".to_string(), self.hits.to_string());
        metrics.insert("misses".to_string(), self.misses.to_string());
        metrics.insert("probes".to_string(), self.probes.to_string());
        metrics.insert("rejected_probes".to_string(), self.rejected_probes.to_string());
        metrics.insert("creations".to_string(), self.creations.to_string());
        metrics.insert("returns".to_string(), self.returns.to_string());
        metrics.insert("clears".to_string(), self.clears.to_string());
        metrics.insert("disposed".to_string(), self.disposed.to_string());
        metrics.insert("shells_recycled".to_string(), self.shells_recycled.to_string());
        metrics.insert("shells_discarded".to_string(), self.shells_discarded.to_string());
        metrics.insert("available_values".to_string(), self.available_values.to_string());
        metrics.insert("available_shells".to_string(), self.available_shells.to_string());
        metrics.insert("live_handles".to_string(), self.live_handles.to_string());
        metrics.insert("hit_rate".to_string(), format!("{:.2}", self.hit_rate()));
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// Every series carries a `pool` label plus the supplied tags.
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_specpool::{DelegateAssistant, SpecPool};
    /// use std::collections::HashMap;
    ///
    /// let assistant = DelegateAssistant::builder()
    ///     .with_create(|spec: &u32| *spec)
    ///     .build()
    ///     .unwrap();
    /// let pool = SpecPool::new(assistant);
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "render".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("textures", Some(&tags)).unwrap();
    /// assert!(output.contains("specpool_values_available"));
    /// assert!(output.contains("service=\"render\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> crate::PoolResult<String> {
        use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = HashMap::new();
        labels.insert("pool".to_string(), pool_name.to_string());
        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.insert(key.clone(), value.clone());
            }
        }

        let registry = Registry::new_custom(Some("specpool".to_string()), Some(labels))
            .map_err(export_error)?;

        let counters = [
            ("hits_total", "Acquisitions served from the value bag", metrics.hits),
            ("misses_total", "Acquisitions that found no match", metrics.misses),
            ("probes_total", "Candidates dequeued while probing", metrics.probes),
            ("rejected_probes_total", "Candidates rejected and requeued", metrics.rejected_probes),
            ("creations_total", "Values built by the assistant", metrics.creations),
            ("returns_total", "Values released into the value bag", metrics.returns),
            ("clears_total", "Value bag drains", metrics.clears),
            ("disposed_total", "Values disposed while draining", metrics.disposed),
            ("shells_recycled_total", "Shells returned to the shell bag", metrics.shells_recycled),
            (
                "shells_discarded_total",
                "Shells dropped by shell bag flushes",
                metrics.shells_discarded,
            ),
        ];
        for (name, help, value) in counters {
            let counter = IntCounter::with_opts(Opts::new(name, help)).map_err(export_error)?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter)).map_err(export_error)?;
        }

        let gauges = [
            ("values_available", "Values waiting in the value bag", metrics.available_values),
            ("shells_available", "Shells waiting in the shell bag", metrics.available_shells),
            ("handles_live", "Handles currently checked out", metrics.live_handles),
        ];
        for (name, help, value) in gauges {
            let gauge = IntGauge::with_opts(Opts::new(name, help)).map_err(export_error)?;
            gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
            registry.register(Box::new(gauge)).map_err(export_error)?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(export_error)?;
        String::from_utf8(buffer).map_err(export_error)
    }
}

#[cfg(feature = "metrics")]
fn export_error(err: impl std::fmt::Display) -> crate::PoolError {
    crate::PoolError::MetricsExport(err.to_string())
}

/// Internal metrics tracker
#[derive(Default)]
pub(crate) struct MetricsTracker {
    pub hits: AtomicUsize,
    pub misses: AtomicUsize,
    pub probes: AtomicUsize,
    pub rejected_probes: AtomicUsize,
    pub creations: AtomicUsize,
    pub returns: AtomicUsize,
    pub clears: AtomicUsize,
    pub disposed: AtomicUsize,
    pub shells_recycled: AtomicUsize,
    pub shells_discarded: AtomicUsize,
}

impl MetricsTracker {
    pub fn get_metrics(
        &self,
        available_values: usize,
        available_shells: usize,
        live_handles: usize,
    ) -> PoolMetrics {
        PoolMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
            rejected_probes: self.rejected_probes.load(Ordering::Relaxed),
            creations: self.creations.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            disposed: self.disposed.load(Ordering::Relaxed),
            shells_recycled: self.shells_recycled.load(Ordering::Relaxed),
            shells_discarded: self.shells_discarded.load(Ordering::Relaxed),
            available_values,
            available_shells,
            live_handles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let metrics = PoolMetrics {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((metrics.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(PoolMetrics::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_export_contains_every_field() {
        let tracker = MetricsTracker::default();
        tracker.hits.fetch_add(2, Ordering::Relaxed);
        let exported = tracker.get_metrics(4, 1, 0).export();
        assert_eq!(exported["hits"], "2");
        assert_eq!(exported["available_values"], "4");
        assert_eq!(exported["hit_rate"], "1.00");
        assert_eq!(exported.len(), 14);
    }
}
