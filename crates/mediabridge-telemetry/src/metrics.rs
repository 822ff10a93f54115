//! Prometheus metrics for the reconciliation engine.

use std::sync::Arc;

use prometheus::{Encoder, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Counters and gauges describing reconciliation activity.
#[derive(Clone)]
pub struct ReconcileMetrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    cycles_total: IntCounterVec,
    failures_total: IntCounterVec,
    culled_total: IntCounterVec,
    swept_total: IntCounterVec,
    inventory_rows: IntGaugeVec,
}

/// Point-in-time totals across all label values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Task runs started.
    pub cycles: u64,
    /// Task runs that ended in an error.
    pub failures: u64,
    /// Transfers removed as stuck.
    pub culled: u64,
    /// Requests force-completed by the sweeper.
    pub swept: u64,
}

fn counter_vec(name: &'static str, help: &str, label: &str) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), &[label])
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register(
    registry: &Registry,
    name: &'static str,
    collector: Box<dyn prometheus::core::Collector>,
) -> Result<()> {
    registry
        .register(collector)
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

impl ReconcileMetrics {
    /// Build a registry with the reconciliation collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let cycles_total = counter_vec(
            "reconcile_cycles_total",
            "Reconciliation task runs by task",
            "task",
        )?;
        let failures_total = counter_vec(
            "reconcile_failures_total",
            "Reconciliation task runs that failed, by task",
            "task",
        )?;
        let culled_total = counter_vec(
            "transfers_culled_total",
            "Stuck transfers removed and re-searched, by media kind",
            "kind",
        )?;
        let swept_total = counter_vec(
            "requests_swept_total",
            "Requests force-completed after going quiet, by media kind",
            "kind",
        )?;
        let inventory_rows = IntGaugeVec::new(
            Opts::new("inventory_rows", "Rows in each inventory snapshot table"),
            &["table"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "inventory_rows",
            source,
        })?;

        register(&registry, "reconcile_cycles_total", Box::new(cycles_total.clone()))?;
        register(&registry, "reconcile_failures_total", Box::new(failures_total.clone()))?;
        register(&registry, "transfers_culled_total", Box::new(culled_total.clone()))?;
        register(&registry, "requests_swept_total", Box::new(swept_total.clone()))?;
        register(&registry, "inventory_rows", Box::new(inventory_rows.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                cycles_total,
                failures_total,
                culled_total,
                swept_total,
                inventory_rows,
            }),
        })
    }

    /// Count a started run of `task`.
    pub fn inc_cycle(&self, task: &str) {
        self.inner.cycles_total.with_label_values(&[task]).inc();
    }

    /// Count a failed run of `task`.
    pub fn inc_failure(&self, task: &str) {
        self.inner.failures_total.with_label_values(&[task]).inc();
    }

    /// Count a culled transfer.
    pub fn inc_culled(&self, kind: &str) {
        self.inner.culled_total.with_label_values(&[kind]).inc();
    }

    /// Count `count` swept requests.
    pub fn add_swept(&self, kind: &str, count: usize) {
        self.inner
            .swept_total
            .with_label_values(&[kind])
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Record the row count of an inventory table.
    pub fn set_inventory_rows(&self, table: &str, rows: usize) {
        self.inner
            .inventory_rows
            .with_label_values(&[table])
            .set(i64::try_from(rows).unwrap_or(i64::MAX));
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Totals summed over every label value.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles: sum(&self.inner.cycles_total),
            failures: sum(&self.inner.failures_total),
            culled: sum(&self.inner.culled_total),
            swept: sum(&self.inner.swept_total),
        }
    }
}

fn sum(counter: &IntCounterVec) -> u64 {
    use prometheus::core::Collector;

    counter
        .collect()
        .iter()
        .flat_map(|family| family.get_metric().iter())
        .map(|metric| counter_value(metric.get_counter().value()))
        .sum()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn counter_value(value: f64) -> u64 {
    if value.is_sign_negative() {
        0
    } else {
        value as u64
    }
}
