//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges the task engine reports.

use std::sync::Arc;

use prometheus::{
    Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder, core::Collector,
};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    tasks_scheduled_total: IntCounterVec,
    tasks_finished_total: IntCounterVec,
    task_retries_total: IntCounterVec,
    units_copied_total: IntCounterVec,
    task_queue_depth: IntGauge,
    tasks_running: IntGauge,
}

/// Snapshot of selected gauges for health reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Tasks accepted but not yet picked up by a worker.
    pub task_queue_depth: i64,
    /// Tasks currently executing.
    pub tasks_running: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let tasks_scheduled_total = counter_vec(
            "tasks_scheduled_total",
            "Tasks accepted by the engine by kind",
            &["kind"],
        )?;
        let tasks_finished_total = counter_vec(
            "tasks_finished_total",
            "Tasks that reached a terminal state by kind and status",
            &["kind", "status"],
        )?;
        let task_retries_total = counter_vec(
            "task_retries_total",
            "Task attempts re-queued after a retryable failure",
            &["kind"],
        )?;
        let units_copied_total = counter_vec(
            "units_copied_total",
            "Content units handed to the backend for copying by unit kind",
            &["unit_kind"],
        )?;
        let task_queue_depth = gauge("task_queue_depth", "Tasks waiting for a worker")?;
        let tasks_running = gauge("tasks_running", "Tasks currently executing")?;

        register(&registry, "tasks_scheduled_total", &tasks_scheduled_total)?;
        register(&registry, "tasks_finished_total", &tasks_finished_total)?;
        register(&registry, "task_retries_total", &task_retries_total)?;
        register(&registry, "units_copied_total", &units_copied_total)?;
        register(&registry, "task_queue_depth", &task_queue_depth)?;
        register(&registry, "tasks_running", &tasks_running)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                tasks_scheduled_total,
                tasks_finished_total,
                task_retries_total,
                units_copied_total,
                task_queue_depth,
                tasks_running,
            }),
        })
    }

    /// Record a task accepted by the engine.
    pub fn inc_task_scheduled(&self, kind: &str) {
        self.inner
            .tasks_scheduled_total
            .with_label_values(&[kind])
            .inc();
        self.inner.task_queue_depth.inc();
    }

    /// Record a worker picking a task up.
    pub fn task_started(&self) {
        self.inner.task_queue_depth.dec();
        self.inner.tasks_running.inc();
    }

    /// Record a task attempt that will be retried.
    pub fn inc_task_retry(&self, kind: &str) {
        self.inner
            .task_retries_total
            .with_label_values(&[kind])
            .inc();
        self.inner.tasks_running.dec();
        self.inner.task_queue_depth.inc();
    }

    /// Record a task reaching a terminal state (`succeeded` or `failed`).
    pub fn inc_task_finished(&self, kind: &str, status: &str) {
        self.inner
            .tasks_finished_total
            .with_label_values(&[kind, status])
            .inc();
        self.inner.tasks_running.dec();
    }

    /// Record units handed to the backend.
    pub fn add_units_copied(&self, unit_kind: &str, count: usize) {
        self.inner
            .units_copied_total
            .with_label_values(&[unit_kind])
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the task gauges.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            task_queue_depth: self.inner.task_queue_depth.get(),
            tasks_running: self.inner.tasks_running.get(),
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
