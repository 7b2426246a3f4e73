//! Prometheus counters for the projector
//!
//! - `journal_events_received_total` - events submitted to the consumer
//! - `journal_transactions_projected_total` - transactions committed to the read model
//! - `journal_rows_written_total` - data manipulations executed
//! - `journal_projection_failures_total` - failures, labelled by error kind

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Events received
    pub events_received: IntCounter,

    /// Transactions committed
    pub transactions_projected: IntCounter,

    /// Data manipulations executed
    pub rows_written: IntCounter,

    /// Failures per error kind
    pub projection_failures: IntCounterVec,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create a collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let events_received = IntCounter::new(
            "journal_events_received_total",
            "Events submitted to the consumer",
        )?;
        registry.register(Box::new(events_received.clone()))?;

        let transactions_projected = IntCounter::new(
            "journal_transactions_projected_total",
            "Transactions committed to the read model",
        )?;
        registry.register(Box::new(transactions_projected.clone()))?;

        let rows_written = IntCounter::new(
            "journal_rows_written_total",
            "Data manipulations executed",
        )?;
        registry.register(Box::new(rows_written.clone()))?;

        let projection_failures = IntCounterVec::new(
            Opts::new(
                "journal_projection_failures_total",
                "Reassembly and projection failures",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(projection_failures.clone()))?;

        Ok(Self {
            events_received,
            transactions_projected,
            rows_written,
            projection_failures,
            registry,
        })
    }

    /// Record a received event
    pub fn record_event(&self) {
        self.events_received.inc();
    }

    /// Record a committed transaction and its row count
    pub fn record_projected(&self, rows: usize) {
        self.transactions_projected.inc();
        self.rows_written.inc_by(rows as u64);
    }

    /// Record a failure
    pub fn record_failure(&self, kind: &str) {
        self.projection_failures.with_label_values(&[kind]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
