//! Prometheus counters for the command processor
//!
//! - `journal_commands_accepted_total` - commands that produced their events
//! - `journal_commands_rejected_total` - commands rejected, labelled by error kind
//! - `journal_events_emitted_total` - events published, control events included

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone, Debug)]
pub struct Metrics {
    /// Commands accepted
    pub commands_accepted: IntCounter,

    /// Commands rejected per error kind
    pub commands_rejected: IntCounterVec,

    /// Events published
    pub events_emitted: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create a collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let commands_accepted = IntCounter::new(
            "journal_commands_accepted_total",
            "Commands that produced their events",
        )?;
        registry.register(Box::new(commands_accepted.clone()))?;

        let commands_rejected = IntCounterVec::new(
            Opts::new(
                "journal_commands_rejected_total",
                "Commands rejected by the processor",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(commands_rejected.clone()))?;

        let events_emitted = IntCounter::new(
            "journal_events_emitted_total",
            "Events published, control events included",
        )?;
        registry.register(Box::new(events_emitted.clone()))?;

        Ok(Self {
            commands_accepted,
            commands_rejected,
            events_emitted,
            registry,
        })
    }

    /// Record an accepted command and its events
    pub fn record_accepted(&self, num_events: u32) {
        self.commands_accepted.inc();
        self.events_emitted.inc_by(u64::from(num_events));
    }

    /// Record a rejected command
    pub fn record_rejected(&self, kind: &str) {
        self.commands_rejected.with_label_values(&[kind]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
