//! Command processor
//!
//! Entry point of the write side. One call handles one authenticated
//! command:
//!
//! 1. structural checks ([`check_protocol`])
//! 2. one scoped `GetState` over the declared read set, absorbed into a
//!    fresh [`StagedState`]
//! 3. the body's checker, producing the update list
//! 4. implicit modification-time updates
//! 5. [`emit`]: control event, one event per update, one `SetState`
//!
//! Every ledger call goes through a [`ScopedLedger`], so a checker that
//! strays outside the declared addresses fails with an access violation.

use crate::address::{namespace, Address};
use crate::command::Command;
use crate::config::{Config, FamilyConfig};
use crate::emitter::{emit, Emission};
use crate::error::{protocol, Error, Result};
use crate::gateway::{LedgerAccess, ScopedLedger};
use crate::metrics::Metrics;
use crate::state::StagedState;
use crate::update::with_modification_times;
use crate::validation::{check, check_protocol};
use tracing::{debug, info, warn};

/// Transaction header fields the processor consumes
///
/// Signature verification happens upstream; the signer key here is
/// already authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHeader {
    pub transaction_id: String,
    pub signer_public_key: String,
    pub family_name: String,
    pub family_version: String,
}

/// Validates commands and writes their effects through a ledger
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    family: FamilyConfig,
    metrics: Option<Metrics>,
}

impl CommandProcessor {
    /// Processor for the configured family
    pub fn new(config: &Config) -> Result<Self> {
        let metrics = if config.metrics_enabled {
            Some(Metrics::new().map_err(|e| {
                Error::Config(format!("Failed to register metrics: {}", e))
            })?)
        } else {
            None
        };
        Ok(Self {
            family: config.family.clone(),
            metrics,
        })
    }

    /// Address prefixes this processor owns
    pub fn namespaces(&self) -> Vec<String> {
        vec![namespace().to_string()]
    }

    /// Collected metrics, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Process one command against `ledger`
    pub fn process<L: LedgerAccess + ?Sized>(
        &self,
        header: &TransactionHeader,
        command: &Command,
        ledger: &mut L,
    ) -> Result<Emission> {
        let outcome = self.run(header, command, ledger);
        match &outcome {
            Ok(emission) => {
                info!(
                    transaction_id = %header.transaction_id,
                    command = command.body.name(),
                    signer = %command.signer,
                    num_events = emission.num_events,
                    "Command accepted"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_accepted(emission.num_events);
                }
            }
            Err(e) => {
                warn!(
                    transaction_id = %header.transaction_id,
                    command = command.body.name(),
                    signer = %command.signer,
                    kind = e.kind(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "Command rejected"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejected(e.kind());
                }
            }
        }
        outcome
    }

    fn run<L: LedgerAccess + ?Sized>(
        &self,
        header: &TransactionHeader,
        command: &Command,
        ledger: &mut L,
    ) -> Result<Emission> {
        if !self
            .family
            .accepts(&header.family_name, &header.family_version)
        {
            return protocol(format!(
                "family {} {} is not handled here",
                header.family_name, header.family_version
            ));
        }
        check_protocol(command, &header.transaction_id)?;

        let mut scoped =
            ScopedLedger::new(ledger, &command.read_addresses, &command.write_addresses);
        let reads: Vec<Address> = command.read_addresses.iter().cloned().collect();
        let raw = scoped.get_state(&reads)?;

        let mut state = StagedState::new();
        state.absorb(&raw, &reads)?;
        debug!(
            transaction_id = %header.transaction_id,
            requested = reads.len(),
            found = raw.len(),
            "State staged"
        );

        let updates = with_modification_times(check(
            command,
            &header.signer_public_key,
            &state,
        )?);
        emit(
            &updates,
            &mut state,
            &mut scoped,
            &header.transaction_id,
            command.timestamp,
        )
    }
}
