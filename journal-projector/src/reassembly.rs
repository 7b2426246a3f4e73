//! Event reassembly
//!
//! Events of one transaction may arrive in any order, the control event
//! included. The buffer keeps a sparse `seq -> event` map per transaction
//! and releases the transaction once the control event has announced
//! `numEvents` and that many distinct sequence numbers are present.

use crate::error::{Error, Result};
use journal_ledger::event::{EventKind, TransactionControl};
use journal_ledger::Event;
use std::collections::{BTreeMap, HashMap};

/// Data events of a complete transaction, in sequence order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedTransaction {
    pub transaction_id: String,
    /// Control event excluded
    pub events: Vec<Event>,
}

#[derive(Debug, Default)]
struct Pending {
    expected: Option<u32>,
    events: BTreeMap<u32, Event>,
}

impl Pending {
    fn is_complete(&self) -> bool {
        self.expected
            .map_or(false, |n| self.events.len() == n as usize)
    }
}

/// Groups events by transaction until each is complete
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    pending: HashMap<String, Pending>,
}

impl ReassemblyBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of incomplete transactions
    pub fn pending_transactions(&self) -> usize {
        self.pending.len()
    }

    /// Add one event; returns the transaction if it is now complete
    ///
    /// A rejected event leaves the buffer as it was.
    pub fn push(&mut self, event: Event) -> Result<Option<CompletedTransaction>> {
        let transaction_id = event
            .transaction_id()
            .map_err(|e| Error::MalformedEvent(e.to_string()))?
            .to_string();
        let seq = event
            .event_seq()
            .map_err(|e| Error::MalformedEvent(e.to_string()))?;
        let control = match event.kind() {
            Some(EventKind::TransactionControl) => Some(
                TransactionControl::from_event(&event)
                    .map_err(|e| Error::MalformedEvent(e.to_string()))?,
            ),
            Some(_) => None,
            None => {
                return Err(Error::MalformedEvent(format!(
                    "unknown event type {}",
                    event.event_type
                )))
            }
        };

        let entry = self.pending.entry(transaction_id.clone()).or_default();
        if let Err(e) = Self::check(entry, &transaction_id, seq, control.as_ref()) {
            if entry.events.is_empty() && entry.expected.is_none() {
                self.pending.remove(&transaction_id);
            }
            return Err(e);
        }
        if let Some(control) = control {
            entry.expected = Some(control.num_events);
        }
        entry.events.insert(seq, event);

        if !entry.is_complete() {
            tracing::trace!(
                transaction_id = %transaction_id,
                seq,
                buffered = entry.events.len(),
                expected = ?entry.expected,
                "Event buffered"
            );
            return Ok(None);
        }

        let pending = self.pending.remove(&transaction_id).unwrap_or_default();
        let events: Vec<Event> = pending
            .events
            .into_values()
            .filter(|e| e.kind() != Some(EventKind::TransactionControl))
            .collect();
        tracing::debug!(
            transaction_id = %transaction_id,
            events = events.len(),
            "Transaction complete"
        );
        Ok(Some(CompletedTransaction {
            transaction_id,
            events,
        }))
    }

    fn check(
        entry: &Pending,
        transaction_id: &str,
        seq: u32,
        control: Option<&TransactionControl>,
    ) -> Result<()> {
        if entry.events.contains_key(&seq) {
            return Err(Error::reassembly(
                transaction_id,
                format!("duplicate eventSeq {seq}"),
            ));
        }
        let expected = match (control, entry.expected) {
            (Some(_), Some(_)) => {
                return Err(Error::reassembly(transaction_id, "second control event"))
            }
            (Some(control), None) => {
                if control.num_events == 0 {
                    return Err(Error::reassembly(transaction_id, "numEvents is zero"));
                }
                if let Some(max) = entry.events.keys().next_back() {
                    if *max >= control.num_events {
                        return Err(Error::reassembly(
                            transaction_id,
                            format!(
                                "buffered eventSeq {max} exceeds numEvents {}",
                                control.num_events
                            ),
                        ));
                    }
                }
                control.num_events
            }
            (None, expected) => match expected {
                Some(n) => n,
                None => return Ok(()),
            },
        };
        if seq >= expected {
            return Err(Error::reassembly(
                transaction_id,
                format!("eventSeq {seq} is not below numEvents {expected}"),
            ));
        }
        Ok(())
    }
}
