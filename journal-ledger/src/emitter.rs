//! Update/event emitter
//!
//! Applies a validated update list to staged state, publishes the control
//! event followed by one event per update, and writes every touched address
//! with a single `SetState`. Updates are applied in memory before any ledger
//! call, so a failing update leaves the ledger untouched.

use crate::address::Address;
use crate::error::{Error, Result};
use crate::event::{Event, TransactionControl};
use crate::gateway::LedgerAccess;
use crate::model::Timestamp;
use crate::state::StagedState;
use crate::update::Update;
use std::collections::BTreeSet;

/// Outcome of emitting one command's updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emission {
    /// Events published, control event included
    pub num_events: u32,
    /// Addresses written by the single `SetState`
    pub written: Vec<Address>,
}

/// Apply, publish and write `updates` for one transaction
pub fn emit<L: LedgerAccess + ?Sized>(
    updates: &[Update],
    state: &mut StagedState,
    ledger: &mut L,
    transaction_id: &str,
    timestamp: Timestamp,
) -> Result<Emission> {
    let num_events = u32::try_from(updates.len() + 1)
        .map_err(|_| Error::Internal("too many updates for one transaction".into()))?;

    let mut touched = BTreeSet::new();
    let mut events: Vec<Event> = Vec::with_capacity(updates.len() + 1);
    events.push(
        TransactionControl {
            transaction_id: transaction_id.to_string(),
            event_seq: 0,
            num_events,
        }
        .to_event(),
    );
    for (seq, update) in (1u32..).zip(updates) {
        touched.extend(update.apply_to(state, timestamp)?);
        events.push(update.to_event(seq, transaction_id, timestamp));
    }

    let data = state.serialize(&touched)?;

    for event in events {
        tracing::trace!(event_type = %event.event_type, "Publishing event");
        ledger.add_event(event)?;
    }

    let written = ledger.set_state(data)?;
    if written.len() < touched.len() {
        return Err(Error::Ledger(format!(
            "ledger wrote {} of {} addresses",
            written.len(),
            touched.len()
        )));
    }

    tracing::debug!(
        transaction_id,
        num_events,
        written = written.len(),
        "Updates emitted"
    );

    Ok(Emission {
        num_events,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::EntityKind;
    use crate::event::{keys, EventKind};
    use crate::gateway::{MemoryLedger, ScopedLedger};
    use crate::model::{PriceKind, PriceList};

    #[test]
    fn test_control_event_leads_and_counts() {
        let mut ledger = MemoryLedger::new();
        let mut state = StagedState::new();
        let updates = vec![
            Update::SettingsCreate {
                price_list: PriceList::default(),
            },
            Update::SettingsPrice {
                kind: PriceKind::PersonEdit,
                price: 4,
            },
        ];

        let emission = emit(&updates, &mut state, &mut ledger, "tx-1", 100).unwrap();
        assert_eq!(emission.num_events, 3);
        assert_eq!(emission.written, vec![Address::settings()]);
        assert_eq!(ledger.set_state_calls(), 1);

        let events = ledger.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind(), Some(EventKind::TransactionControl));
        assert_eq!(events[0].get(keys::NUM_EVENTS), Some("3"));
        for (idx, event) in events.iter().enumerate() {
            assert_eq!(event.event_seq().unwrap(), idx as u32);
            assert_eq!(event.transaction_id().unwrap(), "tx-1");
        }
        assert_eq!(events[2].get("pricePersonEdit"), Some("4"));
    }

    #[test]
    fn test_failed_update_publishes_nothing() {
        let mut ledger = MemoryLedger::new();
        let mut state = StagedState::new();
        let updates = vec![
            Update::SettingsCreate {
                price_list: PriceList::default(),
            },
            Update::PersonBalance {
                person_id: Address::create(EntityKind::Person),
                balance: 1,
            },
        ];
        assert!(emit(&updates, &mut state, &mut ledger, "tx", 1).is_err());
        assert!(ledger.events().is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_write_outside_scope_is_access_violation() {
        let mut ledger = MemoryLedger::new();
        let mut state = StagedState::new();
        let reads = BTreeSet::new();
        let writes = BTreeSet::new();
        let mut scoped = ScopedLedger::new(&mut ledger, &reads, &writes);
        let updates = vec![Update::SettingsCreate {
            price_list: PriceList::default(),
        }];
        let err = emit(&updates, &mut state, &mut scoped, "tx", 1).unwrap_err();
        assert!(matches!(err, Error::AccessViolation { .. }));
        assert!(ledger.is_empty());
    }
}
