//! Ledger gateway
//!
//! [`LedgerAccess`] is the contract of the external key-value ledger.
//! [`ScopedLedger`] wraps any implementation and refuses reads and writes
//! outside the declared address sets of the command being processed. All
//! command processing goes through the scoped wrapper, including tests
//! against [`MemoryLedger`].

use crate::address::Address;
use crate::error::{Error, Result};
use crate::event::Event;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// External ledger operations
pub trait LedgerAccess {
    /// Read the given addresses. Absent addresses are omitted from the result.
    fn get_state(&mut self, addresses: &[Address]) -> Result<HashMap<Address, Vec<u8>>>;

    /// Write all pairs; returns the addresses actually written.
    fn set_state(&mut self, pairs: BTreeMap<Address, Vec<u8>>) -> Result<Vec<Address>>;

    /// Publish an event.
    fn add_event(&mut self, event: Event) -> Result<()>;
}

impl<L: LedgerAccess + ?Sized> LedgerAccess for &mut L {
    fn get_state(&mut self, addresses: &[Address]) -> Result<HashMap<Address, Vec<u8>>> {
        (**self).get_state(addresses)
    }

    fn set_state(&mut self, pairs: BTreeMap<Address, Vec<u8>>) -> Result<Vec<Address>> {
        (**self).set_state(pairs)
    }

    fn add_event(&mut self, event: Event) -> Result<()> {
        (**self).add_event(event)
    }
}

/// Ledger restricted to declared read and write sets
#[derive(Debug)]
pub struct ScopedLedger<'a, L: ?Sized> {
    inner: &'a mut L,
    reads: &'a BTreeSet<Address>,
    writes: &'a BTreeSet<Address>,
}

impl<'a, L: LedgerAccess + ?Sized> ScopedLedger<'a, L> {
    /// Wrap a ledger
    pub fn new(
        inner: &'a mut L,
        reads: &'a BTreeSet<Address>,
        writes: &'a BTreeSet<Address>,
    ) -> Self {
        Self {
            inner,
            reads,
            writes,
        }
    }
}

impl<L: LedgerAccess + ?Sized> LedgerAccess for ScopedLedger<'_, L> {
    fn get_state(&mut self, addresses: &[Address]) -> Result<HashMap<Address, Vec<u8>>> {
        if let Some(address) = addresses.iter().find(|a| !self.reads.contains(*a)) {
            return Err(Error::AccessViolation {
                operation: "GetState",
                address: address.clone(),
            });
        }
        self.inner.get_state(addresses)
    }

    fn set_state(&mut self, pairs: BTreeMap<Address, Vec<u8>>) -> Result<Vec<Address>> {
        if let Some(address) = pairs.keys().find(|a| !self.writes.contains(*a)) {
            return Err(Error::AccessViolation {
                operation: "SetState",
                address: address.clone(),
            });
        }
        self.inner.set_state(pairs)
    }

    fn add_event(&mut self, event: Event) -> Result<()> {
        self.inner.add_event(event)
    }
}

/// In-process ledger for tests and local runs
///
/// Events are held back until the transaction's `SetState` succeeds, like
/// a validator that discards the receipts of a failed transaction. A
/// failure injected with [`MemoryLedger::fail_next_write`] leaves state
/// and the published event log untouched.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    data: HashMap<Address, Vec<u8>>,
    events: Vec<Event>,
    pending: Vec<Event>,
    set_state_calls: usize,
    fail_next_write: bool,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes stored at an address
    pub fn raw(&self, address: &Address) -> Option<&[u8]> {
        self.data.get(address).map(Vec::as_slice)
    }

    /// Decode the record stored at an address
    pub fn record<T: serde::de::DeserializeOwned>(&self, address: &Address) -> Result<Option<T>> {
        match self.data.get(address) {
            Some(bytes) => Ok(Some(bincode::deserialize(bytes)?)),
            None => Ok(None),
        }
    }

    /// All events published so far
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Remove and return all events published so far
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Number of successful `SetState` calls
    pub fn set_state_calls(&self) -> usize {
        self.set_state_calls
    }

    /// Number of stored addresses
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Make the next `SetState` fail with an I/O error
    pub fn fail_next_write(&mut self) {
        self.fail_next_write = true;
    }
}

impl LedgerAccess for MemoryLedger {
    fn get_state(&mut self, addresses: &[Address]) -> Result<HashMap<Address, Vec<u8>>> {
        // A read opens the next transaction; events of an aborted one go
        self.pending.clear();
        Ok(addresses
            .iter()
            .filter_map(|a| self.data.get(a).map(|bytes| (a.clone(), bytes.clone())))
            .collect())
    }

    fn set_state(&mut self, pairs: BTreeMap<Address, Vec<u8>>) -> Result<Vec<Address>> {
        if std::mem::take(&mut self.fail_next_write) {
            self.pending.clear();
            return Err(Error::Ledger("ledger unavailable".into()));
        }
        self.set_state_calls += 1;
        self.events.append(&mut self.pending);
        let written: Vec<Address> = pairs.keys().cloned().collect();
        self.data.extend(pairs);
        Ok(written)
    }

    fn add_event(&mut self, event: Event) -> Result<()> {
        self.pending.push(event);
        Ok(())
    }
}
