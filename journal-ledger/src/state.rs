//! Staged state
//!
//! Per-command cache of ledger reads. Every address the command requested is
//! either EMPTY (ledger confirmed absent) or FILLED (decoded record). An
//! address that was never requested stays UNKNOWN, which is never the same
//! as EMPTY.

use crate::address::{Address, EntityKind};
use crate::error::{Error, Result};
use crate::model::{Journal, Manuscript, ManuscriptThread, Person, Review, Settings, Volume};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Classification of an address in staged state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressState {
    /// Never requested from the ledger
    Unknown,
    /// Requested, ledger has no data
    Empty,
    /// Requested and decoded
    Filled,
}

/// In-memory cache of typed records for one command
#[derive(Debug, Clone, Default)]
pub struct StagedState {
    empty: HashSet<Address>,
    settings: Option<Settings>,
    persons: HashMap<Address, Person>,
    journals: HashMap<Address, Journal>,
    volumes: HashMap<Address, Volume>,
    manuscripts: HashMap<Address, Manuscript>,
    threads: HashMap<Address, ManuscriptThread>,
    reviews: HashMap<Address, Review>,
}

impl StagedState {
    /// Create empty staged state
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an address
    pub fn classify(&self, address: &Address) -> AddressState {
        if self.empty.contains(address) {
            return AddressState::Empty;
        }
        let filled = match address.kind() {
            EntityKind::Settings => self.settings.is_some(),
            EntityKind::Person => self.persons.contains_key(address),
            EntityKind::Journal => self.journals.contains_key(address),
            EntityKind::Volume => self.volumes.contains_key(address),
            EntityKind::Manuscript => self.manuscripts.contains_key(address),
            EntityKind::ManuscriptThread => self.threads.contains_key(address),
            EntityKind::Review => self.reviews.contains_key(address),
        };
        if filled {
            AddressState::Filled
        } else {
            AddressState::Unknown
        }
    }

    /// Absorb a `GetState` result for the requested addresses
    pub fn absorb<'a>(
        &mut self,
        raw: &HashMap<Address, Vec<u8>>,
        requested: impl IntoIterator<Item = &'a Address>,
    ) -> Result<()> {
        for address in requested {
            match raw.get(address).filter(|bytes| !bytes.is_empty()) {
                Some(bytes) => self.decode(address, bytes)?,
                None => {
                    self.forget(address);
                    self.empty.insert(address.clone());
                }
            }
        }
        Ok(())
    }

    fn decode(&mut self, address: &Address, bytes: &[u8]) -> Result<()> {
        self.empty.remove(address);
        match address.kind() {
            EntityKind::Settings => self.settings = Some(bincode::deserialize(bytes)?),
            EntityKind::Person => {
                self.persons.insert(address.clone(), bincode::deserialize(bytes)?);
            }
            EntityKind::Journal => {
                self.journals.insert(address.clone(), bincode::deserialize(bytes)?);
            }
            EntityKind::Volume => {
                self.volumes.insert(address.clone(), bincode::deserialize(bytes)?);
            }
            EntityKind::Manuscript => {
                self.manuscripts.insert(address.clone(), bincode::deserialize(bytes)?);
            }
            EntityKind::ManuscriptThread => {
                self.threads.insert(address.clone(), bincode::deserialize(bytes)?);
            }
            EntityKind::Review => {
                self.reviews.insert(address.clone(), bincode::deserialize(bytes)?);
            }
        }
        Ok(())
    }

    fn forget(&mut self, address: &Address) {
        match address.kind() {
            EntityKind::Settings => self.settings = None,
            EntityKind::Person => drop(self.persons.remove(address)),
            EntityKind::Journal => drop(self.journals.remove(address)),
            EntityKind::Volume => drop(self.volumes.remove(address)),
            EntityKind::Manuscript => drop(self.manuscripts.remove(address)),
            EntityKind::ManuscriptThread => drop(self.threads.remove(address)),
            EntityKind::Review => drop(self.reviews.remove(address)),
        }
    }

    /// Encode the records at the given addresses for `SetState`
    pub fn serialize<'a>(
        &self,
        addresses: impl IntoIterator<Item = &'a Address>,
    ) -> Result<BTreeMap<Address, Vec<u8>>> {
        let mut out = BTreeMap::new();
        for address in addresses {
            let bytes = match address.kind() {
                EntityKind::Settings => self.settings.as_ref().map(bincode::serialize),
                EntityKind::Person => self.persons.get(address).map(bincode::serialize),
                EntityKind::Journal => self.journals.get(address).map(bincode::serialize),
                EntityKind::Volume => self.volumes.get(address).map(bincode::serialize),
                EntityKind::Manuscript => self.manuscripts.get(address).map(bincode::serialize),
                EntityKind::ManuscriptThread => self.threads.get(address).map(bincode::serialize),
                EntityKind::Review => self.reviews.get(address).map(bincode::serialize),
            };
            let bytes = bytes
                .ok_or_else(|| Error::Internal(format!("no staged record at {address}")))??;
            out.insert(address.clone(), bytes);
        }
        Ok(out)
    }

    /// Settings, if filled
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    pub(crate) fn settings_mut(&mut self) -> Result<&mut Settings> {
        self.settings
            .as_mut()
            .ok_or_else(|| Error::Internal("settings not staged".into()))
    }

    pub(crate) fn put_settings(&mut self, settings: Settings) {
        self.empty.remove(&Address::settings());
        self.settings = Some(settings);
    }

    /// Person at an address, if filled
    pub fn person(&self, id: &Address) -> Option<&Person> {
        self.persons.get(id)
    }

    pub(crate) fn person_mut(&mut self, id: &Address) -> Result<&mut Person> {
        self.persons
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("person {id} not staged")))
    }

    pub(crate) fn put_person(&mut self, person: Person) {
        self.empty.remove(&person.id);
        self.persons.insert(person.id.clone(), person);
    }

    /// Journal at an address, if filled
    pub fn journal(&self, id: &Address) -> Option<&Journal> {
        self.journals.get(id)
    }

    pub(crate) fn journal_mut(&mut self, id: &Address) -> Result<&mut Journal> {
        self.journals
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("journal {id} not staged")))
    }

    pub(crate) fn put_journal(&mut self, journal: Journal) {
        self.empty.remove(&journal.id);
        self.journals.insert(journal.id.clone(), journal);
    }

    /// Volume at an address, if filled
    pub fn volume(&self, id: &Address) -> Option<&Volume> {
        self.volumes.get(id)
    }

    pub(crate) fn put_volume(&mut self, volume: Volume) {
        self.empty.remove(&volume.id);
        self.volumes.insert(volume.id.clone(), volume);
    }

    /// Manuscript at an address, if filled
    pub fn manuscript(&self, id: &Address) -> Option<&Manuscript> {
        self.manuscripts.get(id)
    }

    pub(crate) fn manuscript_mut(&mut self, id: &Address) -> Result<&mut Manuscript> {
        self.manuscripts
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("manuscript {id} not staged")))
    }

    pub(crate) fn put_manuscript(&mut self, manuscript: Manuscript) {
        self.empty.remove(&manuscript.id);
        self.manuscripts.insert(manuscript.id.clone(), manuscript);
    }

    /// Manuscript thread at an address, if filled
    pub fn thread(&self, id: &Address) -> Option<&ManuscriptThread> {
        self.threads.get(id)
    }

    pub(crate) fn thread_mut(&mut self, id: &Address) -> Result<&mut ManuscriptThread> {
        self.threads
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("thread {id} not staged")))
    }

    pub(crate) fn put_thread(&mut self, thread: ManuscriptThread) {
        self.empty.remove(&thread.id);
        self.threads.insert(thread.id.clone(), thread);
    }

    /// Review at an address, if filled
    pub fn review(&self, id: &Address) -> Option<&Review> {
        self.reviews.get(id)
    }

    pub(crate) fn review_mut(&mut self, id: &Address) -> Result<&mut Review> {
        self.reviews
            .get_mut(id)
            .ok_or_else(|| Error::Internal(format!("review {id} not staged")))
    }

    pub(crate) fn put_review(&mut self, review: Review) {
        self.empty.remove(&review.id);
        self.reviews.insert(review.id.clone(), review);
    }
}
