//! Decoded commands
//!
//! A command is the authenticated, decoded form of a client transaction:
//! signer, price, timestamp, declared address sets and one body variant.
//! [`CommandBody::declared_addresses`] derives the address sets a body needs,
//! so clients and tests build well-formed commands with [`Command::new`].

use crate::address::Address;
use crate::model::{
    Author, Judgement, ManuscriptJudgement, ManuscriptStatus, PersonField, PriceKind, PriceList,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Old and new value of one field
///
/// The old value must equal current state for the command to be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldUpdate<T> {
    pub old: T,
    pub new: T,
}

impl<T: PartialEq> FieldUpdate<T> {
    /// Create a field update
    pub fn new(old: T, new: T) -> Self {
        Self { old, new }
    }

    /// Whether applying the update changes anything
    pub fn is_change(&self) -> bool {
        self.old != self.new
    }
}

/// Requested change of a boolean flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BoolUpdate {
    #[default]
    Unmodified,
    MakeTrue,
    MakeFalse,
}

impl BoolUpdate {
    /// Resulting value given the current one
    pub fn apply(self, current: bool) -> bool {
        match self {
            BoolUpdate::Unmodified => current,
            BoolUpdate::MakeTrue => true,
            BoolUpdate::MakeFalse => false,
        }
    }
}

/// Person data supplied at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonCreate {
    pub new_person_id: Address,
    pub public_key: String,
    pub name: String,
    pub email: String,
}

/// Reference to one manuscript of a thread, as the client saw it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptReference {
    pub manuscript_id: Address,
    pub status: ManuscriptStatus,
}

/// First version of a manuscript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptCreate {
    pub manuscript_id: Address,
    pub thread_id: Address,
    pub journal_id: Address,
    pub hash: String,
    pub commit_msg: String,
    pub title: String,
    /// In author number order
    pub author_ids: Vec<Address>,
}

/// Next version of a manuscript in an existing thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptNewVersion {
    pub manuscript_id: Address,
    pub previous_manuscript_id: Address,
    pub thread_id: Address,
    pub journal_id: Address,
    pub hash: String,
    pub commit_msg: String,
    pub title: String,
    pub author_ids: Vec<Address>,
    /// The thread as the client saw it
    pub thread_reference: Vec<ManuscriptReference>,
    /// Everyone who signed a version of the thread
    pub historic_author_ids: Vec<Address>,
}

/// Closed set of command bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandBody {
    Bootstrap {
        price_list: PriceList,
        first_major: PersonCreate,
    },
    SettingsUpdate {
        prices: BTreeMap<PriceKind, FieldUpdate<i32>>,
    },
    PersonCreate(PersonCreate),
    PersonUpdateProperties {
        person_id: Address,
        fields: BTreeMap<PersonField, FieldUpdate<String>>,
    },
    PersonUpdateAuthorization {
        person_id: Address,
        make_major: BoolUpdate,
        make_signed: BoolUpdate,
    },
    PersonUpdateBalanceIncrement {
        person_id: Address,
        increment: i32,
    },
    JournalCreate {
        journal_id: Address,
        title: String,
    },
    JournalUpdateProperties {
        journal_id: Address,
        title: Option<FieldUpdate<String>>,
        description_hash: Option<FieldUpdate<String>>,
    },
    JournalUpdateAuthorization {
        journal_id: Address,
        make_signed: BoolUpdate,
    },
    EditorInvite {
        journal_id: Address,
        invited_editor_id: Address,
    },
    EditorAcceptDuty {
        journal_id: Address,
    },
    EditorResign {
        journal_id: Address,
    },
    VolumeCreate {
        volume_id: Address,
        journal_id: Address,
        issue: String,
        logical_publication_time: Timestamp,
    },
    ManuscriptCreate(ManuscriptCreate),
    ManuscriptCreateNewVersion(ManuscriptNewVersion),
    ManuscriptAcceptAuthorship {
        manuscript_id: Address,
        thread_id: Address,
        authors: Vec<Author>,
    },
    ManuscriptAllowReview {
        thread_id: Address,
        journal_id: Address,
        thread_reference: Vec<ManuscriptReference>,
    },
    WriteReview {
        review_id: Address,
        manuscript_id: Address,
        hash: String,
        judgement: Judgement,
    },
    ManuscriptJudge {
        manuscript_id: Address,
        journal_id: Address,
        review_ids: Vec<Address>,
        judgement: ManuscriptJudgement,
    },
    ManuscriptAssign {
        manuscript_id: Address,
        journal_id: Address,
        volume_id: Address,
        first_page: String,
        last_page: String,
    },
}

/// Declared read and write address sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredAddresses {
    pub reads: BTreeSet<Address>,
    pub writes: BTreeSet<Address>,
}

impl DeclaredAddresses {
    fn read(&mut self, addresses: impl IntoIterator<Item = Address>) -> &mut Self {
        self.reads.extend(addresses);
        self
    }

    fn write(&mut self, addresses: impl IntoIterator<Item = Address>) -> &mut Self {
        let addresses: Vec<Address> = addresses.into_iter().collect();
        self.reads.extend(addresses.iter().cloned());
        self.writes.extend(addresses);
        self
    }
}

impl CommandBody {
    /// Short name for logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            CommandBody::Bootstrap { .. } => "bootstrap",
            CommandBody::SettingsUpdate { .. } => "settings_update",
            CommandBody::PersonCreate(_) => "person_create",
            CommandBody::PersonUpdateProperties { .. } => "person_update_properties",
            CommandBody::PersonUpdateAuthorization { .. } => "person_update_authorization",
            CommandBody::PersonUpdateBalanceIncrement { .. } => "person_update_balance_increment",
            CommandBody::JournalCreate { .. } => "journal_create",
            CommandBody::JournalUpdateProperties { .. } => "journal_update_properties",
            CommandBody::JournalUpdateAuthorization { .. } => "journal_update_authorization",
            CommandBody::EditorInvite { .. } => "editor_invite",
            CommandBody::EditorAcceptDuty { .. } => "editor_accept_duty",
            CommandBody::EditorResign { .. } => "editor_resign",
            CommandBody::VolumeCreate { .. } => "volume_create",
            CommandBody::ManuscriptCreate(_) => "manuscript_create",
            CommandBody::ManuscriptCreateNewVersion(_) => "manuscript_create_new_version",
            CommandBody::ManuscriptAcceptAuthorship { .. } => "manuscript_accept_authorship",
            CommandBody::ManuscriptAllowReview { .. } => "manuscript_allow_review",
            CommandBody::WriteReview { .. } => "write_review",
            CommandBody::ManuscriptJudge { .. } => "manuscript_judge",
            CommandBody::ManuscriptAssign { .. } => "manuscript_assign",
        }
    }

    /// Addresses the body's validation reads and writes
    ///
    /// Every write address is also a read address. The signer is always
    /// read and written.
    pub fn declared_addresses(&self, signer: &Address) -> DeclaredAddresses {
        let mut d = DeclaredAddresses::default();
        d.write([signer.clone()]);
        if !matches!(self, CommandBody::Bootstrap { .. }) {
            d.read([Address::settings()]);
        }
        match self {
            CommandBody::Bootstrap { .. } | CommandBody::SettingsUpdate { .. } => {
                d.write([Address::settings()]);
            }
            CommandBody::PersonCreate(create) => {
                d.write([create.new_person_id.clone()]);
            }
            CommandBody::PersonUpdateProperties { person_id, .. }
            | CommandBody::PersonUpdateAuthorization { person_id, .. }
            | CommandBody::PersonUpdateBalanceIncrement { person_id, .. } => {
                d.write([person_id.clone()]);
            }
            CommandBody::JournalCreate { journal_id, .. }
            | CommandBody::JournalUpdateProperties { journal_id, .. }
            | CommandBody::JournalUpdateAuthorization { journal_id, .. }
            | CommandBody::EditorInvite { journal_id, .. }
            | CommandBody::EditorAcceptDuty { journal_id }
            | CommandBody::EditorResign { journal_id } => {
                d.write([journal_id.clone()]);
            }
            CommandBody::VolumeCreate {
                volume_id,
                journal_id,
                ..
            } => {
                d.read([journal_id.clone()]).write([volume_id.clone()]);
            }
            CommandBody::ManuscriptCreate(create) => {
                d.read(create.author_ids.iter().cloned())
                    .read([create.journal_id.clone()])
                    .write([create.manuscript_id.clone(), create.thread_id.clone()]);
            }
            CommandBody::ManuscriptCreateNewVersion(version) => {
                d.read(version.author_ids.iter().cloned())
                    .read(version.historic_author_ids.iter().cloned())
                    .read(version.thread_reference.iter().map(|r| r.manuscript_id.clone()))
                    .read([
                        version.previous_manuscript_id.clone(),
                        version.journal_id.clone(),
                    ])
                    .write([version.manuscript_id.clone(), version.thread_id.clone()]);
            }
            CommandBody::ManuscriptAcceptAuthorship {
                manuscript_id,
                thread_id,
                ..
            } => {
                d.read([thread_id.clone()]).write([manuscript_id.clone()]);
            }
            CommandBody::ManuscriptAllowReview {
                thread_id,
                journal_id,
                thread_reference,
            } => {
                d.read([journal_id.clone()])
                    .write([thread_id.clone()])
                    .write(thread_reference.iter().map(|r| r.manuscript_id.clone()));
            }
            CommandBody::WriteReview {
                review_id,
                manuscript_id,
                ..
            } => {
                d.read([manuscript_id.clone()]).write([review_id.clone()]);
            }
            CommandBody::ManuscriptJudge {
                manuscript_id,
                journal_id,
                review_ids,
                ..
            } => {
                d.read([journal_id.clone()])
                    .write([manuscript_id.clone()])
                    .write(review_ids.iter().cloned());
            }
            CommandBody::ManuscriptAssign {
                manuscript_id,
                journal_id,
                volume_id,
                ..
            } => {
                d.read([journal_id.clone(), volume_id.clone()])
                    .write([manuscript_id.clone()]);
            }
        }
        d
    }
}

/// Decoded, authenticated command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub signer: Address,
    pub price: i32,
    pub timestamp: Timestamp,
    pub read_addresses: BTreeSet<Address>,
    pub write_addresses: BTreeSet<Address>,
    /// Opaque, verified upstream
    pub signature: Vec<u8>,
    pub body: CommandBody,
}

impl Command {
    /// Command with address sets derived from the body
    pub fn new(signer: Address, price: i32, timestamp: Timestamp, body: CommandBody) -> Self {
        let declared = body.declared_addresses(&signer);
        Self {
            signer,
            price,
            timestamp,
            read_addresses: declared.reads,
            write_addresses: declared.writes,
            signature: Vec::new(),
            body,
        }
    }

    /// Attach the upstream signature
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = signature;
        self
    }
}
