//! Event wire model
//!
//! Events carry string attributes only. Every event emitted for a command
//! carries `transactionId` and `eventSeq`; the control event additionally
//! carries `numEvents`, the total number of events of the transaction
//! including itself.

use crate::address::FAMILY_NAME;
use crate::error::{protocol, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Event type of the ledger's block-commit notification
pub const BLOCK_COMMIT_EVENT_TYPE: &str = "sawtooth/block-commit";

/// Attribute keys
pub mod keys {
    pub const ID: &str = "id";
    pub const TRANSACTION_ID: &str = "transactionId";
    pub const TIMESTAMP: &str = "timestamp";
    pub const EVENT_SEQ: &str = "eventSeq";
    pub const NUM_EVENTS: &str = "numEvents";
    pub const BLOCK_ID: &str = "block_id";
    pub const PREVIOUS_BLOCK_ID: &str = "previous_block_id";

    pub const IS_MAJOR: &str = "isMajor";
    pub const IS_SIGNED: &str = "isSigned";
    pub const BALANCE: &str = "balance";

    pub const JOURNAL_ID: &str = "journalId";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION_HASH: &str = "descriptionHash";
    pub const PERSON_ID: &str = "personId";
    pub const EDITOR_STATE: &str = "editorState";

    pub const ISSUE: &str = "issue";
    pub const LOGICAL_PUBLICATION_TIME: &str = "logicalPublicationTime";

    pub const HASH: &str = "hash";
    pub const THREAD_ID: &str = "threadId";
    pub const VERSION_NUMBER: &str = "versionNumber";
    pub const COMMIT_MSG: &str = "commitMsg";
    pub const STATUS: &str = "status";
    pub const VOLUME_ID: &str = "volumeId";
    pub const FIRST_PAGE: &str = "firstPage";
    pub const LAST_PAGE: &str = "lastPage";
    pub const IS_REVIEWABLE: &str = "isReviewable";
    pub const MANUSCRIPT_ID: &str = "manuscriptId";
    pub const DID_SIGN: &str = "didSign";
    pub const AUTHOR_NUMBER: &str = "authorNumber";

    pub const REVIEW_AUTHOR_ID: &str = "reviewAuthorId";
    pub const JUDGEMENT: &str = "judgement";
    pub const IS_USED_BY_EDITOR: &str = "isUsedByEditor";
}

/// Kinds of events in the family's namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TransactionControl,
    SettingsCreate,
    SettingsUpdate,
    SettingsModificationTime,
    PersonCreate,
    PersonUpdate,
    PersonModificationTime,
    JournalCreate,
    JournalUpdate,
    JournalModificationTime,
    EditorCreate,
    EditorUpdate,
    EditorDelete,
    VolumeCreate,
    ManuscriptCreate,
    ManuscriptUpdate,
    ManuscriptModificationTime,
    AuthorCreate,
    AuthorUpdate,
    ManuscriptThreadUpdate,
    ReviewCreate,
    ReviewUseByEditor,
}

impl EventKind {
    const ALL: [EventKind; 22] = [
        EventKind::TransactionControl,
        EventKind::SettingsCreate,
        EventKind::SettingsUpdate,
        EventKind::SettingsModificationTime,
        EventKind::PersonCreate,
        EventKind::PersonUpdate,
        EventKind::PersonModificationTime,
        EventKind::JournalCreate,
        EventKind::JournalUpdate,
        EventKind::JournalModificationTime,
        EventKind::EditorCreate,
        EventKind::EditorUpdate,
        EventKind::EditorDelete,
        EventKind::VolumeCreate,
        EventKind::ManuscriptCreate,
        EventKind::ManuscriptUpdate,
        EventKind::ManuscriptModificationTime,
        EventKind::AuthorCreate,
        EventKind::AuthorUpdate,
        EventKind::ManuscriptThreadUpdate,
        EventKind::ReviewCreate,
        EventKind::ReviewUseByEditor,
    ];

    /// Event name without the family prefix
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::TransactionControl => "evTransactionControl",
            EventKind::SettingsCreate => "evSettingsCreate",
            EventKind::SettingsUpdate => "evSettingsUpdate",
            EventKind::SettingsModificationTime => "evSettingsModificationTime",
            EventKind::PersonCreate => "evPersonCreate",
            EventKind::PersonUpdate => "evPersonUpdate",
            EventKind::PersonModificationTime => "evPersonModificationTime",
            EventKind::JournalCreate => "evJournalCreate",
            EventKind::JournalUpdate => "evJournalUpdate",
            EventKind::JournalModificationTime => "evJournalModificationTime",
            EventKind::EditorCreate => "evEditorCreate",
            EventKind::EditorUpdate => "evEditorUpdate",
            EventKind::EditorDelete => "evEditorDelete",
            EventKind::VolumeCreate => "evVolumeCreate",
            EventKind::ManuscriptCreate => "evManuscriptCreate",
            EventKind::ManuscriptUpdate => "evManuscriptUpdate",
            EventKind::ManuscriptModificationTime => "evManuscriptModificationTime",
            EventKind::AuthorCreate => "evAuthorCreate",
            EventKind::AuthorUpdate => "evAuthorUpdate",
            EventKind::ManuscriptThreadUpdate => "evManuscriptThreadUpdate",
            EventKind::ReviewCreate => "evReviewCreate",
            EventKind::ReviewUseByEditor => "evReviewUseByEditor",
        }
    }

    /// Full event type, `<family>/<name>`
    pub fn event_type(&self) -> String {
        format!("{}/{}", FAMILY_NAME, self.name())
    }

    /// Parse a full event type
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        let name = event_type.strip_prefix(FAMILY_NAME)?.strip_prefix('/')?;
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ledger event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// `<family>/<name>` or the block-commit type
    pub event_type: String,
    /// Ordered attributes
    pub attributes: Vec<(String, String)>,
    /// Opaque payload, unused by this family
    #[serde(default)]
    pub payload: Vec<u8>,
}

impl Event {
    /// Event of the given kind with no attributes
    pub fn new(kind: EventKind) -> Self {
        Self {
            event_type: kind.event_type(),
            attributes: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Append an attribute
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    /// Value of the first attribute with the given key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a mandatory attribute
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            Some(value) => Ok(value),
            None => protocol(format!("event {} lacks attribute {key}", self.event_type)),
        }
    }

    /// Mandatory attribute parsed into `T`
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.require(key)?;
        match raw.parse() {
            Ok(value) => Ok(value),
            Err(_) => protocol(format!(
                "event {} has unparseable {key}={raw:?}",
                self.event_type
            )),
        }
    }

    /// Kind within the family namespace, if any
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_event_type(&self.event_type)
    }

    /// Whether this is the ledger's block-commit notification
    pub fn is_block_commit(&self) -> bool {
        self.event_type == BLOCK_COMMIT_EVENT_TYPE
    }

    /// Transaction this event belongs to
    pub fn transaction_id(&self) -> Result<&str> {
        self.require(keys::TRANSACTION_ID)
    }

    /// Position of this event within its transaction
    pub fn event_seq(&self) -> Result<u32> {
        self.parse(keys::EVENT_SEQ)
    }
}

/// Decoded control event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionControl {
    pub transaction_id: String,
    pub event_seq: u32,
    pub num_events: u32,
}

impl TransactionControl {
    /// Decode a control event
    pub fn from_event(event: &Event) -> Result<Self> {
        if event.kind() != Some(EventKind::TransactionControl) {
            return protocol(format!("{} is not a control event", event.event_type));
        }
        Ok(Self {
            transaction_id: event.transaction_id()?.to_string(),
            event_seq: event.event_seq()?,
            num_events: event.parse(keys::NUM_EVENTS)?,
        })
    }

    /// Encode as an event
    pub fn to_event(&self) -> Event {
        Event::new(EventKind::TransactionControl)
            .with(keys::TRANSACTION_ID, &self.transaction_id)
            .with(keys::EVENT_SEQ, self.event_seq)
            .with(keys::NUM_EVENTS, self.num_events)
    }
}

/// Decoded block-commit notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCommit {
    pub block_id: String,
    pub previous_block_id: String,
}

impl BlockCommit {
    /// Decode a block-commit event
    pub fn from_event(event: &Event) -> Result<Self> {
        if !event.is_block_commit() {
            return protocol(format!("{} is not a block commit", event.event_type));
        }
        Ok(Self {
            block_id: event.require(keys::BLOCK_ID)?.to_string(),
            previous_block_id: event.require(keys::PREVIOUS_BLOCK_ID)?.to_string(),
        })
    }

    /// Encode as an event
    pub fn to_event(&self) -> Event {
        Event {
            event_type: BLOCK_COMMIT_EVENT_TYPE.to_string(),
            attributes: vec![
                (keys::BLOCK_ID.to_string(), self.block_id.clone()),
                (keys::PREVIOUS_BLOCK_ID.to_string(), self.previous_block_id.clone()),
            ],
            payload: Vec::new(),
        }
    }
}
