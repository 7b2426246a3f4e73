//! Ledger records
//!
//! All records are stored as bincode bytes at their address. Field order is
//! part of the encoding and must not change.

use crate::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix time in seconds
pub type Timestamp = i64;

/// Current unix time in seconds
pub fn current_time() -> Timestamp {
    chrono::Utc::now().timestamp()
}

/// Privileged operations that carry a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PriceKind {
    /// Edit settings
    MajorEditSettings,
    /// Create a person
    MajorCreatePerson,
    /// Change person authorization
    MajorChangePersonAuthorization,
    /// Change journal authorization
    MajorChangeJournalAuthorization,
    /// Edit own person properties
    PersonEdit,
    /// Submit a new manuscript
    AuthorSubmitNewManuscript,
    /// Submit a new version of a manuscript
    AuthorSubmitNewVersion,
    /// Accept authorship
    AuthorAcceptAuthorship,
    /// Submit a review
    ReviewerSubmit,
    /// Allow review of a manuscript thread
    EditorAllowManuscriptReview,
    /// Reject a manuscript
    EditorRejectManuscript,
    /// Publish a manuscript
    EditorPublishManuscript,
    /// Assign a manuscript to a volume
    EditorAssignManuscript,
    /// Create a journal
    EditorCreateJournal,
    /// Create a volume
    EditorCreateVolume,
    /// Edit journal properties
    EditorEditJournal,
    /// Invite a colleague editor
    EditorAddColleague,
    /// Accept editor duty
    EditorAcceptDuty,
}

impl PriceKind {
    /// Number of prices in a price list
    pub const COUNT: usize = 18;

    /// All prices in price list order
    pub const ALL: [PriceKind; PriceKind::COUNT] = [
        PriceKind::MajorEditSettings,
        PriceKind::MajorCreatePerson,
        PriceKind::MajorChangePersonAuthorization,
        PriceKind::MajorChangeJournalAuthorization,
        PriceKind::PersonEdit,
        PriceKind::AuthorSubmitNewManuscript,
        PriceKind::AuthorSubmitNewVersion,
        PriceKind::AuthorAcceptAuthorship,
        PriceKind::ReviewerSubmit,
        PriceKind::EditorAllowManuscriptReview,
        PriceKind::EditorRejectManuscript,
        PriceKind::EditorPublishManuscript,
        PriceKind::EditorAssignManuscript,
        PriceKind::EditorCreateJournal,
        PriceKind::EditorCreateVolume,
        PriceKind::EditorEditJournal,
        PriceKind::EditorAddColleague,
        PriceKind::EditorAcceptDuty,
    ];

    /// Position in the price list
    pub fn index(self) -> usize {
        self as usize
    }

    /// Event attribute key
    pub fn event_key(self) -> &'static str {
        match self {
            PriceKind::MajorEditSettings => "priceMajorEditSettings",
            PriceKind::MajorCreatePerson => "priceMajorCreatePerson",
            PriceKind::MajorChangePersonAuthorization => "priceMajorChangePersonAuthorization",
            PriceKind::MajorChangeJournalAuthorization => "priceMajorChangeJournalAuthorization",
            PriceKind::PersonEdit => "pricePersonEdit",
            PriceKind::AuthorSubmitNewManuscript => "priceAuthorSubmitNewManuscript",
            PriceKind::AuthorSubmitNewVersion => "priceAuthorSubmitNewVersion",
            PriceKind::AuthorAcceptAuthorship => "priceAuthorAcceptAuthorship",
            PriceKind::ReviewerSubmit => "priceReviewerSubmit",
            PriceKind::EditorAllowManuscriptReview => "priceEditorAllowManuscriptReview",
            PriceKind::EditorRejectManuscript => "priceEditorRejectManuscript",
            PriceKind::EditorPublishManuscript => "priceEditorPublishManuscript",
            PriceKind::EditorAssignManuscript => "priceEditorAssignManuscript",
            PriceKind::EditorCreateJournal => "priceEditorCreateJournal",
            PriceKind::EditorCreateVolume => "priceEditorCreateVolume",
            PriceKind::EditorEditJournal => "priceEditorEditJournal",
            PriceKind::EditorAddColleague => "priceEditorAddColleague",
            PriceKind::EditorAcceptDuty => "priceEditorAcceptDuty",
        }
    }

    /// Parse an event attribute key
    pub fn from_event_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.event_key() == key)
    }

    /// Relational column name
    pub fn column(self) -> String {
        self.event_key().to_lowercase()
    }
}

/// One price per privileged operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    prices: [i32; PriceKind::COUNT],
}

impl PriceList {
    /// Build from values in price list order
    pub fn from_values(values: [i32; PriceKind::COUNT]) -> Self {
        Self { prices: values }
    }

    /// Price of an operation
    pub fn price_for(&self, kind: PriceKind) -> i32 {
        self.prices[kind.index()]
    }

    /// Set the price of an operation
    pub fn set(&mut self, kind: PriceKind, price: i32) {
        self.prices[kind.index()] = price;
    }

    /// Prices paired with their kind, in list order
    pub fn iter(&self) -> impl Iterator<Item = (PriceKind, i32)> + '_ {
        PriceKind::ALL.into_iter().map(move |kind| (kind, self.price_for(kind)))
    }
}

/// Settings singleton
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Creation time
    pub created_on: Timestamp,
    /// Last modification time
    pub modified_on: Timestamp,
    /// Prices
    pub price_list: PriceList,
}

/// Editable string properties of a person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PersonField {
    /// Public key
    PublicKey,
    /// Display name
    Name,
    /// Email
    Email,
    /// Hash of the biography document
    BiographyHash,
    /// Organization
    Organization,
    /// Telephone
    Telephone,
    /// Postal address
    Address,
    /// Postal code
    PostalCode,
    /// Country
    Country,
    /// Free text
    ExtraInfo,
}

impl PersonField {
    /// Event attribute key
    pub fn event_key(self) -> &'static str {
        match self {
            PersonField::PublicKey => "publicKey",
            PersonField::Name => "name",
            PersonField::Email => "email",
            PersonField::BiographyHash => "biographyHash",
            PersonField::Organization => "organization",
            PersonField::Telephone => "telephone",
            PersonField::Address => "address",
            PersonField::PostalCode => "postalCode",
            PersonField::Country => "country",
            PersonField::ExtraInfo => "extraInfo",
        }
    }

    /// Relational column name
    pub fn column(self) -> String {
        self.event_key().to_lowercase()
    }

    /// All properties
    pub const ALL: [PersonField; 10] = [
        PersonField::PublicKey,
        PersonField::Name,
        PersonField::Email,
        PersonField::BiographyHash,
        PersonField::Organization,
        PersonField::Telephone,
        PersonField::Address,
        PersonField::PostalCode,
        PersonField::Country,
        PersonField::ExtraInfo,
    ];

    /// Parse an event attribute key
    pub fn from_event_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.event_key() == key)
    }
}

/// Boolean authorization flags of a person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonFlag {
    /// May perform privileged operations
    IsMajor,
    /// Identity confirmed
    IsSigned,
}

impl PersonFlag {
    /// Event attribute key
    pub fn event_key(self) -> &'static str {
        match self {
            PersonFlag::IsMajor => "isMajor",
            PersonFlag::IsSigned => "isSigned",
        }
    }
}

/// Person record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Address,
    pub created_on: Timestamp,
    pub modified_on: Timestamp,
    pub public_key: String,
    pub name: String,
    pub email: String,
    pub is_major: bool,
    pub is_signed: bool,
    pub balance: i32,
    pub biography_hash: String,
    pub organization: String,
    pub telephone: String,
    pub address: String,
    pub postal_code: String,
    pub country: String,
    pub extra_info: String,
}

impl Person {
    /// Read a string property
    pub fn field(&self, field: PersonField) -> &str {
        match field {
            PersonField::PublicKey => &self.public_key,
            PersonField::Name => &self.name,
            PersonField::Email => &self.email,
            PersonField::BiographyHash => &self.biography_hash,
            PersonField::Organization => &self.organization,
            PersonField::Telephone => &self.telephone,
            PersonField::Address => &self.address,
            PersonField::PostalCode => &self.postal_code,
            PersonField::Country => &self.country,
            PersonField::ExtraInfo => &self.extra_info,
        }
    }

    /// Mutable access to a string property
    pub fn field_mut(&mut self, field: PersonField) -> &mut String {
        match field {
            PersonField::PublicKey => &mut self.public_key,
            PersonField::Name => &mut self.name,
            PersonField::Email => &mut self.email,
            PersonField::BiographyHash => &mut self.biography_hash,
            PersonField::Organization => &mut self.organization,
            PersonField::Telephone => &mut self.telephone,
            PersonField::Address => &mut self.address,
            PersonField::PostalCode => &mut self.postal_code,
            PersonField::Country => &mut self.country,
            PersonField::ExtraInfo => &mut self.extra_info,
        }
    }

    /// Read an authorization flag
    pub fn flag(&self, flag: PersonFlag) -> bool {
        match flag {
            PersonFlag::IsMajor => self.is_major,
            PersonFlag::IsSigned => self.is_signed,
        }
    }

    /// Mutable access to an authorization flag
    pub fn flag_mut(&mut self, flag: PersonFlag) -> &mut bool {
        match flag {
            PersonFlag::IsMajor => &mut self.is_major,
            PersonFlag::IsSigned => &mut self.is_signed,
        }
    }
}

/// Editor membership state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditorState {
    /// Invited, not yet accepted
    Proposed,
    /// Active editor
    Accepted,
}

impl EditorState {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorState::Proposed => "PROPOSED",
            EditorState::Accepted => "ACCEPTED",
        }
    }

    /// Parse from wire representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PROPOSED" => Some(EditorState::Proposed),
            "ACCEPTED" => Some(EditorState::Accepted),
            _ => None,
        }
    }
}

impl fmt::Display for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editor entry of a journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorInfo {
    pub editor_id: Address,
    pub state: EditorState,
}

/// Editable string properties of a journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JournalField {
    /// Title
    Title,
    /// Hash of the description document
    DescriptionHash,
}

impl JournalField {
    /// Event attribute key
    pub fn event_key(self) -> &'static str {
        match self {
            JournalField::Title => "title",
            JournalField::DescriptionHash => "descriptionHash",
        }
    }
}

/// Journal record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub id: Address,
    pub created_on: Timestamp,
    pub modified_on: Timestamp,
    pub title: String,
    pub is_signed: bool,
    pub description_hash: String,
    /// Sorted by editor id
    pub editors: Vec<EditorInfo>,
}

impl Journal {
    /// Read a string property
    pub fn field(&self, field: JournalField) -> &str {
        match field {
            JournalField::Title => &self.title,
            JournalField::DescriptionHash => &self.description_hash,
        }
    }

    /// Mutable access to a string property
    pub fn field_mut(&mut self, field: JournalField) -> &mut String {
        match field {
            JournalField::Title => &mut self.title,
            JournalField::DescriptionHash => &mut self.description_hash,
        }
    }

    /// State of an editor, if the person is one
    pub fn editor_state(&self, person: &Address) -> Option<EditorState> {
        self.editors
            .binary_search_by(|e| e.editor_id.cmp(person))
            .ok()
            .map(|idx| self.editors[idx].state)
    }

    /// Insert or replace an editor, keeping the list sorted
    pub fn set_editor(&mut self, editor_id: Address, state: EditorState) {
        match self.editors.binary_search_by(|e| e.editor_id.cmp(&editor_id)) {
            Ok(idx) => self.editors[idx].state = state,
            Err(idx) => self.editors.insert(idx, EditorInfo { editor_id, state }),
        }
    }

    /// Remove an editor; returns whether it was present
    pub fn remove_editor(&mut self, editor_id: &Address) -> bool {
        match self.editors.binary_search_by(|e| e.editor_id.cmp(editor_id)) {
            Ok(idx) => {
                self.editors.remove(idx);
                true
            }
            Err(_) => false,
        }
    }
}

/// Volume record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: Address,
    pub created_on: Timestamp,
    pub journal_id: Address,
    pub issue: String,
    pub logical_publication_time: Timestamp,
}

/// Manuscript lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManuscriptStatus {
    /// Waiting for co-author signatures
    Init,
    /// All authors signed
    New,
    /// Open for review
    Reviewable,
    /// Rejected by an editor
    Rejected,
    /// Accepted, waiting for volume assignment
    Published,
    /// Assigned to a volume and pages
    Assigned,
}

impl ManuscriptStatus {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ManuscriptStatus::Init => "INIT",
            ManuscriptStatus::New => "NEW",
            ManuscriptStatus::Reviewable => "REVIEWABLE",
            ManuscriptStatus::Rejected => "REJECTED",
            ManuscriptStatus::Published => "PUBLISHED",
            ManuscriptStatus::Assigned => "ASSIGNED",
        }
    }

    /// Parse from wire representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INIT" => Some(ManuscriptStatus::Init),
            "NEW" => Some(ManuscriptStatus::New),
            "REVIEWABLE" => Some(ManuscriptStatus::Reviewable),
            "REJECTED" => Some(ManuscriptStatus::Rejected),
            "PUBLISHED" => Some(ManuscriptStatus::Published),
            "ASSIGNED" => Some(ManuscriptStatus::Assigned),
            _ => None,
        }
    }

    /// Status a freshly signed manuscript takes in a thread
    pub fn after_signing(thread_is_reviewable: bool) -> Self {
        if thread_is_reviewable {
            ManuscriptStatus::Reviewable
        } else {
            ManuscriptStatus::New
        }
    }

    /// Whether reviews may be written
    pub fn accepts_reviews(&self) -> bool {
        matches!(
            self,
            ManuscriptStatus::Reviewable
                | ManuscriptStatus::Rejected
                | ManuscriptStatus::Published
                | ManuscriptStatus::Assigned
        )
    }
}

impl fmt::Display for ManuscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author entry of a manuscript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub author_id: Address,
    pub did_sign: bool,
    pub author_number: i32,
}

/// Volume placement properties of a manuscript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManuscriptField {
    /// Volume id
    VolumeId,
    /// First page
    FirstPage,
    /// Last page
    LastPage,
}

impl ManuscriptField {
    /// Event attribute key
    pub fn event_key(self) -> &'static str {
        match self {
            ManuscriptField::VolumeId => "volumeId",
            ManuscriptField::FirstPage => "firstPage",
            ManuscriptField::LastPage => "lastPage",
        }
    }
}

/// Manuscript version record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manuscript {
    pub id: Address,
    pub created_on: Timestamp,
    pub modified_on: Timestamp,
    pub hash: String,
    pub thread_id: Address,
    pub version_number: i32,
    pub commit_msg: String,
    pub title: String,
    /// Gapless, `author_number` equals position
    pub authors: Vec<Author>,
    pub status: ManuscriptStatus,
    pub journal_id: Address,
    pub volume_id: String,
    pub first_page: String,
    pub last_page: String,
    pub is_reviewable: bool,
}

impl Manuscript {
    /// Author entry of a person
    pub fn author(&self, person: &Address) -> Option<&Author> {
        self.authors.iter().find(|a| &a.author_id == person)
    }

    /// Whether every author has signed
    pub fn all_signed(&self) -> bool {
        self.authors.iter().all(|a| a.did_sign)
    }

    /// Set a placement property
    pub fn set_field(&mut self, field: ManuscriptField, value: String) {
        match field {
            ManuscriptField::VolumeId => self.volume_id = value,
            ManuscriptField::FirstPage => self.first_page = value,
            ManuscriptField::LastPage => self.last_page = value,
        }
    }
}

/// Version lineage of a manuscript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptThread {
    pub id: Address,
    /// Ordered by version number
    pub manuscript_ids: Vec<Address>,
    pub is_reviewable: bool,
}

/// Reviewer's judgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Judgement {
    /// Recommend publication
    Positive,
    /// Recommend rejection
    Negative,
}

impl Judgement {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Judgement::Positive => "POSITIVE",
            Judgement::Negative => "NEGATIVE",
        }
    }

    /// Parse from wire representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "POSITIVE" => Some(Judgement::Positive),
            "NEGATIVE" => Some(Judgement::Negative),
            _ => None,
        }
    }
}

/// Review record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Address,
    pub created_on: Timestamp,
    pub manuscript_id: Address,
    pub review_author_id: Address,
    pub hash: String,
    pub judgement: Judgement,
    pub is_used_by_editor: bool,
}

/// Editor's decision on a reviewable manuscript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManuscriptJudgement {
    /// Reject
    Rejected,
    /// Accept for publication
    Accepted,
}

impl ManuscriptJudgement {
    /// Price charged for the decision
    pub fn price_kind(self) -> PriceKind {
        match self {
            ManuscriptJudgement::Rejected => PriceKind::EditorRejectManuscript,
            ManuscriptJudgement::Accepted => PriceKind::EditorPublishManuscript,
        }
    }

    /// Resulting manuscript status
    pub fn status(self) -> ManuscriptStatus {
        match self {
            ManuscriptJudgement::Rejected => ManuscriptStatus::Rejected,
            ManuscriptJudgement::Accepted => ManuscriptStatus::Published,
        }
    }
}
