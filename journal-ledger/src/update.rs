//! Atomic updates
//!
//! A validated command yields an ordered list of [`Update`]s. Each update
//! mutates staged state ([`Update::apply_to`]) and describes itself as one
//! event ([`Update::to_event`]). Both are pure given the command timestamp.

use crate::address::{Address, EntityKind};
use crate::error::{Error, Result};
use crate::event::{keys, Event, EventKind};
use crate::model::{
    Author, EditorState, Journal, JournalField, Manuscript, ManuscriptField, ManuscriptStatus,
    ManuscriptThread, Person, PersonField, PersonFlag, PriceKind, PriceList, Review, Settings,
    Timestamp, Volume,
};
use crate::state::StagedState;
use std::collections::HashSet;

/// One atomic state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    SettingsCreate {
        price_list: PriceList,
    },
    SettingsPrice {
        kind: PriceKind,
        price: i32,
    },
    PersonCreate {
        person: Person,
    },
    PersonProperty {
        person_id: Address,
        field: PersonField,
        value: String,
    },
    PersonFlag {
        person_id: Address,
        flag: PersonFlag,
        value: bool,
    },
    PersonBalance {
        person_id: Address,
        balance: i32,
    },
    JournalCreate {
        journal_id: Address,
        title: String,
    },
    JournalProperty {
        journal_id: Address,
        field: JournalField,
        value: String,
    },
    JournalSigned {
        journal_id: Address,
        is_signed: bool,
    },
    EditorCreate {
        journal_id: Address,
        editor_id: Address,
        state: EditorState,
    },
    EditorAcceptDuty {
        journal_id: Address,
        editor_id: Address,
    },
    EditorDelete {
        journal_id: Address,
        editor_id: Address,
    },
    VolumeCreate {
        volume: Volume,
    },
    /// Creates the manuscript without authors; authors follow as
    /// [`Update::AuthorCreate`]. Opens the thread when `opens_thread`.
    ManuscriptCreate {
        manuscript: Manuscript,
        opens_thread: bool,
    },
    AuthorCreate {
        manuscript_id: Address,
        author: Author,
    },
    AuthorSign {
        manuscript_id: Address,
        author_id: Address,
    },
    ManuscriptStatus {
        manuscript_id: Address,
        status: ManuscriptStatus,
    },
    ManuscriptPlacement {
        manuscript_id: Address,
        field: ManuscriptField,
        value: String,
    },
    /// Opens a thread for review; every member gets `is_reviewable`
    ThreadAllowReview {
        thread_id: Address,
        manuscript_ids: Vec<Address>,
    },
    ReviewCreate {
        review: Review,
    },
    ReviewUseByEditor {
        review_id: Address,
    },
    /// Bumps `modified_on` of a settings, person, journal or manuscript
    ModificationTime {
        target: Address,
    },
}

impl Update {
    /// Apply to staged state; returns the touched addresses
    pub fn apply_to(&self, state: &mut StagedState, timestamp: Timestamp) -> Result<Vec<Address>> {
        match self {
            Update::SettingsCreate { price_list } => {
                state.put_settings(Settings {
                    created_on: timestamp,
                    modified_on: timestamp,
                    price_list: price_list.clone(),
                });
                Ok(vec![Address::settings()])
            }
            Update::SettingsPrice { kind, price } => {
                state.settings_mut()?.price_list.set(*kind, *price);
                Ok(vec![Address::settings()])
            }
            Update::PersonCreate { person } => {
                state.put_person(person.clone());
                Ok(vec![person.id.clone()])
            }
            Update::PersonProperty {
                person_id,
                field,
                value,
            } => {
                *state.person_mut(person_id)?.field_mut(*field) = value.clone();
                Ok(vec![person_id.clone()])
            }
            Update::PersonFlag {
                person_id,
                flag,
                value,
            } => {
                *state.person_mut(person_id)?.flag_mut(*flag) = *value;
                Ok(vec![person_id.clone()])
            }
            Update::PersonBalance { person_id, balance } => {
                state.person_mut(person_id)?.balance = *balance;
                Ok(vec![person_id.clone()])
            }
            Update::JournalCreate { journal_id, title } => {
                state.put_journal(Journal {
                    id: journal_id.clone(),
                    created_on: timestamp,
                    modified_on: timestamp,
                    title: title.clone(),
                    is_signed: false,
                    description_hash: String::new(),
                    editors: Vec::new(),
                });
                Ok(vec![journal_id.clone()])
            }
            Update::JournalProperty {
                journal_id,
                field,
                value,
            } => {
                *state.journal_mut(journal_id)?.field_mut(*field) = value.clone();
                Ok(vec![journal_id.clone()])
            }
            Update::JournalSigned {
                journal_id,
                is_signed,
            } => {
                state.journal_mut(journal_id)?.is_signed = *is_signed;
                Ok(vec![journal_id.clone()])
            }
            Update::EditorCreate {
                journal_id,
                editor_id,
                state: editor_state,
            } => {
                state
                    .journal_mut(journal_id)?
                    .set_editor(editor_id.clone(), *editor_state);
                Ok(vec![journal_id.clone()])
            }
            Update::EditorAcceptDuty {
                journal_id,
                editor_id,
            } => {
                state
                    .journal_mut(journal_id)?
                    .set_editor(editor_id.clone(), EditorState::Accepted);
                Ok(vec![journal_id.clone()])
            }
            Update::EditorDelete {
                journal_id,
                editor_id,
            } => {
                if !state.journal_mut(journal_id)?.remove_editor(editor_id) {
                    return Err(Error::Internal(format!(
                        "{editor_id} is not an editor of {journal_id}"
                    )));
                }
                Ok(vec![journal_id.clone()])
            }
            Update::VolumeCreate { volume } => {
                state.put_volume(volume.clone());
                Ok(vec![volume.id.clone()])
            }
            Update::ManuscriptCreate {
                manuscript,
                opens_thread,
            } => {
                let thread_id = manuscript.thread_id.clone();
                if *opens_thread {
                    state.put_thread(ManuscriptThread {
                        id: thread_id.clone(),
                        manuscript_ids: vec![manuscript.id.clone()],
                        is_reviewable: manuscript.is_reviewable,
                    });
                } else {
                    state
                        .thread_mut(&thread_id)?
                        .manuscript_ids
                        .push(manuscript.id.clone());
                }
                state.put_manuscript(manuscript.clone());
                Ok(vec![manuscript.id.clone(), thread_id])
            }
            Update::AuthorCreate {
                manuscript_id,
                author,
            } => {
                state
                    .manuscript_mut(manuscript_id)?
                    .authors
                    .push(author.clone());
                Ok(vec![manuscript_id.clone()])
            }
            Update::AuthorSign {
                manuscript_id,
                author_id,
            } => {
                let manuscript = state.manuscript_mut(manuscript_id)?;
                let author = manuscript
                    .authors
                    .iter_mut()
                    .find(|a| &a.author_id == author_id)
                    .ok_or_else(|| {
                        Error::Internal(format!("{author_id} is not an author of {manuscript_id}"))
                    })?;
                author.did_sign = true;
                Ok(vec![manuscript_id.clone()])
            }
            Update::ManuscriptStatus {
                manuscript_id,
                status,
            } => {
                state.manuscript_mut(manuscript_id)?.status = *status;
                Ok(vec![manuscript_id.clone()])
            }
            Update::ManuscriptPlacement {
                manuscript_id,
                field,
                value,
            } => {
                state
                    .manuscript_mut(manuscript_id)?
                    .set_field(*field, value.clone());
                Ok(vec![manuscript_id.clone()])
            }
            Update::ThreadAllowReview {
                thread_id,
                manuscript_ids,
            } => {
                let thread = state.thread_mut(thread_id)?;
                thread.is_reviewable = true;
                if thread.manuscript_ids != *manuscript_ids {
                    return Err(Error::Internal(format!(
                        "members of thread {thread_id} differ from the update"
                    )));
                }
                for id in manuscript_ids {
                    state.manuscript_mut(id)?.is_reviewable = true;
                }
                let mut touched = vec![thread_id.clone()];
                touched.extend(manuscript_ids.iter().cloned());
                Ok(touched)
            }
            Update::ReviewCreate { review } => {
                state.put_review(review.clone());
                Ok(vec![review.id.clone()])
            }
            Update::ReviewUseByEditor { review_id } => {
                state.review_mut(review_id)?.is_used_by_editor = true;
                Ok(vec![review_id.clone()])
            }
            Update::ModificationTime { target } => {
                match target.kind() {
                    EntityKind::Settings => state.settings_mut()?.modified_on = timestamp,
                    EntityKind::Person => state.person_mut(target)?.modified_on = timestamp,
                    EntityKind::Journal => state.journal_mut(target)?.modified_on = timestamp,
                    EntityKind::Manuscript => {
                        state.manuscript_mut(target)?.modified_on = timestamp
                    }
                    other => {
                        return Err(Error::Internal(format!(
                            "{other} {target} has no modification time"
                        )))
                    }
                }
                Ok(vec![target.clone()])
            }
        }
    }

    /// Describe as the event with sequence number `seq`
    pub fn to_event(&self, seq: u32, transaction_id: &str, timestamp: Timestamp) -> Event {
        let (kind, attributes) = self.describe();
        let mut event = Event::new(kind)
            .with(keys::TRANSACTION_ID, transaction_id)
            .with(keys::EVENT_SEQ, seq)
            .with(keys::TIMESTAMP, timestamp);
        event.attributes.extend(
            attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v)),
        );
        event
    }

    fn describe(&self) -> (EventKind, Vec<(&'static str, String)>) {
        match self {
            Update::SettingsCreate { price_list } => (
                EventKind::SettingsCreate,
                price_list
                    .iter()
                    .map(|(kind, price)| (kind.event_key(), price.to_string()))
                    .collect(),
            ),
            Update::SettingsPrice { kind, price } => (
                EventKind::SettingsUpdate,
                vec![(kind.event_key(), price.to_string())],
            ),
            Update::PersonCreate { person } => (
                EventKind::PersonCreate,
                vec![
                    (keys::ID, person.id.to_string()),
                    (PersonField::PublicKey.event_key(), person.public_key.clone()),
                    (PersonField::Name.event_key(), person.name.clone()),
                    (PersonField::Email.event_key(), person.email.clone()),
                    (keys::IS_MAJOR, person.is_major.to_string()),
                    (keys::IS_SIGNED, person.is_signed.to_string()),
                ],
            ),
            Update::PersonProperty {
                person_id,
                field,
                value,
            } => (
                EventKind::PersonUpdate,
                vec![(keys::ID, person_id.to_string()), (field.event_key(), value.clone())],
            ),
            Update::PersonFlag {
                person_id,
                flag,
                value,
            } => (
                EventKind::PersonUpdate,
                vec![(keys::ID, person_id.to_string()), (flag.event_key(), value.to_string())],
            ),
            Update::PersonBalance { person_id, balance } => (
                EventKind::PersonUpdate,
                vec![(keys::ID, person_id.to_string()), (keys::BALANCE, balance.to_string())],
            ),
            Update::JournalCreate { journal_id, title } => (
                EventKind::JournalCreate,
                vec![(keys::ID, journal_id.to_string()), (keys::TITLE, title.clone())],
            ),
            Update::JournalProperty {
                journal_id,
                field,
                value,
            } => (
                EventKind::JournalUpdate,
                vec![(keys::ID, journal_id.to_string()), (field.event_key(), value.clone())],
            ),
            Update::JournalSigned {
                journal_id,
                is_signed,
            } => (
                EventKind::JournalUpdate,
                vec![
                    (keys::ID, journal_id.to_string()),
                    (keys::IS_SIGNED, is_signed.to_string()),
                ],
            ),
            Update::EditorCreate {
                journal_id,
                editor_id,
                state,
            } => (
                EventKind::EditorCreate,
                vec![
                    (keys::JOURNAL_ID, journal_id.to_string()),
                    (keys::PERSON_ID, editor_id.to_string()),
                    (keys::EDITOR_STATE, state.as_str().to_string()),
                ],
            ),
            Update::EditorAcceptDuty {
                journal_id,
                editor_id,
            } => (
                EventKind::EditorUpdate,
                vec![
                    (keys::JOURNAL_ID, journal_id.to_string()),
                    (keys::PERSON_ID, editor_id.to_string()),
                    (keys::EDITOR_STATE, EditorState::Accepted.as_str().to_string()),
                ],
            ),
            Update::EditorDelete {
                journal_id,
                editor_id,
            } => (
                EventKind::EditorDelete,
                vec![
                    (keys::JOURNAL_ID, journal_id.to_string()),
                    (keys::PERSON_ID, editor_id.to_string()),
                ],
            ),
            Update::VolumeCreate { volume } => (
                EventKind::VolumeCreate,
                vec![
                    (keys::ID, volume.id.to_string()),
                    (keys::JOURNAL_ID, volume.journal_id.to_string()),
                    (keys::ISSUE, volume.issue.clone()),
                    (
                        keys::LOGICAL_PUBLICATION_TIME,
                        volume.logical_publication_time.to_string(),
                    ),
                ],
            ),
            Update::ManuscriptCreate { manuscript, .. } => (
                EventKind::ManuscriptCreate,
                vec![
                    (keys::ID, manuscript.id.to_string()),
                    (keys::HASH, manuscript.hash.clone()),
                    (keys::THREAD_ID, manuscript.thread_id.to_string()),
                    (keys::VERSION_NUMBER, manuscript.version_number.to_string()),
                    (keys::COMMIT_MSG, manuscript.commit_msg.clone()),
                    (keys::TITLE, manuscript.title.clone()),
                    (keys::STATUS, manuscript.status.as_str().to_string()),
                    (keys::JOURNAL_ID, manuscript.journal_id.to_string()),
                    (keys::IS_REVIEWABLE, manuscript.is_reviewable.to_string()),
                ],
            ),
            Update::AuthorCreate {
                manuscript_id,
                author,
            } => (
                EventKind::AuthorCreate,
                vec![
                    (keys::MANUSCRIPT_ID, manuscript_id.to_string()),
                    (keys::PERSON_ID, author.author_id.to_string()),
                    (keys::DID_SIGN, author.did_sign.to_string()),
                    (keys::AUTHOR_NUMBER, author.author_number.to_string()),
                ],
            ),
            Update::AuthorSign {
                manuscript_id,
                author_id,
            } => (
                EventKind::AuthorUpdate,
                vec![
                    (keys::MANUSCRIPT_ID, manuscript_id.to_string()),
                    (keys::PERSON_ID, author_id.to_string()),
                    (keys::DID_SIGN, true.to_string()),
                ],
            ),
            Update::ManuscriptStatus {
                manuscript_id,
                status,
            } => (
                EventKind::ManuscriptUpdate,
                vec![
                    (keys::ID, manuscript_id.to_string()),
                    (keys::STATUS, status.as_str().to_string()),
                ],
            ),
            Update::ManuscriptPlacement {
                manuscript_id,
                field,
                value,
            } => (
                EventKind::ManuscriptUpdate,
                vec![(keys::ID, manuscript_id.to_string()), (field.event_key(), value.clone())],
            ),
            Update::ThreadAllowReview { thread_id, .. } => (
                EventKind::ManuscriptThreadUpdate,
                vec![
                    (keys::THREAD_ID, thread_id.to_string()),
                    (keys::IS_REVIEWABLE, true.to_string()),
                ],
            ),
            Update::ReviewCreate { review } => (
                EventKind::ReviewCreate,
                vec![
                    (keys::ID, review.id.to_string()),
                    (keys::MANUSCRIPT_ID, review.manuscript_id.to_string()),
                    (keys::REVIEW_AUTHOR_ID, review.review_author_id.to_string()),
                    (keys::HASH, review.hash.clone()),
                    (keys::JUDGEMENT, review.judgement.as_str().to_string()),
                ],
            ),
            Update::ReviewUseByEditor { review_id } => (
                EventKind::ReviewUseByEditor,
                vec![
                    (keys::ID, review_id.to_string()),
                    (keys::IS_USED_BY_EDITOR, true.to_string()),
                ],
            ),
            Update::ModificationTime { target } => {
                let kind = match target.kind() {
                    EntityKind::Settings => EventKind::SettingsModificationTime,
                    EntityKind::Person => EventKind::PersonModificationTime,
                    EntityKind::Journal => EventKind::JournalModificationTime,
                    _ => EventKind::ManuscriptModificationTime,
                };
                (kind, vec![(keys::ID, target.to_string())])
            }
        }
    }

    /// Entities whose fields this update changes, excluding creation
    fn modifies(&self) -> Vec<&Address> {
        let target = match self {
            Update::ThreadAllowReview { manuscript_ids, .. } => {
                return manuscript_ids.iter().collect()
            }
            Update::SettingsPrice { .. } => None,
            Update::PersonProperty { person_id, .. }
            | Update::PersonFlag { person_id, .. }
            | Update::PersonBalance { person_id, .. } => Some(person_id),
            Update::JournalProperty { journal_id, .. }
            | Update::JournalSigned { journal_id, .. }
            | Update::EditorCreate { journal_id, .. }
            | Update::EditorAcceptDuty { journal_id, .. }
            | Update::EditorDelete { journal_id, .. } => Some(journal_id),
            Update::AuthorCreate { manuscript_id, .. }
            | Update::AuthorSign { manuscript_id, .. }
            | Update::ManuscriptStatus { manuscript_id, .. }
            | Update::ManuscriptPlacement { manuscript_id, .. } => Some(manuscript_id),
            _ => None,
        };
        target.into_iter().collect()
    }

    /// Entity this update creates
    fn creates(&self) -> Option<&Address> {
        match self {
            Update::PersonCreate { person } => Some(&person.id),
            Update::JournalCreate { journal_id, .. } => Some(journal_id),
            Update::ManuscriptCreate { manuscript, .. } => Some(&manuscript.id),
            _ => None,
        }
    }
}

/// Append one modification-time bump per modified entity
///
/// Entities created by the same list are skipped. Bumps follow the updates
/// in order of first modification.
pub fn with_modification_times(mut updates: Vec<Update>) -> Vec<Update> {
    let settings = Address::settings();
    let created: HashSet<Address> = updates.iter().filter_map(Update::creates).cloned().collect();
    let settings_created = updates
        .iter()
        .any(|u| matches!(u, Update::SettingsCreate { .. }));

    let mut seen = HashSet::new();
    let mut bumps = Vec::new();
    for update in &updates {
        let targets = match update {
            Update::SettingsPrice { .. } if !settings_created => vec![&settings],
            other => other.modifies(),
        };
        for target in targets.into_iter().filter(|t| !created.contains(*t)) {
            if seen.insert(target.clone()) {
                bumps.push(Update::ModificationTime {
                    target: target.clone(),
                });
            }
        }
    }
    updates.extend(bumps);
    updates
}
