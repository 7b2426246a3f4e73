//! Data manipulations
//!
//! Each data event maps to exactly one [`DataManipulation`], and each
//! manipulation to one SQL statement. Absent optional attributes default to
//! the empty string or `false`.

use crate::error::{Error, Result};
use journal_ledger::event::{keys, EventKind};
use journal_ledger::model::{
    EditorState, Judgement, JournalField, ManuscriptField, ManuscriptStatus, PersonField,
    PersonFlag, PriceKind, Timestamp,
};
use journal_ledger::Event;
use sqlx::{Sqlite, SqliteConnection};
use std::str::FromStr;

/// Single-field change of a person row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonChange {
    Property(PersonField, String),
    Flag(PersonFlag, bool),
    Balance(i32),
}

/// Single-field change of a journal row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalChange {
    Property(JournalField, String),
    IsSigned(bool),
}

/// Single-field change of a manuscript row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManuscriptChange {
    Status(ManuscriptStatus),
    Placement(ManuscriptField, String),
}

/// One row-level change of the read model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataManipulation {
    SettingsCreate {
        timestamp: Timestamp,
        prices: Vec<(PriceKind, i32)>,
    },
    SettingsUpdate {
        kind: PriceKind,
        price: i32,
    },
    SettingsModificationTime {
        timestamp: Timestamp,
    },
    PersonCreate {
        id: String,
        timestamp: Timestamp,
        public_key: String,
        name: String,
        email: String,
        is_major: bool,
        is_signed: bool,
    },
    PersonUpdate {
        id: String,
        change: PersonChange,
    },
    PersonModificationTime {
        id: String,
        timestamp: Timestamp,
    },
    JournalCreate {
        id: String,
        timestamp: Timestamp,
        title: String,
    },
    JournalUpdate {
        id: String,
        change: JournalChange,
    },
    JournalModificationTime {
        id: String,
        timestamp: Timestamp,
    },
    EditorCreate {
        journal_id: String,
        person_id: String,
        state: EditorState,
    },
    EditorUpdate {
        journal_id: String,
        person_id: String,
        state: EditorState,
    },
    EditorDelete {
        journal_id: String,
        person_id: String,
    },
    VolumeCreate {
        id: String,
        timestamp: Timestamp,
        journal_id: String,
        issue: String,
        logical_publication_time: Timestamp,
    },
    ManuscriptCreate {
        id: String,
        timestamp: Timestamp,
        hash: String,
        thread_id: String,
        version_number: i32,
        commit_msg: String,
        title: String,
        status: ManuscriptStatus,
        journal_id: String,
        is_reviewable: bool,
    },
    ManuscriptUpdate {
        id: String,
        change: ManuscriptChange,
    },
    ManuscriptModificationTime {
        id: String,
        timestamp: Timestamp,
    },
    AuthorCreate {
        manuscript_id: String,
        person_id: String,
        did_sign: bool,
        author_number: i32,
    },
    AuthorUpdate {
        manuscript_id: String,
        person_id: String,
        did_sign: bool,
    },
    ManuscriptThreadUpdate {
        thread_id: String,
        is_reviewable: bool,
    },
    ReviewCreate {
        id: String,
        timestamp: Timestamp,
        manuscript_id: String,
        review_author_id: String,
        hash: String,
        judgement: Judgement,
    },
    ReviewUseByEditor {
        id: String,
    },
}

/// Typed attribute access with projection errors
struct Attributes<'a>(&'a Event);

impl<'a> Attributes<'a> {
    fn text(&self, key: &str) -> Result<String> {
        self.0
            .require(key)
            .map(str::to_string)
            .map_err(|e| Error::MalformedEvent(e.to_string()))
    }

    fn text_or_default(&self, key: &str) -> String {
        self.0.get(key).unwrap_or_default().to_string()
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<T> {
        self.0
            .parse(key)
            .map_err(|e| Error::MalformedEvent(e.to_string()))
    }

    fn flag_or_false(&self, key: &str) -> Result<bool> {
        match self.0.get(key) {
            Some(_) => self.parse(key),
            None => Ok(false),
        }
    }

    fn timestamp(&self) -> Result<Timestamp> {
        self.parse(keys::TIMESTAMP)
    }

    fn id(&self) -> Result<String> {
        self.text(keys::ID)
    }

    fn enumerated<T>(&self, key: &str, from_str: fn(&str) -> Option<T>) -> Result<T> {
        let raw = self.text(key)?;
        from_str(&raw).ok_or_else(|| {
            Error::MalformedEvent(format!("{} has unknown {key} {raw:?}", self.0.event_type))
        })
    }

    /// The one attribute besides the bookkeeping keys and `id`
    fn changed(&self) -> Result<(&'a str, &'a str)> {
        let mut changed = self.0.attributes.iter().filter(|(k, _)| {
            !matches!(
                k.as_str(),
                keys::ID | keys::TRANSACTION_ID | keys::EVENT_SEQ | keys::TIMESTAMP
            )
        });
        match (changed.next(), changed.next()) {
            (Some((k, v)), None) => Ok((k.as_str(), v.as_str())),
            _ => Err(Error::MalformedEvent(format!(
                "{} must change exactly one field",
                self.0.event_type
            ))),
        }
    }

    fn malformed(&self, what: &str) -> Error {
        Error::MalformedEvent(format!("{} has {what}", self.0.event_type))
    }
}

impl DataManipulation {
    /// Map a data event
    pub fn from_event(event: &Event) -> Result<Self> {
        let a = Attributes(event);
        let kind = event.kind().ok_or_else(|| a.malformed("an unknown type"))?;
        let dml = match kind {
            EventKind::TransactionControl => {
                return Err(a.malformed("no row: it is a control event"))
            }
            EventKind::SettingsCreate => DataManipulation::SettingsCreate {
                timestamp: a.timestamp()?,
                prices: PriceKind::ALL
                    .iter()
                    .map(|kind| Ok((*kind, a.parse::<i32>(kind.event_key())?)))
                    .collect::<Result<Vec<_>>>()?,
            },
            EventKind::SettingsUpdate => {
                let (key, value) = a.changed()?;
                let kind = PriceKind::from_event_key(key)
                    .ok_or_else(|| a.malformed(&format!("unknown price {key}")))?;
                let price = value
                    .parse()
                    .map_err(|_| a.malformed(&format!("unparseable {key}={value:?}")))?;
                DataManipulation::SettingsUpdate { kind, price }
            }
            EventKind::SettingsModificationTime => DataManipulation::SettingsModificationTime {
                timestamp: a.timestamp()?,
            },
            EventKind::PersonCreate => DataManipulation::PersonCreate {
                id: a.id()?,
                timestamp: a.timestamp()?,
                public_key: a.text_or_default(PersonField::PublicKey.event_key()),
                name: a.text_or_default(PersonField::Name.event_key()),
                email: a.text_or_default(PersonField::Email.event_key()),
                is_major: a.flag_or_false(keys::IS_MAJOR)?,
                is_signed: a.flag_or_false(keys::IS_SIGNED)?,
            },
            EventKind::PersonUpdate => {
                let (key, value) = a.changed()?;
                let change = match key {
                    keys::IS_MAJOR => PersonChange::Flag(PersonFlag::IsMajor, a.parse(key)?),
                    keys::IS_SIGNED => PersonChange::Flag(PersonFlag::IsSigned, a.parse(key)?),
                    keys::BALANCE => PersonChange::Balance(a.parse(key)?),
                    other => match PersonField::from_event_key(other) {
                        Some(field) => PersonChange::Property(field, value.to_string()),
                        None => return Err(a.malformed(&format!("unknown person field {other}"))),
                    },
                };
                DataManipulation::PersonUpdate { id: a.id()?, change }
            }
            EventKind::PersonModificationTime => DataManipulation::PersonModificationTime {
                id: a.id()?,
                timestamp: a.timestamp()?,
            },
            EventKind::JournalCreate => DataManipulation::JournalCreate {
                id: a.id()?,
                timestamp: a.timestamp()?,
                title: a.text(keys::TITLE)?,
            },
            EventKind::JournalUpdate => {
                let (key, value) = a.changed()?;
                let change = match key {
                    keys::IS_SIGNED => JournalChange::IsSigned(a.parse(key)?),
                    keys::TITLE => JournalChange::Property(JournalField::Title, value.to_string()),
                    keys::DESCRIPTION_HASH => {
                        JournalChange::Property(JournalField::DescriptionHash, value.to_string())
                    }
                    other => return Err(a.malformed(&format!("unknown journal field {other}"))),
                };
                DataManipulation::JournalUpdate { id: a.id()?, change }
            }
            EventKind::JournalModificationTime => DataManipulation::JournalModificationTime {
                id: a.id()?,
                timestamp: a.timestamp()?,
            },
            EventKind::EditorCreate => DataManipulation::EditorCreate {
                journal_id: a.text(keys::JOURNAL_ID)?,
                person_id: a.text(keys::PERSON_ID)?,
                state: a.enumerated(keys::EDITOR_STATE, EditorState::from_str)?,
            },
            EventKind::EditorUpdate => DataManipulation::EditorUpdate {
                journal_id: a.text(keys::JOURNAL_ID)?,
                person_id: a.text(keys::PERSON_ID)?,
                state: a.enumerated(keys::EDITOR_STATE, EditorState::from_str)?,
            },
            EventKind::EditorDelete => DataManipulation::EditorDelete {
                journal_id: a.text(keys::JOURNAL_ID)?,
                person_id: a.text(keys::PERSON_ID)?,
            },
            EventKind::VolumeCreate => DataManipulation::VolumeCreate {
                id: a.id()?,
                timestamp: a.timestamp()?,
                journal_id: a.text(keys::JOURNAL_ID)?,
                issue: a.text(keys::ISSUE)?,
                logical_publication_time: a.parse(keys::LOGICAL_PUBLICATION_TIME)?,
            },
            EventKind::ManuscriptCreate => DataManipulation::ManuscriptCreate {
                id: a.id()?,
                timestamp: a.timestamp()?,
                hash: a.text(keys::HASH)?,
                thread_id: a.text(keys::THREAD_ID)?,
                version_number: a.parse(keys::VERSION_NUMBER)?,
                commit_msg: a.text_or_default(keys::COMMIT_MSG),
                title: a.text(keys::TITLE)?,
                status: a.enumerated(keys::STATUS, ManuscriptStatus::from_str)?,
                journal_id: a.text(keys::JOURNAL_ID)?,
                is_reviewable: a.flag_or_false(keys::IS_REVIEWABLE)?,
            },
            EventKind::ManuscriptUpdate => {
                let (key, value) = a.changed()?;
                let change = match key {
                    keys::STATUS => ManuscriptChange::Status(
                        a.enumerated(keys::STATUS, ManuscriptStatus::from_str)?,
                    ),
                    keys::VOLUME_ID => {
                        ManuscriptChange::Placement(ManuscriptField::VolumeId, value.to_string())
                    }
                    keys::FIRST_PAGE => {
                        ManuscriptChange::Placement(ManuscriptField::FirstPage, value.to_string())
                    }
                    keys::LAST_PAGE => {
                        ManuscriptChange::Placement(ManuscriptField::LastPage, value.to_string())
                    }
                    other => {
                        return Err(a.malformed(&format!("unknown manuscript field {other}")))
                    }
                };
                DataManipulation::ManuscriptUpdate { id: a.id()?, change }
            }
            EventKind::ManuscriptModificationTime => DataManipulation::ManuscriptModificationTime {
                id: a.id()?,
                timestamp: a.timestamp()?,
            },
            EventKind::AuthorCreate => DataManipulation::AuthorCreate {
                manuscript_id: a.text(keys::MANUSCRIPT_ID)?,
                person_id: a.text(keys::PERSON_ID)?,
                did_sign: a.flag_or_false(keys::DID_SIGN)?,
                author_number: a.parse(keys::AUTHOR_NUMBER)?,
            },
            EventKind::AuthorUpdate => DataManipulation::AuthorUpdate {
                manuscript_id: a.text(keys::MANUSCRIPT_ID)?,
                person_id: a.text(keys::PERSON_ID)?,
                did_sign: a.parse(keys::DID_SIGN)?,
            },
            EventKind::ManuscriptThreadUpdate => DataManipulation::ManuscriptThreadUpdate {
                thread_id: a.text(keys::THREAD_ID)?,
                is_reviewable: a.parse(keys::IS_REVIEWABLE)?,
            },
            EventKind::ReviewCreate => DataManipulation::ReviewCreate {
                id: a.id()?,
                timestamp: a.timestamp()?,
                manuscript_id: a.text(keys::MANUSCRIPT_ID)?,
                review_author_id: a.text(keys::REVIEW_AUTHOR_ID)?,
                hash: a.text(keys::HASH)?,
                judgement: a.enumerated(keys::JUDGEMENT, Judgement::from_str)?,
            },
            EventKind::ReviewUseByEditor => DataManipulation::ReviewUseByEditor { id: a.id()? },
        };
        Ok(dml)
    }

    /// Table the statement writes
    pub fn table(&self) -> &'static str {
        match self {
            DataManipulation::SettingsCreate { .. }
            | DataManipulation::SettingsUpdate { .. }
            | DataManipulation::SettingsModificationTime { .. } => "settings",
            DataManipulation::PersonCreate { .. }
            | DataManipulation::PersonUpdate { .. }
            | DataManipulation::PersonModificationTime { .. } => "person",
            DataManipulation::JournalCreate { .. }
            | DataManipulation::JournalUpdate { .. }
            | DataManipulation::JournalModificationTime { .. } => "journal",
            DataManipulation::EditorCreate { .. }
            | DataManipulation::EditorUpdate { .. }
            | DataManipulation::EditorDelete { .. } => "editor",
            DataManipulation::VolumeCreate { .. } => "volume",
            DataManipulation::ManuscriptCreate { .. }
            | DataManipulation::ManuscriptUpdate { .. }
            | DataManipulation::ManuscriptModificationTime { .. }
            | DataManipulation::ManuscriptThreadUpdate { .. } => "manuscript",
            DataManipulation::AuthorCreate { .. } | DataManipulation::AuthorUpdate { .. } => {
                "author"
            }
            DataManipulation::ReviewCreate { .. } | DataManipulation::ReviewUseByEditor { .. } => {
                "review"
            }
        }
    }

    /// Run the statement on an open transaction
    ///
    /// Updates that match no row are projection errors: the ledger never
    /// emits an update before the matching create.
    pub async fn execute(&self, conn: &mut SqliteConnection) -> Result<()> {
        let sql = self.statement();
        let query = self.bind(sqlx::query(&sql));
        let affected = query.execute(&mut *conn).await?.rows_affected();
        let must_match = !matches!(self, DataManipulation::ManuscriptThreadUpdate { .. });
        if must_match && affected == 0 {
            return Err(Error::MalformedEvent(format!(
                "{:?} matched no {} row",
                self,
                self.table()
            )));
        }
        Ok(())
    }

    fn statement(&self) -> String {
        match self {
            DataManipulation::SettingsCreate { prices, .. } => {
                let columns: Vec<String> = prices.iter().map(|(kind, _)| kind.column()).collect();
                let params = vec!["?"; prices.len()].join(", ");
                format!(
                    "INSERT INTO settings (id, createdon, modifiedon, {}) VALUES (0, ?, ?, {})",
                    columns.join(", "),
                    params
                )
            }
            DataManipulation::SettingsUpdate { kind, .. } => {
                format!("UPDATE settings SET {} = ? WHERE id = 0", kind.column())
            }
            DataManipulation::SettingsModificationTime { .. } => {
                "UPDATE settings SET modifiedon = ? WHERE id = 0".to_string()
            }
            DataManipulation::PersonCreate { .. } => "INSERT INTO person \
                 (id, createdon, modifiedon, publickey, name, email, ismajor, issigned, balance) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)"
                .to_string(),
            DataManipulation::PersonUpdate { change, .. } => {
                let column = match change {
                    PersonChange::Property(field, _) => field.column(),
                    PersonChange::Flag(flag, _) => flag.event_key().to_lowercase(),
                    PersonChange::Balance(_) => keys::BALANCE.to_string(),
                };
                format!("UPDATE person SET {column} = ? WHERE id = ?")
            }
            DataManipulation::PersonModificationTime { .. } => {
                "UPDATE person SET modifiedon = ? WHERE id = ?".to_string()
            }
            DataManipulation::JournalCreate { .. } => "INSERT INTO journal \
                 (id, createdon, modifiedon, title, issigned, descriptionhash) \
                 VALUES (?, ?, ?, ?, 0, '')"
                .to_string(),
            DataManipulation::JournalUpdate { change, .. } => {
                let column = match change {
                    JournalChange::Property(field, _) => field.event_key().to_lowercase(),
                    JournalChange::IsSigned(_) => keys::IS_SIGNED.to_lowercase(),
                };
                format!("UPDATE journal SET {column} = ? WHERE id = ?")
            }
            DataManipulation::JournalModificationTime { .. } => {
                "UPDATE journal SET modifiedon = ? WHERE id = ?".to_string()
            }
            DataManipulation::EditorCreate { .. } => {
                "INSERT INTO editor (journalid, personid, editorstate) VALUES (?, ?, ?)".to_string()
            }
            DataManipulation::EditorUpdate { .. } => {
                "UPDATE editor SET editorstate = ? WHERE journalid = ? AND personid = ?".to_string()
            }
            DataManipulation::EditorDelete { .. } => {
                "DELETE FROM editor WHERE journalid = ? AND personid = ?".to_string()
            }
            DataManipulation::VolumeCreate { .. } => "INSERT INTO volume \
                 (id, createdon, journalid, issue, logicalpublicationtime) \
                 VALUES (?, ?, ?, ?, ?)"
                .to_string(),
            DataManipulation::ManuscriptCreate { .. } => "INSERT INTO manuscript \
                 (id, createdon, modifiedon, hash, threadid, versionnumber, commitmsg, title, \
                 status, journalid, volumeid, firstpage, lastpage, isreviewable) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, '', '', '', ?)"
                .to_string(),
            DataManipulation::ManuscriptUpdate { change, .. } => {
                let column = match change {
                    ManuscriptChange::Status(_) => keys::STATUS.to_string(),
                    ManuscriptChange::Placement(field, _) => field.event_key().to_lowercase(),
                };
                format!("UPDATE manuscript SET {column} = ? WHERE id = ?")
            }
            DataManipulation::ManuscriptModificationTime { .. } => {
                "UPDATE manuscript SET modifiedon = ? WHERE id = ?".to_string()
            }
            DataManipulation::AuthorCreate { .. } => "INSERT INTO author \
                 (manuscriptid, personid, didsign, authornumber) VALUES (?, ?, ?, ?)"
                .to_string(),
            DataManipulation::AuthorUpdate { .. } => {
                "UPDATE author SET didsign = ? WHERE manuscriptid = ? AND personid = ?".to_string()
            }
            DataManipulation::ManuscriptThreadUpdate { .. } => {
                "UPDATE manuscript SET isreviewable = ? WHERE threadid = ?".to_string()
            }
            DataManipulation::ReviewCreate { .. } => "INSERT INTO review \
                 (id, createdon, manuscriptid, reviewauthorid, hash, judgement, isusedbyeditor) \
                 VALUES (?, ?, ?, ?, ?, ?, 0)"
                .to_string(),
            DataManipulation::ReviewUseByEditor { .. } => {
                "UPDATE review SET isusedbyeditor = 1 WHERE id = ?".to_string()
            }
        }
    }

    fn bind<'q>(
        &'q self,
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        match self {
            DataManipulation::SettingsCreate { timestamp, prices } => prices
                .iter()
                .fold(query.bind(*timestamp).bind(*timestamp), |q, (_, price)| {
                    q.bind(*price)
                }),
            DataManipulation::SettingsUpdate { price, .. } => query.bind(*price),
            DataManipulation::SettingsModificationTime { timestamp } => query.bind(*timestamp),
            DataManipulation::PersonCreate {
                id,
                timestamp,
                public_key,
                name,
                email,
                is_major,
                is_signed,
            } => query
                .bind(id)
                .bind(*timestamp)
                .bind(*timestamp)
                .bind(public_key)
                .bind(name)
                .bind(email)
                .bind(*is_major)
                .bind(*is_signed),
            DataManipulation::PersonUpdate { id, change } => match change {
                PersonChange::Property(_, value) => query.bind(value),
                PersonChange::Flag(_, value) => query.bind(*value),
                PersonChange::Balance(value) => query.bind(*value),
            }
            .bind(id),
            DataManipulation::PersonModificationTime { id, timestamp }
            | DataManipulation::JournalModificationTime { id, timestamp }
            | DataManipulation::ManuscriptModificationTime { id, timestamp } => {
                query.bind(*timestamp).bind(id)
            }
            DataManipulation::JournalCreate {
                id,
                timestamp,
                title,
            } => query.bind(id).bind(*timestamp).bind(*timestamp).bind(title),
            DataManipulation::JournalUpdate { id, change } => match change {
                JournalChange::Property(_, value) => query.bind(value),
                JournalChange::IsSigned(value) => query.bind(*value),
            }
            .bind(id),
            DataManipulation::EditorCreate {
                journal_id,
                person_id,
                state,
            } => query.bind(journal_id).bind(person_id).bind(state.as_str()),
            DataManipulation::EditorUpdate {
                journal_id,
                person_id,
                state,
            } => query.bind(state.as_str()).bind(journal_id).bind(person_id),
            DataManipulation::EditorDelete {
                journal_id,
                person_id,
            } => query.bind(journal_id).bind(person_id),
            DataManipulation::VolumeCreate {
                id,
                timestamp,
                journal_id,
                issue,
                logical_publication_time,
            } => query
                .bind(id)
                .bind(*timestamp)
                .bind(journal_id)
                .bind(issue)
                .bind(*logical_publication_time),
            DataManipulation::ManuscriptCreate {
                id,
                timestamp,
                hash,
                thread_id,
                version_number,
                commit_msg,
                title,
                status,
                journal_id,
                is_reviewable,
            } => query
                .bind(id)
                .bind(*timestamp)
                .bind(*timestamp)
                .bind(hash)
                .bind(thread_id)
                .bind(*version_number)
                .bind(commit_msg)
                .bind(title)
                .bind(status.as_str())
                .bind(journal_id)
                .bind(*is_reviewable),
            DataManipulation::ManuscriptUpdate { id, change } => match change {
                ManuscriptChange::Status(status) => query.bind(status.as_str()),
                ManuscriptChange::Placement(_, value) => query.bind(value),
            }
            .bind(id),
            DataManipulation::AuthorCreate {
                manuscript_id,
                person_id,
                did_sign,
                author_number,
            } => query
                .bind(manuscript_id)
                .bind(person_id)
                .bind(*did_sign)
                .bind(*author_number),
            DataManipulation::AuthorUpdate {
                manuscript_id,
                person_id,
                did_sign,
            } => query.bind(*did_sign).bind(manuscript_id).bind(person_id),
            DataManipulation::ManuscriptThreadUpdate {
                thread_id,
                is_reviewable,
            } => query.bind(*is_reviewable).bind(thread_id),
            DataManipulation::ReviewCreate {
                id,
                timestamp,
                manuscript_id,
                review_author_id,
                hash,
                judgement,
            } => query
                .bind(id)
                .bind(*timestamp)
                .bind(manuscript_id)
                .bind(review_author_id)
                .bind(hash)
                .bind(judgement.as_str()),
            DataManipulation::ReviewUseByEditor { id } => query.bind(id),
        }
    }
}
