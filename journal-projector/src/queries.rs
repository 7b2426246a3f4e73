//! Read-model queries

use crate::error::Result;
use crate::projector::Projector;
use journal_ledger::model::{EditorState, PriceKind, PriceList};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Settings row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRow {
    pub created_on: i64,
    pub modified_on: i64,
    pub price_list: PriceList,
}

impl<'r> FromRow<'r, SqliteRow> for SettingsRow {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let mut prices = [0i32; PriceKind::COUNT];
        for kind in PriceKind::ALL {
            prices[kind.index()] = row.try_get(kind.column().as_str())?;
        }
        Ok(Self {
            created_on: row.try_get("createdon")?,
            modified_on: row.try_get("modifiedon")?,
            price_list: PriceList::from_values(prices),
        })
    }
}

/// Person row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PersonRow {
    pub id: String,
    #[sqlx(rename = "createdon")]
    pub created_on: i64,
    #[sqlx(rename = "modifiedon")]
    pub modified_on: i64,
    #[sqlx(rename = "publickey")]
    pub public_key: String,
    pub name: String,
    pub email: String,
    #[sqlx(rename = "ismajor")]
    pub is_major: bool,
    #[sqlx(rename = "issigned")]
    pub is_signed: bool,
    pub balance: i32,
    #[sqlx(rename = "biographyhash")]
    pub biography_hash: String,
    pub organization: String,
    pub telephone: String,
    pub address: String,
    #[sqlx(rename = "postalcode")]
    pub postal_code: String,
    pub country: String,
    #[sqlx(rename = "extrainfo")]
    pub extra_info: String,
}

/// Journal row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct JournalRow {
    pub id: String,
    #[sqlx(rename = "createdon")]
    pub created_on: i64,
    #[sqlx(rename = "modifiedon")]
    pub modified_on: i64,
    pub title: String,
    #[sqlx(rename = "issigned")]
    pub is_signed: bool,
    #[sqlx(rename = "descriptionhash")]
    pub description_hash: String,
}

/// Editor row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EditorRow {
    #[sqlx(rename = "journalid")]
    pub journal_id: String,
    #[sqlx(rename = "personid")]
    pub person_id: String,
    #[sqlx(rename = "editorstate")]
    pub editor_state: String,
}

/// Volume row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VolumeRow {
    pub id: String,
    #[sqlx(rename = "createdon")]
    pub created_on: i64,
    #[sqlx(rename = "journalid")]
    pub journal_id: String,
    pub issue: String,
    #[sqlx(rename = "logicalpublicationtime")]
    pub logical_publication_time: i64,
}

/// Manuscript row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ManuscriptRow {
    pub id: String,
    #[sqlx(rename = "createdon")]
    pub created_on: i64,
    #[sqlx(rename = "modifiedon")]
    pub modified_on: i64,
    pub hash: String,
    #[sqlx(rename = "threadid")]
    pub thread_id: String,
    #[sqlx(rename = "versionnumber")]
    pub version_number: i32,
    #[sqlx(rename = "commitmsg")]
    pub commit_msg: String,
    pub title: String,
    pub status: String,
    #[sqlx(rename = "journalid")]
    pub journal_id: String,
    #[sqlx(rename = "volumeid")]
    pub volume_id: String,
    #[sqlx(rename = "firstpage")]
    pub first_page: String,
    #[sqlx(rename = "lastpage")]
    pub last_page: String,
    #[sqlx(rename = "isreviewable")]
    pub is_reviewable: bool,
}

/// Author row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuthorRow {
    #[sqlx(rename = "manuscriptid")]
    pub manuscript_id: String,
    #[sqlx(rename = "personid")]
    pub person_id: String,
    #[sqlx(rename = "didsign")]
    pub did_sign: bool,
    #[sqlx(rename = "authornumber")]
    pub author_number: i32,
}

/// Review row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReviewRow {
    pub id: String,
    #[sqlx(rename = "createdon")]
    pub created_on: i64,
    #[sqlx(rename = "manuscriptid")]
    pub manuscript_id: String,
    #[sqlx(rename = "reviewauthorid")]
    pub review_author_id: String,
    pub hash: String,
    pub judgement: String,
    #[sqlx(rename = "isusedbyeditor")]
    pub is_used_by_editor: bool,
}

impl Projector {
    /// The settings, once bootstrapped
    pub async fn settings(&self) -> Result<Option<SettingsRow>> {
        let settings = sqlx::query_as::<_, SettingsRow>("SELECT * FROM settings WHERE id = 0")
            .fetch_optional(self.pool())
            .await?;

        Ok(settings)
    }

    /// Get person by id
    pub async fn person(&self, id: &str) -> Result<Option<PersonRow>> {
        let person = sqlx::query_as::<_, PersonRow>("SELECT * FROM person WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(person)
    }

    /// Get person by public key
    pub async fn person_by_public_key(&self, public_key: &str) -> Result<Option<PersonRow>> {
        let person = sqlx::query_as::<_, PersonRow>(
            r#"
            SELECT * FROM person
            WHERE publickey = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(public_key)
        .fetch_optional(self.pool())
        .await?;

        Ok(person)
    }

    /// Get journal by id
    pub async fn journal(&self, id: &str) -> Result<Option<JournalRow>> {
        let journal = sqlx::query_as::<_, JournalRow>("SELECT * FROM journal WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(journal)
    }

    /// Editors of a journal, ordered by person id
    pub async fn editors(&self, journal_id: &str) -> Result<Vec<EditorRow>> {
        let editors = sqlx::query_as::<_, EditorRow>(
            r#"
            SELECT * FROM editor
            WHERE journalid = ?
            ORDER BY personid
            "#,
        )
        .bind(journal_id)
        .fetch_all(self.pool())
        .await?;

        Ok(editors)
    }

    /// Journals having an editor in the given state
    pub async fn journals_with_editor(
        &self,
        person_id: &str,
        state: EditorState,
    ) -> Result<Vec<JournalRow>> {
        let journals = sqlx::query_as::<_, JournalRow>(
            r#"
            SELECT journal.* FROM journal
            JOIN editor ON editor.journalid = journal.id
            WHERE editor.personid = ? AND editor.editorstate = ?
            ORDER BY journal.id
            "#,
        )
        .bind(person_id)
        .bind(state.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(journals)
    }

    /// Get manuscript by id
    pub async fn manuscript(&self, id: &str) -> Result<Option<ManuscriptRow>> {
        let manuscript =
            sqlx::query_as::<_, ManuscriptRow>("SELECT * FROM manuscript WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        Ok(manuscript)
    }

    /// Versions of a thread, oldest first
    pub async fn thread(&self, thread_id: &str) -> Result<Vec<ManuscriptRow>> {
        let manuscripts = sqlx::query_as::<_, ManuscriptRow>(
            r#"
            SELECT * FROM manuscript
            WHERE threadid = ?
            ORDER BY versionnumber
            "#,
        )
        .bind(thread_id)
        .fetch_all(self.pool())
        .await?;

        Ok(manuscripts)
    }

    /// Authors of a manuscript, ordered by author number
    pub async fn authors(&self, manuscript_id: &str) -> Result<Vec<AuthorRow>> {
        let authors = sqlx::query_as::<_, AuthorRow>(
            r#"
            SELECT * FROM author
            WHERE manuscriptid = ?
            ORDER BY authornumber
            "#,
        )
        .bind(manuscript_id)
        .fetch_all(self.pool())
        .await?;

        Ok(authors)
    }

    /// Volumes of a journal, by logical publication time
    pub async fn volumes(&self, journal_id: &str) -> Result<Vec<VolumeRow>> {
        let volumes = sqlx::query_as::<_, VolumeRow>(
            r#"
            SELECT * FROM volume
            WHERE journalid = ?
            ORDER BY logicalpublicationtime, id
            "#,
        )
        .bind(journal_id)
        .fetch_all(self.pool())
        .await?;

        Ok(volumes)
    }

    /// Reviews of a manuscript
    pub async fn reviews(&self, manuscript_id: &str) -> Result<Vec<ReviewRow>> {
        let reviews = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT * FROM review
            WHERE manuscriptid = ?
            ORDER BY createdon, id
            "#,
        )
        .bind(manuscript_id)
        .fetch_all(self.pool())
        .await?;

        Ok(reviews)
    }
}
