//! Relational read model schema
//!
//! Column names are the lowercased event attribute keys. Booleans are
//! stored as SQLite integers.

use crate::error::Result;
use journal_ledger::model::PriceKind;
use sqlx::SqlitePool;

const PERSON: &str = r#"
CREATE TABLE IF NOT EXISTS person (
    id TEXT PRIMARY KEY NOT NULL,
    createdon INTEGER NOT NULL,
    modifiedon INTEGER NOT NULL,
    publickey TEXT NOT NULL DEFAULT '',
    name TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    ismajor BOOLEAN NOT NULL DEFAULT 0,
    issigned BOOLEAN NOT NULL DEFAULT 0,
    balance INTEGER NOT NULL DEFAULT 0,
    biographyhash TEXT NOT NULL DEFAULT '',
    organization TEXT NOT NULL DEFAULT '',
    telephone TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    postalcode TEXT NOT NULL DEFAULT '',
    country TEXT NOT NULL DEFAULT '',
    extrainfo TEXT NOT NULL DEFAULT ''
)"#;

const PERSON_PUBLIC_KEY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_person_publickey ON person (publickey)";

const JOURNAL: &str = r#"
CREATE TABLE IF NOT EXISTS journal (
    id TEXT PRIMARY KEY NOT NULL,
    createdon INTEGER NOT NULL,
    modifiedon INTEGER NOT NULL,
    title TEXT NOT NULL,
    issigned BOOLEAN NOT NULL DEFAULT 0,
    descriptionhash TEXT NOT NULL DEFAULT ''
)"#;

const EDITOR: &str = r#"
CREATE TABLE IF NOT EXISTS editor (
    journalid TEXT NOT NULL,
    personid TEXT NOT NULL,
    editorstate TEXT NOT NULL,
    PRIMARY KEY (journalid, personid)
)"#;

const EDITOR_STATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_editor_journal_state ON editor (journalid, editorstate)";

const VOLUME: &str = r#"
CREATE TABLE IF NOT EXISTS volume (
    id TEXT PRIMARY KEY NOT NULL,
    createdon INTEGER NOT NULL,
    journalid TEXT NOT NULL,
    issue TEXT NOT NULL,
    logicalpublicationtime INTEGER NOT NULL
)"#;

const MANUSCRIPT: &str = r#"
CREATE TABLE IF NOT EXISTS manuscript (
    id TEXT PRIMARY KEY NOT NULL,
    createdon INTEGER NOT NULL,
    modifiedon INTEGER NOT NULL,
    hash TEXT NOT NULL,
    threadid TEXT NOT NULL,
    versionnumber INTEGER NOT NULL,
    commitmsg TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    journalid TEXT NOT NULL,
    volumeid TEXT NOT NULL DEFAULT '',
    firstpage TEXT NOT NULL DEFAULT '',
    lastpage TEXT NOT NULL DEFAULT '',
    isreviewable BOOLEAN NOT NULL DEFAULT 0
)"#;

const MANUSCRIPT_THREAD_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_manuscript_threadid ON manuscript (threadid)";

const AUTHOR: &str = r#"
CREATE TABLE IF NOT EXISTS author (
    manuscriptid TEXT NOT NULL,
    personid TEXT NOT NULL,
    didsign BOOLEAN NOT NULL DEFAULT 0,
    authornumber INTEGER NOT NULL,
    PRIMARY KEY (manuscriptid, personid)
)"#;

const REVIEW: &str = r#"
CREATE TABLE IF NOT EXISTS review (
    id TEXT PRIMARY KEY NOT NULL,
    createdon INTEGER NOT NULL,
    manuscriptid TEXT NOT NULL,
    reviewauthorid TEXT NOT NULL,
    hash TEXT NOT NULL,
    judgement TEXT NOT NULL,
    isusedbyeditor BOOLEAN NOT NULL DEFAULT 0
)"#;

const REVIEW_MANUSCRIPT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_review_manuscriptid ON review (manuscriptid)";

/// Singleton settings table, one integer column per price
fn settings_table() -> String {
    let prices: Vec<String> = PriceKind::ALL
        .iter()
        .map(|kind| format!("    {} INTEGER NOT NULL", kind.column()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS settings (\n    \
         id INTEGER PRIMARY KEY NOT NULL CHECK (id = 0),\n    \
         createdon INTEGER NOT NULL,\n    \
         modifiedon INTEGER NOT NULL,\n{}\n)",
        prices.join(",\n")
    )
}

/// Create all tables and indexes; safe to run repeatedly
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query(&settings_table()).execute(&mut *tx).await?;
    for statement in [
        PERSON,
        PERSON_PUBLIC_KEY_INDEX,
        JOURNAL,
        EDITOR,
        EDITOR_STATE_INDEX,
        VOLUME,
        MANUSCRIPT,
        MANUSCRIPT_THREAD_INDEX,
        AUTHOR,
        REVIEW,
        REVIEW_MANUSCRIPT_INDEX,
    ] {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::debug!("Read model schema ready");
    Ok(())
}
