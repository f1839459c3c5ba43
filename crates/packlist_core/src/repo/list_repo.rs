//! Packing list document repository and SQLite implementation.
//!
//! # Responsibility
//! - Persist packing lists as whole JSON documents keyed by list id.
//! - Expose summary listing without decoding full documents.
//!
//! # Invariants
//! - `save_list` replaces the stored document entirely.
//! - `save_lists` writes all documents in one transaction or none.
//! - Documents are validated before write and after read.

use crate::db::DbError;
use crate::model::packing_list::{ListId, ListVersion, PackingList, ValidationError};
use crate::repo::ensure_connection_ready;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    ListNotFound(ListId),
    CatalogEntryNotFound(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ListNotFound(id) => write!(f, "packing list not found: {id}"),
            Self::CatalogEntryNotFound(id) => write!(f, "catalog entry not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Lightweight listing row for packing lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSummary {
    pub id: ListId,
    pub event_name: String,
    pub event_date: Option<String>,
    pub location: String,
    pub version: Option<ListVersion>,
    /// Epoch ms of the last document write.
    pub updated_at: i64,
}

/// Repository interface for whole-document packing list persistence.
pub trait PackingListRepository {
    /// Replaces (or inserts) one document.
    fn save_list(&self, list: &PackingList) -> RepoResult<()>;
    /// Replaces several documents atomically.
    fn save_lists(&self, lists: &[PackingList]) -> RepoResult<()>;
    fn get_list(&self, id: ListId) -> RepoResult<Option<PackingList>>;
    /// Lists summaries ordered by `updated_at DESC, id ASC`.
    fn list_summaries(&self) -> RepoResult<Vec<ListSummary>>;
    fn delete_list(&self, id: ListId) -> RepoResult<()>;
}

impl<R: PackingListRepository + ?Sized> PackingListRepository for &R {
    fn save_list(&self, list: &PackingList) -> RepoResult<()> {
        (**self).save_list(list)
    }

    fn save_lists(&self, lists: &[PackingList]) -> RepoResult<()> {
        (**self).save_lists(lists)
    }

    fn get_list(&self, id: ListId) -> RepoResult<Option<PackingList>> {
        (**self).get_list(id)
    }

    fn list_summaries(&self) -> RepoResult<Vec<ListSummary>> {
        (**self).list_summaries()
    }

    fn delete_list(&self, id: ListId) -> RepoResult<()> {
        (**self).delete_list(id)
    }
}

/// SQLite-backed packing list repository.
pub struct SqlitePackingListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePackingListRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "packing_lists")?;
        Ok(Self { conn })
    }
}

impl PackingListRepository for SqlitePackingListRepository<'_> {
    fn save_list(&self, list: &PackingList) -> RepoResult<()> {
        upsert_document(self.conn, list)
    }

    fn save_lists(&self, lists: &[PackingList]) -> RepoResult<()> {
        if lists.is_empty() {
            return Ok(());
        }
        for list in lists {
            list.validate()?;
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for list in lists {
            upsert_document(&tx, list)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_list(&self, id: ListId) -> RepoResult<Option<PackingList>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, document
             FROM packing_lists
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(row)?));
        }
        Ok(None)
    }

    fn list_summaries(&self) -> RepoResult<Vec<ListSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_name, event_date, location, version, updated_at
             FROM packing_lists
             ORDER BY updated_at DESC, id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_summary_row(row)?);
        }
        Ok(items)
    }

    fn delete_list(&self, id: ListId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM packing_lists WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::ListNotFound(id));
        }
        Ok(())
    }
}

fn upsert_document(conn: &Connection, list: &PackingList) -> RepoResult<()> {
    list.validate()?;
    let document = serde_json::to_string(list).map_err(|err| {
        RepoError::InvalidData(format!("packing list {} not serializable: {err}", list.id))
    })?;

    conn.execute(
        "INSERT INTO packing_lists (
            id,
            event_name,
            event_date,
            location,
            version,
            document
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            event_name = excluded.event_name,
            event_date = excluded.event_date,
            location = excluded.location,
            version = excluded.version,
            document = excluded.document,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            list.id.to_string(),
            list.event_name.as_str(),
            list.event_date.as_deref(),
            list.location.as_str(),
            list.version.map(|version| version.to_string()),
            document,
        ],
    )?;
    Ok(())
}

fn parse_document_row(row: &Row<'_>) -> RepoResult<PackingList> {
    let id_text: String = row.get("id")?;
    let document: String = row.get("document")?;
    let list: PackingList = serde_json::from_str(&document).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid document for packing list `{id_text}`: {err}"
        ))
    })?;
    if list.id.to_string() != id_text {
        return Err(RepoError::InvalidData(format!(
            "document id {} does not match row id `{id_text}`",
            list.id
        )));
    }
    list.validate()?;
    Ok(list)
}

fn parse_summary_row(row: &Row<'_>) -> RepoResult<ListSummary> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid `{id_text}` in packing_lists.id"))
    })?;
    let version = row
        .get::<_, Option<String>>("version")?
        .map(|value| value.parse::<ListVersion>())
        .transpose()?;

    Ok(ListSummary {
        id,
        event_name: row.get("event_name")?,
        event_date: row.get("event_date")?,
        location: row.get("location")?,
        version,
        updated_at: row.get("updated_at")?,
    })
}
