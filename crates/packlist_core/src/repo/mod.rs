//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Packing lists are written as whole documents keyed by id
//!   (last writer wins).
//! - Write paths must call `PackingList::validate()` before persistence.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod catalog_repo;
pub mod list_repo;

use crate::db::migrations::{latest_version, schema_version};
use list_repo::{RepoError, RepoResult};
use rusqlite::Connection;

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    required_table: &'static str,
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [required_table],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(RepoError::MissingRequiredTable(required_table));
    }
    Ok(())
}
