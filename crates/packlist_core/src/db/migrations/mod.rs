//! Schema steps for the packing list store.
//!
//! Each step runs in its own transaction together with the matching
//! `PRAGMA user_version` bump, so a failing step leaves the store at the
//! last version that applied cleanly.
//!
//! # Invariants
//! - Step versions are contiguous, starting at 1.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::time::Instant;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "packing_lists",
        sql: include_str!("0001_init.sql"),
    },
    SchemaStep {
        version: 2,
        name: "catalog_mirror",
        sql: include_str!("0002_catalog_mirror.sql"),
    },
];

/// Schema version this build writes and expects.
pub fn latest_version() -> u32 {
    STEPS.len() as u32
}

/// Reads the schema version recorded in the store.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
}

/// Brings the store up to [`latest_version`].
///
/// # Errors
/// - [`DbError::UnsupportedSchemaVersion`] when the store was written by a
///   newer build.
/// - [`DbError::Migration`] naming the step that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    for step in STEPS.iter().filter(|step| step.version > from_version) {
        let started_at = Instant::now();
        if let Err(source) = apply_step(conn, step) {
            error!(
                "event=db_migrate module=db status=error version={} step={} duration_ms={} error={}",
                step.version,
                step.name,
                started_at.elapsed().as_millis(),
                source
            );
            return Err(DbError::Migration {
                version: step.version,
                step: step.name,
                source,
            });
        }
        info!(
            "event=db_migrate module=db status=ok version={} step={} duration_ms={}",
            step.version,
            step.name,
            started_at.elapsed().as_millis()
        );
    }
    Ok(())
}

fn apply_step(conn: &mut Connection, step: &SchemaStep) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(step.sql)?;
    tx.pragma_update(None, "user_version", step.version)?;
    tx.commit()
}
