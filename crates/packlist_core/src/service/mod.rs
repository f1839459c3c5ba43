//! Service layer for packing list use-cases.
//!
//! # Responsibility
//! - Hold the pure tree transforms (structure edits, catalog sync, freeze,
//!   fulfillment state) and wrap each with exactly one document persist.
//!
//! # Invariants
//! - A mutation is a synchronous in-memory transform followed by one
//!   whole-document write; nothing suspends mid-transform.
//! - Persistence failures propagate; in-memory state is not rolled back.

pub mod catalog_sync;
pub mod edit_session;
pub mod structure_service;
pub mod version_service;
pub mod warehouse_service;

use std::time::{SystemTime, UNIX_EPOCH};

/// Caller acknowledgement for destructive or repeated actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Unconfirmed,
}

impl Confirmation {
    pub fn is_confirmed(self) -> bool {
        self == Self::Confirmed
    }
}

/// Result of a structural edit whose guards may turn it into a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureOutcome {
    /// The transform ran and the document was persisted.
    Applied,
    /// A structural guard made the call a silent no-op; nothing was written.
    Skipped,
    /// The action is destructive and was not confirmed; nothing was written.
    NeedsConfirmation,
}

/// Current wall clock in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
