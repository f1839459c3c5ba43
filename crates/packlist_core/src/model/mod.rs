//! Domain model for packing lists and the catalog mirror.
//!
//! # Responsibility
//! - Define the packing list document persisted as one unit.
//! - Define the read-only catalog shapes components are materialized from.
//!
//! # Invariants
//! - Every component is identified by a stable `ComponentId` (uniqueId).
//! - Names, categories and contents on components are caches of catalog state.
//! - Quantities are always `>= 1`.

pub mod catalog;
pub mod packing_list;
