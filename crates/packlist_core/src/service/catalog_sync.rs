//! Catalog sync: keep denormalized component snapshots aligned with the
//! catalog mirror.
//!
//! # Responsibility
//! - Detect name or content-structure drift between components and the
//!   current catalog definition.
//! - Regenerate drifted components and write every changed list once.
//! - Report components whose catalog reference no longer exists.
//!
//! # Invariants
//! - Only draft lists (no version) are ever modified.
//! - Comparison ignores display fields: kits compare `(item_id, quantity)`,
//!   items compare `(item_id, quantity, prep_note)`, both sorted by item id.
//! - Running twice against an unchanged catalog writes nothing the second time.
//! - Missing references are reported, never deleted.

use crate::model::catalog::Catalog;
use crate::model::packing_list::{
    Component, ComponentId, ComponentType, ContentEntry, PackingList, WarehouseState,
};
use crate::repo::catalog_repo::CatalogRepository;
use crate::repo::list_repo::{PackingListRepository, RepoResult};
use log::{debug, error, info};
use std::collections::HashMap;
use std::time::Instant;

/// Per-list reconciliation result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Components whose name/contents were regenerated.
    pub changed: Vec<ComponentId>,
    /// Components whose reference is missing from the catalog.
    pub missing: Vec<ComponentId>,
}

impl ReconcileReport {
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Batch reconciliation result across lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub lists_checked: usize,
    pub lists_written: usize,
    pub components_changed: usize,
    pub components_missing: usize,
}

type ContentKey = (String, u32, String);

/// Reconciles one list against `catalog`. Frozen lists are left untouched
/// apart from missing-reference reporting.
pub fn reconcile_list(list: &mut PackingList, catalog: &Catalog) -> ReconcileReport {
    let mut report = ReconcileReport {
        missing: missing_components(list, catalog),
        ..ReconcileReport::default()
    };
    if !list.is_draft() {
        return report;
    }

    for component in list.components_mut() {
        if reconcile_component(component, catalog) {
            report.changed.push(component.unique_id);
        }
    }
    report
}

/// Returns ids of components whose reference no longer resolves.
pub fn missing_components(list: &PackingList, catalog: &Catalog) -> Vec<ComponentId> {
    list.locations()
        .map(|location| location.component)
        .filter(|component| is_missing(component, catalog))
        .map(|component| component.unique_id)
        .collect()
}

/// Display-only marker for a dangling catalog reference.
pub fn is_missing(component: &Component, catalog: &Catalog) -> bool {
    !catalog.contains(component.kind, &component.reference_id)
}

fn reconcile_component(component: &mut Component, catalog: &Catalog) -> bool {
    let Some(snapshot) = catalog.snapshot(component.kind, &component.reference_id) else {
        return false;
    };

    let target = content_keys(component.kind, &snapshot.contents);
    let current = content_keys(component.kind, &component.contents);
    if snapshot.name == component.name && target == current {
        return false;
    }

    let mut previous_states: HashMap<String, WarehouseState> = component
        .contents
        .drain(..)
        .map(|entry| (entry.item_id, entry.warehouse_state))
        .collect();
    component.name = snapshot.name;
    component.category = snapshot.category;
    component.contents = snapshot
        .contents
        .into_iter()
        .map(|mut entry| {
            if let Some(state) = previous_states.remove(&entry.item_id) {
                entry.warehouse_state = state;
            }
            entry
        })
        .collect();
    true
}

fn content_keys(kind: ComponentType, contents: &[ContentEntry]) -> Vec<ContentKey> {
    let mut keys: Vec<ContentKey> = contents
        .iter()
        .map(|entry| {
            let prep_note = match kind {
                ComponentType::Kit => String::new(),
                ComponentType::Item => entry.prep_note.clone(),
            };
            (entry.item_id.clone(), entry.quantity, prep_note)
        })
        .collect();
    keys.sort();
    keys
}

/// Catalog sync use-case service.
pub struct CatalogSyncService<L: PackingListRepository, C: CatalogRepository> {
    lists: L,
    catalog: C,
}

impl<L: PackingListRepository, C: CatalogRepository> CatalogSyncService<L, C> {
    pub fn new(lists: L, catalog: C) -> Self {
        Self { lists, catalog }
    }

    /// Loads the catalog mirror and every stored list, reconciles drafts,
    /// and writes all changed lists in one batch.
    pub fn sync_all(&self) -> RepoResult<SyncSummary> {
        let catalog = self.catalog.load_catalog()?;
        let mut lists = Vec::new();
        for summary in self.lists.list_summaries()? {
            if let Some(list) = self.lists.get_list(summary.id)? {
                lists.push(list);
            }
        }
        self.sync_lists(&mut lists, &catalog)
    }

    /// Reconciles in-memory lists against `catalog`, writing only those that
    /// changed, in one batch.
    pub fn sync_lists(
        &self,
        lists: &mut [PackingList],
        catalog: &Catalog,
    ) -> RepoResult<SyncSummary> {
        let started_at = Instant::now();
        let mut summary = SyncSummary::default();
        let mut changed_lists = Vec::new();

        for list in lists.iter_mut() {
            let report = reconcile_list(list, catalog);
            summary.lists_checked += 1;
            summary.components_missing += report.missing.len();
            if report.has_changes() {
                debug!(
                    "event=catalog_sync_list module=catalog_sync status=changed list_id={} components={}",
                    list.id,
                    report.changed.len()
                );
                summary.components_changed += report.changed.len();
                changed_lists.push(list.clone());
            }
        }

        if !changed_lists.is_empty() {
            if let Err(err) = self.lists.save_lists(&changed_lists) {
                error!(
                    "event=catalog_sync module=catalog_sync status=error lists={} error={}",
                    changed_lists.len(),
                    err
                );
                return Err(err);
            }
            summary.lists_written = changed_lists.len();
        }

        info!(
            "event=catalog_sync module=catalog_sync status=ok duration_ms={} checked={} written={} changed={} missing={}",
            started_at.elapsed().as_millis(),
            summary.lists_checked,
            summary.lists_written,
            summary.components_changed,
            summary.components_missing
        );
        Ok(summary)
    }
}
