//! Version freeze: diff the current tree against the last frozen snapshot.
//!
//! # Responsibility
//! - Assign the next `major.minor` version.
//! - Mark quantity changes and newly introduced components with a change log
//!   and invalidate their picking/loading progress.
//! - Record components that disappeared since the last snapshot.
//!
//! # Invariants
//! - Matching is by `unique_id` only, through id-keyed maps.
//! - Re-freezing without edits adds no change logs and no deleted records.
//! - At most one deleted record exists per `unique_id`.
//! - `snapshot` is only ever written here.

use crate::model::packing_list::{
    ChangeLog, Component, ComponentId, DeletedItemRecord, ListVersion, PackingList, Zone,
};
use crate::repo::list_repo::{PackingListRepository, RepoResult};
use crate::service::now_epoch_ms;
use log::{error, info};
use std::collections::{HashMap, HashSet};

/// Summary of one freeze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreezeReport {
    pub previous_version: Option<ListVersion>,
    pub version: ListVersion,
    /// Components whose quantity differs from the previous snapshot.
    pub quantity_changed: Vec<ComponentId>,
    /// Components added since the previous freeze (never on the first one).
    pub introduced: Vec<ComponentId>,
    /// Components newly recorded as deleted by this freeze.
    pub deleted: Vec<ComponentId>,
}

impl FreezeReport {
    pub fn is_noop(&self) -> bool {
        self.quantity_changed.is_empty() && self.introduced.is_empty() && self.deleted.is_empty()
    }
}

/// Freezes `list` in place at time `now_ms`.
pub fn freeze_list(list: &mut PackingList, now_ms: i64) -> FreezeReport {
    let previous_version = list.version;
    let version = previous_version.map_or(ListVersion::INITIAL, ListVersion::next);
    let previous_snapshot = std::mem::take(&mut list.snapshot);
    let previous_by_id = index_components(&previous_snapshot);

    let current_ids: HashSet<ComponentId> = list
        .locations()
        .map(|location| location.component.unique_id)
        .collect();
    let mut recorded: HashSet<ComponentId> = list
        .deleted_items
        .iter()
        .map(|record| record.component.unique_id)
        .collect();

    let mut deleted = Vec::new();
    for zone in &previous_snapshot {
        for section in &zone.sections {
            for component in &section.components {
                if current_ids.contains(&component.unique_id)
                    || !recorded.insert(component.unique_id)
                {
                    continue;
                }
                list.deleted_items.push(DeletedItemRecord {
                    component: component.clone(),
                    zone_id: Some(zone.id),
                    zone_name: zone.name.clone(),
                    section_name: section.name.clone(),
                    deleted_at: now_ms,
                });
                deleted.push(component.unique_id);
            }
        }
    }

    let mut quantity_changed = Vec::new();
    let mut introduced = Vec::new();
    for component in list.components_mut() {
        match previous_by_id.get(&component.unique_id) {
            Some(previous) if previous.quantity != component.quantity => {
                mark_changed(component, previous.quantity, now_ms);
                quantity_changed.push(component.unique_id);
            }
            None if previous_version.is_some() => {
                mark_changed(component, 0, now_ms);
                introduced.push(component.unique_id);
            }
            _ => {}
        }
    }

    list.version = Some(version);
    list.snapshot = list.zones.clone();

    FreezeReport {
        previous_version,
        version,
        quantity_changed,
        introduced,
        deleted,
    }
}

/// Records a removed component as deleted when it belongs to the last
/// snapshot of a frozen list. Returns whether a record was added.
pub fn record_snapshot_removal(
    list: &mut PackingList,
    unique_id: ComponentId,
    now_ms: i64,
) -> bool {
    if list.is_draft()
        || list
            .deleted_items
            .iter()
            .any(|record| record.component.unique_id == unique_id)
    {
        return false;
    }

    let record = list.snapshot.iter().find_map(|zone| {
        zone.sections.iter().find_map(|section| {
            section
                .components
                .iter()
                .find(|component| component.unique_id == unique_id)
                .map(|component| DeletedItemRecord {
                    component: component.clone(),
                    zone_id: Some(zone.id),
                    zone_name: zone.name.clone(),
                    section_name: section.name.clone(),
                    deleted_at: now_ms,
                })
        })
    });

    match record {
        Some(record) => {
            list.deleted_items.push(record);
            true
        }
        None => false,
    }
}

fn index_components(zones: &[Zone]) -> HashMap<ComponentId, &Component> {
    zones
        .iter()
        .flat_map(|zone| zone.sections.iter())
        .flat_map(|section| section.components.iter())
        .map(|component| (component.unique_id, component))
        .collect()
}

// A quantity change invalidates prior picking/loading; notes, returned and
// broken flags stay as they are.
fn mark_changed(component: &mut Component, previous_quantity: u32, now_ms: i64) {
    component.warehouse_state.change_log = Some(ChangeLog {
        previous_quantity,
        changed_at: now_ms,
    });
    component.reset_progress();
}

/// Freeze use-case service.
pub struct VersionService<R: PackingListRepository> {
    repo: R,
}

impl<R: PackingListRepository> VersionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Freezes the list at the current wall clock and persists it.
    pub fn freeze(&self, list: &mut PackingList) -> RepoResult<FreezeReport> {
        self.freeze_at(list, now_epoch_ms())
    }

    pub fn freeze_at(&self, list: &mut PackingList, now_ms: i64) -> RepoResult<FreezeReport> {
        let report = freeze_list(list, now_ms);
        if let Err(err) = self.repo.save_list(list) {
            error!(
                "event=list_freeze module=version status=error list_id={} version={} error={}",
                list.id, report.version, err
            );
            return Err(err);
        }

        info!(
            "event=list_freeze module=version status=ok list_id={} version={} changed={} introduced={} deleted={}",
            list.id,
            report.version,
            report.quantity_changed.len(),
            report.introduced.len(),
            report.deleted.len()
        );
        Ok(report)
    }
}
