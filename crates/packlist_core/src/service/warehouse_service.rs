//! Warehouse fulfillment state on leaves.
//!
//! # Responsibility
//! - Address leaves (non-kit components and content entries) by stable ids.
//! - Apply partial flag/note updates to one leaf or to many in one write.
//! - Toggle aggregated controls spanning every instance of one display name.
//!
//! # Invariants
//! - Kit components carry no fulfillment state of their own.
//! - A batch update validates every leaf before touching any of them.
//! - Unresolved highlighting never blocks an action.

use crate::aggregate::{aggregate_zone, AggregateTarget, FulfillmentFlag, FulfillmentProgress};
use crate::model::packing_list::{
    CatalogId, Component, ComponentId, PackingList, WarehouseState, ZoneId,
};
use crate::repo::list_repo::{PackingListRepository, RepoError};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable reference to one leaf carrying fulfillment state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeafRef {
    /// A non-kit component.
    Component(ComponentId),
    /// A content entry of a kit or machine, addressed by parent and item id.
    Content {
        component: ComponentId,
        item_id: CatalogId,
    },
}

/// Partial update applied to a leaf. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarehousePatch {
    pub in_distinta: Option<bool>,
    pub loaded: Option<bool>,
    pub returned: Option<bool>,
    pub is_broken: Option<bool>,
    pub warehouse_note: Option<String>,
    pub broken_note: Option<String>,
}

impl WarehousePatch {
    /// Sets a single fulfillment flag.
    pub fn flag(flag: FulfillmentFlag, value: bool) -> Self {
        let mut patch = Self::default();
        match flag {
            FulfillmentFlag::InDistinta => patch.in_distinta = Some(value),
            FulfillmentFlag::Loaded => patch.loaded = Some(value),
            FulfillmentFlag::Returned => patch.returned = Some(value),
        }
        patch
    }

    /// Reports a broken leaf with a note.
    pub fn broken(note: impl Into<String>) -> Self {
        Self {
            is_broken: Some(true),
            broken_note: Some(note.into()),
            ..Self::default()
        }
    }

    pub fn apply(&self, state: &mut WarehouseState) {
        if let Some(value) = self.in_distinta {
            state.in_distinta = value;
        }
        if let Some(value) = self.loaded {
            state.loaded = value;
        }
        if let Some(value) = self.returned {
            state.returned = value;
        }
        if let Some(value) = self.is_broken {
            state.is_broken = value;
        }
        if let Some(value) = &self.warehouse_note {
            state.warehouse_note = value.clone();
        }
        if let Some(value) = &self.broken_note {
            state.broken_note = value.clone();
        }
    }
}

/// Errors from warehouse state updates.
#[derive(Debug)]
pub enum WarehouseError {
    ComponentNotFound(ComponentId),
    ContentNotFound {
        component: ComponentId,
        item_id: CatalogId,
    },
    /// Kit components have no state; address their content entries instead.
    KitHasNoState(ComponentId),
    ZoneNotFound(ZoneId),
    Repo(RepoError),
}

impl Display for WarehouseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ComponentNotFound(id) => write!(f, "component not found: {id}"),
            Self::ContentNotFound { component, item_id } => {
                write!(f, "content `{item_id}` not found in component {component}")
            }
            Self::KitHasNoState(id) => {
                write!(f, "kit component {id} carries no fulfillment state")
            }
            Self::ZoneNotFound(id) => write!(f, "zone not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for WarehouseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for WarehouseError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type WarehouseResult<T> = Result<T, WarehouseError>;

/// Returns the leaves owned by one component.
pub fn component_leaves(component: &Component) -> Vec<LeafRef> {
    let mut leaves = Vec::with_capacity(component.contents.len() + 1);
    if !component.is_kit() {
        leaves.push(LeafRef::Component(component.unique_id));
    }
    leaves.extend(component.contents.iter().map(|entry| LeafRef::Content {
        component: component.unique_id,
        item_id: entry.item_id.clone(),
    }));
    leaves
}

pub fn leaf_state<'a>(
    list: &'a PackingList,
    leaf: &LeafRef,
) -> WarehouseResult<&'a WarehouseState> {
    match leaf {
        LeafRef::Component(id) => {
            let component = list
                .find_component(*id)
                .ok_or(WarehouseError::ComponentNotFound(*id))?;
            if component.is_kit() {
                return Err(WarehouseError::KitHasNoState(*id));
            }
            Ok(&component.warehouse_state)
        }
        LeafRef::Content { component, item_id } => list
            .find_component(*component)
            .ok_or(WarehouseError::ComponentNotFound(*component))?
            .content(item_id)
            .map(|entry| &entry.warehouse_state)
            .ok_or_else(|| WarehouseError::ContentNotFound {
                component: *component,
                item_id: item_id.clone(),
            }),
    }
}

fn leaf_state_mut<'a>(
    list: &'a mut PackingList,
    leaf: &LeafRef,
) -> WarehouseResult<&'a mut WarehouseState> {
    match leaf {
        LeafRef::Component(id) => {
            let component = list
                .find_component_mut(*id)
                .ok_or(WarehouseError::ComponentNotFound(*id))?;
            if component.is_kit() {
                return Err(WarehouseError::KitHasNoState(*id));
            }
            Ok(&mut component.warehouse_state)
        }
        LeafRef::Content { component, item_id } => list
            .find_component_mut(*component)
            .ok_or(WarehouseError::ComponentNotFound(*component))?
            .content_mut(item_id)
            .map(|entry| &mut entry.warehouse_state)
            .ok_or_else(|| WarehouseError::ContentNotFound {
                component: *component,
                item_id: item_id.clone(),
            }),
    }
}

pub fn set_leaf_state(
    list: &mut PackingList,
    leaf: &LeafRef,
    patch: &WarehousePatch,
) -> WarehouseResult<()> {
    patch.apply(leaf_state_mut(list, leaf)?);
    Ok(())
}

/// Applies `patch` to every leaf, or to none if any reference is invalid.
pub fn batch_set_state(
    list: &mut PackingList,
    leaves: &[LeafRef],
    patch: &WarehousePatch,
) -> WarehouseResult<usize> {
    for leaf in leaves {
        leaf_state(list, leaf)?;
    }
    for leaf in leaves {
        patch.apply(leaf_state_mut(list, leaf)?);
    }
    Ok(leaves.len())
}

/// Clears a broken report (flag and note together).
pub fn resolve_broken(list: &mut PackingList, leaf: &LeafRef) -> WarehouseResult<()> {
    let state = leaf_state_mut(list, leaf)?;
    state.is_broken = false;
    state.broken_note.clear();
    Ok(())
}

/// Highlight predicate for post-freeze changes not yet picked and loaded.
///
/// Only components with their own change log qualify; for those, a
/// non-kit is unresolved until it is picked and loaded, and any content
/// entry not yet picked and loaded keeps the component unresolved.
pub fn is_unresolved(component: &Component) -> bool {
    if component.warehouse_state.change_log.is_none() {
        return false;
    }
    let own_pending = !component.is_kit() && !component.warehouse_state.is_fulfilled();
    own_pending
        || component
            .contents
            .iter()
            .any(|entry| !entry.warehouse_state.is_fulfilled())
}

/// Warehouse state use-case service.
pub struct WarehouseService<R: PackingListRepository> {
    repo: R,
}

impl<R: PackingListRepository> WarehouseService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn set_leaf_state(
        &self,
        list: &mut PackingList,
        leaf: &LeafRef,
        patch: &WarehousePatch,
    ) -> WarehouseResult<()> {
        set_leaf_state(list, leaf, patch)?;
        self.persist(list, "set_leaf_state", 1)
    }

    /// Applies the same patch to many leaves with a single document write.
    pub fn batch_set_state(
        &self,
        list: &mut PackingList,
        leaves: &[LeafRef],
        patch: &WarehousePatch,
    ) -> WarehouseResult<usize> {
        if leaves.is_empty() {
            return Ok(0);
        }
        let updated = batch_set_state(list, leaves, patch)?;
        self.persist(list, "batch_set_state", updated)?;
        Ok(updated)
    }

    pub fn resolve_broken(&self, list: &mut PackingList, leaf: &LeafRef) -> WarehouseResult<()> {
        resolve_broken(list, leaf)?;
        self.persist(list, "resolve_broken", 1)
    }

    /// Toggles one aggregated control: sets every underlying leaf when the
    /// control is not complete, clears them all when it is.
    ///
    /// Returns the progress after the toggle, or `None` when the target is
    /// absent from the zone aggregation.
    pub fn toggle_aggregated(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
        target: &AggregateTarget,
        flag: FulfillmentFlag,
    ) -> WarehouseResult<Option<FulfillmentProgress>> {
        let zone = list
            .zone(zone_id)
            .ok_or(WarehouseError::ZoneNotFound(zone_id))?;
        let Some((leaves, progress)) = aggregate_zone(zone).control(target, flag) else {
            return Ok(None);
        };

        let patch = WarehousePatch::flag(flag, !progress.is_complete());
        self.batch_set_state(list, &leaves, &patch)?;

        let zone = list
            .zone(zone_id)
            .ok_or(WarehouseError::ZoneNotFound(zone_id))?;
        Ok(aggregate_zone(zone)
            .control(target, flag)
            .map(|(_, progress)| progress))
    }

    fn persist(
        &self,
        list: &PackingList,
        operation: &'static str,
        leaves: usize,
    ) -> WarehouseResult<()> {
        match self.repo.save_list(list) {
            Ok(()) => {
                info!(
                    "event=warehouse_update module=warehouse status=ok list_id={} op={} leaves={}",
                    list.id, operation, leaves
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=warehouse_update module=warehouse status=error list_id={} op={} leaves={} error={}",
                    list.id, operation, leaves, err
                );
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::packing_list::{ChangeLog, ComponentType, ContentEntry};

    fn machine() -> Component {
        Component::new(
            ComponentType::Item,
            "desk",
            "Desk",
            "Audio",
            1,
            vec![ContentEntry::new("psu", "PSU", 1, "", "")],
        )
    }

    #[test]
    fn component_without_change_log_is_never_unresolved() {
        assert!(!is_unresolved(&machine()));
    }

    #[test]
    fn changed_component_is_resolved_only_when_everything_is_picked_and_loaded() {
        let mut component = machine();
        component.warehouse_state.change_log = Some(ChangeLog {
            previous_quantity: 1,
            changed_at: 0,
        });
        component.warehouse_state.in_distinta = true;
        component.warehouse_state.loaded = true;
        assert!(is_unresolved(&component));

        component.contents[0].warehouse_state.in_distinta = true;
        component.contents[0].warehouse_state.loaded = true;
        assert!(!is_unresolved(&component));
    }

    #[test]
    fn kit_leaves_skip_the_kit_itself() {
        let kit = Component::new(
            ComponentType::Kit,
            "kit",
            "Kit",
            "Kit",
            1,
            vec![ContentEntry::new("mic", "Mic", 1, "", "")],
        );
        let leaves = component_leaves(&kit);
        assert_eq!(leaves.len(), 1);
        assert!(matches!(leaves[0], LeafRef::Content { .. }));
    }

    #[test]
    fn patch_leaves_unset_fields_alone() {
        let mut state = WarehouseState {
            loaded: true,
            warehouse_note: "left dock".to_string(),
            ..WarehouseState::default()
        };
        WarehousePatch::flag(FulfillmentFlag::InDistinta, true).apply(&mut state);
        assert!(state.in_distinta);
        assert!(state.loaded);
        assert_eq!(state.warehouse_note, "left dock");
    }
}
