//! Zone/section/component structure editing.
//!
//! # Responsibility
//! - Create, rename and delete zones and sections.
//! - Add catalog items/kits to sections, update and remove components.
//! - Reorder components inside one section by drag and drop.
//!
//! # Invariants
//! - The last zone of a list and the last section of a zone cannot be
//!   removed; such calls are silent no-ops.
//! - Adding an entity already present in the section (same type and
//!   reference) bumps its quantity instead of duplicating it.
//! - Component identity (`unique_id`) survives every edit except removal.

use crate::model::catalog::Catalog;
use crate::model::packing_list::{
    Component, ComponentId, ComponentType, PackingList, Section, SectionId, Zone, ZoneId,
};
use crate::repo::list_repo::{PackingListRepository, RepoError};
use crate::service::version_service::record_snapshot_removal;
use crate::service::{now_epoch_ms, Confirmation, StructureOutcome};
use log::{error, info};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from structure editing.
#[derive(Debug)]
pub enum StructureError {
    /// Zone or section name is blank after trim.
    InvalidName,
    /// Quantity below 1 was requested.
    InvalidQuantity(ComponentId),
    ZoneNotFound(ZoneId),
    SectionNotFound {
        zone_id: ZoneId,
        section_id: SectionId,
    },
    ComponentNotFound(ComponentId),
    /// Catalog entity to add does not exist.
    CatalogEntryNotFound {
        kind: ComponentType,
        reference_id: String,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for StructureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "name must not be blank"),
            Self::InvalidQuantity(id) => write!(f, "component {id} quantity must be >= 1"),
            Self::ZoneNotFound(id) => write!(f, "zone not found: {id}"),
            Self::SectionNotFound {
                zone_id,
                section_id,
            } => write!(f, "section {section_id} not found in zone {zone_id}"),
            Self::ComponentNotFound(id) => write!(f, "component not found: {id}"),
            Self::CatalogEntryNotFound { kind, reference_id } => {
                write!(f, "catalog {kind:?} not found: {reference_id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StructureError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StructureError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

pub type StructureResult<T> = Result<T, StructureError>;

/// How an add-to-section call treats existing components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMode {
    /// Merge into a matching component or append a new one.
    Merge,
    /// Swap the catalog reference of the targeted component in place.
    Replace(ComponentId),
}

/// Drop placement relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
}

/// Partial update of a component's editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentPatch {
    pub quantity: Option<u32>,
    pub notes: Option<String>,
}

pub fn add_zone(list: &mut PackingList, name: &str) -> StructureResult<ZoneId> {
    let zone = Zone::new(normalize_name(name)?);
    let zone_id = zone.id;
    list.zones.push(zone);
    Ok(zone_id)
}

pub fn rename_zone(list: &mut PackingList, zone_id: ZoneId, name: &str) -> StructureResult<()> {
    let name = normalize_name(name)?;
    require_zone(list, zone_id)?.name = name;
    Ok(())
}

pub fn set_zone_notes(list: &mut PackingList, zone_id: ZoneId, notes: &str) -> StructureResult<()> {
    require_zone(list, zone_id)?.notes = notes.to_string();
    Ok(())
}

/// Removes a zone. Refuses (silently) to remove the last remaining zone.
pub fn delete_zone(
    list: &mut PackingList,
    zone_id: ZoneId,
    confirmation: Confirmation,
    now_ms: i64,
) -> StructureResult<StructureOutcome> {
    require_zone(list, zone_id)?;
    if list.zones.len() <= 1 {
        return Ok(StructureOutcome::Skipped);
    }
    if !confirmation.is_confirmed() {
        return Ok(StructureOutcome::NeedsConfirmation);
    }

    let index = list
        .zones
        .iter()
        .position(|zone| zone.id == zone_id)
        .ok_or(StructureError::ZoneNotFound(zone_id))?;
    let zone = list.zones.remove(index);
    for component in zone.components() {
        record_snapshot_removal(list, component.unique_id, now_ms);
    }
    Ok(StructureOutcome::Applied)
}

pub fn add_section(
    list: &mut PackingList,
    zone_id: ZoneId,
    name: &str,
) -> StructureResult<SectionId> {
    let section = Section::new(normalize_name(name)?);
    let section_id = section.id;
    require_zone(list, zone_id)?.sections.push(section);
    Ok(section_id)
}

pub fn rename_section(
    list: &mut PackingList,
    zone_id: ZoneId,
    section_id: SectionId,
    name: &str,
) -> StructureResult<()> {
    let name = normalize_name(name)?;
    require_section(list, zone_id, section_id)?.name = name;
    Ok(())
}

/// Removes a section. Refuses (silently) to remove a zone's last section.
pub fn delete_section(
    list: &mut PackingList,
    zone_id: ZoneId,
    section_id: SectionId,
    confirmation: Confirmation,
    now_ms: i64,
) -> StructureResult<StructureOutcome> {
    require_section(list, zone_id, section_id)?;
    let zone = require_zone(list, zone_id)?;
    if zone.sections.len() <= 1 {
        return Ok(StructureOutcome::Skipped);
    }
    if !confirmation.is_confirmed() {
        return Ok(StructureOutcome::NeedsConfirmation);
    }
    let index = zone
        .sections
        .iter()
        .position(|section| section.id == section_id)
        .ok_or(StructureError::SectionNotFound {
            zone_id,
            section_id,
        })?;
    let section = zone.sections.remove(index);
    for component in &section.components {
        record_snapshot_removal(list, component.unique_id, now_ms);
    }
    Ok(StructureOutcome::Applied)
}

/// Adds a catalog entity to a section and returns the affected component id.
///
/// `AddMode::Merge` bumps the quantity of a matching component by one, or
/// appends a new component with quantity 1. `AddMode::Replace` swaps the
/// reference, name, category and contents of the targeted component while
/// keeping its `unique_id` and quantity. Kits merge their reminders into
/// the list reminders.
pub fn add_entity(
    list: &mut PackingList,
    catalog: &Catalog,
    zone_id: ZoneId,
    section_id: SectionId,
    kind: ComponentType,
    reference_id: &str,
    mode: AddMode,
) -> StructureResult<ComponentId> {
    let snapshot =
        catalog
            .snapshot(kind, reference_id)
            .ok_or_else(|| StructureError::CatalogEntryNotFound {
                kind,
                reference_id: reference_id.to_string(),
            })?;
    let section = require_section(list, zone_id, section_id)?;

    let component_id = match mode {
        AddMode::Replace(target_id) => {
            let target = section
                .components
                .iter_mut()
                .find(|component| component.unique_id == target_id)
                .ok_or(StructureError::ComponentNotFound(target_id))?;
            target.kind = kind;
            target.reference_id = reference_id.to_string();
            target.name = snapshot.name;
            target.category = snapshot.category;
            target.contents = snapshot.contents;
            target_id
        }
        AddMode::Merge => {
            match section
                .components
                .iter_mut()
                .find(|component| component.references(kind, reference_id))
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(1);
                    existing.unique_id
                }
                None => {
                    let component = Component::new(
                        kind,
                        reference_id,
                        snapshot.name,
                        snapshot.category,
                        1,
                        snapshot.contents,
                    );
                    let component_id = component.unique_id;
                    section.components.push(component);
                    component_id
                }
            }
        }
    };

    if kind == ComponentType::Kit {
        if let Some(kit) = catalog.kit(reference_id) {
            for reminder in &kit.reminders {
                if !list.reminders.contains(reminder) {
                    list.reminders.push(reminder.clone());
                }
            }
        }
    }
    Ok(component_id)
}

pub fn update_component(
    list: &mut PackingList,
    component_id: ComponentId,
    patch: &ComponentPatch,
) -> StructureResult<()> {
    if patch.quantity == Some(0) {
        return Err(StructureError::InvalidQuantity(component_id));
    }
    let component = list
        .find_component_mut(component_id)
        .ok_or(StructureError::ComponentNotFound(component_id))?;
    if let Some(quantity) = patch.quantity {
        component.quantity = quantity;
    }
    if let Some(notes) = &patch.notes {
        component.notes = notes.clone();
    }
    Ok(())
}

/// Removes a component by id and returns its last value.
///
/// On a frozen list the removal is recorded as a deleted item when the
/// component was part of the last snapshot.
pub fn remove_component(
    list: &mut PackingList,
    component_id: ComponentId,
    now_ms: i64,
) -> StructureResult<Component> {
    let removed = list
        .zones
        .iter_mut()
        .flat_map(|zone| zone.sections.iter_mut())
        .find_map(|section| {
            let index = section
                .components
                .iter()
                .position(|component| component.unique_id == component_id)?;
            Some(section.components.remove(index))
        })
        .ok_or(StructureError::ComponentNotFound(component_id))?;
    record_snapshot_removal(list, component_id, now_ms);
    Ok(removed)
}

/// Moves a block of components within one section next to a drop target.
///
/// The insertion point is the target's index among the components left
/// after the moved block is taken out; the block keeps its relative order.
/// Ids outside the section are ignored. Dropping onto a moved component or
/// an empty selection is a no-op.
pub fn reorder_components(
    list: &mut PackingList,
    zone_id: ZoneId,
    section_id: SectionId,
    moved_ids: &[ComponentId],
    target_id: ComponentId,
    position: DropPosition,
) -> StructureResult<StructureOutcome> {
    let section = require_section(list, zone_id, section_id)?;
    let moved: HashSet<ComponentId> = moved_ids.iter().copied().collect();
    let target_present = section
        .components
        .iter()
        .any(|component| component.unique_id == target_id);
    let block_present = section
        .components
        .iter()
        .any(|component| moved.contains(&component.unique_id));
    if moved.contains(&target_id) || !target_present || !block_present {
        return Ok(StructureOutcome::Skipped);
    }

    let (block, mut remaining): (Vec<Component>, Vec<Component>) = section
        .components
        .drain(..)
        .partition(|component| moved.contains(&component.unique_id));
    let target_index = remaining
        .iter()
        .position(|component| component.unique_id == target_id)
        .unwrap_or(remaining.len());

    let insert_at = match position {
        DropPosition::Before => target_index,
        DropPosition::After => target_index + 1,
    };
    remaining.splice(insert_at..insert_at, block);
    section.components = remaining;
    Ok(StructureOutcome::Applied)
}

/// Drops the deleted-item records captured in the given zone.
///
/// Records are matched by zone id, so a rename after the removal does not
/// orphan them. Records without a zone id match on the current zone name.
pub fn clear_deleted_items(list: &mut PackingList, zone_id: ZoneId) -> StructureResult<usize> {
    let zone_name = require_zone(list, zone_id)?.name.clone();
    let before = list.deleted_items.len();
    list.deleted_items.retain(|record| match record.zone_id {
        Some(recorded) => recorded != zone_id,
        None => record.zone_name != zone_name,
    });
    Ok(before - list.deleted_items.len())
}

fn require_zone(list: &mut PackingList, zone_id: ZoneId) -> StructureResult<&mut Zone> {
    list.zone_mut(zone_id)
        .ok_or(StructureError::ZoneNotFound(zone_id))
}

pub(crate) fn require_section(
    list: &mut PackingList,
    zone_id: ZoneId,
    section_id: SectionId,
) -> StructureResult<&mut Section> {
    require_zone(list, zone_id)?
        .section_mut(section_id)
        .ok_or(StructureError::SectionNotFound {
            zone_id,
            section_id,
        })
}

fn normalize_name(value: &str) -> StructureResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StructureError::InvalidName);
    }
    Ok(trimmed.to_string())
}

/// Structure editing facade that persists every applied mutation.
pub struct StructureService<R: PackingListRepository> {
    repo: R,
}

impl<R: PackingListRepository> StructureService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates and persists a new draft list with one zone and one section.
    pub fn create_list(
        &self,
        event_name: &str,
        event_date: Option<String>,
        location: &str,
        first_zone: &str,
        first_section: &str,
    ) -> StructureResult<PackingList> {
        let mut list = PackingList::new(normalize_name(event_name)?, event_date, location.trim());
        let zone_id = add_zone(&mut list, first_zone)?;
        add_section(&mut list, zone_id, first_section)?;
        self.persist(&list, "create_list")?;
        Ok(list)
    }

    /// Deletes a whole list document after explicit confirmation.
    pub fn delete_list(
        &self,
        list: &PackingList,
        confirmation: Confirmation,
    ) -> StructureResult<StructureOutcome> {
        if !confirmation.is_confirmed() {
            return Ok(StructureOutcome::NeedsConfirmation);
        }
        self.repo.delete_list(list.id)?;
        info!(
            "event=list_delete module=structure status=ok list_id={}",
            list.id
        );
        Ok(StructureOutcome::Applied)
    }

    pub fn add_zone(&self, list: &mut PackingList, name: &str) -> StructureResult<ZoneId> {
        let zone_id = add_zone(list, name)?;
        self.persist(list, "add_zone")?;
        Ok(zone_id)
    }

    pub fn rename_zone(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
        name: &str,
    ) -> StructureResult<()> {
        rename_zone(list, zone_id, name)?;
        self.persist(list, "rename_zone")
    }

    pub fn set_zone_notes(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
        notes: &str,
    ) -> StructureResult<()> {
        set_zone_notes(list, zone_id, notes)?;
        self.persist(list, "set_zone_notes")
    }

    pub fn delete_zone(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
        confirmation: Confirmation,
    ) -> StructureResult<StructureOutcome> {
        let outcome = delete_zone(list, zone_id, confirmation, now_epoch_ms())?;
        self.persist_if_applied(list, outcome, "delete_zone")
    }

    pub fn add_section(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
        name: &str,
    ) -> StructureResult<SectionId> {
        let section_id = add_section(list, zone_id, name)?;
        self.persist(list, "add_section")?;
        Ok(section_id)
    }

    pub fn rename_section(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
        section_id: SectionId,
        name: &str,
    ) -> StructureResult<()> {
        rename_section(list, zone_id, section_id, name)?;
        self.persist(list, "rename_section")
    }

    pub fn delete_section(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
        section_id: SectionId,
        confirmation: Confirmation,
    ) -> StructureResult<StructureOutcome> {
        let outcome = delete_section(list, zone_id, section_id, confirmation, now_epoch_ms())?;
        self.persist_if_applied(list, outcome, "delete_section")
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_entity(
        &self,
        list: &mut PackingList,
        catalog: &Catalog,
        zone_id: ZoneId,
        section_id: SectionId,
        kind: ComponentType,
        reference_id: &str,
        mode: AddMode,
    ) -> StructureResult<ComponentId> {
        let component_id =
            add_entity(list, catalog, zone_id, section_id, kind, reference_id, mode)?;
        self.persist(list, "add_entity")?;
        Ok(component_id)
    }

    pub fn update_component(
        &self,
        list: &mut PackingList,
        component_id: ComponentId,
        patch: &ComponentPatch,
    ) -> StructureResult<()> {
        update_component(list, component_id, patch)?;
        self.persist(list, "update_component")
    }

    pub fn remove_component(
        &self,
        list: &mut PackingList,
        component_id: ComponentId,
    ) -> StructureResult<Component> {
        let removed = remove_component(list, component_id, now_epoch_ms())?;
        self.persist(list, "remove_component")?;
        Ok(removed)
    }

    pub fn reorder_components(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
        section_id: SectionId,
        moved_ids: &[ComponentId],
        target_id: ComponentId,
        position: DropPosition,
    ) -> StructureResult<StructureOutcome> {
        let outcome =
            reorder_components(list, zone_id, section_id, moved_ids, target_id, position)?;
        self.persist_if_applied(list, outcome, "reorder_components")
    }

    pub fn clear_deleted_items(
        &self,
        list: &mut PackingList,
        zone_id: ZoneId,
    ) -> StructureResult<usize> {
        let cleared = clear_deleted_items(list, zone_id)?;
        if cleared > 0 {
            self.persist(list, "clear_deleted_items")?;
        }
        Ok(cleared)
    }

    pub(crate) fn persist_if_applied(
        &self,
        list: &PackingList,
        outcome: StructureOutcome,
        operation: &'static str,
    ) -> StructureResult<StructureOutcome> {
        if outcome == StructureOutcome::Applied {
            self.persist(list, operation)?;
        }
        Ok(outcome)
    }

    pub(crate) fn persist(
        &self,
        list: &PackingList,
        operation: &'static str,
    ) -> StructureResult<()> {
        match self.repo.save_list(list) {
            Ok(()) => {
                info!(
                    "event=list_persist module=structure status=ok list_id={} op={}",
                    list.id, operation
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=list_persist module=structure status=error list_id={} op={} error={}",
                    list.id, operation, err
                );
                Err(err.into())
            }
        }
    }
}
