//! Session-local selection and clipboard for structure editing.
//!
//! # Responsibility
//! - Track multi-selection of component instances.
//! - Copy, cut and paste components between sections of a list.
//!
//! # Invariants
//! - Session state is never persisted and is reset on navigation.
//! - Empty selection/clipboard operations are no-ops, never errors.
//! - A second paste of the same clipboard requires confirmation.

use crate::model::packing_list::{
    Component, ComponentId, PackingList, SectionId, WarehouseState, ZoneId,
};
use crate::repo::list_repo::PackingListRepository;
use crate::service::structure_service::{
    remove_component, require_section, StructureResult, StructureService,
};
use crate::service::{now_epoch_ms, Confirmation};
use uuid::Uuid;

/// Result of a paste request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteOutcome {
    /// Clipboard was empty; nothing happened.
    Empty,
    /// Clipboard was already pasted once; caller must confirm.
    NeedsConfirmation,
    Pasted {
        /// Clipboard entries merged into existing components.
        merged: usize,
        /// Clipboard entries appended as new components.
        appended: usize,
    },
}

/// Selection, clipboard and repeat-paste guard of one editing session.
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    selection: Vec<ComponentId>,
    clipboard: Vec<Component>,
    already_pasted: bool,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &[ComponentId] {
        &self.selection
    }

    pub fn clipboard(&self) -> &[Component] {
        &self.clipboard
    }

    pub fn is_selected(&self, component_id: ComponentId) -> bool {
        self.selection.contains(&component_id)
    }

    pub fn select(&mut self, component_id: ComponentId) {
        if !self.is_selected(component_id) {
            self.selection.push(component_id);
        }
    }

    /// Flips selection of one instance; returns whether it is now selected.
    pub fn toggle(&mut self, component_id: ComponentId) -> bool {
        if let Some(index) = self.selection.iter().position(|id| *id == component_id) {
            self.selection.remove(index);
            false
        } else {
            self.selection.push(component_id);
            true
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Clears all session state; called when navigating away.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Captures full values of the selected components, in tree order.
    /// Returns how many were captured; an empty selection leaves the
    /// clipboard untouched.
    pub fn copy(&mut self, list: &PackingList) -> usize {
        let captured: Vec<Component> = list
            .locations()
            .map(|location| location.component)
            .filter(|component| self.is_selected(component.unique_id))
            .cloned()
            .collect();
        if captured.is_empty() {
            return 0;
        }
        self.clipboard = captured;
        self.already_pasted = false;
        self.clipboard.len()
    }

    /// Copy followed by removal of the selected components.
    pub fn cut(&mut self, list: &mut PackingList, now_ms: i64) -> StructureResult<usize> {
        let captured = self.copy(list);
        if captured == 0 {
            return Ok(0);
        }
        for component_id in self.clipboard.iter().map(|component| component.unique_id) {
            remove_component(list, component_id, now_ms)?;
        }
        self.selection.clear();
        Ok(captured)
    }

    /// Merges the clipboard into a section by `(type, reference_id)`.
    ///
    /// Matches get their quantity increased by the clipboard quantity;
    /// other entries are appended with a fresh `unique_id` and cleared
    /// warehouse state.
    pub fn paste(
        &mut self,
        list: &mut PackingList,
        zone_id: ZoneId,
        section_id: SectionId,
        confirmation: Confirmation,
    ) -> StructureResult<PasteOutcome> {
        let section = require_section(list, zone_id, section_id)?;
        if self.clipboard.is_empty() {
            return Ok(PasteOutcome::Empty);
        }
        if self.already_pasted && !confirmation.is_confirmed() {
            return Ok(PasteOutcome::NeedsConfirmation);
        }

        let mut merged = 0;
        let mut appended = 0;
        for copied in &self.clipboard {
            match section
                .components
                .iter_mut()
                .find(|component| component.references(copied.kind, &copied.reference_id))
            {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(copied.quantity);
                    merged += 1;
                }
                None => {
                    section.components.push(fresh_instance(copied));
                    appended += 1;
                }
            }
        }
        self.already_pasted = true;
        Ok(PasteOutcome::Pasted { merged, appended })
    }
}

fn fresh_instance(copied: &Component) -> Component {
    let mut component = copied.clone();
    component.unique_id = Uuid::new_v4();
    component.warehouse_state = WarehouseState::default();
    for entry in &mut component.contents {
        entry.warehouse_state = WarehouseState::default();
    }
    component
}

impl<R: PackingListRepository> StructureService<R> {
    /// Cuts the session selection and persists the list when anything moved
    /// to the clipboard.
    pub fn cut(&self, session: &mut EditSession, list: &mut PackingList) -> StructureResult<usize> {
        let cut = session.cut(list, now_epoch_ms())?;
        if cut > 0 {
            self.persist(list, "cut")?;
        }
        Ok(cut)
    }

    /// Pastes the session clipboard and persists the list on success.
    pub fn paste(
        &self,
        session: &mut EditSession,
        list: &mut PackingList,
        zone_id: ZoneId,
        section_id: SectionId,
        confirmation: Confirmation,
    ) -> StructureResult<PasteOutcome> {
        let outcome = session.paste(list, zone_id, section_id, confirmation)?;
        if matches!(outcome, PasteOutcome::Pasted { .. }) {
            self.persist(list, "paste")?;
        }
        Ok(outcome)
    }
}
