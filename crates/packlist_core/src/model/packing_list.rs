//! Packing list document model.
//!
//! # Responsibility
//! - Define the zone/section/component tree and its fulfillment state.
//! - Provide id-based lookups used by every engine operation.
//!
//! # Invariants
//! - `unique_id` is the only stable component identity; lookups never use
//!   positional indexes across operations.
//! - `snapshot` is written only by the freeze path.
//! - `deleted_items` is append-only until cleared per zone.
//! - Every component and content entry has `quantity >= 1`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type ListId = Uuid;
pub type ZoneId = Uuid;
pub type SectionId = Uuid;
/// Stable component instance identity, independent of position.
pub type ComponentId = Uuid;
/// Opaque id assigned by the external catalog.
pub type CatalogId = String;

static VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\.(\d+)\s*$").expect("valid version regex"));

/// Model validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    ZeroQuantity(ComponentId),
    ZeroContentQuantity {
        component: ComponentId,
        item_id: CatalogId,
    },
    BlankName(&'static str),
    DuplicateComponentId(ComponentId),
    InvalidVersion(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroQuantity(id) => write!(f, "component {id} must have quantity >= 1"),
            Self::ZeroContentQuantity { component, item_id } => write!(
                f,
                "content `{item_id}` of component {component} must have quantity >= 1"
            ),
            Self::BlankName(what) => write!(f, "{what} name must not be blank"),
            Self::DuplicateComponentId(id) => write!(f, "component id used twice: {id}"),
            Self::InvalidVersion(value) => {
                write!(f, "invalid list version `{value}`; expected major.minor")
            }
        }
    }
}

impl Error for ValidationError {}

/// Frozen revision number of a packing list, rendered as `major.minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ListVersion {
    pub major: u32,
    pub minor: u32,
}

impl ListVersion {
    /// Version assigned by the first freeze.
    pub const INITIAL: Self = Self { major: 1, minor: 0 };

    /// Returns the version following this one (minor + 1).
    pub fn next(self) -> Self {
        Self {
            major: self.major,
            minor: self.minor.saturating_add(1),
        }
    }
}

impl Display for ListVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ListVersion {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let caps = VERSION_RE
            .captures(value)
            .ok_or_else(|| ValidationError::InvalidVersion(value.to_string()))?;
        let parse = |index: usize| {
            caps[index]
                .parse::<u32>()
                .map_err(|_| ValidationError::InvalidVersion(value.to_string()))
        };
        Ok(Self {
            major: parse(1)?,
            minor: parse(2)?,
        })
    }
}

impl TryFrom<String> for ListVersion {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ListVersion> for String {
    fn from(value: ListVersion) -> Self {
        value.to_string()
    }
}

/// Catalog entity kind referenced by a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    Item,
    Kit,
}

impl ComponentType {
    /// Stable lowercase name, matching the stored form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Kit => "kit",
        }
    }
}

/// Quantity change recorded by a freeze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    /// Quantity at the previous freeze; `0` for newly introduced components.
    pub previous_quantity: u32,
    /// Unix epoch milliseconds.
    pub changed_at: i64,
}

/// Fulfillment flags and notes carried by every leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseState {
    pub in_distinta: bool,
    pub loaded: bool,
    pub returned: bool,
    pub is_broken: bool,
    pub warehouse_note: String,
    pub broken_note: String,
    pub change_log: Option<ChangeLog>,
}

impl WarehouseState {
    /// Picked and loaded.
    pub fn is_fulfilled(&self) -> bool {
        self.in_distinta && self.loaded
    }

    /// Clears picking/loading progress, keeping notes and return/broken flags.
    pub fn reset_progress(&mut self) {
        self.in_distinta = false;
        self.loaded = false;
    }

    pub fn has_note(&self) -> bool {
        !self.warehouse_note.trim().is_empty()
    }
}

/// Materialized catalog sub-item of a kit or an item's accessory bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub item_id: CatalogId,
    pub name: String,
    /// Quantity per single parent unit.
    pub quantity: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub warehouse_state: WarehouseState,
    #[serde(default)]
    pub prep_note: String,
}

impl ContentEntry {
    pub fn new(
        item_id: impl Into<CatalogId>,
        name: impl Into<String>,
        quantity: u32,
        category: impl Into<String>,
        prep_note: impl Into<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            name: name.into(),
            quantity,
            category: category.into(),
            warehouse_state: WarehouseState::default(),
            prep_note: prep_note.into(),
        }
    }
}

/// One entry in a section: a catalog item or kit plus quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub unique_id: ComponentId,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: ComponentType,
    pub reference_id: CatalogId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub quantity: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub contents: Vec<ContentEntry>,
    #[serde(default)]
    pub warehouse_state: WarehouseState,
}

impl Component {
    /// Creates a component with a freshly generated `unique_id`.
    pub fn new(
        kind: ComponentType,
        reference_id: impl Into<CatalogId>,
        name: impl Into<String>,
        category: impl Into<String>,
        quantity: u32,
        contents: Vec<ContentEntry>,
    ) -> Self {
        Self {
            unique_id: Uuid::new_v4(),
            kind,
            reference_id: reference_id.into(),
            name: name.into(),
            category: category.into(),
            quantity,
            notes: String::new(),
            contents,
            warehouse_state: WarehouseState::default(),
        }
    }

    pub fn is_kit(&self) -> bool {
        self.kind == ComponentType::Kit
    }

    /// Item with a non-empty accessory bundle.
    pub fn is_machine(&self) -> bool {
        self.kind == ComponentType::Item && !self.contents.is_empty()
    }

    /// Kits and machines aggregate as complex entries.
    pub fn is_complex(&self) -> bool {
        self.is_kit() || self.is_machine()
    }

    /// Returns whether this component matches a catalog reference.
    pub fn references(&self, kind: ComponentType, reference_id: &str) -> bool {
        self.kind == kind && self.reference_id == reference_id
    }

    pub fn content(&self, item_id: &str) -> Option<&ContentEntry> {
        self.contents.iter().find(|entry| entry.item_id == item_id)
    }

    pub fn content_mut(&mut self, item_id: &str) -> Option<&mut ContentEntry> {
        self.contents.iter_mut().find(|entry| entry.item_id == item_id)
    }

    /// Clears picking/loading on the component and all of its contents.
    pub fn reset_progress(&mut self) {
        self.warehouse_state.reset_progress();
        for entry in &mut self.contents {
            entry.warehouse_state.reset_progress();
        }
    }
}

/// Category grouping within a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            components: Vec::new(),
        }
    }
}

/// Top-level grouping in a packing list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Zone {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            notes: String::new(),
            sections: Vec::new(),
        }
    }

    pub fn section(&self, section_id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == section_id)
    }

    pub fn section_mut(&mut self, section_id: SectionId) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|section| section.id == section_id)
    }

    /// Iterates all components of this zone in section order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.sections
            .iter()
            .flat_map(|section| section.components.iter())
    }
}

/// Audit record for a component removed after the list was frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedItemRecord {
    pub component: Component,
    /// Zone the component was captured in. Absent on records written before
    /// zone ids were stored; those fall back to `zone_name`.
    #[serde(default)]
    pub zone_id: Option<ZoneId>,
    pub zone_name: String,
    pub section_name: String,
    /// Unix epoch milliseconds.
    pub deleted_at: i64,
}

/// Borrowed view of one component with its containers.
#[derive(Debug, Clone, Copy)]
pub struct ComponentLocation<'a> {
    pub zone: &'a Zone,
    pub section: &'a Section,
    pub component: &'a Component,
}

/// Whole persisted packing list document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingList {
    pub id: ListId,
    pub event_name: String,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub location: String,
    /// `None` while the list is still a draft.
    #[serde(default)]
    pub version: Option<ListVersion>,
    #[serde(default)]
    pub zones: Vec<Zone>,
    /// Zones as of the last freeze.
    #[serde(default)]
    pub snapshot: Vec<Zone>,
    #[serde(default)]
    pub deleted_items: Vec<DeletedItemRecord>,
    #[serde(default)]
    pub reminders: Vec<String>,
}

impl PackingList {
    /// Creates an empty draft list with a generated id.
    pub fn new(
        event_name: impl Into<String>,
        event_date: Option<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_name: event_name.into(),
            event_date,
            location: location.into(),
            version: None,
            zones: Vec::new(),
            snapshot: Vec::new(),
            deleted_items: Vec::new(),
            reminders: Vec::new(),
        }
    }

    /// A list is a draft until its first freeze.
    pub fn is_draft(&self) -> bool {
        self.version.is_none()
    }

    pub fn zone(&self, zone_id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == zone_id)
    }

    pub fn zone_mut(&mut self, zone_id: ZoneId) -> Option<&mut Zone> {
        self.zones.iter_mut().find(|zone| zone.id == zone_id)
    }

    pub fn section_mut(&mut self, zone_id: ZoneId, section_id: SectionId) -> Option<&mut Section> {
        self.zone_mut(zone_id)?.section_mut(section_id)
    }

    /// Iterates every component with its zone and section.
    pub fn locations(&self) -> impl Iterator<Item = ComponentLocation<'_>> {
        self.zones.iter().flat_map(|zone| {
            zone.sections.iter().flat_map(move |section| {
                section
                    .components
                    .iter()
                    .map(move |component| ComponentLocation {
                        zone,
                        section,
                        component,
                    })
            })
        })
    }

    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.zones
            .iter_mut()
            .flat_map(|zone| zone.sections.iter_mut())
            .flat_map(|section| section.components.iter_mut())
    }

    pub fn find_component(&self, unique_id: ComponentId) -> Option<&Component> {
        self.locations()
            .map(|location| location.component)
            .find(|component| component.unique_id == unique_id)
    }

    pub fn find_component_mut(&mut self, unique_id: ComponentId) -> Option<&mut Component> {
        self.components_mut()
            .find(|component| component.unique_id == unique_id)
    }

    /// Validates quantity, naming and identity invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for zone in &self.zones {
            if zone.name.trim().is_empty() {
                return Err(ValidationError::BlankName("zone"));
            }
            for section in &zone.sections {
                if section.name.trim().is_empty() {
                    return Err(ValidationError::BlankName("section"));
                }
                for component in &section.components {
                    validate_component(component)?;
                    if !seen.insert(component.unique_id) {
                        return Err(ValidationError::DuplicateComponentId(component.unique_id));
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_component(component: &Component) -> Result<(), ValidationError> {
    if component.quantity == 0 {
        return Err(ValidationError::ZeroQuantity(component.unique_id));
    }
    if let Some(entry) = component.contents.iter().find(|entry| entry.quantity == 0) {
        return Err(ValidationError::ZeroContentQuantity {
            component: component.unique_id,
            item_id: entry.item_id.clone(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_and_increments_minor() {
        let version: ListVersion = "1.9".parse().expect("valid version");
        assert_eq!(version.next().to_string(), "1.10");
        assert_eq!(ListVersion::INITIAL.to_string(), "1.0");
    }

    #[test]
    fn version_rejects_malformed_values() {
        assert!("1".parse::<ListVersion>().is_err());
        assert!("a.b".parse::<ListVersion>().is_err());
        assert!("1.2.3".parse::<ListVersion>().is_err());
    }

    #[test]
    fn version_serializes_as_string() {
        let json = serde_json::to_string(&Some(ListVersion { major: 2, minor: 3 }))
            .expect("serialize version");
        assert_eq!(json, "\"2.3\"");
    }

    #[test]
    fn component_type_name_matches_stored_form() {
        for kind in [ComponentType::Item, ComponentType::Kit] {
            let json = serde_json::to_string(&kind).expect("serialize kind");
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn validate_rejects_zero_quantity_content() {
        let mut list = PackingList::new("Gala", None, "Hall");
        let mut zone = Zone::new("Main");
        let mut section = Section::new("Audio");
        section.components.push(Component::new(
            ComponentType::Kit,
            "kit",
            "Kit",
            "Kit",
            1,
            vec![ContentEntry::new("mic", "Mic", 0, "", "")],
        ));
        zone.sections.push(section);
        list.zones.push(zone);

        assert!(matches!(
            list.validate(),
            Err(ValidationError::ZeroContentQuantity { .. })
        ));
    }

    #[test]
    fn machine_requires_item_with_contents() {
        let plain = Component::new(ComponentType::Item, "mic", "Mic", "", 1, Vec::new());
        let machine = Component::new(
            ComponentType::Item,
            "desk",
            "Desk",
            "",
            1,
            vec![ContentEntry::new("psu", "PSU", 1, "", "")],
        );
        assert!(!plain.is_complex());
        assert!(machine.is_machine());
        assert!(machine.is_complex());
    }
}
