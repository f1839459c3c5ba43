//! Catalog mirror model.
//!
//! # Responsibility
//! - Describe items and kits exactly as the external catalog exposes them.
//! - Materialize catalog definitions into denormalized component snapshots.
//!
//! # Invariants
//! - The catalog is read-only from the engine's point of view.
//! - Materialized quantities are clamped to at least 1.

use crate::model::packing_list::{CatalogId, ComponentType, ContentEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category assigned to kit components; kits carry no catalog category.
pub const KIT_CATEGORY: &str = "Kit";

/// Accessory bundled with a catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accessory {
    pub item_id: CatalogId,
    pub quantity: u32,
    #[serde(default)]
    pub prep_note: String,
}

/// Catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: CatalogId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub accessories: Vec<Accessory>,
}

/// Member of a catalog kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KitMember {
    pub item_id: CatalogId,
    pub quantity: u32,
}

/// Catalog kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kit {
    pub id: CatalogId,
    pub name: String,
    #[serde(default)]
    pub items: Vec<KitMember>,
    #[serde(default)]
    pub reminders: Vec<String>,
}

/// Denormalized view of one catalog entity, as embedded into a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    pub name: String,
    pub category: String,
    pub contents: Vec<ContentEntry>,
}

/// In-memory catalog state keyed by catalog id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub items: BTreeMap<CatalogId, Item>,
    pub kits: BTreeMap<CatalogId, Kit>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from item and kit lists. Later duplicates win.
    pub fn from_parts(items: Vec<Item>, kits: Vec<Kit>) -> Self {
        Self {
            items: items.into_iter().map(|item| (item.id.clone(), item)).collect(),
            kits: kits.into_iter().map(|kit| (kit.id.clone(), kit)).collect(),
        }
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn kit(&self, id: &str) -> Option<&Kit> {
        self.kits.get(id)
    }

    /// Returns whether `reference_id` resolves for the given component type.
    pub fn contains(&self, kind: ComponentType, reference_id: &str) -> bool {
        match kind {
            ComponentType::Item => self.items.contains_key(reference_id),
            ComponentType::Kit => self.kits.contains_key(reference_id),
        }
    }

    /// Materializes the current catalog definition of one entity.
    ///
    /// Kit members become content entries without prep notes; item
    /// accessories keep their prep note. Content names and categories are
    /// looked up from the referenced items, falling back to the raw item id
    /// when the member item is itself missing from the catalog.
    pub fn snapshot(&self, kind: ComponentType, reference_id: &str) -> Option<CatalogSnapshot> {
        match kind {
            ComponentType::Kit => {
                let kit = self.kit(reference_id)?;
                let contents = kit
                    .items
                    .iter()
                    .map(|member| self.content_entry(&member.item_id, member.quantity, ""))
                    .collect();
                Some(CatalogSnapshot {
                    name: kit.name.clone(),
                    category: KIT_CATEGORY.to_string(),
                    contents,
                })
            }
            ComponentType::Item => {
                let item = self.item(reference_id)?;
                let contents = item
                    .accessories
                    .iter()
                    .map(|accessory| {
                        self.content_entry(
                            &accessory.item_id,
                            accessory.quantity,
                            accessory.prep_note.as_str(),
                        )
                    })
                    .collect();
                Some(CatalogSnapshot {
                    name: item.name.clone(),
                    category: item.category.clone(),
                    contents,
                })
            }
        }
    }

    fn content_entry(&self, item_id: &str, quantity: u32, prep_note: &str) -> ContentEntry {
        let (name, category) = match self.item(item_id) {
            Some(item) => (item.name.clone(), item.category.clone()),
            None => (item_id.to_string(), String::new()),
        };
        ContentEntry::new(item_id, name, quantity.max(1), category, prep_note)
    }
}
