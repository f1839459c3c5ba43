//! Zone aggregation for fulfillment and export.
//!
//! # Responsibility
//! - Group a zone's leaves by display name into complex entries (kits and
//!   machines) and simple entries (everything else).
//! - Sum quantities and flagged quantities, and collect leaf references
//!   for batch updates.
//! - Attach cross-reference warnings for names that also appear elsewhere.
//!
//! # Invariants
//! - The aggregation is derived on every read and never persisted.
//! - Kit and machine keys live in distinct namespaces.
//! - Child quantities are `content.quantity * parent.quantity`.

mod cross_ref;
mod manifest;

pub use cross_ref::{CrossRefIndex, CrossRefWarning, WarningPart};
pub use manifest::{list_manifest, zone_manifest};

use crate::model::packing_list::{Component, WarehouseState, Zone};
use crate::service::warehouse_service::LeafRef;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Fulfillment flag exposed as an aggregated control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FulfillmentFlag {
    InDistinta,
    Loaded,
    Returned,
}

/// Key of a complex entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupKey {
    Kit(String),
    Machine(String),
}

impl GroupKey {
    pub fn for_component(component: &Component) -> Option<Self> {
        if component.is_kit() {
            Some(Self::Kit(component.name.clone()))
        } else if component.is_machine() {
            Some(Self::Machine(component.name.clone()))
        } else {
            None
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Kit(name) | Self::Machine(name) => name,
        }
    }

    pub fn is_kit(&self) -> bool {
        matches!(self, Self::Kit(_))
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kit(name) => write!(f, "KIT-{name}"),
            Self::Machine(name) => write!(f, "MACCHINA-{name}"),
        }
    }
}

/// Quantities whose leaf has a given flag set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagTotals {
    pub in_distinta: u32,
    pub loaded: u32,
    pub returned: u32,
    pub broken: u32,
}

impl FlagTotals {
    fn add(&mut self, state: &WarehouseState, quantity: u32) {
        let count = |flag: bool| if flag { quantity } else { 0 };
        self.in_distinta = self.in_distinta.saturating_add(count(state.in_distinta));
        self.loaded = self.loaded.saturating_add(count(state.loaded));
        self.returned = self.returned.saturating_add(count(state.returned));
        self.broken = self.broken.saturating_add(count(state.is_broken));
    }

    pub fn get(&self, flag: FulfillmentFlag) -> u32 {
        match flag {
            FulfillmentFlag::InDistinta => self.in_distinta,
            FulfillmentFlag::Loaded => self.loaded,
            FulfillmentFlag::Returned => self.returned,
        }
    }
}

/// Rendering state of one aggregated control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FulfillmentProgress {
    NotStarted { total: u32 },
    Partial { done: u32, total: u32 },
    Complete { total: u32 },
}

impl FulfillmentProgress {
    pub fn from_counts(done: u32, total: u32) -> Self {
        if total == 0 || done == 0 {
            Self::NotStarted { total }
        } else if done >= total {
            Self::Complete { total }
        } else {
            Self::Partial { done, total }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

impl Display for FulfillmentProgress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted { total } => write!(f, "0/{total}"),
            Self::Partial { done, total } => write!(f, "{done}/{total}"),
            Self::Complete { total } => write!(f, "{total}/{total}"),
        }
    }
}

/// Summed quantities, flags and leaf references for one display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub total_qty: u32,
    pub flags: FlagTotals,
    pub has_note: bool,
    pub has_issue: bool,
    pub leaves: Vec<LeafRef>,
}

impl Tally {
    fn absorb(&mut self, leaf: LeafRef, state: &WarehouseState, quantity: u32) {
        self.total_qty = self.total_qty.saturating_add(quantity);
        self.flags.add(state, quantity);
        self.has_note |= state.has_note();
        self.has_issue |= state.is_broken;
        self.leaves.push(leaf);
    }

    pub fn progress(&self, flag: FulfillmentFlag) -> FulfillmentProgress {
        FulfillmentProgress::from_counts(self.flags.get(flag), self.total_qty)
    }
}

/// Loose component aggregated by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleEntry {
    pub name: String,
    pub tally: Tally,
}

/// Content entry name aggregated under one complex key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub tally: Tally,
    pub warning: Option<CrossRefWarning>,
}

/// Kit or machine aggregated by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexEntry {
    pub key: GroupKey,
    /// Own leaves are the machine components; kits have none.
    pub tally: Tally,
    pub children: BTreeMap<String, ChildEntry>,
    pub warning: Option<CrossRefWarning>,
}

impl ComplexEntry {
    fn new(key: GroupKey) -> Self {
        Self {
            key,
            tally: Tally::default(),
            children: BTreeMap::new(),
            warning: None,
        }
    }

    /// Own leaves followed by every child leaf.
    pub fn all_leaves(&self) -> Vec<LeafRef> {
        let mut leaves = self.tally.leaves.clone();
        for child in self.children.values() {
            leaves.extend(child.tally.leaves.iter().cloned());
        }
        leaves
    }

    /// Kits report progress over their children; machines over themselves.
    pub fn progress(&self, flag: FulfillmentFlag) -> FulfillmentProgress {
        if self.key.is_kit() {
            let (done, total) = self.children.values().fold((0u32, 0u32), |(done, total), child| {
                (
                    done.saturating_add(child.tally.flags.get(flag)),
                    total.saturating_add(child.tally.total_qty),
                )
            });
            FulfillmentProgress::from_counts(done, total)
        } else {
            self.tally.progress(flag)
        }
    }

    pub fn has_note(&self) -> bool {
        self.tally.has_note || self.children.values().any(|child| child.tally.has_note)
    }

    pub fn has_issue(&self) -> bool {
        self.tally.has_issue || self.children.values().any(|child| child.tally.has_issue)
    }
}

/// Addressable aggregated control.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateTarget {
    Simple(String),
    Complex(GroupKey),
    Child { parent: GroupKey, name: String },
}

/// Per-zone grouping consumed by the fulfillment view and export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneAggregation {
    pub complex: BTreeMap<GroupKey, ComplexEntry>,
    pub simple: BTreeMap<String, SimpleEntry>,
}

impl ZoneAggregation {
    /// Leaves and current progress behind one aggregated control.
    ///
    /// Complex controls cover the machine itself or, for kits, all of the
    /// kit's content leaves.
    pub fn control(
        &self,
        target: &AggregateTarget,
        flag: FulfillmentFlag,
    ) -> Option<(Vec<LeafRef>, FulfillmentProgress)> {
        match target {
            AggregateTarget::Simple(name) => self
                .simple
                .get(name)
                .map(|entry| (entry.tally.leaves.clone(), entry.tally.progress(flag))),
            AggregateTarget::Complex(key) => self.complex.get(key).map(|entry| {
                let leaves = if key.is_kit() {
                    entry.all_leaves()
                } else {
                    entry.tally.leaves.clone()
                };
                (leaves, entry.progress(flag))
            }),
            AggregateTarget::Child { parent, name } => self
                .complex
                .get(parent)
                .and_then(|entry| entry.children.get(name))
                .map(|child| (child.tally.leaves.clone(), child.tally.progress(flag))),
        }
    }
}

/// Builds the aggregation of one zone, warnings included.
pub fn aggregate_zone(zone: &Zone) -> ZoneAggregation {
    let mut aggregation = ZoneAggregation::default();

    for component in zone.components() {
        let Some(key) = GroupKey::for_component(component) else {
            aggregation
                .simple
                .entry(component.name.clone())
                .or_insert_with(|| SimpleEntry {
                    name: component.name.clone(),
                    tally: Tally::default(),
                })
                .tally
                .absorb(
                    LeafRef::Component(component.unique_id),
                    &component.warehouse_state,
                    component.quantity,
                );
            continue;
        };

        let entry = aggregation
            .complex
            .entry(key.clone())
            .or_insert_with(|| ComplexEntry::new(key));
        if component.is_kit() {
            entry.tally.total_qty = entry.tally.total_qty.saturating_add(component.quantity);
        } else {
            entry.tally.absorb(
                LeafRef::Component(component.unique_id),
                &component.warehouse_state,
                component.quantity,
            );
        }

        for content in &component.contents {
            entry
                .children
                .entry(content.name.clone())
                .or_insert_with(|| ChildEntry {
                    name: content.name.clone(),
                    tally: Tally::default(),
                    warning: None,
                })
                .tally
                .absorb(
                    LeafRef::Content {
                        component: component.unique_id,
                        item_id: content.item_id.clone(),
                    },
                    &content.warehouse_state,
                    content.quantity.saturating_mul(component.quantity),
                );
        }
    }

    let index = CrossRefIndex::build(&aggregation);
    for entry in aggregation.complex.values_mut() {
        entry.warning = index.top_level_warning(entry.key.name());
        for child in entry.children.values_mut() {
            child.warning = index.child_warning(&child.name, &entry.key);
        }
    }
    aggregation
}
