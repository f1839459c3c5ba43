//! Flat name -> quantity totals for manifest export.
//!
//! Computed straight from the component tree; warehouse state is ignored.
//! Kits count under their own name as well as through their contents.

use crate::model::packing_list::{PackingList, Zone};
use std::collections::BTreeMap;

pub fn zone_manifest(zone: &Zone) -> BTreeMap<String, u32> {
    let mut totals = BTreeMap::new();
    add_zone(&mut totals, zone);
    totals
}

pub fn list_manifest(list: &PackingList) -> BTreeMap<String, u32> {
    let mut totals = BTreeMap::new();
    for zone in &list.zones {
        add_zone(&mut totals, zone);
    }
    totals
}

fn add_zone(totals: &mut BTreeMap<String, u32>, zone: &Zone) {
    for component in zone.components() {
        add(totals, &component.name, component.quantity);
        for content in &component.contents {
            add(totals, &content.name, content.quantity.saturating_mul(component.quantity));
        }
    }
}

fn add(totals: &mut BTreeMap<String, u32>, name: &str, quantity: u32) {
    let total = totals.entry(name.to_string()).or_insert(0);
    *total = total.saturating_add(quantity);
}
