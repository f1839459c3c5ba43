use packlist_core::db::open_db_in_memory;
use packlist_core::{
    aggregate_zone, AggregateTarget, Component, ComponentType, ContentEntry, FulfillmentFlag,
    FulfillmentProgress, GroupKey, LeafRef, ListId, ListSummary, PackingList, PackingListRepository,
    RepoError, RepoResult, Section, SqlitePackingListRepository, WarehouseError, WarehousePatch,
    WarehouseService, Zone, ZoneId,
};

struct FailingRepo;

impl PackingListRepository for FailingRepo {
    fn save_list(&self, _list: &PackingList) -> RepoResult<()> {
        Err(RepoError::InvalidData("store offline".to_string()))
    }

    fn save_lists(&self, _lists: &[PackingList]) -> RepoResult<()> {
        Err(RepoError::InvalidData("store offline".to_string()))
    }

    fn get_list(&self, _id: ListId) -> RepoResult<Option<PackingList>> {
        Ok(None)
    }

    fn list_summaries(&self) -> RepoResult<Vec<ListSummary>> {
        Ok(Vec::new())
    }

    fn delete_list(&self, id: ListId) -> RepoResult<()> {
        Err(RepoError::ListNotFound(id))
    }
}

fn cable(quantity: u32) -> Component {
    Component::new(ComponentType::Item, "cable-5m", "Cable-5m", "Cabling", quantity, Vec::new())
}

fn mixer_kit(quantity: u32) -> Component {
    Component::new(
        ComponentType::Kit,
        "kit-mixer",
        "Mixer Kit",
        "Kit",
        quantity,
        vec![
            ContentEntry::new("mic-a", "MicA", 1, "Audio", ""),
            ContentEntry::new("cable-b", "CableB", 2, "Audio", ""),
        ],
    )
}

/// Zone "Main" with two loose Cable-5m instances (2 + 3) and a Mixer Kit.
fn list() -> (PackingList, ZoneId) {
    let mut list = PackingList::new("Gala", None, "");
    let mut zone = Zone::new("Main");
    let mut audio = Section::new("Audio");
    audio.components.push(cable(2));
    audio.components.push(mixer_kit(2));
    let mut stage = Section::new("Stage");
    stage.components.push(cable(3));
    zone.sections.push(audio);
    zone.sections.push(stage);
    let zone_id = zone.id;
    list.zones.push(zone);
    (list, zone_id)
}

fn loaded_total(list: &PackingList, zone_id: ZoneId, name: &str) -> u32 {
    aggregate_zone(list.zone(zone_id).unwrap()).simple[name]
        .tally
        .flags
        .loaded
}

#[test]
fn batch_update_flags_exactly_the_listed_leaves() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let service = WarehouseService::new(&repo);
    let (mut list, zone_id) = list();
    let stage_cable = list.zones[0].sections[1].components[0].unique_id;

    let updated = service
        .batch_set_state(
            &mut list,
            &[LeafRef::Component(stage_cable)],
            &WarehousePatch::flag(FulfillmentFlag::Loaded, true),
        )
        .unwrap();

    assert_eq!(updated, 1);
    assert_eq!(loaded_total(&list, zone_id, "Cable-5m"), 3);
    let stored = repo.get_list(list.id).unwrap().unwrap();
    assert_eq!(loaded_total(&stored, zone_id, "Cable-5m"), 3);
}

#[test]
fn batch_update_with_unknown_leaf_changes_nothing() {
    let (mut list, _) = list();
    let cable_id = list.zones[0].sections[0].components[0].unique_id;
    let kit_id = list.zones[0].sections[0].components[1].unique_id;
    let before = list.clone();

    let err = packlist_core::batch_set_state(
        &mut list,
        &[
            LeafRef::Component(cable_id),
            LeafRef::Content {
                component: kit_id,
                item_id: "ghost".to_string(),
            },
        ],
        &WarehousePatch::flag(FulfillmentFlag::InDistinta, true),
    )
    .unwrap_err();

    assert!(matches!(err, WarehouseError::ContentNotFound { .. }));
    assert_eq!(list, before);
}

#[test]
fn kit_component_has_no_state_of_its_own() {
    let (mut list, _) = list();
    let kit_id = list.zones[0].sections[0].components[1].unique_id;

    let err = packlist_core::set_leaf_state(
        &mut list,
        &LeafRef::Component(kit_id),
        &WarehousePatch::flag(FulfillmentFlag::Loaded, true),
    )
    .unwrap_err();
    assert!(matches!(err, WarehouseError::KitHasNoState(id) if id == kit_id));
}

#[test]
fn toggling_aggregated_control_fills_partial_and_clears_complete() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let service = WarehouseService::new(&repo);
    let (mut list, zone_id) = list();
    let audio_cable = list.zones[0].sections[0].components[0].unique_id;
    packlist_core::set_leaf_state(
        &mut list,
        &LeafRef::Component(audio_cable),
        &WarehousePatch::flag(FulfillmentFlag::InDistinta, true),
    )
    .unwrap();
    let target = AggregateTarget::Simple("Cable-5m".to_string());

    let (_, progress) = aggregate_zone(list.zone(zone_id).unwrap())
        .control(&target, FulfillmentFlag::InDistinta)
        .unwrap();
    assert_eq!(progress, FulfillmentProgress::Partial { done: 2, total: 5 });
    assert_eq!(progress.to_string(), "2/5");

    let progress = service
        .toggle_aggregated(&mut list, zone_id, &target, FulfillmentFlag::InDistinta)
        .unwrap();
    assert_eq!(progress, Some(FulfillmentProgress::Complete { total: 5 }));

    let progress = service
        .toggle_aggregated(&mut list, zone_id, &target, FulfillmentFlag::InDistinta)
        .unwrap();
    assert_eq!(progress, Some(FulfillmentProgress::NotStarted { total: 5 }));
    let stored = repo.get_list(list.id).unwrap().unwrap();
    assert!(stored
        .zone(zone_id)
        .unwrap()
        .components()
        .all(|component| !component.warehouse_state.in_distinta));
}

#[test]
fn toggling_kit_control_covers_every_content_leaf() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let service = WarehouseService::new(&repo);
    let (mut list, zone_id) = list();
    let target = AggregateTarget::Complex(GroupKey::Kit("Mixer Kit".to_string()));

    let progress = service
        .toggle_aggregated(&mut list, zone_id, &target, FulfillmentFlag::Loaded)
        .unwrap();

    // MicA 1x2 + CableB 2x2
    assert_eq!(progress, Some(FulfillmentProgress::Complete { total: 6 }));
    let kit = &list.zones[0].sections[0].components[1];
    assert!(kit.contents.iter().all(|entry| entry.warehouse_state.loaded));
    assert!(!kit.warehouse_state.loaded);

    let missing = service
        .toggle_aggregated(
            &mut list,
            zone_id,
            &AggregateTarget::Simple("Nope".to_string()),
            FulfillmentFlag::Loaded,
        )
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn resolving_broken_report_clears_flag_and_note() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let service = WarehouseService::new(&repo);
    let (mut list, zone_id) = list();
    let kit_id = list.zones[0].sections[0].components[1].unique_id;
    let leaf = LeafRef::Content {
        component: kit_id,
        item_id: "mic-a".to_string(),
    };

    service
        .set_leaf_state(&mut list, &leaf, &WarehousePatch::broken("capsule cracked"))
        .unwrap();
    let aggregation = aggregate_zone(list.zone(zone_id).unwrap());
    let kit = &aggregation.complex[&GroupKey::Kit("Mixer Kit".to_string())];
    assert!(kit.has_issue());

    service.resolve_broken(&mut list, &leaf).unwrap();
    let stored = repo.get_list(list.id).unwrap().unwrap();
    let state = packlist_core::leaf_state(&stored, &leaf).unwrap();
    assert!(!state.is_broken);
    assert!(state.broken_note.is_empty());
}

#[test]
fn persistence_failure_propagates_without_rollback() {
    let service = WarehouseService::new(FailingRepo);
    let (mut list, _) = list();
    let cable_id = list.zones[0].sections[0].components[0].unique_id;

    let err = service
        .set_leaf_state(
            &mut list,
            &LeafRef::Component(cable_id),
            &WarehousePatch::flag(FulfillmentFlag::Returned, true),
        )
        .unwrap_err();

    assert!(matches!(err, WarehouseError::Repo(RepoError::InvalidData(_))));
    assert!(list.find_component(cable_id).unwrap().warehouse_state.returned);
}

#[test]
fn empty_batch_is_a_no_op_without_write() {
    let service = WarehouseService::new(FailingRepo);
    let (mut list, _) = list();

    let updated = service
        .batch_set_state(
            &mut list,
            &[],
            &WarehousePatch::flag(FulfillmentFlag::Loaded, true),
        )
        .unwrap();
    assert_eq!(updated, 0);
}
