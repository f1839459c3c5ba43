use packlist_core::db::open_db_in_memory;
use packlist_core::{
    freeze_list, missing_components, reconcile_list, Accessory, AggregateTarget, CatalogRepository,
    CatalogSyncService, Component, ComponentType, ContentEntry, FulfillmentFlag,
    FulfillmentProgress, GroupKey, Item, Kit, KitMember, LeafRef, ListId, ListSummary, PackingList,
    PackingListRepository, RepoResult, Section, SqliteCatalogRepository,
    SqlitePackingListRepository, WarehousePatch, WarehouseService, Zone,
};
use std::cell::Cell;

/// Counts document writes on top of the SQLite repository.
struct CountingRepo<'conn> {
    inner: SqlitePackingListRepository<'conn>,
    writes: Cell<usize>,
}

impl PackingListRepository for CountingRepo<'_> {
    fn save_list(&self, list: &PackingList) -> RepoResult<()> {
        self.writes.set(self.writes.get() + 1);
        self.inner.save_list(list)
    }

    fn save_lists(&self, lists: &[PackingList]) -> RepoResult<()> {
        self.writes.set(self.writes.get() + lists.len());
        self.inner.save_lists(lists)
    }

    fn get_list(&self, id: ListId) -> RepoResult<Option<PackingList>> {
        self.inner.get_list(id)
    }

    fn list_summaries(&self) -> RepoResult<Vec<ListSummary>> {
        self.inner.list_summaries()
    }

    fn delete_list(&self, id: ListId) -> RepoResult<()> {
        self.inner.delete_list(id)
    }
}

fn item(id: &str, name: &str, accessories: Vec<Accessory>) -> Item {
    Item {
        id: id.to_string(),
        name: name.to_string(),
        category: "Audio".to_string(),
        accessories,
    }
}

fn mixer_kit(cable_quantity: u32) -> Kit {
    Kit {
        id: "kit-mixer".to_string(),
        name: "Mixer Kit".to_string(),
        items: vec![
            KitMember {
                item_id: "mic-a".to_string(),
                quantity: 1,
            },
            KitMember {
                item_id: "cable-b".to_string(),
                quantity: cable_quantity,
            },
        ],
        reminders: Vec::new(),
    }
}

fn seed_catalog(repo: &SqliteCatalogRepository<'_>) {
    repo.upsert_item(&item("mic-a", "MicA", Vec::new())).unwrap();
    repo.upsert_item(&item("cable-b", "CableB", Vec::new()))
        .unwrap();
    repo.upsert_item(&item(
        "desk",
        "Desk",
        vec![Accessory {
            item_id: "psu".to_string(),
            quantity: 1,
            prep_note: "spare fuse".to_string(),
        }],
    ))
    .unwrap();
    repo.upsert_kit(&mixer_kit(2)).unwrap();
}

fn list_from_catalog(repo: &SqliteCatalogRepository<'_>) -> PackingList {
    let catalog = repo.load_catalog().unwrap();
    let mut list = PackingList::new("Gala", None, "");
    let mut zone = Zone::new("Main");
    let mut section = Section::new("Audio");
    for (kind, reference) in [(ComponentType::Kit, "kit-mixer"), (ComponentType::Item, "desk")] {
        let snapshot = catalog.snapshot(kind, reference).unwrap();
        section.components.push(Component::new(
            kind,
            reference,
            snapshot.name,
            snapshot.category,
            1,
            snapshot.contents,
        ));
    }
    zone.sections.push(section);
    list.zones.push(zone);
    list
}

#[test]
fn drifted_components_are_regenerated_and_written_once() {
    let conn = open_db_in_memory().unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    seed_catalog(&catalog_repo);
    let lists = CountingRepo {
        inner: SqlitePackingListRepository::try_new(&conn).unwrap(),
        writes: Cell::new(0),
    };
    let mut list = list_from_catalog(&catalog_repo);
    let kit_id = list.zones[0].sections[0].components[0].unique_id;
    list.find_component_mut(kit_id).unwrap().contents[0]
        .warehouse_state
        .in_distinta = true;
    lists.save_list(&list).unwrap();
    lists.writes.set(0);

    catalog_repo.upsert_kit(&mixer_kit(3)).unwrap();
    let service = CatalogSyncService::new(&lists, &catalog_repo);
    let summary = service.sync_all().unwrap();

    assert_eq!(summary.lists_checked, 1);
    assert_eq!(summary.lists_written, 1);
    assert_eq!(summary.components_changed, 1);
    assert_eq!(lists.writes.get(), 1);

    let stored = lists.get_list(list.id).unwrap().unwrap();
    let kit = stored.find_component(kit_id).unwrap();
    assert_eq!(kit.content("cable-b").unwrap().quantity, 3);
    assert!(kit.content("mic-a").unwrap().warehouse_state.in_distinta);

    let second = service.sync_all().unwrap();
    assert_eq!(second.lists_written, 0);
    assert_eq!(second.components_changed, 0);
    assert_eq!(lists.writes.get(), 1);
}

#[test]
fn accessory_prep_note_change_counts_as_drift() {
    let conn = open_db_in_memory().unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    seed_catalog(&catalog_repo);
    let mut list = list_from_catalog(&catalog_repo);

    catalog_repo
        .upsert_item(&item(
            "desk",
            "Desk",
            vec![Accessory {
                item_id: "psu".to_string(),
                quantity: 1,
                prep_note: "two spare fuses".to_string(),
            }],
        ))
        .unwrap();
    let report = reconcile_list(&mut list, &catalog_repo.load_catalog().unwrap());

    assert_eq!(report.changed.len(), 1);
    let desk = &list.zones[0].sections[0].components[1];
    assert_eq!(desk.contents[0].prep_note, "two spare fuses");
}

#[test]
fn renamed_catalog_entity_updates_component_name() {
    let conn = open_db_in_memory().unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    seed_catalog(&catalog_repo);
    let mut list = list_from_catalog(&catalog_repo);

    let mut renamed = mixer_kit(2);
    renamed.name = "Mixer Kit XL".to_string();
    catalog_repo.upsert_kit(&renamed).unwrap();
    let report = reconcile_list(&mut list, &catalog_repo.load_catalog().unwrap());

    assert_eq!(report.changed.len(), 1);
    assert_eq!(list.zones[0].sections[0].components[0].name, "Mixer Kit XL");
}

#[test]
fn frozen_lists_are_never_rewritten() {
    let conn = open_db_in_memory().unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    seed_catalog(&catalog_repo);
    let lists = CountingRepo {
        inner: SqlitePackingListRepository::try_new(&conn).unwrap(),
        writes: Cell::new(0),
    };
    let mut list = list_from_catalog(&catalog_repo);
    freeze_list(&mut list, 10);
    lists.save_list(&list).unwrap();
    lists.writes.set(0);

    catalog_repo.upsert_kit(&mixer_kit(5)).unwrap();
    let summary = CatalogSyncService::new(&lists, &catalog_repo)
        .sync_all()
        .unwrap();

    assert_eq!(summary.components_changed, 0);
    assert_eq!(lists.writes.get(), 0);
    assert_eq!(lists.get_list(list.id).unwrap().unwrap(), list);
}

#[test]
fn missing_references_are_reported_but_kept() {
    let conn = open_db_in_memory().unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    seed_catalog(&catalog_repo);
    let mut list = list_from_catalog(&catalog_repo);
    let desk_id = list.zones[0].sections[0].components[1].unique_id;

    catalog_repo.remove_item("desk").unwrap();
    let catalog = catalog_repo.load_catalog().unwrap();
    let report = reconcile_list(&mut list, &catalog);

    assert_eq!(report.missing, vec![desk_id]);
    assert!(report.changed.is_empty());
    assert!(list.find_component(desk_id).is_some());
    assert_eq!(missing_components(&list, &catalog), vec![desk_id]);
}

#[test]
fn kit_contents_snapshot_reorders_without_drift() {
    let conn = open_db_in_memory().unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    seed_catalog(&catalog_repo);
    let mut list = list_from_catalog(&catalog_repo);
    list.zones[0].sections[0].components[0].contents.reverse();
    list.zones[0].sections[0].components[0].contents[0] =
        ContentEntry::new("cable-b", "Old cable label", 2, "", "");

    let report = reconcile_list(&mut list, &catalog_repo.load_catalog().unwrap());
    assert!(report.changed.is_empty());
}

#[test]
fn missing_reference_does_not_block_fulfillment_actions() {
    let conn = open_db_in_memory().unwrap();
    let catalog_repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    seed_catalog(&catalog_repo);
    let lists = SqlitePackingListRepository::try_new(&conn).unwrap();
    let mut list = list_from_catalog(&catalog_repo);
    lists.save_list(&list).unwrap();
    let zone_id = list.zones[0].id;
    let desk_id = list.zones[0].sections[0].components[1].unique_id;

    catalog_repo.remove_item("desk").unwrap();
    let catalog = catalog_repo.load_catalog().unwrap();
    assert_eq!(missing_components(&list, &catalog), vec![desk_id]);

    let service = WarehouseService::new(&lists);
    service
        .set_leaf_state(
            &mut list,
            &LeafRef::Content {
                component: desk_id,
                item_id: "psu".to_string(),
            },
            &WarehousePatch::flag(FulfillmentFlag::Loaded, true),
        )
        .unwrap();
    let progress = service
        .toggle_aggregated(
            &mut list,
            zone_id,
            &AggregateTarget::Complex(GroupKey::Machine("Desk".to_string())),
            FulfillmentFlag::InDistinta,
        )
        .unwrap();
    assert_eq!(progress, Some(FulfillmentProgress::Complete { total: 1 }));

    let stored = lists.get_list(list.id).unwrap().unwrap();
    let desk = stored.find_component(desk_id).unwrap();
    assert!(desk.warehouse_state.in_distinta);
    assert!(desk.contents[0].warehouse_state.loaded);
    assert_eq!(missing_components(&stored, &catalog), vec![desk_id]);
}
