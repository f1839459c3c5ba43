use packlist_core::db::open_db_in_memory;
use packlist_core::{
    freeze_list, Accessory, CatalogRepository, Component, ComponentType, ContentEntry, Item, Kit,
    KitMember, PackingList, PackingListRepository, RepoError, Section, SqliteCatalogRepository,
    SqlitePackingListRepository, ValidationError, Zone,
};
use uuid::Uuid;

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

fn sample_list(event_name: &str) -> PackingList {
    let mut list = PackingList::new(event_name, Some("2026-05-01".to_string()), "Fiera");
    let mut zone = Zone::new("Main");
    let mut section = Section::new("Audio");
    section.components.push(Component::new(
        ComponentType::Kit,
        "kit-mixer",
        "Mixer Kit",
        "Kit",
        2,
        vec![ContentEntry::new("mic-a", "MicA", 1, "Audio", "")],
    ));
    zone.sections.push(section);
    list.zones.push(zone);
    list
}

#[test]
fn saved_document_roundtrips_through_json_column() {
    let conn = setup();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let mut list = sample_list("Gala");
    freeze_list(&mut list, 1_000);

    repo.save_list(&list).unwrap();
    let loaded = repo.get_list(list.id).unwrap().expect("list should exist");
    assert_eq!(loaded, list);

    let document: String = conn
        .query_row(
            "SELECT document FROM packing_lists WHERE id = ?1;",
            [list.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&document).unwrap();
    assert_eq!(json["version"], "1.0");
    assert_eq!(json["zones"][0]["sections"][0]["components"][0]["type"], "kit");
}

#[test]
fn save_replaces_whole_document() {
    let conn = setup();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let mut list = sample_list("Gala");
    repo.save_list(&list).unwrap();

    list.event_name = "Gala 2026".to_string();
    list.zones[0].sections[0].components.clear();
    repo.save_list(&list).unwrap();

    let loaded = repo.get_list(list.id).unwrap().unwrap();
    assert_eq!(loaded.event_name, "Gala 2026");
    assert!(loaded.zones[0].sections[0].components.is_empty());
    assert_eq!(repo.list_summaries().unwrap().len(), 1);
}

#[test]
fn save_rejects_invalid_document() {
    let conn = setup();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let mut list = sample_list("Gala");
    list.zones[0].sections[0].components[0].quantity = 0;

    let err = repo.save_list(&list).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::ZeroQuantity(_))
    ));
    assert!(repo.get_list(list.id).unwrap().is_none());
}

#[test]
fn summaries_expose_version_without_decoding_documents() {
    let conn = setup();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let draft = sample_list("Draft");
    let mut frozen = sample_list("Frozen");
    freeze_list(&mut frozen, 5);
    repo.save_lists(&[draft.clone(), frozen.clone()]).unwrap();

    let summaries = repo.list_summaries().unwrap();
    assert_eq!(summaries.len(), 2);
    let draft_summary = summaries.iter().find(|s| s.id == draft.id).unwrap();
    let frozen_summary = summaries.iter().find(|s| s.id == frozen.id).unwrap();
    assert!(draft_summary.version.is_none());
    assert_eq!(frozen_summary.version.unwrap().to_string(), "1.0");
    assert_eq!(frozen_summary.event_date.as_deref(), Some("2026-05-01"));
    assert!(draft_summary.updated_at > 0);
}

#[test]
fn save_lists_is_all_or_nothing() {
    let conn = setup();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let valid = sample_list("Valid");
    let mut invalid = sample_list("Invalid");
    invalid.zones[0].name = "   ".to_string();

    let err = repo.save_lists(&[valid.clone(), invalid]).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::BlankName("zone"))
    ));
    assert!(repo.get_list(valid.id).unwrap().is_none());
}

#[test]
fn delete_list_reports_missing_rows() {
    let conn = setup();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let list = sample_list("Gala");
    repo.save_list(&list).unwrap();

    repo.delete_list(list.id).unwrap();
    assert!(repo.get_list(list.id).unwrap().is_none());

    let missing = Uuid::new_v4();
    let err = repo.delete_list(missing).unwrap_err();
    assert!(matches!(err, RepoError::ListNotFound(id) if id == missing));
}

#[test]
fn get_list_rejects_document_with_foreign_id() {
    let conn = setup();
    let repo = SqlitePackingListRepository::try_new(&conn).unwrap();
    let list = sample_list("Gala");
    let document = serde_json::to_string(&list).unwrap();
    let row_id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO packing_lists (id, event_name, document) VALUES (?1, ?2, ?3);",
        rusqlite::params![row_id.to_string(), "Gala", document],
    )
    .unwrap();

    let err = repo.get_list(row_id).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn catalog_mirror_upserts_and_removes_entries() {
    let conn = setup();
    let repo = SqliteCatalogRepository::try_new(&conn).unwrap();
    let item = Item {
        id: "desk".to_string(),
        name: "Desk".to_string(),
        category: "Audio".to_string(),
        accessories: vec![Accessory {
            item_id: "psu".to_string(),
            quantity: 1,
            prep_note: "spare fuse".to_string(),
        }],
    };
    let kit = Kit {
        id: "kit-mixer".to_string(),
        name: "Mixer Kit".to_string(),
        items: vec![KitMember {
            item_id: "desk".to_string(),
            quantity: 1,
        }],
        reminders: vec!["Bring gaffer tape".to_string()],
    };

    repo.upsert_item(&item).unwrap();
    repo.upsert_kit(&kit).unwrap();
    let renamed = Item {
        name: "Desk X32".to_string(),
        ..item.clone()
    };
    repo.upsert_item(&renamed).unwrap();

    let catalog = repo.load_catalog().unwrap();
    assert_eq!(catalog.item("desk"), Some(&renamed));
    assert_eq!(catalog.kit("kit-mixer"), Some(&kit));

    repo.remove_kit("kit-mixer").unwrap();
    assert!(repo.load_catalog().unwrap().kit("kit-mixer").is_none());
    let err = repo.remove_item("nope").unwrap_err();
    assert!(matches!(err, RepoError::CatalogEntryNotFound(id) if id == "nope"));
}
