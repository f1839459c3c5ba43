//! Packing list versioning and warehouse reconciliation engine.
//! This crate is the single source of truth for list invariants.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use aggregate::{
    aggregate_zone, list_manifest, zone_manifest, AggregateTarget, ChildEntry, ComplexEntry,
    CrossRefWarning, FlagTotals, FulfillmentFlag, FulfillmentProgress, GroupKey, SimpleEntry,
    Tally, WarningPart, ZoneAggregation,
};
pub use config::CoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LogLevel};
pub use model::catalog::{Accessory, Catalog, CatalogSnapshot, Item, Kit, KitMember, KIT_CATEGORY};
pub use model::packing_list::{
    CatalogId, ChangeLog, Component, ComponentId, ComponentType, ContentEntry, DeletedItemRecord,
    ListId, ListVersion, PackingList, Section, SectionId, ValidationError, WarehouseState, Zone,
    ZoneId,
};
pub use repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
pub use repo::list_repo::{
    ListSummary, PackingListRepository, RepoError, RepoResult, SqlitePackingListRepository,
};
pub use service::catalog_sync::{
    is_missing, missing_components, reconcile_list, CatalogSyncService, ReconcileReport,
    SyncSummary,
};
pub use service::edit_session::{EditSession, PasteOutcome};
pub use service::structure_service::{
    AddMode, ComponentPatch, DropPosition, StructureError, StructureResult, StructureService,
};
pub use service::version_service::{freeze_list, FreezeReport, VersionService};
pub use service::warehouse_service::{
    batch_set_state, component_leaves, is_unresolved, leaf_state, resolve_broken, set_leaf_state,
    LeafRef, WarehouseError, WarehousePatch, WarehouseService,
};
pub use service::{now_epoch_ms, Confirmation, StructureOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
