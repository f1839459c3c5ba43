//! Operator CLI over `packlist_core`.
//!
//! # Responsibility
//! - Provide quick local inspection of stored packing lists.
//! - Trigger catalog sync and freezes without a UI.
//!
//! Configuration comes from `PACKLIST_DB_PATH`, `PACKLIST_LOG_LEVEL` and
//! `PACKLIST_LOG_DIR`.

use clap::{Parser, Subcommand};
use log::info;
use packlist_core::db::open_db;
use packlist_core::{
    aggregate_zone, init_logging, is_unresolved, list_manifest, missing_components, Catalog,
    CatalogRepository, CatalogSyncService, CoreConfig, CrossRefWarning, PackingList,
    PackingListRepository, SqliteCatalogRepository, SqlitePackingListRepository, VersionService,
};
use rusqlite::Connection;
use std::collections::HashSet;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "packlist")]
#[command(about = "Inspect and maintain stored packing lists", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print core health and version without touching the store
    Ping,
    /// List stored packing lists, most recently updated first
    Lists,
    /// Print the aggregated view of one list
    Show { list_id: Uuid },
    /// Freeze a list into its next version
    Freeze { list_id: Uuid },
    /// Reconcile every draft list against the catalog mirror
    Sync,
    /// Print flat name/quantity totals of one list
    Manifest { list_id: Uuid },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Lists => "lists",
            Self::Show { .. } => "show",
            Self::Freeze { .. } => "freeze",
            Self::Sync => "sync",
            Self::Manifest { .. } => "manifest",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), String> {
    if command == Command::Ping {
        println!("packlist_core ping={}", packlist_core::ping());
        println!("packlist_core version={}", packlist_core::core_version());
        return Ok(());
    }

    let config = CoreConfig::from_env()?;
    let log_dir = config
        .log_dir
        .to_str()
        .ok_or("log directory must be valid UTF-8")?;
    init_logging(config.log_level.as_str(), log_dir)?;
    let conn = open_db(&config.db_path).map_err(|err| format!("db open failed: {err}"))?;
    info!(
        "event=cli_command module=cli status=start command={}",
        command.name()
    );

    match command {
        Command::Ping => Ok(()),
        Command::Lists => print_lists(&conn),
        Command::Sync => sync(&conn),
        Command::Show { list_id } => show(&load_list(&conn, list_id)?, &load_catalog(&conn)?),
        Command::Freeze { list_id } => freeze(&conn, load_list(&conn, list_id)?),
        Command::Manifest { list_id } => manifest(&load_list(&conn, list_id)?),
    }
}

fn list_repo(conn: &Connection) -> Result<SqlitePackingListRepository<'_>, String> {
    SqlitePackingListRepository::try_new(conn).map_err(|err| format!("repo init failed: {err}"))
}

fn catalog_repo(conn: &Connection) -> Result<SqliteCatalogRepository<'_>, String> {
    SqliteCatalogRepository::try_new(conn).map_err(|err| format!("repo init failed: {err}"))
}

fn load_list(conn: &Connection, id: Uuid) -> Result<PackingList, String> {
    list_repo(conn)?
        .get_list(id)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| format!("packing list not found: {id}"))
}

fn load_catalog(conn: &Connection) -> Result<Catalog, String> {
    catalog_repo(conn)?
        .load_catalog()
        .map_err(|err| err.to_string())
}

fn print_lists(conn: &Connection) -> Result<(), String> {
    for summary in list_repo(conn)?
        .list_summaries()
        .map_err(|err| err.to_string())?
    {
        let version = summary
            .version
            .map_or_else(|| "draft".to_string(), |version| version.to_string());
        println!(
            "{}\t{}\t{}\t{}",
            summary.id,
            version,
            summary.event_date.as_deref().unwrap_or("-"),
            summary.event_name
        );
    }
    Ok(())
}

fn show(list: &PackingList, catalog: &Catalog) -> Result<(), String> {
    let version = list
        .version
        .map_or_else(|| "draft".to_string(), |version| version.to_string());
    println!("{} [{}] {}", list.event_name, version, list.location);
    let missing: HashSet<Uuid> = missing_components(list, catalog).into_iter().collect();
    for zone in &list.zones {
        println!("zone {}", zone.name);
        let aggregation = aggregate_zone(zone);
        for entry in aggregation.complex.values() {
            println!(
                "  {} x{}{}",
                entry.key,
                entry.tally.total_qty,
                warning_suffix(entry.warning.as_ref())
            );
            for child in entry.children.values() {
                println!(
                    "    {} x{}{}",
                    child.name,
                    child.tally.total_qty,
                    warning_suffix(child.warning.as_ref())
                );
            }
        }
        for entry in aggregation.simple.values() {
            println!("  {} x{}", entry.name, entry.tally.total_qty);
        }
        for component in zone
            .components()
            .filter(|component| missing.contains(&component.unique_id))
        {
            println!(
                "  [missing] {} ({} {})",
                component.name,
                component.kind.as_str(),
                component.reference_id
            );
        }
        let unresolved = zone
            .components()
            .filter(|component| is_unresolved(component))
            .count();
        if unresolved > 0 {
            println!("  unresolved changes: {unresolved}");
        }
    }
    Ok(())
}

fn warning_suffix(warning: Option<&CrossRefWarning>) -> String {
    warning
        .map(|warning| format!("  ({warning})"))
        .unwrap_or_default()
}

fn freeze(conn: &Connection, mut list: PackingList) -> Result<(), String> {
    let report = VersionService::new(list_repo(conn)?)
        .freeze(&mut list)
        .map_err(|err| err.to_string())?;
    println!(
        "frozen {} as {} (changed={} introduced={} deleted={})",
        list.id,
        report.version,
        report.quantity_changed.len(),
        report.introduced.len(),
        report.deleted.len()
    );
    Ok(())
}

fn sync(conn: &Connection) -> Result<(), String> {
    let summary = CatalogSyncService::new(list_repo(conn)?, catalog_repo(conn)?)
        .sync_all()
        .map_err(|err| err.to_string())?;
    println!(
        "checked={} written={} changed={} missing={}",
        summary.lists_checked,
        summary.lists_written,
        summary.components_changed,
        summary.components_missing
    );
    Ok(())
}

fn manifest(list: &PackingList) -> Result<(), String> {
    for (name, quantity) in list_manifest(list) {
        println!("{quantity}\t{name}");
    }
    Ok(())
}
