//! Catalog mirror repository.
//!
//! # Responsibility
//! - Load the read-only catalog state consumed by reconciliation and adds.
//! - Refresh mirrored items/kits from the external catalog.
//!
//! # Invariants
//! - Mirror rows store the full entity document; `name` is a query column only.

use crate::model::catalog::{Catalog, Item, Kit};
use crate::repo::ensure_connection_ready;
use crate::repo::list_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;

/// Repository interface for the catalog mirror.
pub trait CatalogRepository {
    fn load_catalog(&self) -> RepoResult<Catalog>;
    fn upsert_item(&self, item: &Item) -> RepoResult<()>;
    fn upsert_kit(&self, kit: &Kit) -> RepoResult<()>;
    fn remove_item(&self, id: &str) -> RepoResult<()>;
    fn remove_kit(&self, id: &str) -> RepoResult<()>;
}

impl<R: CatalogRepository + ?Sized> CatalogRepository for &R {
    fn load_catalog(&self) -> RepoResult<Catalog> {
        (**self).load_catalog()
    }

    fn upsert_item(&self, item: &Item) -> RepoResult<()> {
        (**self).upsert_item(item)
    }

    fn upsert_kit(&self, kit: &Kit) -> RepoResult<()> {
        (**self).upsert_kit(kit)
    }

    fn remove_item(&self, id: &str) -> RepoResult<()> {
        (**self).remove_item(id)
    }

    fn remove_kit(&self, id: &str) -> RepoResult<()> {
        (**self).remove_kit(id)
    }
}

/// SQLite-backed catalog mirror.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "catalog_items")?;
        ensure_connection_ready(conn, "catalog_kits")?;
        Ok(Self { conn })
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn load_catalog(&self) -> RepoResult<Catalog> {
        let items: Vec<Item> = load_documents(self.conn, "catalog_items")?;
        let kits: Vec<Kit> = load_documents(self.conn, "catalog_kits")?;
        Ok(Catalog::from_parts(items, kits))
    }

    fn upsert_item(&self, item: &Item) -> RepoResult<()> {
        let document = to_document(&item.id, item)?;
        self.conn.execute(
            "INSERT INTO catalog_items (id, name, document)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                document = excluded.document,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![item.id.as_str(), item.name.as_str(), document],
        )?;
        Ok(())
    }

    fn upsert_kit(&self, kit: &Kit) -> RepoResult<()> {
        let document = to_document(&kit.id, kit)?;
        self.conn.execute(
            "INSERT INTO catalog_kits (id, name, document)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                document = excluded.document,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![kit.id.as_str(), kit.name.as_str(), document],
        )?;
        Ok(())
    }

    fn remove_item(&self, id: &str) -> RepoResult<()> {
        delete_row(self.conn, "DELETE FROM catalog_items WHERE id = ?1;", id)
    }

    fn remove_kit(&self, id: &str) -> RepoResult<()> {
        delete_row(self.conn, "DELETE FROM catalog_kits WHERE id = ?1;", id)
    }
}

fn to_document<T: serde::Serialize>(id: &str, value: &T) -> RepoResult<String> {
    serde_json::to_string(value).map_err(|err| {
        RepoError::InvalidData(format!("catalog entry `{id}` not serializable: {err}"))
    })
}

fn load_documents<T: DeserializeOwned>(conn: &Connection, table: &str) -> RepoResult<Vec<T>> {
    let mut stmt = conn.prepare(&format!("SELECT id, document FROM {table} ORDER BY id ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        let document: String = row.get(1)?;
        let value = serde_json::from_str(&document).map_err(|err| {
            RepoError::InvalidData(format!("invalid document for `{id}` in {table}: {err}"))
        })?;
        values.push(value);
    }
    Ok(values)
}

fn delete_row(conn: &Connection, sql: &str, id: &str) -> RepoResult<()> {
    let changed = conn.execute(sql, [id])?;
    if changed == 0 {
        return Err(RepoError::CatalogEntryNotFound(id.to_string()));
    }
    Ok(())
}
