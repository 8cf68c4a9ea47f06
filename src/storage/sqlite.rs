//! SQLite link store
//!
//! Provides persistent storage of entity rows and owner-to-entity join rows
//! using rusqlite. Join tables reference their entity table with immediate
//! foreign keys, so deleting a tag that is still linked is refused by the
//! database itself.

use crate::error::{StoreError, StoreResult};
use crate::storage::LinkStore;
use crate::types::{Candidate, EntityKind, Owner};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

/// Embedded schema, applied on every open
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    name TEXT PRIMARY KEY NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bib_references (
    id TEXT PRIMARY KEY NOT NULL,
    cite_key TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS datasets (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS protocols (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tag_links (
    owner_kind TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    target TEXT NOT NULL REFERENCES tags(name),
    PRIMARY KEY (owner_kind, owner_id, target)
);

CREATE TABLE IF NOT EXISTS reference_links (
    owner_kind TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    target TEXT NOT NULL REFERENCES bib_references(id),
    PRIMARY KEY (owner_kind, owner_id, target)
);

CREATE TABLE IF NOT EXISTS dataset_links (
    owner_kind TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    target TEXT NOT NULL REFERENCES datasets(id),
    PRIMARY KEY (owner_kind, owner_id, target)
);

CREATE TABLE IF NOT EXISTS protocol_links (
    owner_kind TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    target TEXT NOT NULL REFERENCES protocols(id),
    PRIMARY KEY (owner_kind, owner_id, target)
);

CREATE INDEX IF NOT EXISTS idx_tag_links_target ON tag_links(target);
"#;

/// Join table holding links of `kind`
fn link_table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Tag => "tag_links",
        EntityKind::Reference => "reference_links",
        EntityKind::Dataset => "dataset_links",
        EntityKind::Protocol => "protocol_links",
    }
}

/// SQLite-backed link store
pub struct SqliteLinkStore {
    conn: Connection,
    in_transaction: bool,
}

impl SqliteLinkStore {
    /// Open (creating if missing) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        info!("Opening link store at {}", path.display());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Other(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Self::initialize(Connection::open(path)?)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        debug!("Link store schema ready");
        Ok(Self {
            conn,
            in_transaction: false,
        })
    }

    /// Register a bibliographic reference (normally done by its CRUD screen)
    pub fn create_reference(&self, id: Uuid, cite_key: &str, title: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO bib_references (id, cite_key, title, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id.to_string(), cite_key, title, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Register a dataset
    pub fn create_dataset(&self, id: Uuid, name: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO datasets (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![id.to_string(), name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Register a protocol
    pub fn create_protocol(&self, id: Uuid, name: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO protocols (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![id.to_string(), name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn tag_exists(&self, name: &str) -> StoreResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM tags WHERE name = ?1", params![name], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Candidate list for `kind`, for refreshing editors after a save
    pub fn load_candidates(&self, kind: EntityKind) -> StoreResult<Vec<Candidate>> {
        let sql = match kind {
            EntityKind::Tag => "SELECT name, name, name FROM tags ORDER BY name",
            EntityKind::Reference => {
                "SELECT cite_key, title, id FROM bib_references ORDER BY cite_key"
            }
            EntityKind::Dataset => "SELECT name, name, id FROM datasets ORDER BY name",
            EntityKind::Protocol => "SELECT name, name, id FROM protocols ORDER BY name",
        };

        let mut stmt = self.conn.prepare(sql)?;
        let candidates = stmt
            .query_map([], |row| {
                Ok(Candidate {
                    key: row.get(0)?,
                    display_name: row.get(1)?,
                    identifier: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(candidates)
    }
}

impl LinkStore for SqliteLinkStore {
    fn begin(&mut self) -> StoreResult<()> {
        if self.in_transaction {
            return Err(StoreError::Other("transaction already open".to_string()));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            return Err(StoreError::Other("no open transaction".to_string()));
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn upsert_tag(&mut self, name: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO tags (name, created_at) VALUES (?1, ?2) ON CONFLICT(name) DO NOTHING",
            params![name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete_tag(&mut self, name: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM tags WHERE name = ?1", params![name])?;
        Ok(())
    }

    fn insert_link(
        &mut self,
        owner: &Owner,
        kind: EntityKind,
        identifier: &str,
    ) -> StoreResult<()> {
        let sql = format!(
            "INSERT INTO {} (owner_kind, owner_id, target) VALUES (?1, ?2, ?3)",
            link_table(kind)
        );
        self.conn.execute(
            &sql,
            params![owner.kind.as_str(), owner.id.to_string(), identifier],
        )?;
        Ok(())
    }

    fn delete_link(
        &mut self,
        owner: &Owner,
        kind: EntityKind,
        identifier: &str,
    ) -> StoreResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE owner_kind = ?1 AND owner_id = ?2 AND target = ?3",
            link_table(kind)
        );
        self.conn.execute(
            &sql,
            params![owner.kind.as_str(), owner.id.to_string(), identifier],
        )?;
        Ok(())
    }

    fn select_links(&self, owner: &Owner, kind: EntityKind) -> StoreResult<BTreeSet<String>> {
        let sql = format!(
            "SELECT target FROM {} WHERE owner_kind = ?1 AND owner_id = ?2",
            link_table(kind)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let links = stmt
            .query_map(params![owner.kind.as_str(), owner.id.to_string()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_lifecycle() {
        let mut store = SqliteLinkStore::open_in_memory().unwrap();
        let owner = Owner::protocol(Uuid::new_v4());
        let reference = Uuid::new_v4();
        store
            .create_reference(reference, "smith2020", "Smith et al. (2020)")
            .unwrap();

        store
            .insert_link(&owner, EntityKind::Reference, &reference.to_string())
            .unwrap();
        let links = store.select_links(&owner, EntityKind::Reference).unwrap();
        assert_eq!(links.len(), 1);
        assert!(links.contains(&reference.to_string()));

        store
            .delete_link(&owner, EntityKind::Reference, &reference.to_string())
            .unwrap();
        assert!(store
            .select_links(&owner, EntityKind::Reference)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_linked_tag_delete_is_integrity_violation() {
        let mut store = SqliteLinkStore::open_in_memory().unwrap();
        let owner = Owner::experiment(Uuid::new_v4());
        store.upsert_tag("pH").unwrap();
        store.upsert_tag("pH").unwrap();
        store.insert_link(&owner, EntityKind::Tag, "pH").unwrap();

        let err = store.delete_tag("pH").unwrap_err();
        assert!(err.is_integrity_violation());
        assert!(store.tag_exists("pH").unwrap());

        store.delete_link(&owner, EntityKind::Tag, "pH").unwrap();
        store.delete_tag("pH").unwrap();
        assert!(!store.tag_exists("pH").unwrap());
    }

    #[test]
    fn test_link_to_unknown_entity_is_refused() {
        let mut store = SqliteLinkStore::open_in_memory().unwrap();
        let owner = Owner::protocol(Uuid::new_v4());
        let err = store
            .insert_link(&owner, EntityKind::Dataset, "missing")
            .unwrap_err();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_rollback_discards_writes() {
        let mut store = SqliteLinkStore::open_in_memory().unwrap();
        store.begin().unwrap();
        store.upsert_tag("buffer").unwrap();
        store.rollback().unwrap();
        assert!(!store.tag_exists("buffer").unwrap());

        assert!(store.commit().is_err());
    }

    #[test]
    fn test_load_candidates() {
        let store = SqliteLinkStore::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        store.create_dataset(id, "Plate reader run 3").unwrap();

        let candidates = store.load_candidates(EntityKind::Dataset).unwrap();
        assert_eq!(
            candidates,
            vec![Candidate::new(
                "Plate reader run 3",
                "Plate reader run 3",
                id.to_string()
            )]
        );
    }
}
