//! Storage layer for the Labbook editing core
//!
//! Two narrow contracts: a transactional relational store holding the
//! owner-to-entity join rows, and a file store holding entry bodies and
//! embedded images. The reconciliation engine only ever talks to these
//! traits.

pub mod files;
pub mod sqlite;

pub use files::{DirectoryFileStore, StoredEntry};
pub use sqlite::SqliteLinkStore;

use crate::error::{Result, StoreResult};
use crate::types::{EntityKind, Owner};
use std::collections::BTreeSet;

/// Transactional store of link rows
///
/// Errors are classified so that a referential-integrity refusal can be
/// told apart from any other failure.
#[cfg_attr(test, mockall::automock)]
pub trait LinkStore {
    /// Begin a transaction
    fn begin(&mut self) -> StoreResult<()>;

    /// Commit the open transaction
    fn commit(&mut self) -> StoreResult<()>;

    /// Roll back the open transaction
    fn rollback(&mut self) -> StoreResult<()>;

    /// Create the tag row if it does not exist
    fn upsert_tag(&mut self, name: &str) -> StoreResult<()>;

    /// Delete the tag row; refused with an integrity violation while any
    /// owner still links it
    fn delete_tag(&mut self, name: &str) -> StoreResult<()>;

    /// Insert the owner-to-entity join row
    fn insert_link(&mut self, owner: &Owner, kind: EntityKind, identifier: &str)
        -> StoreResult<()>;

    /// Delete the owner-to-entity join row
    fn delete_link(&mut self, owner: &Owner, kind: EntityKind, identifier: &str)
        -> StoreResult<()>;

    /// Identifiers currently linked from `owner` for `kind`
    fn select_links(&self, owner: &Owner, kind: EntityKind) -> StoreResult<BTreeSet<String>>;
}

/// Whether a delete found something to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Owner-scoped blob storage for entry bodies and images
#[cfg_attr(test, mockall::automock)]
pub trait FileStore {
    /// Replace the body blob of `owner`
    fn write_body(&self, owner: &Owner, bytes: &[u8]) -> Result<()>;

    /// Read the body blob of `owner`; None if it was never written
    fn read_body(&self, owner: &Owner) -> Result<Option<Vec<u8>>>;

    /// Remove the body blob of `owner`
    fn remove_body(&self, owner: &Owner) -> Result<DeleteOutcome>;

    /// Store an image in the resource directory of `owner`, returning the
    /// path image runs refer to it by
    fn write_image(&self, owner: &Owner, bytes: &[u8], extension: &str) -> Result<String>;

    /// Delete a file by the path [`FileStore::write_image`] returned
    fn delete(&self, path: &str) -> Result<DeleteOutcome>;
}
