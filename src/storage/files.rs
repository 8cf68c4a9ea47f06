//! Directory-backed file store
//!
//! Layout under the root:
//!
//! ```text
//! <root>/<owner kind>s/<owner id>/body.json
//! <root>/<owner kind>s/<owner id>/resources/<uuid>.<ext>
//! ```
//!
//! Image paths handed to documents are relative to the root, so a notebook
//! directory can be moved without rewriting saved bodies.

use crate::document::Document;
use crate::error::{LabbookError, Result};
use crate::storage::{DeleteOutcome, FileStore};
use crate::types::Owner;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

const BODY_FILE: &str = "body.json";
const RESOURCES_DIR: &str = "resources";

/// Persisted form of an entry: the description and body documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    #[serde(default)]
    pub description: Document,
    #[serde(default)]
    pub body: Document,
}

impl StoredEntry {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// File store rooted at one directory
#[derive(Debug, Clone)]
pub struct DirectoryFileStore {
    root: PathBuf,
}

impl DirectoryFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owner_dir(owner: &Owner) -> PathBuf {
        PathBuf::from(format!("{}s", owner.kind)).join(owner.id.to_string())
    }

    fn body_path(&self, owner: &Owner) -> PathBuf {
        self.root.join(Self::owner_dir(owner)).join(BODY_FILE)
    }

    /// Absolute location of a root-relative path; refuses to leave the root
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(LabbookError::InvalidOperation(format!(
                "path '{}' is outside the file store",
                path
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl FileStore for DirectoryFileStore {
    fn write_body(&self, owner: &Owner, bytes: &[u8]) -> Result<()> {
        let path = self.body_path(owner);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write then rename so a crash never leaves a truncated body
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path)?;

        debug!("Wrote {} bytes of body for {}", bytes.len(), owner);
        Ok(())
    }

    fn read_body(&self, owner: &Owner) -> Result<Option<Vec<u8>>> {
        match fs::read(self.body_path(owner)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_body(&self, owner: &Owner) -> Result<DeleteOutcome> {
        remove(&self.body_path(owner))
    }

    fn write_image(&self, owner: &Owner, bytes: &[u8], extension: &str) -> Result<String> {
        let relative = Self::owner_dir(owner)
            .join(RESOURCES_DIR)
            .join(format!("{}.{}", Uuid::new_v4(), extension.trim_start_matches('.')));
        let path = self.root.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;

        let relative = relative.to_string_lossy().replace('\\', "/");
        debug!("Stored image {} for {}", relative, owner);
        Ok(relative)
    }

    fn delete(&self, path: &str) -> Result<DeleteOutcome> {
        remove(&self.resolve(path)?)
    }
}

fn remove(path: &Path) -> Result<DeleteOutcome> {
    match fs::remove_file(path) {
        Ok(()) => Ok(DeleteOutcome::Deleted),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome::NotFound),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Run;
    use crate::types::{Anchor, EntityKind};
    use tempfile::TempDir;

    #[test]
    fn test_body_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let files = DirectoryFileStore::new(temp_dir.path());
        let owner = Owner::protocol(Uuid::new_v4());

        assert_eq!(files.read_body(&owner).unwrap(), None);

        let entry = StoredEntry {
            description: Document::from_text("Buffer prep"),
            body: Document::from_runs([
                Run::plain("Adjust "),
                Run::anchored("pH", Anchor::new(EntityKind::Tag, "pH")),
            ]),
        };
        files.write_body(&owner, &entry.to_bytes().unwrap()).unwrap();

        let bytes = files.read_body(&owner).unwrap().unwrap();
        assert_eq!(StoredEntry::from_bytes(&bytes).unwrap(), entry);

        assert_eq!(files.remove_body(&owner).unwrap(), DeleteOutcome::Deleted);
        assert_eq!(files.read_body(&owner).unwrap(), None);
    }

    #[test]
    fn test_image_write_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let files = DirectoryFileStore::new(temp_dir.path());
        let owner = Owner::experiment(Uuid::new_v4());

        let path = files.write_image(&owner, b"\x89PNG", ".png").unwrap();
        assert!(path.starts_with("experiments/"));
        assert!(path.ends_with(".png"));
        assert!(temp_dir.path().join(&path).exists());

        assert_eq!(files.delete(&path).unwrap(), DeleteOutcome::Deleted);
        assert_eq!(files.delete(&path).unwrap(), DeleteOutcome::NotFound);
    }

    #[test]
    fn test_delete_refuses_paths_outside_root() {
        let temp_dir = TempDir::new().unwrap();
        let files = DirectoryFileStore::new(temp_dir.path());
        assert!(files.delete("../elsewhere.png").is_err());
        assert!(files.delete("/etc/passwd").is_err());
    }
}
