//! File-backed durable store.
//!
//! The whole store is one JSON document holding every record keyed by
//! entity and id, stamped with the model name and version it was created
//! with. Commits write a sibling temp file and rename it over the store.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{PersistenceError, SchemaDescriptor};

/// One pending mutation handed to [`StoreCoordinator::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    Upsert { entity: String, id: String, value: Value },
    Delete { entity: String, id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreDocument {
    model: String,
    version: u32,
    #[serde(default)]
    entities: BTreeMap<String, BTreeMap<String, Value>>,
    saved_at: Option<DateTime<Utc>>,
}

impl StoreDocument {
    fn empty(schema: &SchemaDescriptor) -> Self {
        Self {
            model: schema.name.clone(),
            version: schema.version,
            entities: BTreeMap::new(),
            saved_at: None,
        }
    }

    fn apply(&mut self, change: &Change) {
        match change {
            Change::Upsert { entity, id, value } => {
                self.entities
                    .entry(entity.clone())
                    .or_default()
                    .insert(id.clone(), value.clone());
            }
            Change::Delete { entity, id } => {
                if let Some(records) = self.entities.get_mut(entity) {
                    records.remove(id);
                    if records.is_empty() {
                        self.entities.remove(entity);
                    }
                }
            }
        }
    }
}

/// Single writer for the durable store file.
pub struct StoreCoordinator {
    schema: Arc<SchemaDescriptor>,
    path: PathBuf,
    document: Mutex<StoreDocument>,
}

impl StoreCoordinator {
    /// Open the store at `path`, creating it if absent.
    pub fn open(schema: Arc<SchemaDescriptor>, path: PathBuf) -> Result<Self, PersistenceError> {
        let io_error = |source| PersistenceError::StoreIo {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let document = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(io_error)?;
            let document: StoreDocument = serde_json::from_str(&contents)
                .map_err(|e| PersistenceError::StoreCorrupt(e.to_string()))?;
            if document.model != schema.name || document.version != schema.version {
                return Err(PersistenceError::IncompatibleSchema {
                    found_model: document.model,
                    found_version: document.version,
                    expected_model: schema.name.clone(),
                    expected_version: schema.version,
                });
            }
            debug!(path = %path.display(), "Opened existing durable store");
            document
        } else {
            let document = StoreDocument::empty(&schema);
            write_document(&path, &document).map_err(io_error)?;
            info!(path = %path.display(), model = %schema.name, version = schema.version, "Created durable store");
            document
        };

        Ok(Self {
            schema,
            path,
            document: Mutex::new(document),
        })
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fetch(&self, entity: &str, id: &str) -> Option<Value> {
        self.document
            .lock()
            .entities
            .get(entity)
            .and_then(|records| records.get(id))
            .cloned()
    }

    pub fn count(&self, entity: &str) -> usize {
        self.document
            .lock()
            .entities
            .get(entity)
            .map(|records| records.len())
            .unwrap_or(0)
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.document.lock().saved_at
    }

    /// Apply `changes` and persist them. Memory is untouched on failure.
    pub fn apply(&self, changes: &[Change]) -> Result<usize, PersistenceError> {
        let mut document = self.document.lock();
        let mut next = document.clone();
        for change in changes {
            next.apply(change);
        }
        next.saved_at = Some(Utc::now());

        write_document(&self.path, &next)
            .map_err(|e| PersistenceError::Commit(format!("{}: {}", self.path.display(), e)))?;
        *document = next;
        Ok(changes.len())
    }
}

fn write_document(path: &Path, document: &StoreDocument) -> std::io::Result<()> {
    let contents = serde_json::to_vec_pretty(document)?;
    let tmp = temp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(&contents)?;
    // Contents must be on disk before the rename makes them the store.
    file.sync_all()?;
    drop(file);
    std::fs::rename(&tmp, path)
}

pub(crate) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(version: u32) -> Arc<SchemaDescriptor> {
        Arc::new(SchemaDescriptor {
            name: "Healthcare".into(),
            version,
            entities: vec![],
        })
    }

    #[test]
    fn test_open_creates_store_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("Healthcare.store");
        let store = StoreCoordinator::open(schema(1), path.clone()).expect("store should open");
        assert_eq!(store.path(), path.as_path());
        assert!(path.exists());
        assert!(!temp_path(&path).exists());
        assert_eq!(store.count("Routine"), 0);
        assert!(store.last_saved_at().is_none());
    }

    #[test]
    fn test_apply_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Healthcare.store");
        let store = StoreCoordinator::open(schema(1), path.clone()).expect("store should open");
        let applied = store
            .apply(&[
                Change::Upsert { entity: "Routine".into(), id: "r1".into(), value: json!({"title": "Knee"}) },
                Change::Upsert { entity: "Routine".into(), id: "r2".into(), value: json!({"title": "Hip"}) },
                Change::Delete { entity: "Routine".into(), id: "r2".into() },
            ])
            .expect("apply should succeed");
        assert_eq!(applied, 3);
        assert!(!temp_path(&path).exists());
        let on_disk: Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read store")).expect("store is JSON");
        assert_eq!(on_disk["entities"]["Routine"]["r1"]["title"], "Knee");
        drop(store);

        let reopened = StoreCoordinator::open(schema(1), path).expect("store should reopen");
        assert_eq!(reopened.fetch("Routine", "r1"), Some(json!({"title": "Knee"})));
        assert_eq!(reopened.fetch("Routine", "r2"), None);
        assert!(reopened.last_saved_at().is_some());
    }

    #[test]
    fn test_corrupt_store_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Healthcare.store");
        std::fs::write(&path, "{ not a store").expect("write");
        assert!(matches!(
            StoreCoordinator::open(schema(1), path),
            Err(PersistenceError::StoreCorrupt(_))
        ));
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Healthcare.store");
        StoreCoordinator::open(schema(1), path.clone()).expect("store should open");
        let err = StoreCoordinator::open(schema(2), path).err();
        assert!(matches!(
            err,
            Some(PersistenceError::IncompatibleSchema { found_version: 1, expected_version: 2, .. })
        ));
    }

    #[test]
    fn test_failed_commit_leaves_memory_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Healthcare.store");
        let store = StoreCoordinator::open(schema(1), path.clone()).expect("store should open");
        std::fs::create_dir(temp_path(&path)).expect("block temp path");

        let err = store
            .apply(&[Change::Upsert { entity: "Routine".into(), id: "r1".into(), value: json!(1) }])
            .expect_err("commit must fail");
        assert!(matches!(err, PersistenceError::Commit(_)));
        assert_eq!(store.fetch("Routine", "r1"), None);
    }
}
