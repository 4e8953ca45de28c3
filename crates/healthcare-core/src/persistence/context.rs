use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::store::{Change, StoreCoordinator};
use super::{ContextError, PersistenceError};

type RecordKey = (String, String);

/// Scratchpad of uncommitted changes bound to a store coordinator.
///
/// The pending map is also the writer lock: a commit holds it for the whole
/// write, so mutations issued meanwhile wait for the commit to finish.
pub struct WorkingContext {
    coordinator: Arc<StoreCoordinator>,
    pending: Mutex<BTreeMap<RecordKey, Option<Value>>>,
}

impl WorkingContext {
    pub fn new(coordinator: Arc<StoreCoordinator>) -> Self {
        Self {
            coordinator,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn coordinator(&self) -> &Arc<StoreCoordinator> {
        &self.coordinator
    }

    fn check_entity(&self, entity: &str) -> Result<(), ContextError> {
        let schema = self.coordinator.schema();
        if schema.has_entity(entity) {
            Ok(())
        } else {
            Err(ContextError::UnknownEntity {
                entity: entity.to_string(),
                model: schema.name.clone(),
            })
        }
    }

    pub fn upsert(&self, entity: &str, id: &str, value: Value) -> Result<(), ContextError> {
        self.check_entity(entity)?;
        self.pending
            .lock()
            .insert((entity.to_string(), id.to_string()), Some(value));
        Ok(())
    }

    pub fn delete(&self, entity: &str, id: &str) -> Result<(), ContextError> {
        self.check_entity(entity)?;
        self.pending
            .lock()
            .insert((entity.to_string(), id.to_string()), None);
        Ok(())
    }

    /// Read a record, seeing uncommitted changes first.
    pub fn fetch(&self, entity: &str, id: &str) -> Option<Value> {
        let key = (entity.to_string(), id.to_string());
        if let Some(pending) = self.pending.lock().get(&key) {
            return pending.clone();
        }
        self.coordinator.fetch(entity, id)
    }

    pub fn has_changes(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Drop all uncommitted changes. Returns how many were dropped.
    pub fn rollback(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.len();
        pending.clear();
        dropped
    }

    /// Write pending changes through the coordinator. `Ok(0)` when clean.
    pub(crate) fn commit(&self) -> Result<usize, PersistenceError> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            return Ok(0);
        }
        let changes: Vec<Change> = pending
            .iter()
            .map(|((entity, id), value)| match value {
                Some(value) => Change::Upsert {
                    entity: entity.clone(),
                    id: id.clone(),
                    value: value.clone(),
                },
                None => Change::Delete {
                    entity: entity.clone(),
                    id: id.clone(),
                },
            })
            .collect();
        let committed = self.coordinator.apply(&changes)?;
        pending.clear();
        Ok(committed)
    }
}
