use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::PersistenceError;

/// Extension of the schema resource next to the model name.
const SCHEMA_EXTENSION: &str = "schema.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescription {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

/// The data model the durable store is opened with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub entities: Vec<EntityDescription>,
}

impl SchemaDescriptor {
    /// `<resources_dir>/<model>.schema.json`
    pub fn resource_path(resources_dir: &Path, model_name: &str) -> PathBuf {
        resources_dir.join(format!("{}.{}", model_name, SCHEMA_EXTENSION))
    }

    pub fn load(path: &Path) -> Result<Self, PersistenceError> {
        if !path.exists() {
            return Err(PersistenceError::SchemaMissing(path.to_path_buf()));
        }
        let contents =
            std::fs::read_to_string(path).map_err(|source| PersistenceError::SchemaUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        let schema: SchemaDescriptor = serde_json::from_str(&contents)
            .map_err(|e| PersistenceError::SchemaMalformed(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }

    fn validate(&self) -> Result<(), PersistenceError> {
        if self.name.trim().is_empty() {
            return Err(PersistenceError::SchemaMalformed("model name is empty".into()));
        }
        if self.version == 0 {
            return Err(PersistenceError::SchemaMalformed("model version must be at least 1".into()));
        }
        let mut seen = HashSet::new();
        for entity in &self.entities {
            if entity.name.trim().is_empty() {
                return Err(PersistenceError::SchemaMalformed("entity with empty name".into()));
            }
            if !seen.insert(entity.name.as_str()) {
                return Err(PersistenceError::SchemaMalformed(format!(
                    "entity {} declared twice",
                    entity.name
                )));
            }
        }
        Ok(())
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entities.iter().any(|e| e.name == name)
    }
}
