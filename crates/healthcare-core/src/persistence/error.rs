use std::path::PathBuf;

use thiserror::Error;

/// Error domain attached to every fatal persistence report.
pub const ERROR_DOMAIN: &str = "healthcare.persistence";

const SCHEMA_ERROR_CODE: i32 = 9997;
const COMMIT_ERROR_CODE: i32 = 9998;
const STORE_ERROR_CODE: i32 = 9999;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Schema resource not found: {}", .0.display())]
    SchemaMissing(PathBuf),

    #[error("Failed to read schema resource {}: {source}", .path.display())]
    SchemaUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema resource is malformed: {0}")]
    SchemaMalformed(String),

    #[error("Failed to open durable store at {}: {source}", .path.display())]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Durable store is corrupt: {0}")]
    StoreCorrupt(String),

    #[error("Store {found_model} v{found_version} is incompatible with model {expected_model} v{expected_version}")]
    IncompatibleSchema {
        found_model: String,
        found_version: u32,
        expected_model: String,
        expected_version: u32,
    },

    #[error("Failed to commit working context: {0}")]
    Commit(String),
}

/// A persistence error enriched for the crash report.
///
/// Carried as the panic payload under `FatalPolicy::Panic`.
#[derive(Error, Debug)]
#[error("{description} ({domain} error {code}): {failure_reason}")]
pub struct FatalPersistenceError {
    pub domain: &'static str,
    pub code: i32,
    pub description: &'static str,
    pub failure_reason: &'static str,
    #[source]
    pub underlying: PersistenceError,
}

impl From<PersistenceError> for FatalPersistenceError {
    fn from(underlying: PersistenceError) -> Self {
        let (code, description, failure_reason) = match underlying {
            PersistenceError::SchemaMissing(_)
            | PersistenceError::SchemaUnreadable { .. }
            | PersistenceError::SchemaMalformed(_) => (
                SCHEMA_ERROR_CODE,
                "Failed to load the application's data model",
                "The data model resource is missing or malformed.",
            ),
            PersistenceError::Commit(_) => (
                COMMIT_ERROR_CODE,
                "Failed to save the application's data",
                "There was an error writing changes to the application's saved data.",
            ),
            PersistenceError::StoreIo { .. }
            | PersistenceError::StoreCorrupt(_)
            | PersistenceError::IncompatibleSchema { .. } => (
                STORE_ERROR_CODE,
                "Failed to initialize the application's saved data",
                "There was an error creating or loading the application's saved data.",
            ),
        };
        Self {
            domain: ERROR_DOMAIN,
            code,
            description,
            failure_reason,
            underlying,
        }
    }
}

/// Rejected mutation of the working context. Not fatal.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContextError {
    #[error("Entity {entity} is not part of the {model} model")]
    UnknownEntity { entity: String, model: String },
}
