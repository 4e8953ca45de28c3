//! Lazily built persistence stack.
//!
//! Phases are built strictly in order: schema descriptor, then store
//! coordinator, then working context. Each phase sits behind its own
//! `OnceLock`, so concurrent first callers block on the single build and
//! all observe the same instance. Build failures are fatal and go through
//! [`PersistenceStack::escalate`].

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{debug, error, info};

use super::{FatalPersistenceError, PersistenceError, SchemaDescriptor, StoreCoordinator, WorkingContext};
use crate::config::{FatalPolicy, PersistenceConfig, APP_NAME};

/// Extension of the durable store file next to the model name.
const STORE_EXTENSION: &str = "store";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPhase {
    Unbuilt,
    SchemaResolved,
    CoordinatorReady,
    Ready,
    /// Persistence is disabled; no coordinator or context will ever exist.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing pending, nothing written.
    Clean,
    Committed(usize),
}

pub struct PersistenceStack {
    config: PersistenceConfig,
    documents_dir: OnceLock<PathBuf>,
    schema: OnceLock<Arc<SchemaDescriptor>>,
    coordinator: OnceLock<Option<Arc<StoreCoordinator>>>,
    context: OnceLock<Option<Arc<WorkingContext>>>,
    coordinator_builds: AtomicUsize,
}

impl PersistenceStack {
    pub fn new(config: PersistenceConfig) -> Self {
        Self {
            config,
            documents_dir: OnceLock::new(),
            schema: OnceLock::new(),
            coordinator: OnceLock::new(),
            context: OnceLock::new(),
            coordinator_builds: AtomicUsize::new(0),
        }
    }

    /// Sandboxed location of the durable store. Same value on every call.
    pub fn documents_directory(&self) -> &Path {
        self.documents_dir.get_or_init(|| {
            self.config.documents_dir.clone().unwrap_or_else(|| {
                dirs::document_dir()
                    .or_else(dirs::data_local_dir)
                    .map(|dir| dir.join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from("./documents"))
            })
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.documents_directory()
            .join(format!("{}.{}", self.config.model_name, STORE_EXTENSION))
    }

    /// The data model. Terminates the process if the resource is missing or malformed.
    pub fn schema(&self) -> Arc<SchemaDescriptor> {
        self.schema
            .get_or_init(|| {
                let path = SchemaDescriptor::resource_path(&self.config.resources_dir, &self.config.model_name);
                debug!(path = %path.display(), "Loading schema descriptor");
                match SchemaDescriptor::load(&path) {
                    Ok(schema) => Arc::new(schema),
                    Err(e) => self.escalate(e),
                }
            })
            .clone()
    }

    /// The store coordinator, built on first use.
    ///
    /// `None` only when persistence is disabled. Open failures terminate the
    /// process; there is no retry or fallback.
    pub fn coordinator(&self) -> Option<Arc<StoreCoordinator>> {
        self.coordinator
            .get_or_init(|| {
                if !self.config.enabled {
                    info!("Persistence disabled; no durable store will be opened");
                    return None;
                }
                let schema = self.schema();
                let path = self.store_path();
                self.coordinator_builds.fetch_add(1, Ordering::SeqCst);
                match StoreCoordinator::open(schema, path) {
                    Ok(coordinator) => Some(Arc::new(coordinator)),
                    Err(e) => self.escalate(e),
                }
            })
            .clone()
    }

    /// The working context. Absent whenever the coordinator is.
    pub fn context(&self) -> Option<Arc<WorkingContext>> {
        self.context
            .get_or_init(|| {
                let coordinator = self.coordinator()?;
                debug!("Working context bound to store coordinator");
                Some(Arc::new(WorkingContext::new(coordinator)))
            })
            .clone()
    }

    /// Build every phase in order and return the working context.
    pub fn ensure_ready(&self) -> Option<Arc<WorkingContext>> {
        self.context()
    }

    pub fn phase(&self) -> StackPhase {
        if !self.config.enabled {
            return StackPhase::Unavailable;
        }
        if self.context.get().is_some() {
            StackPhase::Ready
        } else if self.coordinator.get().is_some() {
            StackPhase::CoordinatorReady
        } else if self.schema.get().is_some() {
            StackPhase::SchemaResolved
        } else {
            StackPhase::Unbuilt
        }
    }

    /// Number of times a store open was attempted in this process.
    pub fn coordinator_builds(&self) -> usize {
        self.coordinator_builds.load(Ordering::SeqCst)
    }

    /// Commit pending changes, if any. Commit failures terminate the process.
    ///
    /// Never builds the stack: a context nobody asked for has nothing pending.
    pub fn save(&self) -> SaveOutcome {
        let Some(context) = self.context.get().and_then(Clone::clone) else {
            return SaveOutcome::Clean;
        };
        match context.commit() {
            Ok(0) => SaveOutcome::Clean,
            Ok(committed) => {
                info!(changes = committed, "Working context saved");
                SaveOutcome::Committed(committed)
            }
            Err(e) => self.escalate(e),
        }
    }

    fn escalate(&self, err: PersistenceError) -> ! {
        let fatal = FatalPersistenceError::from(err);
        error!(
            domain = fatal.domain,
            code = fatal.code,
            reason = fatal.failure_reason,
            underlying = %fatal.underlying,
            "Unresolved persistence error: {}",
            fatal.description
        );
        match self.config.fatal_policy {
            FatalPolicy::Abort => std::process::abort(),
            FatalPolicy::Panic => std::panic::panic_any(fatal),
        }
    }
}
