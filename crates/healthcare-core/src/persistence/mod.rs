//! Local persistence for the app's working data.
//!
//! This module provides the `PersistenceStack`, which lazily builds, in
//! order, the `SchemaDescriptor`, the `StoreCoordinator` owning the durable
//! store file at `<documents>/<model>.store`, and the `WorkingContext`
//! callers mutate before saving.
//!
//! Any failure to load the schema, open the store, or commit changes is
//! fatal: it is logged with its domain and code and the process terminates.

pub mod context;
pub mod error;
pub mod schema;
pub mod stack;
pub mod store;

pub use context::WorkingContext;
pub use error::{ContextError, FatalPersistenceError, PersistenceError};
pub use schema::{EntityDescription, SchemaDescriptor};
pub use stack::{PersistenceStack, SaveOutcome, StackPhase};
pub use store::{Change, StoreCoordinator};
