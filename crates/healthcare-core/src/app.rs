//! Process-wide services, constructed once at startup.
//!
//! The host builds one `AppContext` and hands it (or pieces of it) to every
//! collaborator instead of reaching for globals.

use std::sync::Arc;

use crate::api::{AdapterError, HttpAdapterClient, RemoteAdapter};
use crate::auth::ChallengeCoordinator;
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::events::AuthEventBus;
use crate::lifecycle::LifecycleBridge;
use crate::persistence::PersistenceStack;

pub struct AppContext {
    pub config: Config,
    pub events: AuthEventBus,
    pub coordinator: Arc<ChallengeCoordinator>,
    pub persistence: Arc<PersistenceStack>,
    pub response_cache: Arc<ResponseCache>,
}

impl AppContext {
    pub fn new(config: Config, adapter: Arc<dyn RemoteAdapter>) -> Self {
        let events = AuthEventBus::new();
        let coordinator = Arc::new(ChallengeCoordinator::new(adapter, events.clone(), &config));
        let persistence = Arc::new(PersistenceStack::new(config.persistence.clone()));
        let response_cache = Arc::new(ResponseCache::new(config.response_cache.memory_capacity));
        Self {
            config,
            events,
            coordinator,
            persistence,
            response_cache,
        }
    }

    /// Context talking to the configured backend over HTTP.
    pub fn connect(config: Config) -> Result<Self, AdapterError> {
        let adapter = Arc::new(HttpAdapterClient::from_config(&config)?);
        Ok(Self::new(config, adapter))
    }

    pub fn lifecycle_bridge(&self) -> LifecycleBridge {
        LifecycleBridge::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.persistence),
            Arc::clone(&self.response_cache),
            &self.config,
        )
    }
}
