use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{LifecycleEvent, LoginViewHandle};
use crate::auth::{ChallengeCoordinator, Generation};
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::events::AuthEvent;
use crate::persistence::PersistenceStack;

/// Whether the dispatch loop keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}

pub struct LifecycleBridge {
    coordinator: Arc<ChallengeCoordinator>,
    persistence: Arc<PersistenceStack>,
    response_cache: Arc<ResponseCache>,
    default_realm: String,
    logout_grace: Duration,
    login_view: Mutex<Option<LoginViewHandle>>,
}

impl LifecycleBridge {
    pub fn new(
        coordinator: Arc<ChallengeCoordinator>,
        persistence: Arc<PersistenceStack>,
        response_cache: Arc<ResponseCache>,
        config: &Config,
    ) -> Self {
        Self {
            coordinator,
            persistence,
            response_cache,
            default_realm: config.default_realm.clone(),
            logout_grace: config.logout_grace(),
            login_view: Mutex::new(None),
        }
    }

    pub fn login_view(&self) -> Option<LoginViewHandle> {
        self.login_view.lock().clone()
    }

    /// Entry point for the login surface's submit action.
    pub fn submit_authentication(&self, username: &str, password: &str, locale: &str) -> Generation {
        self.coordinator.submit(username, password, locale)
    }

    pub async fn handle(&self, event: LifecycleEvent) -> Flow {
        debug!(signal = event.name(), "Lifecycle signal");
        match event {
            LifecycleEvent::LoginViewReady(handle) => {
                info!(surface = %handle.id(), "Login view announced");
                *self.login_view.lock() = Some(handle);
                Flow::Continue
            }
            LifecycleEvent::DidEnterBackground => {
                self.persistence.save();
                Flow::Continue
            }
            LifecycleEvent::WillTerminate => {
                // Local logout first; a fatal save must not leave the session open.
                self.coordinator.close_session();
                self.persistence.save();
                let logout = self.coordinator.remote_logout(&self.default_realm);
                if tokio::time::timeout(self.logout_grace, logout).await.is_err() {
                    warn!(realm = %self.default_realm, "Remote logout still pending at exit");
                }
                Flow::Shutdown
            }
            LifecycleEvent::MemoryPressure => {
                self.response_cache.purge();
                Flow::Continue
            }
            LifecycleEvent::WillEnterForeground
            | LifecycleEvent::DidBecomeActive
            | LifecycleEvent::WillResignActive => Flow::Continue,
        }
    }

    /// Hand an auth event to the announced login surface.
    /// Returns false when no live surface is registered.
    pub fn route_auth_event(&self, event: &AuthEvent) -> bool {
        let Some(surface) = self.login_view().and_then(|handle| handle.upgrade()) else {
            return false;
        };
        surface.show_status(event);
        true
    }

    /// Dispatch lifecycle signals and route auth events until the process
    /// terminates or the signal channel closes.
    pub async fn run(self: Arc<Self>, mut signals: mpsc::Receiver<LifecycleEvent>) {
        let mut auth_events = self.coordinator.events().subscribe();
        loop {
            tokio::select! {
                signal = signals.recv() => match signal {
                    Some(event) => {
                        if self.handle(event).await == Flow::Shutdown {
                            break;
                        }
                    }
                    None => {
                        debug!("Lifecycle channel closed");
                        break;
                    }
                },
                event = auth_events.recv() => match event {
                    Ok(event) => {
                        self.route_auth_event(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Login surface fell behind auth events");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        info!("Lifecycle bridge stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AdapterReply, RemoteAdapter};
    use crate::app::AppContext;
    use crate::auth::{SessionStatus, SessionToken};
    use crate::config::FatalPolicy;
    use crate::lifecycle::LoginSurface;
    use crate::persistence::{SchemaDescriptor, StackPhase};
    use crate::testing::GatedAdapter;
    use serde_json::json;

    struct RecordingSurface {
        seen: Mutex<Vec<SessionStatus>>,
    }

    impl LoginSurface for RecordingSurface {
        fn surface_id(&self) -> &str {
            "login-1"
        }

        fn show_status(&self, event: &AuthEvent) {
            self.seen.lock().push(event.status.clone());
        }
    }

    fn surface() -> Arc<RecordingSurface> {
        Arc::new(RecordingSurface { seen: Mutex::new(Vec::new()) })
    }

    fn handle_for(view: &Arc<RecordingSurface>) -> LoginViewHandle {
        let surface: Arc<dyn LoginSurface> = view.clone();
        LoginViewHandle::new(&surface)
    }

    fn seen(view: &RecordingSurface) -> Vec<SessionStatus> {
        view.seen.lock().clone()
    }

    fn context(dir: &std::path::Path, adapter: Arc<GatedAdapter>) -> AppContext {
        let mut config = Config::default();
        config.persistence.resources_dir = dir.join("resources");
        config.persistence.documents_dir = Some(dir.join("documents"));
        config.persistence.fatal_policy = FatalPolicy::Panic;
        std::fs::create_dir_all(&config.persistence.resources_dir).expect("resources dir");
        std::fs::write(
            SchemaDescriptor::resource_path(&config.persistence.resources_dir, "Healthcare"),
            r#"{"name": "Healthcare", "version": 1, "entities": [{"name": "Routine"}]}"#,
        )
        .expect("write schema");
        let adapter: Arc<dyn RemoteAdapter> = adapter;
        AppContext::new(config, adapter)
    }

    #[tokio::test]
    async fn test_login_view_is_recorded_without_ownership() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(dir.path(), Arc::new(GatedAdapter::new()));
        let bridge = ctx.lifecycle_bridge();
        let view = surface();

        let flow = bridge.handle(LifecycleEvent::LoginViewReady(handle_for(&view))).await;
        assert_eq!(flow, Flow::Continue);
        assert_eq!(bridge.login_view().map(|h| h.id().to_string()), Some("login-1".to_string()));

        let event = AuthEvent {
            generation: Generation::default(),
            previous: SessionStatus::Unauthenticated,
            status: SessionStatus::PendingChallenge,
            token: None,
        };
        assert!(bridge.route_auth_event(&event));
        assert_eq!(seen(&view), vec![SessionStatus::PendingChallenge]);

        drop(view);
        assert!(!bridge.route_auth_event(&event));
    }

    #[tokio::test]
    async fn test_background_saves_pending_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(dir.path(), Arc::new(GatedAdapter::new()));
        let bridge = ctx.lifecycle_bridge();
        let working = ctx.persistence.context().expect("context");
        working.upsert("Routine", "r1", json!({"title": "Ankle"})).expect("known entity");

        assert_eq!(bridge.handle(LifecycleEvent::DidEnterBackground).await, Flow::Continue);
        assert!(!working.has_changes());
        assert_eq!(
            working.coordinator().fetch("Routine", "r1"),
            Some(json!({"title": "Ankle"}))
        );
        assert_eq!(ctx.coordinator.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_terminate_saves_and_logs_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let adapter = Arc::new(GatedAdapter::new());
        let ctx = context(dir.path(), adapter.clone());
        let bridge = ctx.lifecycle_bridge();
        let working = ctx.persistence.context().expect("context");
        working.upsert("Routine", "r2", json!(2)).expect("known entity");

        assert_eq!(bridge.handle(LifecycleEvent::WillTerminate).await, Flow::Shutdown);
        assert!(!working.has_changes());
        assert_eq!(ctx.coordinator.status(), SessionStatus::LoggedOut);
        assert_eq!(adapter.logouts(), vec!["SingleStepAuthRealm"]);
    }

    #[tokio::test]
    async fn test_memory_pressure_only_purges_cache() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(dir.path(), Arc::new(GatedAdapter::new()));
        let bridge = ctx.lifecycle_bridge();
        ctx.response_cache.put("/adapters/HealthcareAdapter/routines", vec![1, 2, 3]);

        assert_eq!(bridge.handle(LifecycleEvent::MemoryPressure).await, Flow::Continue);
        assert!(ctx.response_cache.is_empty());
        assert_eq!(ctx.persistence.phase(), StackPhase::Unbuilt);
        assert_eq!(ctx.coordinator.status(), SessionStatus::Unauthenticated);
    }

    #[tokio::test]
    async fn test_foreground_signals_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(dir.path(), Arc::new(GatedAdapter::new()));
        let bridge = ctx.lifecycle_bridge();
        for event in [
            LifecycleEvent::WillEnterForeground,
            LifecycleEvent::DidBecomeActive,
            LifecycleEvent::WillResignActive,
        ] {
            assert_eq!(bridge.handle(event).await, Flow::Continue);
        }
        assert_eq!(ctx.persistence.phase(), StackPhase::Unbuilt);
    }

    #[tokio::test]
    async fn test_run_routes_auth_events_until_terminate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let adapter = Arc::new(GatedAdapter::new());
        let ctx = context(dir.path(), adapter.clone());
        let bridge = Arc::new(ctx.lifecycle_bridge());
        let view = surface();
        let (tx, rx) = mpsc::channel(8);
        let runner = tokio::spawn(Arc::clone(&bridge).run(rx));

        tx.send(LifecycleEvent::LoginViewReady(handle_for(&view)))
            .await
            .expect("bridge listening");
        for _ in 0..1000 {
            if bridge.login_view().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        bridge.submit_authentication("alice", "pw", "en_US");
        adapter
            .resolve(0, Ok(AdapterReply::Success(SessionToken::new("T1"))))
            .await;
        for _ in 0..1000 {
            if seen(&view).contains(&SessionStatus::Authenticated) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(seen(&view).contains(&SessionStatus::Authenticated));

        tx.send(LifecycleEvent::WillTerminate).await.expect("bridge listening");
        runner.await.expect("bridge panicked");
        assert_eq!(ctx.coordinator.status(), SessionStatus::LoggedOut);
    }

    #[tokio::test]
    async fn test_terminate_without_schema_still_logs_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.persistence.resources_dir = dir.path().join("missing");
        config.persistence.documents_dir = Some(dir.path().join("documents"));
        config.persistence.fatal_policy = FatalPolicy::Panic;
        let adapter = Arc::new(GatedAdapter::new());
        let ctx = AppContext::new(config, adapter.clone());
        let bridge = ctx.lifecycle_bridge();

        assert_eq!(bridge.handle(LifecycleEvent::WillTerminate).await, Flow::Shutdown);
        assert_eq!(ctx.coordinator.status(), SessionStatus::LoggedOut);
        assert_eq!(adapter.logouts(), vec!["SingleStepAuthRealm"]);
        assert_eq!(ctx.persistence.phase(), StackPhase::Unbuilt);
    }

    #[tokio::test]
    async fn test_terminate_closes_session_before_fatal_save() {
        use futures::FutureExt;
        use std::panic::AssertUnwindSafe;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = context(dir.path(), Arc::new(GatedAdapter::new()));
        let bridge = ctx.lifecycle_bridge();
        let working = ctx.persistence.context().expect("context");
        working.upsert("Routine", "r3", json!(3)).expect("known entity");
        let store_path = ctx.persistence.store_path();
        std::fs::create_dir(crate::persistence::store::temp_path(&store_path))
            .expect("block temp path");

        let outcome = AssertUnwindSafe(bridge.handle(LifecycleEvent::WillTerminate))
            .catch_unwind()
            .await;
        assert!(outcome.is_err(), "commit failure is fatal");
        assert_eq!(ctx.coordinator.status(), SessionStatus::LoggedOut);
    }
}
