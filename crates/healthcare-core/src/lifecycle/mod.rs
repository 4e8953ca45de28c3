//! Process lifecycle dispatch.
//!
//! The host translates platform callbacks into [`LifecycleEvent`]s and
//! feeds them to the [`LifecycleBridge`], which maps each one onto the
//! authentication coordinator, the persistence stack, or the shared
//! response cache.

pub mod bridge;

use std::fmt;
use std::sync::{Arc, Weak};

use crate::events::AuthEvent;

pub use bridge::{Flow, LifecycleBridge};

/// A UI surface that shows login results.
pub trait LoginSurface: Send + Sync {
    fn surface_id(&self) -> &str;

    fn show_status(&self, event: &AuthEvent);
}

/// Back-reference to the login surface that last announced itself.
/// Never keeps the surface alive.
#[derive(Clone)]
pub struct LoginViewHandle {
    id: String,
    surface: Weak<dyn LoginSurface>,
}

impl LoginViewHandle {
    pub fn new(surface: &Arc<dyn LoginSurface>) -> Self {
        Self {
            id: surface.surface_id().to_string(),
            surface: Arc::downgrade(surface),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn upgrade(&self) -> Option<Arc<dyn LoginSurface>> {
        self.surface.upgrade()
    }
}

impl fmt::Debug for LoginViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginViewHandle")
            .field("id", &self.id)
            .field("alive", &(self.surface.strong_count() > 0))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    LoginViewReady(LoginViewHandle),
    WillEnterForeground,
    DidBecomeActive,
    WillResignActive,
    DidEnterBackground,
    WillTerminate,
    MemoryPressure,
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::LoginViewReady(_) => "login-view-ready",
            LifecycleEvent::WillEnterForeground => "process-foregrounding",
            LifecycleEvent::DidBecomeActive => "process-active",
            LifecycleEvent::WillResignActive => "process-resigning",
            LifecycleEvent::DidEnterBackground => "process-backgrounding",
            LifecycleEvent::WillTerminate => "process-terminating",
            LifecycleEvent::MemoryPressure => "memory-pressure",
        }
    }
}
