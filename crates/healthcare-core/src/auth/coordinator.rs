//! Challenge/response authentication state machine.
//!
//! Every submission replaces the credentials and takes a fresh
//! [`Generation`]. Results coming back from the adapter carry the generation
//! they were issued under and are only applied while it is still current,
//! so a slow earlier handshake can never overwrite a later one.
//!
//! All state lives behind one mutex that is never held across an `.await`.
//! Auth events are published under that lock so subscribers observe
//! transitions in the order they happened.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::challenge::{AdapterChallengeHandler, ChallengeHandler};
use super::keychain::{CredentialVault, Keychain};
use super::{AuthError, CredentialStore, Credentials, Generation, SessionData, SessionStatus, SessionToken};
use crate::api::{AdapterReply, Challenge, ChallengeAnswer, Invocation, RemoteAdapter};
use crate::config::Config;
use crate::events::{AuthEvent, AuthEventBus};

#[derive(Debug, Default)]
struct AuthState {
    credentials: CredentialStore,
    status: SessionStatus,
    session: Option<SessionData>,
}

pub struct ChallengeCoordinator {
    adapter: Arc<dyn RemoteAdapter>,
    challenge_handler: Arc<dyn ChallengeHandler>,
    adapter_name: String,
    procedure_name: String,
    vault: Option<Arc<dyn CredentialVault>>,
    state: Mutex<AuthState>,
    events: AuthEventBus,
}

impl ChallengeCoordinator {
    pub fn new(adapter: Arc<dyn RemoteAdapter>, events: AuthEventBus, config: &Config) -> Self {
        Self {
            adapter,
            challenge_handler: Arc::new(AdapterChallengeHandler::new(config.default_realm.clone())),
            adapter_name: config.adapter_name.clone(),
            procedure_name: config.procedure_name.clone(),
            vault: config
                .remember_credentials
                .then(|| Arc::new(Keychain) as Arc<dyn CredentialVault>),
            state: Mutex::new(AuthState::default()),
            events,
        }
    }

    pub fn with_challenge_handler(mut self, handler: Arc<dyn ChallengeHandler>) -> Self {
        self.challenge_handler = handler;
        self
    }

    /// Remember passwords in `vault` instead of the OS keychain.
    pub fn with_vault(mut self, vault: Arc<dyn CredentialVault>) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status.clone()
    }

    pub fn generation(&self) -> Generation {
        self.state.lock().credentials.generation()
    }

    pub fn session(&self) -> Option<SessionData> {
        self.state.lock().session.clone()
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.state.lock().session.as_ref().map(|s| s.token.clone())
    }

    pub fn events(&self) -> &AuthEventBus {
        &self.events
    }

    fn transition(
        &self,
        state: &mut AuthState,
        generation: Generation,
        status: SessionStatus,
        token: Option<SessionToken>,
    ) {
        if state.status == status {
            return;
        }
        let previous = std::mem::replace(&mut state.status, status.clone());
        info!(generation = %generation, from = %previous, to = %status, "Session status changed");
        self.events.publish(AuthEvent {
            generation,
            previous,
            status,
            token,
        });
    }

    fn begin(&self, username: &str, password: &str, locale: &str) -> (Generation, Invocation) {
        let mut state = self.state.lock();
        let generation = state.credentials.set(username, password, locale);
        let parameters = state
            .credentials
            .current()
            .0
            .map(Credentials::as_parameters)
            .unwrap_or_default();
        self.transition(&mut state, generation, SessionStatus::PendingChallenge, None);
        let invocation = Invocation::new(&self.adapter_name, &self.procedure_name, parameters);
        (generation, invocation)
    }

    /// Start a handshake in the background and return its generation.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(self: &Arc<Self>, username: &str, password: &str, locale: &str) -> Generation {
        let (generation, invocation) = self.begin(username, password, locale);
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = coordinator.drive(generation, invocation).await {
                debug!(generation = %generation, error = %e, "Background handshake ended without a session");
            }
        });
        generation
    }

    /// Run a handshake to completion and return its outcome.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        locale: &str,
    ) -> Result<SessionToken, AuthError> {
        let (generation, invocation) = self.begin(username, password, locale);
        self.drive(generation, invocation).await
    }

    async fn drive(&self, generation: Generation, invocation: Invocation) -> Result<SessionToken, AuthError> {
        let mut reply = self.adapter.invoke(&invocation).await;
        loop {
            match reply {
                Ok(AdapterReply::Success(token)) => {
                    return if self.on_success(generation, token.clone()) {
                        Ok(token)
                    } else {
                        Err(AuthError::Superseded)
                    };
                }
                Ok(AdapterReply::Challenge(challenge)) => {
                    match self.on_challenge_received(generation, &challenge) {
                        None => return Err(AuthError::Superseded),
                        Some(Ok(answer)) => {
                            reply = self.adapter.answer_challenge(&invocation, &answer).await;
                        }
                        Some(Err(e)) => return Err(self.settle_failure(generation, e)),
                    }
                }
                Err(e) => return Err(self.settle_failure(generation, AuthError::from(e))),
            }
        }
    }

    fn settle_failure(&self, generation: Generation, error: AuthError) -> AuthError {
        if self.on_failure(generation, error.clone()) {
            error
        } else {
            AuthError::Superseded
        }
    }

    fn is_live(state: &AuthState, generation: Generation) -> bool {
        state.credentials.is_current(generation) && state.status.is_pending()
    }

    /// Build the answer to a challenge for a live handshake.
    ///
    /// Returns `None` when the handshake has been superseded. The status
    /// stays `PendingChallenge` either way.
    pub fn on_challenge_received(
        &self,
        generation: Generation,
        challenge: &Challenge,
    ) -> Option<Result<ChallengeAnswer, AuthError>> {
        let credentials = {
            let state = self.state.lock();
            if !Self::is_live(&state, generation) {
                debug!(generation = %generation, current = %state.credentials.generation(), "Discarding stale challenge");
                return None;
            }
            state.credentials.current().0.cloned()?
        };
        debug!(generation = %generation, realm = ?challenge.realm, "Challenge received");
        Some(self.challenge_handler.answer(challenge, &credentials))
    }

    /// Apply a success result. Returns false if it was stale and discarded.
    pub fn on_success(&self, generation: Generation, token: SessionToken) -> bool {
        let remembered = {
            let mut state = self.state.lock();
            if !Self::is_live(&state, generation) {
                debug!(generation = %generation, current = %state.credentials.generation(), "Discarding stale success");
                return false;
            }
            let Some(credentials) = state.credentials.current().0.cloned() else {
                return false;
            };
            state.session = Some(SessionData {
                token: token.clone(),
                username: credentials.username.clone(),
                locale: credentials.locale.clone(),
                generation,
                authenticated_at: Utc::now(),
            });
            self.transition(&mut state, generation, SessionStatus::Authenticated, Some(token));
            credentials
        };

        if let Some(vault) = &self.vault {
            if let Err(e) = vault.remember(&remembered) {
                warn!(error = %e, "Failed to store credentials");
            }
        }
        true
    }

    /// Apply a failure result. Returns false if it was stale and discarded.
    pub fn on_failure(&self, generation: Generation, error: AuthError) -> bool {
        let mut state = self.state.lock();
        if !Self::is_live(&state, generation) {
            debug!(generation = %generation, error = %error, "Discarding stale failure");
            return false;
        }
        warn!(generation = %generation, error = %error, "Authentication failed");
        self.transition(&mut state, generation, SessionStatus::Failed(error.to_string()), None);
        true
    }

    /// Move to `LoggedOut` without any network I/O and return the user
    /// whose session was closed.
    ///
    /// Any handshake still in flight is invalidated.
    pub fn close_session(&self) -> Option<String> {
        let mut state = self.state.lock();
        let username = state.credentials.current().0.map(|c| c.username.clone());
        let generation = state.credentials.clear();
        state.session = None;
        self.transition(&mut state, generation, SessionStatus::LoggedOut, None);
        username
    }

    /// Tell the backend the session is over. Failures are only logged.
    pub async fn remote_logout(&self, realm: &str) {
        match self.adapter.logout(realm).await {
            Ok(()) => info!(realm = %realm, "Logged out"),
            Err(e) => warn!(realm = %realm, error = %e, "Remote logout failed; local session already closed"),
        }
    }

    /// Close the session locally, then tell the backend.
    ///
    /// The local transition does not depend on the remote outcome.
    /// A remembered password is kept for the next launch.
    pub async fn logout(&self, realm: &str) {
        self.close_session();
        self.remote_logout(realm).await;
    }

    /// Logout requested by the user: also drops the remembered password.
    pub async fn sign_out(&self, realm: &str) {
        let username = self.close_session();
        if let (Some(vault), Some(username)) = (&self.vault, username.as_deref()) {
            if let Err(e) = vault.forget(username) {
                debug!(error = %e, "No remembered password to remove");
            }
        }
        self.remote_logout(realm).await;
    }
}
