//! Scripted collaborators shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::api::{AdapterError, AdapterReply, ChallengeAnswer, Invocation, RemoteAdapter};
use crate::auth::{CredentialVault, Credentials};

type Reply = Result<AdapterReply, AdapterError>;

/// Each `invoke` parks until the test resolves it by call index.
/// Challenge answers are served from a queue without parking.
#[derive(Default)]
pub struct GatedAdapter {
    calls: Mutex<Vec<Invocation>>,
    gates: Mutex<Vec<Option<oneshot::Sender<Reply>>>>,
    challenge_replies: Mutex<VecDeque<Reply>>,
    answers: Mutex<Vec<ChallengeAnswer>>,
    logouts: Mutex<Vec<String>>,
    fail_logout: bool,
}

impl GatedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_logout() -> Self {
        Self {
            fail_logout: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    pub fn answers(&self) -> Vec<ChallengeAnswer> {
        self.answers.lock().clone()
    }

    pub fn logouts(&self) -> Vec<String> {
        self.logouts.lock().clone()
    }

    pub fn queue_challenge_reply(&self, reply: Reply) {
        self.challenge_replies.lock().push_back(reply);
    }

    /// Wait until at least `count` invocations are parked.
    pub async fn wait_for_calls(&self, count: usize) {
        for _ in 0..2000 {
            if self.gates.lock().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("adapter never received {} invocations", count);
    }

    /// Release invocation `index` with `reply`.
    pub async fn resolve(&self, index: usize, reply: Reply) {
        self.wait_for_calls(index + 1).await;
        let gate = self.gates.lock()[index].take();
        match gate {
            Some(tx) => {
                let _ = tx.send(reply);
            }
            None => panic!("invocation {} already resolved", index),
        }
    }
}

#[async_trait]
impl RemoteAdapter for GatedAdapter {
    async fn invoke(&self, invocation: &Invocation) -> Result<AdapterReply, AdapterError> {
        let (tx, rx) = oneshot::channel();
        self.calls.lock().push(invocation.clone());
        self.gates.lock().push(Some(tx));
        rx.await
            .unwrap_or_else(|_| Err(AdapterError::InvalidResponse("gate dropped".into())))
    }

    async fn answer_challenge(
        &self,
        _invocation: &Invocation,
        answer: &ChallengeAnswer,
    ) -> Result<AdapterReply, AdapterError> {
        self.answers.lock().push(answer.clone());
        self.challenge_replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AdapterError::InvalidResponse("no scripted answer".into())))
    }

    async fn logout(&self, realm: &str) -> Result<(), AdapterError> {
        self.logouts.lock().push(realm.to_string());
        if self.fail_logout {
            return Err(AdapterError::ServerError("logout unavailable".into()));
        }
        Ok(())
    }
}

/// Password vault kept in memory.
#[derive(Default)]
pub struct MemoryVault {
    passwords: Mutex<HashMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialVault for MemoryVault {
    fn remember(&self, credentials: &Credentials) -> anyhow::Result<()> {
        self.passwords
            .lock()
            .insert(credentials.username.clone(), credentials.password.clone());
        Ok(())
    }

    fn recall(&self, username: &str) -> anyhow::Result<String> {
        self.passwords
            .lock()
            .get(username)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("nothing remembered for {}", username))
    }

    fn forget(&self, username: &str) -> anyhow::Result<()> {
        self.passwords
            .lock()
            .remove(username)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("nothing remembered for {}", username))
    }
}
