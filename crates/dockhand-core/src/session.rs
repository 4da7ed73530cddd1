//! Session lifecycle
//!
//! A [`Session`] only exists once the repository link gate has resolved, so
//! nothing can talk to the backend before the user has answered it.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::artifact::ArtifactHandler;
use crate::backend::{Backend, GenerationResponse};
use crate::config::Config;
use crate::engine::ConversationEngine;
use crate::error::SessionError;
use crate::gate::{LinkStore, RepositoryLinkGate};
use crate::state::{Artifact, Message};

pub enum SessionStart {
    Ready(Session),
    Gated(PendingSession),
}

/// Waiting on the user to answer the repository link prompt.
pub struct PendingSession {
    gate: RepositoryLinkGate,
    backend: Arc<dyn Backend>,
    timeout: Duration,
}

impl PendingSession {
    pub fn gate(&self) -> &RepositoryLinkGate {
        &self.gate
    }

    /// Answer the prompt and open the conversation.
    pub fn submit_link(mut self, link_text: &str) -> Session {
        self.gate.submit(link_text);
        Session::open(self.gate, self.backend, self.timeout)
    }
}

pub struct Session {
    gate: RepositoryLinkGate,
    engine: ConversationEngine,
    artifacts: ArtifactHandler,
    backend: Arc<dyn Backend>,
    timeout: Duration,
}

impl Session {
    pub fn initialize(config: &Config, store: Arc<dyn LinkStore>, backend: Arc<dyn Backend>) -> SessionStart {
        let mut gate = RepositoryLinkGate::new(store);
        if config.require_repository_link {
            gate.initialize();
        } else {
            gate.resolve_without_prompt();
        }

        let timeout = config.request_timeout();
        if gate.link_resolved() {
            SessionStart::Ready(Session::open(gate, backend, timeout))
        } else {
            SessionStart::Gated(PendingSession { gate, backend, timeout })
        }
    }

    fn open(gate: RepositoryLinkGate, backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        debug_assert!(gate.link_resolved());
        Self {
            engine: ConversationEngine::new(Arc::clone(&backend), timeout),
            artifacts: ArtifactHandler::new(Arc::clone(&backend), timeout),
            gate,
            backend,
            timeout,
        }
    }

    pub fn send_message(&mut self, text: &str) -> bool {
        let link_provided = self.gate.link_provided();
        self.engine.send_message(text, self.gate.request_link(), link_provided)
    }

    pub fn submit_pending(&mut self) -> bool {
        let link_provided = self.gate.link_provided();
        self.engine.submit_pending(self.gate.request_link(), link_provided)
    }

    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.engine.set_pending_input(text);
    }

    /// Wait for one in-flight request to finish and apply it.
    ///
    /// Returns false immediately when nothing is in flight.
    pub async fn next_reply(&mut self) -> bool {
        match self.engine.recv_reply().await {
            Some(outcome) => {
                self.apply(outcome);
                true
            }
            None => false,
        }
    }

    /// Apply every reply that has already arrived. Returns how many.
    pub fn drain_replies(&mut self) -> usize {
        let mut applied = 0;
        while let Some(outcome) = self.engine.try_recv_reply() {
            self.apply(outcome);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, outcome: anyhow::Result<GenerationResponse>) {
        if let Some(artifact) = self.engine.apply_reply(outcome) {
            self.artifacts.replace(artifact);
        }
    }

    pub fn finalize(&self) -> Result<JoinHandle<()>, SessionError> {
        self.artifacts.finalize(self.gate.request_link())
    }

    pub fn messages(&self) -> &[Message] {
        self.engine.messages()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifacts.current()
    }

    pub fn pending_input(&self) -> &str {
        self.engine.pending_input()
    }

    pub fn repository_link(&self) -> Option<&str> {
        self.gate.repository_link()
    }

    pub fn link_provided(&self) -> bool {
        self.gate.link_provided()
    }

    pub fn link_resolved(&self) -> bool {
        self.gate.link_resolved()
    }

    pub fn in_flight(&self) -> usize {
        self.engine.in_flight()
    }

    /// End the session, abandoning any request still in flight.
    pub fn teardown(mut self) {
        let abandoned = self.engine.in_flight();
        self.engine.cancel_in_flight();
        tracing::info!(abandoned, turns = self.engine.messages().len(), "session torn down");
    }

    /// Forget the repository link and go back to the prompt.
    ///
    /// The conversation and artifact are discarded with the session.
    pub fn reset_link(mut self) -> PendingSession {
        self.engine.cancel_in_flight();
        self.gate.reset();
        PendingSession {
            gate: self.gate,
            backend: self.backend,
            timeout: self.timeout,
        }
    }
}
