//! Conversation engine
//!
//! Turns user input into generation requests and folds the replies back into
//! the transcript. Requests run as spawned tasks; their outcomes come back
//! over a channel and are applied by whoever owns the engine, so all state
//! changes happen on one task. Replies are applied in the order they
//! complete, which is not necessarily the order they were sent.

use std::sync::Arc;
use std::time::Duration;
use anyhow::{Result, anyhow};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, GenerationRequest, GenerationResponse, ResponseKind};
use crate::state::{Artifact, Message, FALLBACK_REPLY};
use crate::store::MessageStore;

type Outcome = Result<GenerationResponse>;

/// A completed request, tagged with the cancellation epoch it was sent in
type Completion = (u64, Outcome);

/// Render the transcript the way the backend expects it as context.
pub fn chat_history(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|msg| format!("{}: {}", msg.sender.history_label(), msg.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ConversationEngine {
    backend: Arc<dyn Backend>,
    store: MessageStore,
    pending_input: String,
    timeout: Duration,
    in_flight: usize,
    epoch: u64,
    replies_tx: mpsc::UnboundedSender<Completion>,
    replies_rx: mpsc::UnboundedReceiver<Completion>,
    cancel: CancellationToken,
}

impl ConversationEngine {
    pub fn new(backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            store: MessageStore::new(),
            pending_input: String::new(),
            timeout,
            in_flight: 0,
            epoch: 0,
            replies_tx,
            replies_rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Send `text` to the backend. Returns false, changing nothing, when the
    /// text is blank.
    ///
    /// Must be called from within a tokio runtime.
    pub fn send_message(&mut self, text: &str, repository_link: &str, link_provided: bool) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        self.store.append(Message::user(text));
        let request = GenerationRequest {
            message: text.to_string(),
            repository_link: repository_link.to_string(),
            link_provided,
            chat_history: chat_history(self.store.all()),
        };
        self.pending_input.clear();
        self.dispatch(request);
        true
    }

    /// Send whatever is in the input buffer
    pub fn submit_pending(&mut self, repository_link: &str, link_provided: bool) -> bool {
        let text = self.pending_input.clone();
        self.send_message(&text, repository_link, link_provided)
    }

    fn dispatch(&mut self, request: GenerationRequest) {
        let backend = Arc::clone(&self.backend);
        let replies = self.replies_tx.clone();
        let cancel = self.cancel.clone();
        let timeout = self.timeout;
        let epoch = self.epoch;

        self.in_flight += 1;
        tracing::debug!(
            turns = self.store.len(),
            link_provided = request.link_provided,
            "dispatching generation request"
        );

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => return,
                result = tokio::time::timeout(timeout, backend.generate(&request)) => {
                    result.unwrap_or_else(|_| {
                        Err(anyhow!("generation request timed out after {}s", timeout.as_secs()))
                    })
                }
            };
            // Receiver is gone once the engine is dropped; nothing left to update.
            let _ = replies.send((epoch, outcome));
        });
    }

    /// Wait for the next completed request. `None` when nothing is in flight.
    pub async fn recv_reply(&mut self) -> Option<Outcome> {
        if self.in_flight == 0 {
            return None;
        }
        loop {
            let (epoch, outcome) = self.replies_rx.recv().await?;
            if epoch == self.epoch {
                return Some(outcome);
            }
        }
    }

    /// A completed request, if one has already arrived
    pub fn try_recv_reply(&mut self) -> Option<Outcome> {
        if self.in_flight == 0 {
            return None;
        }
        while let Ok((epoch, outcome)) = self.replies_rx.try_recv() {
            if epoch == self.epoch {
                return Some(outcome);
            }
        }
        None
    }

    /// Fold a completed request into the transcript.
    ///
    /// Returns the new artifact when the reply carried one; the caller owns
    /// replacing it.
    pub fn apply_reply(&mut self, outcome: Outcome) -> Option<Artifact> {
        self.in_flight = self.in_flight.saturating_sub(1);

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "generation request failed");
                self.store.append(Message::ai(FALLBACK_REPLY));
                return None;
            }
        };

        let GenerationResponse { message, kind, dockerfile, run_command } = response;
        self.store.append(Message::ai(message));

        if kind != ResponseKind::Dockerfile {
            return None;
        }
        if dockerfile.is_none() {
            tracing::warn!("dockerfile reply without dockerfile text");
        }
        Some(Artifact {
            dockerfile: dockerfile.unwrap_or_default(),
            run_command,
        })
    }

    /// Abandon every in-flight request; their replies are never applied.
    pub fn cancel_in_flight(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch += 1;
        self.in_flight = 0;
    }

    pub fn messages(&self) -> &[Message] {
        self.store.all()
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

impl Drop for ConversationEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
