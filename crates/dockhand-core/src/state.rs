//! UI-agnostic conversation state types
//!
//! These are shared by every host (the TUI today) and don't depend on any
//! specific UI framework.

use serde::{Deserialize, Serialize};

/// Stored in place of a repository link when the user skips the gate.
pub const LINK_NOT_PROVIDED: &str = "Not provided";

/// The AI turn appended when a generation request fails for any reason.
pub const FALLBACK_REPLY: &str = "Sorry, there was an error processing your request.";

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Ai,
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    /// Label used when the transcript is sent back to the backend as context
    pub fn history_label(&self) -> &'static str {
        match self {
            Sender::User => "Human",
            Sender::Ai => "AI",
        }
    }
}

/// The generated Dockerfile and the command to run it.
///
/// Always replaced as a whole; the two fields are never updated separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub dockerfile: String,
    pub run_command: Option<String>,
}
