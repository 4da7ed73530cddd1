pub mod artifact;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod session;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use artifact::ArtifactHandler;
pub use backend::{Backend, FinalizeRequest, GenerationRequest, GenerationResponse, HttpBackend, ResponseKind};
pub use config::Config;
pub use engine::{chat_history, ConversationEngine};
pub use error::SessionError;
pub use gate::{FileLinkStore, LinkStore, MemoryLinkStore, RepositoryLinkGate};
pub use session::{PendingSession, Session, SessionStart};
pub use state::{Artifact, Message, Sender, FALLBACK_REPLY, LINK_NOT_PROVIDED};
pub use store::MessageStore;
