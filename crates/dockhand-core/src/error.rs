/// Precondition failures surfaced by a [`crate::Session`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// Finalize was requested before the backend produced a Dockerfile.
    #[error("no Dockerfile has been generated yet")]
    NoArtifact,
}
