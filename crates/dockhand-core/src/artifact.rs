use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::backend::{Backend, FinalizeRequest};
use crate::error::SessionError;
use crate::state::Artifact;

/// Holds the most recent Dockerfile and submits it for finalization.
pub struct ArtifactHandler {
    backend: Arc<dyn Backend>,
    current: Option<Artifact>,
    timeout: Duration,
}

impl ArtifactHandler {
    pub fn new(backend: Arc<dyn Backend>, timeout: Duration) -> Self {
        Self {
            backend,
            current: None,
            timeout,
        }
    }

    pub fn current(&self) -> Option<&Artifact> {
        self.current.as_ref()
    }

    pub fn replace(&mut self, artifact: Artifact) {
        tracing::debug!(
            bytes = artifact.dockerfile.len(),
            has_run_command = artifact.run_command.is_some(),
            "artifact replaced"
        );
        self.current = Some(artifact);
    }

    /// Send the current artifact to `POST /finalize`.
    ///
    /// Fire-and-forget: the outcome is only logged. The returned handle
    /// resolves once the request has finished either way.
    pub fn finalize(&self, repository_link: &str) -> Result<JoinHandle<()>, SessionError> {
        let Some(artifact) = &self.current else {
            tracing::warn!("finalize requested before any Dockerfile was generated");
            return Err(SessionError::NoArtifact);
        };

        let request = FinalizeRequest::new(artifact, repository_link);
        let backend = Arc::clone(&self.backend);
        let timeout = self.timeout;

        Ok(tokio::spawn(async move {
            match tokio::time::timeout(timeout, backend.finalize(&request)).await {
                Ok(Ok(())) => tracing::info!(link = %request.repository_link, "Dockerfile finalized"),
                Ok(Err(err)) => tracing::warn!(error = %err, "finalize request failed"),
                Err(_) => tracing::warn!(timeout_secs = timeout.as_secs(), "finalize request timed out"),
            }
        }))
    }
}
