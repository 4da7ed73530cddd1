//! Repository link gate
//!
//! Before the conversation starts the user may point dockhand at the
//! repository the Dockerfile is for. Whatever they answer (including nothing)
//! is persisted, so later runs skip straight to the conversation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use anyhow::{Result, anyhow};

use crate::config::Config;
use crate::state::LINK_NOT_PROVIDED;

/// Durable storage for the single persisted repository link.
pub trait LinkStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, link: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

#[derive(Serialize, Deserialize, Default)]
struct PersistedState {
    repository_link: Option<String>,
}

/// Keeps the link in a small JSON file next to the config.
#[derive(Debug, Clone)]
pub struct FileLinkStore {
    path: PathBuf,
}

impl FileLinkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `state.json` inside the dockhand config directory
    pub fn in_config_dir() -> Result<Self> {
        Ok(Self::new(Config::config_dir()?.join("state.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LinkStore for FileLinkStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let state: PersistedState = serde_json::from_str(&content)?;
        Ok(state.repository_link)
    }

    fn save(&self, link: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let state = PersistedState {
            repository_link: Some(link.to_string()),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-process store, for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    link: Mutex<Option<String>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_link(link: &str) -> Self {
        Self {
            link: Mutex::new(Some(link.to_string())),
        }
    }
}

impl LinkStore for MemoryLinkStore {
    fn load(&self) -> Result<Option<String>> {
        let link = self.link.lock().map_err(|_| anyhow!("link store lock poisoned"))?;
        Ok(link.clone())
    }

    fn save(&self, link: &str) -> Result<()> {
        let mut stored = self.link.lock().map_err(|_| anyhow!("link store lock poisoned"))?;
        *stored = Some(link.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut stored = self.link.lock().map_err(|_| anyhow!("link store lock poisoned"))?;
        *stored = None;
        Ok(())
    }
}

pub struct RepositoryLinkGate {
    store: Arc<dyn LinkStore>,
    repository_link: Option<String>,
    link_resolved: bool,
}

impl RepositoryLinkGate {
    pub fn new(store: Arc<dyn LinkStore>) -> Self {
        Self {
            store,
            repository_link: None,
            link_resolved: false,
        }
    }

    /// Resolve from a previously persisted link, if there is one.
    ///
    /// An unreadable store counts as "nothing persisted".
    pub fn initialize(&mut self) {
        match self.store.load() {
            Ok(Some(link)) => {
                tracing::info!(link = %link, "repository link restored");
                self.resolve(link);
            }
            Ok(None) => tracing::debug!("no persisted repository link"),
            Err(err) => tracing::warn!(error = %err, "failed to read persisted repository link"),
        }
    }

    /// Resolve without asking the user. Uses the persisted link when present,
    /// the sentinel otherwise, and persists nothing.
    pub fn resolve_without_prompt(&mut self) {
        self.initialize();
        if !self.link_resolved {
            self.resolve(LINK_NOT_PROVIDED.to_string());
        }
    }

    /// Record the user's answer. Blank input stores the sentinel.
    ///
    /// May be called again; the newest answer overwrites the stored one.
    pub fn submit(&mut self, link_text: &str) {
        let link = if link_text.trim().is_empty() {
            LINK_NOT_PROVIDED.to_string()
        } else {
            link_text.to_string()
        };

        if let Err(err) = self.store.save(&link) {
            tracing::warn!(error = %err, "failed to persist repository link");
        }
        tracing::info!(link = %link, "repository link submitted");
        self.resolve(link);
    }

    /// Forget the link, both in memory and in the store.
    pub fn reset(&mut self) {
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to clear persisted repository link");
        }
        self.repository_link = None;
        self.link_resolved = false;
    }

    pub fn link_resolved(&self) -> bool {
        self.link_resolved
    }

    pub fn repository_link(&self) -> Option<&str> {
        self.repository_link.as_deref()
    }

    /// True when the user gave an actual link rather than skipping
    pub fn link_provided(&self) -> bool {
        self.repository_link
            .as_deref()
            .is_some_and(|link| link != LINK_NOT_PROVIDED)
    }

    /// The value sent to the backend in `githubLink`
    pub fn request_link(&self) -> &str {
        self.repository_link.as_deref().unwrap_or(LINK_NOT_PROVIDED)
    }

    fn resolve(&mut self, link: String) {
        self.repository_link = Some(link);
        self.link_resolved = true;
    }
}
