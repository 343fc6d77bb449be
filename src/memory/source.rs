//! Read side of the persistence collaborator.
//!
//! The map never writes memories. It subscribes to a [`MemorySource`] and
//! re-renders whenever a new list is published.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

use super::types::MemoryRef;

/// Anything that can publish the current list of memories.
pub trait MemorySource {
    /// Subscribe to the memory list. The receiver always holds the latest snapshot.
    fn subscribe(&self) -> watch::Receiver<Vec<MemoryRef>>;
}

/// A memory list backed by a JSON array on disk.
pub struct JsonFileSource {
    path: Option<PathBuf>,
    sender: watch::Sender<Vec<MemoryRef>>,
}

impl JsonFileSource {
    /// Load `path` once. Call [`JsonFileSource::reload`] to publish changes.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let memories = read_memories(&path)?;
        let (sender, _) = watch::channel(memories);
        Ok(Self {
            path: Some(path),
            sender,
        })
    }

    /// A source with a fixed in-memory list, useful for hosts that already hold the data.
    pub fn from_memories(memories: Vec<MemoryRef>) -> Self {
        let (sender, _) = watch::channel(memories);
        Self { path: None, sender }
    }

    /// Re-read the backing file and publish it. Returns the number of memories.
    pub fn reload(&self) -> Result<usize> {
        let Some(path) = &self.path else {
            return Ok(self.sender.borrow().len());
        };
        let memories = read_memories(path)?;
        let count = memories.len();
        self.sender.send_replace(memories);
        tracing::debug!(path = %path.display(), count, "memories reloaded");
        Ok(count)
    }

    /// Replace the published list.
    pub fn publish(&self, memories: Vec<MemoryRef>) {
        self.sender.send_replace(memories);
    }
}

impl MemorySource for JsonFileSource {
    fn subscribe(&self) -> watch::Receiver<Vec<MemoryRef>> {
        self.sender.subscribe()
    }
}

fn read_memories(path: &Path) -> Result<Vec<MemoryRef>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read memories from {}", path.display()))?;
    let memories: Vec<MemoryRef> = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse memories JSON in {}", path.display()))?;
    tracing::info!(path = %path.display(), count = memories.len(), "memories loaded");
    Ok(memories)
}
