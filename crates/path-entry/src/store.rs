use std::fmt;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::entry::Entry;
use crate::form::FormAction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No entry at this position of the path
    NotFound(usize),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(index) => write!(f, "Entry {index} not found"),
        }
    }
}

impl std::error::Error for StoreError {}

/// State store that owns the path's entries
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn entries(&self) -> Vec<Entry>;

    async fn entry(&self, index: usize) -> Option<Entry>;

    /// Add a new entry or replace an existing one wholesale
    async fn edit_path_entry(&self, action: FormAction, entry: Entry) -> Result<(), StoreError>;
}

/// Path kept in memory, in insertion order
#[derive(Default)]
pub struct InMemoryPathStore {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryPathStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl EntryStore for InMemoryPathStore {
    async fn entries(&self) -> Vec<Entry> {
        self.entries.read().await.clone()
    }

    async fn entry(&self, index: usize) -> Option<Entry> {
        self.entries.read().await.get(index).cloned()
    }

    async fn edit_path_entry(&self, action: FormAction, entry: Entry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        match action {
            FormAction::New => {
                entries.push(entry);
                debug!(index = entries.len() - 1, "Added path entry");
            }
            FormAction::Existing(index) => {
                let slot = entries.get_mut(index).ok_or(StoreError::NotFound(index))?;
                *slot = entry;
                debug!(index, "Replaced path entry");
            }
        }
        Ok(())
    }
}
