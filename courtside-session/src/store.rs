use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use courtside_core::{BracketMatch, BracketTree};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid document key: {0}")]
    InvalidKey(String),
}

/// A hierarchical key-value document store.
///
/// Documents are whole JSON values addressed by a `/`-separated key. Reads
/// fetch the whole document, writes overwrite it wholesale; no partial-field
/// updates exist at this boundary.
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetches the document at `key`, or `None` if nothing was ever stored
    /// there.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    /// Overwrites the document at `key`.
    fn put(&self, key: &str, document: Value) -> impl Future<Output = Result<(), StoreError>> + Send;
}

// Allows sharing one store between sessions, e.g. several tournaments of the
// same sport backed by the same root.
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore,
{
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, document: Value) -> Result<(), StoreError> {
        (**self).put(key, document).await
    }
}

/// Key of the bracket document for a tournament.
pub fn bracket_key(tournament: &str) -> String {
    format!("tournaments/{tournament}")
}

/// Key of the contact directory shared by all brackets of a sport.
pub fn contacts_key(sport: &str) -> String {
    format!("contacts/{sport}")
}

/// Key of the stored role of a user.
pub fn role_key(user_id: &str) -> String {
    format!("users/{user_id}/role")
}

/// The stored form of a [`BracketTree`].
///
/// Documents are validated on the way back in: [`into_tree`] routes through
/// [`BracketTree::resume`], so a malformed or truncated document is rejected
/// instead of becoming an inconsistent in-memory bracket.
///
/// [`into_tree`]: Self::into_tree
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BracketDocument {
    pub bracket_size: usize,
    #[serde(default)]
    pub bye_players: Vec<String>,
    pub rounds: Vec<Vec<BracketMatch>>,
}

impl BracketDocument {
    pub fn into_tree(self) -> courtside_core::Result<BracketTree> {
        BracketTree::resume(self.bracket_size, self.bye_players, self.rounds)
    }
}

impl From<&BracketTree> for BracketDocument {
    fn from(tree: &BracketTree) -> Self {
        let (bracket_size, bye_players, rounds) = tree.clone().into_parts();

        Self {
            bracket_size,
            bye_players,
            rounds,
        }
    }
}

/// An in-memory [`DocumentStore`], mainly useful for tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.documents.read().get(key).cloned())
    }

    async fn put(&self, key: &str, document: Value) -> Result<(), StoreError> {
        self.documents.write().insert(key.to_owned(), document);
        Ok(())
    }
}

/// A [`DocumentStore`] that keeps one JSON file per key below a root
/// directory.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new<P>(root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);

        let plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }

        Ok(self.root.join(format!("{key}.json")))
    }
}

impl DocumentStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path_for(key)?;

        match tokio::fs::read(&path).await {
            Ok(buf) => Ok(Some(serde_json::from_slice(&buf)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, key: &str, document: Value) -> Result<(), StoreError> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let buf = serde_json::to_vec(&document)?;
        tokio::fs::write(&path, buf).await?;

        Ok(())
    }
}
