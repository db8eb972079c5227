//! Persistence for the current session id.
//!
//! The controller mirrors its current session into a [`SessionStore`] on
//! every change so a later run can pick the conversation back up.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::types::SessionId;

/// Durable storage for a single session id.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Returns the stored session id, if any.
    async fn load(&self) -> Result<Option<SessionId>>;

    /// Stores `session_id`, replacing whatever was there.
    async fn save(&self, session_id: &SessionId) -> Result<()>;

    /// Removes the stored session id.
    async fn clear(&self) -> Result<()>;
}

#[async_trait::async_trait]
impl<S: SessionStore + ?Sized> SessionStore for Arc<S> {
    async fn load(&self) -> Result<Option<SessionId>> {
        (**self).load().await
    }

    async fn save(&self, session_id: &SessionId) -> Result<()> {
        (**self).save(session_id).await
    }

    async fn clear(&self) -> Result<()> {
        (**self).clear().await
    }
}

/// Stores the session id as the sole contents of a file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// File name used inside the default data directory.
    pub const FILE_NAME: &'static str = "session_id";

    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The platform default location, `<data_dir>/boltchat/session_id`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("boltchat").join(Self::FILE_NAME))
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<SessionId>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => {
                let trimmed = contents.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(SessionId::new(trimmed)))
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(
                format!("failed to read {}", self.path.display()),
                err,
            )),
        }
    }

    async fn save(&self, session_id: &SessionId) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| Error::io(format!("failed to create {}", parent.display()), err))?;
        }
        tokio::fs::write(&self.path, session_id.as_str())
            .await
            .map_err(|err| Error::io(format!("failed to write {}", self.path.display()), err))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(
                format!("failed to remove {}", self.path.display()),
                err,
            )),
        }
    }
}

/// Keeps the session id in memory; nothing survives the process.
///
/// # Examples
///
/// ```
/// # use boltchat::{MemorySessionStore, SessionId, SessionStore};
/// # tokio_test::block_on(async {
/// let store = MemorySessionStore::new();
/// store.save(&SessionId::new("s1")).await.unwrap();
/// assert_eq!(store.current(), Some(SessionId::new("s1")));
/// store.clear().await.unwrap();
/// assert_eq!(store.load().await.unwrap(), None);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session_id: Mutex<Option<SessionId>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `session_id`.
    pub fn with_session(session_id: SessionId) -> Self {
        Self {
            session_id: Mutex::new(Some(session_id)),
        }
    }

    /// Returns the stored id without going through the async trait.
    pub fn current(&self) -> Option<SessionId> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SessionId>> {
        self.session_id
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<SessionId>> {
        Ok(self.current())
    }

    async fn save(&self, session_id: &SessionId) -> Result<()> {
        *self.lock() = Some(session_id.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}
