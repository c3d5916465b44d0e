//! Persisted session store
//!
//! Two string values survive across runs: the backend token and the Telegram
//! identity id. Both must be present for a session to be restored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::models::Session;

pub const TOKEN_KEY: &str = "minddy_token";
pub const IDENTITY_KEY: &str = "minddy_telegram_id";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the session lives between runs.
pub trait SessionStore: Send + Sync {
    /// Returns the stored session, or `None` unless both keys are present.
    fn load(&self) -> Result<Option<Session>, SessionError>;

    fn save(&self, session: &Session) -> Result<(), SessionError>;

    fn clear(&self) -> Result<(), SessionError>;
}

/// On-disk shape: a flat key/value map, so unknown keys survive a rewrite.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredValues(BTreeMap<String, String>);

impl StoredValues {
    fn session(&self) -> Option<Session> {
        let token = self.0.get(TOKEN_KEY).filter(|v| !v.is_empty())?;
        let identity = self.0.get(IDENTITY_KEY).filter(|v| !v.is_empty())?;
        Some(Session::new(token.clone(), identity.clone()))
    }

    fn set_session(&mut self, session: &Session) {
        self.0.insert(TOKEN_KEY.to_string(), session.token.clone());
        self.0
            .insert(IDENTITY_KEY.to_string(), session.identity_id.clone());
    }

    fn remove_session(&mut self) {
        self.0.remove(TOKEN_KEY);
        self.0.remove(IDENTITY_KEY);
    }
}

// ============================================================================
// FileSessionStore
// ============================================================================

/// JSON file store. Writes go to a temp file that is renamed into place.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read(&self) -> Result<StoredValues, SessionError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoredValues::default()),
            Err(e) => return Err(self.io_err(e)),
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoredValues::default());
        }
        serde_json::from_slice(&data).map_err(|source| SessionError::Parse {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn write(&self, values: &StoredValues) -> Result<(), SessionError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| self.io_err(e))?;
        }

        let bytes = serde_json::to_vec_pretty(values).map_err(|source| SessionError::Parse {
            path: self.path.display().to_string(),
            source,
        })?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut tmp_file = fs::File::create(&tmp_path).map_err(|e| self.io_err(e))?;
        tmp_file.write_all(&bytes).map_err(|e| self.io_err(e))?;
        tmp_file.sync_all().map_err(|e| self.io_err(e))?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_err(e))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.read()?.session())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        // A corrupt file is replaced rather than blocking login.
        let mut values = self.read().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Discarding unreadable session file");
            StoredValues::default()
        });
        values.set_session(session);
        self.write(&values)?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut values = match self.read() {
            Ok(values) => values,
            Err(SessionError::Parse { .. }) => StoredValues::default(),
            Err(e) => return Err(e),
        };
        if values.session().is_none() && !self.path.exists() {
            return Ok(());
        }
        values.remove_session();
        self.write(&values)?;
        tracing::debug!(path = %self.path.display(), "Session cleared");
        Ok(())
    }
}

// ============================================================================
// MemorySessionStore
// ============================================================================

/// Process-local store, for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<StoredValues>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: &Session) -> Self {
        let store = Self::default();
        store.lock().set_session(session);
        store
    }

    /// Store only the token, without the identity id.
    pub fn with_token_only(token: &str) -> Self {
        let store = Self::default();
        store
            .lock()
            .0
            .insert(TOKEN_KEY.to_string(), token.to_string());
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoredValues> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.lock().session())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        self.lock().set_session(session);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.lock().remove_session();
        Ok(())
    }
}
