//! Best-effort local snapshot of the last known user.
//!
//! A snapshot is advisory: it lets the UI render a user before the server
//! has confirmed the session. Both operations are total. A missing or
//! corrupt snapshot reads as "no user", and write failures are logged and
//! dropped so the in-memory session stays authoritative.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::UserProfile;

/// Snapshot file name in the data directory
const SNAPSHOT_FILE: &str = "user.json";

/// Local store for the user snapshot.
pub trait PersistenceAdapter: Send + Sync + 'static {
    /// Previously saved user, or `None` if absent or unreadable.
    fn load(&self) -> Option<UserProfile>;

    /// `Some` overwrites the snapshot, `None` deletes it.
    fn save(&self, user: Option<&UserProfile>);
}

impl<T: PersistenceAdapter> PersistenceAdapter for Arc<T> {
    fn load(&self) -> Option<UserProfile> {
        (**self).load()
    }

    fn save(&self, user: Option<&UserProfile>) {
        (**self).save(user)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotFile {
    user: UserProfile,
    saved_at: DateTime<Utc>,
}

/// JSON file snapshot, one file per data directory.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    data_dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    /// When the current snapshot was written.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.read().ok().flatten().map(|s| s.saved_at)
    }

    fn read(&self) -> Result<Option<SnapshotFile>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read user snapshot")?;
        let snapshot: SnapshotFile =
            serde_json::from_str(&contents).context("Failed to parse user snapshot")?;
        Ok(Some(snapshot))
    }

    fn write(&self, user: &UserProfile) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create {}", self.data_dir.display()))?;
        let snapshot = SnapshotFile {
            user: user.clone(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(self.path(), contents).context("Failed to write user snapshot")?;
        Ok(())
    }

    fn remove(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to remove user snapshot"),
        }
    }
}

impl PersistenceAdapter for FileSnapshotStore {
    fn load(&self) -> Option<UserProfile> {
        match self.read() {
            Ok(snapshot) => snapshot.map(|s| s.user),
            Err(e) => {
                warn!(error = %e, path = %self.path().display(), "Ignoring unreadable user snapshot");
                None
            }
        }
    }

    fn save(&self, user: Option<&UserProfile>) {
        let result = match user {
            Some(user) => self.write(user),
            None => Self::remove(&self.path()),
        };
        match result {
            Ok(()) => debug!(present = user.is_some(), "User snapshot saved"),
            Err(e) => warn!(error = %e, "Failed to save user snapshot"),
        }
    }
}

/// In-process snapshot, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    user: Mutex<Option<UserProfile>>,
    fail_writes: AtomicBool,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user: UserProfile) -> Self {
        Self {
            user: Mutex::new(Some(user)),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Simulate an unavailable store: writes are logged and dropped.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl PersistenceAdapter for MemorySnapshotStore {
    fn load(&self) -> Option<UserProfile> {
        self.user
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, user: Option<&UserProfile>) {
        if self.fail_writes.load(Ordering::SeqCst) {
            warn!("Failed to save user snapshot: store unavailable");
            return;
        }
        *self.user.lock().unwrap_or_else(PoisonError::into_inner) = user.cloned();
    }
}
