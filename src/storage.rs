//! Storage layer for dayplan
//!
//! Every piece of persisted state is a named slot: one JSON document in the
//! data directory, replaced wholesale on each write.
//!
//! # Directory Structure
//!
//! ```text
//! <data_dir>/
//!   task-state.json     # Full task/topic snapshot
//!   users.json          # Registered users
//!   user.json           # Active session user (mirrors the session cookie)
//!   outbox.jsonl        # Spooled outgoing mail
//!   .dayplan.lock       # Advisory lock held per CLI invocation
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::lock::{self, FileLock};
use crate::model::State;

/// Slot holding the task/topic snapshot
pub const TASK_STATE_SLOT: &str = "task-state";

/// Slot holding the registered users
pub const USERS_SLOT: &str = "users";

/// Slot holding the logged-in user
pub const SESSION_SLOT: &str = "user";

const OUTBOX_FILE: &str = "outbox.jsonl";
const LOCK_FILE: &str = ".dayplan.lock";

/// Storage manager for dayplan state
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Path of the JSON document backing `slot`
    pub fn slot_path(&self, slot: &str) -> PathBuf {
        self.data_dir.join(format!("{slot}.json"))
    }

    pub fn task_state_file(&self) -> PathBuf {
        self.slot_path(TASK_STATE_SLOT)
    }

    pub fn users_file(&self) -> PathBuf {
        self.slot_path(USERS_SLOT)
    }

    /// Default mail spool location
    pub fn outbox_file(&self) -> PathBuf {
        self.data_dir.join(OUTBOX_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE)
    }

    /// Create the data directory if missing
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Take the data-directory lock for the duration of one invocation
    pub fn lock(&self, timeout_ms: u64) -> Result<FileLock> {
        self.init()?;
        FileLock::acquire(self.lock_file(), timeout_ms)
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON data atomically (temp file, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    // =========================================================================
    // Slots
    // =========================================================================

    /// Read a slot. Missing or malformed content reads as `None`.
    pub fn read_slot<T: DeserializeOwned>(&self, slot: &str) -> Option<T> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return None;
        }
        match self.read_json(&path) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(slot, path = %path.display(), error = %err, "ignoring unreadable slot");
                None
            }
        }
    }

    pub fn write_slot<T: Serialize>(&self, slot: &str, value: &T) -> Result<()> {
        self.write_json(&self.slot_path(slot), value)
    }

    /// Remove a slot; removing an absent slot is not an error.
    pub fn clear_slot(&self, slot: &str) -> Result<()> {
        match fs::remove_file(self.slot_path(slot)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn has_slot(&self, slot: &str) -> bool {
        self.slot_path(slot).exists()
    }

    // =========================================================================
    // Task state codec
    // =========================================================================

    /// Persist the full snapshot, replacing whatever was stored.
    pub fn save_state(&self, state: &State) -> Result<()> {
        self.write_slot(TASK_STATE_SLOT, state)
    }

    /// `None` when nothing is stored or the blob does not parse.
    pub fn load_state(&self) -> Option<State> {
        self.read_slot(TASK_STATE_SLOT)
    }
}

/// Append one record as a JSON line. Callers hold the data-dir lock.
pub fn append_jsonl<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(&line)?;
    file.sync_all()?;

    Ok(())
}
