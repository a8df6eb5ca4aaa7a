/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Editor snapshot persistence.
//!
//! The store hands a JSON snapshot of the editor state to a `SnapshotStore`
//! under a fixed key on every mutation, and reads it back once at startup.
//! Two backends are provided:
//! - `MemorySnapshotStore`: shared in-process map, for tests and embedding
//! - `RedbSnapshotStore`: redb `snapshots` table with zstd-compressed values

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use log::warn;
use redb::ReadableDatabase;

use crate::app::EditorState;

pub mod types;

pub use types::PersistedEditorState;

/// Key the editor snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "techtree.editor_state";

const SNAPSHOT_TABLE: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("snapshots");

/// External key-value blob store.
pub trait SnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;
    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError>;
}

/// In-memory blob store. Clones share the same entries, so a test can keep a
/// handle while the state store owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    entries: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    writes: Rc<Cell<usize>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, bytes: Vec<u8>) {
        self.entries.borrow_mut().insert(key.to_string(), bytes);
    }

    /// Number of successful `save` calls.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.insert(key, bytes.to_vec());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Snapshot blobs in a redb database, zstd-compressed.
pub struct RedbSnapshotStore {
    db: redb::Database,
}

impl RedbSnapshotStore {
    pub fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::Io(format!("Failed to create dir: {e}")))?;
        }
        let db = redb::Database::create(path).map_err(|e| PersistenceError::Redb(format!("{e}")))?;

        // Create the table up front so reads on a fresh file see it empty.
        let write_txn = db
            .begin_write()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        write_txn
            .open_table(SNAPSHOT_TABLE)
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        write_txn
            .commit()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;

        Ok(Self { db })
    }
}

impl SnapshotStore for RedbSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        let table = read_txn
            .open_table(SNAPSHOT_TABLE)
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        let Some(entry) = table
            .get(key)
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?
        else {
            return Ok(None);
        };
        let bytes = zstd::stream::decode_all(std::io::Cursor::new(entry.value()))
            .map_err(|e| PersistenceError::Compression(format!("zstd decode failed: {e}")))?;
        Ok(Some(bytes))
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
        let compressed = zstd::stream::encode_all(std::io::Cursor::new(bytes), 3)
            .map_err(|e| PersistenceError::Compression(format!("zstd encode failed: {e}")))?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        {
            let mut table = write_txn
                .open_table(SNAPSHOT_TABLE)
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
            table
                .insert(key, compressed.as_slice())
                .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| PersistenceError::Redb(format!("{e}")))?;
        Ok(())
    }
}

/// Serialize the persisted subset of `state`.
pub fn encode_snapshot(state: &EditorState) -> Result<Vec<u8>, PersistenceError> {
    serde_json::to_vec(&PersistedEditorState::from(state))
        .map_err(|e| PersistenceError::Encoding(format!("Failed to serialize snapshot: {e}")))
}

/// Check the raw snapshot shape: a `nodes` array plus `canvas`, `panels` and
/// `preview` objects.
pub fn check_snapshot_shape(value: &serde_json::Value) -> Result<(), String> {
    let Some(object) = value.as_object() else {
        return Err("snapshot is not an object".to_string());
    };
    if !object.get("nodes").is_some_and(serde_json::Value::is_array) {
        return Err("missing node list".to_string());
    }
    for section in ["canvas", "panels", "preview"] {
        if !object.get(section).is_some_and(serde_json::Value::is_object) {
            return Err(format!("missing `{section}` section"));
        }
    }
    Ok(())
}

/// Parse and shape-check a stored snapshot.
pub fn decode_snapshot(bytes: &[u8]) -> Result<EditorState, PersistenceError> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| PersistenceError::Encoding(format!("Malformed snapshot: {e}")))?;
    check_snapshot_shape(&value).map_err(PersistenceError::Encoding)?;
    let persisted: PersistedEditorState = serde_json::from_value(value)
        .map_err(|e| PersistenceError::Encoding(format!("Unreadable snapshot: {e}")))?;
    Ok(persisted.into_editor_state())
}

/// Prior editor state from `store`, or the empty state when there is none or
/// it cannot be used.
pub fn load_editor_state(store: &dyn SnapshotStore) -> EditorState {
    match store.load(SNAPSHOT_KEY) {
        Ok(Some(bytes)) => match decode_snapshot(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding stored editor snapshot: {e}");
                EditorState::default()
            },
        },
        Ok(None) => EditorState::default(),
        Err(e) => {
            warn!("Failed to read editor snapshot: {e}");
            EditorState::default()
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    Io(String),
    Redb(String),
    Compression(String),
    Encoding(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "IO error: {e}"),
            PersistenceError::Redb(e) => write!(f, "Redb error: {e}"),
            PersistenceError::Compression(e) => write!(f, "Compression error: {e}"),
            PersistenceError::Encoding(e) => write!(f, "Encoding error: {e}"),
        }
    }
}

impl std::error::Error for PersistenceError {}
