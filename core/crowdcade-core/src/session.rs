//! Durable session snapshots.
//!
//! # File format
//!
//! ```json
//! {
//!   "version": 1,
//!   "past_signals": { "participant-id": "LOVE" },
//!   "last_changed": { "participant-id": "2026-01-31T00:00:00Z" },
//!   "resume_path": "/saves/<hash>/save.dat",
//!   "resource_path": "/roms/game.nes"
//! }
//! ```
//!
//! The snapshot lives at `<root>/<md5(resource_path)>/session.json`, so the
//! mapping from controlled resource to saved session survives process
//! restarts. Writes go through a temp file in the same directory plus an
//! atomic rename; a reader never observes a half-written file.
//!
//! # Defensive restore
//!
//! A malformed or unsupported snapshot is fatal to the restore path only:
//! we log a warning and report "not found" so startup continues from an
//! empty state.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::error::SessionError;
use crate::signals::Reaction;

const SNAPSHOT_VERSION: u32 = 1;
const SNAPSHOT_FILE: &str = "session.json";
const RESUME_FILE: &str = "save.dat";

/// The durable unit of controller state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Schema version. Only `version == 1` files are loaded.
    pub version: u32,
    /// Last stored reaction per participant.
    pub past_signals: HashMap<String, Reaction>,
    /// Last-changed timestamp per participant.
    pub last_changed: HashMap<String, DateTime<Utc>>,
    /// Where the actuator's own save state lives.
    pub resume_path: PathBuf,
    /// The controlled resource this session belongs to.
    pub resource_path: PathBuf,
}

impl SessionSnapshot {
    pub fn empty(resume_path: PathBuf, resource_path: PathBuf) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            past_signals: HashMap::new(),
            last_changed: HashMap::new(),
            resume_path,
            resource_path,
        }
    }
}

/// Reads and writes session snapshots for one controlled resource.
#[derive(Debug, Clone)]
pub struct SessionStore {
    session_dir: PathBuf,
}

impl SessionStore {
    pub fn new(save_root: &Path, resource_path: &Path) -> Self {
        let hash = format!("{:x}", md5::compute(resource_path.to_string_lossy().as_bytes()));
        Self {
            session_dir: save_root.join(hash),
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.session_dir.join(SNAPSHOT_FILE)
    }

    /// Where the actuator's save state belongs for this resource.
    pub fn resume_path(&self) -> PathBuf {
        self.session_dir.join(RESUME_FILE)
    }

    /// Atomically writes the snapshot: temp file in the session directory,
    /// then rename over the destination.
    pub fn persist(&self, snapshot: &SessionSnapshot) -> Result<(), SessionError> {
        fs_err::create_dir_all(&self.session_dir).map_err(|err| SessionError::Io {
            context: format!("creating session directory {}", self.session_dir.display()),
            source: err,
        })?;

        let mut temp = NamedTempFile::new_in(&self.session_dir).map_err(|err| SessionError::Io {
            context: format!("creating temp file in {}", self.session_dir.display()),
            source: err,
        })?;

        let json = serde_json::to_string_pretty(snapshot).map_err(|err| SessionError::Format {
            path: self.snapshot_path(),
            details: format!("serializing snapshot: {}", err),
        })?;

        temp.write_all(json.as_bytes())
            .map_err(|err| SessionError::Io {
                context: format!("writing snapshot to {}", self.session_dir.display()),
                source: err,
            })?;

        let path = self.snapshot_path();
        temp.persist(&path).map_err(|err| SessionError::Io {
            context: format!("replacing snapshot at {}", path.display()),
            source: err.error,
        })?;

        Ok(())
    }

    /// Loads the snapshot if one exists.
    ///
    /// Missing file, empty file, corrupt JSON, and unsupported versions all
    /// return `Ok(None)`; the caller starts from an empty state.
    pub fn restore(&self) -> Result<Option<SessionSnapshot>, SessionError> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs_err::read_to_string(&path).map_err(|err| SessionError::Io {
            context: format!("reading snapshot at {}", path.display()),
            source: err,
        })?;

        if content.trim().is_empty() {
            warn!(path = %path.display(), "Empty session snapshot; starting fresh");
            return Ok(None);
        }

        match serde_json::from_str::<SessionSnapshot>(&content) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => Ok(Some(snapshot)),
            Ok(snapshot) => {
                warn!(
                    path = %path.display(),
                    version = snapshot.version,
                    "Unsupported snapshot version; starting fresh"
                );
                Ok(None)
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "Malformed session snapshot; starting fresh"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_snapshot(store: &SessionStore) -> SessionSnapshot {
        let at = Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp");
        SessionSnapshot {
            version: 1,
            past_signals: HashMap::from([
                ("p1".to_string(), Reaction::Love),
                ("p2".to_string(), Reaction::Haha),
            ]),
            last_changed: HashMap::from([
                ("p1".to_string(), at),
                ("p2".to_string(), at + chrono::Duration::seconds(5)),
            ]),
            resume_path: store.resume_path(),
            resource_path: PathBuf::from("/roms/game.nes"),
        }
    }

    #[test]
    fn snapshot_path_is_stable_hash_of_resource() {
        let store_a = SessionStore::new(Path::new("/saves"), Path::new("/roms/game.nes"));
        let store_b = SessionStore::new(Path::new("/saves"), Path::new("/roms/game.nes"));
        let store_c = SessionStore::new(Path::new("/saves"), Path::new("/roms/other.nes"));

        assert_eq!(store_a.snapshot_path(), store_b.snapshot_path());
        assert_ne!(store_a.snapshot_path(), store_c.snapshot_path());
    }

    #[test]
    fn persist_then_restore_round_trips() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::new(temp_dir.path(), Path::new("/roms/game.nes"));
        let snapshot = sample_snapshot(&store);

        store.persist(&snapshot).expect("persist");
        let restored = store.restore().expect("restore").expect("snapshot exists");

        assert_eq!(restored, snapshot);
    }

    #[test]
    fn missing_snapshot_restores_none() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::new(temp_dir.path(), Path::new("/roms/game.nes"));
        assert!(store.restore().expect("restore").is_none());
    }

    #[test]
    fn malformed_snapshot_falls_back_to_empty() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::new(temp_dir.path(), Path::new("/roms/game.nes"));

        fs_err::create_dir_all(store.snapshot_path().parent().expect("parent")).expect("mkdir");
        fs_err::write(store.snapshot_path(), "{not json").expect("write");

        assert!(store.restore().expect("restore").is_none());
    }

    #[test]
    fn unsupported_version_falls_back_to_empty() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::new(temp_dir.path(), Path::new("/roms/game.nes"));

        let mut snapshot = sample_snapshot(&store);
        snapshot.version = 99;
        store.persist(&snapshot).expect("persist");

        assert!(store.restore().expect("restore").is_none());
    }

    #[test]
    fn persist_overwrites_previous_snapshot() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let store = SessionStore::new(temp_dir.path(), Path::new("/roms/game.nes"));

        let mut snapshot = sample_snapshot(&store);
        store.persist(&snapshot).expect("first persist");

        snapshot.past_signals.insert("p3".to_string(), Reaction::Wow);
        store.persist(&snapshot).expect("second persist");

        let restored = store.restore().expect("restore").expect("snapshot exists");
        assert_eq!(restored.past_signals.len(), 3);
    }
}
