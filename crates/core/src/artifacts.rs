//! Rendered document storage.
//!
//! Each rendered document is stored under its own request-scoped [`ArtifactId`], so concurrent
//! requests never share an output location. Documents are held in memory up to a fixed
//! capacity; beyond it the oldest entry is evicted first. When an artifact directory is
//! configured every document is also written there as `<id>.pdf`, and lookups that miss in
//! memory fall back to that copy. The directory is bounded too: it keeps at most the disk
//! capacity of documents (never fewer than the memory capacity), deleting the oldest files
//! first. Documents left in the directory by an earlier run are adopted oldest-first when the
//! store is created, so they count against the same bound.
//!
//! ## Identifier form
//!
//! Identifiers are UUID v4 values in canonical form: 32 lowercase hexadecimal characters with
//! no hyphens, e.g. `550e8400e29b41d4a716446655440000`. Handles arriving from outside are
//! parsed strictly; anything else is simply not found.

use crate::constants::{DEFAULT_ARTIFACT_DISK_CAPACITY, DOCUMENT_EXTENSION};
use crate::{DischargeError, DischargeResult};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Handle for one rendered document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns true if `input` is 32 lowercase hex characters.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }

    /// Parses a handle that must already be canonical.
    ///
    /// # Errors
    ///
    /// Returns `DischargeError::ArtifactNotFound` for any non-canonical input; a malformed
    /// handle cannot name a stored document.
    pub fn parse(input: &str) -> DischargeResult<Self> {
        if !Self::is_canonical(input) {
            return Err(DischargeError::ArtifactNotFound(input.to_string()));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| DischargeError::ArtifactNotFound(input.to_string()))
    }

    fn file_name(&self) -> String {
        format!("{self}.{DOCUMENT_EXTENSION}")
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ArtifactId {
    type Err = DischargeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Default)]
struct Slots {
    order: VecDeque<ArtifactId>,
    documents: HashMap<ArtifactId, Arc<Vec<u8>>>,
    /// Documents present in the artifact directory, oldest first.
    on_disk: VecDeque<ArtifactId>,
}

/// Bounded store of rendered documents.
#[derive(Debug)]
pub struct ArtifactStore {
    capacity: usize,
    disk_capacity: usize,
    dir: Option<PathBuf>,
    slots: Mutex<Slots>,
}

/// Canonical artifact files already in `dir`, oldest first.
fn existing_documents(dir: &Path) -> VecDeque<ArtifactId> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot scan artifact directory");
            return VecDeque::new();
        }
    };

    let mut found: Vec<(std::time::SystemTime, ArtifactId)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                return None;
            }
            let id = ArtifactId::parse(path.file_stem()?.to_str()?).ok()?;
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, id))
        })
        .collect();
    found.sort();
    found.into_iter().map(|(_, id)| id).collect()
}

impl ArtifactStore {
    /// Creates a store holding at most `capacity` documents in memory (minimum 1).
    ///
    /// With a directory, at most `DEFAULT_ARTIFACT_DISK_CAPACITY` files are kept there; see
    /// [`ArtifactStore::with_disk_capacity`].
    pub fn new(capacity: usize, dir: Option<PathBuf>) -> Self {
        let capacity = capacity.max(1);
        let on_disk = dir.as_deref().map(existing_documents).unwrap_or_default();
        let store = Self {
            capacity,
            disk_capacity: DEFAULT_ARTIFACT_DISK_CAPACITY.max(capacity),
            dir,
            slots: Mutex::new(Slots {
                on_disk,
                ..Slots::default()
            }),
        };
        store.trim_disk(&mut store.slots());
        store
    }

    /// Sets how many documents the artifact directory may hold (never below the memory
    /// capacity) and deletes the oldest files beyond it.
    pub fn with_disk_capacity(mut self, disk_capacity: usize) -> Self {
        self.disk_capacity = disk_capacity.max(self.capacity);
        self.trim_disk(&mut self.slots());
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn disk_capacity(&self) -> usize {
        self.disk_capacity
    }

    /// Number of documents currently kept in the artifact directory.
    pub fn disk_len(&self) -> usize {
        self.slots().on_disk.len()
    }

    fn trim_disk(&self, slots: &mut Slots) {
        let Some(dir) = &self.dir else {
            return;
        };
        while slots.on_disk.len() > self.disk_capacity {
            let Some(expired) = slots.on_disk.pop_front() else {
                break;
            };
            let path = dir.join(expired.file_name());
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "document removed from disk"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot remove expired document")
                }
            }
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn slots(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores `bytes` under a new identifier.
    ///
    /// # Errors
    ///
    /// Returns `DischargeError::ArtifactWrite` if the on-disk copy cannot be written. Nothing
    /// is stored in that case.
    pub fn put(&self, bytes: Vec<u8>) -> DischargeResult<ArtifactId> {
        let id = ArtifactId::new();

        if let Some(dir) = &self.dir {
            let path = dir.join(id.file_name());
            std::fs::write(&path, &bytes)
                .map_err(|source| DischargeError::ArtifactWrite { path: path.clone(), source })?;
            tracing::debug!(path = %path.display(), "document written");
        }

        let mut slots = self.slots();
        slots.order.push_back(id);
        slots.documents.insert(id, Arc::new(bytes));
        if self.dir.is_some() {
            slots.on_disk.push_back(id);
            self.trim_disk(&mut slots);
        }

        while slots.order.len() > self.capacity {
            if let Some(evicted) = slots.order.pop_front() {
                slots.documents.remove(&evicted);
                tracing::debug!(artifact = %evicted, "document evicted from memory");
            }
        }

        Ok(id)
    }

    /// Looks up a document by its external handle.
    ///
    /// # Errors
    ///
    /// Returns `DischargeError::ArtifactNotFound` if the handle is malformed, was never issued,
    /// or has been evicted with no on-disk copy.
    pub fn get(&self, handle: &str) -> DischargeResult<Arc<Vec<u8>>> {
        let id = ArtifactId::parse(handle)?;

        if let Some(bytes) = self.slots().documents.get(&id) {
            return Ok(Arc::clone(bytes));
        }

        if let Some(dir) = &self.dir {
            let path = dir.join(id.file_name());
            if let Ok(bytes) = std::fs::read(&path) {
                tracing::debug!(path = %path.display(), "document served from disk");
                return Ok(Arc::new(bytes));
            }
        }

        Err(DischargeError::ArtifactNotFound(handle.to_string()))
    }

    /// Number of documents currently held in memory.
    pub fn len(&self) -> usize {
        self.slots().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_canonical() {
        let id = ArtifactId::new();
        let text = id.to_string();
        assert!(ArtifactId::is_canonical(&text));
        assert_eq!(text.parse::<ArtifactId>().unwrap(), id);
    }

    #[test]
    fn malformed_handles_are_not_found() {
        for bad in [
            "",
            "discharge_summary.pdf",
            "550e8400-e29b-41d4-a716-446655440000",
            "550E8400E29B41D4A716446655440000",
            "550e8400e29b41d4a71644665544000g",
            "../../etc/passwd",
        ] {
            assert!(
                matches!(ArtifactId::parse(bad), Err(DischargeError::ArtifactNotFound(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn stored_documents_round_trip() {
        let store = ArtifactStore::new(4, None);
        let id = store.put(b"%PDF-1.3 one".to_vec()).unwrap();
        assert_eq!(store.get(&id.to_string()).unwrap().as_slice(), b"%PDF-1.3 one");
        assert!(store.get(&ArtifactId::new().to_string()).is_err());
    }

    #[test]
    fn oldest_entry_is_evicted_beyond_capacity() {
        let store = ArtifactStore::new(2, None);
        let first = store.put(vec![1]).unwrap();
        let second = store.put(vec![2]).unwrap();
        let third = store.put(vec![3]).unwrap();

        assert_eq!(store.len(), 2);
        assert!(matches!(
            store.get(&first.to_string()),
            Err(DischargeError::ArtifactNotFound(_))
        ));
        assert_eq!(store.get(&second.to_string()).unwrap().as_slice(), &[2]);
        assert_eq!(store.get(&third.to_string()).unwrap().as_slice(), &[3]);
    }

    #[test]
    fn evicted_documents_are_served_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(1, Some(tmp.path().to_path_buf()));
        let first = store.put(b"first".to_vec()).unwrap();
        store.put(b"second".to_vec()).unwrap();

        assert!(tmp.path().join(format!("{first}.pdf")).is_file());
        assert_eq!(store.get(&first.to_string()).unwrap().as_slice(), b"first");
    }

    #[test]
    fn disk_copies_are_bounded() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(2, Some(tmp.path().to_path_buf())).with_disk_capacity(5);

        let ids: Vec<ArtifactId> = (0..50u8).map(|n| store.put(vec![n]).unwrap()).collect();

        assert_eq!(store.len(), 2);
        assert_eq!(store.disk_len(), 5);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 5);
        assert!(!tmp.path().join(format!("{}.pdf", ids[0])).exists());
        assert_eq!(store.get(&ids[45].to_string()).unwrap().as_slice(), &[45]);
        assert!(matches!(
            store.get(&ids[44].to_string()),
            Err(DischargeError::ArtifactNotFound(_))
        ));
    }

    #[test]
    fn disk_capacity_never_drops_below_memory() {
        let store = ArtifactStore::new(8, None).with_disk_capacity(2);
        assert_eq!(store.disk_capacity(), 8);
    }

    #[test]
    fn earlier_documents_are_adopted_and_trimmed() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let first_run = ArtifactStore::new(1, Some(tmp.path().to_path_buf()));
            for n in 0..4u8 {
                first_run.put(vec![n]).unwrap();
            }
        }
        std::fs::write(tmp.path().join("notes.txt"), "kept").unwrap();

        let second_run = ArtifactStore::new(1, Some(tmp.path().to_path_buf())).with_disk_capacity(2);
        assert_eq!(second_run.disk_len(), 2);
        second_run.put(vec![9]).unwrap();
        assert_eq!(second_run.disk_len(), 2);
        assert!(tmp.path().join("notes.txt").is_file());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 3);
    }

    #[test]
    fn unwritable_directory_is_a_write_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("gone");
        let store = ArtifactStore::new(2, Some(missing));
        assert!(matches!(
            store.put(vec![0]),
            Err(DischargeError::ArtifactWrite { .. })
        ));
        assert!(store.is_empty());
    }
}
