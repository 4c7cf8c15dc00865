//! Durable key-value slots backing the filesystem store.
//!
//! Each key holds one whole text value. There are no partial writes: `set`
//! replaces the previous value entirely.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use vx_types::error::{Result, VxError};

/// A keyed store of text values.
pub trait KvStore: Send {
    /// Value stored under `key`, or `None` if the slot is empty.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Empty the slot. Removing an empty slot is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory slots. Nothing survives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    slots: HashMap<String, String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with one pre-filled slot.
    pub fn with_slot(key: &str, value: &str) -> Self {
        let mut slots = HashMap::new();
        slots.insert(key.to_string(), value.to_string());
        Self { slots }
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.slots.remove(key);
        Ok(())
    }
}

/// Slots stored as `<dir>/<key>.json` files.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key == "." || key == ".." {
            return Err(VxError::Storage(format!("invalid slot name: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.slot_path(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        // Write beside the slot, then rename over it.
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.slot_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_set_get_remove() {
        let mut kv = MemoryKvStore::new();
        assert_eq!(kv.get("k").unwrap(), None);
        kv.set("k", "v1").unwrap();
        kv.set("k", "v2").unwrap();
        assert_eq!(kv.get("k").unwrap().as_deref(), Some("v2"));
        kv.remove("k").unwrap();
        assert_eq!(kv.get("k").unwrap(), None);
        kv.remove("k").unwrap();
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = FileKvStore::open(dir.path().join("slots")).unwrap();
        assert_eq!(kv.get("fs").unwrap(), None);
        kv.set("fs", "{\"a\":1}").unwrap();
        assert_eq!(kv.get("fs").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("slots/fs.json").exists());
        assert!(!dir.path().join("slots/.fs.json.tmp").exists());
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut kv = FileKvStore::open(dir.path()).unwrap();
            kv.set("slot", "persisted").unwrap();
        }
        let kv = FileKvStore::open(dir.path()).unwrap();
        assert_eq!(kv.get("slot").unwrap().as_deref(), Some("persisted"));
    }

    #[test]
    fn file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = FileKvStore::open(dir.path()).unwrap();
        assert!(kv.set("../escape", "x").is_err());
        assert!(kv.set("", "x").is_err());
        assert!(kv.get("a/b").is_err());
    }

    #[test]
    fn file_store_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut kv = FileKvStore::open(dir.path()).unwrap();
        kv.remove("never").unwrap();
    }
}
