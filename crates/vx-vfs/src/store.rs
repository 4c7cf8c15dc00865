//! The filesystem store: canonical root plus its persistence slot.

use std::sync::Arc;

use vx_types::error::Result;

use crate::kv::KvStore;
use crate::node::{self, FileNode, VfsEntry};
use crate::seed;

/// Owns the canonical file tree and persists it after every mutation.
///
/// Consumers only ever receive `Arc` snapshots; the store swaps in a new
/// root on each mutation and drops its reference to the old one.
pub struct FsStore {
    root: Arc<FileNode>,
    kv: Box<dyn KvStore>,
    slot: String,
}

impl FsStore {
    /// Load the tree from `slot`, falling back to the seeded default tree if
    /// the slot is empty, unreadable, unparseable, or fails validation.
    pub fn load(kv: Box<dyn KvStore>, slot: &str) -> Self {
        let root = match kv.get(slot) {
            Ok(Some(text)) => match parse_root(&text) {
                Ok(root) => {
                    log::info!(
                        "Loaded filesystem from slot {slot:?} ({} entries)",
                        root.children().len()
                    );
                    root
                },
                Err(e) => {
                    log::warn!("Discarding persisted filesystem in {slot:?}: {e}");
                    seed::default_tree()
                },
            },
            Ok(None) => {
                log::info!("No persisted filesystem in {slot:?}, using seed tree");
                seed::default_tree()
            },
            Err(e) => {
                log::warn!("Could not read slot {slot:?}: {e}");
                seed::default_tree()
            },
        };
        Self {
            root,
            kv,
            slot: slot.to_string(),
        }
    }

    /// Current root snapshot.
    pub fn root(&self) -> Arc<FileNode> {
        Arc::clone(&self.root)
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Content of root-level file `name`.
    pub fn read(&self, name: &str) -> Option<&str> {
        node::read(&self.root, name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.root.child(name).is_some()
    }

    /// Root-level entries in sibling order.
    pub fn list(&self) -> Vec<VfsEntry> {
        node::list(&self.root)
    }

    /// Create or replace file `name`, persist, and return the new root.
    pub fn upsert(&mut self, name: &str, content: &str) -> Arc<FileNode> {
        let next = node::upsert(&self.root, name, content);
        self.replace(next)
    }

    /// Remove child `name`, persist, and return the new root. Absent names
    /// leave the current snapshot in place and skip the write.
    pub fn delete(&mut self, name: &str) -> Arc<FileNode> {
        let next = node::delete(&self.root, name);
        self.replace(next)
    }

    fn replace(&mut self, next: Arc<FileNode>) -> Arc<FileNode> {
        if Arc::ptr_eq(&next, &self.root) {
            log::debug!("Filesystem unchanged, skipping persist");
            return next;
        }
        self.root = next;
        if let Err(e) = self.persist() {
            log::error!("Failed to persist filesystem to {:?}: {e}", self.slot);
        }
        Arc::clone(&self.root)
    }

    /// Serialize the whole tree into the slot.
    pub fn persist(&mut self) -> Result<()> {
        let text = serde_json::to_string(self.root.as_ref())?;
        self.kv.set(&self.slot, &text)
    }
}

fn parse_root(text: &str) -> Result<Arc<FileNode>> {
    let root: FileNode = serde_json::from_str(text)?;
    root.validate_root()?;
    Ok(Arc::new(root))
}

impl std::fmt::Debug for FsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsStore")
            .field("slot", &self.slot)
            .field("entries", &self.root.children().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{FileKvStore, MemoryKvStore};
    use crate::seed::{SEED_CODE_NAME, SEED_DOC_NAME};
    use vx_types::error::VxError;

    const SLOT: &str = "vx_os_fs";

    fn fresh() -> FsStore {
        FsStore::load(Box::new(MemoryKvStore::new()), SLOT)
    }

    /// A store whose writes always fail.
    struct BrokenKv;
    impl KvStore for BrokenKv {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(VxError::Storage("disk on fire".into()))
        }
        fn set(&mut self, _key: &str, _value: &str) -> Result<()> {
            Err(VxError::Storage("disk on fire".into()))
        }
        fn remove(&mut self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_slot_loads_seed() {
        let store = fresh();
        assert!(store.exists(SEED_CODE_NAME));
        assert!(store.exists(SEED_DOC_NAME));
    }

    #[test]
    fn corrupt_slot_loads_seed() {
        let kv = MemoryKvStore::with_slot(SLOT, "{not json");
        let store = FsStore::load(Box::new(kv), SLOT);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn wrong_shape_loads_seed() {
        let kv = MemoryKvStore::with_slot(SLOT, r#"{"kind":"file","name":"root","content":""}"#);
        let store = FsStore::load(Box::new(kv), SLOT);
        assert!(store.exists(SEED_CODE_NAME));
    }

    #[test]
    fn unreadable_slot_loads_seed() {
        let store = FsStore::load(Box::new(BrokenKv), SLOT);
        assert!(store.exists(SEED_DOC_NAME));
    }

    #[test]
    fn persisted_tree_is_loaded() {
        let json = r#"{"kind":"folder","name":"root","children":[
            {"kind":"file","name":"only.txt","content":"hi"}]}"#;
        let store = FsStore::load(Box::new(MemoryKvStore::with_slot(SLOT, json)), SLOT);
        assert_eq!(store.read("only.txt"), Some("hi"));
        assert!(!store.exists(SEED_CODE_NAME));
    }

    #[test]
    fn upsert_replaces_root_snapshot() {
        let mut store = fresh();
        let before = store.root();
        let after = store.upsert("demo.js", "1");
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(Arc::ptr_eq(&after, &store.root()));
        assert_eq!(crate::node::read(&before, "demo.js"), None);
        assert_eq!(store.read("demo.js"), Some("1"));
    }

    #[test]
    fn delete_missing_keeps_snapshot() {
        let mut store = fresh();
        let before = store.root();
        let after = store.delete("ghost");
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn persist_failure_keeps_memory_state() {
        let mut store = FsStore::load(Box::new(BrokenKv), SLOT);
        store.upsert("x", "y");
        assert_eq!(store.read("x"), Some("y"));
    }

    #[test]
    fn mutations_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let kv = FileKvStore::open(dir.path()).unwrap();
            let mut store = FsStore::load(Box::new(kv), SLOT);
            store.upsert("notes.md", "remember");
            store.delete(SEED_DOC_NAME);
        }
        let kv = FileKvStore::open(dir.path()).unwrap();
        let store = FsStore::load(Box::new(kv), SLOT);
        assert_eq!(store.read("notes.md"), Some("remember"));
        assert!(!store.exists(SEED_DOC_NAME));
        let names: Vec<String> = store.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, [SEED_CODE_NAME, "notes.md"]);
    }
}
