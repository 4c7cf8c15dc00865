//! Ripple seed: snapshot of the root file names.

use serde::Serialize;

use vx_types::error::Result;
use vx_vfs::{EntryKind, FsStore};

use crate::clock::Clock;
use crate::job::{Job, sha256_hex, write_artifact};

pub const RIPPLE_FILE: &str = "ExcelRippleNode.json";

/// Hex digits kept from the digest for `node_id`.
const NODE_ID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RippleNode {
    pub node_id: String,
    pub seeded_at: u64,
    pub files: Vec<String>,
    pub ripples: Vec<String>,
}

impl RippleNode {
    pub fn seed(files: Vec<String>, seeded_at: u64) -> Self {
        let digest = sha256_hex(format!("{seeded_at}:{}", files.join("\n")).as_bytes());
        Self {
            node_id: digest[..NODE_ID_LEN].to_string(),
            seeded_at,
            files,
            ripples: Vec::new(),
        }
    }
}

pub struct RippleJob;

impl Job for RippleJob {
    fn name(&self) -> &str {
        "ripple"
    }

    fn description(&self) -> &str {
        "Seed ExcelRippleNode.json from the current file list"
    }

    fn run(&self, fs: &mut FsStore, clock: &dyn Clock) -> Result<String> {
        let files = fs
            .list()
            .into_iter()
            .filter(|e| e.kind == EntryKind::File && e.name != RIPPLE_FILE)
            .map(|e| e.name)
            .collect();
        let node = RippleNode::seed(files, clock.now_unix());
        write_artifact(fs, RIPPLE_FILE, &node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use vx_vfs::MemoryKvStore;

    #[test]
    fn node_id_depends_on_time_and_files() {
        let a = RippleNode::seed(vec!["a".into()], 1);
        let b = RippleNode::seed(vec!["a".into()], 2);
        let c = RippleNode::seed(vec!["b".into()], 1);
        assert_eq!(a.node_id.len(), NODE_ID_LEN);
        assert_ne!(a.node_id, b.node_id);
        assert_ne!(a.node_id, c.node_id);
        assert_eq!(a, RippleNode::seed(vec!["a".into()], 1));
    }

    #[test]
    fn job_lists_root_files() {
        let mut fs = FsStore::load(Box::new(MemoryKvStore::new()), "vx_os_fs");
        let out = RippleJob.run(&mut fs, &FixedClock(5)).unwrap();
        assert_eq!(out, RIPPLE_FILE);
        let v: serde_json::Value = serde_json::from_str(fs.read(RIPPLE_FILE).unwrap()).unwrap();
        assert_eq!(v["files"], serde_json::json!(["main.js", "README.md"]));
        assert_eq!(v["seeded_at"], 5);
        assert_eq!(v["ripples"], serde_json::json!([]));

        // A second run does not list its own artifact.
        RippleJob.run(&mut fs, &FixedClock(6)).unwrap();
        let v: serde_json::Value = serde_json::from_str(fs.read(RIPPLE_FILE).unwrap()).unwrap();
        assert_eq!(v["files"].as_array().unwrap().len(), 2);
    }
}
