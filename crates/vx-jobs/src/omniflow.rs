//! Omniflow summary of job artifacts.

use serde::Serialize;

use vx_types::error::Result;
use vx_vfs::{EntryKind, FsStore};

use crate::clock::Clock;
use crate::consciousness::THREAD_FILE;
use crate::job::{Job, write_artifact};
use crate::ripple::RIPPLE_FILE;
use crate::seal::SEAL_FILE;

pub const OMNIFLOW_FILE: &str = "VX_OMNIFLOW.json";

const TRACKED: [&str; 3] = [THREAD_FILE, RIPPLE_FILE, SEAL_FILE];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub name: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Omniflow {
    pub initialized_at: u64,
    pub file_count: usize,
    pub artifacts: Vec<Artifact>,
    pub status: &'static str,
}

pub struct OmniflowJob;

impl Job for OmniflowJob {
    fn name(&self) -> &str {
        "omniflow"
    }

    fn description(&self) -> &str {
        "Summarize job artifacts into VX_OMNIFLOW.json"
    }

    fn run(&self, fs: &mut FsStore, clock: &dyn Clock) -> Result<String> {
        let file_count = fs
            .list()
            .iter()
            .filter(|e| e.kind == EntryKind::File && e.name != OMNIFLOW_FILE)
            .count();
        let artifacts: Vec<Artifact> = TRACKED
            .iter()
            .map(|name| Artifact {
                name: name.to_string(),
                present: fs.exists(name),
            })
            .collect();
        let status = if artifacts.iter().all(|a| a.present) {
            "COMPLETE"
        } else {
            "PARTIAL"
        };
        let flow = Omniflow {
            initialized_at: clock.now_unix(),
            file_count,
            artifacts,
            status,
        };
        write_artifact(fs, OMNIFLOW_FILE, &flow)
    }
}
