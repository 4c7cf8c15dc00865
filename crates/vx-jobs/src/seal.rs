//! Identity seal over the consciousness thread.

use serde::Serialize;

use vx_types::error::{Result, VxError};
use vx_vfs::FsStore;

use crate::clock::Clock;
use crate::consciousness::THREAD_FILE;
use crate::job::{Job, sha256_hex, write_artifact};

pub const SEAL_FILE: &str = "identity_core_seal.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Seal {
    pub sealed_at: u64,
    pub source: String,
    pub sha256: String,
    pub status: &'static str,
}

pub struct SealJob;

impl Job for SealJob {
    fn name(&self) -> &str {
        "seal"
    }

    fn description(&self) -> &str {
        "Seal consciousness_thread.json into identity_core_seal.json"
    }

    fn run(&self, fs: &mut FsStore, clock: &dyn Clock) -> Result<String> {
        let snapshot = fs
            .read(THREAD_FILE)
            .ok_or_else(|| VxError::Job(format!("{THREAD_FILE} not found")))?;
        serde_json::from_str::<serde_json::Value>(snapshot)
            .map_err(|e| VxError::Job(format!("{THREAD_FILE} is not valid JSON: {e}")))?;
        let seal = Seal {
            sealed_at: clock.now_unix(),
            source: THREAD_FILE.to_string(),
            sha256: sha256_hex(snapshot.as_bytes()),
            status: "SEALED",
        };
        write_artifact(fs, SEAL_FILE, &seal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use vx_vfs::MemoryKvStore;

    fn store() -> FsStore {
        FsStore::load(Box::new(MemoryKvStore::new()), "vx_os_fs")
    }

    #[test]
    fn missing_thread_fails() {
        let mut fs = store();
        let err = SealJob.run(&mut fs, &FixedClock(0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "job error: consciousness_thread.json not found"
        );
        assert!(!fs.exists(SEAL_FILE));
    }

    #[test]
    fn invalid_thread_fails() {
        let mut fs = store();
        fs.upsert(THREAD_FILE, "{oops");
        assert!(SealJob.run(&mut fs, &FixedClock(0)).is_err());
        assert!(!fs.exists(SEAL_FILE));
    }

    #[test]
    fn seal_hashes_thread() {
        let mut fs = store();
        fs.upsert(THREAD_FILE, "{}");
        SealJob.run(&mut fs, &FixedClock(9)).unwrap();
        let v: serde_json::Value = serde_json::from_str(fs.read(SEAL_FILE).unwrap()).unwrap();
        assert_eq!(
            v["sha256"],
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        assert_eq!(v["source"], THREAD_FILE);
        assert_eq!(v["sealed_at"], 9);
        assert_eq!(v["status"], "SEALED");
    }
}
