//! XZENITH block propagation: chains block 1 onto the genesis block.

use serde::Serialize;
use serde_json::Value;

use vx_types::error::{Result, VxError};
use vx_vfs::FsStore;

use crate::clock::Clock;
use crate::job::{Job, sha256_hex, write_artifact};

pub const GENESIS_FILE: &str = "XZENITH_GENESIS_BLOCK.json";
pub const LEDGER_FILE: &str = "VX_LEDGER.json";
pub const BLOCK_FILE: &str = "XZENITH_BLOCK_1.json";

const REQUIRED: [&str; 2] = [GENESIS_FILE, LEDGER_FILE];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    pub previous_hash: String,
    pub ledger_hash: String,
    pub ledger_entries: usize,
    pub hash: String,
}

impl Block {
    /// Block 1 over `genesis` and `ledger`, both raw JSON text.
    pub fn propagate(genesis: &str, ledger: &str, timestamp: String) -> Result<Self> {
        let genesis_json = parse(GENESIS_FILE, genesis)?;
        let ledger_json = parse(LEDGER_FILE, ledger)?;
        // A genesis block that names its own hash is chained by it.
        let previous_hash = match genesis_json.get("hash") {
            Some(Value::String(hash)) if !hash.is_empty() => hash.clone(),
            _ => sha256_hex(genesis.as_bytes()),
        };
        let ledger_entries = match &ledger_json {
            Value::Array(entries) => entries.len(),
            Value::Object(map) => map
                .get("entries")
                .and_then(Value::as_array)
                .map_or(0, Vec::len),
            _ => 0,
        };
        let ledger_hash = sha256_hex(ledger.as_bytes());
        let hash = sha256_hex(format!("1:{previous_hash}:{ledger_hash}:{timestamp}").as_bytes());
        Ok(Self {
            index: 1,
            timestamp,
            previous_hash,
            ledger_hash,
            ledger_entries,
            hash,
        })
    }
}

fn parse(name: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| VxError::Job(format!("{name} is not valid JSON: {e}")))
}

pub struct XzenithJob;

impl Job for XzenithJob {
    fn name(&self) -> &str {
        "xzenith"
    }

    fn description(&self) -> &str {
        "Propagate XZENITH_BLOCK_1.json from the genesis block and ledger"
    }

    fn run(&self, fs: &mut FsStore, clock: &dyn Clock) -> Result<String> {
        let missing: Vec<&str> = REQUIRED
            .into_iter()
            .filter(|name| fs.read(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(VxError::Job(format!(
                "missing required file(s): {}",
                missing.join(", ")
            )));
        }
        let genesis = fs.read(GENESIS_FILE).unwrap_or_default();
        let ledger = fs.read(LEDGER_FILE).unwrap_or_default();
        let block = Block::propagate(genesis, ledger, clock.now_iso())?;
        log::debug!("Block 1 {} over {} ledger entries", block.hash, block.ledger_entries);
        write_artifact(fs, BLOCK_FILE, &block)
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
    fn names_every_missing_input() {
        let mut fs = store();
        let err = XzenithJob.run(&mut fs, &FixedClock(0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "job error: missing required file(s): XZENITH_GENESIS_BLOCK.json, VX_LEDGER.json"
        );

        fs.upsert(GENESIS_FILE, "{}");
        let err = XzenithJob.run(&mut fs, &FixedClock(0)).unwrap_err();
        assert_eq!(err.to_string(), "job error: missing required file(s): VX_LEDGER.json");
        assert!(!fs.exists(BLOCK_FILE));
    }

    #[test]
    fn chains_onto_genesis_hash() {
        let mut fs = store();
        fs.upsert(GENESIS_FILE, r#"{"index":0,"hash":"abc123"}"#);
        fs.upsert(LEDGER_FILE, r#"[{"tx":1},{"tx":2}]"#);
        let out = XzenithJob.run(&mut fs, &FixedClock(1_700_000_000)).unwrap();
        assert_eq!(out, BLOCK_FILE);
        let v: serde_json::Value = serde_json::from_str(fs.read(BLOCK_FILE).unwrap()).unwrap();
        assert_eq!(v["index"], 1);
        assert_eq!(v["previous_hash"], "abc123");
        assert_eq!(v["ledger_entries"], 2);
        assert_eq!(v["timestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(v["hash"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn unnamed_genesis_is_hashed() {
        let block = Block::propagate("{}", r#"{"entries":[1]}"#, "t".into()).unwrap();
        assert_eq!(
            block.previous_hash,
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        assert_eq!(block.ledger_entries, 1);
    }

    #[test]
    fn invalid_ledger_writes_nothing() {
        let mut fs = store();
        fs.upsert(GENESIS_FILE, "{}");
        fs.upsert(LEDGER_FILE, "[oops");
        let err = XzenithJob.run(&mut fs, &FixedClock(0)).unwrap_err();
        assert!(err.to_string().starts_with("job error: VX_LEDGER.json is not valid JSON"));
        assert!(!fs.exists(BLOCK_FILE));
    }
}
