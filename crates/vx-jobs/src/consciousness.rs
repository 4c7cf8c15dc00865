//! Signal analysis: softmax entropy as a novelty score.

use serde::Serialize;

use vx_types::error::{Result, VxError};
use vx_vfs::FsStore;

use crate::clock::Clock;
use crate::job::{Job, write_artifact};

pub const SIGNAL_FILE: &str = "signal.json";
pub const THREAD_FILE: &str = "consciousness_thread.json";

/// Used when no `signal.json` exists.
pub const SAMPLE_SIGNAL: [f64; 4] = [0.1, 0.3, 0.25, 0.35];

const CONTEXT: &str = "Integrated consciousness trace";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub signal: Vec<f64>,
    pub novelty_score: f64,
    pub authenticity_score: f64,
    pub context: String,
    /// ISO-8601 UTC.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proof {
    pub status: &'static str,
    pub authenticity_score: f64,
    pub trace_signal: Vec<f64>,
    pub anchored_at: String,
}

#[derive(Debug, Serialize)]
struct Thread<'a> {
    trace: &'a Trace,
    proof: &'a Proof,
}

/// Max-shifted softmax.
pub fn softmax(signal: &[f64]) -> Vec<f64> {
    let max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = signal.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Shannon entropy (nats) of the softmax of `signal`.
pub fn novelty(signal: &[f64]) -> f64 {
    -softmax(signal)
        .iter()
        .map(|p| p * (p + 1e-12).ln())
        .sum::<f64>()
}

pub fn authenticity(novelty: f64) -> f64 {
    if novelty > 0.9 {
        0.99
    } else if novelty > 0.7 {
        0.85
    } else {
        0.4
    }
}

pub fn analyze(signal: &[f64], timestamp: &str) -> (Trace, Proof) {
    let novelty_score = novelty(signal);
    let authenticity_score = authenticity(novelty_score);
    let trace = Trace {
        signal: signal.to_vec(),
        novelty_score,
        authenticity_score,
        context: CONTEXT.to_string(),
        timestamp: timestamp.to_string(),
    };
    let proof = Proof {
        status: if authenticity_score > 0.8 {
            "VERIFIED"
        } else {
            "INSUFFICIENT_DATA"
        },
        authenticity_score,
        trace_signal: signal.to_vec(),
        anchored_at: timestamp.to_string(),
    };
    (trace, proof)
}

fn load_signal(fs: &FsStore) -> Result<Vec<f64>> {
    let Some(text) = fs.read(SIGNAL_FILE) else {
        log::debug!("No {SIGNAL_FILE}, using sample signal");
        return Ok(SAMPLE_SIGNAL.to_vec());
    };
    let signal: Vec<f64> = serde_json::from_str(text)
        .map_err(|e| VxError::Job(format!("{SIGNAL_FILE} is not an array of numbers: {e}")))?;
    if signal.is_empty() {
        return Err(VxError::Job(format!("{SIGNAL_FILE} is empty")));
    }
    Ok(signal)
}

pub struct ConsciousnessJob;

impl Job for ConsciousnessJob {
    fn name(&self) -> &str {
        "consciousness"
    }

    fn description(&self) -> &str {
        "Analyze signal.json and write consciousness_thread.json"
    }

    fn run(&self, fs: &mut FsStore, clock: &dyn Clock) -> Result<String> {
        let signal = load_signal(fs)?;
        let (trace, proof) = analyze(&signal, &clock.now_iso());
        log::debug!(
            "novelty {:.4}, authenticity {}, {}",
            trace.novelty_score,
            trace.authenticity_score,
            proof.status
        );
        write_artifact(fs, THREAD_FILE, &Thread {
            trace: &trace,
            proof: &proof,
        })
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
    fn softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn softmax_survives_large_inputs() {
        let p = softmax(&[1000.0, 1000.0]);
        assert!((p[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn uniform_signal_has_max_entropy() {
        let n = novelty(&[0.0; 4]);
        assert!((n - 4f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn single_value_has_no_novelty() {
        assert!(novelty(&[5.0]).abs() < 1e-9);
        assert_eq!(analyze(&[5.0], "t").1.status, "INSUFFICIENT_DATA");
    }

    #[test]
    fn authenticity_thresholds() {
        assert_eq!(authenticity(0.95), 0.99);
        assert_eq!(authenticity(0.9), 0.85);
        assert_eq!(authenticity(0.75), 0.85);
        assert_eq!(authenticity(0.7), 0.4);
    }

    #[test]
    fn sample_signal_is_verified() {
        let (trace, proof) = analyze(&SAMPLE_SIGNAL, "1970-01-01T00:00:07Z");
        assert!(trace.novelty_score > 1.3);
        assert_eq!(proof.status, "VERIFIED");
        assert_eq!(proof.anchored_at, trace.timestamp);
    }

    #[test]
    fn job_writes_thread_from_sample() {
        let mut fs = store();
        let out = ConsciousnessJob.run(&mut fs, &FixedClock(100)).unwrap();
        assert_eq!(out, THREAD_FILE);
        let v: serde_json::Value = serde_json::from_str(fs.read(THREAD_FILE).unwrap()).unwrap();
        assert_eq!(v["proof"]["status"], "VERIFIED");
        assert_eq!(v["trace"]["timestamp"], "1970-01-01T00:01:40Z");
        assert_eq!(v["proof"]["anchored_at"], v["trace"]["timestamp"]);
        assert_eq!(v["trace"]["signal"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn job_reads_signal_file() {
        let mut fs = store();
        fs.upsert(SIGNAL_FILE, "[1, 1]");
        ConsciousnessJob.run(&mut fs, &FixedClock(0)).unwrap();
        let v: serde_json::Value = serde_json::from_str(fs.read(THREAD_FILE).unwrap()).unwrap();
        assert_eq!(v["trace"]["signal"], serde_json::json!([1.0, 1.0]));
        assert_eq!(v["proof"]["status"], "INSUFFICIENT_DATA");
    }

    #[test]
    fn bad_signal_fails_without_writing() {
        let mut fs = store();
        fs.upsert(SIGNAL_FILE, "[\"a\"]");
        assert!(ConsciousnessJob.run(&mut fs, &FixedClock(0)).is_err());
        fs.upsert(SIGNAL_FILE, "[]");
        let err = ConsciousnessJob.run(&mut fs, &FixedClock(0)).unwrap_err();
        assert_eq!(err.to_string(), "job error: signal.json is empty");
        assert!(!fs.exists(THREAD_FILE));
    }
}
