//! Job trait, registry, and the shared artifact writer.

use serde::Serialize;
use sha2::{Digest, Sha256};

use vx_types::error::{Result, VxError};
use vx_vfs::{EntryKind, FsStore};

use crate::clock::Clock;

/// A job that derives one JSON artifact from the filesystem.
pub trait Job {
    /// Name used to invoke the job.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str;

    /// Run the job, write its artifact, and return the artifact's name.
    ///
    /// On error nothing has been written.
    fn run(&self, fs: &mut FsStore, clock: &dyn Clock) -> Result<String>;
}

/// Outcome of one job in a [`JobRegistry::run_all`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub job: String,
    /// Artifact name, or the failure reason.
    pub outcome: std::result::Result<String, String>,
}

impl StepReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Human-readable reason for a job failure.
pub fn failure_reason(err: VxError) -> String {
    match err {
        VxError::Job(msg) => msg,
        other => other.to_string(),
    }
}

/// Jobs by name, in registration order.
pub struct JobRegistry {
    jobs: Vec<Box<dyn Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Register a job. Replaces any existing job with the same name.
    pub fn register(&mut self, job: Box<dyn Job>) {
        match self.jobs.iter().position(|j| j.name() == job.name()) {
            Some(i) => self.jobs[i] = job,
            None => self.jobs.push(job),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Job> {
        self.jobs
            .iter()
            .find(|j| j.name().eq_ignore_ascii_case(name))
            .map(|j| j.as_ref())
    }

    /// `(name, description)` pairs in registration order.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.jobs
            .iter()
            .map(|j| (j.name(), j.description()))
            .collect()
    }

    /// Run job `name`.
    pub fn run(&self, name: &str, fs: &mut FsStore, clock: &dyn Clock) -> Result<String> {
        let job = self
            .get(name)
            .ok_or_else(|| VxError::Job(format!("unknown job: {name}")))?;
        let artifact = job.run(fs, clock)?;
        log::info!("Job {} wrote {artifact}", job.name());
        Ok(artifact)
    }

    /// Run every job in registration order. A failure is recorded and the
    /// pipeline carries on with the next job.
    pub fn run_all(&self, fs: &mut FsStore, clock: &dyn Clock) -> Vec<StepReport> {
        let reports: Vec<StepReport> = self
            .jobs
            .iter()
            .map(|job| {
                let outcome = job.run(fs, clock).map_err(|e| {
                    log::warn!("Job {} failed: {e}", job.name());
                    failure_reason(e)
                });
                if let Ok(artifact) = &outcome {
                    log::info!("Job {} wrote {artifact}", job.name());
                }
                StepReport {
                    job: job.name().to_string(),
                    outcome,
                }
            })
            .collect();
        let ok = reports.iter().filter(|r| r.succeeded()).count();
        log::info!("Pipeline finished: {ok}/{} jobs succeeded", reports.len());
        reports
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Pretty-print `value` into root-level file `name`.
pub(crate) fn write_artifact<T: Serialize>(
    fs: &mut FsStore,
    name: &str,
    value: &T,
) -> Result<String> {
    if fs.root().child(name).map(|c| c.kind()) == Some(EntryKind::Folder) {
        return Err(VxError::Job(format!("{name} is a folder")));
    }
    let text = serde_json::to_string_pretty(value)?;
    fs.upsert(name, &text);
    Ok(name.to_string())
}

/// Lowercase hex SHA-256 of `data`.
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
