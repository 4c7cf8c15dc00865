//! Runtime configuration loaded from TOML.
//!
//! Every section carries `#[serde(default)]`, so a config file only needs the
//! keys it wants to override. An empty file is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VxError};

/// Top-level VX_OS configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VxConfig {
    /// Default `env_logger` filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Filesystem persistence settings.
    pub storage: StorageConfig,
    /// Sandbox resource limits.
    pub sandbox: SandboxConfig,
}

impl Default for VxConfig {
    fn default() -> Self {
        Self {
            log_filter: "info".to_string(),
            storage: StorageConfig::default(),
            sandbox: SandboxConfig::default(),
        }
    }
}

/// Where the filesystem tree is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory backing the key-value store.
    pub dir: PathBuf,
    /// Name of the slot holding the serialized tree.
    pub slot: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".vx"),
            slot: "vx_os_fs".to_string(),
        }
    }
}

/// Limits applied to every sandboxed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter steps (statements + calls) before the run is aborted.
    pub max_steps: u64,
    /// Maximum script call depth.
    pub max_call_depth: usize,
    /// Maximum syntactic nesting accepted by the parser.
    pub max_nesting: usize,
    /// Stack size of the worker thread in KiB.
    pub stack_size_kb: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_steps: 5_000_000,
            max_call_depth: 200,
            max_nesting: 128,
            stack_size_kb: 16 * 1024,
        }
    }
}

impl VxConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.storage.slot.trim().is_empty() {
            return Err(VxError::Config("storage.slot must not be empty".into()));
        }
        if self.sandbox.max_steps == 0 {
            return Err(VxError::Config("sandbox.max_steps must be positive".into()));
        }
        if self.sandbox.max_call_depth == 0 || self.sandbox.max_nesting == 0 {
            return Err(VxError::Config(
                "sandbox depth limits must be positive".into(),
            ));
        }
        Ok(())
    }
}
