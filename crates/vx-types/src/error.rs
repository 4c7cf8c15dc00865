//! Error types for VX_OS.

use std::io;

/// Errors produced by the VX_OS subsystems.
#[derive(Debug, thiserror::Error)]
pub enum VxError {
    #[error("VFS error: {0}")]
    Vfs(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("sandbox error: {0}")]
    Sandbox(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("window manager error: {0}")]
    Wm(String),

    #[error("job error: {0}")]
    Job(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vfs_error_display() {
        let e = VxError::Vfs("file not found".into());
        assert_eq!(format!("{e}"), "VFS error: file not found");
    }

    #[test]
    fn storage_error_display() {
        let e = VxError::Storage("bad slot".into());
        assert_eq!(format!("{e}"), "storage error: bad slot");
    }

    #[test]
    fn command_error_display() {
        let e = VxError::Command("usage: open <name>".into());
        assert_eq!(format!("{e}"), "command error: usage: open <name>");
    }

    #[test]
    fn job_error_display() {
        let e = VxError::Job("missing input".into());
        assert_eq!(format!("{e}"), "job error: missing input");
    }

    #[test]
    fn wm_error_display() {
        let e = VxError::Wm("unknown window".into());
        assert_eq!(format!("{e}"), "window manager error: unknown window");
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let e: VxError = io_err.into();
        let msg = format!("{e}");
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn toml_error_from_conversion() {
        let toml_err = toml::from_str::<toml::Value>("this is [[[not valid toml").unwrap_err();
        let e: VxError = toml_err.into();
        assert!(format!("{e}").contains("TOML parse error"));
    }

    #[test]
    fn json_error_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let e: VxError = json_err.into();
        assert!(format!("{e}").contains("JSON error"));
    }

    #[test]
    fn result_alias_err() {
        let r: Result<i32> = Err(VxError::Sandbox("oops".into()));
        assert!(r.is_err());
    }
}
