//! VX_OS terminal entry point.
//!
//! Reads one line at a time from stdin. Lines starting with `:` drive the
//! desktop views (explorer, editor, windows, palette, jobs); every other
//! line is a scroll command (`new file <name>`, `open`, `delete`, `run`).
//! Type `:help` for the view commands and `:quit` to exit.

mod meta;
mod view;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use meta::{Flow, Meta};
use view::ConsoleView;
use vx_core::Desktop;
use vx_core::config::VxConfig;
use vx_core::terminal::CommandOutput;
use vx_core::vfs::FileKvStore;

/// Config path from the first CLI argument, then `VX_CONFIG`.
fn config_path(arg: Option<String>, env: Option<String>) -> Option<PathBuf> {
    arg.or(env).filter(|p| !p.trim().is_empty()).map(PathBuf::from)
}

fn load_config(path: Option<PathBuf>) -> Result<VxConfig> {
    match path {
        Some(path) => VxConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(VxConfig::default()),
    }
}

fn main() -> Result<()> {
    let config = load_config(config_path(
        std::env::args().nth(1),
        std::env::var("VX_CONFIG").ok(),
    ))?;
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter.as_str()),
    )
    .init();
    log::info!("Starting VX_OS (storage in {})", config.storage.dir.display());

    let kv = FileKvStore::open(&config.storage.dir)
        .with_context(|| format!("opening storage at {}", config.storage.dir.display()))?;
    let mut desktop = Desktop::boot(&config, Box::new(kv));
    desktop.install_dispatcher(vx_core::terminal::scroll_registry());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut console = ConsoleView::new();

    writeln!(stdout, "VX_OS v{} -- :help for view commands", env!("CARGO_PKG_VERSION"))?;
    let mut lines = stdin.lock().lines();
    loop {
        write!(stdout, "vx> ")?;
        stdout.flush()?;
        let Some(line) = lines.next().transpose()? else {
            break;
        };
        let line = line.trim();

        if let Some(rest) = line.strip_prefix(':') {
            let meta = match Meta::parse(rest) {
                Ok(meta) => meta,
                Err(e) => {
                    writeln!(stdout, "{e}")?;
                    continue;
                },
            };
            let mut prompt = |message: &str| {
                write!(io::stdout(), "{message}: ").ok()?;
                io::stdout().flush().ok()?;
                let answer = lines.next()?.ok()?;
                Some(answer.trim().to_string())
            };
            if meta.apply(&mut desktop, &mut stdout, &mut prompt)? == Flow::Quit {
                break;
            }
        } else if let CommandOutput::Running(_) = desktop.dispatch_line(line) {
            // Await the run so its output lands before the next prompt.
            desktop.wait_for_output();
        }

        desktop.pump_console();
        console.flush(desktop.console(), &mut stdout)?;
    }

    desktop.stop_run();
    log::info!("VX_OS shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        assert_eq!(
            config_path(Some("a.toml".into()), Some("b.toml".into())),
            Some(PathBuf::from("a.toml"))
        );
    }

    #[test]
    fn env_is_fallback() {
        assert_eq!(
            config_path(None, Some("b.toml".into())),
            Some(PathBuf::from("b.toml"))
        );
    }

    #[test]
    fn blank_means_defaults() {
        assert_eq!(config_path(None, Some("  ".into())), None);
        assert_eq!(config_path(None, None), None);
    }

    #[test]
    fn loads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vx.toml");
        std::fs::write(&path, "log_filter = \"debug\"\n[storage]\nslot = \"alt\"\n").unwrap();
        let config = load_config(Some(path)).unwrap();
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.storage.slot, "alt");
    }

    #[test]
    fn bad_config_names_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[storage\n").unwrap();
        let err = load_config(Some(path)).unwrap_err();
        assert!(format!("{err}").contains("broken.toml"));
    }
}
