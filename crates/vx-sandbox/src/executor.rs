//! Single-slot sandbox executor.
//!
//! At most one context is current. Starting a run drops the previous
//! context, which raises its cancellation flag: the old worker stops at its
//! next check and posts nothing further. Messages it already posted stay on
//! the channel.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use vx_types::config::SandboxConfig;
use vx_types::console::LogKind;
use vx_types::error::{Result, VxError};

use crate::embed;
use crate::message::Outbox;
use crate::script::{self, ErrorKind, Limits, OutputSink};

/// Runs code in isolated contexts, one at a time.
#[derive(Debug)]
pub struct SandboxExecutor {
    limits: Limits,
    stack_size: usize,
    outbox: Outbox,
    current: Option<SandboxContext>,
    generation: u64,
}

/// A live (or finished) run. Dropping it cancels the run.
#[derive(Debug)]
pub struct SandboxContext {
    id: u64,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SandboxContext {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for SandboxContext {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::SeqCst);
        if !self.is_finished() {
            log::debug!("Cancelling sandbox context #{}", self.id);
        }
    }
}

impl SandboxExecutor {
    pub fn new(config: &SandboxConfig, outbox: Outbox) -> Self {
        Self {
            limits: Limits::from(config),
            stack_size: config.stack_size_kb * 1024,
            outbox,
            current: None,
            generation: 0,
        }
    }

    /// Tear down the current context and start `code` in a fresh one.
    pub fn run(&mut self, code: &str) -> Result<()> {
        self.current = None;
        self.generation += 1;
        let id = self.generation;

        let cancel = Arc::new(AtomicBool::new(false));
        let document = embed::wrap(code);
        let worker = Worker {
            sink: ChannelSink {
                outbox: self.outbox.clone(),
                cancel: Arc::clone(&cancel),
            },
            limits: self.limits.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("vx-sandbox-{id}"))
            .stack_size(self.stack_size)
            .spawn(move || worker.run(&document))
            .map_err(|e| VxError::Sandbox(format!("failed to start context: {e}")))?;

        log::info!("Started sandbox context #{id} ({} bytes of code)", code.len());
        self.current = Some(SandboxContext {
            id,
            cancel,
            handle: Some(handle),
        });
        Ok(())
    }

    /// Block until the current context has finished.
    pub fn wait(&mut self) {
        let Some(ctx) = self.current.as_mut() else {
            return;
        };
        if let Some(handle) = ctx.handle.take()
            && handle.join().is_err()
        {
            log::error!("Sandbox context #{} worker panicked", ctx.id);
        }
    }

    pub fn is_running(&self) -> bool {
        self.current.as_ref().is_some_and(|ctx| !ctx.is_finished())
    }

    pub fn current(&self) -> Option<&SandboxContext> {
        self.current.as_ref()
    }

    /// Drop the current context, cancelling it if still running.
    pub fn stop(&mut self) {
        self.current = None;
    }
}

struct Worker {
    sink: ChannelSink,
    limits: Limits,
}

impl Worker {
    fn run(mut self, document: &str) {
        let Some(code) = embed::unwrap(document) else {
            self.sink.emit(LogKind::Error, "InternalError: malformed document".into());
            return;
        };
        let limits = self.limits.clone();
        let sink = &mut self.sink;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| script::execute(code, &limits, sink)));
        match outcome {
            Ok(Ok(())) => {},
            Ok(Err(err)) if err.kind == ErrorKind::Cancelled => {
                log::debug!("Sandbox run cancelled");
            },
            Ok(Err(err)) => self.sink.emit(LogKind::Error, err.to_string()),
            Err(_) => {
                log::error!("Sandbox interpreter panicked");
                self.sink
                    .emit(LogKind::Error, "InternalError: interpreter failure".into());
            },
        }
    }
}

/// Forwards console output to the host until cancelled.
struct ChannelSink {
    outbox: Outbox,
    cancel: Arc<AtomicBool>,
}

impl OutputSink for ChannelSink {
    fn emit(&mut self, kind: LogKind, text: String) {
        if self.cancelled() {
            return;
        }
        if !self.outbox.post(kind, text) {
            log::debug!("Sandbox host gone; dropping output");
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}
