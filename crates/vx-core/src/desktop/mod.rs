//! The desktop: owner of all VX_OS state.

use std::sync::Arc;

use vx_jobs::{Clock, JobRegistry, StepReport, SystemClock, failure_reason};
use vx_sandbox::{Inbox, SandboxExecutor};
use vx_terminal::palette::{self, PaletteAction, PaletteEntry};
use vx_terminal::{CommandOutput, CommandRegistry, Environment, OpenFiles};
use vx_types::config::VxConfig;
use vx_types::console::Console;
use vx_types::input::InputEvent;
use vx_vfs::{FileNode, FsStore, KvStore};
use vx_wm::{Point, WindowId, WindowManager, WmEvent};

/// Asks the user for a file name on behalf of a palette entry.
pub trait Prompter {
    /// `None` means the prompt was dismissed.
    fn prompt(&mut self, message: &str) -> Option<String>;
}

impl<F> Prompter for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn prompt(&mut self, message: &str) -> Option<String> {
        self(message)
    }
}

/// Filesystem, tabs, console, sandbox, windows, and jobs under one owner.
pub struct Desktop {
    fs: FsStore,
    files: OpenFiles,
    console: Console,
    sandbox: SandboxExecutor,
    inbox: Inbox,
    wm: WindowManager,
    dispatcher: Option<CommandRegistry>,
    jobs: JobRegistry,
    clock: Box<dyn Clock>,
}

impl Desktop {
    /// Load the file tree from `kv` and bring up every subsystem.
    ///
    /// No dispatcher is installed; see [`Desktop::install_dispatcher`].
    pub fn boot(config: &VxConfig, kv: Box<dyn KvStore>) -> Self {
        let fs = FsStore::load(kv, &config.storage.slot);
        let (outbox, inbox) = vx_sandbox::channel();
        log::info!(
            "Booted VX_OS ({} root entries, slot {:?})",
            fs.root().children().len(),
            fs.slot()
        );
        Self {
            fs,
            files: OpenFiles::new(),
            console: Console::new(),
            sandbox: SandboxExecutor::new(&config.sandbox, outbox),
            inbox,
            wm: WindowManager::new(),
            dispatcher: None,
            jobs: vx_jobs::default_registry(),
            clock: Box::new(SystemClock),
        }
    }

    /// Replace the clock used for job timestamps.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Install the command registry. Until then dispatch is inert.
    pub fn install_dispatcher(&mut self, registry: CommandRegistry) {
        log::info!("Dispatcher installed");
        self.dispatcher = Some(registry);
    }

    pub fn has_dispatcher(&self) -> bool {
        self.dispatcher.is_some()
    }

    // -- Commands ----------------------------------------------------------

    /// Dispatch one scroll command.
    pub fn dispatch(&mut self, command: &str, args: &[&str]) -> CommandOutput {
        let Some(registry) = self.dispatcher.as_ref() else {
            log::debug!("No dispatcher installed, dropping {command:?}");
            return CommandOutput::None;
        };
        let mut env = Environment {
            fs: &mut self.fs,
            files: &mut self.files,
            console: &mut self.console,
            sandbox: &mut self.sandbox,
            wm: &mut self.wm,
        };
        registry.dispatch(command, args, &mut env)
    }

    /// Tokenize and dispatch a full command line.
    pub fn dispatch_line(&mut self, line: &str) -> CommandOutput {
        let Some(registry) = self.dispatcher.as_ref() else {
            log::debug!("No dispatcher installed, dropping {line:?}");
            return CommandOutput::None;
        };
        let mut env = Environment {
            fs: &mut self.fs,
            files: &mut self.files,
            console: &mut self.console,
            sandbox: &mut self.sandbox,
            wm: &mut self.wm,
        };
        registry.execute_line(line, &mut env)
    }

    // -- Palette -----------------------------------------------------------

    pub fn palette(&self, query: &str) -> Vec<PaletteEntry> {
        palette::query(query)
    }

    /// Carry out a palette entry, prompting for a name where needed.
    pub fn invoke(&mut self, entry: &PaletteEntry, prompter: &mut dyn Prompter) -> CommandOutput {
        match &entry.action {
            PaletteAction::Execute { command, args } => {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                self.dispatch(command, &args)
            },
            PaletteAction::NewFile => match prompter.prompt("New file name") {
                Some(name) => self.dispatch("new", &["file", name.as_str()]),
                None => CommandOutput::None,
            },
            PaletteAction::RunCurrent => self.dispatch("run", &[]),
            PaletteAction::OpenFile => match prompter.prompt("Open file") {
                Some(name) => self.dispatch("open", &[name.as_str()]),
                None => CommandOutput::None,
            },
            PaletteAction::DeleteFile => match prompter.prompt("Delete file") {
                Some(name) => self.dispatch("delete", &[name.as_str()]),
                None => CommandOutput::None,
            },
        }
    }

    // -- Sandbox output ----------------------------------------------------

    /// Move every queued sandbox message onto the console, in arrival order.
    pub fn pump_console(&mut self) -> usize {
        let messages = self.inbox.drain();
        let n = messages.len();
        for msg in messages {
            self.console.push(msg.into_line());
        }
        n
    }

    /// Wait for the current run to finish, then pump its output.
    pub fn wait_for_output(&mut self) -> usize {
        self.sandbox.wait();
        self.pump_console()
    }

    /// Cancel the current run, if any.
    pub fn stop_run(&mut self) {
        self.sandbox.stop();
    }

    // -- Editor and explorer -----------------------------------------------

    /// Write `content` to file `name` (editor save).
    pub fn save(&mut self, name: &str, content: &str) -> Arc<FileNode> {
        self.fs.upsert(name, content)
    }

    /// Switch to an open tab.
    pub fn select_tab(&mut self, name: &str) -> bool {
        let selected = self.files.select(name);
        if selected {
            self.wm.bring_to_front(WindowId::Editor);
        }
        selected
    }

    /// Content of the current tab, if it names an existing file.
    pub fn current_content(&self) -> Option<&str> {
        self.files.current().and_then(|name| self.fs.read(name))
    }

    // -- Windows -----------------------------------------------------------

    pub fn handle_input(&mut self, event: &InputEvent) -> WmEvent {
        self.wm.handle_input(event)
    }

    pub fn focus(&mut self, id: WindowId) {
        self.wm.bring_to_front(id);
    }

    /// Raise `id` and drag it by its origin to `to`. Returns the final
    /// position.
    pub fn move_window(&mut self, id: WindowId, to: Point) -> Point {
        self.wm.bring_to_front(id);
        let grab = self.wm.window(id).position;
        let mut drag = self.wm.begin_drag(id, grab);
        drag.move_to(to)
    }

    // -- Jobs --------------------------------------------------------------

    /// Run job `name` and open its artifact. A failure becomes one console
    /// error line and leaves the tree untouched.
    pub fn run_job(&mut self, name: &str) -> Option<String> {
        match self.jobs.run(name, &mut self.fs, self.clock.as_ref()) {
            Ok(artifact) => {
                self.files.open(&artifact);
                self.wm.bring_to_front(WindowId::Editor);
                Some(artifact)
            },
            Err(e) => {
                log::warn!("Job {name} failed: {e}");
                self.console
                    .error(format!("job {name} failed: {}", failure_reason(e)));
                None
            },
        }
    }

    /// Run every job in order, one console line per job plus a summary.
    pub fn run_pipeline(&mut self) -> Vec<StepReport> {
        let reports = self.jobs.run_all(&mut self.fs, self.clock.as_ref());
        for report in &reports {
            match &report.outcome {
                Ok(artifact) => self.console.log(format!("job {} wrote {artifact}", report.job)),
                Err(reason) => self
                    .console
                    .error(format!("job {} failed: {reason}", report.job)),
            }
        }
        let ok = reports.iter().filter(|r| r.succeeded()).count();
        self.console
            .log(format!("pipeline: {ok}/{} jobs succeeded", reports.len()));
        self.wm.bring_to_front(WindowId::Console);
        reports
    }

    // -- Accessors ---------------------------------------------------------

    pub fn fs(&self) -> &FsStore {
        &self.fs
    }

    pub fn root(&self) -> Arc<FileNode> {
        self.fs.root()
    }

    pub fn files(&self) -> &OpenFiles {
        &self.files
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    pub fn wm(&self) -> &WindowManager {
        &self.wm
    }

    pub fn sandbox(&self) -> &SandboxExecutor {
        &self.sandbox
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }
}

impl std::fmt::Debug for Desktop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Desktop")
            .field("fs", &self.fs)
            .field("files", &self.files)
            .field("console_lines", &self.console.len())
            .field("focused", &self.wm.focused())
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}
