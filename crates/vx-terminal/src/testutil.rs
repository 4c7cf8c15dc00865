//! Shared fixture for command tests.

use vx_sandbox::{Inbox, SandboxExecutor};
use vx_types::config::SandboxConfig;
use vx_types::console::Console;
use vx_vfs::{FsStore, MemoryKvStore};
use vx_wm::WindowManager;

use crate::interpreter::Environment;
use crate::session::OpenFiles;

pub struct Fixture {
    pub fs: FsStore,
    pub files: OpenFiles,
    pub console: Console,
    pub sandbox: SandboxExecutor,
    pub inbox: Inbox,
    pub wm: WindowManager,
}

impl Fixture {
    pub fn new() -> Self {
        let (outbox, inbox) = vx_sandbox::channel();
        Self {
            fs: FsStore::load(Box::new(MemoryKvStore::new()), "vx_os_fs"),
            files: OpenFiles::new(),
            console: Console::new(),
            sandbox: SandboxExecutor::new(&SandboxConfig::default(), outbox),
            inbox,
            wm: WindowManager::new(),
        }
    }

    pub fn env(&mut self) -> Environment<'_> {
        Environment {
            fs: &mut self.fs,
            files: &mut self.files,
            console: &mut self.console,
            sandbox: &mut self.sandbox,
            wm: &mut self.wm,
        }
    }
}
