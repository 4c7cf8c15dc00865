//! Scroll commands: new, open, delete, run.

use vx_types::error::{Result, VxError};
use vx_vfs::EntryKind;
use vx_wm::WindowId;

use crate::interpreter::{Command, CommandOutput, Environment};

/// First argument as a file name, `None` when it is blank.
fn name_arg<'a>(args: &[&'a str], at: usize, usage: &str) -> Result<Option<&'a str>> {
    let Some(name) = args.get(at) else {
        return Err(VxError::Command(format!("usage: {usage}")));
    };
    if args.len() > at + 1 {
        log::debug!("Ignoring extra arguments: {:?}", &args[at + 1..]);
    }
    if name.trim().is_empty() {
        log::debug!("Blank file name, skipping");
        return Ok(None);
    }
    Ok(Some(name))
}

// ---------------------------------------------------------------------------
// new
// ---------------------------------------------------------------------------

struct NewCmd;
impl Command for NewCmd {
    fn name(&self) -> &str {
        "new"
    }
    fn description(&self) -> &str {
        "Create an empty file and open it"
    }
    fn usage(&self) -> &str {
        "new file <name>"
    }
    fn category(&self) -> &str {
        "scroll"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if !args.first().is_some_and(|kind| kind.eq_ignore_ascii_case("file")) {
            return Err(VxError::Command(format!("usage: {}", self.usage())));
        }
        let Some(name) = name_arg(args, 1, self.usage())? else {
            return Ok(CommandOutput::Ignored);
        };
        if env.fs.root().child(name).map(|c| c.kind()) == Some(EntryKind::Folder) {
            return Err(VxError::Command(format!("{name} is a folder")));
        }
        env.fs.upsert(name, "");
        env.files.open(name);
        env.wm.bring_to_front(WindowId::Editor);
        Ok(CommandOutput::Created(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// open
// ---------------------------------------------------------------------------

struct OpenCmd;
impl Command for OpenCmd {
    fn name(&self) -> &str {
        "open"
    }
    fn description(&self) -> &str {
        "Open a file in the editor"
    }
    fn usage(&self) -> &str {
        "open <name>"
    }
    fn category(&self) -> &str {
        "scroll"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(name) = name_arg(args, 0, self.usage())? else {
            return Ok(CommandOutput::Ignored);
        };
        if !env.fs.exists(name) {
            log::debug!("Opening {name}, which does not exist yet");
        }
        env.files.open(name);
        env.wm.bring_to_front(WindowId::Editor);
        Ok(CommandOutput::Opened(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// delete
// ---------------------------------------------------------------------------

struct DeleteCmd;
impl Command for DeleteCmd {
    fn name(&self) -> &str {
        "delete"
    }
    fn description(&self) -> &str {
        "Delete a file and close its tab"
    }
    fn usage(&self) -> &str {
        "delete <name>"
    }
    fn category(&self) -> &str {
        "scroll"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(name) = name_arg(args, 0, self.usage())? else {
            return Ok(CommandOutput::Ignored);
        };
        env.fs.delete(name);
        env.files.close(name);
        Ok(CommandOutput::Deleted(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

struct RunCmd;
impl Command for RunCmd {
    fn name(&self) -> &str {
        "run"
    }
    fn description(&self) -> &str {
        "Run the current file in the sandbox"
    }
    fn usage(&self) -> &str {
        "run"
    }
    fn category(&self) -> &str {
        "scroll"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let current = env.files.current().map(str::to_string);
        let code = current
            .as_deref()
            .and_then(|name| env.fs.read(name))
            .unwrap_or_default()
            .to_string();
        env.console.clear();
        env.sandbox.run(&code)?;
        env.wm.bring_to_front(WindowId::Console);
        Ok(CommandOutput::Running(current))
    }
}

/// Register the scroll commands into a registry.
pub fn register_scroll_commands(reg: &mut crate::CommandRegistry) {
    reg.register(Box::new(NewCmd));
    reg.register(Box::new(OpenCmd));
    reg.register(Box::new(DeleteCmd));
    reg.register(Box::new(RunCmd));
}
