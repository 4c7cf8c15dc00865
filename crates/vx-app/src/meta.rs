//! `:`-prefixed view commands.

use std::io::{self, Write};

use vx_core::error::{Result, VxError};
use vx_core::terminal::tokenize;
use vx_core::wm::{Point, WindowId};
use vx_core::{Desktop, Prompter};

use crate::view;

const HELP: &str = "\
Scroll commands:
  new file <name>     create an empty file and open it
  open <name>         open a file in the editor
  delete <name>       delete a file and close its tab
  run                 run the current file
View commands:
  :ls                 list files (> current, * open)
  :cat [name]         show a file (default: current tab)
  :write <name> <text...>  save text into a file
  :tab <name>         switch to an open tab
  :focus <window>     raise explorer, editor, console, or jobs
  :drag <window> <x> <y>   move a window
  :windows            show the window stack
  :palette [query]    list palette entries
  :pick [query]       run the first palette entry
  :jobs               list jobs
  :job <name>         run a job and open its output
  :pipeline           run every job in order
  :clear              clear the console
  :quit               exit";

/// Whether the loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Meta {
    Help,
    Ls,
    Cat(Option<String>),
    Write { name: String, text: String },
    Tab(String),
    Focus(WindowId),
    Drag { id: WindowId, x: i32, y: i32 },
    Windows,
    Palette(String),
    Pick(String),
    Jobs,
    Job(String),
    Pipeline,
    Clear,
    Quit,
}

fn usage(text: &str) -> VxError {
    VxError::Command(format!("usage: :{text}"))
}

/// `input` with its first `words` whitespace-separated words removed.
fn raw_tail(input: &str, words: usize) -> &str {
    let mut tail = input.trim();
    for _ in 0..words {
        tail = tail
            .split_once(char::is_whitespace)
            .map_or("", |(_, r)| r.trim_start());
    }
    tail.trim_end()
}

fn coord(s: &str) -> Result<i32> {
    s.parse()
        .map_err(|_| VxError::Command(format!("not a coordinate: {s}")))
}

impl Meta {
    /// Parse the text after the leading `:`.
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let Some((cmd, args)) = tokens.split_first() else {
            return Ok(Meta::Help);
        };
        let rest = || raw_tail(input, 1).to_string();
        let meta = match (cmd.as_str(), args) {
            ("help" | "h" | "?", _) => Meta::Help,
            ("ls", _) => Meta::Ls,
            ("cat", []) => Meta::Cat(None),
            ("cat", [name]) => Meta::Cat(Some(name.clone())),
            ("cat", _) => return Err(usage("cat [name]")),
            ("write", [name, ..]) => Meta::Write {
                name: name.clone(),
                text: raw_tail(input, 2).replace("\\n", "\n"),
            },
            ("write", _) => return Err(usage("write <name> <text...>")),
            ("tab", [name]) => Meta::Tab(name.clone()),
            ("tab", _) => return Err(usage("tab <name>")),
            ("focus", [id]) => Meta::Focus(id.parse()?),
            ("focus", _) => return Err(usage("focus <window>")),
            ("drag", [id, x, y]) => Meta::Drag {
                id: id.parse()?,
                x: coord(x)?,
                y: coord(y)?,
            },
            ("drag", _) => return Err(usage("drag <window> <x> <y>")),
            ("windows" | "win", _) => Meta::Windows,
            ("palette" | "p", _) => Meta::Palette(rest()),
            ("pick", _) => Meta::Pick(rest()),
            ("jobs", _) => Meta::Jobs,
            ("job", [name]) => Meta::Job(name.clone()),
            ("job", _) => return Err(usage("job <name>")),
            ("pipeline" | "all", _) => Meta::Pipeline,
            ("clear", _) => Meta::Clear,
            ("quit" | "q" | "exit", _) => Meta::Quit,
            (other, _) => {
                return Err(VxError::Command(format!(
                    "Unknown view command: :{other} (try :help)"
                )));
            },
        };
        Ok(meta)
    }

    /// Carry out the command against `desktop`, writing any view to `out`.
    pub fn apply(
        &self,
        desktop: &mut Desktop,
        out: &mut impl Write,
        prompter: &mut dyn Prompter,
    ) -> io::Result<Flow> {
        match self {
            Meta::Help => writeln!(out, "{HELP}")?,
            Meta::Ls => view::write_listing(&desktop.fs().list(), desktop.files(), out)?,
            Meta::Cat(name) => {
                let name = name.as_deref().or(desktop.files().current());
                match name.and_then(|n| desktop.fs().read(n).map(|c| (n, c))) {
                    Some((n, content)) => {
                        writeln!(out, "-- {n} --")?;
                        writeln!(out, "{content}")?;
                    },
                    None => writeln!(out, "(no such file)")?,
                }
            },
            Meta::Write { name, text } => {
                desktop.save(name, text);
                writeln!(out, "saved {name} ({} bytes)", text.len())?;
            },
            Meta::Tab(name) => {
                if !desktop.select_tab(name) {
                    writeln!(out, "{name} is not open")?;
                }
            },
            Meta::Focus(id) => desktop.focus(*id),
            Meta::Drag { id, x, y } => {
                let pos = desktop.move_window(*id, Point::new(*x, *y));
                writeln!(out, "{id} at {},{}", pos.x, pos.y)?;
            },
            Meta::Windows => view::write_windows(desktop.wm(), out)?,
            Meta::Palette(query) => view::write_palette(&desktop.palette(query), out)?,
            Meta::Pick(query) => {
                let entries = desktop.palette(query);
                match entries.first() {
                    Some(entry) => {
                        writeln!(out, "> {}", entry.label)?;
                        desktop.invoke(entry, prompter);
                        desktop.wait_for_output();
                    },
                    None => writeln!(out, "(no matches)")?,
                }
            },
            Meta::Jobs => {
                for (name, description) in desktop.jobs().list() {
                    writeln!(out, "{name:<14} {description}")?;
                }
            },
            Meta::Job(name) => {
                if let Some(artifact) = desktop.run_job(name) {
                    writeln!(out, "wrote {artifact}")?;
                }
            },
            Meta::Pipeline => {
                let reports = desktop.run_pipeline();
                let ok = reports.iter().filter(|r| r.succeeded()).count();
                writeln!(out, "{ok}/{} jobs succeeded", reports.len())?;
            },
            Meta::Clear => desktop.clear_console(),
            Meta::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vx_core::config::VxConfig;
    use vx_core::vfs::MemoryKvStore;

    fn desktop() -> Desktop {
        let mut d = Desktop::boot(&VxConfig::default(), Box::new(MemoryKvStore::new()));
        d.install_dispatcher(vx_core::terminal::scroll_registry());
        d
    }

    fn apply(d: &mut Desktop, line: &str) -> String {
        let mut out = Vec::new();
        let mut answer = |_: &str| Some("picked.js".to_string());
        Meta::parse(line)
            .unwrap()
            .apply(d, &mut out, &mut answer)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parse_basics() {
        assert_eq!(Meta::parse("").unwrap(), Meta::Help);
        assert_eq!(Meta::parse("ls").unwrap(), Meta::Ls);
        assert_eq!(Meta::parse("q").unwrap(), Meta::Quit);
        assert_eq!(
            Meta::parse("focus Console").unwrap(),
            Meta::Focus(WindowId::Console)
        );
        assert_eq!(
            Meta::parse("drag jobs 10 -4").unwrap(),
            Meta::Drag {
                id: WindowId::Jobs,
                x: 10,
                y: -4
            }
        );
    }

    #[test]
    fn parse_errors() {
        assert!(Meta::parse("focus desk").is_err());
        assert!(Meta::parse("drag jobs x 1").is_err());
        assert!(Meta::parse("tab").is_err());
        assert!(Meta::parse("frobnicate").is_err());
    }

    #[test]
    fn raw_tail_skips_words() {
        assert_eq!(raw_tail("  write a.js  x  y ", 2), "x  y");
        assert_eq!(raw_tail("pick", 1), "");
    }

    #[test]
    fn palette_query_keeps_spacing() {
        assert_eq!(
            Meta::parse("palette scroll: new file \"a b\"").unwrap(),
            Meta::Palette("scroll: new file \"a b\"".into())
        );
        assert_eq!(Meta::parse("pick").unwrap(), Meta::Pick(String::new()));
    }

    #[test]
    fn write_then_cat() {
        let mut d = desktop();
        apply(&mut d, "write hello.js console.log(1)\\nconsole.log(2)");
        assert_eq!(d.fs().read("hello.js"), Some("console.log(1)\nconsole.log(2)"));
        let out = apply(&mut d, "cat hello.js");
        assert!(out.starts_with("-- hello.js --\n"));
        assert_eq!(apply(&mut d, "cat ghost.js"), "(no such file)\n");
    }

    #[test]
    fn cat_defaults_to_current_tab() {
        let mut d = desktop();
        d.dispatch_line("open README.md");
        assert!(apply(&mut d, "cat").starts_with("-- README.md --"));
    }

    #[test]
    fn pick_prompts_and_dispatches() {
        let mut d = desktop();
        let out = apply(&mut d, "pick new");
        assert_eq!(out, "> New file\n");
        assert!(d.fs().exists("picked.js"));
        assert_eq!(d.files().current(), Some("picked.js"));
    }

    #[test]
    fn drag_and_windows() {
        let mut d = desktop();
        assert_eq!(apply(&mut d, "drag editor 5 6"), "editor at 5,6\n");
        let out = apply(&mut d, "windows");
        assert!(out.lines().next().unwrap().starts_with("editor"));
    }

    #[test]
    fn failed_job_reports_on_console() {
        let mut d = desktop();
        assert_eq!(apply(&mut d, "job seal"), "");
        assert_eq!(d.console().error_count(), 1);
    }

    #[test]
    fn pipeline_runs_every_job() {
        let mut d = desktop();
        assert_eq!(Meta::parse("pipeline").unwrap(), Meta::Pipeline);
        assert_eq!(apply(&mut d, "pipeline"), "4/5 jobs succeeded\n");
        assert_eq!(d.console().error_count(), 1);
        assert!(d.fs().exists("VX_OMNIFLOW.json"));
    }

    #[test]
    fn quit_stops_loop() {
        let mut d = desktop();
        let mut out = Vec::new();
        let flow = Meta::Quit
            .apply(&mut d, &mut out, &mut |_: &str| None::<String>)
            .unwrap();
        assert_eq!(flow, Flow::Quit);
    }
}
