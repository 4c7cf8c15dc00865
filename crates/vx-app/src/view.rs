//! Text renderings of the desktop views.

use std::io::{self, Write};

use vx_core::console::{Console, LogKind};
use vx_core::terminal::{OpenFiles, PaletteEntry};
use vx_core::vfs::{EntryKind, VfsEntry};
use vx_core::wm::WindowManager;

/// Prints console lines that have not been shown yet.
#[derive(Debug, Default)]
pub struct ConsoleView {
    printed: usize,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush(&mut self, console: &Console, out: &mut impl Write) -> io::Result<()> {
        if console.len() < self.printed {
            // Cleared since the last flush.
            self.printed = 0;
        }
        for line in &console.lines()[self.printed..] {
            match line.kind {
                LogKind::Log => writeln!(out, "{}", line.text)?,
                LogKind::Error => writeln!(out, "! {}", line.text)?,
            }
        }
        self.printed = console.len();
        Ok(())
    }
}

/// Explorer: one row per root entry, `*` marking open tabs.
pub fn write_listing(entries: &[VfsEntry], files: &OpenFiles, out: &mut impl Write) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "(empty)");
    }
    for e in entries {
        let mark = if files.current() == Some(e.name.as_str()) {
            '>'
        } else if files.contains(&e.name) {
            '*'
        } else {
            ' '
        };
        match e.kind {
            EntryKind::File => writeln!(out, "{mark} {:<28} {:>8} B", e.name, e.size)?,
            EntryKind::Folder => writeln!(out, "{mark} {}/", e.name)?,
        }
    }
    Ok(())
}

/// Window stack from top to bottom.
pub fn write_windows(wm: &WindowManager, out: &mut impl Write) -> io::Result<()> {
    for id in wm.z_order().iter().rev() {
        let w = wm.window(*id);
        let focus = if wm.is_focused(*id) { " (focused)" } else { "" };
        writeln!(
            out,
            "{:<10} {:>5},{:<5} {}x{}{focus}",
            id.as_str(),
            w.position.x,
            w.position.y,
            w.size.w,
            w.size.h
        )?;
    }
    Ok(())
}

pub fn write_palette(entries: &[PaletteEntry], out: &mut impl Write) -> io::Result<()> {
    if entries.is_empty() {
        return writeln!(out, "(no matches)");
    }
    for (i, e) in entries.iter().enumerate() {
        writeln!(out, "{:>2}. {}", i + 1, e.label)?;
    }
    Ok(())
}
