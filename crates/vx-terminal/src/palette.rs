//! Command palette: catalog filtering and `scroll:` passthrough.

use crate::interpreter::tokenize;

/// Prefix that turns a palette query into a raw scroll command.
pub const SCROLL_PREFIX: &str = "scroll:";

/// What selecting a palette entry does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteAction {
    /// Dispatch a scroll command directly.
    Execute { command: String, args: Vec<String> },
    /// Prompt for a name, then `new file <name>`.
    NewFile,
    /// `run`.
    RunCurrent,
    /// Prompt for a name, then `open <name>`.
    OpenFile,
    /// Prompt for a name, then `delete <name>`.
    DeleteFile,
}

/// One row in the palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    pub label: String,
    pub action: PaletteAction,
}

impl PaletteEntry {
    fn new(label: &str, action: PaletteAction) -> Self {
        Self {
            label: label.to_string(),
            action,
        }
    }
}

/// The fixed catalog, in display order.
pub fn catalog() -> Vec<PaletteEntry> {
    vec![
        PaletteEntry::new("New file", PaletteAction::NewFile),
        PaletteEntry::new("Run current file", PaletteAction::RunCurrent),
        PaletteEntry::new("Open file\u{2026}", PaletteAction::OpenFile),
        PaletteEntry::new("Delete file\u{2026}", PaletteAction::DeleteFile),
    ]
}

/// Entries matching `query`.
///
/// A query starting with the exact, lowercase `scroll:` prefix yields one
/// execute entry. Anything else filters the catalog by label,
/// case-insensitively; an empty query keeps all.
pub fn query(q: &str) -> Vec<PaletteEntry> {
    let trimmed = q.trim_start();
    if let Some(rest) = trimmed.strip_prefix(SCROLL_PREFIX) {
        return vec![scroll_entry(rest.trim())];
    }
    let needle = q.trim().to_lowercase();
    catalog()
        .into_iter()
        .filter(|e| e.label.to_lowercase().contains(&needle))
        .collect()
}

fn scroll_entry(rest: &str) -> PaletteEntry {
    let mut words = tokenize(rest).unwrap_or_else(|e| {
        log::debug!("Palette query {rest:?} did not tokenize ({e}), splitting on whitespace");
        rest.split_whitespace().map(str::to_string).collect()
    });
    let command = if words.is_empty() {
        String::new()
    } else {
        words.remove(0)
    };
    PaletteEntry {
        label: format!("{SCROLL_PREFIX} {rest}"),
        action: PaletteAction::Execute {
            command,
            args: words,
        },
    }
}
