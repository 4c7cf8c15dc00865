//! Default tree used on first run and whenever persisted state is unusable.

use std::sync::Arc;

use crate::node::{FileNode, ROOT_NAME};

/// Name of the seeded code file.
pub const SEED_CODE_NAME: &str = "main.js";
/// Name of the seeded documentation file.
pub const SEED_DOC_NAME: &str = "README.md";

pub const SEED_CODE: &str = "\
// Welcome to VX:OS. Type `run` to execute the current file.
const system = { name: \"VX:OS\", ready: true, windows: 4 };
console.log(\"Hello from the VX sandbox\");
console.log(system);
";

pub const SEED_DOC: &str = "\
# VX:OS

Scroll commands:

- `new file <name>` creates an empty file and opens it
- `open <name>` opens a file in the editor
- `delete <name>` removes a file and closes its tab
- `run` executes the current file in the sandbox

Palette queries starting with `scroll:` run a scroll command directly.
";

/// Build the seeded default tree.
pub fn default_tree() -> Arc<FileNode> {
    Arc::new(FileNode::folder(
        ROOT_NAME,
        vec![
            Arc::new(FileNode::file(SEED_CODE_NAME, SEED_CODE)),
            Arc::new(FileNode::file(SEED_DOC_NAME, SEED_DOC)),
        ],
    ))
}
