//! Virtual filesystem for VX_OS.
//!
//! The tree is an immutable value: every mutation builds a new root that
//! shares untouched subtrees with the previous one through `Arc`. The
//! [`FsStore`] owns the canonical root and writes the whole tree into a single
//! slot of a [`KvStore`] after each mutation.

pub mod kv;
pub mod node;
pub mod seed;
pub mod store;

pub use kv::{FileKvStore, KvStore, MemoryKvStore};
pub use node::{EntryKind, FileNode, VfsEntry};
pub use store::FsStore;
