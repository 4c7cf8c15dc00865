//! File tree nodes and the pure copy-on-write operations over them.
//!
//! All operations work on the root folder's direct children. They never
//! mutate their input: the returned root is a fresh folder whose children
//! vector holds `Arc` clones of every untouched sibling.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use vx_types::error::{Result, VxError};

/// Name of the root folder.
pub const ROOT_NAME: &str = "root";

/// A node in the file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FileNode {
    Folder {
        name: String,
        children: Vec<Arc<FileNode>>,
    },
    File {
        name: String,
        content: String,
    },
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// A directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Content length in bytes (0 for folders).
    pub size: u64,
}

impl FileNode {
    pub fn file(name: impl Into<String>, content: impl Into<String>) -> Self {
        FileNode::File {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn folder(name: impl Into<String>, children: Vec<Arc<FileNode>>) -> Self {
        FileNode::Folder {
            name: name.into(),
            children,
        }
    }

    /// An empty root folder.
    pub fn empty_root() -> Self {
        Self::folder(ROOT_NAME, Vec::new())
    }

    pub fn name(&self) -> &str {
        match self {
            FileNode::Folder { name, .. } | FileNode::File { name, .. } => name,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            FileNode::Folder { .. } => EntryKind::Folder,
            FileNode::File { .. } => EntryKind::File,
        }
    }

    /// Children of a folder; empty for files.
    pub fn children(&self) -> &[Arc<FileNode>] {
        match self {
            FileNode::Folder { children, .. } => children,
            FileNode::File { .. } => &[],
        }
    }

    /// Direct child with the given name.
    pub fn child(&self, name: &str) -> Option<&Arc<FileNode>> {
        self.children().iter().find(|c| c.name() == name)
    }

    /// Check the tree invariants: the node is a folder named `root` and no
    /// folder anywhere holds two children with the same name.
    pub fn validate_root(&self) -> Result<()> {
        match self {
            FileNode::Folder { name, .. } if name == ROOT_NAME => check_unique(self),
            FileNode::Folder { name, .. } => {
                Err(VxError::Vfs(format!("root folder is named {name:?}")))
            },
            FileNode::File { .. } => Err(VxError::Vfs("root is a file".into())),
        }
    }
}

fn check_unique(node: &FileNode) -> Result<()> {
    let mut seen = HashSet::new();
    for child in node.children() {
        if !seen.insert(child.name()) {
            return Err(VxError::Vfs(format!(
                "duplicate name {:?} in folder {:?}",
                child.name(),
                node.name()
            )));
        }
        check_unique(child)?;
    }
    Ok(())
}

/// Content of the root-level file `name`, or `None` if there is no such file.
pub fn read<'a>(root: &'a FileNode, name: &str) -> Option<&'a str> {
    match root.child(name).map(|c| &**c) {
        Some(FileNode::File { content, .. }) => Some(content),
        _ => None,
    }
}

/// Return a new root where file `name` holds `content`.
///
/// An existing same-named file is replaced in place; otherwise the file is
/// appended. A same-named folder is left alone and the input root is
/// returned unchanged.
pub fn upsert(root: &Arc<FileNode>, name: &str, content: &str) -> Arc<FileNode> {
    let children = root.children();
    let fresh = Arc::new(FileNode::file(name, content));
    let new_children = match children.iter().position(|c| c.name() == name) {
        Some(i) => {
            if children[i].kind() == EntryKind::Folder {
                log::warn!("upsert: {name:?} is a folder, leaving it untouched");
                return Arc::clone(root);
            }
            let mut next: Vec<Arc<FileNode>> = children.to_vec();
            next[i] = fresh;
            next
        },
        None => {
            let mut next = Vec::with_capacity(children.len() + 1);
            next.extend(children.iter().map(Arc::clone));
            next.push(fresh);
            next
        },
    };
    Arc::new(FileNode::folder(root.name(), new_children))
}

/// Return a new root without the child `name`. Absent names return the
/// input root itself.
pub fn delete(root: &Arc<FileNode>, name: &str) -> Arc<FileNode> {
    let children = root.children();
    if !children.iter().any(|c| c.name() == name) {
        return Arc::clone(root);
    }
    let next = children
        .iter()
        .filter(|c| c.name() != name)
        .map(Arc::clone)
        .collect();
    Arc::new(FileNode::folder(root.name(), next))
}

/// Direct children of `root` as listing entries, in sibling order.
pub fn list(root: &FileNode) -> Vec<VfsEntry> {
    root.children()
        .iter()
        .map(|c| VfsEntry {
            name: c.name().to_string(),
            kind: c.kind(),
            size: match &**c {
                FileNode::File { content, .. } => content.len() as u64,
                FileNode::Folder { .. } => 0,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_with(files: &[(&str, &str)]) -> Arc<FileNode> {
        let mut root = Arc::new(FileNode::empty_root());
        for (name, content) in files {
            root = upsert(&root, name, content);
        }
        root
    }

    fn names(root: &FileNode) -> Vec<&str> {
        root.children().iter().map(|c| c.name()).collect()
    }

    #[test]
    fn upsert_appends_new_file() {
        let root = root_with(&[("a.js", "1"), ("b.md", "2")]);
        assert_eq!(names(&root), ["a.js", "b.md"]);
        assert_eq!(read(&root, "b.md"), Some("2"));
    }

    #[test]
    fn upsert_replaces_in_place() {
        let root = root_with(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let next = upsert(&root, "b", "changed");
        assert_eq!(names(&next), ["a", "b", "c"]);
        assert_eq!(read(&next, "b"), Some("changed"));
        // The old snapshot is untouched.
        assert_eq!(read(&root, "b"), Some("2"));
    }

    #[test]
    fn upsert_shares_untouched_siblings() {
        let root = root_with(&[("a", "1"), ("b", "2")]);
        let next = upsert(&root, "b", "3");
        assert!(Arc::ptr_eq(&root.children()[0], &next.children()[0]));
        assert!(!Arc::ptr_eq(&root.children()[1], &next.children()[1]));
    }

    #[test]
    fn upsert_over_folder_is_noop() {
        let root = Arc::new(FileNode::folder(
            ROOT_NAME,
            vec![Arc::new(FileNode::folder("docs", Vec::new()))],
        ));
        let next = upsert(&root, "docs", "text");
        assert!(Arc::ptr_eq(&root, &next));
        assert_eq!(read(&next, "docs"), None);
    }

    #[test]
    fn read_missing_is_none() {
        let root = root_with(&[("a", "1")]);
        assert_eq!(read(&root, "zzz"), None);
    }

    #[test]
    fn delete_removes_child() {
        let root = root_with(&[("a", "1"), ("b", "2")]);
        let next = delete(&root, "a");
        assert_eq!(names(&next), ["b"]);
    }

    #[test]
    fn delete_missing_returns_same_snapshot() {
        let root = root_with(&[("a", "1")]);
        let next = delete(&root, "nope");
        assert!(Arc::ptr_eq(&root, &next));
    }

    #[test]
    fn list_reports_sizes() {
        let root = root_with(&[("a", "hello")]);
        let entries = list(&root);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::File);
        assert_eq!(entries[0].size, 5);
    }

    #[test]
    fn serde_shape_is_tagged() {
        let root = root_with(&[("a", "x")]);
        let json = serde_json::to_value(root.as_ref()).unwrap();
        assert_eq!(json["kind"], "folder");
        assert_eq!(json["name"], "root");
        assert_eq!(json["children"][0]["kind"], "file");
        assert_eq!(json["children"][0]["content"], "x");
    }

    #[test]
    fn validate_rejects_duplicates() {
        let dup = FileNode::folder(
            ROOT_NAME,
            vec![
                Arc::new(FileNode::file("a", "")),
                Arc::new(FileNode::file("a", "")),
            ],
        );
        assert!(dup.validate_root().is_err());
    }

    #[test]
    fn validate_rejects_wrong_root() {
        assert!(FileNode::folder("home", Vec::new()).validate_root().is_err());
        assert!(FileNode::file("root", "").validate_root().is_err());
        assert!(FileNode::empty_root().validate_root().is_ok());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn distinct_upserts_keep_both_in_order(
                a in "[a-z]{1,8}",
                b in "[a-z]{1,8}",
                x in ".{0,16}",
                y in ".{0,16}",
            ) {
                prop_assume!(a != b);
                let base = root_with(&[("seed.js", "s")]);
                let one = upsert(&base, &a, &x);
                let two = upsert(&one, &b, &y);
                prop_assert_eq!(read(&two, &a), Some(x.as_str()));
                prop_assert_eq!(read(&two, &b), Some(y.as_str()));
                let order = names(&two);
                let ia = order.iter().position(|n| *n == a).unwrap();
                let ib = order.iter().position(|n| *n == b).unwrap();
                prop_assert!(ia < ib);
            }

            #[test]
            fn reupsert_keeps_position(
                existing in proptest::collection::vec("[a-z]{1,6}", 0..6),
                name in "[A-Z]{1,6}",
                x in ".{0,8}",
                y in ".{0,8}",
            ) {
                let mut root = Arc::new(FileNode::empty_root());
                for n in &existing {
                    root = upsert(&root, n, "");
                }
                let first = upsert(&root, &name, &x);
                let pos = names(&first).iter().position(|n| *n == name);
                let second = upsert(&first, &name, &y);
                prop_assert_eq!(read(&second, &name), Some(y.as_str()));
                prop_assert_eq!(names(&second).iter().position(|n| *n == name), pos);
                prop_assert_eq!(second.children().len(), first.children().len());
            }

            #[test]
            fn delete_after_upsert_restores_children(
                existing in proptest::collection::btree_set("[a-z]{1,6}", 0..6),
                name in "[a-z]{1,6}",
            ) {
                let mut root = Arc::new(FileNode::empty_root());
                for n in &existing {
                    root = upsert(&root, n, "c");
                }
                let after = delete(&upsert(&root, &name, "x"), &name);
                let expected: Vec<&str> =
                    names(&root).into_iter().filter(|n| *n != name).collect();
                prop_assert_eq!(names(&after), expected);
            }

            #[test]
            fn read_absent_for_unknown_names(
                existing in proptest::collection::btree_set("[a-z]{1,6}", 0..6),
                missing in "[0-9]{1,4}",
            ) {
                let mut root = Arc::new(FileNode::empty_root());
                for n in &existing {
                    root = upsert(&root, n, "c");
                }
                prop_assert_eq!(read(&root, &missing), None);
            }
        }
    }
}
