//! Flattening of the relevant-files tree into a displayable list.

use crate::language::language_for;
use crate::protocol::{FileNode, FileTree, KeySection};
use serde::{Deserialize, Serialize};

/// A relevant file lifted out of the tree, ready for list display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatFile {
    /// Slash-joined names from the tree root down to the file.
    pub path: String,
    pub reason: String,
    pub sections: Vec<KeySection>,
}

impl FlatFile {
    pub fn language(&self) -> &'static str {
        language_for(&self.path)
    }

    /// Short list badge, e.g. `2 key section(s)`. `None` when there are none.
    pub fn section_label(&self) -> Option<String> {
        if self.sections.is_empty() {
            None
        } else {
            Some(format!("{} key section(s)", self.sections.len()))
        }
    }
}

/// Flatten a relevant-files tree, depth-first in payload order.
///
/// Only `file` nodes with a non-empty reason are emitted. Directories are
/// walked but never emitted themselves; unrecognised nodes are skipped.
pub fn flatten(root: &FileTree) -> Vec<FlatFile> {
    flatten_under(root, "")
}

/// Like [`flatten`], with every emitted path prefixed by `base_path`.
pub fn flatten_under(root: &FileTree, base_path: &str) -> Vec<FlatFile> {
    let mut out = Vec::new();
    collect(root, base_path, &mut out);
    out
}

fn collect(level: &FileTree, base_path: &str, out: &mut Vec<FlatFile>) {
    for (name, node) in level {
        let current = join_path(base_path, name);
        match node {
            FileNode::File(entry) => {
                if let Some(reason) = entry.reason.as_deref().filter(|r| !r.is_empty()) {
                    out.push(FlatFile {
                        path: current,
                        reason: reason.to_string(),
                        sections: entry.key_sections.clone(),
                    });
                }
            }
            FileNode::Directory(dir) => {
                if let Some(children) = &dir.children {
                    collect(children, &current, out);
                }
            }
            FileNode::Unknown { .. } => {}
        }
    }
}

fn join_path(base_path: &str, name: &str) -> String {
    if base_path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base_path, name)
    }
}
