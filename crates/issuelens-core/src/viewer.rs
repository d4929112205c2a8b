//! File-viewer projection: what the code pane shows for a selected file.

use crate::language::{comment_prefix, PLAINTEXT};
use crate::protocol::KeySection;
use crate::tree::FlatFile;

const NO_SELECTION_TITLE: &str = "Select a file";
const NO_CONTENT: &str = "Code content not available for this file";

/// Read-only document for the code pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerDocument {
    pub title: String,
    pub language: &'static str,
    pub body: String,
}

impl ViewerDocument {
    pub fn for_file(file: Option<&FlatFile>) -> Self {
        let Some(file) = file else {
            return Self {
                title: NO_SELECTION_TITLE.to_string(),
                language: PLAINTEXT,
                body: format!("{} {}", comment_prefix(PLAINTEXT), NO_CONTENT),
            };
        };

        let language = file.language();
        let comment = comment_prefix(language);
        let body = if file.sections.is_empty() {
            format!("{} {}", comment, NO_CONTENT)
        } else {
            file.sections
                .iter()
                .map(|section| render_section(comment, section))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        Self {
            title: file.path.clone(),
            language,
            body,
        }
    }
}

fn render_section(comment: &str, section: &KeySection) -> String {
    format!(
        "{} Lines {}-{}: {}\n{}",
        comment, section.line_start, section.line_end, section.explanation, section.code
    )
}

/// Which flattened file the results view currently shows.
///
/// Starts on the first file; invalid selections leave it where it was.
#[derive(Debug, Clone)]
pub struct FileSelection<'a> {
    files: &'a [FlatFile],
    selected: Option<usize>,
}

impl<'a> FileSelection<'a> {
    pub fn new(files: &'a [FlatFile]) -> Self {
        let selected = if files.is_empty() { None } else { Some(0) };
        Self { files, selected }
    }

    pub fn files(&self) -> &'a [FlatFile] {
        self.files
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&'a FlatFile> {
        self.selected.and_then(|idx| self.files.get(idx))
    }

    /// Select by zero-based position. Returns false if out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.files.len() {
            self.selected = Some(index);
            true
        } else {
            false
        }
    }

    /// Select the first file with exactly this path. Returns false if absent.
    pub fn select_path(&mut self, path: &str) -> bool {
        match self.files.iter().position(|f| f.path == path) {
            Some(idx) => {
                self.selected = Some(idx);
                true
            }
            None => false,
        }
    }

    pub fn document(&self) -> ViewerDocument {
        ViewerDocument::for_file(self.selected())
    }
}
