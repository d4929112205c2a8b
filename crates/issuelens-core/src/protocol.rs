//! Wire model for the issue analysis service.
//!
//! The service has shipped a lean and a rich variant of this payload, so
//! everything below the three top-level blocks defaults when absent.

use crate::tree::{flatten, FlatFile};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entries of a relevant-files level, in the order the service sent them.
pub type FileTree = IndexMap<String, FileNode>;

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub github_url: String,
}

impl AnalysisRequest {
    pub fn new(github_url: impl Into<String>) -> Self {
        Self {
            github_url: github_url.into(),
        }
    }
}

/// Annotated, inclusive line range inside a relevant file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySection {
    pub line_start: u32,
    pub line_end: u32,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub explanation: String,
}

/// A node of the relevant-files tree.
///
/// The wire discriminant is `type` (`kind` is accepted too). Anything that is
/// not a well-formed `file` or `directory` object, including non-object
/// values and non-string discriminants, deserializes as
/// [`FileNode::Unknown`] so one odd node never fails the whole payload.
/// Fields are only read once the discriminant is known; a file's malformed
/// key sections are dropped one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "WireFileNode")]
pub enum FileNode {
    File(FileEntry),
    Directory(DirectoryEntry),
    Unknown { kind: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileEntry {
    pub reason: Option<String>,
    /// Only sent by the lean payload variant, 0.0 to 1.0.
    pub relevance_score: Option<f64>,
    pub key_sections: Vec<KeySection>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectoryEntry {
    pub children: Option<FileTree>,
}

impl FileNode {
    pub fn file(reason: impl Into<String>) -> Self {
        FileNode::File(FileEntry {
            reason: Some(reason.into()),
            ..FileEntry::default()
        })
    }

    pub fn directory(children: FileTree) -> Self {
        FileNode::Directory(DirectoryEntry {
            children: Some(children),
        })
    }
}

const FILE_KIND: &str = "file";
const DIRECTORY_KIND: &str = "directory";

#[derive(Serialize)]
struct WireFileNode {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relevance_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    key_sections: Option<Vec<KeySection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<FileTree>,
}

impl From<Value> for FileNode {
    fn from(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return FileNode::Unknown { kind: None };
        };
        let kind = take_string(&mut fields, "type").or_else(|| take_string(&mut fields, "kind"));
        match kind.as_deref() {
            Some(FILE_KIND) => FileNode::File(FileEntry {
                reason: take_string(&mut fields, "reason"),
                relevance_score: fields.get("relevance_score").and_then(Value::as_f64),
                key_sections: fields
                    .remove("key_sections")
                    .map(lenient_sections)
                    .unwrap_or_default(),
            }),
            Some(DIRECTORY_KIND) => FileNode::Directory(DirectoryEntry {
                children: fields
                    .remove("files")
                    .or_else(|| fields.remove("children"))
                    .and_then(lenient_tree),
            }),
            _ => FileNode::Unknown { kind },
        }
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

fn lenient_sections(value: Value) -> Vec<KeySection> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn lenient_tree(value: Value) -> Option<FileTree> {
    match value {
        Value::Object(entries) => Some(
            entries
                .into_iter()
                .map(|(name, node)| (name, FileNode::from(node)))
                .collect(),
        ),
        _ => None,
    }
}

impl From<FileNode> for WireFileNode {
    fn from(node: FileNode) -> Self {
        match node {
            FileNode::File(entry) => WireFileNode {
                kind: Some(FILE_KIND.to_string()),
                relevance_score: entry.relevance_score,
                reason: entry.reason,
                key_sections: Some(entry.key_sections),
                files: None,
            },
            FileNode::Directory(dir) => WireFileNode {
                kind: Some(DIRECTORY_KIND.to_string()),
                relevance_score: None,
                reason: None,
                key_sections: None,
                files: dir.children,
            },
            FileNode::Unknown { kind } => WireFileNode {
                kind,
                relevance_score: None,
                reason: None,
                key_sections: None,
                files: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueSummary {
    pub title: String,
    pub description: String,
    pub labels: Vec<String>,
    /// Usually `open` or `closed`.
    pub status: String,
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectContext {
    pub overview: String,
    pub architecture_overview: String,
    /// Directory path to a one-line description.
    pub main_directories: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildAndTest {
    pub setup_commands: Vec<String>,
    pub build_commands: Vec<String>,
    pub test_commands: Vec<String>,
    pub lint_commands: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub development_server: Option<String>,
    pub environment_requirements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    /// bug / feature / enhancement
    pub problem_type: String,
    /// low / medium / high
    pub complexity: String,
    pub affected_components: Vec<String>,
    pub implementation_steps: Vec<String>,
    pub dependencies: Vec<String>,
    pub tests_needed: Vec<String>,
    pub potential_risks: Vec<String>,
    pub related_documentation: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_approach: Option<String>,
}

/// Full structured result of analyzing one GitHub issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub issue_summary: IssueSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_context: Option<ProjectContext>,
    pub relevant_files: FileTree,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_and_test: Option<BuildAndTest>,
    pub analysis: Analysis,
}

/// A successful analysis: the record plus its flattened relevant files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedIssue {
    pub analysis: AnalysisRecord,
    pub flattened_files: Vec<FlatFile>,
}

impl From<AnalysisRecord> for AnalyzedIssue {
    fn from(analysis: AnalysisRecord) -> Self {
        let flattened_files = flatten(&analysis.relevant_files);
        Self {
            analysis,
            flattened_files,
        }
    }
}
