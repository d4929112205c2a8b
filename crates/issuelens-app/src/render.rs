//! Plain-text views of an analysis.

use issuelens_core::protocol::{AnalyzedIssue, BuildAndTest, ProjectContext};
use issuelens_core::tree::FlatFile;
use issuelens_core::viewer::ViewerDocument;

/// Short report printed right after `analyze`.
pub fn overview(issue: &AnalyzedIssue) -> String {
    let summary = &issue.analysis.issue_summary;
    let mut lines = vec![
        String::new(),
        format!("  {}", display_or(&summary.title, "(untitled issue)")),
        format!(
            "  Status: {}  Type: {}  Complexity: {}",
            display_or(&summary.status, "-"),
            display_or(&issue.analysis.analysis.problem_type, "-"),
            display_or(&issue.analysis.analysis.complexity, "-"),
        ),
        String::new(),
    ];
    lines.push(file_list(&issue.flattened_files));
    lines.push("  Next: `issuelens summary`, `issuelens view <N>`".to_string());
    lines.join("\n") + "\n"
}

/// Full summary: issue, project context, build & development, implementation guide.
pub fn summary(issue: &AnalyzedIssue) -> String {
    let record = &issue.analysis;
    let summary = &record.issue_summary;
    let analysis = &record.analysis;
    let mut lines = Vec::new();

    lines.push(format!("  {}", display_or(&summary.title, "(untitled issue)")));
    lines.push(String::new());

    lines.push("  Issue Summary".to_string());
    push_field(&mut lines, "Description", &summary.description);
    lines.push(format!(
        "    Status: {}  Type: {}  Complexity: {}",
        display_or(&summary.status, "-"),
        display_or(&analysis.problem_type, "-"),
        display_or(&analysis.complexity, "-"),
    ));
    push_inline_list(&mut lines, "Labels", &summary.labels);
    push_inline_list(&mut lines, "Assignees", &summary.assignees);

    if let Some(context) = &record.project_context {
        lines.push(String::new());
        push_project_context(&mut lines, context);
    }

    if let Some(build) = &record.build_and_test {
        lines.push(String::new());
        push_build_and_test(&mut lines, build);
    }

    lines.push(String::new());
    lines.push("  Implementation Guide".to_string());
    if let Some(approach) = &analysis.suggested_approach {
        push_field(&mut lines, "Suggested Approach", approach);
    }
    if !analysis.implementation_steps.is_empty() {
        lines.push("    Implementation Steps:".to_string());
        for (idx, step) in analysis.implementation_steps.iter().enumerate() {
            lines.push(format!("      {}. {}", idx + 1, step));
        }
    }
    push_inline_list(&mut lines, "Affected Components", &analysis.affected_components);
    push_inline_list(&mut lines, "Dependencies", &analysis.dependencies);
    push_bullets(&mut lines, "Tests Needed", "-", &analysis.tests_needed);
    push_bullets(&mut lines, "Potential Risks", "!", &analysis.potential_risks);
    push_bullets(
        &mut lines,
        "Related Documentation",
        "-",
        &analysis.related_documentation,
    );

    lines.join("\n") + "\n"
}

fn push_project_context(lines: &mut Vec<String>, context: &ProjectContext) {
    lines.push("  Project Context".to_string());
    push_field(lines, "Overview", &context.overview);
    push_field(lines, "Architecture", &context.architecture_overview);
    if !context.main_directories.is_empty() {
        lines.push("    Key Directories:".to_string());
        for (dir, description) in &context.main_directories {
            lines.push(format!("      {} - {}", dir, description));
        }
    }
}

fn push_build_and_test(lines: &mut Vec<String>, build: &BuildAndTest) {
    lines.push("  Build & Development".to_string());
    push_bullets(lines, "Setup Commands", "$", &build.setup_commands);
    push_bullets(lines, "Build Commands", "$", &build.build_commands);
    push_bullets(lines, "Test Commands", "$", &build.test_commands);
    push_bullets(lines, "Lint Commands", "$", &build.lint_commands);
    if let Some(server) = &build.development_server {
        push_field(lines, "Dev Server", server);
    }
    push_bullets(
        lines,
        "Environment",
        "-",
        &build.environment_requirements,
    );
}

/// `Relevant Files (N)` followed by one numbered entry per file.
pub fn file_list(files: &[FlatFile]) -> String {
    if files.is_empty() {
        return "  No relevant files were identified.\n".to_string();
    }
    let mut lines = vec![format!("  Relevant Files ({})", files.len())];
    for (idx, file) in files.iter().enumerate() {
        lines.push(format!("    {:>2}. {}", idx + 1, file.path));
        lines.push(format!("        {}", file.reason));
        if let Some(label) = file.section_label() {
            lines.push(format!("        {}", label));
        }
    }
    lines.join("\n") + "\n"
}

pub fn document(doc: &ViewerDocument) -> String {
    format!("  {} [{}]\n\n{}\n", doc.title, doc.language, doc.body)
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

fn push_field(lines: &mut Vec<String>, label: &str, value: &str) {
    if !value.trim().is_empty() {
        lines.push(format!("    {}: {}", label, value));
    }
}

fn push_inline_list(lines: &mut Vec<String>, label: &str, items: &[String]) {
    if !items.is_empty() {
        lines.push(format!("    {}: {}", label, items.join(", ")));
    }
}

fn push_bullets(lines: &mut Vec<String>, label: &str, marker: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    lines.push(format!("    {}:", label));
    for item in items {
        lines.push(format!("      {} {}", marker, item));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuelens_core::protocol::{Analysis, AnalysisRecord, FileTree, IssueSummary};
    use issuelens_core::protocol::KeySection;

    fn issue_with(record: AnalysisRecord) -> AnalyzedIssue {
        AnalyzedIssue::from(record)
    }

    fn bare_record() -> AnalysisRecord {
        AnalysisRecord {
            issue_summary: IssueSummary {
                title: "Crash on start".to_string(),
                status: "open".to_string(),
                ..IssueSummary::default()
            },
            project_context: None,
            relevant_files: FileTree::new(),
            build_and_test: None,
            analysis: Analysis {
                problem_type: "bug".to_string(),
                complexity: "low".to_string(),
                ..Analysis::default()
            },
        }
    }

    #[test]
    fn test_summary_skips_absent_sections() {
        let text = summary(&issue_with(bare_record()));
        assert!(text.contains("Crash on start"));
        assert!(text.contains("Status: open  Type: bug  Complexity: low"));
        assert!(!text.contains("Project Context"));
        assert!(!text.contains("Build & Development"));
        assert!(!text.contains("Labels"));
        assert!(!text.contains("Potential Risks"));
    }

    #[test]
    fn test_summary_renders_rich_sections() {
        let mut record = bare_record();
        record.issue_summary.labels = vec!["bug".to_string(), "p1".to_string()];
        record.project_context = Some(ProjectContext {
            overview: "A web server".to_string(),
            main_directories: [("cmd".to_string(), "binaries".to_string())]
                .into_iter()
                .collect(),
            ..ProjectContext::default()
        });
        record.build_and_test = Some(BuildAndTest {
            test_commands: vec!["go test ./...".to_string()],
            development_server: Some("go run ./cmd/server".to_string()),
            ..BuildAndTest::default()
        });
        record.analysis.implementation_steps = vec!["a".to_string(), "b".to_string()];
        record.analysis.potential_risks = vec!["breaks config".to_string()];

        let text = summary(&issue_with(record));
        assert!(text.contains("Labels: bug, p1"));
        assert!(text.contains("cmd - binaries"));
        assert!(text.contains("$ go test ./..."));
        assert!(text.contains("Dev Server: go run ./cmd/server"));
        assert!(text.contains("1. a\n      2. b"));
        assert!(text.contains("! breaks config"));
    }

    #[test]
    fn test_file_list_numbers_entries_and_counts_sections() {
        let files = vec![
            FlatFile {
                path: "src/main.go".to_string(),
                reason: "entry point".to_string(),
                sections: vec![KeySection {
                    line_start: 1,
                    line_end: 3,
                    code: String::new(),
                    explanation: String::new(),
                }],
            },
            FlatFile {
                path: "go.mod".to_string(),
                reason: "module".to_string(),
                sections: Vec::new(),
            },
        ];
        let text = file_list(&files);
        assert!(text.starts_with("  Relevant Files (2)\n"));
        assert!(text.contains(" 1. src/main.go\n        entry point\n        1 key section(s)"));
        assert!(text.contains(" 2. go.mod\n        module\n"));
        assert_eq!(file_list(&[]), "  No relevant files were identified.\n");
    }
}
