//! Extension to display-language mapping for the file viewer.

/// Tag used for anything the viewer has no language for.
pub const PLAINTEXT: &str = "plaintext";

/// Display-language tag for a file path, e.g. `src/main.rs` -> `rust`.
///
/// The extension is whatever follows the last `.` (lower-cased); paths with
/// no `.` and unknown extensions map to [`PLAINTEXT`]. Never fails.
pub fn language_for(path: &str) -> &'static str {
    let extension = match path.rfind('.') {
        Some(idx) => path[idx + 1..].to_lowercase(),
        None => return PLAINTEXT,
    };

    match extension.as_str() {
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "json" => "json",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "less" => "less",
        "md" | "markdown" => "markdown",
        "xml" => "xml",
        "yml" | "yaml" => "yaml",
        "py" => "python",
        "java" => "java",
        "c" => "c",
        "cpp" | "cc" | "cxx" | "c++" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        "php" => "php",
        "rb" => "ruby",
        "sh" | "bash" => "shell",
        "sql" => "sql",
        "lua" => "lua",
        "dart" => "dart",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        _ => PLAINTEXT,
    }
}

/// Line-comment marker for a display-language tag.
pub fn comment_prefix(language: &str) -> &'static str {
    match language {
        "python" | "ruby" | "shell" | "yaml" => "#",
        "sql" | "lua" => "--",
        _ => "//",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(language_for("a/b/main.rs"), "rust");
        assert_eq!(language_for("web/app/page.tsx"), "typescript");
        assert_eq!(language_for("scripts/build.sh"), "shell");
        assert_eq!(language_for("native/ops.c++"), "cpp");
        assert_eq!(language_for("build.gradle.kts"), "kotlin");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(language_for("x.TS"), "typescript");
        assert_eq!(language_for("README.Md"), "markdown");
    }

    #[test]
    fn test_unknown_or_missing_extension_is_plaintext() {
        assert_eq!(language_for("Dockerfile"), PLAINTEXT);
        assert_eq!(language_for("notes.txt"), PLAINTEXT);
        assert_eq!(language_for("trailing."), PLAINTEXT);
        assert_eq!(language_for(""), PLAINTEXT);
        assert_eq!(language_for(".gitignore"), PLAINTEXT);
    }

    #[test]
    fn test_only_last_dot_counts() {
        assert_eq!(language_for("lib.rs.bak"), PLAINTEXT);
        assert_eq!(language_for("v1.2/server.go"), "go");
    }

    #[test]
    fn test_comment_prefix_by_language() {
        assert_eq!(comment_prefix("python"), "#");
        assert_eq!(comment_prefix("sql"), "--");
        assert_eq!(comment_prefix("rust"), "//");
        assert_eq!(comment_prefix(PLAINTEXT), "//");
    }
}
