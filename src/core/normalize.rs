//! Normalization engine for stripping version-pin suffixes from quoted
//! identifiers across a TypeScript source tree.
//!
//! Given a root directory, this engine:
//! 1. Walks the tree collecting files whose name matches the `*.ts*` glob
//! 2. Rewrites every `"package@1.2.3"` literal to `"package"`
//! 3. Writes each file back in place only when its content changed

use crate::error::Result;
use crate::utils::io;
use glob_match::glob_match;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

// ============================================================================
// Types
// ============================================================================

/// A file rewritten during normalization.
#[derive(Debug, Clone, Serialize)]
pub struct FileChange {
    /// File path relative to root.
    pub file: String,
    /// Number of pins stripped in this file.
    pub replacements: usize,
}

/// The full result of a normalization run.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizeResult {
    /// Files rewritten, in traversal order.
    pub changes: Vec<FileChange>,
    /// Files whose name matched the glob and were scanned.
    pub files_scanned: usize,
    /// Files rewritten.
    pub files_changed: usize,
    /// Pins stripped across all files.
    pub total_replacements: usize,
}

// ============================================================================
// Pattern
// ============================================================================

/// File name glob for candidate files (`.ts`, `.tsx`, `.d.ts`, ...).
const TS_FILE_GLOB: &str = "*.ts*";

static VERSION_PIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Matches a double-quoted identifier carrying a trailing version pin,
    // e.g. "lodash@4.17.21" or "@scope/icons@2.0.1"
    // Capture group 1 is the identifier without the pin
    Regex::new(r#""([^"]+?)@\d+\.\d+\.\d+""#).unwrap()
});

/// Strip version pins from a full text.
///
/// Applies the substitution to every non-overlapping occurrence, left to
/// right. Returns the rewritten text and the number of pins stripped.
fn strip_pins(text: &str) -> (String, usize) {
    let count = VERSION_PIN_PATTERN.find_iter(text).count();
    let new_text = VERSION_PIN_PATTERN.replace_all(text, "\"$1\"").into_owned();
    (new_text, count)
}

// ============================================================================
// File walking
// ============================================================================

fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    walk_recursive(root, &mut files);
    files
}

fn walk_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_recursive(&path, files);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if glob_match(TS_FILE_GLOB, name) {
                files.push(path);
            }
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize a single file in place.
///
/// Reads the full text, strips every pin, and writes the file back only if
/// the content changed. Returns the number of pins stripped. Read and write
/// failures (including non-UTF-8 content) are fatal.
pub fn normalize_file(path: &Path) -> Result<usize> {
    let text = io::read_file(path, &format!("read {}", path.display()))?;

    let (new_text, replacements) = strip_pins(&text);
    if new_text != text {
        io::write_file(path, &new_text, &format!("write {}", path.display()))?;
    }

    Ok(replacements)
}

/// Normalize every matching file under `root`.
///
/// A root that does not exist or cannot be enumerated yields an empty walk
/// and a zero-count result. Directories that fail to enumerate mid-walk are
/// skipped; file read/write failures abort the run.
pub fn normalize_tree(root: &Path) -> Result<NormalizeResult> {
    let files = walk_files(root);
    let files_scanned = files.len();

    let mut changes = Vec::new();
    let mut total_replacements = 0;

    for file_path in &files {
        let replacements = normalize_file(file_path).map_err(|e| {
            e.with_hint("Files already rewritten stay normalized; rerun once the failure is fixed.")
        })?;

        if replacements == 0 {
            continue;
        }

        let relative = file_path
            .strip_prefix(root)
            .unwrap_or(file_path)
            .to_string_lossy()
            .to_string();

        log_status!("unpin", "Stripped {} pin(s) from {}", replacements, relative);

        total_replacements += replacements;
        changes.push(FileChange {
            file: relative,
            replacements,
        });
    }

    Ok(NormalizeResult {
        files_changed: changes.len(),
        changes,
        files_scanned,
        total_replacements,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_pins_rewrites_pinned_identifier() {
        let (text, count) = strip_pins("import { debounce } from \"lodash@4.17.21\";\n");
        assert_eq!(text, "import { debounce } from \"lodash\";\n");
        assert_eq!(count, 1);
    }

    #[test]
    fn strip_pins_counts_all_occurrences() {
        let input = "import a from \"alpha@1.0.0\";\nimport b from \"beta@2.3.4\"; import c from \"beta@2.3.4\";\n";
        let (text, count) = strip_pins(input);
        assert_eq!(count, 3);
        assert!(text.contains("\"alpha\""));
        assert!(text.contains("\"beta\""));
        assert!(!text.contains('@'));
    }

    #[test]
    fn strip_pins_handles_scoped_packages() {
        let (text, count) = strip_pins("import icons from \"@scope/icons@2.0.1\";");
        assert_eq!(text, "import icons from \"@scope/icons\";");
        assert_eq!(count, 1);
    }

    #[test]
    fn strip_pins_leaves_non_matching_suffixes() {
        let input = "import a from \"pkg@1.2\";\nimport b from \"pkg@1.2.3-beta\";\nimport c from \"pkg@1.2.3.4\";\n";
        let (text, count) = strip_pins(input);
        assert_eq!(text, input);
        assert_eq!(count, 0);
    }

    #[test]
    fn strip_pins_requires_quotes() {
        let input = "const v = lodash@4.17.21;\n";
        let (text, count) = strip_pins(input);
        assert_eq!(text, input);
        assert_eq!(count, 0);
    }

    #[test]
    fn walk_collects_only_matching_names() {
        let dir = std::env::temp_dir().join("unpin_walk_test");
        let _ = std::fs::remove_dir_all(&dir);
        let nested = dir.join("components");
        let _ = std::fs::create_dir_all(&nested);

        std::fs::write(dir.join("app.ts"), "").unwrap();
        std::fs::write(dir.join("view.tsx"), "").unwrap();
        std::fs::write(dir.join("types.d.ts"), "").unwrap();
        std::fs::write(dir.join("notes.ts.bak"), "").unwrap();
        std::fs::write(dir.join("index.js"), "").unwrap();
        std::fs::write(dir.join("style.css"), "").unwrap();
        std::fs::write(nested.join("button.tsx"), "").unwrap();

        let files = walk_files(&dir);
        let names: Vec<String> = files
            .iter()
            .filter_map(|f| f.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect();

        assert_eq!(files.len(), 5, "unexpected files: {:?}", names);
        assert!(names.contains(&"app.ts".to_string()));
        assert!(names.contains(&"view.tsx".to_string()));
        assert!(names.contains(&"types.d.ts".to_string()));
        assert!(names.contains(&"notes.ts.bak".to_string()));
        assert!(names.contains(&"button.tsx".to_string()));
        assert!(!names.contains(&"index.js".to_string()));
        assert!(!names.contains(&"style.css".to_string()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn walk_missing_root_is_empty() {
        let dir = std::env::temp_dir().join("unpin_walk_missing_test");
        let _ = std::fs::remove_dir_all(&dir);

        let files = walk_files(&dir);
        assert!(files.is_empty());
    }

    #[test]
    fn normalize_file_rewrites_and_counts() {
        let dir = std::env::temp_dir().join("unpin_file_test");
        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::create_dir_all(&dir);

        let path = dir.join("app.ts");
        std::fs::write(
            &path,
            "import a from \"alpha@1.0.0\";\nimport b from \"beta@2.3.4\";\n",
        )
        .unwrap();

        let replacements = normalize_file(&path).unwrap();
        assert_eq!(replacements, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "import a from \"alpha\";\nimport b from \"beta\";\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn normalize_file_leaves_clean_file_untouched() {
        let dir = std::env::temp_dir().join("unpin_file_clean_test");
        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::create_dir_all(&dir);

        let path = dir.join("clean.ts");
        let original = "import { useState } from \"react\";\n";
        std::fs::write(&path, original).unwrap();

        // Read-only file survives because no write happens for clean content
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&path, perms).unwrap();

        let replacements = normalize_file(&path).unwrap();
        assert_eq!(replacements, 0);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, original);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn normalize_tree_reports_counts() {
        let dir = std::env::temp_dir().join("unpin_tree_test");
        let _ = std::fs::remove_dir_all(&dir);
        let nested = dir.join("ui");
        let _ = std::fs::create_dir_all(&nested);

        std::fs::write(
            dir.join("app.ts"),
            "import a from \"alpha@1.0.0\";\nimport b from \"beta@2.3.4\";\n",
        )
        .unwrap();
        std::fs::write(nested.join("button.tsx"), "import c from \"gamma@0.1.0\";\n").unwrap();
        std::fs::write(dir.join("clean.ts"), "import d from \"delta\";\n").unwrap();
        std::fs::write(dir.join("ignored.css"), ".a { content: \"x@1.0.0\"; }\n").unwrap();

        let result = normalize_tree(&dir).unwrap();

        assert_eq!(result.files_scanned, 3);
        assert_eq!(result.files_changed, 2);
        assert_eq!(result.total_replacements, 3);
        assert_eq!(result.changes.len(), 2);
        assert!(result.changes.iter().all(|c| !c.file.contains("clean.ts")));

        let css = std::fs::read_to_string(dir.join("ignored.css")).unwrap();
        assert!(css.contains("x@1.0.0"), "non-matching files must be untouched");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn normalize_tree_is_idempotent() {
        let dir = std::env::temp_dir().join("unpin_tree_idempotent_test");
        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::create_dir_all(&dir);

        std::fs::write(dir.join("app.ts"), "import a from \"alpha@1.0.0\";\n").unwrap();

        let first = normalize_tree(&dir).unwrap();
        assert_eq!(first.files_changed, 1);

        let after_first = std::fs::read_to_string(dir.join("app.ts")).unwrap();

        let second = normalize_tree(&dir).unwrap();
        assert_eq!(second.files_scanned, 1);
        assert_eq!(second.files_changed, 0);
        assert_eq!(second.total_replacements, 0);

        let after_second = std::fs::read_to_string(dir.join("app.ts")).unwrap();
        assert_eq!(after_first, after_second);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn normalize_tree_missing_root_is_a_no_op() {
        let dir = std::env::temp_dir().join("unpin_tree_missing_test");
        let _ = std::fs::remove_dir_all(&dir);

        let result = normalize_tree(&dir).unwrap();
        assert_eq!(result.files_scanned, 0);
        assert_eq!(result.files_changed, 0);
        assert_eq!(result.total_replacements, 0);
        assert!(result.changes.is_empty());
    }

    #[test]
    fn normalize_tree_propagates_unreadable_file() {
        let dir = std::env::temp_dir().join("unpin_tree_unreadable_test");
        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::create_dir_all(&dir);

        // Invalid UTF-8 in a matching file aborts the run
        std::fs::write(dir.join("junk.ts"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

        let result = normalize_tree(&dir);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.code.as_str(), "internal.io_error");
        assert!(!err.hints.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
