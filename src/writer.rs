//! Merge generated tests into `<stem>_test.go` next to the source file.
//!
//! A new file gets a package clause and an import block that always includes
//! `"testing"`. An existing file keeps its content; missing imports are
//! spliced into its first `import ( ... )` block (or a new block after the
//! package clause) and the new tests are appended at the end.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::extract;

/// Import every generated test needs
pub const TESTING_IMPORT: &str = "\"testing\"";

/// One generated test ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Name of the function under test
    pub name: String,
    pub code: String,
    pub imports: Vec<String>,
}

/// `dir/foo.go` -> `dir/foo_test.go`
pub fn test_file_path(source: &Path) -> PathBuf {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name.strip_suffix(".go").unwrap_or(&file_name);
    source.with_file_name(format!("{}_test.go", stem))
}

/// Go test function name for `function_name`: `sum` -> `TestSum`
pub fn test_name(function_name: &str) -> String {
    let mut chars = function_name.chars();
    match chars.next() {
        Some(first) => format!("Test{}{}", first.to_uppercase(), chars.as_str()),
        None => "Test".to_string(),
    }
}

/// Whether `existing` already defines the test for `function_name`
pub fn has_test(existing: &str, function_name: &str) -> bool {
    existing.contains(&format!("func {}(t *testing.T)", test_name(function_name)))
}

/// Read the current test file; a missing file reads as empty.
pub fn read_existing(test_path: &Path) -> Result<String> {
    match std::fs::read_to_string(test_path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", test_path.display())),
    }
}

/// Write `cases` into the test file for `source`.
///
/// Returns the test file path, or `None` when there was nothing to write.
pub fn write_test_file(
    source: &Path,
    package_name: &str,
    cases: &[TestCase],
) -> Result<Option<PathBuf>> {
    if cases.is_empty() {
        return Ok(None);
    }

    let test_path = test_file_path(source);
    let existing = read_existing(&test_path)?;
    let content = render(&existing, package_name, cases)?;

    std::fs::write(&test_path, content)
        .with_context(|| format!("Failed to write {}", test_path.display()))?;

    Ok(Some(test_path))
}

/// Build the full test file text from the previous content and new cases.
pub fn render(existing: &str, package_name: &str, cases: &[TestCase]) -> Result<String> {
    let imports = required_imports(cases);

    let mut content = if existing.is_empty() {
        new_file_header(package_name, &imports)
    } else {
        merge_imports(existing, &imports)?
    };

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }

    for case in cases {
        content.push_str(&format!("// Test case for function {}\n", case.name));
        content.push_str(&case.code);
        content.push_str("\n\n");
    }

    Ok(content)
}

/// `"testing"` first, then every case's imports, deduplicated in first-seen order.
fn required_imports(cases: &[TestCase]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let all = std::iter::once(TESTING_IMPORT.to_string())
        .chain(cases.iter().flat_map(|c| c.imports.iter().cloned()));

    for spec in all {
        let spec = normalize_spec(&spec);
        if !spec.is_empty() && !seen.contains(&spec) {
            seen.push(spec);
        }
    }
    seen
}

fn new_file_header(package_name: &str, imports: &[String]) -> String {
    let mut header = format!("package {}\n\nimport (\n", package_name);
    for spec in imports {
        header.push_str(&format!("\t{}\n", spec));
    }
    header.push_str(")\n\n");
    header
}

/// Add the imports `existing` lacks, leaving everything else untouched.
///
/// Present imports come from the file's syntax tree, so trailing comments,
/// dot and blank imports are all recognized.
fn merge_imports(existing: &str, imports: &[String]) -> Result<String> {
    let layout = extract::import_layout(existing).context("Failed to parse existing test file")?;
    let present: Vec<String> = layout.specs.iter().map(|s| normalize_spec(s)).collect();
    let missing: Vec<&String> = imports.iter().filter(|s| !present.contains(s)).collect();

    if missing.is_empty() {
        return Ok(existing.to_string());
    }
    log::debug!("adding {} imports to existing test file", missing.len());

    let lines: String = missing.iter().map(|s| format!("\t{}\n", s)).collect();

    if let Some(close) = layout.block_close {
        let line_start = existing[..close].rfind('\n').map_or(0, |i| i + 1);
        let mut merged = String::with_capacity(existing.len() + lines.len() + 1);
        if existing[line_start..close].trim().is_empty() {
            merged.push_str(&existing[..line_start]);
            merged.push_str(&lines);
            merged.push_str(&existing[line_start..]);
        } else {
            // `)` shares a line with the last spec
            merged.push_str(&existing[..close]);
            merged.push('\n');
            merged.push_str(&lines);
            merged.push_str(&existing[close..]);
        }
        return Ok(merged);
    }

    let block = format!("import (\n{})\n", lines);
    Ok(match layout.package_end {
        Some(end) => {
            let (head, tail) = existing.split_at(end);
            format!("{}\n\n{}\n{}", head, block, tail.trim_start_matches('\n'))
        }
        None => format!("{}\n{}", block, existing),
    })
}

/// Collapse internal whitespace so `f   "fmt"` and `f "fmt"` compare equal.
fn normalize_spec(spec: &str) -> String {
    spec.split_whitespace().collect::<Vec<_>>().join(" ")
}
