//! Find Go source files eligible for test generation.
//!
//! A file is eligible when it has a `.go` extension and is not itself a
//! `_test.go` file. Walk order is sorted by file name so runs are repeatable.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of Go source files (without the dot)
pub const GO_EXTENSION: &str = "go";

/// Suffix that marks a Go test file
pub const TEST_FILE_SUFFIX: &str = "_test.go";

/// Walk `root` and collect every eligible source file.
///
/// `root` may also be a single file. Any walk error aborts the scan.
pub fn scan(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if entry.file_type().is_file() && is_eligible(entry.path()) {
            files.push(entry.into_path());
        }
    }

    log::debug!("scan {}: {} eligible files", root.display(), files.len());
    Ok(files)
}

/// Whether `path` names a non-test Go source file
pub fn is_eligible(path: &Path) -> bool {
    let is_go = path.extension().and_then(|e| e.to_str()) == Some(GO_EXTENSION);
    let is_test = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(TEST_FILE_SUFFIX));

    is_go && !is_test
}
