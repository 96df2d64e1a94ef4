//! Pipeline: scan → extract → complete → sanitize → write, once per file.
//!
//! Failures are reported and skipped at the narrowest scope: a function whose
//! completion fails is left out, a file that fails to parse or write is
//! left alone. Only a failed walk stops the run.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;

use crate::completion::{build_prompt, CompletionClient};
use crate::extract::{self, ExtractedFile, SkipReason};
use crate::sanitize::sanitize;
use crate::scanner;
use crate::writer::{self, TestCase};

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct Options {
    pub max_function_lines: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_function_lines: crate::config::DEFAULT_MAX_FUNCTION_LINES,
        }
    }
}

/// Counters printed at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_scanned: usize,
    pub files_written: usize,
    pub functions_considered: usize,
    pub functions_skipped: usize,
    pub tests_existing: usize,
    pub tests_generated: usize,
    pub failures: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📂 Files scanned:      {}", self.files_scanned)?;
        writeln!(f, "🧪 Tests generated:    {}", self.tests_generated)?;
        writeln!(f, "⏭️  Already tested:     {}", self.tests_existing)?;
        writeln!(f, "🚫 Functions skipped:  {}", self.functions_skipped)?;
        writeln!(f, "📝 Test files written: {}", self.files_written)?;
        write!(f, "⚠️  Failures:           {}", self.failures)
    }
}

/// Generate tests for every eligible file under `root`.
///
/// With `client` set to `None` nothing is sent; the functions that would be
/// sent are listed instead.
pub fn run(
    root: &Path,
    client: Option<&dyn CompletionClient>,
    options: &Options,
) -> Result<RunSummary> {
    let files = scanner::scan(root).context("Error walking the path")?;
    let mut summary = RunSummary::default();

    for path in &files {
        println!("Generating test cases for {}", path.display());
        summary.files_scanned += 1;
        process_file(path, client, options, &mut summary);
    }

    Ok(summary)
}

/// Run the pipeline for a single source file, recording results in `summary`.
pub fn process_file(
    path: &Path,
    client: Option<&dyn CompletionClient>,
    options: &Options,
    summary: &mut RunSummary,
) {
    let extracted = match extract::extract_file(path, options.max_function_lines) {
        Ok(extracted) => extracted,
        Err(e) => {
            eprintln!("Error parsing file: {:#}", e);
            summary.failures += 1;
            return;
        }
    };
    report_skipped(&extracted, summary);

    let test_path = writer::test_file_path(path);
    let existing = match writer::read_existing(&test_path) {
        Ok(existing) => existing,
        Err(e) => {
            eprintln!("Error reading test file: {:#}", e);
            summary.failures += 1;
            return;
        }
    };

    let mut cases = Vec::new();
    for function in &extracted.functions {
        summary.functions_considered += 1;

        if writer::has_test(&existing, &function.name) {
            println!("Skipping existing test case for function {}", function.name);
            summary.tests_existing += 1;
            continue;
        }

        let Some(client) = client else {
            println!(
                "Would generate test case for function {} (lines {}-{})",
                function.name, function.start_line, function.end_line
            );
            continue;
        };

        let prompt = build_prompt(&function.name, &extracted.package_name, &function.code);
        let reply = match client.complete(&prompt) {
            Ok(reply) => reply,
            Err(e) => {
                eprintln!(
                    "Error generating test case for function {}: {:#}",
                    function.name, e
                );
                summary.failures += 1;
                continue;
            }
        };

        let sanitized = sanitize(&reply);
        println!("Generated test case for function {}", function.name);
        log::debug!(
            "{}: {} bytes of code, imports {:?}",
            function.name,
            sanitized.code.len(),
            sanitized.imports
        );

        summary.tests_generated += 1;
        cases.push(TestCase {
            name: function.name.clone(),
            code: sanitized.code,
            imports: sanitized.imports,
        });
    }

    match writer::write_test_file(path, &extracted.package_name, &cases) {
        Ok(Some(written)) => {
            println!("Test file generated: {}", written.display());
            summary.files_written += 1;
        }
        Ok(None) => log::debug!("nothing new for {}", path.display()),
        Err(e) => {
            eprintln!("Error creating test file: {:#}", e);
            summary.failures += 1;
        }
    }
}

fn report_skipped(extracted: &ExtractedFile, summary: &mut RunSummary) {
    for skipped in &extracted.skipped {
        summary.functions_skipped += 1;
        match &skipped.reason {
            SkipReason::EntryPoint => println!("Skipping main function"),
            SkipReason::TooLong { .. } => println!(
                "Function {} is {}. It is recommended to make it shorter for better software engineering practices.",
                skipped.name, skipped.reason
            ),
        }
    }
}
