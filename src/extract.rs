//! Top-level function extraction for Go source files.
//!
//! Uses tree-sitter to find the package clause and every top-level
//! `function_declaration`. Methods (declarations with a receiver) are a
//! separate node kind and never collected. Function text is recovered by
//! line range so the prompt sees the code exactly as written.

use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::path::Path;
use tree_sitter::{Node, Parser, Tree};

/// Name of the program entry point, never sent for test generation
pub const ENTRY_POINT: &str = "main";

/// A top-level function and its source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoFunction {
    pub name: String,
    /// Lines `start_line..=end_line` of the file joined with `\n`
    pub code: String,
    /// 1-based
    pub start_line: usize,
    /// 1-based, inclusive
    pub end_line: usize,
}

impl GoFunction {
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }
}

/// Why a top-level function was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EntryPoint,
    TooLong { lines: usize, max: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EntryPoint => write!(f, "entry point"),
            SkipReason::TooLong { lines, max } => {
                write!(f, "{} lines, longer than the {} line limit", lines, max)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFunction {
    pub name: String,
    pub reason: SkipReason,
}

/// Everything the pipeline needs from one source file
#[derive(Debug, Clone, Default)]
pub struct ExtractedFile {
    pub package_name: String,
    pub functions: Vec<GoFunction>,
    pub skipped: Vec<SkippedFunction>,
}

/// Read and extract a Go file from disk.
pub fn extract_file(path: &Path, max_lines: usize) -> Result<ExtractedFile> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    extract_functions(&source, max_lines)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Extract the package name and top-level functions from Go source text.
pub fn extract_functions(source: &str, max_lines: usize) -> Result<ExtractedFile> {
    let tree = parse(source)?;
    let root = tree.root_node();
    let bytes = source.as_bytes();

    if root.has_error() {
        log::warn!("Go source has syntax errors; extracting what parsed");
    }

    let package_name =
        package_name(&root, bytes).ok_or_else(|| anyhow!("No package clause found"))?;
    let lines: Vec<&str> = source.split('\n').collect();

    let mut extracted = ExtractedFile {
        package_name,
        ..Default::default()
    };

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        if node.kind() != "function_declaration" {
            continue;
        }
        let Some(name) = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(bytes).ok())
        else {
            continue;
        };

        if name == ENTRY_POINT {
            extracted.skipped.push(SkippedFunction {
                name: name.to_string(),
                reason: SkipReason::EntryPoint,
            });
            continue;
        }

        let start = node.start_position().row;
        let end = node.end_position().row.min(lines.len().saturating_sub(1));
        let line_count = end - start + 1;
        if line_count > max_lines {
            extracted.skipped.push(SkippedFunction {
                name: name.to_string(),
                reason: SkipReason::TooLong {
                    lines: line_count,
                    max: max_lines,
                },
            });
            continue;
        }

        extracted.functions.push(GoFunction {
            name: name.to_string(),
            code: lines[start..=end].join("\n"),
            start_line: start + 1,
            end_line: end + 1,
        });
    }

    Ok(extracted)
}

fn parse(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .context("Failed to set Go language")?;

    match parser.parse(source, None) {
        Some(tree) => Ok(tree),
        None => bail!("Failed to parse Go source"),
    }
}

fn package_name(root: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = root.walk();
    let clause = root
        .named_children(&mut cursor)
        .find(|n| n.kind() == "package_clause")?;

    let mut clause_cursor = clause.walk();
    let ident = clause
        .named_children(&mut clause_cursor)
        .find(|n| n.kind() == "package_identifier")?;

    ident.utf8_text(source).ok().map(str::to_string)
}

/// Where imports live in an existing Go file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportLayout {
    /// Every import spec as `[name ]path`, comments dropped
    pub specs: Vec<String>,
    /// Byte offset of the `)` closing the first parenthesized import block
    pub block_close: Option<usize>,
    /// Byte offset just past the package clause
    pub package_end: Option<usize>,
}

/// Read the import specs of a Go file from its syntax tree.
pub fn import_layout(source: &str) -> Result<ImportLayout> {
    let tree = parse(source)?;
    let root = tree.root_node();
    let bytes = source.as_bytes();
    let mut layout = ImportLayout::default();

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "package_clause" if layout.package_end.is_none() => {
                layout.package_end = Some(node.end_byte());
            }
            "import_declaration" => {
                let mut decl_cursor = node.walk();
                for child in node.named_children(&mut decl_cursor) {
                    match child.kind() {
                        "import_spec" => layout.specs.extend(import_spec_text(&child, bytes)),
                        "import_spec_list" => {
                            if layout.block_close.is_none() {
                                layout.block_close = Some(child.end_byte() - 1);
                            }
                            let mut list_cursor = child.walk();
                            for spec in child.named_children(&mut list_cursor) {
                                if spec.kind() == "import_spec" {
                                    layout.specs.extend(import_spec_text(&spec, bytes));
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    Ok(layout)
}

fn import_spec_text(node: &Node, source: &[u8]) -> Option<String> {
    let path = node.child_by_field_name("path")?.utf8_text(source).ok()?;
    match node
        .child_by_field_name("name")
        .and_then(|n| n.utf8_text(source).ok())
    {
        Some(name) => Some(format!("{} {}", name, path)),
        None => Some(path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"package mathx

import "fmt"

// Sum adds two ints.
func Sum(a, b int) int {
	return a + b
}

type Acc struct{ total int }

func (a *Acc) Add(n int) {
	a.total += n
}

func describe(n int) string {
	return fmt.Sprintf("n=%d", n)
}

func main() {
	fmt.Println(Sum(1, 2))
}
"#;

    #[test]
    fn test_package_name() {
        let extracted = extract_functions(SAMPLE, 100).unwrap();
        assert_eq!(extracted.package_name, "mathx");
    }

    #[test]
    fn test_extracts_top_level_functions_only() {
        let extracted = extract_functions(SAMPLE, 100).unwrap();
        let names: Vec<&str> = extracted.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Sum", "describe"]);
    }

    #[test]
    fn test_function_code_is_exact_line_range() {
        let extracted = extract_functions(SAMPLE, 100).unwrap();
        let sum = &extracted.functions[0];
        assert_eq!(sum.code, "func Sum(a, b int) int {\n\treturn a + b\n}");
        assert_eq!(sum.start_line, 6);
        assert_eq!(sum.end_line, 8);
        assert_eq!(sum.line_count(), 3);
    }

    #[test]
    fn test_main_is_skipped() {
        let extracted = extract_functions(SAMPLE, 100).unwrap();
        assert_eq!(
            extracted.skipped,
            vec![SkippedFunction {
                name: "main".to_string(),
                reason: SkipReason::EntryPoint,
            }]
        );
    }

    #[test]
    fn test_long_functions_are_skipped() {
        let extracted = extract_functions(SAMPLE, 2).unwrap();
        assert!(extracted.functions.is_empty());
        assert!(extracted.skipped.iter().any(|s| s.name == "Sum"
            && s.reason == SkipReason::TooLong { lines: 3, max: 2 }));
    }

    #[test]
    fn test_single_line_function() {
        let source = "package p\n\nfunc one() int { return 1 }";
        let extracted = extract_functions(source, 1).unwrap();
        assert_eq!(extracted.functions.len(), 1);
        assert_eq!(extracted.functions[0].code, "func one() int { return 1 }");
    }

    #[test]
    fn test_generic_function() {
        let source = "package p\n\nfunc Map[T, U any](xs []T, f func(T) U) []U {\n\tvar out []U\n\treturn out\n}\n";
        let extracted = extract_functions(source, 100).unwrap();
        assert_eq!(extracted.functions[0].name, "Map");
        assert_eq!(extracted.functions[0].line_count(), 4);
    }

    #[test]
    fn test_missing_package_clause_is_error() {
        assert!(extract_functions("func lonely() {}\n", 100).is_err());
    }

    #[test]
    fn test_syntax_errors_still_extract() {
        let source = "package p\n\nfunc broken( {\n}\n\nfunc good() int {\n\treturn 1\n}\n";
        let extracted = extract_functions(source, 100).unwrap();
        assert_eq!(extracted.package_name, "p");
        assert!(extracted.functions.iter().any(|f| f.name == "good"
            && f.code == "func good() int {\n\treturn 1\n}"));
    }

    #[test]
    fn test_import_layout_block() {
        let source = "package p\n\nimport (\n\t\"testing\" // std\n\t. \"fmt\"\n\t_ \"embed\"\n\tf \"flag\"\n)\n\nimport \"os\"\n";
        let layout = import_layout(source).unwrap();

        assert_eq!(
            layout.specs,
            vec!["\"testing\"", ". \"fmt\"", "_ \"embed\"", "f \"flag\"", "\"os\""]
        );
        assert_eq!(layout.package_end, Some("package p".len()));
        let close = layout.block_close.unwrap();
        assert_eq!(&source[close..close + 1], ")");
        assert_eq!(source[..close].matches('(').count(), 1);
    }

    #[test]
    fn test_import_layout_without_block() {
        let layout = import_layout("package p\n\nimport \"testing\"\n").unwrap();
        assert_eq!(layout.specs, vec!["\"testing\""]);
        assert!(layout.block_close.is_none());
    }
}
