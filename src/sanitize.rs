//! Turn a free-text model reply into test code plus its import specs.
//!
//! Regex based on purpose: replies are loosely formatted prose, and the
//! only goal is to recover something that can be pasted into a test file.
//!
//! Steps:
//! 1. Take the first fenced code block (```` ``` ```` or ```` ```go ````), or the whole reply.
//! 2. Drop a leading `package` clause.
//! 3. Pull out every `import` declaration and split it into specs.
//! 4. Trim what is left.

use regex::Regex;
use std::sync::OnceLock;

/// Cleaned reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sanitized {
    /// Test code with package and imports removed
    pub code: String,
    /// Import specs as written, e.g. `"fmt"` or `f "fmt"`
    pub imports: Vec<String>,
}

fn code_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:go)?\n(.*?)\n```").expect("Invalid code block regex")
    })
}

/// Anchored at the very start of the code, not at every line.
fn package_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^package\s+[a-zA-Z_][a-zA-Z0-9_]*\s*\n").expect("Invalid package regex")
    })
}

/// Matches `import "x"`, `import alias "x"` and `import (\n ... \n)` blocks of quoted specs.
fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?m)^import(?:\s+\w+)?\s*(?:(?:\(\n(?:\s*(?:\w+ )?"[^"]+"\s*\n)+\s*\))|(?:"[^"]+"))"#,
        )
        .expect("Invalid import regex")
    })
}

/// Clean a raw completion reply.
pub fn sanitize(raw: &str) -> Sanitized {
    let code = match code_block_regex().captures(raw).and_then(|c| c.get(1)) {
        Some(block) => block.as_str(),
        None => {
            log::debug!("no fenced code block in reply, using raw text");
            raw
        }
    };

    let code = package_regex().replace(code, "");

    let imports = collect_imports(&code);
    let code = import_regex().replace_all(&code, "");

    Sanitized {
        code: code.trim().to_string(),
        imports,
    }
}

/// First import declaration in `code`, if any.
pub fn find_import_block(code: &str) -> Option<&str> {
    import_regex().find(code).map(|m| m.as_str())
}

/// Specs from every import declaration in `code`, in order of appearance.
pub fn collect_imports(code: &str) -> Vec<String> {
    import_regex()
        .find_iter(code)
        .flat_map(|m| extract_imports(m.as_str()))
        .collect()
}

/// Split one import declaration into its specs.
///
/// A declaration without a newline is the single-line form and yields the
/// text after `import`. Otherwise every non-empty line that is neither the
/// `import (` opener nor the closing `)` is a spec.
pub fn extract_imports(block: &str) -> Vec<String> {
    if block.is_empty() {
        return Vec::new();
    }

    if !block.contains('\n') {
        let spec = block.strip_prefix("import").unwrap_or(block).trim();
        return vec![spec.to_string()];
    }

    block
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("import") && *line != ")")
        .map(str::to_string)
        .collect()
}
