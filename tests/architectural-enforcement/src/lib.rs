//! Architectural Enforcement Integration Tests
//!
//! Source scanners shared by the tests in `tests/`:
//! - No sleeping in production code
//! - No blocking I/O inside async functions
//!
//! The scanners work line by line. They are heuristics, good enough for the
//! way this workspace is formatted (rustfmt, one `fn` header per line).

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["scribe/core/src", "scribe/daemon/src"];

/// Workspace root, located from this package's manifest
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// A scanned source file
pub struct SourceFile {
    /// Path relative to the workspace root
    pub path: PathBuf,
    /// File contents
    pub content: String,
}

impl SourceFile {
    /// Lines of the file
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        self.content.lines().collect()
    }
}

/// Every `.rs` file under the production directories
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }
        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) != Some("rs") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(entry.path()) {
                let relative = entry
                    .path()
                    .strip_prefix(&root)
                    .unwrap_or(entry.path())
                    .to_path_buf();
                files.push(SourceFile {
                    path: relative,
                    content,
                });
            }
        }
    }
    files
}

/// The code part of a line, without a trailing `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether a trimmed line opens a function
#[must_use]
pub fn is_fn_header(line: &str) -> bool {
    let line = line.trim_start();
    let rest = line
        .strip_prefix("pub(crate) ")
        .or_else(|| line.strip_prefix("pub(super) "))
        .or_else(|| line.strip_prefix("pub "))
        .unwrap_or(line);
    let rest = rest.strip_prefix("const ").unwrap_or(rest);
    let rest = rest.strip_prefix("async ").unwrap_or(rest);
    rest.starts_with("fn ")
}

/// Whether a trimmed line opens an async function
#[must_use]
pub fn is_async_fn_header(line: &str) -> bool {
    is_fn_header(line) && line.contains("async fn ")
}

/// Whether the line sits in a `#[cfg(test)]` region or a test function
///
/// Test modules sit at the end of a file, so everything after the first
/// `#[cfg(test)]` counts as test code.
#[must_use]
pub fn is_test_code(lines: &[&str], current_idx: usize) -> bool {
    if lines[..current_idx]
        .iter()
        .any(|l| l.trim().starts_with("#[cfg(test)]"))
    {
        return true;
    }

    let Some(fn_idx) = enclosing_fn(lines, current_idx) else {
        return false;
    };
    for line in lines[..fn_idx].iter().rev() {
        let line = line.trim();
        if line.starts_with("#[test]") || line.starts_with("#[tokio::test") {
            return true;
        }
        if !line.starts_with("#[") && !line.starts_with("///") {
            break;
        }
    }
    false
}

/// Whether the nearest enclosing function is async
#[must_use]
pub fn is_in_async_fn(lines: &[&str], current_idx: usize) -> bool {
    enclosing_fn(lines, current_idx).is_some_and(|i| is_async_fn_header(lines[i]))
}

/// Index of the nearest function header at or above `current_idx`
fn enclosing_fn(lines: &[&str], current_idx: usize) -> Option<usize> {
    (0..=current_idx).rev().find(|&i| is_fn_header(lines[i]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_header_detection() {
        assert!(is_fn_header("fn main() {"));
        assert!(is_fn_header("    pub fn load() -> Result<()> {"));
        assert!(is_fn_header("    pub(crate) async fn save(&self) {"));
        assert!(!is_fn_header("    let fn_name = 1;"));

        assert!(is_async_fn_header("    pub async fn save(&self) {"));
        assert!(!is_async_fn_header("    pub fn load() {"));
    }

    #[test]
    fn test_async_detection() {
        let code = vec![
            "pub async fn bad() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
            "pub fn fine() {",
            "    let contents = std::fs::read_to_string(\"config.toml\")?;",
            "}",
        ];
        assert!(is_in_async_fn(&code, 1));
        assert!(!is_in_async_fn(&code, 4));
    }

    #[test]
    fn test_test_code_detection() {
        let code = vec![
            "#[tokio::test]",
            "async fn test_something() {",
            "    tokio::time::sleep(d).await;",
            "}",
            "async fn helper() {",
            "    tokio::time::sleep(d).await;",
            "}",
            "#[cfg(test)]",
            "mod tests {",
            "    async fn helper() {",
            "        tokio::time::sleep(d).await;",
            "    }",
            "}",
        ];
        assert!(is_test_code(&code, 2));
        assert!(!is_test_code(&code, 5));
        assert!(is_test_code(&code, 10));
    }
}
