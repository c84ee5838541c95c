//! Architectural Enforcement
//!
//! Source scanners shared by the integration tests in `tests/`. Each test
//! names a set of forbidden patterns and fails with a list of offending lines
//! found in production code.
//!
//! Code after a `#[cfg(test)]` marker is test code and is not scanned.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["leadline/core/src", "leadline/daemon/src"];

/// A forbidden pattern
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    /// Substring that must not appear in production code
    pub pattern: &'static str,
    /// What kind of violation this is
    pub reason: &'static str,
}

/// One offending line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// File containing the line
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Why the line is rejected
    pub reason: &'static str,
    /// The trimmed line
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.path.display(),
            self.line,
            self.reason,
            self.text
        )
    }
}

/// Workspace root, two levels above this crate
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// All `.rs` files under `dir`
pub fn rust_sources(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Scan one file's contents
pub fn scan_source(path: &Path, content: &str, rules: &[Rule]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim_start().starts_with("#[cfg(test)]") {
            break;
        }

        // Skip comments
        let code_part = line.split("//").next().unwrap_or(line);

        for rule in rules {
            if code_part.contains(rule.pattern) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    reason: rule.reason,
                    text: line.trim().to_string(),
                });
            }
        }
    }

    violations
}

/// Scan every production directory
pub fn scan_production(rules: &[Rule]) -> Vec<Violation> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for dir in PRODUCTION_DIRS {
        for path in rust_sources(&root.join(dir)) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            violations.extend(scan_source(&path, &content, rules));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLEEP: Rule = Rule {
        pattern: "thread::sleep(",
        reason: "Blocking sleep",
    };

    #[test]
    fn test_detects_pattern() {
        let code = "async fn poll() {\n    std::thread::sleep(d);\n}\n";
        let found = scan_source(Path::new("a.rs"), code, &[SLEEP]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line, 2);
    }

    #[test]
    fn test_ignores_comments_and_tests() {
        let code = "// std::thread::sleep(d)\n#[cfg(test)]\nmod tests {\n    std::thread::sleep(d);\n}\n";
        assert!(scan_source(Path::new("a.rs"), code, &[SLEEP]).is_empty());
    }

    #[test]
    fn test_production_dirs_exist() {
        for dir in PRODUCTION_DIRS {
            assert!(workspace_root().join(dir).is_dir(), "{dir} missing");
        }
    }
}
