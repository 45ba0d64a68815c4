//! External tool lookup
//!
//! Steps are opaque shell lines, so the best we can do is check whether the
//! first word of the line resolves on `PATH`.

use std::path::PathBuf;

/// Whether a step's program can be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    Found(PathBuf),
    Missing(String),
    /// Line does not start with a plain program name (empty, builtin syntax, etc.)
    Unknown,
}

impl ToolStatus {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

/// First word of a shell command line, skipping leading `VAR=value` assignments
pub fn program_of(command: &str) -> Option<&str> {
    command
        .split_whitespace()
        .find(|word| !is_assignment(word))
        .filter(|word| {
            word.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | '+'))
        })
}

fn is_assignment(word: &str) -> bool {
    match word.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !name.starts_with(|c: char| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Resolve the program a command line would run
pub fn resolve(command: &str) -> ToolStatus {
    match program_of(command) {
        Some(program) => match which::which(program) {
            Ok(path) => ToolStatus::Found(path),
            Err(_) => ToolStatus::Missing(program.to_string()),
        },
        None => ToolStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_of_plain_command() {
        assert_eq!(program_of("cargo clippy --all-targets"), Some("cargo"));
    }

    #[test]
    fn test_program_of_skips_env_assignments() {
        assert_eq!(
            program_of("RUSTFLAGS=-Dwarnings cargo test --quiet"),
            Some("cargo")
        );
    }

    #[test]
    fn test_program_of_rejects_shell_syntax() {
        assert_eq!(program_of(""), None);
        assert_eq!(program_of("(cd sub && make)"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_sh() {
        assert!(matches!(resolve("sh -c true"), ToolStatus::Found(_)));
    }

    #[test]
    fn test_resolve_missing() {
        let status = resolve("definitely-not-a-real-tool-8f3a --flag");
        assert_eq!(
            status,
            ToolStatus::Missing("definitely-not-a-real-tool-8f3a".to_string())
        );
        assert!(status.is_missing());
    }
}
