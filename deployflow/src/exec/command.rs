//! Command description and captured result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A single external invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Binary to execute.
    pub program: String,
    /// Arguments, passed verbatim (no shell).
    pub args: Vec<String>,
    /// Bytes written to the child's standard input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<Vec<u8>>,
    /// Hard limit after which the child is killed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            timeout: None,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feeds `input` to standard input.
    #[must_use]
    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Sets the kill timeout.
    #[must_use]
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Returns true if the arguments start with `prefix`.
    #[must_use]
    pub fn has_prefix(&self, program: &str, prefix: &[&str]) -> bool {
        self.program == program
            && self.args.len() >= prefix.len()
            && self.args.iter().zip(prefix).all(|(a, p)| a == p)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{arg}'")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// What a finished command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// A zero-exit output with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A non-zero exit output with the given stderr.
    #[must_use]
    pub fn failure(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// Exit code 0.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Standard output as trimmed text.
    #[must_use]
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    /// Standard error as trimmed text.
    #[must_use]
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

impl From<std::process::Output> for CommandOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_quotes_whitespace() {
        let spec = CommandSpec::new("kubectl")
            .args(["get", "rs"])
            .arg("-o")
            .arg("jsonpath={.items[*].metadata.name}")
            .arg("a b");
        assert_eq!(
            spec.to_string(),
            "kubectl get rs -o jsonpath={.items[*].metadata.name} 'a b'"
        );
    }

    #[test]
    fn test_has_prefix() {
        let spec = CommandSpec::new("docker").args(["push", "img:1"]);
        assert!(spec.has_prefix("docker", &["push"]));
        assert!(!spec.has_prefix("docker", &["build"]));
        assert!(!spec.has_prefix("kubectl", &["push"]));
    }

    #[test]
    fn test_output_helpers() {
        let ok = CommandOutput::success("  10.0.0.1\n");
        assert!(ok.is_success());
        assert_eq!(ok.stdout_text(), "10.0.0.1");

        let failed = CommandOutput::failure(2, "boom\n");
        assert!(!failed.is_success());
        assert_eq!(failed.stderr_text(), "boom");

        let killed = CommandOutput {
            exit_code: None,
            ..CommandOutput::default()
        };
        assert!(!killed.is_success());
    }
}
