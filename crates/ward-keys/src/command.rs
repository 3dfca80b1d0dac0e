//! Command port for the key tool
//!
//! The gateway only sees raw text and an exit status through
//! [`CommandRunner`]. [`ProcessCommandRunner`] spawns the real tool; tests
//! substitute a scripted runner.

use crate::error::CommandError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Stdio;

/// Captured result of one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into [`CommandError::Failed`]
    pub fn into_success(self, invocation: &ToolInvocation) -> Result<Self, CommandError> {
        if self.success() {
            Ok(self)
        } else {
            Err(CommandError::Failed {
                command: invocation.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// A fully formed key tool command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// How the key tool is reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolFrontEnd {
    /// `algokit goal ...`
    #[default]
    Algokit,
    /// `goal ...`
    Goal,
}

impl ToolFrontEnd {
    /// Command line for `goal account <subcommand> <args>`
    pub fn invocation<I, S>(&self, subcommand: &str, args: I) -> ToolInvocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut full = Vec::new();
        let program = match self {
            ToolFrontEnd::Algokit => {
                full.push("goal".to_string());
                "algokit"
            }
            ToolFrontEnd::Goal => "goal",
        };
        full.push("account".to_string());
        full.push(subcommand.to_string());
        full.extend(args.into_iter().map(Into::into));

        ToolInvocation {
            program: program.to_string(),
            args: full,
        }
    }
}

/// Runs a command to completion and captures its output
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> Result<CommandOutput, CommandError>;
}

/// Runs commands as child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCommandRunner;

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<CommandOutput, CommandError> {
        let output = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: invocation.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algokit_front_end_prefixes_goal() {
        let invocation = ToolFrontEnd::Algokit.invocation("deletepartkey", ["--partkeyid=ABC"]);
        assert_eq!(invocation.program, "algokit");
        assert_eq!(invocation.args, vec!["goal", "account", "deletepartkey", "--partkeyid=ABC"]);
        assert_eq!(
            invocation.to_string(),
            "algokit goal account deletepartkey --partkeyid=ABC"
        );
    }

    #[test]
    fn test_goal_front_end() {
        let invocation = ToolFrontEnd::Goal.invocation("listpartkeys", Vec::<String>::new());
        assert_eq!(invocation.to_string(), "goal account listpartkeys");
    }

    #[test]
    fn test_into_success_reports_failure() {
        let invocation = ToolFrontEnd::Goal.invocation("partkeyinfo", Vec::<String>::new());
        let output = CommandOutput {
            status: Some(1),
            stdout: String::new(),
            stderr: "node not running\n".to_string(),
        };
        match output.into_success(&invocation) {
            Err(CommandError::Failed { status, stderr, .. }) => {
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "node not running");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let invocation = ToolInvocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo hello; exit 3".to_string()],
        };
        let output = ProcessCommandRunner.run(&invocation).await.unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout, "hello\n");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_process_runner_spawn_failure() {
        let invocation = ToolInvocation {
            program: "ward-no-such-binary".to_string(),
            args: vec![],
        };
        let err = ProcessCommandRunner.run(&invocation).await.unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
