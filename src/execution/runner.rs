//! External process runner - drives the vendor binary

use async_trait::async_trait;
use console::style;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

/// Output decoration for one tool invocation.
///
/// Passed per call rather than held in process-wide flags, so a run that
/// wants undecorated tool output (the usual case: vendor logs are verbose
/// enough on their own) cannot leak that preference into anything else.
#[derive(Debug, Clone, Copy)]
pub struct OutputStyle {
    /// Colour the echoed tool output.
    pub colour: bool,
    /// Prefix each echoed line with the binary name.
    pub tag: bool,
}

impl OutputStyle {
    pub fn plain() -> Self {
        Self { colour: false, tag: false }
    }

    pub fn decorated() -> Self {
        Self { colour: true, tag: true }
    }
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self::decorated()
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("failed to spawn `{bin}`: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{bin}` exited with code {code}: {stderr}")]
    NonZeroExit { bin: String, code: i32, stderr: String },
}

/// Trait for tool invocation - allows substituting a double in tests.
///
/// `args[0]` is the binary; the rest are its arguments. `env` is appended to
/// the inherited environment (license servers, tool homes).
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(
        &self,
        args: &[String],
        cwd: &Path,
        env: &[(String, String)],
        output: OutputStyle,
    ) -> Result<(), RunnerError>;
}

/// Runs the tool as a subprocess and echoes its stdout.
///
/// The exit status is verified: a nonzero exit is an error, including for
/// tools that report failures only through their exit code.
#[derive(Debug, Clone, Default)]
pub struct SubprocessRunner;

impl SubprocessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for SubprocessRunner {
    async fn run(
        &self,
        args: &[String],
        cwd: &Path,
        env: &[(String, String)],
        output: OutputStyle,
    ) -> Result<(), RunnerError> {
        let bin = args.first().ok_or(RunnerError::EmptyCommand)?.clone();
        debug!("executing `{}` in {}", args.join(" "), cwd.display());

        let result = Command::new(&bin)
            .args(&args[1..])
            .current_dir(cwd)
            .envs(env.iter().map(|(k, v)| (k.clone(), v.clone())))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RunnerError::Spawn { bin: bin.clone(), source: e })?;

        let tag = Path::new(&bin)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| bin.clone());

        for line in String::from_utf8_lossy(&result.stdout).lines() {
            let line = if output.tag { format!("[{}] {}", tag, line) } else { line.to_string() };
            if output.colour {
                println!("{}", style(line).dim());
            } else {
                println!("{}", line);
            }
        }

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            let code = result.status.code().unwrap_or(-1);
            warn!("`{}` exited with code {}", bin, code);
            return Err(RunnerError::NonZeroExit { bin, code, stderr });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_invocation() {
        let runner = SubprocessRunner::new();
        let args = vec!["true".to_string()];
        let result = runner.run(&args, Path::new("."), &[], OutputStyle::plain()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let runner = SubprocessRunner::new();
        let args = vec!["false".to_string()];
        let result = runner.run(&args, Path::new("."), &[], OutputStyle::plain()).await;
        assert!(matches!(result, Err(RunnerError::NonZeroExit { code: 1, .. })));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let runner = SubprocessRunner::new();
        let args = vec!["nonexistent-vendor-binary".to_string()];
        let result = runner.run(&args, Path::new("."), &[], OutputStyle::plain()).await;
        assert!(matches!(result, Err(RunnerError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_env_reaches_the_tool() {
        let runner = SubprocessRunner::new();
        let args = vec![
            "sh".to_string(),
            "-c".to_string(),
            "test \"$CDS_LIC_FILE\" = 5280@license".to_string(),
        ];
        let env = vec![("CDS_LIC_FILE".to_string(), "5280@license".to_string())];
        let result = runner.run(&args, Path::new("."), &env, OutputStyle::plain()).await;
        assert!(result.is_ok());
    }
}
