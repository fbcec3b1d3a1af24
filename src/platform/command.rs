use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::utils::error::{HarnessError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs programs on the host with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        tracing::debug!("Running: {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| HarnessError::Timeout {
                    what: format!("{} {}", program, args.join(" ")),
                    seconds: limit.as_secs(),
                })??,
            None => child.wait_with_output().await?,
        };

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        find_in_path(program)
    }
}

/// Looks `program` up in every `PATH` entry, adding `.exe` on Windows.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_in_path_missing() {
        assert!(find_in_path("definitely-not-a-real-program-7f3a").is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_captures_output() {
        let runner = SystemCommandRunner::new();
        let output = runner
            .run("sh", &["-c".to_string(), "echo hello; exit 3".to_string()], None)
            .await
            .unwrap();
        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let runner = SystemCommandRunner::new();
        let result = runner
            .run(
                "sh",
                &["-c".to_string(), "sleep 5".to_string()],
                Some(Duration::from_millis(100)),
            )
            .await;
        assert!(matches!(result, Err(HarnessError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let runner = SystemCommandRunner::new();
        let result = runner
            .run("definitely-not-a-real-program-7f3a", &[], None)
            .await;
        assert!(matches!(result, Err(HarnessError::IoError(_))));
    }
}
