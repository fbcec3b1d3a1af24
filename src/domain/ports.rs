use crate::utils::error::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Where and as whom to reach a Restreamer instance.
pub trait ConnectionProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn username(&self) -> &str;
    fn password(&self) -> &str;
    fn api_version(&self) -> &str {
        "v3"
    }
    fn timeout(&self) -> Duration {
        Duration::from_secs(10)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external tools (docker, docker compose, obs). Abstracted so the
/// lifecycle helpers can be exercised without Docker installed.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<CommandOutput>> + Send;

    fn which(&self, program: &str) -> Option<PathBuf>;
}
