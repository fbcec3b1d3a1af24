use crate::config::test_config::TestConfig;
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ManagerAction {
    Start,
    Stop,
    Down,
    Status,
    Logs,
    Restart,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "restreamer-manager")]
#[command(about = "Manage the Restreamer Docker container for end-to-end tests")]
pub struct ManagerCli {
    /// Action to perform
    #[arg(value_enum)]
    pub action: ManagerAction,

    /// Don't pull the latest image when starting
    #[arg(long)]
    pub no_pull: bool,

    /// Remove volumes when using 'down'
    #[arg(long)]
    pub volumes: bool,

    /// Follow logs (for 'logs')
    #[arg(short, long)]
    pub follow: bool,

    /// Number of log lines to show
    #[arg(long, default_value = "100")]
    pub tail: u32,

    /// Path to the docker compose file
    #[arg(long)]
    pub compose_file: Option<PathBuf>,

    /// Path to the test configuration (JSON or TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ManagerCli {
    pub fn load_config(&self) -> Result<TestConfig> {
        match &self.config {
            Some(path) => {
                let mut config = TestConfig::from_file(path)?;
                config.apply_env_overrides();
                Ok(config)
            }
            None => TestConfig::load_or_default(),
        }
    }
}
