//! Docker Compose lifecycle for the Restreamer container used by the
//! end-to-end suites.

use crate::config::test_config::TestConfig;
use crate::core::api::login;
use crate::domain::model::About;
use crate::domain::ports::{CommandOutput, CommandRunner};
use crate::platform::docker;
use crate::utils::error::{HarnessError, Result};
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.e2e.yml";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ManagerStatus {
    pub running: bool,
    pub healthy: bool,
    pub authenticated: bool,
    pub version: Option<String>,
    #[serde(skip)]
    pub token: Option<String>,
}

impl ManagerStatus {
    pub fn is_ready(&self) -> bool {
        self.running && self.healthy
    }
}

/// `compose_file`, else the config's `docker.compose_file`, else
/// `docker-compose.e2e.yml` at the project root. A relative configured path
/// is taken from the project root, not the working directory. Must exist.
pub fn resolve_compose_file(compose_file: Option<&Path>, config: &TestConfig) -> Result<PathBuf> {
    let project_root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let candidate = match (compose_file, &config.docker.compose_file) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(configured)) => project_root.join(configured),
        (None, None) => project_root.join(DEFAULT_COMPOSE_FILE),
    };

    if !candidate.exists() {
        return Err(HarnessError::ConfigError {
            message: format!("Docker Compose file not found: {}", candidate.display()),
        });
    }
    Ok(candidate.canonicalize().unwrap_or(candidate))
}

pub struct RestreamerManager<R: CommandRunner> {
    compose_file: PathBuf,
    compose_cmd: Vec<String>,
    config: TestConfig,
    runner: R,
    client: Client,
}

impl<R: CommandRunner> RestreamerManager<R> {
    pub async fn new(compose_file: Option<&Path>, config: TestConfig, runner: R) -> Result<Self> {
        let compose_file = resolve_compose_file(compose_file, &config)?;
        let compose_cmd = docker::compose_command(&runner).await?;

        Ok(Self {
            compose_file,
            compose_cmd,
            config,
            runner,
            client: Client::new(),
        })
    }

    pub fn compose_file(&self) -> &Path {
        &self.compose_file
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub fn username(&self) -> &str {
        &self.config.credentials.username
    }

    fn service(&self) -> &str {
        &self.config.docker.service
    }

    /// `[compose…, -f, <file>, args…]`
    pub fn compose_args(&self, args: &[&str]) -> Vec<String> {
        let mut full: Vec<String> = self.compose_cmd.iter().skip(1).cloned().collect();
        full.push("-f".to_string());
        full.push(self.compose_file.display().to_string());
        full.extend(args.iter().map(|s| s.to_string()));
        full
    }

    pub async fn run_compose(&self, args: &[&str]) -> Result<CommandOutput> {
        let program = self
            .compose_cmd
            .first()
            .ok_or_else(|| HarnessError::DockerError {
                message: "empty compose command".to_string(),
            })?;
        let full = self.compose_args(args);
        tracing::info!("Running: {} {}", program, full.join(" "));
        self.runner.run(program, &full, None).await
    }

    pub async fn is_running(&self) -> bool {
        match self.run_compose(&["ps", "-q", self.service()]).await {
            Ok(output) => !output.stdout.trim().is_empty(),
            Err(e) => {
                tracing::debug!("compose ps failed: {}", e);
                false
            }
        }
    }

    pub async fn start(&self, pull: bool) -> Result<()> {
        tracing::info!("🚀 Starting Restreamer container...");

        if !docker::is_docker_available(&self.runner).await {
            return Err(HarnessError::DockerError {
                message: "Docker is not available or not running".to_string(),
            });
        }

        if pull {
            tracing::info!("📦 Pulling latest Restreamer image...");
            match self.run_compose(&["pull", self.service()]).await {
                Ok(output) if output.success() => {}
                Ok(output) => {
                    tracing::warn!("⚠️ Failed to pull image: {}", output.stderr.trim());
                    tracing::warn!("Continuing with existing image...");
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to pull image: {}", e);
                    tracing::warn!("Continuing with existing image...");
                }
            }
        }

        tracing::info!("🏃 Starting container...");
        let output = self.run_compose(&["up", "-d", self.service()]).await?;
        if !output.success() {
            return Err(HarnessError::DockerError {
                message: format!("failed to start container: {}", output.stderr.trim()),
            });
        }

        tracing::info!("✓ Container started");
        Ok(())
    }

    /// Polls `/api/v3/about` until it answers 200. `timeout` defaults to
    /// `docker.max_wait_time`.
    pub async fn wait_for_health(&self, timeout: Option<Duration>) -> Result<About> {
        let timeout = timeout.unwrap_or_else(|| self.config.max_wait());
        let interval = self.config.health_check_interval();
        let about_url = format!("{}/api/v3/about", self.base_url());
        tracing::info!(
            "⏳ Waiting for Restreamer to become healthy (timeout: {}s)...",
            timeout.as_secs()
        );

        let started = Instant::now();
        let mut attempts = 0u32;

        while started.elapsed() < timeout {
            attempts += 1;
            match self
                .client
                .get(&about_url)
                .timeout(Duration::from_secs(5))
                .send()
                .await
            {
                Ok(response) if response.status().as_u16() == 200 => {
                    tracing::info!(
                        "✅ Restreamer is healthy! (after {:.1}s, {} attempts)",
                        started.elapsed().as_secs_f64(),
                        attempts
                    );
                    let about: About = response.json().await.unwrap_or_default();
                    tracing::info!(
                        "   Version: {}",
                        about.version_string().as_deref().unwrap_or("unknown")
                    );
                    tracing::info!(
                        "   Name: {}",
                        if about.name.is_empty() { "Restreamer" } else { &about.name }
                    );
                    return Ok(about);
                }
                Ok(response) => {
                    tracing::debug!("Health check got HTTP {}", response.status().as_u16())
                }
                Err(e) => tracing::debug!("Health check failed: {}", e),
            }

            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            tokio::time::sleep(interval.min(remaining)).await;
            if attempts % 5 == 0 {
                tracing::info!("   Still waiting... ({} attempts)", attempts);
            }
        }

        tracing::error!("❌ Timeout waiting for Restreamer to become healthy");
        Err(HarnessError::Timeout {
            what: "Restreamer health check".to_string(),
            seconds: timeout.as_secs(),
        })
    }

    pub async fn get_jwt_token(&self) -> Result<String> {
        tracing::info!("🔑 Retrieving JWT token...");
        let token = login(
            &self.client,
            self.base_url(),
            &self.config.credentials.username,
            &self.config.credentials.password,
            Duration::from_secs(10),
        )
        .await?;
        tracing::info!("✓ JWT token retrieved (length: {})", token.len());
        Ok(token)
    }

    pub async fn stop(&self) -> Result<()> {
        tracing::info!("🛑 Stopping Restreamer container...");
        self.expect_success(&["stop", self.service()], "stop container")
            .await?;
        tracing::info!("✓ Container stopped");
        Ok(())
    }

    pub async fn down(&self, volumes: bool) -> Result<()> {
        tracing::info!("🗑️ Removing Restreamer container...");
        let mut args = vec!["down"];
        if volumes {
            args.push("-v");
            tracing::info!("   (including volumes)");
        }
        self.expect_success(&args, "remove container").await?;
        tracing::info!("✓ Container removed");
        Ok(())
    }

    pub async fn logs(&self, follow: bool, tail: u32) -> Result<CommandOutput> {
        let tail = tail.to_string();
        let mut args = vec!["logs"];
        if follow {
            args.push("-f");
        }
        args.extend(["--tail", &tail, self.service()]);
        self.run_compose(&args).await
    }

    /// Stop (failure tolerated), pause two seconds, start and wait for health.
    pub async fn restart(&self, pull: bool) -> Result<About> {
        if let Err(e) = self.stop().await {
            tracing::warn!("Stop before restart failed: {}", e);
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        self.start(pull).await?;
        self.wait_for_health(None).await
    }

    pub async fn get_status(&self) -> ManagerStatus {
        let mut status = ManagerStatus {
            running: self.is_running().await,
            ..Default::default()
        };
        if !status.running {
            return status;
        }

        let about_url = format!("{}/api/v3/about", self.base_url());
        if let Ok(response) = self
            .client
            .get(&about_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            if response.status().as_u16() == 200 {
                status.healthy = true;
                if let Ok(about) = response.json::<About>().await {
                    status.version = about.version_string();
                }
            }
        }

        if status.healthy {
            match self.get_jwt_token().await {
                Ok(token) => {
                    status.authenticated = true;
                    status.token = Some(token);
                }
                Err(e) => tracing::warn!("❌ Failed to retrieve token: {}", e),
            }
        }
        status
    }

    async fn expect_success(&self, args: &[&str], action: &str) -> Result<()> {
        let output = self.run_compose(args).await?;
        if output.success() {
            return Ok(());
        }
        Err(HarnessError::DockerError {
            message: format!("failed to {}: {}", action, output.stderr.trim()),
        })
    }
}
