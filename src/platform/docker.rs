use crate::domain::ports::CommandRunner;
use crate::utils::error::{HarnessError, Result};
use std::time::Duration;

const DOCKER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// `docker` is on `PATH` and `docker info` exits 0 within five seconds.
pub async fn is_docker_available<R: CommandRunner>(runner: &R) -> bool {
    if runner.which("docker").is_none() {
        return false;
    }

    match runner
        .run("docker", &strings(&["info"]), Some(DOCKER_PROBE_TIMEOUT))
        .await
    {
        Ok(output) => output.success(),
        Err(e) => {
            tracing::debug!("docker info failed: {}", e);
            false
        }
    }
}

/// The compose invocation as program plus leading arguments:
/// `docker compose` (v2) when available, else `docker-compose` (v1).
pub async fn compose_command<R: CommandRunner>(runner: &R) -> Result<Vec<String>> {
    let v2 = runner
        .run(
            "docker",
            &strings(&["compose", "version"]),
            Some(DOCKER_PROBE_TIMEOUT),
        )
        .await;
    if matches!(&v2, Ok(output) if output.success()) {
        return Ok(strings(&["docker", "compose"]));
    }

    if runner.which("docker-compose").is_some() {
        return Ok(strings(&["docker-compose"]));
    }

    Err(HarnessError::DockerError {
        message: "neither 'docker compose' nor 'docker-compose' is available".to_string(),
    })
}
