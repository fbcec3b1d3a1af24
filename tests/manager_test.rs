use httpmock::prelude::*;
use polyemesis_harness::config::test_config::config_dir;
use polyemesis_harness::core::manager::{resolve_compose_file, RestreamerManager};
use polyemesis_harness::domain::ports::{CommandOutput, CommandRunner};
use polyemesis_harness::{HarnessError, Result, TestConfig};
use serde_json::json;
use serial_test::serial;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

type Calls = Arc<Mutex<Vec<Vec<String>>>>;

/// Answers docker and compose invocations from a fixed script and records
/// every call as `[program, args...]`.
#[derive(Clone, Default)]
struct ScriptedRunner {
    docker_installed: bool,
    pull_fails: bool,
    up_fails: bool,
    stop_fails: bool,
    ps_stdout: String,
    calls: Calls,
}

impl ScriptedRunner {
    fn healthy() -> Self {
        Self {
            docker_installed: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    fn compose_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|call| call.iter().any(|arg| arg == "-f"))
            .collect()
    }
}

fn exited(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        status: Some(code),
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.lock().unwrap().push(call);

        let has = |word: &str| args.iter().any(|arg| arg == word);
        let output = if has("pull") && self.pull_fails {
            exited(1, "", "pull access denied")
        } else if has("up") && self.up_fails {
            exited(1, "", "port is already allocated")
        } else if has("stop") && self.stop_fails {
            exited(1, "", "no such service: restreamer")
        } else if has("ps") {
            exited(0, &self.ps_stdout, "")
        } else if has("logs") {
            exited(0, "restreamer  | core started\n", "")
        } else {
            exited(0, "", "")
        };
        Ok(output)
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        (self.docker_installed && program == "docker").then(|| PathBuf::from("/usr/bin/docker"))
    }
}

fn compose_fixture() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docker-compose.e2e.yml");
    std::fs::write(&path, "services:\n  restreamer:\n    image: datarhei/restreamer\n").unwrap();
    (dir, path)
}

fn config_for(base_url: &str) -> TestConfig {
    let mut config = TestConfig::default();
    config.api.base_url = base_url.to_string();
    config.docker.health_check_interval = 1;
    config
}

async fn manager(
    compose: &Path,
    base_url: &str,
    runner: ScriptedRunner,
) -> RestreamerManager<ScriptedRunner> {
    RestreamerManager::new(Some(compose), config_for(base_url), runner)
        .await
        .unwrap()
}

#[test]
fn test_missing_compose_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yml");
    let result = resolve_compose_file(Some(&missing), &TestConfig::default());
    assert!(matches!(result, Err(HarnessError::ConfigError { .. })));
}

#[test]
#[serial]
fn test_configured_compose_file_ignores_working_directory() {
    let config = TestConfig::from_file(config_dir().join("restreamer_config.json")).unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let original = std::env::current_dir().unwrap();

    std::env::set_current_dir(elsewhere.path()).unwrap();
    let resolved = resolve_compose_file(None, &config);
    std::env::set_current_dir(original).unwrap();

    let expected = Path::new(env!("CARGO_MANIFEST_DIR")).join("docker-compose.e2e.yml");
    assert_eq!(resolved.unwrap(), expected.canonicalize().unwrap());
}

#[test]
fn test_compose_file_from_config() {
    let (_dir, path) = compose_fixture();
    let mut config = TestConfig::default();
    config.docker.compose_file = Some(path.display().to_string());
    let resolved = resolve_compose_file(None, &config).unwrap();
    assert_eq!(resolved, path.canonicalize().unwrap());
}

#[tokio::test]
async fn test_compose_args_prefix_file() {
    let (_dir, path) = compose_fixture();
    let runner = ScriptedRunner::healthy();
    let manager = manager(&path, "http://localhost:8080", runner).await;

    let file = manager.compose_file().display().to_string();
    assert_eq!(
        manager.compose_args(&["ps", "-q", "restreamer"]),
        vec!["compose", "-f", file.as_str(), "ps", "-q", "restreamer"]
    );
}

#[tokio::test]
async fn test_start_tolerates_pull_failure() {
    let (_dir, path) = compose_fixture();
    let runner = ScriptedRunner {
        pull_fails: true,
        ..ScriptedRunner::healthy()
    };
    let manager = manager(&path, "http://localhost:8080", runner.clone()).await;

    manager.start(true).await.unwrap();

    let compose: Vec<String> = runner
        .compose_calls()
        .iter()
        .map(|call| call[4..].join(" "))
        .collect();
    assert_eq!(compose, vec!["pull restreamer", "up -d restreamer"]);
    assert!(runner.calls().iter().any(|call| call == &["docker", "info"]));
}

#[tokio::test]
async fn test_start_fails_when_up_fails() {
    let (_dir, path) = compose_fixture();
    let runner = ScriptedRunner {
        up_fails: true,
        ..ScriptedRunner::healthy()
    };
    let manager = manager(&path, "http://localhost:8080", runner).await;

    match manager.start(false).await {
        Err(HarnessError::DockerError { message }) => {
            assert!(message.contains("port is already allocated"));
        }
        other => panic!("expected DockerError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_start_requires_docker() {
    let (_dir, path) = compose_fixture();
    let runner = ScriptedRunner::default();
    let manager = manager(&path, "http://localhost:8080", runner.clone()).await;

    assert!(matches!(
        manager.start(false).await,
        Err(HarnessError::DockerError { .. })
    ));
    assert!(runner.compose_calls().is_empty());
}

#[tokio::test]
async fn test_down_logs_and_running() {
    let (_dir, path) = compose_fixture();
    let runner = ScriptedRunner {
        ps_stdout: "4f2a9c1e\n".to_string(),
        ..ScriptedRunner::healthy()
    };
    let manager = manager(&path, "http://localhost:8080", runner.clone()).await;

    assert!(manager.is_running().await);
    manager.down(true).await.unwrap();
    let logs = manager.logs(false, 50).await.unwrap();
    assert!(logs.stdout.contains("core started"));

    let compose: Vec<String> = runner
        .compose_calls()
        .iter()
        .map(|call| call[4..].join(" "))
        .collect();
    assert_eq!(
        compose,
        vec!["ps -q restreamer", "down -v", "logs --tail 50 restreamer"]
    );
}

#[tokio::test]
async fn test_not_running_when_ps_is_empty() {
    let (_dir, path) = compose_fixture();
    let manager = manager(&path, "http://localhost:8080", ScriptedRunner::healthy()).await;

    assert!(!manager.is_running().await);
    let status = manager.get_status().await;
    assert!(!status.running);
    assert!(!status.is_ready());
}

#[tokio::test]
async fn test_wait_for_health_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/about");
            then.status(503);
        })
        .await;

    let (_dir, path) = compose_fixture();
    let manager = manager(&path, &server.base_url(), ScriptedRunner::healthy()).await;

    // The one-second poll interval must not stretch a 300 ms deadline.
    let started = Instant::now();
    let result = manager
        .wait_for_health(Some(Duration::from_millis(300)))
        .await;
    assert!(matches!(result, Err(HarnessError::Timeout { .. })));
    assert!(started.elapsed() < Duration::from_millis(900));
}

#[tokio::test]
async fn test_status_of_healthy_instance() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/about");
            then.status(200).json_body(json!({
                "app": "datarhei-core",
                "name": "Restreamer",
                "version": {"number": "16.16.0"},
            }));
        })
        .await;
    let login = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/login")
                .json_body(json!({"username": "admin", "password": "admin"}));
            then.status(200).json_body(json!({"access_token": "jwt-token"}));
        })
        .await;

    let (_dir, path) = compose_fixture();
    let runner = ScriptedRunner {
        ps_stdout: "4f2a9c1e\n".to_string(),
        ..ScriptedRunner::healthy()
    };
    let manager = manager(&path, &server.base_url(), runner).await;

    let about = manager.wait_for_health(None).await.unwrap();
    assert_eq!(about.version_string().as_deref(), Some("16.16.0"));

    let status = manager.get_status().await;
    login.assert_async().await;
    assert!(status.is_ready());
    assert!(status.authenticated);
    assert_eq!(status.version.as_deref(), Some("16.16.0"));
    assert_eq!(status.token.as_deref(), Some("jwt-token"));
}

#[tokio::test]
async fn test_jwt_token_rejected() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/login");
            then.status(401);
        })
        .await;

    let (_dir, path) = compose_fixture();
    let manager = manager(&path, &server.base_url(), ScriptedRunner::healthy()).await;

    assert!(matches!(
        manager.get_jwt_token().await,
        Err(HarnessError::AuthenticationError { .. })
    ));
}

#[tokio::test]
async fn test_restart_goes_on_after_failed_stop() {
    let server = MockServer::start_async().await;
    let about = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/about");
            then.status(200)
                .json_body(json!({"name": "Restreamer", "version": "2.8.0"}));
        })
        .await;

    let (_dir, path) = compose_fixture();
    let runner = ScriptedRunner {
        stop_fails: true,
        ..ScriptedRunner::healthy()
    };
    let manager = manager(&path, &server.base_url(), runner.clone()).await;

    let about_body = manager.restart(false).await.unwrap();
    assert_eq!(about_body.version_string().as_deref(), Some("2.8.0"));
    about.assert_hits_async(1).await;

    let compose: Vec<String> = runner
        .compose_calls()
        .iter()
        .map(|call| call[4..].join(" "))
        .collect();
    assert_eq!(compose, vec!["stop restreamer", "up -d restreamer"]);
}
