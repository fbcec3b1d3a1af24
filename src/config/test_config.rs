use crate::domain::ports::ConnectionProvider;
use crate::utils::error::{HarnessError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin";
pub const DEFAULT_PLUGIN_NAME: &str = "obs-polyemesis";

/// Environment variable pointing at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "POLYEMESIS_TEST_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub docker: DockerConfig,
    #[serde(default)]
    pub obs: ObsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub version: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DockerConfig {
    #[serde(default = "default_max_wait_time")]
    pub max_wait_time: u64,
    #[serde(default = "default_health_check_interval")]
    pub health_check_interval: u64,
    #[serde(default = "default_service")]
    pub service: String,
    #[serde(default)]
    pub compose_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsConfig {
    #[serde(default = "default_plugin_name")]
    pub plugin_name: String,
}

fn default_api_version() -> String {
    "v3".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_max_wait_time() -> u64 {
    120
}

fn default_health_check_interval() -> u64 {
    2
}

fn default_service() -> String {
    "restreamer".to_string()
}

fn default_plugin_name() -> String {
    DEFAULT_PLUGIN_NAME.to_string()
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            max_wait_time: default_max_wait_time(),
            health_check_interval: default_health_check_interval(),
            service: default_service(),
            compose_file: None,
        }
    }
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            plugin_name: default_plugin_name(),
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                version: default_api_version(),
                timeout: default_timeout(),
            },
            credentials: CredentialsConfig {
                username: DEFAULT_USERNAME.to_string(),
                password: DEFAULT_PASSWORD.to_string(),
            },
            docker: DockerConfig::default(),
            obs: ObsConfig::default(),
        }
    }
}

/// Directory holding the checked-in test fixtures.
pub fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// `$POLYEMESIS_TEST_CONFIG`, else `fixtures/restreamer_config.json`.
pub fn default_config_path() -> PathBuf {
    std::env::var(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| config_dir().join("restreamer_config.json"))
}

impl TestConfig {
    /// Loads the config from the default location and applies `RESTREAMER_*` overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_file(default_config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`TestConfig::load`] but falls back to built-in defaults when the file is absent.
    pub fn load_or_default() -> Result<Self> {
        let path = default_config_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parses JSON or TOML depending on the file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        Ok(serde_json::from_str(&processed)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RESTREAMER_URL") {
            self.api.base_url = url;
        }
        if let Ok(user) = std::env::var("RESTREAMER_USER") {
            self.credentials.username = user;
        }
        if let Ok(pass) = std::env::var("RESTREAMER_PASS") {
            self.credentials.password = pass;
        }
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }

    /// `{base_url}/api/{version}`
    pub fn api_base(&self) -> String {
        format!("{}/api/{}", self.base_url(), self.api.version)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.docker.max_wait_time)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.docker.health_check_interval)
    }

    /// Variables handed to child processes (OBS, helper scripts) so they find the same server.
    pub fn environment_variables(&self) -> Result<HashMap<String, String>> {
        let url = Url::parse(self.base_url()).map_err(|e| HarnessError::InvalidConfigValueError {
            field: "api.base_url".to_string(),
            value: self.api.base_url.clone(),
            reason: format!("Invalid URL format: {}", e),
        })?;

        let host = url.host_str().unwrap_or("localhost").to_string();
        let port = url.port_or_known_default().unwrap_or(8080).to_string();

        let mut vars = HashMap::new();
        vars.insert("RESTREAMER_HOST".to_string(), host);
        vars.insert("RESTREAMER_PORT".to_string(), port);
        vars.insert("RESTREAMER_USER".to_string(), self.credentials.username.clone());
        vars.insert("RESTREAMER_PASS".to_string(), self.credentials.password.clone());
        vars.insert("RESTREAMER_BASE_URL".to_string(), self.base_url().to_string());

        if cfg!(windows) {
            vars.insert("PATH".to_string(), std::env::var("PATH").unwrap_or_default());
        }

        Ok(vars)
    }
}

/// Replaces `${VAR}` with the variable's value; unknown variables are left untouched.
fn substitute_env_vars(content: &str) -> Result<String> {
    use regex::Regex;
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HarnessError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

impl Validate for TestConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_non_empty_string("api.version", &self.api.version)?;
        validate_range("api.timeout", self.api.timeout, 1, 600)?;
        validate_non_empty_string("credentials.username", &self.credentials.username)?;
        validate_non_empty_string("credentials.password", &self.credentials.password)?;
        validate_positive_number("docker.max_wait_time", self.docker.max_wait_time, 1)?;
        validate_positive_number(
            "docker.health_check_interval",
            self.docker.health_check_interval,
            1,
        )?;
        validate_non_empty_string("docker.service", &self.docker.service)?;
        if let Some(compose_file) = &self.docker.compose_file {
            validate_path("docker.compose_file", compose_file)?;
        }
        validate_non_empty_string("obs.plugin_name", &self.obs.plugin_name)?;

        if self.docker.health_check_interval > self.docker.max_wait_time {
            return Err(HarnessError::ConfigValidationError {
                field: "docker.health_check_interval".to_string(),
                message: format!(
                    "interval {}s exceeds max_wait_time {}s",
                    self.docker.health_check_interval, self.docker.max_wait_time
                ),
            });
        }

        Ok(())
    }
}

impl ConnectionProvider for TestConfig {
    fn base_url(&self) -> &str {
        TestConfig::base_url(self)
    }

    fn username(&self) -> &str {
        &self.credentials.username
    }

    fn password(&self) -> &str {
        &self.credentials.password
    }

    fn api_version(&self) -> &str {
        &self.api.version
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout)
    }
}

/// Connection details read straight from `RESTREAMER_URL` / `RESTREAMER_USER` /
/// `RESTREAMER_PASS`, as the automated suites and CI jobs do.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl ConnectionSettings {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("RESTREAMER_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            username: std::env::var("RESTREAMER_USER")
                .unwrap_or_else(|_| DEFAULT_USERNAME.to_string()),
            password: std::env::var("RESTREAMER_PASS")
                .unwrap_or_else(|_| DEFAULT_PASSWORD.to_string()),
        }
    }
}

impl ConnectionProvider for ConnectionSettings {
    fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }
}
