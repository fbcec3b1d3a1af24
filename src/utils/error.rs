use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unexpected HTTP {status} from {url}: {body}")]
    StatusError {
        status: u16,
        url: String,
        body: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Not authenticated - call authenticate() first")]
    NotAuthenticated,

    #[error("Authentication failed: {message}")]
    AuthenticationError { message: String },

    #[error("Docker error: {message}")]
    DockerError { message: String },

    #[error("Unsupported platform: {system}")]
    UnsupportedPlatform { system: String },

    #[error("OBS Studio is not installed")]
    ObsNotInstalled,

    #[error("Plugin binary not found in {build_dir} (searched: {searched:?})")]
    PluginBinaryNotFound {
        build_dir: String,
        searched: Vec<String>,
    },

    #[error("Timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("Scenario step '{step}' failed: {message}")]
    ScenarioFailed { step: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Configuration,
    Environment,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl HarnessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarnessError::HttpError(_) | HarnessError::Timeout { .. } => ErrorCategory::Network,
            HarnessError::StatusError { .. }
            | HarnessError::NotAuthenticated
            | HarnessError::AuthenticationError { .. } => ErrorCategory::Api,
            HarnessError::ConfigError { .. }
            | HarnessError::InvalidConfigValueError { .. }
            | HarnessError::ConfigValidationError { .. }
            | HarnessError::TomlError(_) => ErrorCategory::Configuration,
            HarnessError::IoError(_)
            | HarnessError::DockerError { .. }
            | HarnessError::UnsupportedPlatform { .. }
            | HarnessError::ObsNotInstalled
            | HarnessError::PluginBinaryNotFound { .. } => ErrorCategory::Environment,
            HarnessError::SerializationError(_) | HarnessError::ScenarioFailed { .. } => {
                ErrorCategory::Data
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            HarnessError::HttpError(_)
            | HarnessError::Timeout { .. }
            | HarnessError::ScenarioFailed { .. } => ErrorSeverity::Medium,
            HarnessError::StatusError { status, .. } if *status >= 500 => ErrorSeverity::Medium,
            HarnessError::StatusError { .. }
            | HarnessError::NotAuthenticated
            | HarnessError::AuthenticationError { .. }
            | HarnessError::SerializationError(_)
            | HarnessError::PluginBinaryNotFound { .. } => ErrorSeverity::High,
            HarnessError::ConfigError { .. }
            | HarnessError::InvalidConfigValueError { .. }
            | HarnessError::ConfigValidationError { .. }
            | HarnessError::TomlError(_) => ErrorSeverity::High,
            HarnessError::IoError(_)
            | HarnessError::DockerError { .. }
            | HarnessError::UnsupportedPlatform { .. }
            | HarnessError::ObsNotInstalled => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HarnessError::HttpError(_) => {
                "Check that Restreamer is reachable at the configured base URL"
            }
            HarnessError::StatusError { status: 401, .. }
            | HarnessError::NotAuthenticated
            | HarnessError::AuthenticationError { .. } => {
                "Verify RESTREAMER_USER / RESTREAMER_PASS or the credentials section of the config"
            }
            HarnessError::StatusError { status: 404, .. } => {
                "The requested process or file does not exist on the server"
            }
            HarnessError::StatusError { .. } => "Inspect the response body and the Restreamer logs",
            HarnessError::Timeout { .. } => {
                "Increase docker.max_wait_time or check `restreamer-manager logs`"
            }
            HarnessError::ConfigError { .. }
            | HarnessError::InvalidConfigValueError { .. }
            | HarnessError::ConfigValidationError { .. }
            | HarnessError::TomlError(_) => "Fix the test configuration file and try again",
            HarnessError::DockerError { .. } => {
                "Make sure Docker is installed, running and `docker compose` is available"
            }
            HarnessError::UnsupportedPlatform { .. } => "Run the harness on Windows, macOS or Linux",
            HarnessError::ObsNotInstalled => "Install OBS Studio or add it to PATH",
            HarnessError::PluginBinaryNotFound { .. } => {
                "Build the plugin first and pass the CMake build directory"
            }
            HarnessError::IoError(_) => "Check file permissions and available disk space",
            HarnessError::SerializationError(_) => {
                "The server returned an unexpected body; check the API version"
            }
            HarnessError::ScenarioFailed { .. } => {
                "Re-run with --verbose and compare the server state with the failed step"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not talk to Restreamer: {}", self),
            ErrorCategory::Api => format!("Restreamer rejected the request: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Environment => format!("Test environment problem: {}", self),
            ErrorCategory::Data => format!("Unexpected data: {}", self),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl HarnessError {
    pub fn scenario(step: impl Into<String>, message: impl Into<String>) -> Self {
        HarnessError::ScenarioFailed {
            step: step.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
