//! JSON bodies exchanged with the Restreamer (datarhei Core) API v3.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInput {
    pub id: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub id: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ProcessInput {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

impl ProcessOutput {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Body for creating or replacing a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub id: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<ProcessInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<ProcessOutput>,
}

impl ProcessConfig {
    pub fn new(id: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reference: reference.into(),
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    pub fn with_input(mut self, input: ProcessInput) -> Self {
        self.input.push(input);
        self
    }

    pub fn with_output(mut self, output: ProcessOutput) -> Self {
        self.output.push(output);
        self
    }

    /// lavfi test pattern encoded to a local HLS playlist. Used by the
    /// streaming scenarios and the live suite.
    pub fn test_source(id: impl Into<String>, reference: impl Into<String>, duration_secs: u32) -> Self {
        Self::new(id, reference)
            .with_input(
                ProcessInput::new(
                    "input_0",
                    format!("testsrc=duration={}:size=1280x720:rate=30", duration_secs),
                )
                .with_options(["-f", "lavfi"]),
            )
            .with_output(
                ProcessOutput::new("output_0", "http://localhost:8888/test.m3u8").with_options([
                    "-codec:v",
                    "libx264",
                    "-preset",
                    "ultrafast",
                    "-b:v",
                    "1000k",
                    "-codec:a",
                    "aac",
                    "-b:a",
                    "128k",
                    "-f",
                    "hls",
                ]),
            )
    }
}

/// A process as returned by `GET /process/{id}`. Depending on the server
/// version inputs and outputs sit at the top level or under `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub id: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ProcessConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<ProcessInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<ProcessOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProcessState>,
}

impl ProcessDescriptor {
    pub fn inputs(&self) -> &[ProcessInput] {
        match &self.config {
            Some(config) if !config.input.is_empty() => &config.input,
            _ => &self.input,
        }
    }

    pub fn outputs(&self) -> &[ProcessOutput] {
        match &self.config {
            Some(config) if !config.output.is_empty() => &config.output,
            _ => &self.output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessState {
    #[serde(default)]
    pub order: String,
    #[serde(default)]
    pub exec: String,
    #[serde(default)]
    pub runtime_seconds: u64,
    #[serde(default)]
    pub reconnect_seconds: i64,
    #[serde(default)]
    pub last_logline: String,
    #[serde(default)]
    pub cpu_usage: f64,
    #[serde(default)]
    pub memory_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

impl ProcessState {
    pub fn exec_state(&self) -> ExecState {
        ExecState::from(self.exec.as_str())
    }
}

/// The server's `exec` string, mirrored as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecState {
    Starting,
    Running,
    Finishing,
    Finished,
    Failed,
    Killed,
    Other(String),
}

impl ExecState {
    /// States accepted right after a start command: FFmpeg may still be
    /// spinning up, or may have failed because the ingest is not reachable.
    pub fn is_started_or_failed(&self) -> bool {
        matches!(self, ExecState::Starting | ExecState::Running | ExecState::Failed)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            ExecState::Finishing | ExecState::Finished | ExecState::Killed
        )
    }
}

impl From<&str> for ExecState {
    fn from(value: &str) -> Self {
        match value {
            "starting" => ExecState::Starting,
            "running" => ExecState::Running,
            "finishing" => ExecState::Finishing,
            "finished" => ExecState::Finished,
            "failed" => ExecState::Failed,
            "killed" => ExecState::Killed,
            other => ExecState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExecState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecState::Starting => "starting",
            ExecState::Running => "running",
            ExecState::Finishing => "finishing",
            ExecState::Finished => "finished",
            ExecState::Failed => "failed",
            ExecState::Killed => "killed",
            ExecState::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessCommand {
    Start,
    Stop,
    Restart,
    Reload,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandRequest {
    pub command: ProcessCommand,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct About {
    #[serde(default)]
    pub app: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub version: serde_json::Value,
}

impl About {
    /// `version` is either a plain string or an object with a `number` field.
    pub fn version_string(&self) -> Option<String> {
        match &self.version {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(map) => map
                .get("number")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// One entry of `GET /fs` or `GET /fs/{name}`. Older servers return bare names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FsEntry {
    Detailed {
        name: String,
        #[serde(default)]
        size_bytes: Option<u64>,
        #[serde(default)]
        last_modified: Option<i64>,
        #[serde(default, rename = "type")]
        kind: Option<String>,
        #[serde(default)]
        mount: Option<String>,
    },
    Name(String),
}

impl FsEntry {
    pub fn name(&self) -> &str {
        match self {
            FsEntry::Detailed { name, .. } => name,
            FsEntry::Name(name) => name,
        }
    }

    pub fn size_bytes(&self) -> Option<u64> {
        match self {
            FsEntry::Detailed { size_bytes, .. } => *size_bytes,
            FsEntry::Name(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayoutStatus {
    pub state: String,
    #[serde(flatten)]
    pub details: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_with_top_level_io() {
        let descriptor: ProcessDescriptor = serde_json::from_value(json!({
            "id": "test_read_1",
            "reference": "obs-polyemesis-test",
            "input": [{"id": "input_0", "address": "rtmp://localhost/live/in"}],
            "output": [{"id": "output_0", "address": "rtmp://localhost/live/out"}]
        }))
        .unwrap();

        assert_eq!(descriptor.inputs().len(), 1);
        assert_eq!(descriptor.outputs()[0].address, "rtmp://localhost/live/out");
    }

    #[test]
    fn test_descriptor_with_nested_config() {
        let descriptor: ProcessDescriptor = serde_json::from_value(json!({
            "id": "test_read_2",
            "reference": "obs-polyemesis-test",
            "config": {
                "id": "test_read_2",
                "reference": "obs-polyemesis-test",
                "input": [{"id": "input_0", "address": "rtmp://localhost/live/in"}],
                "output": [
                    {"id": "youtube", "address": "rtmp://a.rtmp.youtube.com/live2/key", "options": ["-f", "flv"]},
                    {"id": "twitch", "address": "rtmp://live.twitch.tv/app/key"}
                ]
            },
            "state": {"order": "stop", "exec": "finished"}
        }))
        .unwrap();

        assert_eq!(descriptor.outputs().len(), 2);
        assert_eq!(descriptor.outputs()[0].options, vec!["-f", "flv"]);
        assert_eq!(
            descriptor.state.as_ref().map(|s| s.exec_state()),
            Some(ExecState::Finished)
        );
    }

    #[test]
    fn test_state_tolerates_missing_fields() {
        let state: ProcessState = serde_json::from_value(json!({"order": "start"})).unwrap();
        assert_eq!(state.order, "start");
        assert_eq!(state.exec_state(), ExecState::Other(String::new()));
    }

    #[test]
    fn test_exec_state_mapping() {
        assert!(ExecState::from("starting").is_started_or_failed());
        assert!(ExecState::from("failed").is_started_or_failed());
        assert!(ExecState::from("finished").is_stopped());
        assert_eq!(ExecState::from("reconnecting").to_string(), "reconnecting");
    }

    #[test]
    fn test_command_body() {
        let body = serde_json::to_value(CommandRequest {
            command: ProcessCommand::Restart,
        })
        .unwrap();
        assert_eq!(body, json!({"command": "restart"}));
    }

    #[test]
    fn test_process_config_omits_empty_io() {
        let body = serde_json::to_value(ProcessConfig::new("catalog_1", "recording_catalog")).unwrap();
        assert_eq!(body, json!({"id": "catalog_1", "reference": "recording_catalog"}));
    }

    #[test]
    fn test_fs_entry_shapes() {
        let entries: Vec<FsEntry> = serde_json::from_value(json!([
            {"name": "disk", "type": "disk", "mount": "/data"},
            "mem",
            {"name": "/recordings/a.mp4", "size_bytes": 1024, "last_modified": 1700000000}
        ]))
        .unwrap();

        let names: Vec<&str> = entries.iter().map(FsEntry::name).collect();
        assert_eq!(names, vec!["disk", "mem", "/recordings/a.mp4"]);
        assert_eq!(entries[2].size_bytes(), Some(1024));
        assert_eq!(entries[1].size_bytes(), None);
    }

    #[test]
    fn test_about_version_shapes() {
        let plain: About = serde_json::from_value(json!({"name": "Restreamer", "version": "2.8.0"})).unwrap();
        assert_eq!(plain.version_string().as_deref(), Some("2.8.0"));

        let nested: About = serde_json::from_value(json!({
            "app": "datarhei-core",
            "version": {"number": "16.16.0", "arch": "linux/amd64"}
        }))
        .unwrap();
        assert_eq!(nested.version_string().as_deref(), Some("16.16.0"));
    }
}
