//! Basic-auth client used by the automated suites. Every non-2xx answer is
//! an error, mirroring a `raise_for_status` session.

use crate::core::http::{decode_lenient, ensure_success};
use crate::domain::model::{
    About, CommandRequest, ProcessCommand, ProcessConfig, ProcessDescriptor, ProcessInput,
    ProcessOutput, ProcessState,
};
use crate::domain::ports::ConnectionProvider;
use crate::utils::error::Result;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Reference stamped on every process the suites create.
pub const TEST_REFERENCE: &str = "obs-polyemesis-test";

#[derive(Debug, Clone)]
pub struct RestreamerClient {
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
    client: Client,
}

impl RestreamerClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            timeout: Duration::from_secs(10),
            client: Client::new(),
        }
    }

    pub fn from_provider<P: ConnectionProvider + ?Sized>(provider: &P) -> Self {
        Self::new(provider.base_url(), provider.username(), provider.password())
            .with_timeout(provider.timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, method: Method, endpoint: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = ensure_success(request.send().await?).await?;
        decode_lenient(response).await
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value> {
        self.send(Method::GET, endpoint, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, data: &B) -> Result<Value> {
        self.send(Method::POST, endpoint, Some(serde_json::to_value(data)?))
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, endpoint: &str, data: &B) -> Result<Value> {
        self.send(Method::PUT, endpoint, Some(serde_json::to_value(data)?))
            .await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, endpoint: &str, data: &B) -> Result<Value> {
        self.send(Method::PATCH, endpoint, Some(serde_json::to_value(data)?))
            .await
    }

    /// `true` for 200/204; other 2xx codes are reported as `false`.
    pub async fn delete(&self, endpoint: &str) -> Result<bool> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(self.timeout)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(matches!(response.status().as_u16(), 200 | 204))
    }

    async fn get_as<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let value = self.get(endpoint).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Lists processes as a connectivity check. datarhei-core 16.x has no
    /// `/about` behind auth, so the process list is used instead.
    pub async fn test_connection(&self) -> bool {
        match self.get("/api/v3/process").await {
            Ok(Value::Array(_)) => true,
            Ok(other) => {
                tracing::warn!("Connection test: unexpected body {}", other);
                false
            }
            Err(e) => {
                tracing::warn!("Connection test failed: {}", e);
                false
            }
        }
    }

    pub async fn about(&self) -> Result<About> {
        self.get_as("/api/v3/about").await
    }

    pub async fn get_config(&self) -> Result<Value> {
        self.get("/api/v3/config").await
    }

    pub async fn list_processes(&self) -> Result<Vec<ProcessDescriptor>> {
        self.get_as("/api/v3/process").await
    }

    pub async fn get_process(&self, process_id: &str) -> Result<ProcessDescriptor> {
        self.get_as(&format!("/api/v3/process/{}", process_id)).await
    }

    /// Creates a process reading `input_url` (with `-re`) and fanning out to `outputs`.
    pub async fn create_process(
        &self,
        process_id: &str,
        input_url: &str,
        outputs: Vec<ProcessOutput>,
    ) -> Result<ProcessDescriptor> {
        let mut config = ProcessConfig::new(process_id, TEST_REFERENCE)
            .with_input(ProcessInput::new("input_0", input_url).with_options(["-re"]));
        config.output = outputs;

        let value = self.post("/api/v3/process", &config).await?;
        tracing::info!("Created process {}", process_id);
        Ok(serde_json::from_value(value)?)
    }

    pub async fn update_process(
        &self,
        process_id: &str,
        config: &ProcessConfig,
    ) -> Result<ProcessDescriptor> {
        let value = self
            .put(&format!("/api/v3/process/{}", process_id), config)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn delete_process(&self, process_id: &str) -> Result<bool> {
        self.delete(&format!("/api/v3/process/{}", process_id)).await
    }

    /// Sends a command; the server answers with a bare `OK`.
    pub async fn send_command(&self, process_id: &str, command: ProcessCommand) -> Result<Value> {
        self.put(
            &format!("/api/v3/process/{}/command", process_id),
            &CommandRequest { command },
        )
        .await
    }

    pub async fn start_process(&self, process_id: &str) -> Result<ProcessState> {
        self.send_command(process_id, ProcessCommand::Start).await?;
        self.get_process_state(process_id).await
    }

    pub async fn stop_process(&self, process_id: &str) -> Result<ProcessState> {
        self.send_command(process_id, ProcessCommand::Stop).await?;
        self.get_process_state(process_id).await
    }

    pub async fn restart_process(&self, process_id: &str) -> Result<ProcessState> {
        self.send_command(process_id, ProcessCommand::Restart).await?;
        self.get_process_state(process_id).await
    }

    pub async fn get_process_state(&self, process_id: &str) -> Result<ProcessState> {
        self.get_as(&format!("/api/v3/process/{}/state", process_id))
            .await
    }

    pub async fn process_report(&self, process_id: &str) -> Result<Value> {
        self.get(&format!("/api/v3/process/{}/report", process_id))
            .await
    }

    pub async fn process_probe(&self, process_id: &str) -> Result<Value> {
        self.get(&format!("/api/v3/process/{}/probe", process_id))
            .await
    }

    pub async fn process_config(&self, process_id: &str) -> Result<Value> {
        self.get(&format!("/api/v3/process/{}/config", process_id))
            .await
    }

    pub async fn set_metadata<V: Serialize + ?Sized>(
        &self,
        process_id: &str,
        key: &str,
        value: &V,
    ) -> Result<Value> {
        self.put(
            &format!("/api/v3/process/{}/metadata/{}", process_id, key),
            value,
        )
        .await
    }

    pub async fn get_metadata(&self, process_id: &str, key: &str) -> Result<Value> {
        self.get(&format!("/api/v3/process/{}/metadata/{}", process_id, key))
            .await
    }

    /// Stops then deletes every listed process, ignoring failures.
    pub async fn cleanup_processes(&self, process_ids: &[String]) {
        for process_id in process_ids {
            if let Err(e) = self.send_command(process_id, ProcessCommand::Stop).await {
                tracing::debug!("Cleanup: stop {} failed: {}", process_id, e);
            }
            if let Err(e) = self.delete_process(process_id).await {
                tracing::debug!("Cleanup: delete {} failed: {}", process_id, e);
            }
        }
    }
}
