//! JWT-authenticated access to the Restreamer API, as used by the
//! integration suites and the plugin itself.

use crate::core::http::{ensure_success, expect_status};
use crate::domain::model::{
    FsEntry, LoginRequest, LoginResponse, PlayoutStatus, ProcessConfig, ProcessDescriptor,
    ProcessOutput, ProcessState,
};
use crate::domain::ports::ConnectionProvider;
use crate::utils::error::{HarnessError, Result};
use crate::utils::logger::redact;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSettings {
    pub base_url: String,
    pub version: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn from_provider<P: ConnectionProvider + ?Sized>(provider: &P) -> Self {
        Self {
            base_url: provider.base_url().trim_end_matches('/').to_string(),
            version: provider.api_version().to_string(),
            username: provider.username().to_string(),
            password: provider.password().to_string(),
            timeout: provider.timeout(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestreamerApi {
    settings: ApiSettings,
    client: Client,
    access_token: Option<String>,
}

impl RestreamerApi {
    pub fn new(settings: ApiSettings) -> Self {
        Self {
            settings,
            client: Client::new(),
            access_token: None,
        }
    }

    pub fn from_provider<P: ConnectionProvider + ?Sized>(provider: &P) -> Self {
        Self::new(ApiSettings::from_provider(provider))
    }

    /// Reuses a token obtained elsewhere, e.g. by the container manager.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    /// `{base_url}/api/{version}`
    pub fn api_base(&self) -> String {
        format!("{}/api/{}", self.settings.base_url, self.settings.version)
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base(), endpoint.trim_start_matches('/'))
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Polls `/about` until the server answers. 401 counts as ready: the
    /// server is up, it just wants a token.
    pub async fn wait_for_ready(&self, max_attempts: u32, interval: Duration) -> bool {
        let about_url = self.url("about");
        tracing::info!("⏳ Waiting for Restreamer at {}...", self.settings.base_url);

        for attempt in 1..=max_attempts {
            match self
                .client
                .get(&about_url)
                .timeout(Duration::from_secs(5))
                .send()
                .await
            {
                Ok(response) if matches!(response.status().as_u16(), 200 | 401) => {
                    tracing::info!("✅ Restreamer is ready! (HTTP {})", response.status().as_u16());
                    return true;
                }
                Ok(response) => {
                    tracing::debug!("Readiness check got HTTP {}", response.status().as_u16());
                }
                Err(e) => tracing::debug!("Readiness check failed: {}", e),
            }

            if attempt % 5 == 0 {
                tracing::info!("   Still waiting... (attempt {}/{})", attempt, max_attempts);
            }

            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }

        tracing::error!("❌ Restreamer failed to become ready");
        false
    }

    pub async fn authenticate(&mut self) -> Result<()> {
        let token = login(
            &self.client,
            &self.settings.base_url,
            &self.settings.username,
            &self.settings.password,
            self.settings.timeout,
        )
        .await?;
        tracing::info!("✅ Authentication successful (token {})", redact(&token));
        self.access_token = Some(token);
        Ok(())
    }

    fn bearer(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or(HarnessError::NotAuthenticated)
    }

    fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        Ok(builder.bearer_auth(self.bearer()?).timeout(self.settings.timeout))
    }

    // Raw verbs. Status codes are left for the caller to assert on.

    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        let request = self.authorized(self.client.get(self.url(endpoint)))?;
        Ok(request.send().await?)
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Response> {
        let request = self.authorized(self.client.post(self.url(endpoint)))?;
        Ok(request.json(body).send().await?)
    }

    /// Posts a pre-encoded body as `application/json`, valid or not.
    pub async fn post_raw(&self, endpoint: &str, body: impl Into<String>) -> Result<Response> {
        let request = self.authorized(self.client.post(self.url(endpoint)))?;
        Ok(request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .send()
            .await?)
    }

    pub async fn put_json<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Response> {
        let request = self.authorized(self.client.put(self.url(endpoint)))?;
        Ok(request.json(body).send().await?)
    }

    pub async fn put_empty(&self, endpoint: &str) -> Result<Response> {
        let request = self.authorized(self.client.put(self.url(endpoint)))?;
        Ok(request.send().await?)
    }

    pub async fn put_bytes(&self, endpoint: &str, content: Vec<u8>) -> Result<Response> {
        // Large uploads get at least a minute.
        let timeout = self.settings.timeout.max(Duration::from_secs(60));
        let request = self
            .authorized(self.client.put(self.url(endpoint)))?
            .timeout(timeout);
        Ok(request
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?)
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Response> {
        let request = self.authorized(self.client.delete(self.url(endpoint)))?;
        Ok(request.send().await?)
    }

    // Processes

    pub async fn list_processes(&self) -> Result<Vec<ProcessDescriptor>> {
        let response = ensure_success(self.get("process").await?).await?;
        Ok(response.json().await?)
    }

    /// Returns the id the server assigned, which should equal `config.id`.
    pub async fn create_process(&self, config: &ProcessConfig) -> Result<String> {
        let response = expect_status(self.post_json("process", config).await?, &[200, 201]).await?;
        let body: Value = response.json().await?;
        let id = body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        tracing::info!("✅ Created process: {}", id);
        Ok(id)
    }

    pub async fn get_process(&self, process_id: &str) -> Result<ProcessDescriptor> {
        let response = ensure_success(self.get(&format!("process/{}", process_id)).await?).await?;
        Ok(response.json().await?)
    }

    pub async fn get_process_state(&self, process_id: &str) -> Result<ProcessState> {
        let response =
            ensure_success(self.get(&format!("process/{}/state", process_id)).await?).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_process(&self, process_id: &str) -> Result<()> {
        ensure_success(self.delete(&format!("process/{}", process_id)).await?).await?;
        Ok(())
    }

    pub async fn delete_process_quietly(&self, process_id: &str) {
        if let Err(e) = self.delete_process(process_id).await {
            tracing::debug!("Ignoring cleanup failure for process {}: {}", process_id, e);
        }
    }

    // Metadata

    pub async fn set_metadata<V: Serialize + ?Sized>(
        &self,
        process_id: &str,
        key: &str,
        value: &V,
    ) -> Result<()> {
        let endpoint = format!("process/{}/metadata/{}", process_id, key);
        expect_status(self.put_json(&endpoint, value).await?, &[200, 204]).await?;
        Ok(())
    }

    /// `None` when the key is unset or the server refuses.
    pub async fn get_metadata(&self, process_id: &str, key: &str) -> Result<Option<Value>> {
        let response = self
            .get(&format!("process/{}/metadata/{}", process_id, key))
            .await?;
        if response.status().as_u16() != 200 {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    /// Metadata as text; non-string values are rendered as JSON.
    pub async fn get_metadata_text(&self, process_id: &str, key: &str) -> Result<Option<String>> {
        Ok(self.get_metadata(process_id, key).await?.map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    // Filesystems

    pub async fn list_filesystems(&self) -> Result<Vec<FsEntry>> {
        let response = ensure_success(self.get("fs").await?).await?;
        Ok(response.json().await?)
    }

    pub async fn list_files(&self, filesystem: &str) -> Result<Vec<FsEntry>> {
        let response = ensure_success(self.get(&format!("fs/{}", filesystem)).await?).await?;
        Ok(response.json().await?)
    }

    pub async fn upload_file(&self, filesystem: &str, path: &str, content: Vec<u8>) -> Result<()> {
        let endpoint = format!("fs/{}/{}", filesystem, path.trim_start_matches('/'));
        let size = content.len();
        expect_status(self.put_bytes(&endpoint, content).await?, &[200, 201, 204]).await?;
        tracing::debug!("Uploaded {} bytes to {}", size, endpoint);
        Ok(())
    }

    pub async fn download_file(&self, filesystem: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let endpoint = format!("fs/{}/{}", filesystem, path.trim_start_matches('/'));
        let response = self.get(&endpoint).await?;
        if response.status().as_u16() != 200 {
            return Ok(None);
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }

    pub async fn delete_file(&self, filesystem: &str, path: &str) -> Result<()> {
        let endpoint = format!("fs/{}/{}", filesystem, path.trim_start_matches('/'));
        expect_status(self.delete(&endpoint).await?, &[200, 204]).await?;
        Ok(())
    }

    pub async fn delete_file_quietly(&self, filesystem: &str, path: &str) {
        if let Err(e) = self.delete_file(filesystem, path).await {
            tracing::debug!("Ignoring cleanup failure for {}/{}: {}", filesystem, path, e);
        }
    }

    // Dynamic outputs

    pub async fn add_output(&self, process_id: &str, output: &ProcessOutput) -> Result<()> {
        let endpoint = format!("process/{}/outputs", process_id);
        expect_status(self.post_json(&endpoint, output).await?, &[200, 201]).await?;
        tracing::info!("Added output {} to {}", output.id, process_id);
        Ok(())
    }

    pub async fn remove_output(&self, process_id: &str, output_id: &str) -> Result<()> {
        let endpoint = format!("process/{}/outputs/{}", process_id, output_id);
        expect_status(self.delete(&endpoint).await?, &[200, 204]).await?;
        tracing::info!("Removed output {} from {}", output_id, process_id);
        Ok(())
    }

    // Playout

    pub async fn playout_status(&self, process_id: &str, input_id: &str) -> Result<PlayoutStatus> {
        let endpoint = format!("process/{}/playout/{}/status", process_id, input_id);
        let response = ensure_success(self.get(&endpoint).await?).await?;
        Ok(response.json().await?)
    }

    pub async fn reopen_input(&self, process_id: &str, input_id: &str) -> Result<()> {
        let endpoint = format!("process/{}/playout/{}/reopen", process_id, input_id);
        expect_status(self.put_empty(&endpoint).await?, &[200, 204]).await?;
        Ok(())
    }
}

/// POSTs `{username, password}` to `{base_url}/api/login` and returns the access token.
pub async fn login(
    client: &Client,
    base_url: &str,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<String> {
    let response = client
        .post(format!("{}/api/login", base_url.trim_end_matches('/')))
        .json(&LoginRequest { username, password })
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(HarnessError::AuthenticationError {
            message: format!("login returned HTTP {}: {}", status, body),
        });
    }

    let login: LoginResponse = response.json().await?;
    match login.access_token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(HarnessError::AuthenticationError {
            message: "no access_token in response".to_string(),
        }),
    }
}
