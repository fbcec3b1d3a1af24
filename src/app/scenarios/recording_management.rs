use super::{ensure, today, DISK};
use crate::core::scenario::{Scenario, ScenarioContext};
use crate::domain::model::ProcessConfig;
use crate::utils::error::Result;
use serde_json::{json, Value};

/// Upload a recording, catalog it with tags, download it back for backup and
/// mark it archived.
pub struct RecordingManagementScenario;

impl RecordingManagementScenario {
    fn recording_name(ctx: &ScenarioContext) -> String {
        format!("recording_{}.mp4", ctx.run_id)
    }

    fn recording_path(ctx: &ScenarioContext) -> String {
        format!("recordings/{}", Self::recording_name(ctx))
    }

    fn catalog_id(ctx: &ScenarioContext) -> String {
        ctx.resource_id("catalog_recording")
    }

    /// Bytes uploaded and expected back from the download.
    fn recording_content(ctx: &ScenarioContext) -> Vec<u8> {
        format!("Mock Recording Data - {}", ctx.run_id).into_bytes()
    }
}

#[async_trait::async_trait]
impl Scenario for RecordingManagementScenario {
    fn name(&self) -> &str {
        "recording_management"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<Value> {
        let api = &ctx.api;
        let recording_name = Self::recording_name(ctx);
        let recording_path = Self::recording_path(ctx);
        let catalog_id = Self::catalog_id(ctx);

        tracing::info!("📝 Step 1/5: Uploading stream recording...");
        let recording = Self::recording_content(ctx);
        api.upload_file(DISK, &recording_path, recording.clone())
            .await?;

        tracing::info!("📝 Step 2/5: Creating catalog entry with tags...");
        api.create_process(&ProcessConfig::new(&catalog_id, "recording_catalog"))
            .await?;
        api.set_metadata(&catalog_id, "tags", "archived,gaming,highlight")
            .await?;
        api.set_metadata(&catalog_id, "title", &format!("Epic Stream Moments - {}", today()))
            .await?;
        api.set_metadata(&catalog_id, "file_path", &format!("/{}", recording_path))
            .await?;

        tracing::info!("📝 Step 3/5: Verifying recording in catalog...");
        let files = api.list_files(DISK).await?;
        let listed = files
            .iter()
            .any(|f| f.name() == recording_name || f.name().ends_with(&recording_path));
        if listed {
            tracing::info!("   ✓ Recording found in filesystem");
        } else {
            tracing::warn!("   ⚠ Recording not found in listing");
        }

        tracing::info!("📝 Step 4/5: Downloading recording for backup...");
        let downloaded = api.download_file(DISK, &recording_path).await?;
        ensure(downloaded.is_some(), "download recording", "download returned no content")?;
        ensure(
            downloaded.as_deref() == Some(recording.as_slice()),
            "download recording",
            "downloaded data doesn't match uploaded",
        )?;

        tracing::info!("📝 Step 5/5: Marking as archived...");
        let archived = format!("Archived on {}", chrono::Local::now());
        api.set_metadata(&catalog_id, "archived", &archived).await?;

        Ok(json!({
            "catalog_id": catalog_id,
            "recording": recording_path,
            "bytes": recording.len(),
            "listed": listed,
        }))
    }

    async fn cleanup(&self, ctx: &ScenarioContext) {
        ctx.api.delete_process_quietly(&Self::catalog_id(ctx)).await;
        ctx.api
            .delete_file_quietly(DISK, &Self::recording_path(ctx))
            .await;
    }
}
