use super::{ensure, today, DISK};
use crate::core::scenario::{Scenario, ScenarioContext};
use crate::domain::model::ProcessConfig;
use crate::utils::error::Result;
use serde_json::{json, Value};

/// A creator sets up a gaming stream: process, descriptive metadata,
/// thumbnail and overlay uploads, then a status check.
pub struct ContentCreatorScenario;

impl ContentCreatorScenario {
    fn process_id(ctx: &ScenarioContext) -> String {
        ctx.resource_id("content_creator_stream")
    }

    fn asset_paths(process_id: &str) -> [String; 2] {
        [
            format!("stream_assets/thumbnail_{}.png", process_id),
            format!("stream_assets/overlay_{}.png", process_id),
        ]
    }
}

#[async_trait::async_trait]
impl Scenario for ContentCreatorScenario {
    fn name(&self) -> &str {
        "content_creator"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<Value> {
        let api = &ctx.api;
        let process_id = Self::process_id(ctx);

        tracing::info!("📝 Step 1/5: Creating streaming process...");
        api.create_process(&ProcessConfig::new(&process_id, "content_creator_workflow"))
            .await?;

        tracing::info!("📝 Step 2/5: Adding stream metadata (title, description, tags)...");
        api.set_metadata(&process_id, "title", &format!("My Live Gaming Stream - {}", today()))
            .await?;
        api.set_metadata(
            &process_id,
            "description",
            "Playing Minecraft with viewers! Drop by and say hi!",
        )
        .await?;
        api.set_metadata(&process_id, "tags", "gaming,minecraft,live,interactive")
            .await?;

        let title = api.get_metadata_text(&process_id, "title").await?;
        ensure(
            title.as_deref().is_some_and(|t| t.contains("Gaming Stream")),
            "verify title",
            "title metadata missing or wrong",
        )?;

        tracing::info!("📝 Step 3/5: Uploading stream assets (thumbnail, overlay)...");
        let now = chrono::Local::now();
        let [thumbnail, overlay] = Self::asset_paths(&process_id);
        api.upload_file(DISK, &thumbnail, format!("Mock Thumbnail Data {}", now).into_bytes())
            .await?;
        api.upload_file(DISK, &overlay, format!("Mock Overlay Data {}", now).into_bytes())
            .await?;

        tracing::info!("📝 Step 4/5: Verifying uploaded assets...");
        let files = api.list_files(DISK).await?;
        let thumbnail_listed = files.iter().any(|f| f.name().contains("thumbnail_"));
        if thumbnail_listed {
            tracing::info!("   ✓ Thumbnail verification");
        } else {
            tracing::warn!("   ⚠ Thumbnail not in listing");
        }

        tracing::info!("📝 Step 5/5: Checking stream status...");
        let state = api.get_process_state(&process_id).await?;
        tracing::info!("   ✓ Stream state: {}", state.order);

        Ok(json!({
            "process_id": process_id,
            "thumbnail_listed": thumbnail_listed,
            "order": state.order,
        }))
    }

    async fn cleanup(&self, ctx: &ScenarioContext) {
        let process_id = Self::process_id(ctx);
        ctx.api.delete_process_quietly(&process_id).await;
        for path in Self::asset_paths(&process_id) {
            ctx.api.delete_file_quietly(DISK, &path).await;
        }
    }
}
