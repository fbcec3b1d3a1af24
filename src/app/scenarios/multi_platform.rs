use super::ensure;
use crate::core::scenario::{Scenario, ScenarioContext};
use crate::domain::model::ProcessConfig;
use crate::utils::error::Result;
use serde_json::{json, Value};

/// One process configured for YouTube, Twitch and Facebook at once. The
/// per-platform settings live in a JSON-encoded `platforms` metadata entry.
pub struct MultiPlatformScenario;

impl MultiPlatformScenario {
    fn process_id(ctx: &ScenarioContext) -> String {
        ctx.resource_id("multistream")
    }

    pub fn platforms_config() -> Value {
        json!({
            "youtube": {"stream_key": "yt_key_12345", "resolution": "1080p"},
            "twitch": {"stream_key": "twitch_key_67890", "resolution": "1080p"},
            "facebook": {"stream_key": "fb_key_abcde", "resolution": "720p"},
        })
    }
}

#[async_trait::async_trait]
impl Scenario for MultiPlatformScenario {
    fn name(&self) -> &str {
        "multi_platform"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<Value> {
        let api = &ctx.api;
        let process_id = Self::process_id(ctx);

        tracing::info!("📝 Step 1/4: Creating multi-platform streaming process...");
        api.create_process(&ProcessConfig::new(&process_id, "multistream_workflow"))
            .await?;

        tracing::info!("📝 Step 2/4: Configuring platform-specific settings...");
        let platforms = serde_json::to_string(&Self::platforms_config())?;
        api.set_metadata(&process_id, "platforms", &platforms).await?;

        tracing::info!("📝 Step 3/4: Storing stream configuration...");
        let note = format!("Multi-platform stream configured on {}", chrono::Local::now());
        api.set_metadata(&process_id, "notes", &note).await?;

        tracing::info!("📝 Step 4/4: Verifying multi-platform configuration...");
        let stored = api.get_metadata_text(&process_id, "platforms").await?;
        ensure(
            stored.as_deref().is_some_and(|s| s.contains("youtube")),
            "verify platforms",
            "platform configuration missing youtube",
        )?;

        Ok(json!({ "process_id": process_id, "platforms": 3 }))
    }

    async fn cleanup(&self, ctx: &ScenarioContext) {
        ctx.api.delete_process_quietly(&Self::process_id(ctx)).await;
    }
}
