use super::ensure;
use crate::core::client::TEST_REFERENCE;
use crate::core::scenario::{Scenario, ScenarioContext};
use crate::domain::model::ProcessConfig;
use crate::utils::error::Result;
use serde_json::{json, Value};

const TEST_SOURCE_SECONDS: u32 = 10;

/// Creates an FFmpeg test-pattern process, tags it and reads its state back.
pub struct BasicStreamingScenario;

impl BasicStreamingScenario {
    fn process_id(ctx: &ScenarioContext) -> String {
        ctx.resource_id("basic_stream")
    }
}

#[async_trait::async_trait]
impl Scenario for BasicStreamingScenario {
    fn name(&self) -> &str {
        "basic_streaming"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<Value> {
        let api = &ctx.api;
        let process_id = Self::process_id(ctx);

        tracing::info!("📝 Step 1/3: Creating test-source process...");
        let config = ProcessConfig::test_source(&process_id, TEST_REFERENCE, TEST_SOURCE_SECONDS);
        let created = api.create_process(&config).await?;
        ensure(
            created.is_empty() || created == process_id,
            "create process",
            "server assigned a different process id",
        )?;

        let descriptor = api.get_process(&process_id).await?;
        ensure(
            descriptor.outputs().iter().any(|o| o.id == "output_0"),
            "inspect process",
            "output_0 missing from process config",
        )?;

        tracing::info!("📝 Step 2/3: Setting stream metadata...");
        api.set_metadata(&process_id, "stream_title", "Harness Test Stream")
            .await?;
        api.set_metadata(&process_id, "resolution", &json!({"width": 1280, "height": 720}))
            .await?;

        tracing::info!("📝 Step 3/3: Reading process state...");
        let state = api.get_process_state(&process_id).await?;
        tracing::info!("   ✓ order={} exec={}", state.order, state.exec_state());

        Ok(json!({
            "process_id": process_id,
            "order": state.order,
            "exec": state.exec,
        }))
    }

    async fn cleanup(&self, ctx: &ScenarioContext) {
        ctx.api.delete_process_quietly(&Self::process_id(ctx)).await;
    }
}
