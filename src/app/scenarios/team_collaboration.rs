use super::{ensure, DISK};
use crate::core::scenario::{Scenario, ScenarioContext};
use crate::domain::model::ProcessConfig;
use crate::utils::error::Result;
use serde_json::{json, Value};

const NOTES: [(&str, &str); 3] = [
    ("director_notes", "Director: Need more B-roll footage of city skyline"),
    ("editor_notes", "Editor: Color grading complete, ready for review"),
    ("producer_notes", "Producer: Budget approved for additional filming day"),
];

const ASSETS: [&str; 3] = ["script", "storyboard", "timeline"];

/// A production team sharing notes, assets and a project status through one
/// process.
pub struct TeamCollaborationScenario;

impl TeamCollaborationScenario {
    fn project_id(ctx: &ScenarioContext) -> String {
        ctx.resource_id("team_project")
    }

    fn asset_path(project_id: &str, asset: &str) -> String {
        format!("team_assets/{}_{}.txt", project_id, asset)
    }
}

#[async_trait::async_trait]
impl Scenario for TeamCollaborationScenario {
    fn name(&self) -> &str {
        "team_collaboration"
    }

    async fn run(&self, ctx: &ScenarioContext) -> Result<Value> {
        let api = &ctx.api;
        let project_id = Self::project_id(ctx);

        tracing::info!("📝 Step 1/4: Creating team project...");
        api.create_process(&ProcessConfig::new(&project_id, "team_collaboration"))
            .await?;

        tracing::info!("📝 Step 2/4: Team members contributing notes...");
        for (key, note) in NOTES {
            api.set_metadata(&project_id, key, note).await?;
        }

        tracing::info!("📝 Step 3/4: Uploading shared project assets...");
        for asset in ASSETS {
            let content = format!("Project {} v1.0 - {}", asset, chrono::Local::now());
            api.upload_file(DISK, &Self::asset_path(&project_id, asset), content.into_bytes())
                .await?;
        }

        tracing::info!("📝 Step 4/4: Updating project status...");
        let status = json!({
            "phase": "post-production",
            "progress": 75,
            "deadline": "2025-12-31",
            "team": ["director", "editor", "producer"],
        });
        api.set_metadata(&project_id, "status", &serde_json::to_string(&status)?)
            .await?;

        let stored = api.get_metadata_text(&project_id, "status").await?;
        ensure(
            stored.as_deref().is_some_and(|s| s.contains("post-production")),
            "verify status",
            "project status missing post-production phase",
        )?;

        Ok(json!({
            "project_id": project_id,
            "notes": NOTES.len(),
            "assets": ASSETS.len(),
        }))
    }

    async fn cleanup(&self, ctx: &ScenarioContext) {
        let project_id = Self::project_id(ctx);
        ctx.api.delete_process_quietly(&project_id).await;
        for asset in ASSETS {
            ctx.api
                .delete_file_quietly(DISK, &Self::asset_path(&project_id, asset))
                .await;
        }
    }
}
