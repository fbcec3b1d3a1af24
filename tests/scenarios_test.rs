use httpmock::prelude::*;
use polyemesis_harness::app::scenarios::{default_sequence, MultiPlatformScenario};
use polyemesis_harness::core::scenario::{summarize, ScenarioResult};
use polyemesis_harness::{ApiSettings, RestreamerApi};
use regex::Regex;
use serde_json::json;
use std::time::Duration;

fn api_for(server: &MockServer) -> RestreamerApi {
    RestreamerApi::new(ApiSettings {
        base_url: server.base_url(),
        version: "v3".to_string(),
        username: "admin".to_string(),
        password: "admin".to_string(),
        timeout: Duration::from_secs(5),
    })
    .with_access_token("token")
}

fn matching(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

#[test]
fn test_default_sequence_order() {
    let mut sequence = default_sequence("run1");
    assert_eq!(sequence.len(), 5);
    assert_eq!(sequence.run_id(), "run1");

    sequence.retain(|name| name.ends_with("_management"));
    assert_eq!(sequence.len(), 1);
}

#[tokio::test]
async fn test_basic_and_team_workflows_pass() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v3/process");
            then.status(201).json_body(json!({}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/process/basic_stream_run1");
            then.status(200).json_body(json!({
                "id": "basic_stream_run1",
                "config": {
                    "id": "basic_stream_run1",
                    "input": [{"id": "input_0", "address": "testsrc2"}],
                    "output": [{"id": "output_0", "address": "-"}],
                },
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/process/basic_stream_run1/state");
            then.status(200).json_body(json!({"order": "stop", "exec": "finished"}));
        })
        .await;
    let metadata = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path_matches(matching(r"^/api/v3/process/[^/]+/metadata/[^/]+$"));
            then.status(204);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/process/team_project_run1/metadata/status");
            then.status(200)
                .json_body(json!(r#"{"phase":"post-production","progress":75}"#));
        })
        .await;
    let uploads = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path_matches(matching(r"^/api/v3/fs/disk/team_assets/.+\.txt$"));
            then.status(201);
        })
        .await;
    let process_deletes = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path_matches(matching(r"^/api/v3/process/[^/]+$"));
            then.status(200).body("OK");
        })
        .await;
    let file_deletes = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path_matches(matching(r"^/api/v3/fs/disk/.+$"));
            then.status(204);
        })
        .await;

    let mut sequence = default_sequence("run1");
    sequence.retain(|name| matches!(name, "basic_streaming" | "team_collaboration"));
    let results = sequence.run_all(api_for(&server)).await;

    for result in &results {
        assert!(result.passed, "{} failed: {:?}", result.name, result.error);
    }
    assert_eq!(summarize(&results), (2, 0));
    assert_eq!(results[0].details["process_id"], "basic_stream_run1");
    assert_eq!(results[1].details["assets"], 3);

    create.assert_hits_async(2).await;
    // Two for basic streaming, three notes and one status for the team.
    metadata.assert_hits_async(6).await;
    uploads.assert_hits_async(3).await;
    process_deletes.assert_hits_async(2).await;
    file_deletes.assert_hits_async(3).await;
}

#[tokio::test]
async fn test_failed_step_still_cleans_up() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v3/process");
            then.status(201).json_body(json!({"id": "team_project_run2"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT)
                .path_matches(matching(r"^/api/v3/process/[^/]+/metadata/[^/]+$"));
            then.status(500).body("metadata store unavailable");
        })
        .await;
    let process_deletes = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/v3/process/team_project_run2");
            then.status(200);
        })
        .await;
    let file_deletes = server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path_matches(matching(r"^/api/v3/fs/disk/team_assets/.+$"));
            then.status(404);
        })
        .await;

    let mut sequence = default_sequence("run2");
    sequence.retain(|name| name == "team_collaboration");
    let results = sequence.run_all(api_for(&server)).await;

    assert_eq!(results.len(), 1);
    assert!(!results[0].passed);
    assert!(results[0]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("500")));
    assert_eq!(summarize(&results), (0, 1));

    process_deletes.assert_hits_async(1).await;
    file_deletes.assert_hits_async(3).await;
}

/// Mocks every call the process-and-metadata workflows make, except the
/// reads each test wants to control.
async fn mock_writes(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v3/process");
            then.status(201).json_body(json!({}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT)
                .path_matches(matching(r"^/api/v3/process/[^/]+/metadata/[^/]+$"));
            then.status(204);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path_matches(matching(r"^/api/v3/fs/disk/.+$"));
            then.status(201);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(DELETE)
                .path_matches(matching(r"^/api/v3/(process|fs/disk)/.+$"));
            then.status(200);
        })
        .await;
}

async fn run_only(server: &MockServer, run_id: &str, name: &str) -> ScenarioResult {
    let mut sequence = default_sequence(run_id);
    sequence.retain(|scenario| scenario == name);
    let mut results = sequence.run_all(api_for(server)).await;
    assert_eq!(results.len(), 1);
    results.remove(0)
}

#[tokio::test]
async fn test_content_creator_workflow() {
    let server = MockServer::start_async().await;
    mock_writes(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/process/content_creator_stream_run3/metadata/title");
            then.status(200).json_body(json!("My Live Gaming Stream - 2025-01-01"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/fs/disk");
            then.status(200).json_body(json!([
                {"name": "/stream_assets/thumbnail_content_creator_stream_run3.png", "size_bytes": 40},
            ]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/process/content_creator_stream_run3/state");
            then.status(200).json_body(json!({"order": "stop", "exec": "finished"}));
        })
        .await;

    let result = run_only(&server, "run3", "content_creator").await;
    assert!(result.passed, "{:?}", result.error);
    assert_eq!(result.details["thumbnail_listed"], true);
    assert_eq!(result.details["order"], "stop");
}

#[tokio::test]
async fn test_content_creator_rejects_wrong_title() {
    let server = MockServer::start_async().await;
    mock_writes(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/process/content_creator_stream_run3/metadata/title");
            then.status(200).json_body(json!("Untitled"));
        })
        .await;

    let result = run_only(&server, "run3", "content_creator").await;
    assert!(!result.passed);
    assert!(result.error.unwrap().contains("verify title"));
}

#[tokio::test]
async fn test_multi_platform_workflow() {
    let server = MockServer::start_async().await;
    mock_writes(&server).await;
    let platforms = MultiPlatformScenario::platforms_config().to_string();
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/process/multistream_run4/metadata/platforms");
            then.status(200).json_body(json!(platforms));
        })
        .await;

    let result = run_only(&server, "run4", "multi_platform").await;
    assert!(result.passed, "{:?}", result.error);
    assert_eq!(result.details["platforms"], 3);
}

#[tokio::test]
async fn test_multi_platform_requires_youtube() {
    let server = MockServer::start_async().await;
    mock_writes(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/process/multistream_run4/metadata/platforms");
            then.status(200)
                .json_body(json!(r#"{"twitch":{"stream_key":"k","resolution":"1080p"}}"#));
        })
        .await;

    let result = run_only(&server, "run4", "multi_platform").await;
    assert!(!result.passed);
    assert!(result.error.unwrap().contains("youtube"));
}

async fn mock_recording_reads(server: &MockServer, download_status: u16, download_body: &str) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/fs/disk");
            then.status(200)
                .json_body(json!([{"name": "/recordings/recording_run5.mp4"}]));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/fs/disk/recordings/recording_run5.mp4");
            then.status(download_status).body(download_body);
        })
        .await;
}

#[tokio::test]
async fn test_recording_management_workflow() {
    let server = MockServer::start_async().await;
    mock_writes(&server).await;
    mock_recording_reads(&server, 200, "Mock Recording Data - run5").await;
    let archived = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/api/v3/process/catalog_recording_run5/metadata/archived");
            then.status(204);
        })
        .await;

    let result = run_only(&server, "run5", "recording_management").await;
    assert!(result.passed, "{:?}", result.error);
    assert_eq!(result.details["recording"], "recordings/recording_run5.mp4");
    assert_eq!(result.details["listed"], true);
    archived.assert_async().await;
}

#[tokio::test]
async fn test_recording_management_detects_corrupt_download() {
    let server = MockServer::start_async().await;
    mock_writes(&server).await;
    mock_recording_reads(&server, 200, "truncated").await;

    let result = run_only(&server, "run5", "recording_management").await;
    assert!(!result.passed);
    assert!(result.error.unwrap().contains("doesn't match"));
}

#[tokio::test]
async fn test_recording_management_missing_download() {
    let server = MockServer::start_async().await;
    mock_writes(&server).await;
    mock_recording_reads(&server, 404, "").await;

    let result = run_only(&server, "run5", "recording_management").await;
    assert!(!result.passed);
    assert!(result.error.unwrap().contains("no content"));
}
