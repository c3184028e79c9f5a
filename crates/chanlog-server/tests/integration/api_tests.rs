use std::time::Duration;

use axum::http::StatusCode;
use chrono::Duration as ChronoDuration;
use http_body_util::BodyExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chanlog_core::JobState;
use chanlog_core::testutil::{channel_json, descending_ids, message_page, snowflake_at, thread_json};

use crate::integration::common::{
    base_time, json_body, mount_json, setup_test_app, setup_test_app_with_token,
};

/// A standard channel with `count` messages; returns its link.
async fn mount_standard_channel(server: &MockServer, name: &str, count: usize) -> String {
    let channel = snowflake_at(base_time() - ChronoDuration::days(30), 0);
    mount_json(server, &format!("/channels/{channel}"), channel_json(&channel, 0, name)).await;
    mount_json(
        server,
        &format!("/channels/{channel}/messages"),
        message_page(&descending_ids(base_time(), count)),
    )
    .await;
    format!("https://discord.com/channels/555/{channel}")
}

#[tokio::test]
async fn health_returns_200() {
    let api = MockServer::start().await;
    let app = setup_test_app(&api);

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["export_running"], false);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let api = MockServer::start().await;
    let app = setup_test_app(&api);

    let response = app.get("/api-docs/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert!(json["paths"]["/v1/exports"].is_object());
    assert!(json["paths"]["/v1/exports/status"].is_object());
}

#[tokio::test]
async fn credential_reports_configuration() {
    let api = MockServer::start().await;

    let configured = setup_test_app(&api);
    let json = json_body(configured.get("/v1/credential").await).await;
    assert_eq!(json["configured"], true);

    let missing = setup_test_app_with_token(&api, "");
    let json = json_body(missing.get("/v1/credential").await).await;
    assert_eq!(json["configured"], false);
}

#[tokio::test]
async fn initial_status_is_idle() {
    let api = MockServer::start().await;
    let app = setup_test_app(&api);

    let json = json_body(app.get("/v1/exports/status").await).await;
    assert_eq!(json["state"], "idle");
    assert_eq!(json["running"], false);
    assert!(json["task_id"].is_null());
    assert!(json["result"].is_null());
}

#[tokio::test]
async fn submit_without_token_is_rejected() {
    let api = MockServer::start().await;
    let app = setup_test_app_with_token(&api, "");

    let response = app
        .post_json(
            "/v1/exports",
            serde_json::json!({"urls": ["https://discord.com/channels/1/2"]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "validation_error");
    assert!(api.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let api = MockServer::start().await;
    let app = setup_test_app(&api);
    let link = "https://discord.com/channels/1/2";

    for body in [
        serde_json::json!({"urls": []}),
        serde_json::json!({"urls": ["  "]}),
        serde_json::json!({"urls": [link], "date_from": "yesterday"}),
        serde_json::json!({"urls": [link], "date_from": "2024-02-01", "date_to": "2024-01-01"}),
        serde_json::json!({"urls": [link], "format": "pdf"}),
    ] {
        let response = app.post_json("/v1/exports", body.clone()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    assert_eq!(app.state.jobs.status().state, JobState::Idle);
}

#[tokio::test]
async fn export_runs_and_file_can_be_downloaded() {
    let api = MockServer::start().await;
    let link = mount_standard_channel(&api, "general", 4).await;
    let app = setup_test_app(&api);

    let response = app
        .post_json(
            "/v1/exports",
            serde_json::json!({"urls": [link], "format": "tabular"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = json_body(response).await;
    assert_eq!(accepted["status"], "accepted");

    app.state.jobs.wait_until_idle().await;

    let status = json_body(app.get("/v1/exports/status").await).await;
    assert_eq!(status["state"], "succeeded");
    assert_eq!(status["running"], false);
    assert_eq!(status["task_id"], accepted["task_id"]);
    assert_eq!(status["progress"], "done");
    assert_eq!(status["result"]["total_message_count"], 4);
    assert_eq!(status["result"]["thread_count"], 1);
    assert_eq!(status["result"]["threads"][0]["title"], "#general");

    let download_url = status["result"]["download_url"].as_str().unwrap();
    let file_name = status["result"]["file_name"].as_str().unwrap();
    assert!(file_name.starts_with("chanlog_"));
    assert!(file_name.ends_with(".csv"));
    assert!(app.export_dir.path().join(file_name).is_file());

    let response = app.get(download_url).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/csv; charset=utf-8"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    // Header plus one row per message.
    assert_eq!(text.lines().count(), 5);
    assert!(text.starts_with("Thread,Thread Created,Author"));
}

#[tokio::test]
async fn forum_export_in_markup() {
    let api = MockServer::start().await;
    let forum = snowflake_at(base_time() - ChronoDuration::days(60), 0);
    let thread = snowflake_at(base_time(), 1);
    mount_json(&api, &format!("/channels/{forum}"), channel_json(&forum, 15, "help")).await;
    mount_json(
        &api,
        &format!("/channels/{forum}/threads/active"),
        serde_json::json!({"threads": [thread_json(&thread, "Crash <on> start", "x")]}),
    )
    .await;
    mount_json(
        &api,
        &format!("/channels/{forum}/threads/archived/public"),
        serde_json::json!({"threads": [], "has_more": false}),
    )
    .await;
    mount_json(
        &api,
        &format!("/channels/{thread}/messages"),
        message_page(&descending_ids(base_time() + ChronoDuration::minutes(5), 3)),
    )
    .await;

    let app = setup_test_app(&api);
    let response = app
        .post_json(
            "/v1/exports",
            serde_json::json!({
                "urls": [format!("https://discord.com/channels/555/{forum}")],
                "date_from": "2024-03-10",
                "date_to": "2024-03-10",
                "format": "markup"
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let status = app.state.jobs.wait_until_idle().await;
    assert_eq!(status.state, JobState::Succeeded);
    let result = status.result.unwrap();
    assert_eq!(result.total_message_count, 3);

    let html = std::fs::read_to_string(&result.output_path).unwrap();
    assert!(html.contains("Crash &lt;on&gt; start"));
    assert_eq!(html.matches("<article").count(), 3);
}

#[tokio::test]
async fn second_submission_while_running_is_conflict() {
    let api = MockServer::start().await;
    let channel = snowflake_at(base_time() - ChronoDuration::days(30), 0);
    Mock::given(method("GET"))
        .and(path(format!("/channels/{channel}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(channel_json(&channel, 0, "slow"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&api)
        .await;
    mount_json(
        &api,
        &format!("/channels/{channel}/messages"),
        message_page(&descending_ids(base_time(), 2)),
    )
    .await;

    let app = setup_test_app(&api);
    let body = serde_json::json!({"urls": [format!("https://discord.com/channels/555/{channel}")]});

    let first = app.post_json("/v1/exports", body.clone()).await;
    assert_eq!(first.status(), StatusCode::ACCEPTED);
    let first_id = json_body(first).await["task_id"].clone();

    let second = app.post_json("/v1/exports", body).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let json = json_body(second).await;
    assert_eq!(json["error"], "job_busy");

    let status = json_body(app.get("/v1/exports/status").await).await;
    assert_eq!(status["running"], true);
    assert_eq!(status["task_id"], first_id);

    let done = app.state.jobs.wait_until_idle().await;
    assert_eq!(done.state, JobState::Succeeded);
}

#[tokio::test]
async fn export_without_matches_fails() {
    let api = MockServer::start().await;
    let link = mount_standard_channel(&api, "general", 3).await;
    let app = setup_test_app(&api);

    let response = app
        .post_json(
            "/v1/exports",
            serde_json::json!({"urls": [link], "date_from": "2030-01-01", "format": "text"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    app.state.jobs.wait_until_idle().await;

    let status = json_body(app.get("/v1/exports/status").await).await;
    assert_eq!(status["state"], "failed");
    assert!(status["result"].is_null());
    assert!(
        status["error"]
            .as_str()
            .unwrap()
            .contains("No matching messages")
    );
}

#[tokio::test]
async fn download_rejects_unknown_and_traversal() {
    let api = MockServer::start().await;
    let app = setup_test_app(&api);
    std::fs::write(app.export_dir.path().join("kept.txt"), "x").unwrap();

    assert_eq!(
        app.get("/v1/exports/files/kept.txt").await.status(),
        StatusCode::OK
    );
    for uri in [
        "/v1/exports/files/missing.csv",
        "/v1/exports/files/..%2Fkept.txt",
        "/v1/exports/files/..",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}
