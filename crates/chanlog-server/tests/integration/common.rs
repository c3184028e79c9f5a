use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use chrono::{DateTime, TimeZone, Utc};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chanlog_client::DiscordClient;
use chanlog_core::JobConfig;
use chanlog_core::throttle::Pacing;
use chanlog_server::routes;
use chanlog_server::state::AppState;

pub const TEST_TOKEN: &str = "test-bot-token";

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub export_dir: TempDir,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

/// Build the app against a mock API server, with pacing disabled.
pub fn setup_test_app(api: &MockServer) -> TestApp {
    setup_test_app_with_token(api, TEST_TOKEN)
}

pub fn setup_test_app_with_token(api: &MockServer, token: &str) -> TestApp {
    let export_dir = tempfile::tempdir().unwrap();
    let client = DiscordClient::with_base_url(token, &api.uri()).unwrap();
    let config = JobConfig::default()
        .with_export_dir(export_dir.path())
        .with_pacing(Pacing::none());
    let state = Arc::new(AppState::new(client, config));

    TestApp {
        router: routes::router(state.clone()),
        state,
        export_dir,
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

pub async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
