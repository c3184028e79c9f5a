use std::time::{Duration, Instant};

use chanlog_client::DiscordClient;
use chanlog_core::error::AppError;
use chanlog_core::traits::ApiTransport;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DiscordClient {
    DiscordClient::with_base_url("secret", &server.uri()).unwrap()
}

#[tokio::test]
async fn sends_bot_authorization_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/42/messages"))
        .and(header("Authorization", "Bot secret"))
        .and(query_param("limit", "100"))
        .and(query_param("before", "900"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .get(
            "/channels/42/messages",
            &[("limit", "100".to_string()), ("before", "900".to_string())],
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, serde_json::json!([]));
}

#[tokio::test]
async fn non_success_status_is_returned_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/1"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(serde_json::json!({"message": "Missing Access", "code": 50001})),
        )
        .mount(&server)
        .await;

    let response = client(&server).get("/channels/1", &[]).await.unwrap();
    assert_eq!(response.status, 403);
    assert!(!response.is_success());
    assert_eq!(response.body["code"], 50001);
}

#[tokio::test]
async fn plain_text_error_bodies_are_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/1"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let response = client(&server).get("/channels/1", &[]).await.unwrap();
    assert_eq!(response.status, 502);
    assert_eq!(response.body, serde_json::json!("bad gateway"));
}

#[tokio::test]
async fn rate_limited_request_is_retried_after_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/7"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(serde_json::json!({"retry_after": 0.2})),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/channels/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "7", "type": 0, "name": "general"})),
        )
        .with_priority(2)
        .mount(&server)
        .await;

    let started = Instant::now();
    let response = client(&server).get("/channels/7", &[]).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body["name"], "general");
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn retry_cap_yields_rate_limit_exceeded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/channels/7"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(serde_json::json!({"retry_after": 0.01})),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .with_max_rate_limit_retries(Some(2))
        .get("/channels/7", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RateLimitExceeded(2)));
    // The first attempt plus two retries.
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() {
    // Nothing listens on this port once the server is dropped.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };

    let err = DiscordClient::with_base_url("secret", &uri)
        .unwrap()
        .get("/channels/1", &[])
        .await
        .unwrap_err();

    assert!(err.is_transport(), "unexpected error: {err:?}");
}
