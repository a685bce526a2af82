//! Mock backend tests for the HTTP client.
//!
//! These tests use wiremock to simulate the storefront backend and exercise
//! the full refresh protocol over real HTTP.

use std::time::Duration;

use courier_core::error::AuthError;
use courier_core::{
    AccessToken, ApiUrl, Error, MemoryStore, RefreshEndpoint, RefreshToken, RequestOptions,
    Session,
};
use courier_http::{ApiClient, ClientConfig, HttpRefreshEndpoint, connect};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(ApiUrl::new(server.uri()).unwrap())
}

async fn session(access: &str, refresh: &str) -> Session<MemoryStore> {
    let session = Session::new(MemoryStore::new());
    session
        .set_tokens(AccessToken::new(access), Some(RefreshToken::new(refresh)))
        .await
        .unwrap();
    session
}

async fn client(config: &ClientConfig) -> ApiClient<Session<MemoryStore>> {
    connect(config, session("T1", "R1").await).unwrap()
}

/// Orders answer 401 to `T1` and 200 to `T2`.
async fn mount_orders(server: &MockServer) {
    for id in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/orders/{}", id)))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "ExpiredToken",
                "message": "access token expired"
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/orders/{}", id)))
            .and(header("authorization", "Bearer T2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id,
                "status": "out_for_delivery"
            })))
            .mount(server)
            .await;
    }
}

// ============================================================================
// Refresh Protocol Scenarios
// ============================================================================

#[tokio::test]
async fn test_concurrent_401s_refresh_once_and_replay() {
    let server = MockServer::start().await;
    mount_orders(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "R1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "T2" }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let client = client(&config).await;

    let (url1, url2, url3) = (
        config.api.endpoint("orders/1"),
        config.api.endpoint("orders/2"),
        config.api.endpoint("orders/3"),
    );
    let (a, b, c) = tokio::join!(client.get(&url1), client.get(&url2), client.get(&url3),);

    for (id, result) in [(1, a), (2, b), (3, c)] {
        let response = result.unwrap();
        assert_eq!(response.status, 200);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["id"], id);
    }

    assert_eq!(client.refresh_count(), 1);
    assert_eq!(
        client.session().access_token().await,
        Some(AccessToken::new("T2"))
    );

    let requests = server.received_requests().await.unwrap();
    let replays = requests
        .iter()
        .filter(|r| {
            r.headers
                .get("authorization")
                .is_some_and(|v| v.as_bytes() == b"Bearer T2")
        })
        .count();
    assert_eq!(replays, 3);
}

#[tokio::test]
async fn test_forbidden_refresh_ends_session() {
    let server = MockServer::start().await;
    mount_orders(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({
                    "error": "RefreshTokenRevoked",
                    "message": "refresh token revoked"
                }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let client = client(&config).await;

    let (url1, url2, url3) = (
        config.api.endpoint("orders/1"),
        config.api.endpoint("orders/2"),
        config.api.endpoint("orders/3"),
    );
    let (a, b, c) = tokio::join!(client.get(&url1), client.get(&url2), client.get(&url3),);

    for result in [a, b, c] {
        let err = result.unwrap_err();
        assert!(
            matches!(err, Error::Auth(AuthError::SessionEnded { .. })),
            "unexpected error: {}",
            err
        );
    }

    let session = client.session();
    assert_eq!(session.logout_count(), 1);
    assert!(session.access_token().await.is_none());
    assert!(session.refresh_token().await.is_none());
}

#[tokio::test]
async fn test_refresh_timeout_keeps_session() {
    let server = MockServer::start().await;
    mount_orders(&server).await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "accessToken": "T2" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = config(&server).with_timeout(Duration::from_millis(500));
    let client = client(&config).await;

    let (url1, url2, url3) = (
        config.api.endpoint("orders/1"),
        config.api.endpoint("orders/2"),
        config.api.endpoint("orders/3"),
    );
    let (a, b, c) = tokio::join!(client.get(&url1), client.get(&url2), client.get(&url3),);

    for result in [a, b, c] {
        let err = result.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {}", err);
        assert!(!err.is_session_ended());
    }

    assert_eq!(client.refresh_count(), 1);
    let session = client.session();
    assert_eq!(session.logout_count(), 0);
    assert_eq!(session.access_token().await, Some(AccessToken::new("T1")));
    assert_eq!(session.refresh_token().await, Some(RefreshToken::new("R1")));
}

#[tokio::test]
async fn test_success_first_time_skips_refresh() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/menu"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = config(&server);
    let client = client(&config).await;

    let response = client.get(&config.api.endpoint("menu")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(client.refresh_count(), 0);
    assert!(!client.is_refreshing());
}

// ============================================================================
// Request Shaping
// ============================================================================

#[tokio::test]
async fn test_replayed_post_keeps_body() {
    let server = MockServer::start().await;

    let order = json!({ "items": [{ "sku": "PZ-MARG", "qty": 2 }], "tip": 300 });

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer T1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("authorization", "Bearer T2"))
        .and(body_json(order.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "ord_1" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "T2",
            "refreshToken": "R2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let client = client(&config).await;

    let response = client
        .post_json(&config.api.endpoint("orders"), &order)
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(
        client.session().refresh_token().await,
        Some(RefreshToken::new("R2"))
    );
}

#[tokio::test]
async fn test_non_auth_errors_returned_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/9"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": "InternalError",
            "message": "kitchen offline"
        })))
        .mount(&server)
        .await;

    let config = config(&server);
    let client = client(&config).await;

    let response = client.get(&config.api.endpoint("orders/9")).await.unwrap();
    assert_eq!(response.status, 500);
    assert_eq!(response.error_body().message.as_deref(), Some("kitchen offline"));

    let err = client
        .request_json::<serde_json::Value>(
            &config.api.endpoint("orders/9"),
            RequestOptions::get(),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("HTTP 500 [InternalError]: kitchen offline"));
    assert_eq!(client.refresh_count(), 0);
}

// ============================================================================
// Refresh Endpoint
// ============================================================================

#[tokio::test]
async fn test_refresh_endpoint_maps_rejection_to_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "InvalidRefreshToken",
            "message": "refresh token expired"
        })))
        .mount(&server)
        .await;

    let endpoint = HttpRefreshEndpoint::new(&config(&server)).unwrap();
    let err = endpoint
        .refresh(&RefreshToken::new("R1"))
        .await
        .unwrap_err();

    match err {
        Error::Protocol(e) => {
            assert_eq!(e.status, 401);
            assert_eq!(e.error.as_deref(), Some("InvalidRefreshToken"));
            assert!(e.is_terminal_refresh_failure());
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_endpoint_tolerates_non_json_error_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let endpoint = HttpRefreshEndpoint::new(&config(&server)).unwrap();
    let err = endpoint
        .refresh(&RefreshToken::new("R1"))
        .await
        .unwrap_err();

    match err {
        Error::Protocol(e) => {
            assert_eq!(e.status, 502);
            assert!(e.error.is_none());
            assert!(!e.is_terminal_refresh_failure());
        }
        other => panic!("expected protocol error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_endpoint_url_is_never_refreshed_recursively() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server);
    let client = client(&config).await;

    let response = client
        .request(
            &config.refresh_url(),
            RequestOptions::post(),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 401);
    assert_eq!(client.refresh_count(), 0);
}
