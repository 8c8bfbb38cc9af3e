//! Request wrapper tests against a mock HTTP server.

use std::time::Duration;

use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pulse_integrations::{
    Credential, IntegrationClient, IntegrationConfig, IntegrationError, SlackClient,
};
use pulse_resilience::CircuitState;

fn client_for(server: &MockServer) -> IntegrationClient {
    IntegrationClient::new(
        "test",
        IntegrationConfig::new(server.uri()),
        Credential::Bearer("token-123".to_string()),
    )
    .unwrap()
}

/// Client with a low breaker threshold for open/fast-fail tests.
fn fragile_client_for(server: &MockServer) -> IntegrationClient {
    let config = IntegrationConfig {
        failure_threshold: 2,
        breaker_timeout: Duration::from_secs(60),
        ..IntegrationConfig::new(server.uri())
    };
    IntegrationClient::new("test", config, Credential::Bearer("token-123".to_string())).unwrap()
}

#[tokio::test]
async fn success_parses_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "healthy": true })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let value = client
        .request(Method::GET, "/v1/status", None, &[])
        .await
        .unwrap();

    assert_eq!(value["healthy"], json!(true));
    assert_eq!(client.breaker().state(), CircuitState::Closed);
}

#[tokio::test]
async fn no_content_yields_null() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/things/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let value = client
        .request(Method::DELETE, "/v1/things/7", None, &[])
        .await
        .unwrap();

    assert!(value.is_null());
}

#[tokio::test]
async fn bearer_credential_is_applied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/things"))
        .and(header("Authorization", "Bearer token-123"))
        .and(body_json(json!({ "name": "thing" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let body = json!({ "name": "thing" });
    let value = client
        .request(Method::POST, "/v1/things", Some(&body), &[])
        .await
        .unwrap();

    assert_eq!(value["id"], json!(1));
}

#[tokio::test]
async fn query_key_credential_is_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/ratings"))
        .and(query_param("api_key", "secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ratings": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = IntegrationClient::new(
        "nicereply",
        IntegrationConfig::new(server.uri()),
        Credential::QueryKey {
            param: "api_key".to_string(),
            key: "secret".to_string(),
        },
    )
    .unwrap();

    client
        .request(Method::GET, "/v1/ratings", None, &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn error_status_carries_body_and_counts_against_breaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .request(Method::GET, "/v1/broken", None, &[])
        .await
        .unwrap_err();

    match err {
        IntegrationError::Api { status, detail } => {
            assert_eq!(status, Some(500));
            assert_eq!(detail, "upstream exploded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(client.breaker().consecutive_failures(), 1);
}

#[tokio::test]
async fn network_failure_maps_to_statusless_api_error() {
    // Nothing listens on this port; connections are refused.
    let client = IntegrationClient::new(
        "test",
        IntegrationConfig::new("http://127.0.0.1:9"),
        Credential::Bearer("token".to_string()),
    )
    .unwrap();

    let err = client
        .request(Method::GET, "/v1/status", None, &[])
        .await
        .unwrap_err();

    match err {
        IntegrationError::Api { status, .. } => assert_eq!(status, None),
        other => panic!("expected network Api error, got {other:?}"),
    }
    assert_eq!(client.breaker().consecutive_failures(), 1);
}

#[tokio::test]
async fn open_breaker_stops_sending_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/broken"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = fragile_client_for(&server);
    for _ in 0..2 {
        client
            .request(Method::GET, "/v1/broken", None, &[])
            .await
            .unwrap_err();
    }
    assert_eq!(client.breaker().state(), CircuitState::Open);

    // Third call fails fast; the mock's expectation of two requests would
    // fail on server drop if it reached the wire.
    let err = client
        .request(Method::GET, "/v1/broken", None, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, IntegrationError::CircuitOpen { .. }));
}

#[tokio::test]
async fn slack_posts_message_and_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("Authorization", "Bearer xoxb-test"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ok": true, "ts": "1727000000.000100" })),
        )
        .mount(&server)
        .await;

    let slack = SlackClient::with_base_url("xoxb-test", &server.uri()).unwrap();
    let value = slack.post_message("#support", "renewal at risk").await.unwrap();
    assert_eq!(value["ts"], json!("1727000000.000100"));
}

#[tokio::test]
async fn slack_error_envelope_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "error": "not_in_channel" })),
        )
        .mount(&server)
        .await;

    let slack = SlackClient::with_base_url("xoxb-test", &server.uri()).unwrap();
    let err = slack.post_message("#support", "hello").await.unwrap_err();
    assert!(err.to_string().contains("not_in_channel"));
}
