//! HTTP transport against a local mock scoring API.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod support;

use pretty_assertions::assert_eq;
use scorepost_delivery::{
    DeliveryConfig, DeliveryOutcome, DeliveryTransport, HttpTransport, TransportError,
};
use support::{item, mock_http::MockHttpServer};

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri does not support TCP sockets")]
async fn test_success_posts_json_with_api_key() {
    let server = MockHttpServer::start(200, "{}").await;
    let transport =
        HttpTransport::new(&DeliveryConfig::new(server.endpoint()).with_api_key("secret-key"))
            .unwrap();

    let outcome = transport.send(&item("https://example.com/page")).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::Delivered);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/score");
    assert_eq!(requests[0].header("x-api-key"), Some("secret-key"));
    assert_eq!(requests[0].header("content-type"), Some("application/json"));

    let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "uri": "https://example.com/page", "score": 5 })
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri does not support TCP sockets")]
async fn test_server_error_uses_json_message() {
    let server = MockHttpServer::start(503, r#"{"message":"Scoring backend unavailable"}"#).await;
    let transport = HttpTransport::new(&DeliveryConfig::new(server.endpoint())).unwrap();

    let outcome = transport.send(&item("/page")).await.unwrap();
    assert_eq!(
        outcome,
        DeliveryOutcome::ServerError("Scoring backend unavailable".to_string())
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri does not support TCP sockets")]
async fn test_client_error_is_classified() {
    let server = MockHttpServer::start(422, r#"{"message":"Unknown page"}"#).await;
    let transport = HttpTransport::new(&DeliveryConfig::new(server.endpoint())).unwrap();

    let outcome = transport.send(&item("/page")).await.unwrap();
    assert_eq!(outcome, DeliveryOutcome::ClientError("Unknown page".to_string()));
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri does not support TCP sockets")]
async fn test_non_json_error_body_falls_back() {
    let server = MockHttpServer::start(500, "upstream exploded").await;
    let transport = HttpTransport::new(&DeliveryConfig::new(server.endpoint())).unwrap();

    let outcome = transport.send(&item("/page")).await.unwrap();
    assert_eq!(
        outcome,
        DeliveryOutcome::ServerError("HTTP 500: upstream exploded".to_string())
    );
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri does not support TCP sockets")]
async fn test_scripted_recovery() {
    let server = MockHttpServer::with_responses(vec![(500, "{}"), (200, "{}")]).await;
    let transport = HttpTransport::new(&DeliveryConfig::new(server.endpoint())).unwrap();

    assert!(matches!(
        transport.send(&item("/page")).await.unwrap(),
        DeliveryOutcome::ServerError(_)
    ));
    assert_eq!(
        transport.send(&item("/page")).await.unwrap(),
        DeliveryOutcome::Delivered
    );
    assert_eq!(server.requests().len(), 2);
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Miri does not support TCP sockets")]
async fn test_connection_refused_is_transport_error() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = HttpTransport::new(&DeliveryConfig::new(format!("http://{addr}"))).unwrap();

    let err = transport.send(&item("/page")).await.unwrap_err();
    assert!(matches!(err, TransportError::Http(_)));
}
