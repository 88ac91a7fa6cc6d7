//! Integration tests for the CartJO API client

#![cfg(feature = "client")]

use cartjo_core::{ListQuery, Locale, Message, Record};
use cartjo_http::client::{ApiClient, RequestOptions, Resource, error::ClientError};
use cartjo_http::session::SessionError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_client_builder() {
    let client = ApiClient::builder()
        .base_url("http://localhost:8080/")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    assert_eq!(client.base_url(), "http://localhost:8080");
    assert_eq!(client.timeout(), Duration::from_secs(2));
}

#[tokio::test]
async fn test_client_builder_requires_base_url() {
    let result = ApiClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn test_list_sends_bearer_and_normalizes_users_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(header("authorization", "Bearer access-1"))
        .and(header("accept-language", "en"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isSuccess": true,
            "message": "ok",
            "users": [{"_id": "u1", "email": "a@b.jo"}, {"_id": "u2"}],
            "count": 7
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    let page = client
        .list::<Record>(Resource::Users, &ListQuery::new(Locale::En, 2), Some("access-1"))
        .await
        .unwrap();

    assert_eq!(page.len(), 2);
    assert_eq!(page.data_count, 7);
    assert_eq!(page.next_cursor(), Some("u2"));
    assert_eq!(page.data[0].get("email"), Some(&json!("a@b.jo")));
}

#[tokio::test]
async fn test_unauthorized_is_a_session_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/orders/o1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    let err = client
        .get::<Record>(Resource::Orders, "o1", Some("stale"), RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Session(SessionError::Unauthorized { status: 401 })
    ));
    assert_eq!(err.redirect_target(), Some("/auth"));
}

#[tokio::test]
async fn test_server_error_carries_body_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/categories"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "isSuccess": false,
            "message": "",
            "error": {"code": 1001, "details": "Name already exists"}
        })))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    let err = client
        .create::<_, Record>(
            Resource::Categories,
            &json!({"name": "Shoes"}),
            "token",
            RequestOptions::new(Locale::En),
        )
        .await
        .unwrap_err();

    match err {
        ClientError::Status {
            status,
            code,
            message,
            ..
        } => {
            assert_eq!(status, 422);
            assert_eq!(code.as_deref(), Some("1001"));
            assert_eq!(message, "Name already exists");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_without_body_uses_localized_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/banners"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    let err = client
        .list::<Record>(Resource::Banners, &ListQuery::default(), None)
        .await
        .unwrap_err();

    match err {
        ClientError::Status { status, message, .. } => {
            assert_eq!(status, 500);
            assert_eq!(message, Locale::Ar.message(Message::GenericError));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_reports_localized_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/logos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = ApiClient::builder()
        .base_url(mock_server.uri())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let err = client
        .list::<Record>(Resource::Logos, &ListQuery::new(Locale::En, 10), None)
        .await
        .unwrap_err();

    match err {
        ClientError::Timeout { message } => {
            assert_eq!(message, Locale::En.message(Message::RequestTimedOut));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/products/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "isSuccess": false,
            "message": "Product is hidden"
        })))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    let err = client
        .get::<Record>(Resource::Products, "p1", None, RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Rejected { ref message, .. } if message == "Product is hidden"));
}

#[tokio::test]
async fn test_invalid_filters_fail_before_any_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    let query = ListQuery::default().price_between(Some(50.0), Some(10.0));
    let err = client
        .list::<Record>(Resource::Products, &query, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Core(_)));
}
