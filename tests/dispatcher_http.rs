mod common;

use common::{dispatcher_for, quiet_logger, refused_url};
use letmecount_mcp::mcp::catalog::tool_by_name;
use letmecount_mcp::services::config::AppConfig;
use letmecount_mcp::services::dispatcher::{Dispatcher, Payload, RequestExecutor, RequestOutcome};
use letmecount_mcp::services::operation::OperationDescriptor;
use letmecount_mcp::services::session::{SessionState, SessionStatus};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn op(name: &str) -> &'static OperationDescriptor {
    &tool_by_name(name).expect("tool").operation
}

#[tokio::test]
async fn login_stores_token_and_later_calls_carry_it() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"username": "alice", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "abc123"})))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .expect(1)
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    assert_eq!(dispatcher.session().status(), SessionStatus::Unauthenticated);

    let outcome = dispatcher
        .execute(
            op("auth_login"),
            &json!({"username": "alice", "password": "secret"}),
        )
        .await;
    match &outcome {
        RequestOutcome::Success(Payload::Json(value)) => {
            assert_eq!(value["authenticated"], true);
            assert!(!value.to_string().contains("abc123"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(dispatcher.session().get().as_deref(), Some("abc123"));

    let me = dispatcher.execute(op("users_me"), &json!({})).await;
    assert_eq!(
        me,
        RequestOutcome::Success(Payload::Json(json!({"username": "alice"})))
    );

    let received = backend.received_requests().await.expect("recording");
    let login = received
        .iter()
        .find(|req| req.url.path() == "/auth")
        .expect("login request");
    assert!(login.headers.get("authorization").is_none());
}

#[tokio::test]
async fn second_login_replaces_token() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(body_json(json!({"username": "alice", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "first"})))
        .mount(&backend)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .and(body_json(json!({"username": "bob", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "second"})))
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    dispatcher
        .execute(op("auth_login"), &json!({"username": "alice", "password": "pw"}))
        .await;
    assert_eq!(dispatcher.session().get().as_deref(), Some("first"));
    dispatcher
        .execute(op("auth_login"), &json!({"username": "bob", "password": "pw"}))
        .await;
    assert_eq!(dispatcher.session().get().as_deref(), Some("second"));
}

#[tokio::test]
async fn failed_login_leaves_session_untouched() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(401).set_body_string("{\"message\":\"Invalid credentials.\"}"))
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    let outcome = dispatcher
        .execute(op("auth_login"), &json!({"username": "alice", "password": "bad"}))
        .await;
    assert_eq!(
        outcome,
        RequestOutcome::HttpError {
            status: 401,
            body: "{\"message\":\"Invalid credentials.\"}".to_string(),
        }
    );
    assert_eq!(dispatcher.session().get(), None);
}

#[tokio::test]
async fn login_without_token_field_is_transport_error() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    let outcome = dispatcher
        .execute(op("auth_login"), &json!({"username": "alice", "password": "pw"}))
        .await;
    assert!(matches!(outcome, RequestOutcome::TransportError { .. }));
    assert_eq!(dispatcher.session().status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn unauthenticated_calls_have_no_authorization_header() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"member": []})))
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    dispatcher.execute(op("tags_list"), &json!({})).await;

    let received = backend.received_requests().await.expect("recording");
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
    assert_eq!(
        received[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/ld+json")
    );
}

#[tokio::test]
async fn tag_list_filter_uses_repeated_array_keys() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/depenses"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"member": []})))
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    let outcome = dispatcher
        .execute(
            op("depenses_list"),
            &json!({"page": 2, "tags": ["food", "travel"]}),
        )
        .await;
    assert!(outcome.is_success());

    let received = backend.received_requests().await.expect("recording");
    let pairs: Vec<(String, String)> = received[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("tag[]".to_string(), "food".to_string())));
    assert!(pairs.contains(&("tag[]".to_string(), "travel".to_string())));
    assert!(!pairs.iter().any(|(_, v)| v == "food,travel"));
}

#[tokio::test]
async fn merge_patch_update_sends_only_given_fields() {
    let backend = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/depenses/42"))
        .and(header("content-type", "application/merge-patch+json"))
        .and(body_json(json!({"titre": "Groceries"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 42, "titre": "Groceries"})),
        )
        .expect(1)
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    let outcome = dispatcher
        .execute(op("depenses_update"), &json!({"id": "42", "titre": "Groceries"}))
        .await;
    assert_eq!(
        outcome,
        RequestOutcome::Success(Payload::Json(json!({"id": 42, "titre": "Groceries"})))
    );
}

#[tokio::test]
async fn delete_with_no_content_returns_sentinel() {
    let backend = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/tags/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    let outcome = dispatcher.execute(op("tags_delete"), &json!({"id": "7"})).await;
    assert_eq!(outcome, RequestOutcome::Success(Payload::NoContent));
    assert_eq!(outcome.to_value()["data"], "Operation successful.");
}

#[tokio::test]
async fn not_found_body_is_passed_through_verbatim() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/depenses/999"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"detail\":\"not found\"}"))
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    let outcome = dispatcher.execute(op("depenses_get"), &json!({"id": "999"})).await;
    assert_eq!(
        outcome,
        RequestOutcome::HttpError {
            status: 404,
            body: "{\"detail\":\"not found\"}".to_string(),
        }
    );
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let dispatcher = dispatcher_for(&refused_url().await);
    let outcome = dispatcher.execute(op("users_me"), &json!({})).await;
    match outcome {
        RequestOutcome::TransportError { message } => assert!(!message.trim().is_empty()),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn repeated_reads_are_structurally_equal() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"@id": "/users/3", "username": "carol"})),
        )
        .expect(2)
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    let first = dispatcher.execute(op("users_get"), &json!({"id": "3"})).await;
    let second = dispatcher.execute(op("users_get"), &json!({"id": "3"})).await;
    assert!(first.is_success());
    assert_eq!(first, second);
}

#[tokio::test]
async fn credential_update_sends_token_in_body() {
    let backend = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/users"))
        .and(header("content-type", "application/merge-patch+json"))
        .and(body_json(json!({"token": "reset-1", "password": "n3w"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"updated": true})))
        .expect(1)
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    let outcome = dispatcher
        .execute(
            op("users_update_credentials"),
            &json!({"token": "reset-1", "password": "n3w"}),
        )
        .await;
    assert!(outcome.is_success());
}

#[tokio::test]
async fn concurrent_calls_share_one_session() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .and(header("authorization", "Bearer shared"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"member": []})))
        .expect(8)
        .mount(&backend)
        .await;

    let dispatcher = Arc::new(dispatcher_for(&backend.uri()));
    dispatcher.session().set("shared");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.execute(op("tags_list"), &json!({})).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.expect("join").is_success());
    }
}

#[tokio::test]
async fn redirects_are_reported_not_followed() {
    let backend = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/tags/7"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .expect(1)
        .mount(&backend)
        .await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"followed": true})))
        .expect(0)
        .mount(&backend)
        .await;

    let dispatcher = dispatcher_for(&backend.uri());
    dispatcher.session().set("tok");
    let outcome = dispatcher.execute(op("tags_delete"), &json!({"id": "7"})).await;
    assert!(
        matches!(outcome, RequestOutcome::HttpError { status: 302, .. }),
        "unexpected outcome: {:?}",
        outcome
    );

    let received = backend.received_requests().await.expect("recording");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].url.path(), "/tags/7");
}

#[tokio::test]
async fn slow_backend_times_out_as_transport_error() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"username": "slow"}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&backend)
        .await;

    let config =
        AppConfig::from_values(Some(&backend.uri()), None, Some("50")).expect("config");
    assert_eq!(config.request_timeout, Some(Duration::from_millis(50)));
    let dispatcher =
        Dispatcher::new(quiet_logger(), &config, Arc::new(SessionState::new())).expect("dispatcher");

    let outcome = dispatcher.execute(op("users_me"), &json!({})).await;
    match outcome {
        RequestOutcome::TransportError { message } => {
            assert!(message.starts_with("request timed out"), "message: {}", message)
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}
