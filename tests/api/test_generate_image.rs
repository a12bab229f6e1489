// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tests for POST /api/generate-image through the full router

use super::support::*;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use image_gateway::api::{generate_image::MAX_BODY_BYTES, GENERATE_IMAGE_PATH};
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`

// ============================================================================
// Method and origin checks
// ============================================================================

#[tokio::test]
async fn test_get_returns_405_json() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(request(Method::GET, Some(ALLOWED_ORIGIN), CLIENT_UA, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "method_not_allowed");
    assert_eq!(store.gets(), 0);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_foreign_origin_rejected_without_store_access() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(request(
            Method::POST,
            Some(EVIL_ORIGIN),
            CLIENT_UA,
            r#"{"prompt":"a cat"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "origin_not_allowed");
    assert_eq!(store.gets(), 0);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_missing_origin_rejected() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(request(Method::POST, None, CLIENT_UA, r#"{"prompt":"a cat"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(store.gets(), 0);
}

#[tokio::test]
async fn test_origin_prefix_is_not_a_match() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(request(
            Method::POST,
            Some("https://app.example.attacker.net"),
            CLIENT_UA,
            r#"{"prompt":"a cat"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

fn oversized_request(method: Method, origin: &str, len: usize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(GENERATE_IMAGE_PATH)
        .header("origin", origin)
        .header("content-type", "application/json")
        .body(Body::from(vec![b' '; len]))
        .unwrap()
}

#[tokio::test]
async fn test_large_body_on_wrong_method_is_json_405() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(oversized_request(Method::GET, ALLOWED_ORIGIN, 3 * 1024 * 1024))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "method_not_allowed");
    assert_eq!(store.gets(), 0);
}

#[tokio::test]
async fn test_large_body_from_foreign_origin_is_json_403() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(oversized_request(Method::POST, EVIL_ORIGIN, MAX_BODY_BYTES + 1))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "origin_not_allowed");
}

// ============================================================================
// Input validation
// ============================================================================

#[tokio::test]
async fn test_body_over_limit_is_json_400() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(oversized_request(Method::POST, ALLOWED_ORIGIN, MAX_BODY_BYTES + 1))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(store.gets(), 0);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_empty_prompt_is_400_even_with_quota_used() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let first = app
        .clone()
        .oneshot(post(r#"{"prompt":"a cat"}"#))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    for body in [r#"{"prompt":""}"#, r#"{"prompt":"   "}"#, r#"{}"#, ""] {
        let response = app.clone().oneshot(post(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {:?}", body);
        let json = body_json(response).await;
        assert_eq!(json["error"], "missing_prompt");
        assert_eq!(json["message"], "Missing prompt");
    }

    assert_eq!(provider.calls(), 1);
    // Only the first request reached the quota lookup
    assert_eq!(store.gets(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app.oneshot(post("{prompt:")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(store.gets(), 0);
}

#[tokio::test]
async fn test_unknown_size_is_400() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(post(r#"{"prompt":"a cat","size":"640x480"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_size");
    assert!(body["message"].as_str().unwrap().contains("640x480"));
    assert_eq!(provider.calls(), 0);
}

// ============================================================================
// Generation and quota
// ============================================================================

#[tokio::test]
async fn test_success_returns_data_url_and_commits() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(post(r#"{"prompt":"  a red bicycle  "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["image"],
        format!("data:image/png;base64,{}", PNG_B64).as_str()
    );

    let sent = provider.last_request().unwrap();
    assert_eq!(sent.prompt, "a red bicycle");
    assert!(sent.size.is_none());
    assert!(sent.model.is_none());

    assert_eq!(store.sets(), 1);
    assert_eq!(store.live_records(), 1);
}

#[tokio::test]
async fn test_size_and_model_are_forwarded() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app
        .oneshot(post(
            r#"{"prompt":"a red bicycle","size":"512x512","model":"dall-e-3"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let sent = provider.last_request().unwrap();
    assert_eq!(sent.size.as_deref(), Some("512x512"));
    assert_eq!(sent.model.as_deref(), Some("dall-e-3"));
}

#[tokio::test]
async fn test_remote_url_is_passed_through() {
    let provider = StubProvider::new(StubBehavior::Remote("https://cdn.example/img/1.png"));
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app.oneshot(post(r#"{"prompt":"a boat"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["image"], "https://cdn.example/img/1.png");
}

#[tokio::test]
async fn test_second_request_is_429() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let first = app
        .clone()
        .oneshot(post(r#"{"prompt":"a cat"}"#))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(post(r#"{"prompt":"a dog"}"#)).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(second).await;
    assert_eq!(body["error"], "limit_reached");
    assert_eq!(
        body["message"],
        "You have used your free image for now. Try again in 24 hours."
    );
    assert_eq!(body["details"]["windowSecs"], 86_400);

    assert_eq!(provider.calls(), 1);
    assert_eq!(store.sets(), 1);
}

#[tokio::test]
async fn test_different_user_agent_has_own_quota() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let first = app
        .clone()
        .oneshot(post(r#"{"prompt":"a cat"}"#))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let other = app
        .oneshot(request(
            Method::POST,
            Some(ALLOWED_ORIGIN),
            "curl/8.4.0",
            r#"{"prompt":"a cat"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(store.live_records(), 2);
}

#[tokio::test]
async fn test_quota_expires_after_window() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = build_app(provider.clone(), store.clone(), Duration::from_millis(100));

    let first = app
        .clone()
        .oneshot(post(r#"{"prompt":"a cat"}"#))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let blocked = app
        .clone()
        .oneshot(post(r#"{"prompt":"a cat"}"#))
        .await
        .unwrap();
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let again = app.oneshot(post(r#"{"prompt":"a cat"}"#)).await.unwrap();
    assert_eq!(again.status(), StatusCode::OK);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_store_read_failure_fails_closed() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::failing_get();
    let app = default_app(provider.clone(), store.clone());

    let response = app.oneshot(post(r#"{"prompt":"a cat"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "server_error");
    assert!(!body.to_string().contains("store down"));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_store_write_failure_still_returns_image() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::failing_set();
    let app = default_app(provider.clone(), store.clone());

    let response = app.oneshot(post(r#"{"prompt":"a cat"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["image"].as_str().unwrap().starts_with("data:image/png"));
    assert_eq!(store.sets(), 1);
    assert_eq!(store.live_records(), 0);
}

#[tokio::test]
async fn test_unstorable_window_still_returns_image() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = build_app(
        provider.clone(),
        store.clone(),
        Duration::from_secs(u64::MAX),
    );

    let response = app.oneshot(post(r#"{"prompt":"a cat"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["image"].as_str().unwrap().starts_with("data:image/png"));
    assert_eq!(provider.calls(), 1);
    assert_eq!(store.sets(), 1);
    assert_eq!(store.live_records(), 0);
}

#[tokio::test]
async fn test_upstream_error_is_502_and_not_committed() {
    let provider = StubProvider::new(StubBehavior::HttpError(
        400,
        r#"{"error":{"message":"content policy violation"}}"#,
    ));
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let failed = app
        .clone()
        .oneshot(post(r#"{"prompt":"a cat"}"#))
        .await
        .unwrap();
    assert_eq!(failed.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(failed).await;
    assert_eq!(body["error"], "upstream_error");
    assert_eq!(
        body["details"]["error"]["message"],
        "content policy violation"
    );
    assert_eq!(store.sets(), 0);

    // The allowance was not used, so a retry goes through
    provider.set_behavior(StubBehavior::Inline);
    let retry = app.oneshot(post(r#"{"prompt":"a cat"}"#)).await.unwrap();
    assert_eq!(retry.status(), StatusCode::OK);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_missing_image_is_500_and_not_committed() {
    let provider = StubProvider::new(StubBehavior::NoImage);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let response = app.oneshot(post(r#"{"prompt":"a cat"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "no_image_returned");
    assert_eq!(store.sets(), 0);
}

#[tokio::test]
async fn test_concurrent_first_requests_may_both_pass() {
    let provider = StubProvider::new(StubBehavior::Inline);
    let store = CountingStore::new();
    let app = default_app(provider.clone(), store.clone());

    let (a, b) = tokio::join!(
        app.clone().oneshot(post(r#"{"prompt":"a cat"}"#)),
        app.clone().oneshot(post(r#"{"prompt":"a dog"}"#)),
    );
    let statuses = [a.unwrap().status(), b.unwrap().status()];

    // Check-then-commit is not atomic; at least one must succeed
    assert!(statuses.contains(&StatusCode::OK));
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::OK || *s == StatusCode::TOO_MANY_REQUESTS));
    assert_eq!(store.live_records(), 1);
}
