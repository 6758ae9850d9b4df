use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use sea_orm::ConnectOptions;
use std::sync::Arc;
use tower::util::ServiceExt;

use eventpulse_broker::Publisher;
use eventpulse_ingest::app;
use eventpulse_ingest::state::AppState;
use eventpulse_storage::IngestStore;

async fn test_state() -> AppState {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let store = IngestStore::connect_with(options).await.unwrap();
    AppState {
        store: Arc::new(store),
        publisher: Arc::new(Publisher::disabled()),
        topic_alert_raised: "alert.raised".to_string(),
        ready: true,
    }
}

async fn post_webhook(state: &AppState, body: &str) -> StatusCode {
    let app = app::build_router(state.clone());
    let request = Request::builder()
        .method("POST")
        .uri("/alertmanager")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn firing_webhook_persists_and_enqueues() {
    let state = test_state().await;
    let body = r#"{"status":"firing","alerts":[{"status":"firing","fingerprint":"fp1","labels":{"alertname":"HighCPU"},"annotations":{},"startsAt":"t1","endsAt":""}]}"#;

    assert_eq!(post_webhook(&state, body).await, StatusCode::OK);

    let alert = state.store.get_alert("fp1").await.unwrap().unwrap();
    assert_eq!(alert.status, "firing");
    assert_eq!(alert.occurrences, 1);

    let outbox = state.store.list_outbox().await.unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].kind, "alert.raised");
    assert!(outbox[0]
        .payload
        .contains(r#""dedup_key":"fp1:alert.raised:firing""#));
}

#[tokio::test]
async fn repeated_webhook_bumps_occurrences_and_appends_outbox() {
    let state = test_state().await;
    let body = r#"{"alerts":[{"status":"firing","fingerprint":"fp1","labels":{},"annotations":{},"startsAt":"t1","endsAt":""}]}"#;

    post_webhook(&state, body).await;
    post_webhook(&state, body).await;

    let alert = state.store.get_alert("fp1").await.unwrap().unwrap();
    assert_eq!(alert.occurrences, 2);
    // The outbox keeps both observations; dedup is the consumer's job.
    assert_eq!(state.store.list_outbox().await.unwrap().len(), 2);
}

#[tokio::test]
async fn missing_fingerprint_gets_the_degenerate_key() {
    let state = test_state().await;
    let body = r#"{"alerts":[{"status":"firing","labels":{},"annotations":{},"startsAt":"t1","endsAt":""}]}"#;

    assert_eq!(post_webhook(&state, body).await, StatusCode::OK);

    let outbox = state.store.list_outbox().await.unwrap();
    assert_eq!(outbox.len(), 1);
    assert!(outbox[0]
        .payload
        .contains(r#""dedup_key":":alert.raised:firing""#));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let state = test_state().await;
    assert_eq!(
        post_webhook(&state, "{not json").await,
        StatusCode::BAD_REQUEST
    );
    assert!(state.store.list_outbox().await.unwrap().is_empty());
}

#[tokio::test]
async fn health_and_ready_answer() {
    let state = test_state().await;
    let app = app::build_router(state);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
