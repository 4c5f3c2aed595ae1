//! REST surface integration tests
//!
//! Exercise the axum router directly, the way the teacher dashboard and the
//! game client do, without binding a socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use arcaded::config::Config;
use arcaded::db::{banks, Database};
use arcaded::handlers;
use arcaded::state::{AppState, Registry};

async fn test_state() -> Arc<AppState> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let mut config = Config::default();
    config.auth.jwt_secret = "test-secret".to_string();
    config.server.max_sessions = 10;

    let db = Database::in_memory().await.unwrap();
    db.init_schema().await.unwrap();

    let registry = Registry::new(config.server.max_sessions);
    Arc::new(AppState::new(config, registry, db))
}

fn teacher_token(state: &AppState) -> String {
    state.auth.sign("teacher-1", 3600).unwrap()
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn create_body() -> Value {
    json!({
        "game_type": "snake_race",
        "teacher_mode": "monitor",
        "time_limit_minutes": 10,
        "max_players": 30,
        "question_source": "math"
    })
}

#[tokio::test]
async fn create_requires_teacher_auth() {
    let state = test_state().await;
    let app = handlers::router(state.clone());

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        None,
        Some(create_body()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].is_string());

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some("not-a-jwt"),
        Some(create_body()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_preview_join_flow() {
    let state = test_state().await;
    let app = handlers::router(state.clone());
    let token = teacher_token(&state);

    let (status, created) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some(&token),
        Some(create_body()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let code = created["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);
    assert_eq!(created["status"], "lobby");
    assert_eq!(created["player_count"], 0);

    // Public preview
    let (status, preview) = send_json(
        &app,
        "GET",
        &format!("/api/reviewarcade/sessions/{}", code),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["max_players"], 30);

    // Join
    let (status, player) = send_json(
        &app,
        "POST",
        &format!("/api/reviewarcade/sessions/{}/join", code),
        None,
        Some(json!({"name": "Ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["name"], "Ada");
    assert_eq!(player["is_teacher"], false);
    assert!(player["player_token"].as_str().unwrap().len() >= 32);

    // Count reflects the join
    let (_, preview) = send_json(
        &app,
        "GET",
        &format!("/api/reviewarcade/sessions/{}", code),
        None,
        None,
    )
    .await;
    assert_eq!(preview["player_count"], 1);

    // Same name gets a suffix
    let (_, second) = send_json(
        &app,
        "POST",
        &format!("/api/reviewarcade/sessions/{}/join", code),
        None,
        Some(json!({"name": "ada"})),
    )
    .await;
    assert_eq!(second["name"], "ada#2");
}

#[tokio::test]
async fn join_error_paths() {
    let state = test_state().await;
    let app = handlers::router(state.clone());
    let token = teacher_token(&state);

    // Unknown code
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions/ZZZZZZ/join",
        None,
        Some(json!({"name": "Ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bad name
    let mut body = create_body();
    body["max_players"] = json!(5);
    let (_, created) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some(&token),
        Some(body),
    )
    .await;
    let code = created["code"].as_str().unwrap().to_string();

    let (status, detail) = send_json(
        &app,
        "POST",
        &format!("/api/reviewarcade/sessions/{}/join", code),
        None,
        Some(json!({"name": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail["detail"].is_string());

    // Full session
    for i in 0..5 {
        let (status, _) = send_json(
            &app,
            "POST",
            &format!("/api/reviewarcade/sessions/{}/join", code),
            None,
            Some(json!({"name": format!("Player{}", i)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, detail) = send_json(
        &app,
        "POST",
        &format!("/api/reviewarcade/sessions/{}/join", code),
        None,
        Some(json!({"name": "Overflow"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(detail["detail"], "full");
}

#[tokio::test]
async fn invalid_session_configs_are_rejected() {
    let state = test_state().await;
    let app = handlers::router(state.clone());
    let token = teacher_token(&state);

    let mut body = create_body();
    body["time_limit_minutes"] = json!(2);
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = create_body();
    body["question_source"] = json!("bank");
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "bank source needs bank_ids");
}

#[tokio::test]
async fn bank_backed_sessions_load_their_questions() {
    let state = test_state().await;
    let app = handlers::router(state.clone());
    let token = teacher_token(&state);

    let question = arcade_core::types::Question {
        question_id: "q1".to_string(),
        text: "2 + 2".to_string(),
        options: ["4".into(), "3".into(), "5".into(), "22".into()],
        correct_index: 0,
        category: None,
        difficulty: None,
    };
    let bank_id = banks::create_bank(state.db.pool(), "unit", &[question])
        .await
        .unwrap();

    let mut body = create_body();
    body["question_source"] = json!("bank");
    body["question_bank_ids"] = json!([bank_id]);
    let (status, created) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some(&token),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(created["code"].is_string());
}

#[tokio::test]
async fn teacher_listing_is_scoped_to_the_owner() {
    let state = test_state().await;
    let app = handlers::router(state.clone());
    let token = teacher_token(&state);
    let other = state.auth.sign("teacher-2", 3600).unwrap();

    for _ in 0..3 {
        send_json(
            &app,
            "POST",
            "/api/reviewarcade/sessions",
            Some(&token),
            Some(create_body()),
        )
        .await;
    }

    let (status, sessions) = send_json(
        &app,
        "GET",
        "/api/reviewarcade/sessions?limit=2",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sessions.as_array().unwrap().len(), 2);

    let (_, sessions) = send_json(
        &app,
        "GET",
        "/api/reviewarcade/sessions",
        Some(&other),
        None,
    )
    .await;
    assert_eq!(sessions.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn join_teacher_checks_ownership_and_mode() {
    let state = test_state().await;
    let app = handlers::router(state.clone());
    let token = teacher_token(&state);
    let other = state.auth.sign("teacher-2", 3600).unwrap();

    // Monitor-mode session: the teacher does not play
    let (_, created) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some(&token),
        Some(create_body()),
    )
    .await;
    let code = created["code"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/reviewarcade/sessions/{}/join-teacher", code),
        Some(&token),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Play-mode session
    let mut body = create_body();
    body["teacher_mode"] = json!("play");
    let (_, created) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some(&token),
        Some(body),
    )
    .await;
    let code = created["code"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/reviewarcade/sessions/{}/join-teacher", code),
        Some(&other),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, player) = send_json(
        &app,
        "POST",
        &format!("/api/reviewarcade/sessions/{}/join-teacher", code),
        Some(&token),
        Some(json!({"name": "Ms. Lovelace"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["is_teacher"], true);
}

#[tokio::test]
async fn results_require_an_ended_session() {
    let state = test_state().await;
    let app = handlers::router(state.clone());
    let token = teacher_token(&state);

    let (_, created) = send_json(
        &app,
        "POST",
        "/api/reviewarcade/sessions",
        Some(&token),
        Some(create_body()),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send_json(
        &app,
        "GET",
        &format!("/api/reviewarcade/sessions/{}/results", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "live session has no results");

    let other = state.auth.sign("teacher-2", 3600).unwrap();
    let (status, _) = send_json(
        &app,
        "GET",
        &format!("/api/reviewarcade/sessions/{}/results", id),
        Some(&other),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_codes_are_404_and_ws_upgrades_are_guarded() {
    let state = test_state().await;
    let app = handlers::router(state.clone());

    let (status, _) = send_json(&app, "GET", "/api/reviewarcade/sessions/ZZZZZZ", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // WebSocket route exists but refuses unknown sessions before upgrading
    let request = Request::builder()
        .method("GET")
        .uri("/ws/reviewarcade/ZZZZZZ")
        .header(header::CONNECTION, "upgrade")
        .header(header::UPGRADE, "websocket")
        .header(header::SEC_WEBSOCKET_VERSION, "13")
        .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
