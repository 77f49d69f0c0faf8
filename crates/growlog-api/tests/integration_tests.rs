//! HTTP-level integration tests for the Growlog API.
//!
//! Every test builds its own router over an in-memory database and drives
//! it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use growlog_api::auth::{Passwords, TokenKeys};
use growlog_api::create_router;
use growlog_api::handlers::WELCOME;
use growlog_api::ingress::MAX_BODY_BYTES;
use growlog_api::state::AppState;
use growlog_core::config::GrowlogConfig;
use growlog_core::types::User;
use growlog_storage::Database;

// =============================================================================
// Helpers
// =============================================================================

const TEST_SECRET: &str = "integration-test-secret";

fn test_config() -> GrowlogConfig {
    let mut config = GrowlogConfig::default();
    config.auth.jwt_secret = Some(TEST_SECRET.to_string());
    config
}

/// Create a fresh AppState with an in-memory DB and cheap password hashing.
fn make_state(config: GrowlogConfig) -> AppState {
    let mut state = AppState::new(config, Database::in_memory().unwrap());
    state.passwords = Arc::new(Passwords::with_cost(1024, 1).unwrap());
    state
}

fn make_app_with(config: GrowlogConfig) -> Router {
    create_router(make_state(config))
}

fn make_app() -> Router {
    make_app_with(test_config())
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request(Method::GET, uri, token, None)
}

fn post_json(uri: &str, token: Option<&str>, json: Value) -> Request<Body> {
    request(Method::POST, uri, token, Some(&json.to_string()))
}

/// Read full response body bytes.
async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    String::from_utf8(body_bytes(resp).await).unwrap()
}

/// Sign up a user and return their bearer token.
async fn signup(app: &Router, email: &str) -> String {
    let resp = app
        .clone()
        .oneshot(post_json(
            "/auth/signup",
            None,
            json!({ "email": email, "password": "hunter2hunter2", "nickname": "sprout" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await["token"].as_str().unwrap().to_string()
}

async fn create_todo(app: &Router, token: &str, title: &str, date: &str) -> Value {
    let resp = app
        .clone()
        .oneshot(post_json(
            "/todos",
            Some(token),
            json!({ "title": title, "date": date }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// =============================================================================
// Health and root
// =============================================================================

#[tokio::test]
async fn test_health_returns_ok() {
    let resp = make_app().oneshot(get("/health", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "OK");
}

#[tokio::test]
async fn test_health_ignores_headers_and_body() {
    let req = Request::get("/health")
        .header("authorization", "Bearer garbage")
        .header("content-type", "application/json")
        .body(Body::from("{definitely not json"))
        .unwrap();
    let resp = make_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "OK");
}

#[tokio::test]
async fn test_health_detailed() {
    let mut config = test_config();
    config.health.detailed = true;
    config.server.environment = "staging".to_string();

    let resp = make_app_with(config)
        .oneshot(get("/health", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["env"], "staging");
    assert!(body["uptime_secs"].is_u64());
    assert!(body["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_root_welcome() {
    let resp = make_app().oneshot(get("/", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, WELCOME);
}

#[tokio::test]
async fn test_root_wrong_method() {
    let resp = make_app()
        .oneshot(request(Method::DELETE, "/", None, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_path() {
    let resp = make_app()
        .oneshot(get("/does-not-exist", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Ingress pipeline
// =============================================================================

#[tokio::test]
async fn test_cors_headers_on_every_response() {
    let req = Request::get("/")
        .header("origin", "https://garden.example")
        .body(Body::empty())
        .unwrap();
    let resp = make_app().oneshot(req).await.unwrap();
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_preflight_on_protected_route() {
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/todos")
        .header("origin", "https://garden.example")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization,content-type")
        .body(Body::empty())
        .unwrap();
    let resp = make_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("access-control-allow-methods"));
}

#[tokio::test]
async fn test_malformed_json_rejected_before_routing() {
    let resp = make_app()
        .oneshot(request(
            Method::POST,
            "/auth/login",
            None,
            Some("{\"email\": "),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_malformed_json_rejected_before_gate() {
    // No token: the body check answers before the auth gate does.
    let resp = make_app()
        .oneshot(request(Method::POST, "/todos", None, Some("[1, 2")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversize_body_rejected() {
    let content = "a".repeat(MAX_BODY_BYTES + 16);
    let resp = make_app()
        .oneshot(post_json("/reflections", None, json!({ "content": content })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(resp).await["error"], "payload_too_large");
}

#[tokio::test]
async fn test_scalar_json_body_rejected() {
    let resp = make_app()
        .oneshot(request(Method::POST, "/reflections", None, Some("\"hi\"")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_json_content_type_passes_through() {
    let req = Request::get("/")
        .header("content-type", "text/plain")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = make_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_shape_is_unprocessable() {
    let resp = make_app()
        .oneshot(post_json("/auth/login", None, json!({ "email": 42 })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "unprocessable_entity");
}

// =============================================================================
// Auth gate
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = make_app();
    for uri in ["/todos", "/emotions", "/daily/2024-05-01", "/daily?from=2024-05-01&to=2024-05-02"] {
        let resp = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["message"], "Missing Authorization header");
    }
}

#[tokio::test]
async fn test_gate_covers_unrouted_protected_paths() {
    let app = make_app();
    for uri in ["/todos/", "/todos/abc/def", "/emotions/x/y", "/daily/2024-01-01/extra"] {
        let resp = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body_json(resp).await["error"], "unauthorized");
    }

    // With a token the same paths fall through to the router's 404.
    let token = signup(&app, "fern@example.com").await;
    let resp = app
        .oneshot(get("/todos/abc/def", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "not_found");
}

#[tokio::test]
async fn test_gate_leaves_lookalike_prefixes_alone() {
    let resp = make_app().oneshot(get("/todosx", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gate_rejects_wrong_scheme() {
    let req = Request::get("/todos")
        .header("authorization", "Token abc")
        .body(Body::empty())
        .unwrap();
    let resp = make_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_gate_rejects_foreign_signature() {
    let app = make_app();
    let user = User {
        id: uuid::Uuid::new_v4(),
        email: "forger@example.com".to_string(),
        nickname: "forger".to_string(),
        created_at: chrono::Utc::now(),
    };
    let forged = TokenKeys::new("some-other-secret", 3600)
        .issue(&user)
        .unwrap();
    let resp = app.oneshot(get("/todos", Some(&forged))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["message"], "Invalid bearer token");
}

#[tokio::test]
async fn test_gate_rejects_expired_token() {
    let app = make_app();
    let user = User {
        id: uuid::Uuid::new_v4(),
        email: "late@example.com".to_string(),
        nickname: "late".to_string(),
        created_at: chrono::Utc::now(),
    };
    let issued = chrono::Utc::now().timestamp() as u64 - 7200;
    let expired = TokenKeys::new(TEST_SECRET, 60)
        .issue_at(&user, issued)
        .unwrap();
    let resp = app.oneshot(get("/todos", Some(&expired))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await["message"], "Token has expired");
}

#[tokio::test]
async fn test_reflections_are_public() {
    let resp = make_app().oneshot(get("/reflections", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
}

// =============================================================================
// Auth routes
// =============================================================================

#[tokio::test]
async fn test_signup_login_me() {
    let app = make_app();
    let token = signup(&app, "fern@example.com").await;

    let resp = app
        .clone()
        .oneshot(get("/auth/me", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let me = body_json(resp).await;
    assert_eq!(me["email"], "fern@example.com");
    assert_eq!(me["nickname"], "sprout");
    assert!(me.get("password_hash").is_none());

    let resp = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({ "email": "FERN@example.com", "password": "hunter2hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["token"].as_str().unwrap().len() > 20);
    assert_eq!(body["user"]["id"], me["id"]);
}

#[tokio::test]
async fn test_signup_validation() {
    let app = make_app();
    let cases = [
        json!({ "email": "no-at-sign", "password": "hunter2hunter2", "nickname": "a" }),
        json!({ "email": "a@example.com", "password": "short", "nickname": "a" }),
        json!({ "email": "a@example.com", "password": "hunter2hunter2", "nickname": "  " }),
    ];
    for case in cases {
        let resp = app
            .clone()
            .oneshot(post_json("/auth/signup", None, case.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", case);
    }
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let app = make_app();
    signup(&app, "dup@example.com").await;
    let resp = app
        .oneshot(post_json(
            "/auth/signup",
            None,
            json!({ "email": "dup@example.com", "password": "hunter2hunter2", "nickname": "b" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = make_app();
    signup(&app, "ivy@example.com").await;

    let wrong_password = app
        .clone()
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({ "email": "ivy@example.com", "password": "not-the-password" }),
        ))
        .await
        .unwrap();
    let unknown_user = app
        .oneshot(post_json(
            "/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": "hunter2hunter2" }),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_user).await);
}

#[tokio::test]
async fn test_me_requires_token() {
    let resp = make_app().oneshot(get("/auth/me", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Todos
// =============================================================================

#[tokio::test]
async fn test_todo_lifecycle() {
    let app = make_app();
    let token = signup(&app, "rose@example.com").await;

    let todo = create_todo(&app, &token, "water the roses", "2024-05-01").await;
    assert_eq!(todo["done"], false);
    let id = todo["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(request(
            Method::PATCH,
            &format!("/todos/{}", id),
            Some(&token),
            Some(r#"{"title": "water all the roses"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["title"], "water all the roses");

    let resp = app
        .clone()
        .oneshot(request(
            Method::PATCH,
            &format!("/todos/{}/toggle", id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["done"], true);

    let resp = app
        .clone()
        .oneshot(get(&format!("/todos/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["done"], true);

    let resp = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/todos/{}", id),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(get(&format!("/todos/{}", id), Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_todo_list_date_filter() {
    let app = make_app();
    let token = signup(&app, "oak@example.com").await;
    create_todo(&app, &token, "first", "2024-05-01").await;
    create_todo(&app, &token, "second", "2024-05-02").await;
    create_todo(&app, &token, "third", "2024-05-01").await;

    let resp = app
        .clone()
        .oneshot(get("/todos?date=2024-05-01", Some(&token)))
        .await
        .unwrap();
    let titles: Vec<String> = body_json(resp)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["first", "third"]);

    let resp = app
        .oneshot(get("/todos?date=May-first", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_todo_validation() {
    let app = make_app();
    let token = signup(&app, "elm@example.com").await;

    let resp = app
        .clone()
        .oneshot(post_json("/todos", Some(&token), json!({ "title": "   " })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let todo = create_todo(&app, &token, "prune", "2024-05-01").await;
    let resp = app
        .clone()
        .oneshot(request(
            Method::PATCH,
            &format!("/todos/{}", todo["id"].as_str().unwrap()),
            Some(&token),
            Some("{}"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(get("/todos/not-a-uuid", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_todos_isolated_between_users() {
    let app = make_app();
    let alice = signup(&app, "alice@example.com").await;
    let bob = signup(&app, "bob@example.com").await;

    let todo = create_todo(&app, &alice, "alice only", "2024-05-01").await;
    let id = todo["id"].as_str().unwrap();

    let resp = app.clone().oneshot(get("/todos", Some(&bob))).await.unwrap();
    assert_eq!(body_json(resp).await, json!([]));

    let resp = app
        .clone()
        .oneshot(get(&format!("/todos/{}", id), Some(&bob)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .clone()
        .oneshot(request(
            Method::DELETE,
            &format!("/todos/{}", id),
            Some(&bob),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .oneshot(get(&format!("/todos/{}", id), Some(&alice)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// =============================================================================
// Reflections
// =============================================================================

#[tokio::test]
async fn test_reflection_anonymous_and_attributed() {
    let app = make_app();
    let token = signup(&app, "sage@example.com").await;

    let resp = app
        .clone()
        .oneshot(post_json(
            "/reflections",
            None,
            json!({ "content": "anonymous thought", "date": "2024-05-01" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["user_id"], Value::Null);

    let resp = app
        .clone()
        .oneshot(post_json(
            "/reflections",
            Some(&token),
            json!({ "content": "my thought", "date": "2024-05-01" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(body_json(resp).await["user_id"].is_string());

    // An invalid token does not block the public route.
    let resp = app
        .clone()
        .oneshot(post_json(
            "/reflections",
            Some("garbage"),
            json!({ "content": "still fine" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(body_json(resp).await["user_id"], Value::Null);

    let resp = app.oneshot(get("/reflections", None)).await.unwrap();
    let listed = body_json(resp).await;
    let contents: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["still fine", "my thought", "anonymous thought"]);
}

#[tokio::test]
async fn test_reflection_delete_rules() {
    let app = make_app();
    let author = signup(&app, "author@example.com").await;
    let other = signup(&app, "other@example.com").await;

    let resp = app
        .clone()
        .oneshot(post_json(
            "/reflections",
            Some(&author),
            json!({ "content": "mine to delete" }),
        ))
        .await
        .unwrap();
    let id = body_json(resp).await["id"].as_str().unwrap().to_string();
    let uri = format!("/reflections/{}", id);

    let resp = app
        .clone()
        .oneshot(request(Method::DELETE, &uri, Some(&other), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(request(Method::DELETE, &uri, Some(&author), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get(&uri, None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Emotions
// =============================================================================

#[tokio::test]
async fn test_emotion_create_and_list() {
    let app = make_app();
    let token = signup(&app, "lily@example.com").await;

    let resp = app
        .clone()
        .oneshot(post_json(
            "/emotions",
            Some(&token),
            json!({ "kind": "gratitude", "intensity": 4, "note": "sun", "date": "2024-05-01" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let emotion = body_json(resp).await;
    assert_eq!(emotion["kind"], "gratitude");

    let resp = app
        .clone()
        .oneshot(get("/emotions?date=2024-05-01", Some(&token)))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

    let other = signup(&app, "thorn@example.com").await;
    let uri = format!("/emotions/{}", emotion["id"].as_str().unwrap());
    let resp = app
        .clone()
        .oneshot(request(Method::DELETE, &uri, Some(&other), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app
        .oneshot(request(Method::DELETE, &uri, Some(&token), None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_emotion_validation() {
    let app = make_app();
    let token = signup(&app, "moss@example.com").await;

    for intensity in [json!(0), json!(6), json!(300), json!(-1), json!(2.5)] {
        let resp = app
            .clone()
            .oneshot(post_json(
                "/emotions",
                Some(&token),
                json!({ "kind": "calm", "intensity": intensity }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let resp = app
        .oneshot(post_json(
            "/emotions",
            Some(&token),
            json!({ "kind": "ecstatic", "intensity": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// Daily
// =============================================================================

#[tokio::test]
async fn test_signup_to_daily_round_trip() {
    let app = make_app();
    let token = signup(&app, "daisy@example.com").await;

    let todo = create_todo(&app, &token, "plant seeds", "2024-05-01").await;
    create_todo(&app, &token, "label pots", "2024-05-01").await;
    app.clone()
        .oneshot(request(
            Method::PATCH,
            &format!("/todos/{}/toggle", todo["id"].as_str().unwrap()),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json(
            "/emotions",
            Some(&token),
            json!({ "kind": "joy", "intensity": 5, "date": "2024-05-01" }),
        ))
        .await
        .unwrap();
    app.clone()
        .oneshot(post_json(
            "/reflections",
            Some(&token),
            json!({ "content": "good start", "date": "2024-05-01" }),
        ))
        .await
        .unwrap();

    let resp = app
        .clone()
        .oneshot(get("/daily/2024-05-01", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let log = body_json(resp).await;
    assert_eq!(log["date"], "2024-05-01");
    assert_eq!(log["todos"].as_array().unwrap().len(), 2);
    assert_eq!(log["reflections"].as_array().unwrap().len(), 1);
    assert_eq!(log["summary"]["total_todos"], 2);
    assert_eq!(log["summary"]["completed_todos"], 1);
    assert_eq!(log["summary"]["dominant_emotion"], "joy");

    let resp = app
        .oneshot(get("/daily?from=2024-04-28&to=2024-05-05", Some(&token)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let logs = body_json(resp).await;
    assert_eq!(logs.as_array().unwrap().len(), 1);
    assert_eq!(logs[0]["date"], "2024-05-01");
}

#[tokio::test]
async fn test_daily_validation() {
    let app = make_app();
    let token = signup(&app, "tulip@example.com").await;

    for uri in [
        "/daily/not-a-date",
        "/daily?from=2024-05-01",
        "/daily?from=2024-05-10&to=2024-05-01",
        "/daily?from=2024-01-01&to=2024-03-01",
    ] {
        let resp = app.clone().oneshot(get(uri, Some(&token))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

// =============================================================================
// Documentation
// =============================================================================

#[tokio::test]
async fn test_docs_page_carries_sample_token() {
    let mut config = test_config();
    config.docs.sample_token = "sample-token-123".to_string();

    let resp = make_app_with(config)
        .oneshot(get("/api-docs", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_text(resp).await;
    assert!(page.contains("var sampleToken = \"sample-token-123\";"));
    assert!(page.contains("preauthorizeApiKey(\"bearerAuth\""));
}

#[tokio::test]
async fn test_docs_page_with_unset_token() {
    let resp = make_app().oneshot(get("/api-docs", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("var sampleToken = \"\";"));
}

#[tokio::test]
async fn test_openapi_json_served() {
    let resp = make_app()
        .oneshot(get("/api-docs/openapi.json", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = body_json(resp).await;
    assert!(doc["paths"]["/todos"].is_object());
    assert!(doc["components"]["securitySchemes"]["bearerAuth"].is_object());
}

#[tokio::test]
async fn test_docs_disabled() {
    let mut config = test_config();
    config.docs.enabled = Some(false);
    let app = make_app_with(config);

    for uri in ["/api-docs", "/api-docs/openapi.json"] {
        let resp = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_docs_off_by_default_in_production() {
    let mut config = test_config();
    config.server.environment = "production".to_string();
    let resp = make_app_with(config)
        .oneshot(get("/api-docs", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
