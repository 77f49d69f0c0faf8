//! Checks on the generated OpenAPI document.

use serde_json::Value;
use utoipa::OpenApi;

use growlog_api::docs::{ApiDoc, BEARER_SCHEME};

fn document() -> Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap()
}

#[test]
fn test_all_routes_documented() {
    let doc = document();
    let paths = doc["paths"].as_object().unwrap();
    for path in [
        "/",
        "/health",
        "/auth/signup",
        "/auth/login",
        "/auth/me",
        "/todos",
        "/todos/{id}",
        "/todos/{id}/toggle",
        "/reflections",
        "/reflections/{id}",
        "/emotions",
        "/emotions/{id}",
        "/daily",
        "/daily/{date}",
    ] {
        assert!(paths.contains_key(path), "missing path {}", path);
    }
}

#[test]
fn test_bearer_scheme_declared() {
    let doc = document();
    let scheme = &doc["components"]["securitySchemes"][BEARER_SCHEME];
    assert_eq!(scheme["type"], "http");
    assert_eq!(scheme["scheme"], "bearer");
    assert_eq!(scheme["bearerFormat"], "JWT");
}

#[test]
fn test_protected_operations_require_bearer() {
    let doc = document();
    for (path, method) in [
        ("/todos", "get"),
        ("/todos", "post"),
        ("/emotions", "post"),
        ("/daily/{date}", "get"),
    ] {
        let security = &doc["paths"][path][method]["security"];
        assert!(
            security[0].get(BEARER_SCHEME).is_some(),
            "{} {} lacks bearer security",
            method,
            path
        );
    }
}

#[test]
fn test_public_operations_have_no_security() {
    let doc = document();
    for (path, method) in [
        ("/health", "get"),
        ("/auth/login", "post"),
        ("/reflections", "get"),
        ("/reflections", "post"),
    ] {
        assert!(
            doc["paths"][path][method].get("security").is_none(),
            "{} {} should be public",
            method,
            path
        );
    }
}

#[test]
fn test_domain_schemas_present() {
    let doc = document();
    let schemas = doc["components"]["schemas"].as_object().unwrap();
    for name in ["Todo", "Reflection", "Emotion", "EmotionKind", "DailyLog", "ErrorBody"] {
        assert!(schemas.contains_key(name), "missing schema {}", name);
    }
}
