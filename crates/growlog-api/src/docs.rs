//! OpenAPI document and the documentation routes.
//!
//! `ApiDoc::openapi()` builds the document from the handler annotations.
//! The Swagger UI page comes from `growlog-ui` and is pre-authorized with
//! the configured sample token.

use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use growlog_core::types::{
    DailyLog, DailySummary, Emotion, EmotionKind, Reflection, Todo, User,
};

use crate::error::ErrorBody;
use crate::handlers;
use crate::state::AppState;

/// Path of the Swagger UI page.
pub const DOCS_PATH: &str = "/api-docs";
/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Name of the bearer security scheme in the document.
pub const BEARER_SCHEME: &str = "bearerAuth";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Growlog API",
        version = "0.1.0",
        description = "Todos, reflections, emotions and daily logs"
    ),
    paths(
        // health
        handlers::root,
        handlers::health,
        // auth
        handlers::signup,
        handlers::login,
        handlers::me,
        // todos
        handlers::list_todos,
        handlers::create_todo,
        handlers::get_todo,
        handlers::update_todo,
        handlers::toggle_todo,
        handlers::delete_todo,
        // reflections
        handlers::list_reflections,
        handlers::create_reflection,
        handlers::get_reflection,
        handlers::delete_reflection,
        // emotions
        handlers::list_emotions,
        handlers::create_emotion,
        handlers::delete_emotion,
        // daily
        handlers::daily_log,
        handlers::daily_range,
    ),
    components(schemas(
        ErrorBody,
        User,
        Todo,
        Reflection,
        Emotion,
        EmotionKind,
        DailyLog,
        DailySummary,
    )),
    tags(
        (name = "health", description = "Liveness and welcome"),
        (name = "auth", description = "Sign-up, login and the current user"),
        (name = "todos", description = "Per-user todo items"),
        (name = "reflections", description = "Public reflections"),
        (name = "emotions", description = "Per-user emotion records"),
        (name = "daily", description = "Per-date aggregates"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the HTTP bearer (JWT) security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                BEARER_SCHEME,
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Routes serving the UI page and the JSON document.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(DOCS_PATH, get(swagger_ui))
        .route(OPENAPI_PATH, get(openapi_json))
}

/// GET /api-docs - Swagger UI seeded with the sample bearer token.
pub async fn swagger_ui(State(state): State<AppState>) -> Html<String> {
    Html(growlog_ui::render_swagger_page(
        OPENAPI_PATH,
        &state.config.docs.sample_token,
    ))
}

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
