//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path parameters via axum extractors,
//! interacts with the repositories on AppState, and returns JSON responses.
//! Protected handlers receive the caller through `Extension<AuthUser>`,
//! inserted by [`crate::auth::require_auth`].

use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use growlog_core::error::GrowlogError;
use growlog_core::types::{
    DailyLog, Emotion, EmotionKind, NewEmotion, NewReflection, NewTodo, Reflection, Todo,
    TodoPatch, User, MAX_INTENSITY, MIN_INTENSITY,
};

use crate::auth::{verify_bearer, AuthUser, MaybeAuthUser};
use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

/// Banner served at `/`.
pub const WELCOME: &str = "🪴 Welcome to Growlog API!";

const MIN_PASSWORD_CHARS: usize = 8;

// =============================================================================
// Extractors
// =============================================================================

/// `Json` whose rejections use the API's JSON error body.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// Only entries filed under this date (`YYYY-MM-DD`).
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// First date of the range, inclusive (`YYYY-MM-DD`).
    pub from: Option<String>,
    /// Last date of the range, inclusive (`YYYY-MM-DD`).
    pub to: Option<String>,
}

// =============================================================================
// Request and response types
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthDetail {
    pub status: String,
    pub uptime_secs: u64,
    /// Milliseconds since the epoch.
    pub timestamp: i64,
    pub env: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    /// Bearer token for the protected routes.
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTodoRequest {
    pub title: String,
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub done: Option<bool>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReflectionRequest {
    pub content: String,
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmotionRequest {
    pub kind: EmotionKind,
    /// 1 (faint) to 5 (overwhelming). Any other number is a 400.
    #[schema(value_type = i64, minimum = 1, maximum = 5)]
    pub intensity: serde_json::Number,
    pub note: Option<String>,
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

// =============================================================================
// Helpers
// =============================================================================

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    raw.map(parse_date).transpose()
}

/// A malformed id can never match a row, so it is reported as not found.
fn parse_id(entity: &'static str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| GrowlogError::not_found(entity, raw).into())
}

fn required_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid email or password".to_string())
}

// =============================================================================
// Root and health
// =============================================================================

/// GET / - welcome banner.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Welcome banner", body = String, content_type = "text/plain"))
)]
pub async fn root() -> &'static str {
    WELCOME
}

/// Fallback for unrouted paths.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".to_string())
}

/// GET /health - liveness probe. Performs no downstream checks.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive (`OK`, or a JSON detail when enabled)", body = String, content_type = "text/plain")
    )
)]
pub async fn health(State(state): State<AppState>) -> Response {
    if !state.config.health.detailed {
        return "OK".into_response();
    }

    Json(HealthDetail {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        timestamp: Utc::now().timestamp_millis(),
        env: state.config.server.environment.clone(),
    })
    .into_response()
}

// =============================================================================
// Auth
// =============================================================================

/// POST /auth/signup - register and receive a token.
#[utoipa::path(
    post,
    path = "/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid email, password or nickname", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = req.email.trim();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ApiError::BadRequest(format!("Invalid email address: {}", email)));
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::BadRequest(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_CHARS
        )));
    }
    let nickname = required_text("nickname", &req.nickname)?;

    let hash = state.passwords.hash_blocking(&req.password).await?;
    let user = state.users.create(email, &nickname, &hash)?;
    let token = state.keys.issue(&user)?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// POST /auth/login - exchange credentials for a token.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Wrong email or password", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // Unknown emails still pay for one Argon2 run.
    let record = state.users.find_by_email(req.email.trim())?;
    let matched = state
        .passwords
        .verify_blocking(&req.password, record.as_ref().map(|r| r.password_hash.as_str()))
        .await?;

    let record = match record {
        Some(record) if matched => record,
        Some(record) => {
            debug!(user_id = %record.user.id, "Password mismatch");
            return Err(invalid_credentials());
        }
        None => return Err(invalid_credentials()),
    };

    let token = state.keys.issue(&record.user)?;
    Ok(Json(AuthResponse {
        token,
        user: record.user,
    }))
}

/// GET /auth/me - the caller's account.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>, ApiError> {
    let auth = verify_bearer(headers.get(AUTHORIZATION), &state.keys)?;
    let user = state
        .users
        .find_by_id(auth.user_id)?
        .ok_or_else(|| ApiError::Unauthorized("Account no longer exists".to_string()))?;
    Ok(Json(user))
}

// =============================================================================
// Todos
// =============================================================================

/// GET /todos - the caller's todos in creation order.
#[utoipa::path(
    get,
    path = "/todos",
    tag = "todos",
    params(DateQuery),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Todos", body = Vec<Todo>),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn list_todos(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<DateQuery>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let date = parse_optional_date(params.date.as_deref())?;
    Ok(Json(state.todos.list(auth.user_id, date)?))
}

/// POST /todos - create a todo.
#[utoipa::path(
    post,
    path = "/todos",
    tag = "todos",
    request_body = CreateTodoRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 201, description = "Created", body = Todo),
        (status = 400, description = "Empty title", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn create_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateTodoRequest>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let todo = state.todos.create(&NewTodo {
        user_id: auth.user_id,
        title: required_text("title", &req.title)?,
        date: req.date.unwrap_or_else(today),
    })?;
    Ok((StatusCode::CREATED, Json(todo)))
}

/// GET /todos/{id}
#[utoipa::path(
    get,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Todo", body = Todo),
        (status = 404, description = "No such todo for this user", body = ErrorBody)
    )
)]
pub async fn get_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id("todo", &id)?;
    let todo = state
        .todos
        .find(auth.user_id, id)?
        .ok_or_else(|| GrowlogError::not_found("todo", id))?;
    Ok(Json(todo))
}

/// PATCH /todos/{id} - partial update.
#[utoipa::path(
    patch,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    request_body = UpdateTodoRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Updated todo", body = Todo),
        (status = 400, description = "Nothing to update or empty title", body = ErrorBody),
        (status = 404, description = "No such todo for this user", body = ErrorBody)
    )
)]
pub async fn update_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTodoRequest>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id("todo", &id)?;
    let patch = TodoPatch {
        title: req
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?,
        done: req.done,
        date: req.date,
    };
    if patch.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }

    let todo = state
        .todos
        .update(auth.user_id, id, &patch)?
        .ok_or_else(|| GrowlogError::not_found("todo", id))?;
    Ok(Json(todo))
}

/// PATCH /todos/{id}/toggle - flip `done`.
#[utoipa::path(
    patch,
    path = "/todos/{id}/toggle",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Toggled todo", body = Todo),
        (status = 404, description = "No such todo for this user", body = ErrorBody)
    )
)]
pub async fn toggle_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id("todo", &id)?;
    let todo = state
        .todos
        .toggle(auth.user_id, id)?
        .ok_or_else(|| GrowlogError::not_found("todo", id))?;
    Ok(Json(todo))
}

/// DELETE /todos/{id}
#[utoipa::path(
    delete,
    path = "/todos/{id}",
    tag = "todos",
    params(("id" = Uuid, Path, description = "Todo id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such todo for this user", body = ErrorBody)
    )
)]
pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id("todo", &id)?;
    if !state.todos.delete(auth.user_id, id)? {
        return Err(GrowlogError::not_found("todo", id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Reflections (public)
// =============================================================================

/// GET /reflections - all reflections, newest first.
#[utoipa::path(
    get,
    path = "/reflections",
    tag = "reflections",
    params(DateQuery),
    responses((status = 200, description = "Reflections", body = Vec<Reflection>))
)]
pub async fn list_reflections(
    State(state): State<AppState>,
    Query(params): Query<DateQuery>,
) -> Result<Json<Vec<Reflection>>, ApiError> {
    let date = parse_optional_date(params.date.as_deref())?;
    Ok(Json(state.reflections.list(date)?))
}

/// POST /reflections - write a reflection, attributed when a valid token
/// is present.
#[utoipa::path(
    post,
    path = "/reflections",
    tag = "reflections",
    request_body = CreateReflectionRequest,
    responses(
        (status = 201, description = "Created", body = Reflection),
        (status = 400, description = "Empty content", body = ErrorBody)
    )
)]
pub async fn create_reflection(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    ApiJson(req): ApiJson<CreateReflectionRequest>,
) -> Result<(StatusCode, Json<Reflection>), ApiError> {
    let reflection = state.reflections.create(&NewReflection {
        user_id: auth.map(|a| a.user_id),
        content: required_text("content", &req.content)?,
        date: req.date.unwrap_or_else(today),
    })?;
    Ok((StatusCode::CREATED, Json(reflection)))
}

/// GET /reflections/{id}
#[utoipa::path(
    get,
    path = "/reflections/{id}",
    tag = "reflections",
    params(("id" = Uuid, Path, description = "Reflection id")),
    responses(
        (status = 200, description = "Reflection", body = Reflection),
        (status = 404, description = "No such reflection", body = ErrorBody)
    )
)]
pub async fn get_reflection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Reflection>, ApiError> {
    let id = parse_id("reflection", &id)?;
    let reflection = state
        .reflections
        .find(id)?
        .ok_or_else(|| GrowlogError::not_found("reflection", id))?;
    Ok(Json(reflection))
}

/// DELETE /reflections/{id} - anonymous reflections can be removed by
/// anyone; attributed ones only by their author.
#[utoipa::path(
    delete,
    path = "/reflections/{id}",
    tag = "reflections",
    params(("id" = Uuid, Path, description = "Reflection id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Reflection belongs to another user", body = ErrorBody),
        (status = 404, description = "No such reflection", body = ErrorBody)
    )
)]
pub async fn delete_reflection(
    State(state): State<AppState>,
    MaybeAuthUser(auth): MaybeAuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id("reflection", &id)?;
    let reflection = state
        .reflections
        .find(id)?
        .ok_or_else(|| GrowlogError::not_found("reflection", id))?;

    if let Some(owner) = reflection.user_id {
        if auth.map(|a| a.user_id) != Some(owner) {
            return Err(ApiError::Forbidden(
                "Only the author can delete this reflection".to_string(),
            ));
        }
    }

    state.reflections.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Emotions
// =============================================================================

/// GET /emotions - the caller's emotions in the order recorded.
#[utoipa::path(
    get,
    path = "/emotions",
    tag = "emotions",
    params(DateQuery),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Emotions", body = Vec<Emotion>),
        (status = 401, description = "Missing or invalid token", body = ErrorBody)
    )
)]
pub async fn list_emotions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<DateQuery>,
) -> Result<Json<Vec<Emotion>>, ApiError> {
    let date = parse_optional_date(params.date.as_deref())?;
    Ok(Json(state.emotions.list(auth.user_id, date)?))
}

/// POST /emotions - record an emotion.
#[utoipa::path(
    post,
    path = "/emotions",
    tag = "emotions",
    request_body = CreateEmotionRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 201, description = "Recorded", body = Emotion),
        (status = 400, description = "Intensity outside 1..=5", body = ErrorBody),
        (status = 422, description = "Unknown kind or wrong field types", body = ErrorBody)
    )
)]
pub async fn create_emotion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<CreateEmotionRequest>,
) -> Result<(StatusCode, Json<Emotion>), ApiError> {
    let emotion = state.emotions.create(&NewEmotion {
        user_id: auth.user_id,
        kind: req.kind,
        intensity: parse_intensity(&req.intensity)?,
        note: req
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        date: req.date.unwrap_or_else(today),
    })?;
    Ok((StatusCode::CREATED, Json(emotion)))
}

/// Whole numbers within 1..=5; everything else is a validation failure
/// rather than a body-shape rejection.
fn parse_intensity(raw: &serde_json::Number) -> Result<u8, ApiError> {
    raw.as_i64()
        .and_then(|n| u8::try_from(n).ok())
        .filter(|n| (MIN_INTENSITY..=MAX_INTENSITY).contains(n))
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "intensity must be a whole number between {MIN_INTENSITY} and {MAX_INTENSITY}, got {raw}"
            ))
        })
}

/// DELETE /emotions/{id}
#[utoipa::path(
    delete,
    path = "/emotions/{id}",
    tag = "emotions",
    params(("id" = Uuid, Path, description = "Emotion id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such emotion for this user", body = ErrorBody)
    )
)]
pub async fn delete_emotion(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id("emotion", &id)?;
    if !state.emotions.delete(auth.user_id, id)? {
        return Err(GrowlogError::not_found("emotion", id).into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Daily
// =============================================================================

/// GET /daily/{date} - everything the caller logged on one date.
#[utoipa::path(
    get,
    path = "/daily/{date}",
    tag = "daily",
    params(("date" = String, Path, description = "Calendar date, YYYY-MM-DD")),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Daily log (possibly empty)", body = DailyLog),
        (status = 400, description = "Malformed date", body = ErrorBody)
    )
)]
pub async fn daily_log(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(date): Path<String>,
) -> Result<Json<DailyLog>, ApiError> {
    let date = parse_date(&date)?;
    Ok(Json(state.queries.daily_log(auth.user_id, date)?))
}

/// GET /daily?from=&to= - non-empty daily logs in an inclusive range.
#[utoipa::path(
    get,
    path = "/daily",
    tag = "daily",
    params(RangeQuery),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Daily logs with at least one entry", body = Vec<DailyLog>),
        (status = 400, description = "Missing, reversed or oversized range", body = ErrorBody)
    )
)]
pub async fn daily_range(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<Vec<DailyLog>>, ApiError> {
    let (Some(from), Some(to)) = (params.from.as_deref(), params.to.as_deref()) else {
        return Err(ApiError::BadRequest(
            "Both 'from' and 'to' are required".to_string(),
        ));
    };
    let logs = state
        .queries
        .daily_range(auth.user_id, parse_date(from)?, parse_date(to)?)?;
    Ok(Json(logs))
}
