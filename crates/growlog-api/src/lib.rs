//! Growlog API crate - axum HTTP server, ingress pipeline, bearer-token
//! gate, route handlers and the generated OpenAPI document.

pub mod auth;
pub mod docs;
pub mod error;
pub mod handlers;
pub mod ingress;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
