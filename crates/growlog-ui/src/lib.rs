//! Growlog UI crate - embedded HTML for the API documentation page.
//!
//! The Swagger UI shell is embedded at compile time via `include_str!` and
//! rendered per request with the OpenAPI document URL and the sample token
//! the page should pre-authorize with.
//!
//! # Usage
//!
//! ```rust,ignore
//! use growlog_ui::docs::render_swagger_page;
//!
//! async fn docs_handler() -> axum::response::Html<String> {
//!     axum::response::Html(render_swagger_page("/api-docs/openapi.json", ""))
//! }
//! ```

pub mod docs;

pub use docs::{render_swagger_page, SWAGGER_HTML};
