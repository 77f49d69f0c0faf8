//! Swagger UI page for the Growlog API.
//!
//! The page loads Swagger UI from a CDN, points it at the served OpenAPI
//! document and pre-authorizes the `bearerAuth` scheme with a sample token
//! so requests can be tried straight from the browser.

/// Raw page template. `__SPEC_URL__` and `__SAMPLE_TOKEN__` are replaced
/// with JavaScript string literals by [`render_swagger_page`].
pub const SWAGGER_HTML: &str = include_str!("../assets/swagger.html");

const SPEC_URL_PLACEHOLDER: &str = "__SPEC_URL__";
const SAMPLE_TOKEN_PLACEHOLDER: &str = "__SAMPLE_TOKEN__";

/// Render the docs page.
///
/// An empty `sample_token` still seeds the authorization dialog, just with
/// an empty value.
pub fn render_swagger_page(spec_url: &str, sample_token: &str) -> String {
    SWAGGER_HTML
        .replace(SPEC_URL_PLACEHOLDER, &script_string(spec_url))
        .replace(SAMPLE_TOKEN_PLACEHOLDER, &script_string(sample_token))
}

/// Encode a value as a string literal that is safe inside a `<script>` block.
fn script_string(value: &str) -> String {
    serde_json::Value::String(value.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}
