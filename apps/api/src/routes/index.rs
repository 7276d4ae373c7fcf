use axum::response::Html;

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// GET /
/// Upload form. Posts `jd` and `resume` to `/analyze` and renders the JSON result.
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}
