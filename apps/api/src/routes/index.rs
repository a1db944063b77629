use axum::response::Html;

/// GET /
/// Single-page upload and question form.
pub async fn index_handler() -> Html<&'static str> {
    Html(include_str!("../../static/index.html"))
}
