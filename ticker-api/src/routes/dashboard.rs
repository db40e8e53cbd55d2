//! Dashboard page

use axum::{extract::State, response::Html, routing::get, Router};
use std::io::ErrorKind;
use tracing::warn;

use crate::AppState;

/// Serve `index.html` from the dashboard directory
///
/// A missing or unreadable file yields a short placeholder page rather than
/// an error status.
async fn dashboard(State(state): State<AppState>) -> Html<String> {
    let path = state.dashboard_dir.join("index.html");

    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Html(content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Dashboard not found at {}", path.display());
            Html(format!(
                "<h1>Dashboard not found. Please check {}</h1>",
                path.display()
            ))
        }
        Err(e) => {
            warn!("Failed to read dashboard at {}: {}", path.display(), e);
            Html(format!("<h1>Error loading dashboard: {}</h1>", e))
        }
    }
}

/// Create dashboard routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(dashboard))
}
