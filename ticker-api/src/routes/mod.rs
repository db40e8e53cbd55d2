//! API route definitions

mod dashboard;
mod health;
mod market;
mod ws;

use axum::Router;
use tower_http::services::ServeDir;

use crate::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.dashboard_dir);

    Router::new()
        .nest("/api", api_routes())
        .merge(dashboard::routes())
        .merge(ws::routes())
        .nest_service("/static", static_files)
        .with_state(state)
}

/// Create all API routes
fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(market::routes())
        .merge(health::routes())
}
