pub mod routes;
pub mod models;
pub mod errors;

use std::sync::Arc;
use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::browser::BrowserRegistry;
use crate::summary::{JobHistory, Qualifier};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BrowserRegistry>,
    pub history: JobHistory,
    /// Qualifier used when a request names no app/version.
    pub qualifier: Qualifier,
}

pub fn create_app_state(registry: BrowserRegistry, history: JobHistory, qualifier: Qualifier) -> AppState {
    AppState {
        registry: Arc::new(registry),
        history,
        qualifier,
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route("/api/builds/:number/summary", get(routes::builds::get_summary))
        .route("/api/trend", get(routes::builds::get_trend))
        .route("/api/history", get(routes::builds::get_history))
        .route("/api/issues", get(routes::issues::get_issues).delete(routes::issues::end_session))
        .route("/api/issues/folder", post(routes::issues::set_folder))
        .route("/api/issues/page", post(routes::issues::set_page))
        .route("/api/issues/page-size", post(routes::issues::set_page_size))
        .route("/api/issues/show-all", post(routes::issues::set_show_all))
        .route("/api/issues/sort", post(routes::issues::set_sort))
        .route("/api/issues/grouping", post(routes::issues::set_grouping))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
