use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::{api, app::App};

pub fn router(app: App) -> Router {
    Router::new()
        .route("/health", get(api::health::health))
        .route("/jobs", get(api::jobs::index).post(api::jobs::create))
        .route(
            "/jobs/{id}",
            get(api::jobs::show)
                .put(api::jobs::update)
                .delete(api::jobs::destroy),
        )
        .with_state(app)
        .layer(TraceLayer::new_for_http())
}
