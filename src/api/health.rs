use axum::Json;
use chrono::Utc;

/// Liveness probe: current status and timestamp.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().naive_utc(),
    }))
}
