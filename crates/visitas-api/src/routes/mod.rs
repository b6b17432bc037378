//! API routes

pub mod clients;
pub mod reports;
pub mod stats;
pub mod system;
pub mod technicians;
pub mod users;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Plain acknowledgement for create endpoints.
pub(crate) fn ok() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Acknowledgement for delete endpoints.
pub(crate) fn deleted() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Eliminado correctamente" }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{db, workers, AppConfig, AppState};
    use std::path::Path;
    use std::sync::Arc;

    pub(crate) async fn test_state() -> Arc<AppState> {
        test_state_with_scratch(&std::env::temp_dir()).await
    }

    /// State over an in-memory store with no Graph client; the cleanup
    /// queue has no worker attached so scratch files survive assertions.
    pub(crate) async fn test_state_with_scratch(scratch_dir: &Path) -> Arc<AppState> {
        let db = db::test_pool().await;
        let (cleanup, _rx) = workers::CleanupQueue::new();
        Arc::new(AppState {
            db,
            graph: None,
            config: AppConfig {
                database_path: ":memory:".to_string(),
                scratch_dir: scratch_dir.to_string_lossy().into_owned(),
                logo_path: None,
                company_name: "Soporte IT Ltda".to_string(),
                max_upload_size: 1024 * 1024,
                port: 0,
            },
            cleanup,
        })
    }
}
