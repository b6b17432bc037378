//! System maintenance routes.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use crate::AppState;

/// Upload the database file to the remote backup folder. Meant for manual
/// or periodic invocation; failures come back in the envelope, never as an
/// HTTP error.
pub async fn backup_database(State(state): State<Arc<AppState>>) -> Json<Value> {
    let Some(graph) = &state.graph else {
        return Json(json!({ "status": "error", "mensaje": "Graph no configurado" }));
    };

    match graph
        .upload_database_backup(Path::new(&state.config.database_path))
        .await
    {
        Ok(remote_name) => Json(json!({
            "status": "ok",
            "mensaje": format!("Backup exitoso: {remote_name}"),
        })),
        Err(err) => {
            tracing::warn!("database backup failed: {err}");
            Json(json!({ "status": "error", "mensaje": err.to_string() }))
        }
    }
}
