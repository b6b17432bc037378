//! Per-client user catalog routes.
//!
//! Users record who can be visited at a client. There is no referential
//! integrity against the person names embedded in report JSON; the two are
//! maintained independently.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::db::schema::UserRow;
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateUser {
    pub nombre: String,
    pub cliente_nombre: String,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Path(cliente): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let users = sqlx::query_scalar::<_, String>(
        "SELECT nombre FROM usuarios WHERE cliente_nombre = ? ORDER BY nombre ASC",
    )
    .bind(&cliente)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users))
}

pub async fn list_all_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserRow>>, ApiError> {
    let users = sqlx::query_as::<_, UserRow>(
        "SELECT nombre, cliente_nombre FROM usuarios ORDER BY cliente_nombre ASC, nombre ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUser>,
) -> Result<Json<Value>, ApiError> {
    if payload.nombre.trim().is_empty() {
        return Err(ApiError::BadRequest("Nombre de usuario vacío".to_string()));
    }

    let result = sqlx::query("INSERT INTO usuarios (nombre, cliente_nombre) VALUES (?, ?)")
        .bind(&payload.nombre)
        .bind(&payload.cliente_nombre)
        .execute(&state.db)
        .await;

    match result {
        Ok(_) => Ok(super::ok()),
        Err(sqlx::Error::Database(db_err))
            if matches!(db_err.kind(), sqlx::error::ErrorKind::ForeignKeyViolation) =>
        {
            Err(ApiError::BadRequest("Cliente no existe".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path((cliente, nombre)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query("DELETE FROM usuarios WHERE nombre = ? AND cliente_nombre = ?")
        .bind(&nombre)
        .bind(&cliente)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Usuario no encontrado".to_string()));
    }

    Ok(super::deleted())
}
