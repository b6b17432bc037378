//! Technician catalog routes

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateTechnician {
    pub nombre: String,
}

pub async fn list_technicians(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let technicians =
        sqlx::query_scalar::<_, String>("SELECT nombre FROM tecnicos ORDER BY nombre ASC")
            .fetch_all(&state.db)
            .await?;

    Ok(Json(technicians))
}

pub async fn create_technician(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTechnician>,
) -> Result<Json<Value>, ApiError> {
    if payload.nombre.trim().is_empty() {
        return Err(ApiError::BadRequest("Nombre de técnico vacío".to_string()));
    }

    let result = sqlx::query("INSERT INTO tecnicos (nombre) VALUES (?)")
        .bind(&payload.nombre)
        .execute(&state.db)
        .await;

    match result {
        Ok(_) => Ok(super::ok()),
        Err(sqlx::Error::Database(db_err))
            if matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation) =>
        {
            Err(ApiError::BadRequest("Tecnico ya existe".to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn delete_technician(
    State(state): State<Arc<AppState>>,
    Path(nombre): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query("DELETE FROM tecnicos WHERE nombre = ?")
        .bind(&nombre)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Tecnico no encontrado".to_string()));
    }

    Ok(super::deleted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::test_state;

    #[tokio::test]
    async fn duplicate_names_conflict() {
        let state = test_state().await;

        create_technician(
            State(state.clone()),
            Json(CreateTechnician { nombre: "Ana".into() }),
        )
        .await
        .unwrap();
        let second = create_technician(
            State(state.clone()),
            Json(CreateTechnician { nombre: "Ana".into() }),
        )
        .await;

        match second {
            Err(ApiError::BadRequest(detail)) => assert_eq!(detail, "Tecnico ya existe"),
            other => panic!("expected conflict, got {other:?}"),
        }

        let technicians = list_technicians(State(state)).await.unwrap().0;
        assert_eq!(technicians, vec!["Ana".to_string()]);
    }

    #[tokio::test]
    async fn deleting_missing_technician_is_404() {
        let state = test_state().await;
        let result = delete_technician(State(state), Path("Nadie".into())).await;

        match result {
            Err(ApiError::NotFound(detail)) => assert_eq!(detail, "Tecnico no encontrado"),
            other => panic!("expected 404, got {other:?}"),
        }
    }
}
