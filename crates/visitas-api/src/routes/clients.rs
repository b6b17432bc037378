//! Client catalog routes

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::db;
use crate::db::schema::ClientRow;
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
pub struct CreateClient {
    pub nombre: String,
    pub email: String,
}

pub async fn list_clients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ClientRow>>, ApiError> {
    let clients = sqlx::query_as::<_, ClientRow>(
        "SELECT nombre, email FROM clientes ORDER BY nombre ASC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(clients))
}

pub async fn create_client(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateClient>,
) -> Result<Json<Value>, ApiError> {
    if payload.nombre.trim().is_empty() {
        return Err(ApiError::BadRequest("Nombre de cliente vacío".to_string()));
    }

    db::upsert_client(&state.db, &payload.nombre, &payload.email).await?;
    Ok(super::ok())
}

/// Deletes the client and, by cascade, every user registered under it.
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    Path(nombre): Path<String>,
) -> Result<Json<Value>, ApiError> {
    sqlx::query("DELETE FROM usuarios WHERE cliente_nombre = ?")
        .bind(&nombre)
        .execute(&state.db)
        .await?;

    let result = sqlx::query("DELETE FROM clientes WHERE nombre = ?")
        .bind(&nombre)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Cliente no encontrado".to_string()));
    }

    Ok(super::deleted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::test_state;

    #[tokio::test]
    async fn create_is_an_upsert() {
        let state = test_state().await;

        create_client(
            State(state.clone()),
            Json(CreateClient {
                nombre: "Acme".into(),
                email: "uno@acme.cl".into(),
            }),
        )
        .await
        .unwrap();
        create_client(
            State(state.clone()),
            Json(CreateClient {
                nombre: "Acme".into(),
                email: "dos@acme.cl".into(),
            }),
        )
        .await
        .unwrap();

        let clients = list_clients(State(state)).await.unwrap().0;
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].email, "dos@acme.cl");
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let state = test_state().await;
        let result = create_client(
            State(state),
            Json(CreateClient {
                nombre: "  ".into(),
                email: "x@y.cl".into(),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn deleting_missing_client_is_404() {
        let state = test_state().await;
        let result = delete_client(State(state), Path("Nadie".into())).await;

        match result {
            Err(ApiError::NotFound(detail)) => assert_eq!(detail, "Cliente no encontrado"),
            other => panic!("expected 404, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_cascades_to_users() {
        let state = test_state().await;
        db::upsert_client(&state.db, "Acme", "c@acme.cl").await.unwrap();
        for nombre in ["Ana", "Beto"] {
            sqlx::query("INSERT INTO usuarios (nombre, cliente_nombre) VALUES (?, 'Acme')")
                .bind(nombre)
                .execute(&state.db)
                .await
                .unwrap();
        }

        delete_client(State(state.clone()), Path("Acme".into()))
            .await
            .unwrap();

        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM usuarios WHERE cliente_nombre = 'Acme'")
                .fetch_one(&state.db)
                .await
                .unwrap();
        assert_eq!(remaining, 0);
    }
}
