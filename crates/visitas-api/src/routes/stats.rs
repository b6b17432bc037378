//! Reporting aggregates: KPIs, per-name counts, monthly evolution.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::FromRow;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, FromRow, Serialize)]
pub struct NameCount {
    pub nombre: String,
    pub total: i64,
}

#[derive(Debug, FromRow, Serialize)]
pub struct MonthCount {
    pub mes: String,
    pub total: i64,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub total: i64,
    pub pendientes: i64,
    pub cliente_top: String,
    pub por_cliente: Vec<NameCount>,
    pub por_tecnico: Vec<NameCount>,
    pub evolucion_mensual: Vec<MonthCount>,
}

pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reportes")
        .fetch_one(&state.db)
        .await?;

    let pendientes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reportes WHERE email_enviado = 0")
            .fetch_one(&state.db)
            .await?;

    let por_cliente = sqlx::query_as::<_, NameCount>(
        "SELECT cliente AS nombre, COUNT(*) AS total FROM reportes \
         GROUP BY cliente ORDER BY total DESC",
    )
    .fetch_all(&state.db)
    .await?;

    let por_tecnico = sqlx::query_as::<_, NameCount>(
        "SELECT tecnico AS nombre, COUNT(*) AS total FROM reportes \
         GROUP BY tecnico ORDER BY total DESC",
    )
    .fetch_all(&state.db)
    .await?;

    // Last six months, oldest first so charts read left to right.
    let mut evolucion_mensual = sqlx::query_as::<_, MonthCount>(
        "SELECT substr(fecha, 1, 7) AS mes, COUNT(*) AS total FROM reportes \
         GROUP BY mes ORDER BY mes DESC LIMIT 6",
    )
    .fetch_all(&state.db)
    .await?;
    evolucion_mensual.reverse();

    let cliente_top = por_cliente
        .first()
        .map(|top| format!("{} ({})", top.nombre, top.total))
        .unwrap_or_else(|| "N/A".to_string());

    Ok(Json(StatsResponse {
        total,
        pendientes,
        cliente_top,
        por_cliente,
        por_tecnico,
        evolucion_mensual,
    }))
}
