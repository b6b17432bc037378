//! Database row types

use serde::Serialize;
use sqlx::FromRow;

/// One stored report. `imagen_path` and `detalles_usuarios` hold JSON text:
/// the ordered photo paths and the reconciled person details.
#[derive(Debug, FromRow, Serialize)]
pub struct ReportRow {
    pub id: i64,
    pub fecha: String,
    pub cliente: String,
    pub tecnico: String,
    pub observaciones: String,
    pub imagen_path: String,
    pub pdf_path: String,
    pub detalles_usuarios: String,
    pub email_enviado: bool,
    pub latitud: String,
    pub longitud: String,
    pub publicado: bool,
}

/// Slim projection for the unsent-mail queue.
#[derive(Debug, FromRow, Serialize)]
pub struct PendingReportRow {
    pub id: i64,
    pub pdf_path: String,
    pub cliente: String,
    pub tecnico: String,
}

#[derive(Debug, FromRow, Serialize)]
pub struct ClientRow {
    pub nombre: String,
    pub email: String,
}

#[derive(Debug, FromRow, Serialize)]
pub struct UserRow {
    pub nombre: String,
    pub cliente_nombre: String,
}
