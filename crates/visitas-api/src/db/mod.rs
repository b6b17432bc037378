//! Store helpers shared across routes.
//!
//! Simple queries live inline in their handlers; the ones reused by several
//! steps of the intake workflow live here.

pub mod schema;

use sqlx::SqlitePool;

/// Insert-or-replace keyed by name: registering a client twice keeps one
/// row with the latest email.
pub async fn upsert_client(db: &SqlitePool, nombre: &str, email: &str) -> sqlx::Result<()> {
    sqlx::query("INSERT OR REPLACE INTO clientes (nombre, email) VALUES (?, ?)")
        .bind(nombre)
        .bind(email)
        .execute(db)
        .await?;
    Ok(())
}

/// Recipient address for a client, straight from the store. The Client row
/// is the single source of truth for mail routing.
pub async fn client_email(db: &SqlitePool, nombre: &str) -> sqlx::Result<Option<String>> {
    sqlx::query_scalar("SELECT email FROM clientes WHERE nombre = ?")
        .bind(nombre)
        .fetch_optional(db)
        .await
}

pub struct NewReport<'a> {
    pub fecha: &'a str,
    pub cliente: &'a str,
    pub tecnico: &'a str,
    pub observaciones: &'a str,
    pub fotos_json: &'a str,
    pub pdf_path: &'a str,
    pub detalles_json: &'a str,
    pub email_enviado: bool,
    pub publicado: bool,
    pub latitud: &'a str,
    pub longitud: &'a str,
}

/// Insert one report row; returns the generated id.
pub async fn insert_report(db: &SqlitePool, report: &NewReport<'_>) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO reportes
            (fecha, cliente, tecnico, observaciones, imagen_path, pdf_path,
             detalles_usuarios, email_enviado, publicado, latitud, longitud)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(report.fecha)
    .bind(report.cliente)
    .bind(report.tecnico)
    .bind(report.observaciones)
    .bind(report.fotos_json)
    .bind(report.pdf_path)
    .bind(report.detalles_json)
    .bind(report.email_enviado)
    .bind(report.publicado)
    .bind(report.latitud)
    .bind(report.longitud)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection so every query sees the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    pool
}
