//! Report routes: the intake workflow plus history CRUD.
//!
//! Intake runs strictly in order: save uploads to scratch, map them onto
//! the person payload, render the PDF, publish it, register the dashboard
//! row, mail the client, persist the local row, respond. Remote failures
//! fold into the response message; only local failures abort the request.
//! Scratch files are enqueued for cleanup exactly once per request,
//! whichever way it ends.

use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use visitas_core::files::sanitize_filename;
use visitas_core::{reconcile, render_report, PersonDetail, ReportContext};
use visitas_graph::ReportListItem;

use crate::db::schema::{PendingReportRow, ReportRow};
use crate::db::{self, NewReport};
use crate::error::ApiError;
use crate::AppState;

const REPORT_COLUMNS: &str = "id, fecha, cliente, tecnico, observaciones, imagen_path, \
     pdf_path, detalles_usuarios, email_enviado, latitud, longitud, publicado";

#[derive(Debug, Serialize)]
pub struct CreateReportResponse {
    pub status: String,
    pub server_id: i64,
    pub pdf_generated: String,
    pub message: String,
}

/// Text and file fields pulled out of the multipart body.
#[derive(Default)]
struct IntakeForm {
    cliente: Option<String>,
    tecnico: Option<String>,
    obs: String,
    datos_usuarios: Option<String>,
    email_cliente: Option<String>,
    email_tecnico: Option<String>,
    latitud: String,
    longitud: String,
    tech_signature: Option<PathBuf>,
    /// Saved photo paths, in upload order.
    photos: Vec<PathBuf>,
    /// Saved signature paths keyed by sanitized base filename.
    signatures: HashMap<String, PathBuf>,
    /// Everything written during this request, for deferred cleanup.
    scratch: Vec<PathBuf>,
}

pub async fn create_report(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<CreateReportResponse>, ApiError> {
    let mut form = IntakeForm::default();

    let outcome = match ingest_multipart(&state, &mut multipart, &mut form).await {
        Ok(()) => process_submission(&state, &mut form).await,
        Err(err) => Err(err),
    };

    // One cleanup enqueue per request, also on failure paths. The response
    // only quotes the PDF path, so deletion may race it safely.
    state.cleanup.schedule(std::mem::take(&mut form.scratch));

    outcome.map(Json)
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))
}

/// Write one uploaded file into the scratch dir under its sanitized base
/// name. Returns the clean name and the absolute saved path.
async fn save_upload(
    dir: &Path,
    field: Field<'_>,
    fallback_name: &str,
) -> Result<(String, PathBuf), ApiError> {
    let original = field.file_name().unwrap_or(fallback_name).to_string();
    let data = field
        .bytes()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let clean = sanitize_filename(&original)?;
    let path = dir.join(&clean);
    tokio::fs::write(&path, &data)
        .await
        .map_err(ApiError::internal)?;
    let absolute = tokio::fs::canonicalize(&path).await.unwrap_or(path);

    Ok((clean, absolute))
}

async fn ingest_multipart(
    state: &Arc<AppState>,
    multipart: &mut Multipart,
    form: &mut IntakeForm,
) -> Result<(), ApiError> {
    let scratch_dir = PathBuf::from(&state.config.scratch_dir);
    tokio::fs::create_dir_all(&scratch_dir)
        .await
        .map_err(ApiError::internal)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(err.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "cliente" => form.cliente = Some(read_text(field).await?),
            "tecnico" => form.tecnico = Some(read_text(field).await?),
            "obs" => form.obs = read_text(field).await?,
            "datos_usuarios" => form.datos_usuarios = Some(read_text(field).await?),
            "email_cliente" => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    form.email_cliente = Some(value);
                }
            }
            "email_tecnico" => {
                let value = read_text(field).await?;
                if !value.trim().is_empty() {
                    form.email_tecnico = Some(value);
                }
            }
            "latitud" => form.latitud = read_text(field).await?,
            "longitud" => form.longitud = read_text(field).await?,
            "fotos" => {
                let (_, path) = save_upload(&scratch_dir, field, "foto.jpg").await?;
                form.photos.push(path.clone());
                form.scratch.push(path);
            }
            "firmas_usuarios" => {
                let (clean, path) = save_upload(&scratch_dir, field, "firma.png").await?;
                form.signatures.insert(clean, path.clone());
                form.scratch.push(path);
            }
            "firma_tecnico" => {
                let (_, path) = save_upload(&scratch_dir, field, "firma_tecnico.png").await?;
                form.tech_signature = Some(path.clone());
                form.scratch.push(path);
            }
            _ => {}
        }
    }

    Ok(())
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value.ok_or_else(|| ApiError::Internal(format!("Falta el campo '{field}'")))
}

async fn process_submission(
    state: &Arc<AppState>,
    form: &mut IntakeForm,
) -> Result<CreateReportResponse, ApiError> {
    let cliente = required(form.cliente.take(), "cliente")?;
    let tecnico = required(form.tecnico.take(), "tecnico")?;
    let raw_details = required(form.datos_usuarios.take(), "datos_usuarios")?;

    // 0. a submitted email updates the client record before anything else
    if let Some(email) = &form.email_cliente {
        db::upsert_client(&state.db, &cliente, email).await?;
    }

    let mut people = PersonDetail::parse_list(&raw_details)?;

    // 1-3. map saved uploads onto the payload
    reconcile::assign_uploads(&mut people, &form.photos, &form.signatures);

    // 4. render the document
    let now = chrono::Local::now();
    let ctx = ReportContext {
        company: &state.config.company_name,
        client: &cliente,
        technician: &tecnico,
        observations: &form.obs,
        technician_signature: form.tech_signature.as_deref(),
        logo: state.config.logo_path.as_deref().map(Path::new),
        generated_at: now,
    };
    let pdf_path = render_report(&ctx, &people, Path::new(&state.config.scratch_dir))?;
    form.scratch.push(pdf_path.clone());

    // 5. publish to the document library
    let (published, sp_msg) = match &state.graph {
        Some(graph) => match graph.publish_report(&pdf_path, &cliente).await {
            Ok(document) => {
                let msg = format!("Subido a carpeta '{}'", document.folder);
                (Some(document), msg)
            }
            Err(err) => {
                warn!("publish failed: {err}");
                (None, err.to_string())
            }
        },
        None => (None, "Graph no configurado".to_string()),
    };

    // 6. dashboard row, only when the upload produced a link
    let lista_msg = match (
        &state.graph,
        published.as_ref().and_then(|doc| doc.web_url.clone()),
    ) {
        (Some(graph), Some(link)) if graph.config().list_configured() => {
            let item = ReportListItem {
                title: format!("Visita {cliente} - {tecnico}"),
                client: cliente.clone(),
                technician: tecnico.clone(),
                date: now.format("%Y-%m-%d %H:%M").to_string(),
                link,
            };
            match graph.register_report(&item).await {
                Ok(()) => "Registrado en lista".to_string(),
                Err(err) => {
                    warn!("list registration failed: {err}");
                    err.to_string()
                }
            }
        }
        (Some(_), Some(_)) => "Lista omitida (sin configuración)".to_string(),
        _ => "Lista omitida (sin URL)".to_string(),
    };

    // 7. mail the client; the Client row is the source of truth for routing
    let (email_ok, email_msg) = match db::client_email(&state.db, &cliente).await? {
        Some(email) if !email.trim().is_empty() => match &state.graph {
            Some(graph) => match graph
                .send_report_mail(
                    &pdf_path,
                    &cliente,
                    &tecnico,
                    &email,
                    form.email_tecnico.as_deref(),
                )
                .await
            {
                Ok(()) => (true, "Correo enviado (Oficial)".to_string()),
                Err(err) => {
                    warn!("mail failed: {err}");
                    (false, err.to_string())
                }
            },
            None => (false, "Graph no configurado".to_string()),
        },
        _ => (false, format!("No hay correo registrado para {cliente}")),
    };

    // 8. persist the local row
    let fecha = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let photo_paths: Vec<String> = form
        .photos
        .iter()
        .map(|path| path.to_string_lossy().into_owned())
        .collect();
    let fotos_json = serde_json::to_string(&photo_paths).map_err(ApiError::internal)?;
    let detalles_json = serde_json::to_string(&people).map_err(ApiError::internal)?;
    let pdf_path_text = pdf_path.to_string_lossy().into_owned();

    let server_id = db::insert_report(
        &state.db,
        &NewReport {
            fecha: &fecha,
            cliente: &cliente,
            tecnico: &tecnico,
            observaciones: &form.obs,
            fotos_json: &fotos_json,
            pdf_path: &pdf_path_text,
            detalles_json: &detalles_json,
            email_enviado: email_ok,
            publicado: published.is_some(),
            latitud: &form.latitud,
            longitud: &form.longitud,
        },
    )
    .await?;

    info!("report {server_id} stored for client {cliente}");

    Ok(CreateReportResponse {
        status: "success".to_string(),
        server_id,
        pdf_generated: pdf_path_text,
        message: format!("Email: {email_msg} | Archivo SP: {sp_msg} | Lista SP: {lista_msg}"),
    })
}

pub async fn list_reports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReportRow>>, ApiError> {
    let reports = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reportes ORDER BY id DESC"
    ))
    .fetch_all(&state.db)
    .await?;

    Ok(Json(reports))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<i64>,
) -> Result<Json<ReportRow>, ApiError> {
    let report = sqlx::query_as::<_, ReportRow>(&format!(
        "SELECT {REPORT_COLUMNS} FROM reportes WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::NotFound("Reporte no encontrado".to_string()))?;

    Ok(Json(report))
}

pub async fn list_pending_reports(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PendingReportRow>>, ApiError> {
    let pending = sqlx::query_as::<_, PendingReportRow>(
        "SELECT id, pdf_path, cliente, tecnico FROM reportes WHERE email_enviado = 0",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(pending))
}

/// Full-record update path; everything except the generated id.
#[derive(Deserialize)]
pub struct UpdateReport {
    pub fecha: String,
    pub cliente: String,
    pub tecnico: String,
    pub observaciones: String,
    pub imagen_path: String,
    pub pdf_path: String,
    pub detalles_usuarios: String,
    pub email_enviado: bool,
}

pub async fn update_report(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<i64>,
    Json(payload): Json<UpdateReport>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE reportes
        SET fecha = ?, cliente = ?, tecnico = ?, observaciones = ?,
            imagen_path = ?, pdf_path = ?, detalles_usuarios = ?, email_enviado = ?
        WHERE id = ?
        "#,
    )
    .bind(&payload.fecha)
    .bind(&payload.cliente)
    .bind(&payload.tecnico)
    .bind(&payload.observaciones)
    .bind(&payload.imagen_path)
    .bind(&payload.pdf_path)
    .bind(&payload.detalles_usuarios)
    .bind(payload.email_enviado)
    .bind(id)
    .execute(&state.db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Reporte no encontrado".to_string()));
    }

    Ok(super::ok())
}

#[derive(Deserialize)]
pub struct EmailStatus {
    pub enviado: bool,
}

pub async fn set_email_status(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<i64>,
    Json(payload): Json<EmailStatus>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query("UPDATE reportes SET email_enviado = ? WHERE id = ?")
        .bind(payload.enviado)
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Reporte no encontrado".to_string()));
    }

    Ok(super::ok())
}

pub async fn delete_report(
    State(state): State<Arc<AppState>>,
    UrlPath(id): UrlPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let result = sqlx::query("DELETE FROM reportes WHERE id = ?")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Reporte no encontrado".to_string()));
    }

    Ok(super::deleted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::test_state_with_scratch;
    use tempfile::tempdir;

    const TWO_PEOPLE: &str = r#"[
        {"nombre": "Carla Muñoz", "atendido": true,
         "trabajo": "Cambio de disco, Limpieza, Windows Update",
         "fotos": ["f1.jpg", "f2.jpg"], "firma": "firma_carla.png"},
        {"nombre": "Luis Soto", "atendido": false, "motivo": "De vacaciones"}
    ]"#;

    fn seed_uploads(dir: &Path, form: &mut IntakeForm) {
        for name in ["f1.jpg", "f2.jpg"] {
            let path = dir.join(name);
            std::fs::write(&path, b"not-really-a-jpg").unwrap();
            form.photos.push(path.clone());
            form.scratch.push(path);
        }
        let signature = dir.join("firma_carla.png");
        std::fs::write(&signature, b"not-really-a-png").unwrap();
        form.signatures
            .insert("firma_carla.png".to_string(), signature.clone());
        form.scratch.push(signature);
    }

    fn submission(dir: &Path) -> IntakeForm {
        let mut form = IntakeForm {
            cliente: Some("Acme".to_string()),
            tecnico: Some("Ana Rojas".to_string()),
            obs: "Todo en orden".to_string(),
            datos_usuarios: Some(TWO_PEOPLE.to_string()),
            ..IntakeForm::default()
        };
        seed_uploads(dir, &mut form);
        form
    }

    #[tokio::test]
    async fn round_trip_stores_resolved_details() {
        let scratch = tempdir().unwrap();
        let state = test_state_with_scratch(scratch.path()).await;
        let mut form = submission(scratch.path());
        let expected_photos: Vec<String> = form
            .photos
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let response = process_submission(&state, &mut form).await.unwrap();

        assert_eq!(response.status, "success");
        assert_eq!(response.server_id, 1);
        assert!(Path::new(&response.pdf_generated).exists());
        // no email on file and none submitted
        assert!(response
            .message
            .contains("No hay correo registrado para Acme"));

        let row = get_report(State(state.clone()), UrlPath(1)).await.unwrap().0;
        let people: Vec<PersonDetail> = serde_json::from_str(&row.detalles_usuarios).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].photos, expected_photos);
        assert_eq!(people[0].task_items().len(), 3);
        assert!(people[0]
            .signature
            .as_deref()
            .unwrap()
            .ends_with("firma_carla.png"));
        assert!(people[1].photos.is_empty());
        assert_eq!(people[1].reason, "De vacaciones");
        assert!(!row.email_enviado);
        assert!(!row.publicado);
    }

    #[tokio::test]
    async fn report_ids_grow_across_submissions() {
        let scratch = tempdir().unwrap();
        let state = test_state_with_scratch(scratch.path()).await;

        let first = process_submission(&state, &mut submission(scratch.path()))
            .await
            .unwrap();
        let second = process_submission(&state, &mut submission(scratch.path()))
            .await
            .unwrap();

        assert!(second.server_id > first.server_id);
    }

    #[tokio::test]
    async fn submitted_email_updates_the_client_record() {
        let scratch = tempdir().unwrap();
        let state = test_state_with_scratch(scratch.path()).await;
        let mut form = submission(scratch.path());
        form.email_cliente = Some("contacto@acme.cl".to_string());

        let response = process_submission(&state, &mut form).await.unwrap();

        assert_eq!(
            db::client_email(&state.db, "Acme").await.unwrap().as_deref(),
            Some("contacto@acme.cl")
        );
        // recipient known, but no Graph client in tests
        assert!(response.message.contains("Graph no configurado"));
    }

    #[tokio::test]
    async fn missing_required_field_is_internal_error() {
        let scratch = tempdir().unwrap();
        let state = test_state_with_scratch(scratch.path()).await;
        let mut form = submission(scratch.path());
        form.cliente = None;

        let result = process_submission(&state, &mut form).await;
        match result {
            Err(ApiError::Internal(detail)) => assert_eq!(detail, "Falta el campo 'cliente'"),
            other => panic!("expected 500, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_person_payload_is_internal_error() {
        let scratch = tempdir().unwrap();
        let state = test_state_with_scratch(scratch.path()).await;
        let mut form = submission(scratch.path());
        form.datos_usuarios = Some("{esto no es json".to_string());

        assert!(matches!(
            process_submission(&state, &mut form).await,
            Err(ApiError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn deleting_missing_report_is_404() {
        let scratch = tempdir().unwrap();
        let state = test_state_with_scratch(scratch.path()).await;

        let result = delete_report(State(state), UrlPath(999)).await;
        match result {
            Err(ApiError::NotFound(detail)) => assert_eq!(detail, "Reporte no encontrado"),
            other => panic!("expected 404, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stored_reports_can_be_deleted_and_updated() {
        let scratch = tempdir().unwrap();
        let state = test_state_with_scratch(scratch.path()).await;
        process_submission(&state, &mut submission(scratch.path()))
            .await
            .unwrap();

        set_email_status(
            State(state.clone()),
            UrlPath(1),
            Json(EmailStatus { enviado: true }),
        )
        .await
        .unwrap();
        let row = get_report(State(state.clone()), UrlPath(1)).await.unwrap().0;
        assert!(row.email_enviado);

        let pending = list_pending_reports(State(state.clone())).await.unwrap().0;
        assert!(pending.is_empty());

        delete_report(State(state.clone()), UrlPath(1)).await.unwrap();
        assert!(matches!(
            get_report(State(state), UrlPath(1)).await,
            Err(ApiError::NotFound(_))
        ));
    }
}
