//! Document-library uploads: published reports and database backups.

use std::path::Path;

use chrono::{DateTime, Local};
use reqwest::StatusCode;
use serde_json::Value;

use visitas_core::files::sanitize_client_folder;

use crate::{GraphClient, GraphError, GraphResult, GRAPH_BASE};

/// Outcome of a report upload.
#[derive(Debug, Clone)]
pub struct PublishedDocument {
    /// `{cliente}/{yyyy-mm-dd}` folder the file landed in.
    pub folder: String,
    /// Shareable link, when the API returned one.
    pub web_url: Option<String>,
}

/// Remote path for a published report: `/{cliente}/{yyyy-mm-dd}/{archivo}`.
/// The PUT endpoint creates missing folders on the fly.
pub(crate) fn remote_report_path(client_name: &str, date: &DateTime<Local>, filename: &str) -> String {
    format!(
        "/{}/{}/{}",
        sanitize_client_folder(client_name),
        date.format("%Y-%m-%d"),
        filename
    )
}

pub(crate) fn backup_filename(date: &DateTime<Local>) -> String {
    format!("Backup_visitas_{}.db", date.format("%Y%m%d_%H%M%S"))
}

impl GraphClient {
    async fn resolve_site_id(&self, token: &str) -> GraphResult<String> {
        let url = format!(
            "{GRAPH_BASE}/sites/{}:{}",
            self.config.host_name, self.config.site_path
        );
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        if !response.status().is_success() {
            return Err(GraphError::Site(format!(
                "{} ({})",
                response.status(),
                self.config.site_path
            )));
        }

        let body: Value = response.json().await?;
        body["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| GraphError::Site("respuesta sin id".to_string()))
    }

    /// The configured drive name wins; the well-known English/Spanish
    /// default-library names are accepted, and any drive at all is the last
    /// resort.
    async fn resolve_drive_id(&self, token: &str, site_id: &str) -> GraphResult<String> {
        let url = format!("{GRAPH_BASE}/sites/{site_id}/drives");
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let body: Value = response.json().await?;
        let drives = body["value"].as_array().cloned().unwrap_or_default();

        for drive in &drives {
            let name = drive["name"].as_str().unwrap_or("");
            if name == self.config.drive_name || name == "Documents" || name == "Documentos" {
                if let Some(id) = drive["id"].as_str() {
                    return Ok(id.to_string());
                }
            }
        }

        drives
            .first()
            .and_then(|drive| drive["id"].as_str())
            .map(str::to_string)
            .ok_or(GraphError::DriveNotFound)
    }

    async fn upload_to_drive(
        &self,
        token: &str,
        drive_id: &str,
        remote_path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> GraphResult<Value> {
        let url = format!("{GRAPH_BASE}/drives/{drive_id}/root:{remote_path}:/content");
        let response = self
            .client
            .put(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(GraphError::Upload(status.to_string()));
        }

        Ok(response.json().await.unwrap_or(Value::Null))
    }

    /// Upload a rendered report under the per-client/per-date folder.
    pub async fn publish_report(
        &self,
        local_path: &Path,
        client_name: &str,
    ) -> GraphResult<PublishedDocument> {
        if !local_path.exists() {
            return Err(GraphError::MissingFile(local_path.display().to_string()));
        }

        let token = self.acquire_token().await?;
        let site_id = self.resolve_site_id(&token).await?;
        let drive_id = self.resolve_drive_id(&token, &site_id).await?;

        let now = Local::now();
        let filename = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "reporte.pdf".to_string());
        let remote_path = remote_report_path(client_name, &now, &filename);

        let data = tokio::fs::read(local_path).await?;
        let item = self
            .upload_to_drive(&token, &drive_id, &remote_path, data, "application/pdf")
            .await?;

        let folder = format!(
            "{}/{}",
            sanitize_client_folder(client_name),
            now.format("%Y-%m-%d")
        );
        tracing::info!("report uploaded to '{folder}'");

        Ok(PublishedDocument {
            folder,
            web_url: item["webUrl"].as_str().map(str::to_string),
        })
    }

    /// Upload the SQLite file to the backup folder under a timestamped name
    /// so periodic backups never overwrite each other. Returns the remote
    /// filename.
    pub async fn upload_database_backup(&self, db_path: &Path) -> GraphResult<String> {
        if !db_path.exists() {
            return Err(GraphError::MissingFile(db_path.display().to_string()));
        }

        let token = self.acquire_token().await?;
        let site_id = self.resolve_site_id(&token).await?;
        let drive_id = self.resolve_drive_id(&token, &site_id).await?;

        let remote_name = backup_filename(&Local::now());
        let remote_path = format!("/{}/{}", self.config.backup_folder, remote_name);

        let data = tokio::fs::read(db_path).await?;
        self.upload_to_drive(
            &token,
            &drive_id,
            &remote_path,
            data,
            "application/octet-stream",
        )
        .await?;

        tracing::info!("database backup uploaded as {remote_name}");
        Ok(remote_name)
    }
}
