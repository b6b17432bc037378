//! Dashboard list records for published reports.

use serde::Serialize;

use crate::{GraphClient, GraphError, GraphResult, GRAPH_BASE};

/// Fields of one dashboard row. Serialized names match the SharePoint list
/// columns.
#[derive(Debug, Clone, Serialize)]
pub struct ReportListItem {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Cliente")]
    pub client: String,
    #[serde(rename = "Tecnico")]
    pub technician: String,
    #[serde(rename = "Fecha")]
    pub date: String,
    #[serde(rename = "Link")]
    pub link: String,
}

impl GraphClient {
    /// Create one dashboard row for a published report.
    pub async fn register_report(&self, item: &ReportListItem) -> GraphResult<()> {
        let token = self.acquire_token().await?;
        let url = format!(
            "{GRAPH_BASE}/sites/{}/lists/{}/items",
            self.config.list_site_id, self.config.list_id
        );
        let body = serde_json::json!({ "fields": item });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GraphError::List(response.status().to_string()));
        }

        Ok(())
    }
}
