//! OAuth2 client-credentials token exchange.

use serde::Deserialize;

use crate::{GraphClient, GraphError, GraphResult};

const SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

impl GraphClient {
    /// Acquire a bearer token for the configured application. One exchange
    /// per operation; tokens are not cached.
    pub(crate) async fn acquire_token(&self) -> GraphResult<String> {
        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.config.tenant_id
        );
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", SCOPE),
        ];

        let response = self.client.post(&url).form(&params).send().await?;
        let body: TokenResponse = response.json().await?;

        match body.access_token {
            Some(token) => Ok(token),
            None => {
                let reason = body
                    .error_description
                    .unwrap_or_else(|| "respuesta sin access_token".to_string());
                tracing::warn!("token exchange failed: {reason}");
                Err(GraphError::Auth(reason))
            }
        }
    }
}
