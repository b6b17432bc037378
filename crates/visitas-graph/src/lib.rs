//! Microsoft Graph client for the visit-report service.
//!
//! Wraps the three remote surfaces the workflow touches: the document
//! library (report archive + database backups), the dashboard list, and the
//! sendMail endpoint. Every operation acquires its own client-credentials
//! token and is attempted exactly once; callers fold failures into the
//! response message instead of aborting the workflow.

pub mod auth;
pub mod drive;
pub mod list;
pub mod mail;

use std::time::Duration;

use thiserror::Error;

pub use drive::PublishedDocument;
pub use list::ReportListItem;

pub(crate) const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Error de red: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("No se pudo autenticar con Graph: {0}")]
    Auth(String),

    #[error("Error buscando sitio SharePoint: {0}")]
    Site(String),

    #[error("No se encontró la biblioteca de documentos")]
    DriveNotFound,

    #[error("Error subida SP: {0}")]
    Upload(String),

    #[error("Error escribiendo en lista: {0}")]
    List(String),

    #[error("Error Graph Email: {0}")]
    Mail(String),

    #[error("Archivo local no existe: {0}")]
    MissingFile(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Tenant, application and SharePoint identifiers, environment-supplied.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Mailbox the report mail is sent from.
    pub sender: String,
    pub host_name: String,
    pub site_path: String,
    pub drive_name: String,
    pub backup_folder: String,
    /// Composite site id of the dashboard list.
    pub list_site_id: String,
    pub list_id: String,
    pub timeout_secs: u64,
}

impl GraphConfig {
    /// Build from environment variables. Returns `None` when the client
    /// credentials are absent, which disables remote publishing entirely.
    pub fn from_env() -> Option<Self> {
        let tenant_id = std::env::var("GRAPH_TENANT_ID").ok()?;
        let client_id = std::env::var("GRAPH_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GRAPH_CLIENT_SECRET").ok()?;

        Some(Self {
            tenant_id,
            client_id,
            client_secret,
            sender: std::env::var("GRAPH_USER_EMAIL")
                .unwrap_or_else(|_| "soporte@example.com".to_string()),
            host_name: std::env::var("SHAREPOINT_HOST_NAME").unwrap_or_default(),
            site_path: std::env::var("SHAREPOINT_SITE_PATH")
                .unwrap_or_else(|_| "/sites/Soporte".to_string()),
            drive_name: std::env::var("SHAREPOINT_DRIVE_NAME")
                .unwrap_or_else(|_| "Documentos".to_string()),
            backup_folder: std::env::var("SHAREPOINT_BACKUP_FOLDER")
                .unwrap_or_else(|_| "Backups_DB".to_string()),
            list_site_id: std::env::var("SHAREPOINT_LIST_SITE_ID").unwrap_or_default(),
            list_id: std::env::var("SHAREPOINT_LIST_ID").unwrap_or_default(),
            timeout_secs: 120,
        })
    }

    /// Whether the dashboard list identifiers are present.
    pub fn list_configured(&self) -> bool {
        !self.list_site_id.is_empty() && !self.list_id.is_empty()
    }
}

/// Graph API client. Holds one configured `reqwest::Client` for all calls.
pub struct GraphClient {
    pub(crate) config: GraphConfig,
    pub(crate) client: reqwest::Client,
}

impl GraphClient {
    pub fn new(config: GraphConfig) -> GraphResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("visitas-backend/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }
}
