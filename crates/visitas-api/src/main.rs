//! Visit Report API Server

mod db;
mod error;
mod routes;
mod workers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visitas_graph::{GraphClient, GraphConfig};

/// Application state shared across handlers
pub struct AppState {
    pub db: sqlx::SqlitePool,
    /// Absent when the Graph credentials are not configured; publish and
    /// notify steps then report themselves as skipped.
    pub graph: Option<GraphClient>,
    pub config: AppConfig,
    pub cleanup: workers::CleanupQueue,
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub database_path: String,
    pub scratch_dir: String,
    pub logo_path: Option<String>,
    pub company_name: String,
    pub max_upload_size: usize,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./visitas.db".to_string()),
            scratch_dir: std::env::var("SCRATCH_DIR")
                .unwrap_or_else(|_| "./temp_uploads".to_string()),
            logo_path: std::env::var("LOGO_PATH").ok(),
            company_name: std::env::var("COMPANY_NAME")
                .unwrap_or_else(|_| "Soporte IT Ltda".to_string()),
            max_upload_size: 256 * 1024 * 1024,
            port: std::env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(8000),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "visitas_api=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting visit report API server");

    let config = AppConfig::default();

    // Create scratch directory
    std::fs::create_dir_all(&config.scratch_dir).expect("Failed to create scratch directory");

    // Open database
    let options = SqliteConnectOptions::new()
        .filename(&config.database_path)
        .create_if_missing(true)
        .foreign_keys(true);
    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to open database");

    info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run migrations");

    info!("Database migrations complete");

    // Graph client, when credentials are present
    let graph = match GraphConfig::from_env() {
        Some(graph_config) => Some(
            GraphClient::new(graph_config).expect("Failed to build Graph client"),
        ),
        None => {
            warn!("Graph credentials not configured; publish and mail are disabled");
            None
        }
    };

    // Cleanup queue + worker
    let (cleanup, cleanup_rx) = workers::CleanupQueue::new();
    tokio::spawn(workers::run_cleanup(cleanup_rx));

    // Create shared state
    let state = Arc::new(AppState {
        db,
        graph,
        config: config.clone(),
        cleanup,
    });

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(routes::health_check))

        // Catalog: clients, technicians, users
        .route("/clientes", get(routes::clients::list_clients))
        .route("/clientes", post(routes::clients::create_client))
        .route("/cliente/:nombre", delete(routes::clients::delete_client))
        .route("/tecnicos", get(routes::technicians::list_technicians))
        .route("/tecnicos", post(routes::technicians::create_technician))
        .route("/tecnico/:nombre", delete(routes::technicians::delete_technician))
        .route("/usuarios/:cliente", get(routes::users::list_users))
        .route("/usuarios", post(routes::users::create_user))
        .route("/usuarios_todos", get(routes::users::list_all_users))
        .route("/usuario/:cliente/:nombre", delete(routes::users::delete_user))

        // Reports
        .route("/reporte/crear", post(routes::reports::create_report))
        .route("/reportes", get(routes::reports::list_reports))
        .route("/reportes/pendientes", get(routes::reports::list_pending_reports))
        .route("/reporte/:id", get(routes::reports::get_report))
        .route("/reporte/:id", put(routes::reports::update_report))
        .route("/reporte/:id", delete(routes::reports::delete_report))
        .route("/reporte/:id/email", post(routes::reports::set_email_status))

        // Aggregates + maintenance
        .route("/estadisticas", get(routes::stats::get_stats))
        .route("/sistema/backup", get(routes::system::backup_database))

        // Uploads can carry a whole visit's photos
        .layer(DefaultBodyLimit::max(config.max_upload_size))

        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )

        // Tracing
        .layer(TraceLayer::new_for_http())

        // State
        .with_state(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
