//! Visit Report Core
//!
//! Domain logic shared by the API server: the person-detail payload carried
//! by every submission, scratch-file naming, reconciliation of uploaded
//! files onto the payload, and the paginated PDF renderer.

pub mod detail;
pub mod files;
pub mod pdf;
pub mod reconcile;

use thiserror::Error;

pub use detail::PersonDetail;
pub use pdf::{render_report, report_filename, ReportContext};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("PDF error: {0}")]
    Pdf(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
