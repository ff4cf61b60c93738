// Error type shared by every loader, exporter and page handler.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read workbook {path}: {message}")]
    Workbook { path: String, message: String },

    #[error("sheet '{sheet}' not found in {path}")]
    MissingSheet { path: String, sheet: String },

    #[error("column '{column}' not found in sheet '{sheet}'")]
    MissingColumn { sheet: String, column: String },

    #[error("failed to write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid configuration ({key}): {message}")]
    Config { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, DashboardError>;
