use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Data unavailable from {source_id}: {reason}")]
    DataUnavailable { source_id: String, reason: String },

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Asset missing: {}", .0.display())]
    AssetMissing(PathBuf),

    #[error("Year {0} not present in table")]
    MissingYear(i32),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unknown page: {0}")]
    UnknownPage(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl DashboardError {
    pub(crate) fn unavailable(source_id: &str, reason: impl ToString) -> Self {
        DashboardError::DataUnavailable {
            source_id: source_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(feature = "python")]
impl From<DashboardError> for pyo3::PyErr {
    fn from(err: DashboardError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}
