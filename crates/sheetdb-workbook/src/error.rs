use std::fmt::Display;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON workbook error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("{0} is not supported by this backend")]
    Unsupported(String),

    #[error("{backend} backend error: {message}")]
    Backend { backend: String, message: String },
}

impl IoError {
    pub fn from_backend(backend: &str, err: impl Display) -> Self {
        IoError::Backend {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "umya")]
impl From<umya_spreadsheet::XlsxError> for IoError {
    fn from(err: umya_spreadsheet::XlsxError) -> Self {
        match err {
            umya_spreadsheet::XlsxError::Io(io) => IoError::Io(io),
            other => IoError::from_backend("umya", other),
        }
    }
}
