use thiserror::Error;
use std::io;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while turning an OSINT document into a report
#[derive(Debug, Error)]
pub enum ReportError {
    /// I/O errors
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// PDF object model errors
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// PNG encoding errors
    #[error("PNG encoding error: {0}")]
    PngEncoding(#[from] png::EncodingError),

    /// PNG decoding errors
    #[error("PNG decoding error: {0}")]
    PngDecoding(#[from] png::DecodingError),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Text-generation model errors
    #[error("Model error: {0}")]
    Model(String),

    /// CRM authentication or persistence errors
    #[error("CRM error: {0}")]
    Crm(String),

    /// Usage chart errors
    #[error("Chart error: {0}")]
    Chart(String),

    /// PDF report layout errors
    #[error("Report error: {0}")]
    Report(String),
}

impl ReportError {
    /// Checks if this error is transient and retryable
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) |
            Self::Http(_) |
            Self::IO(_)
        )
    }
}
