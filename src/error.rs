//! Error types for the document pipeline.

use std::io;
use thiserror::Error;

/// Result type alias for doc-forge operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors raised while acquiring, binding or exporting a document.
///
/// None of these is fatal to the session: workflows catch them at the
/// trigger boundary and turn them into a notification.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The PDF rasterizer is not usable. Export stays disabled for the session.
    #[error("PDF export capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The trigger was used while disabled or while an export was already
    /// running.
    #[error("Export trigger '{label}' is busy")]
    TriggerBusy { label: String },

    /// The template resource could not be retrieved (missing file,
    /// transport failure or non-2xx response).
    #[error("Failed to fetch template '{resource}': {reason}")]
    TemplateFetch { resource: String, reason: String },

    /// The template was retrieved but lacks the expected container element.
    #[error("Template content not found: no element with id '{container_id}'")]
    TemplateNotFound { container_id: String },

    /// Form input that cannot become a document request.
    #[error("Invalid document request: {0}")]
    InvalidRequest(String),

    /// The rasterizer failed to produce a PDF.
    #[error("PDF rendering failed: {0}")]
    RenderExport(String),

    /// A selector in an override table or binding rule is malformed.
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// I/O error when writing the exported artifact.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
