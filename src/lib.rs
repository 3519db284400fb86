//! # doc-forge – invoice and delivery-note PDFs from HTML templates
//!
//! A document goes through these stages:
//!
//! 1. **Acquire** – take the container element from the loaded page or a
//!    fetched template ([`acquisition`])
//! 2. **Bind** – write date, quantities and totals into placeholders ([`binding`])
//! 3. **Override** – apply the compact single-page styling, reverted
//!    afterwards ([`presentation`])
//! 4. **Export** – rasterize to PDF and deliver under a timestamped
//!    filename ([`export`])
//!
//! The bundled rasterizer is a small layout engine: [`dom`] → [`style`] →
//! [`layout`] (Taffy) → [`pagination`] → [`render`] (printpdf).
//!
//! [`pipeline::Exporter`] drives the two user-facing flows and reports
//! through the collaborators in [`ui`].

pub mod acquisition;
pub mod binding;
pub mod config;
pub mod document;
pub mod dom;
pub mod error;
pub mod export;
pub mod fonts;
pub mod layout;
pub mod layout_config;
pub mod pagination;
pub mod pipeline;
pub mod presentation;
pub mod render;
pub mod selector;
pub mod style;
pub mod templates;
pub mod ui;

// Re-exports for convenience
pub use acquisition::{acquire, LoadedPage, RenderedDocument, TemplateSource};
pub use binding::{bind, calculate_total};
pub use config::AppConfig;
pub use document::{DocumentRequest, DocumentType, FormInput, LineItem};
pub use error::{DocumentError, Result};
pub use export::{export_document, ExportOptions, ExportOutcome, PdfRasterizer, Rasterizer};
pub use pipeline::Exporter;
pub use presentation::PresentationOverride;
