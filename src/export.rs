//! Export adapter – wraps one rasterize call in the presentation override
//! and reports an [`ExportOutcome`].
//!
//! The rasterizer is an opaque collaborator behind [`Rasterizer`]. The
//! bundled [`PdfRasterizer`] runs the style → layout → paginate → render
//! engine on the document container.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::acquisition::RenderedDocument;
use crate::document::DocumentType;
use crate::dom::{find_by_id, DomNode, ElementNode};
use crate::error::{DocumentError, Result};
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::layout_config::{LayoutConfig, PageGeometry, A4_HEIGHT_PT, A4_WIDTH_PT};
use crate::pagination::{paginate, BreakMode};
use crate::presentation::PresentationOverride;
use crate::render::{render_pdf, ImageEncoding};
use crate::style::{build_styled_tree, Color, Edges};

/// Shown to the user whenever the rasterizer fails.
pub const EXPORT_FAILED_MESSAGE: &str = "Failed to generate PDF. Please try again.";

/// Shown when no rasterizer is usable in this session.
pub const CAPABILITY_MISSING_MESSAGE: &str =
    "PDF export library is not available. Please check your internet connection.";

const POINTS_PER_INCH: f32 = 72.0;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageFormat {
    #[default]
    A4,
    Letter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    #[serde(rename = "type")]
    pub format: ImageFormat,
    pub quality: f32,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: 0.95,
        }
    }
}

/// Rasterizer configuration. Every field has a default, so a partial JSON
/// object is enough to override one setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Page margins in inches: top, left, bottom, right.
    pub margin: [f32; 4],
    pub image: ImageOptions,
    /// Device pixels per CSS pixel when rasterizing.
    pub raster_scale: f32,
    pub format: PageFormat,
    pub orientation: Orientation,
    pub page_break: BreakMode,
    /// Page background, `#rrggbb`.
    pub background: String,
    /// Leading filename segment.
    pub brand: String,
    /// TTF/OTF used for text measurement instead of the built-in metrics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_font: Option<PathBuf>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            margin: [0.2; 4],
            image: ImageOptions::default(),
            raster_scale: 1.8,
            format: PageFormat::A4,
            orientation: Orientation::Portrait,
            page_break: BreakMode::AvoidAll,
            background: "#ffffff".to_string(),
            brand: "Mintiking-Supplies".to_string(),
            metrics_font: None,
        }
    }
}

impl ExportOptions {
    /// Page size and margins in points.
    pub fn page_geometry(&self) -> PageGeometry {
        let (width, height) = match self.format {
            PageFormat::A4 => (A4_WIDTH_PT, A4_HEIGHT_PT),
            PageFormat::Letter => (612.0, 792.0),
        };
        let [top, left, bottom, right] = self.margin.map(|inches| inches * POINTS_PER_INCH);
        let page = PageGeometry {
            width,
            height,
            margin: Edges {
                top,
                right,
                bottom,
                left,
            },
        };
        match self.orientation {
            Orientation::Portrait => page,
            Orientation::Landscape => page.landscape(),
        }
    }

    pub fn image_encoding(&self) -> ImageEncoding {
        ImageEncoding {
            scale: self.raster_scale,
            quality: self.image.quality,
        }
    }

    pub fn background_color(&self) -> Option<[f32; 4]> {
        let parsed = Color::parse(&self.background);
        if parsed.is_none() {
            log::warn!("Ignoring unparseable background '{}'", self.background);
        }
        parsed.filter(|c| !c.is_transparent()).map(Color::to_array)
    }
}

// ---------------------------------------------------------------------------
// Rasterizer
// ---------------------------------------------------------------------------

/// Turns a document container into PDF bytes.
pub trait Rasterizer {
    /// Whether the capability can be used at all in this session.
    fn is_available(&self) -> bool {
        true
    }

    fn rasterize(&self, target: &ElementNode, options: &ExportOptions) -> Result<Vec<u8>>;
}

/// Rasterizer backed by the built-in layout engine and `printpdf`.
#[derive(Default)]
pub struct PdfRasterizer {
    fonts: FontManager,
}

impl PdfRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fonts(fonts: FontManager) -> Self {
        Self { fonts }
    }

    /// Build from options, loading `metrics_font` when set.
    pub fn from_options(options: &ExportOptions) -> Result<Self> {
        let mut fonts = FontManager::new();
        if let Some(path) = &options.metrics_font {
            fonts.load_font_file("Helvetica", path)?;
        }
        if !fonts.has_real_fonts() {
            log::debug!("No metrics font configured; measuring text with built-in metrics");
        }
        Ok(Self::with_fonts(fonts))
    }

    /// Paginated layout of `target`, without rendering.
    pub fn layout(&self, target: &ElementNode, options: &ExportOptions) -> Result<LayoutConfig> {
        let page = options.page_geometry();
        let nodes = [DomNode::Element(target.clone())];
        let styled = build_styled_tree(&nodes, None);
        let boxes = compute_layout(&styled, &page, &self.fonts)?;

        let mut config = paginate(&boxes, &page, options.page_break, &self.fonts);
        config.title = format!("{} {}", options.brand, target.id().unwrap_or("document"));
        config.page_background = options.background_color();
        Ok(config)
    }
}

impl Rasterizer for PdfRasterizer {
    fn rasterize(&self, target: &ElementNode, options: &ExportOptions) -> Result<Vec<u8>> {
        let config = self.layout(target, options)?;
        if config.pages.len() > 1 {
            log::warn!(
                "Document spans {} pages despite the compact override",
                config.pages.len()
            );
        }
        render_pdf(&config, &options.image_encoding())
    }
}

// ---------------------------------------------------------------------------
// Filenames and clocks
// ---------------------------------------------------------------------------

/// Source of the export timestamp.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Starts at a fixed instant and advances by `step` on every reading.
#[derive(Debug)]
pub struct SteppingClock {
    next: Cell<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }

    /// Always reads `at`.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::new(at, Duration::zero())
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let now = self.next.get();
        self.next.set(now + self.step);
        now
    }
}

/// `<brand>-<segment>-<YYYY-MM-DDTHH-MM-SS>.pdf`, UTC to the second.
pub fn generate_filename(brand: &str, document_type: DocumentType, at: DateTime<Utc>) -> String {
    format!(
        "{brand}-{}-{}.pdf",
        document_type.filename_segment(),
        at.format("%Y-%m-%dT%H-%M-%S")
    )
}

// ---------------------------------------------------------------------------
// Artifact delivery
// ---------------------------------------------------------------------------

/// Where a finished PDF goes.
pub trait ArtifactSink {
    /// Store `bytes` under `filename`. Returns the name the artifact was
    /// actually stored under, which may differ from the one asked for.
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<String>;
}

/// Writes into a directory the way a browser download does: an existing
/// file is never overwritten, a ` (n)` suffix is added instead.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn free_path(&self, filename: &str) -> PathBuf {
        let first = self.dir.join(filename);
        if !first.exists() {
            return first;
        }
        let path = Path::new(filename);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(filename);
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("pdf");
        (1..)
            .map(|n| self.dir.join(format!("{stem} ({n}).{ext}")))
            .find(|p| !p.exists())
            .unwrap_or(first)
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.dir)?;
        let path = self.free_path(filename);
        fs::write(&path, bytes)?;
        log::debug!("Wrote {}", path.display());
        Ok(path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(filename)
            .to_string())
    }
}

/// Keeps artifacts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub artifacts: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<String> {
        self.artifacts.push((filename.to_string(), bytes.to_vec()));
        Ok(filename.to_string())
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Result of one export attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub success: bool,
    pub filename: String,
    /// User-facing message; set only on failure.
    pub error_message: Option<String>,
}

impl ExportOutcome {
    pub fn succeeded(filename: String) -> Self {
        Self {
            success: true,
            filename,
            error_message: None,
        }
    }

    pub fn failed(filename: String, message: &str) -> Self {
        Self {
            success: false,
            filename,
            error_message: Some(message.to_string()),
        }
    }
}

/// Apply the override, rasterize the container once, revert. The guard is
/// dropped before this returns, whatever the rasterizer did.
fn rasterize_with_override(
    target: &mut RenderedDocument,
    overrides: &PresentationOverride,
    rasterizer: &dyn Rasterizer,
    options: &ExportOptions,
) -> Result<Vec<u8>> {
    let container_id = target.document_type().container_id();
    let guard = overrides.apply(target.nodes_mut())?;
    let container = find_by_id(guard.nodes(), container_id).ok_or_else(|| {
        DocumentError::TemplateNotFound {
            container_id: container_id.to_string(),
        }
    })?;
    rasterizer.rasterize(container, options)
}

/// Export `target` as a PDF named from `clock`, delivering it to `sink`.
///
/// Never fails: every error becomes a failed outcome with a user-facing
/// message, and the underlying cause is logged.
pub fn export_document(
    target: &mut RenderedDocument,
    overrides: &PresentationOverride,
    rasterizer: &dyn Rasterizer,
    options: &ExportOptions,
    sink: &mut dyn ArtifactSink,
    clock: &dyn Clock,
) -> ExportOutcome {
    let document_type = target.document_type();
    let filename = generate_filename(&options.brand, document_type, clock.now());

    if !rasterizer.is_available() {
        log::error!("PDF export requested but no rasterizer is available");
        return ExportOutcome::failed(filename, CAPABILITY_MISSING_MESSAGE);
    }

    log::info!("Exporting {document_type} as {filename}");
    let delivered = rasterize_with_override(target, overrides, rasterizer, options)
        .and_then(|bytes| sink.deliver(&filename, &bytes).map(|saved| (saved, bytes.len())));

    match delivered {
        Ok((saved, size)) => {
            log::info!("PDF saved as {saved} ({size} bytes)");
            ExportOutcome::succeeded(saved)
        }
        Err(e) => {
            log::error!("PDF generation failed: {e}");
            ExportOutcome::failed(filename, EXPORT_FAILED_MESSAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{acquire, EmbeddedSource};
    use chrono::TimeZone;

    struct Failing;

    impl Rasterizer for Failing {
        fn rasterize(&self, _target: &ElementNode, _options: &ExportOptions) -> Result<Vec<u8>> {
            Err(DocumentError::RenderExport("canvas tainted".into()))
        }
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, h, m, s).unwrap()
    }

    #[test]
    fn filename_uses_brand_segment_and_utc_seconds() {
        let name = generate_filename("Mintiking-Supplies", DocumentType::DeliveryNote, at(14, 5, 9));
        assert_eq!(name, "Mintiking-Supplies-Delivery-Note-2025-03-07T14-05-09.pdf");
    }

    #[test]
    fn default_options_match_single_page_profile() {
        let opts = ExportOptions::default();
        let page = opts.page_geometry();
        assert!((page.margin.top - 14.4).abs() < 0.001);
        assert!((page.margin.left - 14.4).abs() < 0.001);
        assert_eq!(page.width, A4_WIDTH_PT);
        assert_eq!(opts.page_break, BreakMode::AvoidAll);
        assert_eq!(opts.background_color(), Some([1.0, 1.0, 1.0, 1.0]));
        assert_eq!(opts.image_encoding().quality, 0.95);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let opts: ExportOptions =
            serde_json::from_str(r#"{"orientation": "landscape", "image": {"quality": 0.8}}"#).unwrap();
        assert_eq!(opts.orientation, Orientation::Landscape);
        assert_eq!(opts.image.quality, 0.8);
        assert_eq!(opts.image.format, ImageFormat::Jpeg);
        assert_eq!(opts.raster_scale, 1.8);
        assert!(opts.page_geometry().width > opts.page_geometry().height);
    }

    #[test]
    fn failure_reverts_and_reports_generic_message() {
        let mut doc = acquire(None, &EmbeddedSource, DocumentType::Invoice).unwrap();
        let before = doc.clone();
        let mut sink = MemorySink::new();
        let outcome = export_document(
            &mut doc,
            &PresentationOverride::compact(DocumentType::Invoice),
            &Failing,
            &ExportOptions::default(),
            &mut sink,
            &SteppingClock::fixed(at(9, 0, 0)),
        );
        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some(EXPORT_FAILED_MESSAGE));
        assert!(sink.artifacts.is_empty());
        assert_eq!(doc, before);
    }

    #[test]
    fn engine_export_produces_pdf() {
        let mut doc = acquire(None, &EmbeddedSource, DocumentType::DeliveryNote).unwrap();
        let mut sink = MemorySink::new();
        let outcome = export_document(
            &mut doc,
            &PresentationOverride::compact(DocumentType::DeliveryNote),
            &PdfRasterizer::new(),
            &ExportOptions::default(),
            &mut sink,
            &SteppingClock::fixed(at(9, 0, 0)),
        );
        assert!(outcome.success, "{outcome:?}");
        assert_eq!(sink.artifacts.len(), 1);
        assert_eq!(&sink.artifacts[0].1[0..5], b"%PDF-");
    }

    #[test]
    fn compact_invoice_fits_one_page() {
        let mut doc = acquire(None, &EmbeddedSource, DocumentType::Invoice).unwrap();
        let table = PresentationOverride::compact(DocumentType::Invoice);
        let guard = table.apply(doc.nodes_mut()).unwrap();
        let container = find_by_id(guard.nodes(), "invoice").unwrap();
        let layout = PdfRasterizer::new()
            .layout(container, &ExportOptions::default())
            .unwrap();
        assert_eq!(layout.pages.len(), 1);
        assert_eq!(layout.title, "Mintiking-Supplies invoice");
    }

    #[test]
    fn directory_sink_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        let first = sink.deliver("a.pdf", b"one").unwrap();
        let second = sink.deliver("a.pdf", b"two").unwrap();
        assert_eq!(first, "a.pdf");
        assert_eq!(second, "a (1).pdf");
        assert_eq!(fs::read(dir.path().join("a.pdf")).unwrap(), b"one");
        assert_eq!(fs::read(dir.path().join(&second)).unwrap(), b"two");
    }

    #[test]
    fn same_second_exports_report_the_delivered_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());
        let clock = SteppingClock::fixed(at(9, 0, 0));
        let options = ExportOptions::default();
        let rasterizer = PdfRasterizer::new();
        let compact = PresentationOverride::compact(DocumentType::Invoice);

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let mut doc = acquire(None, &EmbeddedSource, DocumentType::Invoice).unwrap();
            outcomes.push(export_document(&mut doc, &compact, &rasterizer, &options, &mut sink, &clock));
        }

        assert!(outcomes.iter().all(|o| o.success));
        assert_eq!(outcomes[0].filename, "Mintiking-Supplies-Invoice-2025-03-07T09-00-00.pdf");
        assert_eq!(outcomes[1].filename, "Mintiking-Supplies-Invoice-2025-03-07T09-00-00 (1).pdf");
        for outcome in &outcomes {
            assert!(dir.path().join(&outcome.filename).is_file());
        }
    }
}
