//! Integration tests for the doc-forge pipeline.
//!
//! These tests validate:
//! - Both workflows end to end with the bundled rasterizer
//! - The compact override is live during rasterization and gone afterwards
//! - Template fetch over HTTP, including non-2xx responses
//! - Filenames, notifications and control state around each export
//! - Layout output is reproducible

use std::cell::RefCell;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use sha2::{Digest, Sha256};

use doc_forge::acquisition::{acquire, EmbeddedSource, HttpSource, LoadedPage};
use doc_forge::document::{DocumentType, FormInput};
use doc_forge::dom::{find_by_id, to_html, DomNode, ElementNode};
use doc_forge::error::{DocumentError, Result};
use doc_forge::export::{
    export_document, DirectorySink, ExportOptions, MemorySink, PdfRasterizer, Rasterizer, SteppingClock,
    CAPABILITY_MISSING_MESSAGE, EXPORT_FAILED_MESSAGE,
};
use doc_forge::pipeline::{Exporter, DOWNLOAD_LABEL, GENERATE_FAILED_MESSAGE, GENERATE_LABEL};
use doc_forge::presentation::PresentationOverride;
use doc_forge::templates;
use doc_forge::ui::{NotificationCenter, NotificationKind, TriggerControl, UNAVAILABLE_LABEL};

// =====================================================================
// Helpers
// =====================================================================

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn clock() -> SteppingClock {
    let start = Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap();
    SteppingClock::new(start, chrono::Duration::seconds(1))
}

fn exporter_with(rasterizer: Box<dyn Rasterizer>, source: Box<dyn doc_forge::TemplateSource>) -> Exporter {
    Exporter::new(rasterizer, source, Box::new(clock()), ExportOptions::default())
}

fn form(document_type: &str, quantity: &str, unit_price: &str) -> FormInput {
    FormInput {
        document_type: document_type.into(),
        date: "2025-03-07".into(),
        quantity: quantity.into(),
        unit_price: unit_price.into(),
    }
}

/// Records the markup it was asked to rasterize and returns a stub PDF.
#[derive(Clone, Default)]
struct Recording {
    seen: Rc<RefCell<Vec<String>>>,
}

impl Rasterizer for Recording {
    fn rasterize(&self, target: &ElementNode, _: &ExportOptions) -> Result<Vec<u8>> {
        self.seen
            .borrow_mut()
            .push(to_html(&[DomNode::Element(target.clone())]));
        Ok(b"%PDF-1.7 stub".to_vec())
    }
}

struct Failing;

impl Rasterizer for Failing {
    fn rasterize(&self, _: &ElementNode, _: &ExportOptions) -> Result<Vec<u8>> {
        Err(DocumentError::RenderExport("canvas too large".into()))
    }
}

struct Missing;

impl Rasterizer for Missing {
    fn is_available(&self) -> bool {
        false
    }

    fn rasterize(&self, _: &ElementNode, _: &ExportOptions) -> Result<Vec<u8>> {
        Err(DocumentError::CapabilityUnavailable("missing".into()))
    }
}

/// Serve a single HTTP response on a local port; returns the base URL.
fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes());
    });
    format!("http://{addr}")
}

// =====================================================================
// Form workflow
// =====================================================================

#[test]
fn generate_writes_a_pdf_into_the_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let ex = exporter_with(Box::new(PdfRasterizer::new()), Box::new(EmbeddedSource));
    let mut control = TriggerControl::new(GENERATE_LABEL);
    let mut sink = DirectorySink::new(dir.path());
    let mut center = NotificationCenter::new();

    let outcome = ex
        .generate(&form("delivery", "42", ""), &mut control, &mut sink, &mut center)
        .unwrap();

    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.filename, "Mintiking-Supplies-Delivery-Note-2025-03-07T09-00-00.pdf");
    let bytes = fs::read(dir.path().join(&outcome.filename)).unwrap();
    assert_valid_pdf(&bytes);
    assert_eq!(center.history().len(), 1);
    assert_eq!(center.history()[0].message, "Delivery Note generated successfully!");
}

#[test]
fn bound_totals_reach_the_rasterizer_with_compact_styling() {
    let recording = Recording::default();
    let ex = exporter_with(Box::new(recording.clone()), Box::new(EmbeddedSource));
    let mut control = TriggerControl::new(GENERATE_LABEL);
    let mut center = NotificationCenter::new();

    ex.generate(&form("invoice", "3", "12.5"), &mut control, &mut MemorySink::new(), &mut center)
        .unwrap();

    let seen = recording.seen.borrow();
    assert_eq!(seen.len(), 1);
    let html = &seen[0];
    assert_eq!(html.matches("$37.50").count(), 3, "row amount plus both totals: {html}");
    assert!(html.contains("March 07, 2025"));
    assert!(html.contains("font-size: 2.2rem"), "override must be live during rasterize");
}

#[test]
fn non_numeric_form_values_total_zero() {
    let recording = Recording::default();
    let ex = exporter_with(Box::new(recording.clone()), Box::new(EmbeddedSource));
    let mut control = TriggerControl::new(GENERATE_LABEL);
    let mut center = NotificationCenter::new();

    let outcome = ex
        .generate(&form("invoice", "", "abc"), &mut control, &mut MemorySink::new(), &mut center)
        .unwrap();

    assert!(outcome.success);
    let seen = recording.seen.borrow();
    assert!(seen[0].contains("$0.00"));
    assert!(!seen[0].contains("NaN"));
}

#[test]
fn sequential_exports_get_distinct_filenames_and_same_options() {
    let ex = exporter_with(Box::new(PdfRasterizer::new()), Box::new(EmbeddedSource));
    let options_before = ex.options().clone();
    let mut control = TriggerControl::new(GENERATE_LABEL);
    let mut sink = MemorySink::new();
    let mut center = NotificationCenter::new();

    let first = ex
        .generate(&form("invoice", "1", "10"), &mut control, &mut sink, &mut center)
        .unwrap();
    let second = ex
        .generate(&form("invoice", "1", "10"), &mut control, &mut sink, &mut center)
        .unwrap();

    assert_ne!(first.filename, second.filename);
    assert_eq!(ex.options(), &options_before);
    assert_eq!(sink.artifacts.len(), 2);
    for (_, bytes) in &sink.artifacts {
        assert_valid_pdf(bytes);
    }
}

#[test]
fn same_second_exports_name_the_files_actually_written() {
    let dir = tempfile::tempdir().unwrap();
    let at = Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap();
    let ex = Exporter::new(
        Box::new(PdfRasterizer::new()),
        Box::new(EmbeddedSource),
        Box::new(SteppingClock::fixed(at)),
        ExportOptions::default(),
    );
    let mut control = TriggerControl::new(GENERATE_LABEL);
    let mut sink = DirectorySink::new(dir.path());
    let mut center = NotificationCenter::new();

    let first = ex
        .generate(&form("invoice", "1", "10"), &mut control, &mut sink, &mut center)
        .unwrap();
    let second = ex
        .generate(&form("invoice", "2", "10"), &mut control, &mut sink, &mut center)
        .unwrap();

    assert_ne!(first.filename, second.filename);
    assert_eq!(second.filename, "Mintiking-Supplies-Invoice-2025-03-07T09-00-00 (1).pdf");
    assert_valid_pdf(&fs::read(dir.path().join(&first.filename)).unwrap());
    assert_valid_pdf(&fs::read(dir.path().join(&second.filename)).unwrap());
}

// =====================================================================
// Override lifecycle
// =====================================================================

#[test]
fn override_is_reverted_after_success_and_failure() {
    let mut page = LoadedPage::parse(DocumentType::Invoice, templates::INVOICE_PAGE).unwrap();
    let before = page.clone();
    let overrides = PresentationOverride::compact(DocumentType::Invoice);
    let options = ExportOptions::default();
    let clock = clock();

    let ok = export_document(
        page.document_mut(),
        &overrides,
        &Recording::default(),
        &options,
        &mut MemorySink::new(),
        &clock,
    );
    assert!(ok.success);
    assert_eq!(page, before);

    let failed = export_document(
        page.document_mut(),
        &overrides,
        &Failing,
        &options,
        &mut MemorySink::new(),
        &clock,
    );
    assert!(!failed.success);
    assert_eq!(failed.error_message.as_deref(), Some(EXPORT_FAILED_MESSAGE));
    assert_eq!(page, before);
}

#[test]
fn download_leaves_displayed_page_untouched() {
    let ex = exporter_with(Box::new(PdfRasterizer::new()), Box::new(EmbeddedSource));
    let mut page = LoadedPage::load(DocumentType::DeliveryNote, ex.source()).unwrap();
    let before = page.clone();
    let mut control = TriggerControl::new(DOWNLOAD_LABEL);
    let mut center = NotificationCenter::new();

    let outcome = ex
        .download(&mut page, &mut control, &mut MemorySink::new(), &mut center)
        .unwrap();

    assert!(outcome.success);
    assert_eq!(page, before);
    assert_eq!(center.history()[0].message, "Delivery Note PDF downloaded successfully!");
    assert_eq!(control.label(), DOWNLOAD_LABEL);
}

// =====================================================================
// Template fetch
// =====================================================================

#[test]
fn template_404_gives_one_error_and_restores_control() {
    let base = serve_once("404 Not Found", "");
    let ex = exporter_with(Box::new(PdfRasterizer::new()), Box::new(HttpSource::new(base)));
    let mut control = TriggerControl::new(GENERATE_LABEL);
    let mut sink = MemorySink::new();
    let mut center = NotificationCenter::new();

    let outcome = ex
        .generate(&form("invoice", "3", "12.5"), &mut control, &mut sink, &mut center)
        .unwrap();

    assert!(!outcome.success);
    assert!(sink.artifacts.is_empty());
    assert_eq!(center.history().len(), 1);
    assert_eq!(center.history()[0].kind, NotificationKind::Error);
    assert_eq!(center.history()[0].message, GENERATE_FAILED_MESSAGE);
    assert!(control.is_enabled());
    assert_eq!(control.label(), GENERATE_LABEL);
}

#[test]
fn template_fetched_over_http() {
    let base = serve_once("200 OK", templates::INVOICE_PAGE);
    let source = HttpSource::new(format!("{base}/"));

    let doc = acquire(None, &source, DocumentType::Invoice).unwrap();
    assert_eq!(doc.container().and_then(|c| c.id()), Some("invoice"));
}

#[test]
fn template_without_container_is_reported() {
    let base = serve_once("200 OK", "<html><body><p>maintenance</p></body></html>");
    let err = acquire(None, &HttpSource::new(base), DocumentType::DeliveryNote).unwrap_err();
    assert!(matches!(
        err,
        DocumentError::TemplateNotFound { ref container_id } if container_id == "delivery-note"
    ));
}

// =====================================================================
// Capability and notifications
// =====================================================================

#[test]
fn missing_rasterizer_disables_download_for_the_session() {
    let ex = exporter_with(Box::new(Missing), Box::new(EmbeddedSource));
    let mut page = LoadedPage::parse(DocumentType::Invoice, templates::INVOICE_PAGE).unwrap();
    let mut control = TriggerControl::new(DOWNLOAD_LABEL);
    let mut center = NotificationCenter::new();

    let first = ex.download(&mut page, &mut control, &mut MemorySink::new(), &mut center);
    assert!(matches!(first, Err(DocumentError::CapabilityUnavailable(_))));
    assert_eq!(control.label(), UNAVAILABLE_LABEL);
    assert!(!control.is_enabled());
    assert_eq!(center.history().len(), 1);
    assert_eq!(center.history()[0].message, CAPABILITY_MISSING_MESSAGE);

    // A second click is refused without another banner.
    let second = ex.download(&mut page, &mut control, &mut MemorySink::new(), &mut center);
    assert!(second.is_err());
    assert_eq!(center.history().len(), 1);
}

#[test]
fn at_most_one_banner_is_visible() {
    let ex = exporter_with(Box::new(Failing), Box::new(EmbeddedSource));
    let mut page = LoadedPage::parse(DocumentType::Invoice, templates::INVOICE_PAGE).unwrap();
    let mut control = TriggerControl::new(DOWNLOAD_LABEL);
    let mut center = NotificationCenter::new();

    for _ in 0..3 {
        ex.download(&mut page, &mut control, &mut MemorySink::new(), &mut center)
            .unwrap();
    }
    assert_eq!(center.history().len(), 3);

    let now = Instant::now();
    let visible = center.visible(now).unwrap();
    assert_eq!(visible.message, EXPORT_FAILED_MESSAGE);
    assert!(center.visible(now + Duration::from_secs(5)).is_none());
}

// =====================================================================
// Engine output
// =====================================================================

#[test]
fn compact_layout_is_reproducible() {
    let rasterizer = PdfRasterizer::new();
    let options = ExportOptions::default();
    let hash = || {
        let mut dom = doc_forge::dom::parse_html(templates::INVOICE_PAGE);
        let guard = PresentationOverride::compact(DocumentType::Invoice)
            .apply(&mut dom)
            .unwrap();
        let container = find_by_id(guard.nodes(), "invoice").unwrap();
        let json = rasterizer.layout(container, &options).unwrap().to_json().unwrap();
        Sha256::digest(json.as_bytes())
    };
    assert_eq!(hash(), hash());
}

#[test]
fn compact_documents_fit_on_one_page() {
    let rasterizer = PdfRasterizer::new();
    let options = ExportOptions::default();
    for doc_type in [DocumentType::Invoice, DocumentType::DeliveryNote] {
        let mut dom = doc_forge::dom::parse_html(templates::page_for(doc_type));
        let guard = PresentationOverride::compact(doc_type).apply(&mut dom).unwrap();
        let container = find_by_id(guard.nodes(), doc_type.container_id()).unwrap();
        let layout = rasterizer.layout(container, &options).unwrap();
        assert_eq!(layout.pages.len(), 1, "{doc_type} spilled onto a second page");
        assert!(layout.box_count() > 10);
    }
}
