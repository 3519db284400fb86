//! Template acquisition – produce the DOM subtree for a document type,
//! either from the page already loaded or from a sibling template resource.

use std::fs;
use std::path::PathBuf;

use crate::document::DocumentType;
use crate::dom::{find_by_id, parse_html, to_html, DomNode, ElementNode};
use crate::error::{DocumentError, Result};
use crate::templates;

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Somewhere template markup can be fetched from by resource name
/// (`index.html`, `delivery-note.html`).
pub trait TemplateSource {
    fn fetch(&self, resource: &str) -> Result<String>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

fn fetch_error(resource: &str, reason: impl Into<String>) -> DocumentError {
    DocumentError::TemplateFetch {
        resource: resource.to_string(),
        reason: reason.into(),
    }
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSource;

impl TemplateSource for EmbeddedSource {
    fn fetch(&self, resource: &str) -> Result<String> {
        templates::resource(resource)
            .map(str::to_string)
            .ok_or_else(|| fetch_error(resource, "404 Not Found"))
    }

    fn describe(&self) -> String {
        "embedded templates".to_string()
    }
}

/// Template files that sit next to each other in one directory.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirectorySource {
    fn fetch(&self, resource: &str) -> Result<String> {
        let path = self.root.join(resource);
        fs::read_to_string(&path).map_err(|e| fetch_error(resource, format!("{}: {e}", path.display())))
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Templates served over HTTP relative to a base URL. Only 2xx responses
/// count as success.
#[derive(Clone)]
pub struct HttpSource {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    fn url_for(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }
}

impl TemplateSource for HttpSource {
    fn fetch(&self, resource: &str) -> Result<String> {
        let url = self.url_for(resource);
        log::debug!("GET {url}");
        match self.agent.get(&url).call() {
            Ok(response) => response
                .into_string()
                .map_err(|e| fetch_error(resource, format!("reading body: {e}"))),
            Err(ureq::Error::Status(code, response)) => Err(fetch_error(
                resource,
                format!("{} {}", code, response.status_text()),
            )),
            Err(e) => Err(fetch_error(resource, e.to_string())),
        }
    }

    fn describe(&self) -> String {
        format!("http {}", self.base_url)
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// An in-memory DOM holding one document container. Owned by whoever is
/// exporting it; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    document_type: DocumentType,
    nodes: Vec<DomNode>,
}

impl RenderedDocument {
    /// Wrap a detached container element.
    pub fn from_container(document_type: DocumentType, container: ElementNode) -> Self {
        Self {
            document_type,
            nodes: vec![DomNode::Element(container)],
        }
    }

    /// Parse markup and keep the whole tree; fails when the container id is
    /// absent.
    pub fn parse(document_type: DocumentType, html: &str) -> Result<Self> {
        let doc = Self {
            document_type,
            nodes: parse_html(html),
        };
        doc.container().ok_or_else(|| DocumentError::TemplateNotFound {
            container_id: document_type.container_id().to_string(),
        })?;
        Ok(doc)
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn container(&self) -> Option<&ElementNode> {
        find_by_id(&self.nodes, self.document_type.container_id())
    }

    pub fn nodes(&self) -> &[DomNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [DomNode] {
        &mut self.nodes
    }

    pub fn to_html(&self) -> String {
        to_html(&self.nodes)
    }
}

/// The page currently on display. Its container may be exported in place.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPage {
    document: RenderedDocument,
}

impl LoadedPage {
    pub fn parse(document_type: DocumentType, html: &str) -> Result<Self> {
        Ok(Self {
            document: RenderedDocument::parse(document_type, html)?,
        })
    }

    /// Load the page from a template source, as a browser would on navigation.
    pub fn load(document_type: DocumentType, source: &dyn TemplateSource) -> Result<Self> {
        let html = source.fetch(document_type.template_resource())?;
        Self::parse(document_type, &html)
    }

    pub fn document_type(&self) -> DocumentType {
        self.document.document_type()
    }

    pub fn document(&self) -> &RenderedDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut RenderedDocument {
        &mut self.document
    }
}

/// Produce a detached container for `document_type`.
///
/// When `page` already shows that type its container is used; otherwise the
/// type's template resource is fetched from `source`, parsed, and the
/// container extracted by id. Failures are returned, never retried.
pub fn acquire(
    page: Option<&LoadedPage>,
    source: &dyn TemplateSource,
    document_type: DocumentType,
) -> Result<RenderedDocument> {
    let container_id = document_type.container_id();

    if let Some(page) = page.filter(|p| p.document_type() == document_type) {
        if let Some(container) = page.document().container() {
            log::debug!("Using #{container_id} from the loaded page");
            return Ok(RenderedDocument::from_container(document_type, container.clone()));
        }
    }

    let resource = document_type.template_resource();
    log::info!("Fetching template {resource} from {}", source.describe());
    let html = source.fetch(resource)?;
    log::debug!("Template fetched, length: {}", html.len());

    let nodes = parse_html(&html);
    let container = find_by_id(&nodes, container_id).ok_or_else(|| {
        DocumentError::TemplateNotFound {
            container_id: container_id.to_string(),
        }
    })?;
    Ok(RenderedDocument::from_container(document_type, container.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Serves fixed markup and counts fetches.
    struct FixedSource {
        html: &'static str,
        fetches: Cell<usize>,
    }

    impl TemplateSource for FixedSource {
        fn fetch(&self, _resource: &str) -> Result<String> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.html.to_string())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    #[test]
    fn loaded_page_of_same_type_is_used_directly() {
        let page = LoadedPage::parse(DocumentType::Invoice, templates::INVOICE_PAGE).unwrap();
        let source = FixedSource {
            html: "<p>unused</p>",
            fetches: Cell::new(0),
        };
        let doc = acquire(Some(&page), &source, DocumentType::Invoice).unwrap();
        assert_eq!(source.fetches.get(), 0);
        assert_eq!(doc.container().and_then(|c| c.id()), Some("invoice"));
    }

    #[test]
    fn other_type_is_fetched_and_extracted() {
        let page = LoadedPage::parse(DocumentType::Invoice, templates::INVOICE_PAGE).unwrap();
        let doc = acquire(Some(&page), &EmbeddedSource, DocumentType::DeliveryNote).unwrap();
        assert_eq!(doc.nodes().len(), 1);
        assert_eq!(doc.container().and_then(|c| c.id()), Some("delivery-note"));
    }

    #[test]
    fn missing_container_is_template_not_found() {
        let source = FixedSource {
            html: "<html><body><div id=\"other\"></div></body></html>",
            fetches: Cell::new(0),
        };
        let err = acquire(None, &source, DocumentType::Invoice).unwrap_err();
        assert!(matches!(err, DocumentError::TemplateNotFound { ref container_id } if container_id == "invoice"));
        assert_eq!(source.fetches.get(), 1, "no automatic retry");
    }

    #[test]
    fn missing_file_is_fetch_error() {
        let dir = DirectorySource::new("/nonexistent/doc-forge-templates");
        let err = acquire(None, &dir, DocumentType::Invoice).unwrap_err();
        assert!(matches!(err, DocumentError::TemplateFetch { ref resource, .. } if resource == "index.html"));
    }

    #[test]
    fn http_url_joins_cleanly() {
        let src = HttpSource::new("http://localhost:8080/docs/");
        assert_eq!(src.url_for("/index.html"), "http://localhost:8080/docs/index.html");
    }
}
