//! Workflows – the two user-triggered flows that tie acquisition, binding,
//! presentation and export together.
//!
//! - [`Exporter::download`]: export the document already on display.
//! - [`Exporter::generate`]: build a document from form input, then export.
//!
//! Both disable their control while running and turn every failure into
//! exactly one notification.

use crate::acquisition::{acquire, LoadedPage, TemplateSource};
use crate::binding::bind;
use crate::document::{DocumentRequest, DocumentType, FormInput};
use crate::error::{DocumentError, Result};
use crate::export::{export_document, ArtifactSink, Clock, ExportOptions, ExportOutcome, Rasterizer};
use crate::presentation::PresentationOverride;
use crate::ui::{NotificationKind, Notifier, TriggerControl};

pub const DOWNLOAD_LABEL: &str = "Download PDF";
pub const DOWNLOAD_BUSY_LABEL: &str = "Generating PDF...";
pub const GENERATE_LABEL: &str = "Generate Document";
pub const GENERATE_BUSY_LABEL: &str = "Generating...";
pub const GENERATE_FAILED_MESSAGE: &str = "Failed to generate document. Please try again.";

/// Long-lived collaborators shared by both workflows.
pub struct Exporter {
    rasterizer: Box<dyn Rasterizer>,
    source: Box<dyn TemplateSource>,
    clock: Box<dyn Clock>,
    options: ExportOptions,
}

impl Exporter {
    pub fn new(
        rasterizer: Box<dyn Rasterizer>,
        source: Box<dyn TemplateSource>,
        clock: Box<dyn Clock>,
        options: ExportOptions,
    ) -> Self {
        Self {
            rasterizer,
            source,
            clock,
            options,
        }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    pub fn rasterizer(&self) -> &dyn Rasterizer {
        self.rasterizer.as_ref()
    }

    pub fn source(&self) -> &dyn TemplateSource {
        self.source.as_ref()
    }

    fn refuse_if_unavailable(&self, control: &mut TriggerControl, notifier: &mut dyn Notifier) -> Result<()> {
        if control.is_unavailable() {
            return Err(DocumentError::CapabilityUnavailable(format!(
                "control '{}' is unavailable",
                control.label()
            )));
        }
        if !control.is_enabled() {
            return Err(busy(control.label()));
        }
        if !crate::ui::probe_capability(self.rasterizer(), control, notifier) {
            return Err(DocumentError::CapabilityUnavailable("no rasterizer".to_string()));
        }
        Ok(())
    }

    /// Export the displayed page's document in place. The page is left
    /// exactly as it was, whatever the outcome.
    ///
    /// Returns `Err` only when the trigger is refused (control disabled or
    /// no rasterizer); export failures are reported through the outcome.
    pub fn download(
        &self,
        page: &mut LoadedPage,
        control: &mut TriggerControl,
        sink: &mut dyn ArtifactSink,
        notifier: &mut dyn Notifier,
    ) -> Result<ExportOutcome> {
        self.refuse_if_unavailable(control, notifier)?;
        let document_type = page.document_type();
        let Some(_busy) = control.begin_busy(DOWNLOAD_BUSY_LABEL) else {
            return Err(busy(DOWNLOAD_BUSY_LABEL));
        };

        let outcome = export_document(
            page.document_mut(),
            &PresentationOverride::compact(document_type),
            self.rasterizer(),
            &self.options,
            sink,
            self.clock.as_ref(),
        );

        match &outcome.error_message {
            None => notifier.notify(
                &format!("{} PDF downloaded successfully!", document_type.display_name()),
                NotificationKind::Success,
            ),
            Some(message) => notifier.notify(message, NotificationKind::Error),
        }
        Ok(outcome)
    }

    /// Form flow: acquire the template for the requested type, bind the form
    /// values into a detached copy and export it. The control gets its own
    /// label back afterwards.
    pub fn generate(
        &self,
        form: &FormInput,
        control: &mut TriggerControl,
        sink: &mut dyn ArtifactSink,
        notifier: &mut dyn Notifier,
    ) -> Result<ExportOutcome> {
        self.refuse_if_unavailable(control, notifier)?;
        let Some(_busy) = control.begin_busy(GENERATE_BUSY_LABEL) else {
            return Err(busy(GENERATE_BUSY_LABEL));
        };

        match self.build_and_export(form, sink) {
            Ok((document_type, outcome)) if outcome.success => {
                notifier.notify(
                    &format!("{} generated successfully!", document_type.display_name()),
                    NotificationKind::Success,
                );
                Ok(outcome)
            }
            Ok((_, outcome)) => {
                notifier.notify(GENERATE_FAILED_MESSAGE, NotificationKind::Error);
                Ok(outcome)
            }
            Err(e) => {
                log::error!("Document generation failed: {e}");
                notifier.notify(GENERATE_FAILED_MESSAGE, NotificationKind::Error);
                Ok(ExportOutcome::failed(String::new(), GENERATE_FAILED_MESSAGE))
            }
        }
    }

    fn build_and_export(
        &self,
        form: &FormInput,
        sink: &mut dyn ArtifactSink,
    ) -> Result<(DocumentType, ExportOutcome)> {
        let request = DocumentRequest::from_form(form).map_err(DocumentError::InvalidRequest)?;
        let document_type = request.document_type();

        let mut doc = acquire(None, self.source(), document_type)?;
        let filled = bind(&mut doc, &request)?;
        log::debug!("Bound {filled} placeholder(s) into #{}", document_type.container_id());

        let outcome = export_document(
            &mut doc,
            &PresentationOverride::compact(document_type),
            self.rasterizer(),
            &self.options,
            sink,
            self.clock.as_ref(),
        );
        Ok((document_type, outcome))
    }
}

fn busy(label: &str) -> DocumentError {
    DocumentError::TriggerBusy {
        label: label.to_string(),
    }
}
