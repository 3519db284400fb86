//! Data binding – substitute request fields into a template's placeholders.
//!
//! Binding is plain substitution: each rule writes one kind of placeholder
//! and nothing is recomputed from previously bound values. A placeholder
//! that is missing from the template is skipped, never an error.

use chrono::NaiveDate;

use crate::acquisition::RenderedDocument;
use crate::document::{format_amount, DocumentRequest, DocumentType, FormInput, LineItem};
use crate::dom::{DomNode, ElementNode, Tag};
use crate::error::Result;
use crate::selector::Selector;

/// Label written into the invoice's item row.
pub const ITEM_LABEL: &str = "Ferro Chrome";

const DATE_VALUE: &str = ".invoice-date .meta-value";
const ITEM_ROW: &str = ".items-table tbody tr";
const TOTALS_VALUE: &str = ".totals-value";
const QUANTITY_CELL: &str = ".items-table tbody tr td:nth-child(2)";

/// `Month DD, YYYY`, e.g. `March 07, 2025`.
pub fn format_display_date(date: NaiveDate) -> String {
    date.format("%B %d, %Y").to_string()
}

/// Total shown next to the form while typing: `Some("37.50")` for invoices,
/// `None` for document types without pricing.
pub fn calculate_total(form: &FormInput) -> Option<String> {
    let doc_type: DocumentType = form.document_type.parse().ok()?;
    if !doc_type.has_pricing() {
        return None;
    }
    Some(format_amount(
        LineItem::from_input(&form.quantity, &form.unit_price).amount(),
    ))
}

/// Write `request` into the placeholders of `doc`. Returns how many
/// placeholders were filled.
pub fn bind(doc: &mut RenderedDocument, request: &DocumentRequest) -> Result<usize> {
    let nodes = doc.nodes_mut();
    let mut filled = 0;

    let display_date = format_display_date(request.date());
    match Selector::parse(DATE_VALUE)?.first_mut(nodes) {
        Some(el) => {
            el.set_text(&display_date);
            filled += 1;
        }
        None => log::warn!("No date placeholder ({DATE_VALUE}) in template"),
    }

    let Some(item) = request.line_items().first() else {
        log::debug!("Request has no line items; only the date was bound");
        return Ok(filled);
    };
    if request.line_items().len() > 1 {
        log::warn!(
            "Template has a single item row; binding the first of {} line items",
            request.line_items().len()
        );
    }

    match request.document_type() {
        DocumentType::Invoice => {
            let total = format!("${}", format_amount(request.total()));

            match Selector::parse(ITEM_ROW)?.first_mut(nodes) {
                Some(row) => {
                    row.children = vec![
                        cell(ITEM_LABEL),
                        cell(&item.quantity_text),
                        cell(&format!("${}", item.unit_price_text)),
                        cell(&format!("${}", format_amount(item.amount()))),
                    ];
                    filled += 1;
                }
                None => log::warn!("No item row ({ITEM_ROW}) in invoice template"),
            }

            let totals = Selector::parse(TOTALS_VALUE)?.for_each_mut(nodes, |el| el.set_text(&total));
            log::debug!("Updated {totals} totals value(s) to {total}");
            filled += totals;
        }
        DocumentType::DeliveryNote => match Selector::parse(QUANTITY_CELL)?.first_mut(nodes) {
            Some(el) => {
                el.set_text(&item.quantity_text);
                filled += 1;
            }
            None => log::warn!("No quantity cell ({QUANTITY_CELL}) in delivery-note template"),
        },
    }

    log::trace!("Bound document: {}", doc.to_html());
    Ok(filled)
}

fn cell(text: &str) -> DomNode {
    let mut td = ElementNode::new(Tag::Td);
    td.set_text(text);
    DomNode::Element(td)
}
