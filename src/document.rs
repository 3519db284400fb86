//! Document types and the immutable request handed to the pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// The kinds of business document the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    Invoice,
    DeliveryNote,
}

impl DocumentType {
    /// Id of the element that holds the document inside its template.
    pub fn container_id(self) -> &'static str {
        match self {
            DocumentType::Invoice => "invoice",
            DocumentType::DeliveryNote => "delivery-note",
        }
    }

    /// Sibling resource that carries this document's template.
    pub fn template_resource(self) -> &'static str {
        match self {
            DocumentType::Invoice => "index.html",
            DocumentType::DeliveryNote => "delivery-note.html",
        }
    }

    /// Human-readable name used in notifications.
    pub fn display_name(self) -> &'static str {
        match self {
            DocumentType::Invoice => "Invoice",
            DocumentType::DeliveryNote => "Delivery Note",
        }
    }

    /// Segment used in generated filenames.
    pub fn filename_segment(self) -> &'static str {
        match self {
            DocumentType::Invoice => "Invoice",
            DocumentType::DeliveryNote => "Delivery-Note",
        }
    }

    pub fn has_pricing(self) -> bool {
        self == DocumentType::Invoice
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "invoice" => Ok(DocumentType::Invoice),
            "delivery" | "delivery-note" | "delivery_note" | "deliverynote" => {
                Ok(DocumentType::DeliveryNote)
            }
            other => Err(format!("unknown document type '{other}'")),
        }
    }
}

/// One priced (or unpriced) row of a document.
///
/// The numeric values drive the total; the raw strings are what the user
/// typed and are bound into the row cells verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub quantity_text: String,
    pub unit_price_text: String,
}

impl LineItem {
    /// Build from raw form text. Non-numeric input counts as zero.
    pub fn from_input(quantity: &str, unit_price: &str) -> Self {
        Self {
            quantity: parse_number(quantity).unwrap_or(0.0),
            unit_price: parse_number(unit_price),
            quantity_text: quantity.trim().to_string(),
            unit_price_text: unit_price.trim().to_string(),
        }
    }

    /// `quantity × unit_price`, with a missing price counting as zero.
    pub fn amount(&self) -> f64 {
        self.quantity * self.unit_price.unwrap_or(0.0)
    }
}

/// Lenient float parsing: the longest leading `[+-]digits[.digits][e[+-]digits]`
/// prefix wins, anything else is `None`.
fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let b = s.as_bytes();
    let digits_from = |mut i: usize| {
        while b.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };

    let sign = usize::from(matches!(b.first(), Some(b'+' | b'-')));
    let mut end = digits_from(sign);
    let mut mantissa = end - sign;
    if b.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa += frac_end - (end + 1);
        if mantissa > 0 {
            end = frac_end;
        }
    }
    if mantissa == 0 {
        return None;
    }

    if matches!(b.get(end), Some(b'e' | b'E')) {
        let exp_start = end + 1 + usize::from(matches!(b.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            end = exp_end;
        }
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Raw values as entered in the document form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub document_type: String,
    /// ISO date `YYYY-MM-DD`; empty means today.
    pub date: String,
    pub quantity: String,
    pub unit_price: String,
}

/// Everything the pipeline needs to produce one document. Immutable once
/// built; consumed by a single export attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRequest {
    document_type: DocumentType,
    date: NaiveDate,
    line_items: Vec<LineItem>,
}

impl DocumentRequest {
    pub fn new(document_type: DocumentType, date: NaiveDate, line_items: Vec<LineItem>) -> Self {
        Self {
            document_type,
            date,
            line_items,
        }
    }

    /// Build a request from form input. Only the document type can fail;
    /// a bad date falls back to today and bad numbers to zero.
    pub fn from_form(form: &FormInput) -> Result<Self, String> {
        let document_type: DocumentType = form.document_type.parse()?;
        let date = match NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => {
                if !form.date.trim().is_empty() {
                    log::warn!("Unparseable date '{}', using today", form.date);
                }
                Local::now().date_naive()
            }
        };
        let item = LineItem::from_input(&form.quantity, &form.unit_price);
        Ok(Self::new(document_type, date, vec![item]))
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    /// Sum of line amounts, rounded to cents.
    pub fn total(&self) -> f64 {
        round_cents(self.line_items.iter().map(LineItem::amount).sum())
    }
}

/// Round half away from zero to two decimal places. Negative zero comes
/// back as zero so it never prints as `-0.00`.
pub fn round_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Two-decimal money string without currency symbol (e.g. `37.50`).
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", round_cents(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_type_metadata() {
        assert_eq!(DocumentType::Invoice.container_id(), "invoice");
        assert_eq!(DocumentType::DeliveryNote.container_id(), "delivery-note");
        assert_eq!(DocumentType::DeliveryNote.template_resource(), "delivery-note.html");
        assert_eq!(DocumentType::DeliveryNote.filename_segment(), "Delivery-Note");
        assert_eq!("delivery".parse::<DocumentType>(), Ok(DocumentType::DeliveryNote));
        assert!("receipt".parse::<DocumentType>().is_err());
    }

    #[test]
    fn lenient_numbers() {
        assert_eq!(parse_number("12.5"), Some(12.5));
        assert_eq!(parse_number(" 3 "), Some(3.0));
        assert_eq!(parse_number("4kg"), Some(4.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number("2.5E-1x"), Some(0.25));
        assert_eq!(parse_number("7e"), Some(7.0));
        assert_eq!(parse_number("1.2.3"), Some(1.2));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("-."), None);
    }

    #[test]
    fn zero_amounts_have_no_sign() {
        assert_eq!(format_amount(0.0 * -5.0), "0.00");
        assert_eq!(format_amount(-0.004), "0.00");
        assert_eq!(format_amount(-1.5), "-1.50");
    }

    #[test]
    fn total_rounds_to_cents() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let req = DocumentRequest::new(
            DocumentType::Invoice,
            date,
            vec![LineItem::from_input("3", "12.5")],
        );
        assert_eq!(format_amount(req.total()), "37.50");

        let req = DocumentRequest::new(
            DocumentType::Invoice,
            date,
            vec![LineItem::from_input("", "abc")],
        );
        assert_eq!(format_amount(req.total()), "0.00");
    }

    #[test]
    fn form_with_bad_date_falls_back_to_today() {
        let form = FormInput {
            document_type: "invoice".into(),
            date: "not-a-date".into(),
            quantity: "1".into(),
            unit_price: "2".into(),
        };
        let req = DocumentRequest::from_form(&form).unwrap();
        assert_eq!(req.date(), Local::now().date_naive());
    }
}
