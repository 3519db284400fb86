//! Presentation overrides – temporary inline-style changes that compact a
//! document onto a single page for export.
//!
//! An override is a declarative table of `selector -> [(property, value)]`.
//! [`PresentationOverride::apply`] merges the properties into the inline
//! `style` attribute of every matching element and returns an
//! [`OverrideGuard`]. The guard snapshots each touched element's original
//! attribute and puts it back when reverted or dropped, so the document
//! returns to its exact prior state on every exit path.

use crate::document::DocumentType;
use crate::dom::DomNode;
use crate::error::Result;
use crate::selector::{element_at, element_at_mut, NodePath, Selector};

/// One row of an override table.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selector: String,
    pub properties: Vec<(String, String)>,
}

/// A selector -> style-property table applied around an export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresentationOverride {
    rules: Vec<StyleRule>,
}

impl PresentationOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule; builder style.
    pub fn rule(mut self, selector: &str, properties: &[(&str, &str)]) -> Self {
        self.rules.push(StyleRule {
            selector: selector.to_string(),
            properties: properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        self
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The single-page table for a document type: reduced margins,
    /// compacted spacing and shrunk typography.
    pub fn compact(document_type: DocumentType) -> Self {
        let container = format!("#{}", document_type.container_id());
        let shared = Self::new()
            .rule(&container, &[("padding", "20px")])
            .rule(
                ".invoice-header",
                &[("margin-bottom", "25px"), ("padding-bottom", "15px")],
            )
            .rule(
                ".company-name",
                &[("font-size", "2.2rem"), ("margin-bottom", "8px")],
            )
            .rule(
                ".invoice-title",
                &[("font-size", "1.3rem"), ("margin-bottom", "12px")],
            )
            .rule(".invoice-meta", &[("margin-top", "15px"), ("gap", "30px")])
            .rule(
                ".meta-label",
                &[("font-size", "0.9rem"), ("margin-bottom", "4px")],
            )
            .rule(".meta-value", &[("font-size", "1.1rem")])
            .rule(
                ".section-title",
                &[
                    ("font-size", "1rem"),
                    ("margin-bottom", "10px"),
                    ("padding-bottom", "4px"),
                ],
            )
            .rule(
                ".recipient-name",
                &[("font-size", "1rem"), ("margin-bottom", "4px")],
            )
            .rule(
                ".recipient-address",
                &[("font-size", "0.9rem"), ("margin-bottom", "2px")],
            )
            .rule(".items-table", &[("margin-top", "15px")])
            .rule(
                ".items-table th, .items-table td",
                &[("padding", "10px 8px"), ("font-size", "0.9rem")],
            );

        match document_type {
            DocumentType::Invoice => shared
                .rule(
                    ".recipient-section, .items-section, .totals-section",
                    &[("margin-bottom", "20px")],
                )
                .rule(".totals-section", &[("padding-top", "15px")])
                .rule(
                    ".totals-row",
                    &[("padding", "6px 0"), ("font-size", "0.9rem")],
                )
                .rule(
                    ".total-final",
                    &[
                        ("font-size", "1.1rem"),
                        ("padding-top", "12px"),
                        ("margin-top", "8px"),
                    ],
                )
                .rule(
                    ".payment-section",
                    &[("padding", "20px"), ("margin-bottom", "0")],
                )
                .rule(
                    ".payment-row",
                    &[("padding", "4px 0"), ("font-size", "0.9rem")],
                ),
            DocumentType::DeliveryNote => shared
                .rule(
                    ".signatures-section",
                    &[("margin-top", "30px"), ("margin-bottom", "20px")],
                )
                .rule(
                    ".signature-box",
                    &[("padding", "15px"), ("margin-bottom", "10px")],
                )
                .rule(
                    ".signature-line",
                    &[("margin-top", "40px"), ("margin-bottom", "10px")],
                )
                .rule(
                    ".notes-section",
                    &[("font-size", "0.9rem"), ("padding", "15px")],
                ),
        }
    }

    /// Apply the table to `nodes`. The returned guard must be held for the
    /// duration of the export; dropping it reverts every change.
    pub fn apply<'a>(&self, nodes: &'a mut [DomNode]) -> Result<OverrideGuard<'a>> {
        // Parse everything first so a bad selector leaves the tree untouched.
        let compiled = self
            .rules
            .iter()
            .map(|r| Selector::parse(&r.selector).map(|s| (s, &r.properties)))
            .collect::<Result<Vec<_>>>()?;

        let mut saved: Vec<(NodePath, Option<String>)> = Vec::new();
        for (selector, properties) in &compiled {
            for path in selector.select_paths(nodes) {
                let Some(el) = element_at_mut(nodes, &path) else {
                    continue;
                };
                if !saved.iter().any(|(p, _)| *p == path) {
                    saved.push((path.clone(), el.attributes.get("style").cloned()));
                }
                let merged = merge_declarations(el.inline_style().unwrap_or(""), properties);
                el.attributes.insert("style".to_string(), merged);
            }
        }
        log::debug!(
            "Applied {} override rule(s) to {} element(s)",
            self.rules.len(),
            saved.len()
        );
        Ok(OverrideGuard { nodes, saved })
    }
}

/// Scoped hold on an overridden document. Reverts on drop.
pub struct OverrideGuard<'a> {
    nodes: &'a mut [DomNode],
    saved: Vec<(NodePath, Option<String>)>,
}

impl OverrideGuard<'_> {
    /// The document as currently overridden.
    pub fn nodes(&self) -> &[DomNode] {
        &*self.nodes
    }

    /// Number of elements whose style was changed.
    pub fn touched(&self) -> usize {
        self.saved.len()
    }

    /// Inline style an element had before the override, if it was touched.
    pub fn original_style(&self, path: &[usize]) -> Option<Option<&str>> {
        self.saved
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, s)| s.as_deref())
    }

    /// Explicitly revert now. Equivalent to dropping the guard.
    pub fn revert(self) {}

    fn restore(&mut self) {
        for (path, original) in self.saved.drain(..) {
            let Some(el) = element_at_mut(self.nodes, &path) else {
                log::warn!("Overridden element at {path:?} disappeared before revert");
                continue;
            };
            match original {
                Some(style) => {
                    el.attributes.insert("style".to_string(), style);
                }
                None => {
                    el.attributes.remove("style");
                }
            }
        }
    }
}

impl Drop for OverrideGuard<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Merge `properties` into an inline style string, replacing existing
/// declarations of the same property and keeping the rest in order.
pub fn merge_declarations(existing: &str, properties: &[(String, String)]) -> String {
    let mut decls: Vec<(String, String)> = existing
        .split(';')
        .filter_map(|d| {
            let (k, v) = d.split_once(':')?;
            let (k, v) = (k.trim(), v.trim());
            (!k.is_empty()).then(|| (k.to_ascii_lowercase(), v.to_string()))
        })
        .collect();

    for (prop, value) in properties {
        match decls.iter_mut().find(|(k, _)| k == prop) {
            Some(slot) => slot.1 = value.clone(),
            None => decls.push((prop.clone(), value.clone())),
        }
    }

    decls
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Inline style of the element at `path`, for inspection in tests and logs.
pub fn style_at<'a>(nodes: &'a [DomNode], path: &[usize]) -> Option<&'a str> {
    element_at(nodes, path).and_then(|e| e.inline_style())
}
