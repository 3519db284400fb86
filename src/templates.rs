//! Bundled document templates.
//!
//! Each page carries one document container (`#invoice` or `#delivery-note`)
//! built from utility classes plus the semantic classes that binding rules
//! and presentation overrides address.

use crate::document::DocumentType;

/// Invoice page, served as `index.html`.
pub const INVOICE_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Invoice - Mintiking Supplies</title>
    <link rel="stylesheet" href="styles.css">
</head>
<body>
<div class="container">
    <div id="invoice" class="invoice-card p-10">
        <header class="invoice-header flex justify-between mb-10 pb-6">
            <div class="flex-1">
                <h1 class="company-name text-4xl font-bold mt-0 mb-2" style="color: #1a365d">Mintiking Supplies</h1>
                <p class="company-tagline text-sm text-gray-500">Industrial Alloys &amp; Raw Materials</p>
                <p class="text-sm text-gray-500">Plot 14, Ferro Park, Johannesburg</p>
            </div>
            <div class="flex-1 text-right">
                <h2 class="invoice-title text-2xl font-bold mt-0 mb-4">INVOICE</h2>
                <div class="invoice-meta flex justify-end gap-8 mt-6">
                    <div class="invoice-number">
                        <p class="meta-label text-sm text-gray-500 mb-1">Invoice No.</p>
                        <p class="meta-value font-bold">MS-INV-0001</p>
                    </div>
                    <div class="invoice-date">
                        <p class="meta-label text-sm text-gray-500 mb-1">Date</p>
                        <p class="meta-value font-bold">January 01, 2025</p>
                    </div>
                </div>
            </div>
        </header>

        <section class="recipient-section mb-8">
            <h3 class="section-title text-lg font-bold mt-0 mb-3 pb-1">Bill To</h3>
            <p class="recipient-name font-bold mb-1">Highveld Steelworks Ltd.</p>
            <p class="recipient-address text-gray-700 mb-1">22 Foundry Road</p>
            <p class="recipient-address text-gray-700 mb-1">Witbank, Mpumalanga 1035</p>
        </section>

        <section class="items-section mb-8">
            <h3 class="section-title text-lg font-bold mt-0 mb-3 pb-1">Items</h3>
            <table class="items-table w-full">
                <thead>
                    <tr>
                        <th class="text-left bg-gray-200">Description</th>
                        <th class="text-left bg-gray-200">Quantity (MT)</th>
                        <th class="text-left bg-gray-200">Unit Price</th>
                        <th class="text-left bg-gray-200">Amount</th>
                    </tr>
                </thead>
                <tbody>
                    <tr>
                        <td>Ferro Chrome</td>
                        <td>0</td>
                        <td>$0.00</td>
                        <td>$0.00</td>
                    </tr>
                </tbody>
            </table>
        </section>

        <section class="totals-section pt-4">
            <div class="totals-row flex justify-between py-2">
                <span class="totals-label">Subtotal</span>
                <span class="totals-value">$0.00</span>
            </div>
            <div class="totals-row total-final flex justify-between font-bold text-xl pt-3 mt-2">
                <span class="totals-label">Total Due</span>
                <span class="totals-value">$0.00</span>
            </div>
        </section>

        <section class="payment-section p-6 mt-6 bg-gray-100">
            <h3 class="section-title text-lg font-bold mt-0 mb-3 pb-1">Payment Details</h3>
            <div class="payment-row flex justify-between py-1">
                <span>Bank</span>
                <span>First Mining Bank</span>
            </div>
            <div class="payment-row flex justify-between py-1">
                <span>Account</span>
                <span>6201 4478 9130</span>
            </div>
        </section>
    </div>

    <div class="actions">
        <button id="downloadBtn" class="download-btn">Download PDF</button>
    </div>
</div>
<script src="https://cdnjs.cloudflare.com/ajax/libs/html2pdf.js/0.10.1/html2pdf.bundle.min.js"></script>
<script src="script.js"></script>
</body>
</html>
"##;

/// Delivery-note page, served as `delivery-note.html`.
pub const DELIVERY_NOTE_PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Delivery Note - Mintiking Supplies</title>
    <link rel="stylesheet" href="styles.css">
</head>
<body>
<div class="container">
    <div id="delivery-note" class="invoice-card p-10">
        <header class="invoice-header flex justify-between mb-10 pb-6">
            <div class="flex-1">
                <h1 class="company-name text-4xl font-bold mt-0 mb-2" style="color: #1a365d">Mintiking Supplies</h1>
                <p class="company-tagline text-sm text-gray-500">Industrial Alloys &amp; Raw Materials</p>
            </div>
            <div class="flex-1 text-right">
                <h2 class="invoice-title text-2xl font-bold mt-0 mb-4">DELIVERY NOTE</h2>
                <div class="invoice-meta flex justify-end gap-8 mt-6">
                    <div class="invoice-number">
                        <p class="meta-label text-sm text-gray-500 mb-1">Note No.</p>
                        <p class="meta-value font-bold">MS-DN-0001</p>
                    </div>
                    <div class="invoice-date">
                        <p class="meta-label text-sm text-gray-500 mb-1">Date</p>
                        <p class="meta-value font-bold">January 01, 2025</p>
                    </div>
                </div>
            </div>
        </header>

        <section class="recipient-section mb-8">
            <h3 class="section-title text-lg font-bold mt-0 mb-3 pb-1">Deliver To</h3>
            <p class="recipient-name font-bold mb-1">Highveld Steelworks Ltd.</p>
            <p class="recipient-address text-gray-700 mb-1">22 Foundry Road</p>
            <p class="recipient-address text-gray-700 mb-1">Witbank, Mpumalanga 1035</p>
        </section>

        <section class="items-section mb-8">
            <h3 class="section-title text-lg font-bold mt-0 mb-3 pb-1">Consignment</h3>
            <table class="items-table w-full">
                <thead>
                    <tr>
                        <th class="text-left bg-gray-200">Description</th>
                        <th class="text-left bg-gray-200">Quantity (MT)</th>
                        <th class="text-left bg-gray-200">Packaging</th>
                    </tr>
                </thead>
                <tbody>
                    <tr>
                        <td>Ferro Chrome</td>
                        <td>0</td>
                        <td>1 MT bulk bags</td>
                    </tr>
                </tbody>
            </table>
        </section>

        <section class="signatures-section flex gap-8 mt-10 mb-8">
            <div class="signature-box flex-1 p-6 bg-gray-100">
                <p class="font-bold">Dispatched by</p>
                <div class="signature-line mt-12 mb-3 border-gray-500" style="border-width: 1px; height: 1px"></div>
                <p class="text-sm text-gray-500">Name, signature &amp; date</p>
            </div>
            <div class="signature-box flex-1 p-6 bg-gray-100">
                <p class="font-bold">Received by</p>
                <div class="signature-line mt-12 mb-3 border-gray-500" style="border-width: 1px; height: 1px"></div>
                <p class="text-sm text-gray-500">Name, signature &amp; date</p>
            </div>
        </section>

        <div class="notes-section p-6 text-gray-700">
            <p>Goods remain the property of Mintiking Supplies until paid in full.
            Please report any discrepancy within 48 hours of receipt.</p>
        </div>
    </div>

    <div class="actions">
        <button id="downloadBtn" class="download-btn">Download PDF</button>
    </div>
</div>
<script src="delivery-note.js"></script>
</body>
</html>
"##;

/// The bundled page for a document type.
pub fn page_for(document_type: DocumentType) -> &'static str {
    match document_type {
        DocumentType::Invoice => INVOICE_PAGE,
        DocumentType::DeliveryNote => DELIVERY_NOTE_PAGE,
    }
}

/// Look up a bundled page by its resource name.
pub fn resource(name: &str) -> Option<&'static str> {
    [DocumentType::Invoice, DocumentType::DeliveryNote]
        .into_iter()
        .find(|t| t.template_resource() == name.trim_start_matches("./"))
        .map(page_for)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{find_by_id, parse_html};

    #[test]
    fn templates_carry_their_container() {
        for doc_type in [DocumentType::Invoice, DocumentType::DeliveryNote] {
            let dom = parse_html(page_for(doc_type));
            let container = find_by_id(&dom, doc_type.container_id());
            assert!(
                container.is_some(),
                "Template for {doc_type} should contain #{}",
                doc_type.container_id()
            );
        }
    }

    #[test]
    fn resources_resolve_by_name() {
        assert!(resource("index.html").is_some());
        assert!(resource("./delivery-note.html").is_some());
        assert!(resource("form.html").is_none());
    }
}
