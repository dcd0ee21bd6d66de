use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::{InvoiceError, Result};
use crate::pdf::InvoiceDocument;

/// Embedded Typst template for invoice generation
/// Uses a placeholder that gets replaced with the actual JSON file path
const INVOICE_TEMPLATE: &str = r##"// Invoice Template
// Data is loaded from JSON file

#let data = json("DATA_JSON_PATH")

#set page(
  paper: "a4",
  margin: (top: 40pt, bottom: 40pt, left: 40pt, right: 40pt),
)

#set text(size: 10pt)

#let muted(body) = text(fill: rgb("#4B5563"), body)

// Header with company info and invoice details
#grid(
  columns: (1fr, 1fr),
  align: (left, right),
  [
    #text(size: 14pt, weight: "bold")[#data.company.name]
    #v(0.3em)
    #muted[
      #if data.company.email != "" [#data.company.email \ ]
      #if data.company.phone != "" [#data.company.phone]
    ]
  ],
  [
    #text(size: 14pt, weight: "bold")[#upper(data.heading)]
    #v(0.3em)
    Invoice Number: #data.number \
    Invoice Date: #data.date \
    Due Date: #data.due_date
  ]
)

#v(1.5em)

// Bill To section
#text(weight: "bold", size: 12pt)[Bill To]
#v(0.2em)
#muted[
  #data.bill_to.name
  #for line in data.bill_to.lines [ \ #line]
]

#v(1em)

// Line items table
#let header = if data.show_tax {
  ([*Description*], [*Quantity*], [*Unit Price*], [*Tax Rate*], [*Amount*])
} else {
  ([*Description*], [*Quantity*], [*Unit Price*], [*Amount*])
}

#let row(item) = if data.show_tax {
  (item.description, item.quantity, item.unit_price, item.tax_rate, item.amount)
} else {
  (item.description, item.quantity, item.unit_price, item.amount)
}

#table(
  columns: if data.show_tax { (40%, 15%, 15%, 15%, 15%) } else { (40%, 20%, 20%, 20%) },
  align: (x, y) => if x == 0 { left } else { right },
  stroke: (x, y) => if y > 0 { (bottom: 1pt + rgb("#E5E7EB")) },
  inset: 6pt,
  fill: (x, y) => if y == 0 { rgb("#F3F4F6") } else { none },

  ..header,
  ..data.items.map(row).flatten()
)

#v(1em)

// Totals
#align(right)[
  #table(
    columns: (auto, auto),
    stroke: none,
    align: (right, right),
    inset: 6pt,

    [Subtotal:], [#data.subtotal],

    ..if data.tax_total != none {
      ([Tax:], [#data.tax_total])
    } else {
      ()
    },

    table.hline(stroke: 1pt + rgb("#E5E7EB")),
    [*Total:*], [*#data.total*],
  )
]

#v(2em)

#align(center)[
  #if data.terms != "" [
    #text(weight: "bold")[#data.terms]
    #v(0.3em)
  ]
  #if data.notes != "" [
    #muted[#data.notes]
    #v(0.3em)
  ]
  #muted[Thank you for your business!]
  #if data.company.website != "" [
    \ #muted[#data.company.website]
  ]
]
"##;

/// Compile `document` to a PDF at `output_path` using the Typst CLI.
pub fn generate_pdf(document: &InvoiceDocument, output_path: &Path) -> Result<()> {
    // Check if typst is available
    if Command::new("typst").arg("--version").output().is_err() {
        return Err(InvoiceError::TypstNotFound);
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    // Each run gets its own scratch directory so concurrent invocations
    // cannot read each other's data file.
    let temp_dir = std::env::temp_dir().join(format!("invoicer-{}", std::process::id()));
    std::fs::create_dir_all(&temp_dir)?;

    let json_data = serde_json::to_string(document)
        .map_err(|e| InvoiceError::PdfGeneration(e.to_string()))?;
    let json_path = temp_dir.join("data.json");
    std::fs::write(&json_path, &json_data)?;

    let template_content = INVOICE_TEMPLATE.replace("DATA_JSON_PATH", "data.json");
    let template_path = temp_dir.join("invoice.typ");
    std::fs::write(&template_path, &template_content)?;

    debug!(template = %template_path.display(), "running typst");
    let output = Command::new("typst")
        .arg("compile")
        .arg("--root")
        .arg(&temp_dir)
        .arg(&template_path)
        .arg(output_path)
        .output()?;

    // Clean up temp files
    let _ = std::fs::remove_dir_all(&temp_dir);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(InvoiceError::PdfGeneration(stderr.to_string()));
    }

    info!(path = %output_path.display(), number = %document.number, "rendered invoice");
    Ok(())
}

/// Default location of an invoice's PDF inside `output_dir`.
pub fn invoice_pdf_path(output_dir: &Path, document: &InvoiceDocument) -> PathBuf {
    output_dir.join(document.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{NewInvoice, Settings};
    use chrono::{NaiveDate, Utc};

    #[test]
    fn template_reads_the_placeholder_file() {
        assert_eq!(INVOICE_TEMPLATE.matches("DATA_JSON_PATH").count(), 1);
    }

    #[test]
    fn pdf_path_stays_inside_output_dir() {
        let output_dir = Path::new("/home/u/output");
        let date = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();

        for prefix in ["/tmp/evil-", "../../", "A/42/", ""] {
            let settings = Settings {
                invoice_number_prefix: prefix.to_string(),
                ..Settings::default()
            };
            let invoice = NewInvoice::from_settings(&settings, "client-1", date)
                .into_invoice(Utc::now(), true);
            let doc = InvoiceDocument::build(&invoice, None, &settings);

            let path = invoice_pdf_path(output_dir, &doc);
            assert_eq!(path.parent(), Some(output_dir), "prefix {prefix:?}");
        }
    }
}
