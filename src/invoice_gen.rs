use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::NaiveDate;
use printpdf::image_crate::{self, DynamicImage};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};
use tracing::{debug, error, info, warn};

use crate::error::ExportError;
use crate::models::{AdjustmentSetting, InvoiceState, Logo};
use crate::totals::format_money;

// A4 portrait, millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const TOP: f32 = 282.0;
const BOTTOM: f32 = 20.0;
const LEFT: f32 = 15.0;
const RIGHT: f32 = 195.0;

const LINE: f32 = 5.0;
const DESCRIPTION_WIDTH: usize = 55;
const PARTY_WIDTH: usize = 30;

// Box the logo is scaled into
const LOGO_WIDTH: f32 = 50.0;
const LOGO_HEIGHT: f32 = 20.0;

const COL_QTY: f32 = 120.0;
const COL_RATE: f32 = 143.0;
const COL_AMOUNT: f32 = 170.0;
const COL_LABEL: f32 = 120.0;

/// Writes invoice PDFs into one output directory
#[derive(Debug, Clone)]
pub struct InvoiceGenerator {
    output_dir: PathBuf,
}

/// An in-memory PDF, ready to be written out
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
    /// Lowest baseline drawn on any page, in mm from the bottom edge
    pub lowest: f32,
}

impl InvoiceGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Render `invoice` and write it as `invoice_<number>_<date>.pdf`.
    ///
    /// The document is rendered completely before anything touches the disk,
    /// and the file only appears under its final name once fully written.
    pub fn export(&self, invoice: &InvoiceState, today: NaiveDate) -> Result<PathBuf, ExportError> {
        let rendered = render_pdf(invoice)?;

        let path = self.output_dir.join(export_file_name(&invoice.invoice_number, today));
        let partial = path.with_extension("pdf.part");

        let written = fs::create_dir_all(&self.output_dir)
            .and_then(|_| fs::write(&partial, &rendered.bytes))
            .and_then(|_| fs::rename(&partial, &path));

        if let Err(source) = written {
            let _ = fs::remove_file(&partial);
            error!(path = %path.display(), error = %source, "Failed to write PDF");
            return Err(ExportError::Write { path, source });
        }

        debug!(lowest = rendered.lowest, "Lowest baseline on any page");
        info!(path = %path.display(), pages = rendered.pages, "Invoice exported");
        Ok(path)
    }
}

/// `invoice_<number without '#'>_<YYYY-MM-DD>.pdf`, safe for any file system
pub fn export_file_name(invoice_number: &str, today: NaiveDate) -> String {
    let number = sanitize_filename(&invoice_number.replace('#', ""));
    format!("invoice_{}_{}.pdf", number, today.format("%Y-%m-%d"))
}

fn sanitize_filename(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.' { ch } else { '_' })
        .collect();

    if cleaned.is_empty() {
        "invoice".to_string()
    } else {
        cleaned
    }
}

/// Lay the invoice out over as many A4 pages as it needs.
pub fn render_pdf(invoice: &InvoiceState) -> Result<RenderedPdf, ExportError> {
    let title = invoice.heading("title", "INVOICE");
    let mut page = PageWriter::new(title)?;
    let totals = invoice.totals();
    let currency = invoice.currency.code();

    // Header
    if let Some(image) = invoice.logo.as_ref().and_then(logo_image) {
        page.logo(image);
    }
    page.text(title, 22.0, LEFT, true);
    page.text(&invoice.invoice_number, 12.0, 140.0, true);
    page.advance(12.0);

    let mut details = vec![
        format!("Invoice Date: {}", invoice.invoice_date.format("%Y-%m-%d")),
        format!("Due Date: {}", invoice.due_date.format("%Y-%m-%d")),
        format!("Payment Terms: Net {}", invoice.payment_terms.days()),
    ];
    if !invoice.po_number.trim().is_empty() {
        details.push(format!("PO Number: {}", invoice.po_number.trim()));
    }
    for detail in &details {
        page.text(detail, 10.0, 140.0, false);
        page.advance(LINE);
    }
    page.advance(4.0);
    page.rule();
    page.advance(8.0);

    // Parties
    let parties = [
        (invoice.heading("bill_from", "Bill From"), &invoice.bill_from, LEFT),
        (invoice.heading("bill_to", "Bill To"), &invoice.bill_to, 80.0),
        (invoice.heading("ship_to", "Ship To"), &invoice.ship_to, 140.0),
    ];
    let columns: Vec<PartyColumn> = parties
        .iter()
        .map(|(heading, text, x)| PartyColumn {
            heading: *heading,
            lines: text.lines().flat_map(|line| wrap(line, PARTY_WIDTH)).collect(),
            x: *x,
        })
        .collect();
    let rows = columns.iter().map(|column| column.lines.len()).max().unwrap_or(0);

    // Keep the headings with at least a few of their lines
    page.ensure_space(6.0 + LINE * rows.min(3) as f32);
    page.party_headings(&columns);
    for row in 0..rows {
        if page.ensure_space(LINE) {
            page.party_headings(&columns);
        }
        for column in &columns {
            if let Some(line) = column.lines.get(row) {
                page.text(line, 10.0, column.x, false);
            }
        }
        page.advance(LINE);
    }
    page.advance(8.0);

    // Line items
    page.table_header();
    for item in &invoice.items {
        let lines = wrap(&item.description, DESCRIPTION_WIDTH);
        let height = LINE * lines.len().max(1) as f32 + 1.5;
        if page.ensure_space(height) {
            page.table_header();
        }

        page.text(lines.first().map(String::as_str).unwrap_or(""), 10.0, LEFT, false);
        page.text(&trim_number(item.quantity), 10.0, COL_QTY, false);
        page.text(&format_money(item.rate), 10.0, COL_RATE, false);
        page.text(&format_money(item.amount()), 10.0, COL_AMOUNT, true);
        for line in lines.iter().skip(1) {
            page.advance(LINE);
            page.text(line, 10.0, LEFT, false);
        }
        page.advance(LINE + 1.5);
    }
    page.rule();
    page.advance(8.0);

    // Totals
    let summary = [
        ("Subtotal".to_string(), totals.subtotal, false),
        (adjustment_label("Tax", &invoice.tax), totals.tax, false),
        (adjustment_label("Discount", &invoice.discount), -totals.discount, false),
        (adjustment_label("Shipping", &invoice.shipping), totals.shipping, false),
        ("Total".to_string(), totals.total, true),
        ("Amount Paid".to_string(), totals.amount_paid, false),
        ("Balance Due".to_string(), totals.balance, true),
    ];
    page.ensure_space(6.0 * summary.len() as f32);
    for (label, amount, bold) in &summary {
        page.text(label, 11.0, COL_LABEL, *bold);
        page.text(&format!("{} {}", format_money(*amount), currency), 11.0, 160.0, *bold);
        page.advance(6.0);
    }

    // Notes and terms
    for (heading, text) in [
        (invoice.heading("notes", "Notes"), &invoice.notes),
        (invoice.heading("terms", "Terms"), &invoice.terms),
    ] {
        if text.trim().is_empty() {
            continue;
        }
        page.advance(6.0);
        page.ensure_space(6.0 + LINE);
        page.text(heading, 11.0, LEFT, true);
        page.advance(6.0);
        for line in text.lines().flat_map(|line| wrap(line, 95)) {
            page.ensure_space(LINE);
            page.text(&line, 10.0, LEFT, false);
            page.advance(LINE);
        }
    }

    page.finish()
}

/// Decode the stored logo for embedding. Formats the PDF writer cannot
/// decode (SVG, WebP) are left out of the document.
fn logo_image(logo: &Logo) -> Option<Image> {
    let bytes = match STANDARD.decode(&logo.data) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "Logo payload is not valid base64, leaving it out of the PDF");
            return None;
        }
    };

    match image_crate::load_from_memory(&bytes) {
        Ok(decoded) => Some(Image::from_dynamic_image(&DynamicImage::ImageRgb8(decoded.to_rgb8()))),
        Err(err) => {
            warn!(media_type = %logo.media_type, error = %err, "Logo left out of the PDF");
            None
        }
    }
}

fn adjustment_label(name: &str, setting: &AdjustmentSetting) -> String {
    match setting {
        AdjustmentSetting::Percentage(percent) => format!("{name} ({}%)", trim_number(*percent)),
        AdjustmentSetting::FixedAmount(_) => name.to_string(),
    }
}

fn trim_number(value: f64) -> String {
    let fixed = format!("{value:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Greedy word wrap by character count. Always yields at least one line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            lines.push(head);
        }

        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

struct PartyColumn<'a> {
    heading: &'a str,
    lines: Vec<String>,
    x: f32,
}

/// Cursor over the current page; breaks onto a fresh page when content
/// would run past the bottom margin.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
    lowest: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer);

        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ExportError::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ExportError::Render(e.to_string()))?;

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
            pages: 1,
            lowest: TOP,
        })
    }

    /// Starts a new page when `height` no longer fits. Returns true if it did.
    fn ensure_space(&mut self, height: f32) -> bool {
        if self.y - height >= BOTTOM {
            return false;
        }

        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
        self.pages += 1;
        true
    }

    fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    fn text(&mut self, text: &str, size: f32, x: f32, bold: bool) {
        self.lowest = self.lowest.min(self.y);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    /// Scale `image` into the logo box at the top left and move the
    /// cursor below it.
    fn logo(&mut self, image: Image) {
        let (width, height) = (image.image.width.0 as f32, image.image.height.0 as f32);
        if width == 0.0 || height == 0.0 {
            return;
        }

        // 25.4 mm per inch
        let dpi = (width * 25.4 / LOGO_WIDTH).max(height * 25.4 / LOGO_HEIGHT);
        let drawn_height = height / dpi * 25.4;
        let top = self.y + 8.0;

        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(LEFT)),
                translate_y: Some(Mm(top - drawn_height)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
        self.y = top - drawn_height - 10.0;
    }

    fn party_headings(&mut self, columns: &[PartyColumn]) {
        for column in columns {
            self.text(column.heading, 11.0, column.x, true);
        }
        self.advance(6.0);
    }

    fn rule(&mut self) {
        self.lowest = self.lowest.min(self.y);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(LEFT), Mm(self.y)), false),
                (Point::new(Mm(RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        });
    }

    fn table_header(&mut self) {
        self.ensure_space(12.0);
        self.text("Description", 10.0, LEFT, true);
        self.text("Qty", 10.0, COL_QTY, true);
        self.text("Rate", 10.0, COL_RATE, true);
        self.text("Amount", 10.0, COL_AMOUNT, true);
        self.advance(3.0);
        self.rule();
        self.advance(6.0);
    }

    fn finish(self) -> Result<RenderedPdf, ExportError> {
        let (pages, lowest) = (self.pages, self.lowest);
        let mut writer = BufWriter::new(Vec::<u8>::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| ExportError::Render(e.to_string()))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Render(e.to_string()))?;

        Ok(RenderedPdf { bytes, pages, lowest })
    }
}
