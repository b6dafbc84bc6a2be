use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::adjustment::AdjustmentSetting;
use super::line_item::LineItem;
use crate::totals::{compute_totals, Totals};

pub const DEFAULT_INVOICE_NUMBER: &str = "#INV-2023-001";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    INR,
    AUD,
}

impl Currency {
    pub const ALL: [Currency; 7] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::CAD,
        Currency::INR,
        Currency::AUD,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::CAD => "CAD",
            Currency::INR => "INR",
            Currency::AUD => "AUD",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY => "¥",
            Currency::INR => "₹",
            Currency::USD | Currency::CAD | Currency::AUD => "$",
        }
    }

    pub fn next(&self) -> Self {
        let idx = Currency::ALL.iter().position(|c| c == self).unwrap_or(0);
        Currency::ALL[(idx + 1) % Currency::ALL.len()]
    }
}

/// Net payment terms in days.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct PaymentTerms(pub u32);

impl PaymentTerms {
    pub const PRESETS: [u32; 4] = [7, 15, 30, 60];

    pub fn days(&self) -> u32 {
        self.0
    }

    pub fn is_custom(&self) -> bool {
        !Self::PRESETS.contains(&self.0)
    }

    /// Next preset, wrapping. A custom value moves to the first preset.
    pub fn next_preset(&self) -> Self {
        let next = Self::PRESETS
            .iter()
            .position(|days| *days == self.0)
            .map(|idx| Self::PRESETS[(idx + 1) % Self::PRESETS.len()])
            .unwrap_or(Self::PRESETS[0]);
        PaymentTerms(next)
    }

    pub fn due_date(&self, invoice_date: NaiveDate) -> NaiveDate {
        invoice_date + Duration::days(i64::from(self.0))
    }
}

impl Default for PaymentTerms {
    fn default() -> Self {
        PaymentTerms(15)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Logo {
    pub media_type: String,
    /// Base64 image payload.
    pub data: String,
}

/// Everything the editor shows, and everything a draft snapshot persists.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceState {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub payment_terms: PaymentTerms,
    #[serde(default)]
    pub po_number: String,
    pub bill_from: String,
    pub bill_to: String,
    pub ship_to: String,
    pub same_as_billing: bool,
    #[serde(skip)]
    ship_to_before_mirror: Option<String>,
    pub items: Vec<LineItem>,
    pub currency: Currency,
    pub tax: AdjustmentSetting,
    pub discount: AdjustmentSetting,
    pub shipping: AdjustmentSetting,
    pub amount_paid: f64,
    pub notes: String,
    pub terms: String,
    pub logo: Option<Logo>,
    #[serde(default)]
    pub headings: BTreeMap<String, String>,
}

impl InvoiceState {
    /// The invoice shown when there is no draft to resume.
    pub fn starter(today: NaiveDate) -> Self {
        let payment_terms = PaymentTerms::default();

        Self {
            invoice_number: DEFAULT_INVOICE_NUMBER.to_string(),
            invoice_date: today,
            due_date: payment_terms.due_date(today),
            payment_terms,
            po_number: String::new(),
            bill_from: String::new(),
            bill_to: String::new(),
            ship_to: String::new(),
            same_as_billing: false,
            ship_to_before_mirror: None,
            items: starter_items(),
            currency: Currency::default(),
            tax: AdjustmentSetting::Percentage(0.0),
            discount: AdjustmentSetting::Percentage(0.0),
            shipping: AdjustmentSetting::FixedAmount(0.0),
            amount_paid: 0.0,
            notes: String::new(),
            terms: String::new(),
            logo: None,
            headings: BTreeMap::new(),
        }
    }

    pub fn totals(&self) -> Totals {
        compute_totals(&self.items, &self.tax, &self.discount, &self.shipping, self.amount_paid)
    }

    pub fn subtotal(&self) -> f64 {
        self.totals().subtotal
    }

    pub fn heading<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.headings.get(key).map(String::as_str).unwrap_or(default)
    }

    pub fn set_heading(&mut self, key: &str, text: &str) {
        self.headings.insert(key.to_string(), text.to_string());
    }

    /// Normalizes and stores a typed invoice number.
    pub fn set_invoice_number(&mut self, input: &str) {
        self.invoice_number = normalize_invoice_number(input);
    }

    pub fn apply_payment_terms(&mut self, terms: PaymentTerms) {
        self.payment_terms = terms;
        self.due_date = terms.due_date(self.invoice_date);
    }

    pub fn set_bill_to(&mut self, bill_to: &str) {
        self.bill_to = bill_to.to_string();
        if self.same_as_billing {
            self.ship_to = self.bill_to.clone();
        }
    }

    /// Mirrors the billing address into shipping, or restores the shipping
    /// address that was there before mirroring started.
    pub fn set_same_as_billing(&mut self, same: bool) {
        if same == self.same_as_billing {
            return;
        }

        self.same_as_billing = same;
        if same {
            self.ship_to_before_mirror = Some(self.ship_to.clone());
            self.ship_to = self.bill_to.clone();
        } else if let Some(original) = self.ship_to_before_mirror.take() {
            self.ship_to = original;
        }
    }

    pub fn add_item(&mut self) -> usize {
        self.items.push(LineItem::default());
        self.items.len() - 1
    }

    pub fn remove_item(&mut self, idx: usize) -> Option<LineItem> {
        if idx < self.items.len() {
            Some(self.items.remove(idx))
        } else {
            None
        }
    }
}

fn starter_items() -> Vec<LineItem> {
    vec![
        LineItem::new("Web Design Services", 10.0, 75.0),
        LineItem::new("Website Hosting (Annual)", 1.0, 240.0),
        LineItem::new("Consultation Services", 5.0, 100.0),
    ]
}

/// Ensures the `#` prefix. Blank input falls back to the default number.
pub fn normalize_invoice_number(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        DEFAULT_INVOICE_NUMBER.to_string()
    } else if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{trimmed}")
    }
}

/// `#INV-YYYY-MM-NNN` with a random suffix.
pub fn generate_invoice_number(today: NaiveDate) -> String {
    let suffix: u32 = rand::rng().random_range(1..=999);
    format!("#INV-{}-{:02}-{:03}", today.year(), today.month(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn invoice_numbers_get_a_hash_prefix() {
        assert_eq!(normalize_invoice_number("INV-5"), "#INV-5");
        assert_eq!(normalize_invoice_number("  INV-5 "), "#INV-5");
        assert_eq!(normalize_invoice_number("#INV-5"), "#INV-5");
    }

    #[test]
    fn blank_invoice_number_uses_default() {
        assert_eq!(normalize_invoice_number(""), "#INV-2023-001");
        assert_eq!(normalize_invoice_number("   "), "#INV-2023-001");
    }

    #[test]
    fn generated_numbers_embed_year_and_month() {
        let number = generate_invoice_number(day(2026, 3, 9));
        assert!(number.starts_with("#INV-2026-03-"), "{number}");
        let suffix: u32 = number.rsplit('-').next().unwrap().parse().unwrap();
        assert!((1..=999).contains(&suffix));
        assert_eq!(number.len(), "#INV-2026-03-001".len());
    }

    #[test]
    fn starter_invoice_has_seeded_items_and_zero_adjustments() {
        let invoice = InvoiceState::starter(day(2026, 10, 17));
        assert_eq!(invoice.invoice_number, DEFAULT_INVOICE_NUMBER);
        assert_eq!(invoice.items.len(), 3);
        assert_eq!(invoice.due_date, day(2026, 11, 1));
        assert_eq!(invoice.tax, AdjustmentSetting::Percentage(0.0));
        assert_eq!(invoice.shipping, AdjustmentSetting::FixedAmount(0.0));
        assert_eq!(invoice.subtotal(), 1490.0);
    }

    #[test]
    fn payment_terms_move_the_due_date() {
        let mut invoice = InvoiceState::starter(day(2026, 1, 25));
        invoice.apply_payment_terms(PaymentTerms(30));
        assert_eq!(invoice.due_date, day(2026, 2, 24));
        assert!(!invoice.payment_terms.is_custom());

        invoice.apply_payment_terms(PaymentTerms(45));
        assert!(invoice.payment_terms.is_custom());
        assert_eq!(invoice.payment_terms.next_preset(), PaymentTerms(7));
    }

    #[test]
    fn same_as_billing_mirrors_and_restores() {
        let mut invoice = InvoiceState::starter(day(2026, 1, 1));
        invoice.ship_to = "Warehouse 9".to_string();
        invoice.set_bill_to("Acme Corp\n1 Main St");

        invoice.set_same_as_billing(true);
        assert_eq!(invoice.ship_to, "Acme Corp\n1 Main St");

        invoice.set_bill_to("Acme Corp\n2 Main St");
        assert_eq!(invoice.ship_to, "Acme Corp\n2 Main St");

        invoice.set_same_as_billing(false);
        assert_eq!(invoice.ship_to, "Warehouse 9");
    }

    #[test]
    fn currency_cycles_through_all_codes() {
        let mut currency = Currency::USD;
        for _ in 0..Currency::ALL.len() {
            currency = currency.next();
        }
        assert_eq!(currency, Currency::USD);
        assert_eq!(Currency::INR.symbol(), "₹");
        assert_eq!(Currency::CAD.symbol(), "$");
    }

    #[test]
    fn headings_fall_back_to_defaults() {
        let mut invoice = InvoiceState::starter(day(2026, 1, 1));
        assert_eq!(invoice.heading("title", "INVOICE"), "INVOICE");
        invoice.set_heading("title", "TAX INVOICE");
        assert_eq!(invoice.heading("title", "INVOICE"), "TAX INVOICE");
    }

    #[test]
    fn removing_out_of_range_item_is_ignored() {
        let mut invoice = InvoiceState::starter(day(2026, 1, 1));
        assert!(invoice.remove_item(10).is_none());
        assert_eq!(invoice.items.len(), 3);
        assert!(invoice.remove_item(0).is_some());
        assert_eq!(invoice.items.len(), 2);
    }
}
