use crate::models::{AdjustmentSetting, LineItem};

/// Result of one recompute. Fields carry full precision; call
/// [`Totals::rounded`] before display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub shipping: f64,
    pub total: f64,
    pub amount_paid: f64,
    pub balance: f64,
}

impl Totals {
    pub fn rounded(&self) -> Totals {
        Totals {
            subtotal: round2(self.subtotal),
            tax: round2(self.tax),
            discount: round2(self.discount),
            shipping: round2(self.shipping),
            total: round2(self.total),
            amount_paid: round2(self.amount_paid),
            balance: round2(self.balance),
        }
    }
}

pub fn subtotal(items: &[LineItem]) -> f64 {
    items.iter().map(LineItem::amount).sum()
}

/// Subtotal, adjustments, total and balance for an invoice.
///
/// Negative totals and balances pass through unchanged.
pub fn compute_totals(
    items: &[LineItem],
    tax: &AdjustmentSetting,
    discount: &AdjustmentSetting,
    shipping: &AdjustmentSetting,
    amount_paid: f64,
) -> Totals {
    let subtotal = subtotal(items);
    let tax = tax.amount(subtotal);
    let discount = discount.amount(subtotal);
    let shipping = shipping.amount(subtotal);
    let total = subtotal + tax - discount + shipping;
    let amount_paid = if amount_paid.is_finite() { amount_paid } else { 0.0 };

    Totals {
        subtotal,
        tax,
        discount,
        shipping,
        total,
        amount_paid,
        balance: total - amount_paid,
    }
}

pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // avoid printing "-0.00"
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Lenient parse for numeric form fields. Anything unparseable is zero.
pub fn parse_amount(input: &str) -> f64 {
    let cleaned: String = input
        .trim()
        .trim_start_matches(['$', '€', '£', '¥', '₹'])
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Two decimals with thousands separators, e.g. `-1,589.50`.
pub fn format_money(value: f64) -> String {
    let fixed = format!("{:.2}", round2(value).abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if round2(value) < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{dec_part}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items() -> Vec<LineItem> {
        vec![
            LineItem::new("Web Design Services", 10.0, 75.0),
            LineItem::new("Website Hosting (Annual)", 1.0, 240.0),
            LineItem::new("Consultation Services", 5.0, 100.0),
        ]
    }

    #[test]
    fn worked_example_totals() {
        let totals = compute_totals(
            &sample_items(),
            &AdjustmentSetting::Percentage(10.0),
            &AdjustmentSetting::Percentage(5.0),
            &AdjustmentSetting::FixedAmount(25.0),
            1000.0,
        )
        .rounded();

        assert_eq!(totals.subtotal, 1490.0);
        assert_eq!(totals.tax, 149.0);
        assert_eq!(totals.discount, 74.5);
        assert_eq!(totals.shipping, 25.0);
        assert_eq!(totals.total, 1589.5);
        assert_eq!(totals.amount_paid, 1000.0);
        assert_eq!(totals.balance, 589.5);
    }

    #[test]
    fn subtotal_sums_quantity_times_rate() {
        let items = vec![
            LineItem::new("a", 2.5, 4.2),
            LineItem::new("b", 3.0, 0.1),
            LineItem::new("c", 0.0, 99.0),
        ];
        let expected = 2.5 * 4.2 + 3.0 * 0.1 + 0.0 * 99.0;
        assert_eq!(subtotal(&items), expected);
    }

    #[test]
    fn unparseable_fields_count_as_zero() {
        let items = vec![
            LineItem::new("typed letters", parse_amount("abc"), 50.0),
            LineItem::new("valid", parse_amount("2"), parse_amount("$1,250.00")),
            LineItem::new("nan", f64::NAN, 10.0),
        ];
        assert_eq!(subtotal(&items), 2500.0);
    }

    #[test]
    fn total_identity_holds_for_every_mode_combination() {
        use AdjustmentSetting::{FixedAmount, Percentage};
        let items = sample_items();
        let settings = [Percentage(8.25), FixedAmount(13.37), Percentage(0.0), FixedAmount(0.0)];

        for tax in &settings {
            for discount in &settings {
                for shipping in &settings {
                    let t = compute_totals(&items, tax, discount, shipping, 0.0);
                    assert_eq!(t.total, t.subtotal + t.tax - t.discount + t.shipping);
                    assert_eq!(t.balance, t.total - t.amount_paid);
                }
            }
        }
    }

    #[test]
    fn totals_may_go_negative() {
        let totals = compute_totals(
            &[LineItem::new("small", 1.0, 10.0)],
            &AdjustmentSetting::Percentage(0.0),
            &AdjustmentSetting::FixedAmount(50.0),
            &AdjustmentSetting::FixedAmount(0.0),
            5.0,
        );
        assert_eq!(totals.total, -40.0);
        assert_eq!(totals.balance, -45.0);
    }

    #[test]
    fn empty_invoice_is_all_zero() {
        let totals = compute_totals(
            &[],
            &AdjustmentSetting::Percentage(10.0),
            &AdjustmentSetting::Percentage(5.0),
            &AdjustmentSetting::FixedAmount(0.0),
            0.0,
        );
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn rounding_happens_once_at_the_end() {
        // three items of 0.333 each: rounding per line would give 0.99
        let items = vec![LineItem::new("x", 1.0, 0.333); 3];
        let totals = compute_totals(
            &items,
            &AdjustmentSetting::Percentage(0.0),
            &AdjustmentSetting::Percentage(0.0),
            &AdjustmentSetting::FixedAmount(0.0),
            0.0,
        );
        assert_eq!(totals.rounded().subtotal, 1.0);
    }

    #[test]
    fn parse_amount_handles_noise() {
        assert_eq!(parse_amount(" 12.50 "), 12.5);
        assert_eq!(parse_amount("€1,000"), 1000.0);
        assert_eq!(parse_amount("-3"), -3.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("1.2.3"), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
    }

    #[test]
    fn money_formatting() {
        assert_eq!(format_money(1589.5), "1,589.50");
        assert_eq!(format_money(1234567.891), "1,234,567.89");
        assert_eq!(format_money(0.0), "0.00");
        assert_eq!(format_money(-40.0), "-40.00");
        assert_eq!(format_money(-0.001), "0.00");
        assert_eq!(format_money(999.999), "1,000.00");
    }
}
