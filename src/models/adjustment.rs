use serde::{Deserialize, Serialize};

use super::line_item::finite_or_zero;
use crate::totals::round2;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentMode {
    Percentage,
    FixedAmount,
}

impl AdjustmentMode {
    pub fn other(self) -> Self {
        match self {
            AdjustmentMode::Percentage => AdjustmentMode::FixedAmount,
            AdjustmentMode::FixedAmount => AdjustmentMode::Percentage,
        }
    }
}

/// Tax, discount or shipping setting.
///
/// The mode and its value travel together, so there is a single source of
/// truth for the effective amount. Switching modes converts the value against
/// the current subtotal instead of keeping a second field in sync.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "mode", content = "value")]
pub enum AdjustmentSetting {
    Percentage(f64),
    FixedAmount(f64),
}

impl AdjustmentSetting {
    pub fn mode(&self) -> AdjustmentMode {
        match self {
            AdjustmentSetting::Percentage(_) => AdjustmentMode::Percentage,
            AdjustmentSetting::FixedAmount(_) => AdjustmentMode::FixedAmount,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            AdjustmentSetting::Percentage(value) | AdjustmentSetting::FixedAmount(value) => value,
        }
    }

    /// Same mode, new value.
    pub fn with_value(&self, value: f64) -> Self {
        match self {
            AdjustmentSetting::Percentage(_) => AdjustmentSetting::Percentage(value),
            AdjustmentSetting::FixedAmount(_) => AdjustmentSetting::FixedAmount(value),
        }
    }

    /// Effective amount against `subtotal`. Fixed amounts are not clamped.
    pub fn amount(&self, subtotal: f64) -> f64 {
        let subtotal = finite_or_zero(subtotal);
        match *self {
            AdjustmentSetting::Percentage(percent) => subtotal * (finite_or_zero(percent) / 100.0),
            AdjustmentSetting::FixedAmount(amount) => finite_or_zero(amount),
        }
    }

    /// The value expressed in the other mode: the amount for a percentage,
    /// the percentage for an amount (zero when there is no subtotal).
    pub fn counterpart(&self, subtotal: f64) -> f64 {
        match self {
            AdjustmentSetting::Percentage(_) => self.amount(subtotal),
            AdjustmentSetting::FixedAmount(_) => percent_of(self.amount(subtotal), subtotal),
        }
    }

    /// Converts to `mode`, preserving the effective amount at `subtotal`.
    /// Amounts keep full precision; percentages are kept to 2 decimals.
    pub fn switch_mode(&self, mode: AdjustmentMode, subtotal: f64) -> Self {
        if mode == self.mode() {
            return *self;
        }

        let amount = self.amount(subtotal);
        match mode {
            AdjustmentMode::FixedAmount => AdjustmentSetting::FixedAmount(amount),
            AdjustmentMode::Percentage => AdjustmentSetting::Percentage(round2(percent_of(amount, subtotal))),
        }
    }

    pub fn toggle_mode(&self, subtotal: f64) -> Self {
        self.switch_mode(self.mode().other(), subtotal)
    }
}

fn percent_of(amount: f64, subtotal: f64) -> f64 {
    let subtotal = finite_or_zero(subtotal);
    if subtotal == 0.0 {
        0.0
    } else {
        amount / subtotal * 100.0
    }
}
