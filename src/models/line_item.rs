use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub quantity: f64,
    pub rate: f64,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: f64, rate: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            rate,
        }
    }

    /// Line amount. Non-finite quantity or rate counts as zero.
    pub fn amount(&self) -> f64 {
        finite_or_zero(self.quantity) * finite_or_zero(self.rate)
    }
}

impl Default for LineItem {
    // Fresh rows from "add item" start at one unit, zero rate
    fn default() -> Self {
        Self::new("", 1.0, 0.0)
    }
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
