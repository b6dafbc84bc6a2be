mod adjustment;
mod draft;
mod invoice;
mod line_item;

pub use adjustment::{AdjustmentMode, AdjustmentSetting};
pub use draft::Draft;
pub use invoice::{generate_invoice_number, InvoiceState, Logo, PaymentTerms};
pub use line_item::LineItem;
