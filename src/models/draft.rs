use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::invoice::InvoiceState;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: String,
    pub saved_at: DateTime<Utc>,
    pub snapshot: InvoiceState,
}
