use anyhow::Result;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::models::{Draft, InvoiceState};

pub const DRAFTS_KEY: &str = "invoice_drafts";
pub const LAST_SAVED_KEY: &str = "last_saved_draft";

/// Draft collection plus the id of the draft this session writes to.
///
/// Saving is an upsert by that id: a session grows one draft rather than
/// producing versioned snapshots.
pub struct DraftStore {
    db: Database,
    drafts: Vec<Draft>,
    current_id: Option<String>,
}

impl DraftStore {
    /// Read the persisted collection. A collection that no longer parses is
    /// dropped (logged, not retried) and the store starts empty.
    pub async fn open(db: Database) -> Result<Self> {
        let drafts = match db.get_item(DRAFTS_KEY).await? {
            Some(raw) => match serde_json::from_str::<Vec<Draft>>(&raw) {
                Ok(drafts) => drafts,
                Err(err) => {
                    warn!(error = %err, bytes = raw.len(), "Stored draft collection is unreadable, starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        debug!(count = drafts.len(), "Drafts loaded");

        Ok(Self {
            db,
            drafts,
            current_id: None,
        })
    }

    pub fn list_drafts(&self) -> &[Draft] {
        &self.drafts
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Draft> {
        self.drafts.iter().find(|d| d.id == id)
    }

    /// Snapshot `state` into the session draft, creating it on first save.
    pub async fn save(&mut self, state: &InvoiceState) -> Result<Draft> {
        let id = self
            .current_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let draft = Draft {
            id: id.clone(),
            saved_at: Utc::now(),
            snapshot: state.clone(),
        };

        match self.drafts.iter_mut().find(|d| d.id == id) {
            Some(existing) => *existing = draft.clone(),
            None => self.drafts.push(draft.clone()),
        }
        self.current_id = Some(id.clone());

        let raw = serde_json::to_string(&self.drafts)?;
        self.db.set_item(DRAFTS_KEY, &raw).await?;
        self.db.set_item(LAST_SAVED_KEY, &id).await?;

        info!(draft_id = %id, drafts = self.drafts.len(), "Draft saved");
        Ok(draft)
    }

    /// Resume the most recently saved draft, if it still exists.
    pub async fn load_last(&mut self) -> Result<Option<InvoiceState>> {
        let Some(last_id) = self.db.get_item(LAST_SAVED_KEY).await? else {
            return Ok(None);
        };

        match self.open_draft(&last_id) {
            Some(state) => Ok(Some(state)),
            None => {
                debug!(draft_id = %last_id, "Last saved draft is gone");
                Ok(None)
            }
        }
    }

    /// Make `id` the session draft and return its snapshot.
    pub fn open_draft(&mut self, id: &str) -> Option<InvoiceState> {
        let snapshot = self.get(id)?.snapshot.clone();
        self.current_id = Some(id.to_string());
        Some(snapshot)
    }

    /// Next save creates a new draft instead of overwriting the current one.
    pub fn start_new(&mut self) {
        self.current_id = None;
    }

    /// Forget every draft and the last-saved pointer.
    pub async fn clear_all(&mut self) -> Result<()> {
        self.db.remove_item(DRAFTS_KEY).await?;
        self.db.remove_item(LAST_SAVED_KEY).await?;
        self.drafts.clear();
        self.current_id = None;

        info!("All drafts cleared");
        Ok(())
    }
}
