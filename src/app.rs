use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;
use crossterm::event::KeyEvent;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use tui::{backend::Backend, Frame};

use crate::autosave::AutosaveTimer;
use crate::config::Config;
use crate::db::Database;
use crate::drafts::DraftStore;
use crate::error::ExportError;
use crate::invoice_gen::InvoiceGenerator;
use crate::models::InvoiceState;
use crate::ui::components::toast::{render_toast, Toast, ToastState};
use crate::ui::drafts::{handle_input as handle_drafts_input, render_drafts, DraftsAction, DraftsState};
use crate::ui::editor::{render_editor, EditorAction, EditorState};

const IDLE_POLL: Duration = Duration::from_millis(250);
const EXPORT_POLL: Duration = Duration::from_millis(100);

type ExportJob = JoinHandle<Result<PathBuf, ExportError>>;

// Represents the current screen in the app
pub enum AppScreen {
    Editor,
    Drafts(DraftsState),
}

/// Owns the editor session: the invoice being edited, its draft, the
/// pending autosave and at most one running export.
pub struct AppState {
    store: DraftStore,
    editor: EditorState,
    screen: AppScreen,
    autosave: AutosaveTimer,
    toasts: ToastState,
    generator: InvoiceGenerator,
    export_job: Option<ExportJob>,
    should_quit: bool,
}

impl AppState {
    /// Open the draft store and resume the last saved draft, or start from
    /// the starter invoice when there is none.
    pub async fn new(db: Database, config: &Config, now: Instant) -> Result<Self> {
        let mut store = DraftStore::open(db).await?;
        let resumed = store.load_last().await?;
        let draft_count = store.list_drafts().len();

        let invoice = match resumed {
            Some(invoice) => {
                info!(invoice_number = %invoice.invoice_number, "Resumed last saved draft");
                invoice
            }
            None => InvoiceState::starter(Local::now().date_naive()),
        };

        let mut toasts = ToastState::default();
        let welcome = if draft_count > 0 {
            Toast::success(format!("{draft_count} draft(s) loaded"))
        } else {
            Toast::info("Welcome! Start creating your invoice.")
        };
        toasts.show(welcome, now);

        Ok(Self {
            store,
            editor: EditorState::new(invoice),
            screen: AppScreen::Editor,
            autosave: AutosaveTimer::new(config.autosave_delay()),
            toasts,
            generator: InvoiceGenerator::new(&config.export_dir),
            export_job: None,
            should_quit: false,
        })
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn editor(&self) -> &EditorState {
        &self.editor
    }

    pub fn render<B: Backend>(&mut self, frame: &mut Frame<B>) {
        match &mut self.screen {
            AppScreen::Editor => render_editor(frame, &mut self.editor),
            AppScreen::Drafts(state) => render_drafts(frame, state),
        }

        let area = frame.size();
        if let Some(toast) = self.toasts.current(Instant::now()) {
            render_toast(frame, area, toast);
        }
    }

    pub async fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if let AppScreen::Drafts(state) = &mut self.screen {
            if let Some(action) = handle_drafts_input(state, key.code) {
                self.handle_drafts_action(action, now);
            }
            return;
        }

        let action = self.editor.handle_key(key);
        if let Some(toast) = self.editor.take_notice() {
            self.toasts.show(toast, now);
        }
        if let Some(action) = action {
            self.handle_editor_action(action, now).await;
        }
    }

    /// Time-driven work: due autosaves, finished exports, expired toasts.
    pub async fn tick(&mut self, now: Instant) {
        if self.autosave.fire_if_due(now) {
            debug!("Autosave deadline reached");
            self.save(now, false).await;
        }

        if self.export_job.as_ref().is_some_and(|job| job.is_finished()) {
            if let Some(job) = self.export_job.take() {
                let result = job
                    .await
                    .unwrap_or_else(|err| Err(ExportError::Worker(err.to_string())));
                self.finish_export(result, now);
            }
        }

        self.toasts.expire(now);
    }

    /// How long the event loop may wait for input before `tick` has work.
    pub fn next_timeout(&self, now: Instant) -> Duration {
        let poll = if self.export_job.is_some() { EXPORT_POLL } else { IDLE_POLL };
        [self.autosave.time_until_due(now), self.toasts.time_until_expiry(now)]
            .into_iter()
            .flatten()
            .fold(poll, Duration::min)
    }

    /// Flush a pending autosave and let a running export finish.
    pub async fn shutdown(&mut self) {
        self.flush_autosave(Instant::now()).await;

        if let Some(job) = self.export_job.take() {
            let result = job
                .await
                .unwrap_or_else(|err| Err(ExportError::Worker(err.to_string())));
            self.finish_export(result, Instant::now());
        }
    }

    async fn handle_editor_action(&mut self, action: EditorAction, now: Instant) {
        match action {
            EditorAction::Changed => self.autosave.schedule(now),
            EditorAction::SaveNow => self.save(now, false).await,
            EditorAction::SaveDraft => self.save(now, true).await,
            EditorAction::ExportPdf => self.start_export(now),
            EditorAction::OpenDrafts => {
                self.flush_autosave(now).await;
                let drafts = self.store.list_drafts().to_vec();
                let current = self.store.current_id().map(str::to_string);
                self.screen = AppScreen::Drafts(DraftsState::new(drafts, current));
            }
            EditorAction::Quit => self.should_quit = true,
        }
    }

    fn handle_drafts_action(&mut self, action: DraftsAction, now: Instant) {
        match action {
            DraftsAction::Back => {}
            DraftsAction::New => {
                self.store.start_new();
                self.editor
                    .replace_invoice(InvoiceState::starter(Local::now().date_naive()));
                self.toasts.show(Toast::info("Started a new invoice"), now);
            }
            DraftsAction::Open(id) => match self.store.open_draft(&id) {
                Some(invoice) => {
                    info!(draft_id = %id, "Draft opened");
                    self.editor.replace_invoice(invoice);
                    self.toasts.show(Toast::success("Draft loaded"), now);
                }
                None => self.toasts.show(Toast::error("That draft no longer exists"), now),
            },
        }
        self.screen = AppScreen::Editor;
    }

    async fn flush_autosave(&mut self, now: Instant) {
        if self.autosave.is_pending() {
            self.save(now, false).await;
        }
    }

    // A failed save is reported and the session carries on; the edits stay
    // in memory for the next attempt.
    async fn save(&mut self, now: Instant, announce: bool) {
        self.autosave.cancel();
        match self.store.save(&self.editor.invoice).await {
            Ok(draft) => {
                let saved_at = draft.saved_at.with_timezone(&Local).format("%H:%M:%S");
                self.editor.set_status(format!("Saved {saved_at}"));
                if announce {
                    self.toasts.show(Toast::success("Draft saved successfully"), now);
                }
            }
            Err(err) => {
                error!(error = %err, "Draft save failed");
                self.editor.set_status("Not saved");
                self.toasts.show(Toast::error("Could not save the draft"), now);
            }
        }
    }

    fn start_export(&mut self, now: Instant) {
        if self.export_job.is_some() {
            self.toasts.show(Toast::info("PDF export already in progress"), now);
            return;
        }

        let invoice = self.editor.invoice.clone();
        let generator = self.generator.clone();
        let today = Local::now().date_naive();

        info!(invoice_number = %invoice.invoice_number, "PDF export started");
        self.editor.set_exporting(true);
        self.toasts.show(Toast::info("Generating PDF..."), now);
        self.export_job = Some(tokio::task::spawn_blocking(move || generator.export(&invoice, today)));
    }

    fn finish_export(&mut self, result: Result<PathBuf, ExportError>, now: Instant) {
        self.editor.set_exporting(false);
        match result {
            Ok(path) => {
                let message = format!("PDF downloaded successfully! ({})", path.display());
                self.toasts.show(Toast::success(message), now);
            }
            Err(err) => {
                error!(error = %err, "PDF export failed");
                self.toasts
                    .show(Toast::error("Failed to generate PDF. Please try again."), now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyModifiers};

    use super::*;

    fn config(export_dir: &std::path::Path) -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            export_dir: export_dir.to_string_lossy().into_owned(),
            autosave_delay_ms: 2000,
            log_file: "test.log".to_string(),
        }
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn toast_message(app: &AppState, now: Instant) -> Option<&str> {
        app.toasts.current(now).map(|toast| toast.message.as_str())
    }

    async fn app_with(db: Database, export_dir: &std::path::Path) -> AppState {
        AppState::new(db, &config(export_dir), Instant::now()).await.unwrap()
    }

    async fn wait_for_export(app: &mut AppState) {
        for _ in 0..200 {
            app.tick(Instant::now()).await;
            if !app.editor().is_exporting() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("export did not finish");
    }

    #[tokio::test]
    async fn edits_are_saved_once_input_goes_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Database::in_memory().await.unwrap(), dir.path()).await;
        let t0 = Instant::now();

        app.handle_key(ctrl('n'), t0).await;
        app.handle_key(key(KeyCode::Char('x')), t0 + Duration::from_millis(1500)).await;

        app.tick(t0 + Duration::from_millis(2500)).await;
        assert!(app.store.list_drafts().is_empty());

        app.tick(t0 + Duration::from_millis(3600)).await;
        assert_eq!(app.store.list_drafts().len(), 1);
        assert_eq!(app.store.list_drafts()[0].snapshot.items[3].description, "x");

        app.tick(t0 + Duration::from_secs(10)).await;
        assert_eq!(app.store.list_drafts().len(), 1);
    }

    #[tokio::test]
    async fn half_typed_invoice_number_is_never_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Database::in_memory().await.unwrap(), dir.path()).await;
        let t0 = Instant::now();
        let original = app.editor().invoice.invoice_number.clone();

        app.handle_key(key(KeyCode::Enter), t0).await;
        for _ in 0..original.len() {
            app.handle_key(key(KeyCode::Backspace), t0).await;
        }
        app.tick(t0 + Duration::from_millis(2100)).await;
        assert!(app.store.list_drafts().is_empty());
        assert_eq!(app.editor().invoice.invoice_number, original);

        app.handle_key(key(KeyCode::Char('9')), t0 + Duration::from_secs(3)).await;
        app.handle_key(key(KeyCode::Enter), t0 + Duration::from_secs(3)).await;
        let drafts = app.store.list_drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].snapshot.invoice_number, "#9");
    }

    #[tokio::test]
    async fn explicit_saves_upsert_one_draft() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Database::in_memory().await.unwrap(), dir.path()).await;
        let now = Instant::now();

        app.handle_key(ctrl('s'), now).await;
        app.handle_key(ctrl('n'), now).await;
        app.handle_key(ctrl('s'), now).await;

        assert_eq!(app.store.list_drafts().len(), 1);
        assert_eq!(app.store.list_drafts()[0].snapshot.items.len(), 4);
        assert!(!app.autosave.is_pending());
        assert_eq!(toast_message(&app, now), Some("Draft saved successfully"));
    }

    #[tokio::test]
    async fn restart_resumes_the_last_saved_draft() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::in_memory().await.unwrap();

        let mut app = app_with(db.clone(), dir.path()).await;
        app.handle_key(ctrl('g'), Instant::now()).await;
        let number = app.editor().invoice.invoice_number.clone();

        let now = Instant::now();
        let resumed = AppState::new(db, &config(dir.path()), now).await.unwrap();
        assert_eq!(resumed.editor().invoice.invoice_number, number);
        assert_eq!(toast_message(&resumed, now), Some("1 draft(s) loaded"));
    }

    #[tokio::test]
    async fn export_writes_the_pdf_in_the_background() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Database::in_memory().await.unwrap(), dir.path()).await;

        app.handle_key(ctrl('p'), Instant::now()).await;
        assert!(app.editor().is_exporting());
        assert!(app.next_timeout(Instant::now()) <= EXPORT_POLL);

        wait_for_export(&mut app).await;

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(files.len(), 1);
        let name = files[0].to_string_lossy().into_owned();
        assert!(name.starts_with("invoice_INV-2023-001_"), "{name}");
        assert!(toast_message(&app, Instant::now()).unwrap().starts_with("PDF downloaded successfully!"));
    }

    #[tokio::test]
    async fn failed_export_reports_and_reenables() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let mut app = app_with(Database::in_memory().await.unwrap(), &blocker).await;

        app.handle_key(ctrl('p'), Instant::now()).await;
        wait_for_export(&mut app).await;

        assert_eq!(
            toast_message(&app, Instant::now()),
            Some("Failed to generate PDF. Please try again.")
        );
        assert!(app.export_job.is_none());
    }

    #[tokio::test]
    async fn drafts_screen_can_start_a_new_invoice() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Database::in_memory().await.unwrap(), dir.path()).await;
        let now = Instant::now();

        app.handle_key(ctrl('n'), now).await;
        app.handle_key(ctrl('o'), now).await;
        // the pending edit was flushed before listing
        assert_eq!(app.store.list_drafts().len(), 1);
        assert!(matches!(app.screen, AppScreen::Drafts(_)));

        app.handle_key(key(KeyCode::Char('n')), now).await;
        assert!(matches!(app.screen, AppScreen::Editor));
        assert_eq!(app.store.current_id(), None);
        assert_eq!(app.editor().invoice.items.len(), 3);

        app.handle_key(ctrl('s'), now).await;
        assert_eq!(app.store.list_drafts().len(), 2);
    }

    #[tokio::test]
    async fn shutdown_flushes_a_pending_autosave() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(Database::in_memory().await.unwrap(), dir.path()).await;

        app.handle_key(ctrl('n'), Instant::now()).await;
        app.handle_key(ctrl('q'), Instant::now()).await;
        assert!(app.should_quit());

        app.shutdown().await;
        assert_eq!(app.store.list_drafts().len(), 1);
    }
}
