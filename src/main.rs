mod app;
mod autosave;
mod config;
mod db;
mod drafts;
mod error;
mod invoice_gen;
mod logo;
mod models;
mod totals;
mod ui;

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::app::AppState;
use crate::config::Config;
use crate::db::Database;
use crate::drafts::DraftStore;
use crate::invoice_gen::InvoiceGenerator;
use crate::models::{AdjustmentMode, AdjustmentSetting, InvoiceState};
use crate::totals::format_money;

#[derive(Parser)]
#[command(name = "invoice_editor", about = "Edit invoices in the terminal, keep drafts, export PDFs")]
struct Cli {
    /// Draft storage, overrides DATABASE_URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Directory for exported PDFs, overrides EXPORT_DIR
    #[arg(long, global = true)]
    export_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the editor (default)
    Edit,
    /// List saved drafts
    Drafts,
    /// Print the totals of a draft
    Totals {
        /// Draft id, defaults to the last saved draft
        #[arg(long)]
        draft: Option<String>,
    },
    /// Write a draft to PDF without opening the editor
    Export {
        /// Draft id, defaults to the last saved draft
        #[arg(long)]
        draft: Option<String>,
        /// Output directory
        #[arg(long)]
        out: Option<String>,
    },
    /// Delete every saved draft
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration, flags win over the environment
    let mut config = config::init()?;
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if let Some(dir) = cli.export_dir {
        config.export_dir = dir;
    }

    init_tracing(&config.log_file)?;

    let db = db::init(&config).await?;
    info!(database_url = %config.database_url(), "Draft storage opened");

    let result = match cli.command.unwrap_or(Commands::Edit) {
        Commands::Edit => run_editor(db.clone(), &config).await,
        Commands::Drafts => list_drafts(db.clone()).await,
        Commands::Totals { draft } => print_totals(db.clone(), draft.as_deref()).await,
        Commands::Export { draft, out } => {
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            export_draft(db.clone(), draft.as_deref(), dir).await
        }
        Commands::Clear { yes } => clear_drafts(db.clone(), yes).await,
    };

    db.close().await;
    result
}

/// Logs go to a file; the terminal belongs to the editor.
fn init_tracing(log_file: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("could not open log file {log_file}"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

async fn run_editor(db: Database, config: &Config) -> Result<()> {
    let mut app = AppState::new(db, config, Instant::now()).await?;

    // Setup terminal
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the main app loop, then save whatever is still pending
    let result = run_app(&mut terminal, &mut app).await;
    app.shutdown().await;

    // Restore terminal
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = &result {
        error!(error = %err, "Editor stopped");
        println!("Error: {}", err);
    }

    println!("Thanks for using Invoice Editor!");

    result
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut AppState) -> Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        let timeout = app.next_timeout(Instant::now());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key, Instant::now()).await;
                }
            }
        }

        app.tick(Instant::now()).await;

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

// Draft to work on from the command line: the named one, else the last saved
async fn resolve_draft(store: &mut DraftStore, id: Option<&str>) -> Result<InvoiceState> {
    match id {
        Some(id) => store
            .get(id)
            .map(|draft| draft.snapshot.clone())
            .with_context(|| format!("no draft with id {id}")),
        None => store
            .load_last()
            .await?
            .context("no saved draft yet, save one from the editor first"),
    }
}

async fn list_drafts(db: Database) -> Result<()> {
    let mut store = DraftStore::open(db).await?;
    store.load_last().await?;

    let drafts = store.list_drafts();
    if drafts.is_empty() {
        println!("No drafts saved yet.");
        return Ok(());
    }

    println!("  {:<36}  {:<19}  {:<20}  {:>16}", "ID", "SAVED", "INVOICE #", "TOTAL");
    for draft in drafts {
        let marker = if store.current_id() == Some(draft.id.as_str()) { "*" } else { " " };
        let snapshot = &draft.snapshot;
        let total = snapshot.totals().rounded().total;
        println!(
            "{} {:<36}  {:<19}  {:<20}  {:>12} {}",
            marker,
            draft.id,
            draft.saved_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            snapshot.invoice_number,
            format_money(total),
            snapshot.currency.code(),
        );
    }

    Ok(())
}

fn adjustment_label(name: &str, setting: &AdjustmentSetting) -> String {
    match setting.mode() {
        AdjustmentMode::Percentage => format!("{name} ({}%)", setting.value()),
        AdjustmentMode::FixedAmount => name.to_string(),
    }
}

async fn print_totals(db: Database, id: Option<&str>) -> Result<()> {
    let mut store = DraftStore::open(db).await?;
    let invoice = resolve_draft(&mut store, id).await?;
    let totals = invoice.totals().rounded();
    let symbol = invoice.currency.symbol();

    println!("Invoice {} ({})", invoice.invoice_number, invoice.currency.code());
    let lines = [
        ("Subtotal".to_string(), totals.subtotal),
        (adjustment_label("Tax", &invoice.tax), totals.tax),
        (adjustment_label("Discount", &invoice.discount), totals.discount),
        (adjustment_label("Shipping", &invoice.shipping), totals.shipping),
        ("Total".to_string(), totals.total),
        ("Amount Paid".to_string(), totals.amount_paid),
        ("Balance Due".to_string(), totals.balance),
    ];
    for (label, value) in lines {
        println!("  {:<20} {}{}", label, symbol, format_money(value));
    }

    Ok(())
}

async fn export_draft(db: Database, id: Option<&str>, out: String) -> Result<()> {
    let mut store = DraftStore::open(db).await?;
    let invoice = resolve_draft(&mut store, id).await?;

    let generator = InvoiceGenerator::new(out);
    let path = generator.export(&invoice, Local::now().date_naive())?;
    println!("PDF written to {}", path.display());

    Ok(())
}

async fn clear_drafts(db: Database, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to delete drafts without --yes");
    }

    let mut store = DraftStore::open(db).await?;
    let count = store.list_drafts().len();
    store.clear_all().await?;
    println!("Deleted {count} draft(s).");

    Ok(())
}
