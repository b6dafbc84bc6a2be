use crossterm::event::KeyCode;
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::models::Draft;
use crate::totals::format_money;

// Represents the state of the saved drafts screen
pub struct DraftsState {
    drafts: Vec<Draft>,
    current_id: Option<String>,
    table_state: TableState,
}

impl DraftsState {
    pub fn new(mut drafts: Vec<Draft>, current_id: Option<String>) -> Self {
        // newest first
        drafts.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));

        let mut table_state = TableState::default();
        let selected = current_id
            .as_deref()
            .and_then(|id| drafts.iter().position(|d| d.id == id))
            .or(if drafts.is_empty() { None } else { Some(0) });
        table_state.select(selected);

        Self {
            drafts,
            current_id,
            table_state,
        }
    }

    pub fn next(&mut self) {
        if self.drafts.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) if i + 1 < self.drafts.len() => i + 1,
            _ => 0,
        };
        self.table_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.drafts.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(0) | None => self.drafts.len() - 1,
            Some(i) => i - 1,
        };
        self.table_state.select(Some(i));
    }

    pub fn selected_draft(&self) -> Option<&Draft> {
        self.table_state.selected().and_then(|i| self.drafts.get(i))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DraftsAction {
    Back,
    New,
    Open(String),
}

pub fn render_drafts<B: Backend>(frame: &mut Frame<B>, state: &mut DraftsState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(1), Constraint::Length(3)].as_ref())
        .split(frame.size());

    let header_cells = ["", "Draft", "Saved", "Invoice #", "Total"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let current = state.current_id.as_deref();
    let rows = state.drafts.iter().map(|draft| {
        let snapshot = &draft.snapshot;
        let total = snapshot.totals().rounded().total;
        let marker = if Some(draft.id.as_str()) == current { "*" } else { "" };

        Row::new(vec![
            Cell::from(marker),
            Cell::from(draft.id.chars().take(8).collect::<String>()),
            Cell::from(
                draft
                    .saved_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
            ),
            Cell::from(snapshot.invoice_number.clone()),
            Cell::from(format!(
                "{}{} {}",
                snapshot.currency.symbol(),
                format_money(total),
                snapshot.currency.code()
            )),
        ])
        .height(1)
    });

    let title = format!("Saved Drafts ({})", state.drafts.len());
    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .widths(&[
            Constraint::Length(2),
            Constraint::Percentage(15),
            Constraint::Percentage(30),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ]);

    frame.render_stateful_widget(table, chunks[0], &mut state.table_state);

    let buttons_text = if state.selected_draft().is_some() {
        "<Enter> Open Draft | <N> New Invoice | <Esc> Back"
    } else {
        "No drafts saved yet | <N> New Invoice | <Esc> Back"
    };

    let buttons = Paragraph::new(buttons_text)
        .block(Block::default().borders(Borders::TOP))
        .style(Style::default().fg(Color::White));

    frame.render_widget(buttons, chunks[1]);
}

pub fn handle_input(state: &mut DraftsState, code: KeyCode) -> Option<DraftsAction> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(DraftsAction::Back),
        KeyCode::Char('n') => Some(DraftsAction::New),
        KeyCode::Enter => state
            .selected_draft()
            .map(|draft| DraftsAction::Open(draft.id.clone())),
        KeyCode::Down => {
            state.next();
            None
        }
        KeyCode::Up => {
            state.previous();
            None
        }
        _ => None,
    }
}
