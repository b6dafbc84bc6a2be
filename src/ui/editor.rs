use std::path::Path;

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use crate::logo::load_logo;
use crate::models::{generate_invoice_number, AdjustmentMode, AdjustmentSetting, InvoiceState, PaymentTerms};
use crate::totals::{format_money, parse_amount, round2};
use crate::ui::components::date_input::DateInputState;
use crate::ui::components::toast::Toast;

// Focusable parts of the form, in tab order
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    InvoiceNumber,
    InvoiceDate,
    DueDate,
    PaymentTerms,
    PoNumber,
    Title,
    Currency,
    Logo,
    BillFrom,
    BillTo,
    SameAsBilling,
    ShipTo,
    LineItems,
    Tax,
    Discount,
    Shipping,
    AmountPaid,
    Notes,
    Terms,
    SaveButton,
    ExportButton,
    AddItemButton,
}

impl Field {
    pub const ORDER: [Field; 22] = [
        Field::InvoiceNumber,
        Field::InvoiceDate,
        Field::DueDate,
        Field::PaymentTerms,
        Field::PoNumber,
        Field::Title,
        Field::Currency,
        Field::Logo,
        Field::BillFrom,
        Field::BillTo,
        Field::SameAsBilling,
        Field::ShipTo,
        Field::LineItems,
        Field::Tax,
        Field::Discount,
        Field::Shipping,
        Field::AmountPaid,
        Field::Notes,
        Field::Terms,
        Field::SaveButton,
        Field::ExportButton,
        Field::AddItemButton,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn previous(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    fn label(self) -> &'static str {
        match self {
            Field::InvoiceNumber => "Invoice #",
            Field::InvoiceDate => "Invoice Date",
            Field::DueDate => "Due Date",
            Field::PaymentTerms => "Payment Terms",
            Field::PoNumber => "PO Number",
            Field::Title => "Title",
            Field::Currency => "Currency",
            Field::Logo => "Logo",
            Field::BillFrom => "Bill From",
            Field::BillTo => "Bill To",
            Field::SameAsBilling => "Same as billing",
            Field::ShipTo => "Ship To",
            Field::LineItems => "Line Items",
            Field::Tax => "Tax",
            Field::Discount => "Discount",
            Field::Shipping => "Shipping",
            Field::AmountPaid => "Amount Paid",
            Field::Notes => "Notes",
            Field::Terms => "Terms",
            Field::SaveButton => "Save Draft",
            Field::ExportButton => "Export PDF",
            Field::AddItemButton => "Add Item",
        }
    }

    fn is_multiline(self) -> bool {
        matches!(
            self,
            Field::BillFrom | Field::BillTo | Field::ShipTo | Field::Notes | Field::Terms
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ItemColumn {
    Description,
    Quantity,
    Rate,
}

impl ItemColumn {
    fn next(self) -> Option<Self> {
        match self {
            ItemColumn::Description => Some(ItemColumn::Quantity),
            ItemColumn::Quantity => Some(ItemColumn::Rate),
            ItemColumn::Rate => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Target {
    Field(Field),
    Item { row: usize, column: ItemColumn },
}

// Text being typed. Applied to the invoice on every keystroke so totals
// stay live, except the invoice number which is only written normalized on
// commit; `original` is restored on cancel.
struct ActiveInput {
    target: Target,
    buffer: String,
    original: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EditorAction {
    /// The invoice changed; schedule an autosave
    Changed,
    /// Persist right away (number committed, item deleted, logo accepted)
    SaveNow,
    SaveDraft,
    ExportPdf,
    OpenDrafts,
    Quit,
}

pub struct EditorState {
    pub invoice: InvoiceState,
    focus: Field,
    input: Option<ActiveInput>,
    items_mode: bool,
    items_state: TableState,
    date_input: DateInputState,
    exporting: bool,
    status: Option<String>,
    notice: Option<Toast>,
}

impl EditorState {
    pub fn new(invoice: InvoiceState) -> Self {
        let date_input = DateInputState::new(invoice.invoice_date);
        let mut items_state = TableState::default();
        if !invoice.items.is_empty() {
            items_state.select(Some(0));
        }

        Self {
            invoice,
            focus: Field::InvoiceNumber,
            input: None,
            items_mode: false,
            items_state,
            date_input,
            exporting: false,
            status: None,
            notice: None,
        }
    }

    /// Swap in another invoice (opening a draft, starting over)
    pub fn replace_invoice(&mut self, invoice: InvoiceState) {
        *self = Self {
            exporting: self.exporting,
            ..Self::new(invoice)
        };
    }

    pub fn set_exporting(&mut self, exporting: bool) {
        self.exporting = exporting;
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Message produced by the last key, if any
    pub fn take_notice(&mut self) -> Option<Toast> {
        self.notice.take()
    }

    fn notify(&mut self, toast: Toast) {
        self.notice = Some(toast);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<EditorAction> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char(c) = key.code {
                return self.handle_shortcut(c.to_ascii_lowercase());
            }
        }

        if self.date_input.editing {
            return self.handle_date_key(key.code);
        }
        if self.input.is_some() {
            return self.handle_text_key(key.code);
        }
        if self.items_mode {
            return self.handle_items_key(key.code);
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.focus = self.focus.next();
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = self.focus.previous();
                None
            }
            KeyCode::Enter => self.activate(),
            KeyCode::Char(' ') => self.toggle(),
            KeyCode::Char('m') => self.toggle_adjustment_mode(),
            KeyCode::Delete if self.focus == Field::Logo && self.invoice.logo.is_some() => {
                self.invoice.logo = None;
                self.notify(Toast::warning("Logo removed"));
                Some(EditorAction::SaveNow)
            }
            KeyCode::Esc | KeyCode::Char('q') => Some(EditorAction::Quit),
            _ => None,
        }
    }

    fn handle_shortcut(&mut self, c: char) -> Option<EditorAction> {
        match c {
            's' => {
                self.finish_all_input();
                Some(EditorAction::SaveDraft)
            }
            'p' => {
                self.finish_all_input();
                Some(EditorAction::ExportPdf)
            }
            'n' => {
                self.finish_all_input();
                self.add_item()
            }
            'o' => {
                self.finish_all_input();
                Some(EditorAction::OpenDrafts)
            }
            'g' => {
                self.finish_all_input();
                let today = Local::now().date_naive();
                self.invoice.invoice_number = generate_invoice_number(today);
                self.notify(Toast::success("New invoice number generated"));
                Some(EditorAction::SaveNow)
            }
            'q' | 'c' => {
                self.finish_all_input();
                Some(EditorAction::Quit)
            }
            _ => None,
        }
    }

    // Commit whatever is being typed before a global command runs
    fn finish_all_input(&mut self) {
        if self.date_input.editing {
            self.date_input.stop_editing();
        }
        while self.input.is_some() {
            let target = self.input.as_ref().map(|input| input.target);
            self.finish_input();
            // item columns chain into the next column; stop after the last
            if let Some(Target::Item { .. }) = target {
                self.input = None;
            }
        }
    }

    fn activate(&mut self) -> Option<EditorAction> {
        match self.focus {
            Field::InvoiceDate => {
                self.date_input.start_editing(self.invoice.invoice_date);
                None
            }
            Field::DueDate => {
                self.date_input.start_editing(self.invoice.due_date);
                None
            }
            Field::ShipTo if self.invoice.same_as_billing => {
                self.notify(Toast::info("Ship To follows Bill To while \"Same as billing\" is on"));
                None
            }
            Field::LineItems => {
                self.items_mode = true;
                if self.items_state.selected().is_none() && !self.invoice.items.is_empty() {
                    self.items_state.select(Some(0));
                }
                None
            }
            Field::SameAsBilling | Field::Currency => self.toggle(),
            Field::SaveButton => Some(EditorAction::SaveDraft),
            Field::ExportButton => Some(EditorAction::ExportPdf),
            Field::AddItemButton => self.add_item(),
            field => {
                let text = self.field_text(field);
                self.start_input(Target::Field(field), text);
                None
            }
        }
    }

    fn toggle(&mut self) -> Option<EditorAction> {
        match self.focus {
            Field::SameAsBilling => {
                let same = !self.invoice.same_as_billing;
                self.invoice.set_same_as_billing(same);
                Some(EditorAction::Changed)
            }
            Field::Currency => {
                self.invoice.currency = self.invoice.currency.next();
                let code = self.invoice.currency.code();
                self.notify(Toast::success(format!("Currency changed to {code}")));
                Some(EditorAction::Changed)
            }
            Field::PaymentTerms => {
                let terms = self.invoice.payment_terms.next_preset();
                self.invoice.apply_payment_terms(terms);
                Some(EditorAction::Changed)
            }
            Field::SaveButton | Field::ExportButton | Field::AddItemButton => self.activate(),
            _ => None,
        }
    }

    fn toggle_adjustment_mode(&mut self) -> Option<EditorAction> {
        let subtotal = self.invoice.subtotal();
        let setting = match self.focus {
            Field::Tax => &mut self.invoice.tax,
            Field::Discount => &mut self.invoice.discount,
            Field::Shipping => &mut self.invoice.shipping,
            _ => return None,
        };
        *setting = setting.toggle_mode(subtotal);
        Some(EditorAction::Changed)
    }

    fn add_item(&mut self) -> Option<EditorAction> {
        let row = self.invoice.add_item();
        self.focus = Field::LineItems;
        self.items_mode = true;
        self.items_state.select(Some(row));
        self.start_input(
            Target::Item {
                row,
                column: ItemColumn::Description,
            },
            String::new(),
        );
        self.notify(Toast::success("New item added"));
        Some(EditorAction::Changed)
    }

    fn handle_date_key(&mut self, code: KeyCode) -> Option<EditorAction> {
        match code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Tab => {
                self.date_input.stop_editing();
                None
            }
            code => {
                if !self.date_input.handle_input(code) {
                    return None;
                }
                let date = self.date_input.date;
                if self.focus == Field::InvoiceDate {
                    self.invoice.invoice_date = date;
                    self.invoice.apply_payment_terms(self.invoice.payment_terms);
                } else {
                    self.invoice.due_date = date;
                }
                Some(EditorAction::Changed)
            }
        }
    }

    fn handle_text_key(&mut self, code: KeyCode) -> Option<EditorAction> {
        let multiline = matches!(
            self.input.as_ref().map(|input| input.target),
            Some(Target::Field(field)) if field.is_multiline()
        );

        match code {
            KeyCode::Char(c) => self.edit_buffer(|buffer| buffer.push(c)),
            KeyCode::Backspace => self.edit_buffer(|buffer| {
                buffer.pop();
            }),
            KeyCode::Enter if multiline => self.edit_buffer(|buffer| buffer.push('\n')),
            KeyCode::Enter | KeyCode::Tab => self.finish_input(),
            KeyCode::Esc if multiline => self.finish_input(),
            KeyCode::Esc => self.cancel_input(),
            _ => None,
        }
    }

    fn handle_items_key(&mut self, code: KeyCode) -> Option<EditorAction> {
        let len = self.invoice.items.len();
        match code {
            KeyCode::Up if len > 0 => {
                let i = match self.items_state.selected() {
                    Some(0) | None => len - 1,
                    Some(i) => i - 1,
                };
                self.items_state.select(Some(i));
                None
            }
            KeyCode::Down if len > 0 => {
                let i = match self.items_state.selected() {
                    Some(i) if i + 1 < len => i + 1,
                    _ => 0,
                };
                self.items_state.select(Some(i));
                None
            }
            KeyCode::Char('a') => self.add_item(),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(row) = self.items_state.selected().filter(|row| *row < len) {
                    let text = self.invoice.items[row].description.clone();
                    self.start_input(
                        Target::Item {
                            row,
                            column: ItemColumn::Description,
                        },
                        text,
                    );
                }
                None
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let row = self.items_state.selected()?;
                self.invoice.remove_item(row)?;
                let len = self.invoice.items.len();
                self.items_state
                    .select(if len == 0 { None } else { Some(row.min(len - 1)) });
                self.notify(Toast::warning("Item removed"));
                Some(EditorAction::SaveNow)
            }
            KeyCode::Esc | KeyCode::Tab => {
                self.items_mode = false;
                None
            }
            _ => None,
        }
    }

    fn start_input(&mut self, target: Target, text: String) {
        self.input = Some(ActiveInput {
            target,
            buffer: text.clone(),
            original: text,
        });
    }

    fn edit_buffer(&mut self, edit: impl FnOnce(&mut String)) -> Option<EditorAction> {
        let input = self.input.as_mut()?;
        edit(&mut input.buffer);
        let (target, text) = (input.target, input.buffer.clone());
        self.apply_text(target, &text)
    }

    fn cancel_input(&mut self) -> Option<EditorAction> {
        let input = self.input.take()?;
        if input.buffer == input.original {
            return None;
        }
        self.apply_text(input.target, &input.original)
    }

    fn finish_input(&mut self) -> Option<EditorAction> {
        let input = self.input.take()?;

        match input.target {
            Target::Field(Field::InvoiceNumber) => {
                self.invoice.set_invoice_number(&input.buffer);
                self.notify(Toast::success("Invoice number saved"));
                Some(EditorAction::SaveNow)
            }
            Target::Field(Field::Logo) => {
                let path = input.buffer.trim();
                if path.is_empty() {
                    return None;
                }
                match load_logo(Path::new(path)) {
                    Ok(logo) => {
                        self.invoice.logo = Some(logo);
                        self.notify(Toast::success("Logo uploaded successfully"));
                        Some(EditorAction::SaveNow)
                    }
                    Err(err) => {
                        self.notify(Toast::error(err.to_string()));
                        None
                    }
                }
            }
            Target::Item { row, column } => {
                if let Some(next) = column.next() {
                    let text = self
                        .invoice
                        .items
                        .get(row)
                        .map(|item| match next {
                            ItemColumn::Description => item.description.clone(),
                            ItemColumn::Quantity => number_text(item.quantity),
                            ItemColumn::Rate => number_text(item.rate),
                        })
                        .unwrap_or_default();
                    self.start_input(Target::Item { row, column: next }, text);
                }
                Some(EditorAction::Changed)
            }
            Target::Field(_) => Some(EditorAction::Changed),
        }
    }

    fn field_text(&self, field: Field) -> String {
        let invoice = &self.invoice;
        match field {
            Field::InvoiceNumber => invoice.invoice_number.clone(),
            Field::PaymentTerms => invoice.payment_terms.days().to_string(),
            Field::PoNumber => invoice.po_number.clone(),
            Field::Title => invoice.heading("title", "INVOICE").to_string(),
            Field::BillFrom => invoice.bill_from.clone(),
            Field::BillTo => invoice.bill_to.clone(),
            Field::ShipTo => invoice.ship_to.clone(),
            Field::Tax => setting_text(&invoice.tax),
            Field::Discount => setting_text(&invoice.discount),
            Field::Shipping => setting_text(&invoice.shipping),
            Field::AmountPaid => number_text(invoice.amount_paid),
            Field::Notes => invoice.notes.clone(),
            Field::Terms => invoice.terms.clone(),
            _ => String::new(),
        }
    }

    fn apply_text(&mut self, target: Target, text: &str) -> Option<EditorAction> {
        let invoice = &mut self.invoice;
        match target {
            Target::Field(field) => match field {
                Field::PaymentTerms => {
                    let days = parse_amount(text).clamp(0.0, 3650.0) as u32;
                    invoice.apply_payment_terms(PaymentTerms(days));
                }
                Field::PoNumber => invoice.po_number = text.to_string(),
                Field::Title => invoice.set_heading("title", text),
                Field::BillFrom => invoice.bill_from = text.to_string(),
                Field::BillTo => invoice.set_bill_to(text),
                Field::ShipTo => invoice.ship_to = text.to_string(),
                Field::Tax => invoice.tax = invoice.tax.with_value(parse_amount(text)),
                Field::Discount => invoice.discount = invoice.discount.with_value(parse_amount(text)),
                Field::Shipping => invoice.shipping = invoice.shipping.with_value(parse_amount(text)),
                Field::AmountPaid => invoice.amount_paid = parse_amount(text).max(0.0),
                Field::Notes => invoice.notes = text.to_string(),
                Field::Terms => invoice.terms = text.to_string(),
                // invoice number and logo path live in the buffer until committed
                _ => return None,
            },
            Target::Item { row, column } => {
                let item = invoice.items.get_mut(row)?;
                match column {
                    ItemColumn::Description => item.description = text.to_string(),
                    ItemColumn::Quantity => item.quantity = parse_amount(text),
                    ItemColumn::Rate => item.rate = parse_amount(text),
                }
            }
        }
        Some(EditorAction::Changed)
    }

    fn editing_buffer(&self, target: Target) -> Option<&str> {
        self.input
            .as_ref()
            .filter(|input| input.target == target)
            .map(|input| input.buffer.as_str())
    }
}

fn number_text(value: f64) -> String {
    format!("{value}")
}

// converted amounts carry full precision, the input shows cents
fn setting_text(setting: &AdjustmentSetting) -> String {
    match setting.mode() {
        AdjustmentMode::Percentage => number_text(setting.value()),
        AdjustmentMode::FixedAmount => number_text(round2(setting.value())),
    }
}

fn adjustment_text(setting: &AdjustmentSetting, subtotal: f64, symbol: &str) -> String {
    match setting.mode() {
        AdjustmentMode::Percentage => format!(
            "{}% = {symbol}{}",
            number_text(setting.value()),
            format_money(setting.counterpart(subtotal))
        ),
        AdjustmentMode::FixedAmount => format!(
            "{symbol}{} = {}%",
            format_money(setting.value()),
            format_money(setting.counterpart(subtotal))
        ),
    }
}

pub fn render_editor<B: Backend>(frame: &mut Frame<B>, state: &mut EditorState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3), // Title
                Constraint::Min(12),   // Form
                Constraint::Length(3), // Buttons
                Constraint::Length(3), // Help
            ]
            .as_ref(),
        )
        .split(frame.size());

    let mut title = vec![Span::styled(
        format!("Invoice Editor  {}", state.invoice.invoice_number),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if let Some(status) = &state.status {
        title.push(Span::styled(format!("   {status}"), Style::default().fg(Color::Gray)));
    }
    let title = Paragraph::new(Spans::from(title)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(42), Constraint::Percentage(58)].as_ref())
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(6)].as_ref())
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(6),
                Constraint::Length(9),
                Constraint::Length(6),
            ]
            .as_ref(),
        )
        .split(columns[1]);

    render_details(frame, state, left[0]);
    render_parties(frame, state, left[1]);
    render_items(frame, state, right[0]);
    render_totals(frame, state, right[1]);
    render_notes(frame, state, right[2]);
    render_buttons(frame, state, chunks[2]);

    let help = Paragraph::new(help_text(state))
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(help, chunks[3]);
}

fn help_text(state: &EditorState) -> &'static str {
    if state.date_input.editing {
        return "Digits - Type date part | Left/Right - Switch part | Enter - Done";
    }
    match state.input.as_ref().map(|input| input.target) {
        Some(Target::Item { .. }) => "Enter/Tab - Next column | Esc - Undo edit",
        Some(Target::Field(field)) if field.is_multiline() => "Enter - New line | Tab/Esc - Done",
        Some(Target::Field(_)) => "Enter - Save field | Esc - Cancel editing",
        None if state.items_mode => "A - Add item | E - Edit | D - Delete | Up/Down - Select | Esc - Done",
        None => {
            "Tab/Up/Down - Navigate | Enter - Edit | M - %/amount | Ctrl+S Save | Ctrl+P PDF | Ctrl+N Item | Ctrl+O Drafts | Ctrl+G New # | Q Quit"
        }
    }
}

fn label_style(state: &EditorState, field: Field) -> Style {
    if state.focus == field {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn field_spans(state: &EditorState, field: Field, value: String) -> Vec<Spans<'static>> {
    let value = match state.editing_buffer(Target::Field(field)) {
        Some(buffer) => format!("{buffer}|"),
        None => value,
    };

    let mut lines = value.split('\n');
    let first = lines.next().unwrap_or_default().to_string();
    let mut spans = vec![Spans::from(vec![
        Span::styled(format!("{}: ", field.label()), label_style(state, field)),
        Span::raw(first),
    ])];
    for line in lines {
        spans.push(Spans::from(Span::raw(format!("    {line}"))));
    }
    spans
}

fn date_value(state: &EditorState, field: Field, date: chrono::NaiveDate) -> String {
    if state.focus == field && state.date_input.editing {
        state.date_input.get_display_string()
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}

fn render_details<B: Backend>(frame: &mut Frame<B>, state: &EditorState, area: Rect) {
    let invoice = &state.invoice;
    let terms = if invoice.payment_terms.is_custom() {
        format!("Net {} (custom)", invoice.payment_terms.days())
    } else {
        format!("Net {}", invoice.payment_terms.days())
    };
    let logo = match &invoice.logo {
        Some(logo) => format!("{} ({} KB)", logo.media_type, logo.data.len() * 3 / 4 / 1024),
        None => "(none)".to_string(),
    };

    let mut lines = Vec::new();
    lines.extend(field_spans(state, Field::InvoiceNumber, invoice.invoice_number.clone()));
    lines.extend(field_spans(state, Field::InvoiceDate, date_value(state, Field::InvoiceDate, invoice.invoice_date)));
    lines.extend(field_spans(state, Field::DueDate, date_value(state, Field::DueDate, invoice.due_date)));
    lines.extend(field_spans(state, Field::PaymentTerms, terms));
    lines.extend(field_spans(state, Field::PoNumber, invoice.po_number.clone()));
    lines.extend(field_spans(state, Field::Title, invoice.heading("title", "INVOICE").to_string()));
    lines.extend(field_spans(
        state,
        Field::Currency,
        format!("{} ({})", invoice.currency.code(), invoice.currency.symbol()),
    ));
    lines.extend(field_spans(state, Field::Logo, logo));

    let details = Paragraph::new(lines).block(Block::default().title("Details").borders(Borders::ALL));
    frame.render_widget(details, area);
}

fn render_parties<B: Backend>(frame: &mut Frame<B>, state: &EditorState, area: Rect) {
    let invoice = &state.invoice;
    let checkbox = if invoice.same_as_billing { "[x]" } else { "[ ]" };

    let mut lines = Vec::new();
    lines.extend(field_spans(state, Field::BillFrom, invoice.bill_from.clone()));
    lines.extend(field_spans(state, Field::BillTo, invoice.bill_to.clone()));
    lines.extend(field_spans(state, Field::SameAsBilling, checkbox.to_string()));
    lines.extend(field_spans(state, Field::ShipTo, invoice.ship_to.clone()));

    let parties = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Parties").borders(Borders::ALL));
    frame.render_widget(parties, area);
}

fn render_items<B: Backend>(frame: &mut Frame<B>, state: &mut EditorState, area: Rect) {
    let symbol = state.invoice.currency.symbol();

    let header_cells = ["Description", "Qty", "Rate", "Amount"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows: Vec<Row> = state
        .invoice
        .items
        .iter()
        .enumerate()
        .map(|(row, item)| {
            let cell = |column: ItemColumn, value: String| match state.editing_buffer(Target::Item { row, column }) {
                Some(buffer) => Cell::from(format!("{buffer}|")).style(Style::default().fg(Color::Yellow)),
                None => Cell::from(value),
            };

            Row::new(vec![
                cell(ItemColumn::Description, item.description.clone()),
                cell(ItemColumn::Quantity, number_text(item.quantity)),
                cell(ItemColumn::Rate, format!("{symbol}{}", format_money(item.rate))),
                Cell::from(format!("{symbol}{}", format_money(item.amount()))),
            ])
        })
        .collect();

    let title = if state.items_mode {
        "Line Items (editing)"
    } else {
        "Line Items"
    };
    let border_style = if state.focus == Field::LineItems {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let table = Table::new(rows)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL).border_style(border_style))
        .highlight_style(if state.items_mode {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default()
        })
        .widths(&[
            Constraint::Percentage(46),
            Constraint::Percentage(12),
            Constraint::Percentage(20),
            Constraint::Percentage(22),
        ]);

    frame.render_stateful_widget(table, area, &mut state.items_state);
}

fn render_totals<B: Backend>(frame: &mut Frame<B>, state: &EditorState, area: Rect) {
    let invoice = &state.invoice;
    let totals = invoice.totals().rounded();
    let symbol = invoice.currency.symbol();
    let money = |value: f64| format!("{symbol}{}", format_money(value));

    let computed = |label: &str, value: f64, bold: bool| {
        let style = if bold {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        Spans::from(vec![
            Span::styled(format!("{label}: "), Style::default().fg(Color::Gray)),
            Span::styled(money(value), style),
        ])
    };

    let mut lines = vec![computed("Subtotal", totals.subtotal, false)];
    lines.extend(field_spans(state, Field::Tax, adjustment_text(&invoice.tax, totals.subtotal, symbol)));
    lines.extend(field_spans(
        state,
        Field::Discount,
        adjustment_text(&invoice.discount, totals.subtotal, symbol),
    ));
    lines.extend(field_spans(
        state,
        Field::Shipping,
        adjustment_text(&invoice.shipping, totals.subtotal, symbol),
    ));
    lines.push(computed("Total", totals.total, true));
    lines.extend(field_spans(state, Field::AmountPaid, money(invoice.amount_paid)));
    lines.push(computed("Balance Due", totals.balance, true));

    let panel = Paragraph::new(lines).block(Block::default().title("Totals").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn render_notes<B: Backend>(frame: &mut Frame<B>, state: &EditorState, area: Rect) {
    let mut lines = field_spans(state, Field::Notes, state.invoice.notes.clone());
    lines.extend(field_spans(state, Field::Terms, state.invoice.terms.clone()));

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title("Notes & Terms").borders(Borders::ALL));
    frame.render_widget(panel, area);
}

fn render_buttons<B: Backend>(frame: &mut Frame<B>, state: &EditorState, area: Rect) {
    let button = |field: Field, label: &str, disabled: bool| {
        let style = if disabled {
            Style::default().fg(Color::DarkGray)
        } else if state.focus == field {
            Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        Span::styled(format!("[ {label} ]"), style)
    };

    let export_label = if state.exporting {
        "Generating PDF..."
    } else {
        Field::ExportButton.label()
    };

    let buttons = Paragraph::new(Spans::from(vec![
        button(Field::SaveButton, Field::SaveButton.label(), false),
        Span::raw("  "),
        button(Field::ExportButton, export_label, state.exporting),
        Span::raw("  "),
        button(Field::AddItemButton, Field::AddItemButton.label(), false),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(buttons, area);
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn editor() -> EditorState {
        EditorState::new(InvoiceState::starter(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()))
    }

    fn press(state: &mut EditorState, code: KeyCode) -> Option<EditorAction> {
        state.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(state: &mut EditorState, c: char) -> Option<EditorAction> {
        state.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    fn type_text(state: &mut EditorState, text: &str) {
        for c in text.chars() {
            press(state, KeyCode::Char(c));
        }
    }

    fn is_idle(state: &EditorState) -> bool {
        state.input.is_none() && !state.date_input.editing && !state.items_mode
    }

    fn focus_on(state: &mut EditorState, field: Field) {
        while state.focus != field {
            press(state, KeyCode::Tab);
        }
    }

    #[test]
    fn tab_order_wraps() {
        assert_eq!(Field::AddItemButton.next(), Field::InvoiceNumber);
        assert_eq!(Field::InvoiceNumber.previous(), Field::AddItemButton);
    }

    #[test]
    fn invoice_number_is_normalized_on_commit() {
        let mut state = editor();
        press(&mut state, KeyCode::Enter);
        for _ in 0.."#INV-2023-001".len() {
            press(&mut state, KeyCode::Backspace);
        }
        type_text(&mut state, "INV-5");
        assert_eq!(state.invoice.invoice_number, "#INV-2023-001");

        assert_eq!(press(&mut state, KeyCode::Enter), Some(EditorAction::SaveNow));
        assert_eq!(state.invoice.invoice_number, "#INV-5");
        assert_eq!(state.take_notice().unwrap().message, "Invoice number saved");
    }

    #[test]
    fn ctrl_n_adds_a_row_and_starts_editing_it() {
        let mut state = editor();
        assert_eq!(ctrl(&mut state, 'n'), Some(EditorAction::Changed));
        assert_eq!(state.invoice.items.len(), 4);
        assert_eq!(state.focus, Field::LineItems);

        type_text(&mut state, "Logo design");
        press(&mut state, KeyCode::Enter);
        press(&mut state, KeyCode::Backspace);
        type_text(&mut state, "2");
        press(&mut state, KeyCode::Tab);
        press(&mut state, KeyCode::Backspace);
        type_text(&mut state, "150");
        press(&mut state, KeyCode::Enter);

        let item = &state.invoice.items[3];
        assert_eq!(item.description, "Logo design");
        assert_eq!(item.quantity, 2.0);
        assert_eq!(item.rate, 150.0);
        assert_eq!(state.invoice.subtotal(), 1790.0);
    }

    #[test]
    fn non_numeric_quantity_counts_as_zero() {
        let mut state = editor();
        focus_on(&mut state, Field::LineItems);
        press(&mut state, KeyCode::Enter);
        press(&mut state, KeyCode::Enter); // edit first row description
        press(&mut state, KeyCode::Tab); // to quantity
        press(&mut state, KeyCode::Backspace);
        press(&mut state, KeyCode::Backspace);
        type_text(&mut state, "ten");

        assert_eq!(state.invoice.items[0].quantity, 0.0);
        assert_eq!(state.invoice.subtotal(), 740.0);
    }

    #[test]
    fn escape_restores_the_original_value() {
        let mut state = editor();
        focus_on(&mut state, Field::AmountPaid);
        press(&mut state, KeyCode::Enter);
        type_text(&mut state, "00");
        assert_eq!(state.invoice.amount_paid, 0.0);

        press(&mut state, KeyCode::Backspace);
        press(&mut state, KeyCode::Backspace);
        press(&mut state, KeyCode::Backspace);
        type_text(&mut state, "250");
        assert_eq!(state.invoice.amount_paid, 250.0);

        press(&mut state, KeyCode::Esc);
        assert_eq!(state.invoice.amount_paid, 0.0);
        assert!(is_idle(&state));
    }

    #[test]
    fn mode_toggle_keeps_the_amount() {
        let mut state = editor();
        focus_on(&mut state, Field::Discount);
        press(&mut state, KeyCode::Enter);
        press(&mut state, KeyCode::Backspace);
        type_text(&mut state, "5");
        press(&mut state, KeyCode::Enter);
        assert_eq!(state.invoice.totals().discount, 74.5);

        assert_eq!(press(&mut state, KeyCode::Char('m')), Some(EditorAction::Changed));
        assert_eq!(state.invoice.discount, AdjustmentSetting::FixedAmount(74.5));
        assert_eq!(state.invoice.totals().discount, 74.5);

        press(&mut state, KeyCode::Char('m'));
        assert_eq!(state.invoice.discount, AdjustmentSetting::Percentage(5.0));
    }

    #[test]
    fn deleting_an_item_saves_immediately() {
        let mut state = editor();
        focus_on(&mut state, Field::LineItems);
        press(&mut state, KeyCode::Enter);
        press(&mut state, KeyCode::Down);

        assert_eq!(press(&mut state, KeyCode::Char('d')), Some(EditorAction::SaveNow));
        assert_eq!(state.invoice.items.len(), 2);
        assert_eq!(state.invoice.items[1].description, "Consultation Services");
    }

    #[test]
    fn shortcuts_commit_pending_input() {
        let mut state = editor();
        focus_on(&mut state, Field::PoNumber);
        press(&mut state, KeyCode::Enter);
        type_text(&mut state, "PO-9");

        assert_eq!(ctrl(&mut state, 's'), Some(EditorAction::SaveDraft));
        assert!(is_idle(&state));
        assert_eq!(state.invoice.po_number, "PO-9");
        assert_eq!(ctrl(&mut state, 'p'), Some(EditorAction::ExportPdf));
        assert_eq!(ctrl(&mut state, 'o'), Some(EditorAction::OpenDrafts));
    }

    #[test]
    fn buttons_mirror_the_shortcuts() {
        let mut state = editor();
        focus_on(&mut state, Field::SaveButton);
        assert_eq!(press(&mut state, KeyCode::Enter), Some(EditorAction::SaveDraft));
        press(&mut state, KeyCode::Tab);
        assert_eq!(press(&mut state, KeyCode::Enter), Some(EditorAction::ExportPdf));
        press(&mut state, KeyCode::Tab);
        assert_eq!(press(&mut state, KeyCode::Enter), Some(EditorAction::Changed));
        assert_eq!(state.invoice.items.len(), 4);
    }

    #[test]
    fn multiline_fields_take_newlines() {
        let mut state = editor();
        focus_on(&mut state, Field::BillTo);
        press(&mut state, KeyCode::Enter);
        type_text(&mut state, "Acme");
        press(&mut state, KeyCode::Enter);
        type_text(&mut state, "1 Main St");
        press(&mut state, KeyCode::Tab);

        assert_eq!(state.invoice.bill_to, "Acme\n1 Main St");
        assert!(is_idle(&state));
    }

    #[test]
    fn same_as_billing_toggles_with_space() {
        let mut state = editor();
        state.invoice.set_bill_to("Acme");
        focus_on(&mut state, Field::SameAsBilling);
        press(&mut state, KeyCode::Char(' '));
        assert!(state.invoice.same_as_billing);
        assert_eq!(state.invoice.ship_to, "Acme");

        press(&mut state, KeyCode::Tab);
        assert_eq!(press(&mut state, KeyCode::Enter), None);
        assert!(is_idle(&state));
    }

    #[test]
    fn payment_terms_cycle_updates_due_date() {
        let mut state = editor();
        focus_on(&mut state, Field::PaymentTerms);
        press(&mut state, KeyCode::Char(' '));
        assert_eq!(state.invoice.payment_terms, PaymentTerms(30));
        assert_eq!(state.invoice.due_date, NaiveDate::from_ymd_opt(2026, 11, 16).unwrap());
    }

    #[test]
    fn rejected_logo_leaves_state_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"plain text").unwrap();

        let mut state = editor();
        focus_on(&mut state, Field::Logo);
        press(&mut state, KeyCode::Enter);
        type_text(&mut state, path.to_str().unwrap());

        assert_eq!(press(&mut state, KeyCode::Enter), None);
        assert!(state.invoice.logo.is_none());
        let notice = state.take_notice().unwrap();
        assert!(notice.message.starts_with("Please select an image file"));
    }

    #[test]
    fn generated_number_replaces_the_current_one() {
        let mut state = editor();
        assert_eq!(ctrl(&mut state, 'g'), Some(EditorAction::SaveNow));
        assert!(state.invoice.invoice_number.starts_with("#INV-"));
        assert_ne!(state.invoice.invoice_number, "#INV-2023-001");
    }

    #[test]
    fn q_quits_only_when_idle() {
        let mut state = editor();
        focus_on(&mut state, Field::Notes);
        press(&mut state, KeyCode::Enter);
        assert_eq!(press(&mut state, KeyCode::Char('q')), Some(EditorAction::Changed));
        assert_eq!(state.invoice.notes, "q");
        press(&mut state, KeyCode::Esc);
        assert_eq!(press(&mut state, KeyCode::Char('q')), Some(EditorAction::Quit));
    }
}
