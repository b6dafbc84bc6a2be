use std::time::{Duration, Instant};

use tui::{
    backend::Backend,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
}

/// A short notification shown over the editor
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

impl Toast {
    pub fn new(kind: ToastKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, message)
    }

    fn color(&self) -> Color {
        match self.kind {
            ToastKind::Info => Color::Cyan,
            ToastKind::Success => Color::Green,
            ToastKind::Warning => Color::Yellow,
            ToastKind::Error => Color::Red,
        }
    }
}

/// Holds the latest toast until it expires. A new toast replaces the old one.
#[derive(Debug)]
pub struct ToastState {
    ttl: Duration,
    current: Option<(Toast, Instant)>,
}

impl ToastState {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn show(&mut self, toast: Toast, now: Instant) {
        self.current = Some((toast, now + self.ttl));
    }

    pub fn current(&self, now: Instant) -> Option<&Toast> {
        match &self.current {
            Some((toast, expires)) if now < *expires => Some(toast),
            _ => None,
        }
    }

    pub fn expire(&mut self, now: Instant) {
        if self.current(now).is_none() {
            self.current = None;
        }
    }

    pub fn time_until_expiry(&self, now: Instant) -> Option<Duration> {
        self.current
            .as_ref()
            .map(|(_, expires)| expires.saturating_duration_since(now))
    }
}

impl Default for ToastState {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

pub fn render_toast<B: Backend>(frame: &mut Frame<B>, area: Rect, toast: &Toast) {
    let width = (toast.message.chars().count() as u16 + 4).clamp(20, area.width.max(20));
    let width = width.min(area.width);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width + 1),
        y: area.y + 1,
        width,
        height: 3.min(area.height),
    };

    let paragraph = Paragraph::new(toast.message.as_str())
        .style(Style::default().fg(toast.color()).add_modifier(Modifier::BOLD))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(Clear, popup);
    frame.render_widget(paragraph, popup);
}
