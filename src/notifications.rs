use crate::api::models::Progress;
use crossterm::style::{Color, Stylize};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Short status messages on stderr, coloured for the active theme
#[derive(Debug, Clone, Copy)]
pub struct Notifier {
    dark_mode: bool,
}

impl Notifier {
    pub fn new(dark_mode: bool) -> Self {
        Self { dark_mode }
    }

    pub fn color_for(&self, kind: NotificationKind) -> Color {
        match (kind, self.dark_mode) {
            (NotificationKind::Success, false) => Color::DarkGreen,
            (NotificationKind::Success, true) => Color::Green,
            (NotificationKind::Error, false) => Color::DarkRed,
            (NotificationKind::Error, true) => Color::Red,
            (NotificationKind::Warning, false) => Color::DarkYellow,
            (NotificationKind::Warning, true) => Color::Yellow,
            (NotificationKind::Info, false) => Color::DarkCyan,
            (NotificationKind::Info, true) => Color::Cyan,
        }
    }

    pub fn notify(&self, kind: NotificationKind, message: &str) {
        let label = match kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        };
        let color = self.color_for(kind);
        eprintln!("{} {}", format!("[{}]", label).with(color).bold(), message);
    }

    pub fn success(&self, message: &str) {
        self.notify(NotificationKind::Success, message);
    }

    pub fn error(&self, message: &str) {
        self.notify(NotificationKind::Error, message);
    }

    pub fn warning(&self, message: &str) {
        self.notify(NotificationKind::Warning, message);
    }

    pub fn info(&self, message: &str) {
        self.notify(NotificationKind::Info, message);
    }

    /// Redraw the progress line in place. Nothing is drawn until the server
    /// knows how many units there are.
    pub fn progress(&self, progress: Progress) {
        if let Some(line) = format_progress(progress) {
            eprint!("\r{}", line.with(self.color_for(NotificationKind::Info)));
            let _ = std::io::stderr().flush();
        }
    }

    pub fn finish_progress(&self) {
        eprintln!();
    }
}

/// `42% (5/12)` with a 20-cell bar
pub fn format_progress(progress: Progress) -> Option<String> {
    let pct = progress.percentage()?;
    let filled = (pct as usize * 20) / 100;
    Some(format!(
        "[{}{}] {}% ({}/{})",
        "#".repeat(filled),
        "-".repeat(20 - filled),
        pct,
        progress.completed,
        progress.total
    ))
}
