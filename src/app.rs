use anyhow::{Result, bail};
use tokio::sync::{broadcast, watch};
use tracing::warn;

use crate::config::Config;
use crate::modules::{
    activity::{ActivityKind, ActivityLog},
    notifications::{Toast, ToastEvent, ToastOptions, ToastVariant, Toaster},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppState {
    Normal,
    Input,
}

pub struct App {
    pub state: AppState,
    pub selected_index: usize,
    pub input_buffer: String,
    pub input_cursor: usize,
    pub input_prompt: String,
    pub input_variant: ToastVariant,
    pub status_message: String,
    pub show_help: bool,

    pub toaster: Toaster,
    pub toasts: Vec<Toast>,
    pub activity: ActivityLog,
    toast_rx: watch::Receiver<Vec<Toast>>,
    events: broadcast::Receiver<ToastEvent>,
}

impl App {
    pub fn new(config: &Config) -> Self {
        let toaster = Toaster::new(&config.toasts);
        let toast_rx = toaster.subscribe();
        let events = toaster.events();

        Self {
            state: AppState::Normal,
            selected_index: 0,
            input_buffer: String::new(),
            input_cursor: 0,
            input_prompt: String::new(),
            input_variant: ToastVariant::Default,
            status_message: String::from("Press 'n' for a toast, 'e' for an error toast, '?' for help"),
            show_help: false,
            toaster,
            toasts: Vec::new(),
            activity: ActivityLog::new(),
            toast_rx,
            events,
        }
    }

    /// Pulls lifecycle events and the latest toast set into the view state.
    pub fn tick(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.activity.record(&event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "activity log fell behind toast events");
                }
                Err(_) => break,
            }
        }

        if self.toast_rx.has_changed().unwrap_or(false) {
            self.toasts = self.toast_rx.borrow_and_update().clone();
        }
        if self.selected_index >= self.toasts.len() {
            self.selected_index = self.toasts.len().saturating_sub(1);
        }
    }

    pub fn welcome(&mut self) {
        self.toaster.admit(
            ToastOptions::new()
                .title("Welcome to toastr")
                .description("Toasts disappear on their own, or press 'd' to dismiss"),
        );
    }

    pub fn next_item(&mut self) {
        let max = self.toasts.len();
        if max > 0 {
            self.selected_index = (self.selected_index + 1) % max;
        }
    }

    pub fn previous_item(&mut self) {
        let max = self.toasts.len();
        if max > 0 {
            self.selected_index = if self.selected_index == 0 { max - 1 } else { self.selected_index - 1 };
        }
    }

    pub fn new_toast(&mut self, variant: ToastVariant) {
        self.state = AppState::Input;
        self.input_variant = variant;
        self.input_prompt = match variant {
            ToastVariant::Default => "Toast (title|description): ".to_string(),
            ToastVariant::Destructive => "Error toast (title|description): ".to_string(),
        };
        self.input_buffer.clear();
        self.input_cursor = 0;
    }

    pub fn submit_input(&mut self) -> Result<()> {
        let options = parse_toast_input(&self.input_buffer, self.input_variant)?;
        let handle = self.toaster.admit(options);
        self.status_message = format!("Admitted {}", handle.id());
        self.cancel_input();
        Ok(())
    }

    pub fn cancel_input(&mut self) {
        self.state = AppState::Normal;
        self.input_buffer.clear();
        self.input_cursor = 0;
    }

    pub fn dismiss_selected(&mut self) {
        let Some(id) = self.toasts.get(self.selected_index).map(|t| t.id) else { return };
        if self.toaster.contains(id) {
            self.toaster.dismiss(Some(id));
            self.status_message = format!("Dismissed {}", id);
        } else {
            self.status_message = format!("{} already expired", id);
        }
        self.tick();
    }

    pub fn dismiss_all(&mut self) {
        let count = self.toaster.len();
        self.toaster.dismiss(None);
        self.status_message = format!("Dismissed {} toast(s)", count);
    }

    pub fn report_error(&mut self, context: &str, err: anyhow::Error) {
        let msg = format!("{}: {}", context, err);
        self.status_message = msg.clone();
        self.activity.push(context, msg, ActivityKind::Error);
    }

    pub fn input_char(&mut self, c: char) {
        let at = byte_offset(&self.input_buffer, self.input_cursor);
        self.input_buffer.insert(at, c);
        self.input_cursor += 1;
    }

    pub fn input_backspace(&mut self) {
        if self.input_cursor > 0 {
            let at = byte_offset(&self.input_buffer, self.input_cursor - 1);
            self.input_buffer.remove(at);
            self.input_cursor -= 1;
        }
    }

    pub fn input_move_left(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
        }
    }

    pub fn input_move_right(&mut self) {
        if self.input_cursor < self.input_buffer.chars().count() {
            self.input_cursor += 1;
        }
    }
}

fn byte_offset(s: &str, char_index: usize) -> usize {
    s.char_indices().nth(char_index).map(|(i, _)| i).unwrap_or(s.len())
}

/// Parses `title|description`. Either half may be blank, but not both.
pub fn parse_toast_input(input: &str, variant: ToastVariant) -> Result<ToastOptions> {
    let (title, description) = match input.split_once('|') {
        Some((title, description)) => (title.trim(), description.trim()),
        None => (input.trim(), ""),
    };
    if title.is_empty() && description.is_empty() {
        bail!("Empty toast. Use: title|description");
    }
    let mut options = ToastOptions::new().variant(variant);
    if !title.is_empty() {
        options = options.title(title);
    }
    if !description.is_empty() {
        options = options.description(description);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogConfig, ToastConfig};
    use std::path::PathBuf;

    fn app() -> App {
        let config = Config {
            path: PathBuf::from("config.toml"),
            toasts: ToastConfig::default(),
            log: LogConfig::default(),
        };
        App::new(&config)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.input_char(c);
        }
    }

    #[test]
    fn parse_splits_title_and_description() {
        let options = parse_toast_input(" Saved | All changes stored ", ToastVariant::Default).unwrap();
        assert_eq!(options.title.as_deref(), Some("Saved"));
        assert_eq!(options.description.as_deref(), Some("All changes stored"));

        let options = parse_toast_input("|only body", ToastVariant::Destructive).unwrap();
        assert_eq!(options.title, None);
        assert_eq!(options.description.as_deref(), Some("only body"));
        assert_eq!(options.variant, ToastVariant::Destructive);

        let options = parse_toast_input("just a title", ToastVariant::Default).unwrap();
        assert_eq!(options.title.as_deref(), Some("just a title"));
        assert_eq!(options.description, None);
    }

    #[test]
    fn parse_rejects_empty_input() {
        assert!(parse_toast_input("  | ", ToastVariant::Default).is_err());
        assert!(parse_toast_input("", ToastVariant::Default).is_err());
    }

    #[test]
    fn input_editing_handles_multibyte_chars() {
        let mut app = app();
        app.new_toast(ToastVariant::Default);
        type_text(&mut app, "héllo");
        app.input_move_left();
        app.input_backspace();
        app.input_char('L');
        assert_eq!(app.input_buffer, "hélLo");
        app.input_move_right();
        app.input_move_right();
        assert_eq!(app.input_cursor, 5);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn submit_admits_and_tick_syncs_view() {
        let mut app = app();
        app.new_toast(ToastVariant::Destructive);
        type_text(&mut app, "Failed|Disk full");
        app.submit_input().unwrap();
        app.tick();

        assert_eq!(app.state, AppState::Normal);
        assert_eq!(app.toasts.len(), 1);
        assert_eq!(app.toasts[0].variant, ToastVariant::Destructive);
        assert_eq!(app.activity.entries[0].kind, ActivityKind::Admitted);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn empty_submit_keeps_input_open() {
        let mut app = app();
        app.new_toast(ToastVariant::Default);
        assert!(app.submit_input().is_err());
        assert_eq!(app.state, AppState::Input);
        assert!(app.toaster.is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn dismiss_selected_clamps_selection() {
        let mut app = app();
        for title in ["A", "B", "C"] {
            app.toaster.admit(ToastOptions::new().title(title));
        }
        app.tick();
        app.previous_item();
        assert_eq!(app.selected_index, 2);

        app.dismiss_selected();
        app.tick();
        assert_eq!(app.toasts.len(), 2);
        assert_eq!(app.selected_index, 1);

        app.dismiss_all();
        app.tick();
        assert!(app.toasts.is_empty());
        assert_eq!(app.selected_index, 0);
        assert_eq!(app.activity.entries[0].title, "Cleared");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn dismissing_stale_selection_reports_expiry() {
        let mut app = app();
        app.welcome();
        app.tick();
        let id = app.toasts[0].id;

        tokio::time::sleep(app.toaster.expiry() + std::time::Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        app.dismiss_selected();

        assert_eq!(app.status_message, format!("{} already expired", id));
        assert!(app.toasts.is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn expired_toasts_leave_the_view() {
        let mut app = app();
        app.welcome();
        app.tick();
        assert_eq!(app.toasts.len(), 1);

        tokio::time::sleep(app.toaster.expiry() + std::time::Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        app.tick();
        assert!(app.toasts.is_empty());
        assert_eq!(app.activity.entries[0].kind, ActivityKind::Expired);
    }
}
