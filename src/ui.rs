use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, AppState};
use crate::modules::activity::ActivityKind;
use crate::modules::notifications::{Toast, ToastVariant};

const TOAST_WIDTH: u16 = 44;
const TOAST_HEIGHT: u16 = 4;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(4),
        ])
        .split(f.area());

    draw_title(f, chunks[0], app);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);

    draw_active(f, app, main_chunks[0]);
    draw_activity(f, app, main_chunks[1]);
    draw_status(f, app, chunks[2]);

    draw_toast_stack(f, app, chunks[1]);

    if app.state == AppState::Input {
        draw_input_popup(f, app);
    } else if app.show_help {
        draw_help_popup(f);
    }
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let time_str = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let header = format!(
        "toastr | {} | active: {} | expiry: {}ms",
        time_str,
        app.toasts.len(),
        app.toaster.expiry().as_millis()
    );
    let title = Paragraph::new(header)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn toast_label(toast: &Toast) -> String {
    match (&toast.title, &toast.description) {
        (Some(title), Some(description)) => format!("{} - {}", title, description),
        (Some(text), None) | (None, Some(text)) => text.clone(),
        (None, None) => toast.id.to_string(),
    }
}

fn variant_color(variant: ToastVariant) -> Color {
    match variant {
        ToastVariant::Default => Color::Green,
        ToastVariant::Destructive => Color::Red,
    }
}

fn draw_active(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title("Active (d: dismiss, D: all)").borders(Borders::ALL);
    if app.toasts.is_empty() {
        f.render_widget(Paragraph::new("No active toasts").block(block), area);
        return;
    }

    let items: Vec<ListItem> = app
        .toasts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let style = if i == app.selected_index {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled("● ", Style::default().fg(variant_color(t.variant))),
                Span::raw(format!("[{}] {} ", t.created_at.format("%H:%M:%S"), t.id)),
                Span::raw(toast_label(t)),
            ]))
            .style(style)
        })
        .collect();
    f.render_widget(List::new(items).block(block), area);
}

fn draw_activity(f: &mut Frame, app: &App, area: Rect) {
    let window_height = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = app
        .activity
        .entries
        .iter()
        .take(window_height)
        .map(|e| {
            let color = match e.kind {
                ActivityKind::Admitted => Color::Green,
                ActivityKind::Dismissed => Color::Yellow,
                ActivityKind::Expired => Color::DarkGray,
                ActivityKind::Error => Color::Red,
            };
            let text = if e.message.is_empty() {
                format!("[{}] {}", e.timestamp.format("%H:%M:%S"), e.title)
            } else {
                format!("[{}] {} - {}", e.timestamp.format("%H:%M:%S"), e.title, e.message)
            };
            ListItem::new(text).style(Style::default().fg(color))
        })
        .collect();

    let block = Block::default().title("Activity").borders(Borders::ALL);
    if items.is_empty() {
        f.render_widget(Paragraph::new("Nothing yet").block(block), area);
    } else {
        f.render_widget(List::new(items).block(block), area);
    }
}

/// Renders toasts bottom-up in the lower right corner, newest at the bottom.
fn draw_toast_stack(f: &mut Frame, app: &App, area: Rect) {
    if area.width < TOAST_WIDTH + 2 {
        return;
    }
    let x = area.x + area.width - TOAST_WIDTH - 1;
    let mut bottom = area.y + area.height;

    for toast in app.toasts.iter().rev() {
        if bottom < area.y + TOAST_HEIGHT {
            break;
        }
        bottom -= TOAST_HEIGHT;
        let rect = Rect::new(x, bottom, TOAST_WIDTH, TOAST_HEIGHT);
        let color = variant_color(toast.variant);
        let body = toast.description.clone().unwrap_or_default();
        let widget = Paragraph::new(body)
            .block(
                Block::default()
                    .title(toast.title.clone().unwrap_or_default())
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            )
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, rect);
        f.render_widget(widget, rect);
    }
}

fn draw_status(f: &mut Frame, app: &App, area: Rect) {
    let help_text = match app.state {
        AppState::Normal => "q: Quit | n: New | e: New error | ↑↓/jk: Select | d: Dismiss | D: Dismiss all | ?: Help",
        AppState::Input => "Enter: Submit | Esc: Cancel | Format: title|description",
    };

    let status = Paragraph::new(vec![
        Line::from(app.status_message.as_str()),
        Line::from(help_text),
    ])
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

fn draw_input_popup(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 20, f.area());
    let border = variant_color(app.input_variant);
    let input_text = format!("{}{}", app.input_prompt, app.input_buffer);
    let input = Paragraph::new(input_text)
        .block(
            Block::default()
                .title("New toast")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(input, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn draw_help_popup(f: &mut Frame) {
    let area = centered_rect(60, 60, f.area());
    let help = "toastr Help\n\nKeys:\n  q / Ctrl-C: Quit\n  n: New toast\n  e: New error toast\n  j/k or ↑/↓: Select toast\n  d: Dismiss selected toast\n  D: Dismiss all toasts\n  ?: Toggle this help\n\nInput format: title|description (either part optional)\nToasts expire on their own after the configured delay.";

    let paragraph = Paragraph::new(help)
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, LogConfig, ToastConfig};
    use crate::modules::notifications::ToastOptions;
    use ratatui::{Terminal, backend::TestBackend};
    use std::path::PathBuf;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn renders_active_toasts() {
        let config = Config {
            path: PathBuf::from("config.toml"),
            toasts: ToastConfig::default(),
            log: LogConfig::default(),
        };
        let mut app = App::new(&config);
        app.toaster.admit(
            ToastOptions::new()
                .title("Deploy failed")
                .description("exit 1")
                .variant(ToastVariant::Destructive),
        );
        app.tick();

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Deploy failed"));
        assert!(text.contains("active: 1"));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn label_falls_back_to_id() {
        let toaster = crate::modules::notifications::Toaster::new(&ToastConfig::default());
        let handle = toaster.admit(ToastOptions::new());
        let toasts = toaster.toasts();
        assert_eq!(toast_label(&toasts[0]), handle.id().to_string());

        let handle = toaster.admit(ToastOptions::new().description("body"));
        assert_eq!(toast_label(&toaster.toasts()[1]), "body");
        handle.dismiss();
    }
}
