use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;
use tracing::{error, info};

use toastr::app::{App, AppState};
use toastr::config::Config;
use toastr::modules::notifications::ToastVariant;
use toastr::{logging, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    let log_path = logging::init(&config.log)?;
    info!(config = ?config.path, log = ?log_path, expiry_ms = config.toasts.expiry_ms, "starting toastr");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&config);
    app.welcome();
    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = ?err, "event loop failed");
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(KeyEvent { code, modifiers, kind, .. }) = event::read()? {
                if kind != KeyEventKind::Press { continue; }
                match app.state {
                    AppState::Normal => match code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                            return Ok(())
                        }
                        KeyCode::Char('?') => { app.show_help = !app.show_help; }
                        KeyCode::Up | KeyCode::Char('k') => app.previous_item(),
                        KeyCode::Down | KeyCode::Char('j') => app.next_item(),
                        KeyCode::Char('n') => app.new_toast(ToastVariant::Default),
                        KeyCode::Char('e') => app.new_toast(ToastVariant::Destructive),
                        KeyCode::Char('d') => app.dismiss_selected(),
                        KeyCode::Char('D') => app.dismiss_all(),
                        KeyCode::Esc => app.show_help = false,
                        _ => {}
                    },
                    AppState::Input => match code {
                        KeyCode::Enter => {
                            if let Err(e) = app.submit_input() { app.report_error("Toast rejected", e); }
                        }
                        KeyCode::Esc => app.cancel_input(),
                        KeyCode::Backspace => app.input_backspace(),
                        KeyCode::Char(c) => app.input_char(c),
                        KeyCode::Left => app.input_move_left(),
                        KeyCode::Right => app.input_move_right(),
                        _ => {}
                    },
                }
            }
        }
    }
}
