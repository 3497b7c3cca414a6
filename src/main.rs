mod app;
mod config;
mod encoder;
mod error;
mod ui;
mod utils;

use anyhow::{Context, Result};
use app::{App, ConfirmAction, Screen};
use clap::Parser;
use config::AppConfig;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use encoder::{EncoderSettings, Quality};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Compress sound files to small MP3s
#[derive(Parser, Debug)]
#[command(name = "kazait", version, about)]
struct Cli {
    /// Sound file to preselect
    file: Option<PathBuf>,

    /// Starting quality level (1-10)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=10))]
    quality: Option<u8>,

    /// Encoder executable to use instead of the configured one
    #[arg(long)]
    encoder: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = utils::init_logging();

    let config = AppConfig::load();
    let mut settings = EncoderSettings::from(&config);
    if let Some(binary) = cli.encoder {
        settings.binary = binary;
    }

    let quality = match cli.quality {
        Some(level) => Quality::new(level)?,
        None => config.default_quality(),
    };

    let encoder_found = utils::encoder_available(&settings.binary);
    if !encoder_found {
        warn!("Encoder {} could not be launched", settings.binary.display());
    }

    let mut app = App::new(config, settings, quality);
    match cli.file {
        Some(path) if path.is_file() => app.set_source(path),
        Some(path) => app.set_message(&format!("File not found: {}", path.display())),
        None => {}
    }
    if !encoder_found {
        app.set_message(&format!(
            "Encoder '{}' not found, compression will fail",
            app.encoder_settings.binary.display()
        ));
    }

    // Setup terminal
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("Exiting");
    res
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Pick up progress and completion from the encoder thread
        app.process_job_events();

        terminal.draw(|f| {
            match app.current_screen.clone() {
                Screen::Home => ui::render_home(f, app),
                Screen::FileExplorer => ui::render_explorer(f, &mut *app),
                Screen::Progress => ui::render_progress(f, app),
                Screen::Finish => ui::render_finish(f, app),
            }
            // Render confirmation dialog as overlay
            if app.confirm_dialog.is_some() {
                ui::render_confirm_dialog(f, app);
            }
        })?;

        // Handle input with timeout for progress updates
        if event::poll(Duration::from_millis(100))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            handle_key(app, key.code);
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyCode) {
    if app.confirm_dialog.is_some() {
        handle_confirm_dialog_key(app, key);
        return;
    }

    match app.current_screen {
        Screen::Home => handle_home_key(app, key),
        Screen::FileExplorer => handle_explorer_key(app, key),
        Screen::Progress => handle_progress_key(app, key),
        Screen::Finish => handle_finish_key(app, key),
    }
}

fn ask_exit(app: &mut App) {
    app.confirm_dialog = Some(ConfirmAction::ExitApp);
    app.confirm_selection = false; // Default to "No"
}

fn handle_confirm_dialog_key(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            if let Some(action) = app.confirm_dialog.take() {
                execute_confirm_action(app, action);
            }
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            app.confirm_dialog = None;
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Char('h') | KeyCode::Char('l') => {
            app.confirm_selection = !app.confirm_selection;
        }
        KeyCode::Enter => {
            if app.confirm_selection {
                if let Some(action) = app.confirm_dialog.take() {
                    execute_confirm_action(app, action);
                }
            } else {
                app.confirm_dialog = None;
            }
        }
        _ => {}
    }
}

fn execute_confirm_action(app: &mut App, action: ConfirmAction) {
    match action {
        ConfirmAction::ExitApp => {
            if app.encoding_active() {
                app.set_message("Cannot quit while encoding");
            } else {
                app.should_quit = true;
            }
        }
    }
}

fn handle_home_key(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('q') => ask_exit(app),
        KeyCode::Char('o') => {
            app.clear_message();
            app.navigate_to_explorer();
        }
        KeyCode::Left | KeyCode::Char('h') => app.quality_down(),
        KeyCode::Right | KeyCode::Char('l') => app.quality_up(),
        KeyCode::Char('d') => app.reset_quality(),
        KeyCode::Enter => app.start_job(),
        _ => {}
    }
}

fn handle_explorer_key(app: &mut App, key: KeyCode) {
    // Clear any message when user takes action
    app.clear_message();

    match key {
        KeyCode::Esc => app.navigate_to_home(),
        KeyCode::Up | KeyCode::Char('k') => app.explorer_move_up(),
        KeyCode::Down | KeyCode::Char('j') => app.explorer_move_down(),
        KeyCode::Enter | KeyCode::Char(' ') => app.select_explorer_entry(),
        _ => {}
    }
}

fn handle_progress_key(app: &mut App, key: KeyCode) {
    if let KeyCode::Char('q') | KeyCode::Esc = key {
        app.set_message("Cannot quit while encoding");
    }
}

fn handle_finish_key(app: &mut App, key: KeyCode) {
    match key {
        KeyCode::Char('q') => ask_exit(app),
        KeyCode::Enter => app.acknowledge_outcome(),
        _ => {}
    }
}
