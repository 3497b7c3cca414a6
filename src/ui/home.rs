use super::common::{display_name, help_line};
use crate::app::App;
use crate::encoder::Quality;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

pub fn render_home(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .margin(2)
        .split(f.area());

    // Title
    let title = Paragraph::new("KaZait - MP3 Compressor")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(title, chunks[0]);

    // Source and destination
    let file_lines = match (&app.source, &app.destination_preview) {
        (Some(source), Some(destination)) => vec![
            Line::from(vec![
                Span::styled("Source: ", Style::default().fg(Color::DarkGray)),
                Span::raw(source.to_string_lossy().to_string()),
            ]),
            Line::from(vec![
                Span::styled("Output: ", Style::default().fg(Color::DarkGray)),
                Span::styled(display_name(destination), Style::default().fg(Color::Green)),
            ]),
        ],
        _ => vec![Line::from(Span::styled(
            "No file selected, press o to choose a sound file",
            Style::default().fg(Color::DarkGray),
        ))],
    };
    let files = Paragraph::new(file_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" File "),
    );
    f.render_widget(files, chunks[1]);

    // Quality slider
    let quality_title = if app.quality.is_default() {
        " Quality (recommended) ".to_string()
    } else {
        " Quality (d: back to recommended) ".to_string()
    };
    let quality = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(quality_title),
        )
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
        .ratio(f64::from(app.quality.level()) / f64::from(Quality::MAX))
        .label(format!("Lowest  {}  Highest", app.quality));
    f.render_widget(quality, chunks[2]);

    // Status message
    if let Some(msg) = &app.message {
        let message = Paragraph::new(msg.as_str())
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(message, chunks[3]);
    }

    // Help
    let mut keys = vec![("o", "Open file"), ("←→", "Quality")];
    if app.can_start() {
        keys.push(("Enter", "Compress"));
    }
    keys.push(("q", "Quit"));

    let help = Paragraph::new(help_line(&keys))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(help, chunks[5]);
}
