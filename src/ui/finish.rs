use super::common::help_line;
use crate::app::App;
use crate::encoder::FailureReason;
use crate::utils::format_file_size;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

pub fn render_finish(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .margin(1)
        .split(f.area());

    let Some(outcome) = &app.outcome else {
        return;
    };

    let (title, color, lines) = match &outcome.result {
        Ok(()) => {
            let mut detail = vec![
                Span::raw("File "),
                Span::styled(
                    outcome.destination.to_string_lossy().to_string(),
                    Style::default().fg(Color::Green),
                ),
                Span::raw(" is ready."),
            ];
            if let Some(size) = app.output_size {
                detail.push(Span::styled(
                    format!(" ({})", format_file_size(size)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            (" Success ", Color::Green, vec![Line::from(detail)])
        }
        Err(reason) => {
            let headline = match reason {
                FailureReason::CouldNotStart(_) => "Could not start the encoder for ",
                FailureReason::EncoderExited { .. } => "Failed to process ",
            };
            (
                " Error ",
                Color::Red,
                vec![
                    Line::from(vec![
                        Span::raw(headline),
                        Span::styled(
                            outcome.source.to_string_lossy().to_string(),
                            Style::default().fg(Color::Red),
                        ),
                    ]),
                    Line::from(""),
                    Line::from(Span::styled(
                        reason.to_string(),
                        Style::default().fg(Color::DarkGray),
                    )),
                ],
            )
        }
    };

    let summary = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title)
                .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD)),
        );
    f.render_widget(summary, chunks[0]);

    let help = Paragraph::new(help_line(&[("Enter", "Continue"), ("q", "Quit")]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(help, chunks[1]);
}
