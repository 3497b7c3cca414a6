use super::common::{display_name, help_line};
use crate::app::App;
use crate::encoder::JobState;
use crate::utils::format_seconds;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

pub fn render_progress(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .margin(1)
        .split(f.area());

    let name = match &app.controller {
        Some(controller) => controller.job().source_name(),
        None => app.source.as_deref().map(display_name).unwrap_or_default(),
    };

    let title = Paragraph::new(format!("Working, please wait... ({})", name))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    f.render_widget(title, chunks[0]);

    // Elapsed / remaining / total
    let (elapsed, remaining, total) = match app.last_snapshot {
        Some(snap) => (
            format_seconds(snap.elapsed_secs),
            format_seconds(snap.remaining_secs),
            format_seconds(snap.total_estimate_secs),
        ),
        None => ("-".to_string(), "-".to_string(), "-".to_string()),
    };
    let times = Paragraph::new(vec![
        time_line("Elapsed", elapsed),
        time_line("Remaining", remaining),
        time_line("Total", total),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Time "),
    );
    f.render_widget(times, chunks[1]);

    // Gauge; no snapshot yet means the duration is unknown or nothing was encoded
    let gauge_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(gauge_title(app.job_state()));
    match app.last_snapshot {
        Some(snap) => {
            let gauge = Gauge::default()
                .block(gauge_block)
                .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray))
                .percent(u16::from(snap.percent))
                .label(format!("{}%", snap.percent));
            f.render_widget(gauge, chunks[2]);
        }
        None => {
            let waiting = Paragraph::new("Progress unknown, still encoding...")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(gauge_block);
            f.render_widget(waiting, chunks[2]);
        }
    }

    if let Some(msg) = &app.message {
        let message = Paragraph::new(msg.as_str())
            .style(Style::default().fg(Color::Yellow))
            .alignment(Alignment::Center);
        f.render_widget(message, chunks[3]);
    }

    let help = Paragraph::new(help_line(&[("", "The encoder cannot be interrupted")]))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(help, chunks[4]);
}

fn gauge_title(state: JobState) -> &'static str {
    match state {
        JobState::Idle => " Starting ",
        JobState::Running => " Encoding ",
        // Outcome arrives on the next tick
        JobState::Succeeded | JobState::Failed => " Finishing ",
    }
}

fn time_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" seconds"),
    ])
}
