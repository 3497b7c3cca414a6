use super::common::{display_name, help_line};
use crate::app::App;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use std::path::Path;

pub fn render_explorer(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .margin(1)
        .split(f.area());

    // Current path
    let path_text = app.current_dir.to_string_lossy();
    let path = Paragraph::new(path_text.as_ref())
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Left)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Current Directory "),
        );
    f.render_widget(path, chunks[0]);

    // File list
    let items: Vec<ListItem> = app
        .dir_entries
        .iter()
        .enumerate()
        .map(|(i, path)| create_entry_item(path, i == app.explorer_index))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Select Sound File "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
    f.render_stateful_widget(list, chunks[1], &mut app.explorer_list_state);

    // Help
    let help = Paragraph::new(help_line(&[
        ("↑↓", "Navigate"),
        ("Enter/Space", "Select"),
        ("Esc", "Back"),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::NONE));
    f.render_widget(help, chunks[2]);
}

fn create_entry_item(path: &Path, is_selected: bool) -> ListItem<'static> {
    let is_parent = path == Path::new("..");
    let is_dir = is_parent || path.is_dir();

    let (icon, color) = if is_parent {
        ("↑ ", Color::Yellow)
    } else if is_dir {
        ("▶ ", Color::Blue)
    } else {
        ("♪ ", Color::Green)
    };

    let style = if is_selected {
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(color)
    };

    let prefix = if is_selected { "> " } else { "  " };
    ListItem::new(format!("{}{}{}", prefix, icon, display_name(path))).style(style)
}
