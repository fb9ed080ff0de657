/// Containers screen: filter summary and sortable table

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::ViewState;
use crate::core::listing::{filter_and_sort, SortField, SortSpec};
use crate::core::{ContainerStatus, Snapshot};
use crate::utils::{format_uptime, truncate_string};

const COLUMNS: &[(SortField, char)] = &[
    (SortField::Name, 'n'),
    (SortField::Image, 'm'),
    (SortField::Status, 't'),
    (SortField::Instance, 'o'),
    (SortField::Uptime, 'u'),
];

/// Column header with its shortcut and, when active, the sort arrow
fn header_label(field: SortField, key: char, sort: &SortSpec) -> String {
    let arrow = if sort.field == Some(field) {
        format!(" {}", sort.direction.arrow())
    } else {
        String::new()
    };
    format!("{} [{}]{}", field.label(), key, arrow)
}

fn status_style(status: ContainerStatus) -> Style {
    match status {
        ContainerStatus::Running => Style::default().fg(Color::Green),
        ContainerStatus::Stopped => Style::default().fg(Color::Red),
    }
}

pub fn render(frame: &mut Frame, area: Rect, snapshot: &Snapshot, view: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let visible = filter_and_sort(&snapshot.containers, &view.filter, &view.sort);

    let summary = Paragraph::new(Line::from(vec![
        Span::styled("Showing: ", Style::default().fg(Color::White)),
        Span::styled(
            format!("{}/{}", visible.len(), snapshot.containers.len()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled("Status: ", Style::default().fg(Color::Gray)),
        Span::raw(view.filter.status.label()),
        Span::raw("  |  "),
        Span::styled("Instance: ", Style::default().fg(Color::Gray)),
        Span::raw(view.filter.instance.clone().unwrap_or_else(|| "All Instances".to_string())),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Filters"));
    frame.render_widget(summary, chunks[0]);

    let header = Row::new(
        COLUMNS
            .iter()
            .map(|(field, key)| Cell::from(header_label(*field, *key, &view.sort))),
    )
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    .bottom_margin(1);

    let rows: Vec<Row> = visible
        .iter()
        .map(|container| {
            Row::new(vec![
                Cell::from(truncate_string(&container.name, 32)),
                Cell::from(truncate_string(&container.image, 40)),
                Cell::from(container.status.as_str()).style(status_style(container.status)),
                Cell::from(container.instance.clone()),
                Cell::from(format_uptime(container.uptime)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Percentage(24),
        Constraint::Percentage(30),
        Constraint::Length(12),
        Constraint::Percentage(22),
        Constraint::Length(14),
    ];

    let title = if visible.is_empty() {
        " Containers (none match the current filters) ".to_string()
    } else {
        " Containers ".to_string()
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    let mut state = TableState::default();
    if !visible.is_empty() {
        state.select(Some(view.selected_index.min(visible.len() - 1)));
    }

    frame.render_stateful_widget(table, chunks[1], &mut state);
}
