/// Overview screen: summary cards and per-host memory/CPU charts

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::app::ViewState;
use crate::core::listing::StatsOverview;
use crate::core::series::{by_host, hosts, value_bounds};
use crate::core::{MetricKind, Snapshot};
use crate::utils::format_clock;

/// Line colors assigned to hosts in chart order
const HOST_COLORS: &[Color] = &[
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::LightBlue,
    Color::LightRed,
    Color::LightGreen,
    Color::White,
];

pub fn host_color(index: usize) -> Color {
    HOST_COLORS[index % HOST_COLORS.len()]
}

pub fn render(frame: &mut Frame, area: Rect, snapshot: &Snapshot, view: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    render_cards(frame, chunks[0], &StatsOverview::from_containers(&snapshot.containers));

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    for (kind, chart_area) in MetricKind::all().iter().zip(charts.iter()) {
        render_chart(frame, *chart_area, snapshot, view, *kind);
    }
}

fn render_cards(frame: &mut Frame, area: Rect, stats: &StatsOverview) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    let stopped_color = if stats.stopped > 0 { Color::Red } else { Color::Gray };
    let entries = [
        ("Containers", stats.total, Color::White),
        ("Running", stats.running, Color::Green),
        ("Stopped", stats.stopped, stopped_color),
        ("Targets", stats.targets, Color::Cyan),
    ];

    for ((title, value, color), card_area) in entries.into_iter().zip(cards.iter()) {
        let card = Paragraph::new(Line::from(Span::styled(
            value.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(card, *card_area);
    }
}

fn render_chart(frame: &mut Frame, area: Rect, snapshot: &Snapshot, view: &ViewState, kind: MetricKind) {
    let samples = view.host_filter.apply(snapshot.window(kind));
    let title = format!(" {} [{}] ", kind.title(), view.host_filter.label());
    let block = Block::default().borders(Borders::ALL).title(title);

    if samples.is_empty() {
        let empty = Paragraph::new("No samples yet")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let series = by_host(&samples);
    // Keep colors stable across host filter changes
    let all_hosts = hosts(&snapshot.memory, &snapshot.cpu);

    let datasets: Vec<Dataset> = series
        .iter()
        .map(|(host, points)| {
            let color_index = all_hosts.iter().position(|h| h == host).unwrap_or(0);
            Dataset::default()
                .name(host.clone())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(host_color(color_index)))
                .data(points)
        })
        .collect();

    let x_max = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|(x, _)| *x))
        .fold(0.0_f64, f64::max)
        .max(1.0);
    let (y_min, y_max) = value_bounds(&samples);
    let first_ts = samples.iter().map(|s| s.timestamp).min().unwrap_or(0);
    let last_ts = samples.iter().map(|s| s.timestamp).max().unwrap_or(0);
    let unit = kind.unit_suffix().trim();

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .title("time")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(vec![
                    Span::raw(format_clock(first_ts)),
                    Span::raw(format_clock(last_ts)),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(unit)
                .style(Style::default().fg(Color::Gray))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{:.1}", y_min)),
                    Span::raw(format!("{:.1}", (y_min + y_max) / 2.0)),
                    Span::raw(format!("{:.1}", y_max)),
                ]),
        );

    frame.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::HostFilter;
    use crate::screens::test_support::{contains, snapshot, terminal};
    use std::time::Duration;

    fn view() -> ViewState {
        ViewState::new("http://prom:9090", Duration::from_secs(5))
    }

    #[test]
    fn test_cards_and_chart_titles() {
        let mut terminal = terminal(120, 30);
        terminal
            .draw(|f| {
                let area = f.size();
                render(f, area, &snapshot(), &view())
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        assert!(contains(buffer, "Containers"));
        assert!(contains(buffer, "Targets"));
        assert!(contains(buffer, "Memory Usage (MB) [All Hosts]"));
        assert!(contains(buffer, "CPU Usage [All Hosts]"));
    }

    #[test]
    fn test_host_filter_without_samples() {
        let mut terminal = terminal(120, 30);
        let mut state = view();
        state.host_filter = HostFilter::Host("node-b:9100".to_string());
        terminal
            .draw(|f| {
                let area = f.size();
                render(f, area, &snapshot(), &state)
            })
            .unwrap();

        // node-b reports memory only
        let buffer = terminal.backend().buffer();
        assert!(contains(buffer, "[node-b:9100]"));
        assert!(contains(buffer, "No samples yet"));
    }

    #[test]
    fn test_host_colors_wrap() {
        assert_eq!(host_color(0), host_color(HOST_COLORS.len()));
    }
}
