/// Graph screen: hosts and the containers they report, drawn as a tree

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::ViewState;
use crate::core::topology::Topology;
use crate::core::{ContainerStatus, Snapshot};
use crate::screens::overview::host_color;

/// Tree lines plus the line index where each host starts
fn tree_lines(topology: &Topology, selected_host: usize) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines = Vec::new();
    let mut host_rows = Vec::new();

    for (index, host) in topology.hosts.iter().enumerate() {
        host_rows.push(lines.len());

        let marker = if index == selected_host { "▶ " } else { "  " };
        let mut name_style = Style::default().fg(host_color(index)).add_modifier(Modifier::BOLD);
        if index == selected_host {
            name_style = name_style.add_modifier(Modifier::REVERSED);
        }

        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("● {}", host.instance), name_style),
            Span::styled(
                format!("  ({}/{} running)", host.running, host.containers),
                Style::default().fg(Color::Gray),
            ),
        ]));

        let children: Vec<_> = topology.children(host).collect();
        for (i, child) in children.iter().enumerate() {
            let branch = if i + 1 == children.len() { "└─" } else { "├─" };
            let (status_color, glyph) = match child.status {
                ContainerStatus::Running => (Color::Green, "▲"),
                ContainerStatus::Stopped => (Color::Red, "▼"),
            };

            lines.push(Line::from(vec![
                Span::raw(format!("    {} ", branch)),
                Span::styled(format!("{} ", glyph), Style::default().fg(status_color)),
                Span::styled(child.name.clone(), Style::default().fg(Color::White)),
                Span::styled(format!("  {}", child.image), Style::default().fg(Color::DarkGray)),
            ]));
        }

        lines.push(Line::from(""));
    }

    (lines, host_rows)
}

pub fn render(frame: &mut Frame, area: Rect, snapshot: &Snapshot, view: &ViewState) {
    let topology = Topology::build(&snapshot.containers);
    let title = format!(
        " Topology: {} hosts, {} containers ",
        topology.hosts.len(),
        topology.containers.len()
    );

    let (lines, host_rows) = tree_lines(&topology, view.selected_index);

    // Scroll so the selected host's line stays visible
    let inner_height = area.height.saturating_sub(2) as usize;
    let selected_row = host_rows.get(view.selected_index).copied().unwrap_or(0);
    let scroll = if inner_height > 0 && selected_row >= inner_height {
        selected_row + 1 - inner_height
    } else {
        0
    };

    let graph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((scroll as u16, 0));
    frame.render_widget(graph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::test_support::{rows, snapshot, terminal};
    use std::time::Duration;

    #[test]
    fn test_tree_groups_containers_under_hosts() {
        let topology = Topology::build(&snapshot().containers);
        let (lines, host_rows) = tree_lines(&topology, 0);

        // node-a: header + 2 children + spacer, then node-b
        assert_eq!(host_rows, vec![0, 4]);
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_render_tree() {
        let mut terminal = terminal(80, 20);
        let view = ViewState::new("http://prom:9090", Duration::from_secs(5));
        terminal
            .draw(|f| {
                let area = f.size();
                render(f, area, &snapshot(), &view)
            })
            .unwrap();

        let lines = rows(terminal.backend().buffer());
        assert!(lines.iter().any(|l| l.contains("Topology: 2 hosts, 3 containers")));
        assert!(lines.iter().any(|l| l.contains("● node-a:9100") && l.contains("(2/2 running)")));
        assert!(lines.iter().any(|l| l.contains("├─ ▲ web")));
        assert!(lines.iter().any(|l| l.contains("└─ ▲ cache")));
        assert!(lines.iter().any(|l| l.contains("└─ ▼ db")));
    }
}
