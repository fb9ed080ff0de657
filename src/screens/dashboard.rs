/// Dashboard frame: header, tab bar, footer and help overlay

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{Screen, ViewState};
use crate::core::Snapshot;
use crate::screens::{containers, graph, overview};
use crate::utils::format_timestamp;

pub struct Dashboard {
    title: String,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            title: format!("dockmon v{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn render(&self, frame: &mut Frame, snapshot: &Snapshot, view: &ViewState) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Title
                Constraint::Length(1), // Tabs
                Constraint::Min(0),    // Content
                Constraint::Length(3), // Footer
            ])
            .split(frame.size());

        frame.render_widget(self.render_header(snapshot, view), chunks[0]);
        frame.render_widget(self.render_tab_bar(view.screen), chunks[1]);

        if snapshot.is_empty() {
            self.render_waiting(frame, chunks[2], view);
        } else {
            match view.screen {
                Screen::Overview => overview::render(frame, chunks[2], snapshot, view),
                Screen::Containers => containers::render(frame, chunks[2], snapshot, view),
                Screen::Graph => graph::render(frame, chunks[2], snapshot, view),
            }
        }

        frame.render_widget(self.render_footer(view), chunks[3]);

        if view.show_help {
            self.render_help(frame);
        }
    }

    fn render_header<'a>(&'a self, snapshot: &Snapshot, view: &'a ViewState) -> Paragraph<'a> {
        let mut spans = vec![
            Span::styled(
                self.title.as_str(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(view.api_base_url.as_str(), Style::default().fg(Color::Gray)),
            Span::raw("  |  "),
        ];

        match snapshot.updated_at {
            Some(updated_at) => {
                // Three missed intervals without an update means the backend is failing
                let age = Utc::now().signed_duration_since(updated_at);
                let stale = age.to_std().map_or(false, |age| age > view.poll_interval * 3);

                spans.push(Span::styled("Updated: ", Style::default().fg(Color::Gray)));
                spans.push(Span::styled(
                    format_timestamp(&updated_at),
                    Style::default().fg(if stale { Color::Yellow } else { Color::Green }),
                ));
                spans.push(Span::styled(
                    format!("  tick {}", snapshot.tick),
                    Style::default().fg(Color::DarkGray),
                ));
                if stale {
                    spans.push(Span::styled(
                        "  (stale)",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ));
                }
            }
            None => {
                spans.push(Span::styled("Waiting for data", Style::default().fg(Color::Yellow)));
            }
        }

        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL))
    }

    /// Tab bar with the active screen highlighted
    fn render_tab_bar(&self, current: Screen) -> Paragraph<'static> {
        let mut tab_spans = Vec::new();

        for (i, screen) in Screen::all().iter().enumerate() {
            if i > 0 {
                tab_spans.push(Span::raw(" "));
            }

            let label = format!("{}:{}", i + 1, screen.title());
            if *screen == current {
                tab_spans.push(Span::styled(
                    format!(" {} ", label),
                    Style::default()
                        .bg(Color::Blue)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ));
            } else {
                tab_spans.push(Span::styled(format!("[{}]", label), Style::default().fg(Color::Gray)));
            }
        }

        tab_spans.push(Span::styled(
            "  Tab to switch",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));

        Paragraph::new(Line::from(tab_spans)).alignment(Alignment::Left)
    }

    fn render_waiting(&self, frame: &mut Frame, area: Rect, view: &ViewState) {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Waiting for the first successful poll...",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!("Querying {}", view.api_base_url)),
            Line::from(Span::styled(
                "Errors are written to the log file; press [r] to retry now.",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let waiting = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(waiting, area);
    }

    fn render_footer(&self, view: &ViewState) -> Paragraph<'static> {
        let footer_text = if let Some(status) = view.status_message.as_deref() {
            status.to_string()
        } else {
            match view.screen {
                Screen::Overview => "[1-3/Tab] Screen | [h]ost | [r]efresh | [?] Help | [q]uit".to_string(),
                Screen::Containers => {
                    "[↑↓] Select | [s]tatus | [i]nstance | Sort: [n]ame i[m]age s[t]atus h[o]st [u]ptime | [?] Help | [q]uit"
                        .to_string()
                }
                Screen::Graph => "[↑↓] Select host | [r]efresh | [?] Help | [q]uit".to_string(),
            }
        };

        Paragraph::new(footer_text)
            .alignment(Alignment::Center)
            .style(if view.status_message.is_some() {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            })
            .block(Block::default().borders(Borders::ALL))
    }

    fn render_help(&self, frame: &mut Frame) {
        // Centered overlay
        let area = frame.size();
        let popup_width = area.width.min(64);
        let popup_height = area.height.min(24);
        let popup_area = Rect {
            x: (area.width.saturating_sub(popup_width)) / 2,
            y: (area.height.saturating_sub(popup_height)) / 2,
            width: popup_width,
            height: popup_height,
        };

        let section = |title: &'static str| {
            Line::from(Span::styled(
                title,
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))
        };

        let help_text = vec![
            Line::from(Span::styled(
                "dockmon - Keyboard Shortcuts",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            section("Navigation:"),
            Line::from("  [1-3]        Jump to screen"),
            Line::from("  [Tab] [← →]  Next/previous screen"),
            Line::from("  [↑ ↓]        Move selection"),
            Line::from(""),
            section("Filters:"),
            Line::from("  [s]          Cycle status (all/running/stopped)"),
            Line::from("  [i]          Cycle instance"),
            Line::from("  [h]          Cycle chart host"),
            Line::from(""),
            section("Sorting (repeat to reverse):"),
            Line::from("  [n] name  [m] image  [t] status  [o] host  [u] uptime"),
            Line::from(""),
            section("General:"),
            Line::from("  [r]          Poll now"),
            Line::from("  [?]          Toggle this help"),
            Line::from("  [q] [Esc]    Quit"),
        ];

        let help = Paragraph::new(help_text)
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help ")
                    .border_style(Style::default().fg(Color::Cyan)),
            );

        frame.render_widget(Clear, popup_area);
        frame.render_widget(help, popup_area);
    }
}
