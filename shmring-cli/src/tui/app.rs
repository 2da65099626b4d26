// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! TUI Dashboard using ratatui.
//!
//! Shows the fill level of every configured ring. Figures come from unlocked
//! snapshots so the monitor never contends with producers or consumers.

use std::io::stdout;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};
use shmring_core::{AccessMode, ChannelError, RingChannel, RingStats, SegmentError};

use crate::session::Session;

/// What the monitor currently knows about a ring.
enum Status {
    NotCreated,
    Unavailable,
    Live(RingStats),
}

/// One monitored ring. The monitor only ever opens existing rings, so
/// watching never creates, locks or unlinks anything.
struct Watched {
    name: String,
    ring: Option<RingChannel>,
    status: Status,
}

impl Watched {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ring: None,
            status: Status::NotCreated,
        }
    }

    fn attach(&mut self) {
        let mut ring = RingChannel::new();
        let attached = ring
            .open(&self.name)
            .and_then(|()| ring.map(AccessMode::ReadOnly, 0));

        match attached {
            Ok(()) => self.ring = Some(ring),
            Err(ChannelError::Segment(SegmentError::NotFound { .. })) => {
                self.status = Status::NotCreated;
            }
            Err(e) => {
                tracing::debug!(name = %self.name, error = %e, "Cannot monitor ring");
                self.status = Status::Unavailable;
            }
        }
    }

    fn refresh(&mut self) {
        if self.ring.is_none() {
            self.attach();
        }
        if let Some(ring) = &self.ring {
            self.status = match ring.snapshot() {
                Ok(stats) => Status::Live(stats),
                Err(_) => Status::Unavailable,
            };
        }
    }
}

/// Dashboard state.
struct App {
    should_quit: bool,
    tick: u64,
    rings: Vec<Watched>,
}

impl App {
    fn new(session: &Session) -> Result<Self, Box<dyn std::error::Error>> {
        let config = session.config()?;

        Ok(Self {
            should_quit: false,
            tick: 0,
            rings: config
                .channels
                .iter()
                .map(|channel| Watched::new(channel.name.as_str()))
                .collect(),
        })
    }

    fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        for watched in &mut self.rings {
            watched.refresh();
        }
    }
}

/// Run the TUI dashboard.
pub async fn run_dashboard(session: &Session) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(session)?;
    app.tick();

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    loop {
        terminal.draw(|frame| render(frame, &app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
                        _ => {}
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }

        app.tick();
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

fn fill_percent(stats: &RingStats) -> f64 {
    let usable = stats.capacity.saturating_sub(1);
    if usable == 0 {
        0.0
    } else {
        stats.pending as f64 * 100.0 / usable as f64
    }
}

fn fill_color(percent: f64) -> Color {
    match percent {
        p if p >= 90.0 => Color::Red,
        p if p >= 60.0 => Color::Yellow,
        _ => Color::Green,
    }
}

fn panel(title: &str, color: Color) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// Grey row with `label` in the first column and dashes elsewhere.
fn placeholder_row<'a>(label: &'a str, status: &'a str) -> Row<'a> {
    Row::new([label, "-", "-", "-", status].map(Cell::from))
        .style(Style::default().fg(Color::DarkGray))
}

fn ring_row(watched: &Watched) -> Row<'_> {
    let stats = match &watched.status {
        Status::Live(stats) => stats,
        Status::NotCreated => return placeholder_row(&watched.name, "not created"),
        Status::Unavailable => return placeholder_row(&watched.name, "unavailable"),
    };

    let percent = fill_percent(stats);
    Row::new(vec![
        Cell::from(watched.name.as_str()),
        Cell::from(stats.capacity.to_string()),
        Cell::from(stats.pending.to_string()),
        Cell::from(stats.free.to_string()),
        Cell::from(format!("{:>5.1}%", percent)).style(Style::default().fg(fill_color(percent))),
    ])
}

fn summary(app: &App) -> Vec<Line<'static>> {
    let live: Vec<&RingStats> = app
        .rings
        .iter()
        .filter_map(|w| match &w.status {
            Status::Live(stats) => Some(stats),
            _ => None,
        })
        .collect();
    let pending: usize = live.iter().map(|s| s.pending).sum();
    let busiest = live
        .iter()
        .map(|s| fill_percent(s))
        .fold(0.0_f64, f64::max);

    let value = |text: String, color: Color| {
        Span::styled(text, Style::default().fg(color).add_modifier(Modifier::BOLD))
    };

    vec![
        Line::from(vec![
            Span::raw("Attached:      "),
            value(format!("{}/{}", live.len(), app.rings.len()), Color::Cyan),
        ]),
        Line::from(vec![
            Span::raw("Bytes pending: "),
            value(pending.to_string(), Color::White),
        ]),
        Line::from(vec![
            Span::raw("Fullest ring:  "),
            value(format!("{:.1}%", busiest), fill_color(busiest)),
        ]),
    ]
}

fn render(frame: &mut Frame, app: &App) {
    let [title_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    let [table_area, summary_area] =
        Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)])
            .areas(body_area);

    frame.render_widget(
        Paragraph::new(" SHMRING MONITOR ")
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center)
            .block(panel("", Color::Cyan)),
        title_area,
    );

    let rows: Vec<Row> = if app.rings.is_empty() {
        vec![placeholder_row("(no channels configured)", "-")]
    } else {
        app.rings.iter().map(ring_row).collect()
    };

    let widths = [
        Constraint::Percentage(32),
        Constraint::Percentage(17),
        Constraint::Percentage(17),
        Constraint::Percentage(17),
        Constraint::Percentage(17),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(["Ring", "Capacity", "Pending", "Free", "Fill"].map(Cell::from)).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        )
        .block(panel(" Rings ", Color::Green));
    frame.render_widget(table, table_area);

    frame.render_widget(
        Paragraph::new(summary(app)).block(panel(" Totals ", Color::Blue)),
        summary_area,
    );

    frame.render_widget(
        Paragraph::new(format!(
            " refresh #{} | snapshots are unlocked | q / Esc to quit ",
            app.tick
        ))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL)),
        footer_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watching_never_creates_a_ring() {
        let name = format!("tui-watch-{}", std::process::id());
        let mut watched = Watched::new(&name);

        watched.refresh();
        assert!(matches!(watched.status, Status::NotCreated));
        assert!(watched.ring.is_none());
        assert!(RingChannel::new().open(&name).is_err());

        let mut producer = RingChannel::new().with_unlink_on_close(true);
        producer.create(&name, 128, false).unwrap();
        producer.map(AccessMode::ReadWrite, 0).unwrap();
        producer.lock().unwrap().write(b"abc").unwrap();

        watched.refresh();
        match &watched.status {
            Status::Live(stats) => assert_eq!(stats.pending, 3),
            _ => panic!("ring should be live once created"),
        }

        // Dropping the monitor leaves the ring in place.
        drop(watched);
        let mut again = RingChannel::new();
        again.open(&name).unwrap();
    }
}
