use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Widget, Wrap},
};
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::{App, Screen};
use pneuma::session::Phase;
use pneuma::util::format_mmss;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Session => render_session(self, area, buf),
            Screen::History => render_history(self, area, buf),
        }
    }
}

fn centered_chunks(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Length(2), // round header
                Constraint::Min(5),    // phase body
                Constraint::Length(2), // key hints
            ]
            .as_ref(),
        )
        .split(area)
}

fn render_session(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let chunks = centered_chunks(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled("pneuma", bold.fg(Color::Magenta)),
        Span::raw("  "),
        Span::styled(
            format!(
                "round {} of {}",
                session.current_round, session.config.rounds_planned
            ),
            dim,
        ),
    ]))
    .alignment(Alignment::Center);
    header.render(chunks[0], buf);

    match session.phase {
        Phase::Idle => render_idle(app, chunks[1], buf),
        Phase::Breathing => render_breathing(app, chunks[1], buf),
        Phase::Hold => render_hold(app, chunks[1], buf),
        Phase::Recovery => render_recovery(app, chunks[1], buf),
        Phase::Complete => render_complete(app, chunks[1], buf),
    }

    let hints = match session.phase {
        Phase::Idle => "space: start breathing  h: history  esc: quit",
        Phase::Breathing => "follow the cue  esc: quit",
        Phase::Hold => "space: release hold  esc: quit",
        Phase::Recovery => "rest  esc: quit",
        Phase::Complete => "space: new session  h: history  esc: quit",
    };
    Paragraph::new(Span::styled(hints, dim))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);
}

fn render_idle(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let mut lines = vec![
        Line::from(Span::styled(
            "READY",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::raw(format!(
            "{} breaths, then hold as long as you like",
            session.config.breaths_per_round
        ))),
    ];
    if !session.rounds().is_empty() {
        lines.push(Line::from(""));
        let last = &session.rounds()[session.rounds().len() - 1];
        lines.push(Line::from(Span::styled(
            format!(
                "last hold: {}",
                format_mmss(last.hold_duration_secs)
            ),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(vertically_centered(area, 5), buf);
}

fn render_breathing(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let (label, color) = if session.is_inhaling {
        ("INHALE", Color::Green)
    } else {
        ("EXHALE", Color::Blue)
    };

    let body = vec![
        Line::from(Span::styled(
            label,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::raw(format!(
            "breath {} / {}",
            session.breath_count, session.config.breaths_per_round
        ))),
    ];
    Paragraph::new(body)
        .alignment(Alignment::Center)
        .render(vertically_centered(chunks[0], 3), buf);

    let ratio =
        f64::from(session.breath_count) / f64::from(session.config.breaths_per_round.max(1));
    Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!(
            "{} / {}",
            session.breath_count, session.config.breaths_per_round
        ))
        .render(chunks[1], buf);
}

fn render_hold(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let lines = vec![
        Line::from(Span::styled(
            "HOLD",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format_mmss(session.hold_elapsed_secs()),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(vertically_centered(area, 3), buf);
}

fn render_recovery(app: &App, area: Rect, buf: &mut Buffer) {
    let session = &app.session;
    let remaining_secs = session.recovery_remaining_ms().div_ceil(1000);
    let lines = vec![
        Line::from(Span::styled(
            "RECOVER",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::raw(format!(
            "next round in {}",
            format_mmss(remaining_secs)
        ))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(vertically_centered(area, 3), buf);
}

fn render_complete(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(summary) = app.session.last_summary() else {
        Paragraph::new("session complete")
            .alignment(Alignment::Center)
            .render(area, buf);
        return;
    };
    let metrics = summary.metrics();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(4),
            ]
            .as_ref(),
        )
        .split(area);

    let headline = Paragraph::new(vec![
        Line::from(Span::styled(
            "SESSION COMPLETE",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::raw(format!(
            "{} rounds · {} breaths · avg hold {} · total {}",
            metrics.completed_rounds,
            metrics.total_breaths,
            format_mmss(metrics.avg_hold_secs.round() as u64),
            format_mmss(metrics.total_hold_secs),
        ))),
    ])
    .alignment(Alignment::Center);
    headline.render(chunks[0], buf);

    let rows: Vec<Row> = summary
        .rounds
        .iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(format!("{}", r.round_number)),
                Cell::from(format!("{}", r.breaths_completed)),
                Cell::from(format_mmss(r.hold_duration_secs)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(7),
        ],
    )
    .header(
        Row::new(vec!["round", "breaths", "hold"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title("rounds"));
    ratatui::widgets::Widget::render(table, chunks[1], buf);
}

fn render_history(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Length(2),
                Constraint::Min(3),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(area);

    Paragraph::new(Span::styled(
        "session history",
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    if app.history_view.is_empty() {
        Paragraph::new(Span::styled(
            "no sessions recorded yet",
            Style::default().add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    } else {
        let rows: Vec<Row> = app
            .history_view
            .iter()
            .map(|s| {
                let metrics = s.metrics();
                let age_secs =
                    (chrono::Local::now() - s.created_at).num_seconds().max(0) as u64;
                let when = HumanTime::from(std::time::Duration::from_secs(age_secs))
                    .to_text_en(Accuracy::Rough, Tense::Past);
                Row::new(vec![
                    Cell::from(when),
                    Cell::from(format!("{}", metrics.completed_rounds)),
                    Cell::from(format!("{}", metrics.total_breaths)),
                    Cell::from(format_mmss(metrics.avg_hold_secs.round() as u64)),
                    Cell::from(format_mmss(metrics.total_hold_secs)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Min(16),
                Constraint::Length(7),
                Constraint::Length(8),
                Constraint::Length(9),
                Constraint::Length(10),
            ],
        )
        .header(
            Row::new(vec!["when", "rounds", "breaths", "avg hold", "total hold"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL));
        ratatui::widgets::Widget::render(table, chunks[1], buf);
    }

    Paragraph::new(Span::styled(
        "b: back  c: clear history  esc: quit",
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);
}

/// Shrink `area` to `height` rows, keeping it vertically centered.
fn vertically_centered(area: Rect, height: u16) -> Rect {
    if area.height <= height {
        return area;
    }
    let pad = (area.height - height) / 2;
    Rect {
        x: area.x,
        y: area.y + pad,
        width: area.width,
        height,
    }
}
