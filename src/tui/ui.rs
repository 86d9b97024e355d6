//! UI rendering for the monitor.

use super::app::MonitorApp;
use crate::plc::{InputType, RunMode, TimerState};
use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &MonitorApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(frame.area());

    // Left side: program, errors and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_program(frame, left_chunks[0], app);
    draw_errors(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: I/O, memory and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    let io_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(right_chunks[0]);

    draw_inputs(frame, io_chunks[0], app);
    draw_outputs(frame, io_chunks[1], app);
    draw_memory(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Program listing with failing lines in red.
fn draw_program(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let error_lines = app.error_lines();

    let items: Vec<ListItem> = app
        .program
        .lines()
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            let line = idx + 1;
            let style = if error_lines.contains(&line) {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{:>3}  {}", line, text)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Program ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, area);
}

fn draw_errors(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let lines: Vec<Line> = app
        .errors
        .iter()
        .map(|e| Line::from(Span::styled(e.to_string(), Style::default().fg(Color::Red))))
        .collect();

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(" Errors ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );

    frame.render_widget(paragraph, area);
}

fn draw_status(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let mode_style = match app.plc.mode() {
        RunMode::Running => Style::default().fg(Color::Green),
        RunMode::Idle => Style::default().fg(Color::Yellow),
        RunMode::Stopped => Style::default().fg(Color::Red),
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(format!("{:<8}", app.plc.mode()), mode_style),
        Span::raw(format!(" cycle {:<6} ", app.plc.cycle())),
        Span::raw(app.status.clone()),
    ]))
    .block(Block::default().title(" Status ").borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Input panel: one row per button with its type and raw value.
fn draw_inputs(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let items: Vec<ListItem> = app
        .panel
        .iter()
        .enumerate()
        .map(|(idx, (address, input_type, value))| {
            let marker = if idx == app.selected { "▶ " } else { "  " };
            let held = if app.held.contains(address) { "*" } else { " " };
            let text = format!(
                "{}{:<5} {:<6}{} {}",
                marker,
                address,
                input_type,
                held,
                bit(value)
            );

            let style = if idx == app.selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                value_style(value)
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Inputs ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(list, area);
}

fn draw_outputs(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let items: Vec<ListItem> = app
        .plc
        .outputs()
        .iter()
        .map(|(address, value)| {
            ListItem::new(format!("{:<5} {}", address, bit(value))).style(value_style(value))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Outputs ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(list, area);
}

/// Memory cells with timer state.
fn draw_memory(frame: &mut Frame, area: Rect, app: &MonitorApp) {
    let items: Vec<ListItem> = app
        .plc
        .memory()
        .iter()
        .map(|cell| {
            let state = match cell.timer_state() {
                Some(TimerState::Running) => " [running]",
                Some(TimerState::Done) => " [done]",
                Some(TimerState::Idle) => " [idle]",
                None => "",
            };
            ListItem::new(format!("{}{}", cell.describe(), state)).style(value_style(cell.read()))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );

    frame.render_widget(list, area);
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let types: Vec<String> = InputType::ALL.iter().map(|t| t.to_string()).collect();
    let help = Paragraph::new(vec![
        Line::from("r: Run/Stop  p: Pause  x: Reset  q: Quit"),
        Line::from(format!("↑↓: Select  space: Press  t: Type ({})", types.join("/"))),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().title(" Help ").borders(Borders::ALL));

    frame.render_widget(help, area);
}

fn bit(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn value_style(value: bool) -> Style {
    if value {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}
