use std::{
    io::{self, Stdout},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{DateTime, Local};
use crossbeam_channel::Sender;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        Block, Borders, Paragraph,
    },
    Frame, Terminal,
};
use tracing::{debug, warn};

use crate::app::{Control, SeriesSet};
use crate::constants::{INPUT_POLL_MS, TRIM_AMOUNT};
use crate::display::DisplaySurface;
use crate::error::DisplayError;
use crate::pipeline::{PipelineStatus, StatusHandle};
use crate::util::{format_latency, value_bounds};

pub type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

pub fn enter_terminal() -> io::Result<CrosstermTerminal> {
    enable_raw_mode()?;
    let terminal = execute!(io::stdout(), EnterAlternateScreen)
        .and_then(|()| Terminal::new(CrosstermBackend::new(io::stdout())));
    undo_on_err(terminal, || {
        let _ = restore_terminal();
    })
}

fn undo_on_err<T>(result: io::Result<T>, undo: impl FnOnce()) -> io::Result<T> {
    if result.is_err() {
        undo();
    }
    result
}

/// Leaves raw mode and the alternate screen. Safe to call after the
/// terminal handle itself is gone.
pub fn restore_terminal() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, Show)
}

fn series_color(name: &str) -> Color {
    match name {
        "max" => Color::Red,
        "p99" => Color::Magenta,
        "mean" => Color::Yellow,
        _ => Color::Green,
    }
}

/// Chart of the four latency series plus the latest values and probe counters.
pub struct TerminalDisplay<B: Backend> {
    terminal: Terminal<B>,
    target: String,
    rate: usize,
    status: Option<StatusHandle>,
    peak_max: Option<(f64, DateTime<Local>)>,
}

impl<B: Backend> TerminalDisplay<B> {
    pub fn new(terminal: Terminal<B>, target: impl Into<String>, rate: usize) -> Self {
        Self {
            terminal,
            target: target.into(),
            rate,
            status: None,
            peak_max: None,
        }
    }

    pub fn with_status(mut self, status: StatusHandle) -> Self {
        self.status = Some(status);
        self
    }

    #[cfg(test)]
    fn terminal_mut(&mut self) -> &mut Terminal<B> {
        &mut self.terminal
    }

    fn track_peak(&mut self, series: &SeriesSet) {
        if let Some(latest) = series.latest() {
            if self.peak_max.map_or(true, |(peak, _)| latest.max > peak) {
                self.peak_max = Some((latest.max, Local::now()));
            }
        }
    }
}

impl<B: Backend> DisplaySurface for TerminalDisplay<B> {
    fn render(&mut self, series: &SeriesSet) -> Result<(), DisplayError> {
        self.track_peak(series);
        let status = self.status.as_ref().map(StatusHandle::status).unwrap_or_default();
        let (target, rate, peak_max) = (self.target.as_str(), self.rate, self.peak_max);

        self.terminal
            .draw(|f| draw(f, series, target, rate, peak_max, status))?;
        Ok(())
    }
}

fn draw(
    f: &mut Frame,
    series: &SeriesSet,
    target: &str,
    rate: usize,
    peak_max: Option<(f64, DateTime<Local>)>,
    status: PipelineStatus,
) {
    // ============= whole screen layout ============
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(1)].as_ref())
        .split(f.size());

    let chart_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} @ {}/s ", target, rate))
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(chart_block.clone(), main_chunks[0]);

    let inner_area = chart_block.inner(main_chunks[0]);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(80), Constraint::Percentage(20)].as_ref())
        .split(inner_area);

    // ======== Latency chart ========
    let named = series.named();
    let x_limit = (series.len().saturating_sub(1)).max(1) as f64;
    let y_bounds = value_bounds(named.iter().map(|(_, points)| *points));

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([0.0, x_limit])
        .y_bounds(y_bounds)
        .paint(|ctx| {
            for (name, points) in named.iter() {
                let color = series_color(name);
                if let [only] = points {
                    ctx.draw(&CanvasLine { x1: 0.0, y1: *only, x2: 0.0, y2: *only, color });
                }
                for (i, pair) in points.windows(2).enumerate() {
                    ctx.draw(&CanvasLine {
                        x1: i as f64,
                        y1: pair[0],
                        x2: (i + 1) as f64,
                        y2: pair[1],
                        color,
                    });
                }
            }
        });
    f.render_widget(canvas, chunks[0]);

    // ======== Latest values ========
    let mut lines: Vec<Line> = named
        .iter()
        .map(|(name, points)| {
            let value = points.last().map(|v| format_latency(*v)).unwrap_or_else(|| "-".to_string());
            Line::from(vec![
                Span::styled(format!("{:<5}", name), Style::default().fg(series_color(name))),
                Span::styled(value, Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    if let Some((peak, at)) = peak_max {
        lines.push(Line::from(vec![
            Span::styled("Peak: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format_latency(peak)),
        ]));
        lines.push(Line::from(Span::styled(
            format!("  @{}", at.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        )));
    }
    f.render_widget(Paragraph::new(lines), chunks[1]);

    // ============ Bottom Status Bar ============
    let status_content = Line::from(vec![
        Span::styled(
            " PROBES ",
            Style::default().bg(Color::White).fg(Color::Black).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(
            " in flight {} | {}/s | window {} | launched {} | done {} | ",
            status.in_flight,
            status.recent_launches,
            status.window_len,
            status.probes.launched,
            status.probes.completed
        )),
        Span::styled(
            format!("failed {}", status.probes.failed),
            Style::default().fg(Color::Red),
        ),
        Span::raw(format!(" | 'q' quit, 'r' reset, 't' trim {}", TRIM_AMOUNT)),
    ]);
    let status_bar = Paragraph::new(status_content).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, main_chunks[1]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Quit,
    Control(Control),
}

pub fn key_action(key: KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(KeyAction::Quit),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'q' => Some(KeyAction::Quit),
            'r' => Some(KeyAction::Control(Control::Reset)),
            't' => Some(KeyAction::Control(Control::Trim(TRIM_AMOUNT))),
            _ => None,
        },
        _ => None,
    }
}

/// Translates key presses into controls until `stop` is raised.
pub fn spawn_input_thread(
    controls: Sender<Control>,
    cancel: Sender<()>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let poll = Duration::from_millis(INPUT_POLL_MS);
        input_loop(
            || match event::poll(poll)? {
                true => event::read().map(Some),
                false => Ok(None),
            },
            &controls,
            &cancel,
            &stop,
        )
    })
}

/// Drives `next_event` until `stop` is raised. A broken event source cancels
/// the run, since raw mode leaves the operator no other way out.
fn input_loop(
    mut next_event: impl FnMut() -> io::Result<Option<Event>>,
    controls: &Sender<Control>,
    cancel: &Sender<()>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::Acquire) {
        let key = match next_event() {
            Ok(Some(Event::Key(key))) => key,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "terminal input failed, cancelling");
                let _ = cancel.try_send(());
                break;
            }
        };

        match key_action(key) {
            Some(KeyAction::Quit) => {
                let _ = cancel.try_send(());
            }
            Some(KeyAction::Control(control)) => {
                debug!(?control, "operator control");
                let _ = controls.send(control);
            }
            None => {}
        }
    }
}
