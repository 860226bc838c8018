//! Application core: hosts the orchestrator, turns keys into button
//! edges, and draws the published frames.

use std::sync::Arc;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame as TermFrame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use tracing::{debug, info};

use pepfob_core::{
    Action, Board, Button, Color as DeviceColor, DeviceConfig, Frame, FrameItem, RawEdge,
    SessionManager, SettingsStore, TaskOrchestrator, Timing, WanStatusModel,
};

use crate::board::{Halt, SimBoard};
use crate::event::{Event, EventReader};
use crate::theme;
use crate::tui::Tui;

const DISPLAY_WIDTH: u16 = 34;
const TAP: Duration = Duration::from_millis(60);
/// Added to a threshold so a synthesized hold lands clearly past it.
const HOLD_MARGIN: Duration = Duration::from_millis(200);
const BEEP_FLASH: Duration = Duration::from_millis(300);

// ── Key mapping ─────────────────────────────────────────────────────

/// What a key means to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Quit,
    /// A real press or release, from terminals that report releases.
    Edge(Button, bool),
    /// A whole press of the given length.
    Tap(Button, Duration),
}

fn button_for(c: char) -> Option<Button> {
    match c.to_ascii_lowercase() {
        'a' => Some(Button::A),
        'b' => Some(Button::B),
        'c' => Some(Button::C),
        _ => None,
    }
}

/// Translate a key event. Lowercase a/b/c are short presses (or real
/// holds when `key_release` is set), uppercase are long presses and `p`
/// holds C long enough to power off.
pub fn map_key(key: KeyEvent, key_release: bool, timing: &Timing) -> Option<Input> {
    if key.kind == KeyEventKind::Release {
        return match key.code {
            KeyCode::Char(c) if key_release && c.is_ascii_lowercase() => {
                button_for(c).map(|b| Input::Edge(b, false))
            }
            _ => None,
        };
    }

    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('q')) => Some(Input::Quit),
        (_, KeyCode::Char('p' | 'P')) => Some(Input::Tap(Button::C, timing.shutdown_press + HOLD_MARGIN)),
        (_, KeyCode::Char(c)) if c.is_ascii_uppercase() => {
            button_for(c).map(|b| Input::Tap(b, timing.long_press + HOLD_MARGIN))
        }
        (_, KeyCode::Char(c)) => button_for(c).map(|b| {
            if key_release {
                Input::Edge(b, true)
            } else {
                Input::Tap(b, TAP)
            }
        }),
        _ => None,
    }
}

// ── App ─────────────────────────────────────────────────────────────

/// How a run of the simulator ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Quit,
    Halted(Halt),
}

pub struct App {
    config: DeviceConfig,
    board: SimBoard,
    session: Arc<SessionManager>,
    settings: Arc<dyn SettingsStore>,
}

impl App {
    pub fn new(
        config: DeviceConfig,
        board: SimBoard,
        session: Arc<SessionManager>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            config,
            board,
            session,
            settings,
        }
    }

    /// Boot the device and run until the user quits or the device halts.
    pub async fn run(self) -> Result<Exit> {
        let timing = self.config.timing;
        let wans = Arc::new(WanStatusModel::new(Arc::clone(&self.session)));
        let handle = TaskOrchestrator::spawn(
            self.config,
            self.board.clone(),
            self.session,
            wans,
            self.settings,
        );
        let mut frames = handle.frames();
        let edges = handle.edges();
        let mut halted = self.board.halted();

        let mut tui = Tui::new()?;
        tui.enter()?;
        let mut events = EventReader::new(Duration::from_millis(50));
        let hint = tui_hint(tui.key_release);
        info!(key_release = tui.key_release, "simulator running");

        let exit = loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else { break Exit::Quit };
                    match event {
                        Event::Key(key) => match map_key(key, tui.key_release, &timing) {
                            Some(Input::Quit) => break Exit::Quit,
                            Some(Input::Edge(button, pressed)) => {
                                let _ = edges.send(RawEdge { button, pressed, at: Instant::now() }).await;
                            }
                            Some(Input::Tap(button, held)) => {
                                debug!(%button, held_ms = held.as_millis(), "tap");
                                let t0 = Instant::now();
                                let _ = edges.send(RawEdge { button, pressed: true, at: t0 }).await;
                                let _ = edges.send(RawEdge { button, pressed: false, at: t0 + held }).await;
                            }
                            None => {}
                        },
                        Event::Resize(..) | Event::Render => {
                            let current = frames.borrow_and_update().clone();
                            tui.draw(|f| render(f, &current, &self.board, hint))?;
                        }
                    }
                }

                Ok(()) = halted.changed() => {
                    if let Some(halt) = *halted.borrow() {
                        break Exit::Halted(halt);
                    }
                }
            }
        };

        events.stop();
        tui.exit();
        handle.dispatch(Action::Quit);
        handle.shutdown().await;
        info!(?exit, "simulator stopped");
        Ok(exit)
    }
}

fn tui_hint(key_release: bool) -> &'static str {
    if key_release { "hold a/b/c for real" } else { "A/B/C long press" }
}

// ── Rendering ───────────────────────────────────────────────────────

fn render(f: &mut TermFrame, frame: &Frame, board: &SimBoard, hint: &str) {
    let [display, side] =
        Layout::horizontal([Constraint::Length(DISPLAY_WIDTH), Constraint::Min(24)]).areas(f.area());

    render_display(f, display, frame);
    render_side(f, side, board, hint);
}

fn render_display(f: &mut TermFrame, area: Rect, frame: &Frame) {
    let block = Block::default()
        .title(Span::styled(format!(" {} ", frame.title), theme::title_style()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let width = usize::from(inner.width);
    let mut lines: Vec<Line> = Vec::new();

    if let Some((label, clock)) = &frame.countdown {
        lines.push(Line::styled(label.clone(), theme::countdown()).alignment(Alignment::Center));
        lines.push(Line::styled(clock.clone(), theme::countdown()).alignment(Alignment::Center));
        lines.push(Line::default());
    }

    lines.extend(frame.items.iter().map(|item| item_line(item, width)));

    if !frame.body.is_empty() && !frame.items.is_empty() {
        lines.push(Line::default());
    }
    lines.extend(frame.body.iter().map(|l| {
        let style = theme::device_style(theme::item(), l.color, DeviceColor::Default);
        Line::styled(l.text.clone(), style)
    }));

    let [content, banner] = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
    f.render_widget(Paragraph::new(lines), content);

    if let Some(b) = &frame.banner {
        let style = theme::device_style(theme::banner(), DeviceColor::Default, b.color);
        f.render_widget(
            Paragraph::new(Line::styled(b.text.clone(), style)).alignment(Alignment::Center),
            banner,
        );
    }
}

/// An item row: text on the left, auxiliary text right-aligned.
fn item_line(item: &FrameItem, width: usize) -> Line<'static> {
    let base = if item.highlighted { theme::item_selected() } else { theme::item() };
    let marker = if item.highlighted { "> " } else { "  " };
    let left = format!("{marker}{}", item.text);

    let Some(aux) = &item.aux else {
        return Line::styled(format!("{left:<width$}"), base);
    };
    let used = left.chars().count() + aux.text.chars().count();
    let pad = width.saturating_sub(used).max(1);
    Line::from(vec![
        Span::styled(left, base),
        Span::styled(" ".repeat(pad), base),
        Span::styled(aux.text.clone(), theme::device_style(base, aux.fg, aux.bg)),
    ])
}

fn render_side(f: &mut TermFrame, area: Rect, board: &SimBoard, hint: &str) {
    let block = Block::default()
        .title(Span::styled(" Board ", theme::title_style()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_default());

    let field = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{name:<9}"), theme::key_hint()),
            Span::styled(value, theme::item()),
        ])
    };
    let key = |k: &str, what: &str| {
        Line::from(vec![
            Span::styled(format!("{k:<5}"), theme::key_hint_key()),
            Span::styled(what.to_owned(), theme::key_hint()),
        ])
    };

    let buzzer = if board.beeping(BEEP_FLASH) { "BEEP" } else { "-" };
    let lines = vec![
        field("Wi-Fi", format!("{} / {}", board.wifi_mode(), board.wifi_status())),
        field("SSID", board.ssid().unwrap_or_else(|| "-".into())),
        field("IP", board.wifi_ip().unwrap_or_else(|| "-".into())),
        field("Battery", board.battery_percent().map_or_else(|| "-".into(), |p| format!("{p}%"))),
        field("Buzzer", format!("{buzzer} ({})", board.beeps())),
        Line::default(),
        key("a", "up / select"),
        key("b", "down / back"),
        key("c", "enter / menu"),
        key("A B C", "long press"),
        key("p", "power off"),
        key("q", "quit"),
        Line::styled(hint.to_owned(), Style::default().fg(theme::BORDER_GRAY)),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}
