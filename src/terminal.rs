// SPDX-License-Identifier: GPL-3.0-only

//! Full-screen terminal interface
//!
//! Shows one screen at a time (camera, voice memos, scanner). Live frames are
//! drawn with Unicode half-block characters for improved vertical resolution.
//!
//! Key events are read on a dedicated thread and fed into the same async loop
//! that drives the tasks returned from [`AppModel::update`].

use crate::app::{
    AppModel, CameraMessage, CaptureState, Collaborators, GalleryMessage, Message, NoticeLevel,
    PlayerStatus, RecorderStatus, RecordingMessage, ScanMessage, Screen,
};
use crate::backends::camera::{CameraFrame, preview_channel};
use crate::backends::scanner::ScanOutcome;
use crate::config::Config;
use crate::constants::timing;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::channel::mpsc;
use futures::stream::FuturesUnordered;
use futures::{StreamExt, future::BoxFuture};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};
use std::io::{self, stdout};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

/// Run the terminal interface
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let (preview, _) = preview_channel();
    let collaborators = Collaborators::system(&config, Arc::clone(&preview));
    let model = AppModel::new(collaborators, &config, preview);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = runtime.block_on(run_app(&mut terminal, model));

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// What a key press asks for
#[derive(Debug)]
enum Action {
    Quit,
    Send(Message),
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut model: AppModel,
) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let mut events = spawn_event_reader(Arc::clone(&running));

    let mut pending: FuturesUnordered<BoxFuture<'static, Message>> = FuturesUnordered::new();
    pending.extend(model.update(Message::Show(Screen::Camera)).into_futures());

    let preview = model.camera().preview();
    let mut ticker = tokio::time::interval(timing::UI_TICK);

    loop {
        let frame = preview.borrow().clone();
        terminal.draw(|f| draw(f, &model, frame))?;

        tokio::select! {
            Some(message) = pending.next() => {
                pending.extend(model.update(message).into_futures());
            }
            event = events.next() => {
                let Some(event) = event else {
                    warn!("Terminal event reader stopped");
                    break;
                };
                let Event::Key(key) = event else {
                    continue;
                };
                let gallery_open = model.gallery().is_visible();
                match key_action(model.screen(), gallery_open, key) {
                    Some(Action::Quit) => break,
                    Some(Action::Send(message)) => {
                        pending.extend(model.update(message).into_futures());
                    }
                    None => {}
                }
            }
            _ = ticker.tick() => {
                pending.extend(model.update(Message::Tick).into_futures());
            }
        }
    }

    info!("Leaving terminal interface");
    let _ = model.update(Message::Hide);
    running.store(false, Ordering::Relaxed);
    Ok(())
}

/// Forward crossterm events until `running` goes down or the receiver is gone
fn spawn_event_reader(running: Arc<AtomicBool>) -> mpsc::UnboundedReceiver<Event> {
    let (sender, receiver) = mpsc::unbounded();
    std::thread::spawn(move || {
        while running.load(Ordering::Relaxed) {
            match event::poll(Duration::from_millis(100)) {
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if sender.unbounded_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read terminal event");
                        break;
                    }
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "Failed to poll terminal events");
                    break;
                }
            }
        }
    });
    receiver
}

fn key_action(screen: Option<Screen>, gallery_open: bool, key: KeyEvent) -> Option<Action> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    let screen = screen.unwrap_or_default();
    let message = match key.code {
        KeyCode::Char('q') => return Some(Action::Quit),
        KeyCode::Tab => Message::Show(screen.next()),
        KeyCode::Char('1') => Message::Show(Screen::Camera),
        KeyCode::Char('2') => Message::Show(Screen::Audio),
        KeyCode::Char('3') => Message::Show(Screen::Scanner),
        code if screen == Screen::Camera && gallery_open => Message::Gallery(match code {
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Right => GalleryMessage::Next,
            KeyCode::Char('k') | KeyCode::Up | KeyCode::Left => GalleryMessage::Previous,
            KeyCode::Enter => GalleryMessage::OpenSelected,
            KeyCode::Char('d') | KeyCode::Delete => GalleryMessage::DeleteSelected,
            KeyCode::Esc | KeyCode::Char('g') => GalleryMessage::Hide,
            _ => return None,
        }),
        code => match (screen, code) {
            (Screen::Camera, KeyCode::Char(' ')) => Message::Camera(CameraMessage::Capture),
            (Screen::Camera, KeyCode::Char('f')) => Message::Camera(CameraMessage::ToggleLens),
            (Screen::Camera, KeyCode::Char('g')) => Message::Gallery(GalleryMessage::Show),
            (Screen::Audio, KeyCode::Char('r')) => Message::Recording(RecordingMessage::ToggleRecord),
            (Screen::Audio, KeyCode::Char('p')) => Message::Recording(RecordingMessage::TogglePlay),
            (Screen::Audio, KeyCode::Char('s')) => Message::Recording(RecordingMessage::Stop),
            (Screen::Scanner, KeyCode::Char(' ') | KeyCode::Enter) => Message::Scan(ScanMessage::Scan),
            (Screen::Scanner, KeyCode::Esc) => Message::Scan(ScanMessage::Cancel),
            _ => return None,
        },
    };
    Some(Action::Send(message))
}

fn draw(f: &mut Frame, model: &AppModel, frame: Option<Arc<CameraFrame>>) {
    let [header, body, help, status] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(f.area());

    let screen = model.screen().unwrap_or_default();
    f.render_widget(Header { screen }, header);

    match screen {
        Screen::Camera if model.gallery().is_visible() => draw_gallery(f, model, body),
        Screen::Camera => {
            let placeholder = match model.camera().state() {
                CaptureState::Unbound => "Camera is off",
                CaptureState::AwaitingPermission => "Waiting for camera permission...",
                CaptureState::Bound { .. } => "Waiting for camera...",
            };
            f.render_widget(&FrameWidget::new(frame, placeholder), body);
        }
        Screen::Audio => draw_audio(f, model, body),
        Screen::Scanner if model.scanner().is_scanning() => {
            f.render_widget(&FrameWidget::new(frame, "Starting camera..."), body);
        }
        Screen::Scanner => draw_scanner(f, model, body),
    }

    f.render_widget(
        Paragraph::new(help_text(screen, model.gallery().is_visible()))
            .style(Style::default().fg(Color::Gray)),
        help,
    );

    let status_bar = match model.notices().latest() {
        Some(notice) => StatusBar {
            message: &notice.text,
            level: notice.level,
        },
        None => StatusBar {
            message: "",
            level: NoticeLevel::Info,
        },
    };
    f.render_widget(status_bar, status);
}

fn help_text(screen: Screen, gallery_open: bool) -> &'static str {
    match screen {
        Screen::Camera if gallery_open => {
            "j/k: browse | Enter: open | d: delete | Esc: close | q: quit"
        }
        Screen::Camera => "Space: capture | f: switch camera | g: gallery | Tab: next screen | q: quit",
        Screen::Audio => "r: record | p: play/pause | s: stop | Tab: next screen | q: quit",
        Screen::Scanner => "Space: scan | Esc: cancel | Tab: next screen | q: quit",
    }
}

fn draw_gallery(f: &mut Frame, model: &AppModel, area: Rect) {
    let gallery = model.gallery();
    let lines: Vec<Line> = gallery
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            if index == gallery.selected_index() {
                Line::from(Span::styled(
                    format!("> {}", entry.name()),
                    Style::default().add_modifier(Modifier::REVERSED),
                ))
            } else {
                Line::from(format!("  {}", entry.name()))
            }
        })
        .collect();

    // Keep the selection on screen
    let visible = area.height as usize;
    let scroll = gallery.selected_index().saturating_sub(visible.saturating_sub(1));
    f.render_widget(Paragraph::new(lines).scroll((scroll as u16, 0)), area);
}

fn draw_audio(f: &mut Frame, model: &AppModel, area: Rect) {
    let recording = model.recording();
    let recorder = match (recording.recorder_status(), recording.recording_path()) {
        (RecorderStatus::Recording, Some(path)) => format!("Recording to {}", path.display()),
        _ => "Not recording".to_string(),
    };
    let player = match recording.player_status() {
        PlayerStatus::Idle => "Stopped",
        PlayerStatus::Playing => "Playing",
        PlayerStatus::Paused => "Paused",
    };
    let last = recording
        .output_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "none".to_string());

    let lines = vec![
        Line::from(Span::styled(
            recorder,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Player: {}", player)),
        Line::from(format!("Last recording: {}", last)),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_scanner(f: &mut Frame, model: &AppModel, area: Rect) {
    let lines = match model.scanner().last_outcome() {
        Some(ScanOutcome::Decoded(text)) => vec![
            Line::from(Span::styled(
                "Decoded:",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(text.clone()),
        ],
        Some(ScanOutcome::Cancelled) => vec![Line::from("Scan cancelled")],
        Some(ScanOutcome::Failed(reason)) => vec![Line::from(format!("Scan failed: {}", reason))],
        None => vec![Line::from("Press Space to scan a QR code")],
    };
    f.render_widget(Paragraph::new(lines), area);
}

/// Screen tabs and version
struct Header {
    screen: Screen,
}

impl Widget for Header {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans = Vec::new();
        for (index, screen) in Screen::ALL.iter().enumerate() {
            let label = format!(" {} {:?} ", index + 1, screen);
            let style = if *screen == self.screen {
                Style::default().fg(Color::Black).bg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(label, style));
        }
        Line::from(spans).render(area, buf);

        let version = concat!("notekit ", env!("GIT_VERSION"));
        let width = version.len() as u16;
        if area.width > width {
            buf.set_string(
                area.x + area.width - width,
                area.y,
                version,
                Style::default().fg(Color::DarkGray),
            );
        }
    }
}

struct FrameWidget<'a> {
    frame: Option<Arc<CameraFrame>>,
    placeholder: &'a str,
}

impl<'a> FrameWidget<'a> {
    fn new(frame: Option<Arc<CameraFrame>>, placeholder: &'a str) -> Self {
        Self { frame, placeholder }
    }
}

impl Widget for &FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.as_deref().filter(|f| f.width > 0 && f.height > 0) else {
            let msg = self.placeholder;
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        // Upper half (▀) takes fg, lower half takes bg
        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                    cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let x = x.min(frame.width - 1);
    let y = y.min(frame.height - 1);
    let [r, g, b, _] = frame.pixel(x, y);
    Color::Rgb(r, g, b)
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
    level: NoticeLevel,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = match self.level {
            NoticeLevel::Info => Color::DarkGray,
            NoticeLevel::Error => Color::Red,
        };

        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(bg);
            }
        }

        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(bg),
        );
    }
}
