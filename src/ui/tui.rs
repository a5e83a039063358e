//! Interactive chat widget.
//!
//! Draws the target button with its current styles and a chat panel that can
//! be toggled open and closed. Style commands run on a spawned task so the
//! screen keeps redrawing (and the spinner keeps turning) while a request is in
//! flight. Closing the panel does not cancel anything: a late reply is still
//! applied when it arrives.

use super::render::ButtonLook;
use crate::completion::{CompletionBackend, CompletionError};
use crate::transcript::Role;
use crate::widget::{PendingCommand, Widget};
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

const BUTTON_LABEL: &str = "Target Button";
const PLACEHOLDER: &str = "Type your style command...";
const EMPTY_HINT: &str = "Describe a change, e.g. \"make it red\".";
const PANEL_WIDTH: u16 = 44;
const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
const TICK: Duration = Duration::from_millis(100);

type Completion = (PendingCommand, Result<String, CompletionError>);

/// Run the widget until the user quits and return its final state.
///
/// An initial command opens the chat panel with the input prefilled.
pub async fn run_tui(
    mut widget: Widget,
    backend: Arc<dyn CompletionBackend>,
    initial_command: Option<String>,
) -> Result<Widget> {
    let mut input = Input::default();
    if let Some(command) = initial_command {
        input = input.with_value(command);
        if !widget.is_panel_open() {
            widget.toggle_panel();
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let term_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(term_backend)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let mut app = App::new(widget, input, backend, tx);
    let result = app.run(&mut terminal, rx).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result.map(|()| app.widget)
}

enum Action {
    Continue,
    Quit,
}

struct App {
    widget: Widget,
    input: Input,
    backend: Arc<dyn CompletionBackend>,
    spinner: usize,
    tx: mpsc::UnboundedSender<Completion>,
}

impl App {
    fn new(
        widget: Widget,
        input: Input,
        backend: Arc<dyn CompletionBackend>,
        tx: mpsc::UnboundedSender<Completion>,
    ) -> Self {
        Self {
            widget,
            input,
            backend,
            spinner: 0,
            tx,
        }
    }

    /// The main event loop.
    async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) -> Result<()> {
        let mut events = EventStream::new();
        let mut ticker = tokio::time::interval(TICK);

        loop {
            terminal.draw(|frame| draw_ui(frame, &self.widget, &self.input, self.spinner))?;

            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        if let Action::Quit = self.handle_event(event) {
                            return Ok(());
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                },
                Some((pending, result)) = completions.recv() => {
                    self.apply_completion(pending, result);
                }
                _ = ticker.tick() => {
                    if self.widget.is_loading() {
                        self.spinner = (self.spinner + 1) % SPINNER.len();
                    }
                }
            }
        }
    }

    fn handle_event(&mut self, event: Event) -> Action {
        let Event::Key(key) = event else {
            return Action::Continue;
        };
        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            return Action::Continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let open = self.widget.is_panel_open();

        match key.code {
            KeyCode::Char('c') if ctrl => return Action::Quit,
            KeyCode::Char('t') if ctrl => {
                self.widget.toggle_panel();
            }
            KeyCode::Tab => {
                self.widget.toggle_panel();
            }
            KeyCode::Esc if open => {
                self.widget.toggle_panel();
            }
            KeyCode::Esc | KeyCode::Char('q') if !open => return Action::Quit,
            KeyCode::Enter if open => self.submit(),
            _ if open && !self.widget.is_loading() => {
                self.input.handle_event(&Event::Key(key));
            }
            _ => {}
        }
        Action::Continue
    }

    /// Leave the awaiting state and clear the input field.
    fn apply_completion(
        &mut self,
        pending: PendingCommand,
        result: Result<String, CompletionError>,
    ) {
        self.widget.complete(pending, result);
        self.input.reset();
    }

    /// Hand the current input to the pipeline and resolve it in the background.
    fn submit(&mut self) {
        let Some(pending) = self.widget.begin(self.input.value()) else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = backend.complete(pending.styles(), pending.command()).await;
            if tx.send((pending, result)).is_err() {
                debug!("widget closed before the completion arrived");
            }
        });
    }
}

/// Draw the whole screen.
fn draw_ui(frame: &mut Frame, widget: &Widget, input: &Input, spinner: usize) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let (preview_area, panel_area) = if widget.is_panel_open() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(PANEL_WIDTH)])
            .split(rows[0]);
        (columns[0], Some(columns[1]))
    } else {
        (rows[0], None)
    };

    draw_preview(frame, widget, preview_area);
    if let Some(area) = panel_area {
        draw_panel(frame, widget, input, spinner, area);
    }

    let hint = if widget.is_panel_open() {
        " Enter send · Esc/Tab close chat · Ctrl+C quit"
    } else {
        " Tab open chat · q quit"
    };
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        rows[1],
    );
}

/// The target button and the raw style state underneath it.
fn draw_preview(frame: &mut Frame, widget: &Widget, area: Rect) {
    let block = Block::default()
        .title(" stylechat ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let look = ButtonLook::from_styles(widget.styles());
    let (width, height) = look.size(BUTTON_LABEL);
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let button_area = centered_rect(width.min(inner.width), height, halves[0]);
    let mut button_block = Block::default().padding(look.padding).style(look.style);
    if let Some(border_type) = look.border {
        button_block = button_block
            .borders(Borders::ALL)
            .border_type(border_type)
            .border_style(look.style);
    }
    frame.render_widget(Clear, button_area);
    frame.render_widget(
        Paragraph::new(BUTTON_LABEL)
            .style(look.style)
            .block(button_block),
        button_area,
    );

    frame.render_widget(
        Paragraph::new(widget.styles().to_pretty_json())
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Left),
        halves[1],
    );
}

/// The chat panel: transcript on top, input line at the bottom.
fn draw_panel(frame: &mut Frame, widget: &Widget, input: &Input, spinner: usize, area: Rect) {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(" Style Assistant ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(inner);

    let lines: Vec<Line> = widget
        .transcript()
        .entries()
        .iter()
        .map(|entry| match entry.role {
            Role::User => Line::from(Span::styled(
                entry.content.as_str(),
                Style::default().fg(Color::Cyan),
            ))
            .alignment(Alignment::Right),
            Role::Assistant => Line::from(Span::styled(
                entry.content.as_str(),
                Style::default().fg(Color::Gray),
            )),
        })
        .collect();
    if widget.transcript().is_empty() {
        frame.render_widget(
            Paragraph::new(EMPTY_HINT)
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true }),
            parts[0],
        );
    } else {
        let transcript = Paragraph::new(lines).wrap(Wrap { trim: false });
        // Keep the newest entries in view.
        let overflow = transcript
            .line_count(parts[0].width)
            .saturating_sub(parts[0].height as usize) as u16;
        frame.render_widget(transcript.scroll((overflow, 0)), parts[0]);
    }

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let input_area = input_block.inner(parts[1]);
    frame.render_widget(input_block, parts[1]);

    if widget.is_loading() {
        let pending = widget.pending_input().unwrap_or_default();
        let line = Line::from(vec![
            Span::styled(SPINNER[spinner % SPINNER.len()], Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            Span::styled(pending, Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), input_area);
        return;
    }

    if input.value().is_empty() {
        frame.render_widget(
            Paragraph::new(PLACEHOLDER).style(Style::default().fg(Color::DarkGray)),
            input_area,
        );
        frame.set_cursor_position((input_area.x, input_area.y));
        return;
    }

    // Scroll the input if cursor is beyond visible area
    let input_width = input_area.width as usize;
    let cursor_pos = input.visual_cursor();
    let scroll = if cursor_pos >= input_width {
        cursor_pos - input_width + 1
    } else {
        0
    };
    let visible_value: String = input.value().chars().skip(scroll).take(input_width).collect();
    frame.render_widget(
        Paragraph::new(Span::styled(visible_value, Style::default().fg(Color::White))),
        input_area,
    );
    frame.set_cursor_position((input_area.x + (cursor_pos - scroll) as u16, input_area.y));
}

/// Create a centered rectangle.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}
