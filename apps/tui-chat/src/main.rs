//! Full-screen terminal chat over the hosted model.
//!
//! Run with: cargo run -p tui-chat
//!
//! Requires `GEMINI_API_KEY`. Enter sends, Ctrl+L clears the history,
//! Ctrl+C quits.

mod typewriter;

use std::{io, sync::Arc, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use palaver_core::{Message, Role};
use palaver_model::GeminiClient;
use palaver_session::{DispatchMode, Dispatcher};
use palaver_transport::{ServerMessage, tui::TuiBridge};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use typewriter::Typewriter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credential gate, before the terminal is taken over: a missing key
    // halts here and the remote endpoint is never touched.
    let client = match GeminiClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, client).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

struct App {
    messages: Vec<Message>,
    input: String,
    scroll: u16,
    status: String,
    busy: bool,
    reveal: Option<Typewriter>,
    model: String,
}

impl App {
    fn new(model: String) -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            scroll: 0,
            status: "Connected".to_string(),
            busy: false,
            reveal: None,
            model,
        }
    }

    fn handle_server_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::History { messages } => {
                self.messages = messages;
            }
            ServerMessage::Turn { user, assistant } => {
                self.messages.push(user);
                self.reveal = Some(Typewriter::new(assistant.text.clone()));
                self.messages.push(assistant);
                self.busy = false;
                self.status = "Connected".to_string();
            }
            ServerMessage::Cleared => {
                self.messages.clear();
                self.reveal = None;
                self.scroll = 0;
                self.status = "History cleared".to_string();
            }
            ServerMessage::Error { message } => {
                self.busy = false;
                self.status = format!("Error: {message}");
            }
            ServerMessage::Pong => {}
        }
        self.autoscroll();
    }

    fn autoscroll(&mut self) {
        // Approximate: one line per message plus the reveal in flight.
        let visible_lines = 20u16;
        let total = u16::try_from(self.messages.len()).unwrap_or(u16::MAX);
        if total > visible_lines {
            self.scroll = total - visible_lines;
        }
    }

    fn tick_reveal(&mut self) {
        if let Some(reveal) = &mut self.reveal {
            reveal.tick(2);
            if reveal.is_done() {
                self.reveal = None;
            }
        }
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: GeminiClient,
) -> anyhow::Result<()> {
    let model = client.model().to_string();

    // The terminal surface has no image picker; a stateful chat carries
    // the context instead.
    let dispatcher = Dispatcher::new(Arc::new(client), DispatchMode::Chat);
    let (mut bridge, peer) = TuiBridge::new();
    tokio::spawn(peer.run(dispatcher));

    let mut app = App::new(model);

    loop {
        while let Some(msg) = bridge.try_recv() {
            app.handle_server_message(msg);
        }
        app.tick_reveal();

        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(25))? {
            if let Event::Key(key) = event::read()? {
                match key {
                    KeyEvent {
                        code: KeyCode::Char('c'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => {
                        return Ok(());
                    }
                    KeyEvent {
                        code: KeyCode::Char('l'),
                        modifiers: KeyModifiers::CONTROL,
                        ..
                    } => {
                        bridge.send_clear()?;
                    }
                    KeyEvent {
                        code: KeyCode::Char(c),
                        modifiers: KeyModifiers::NONE | KeyModifiers::SHIFT,
                        ..
                    } => {
                        app.input.push(c);
                    }
                    KeyEvent {
                        code: KeyCode::Backspace,
                        ..
                    } => {
                        app.input.pop();
                    }
                    KeyEvent {
                        code: KeyCode::Enter,
                        ..
                    } => {
                        if !app.busy && !app.input.trim().is_empty() {
                            let input = std::mem::take(&mut app.input);
                            bridge.send_prompt(input)?;
                            app.busy = true;
                            app.status = "Waiting for reply...".to_string();
                        }
                    }
                    KeyEvent {
                        code: KeyCode::Up, ..
                    } => {
                        app.scroll = app.scroll.saturating_sub(1);
                    }
                    KeyEvent {
                        code: KeyCode::Down,
                        ..
                    } => {
                        app.scroll = app.scroll.saturating_add(1);
                    }
                    KeyEvent {
                        code: KeyCode::PageUp,
                        ..
                    } => {
                        app.scroll = app.scroll.saturating_sub(10);
                    }
                    KeyEvent {
                        code: KeyCode::PageDown,
                        ..
                    } => {
                        app.scroll = app.scroll.saturating_add(10);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn message_lines(app: &App) -> Vec<Line<'_>> {
    let last = app.messages.len().saturating_sub(1);
    app.messages
        .iter()
        .enumerate()
        .map(|(i, message)| {
            let (who, style) = match message.role {
                Role::User => ("You: ", Style::default().fg(Color::Cyan)),
                Role::Assistant => ("Assistant: ", Style::default().fg(Color::Green)),
            };
            // The newest assistant reply renders through the reveal while
            // one is running; everything else renders statically.
            let text = match (&app.reveal, i == last, message.role) {
                (Some(reveal), true, Role::Assistant) => reveal.visible(),
                _ => message.text.as_str(),
            };
            Line::from(vec![Span::styled(who, style), Span::raw(text)])
        })
        .collect()
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Conversation
            Constraint::Length(3), // Input
            Constraint::Length(1), // Status
        ])
        .split(f.area());

    // Conversation area
    let conversation = Paragraph::new(message_lines(app))
        .block(Block::default().borders(Borders::ALL).title("Conversation"))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    f.render_widget(conversation, chunks[0]);

    // Input area
    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Prompt"));
    f.render_widget(input, chunks[1]);

    // Set cursor
    f.set_cursor_position((chunks[1].x + app.input.len() as u16 + 1, chunks[1].y + 1));

    // Status bar
    let status_style = if app.status.starts_with("Error") {
        Style::default().fg(Color::Red)
    } else if app.busy {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Green)
    };

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(&app.status, status_style),
        Span::raw(" | model: "),
        Span::raw(app.model.as_str()),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" send | "),
        Span::styled("Ctrl+L", Style::default().fg(Color::Yellow)),
        Span::raw(" clear | "),
        Span::styled("Ctrl+C", Style::default().fg(Color::Yellow)),
        Span::raw(" quit "),
    ]));
    f.render_widget(status, chunks[2]);
}
