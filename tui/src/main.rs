use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use arboard::Clipboard;
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use drill_core::{load_deck, open_rating_log, Deck, Rating, ReviewSession, Step};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;

mod config;

const TICK_MS: u64 = 100;
const LOG_PATH_VAR: &str = "DRILL_LOG_PATH";
const EMPTY_DECK_TEXT: &str = "No cards available.";
const WRAP_TEXT: &str = "Reached the end of the deck. Restarting from the beginning.";

#[derive(Parser)]
#[command(name = "drill", about = "Question/answer flashcard drill", version)]
struct Cli {
    /// Deck file (default: cards.yaml beside the executable, else in the working directory)
    #[arg(long, global = true)]
    deck: Option<PathBuf>,

    /// Rating log file (default: ratings.log)
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    /// Config file (default: config.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the loaded deck and exit
    List,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config::data_dir().join("config.toml"));
    let config = config::load_config(&config_path)?;
    let session_config = config.session;

    let deck_path = config::resolve_deck_path(
        cli.deck.as_deref(),
        &session_config,
        config::exe_dir().as_deref(),
    );
    let deck = load_deck(&deck_path, session_config.parse_options());

    if let Some(Command::List) = cli.command {
        print_deck(&deck);
        return Ok(());
    }

    let log_path = config::resolve_log_path(cli.log.as_deref(), &session_config);
    let sink = open_rating_log(&log_path, session_config.rating_code);
    let mut app = App::new(ReviewSession::new(deck, sink));

    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    run_app(&mut terminal, &mut app).context("terminal session failed")
}

/// Raw mode and the alternate screen for as long as the guard lives.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = TerminalGuard;
        crossterm::execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
    }
}

fn init_logging() {
    let Ok(path) = std::env::var(LOG_PATH_VAR) else {
        return;
    };
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("cannot open {LOG_PATH_VAR}={path}: {err}");
            return;
        }
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn print_deck(deck: &Deck) {
    for card in deck.iter() {
        println!("[{}] {} -> {}", card.id, card.question, card.answer);
    }
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(TICK_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(app, key) {
                    return Ok(());
                }
            }
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => return true,
            KeyCode::Char('a') => {
                if app.mode != Mode::AddCard {
                    app.start_add(None);
                }
                return false;
            }
            _ => {}
        }
    }

    match app.mode {
        Mode::Review => handle_review_key(app, key),
        Mode::AddCard => handle_add_key(app, key),
        Mode::Message if key.code == KeyCode::Esc => true,
        Mode::Message => {
            app.message = None;
            app.mode = Mode::Review;
            false
        }
    }
}

fn handle_review_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char(' ') | KeyCode::Enter => {
            if app.session.show_answer() == Step::Revealed {
                app.message = None;
            }
        }
        KeyCode::Char('1') => app.rate(Rating::Bad),
        KeyCode::Char('2') => app.rate(Rating::Meh),
        KeyCode::Char('3') => app.rate(Rating::Good),
        KeyCode::Char('a') => app.start_add(None),
        KeyCode::Char('c') => {
            let mut clipboard = Clipboard::new().ok();
            let text = clipboard
                .as_mut()
                .and_then(|cb| cb.get_text().ok())
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty());
            if text.is_none() {
                app.set_message("Clipboard is empty or unavailable".to_string());
            } else {
                app.start_add(text);
            }
        }
        _ => {}
    }
    false
}

fn handle_add_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.clear_add_inputs();
            app.message = None;
            app.mode = Mode::Review;
        }
        KeyCode::Tab | KeyCode::BackTab => app.toggle_add_field(),
        KeyCode::Enter => app.save_card(),
        KeyCode::Backspace => {
            app.active_input_mut().pop();
        }
        KeyCode::Char(ch) => app.active_input_mut().push(ch),
        _ => {}
    }
    false
}

fn ui(frame: &mut ratatui::Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)].as_ref())
        .split(frame.size());

    match app.mode {
        Mode::Review => render_review(frame, app, chunks[0]),
        Mode::AddCard => render_add(frame, app, chunks[0]),
        Mode::Message => frame.render_widget(render_message(app), chunks[0]),
    }
    frame.render_widget(render_footer(app), chunks[1]);
}

fn render_review(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage(50),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let session = &app.session;
    let (title, question) = match session.current_card() {
        Some(card) => (
            format!("Question {}/{}", session.index() + 1, session.deck().len()),
            card.question.as_str(),
        ),
        None => ("Question".to_string(), EMPTY_DECK_TEXT),
    };
    let question = Paragraph::new(question)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(question, chunks[0]);

    let can_reveal = session.current_card().is_some() && !session.can_rate();
    let mut reveal = Line::from(Span::styled(
        "Space/Enter  Show Answer",
        control_style(can_reveal),
    ));
    if let Some(message) = &app.message {
        reveal.spans.push(Span::raw("   "));
        reveal.spans.push(Span::styled(
            message.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    }
    let reveal = Paragraph::new(reveal).block(Block::default().borders(Borders::ALL));
    frame.render_widget(reveal, chunks[1]);

    let answer = Paragraph::new(session.visible_answer().unwrap_or(""))
        .block(Block::default().borders(Borders::ALL).title("Answer"))
        .wrap(Wrap { trim: false });
    frame.render_widget(answer, chunks[2]);

    let buttons = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ]
            .as_ref(),
        )
        .split(chunks[3]);

    let enabled = session.can_rate();
    for (idx, rating) in [Rating::Bad, Rating::Meh, Rating::Good].into_iter().enumerate() {
        let button = Paragraph::new(format!("{}  {}", idx + 1, rating.label()))
            .style(control_style(enabled))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(control_style(enabled)),
            );
        frame.render_widget(button, buttons[idx]);
    }
}

fn control_style(enabled: bool) -> Style {
    if enabled {
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_add(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3)].as_ref())
        .split(area);

    let mut text = Text::default();
    text.lines.push(Line::from("Add Card"));
    if let Some(message) = &app.message {
        text.lines.push(Line::from(""));
        text.lines.push(Line::from(Span::styled(
            message,
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }

    let header = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Add"))
        .wrap(Wrap { trim: false });
    frame.render_widget(header, chunks[0]);

    let boxes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(chunks[1]);

    let active_style = Style::default()
        .fg(Color::Blue)
        .add_modifier(Modifier::BOLD);
    let fields = [
        (AddField::Question, "Question", app.question_input.as_str()),
        (AddField::Answer, "Answer", app.answer_input.as_str()),
    ];
    for (slot, (field, title, value)) in fields.into_iter().enumerate() {
        let input = Paragraph::new(value)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .border_style(if app.add_field == field {
                        active_style
                    } else {
                        Style::default()
                    }),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(input, boxes[slot]);
    }
}

fn render_message(app: &App) -> Paragraph<'_> {
    let message = app.message.clone().unwrap_or_default();
    Paragraph::new(message)
        .block(Block::default().borders(Borders::ALL).title("Message"))
        .wrap(Wrap { trim: true })
}

fn render_footer(app: &App) -> Paragraph<'_> {
    let info = match app.mode {
        Mode::Review => {
            "Space/Enter reveal | 1 bad | 2 meh | 3 good | a add | c add from clipboard | Esc quit"
        }
        Mode::AddCard => "Enter save | Tab switch | Esc cancel | Ctrl+Q quit",
        Mode::Message => "Any key continue | Ctrl+Q quit",
    };

    Paragraph::new(info).block(Block::default().borders(Borders::ALL).title("Controls"))
}

#[derive(Debug)]
struct App {
    mode: Mode,
    session: ReviewSession,
    question_input: String,
    answer_input: String,
    add_field: AddField,
    message: Option<String>,
}

impl App {
    fn new(session: ReviewSession) -> Self {
        Self {
            mode: Mode::Review,
            session,
            question_input: String::new(),
            answer_input: String::new(),
            add_field: AddField::Question,
            message: None,
        }
    }

    fn set_message(&mut self, message: String) {
        self.message = Some(message);
    }

    fn rate(&mut self, rating: Rating) {
        match self.session.rate(rating) {
            Step::Advanced { wrapped: true, .. } => {
                self.set_message(WRAP_TEXT.to_string());
                self.mode = Mode::Message;
            }
            Step::Advanced { .. } => self.message = None,
            Step::Ignored | Step::Revealed => {}
        }
    }

    fn start_add(&mut self, prefill: Option<String>) {
        self.clear_add_inputs();
        self.add_field = AddField::Question;
        self.message = None;
        if let Some(text) = prefill {
            self.question_input = text;
            self.add_field = AddField::Answer;
        }
        self.mode = Mode::AddCard;
    }

    fn save_card(&mut self) {
        match self.session.append_card(&self.question_input, &self.answer_input) {
            Ok(card) => {
                let message = format!("Card {} added", card.id);
                self.set_message(message);
                self.clear_add_inputs();
                self.mode = Mode::Review;
            }
            Err(err) => self.set_message(err.to_string()),
        }
    }

    fn toggle_add_field(&mut self) {
        self.add_field = match self.add_field {
            AddField::Question => AddField::Answer,
            AddField::Answer => AddField::Question,
        };
    }

    fn active_input_mut(&mut self) -> &mut String {
        match self.add_field {
            AddField::Question => &mut self.question_input,
            AddField::Answer => &mut self.answer_input,
        }
    }

    fn clear_add_inputs(&mut self) {
        self.question_input.clear();
        self.answer_input.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Review,
    AddCard,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddField {
    Question,
    Answer,
}
