// src/terminal.rs
// This module handles terminal input/output for the bingo game.

use std::io::{self, Write};
use std::thread;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use tokio::sync::mpsc::UnboundedSender;

use crate::board::CalledNumbers;
use crate::card::{Card, CellValue};
use crate::defs::{letter_of, Number, CARDLAYOUT, LETTERS};
use crate::game::{Game, GameEvent, GameState, Highlight};
use crate::scheduler::Scheduler;
use crate::win::WinLine;

const RECENT_CALLS: usize = 6;

const GREEN: &str = "\x1b[1;32m";
const YELLOW: &str = "\x1b[1;33m";
const RED: &str = "\x1b[1;31m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Player intents decoded from key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(isize, isize),
    Mark,
    TogglePause,
    NewGame,
    SwitchCard(isize),
    Quit,
}

/// Front-end state that is not part of the game itself.
#[derive(Debug, Clone)]
pub struct View {
    pub cursor: (usize, usize),
    pub highlights: Vec<Highlight>,
    pub message: String,
    pub confirm_quit: bool,
}

impl View {
    pub fn new() -> Self {
        View {
            cursor: (0, 0),
            highlights: Vec::new(),
            message: String::new(),
            confirm_quit: false,
        }
    }

    pub fn move_cursor(&mut self, dx: isize, dy: isize) {
        let (col, row) = self.cursor;
        let col = (col as isize + dx).rem_euclid(CARDLAYOUT.columns as isize) as usize;
        let row = (row as isize + dy).rem_euclid(CARDLAYOUT.rows as isize) as usize;
        self.cursor = (col, row);
    }

    /// Update highlights and the status message from game events.
    pub fn apply(&mut self, events: &[GameEvent]) {
        for event in events {
            match event {
                GameEvent::NumberCalled { number, highlights, .. } => {
                    self.highlights = highlights.clone();
                    self.message = format!("Called {}", format_call(*number));
                }
                GameEvent::CellMarked { card, col, row } => {
                    self.highlights
                        .retain(|h| !(h.card == *card && h.col == *col && h.row == *row));
                }
                GameEvent::PoolExhausted => {
                    self.message = "All numbers have been called".to_string();
                }
                GameEvent::Won(win) => {
                    self.highlights.clear();
                    self.message = format!("BINGO! {} Winner! Press N for a new game", win.line);
                }
                GameEvent::StateChanged(GameState::Paused) => {
                    self.message = "Paused - press P to resume".to_string();
                }
                GameEvent::StateChanged(GameState::Active) => {
                    self.message.clear();
                }
                GameEvent::StateChanged(_) => {}
            }
        }
    }

    /// Decode a key press. While the quit prompt is open only y/n matter.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        if self.confirm_quit {
            self.confirm_quit = false;
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(Command::Quit),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Left | KeyCode::Char('h') => Some(Command::Move(-1, 0)),
            KeyCode::Right | KeyCode::Char('l') => Some(Command::Move(1, 0)),
            KeyCode::Up | KeyCode::Char('k') => Some(Command::Move(0, -1)),
            KeyCode::Down | KeyCode::Char('j') => Some(Command::Move(0, 1)),
            KeyCode::Enter | KeyCode::Char(' ') => Some(Command::Mark),
            KeyCode::Char('p') | KeyCode::Char('P') => Some(Command::TogglePause),
            KeyCode::Char('n') | KeyCode::Char('N') => Some(Command::NewGame),
            KeyCode::Tab | KeyCode::Char(']') => Some(Command::SwitchCard(1)),
            KeyCode::BackTab | KeyCode::Char('[') => Some(Command::SwitchCard(-1)),
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.confirm_quit = true;
                None
            }
            _ => None,
        }
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw mode plus alternate screen for as long as the guard lives.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Read key presses on a dedicated thread and forward them to the event loop.
/// The thread ends when the receiving side is dropped.
pub fn spawn_input_reader(sender: UnboundedSender<KeyEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        loop {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if sender.send(key).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    })
}

/// Announce a number the way it is called out loud, e.g. "N-42".
pub fn format_call(number: Number) -> String {
    format!("{}-{}", letter_of(number), number)
}

pub fn format_recent(called: &CalledNumbers) -> String {
    let recent: Vec<String> = called
        .recent(RECENT_CALLS)
        .iter()
        .map(|n| n.to_string())
        .collect();
    format!("Recent: {}", recent.join(" \u{2022} "))
}

fn cell_label(value: CellValue) -> String {
    match value {
        CellValue::Number(number) => format!("{number:^4}"),
        CellValue::Free => "FREE".to_string(),
    }
}

/// Text lines for one card. The cursor cell is bracketed; marked cells are
/// green, freshly called ones yellow and the winning line red.
pub fn render_card_lines(
    card: &Card,
    card_index: usize,
    view: &View,
    cursor_visible: bool,
    winning: Option<WinLine>,
) -> Vec<String> {
    let mut lines = Vec::with_capacity(CARDLAYOUT.rows + 1);

    let header: String = LETTERS.iter().map(|letter| format!("  {letter:^4} ")).collect();
    lines.push(header);

    for row in 0..CARDLAYOUT.rows {
        let mut line = String::new();
        for col in 0..CARDLAYOUT.columns {
            let cell = card.grid()[col][row];
            let label = cell_label(cell.value);
            let highlighted = view
                .highlights
                .iter()
                .any(|h| h.card == card_index && h.col == col && h.row == row);

            let color = if winning.is_some_and(|line| line.contains(col, row)) {
                RED
            } else if cell.marked {
                GREEN
            } else if highlighted {
                YELLOW
            } else {
                ""
            };
            let (open, close) = if cursor_visible && view.cursor == (col, row) {
                ('[', ']')
            } else {
                (' ', ' ')
            };

            if color.is_empty() {
                line.push_str(&format!(" {open}{label}{close}"));
            } else {
                line.push_str(&format!(" {open}{color}{label}{RESET}{close}"));
            }
        }
        lines.push(line);
    }

    lines
}

fn state_label(state: GameState) -> String {
    match state {
        GameState::Idle => format!("{DIM}READY{RESET}"),
        GameState::Active => format!("{GREEN}PLAYING{RESET}"),
        GameState::Paused => format!("{YELLOW}PAUSED{RESET}"),
        GameState::Won => format!("{RED}BINGO!{RESET}"),
    }
}

pub fn draw<S: Scheduler, W: Write>(out: &mut W, game: &Game<S>, view: &View) -> io::Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    let caller = game.caller();
    let mut lines = vec![
        format!("  B I N G O    {}    [{}]", game.id(), state_label(game.state())),
        String::new(),
    ];

    match caller.last_called() {
        Some(number) => lines.push(format!(
            "  Last call: {GREEN}{}{RESET}    Remaining: {}",
            format_call(number),
            caller.remaining()
        )),
        None => lines.push(format!("  Waiting for the first call...    Remaining: {}", caller.remaining())),
    }
    lines.push(format!("  {}", format_recent(caller.called())));
    lines.push(String::new());

    let card_index = game.active_card_index();
    if game.cards().len() > 1 {
        lines.push(format!("  Card {} of {}", card_index + 1, game.cards().len()));
    }
    let winning = game
        .winner()
        .filter(|win| win.card == card_index)
        .map(|win| win.line);
    let cursor_visible = matches!(game.state(), GameState::Active | GameState::Paused);
    for line in render_card_lines(game.active_card(), card_index, view, cursor_visible, winning) {
        lines.push(format!("  {line}"));
    }
    lines.push(String::new());

    if view.confirm_quit {
        lines.push(format!("  {RED}Quit Game?{RESET} Your progress will be lost. (y/n)"));
    } else if !view.message.is_empty() {
        lines.push(format!("  {}", view.message));
    } else {
        lines.push(String::new());
    }
    lines.push(String::new());

    let mut help = String::from("  arrows: move  enter/space: mark  p: pause  n: new game");
    if game.cards().len() > 1 {
        help.push_str("  tab: next card");
    }
    help.push_str("  q: quit");
    lines.push(format!("{DIM}{help}{RESET}"));

    // Raw mode needs explicit carriage returns
    for line in lines {
        write!(out, "{line}\r\n")?;
    }
    out.flush()
}
