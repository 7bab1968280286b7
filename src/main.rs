// src/main.rs
// This is the main entry point for the bingo game.
//
// Interactive Controls:
// - ARROWS / hjkl: Move the cursor over the card
// - ENTER / SPACE: Mark the cell under the cursor (only called numbers)
// - P: Pause or resume the number caller
// - N: Start a new game
// - TAB / [ ]: Switch between cards when playing with two
// - Q / ESC: Quit (asks for confirmation)

use std::error::Error;
use std::io;
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use bingo::config::{GameConfig, DEFAULT_CONFIG_PATH};
use bingo::game::Game;
use bingo::logging::{log_info, set_min_level, LogLevel};
use bingo::scheduler::TokioScheduler;
use bingo::terminal::{self, Command, TerminalGuard, View};

#[derive(Parser)]
#[command(name = env!("CARGO_BIN_NAME"))]
#[command(about = "Bingo - mark the called numbers and complete a line")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Number of cards to play with (1 or 2)
    #[arg(short, long)]
    cards: Option<usize>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for reproducible cards and calls
    #[arg(long)]
    seed: Option<u64>,

    /// Shortest pause between two calls, in milliseconds
    #[arg(long)]
    min_delay: Option<u64>,

    /// Longest pause between two calls, in milliseconds
    #[arg(long)]
    max_delay: Option<u64>,

    /// Log debug lines to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<GameConfig, Box<dyn Error>> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut config = GameConfig::load_or_default(&path);

    if let Some(cards) = args.cards {
        config.cards = cards;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(min_delay) = args.min_delay {
        config.min_delay_ms = min_delay;
    }
    if let Some(max_delay) = args.max_delay {
        config.max_delay_ms = max_delay;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    set_min_level(if args.verbose { LogLevel::Debug } else { LogLevel::Info });

    let config = build_config(&args)?;
    let (min_delay, max_delay) = config.delay_range();
    log_info(&format!(
        "Starting with {} card(s), calls every {:?} to {:?}",
        config.cards, min_delay, max_delay
    ));

    let (scheduler, mut timers) = TokioScheduler::new();
    let mut game = Game::new(&config, scheduler);

    // Keep stderr quiet while the board owns the screen unless asked otherwise
    if !args.verbose {
        set_min_level(LogLevel::Warning);
    }

    let (key_sender, mut keys) = mpsc::unbounded_channel();
    let guard = TerminalGuard::enter()?;
    terminal::spawn_input_reader(key_sender);

    let mut stdout = io::stdout();
    let mut view = View::new();
    view.apply(&game.start());
    terminal::draw(&mut stdout, &game, &view)?;

    loop {
        tokio::select! {
            Some(id) = timers.recv() => {
                game.scheduler_mut().fired(id);
                let events = game.on_timer(id);
                view.apply(&events);
            }
            key = keys.recv() => {
                let Some(key) = key else { break };
                match view.handle_key(key) {
                    Some(Command::Quit) => break,
                    Some(Command::Move(dx, dy)) => view.move_cursor(dx, dy),
                    Some(Command::Mark) => {
                        let (col, row) = view.cursor;
                        let card = game.active_card_index();
                        let events = game.mark(card, col, row);
                        view.apply(&events);
                    }
                    Some(Command::TogglePause) => {
                        let events = game.toggle_pause();
                        view.apply(&events);
                    }
                    Some(Command::NewGame) => {
                        view = View::new();
                        let events = game.reset();
                        view.apply(&events);
                    }
                    Some(Command::SwitchCard(direction)) => {
                        game.switch_card(direction);
                    }
                    None => {}
                }
            }
        }
        terminal::draw(&mut stdout, &game, &view)?;
    }

    drop(guard);
    set_min_level(if args.verbose { LogLevel::Debug } else { LogLevel::Info });
    log_info(&format!("Game ended: {}", game.game_info()));

    Ok(())
}
