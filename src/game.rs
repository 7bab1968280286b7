// src/game.rs
// This module provides the Game struct that owns the cards, the number caller
// and the round state, and turns player commands and timer fires into events
// for the front end.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::caller::{Call, NumberCaller};
use crate::card::{generate_cards, Card};
use crate::config::GameConfig;
use crate::defs::{letter_of, Number, MAXCARDS};
use crate::logging::{log_debug, log_info, log_warning};
use crate::scheduler::{Scheduler, TimerId};
use crate::win::{detect_win, WinLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Idle,
    Active,
    Paused,
    Won,
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameState::Idle => "idle",
            GameState::Active => "active",
            GameState::Paused => "paused",
            GameState::Won => "won",
        };
        f.write_str(name)
    }
}

/// The line that ended a round and the card it was completed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Win {
    pub card: usize,
    pub line: WinLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub card: usize,
    pub col: usize,
    pub row: usize,
}

/// Everything the front end needs to react to, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    StateChanged(GameState),
    NumberCalled {
        number: Number,
        letter: char,
        highlights: Vec<Highlight>,
    },
    PoolExhausted,
    CellMarked {
        card: usize,
        col: usize,
        row: usize,
    },
    Won(Win),
}

/// Serializable view of a game for front ends and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: String,
    pub state: GameState,
    pub cards: Vec<Card>,
    pub active_card: usize,
    pub called: Vec<Number>,
    pub remaining: usize,
    pub winner: Option<Win>,
}

pub struct Game<S: Scheduler> {
    id: String,
    created_at: SystemTime,
    state: GameState,
    cards: Vec<Card>,
    active_card: usize,
    caller: NumberCaller,
    winner: Option<Win>,
    rng: StdRng,
    scheduler: S,
}

impl<S: Scheduler> Game<S> {
    /// Create an idle game with freshly dealt cards.
    pub fn new(config: &GameConfig, scheduler: S) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let card_count = config.cards.clamp(1, MAXCARDS);
        let min_delay_ms = config.min_delay_ms.min(config.max_delay_ms);
        let max_delay_ms = config.max_delay_ms.max(config.min_delay_ms);
        let cards = generate_cards(&mut rng, card_count);
        let id = new_game_id(&mut rng);

        Self {
            id,
            created_at: SystemTime::now(),
            state: GameState::Idle,
            cards,
            active_card: 0,
            caller: NumberCaller::new(min_delay_ms, max_delay_ms),
            winner: None,
            rng,
            scheduler,
        }
    }

    /// Idle -> Active. Ignored in any other state.
    pub fn start(&mut self) -> Vec<GameEvent> {
        if self.state != GameState::Idle {
            return Vec::new();
        }

        for index in 0..self.cards.len() {
            if !self.cards[index].validate() {
                log_warning(&format!("Card {} failed validation, dealing a new one", index + 1));
                self.cards[index].reset(&mut self.rng);
            }
        }

        self.caller.start(&mut self.rng, &mut self.scheduler);
        self.state = GameState::Active;
        log_info(&format!("Round started: {}", self.game_info()));
        vec![GameEvent::StateChanged(GameState::Active)]
    }

    /// Active -> Paused. Ignored in any other state.
    pub fn pause(&mut self) -> Vec<GameEvent> {
        if self.state != GameState::Active {
            return Vec::new();
        }
        self.caller.pause(&mut self.scheduler);
        self.state = GameState::Paused;
        log_info(&format!("Game {} paused", self.id));
        vec![GameEvent::StateChanged(GameState::Paused)]
    }

    /// Paused -> Active, calling a number right away. Ignored in any other state.
    pub fn resume(&mut self) -> Vec<GameEvent> {
        if self.state != GameState::Paused {
            return Vec::new();
        }
        self.state = GameState::Active;
        log_info(&format!("Game {} resumed", self.id));

        let mut events = vec![GameEvent::StateChanged(GameState::Active)];
        let call = self.caller.resume(&mut self.rng, &mut self.scheduler);
        events.extend(self.call_events(call));
        events
    }

    pub fn toggle_pause(&mut self) -> Vec<GameEvent> {
        match self.state {
            GameState::Active => self.pause(),
            GameState::Paused => self.resume(),
            _ => Vec::new(),
        }
    }

    /// Abandon the current round from any state and start a new one.
    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.caller.reset(&mut self.scheduler);
        for card in &mut self.cards {
            card.reset(&mut self.rng);
        }
        self.winner = None;
        self.id = new_game_id(&mut self.rng);
        self.created_at = SystemTime::now();
        self.state = GameState::Idle;
        log_info(&format!("Game reset, new game ID: {}", self.id));

        self.start()
    }

    /// Mark a cell of one card for the player. Only numbers already called
    /// can be marked, and only while the round is running or paused.
    pub fn mark(&mut self, card: usize, col: usize, row: usize) -> Vec<GameEvent> {
        if !matches!(self.state, GameState::Active | GameState::Paused) {
            return Vec::new();
        }

        let caller = &self.caller;
        let Some(target) = self.cards.get_mut(card) else {
            return Vec::new();
        };
        if !target.mark(col, row, |number| caller.is_called(number)) {
            return Vec::new();
        }

        let mut events = vec![GameEvent::CellMarked { card, col, row }];
        if let Some(line) = detect_win(target) {
            events.extend(self.win(Win { card, line }));
        }
        events
    }

    /// Feed a fired timer back into the game.
    pub fn on_timer(&mut self, id: TimerId) -> Vec<GameEvent> {
        if self.state != GameState::Active {
            log_debug(&format!("Timer {id:?} fired while {}", self.state));
            return Vec::new();
        }
        let call = self.caller.on_timer(id, &mut self.rng, &mut self.scheduler);
        self.call_events(call)
    }

    /// Cycle the card shown to the player, wrapping at both ends.
    pub fn switch_card(&mut self, direction: isize) -> usize {
        let count = self.cards.len() as isize;
        self.active_card = (self.active_card as isize + direction).rem_euclid(count) as usize;
        self.active_card
    }

    fn win(&mut self, win: Win) -> Vec<GameEvent> {
        self.caller.stop(&mut self.scheduler);
        self.winner = Some(win);
        self.state = GameState::Won;
        log_info(&format!(
            "BINGO! {} on card {} after {} calls (game {})",
            win.line,
            win.card + 1,
            self.caller.called().len(),
            self.id
        ));
        vec![GameEvent::Won(win), GameEvent::StateChanged(GameState::Won)]
    }

    fn call_events(&self, call: Option<Call>) -> Vec<GameEvent> {
        match call {
            Some(Call::Called(number)) => {
                let highlights = self
                    .cards
                    .iter()
                    .enumerate()
                    .filter_map(|(card, c)| {
                        c.highlight(number).map(|(col, row)| Highlight { card, col, row })
                    })
                    .collect();
                vec![GameEvent::NumberCalled {
                    number,
                    letter: letter_of(number),
                    highlights,
                }]
            }
            Some(Call::Exhausted) => {
                log_info(&format!("Game {}: every number has been called", self.id));
                vec![GameEvent::PoolExhausted]
            }
            None => Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get a human-readable creation time string
    pub fn created_at_string(&self) -> String {
        match self.created_at.duration_since(std::time::UNIX_EPOCH) {
            Ok(duration) => {
                let datetime: DateTime<Utc> = DateTime::from_timestamp(duration.as_secs() as i64, 0)
                    .unwrap_or_else(Utc::now);
                datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
            }
            Err(_) => "Unknown time".to_string(),
        }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn active_card_index(&self) -> usize {
        self.active_card
    }

    pub fn active_card(&self) -> &Card {
        &self.cards[self.active_card]
    }

    pub fn caller(&self) -> &NumberCaller {
        &self.caller
    }

    pub fn is_called(&self, number: Number) -> bool {
        self.caller.is_called(number)
    }

    pub fn winner(&self) -> Option<Win> {
        self.winner
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Get game information as a formatted string for logging
    pub fn game_info(&self) -> String {
        format!(
            "Game[id={}, created={}, state={}, cards={}, called={}, remaining={}]",
            self.id,
            self.created_at_string(),
            self.state,
            self.cards.len(),
            self.caller.called().len(),
            self.caller.remaining()
        )
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id.clone(),
            state: self.state,
            cards: self.cards.clone(),
            active_card: self.active_card,
            called: self.caller.called().numbers().to_vec(),
            remaining: self.caller.remaining(),
            winner: self.winner,
        }
    }
}

fn new_game_id<R: Rng>(rng: &mut R) -> String {
    format!("game_{:08x}", rng.random::<u32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::{FIRSTNUMBER, LASTNUMBER};
    use crate::scheduler::ManualScheduler;
    use crate::win::Diagonal;
    use std::time::Duration;

    fn new_game(cards: usize, seed: u64) -> Game<ManualScheduler> {
        let config = GameConfig {
            cards,
            seed: Some(seed),
            ..GameConfig::default()
        };
        Game::new(&config, ManualScheduler::new())
    }

    /// Fire the next pending timer, returning the events it produced.
    fn tick(game: &mut Game<ManualScheduler>) -> Vec<GameEvent> {
        let fired = game.scheduler_mut().advance_to_next();
        fired.into_iter().flat_map(|id| game.on_timer(id)).collect()
    }

    /// Keep calling until every listed number has been called.
    fn call_until(game: &mut Game<ManualScheduler>, numbers: &[Number]) {
        for _ in 0..=LASTNUMBER {
            if numbers.iter().all(|&n| game.is_called(n)) {
                return;
            }
            tick(game);
        }
        panic!("numbers {numbers:?} never called");
    }

    fn line_numbers(game: &Game<ManualScheduler>, card: usize, line: WinLine) -> Vec<Number> {
        line.cells()
            .iter()
            .filter_map(|&(col, row)| game.cards()[card].cell(col, row).and_then(|c| c.number()))
            .collect()
    }

    fn win_with(game: &mut Game<ManualScheduler>, card: usize, line: WinLine) -> Vec<GameEvent> {
        let numbers = line_numbers(game, card, line);
        call_until(game, &numbers);
        line.cells()
            .iter()
            .flat_map(|&(col, row)| game.mark(card, col, row))
            .collect()
    }

    #[test]
    fn test_game_creation() {
        let game = new_game(1, 1);
        assert_eq!(game.state(), GameState::Idle);
        assert_eq!(game.cards().len(), 1);
        assert!(game.caller().called().is_empty());
        assert_eq!(game.caller().remaining(), 75);
        assert!(game.winner().is_none());
        assert!(game.id().starts_with("game_"));
        assert_eq!(game.id().len(), 13); // "game_" + 8 hex chars
        assert!(game.created_at_string().contains("UTC"));
    }

    #[test]
    fn test_card_count_is_clamped() {
        assert_eq!(new_game(2, 1).cards().len(), 2);
        assert_eq!(new_game(5, 1).cards().len(), MAXCARDS);
        assert_eq!(new_game(0, 1).cards().len(), 1);
    }

    #[test]
    fn test_swapped_delay_range_is_normalised() {
        let config = GameConfig {
            cards: 5,
            min_delay_ms: 6000,
            max_delay_ms: 5000,
            seed: Some(1),
        };
        let mut game = Game::new(&config, ManualScheduler::new());
        game.start();

        assert!(game.scheduler_mut().advance(Duration::from_millis(4999)).is_empty());
        assert!(!tick(&mut game).is_empty());
        assert_eq!(game.caller().called().len(), 1);
    }

    #[test]
    fn test_start_then_timed_calls() {
        let mut game = new_game(1, 2);
        assert_eq!(game.start(), vec![GameEvent::StateChanged(GameState::Active)]);
        assert!(game.caller().called().is_empty());

        let events = tick(&mut game);
        assert_eq!(events.len(), 1);
        let GameEvent::NumberCalled { number, letter, .. } = &events[0] else {
            panic!("expected a call, got {events:?}");
        };
        assert!(game.is_called(*number));
        assert_eq!(*letter, letter_of(*number));
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut game = new_game(1, 3);
        game.start();
        assert!(game.start().is_empty());
        assert_eq!(game.scheduler().pending_len(), 1);
    }

    #[test]
    fn test_called_number_highlights_cards() {
        let mut game = new_game(2, 4);
        game.start();
        for _ in 0..30 {
            for event in tick(&mut game) {
                if let GameEvent::NumberCalled { number, highlights, .. } = event {
                    for (index, card) in game.cards().iter().enumerate() {
                        let expected = card
                            .highlight(number)
                            .map(|(col, row)| Highlight { card: index, col, row });
                        let found = highlights.iter().find(|h| h.card == index).copied();
                        assert_eq!(found, expected);
                    }
                }
            }
        }
    }

    #[test]
    fn test_invalid_transitions_are_ignored() {
        let mut game = new_game(1, 5);
        assert!(game.pause().is_empty());
        assert!(game.resume().is_empty());
        assert!(game.toggle_pause().is_empty());
        assert_eq!(game.state(), GameState::Idle);

        game.start();
        assert!(game.resume().is_empty());
        assert_eq!(game.state(), GameState::Active);

        game.pause();
        assert!(game.pause().is_empty());
        assert_eq!(game.state(), GameState::Paused);
    }

    #[test]
    fn test_mark_free_cell_is_rejected() {
        let mut game = new_game(1, 6);
        game.start();
        let before = game.active_card().clone();
        assert!(game.mark(0, 2, 2).is_empty());
        assert_eq!(game.active_card(), &before);
    }

    #[test]
    fn test_mark_uncalled_number_is_rejected() {
        let mut game = new_game(1, 7);
        game.start();
        assert!(game.mark(0, 0, 0).is_empty());
        assert!(!game.active_card().is_marked(0, 0));
    }

    #[test]
    fn test_mark_twice_is_idempotent() {
        let mut game = new_game(1, 8);
        game.start();
        let number = game.active_card().cell(3, 4).unwrap().number().unwrap();
        call_until(&mut game, &[number]);

        assert_eq!(game.mark(0, 3, 4), vec![GameEvent::CellMarked { card: 0, col: 3, row: 4 }]);
        let after_first = game.active_card().clone();
        assert!(game.mark(0, 3, 4).is_empty());
        assert_eq!(game.active_card(), &after_first);
    }

    #[test]
    fn test_mark_out_of_range_card() {
        let mut game = new_game(1, 9);
        game.start();
        assert!(game.mark(3, 0, 0).is_empty());
    }

    #[test]
    fn test_mark_refused_while_idle() {
        let mut game = new_game(1, 10);
        assert!(game.mark(0, 0, 0).is_empty());
    }

    #[test]
    fn test_marking_allowed_while_paused() {
        let mut game = new_game(1, 11);
        game.start();
        let number = game.active_card().cell(0, 1).unwrap().number().unwrap();
        call_until(&mut game, &[number]);
        game.pause();
        assert_eq!(game.mark(0, 0, 1).len(), 1);
        assert_eq!(game.state(), GameState::Paused);
    }

    #[test]
    fn test_top_row_wins_as_row_1() {
        let mut game = new_game(1, 12);
        game.start();
        let events = win_with(&mut game, 0, WinLine::Row(0));

        let win = Win { card: 0, line: WinLine::Row(0) };
        assert_eq!(events.last(), Some(&GameEvent::StateChanged(GameState::Won)));
        assert!(events.contains(&GameEvent::Won(win)));
        assert_eq!(game.state(), GameState::Won);
        assert_eq!(game.winner(), Some(win));
        assert_eq!(win.line.to_string(), "Row 1");
    }

    #[test]
    fn test_win_stops_the_caller() {
        let mut game = new_game(1, 13);
        game.start();
        win_with(&mut game, 0, WinLine::Diagonal(Diagonal::Main));

        let called = game.caller().called().len();
        assert!(!game.caller().is_active());
        assert_eq!(game.scheduler().pending_len(), 0);
        assert!(game.scheduler_mut().advance(Duration::from_secs(60)).is_empty());
        assert_eq!(game.caller().called().len(), called);
        assert!(game.pause().is_empty());
        assert!(game.resume().is_empty());
        assert!(game.mark(0, 0, 4).is_empty());
    }

    #[test]
    fn test_pause_blocks_calls_and_resume_calls_immediately() {
        let mut game = new_game(1, 14);
        game.start();
        tick(&mut game);
        assert_eq!(game.caller().called().len(), 1);

        game.pause();
        let fired = game.scheduler_mut().advance(Duration::from_secs(30));
        assert!(fired.is_empty());
        assert_eq!(game.caller().called().len(), 1);

        let events = game.resume();
        assert_eq!(events[0], GameEvent::StateChanged(GameState::Active));
        assert!(matches!(events[1], GameEvent::NumberCalled { .. }));
        assert_eq!(game.caller().called().len(), 2);
    }

    #[test]
    fn test_timer_fired_before_pause_is_ignored() {
        let mut game = new_game(1, 15);
        game.start();
        let fired = game.scheduler_mut().advance(Duration::from_secs(5));
        assert_eq!(fired.len(), 1);

        game.pause();
        assert!(game.on_timer(fired[0]).is_empty());
        assert!(game.caller().called().is_empty());
    }

    #[test]
    fn test_toggle_pause() {
        let mut game = new_game(1, 16);
        game.start();
        game.toggle_pause();
        assert_eq!(game.state(), GameState::Paused);
        game.toggle_pause();
        assert_eq!(game.state(), GameState::Active);
    }

    #[test]
    fn test_reset_after_win() {
        let mut game = new_game(1, 17);
        game.start();
        win_with(&mut game, 0, WinLine::Column(1));
        let old_card = game.active_card().clone();
        let old_id = game.id().to_string();

        assert_eq!(game.reset(), vec![GameEvent::StateChanged(GameState::Active)]);
        assert_eq!(game.state(), GameState::Active);
        assert!(game.caller().called().is_empty());
        assert_eq!(game.caller().remaining(), 75);
        assert!(game.winner().is_none());
        assert_eq!(game.active_card().marked_count(), 1);
        assert_ne!(game.active_card().grid(), old_card.grid());
        assert_ne!(game.id(), old_id);
        assert_eq!(game.scheduler().pending_len(), 1);
    }

    #[test]
    fn test_reset_from_any_state_ends_active() {
        let mut game = new_game(1, 18);
        game.reset();
        assert_eq!(game.state(), GameState::Active);

        game.pause();
        game.reset();
        assert_eq!(game.state(), GameState::Active);
        assert_eq!(game.scheduler().pending_len(), 1);
    }

    #[test]
    fn test_timer_from_previous_round_is_ignored() {
        let mut game = new_game(1, 19);
        game.start();
        let fired = game.scheduler_mut().advance(Duration::from_secs(5));
        game.reset();

        assert!(game.on_timer(fired[0]).is_empty());
        assert!(game.caller().called().is_empty());
    }

    #[test]
    fn test_first_card_to_complete_a_line_wins() {
        let mut game = new_game(2, 20);
        game.start();
        let events = win_with(&mut game, 1, WinLine::Row(4));
        assert!(events.contains(&GameEvent::Won(Win { card: 1, line: WinLine::Row(4) })));

        // The other card cannot win the finished round
        assert!(game.mark(0, 0, 0).is_empty());
        assert_eq!(game.winner().map(|w| w.card), Some(1));
    }

    #[test]
    fn test_pool_exhaustion_keeps_round_open() {
        let mut game = new_game(1, 21);
        game.start();

        let mut exhausted = false;
        for _ in 0..=LASTNUMBER {
            let events = tick(&mut game);
            if events.contains(&GameEvent::PoolExhausted) {
                exhausted = true;
                break;
            }
        }

        // With nothing marked there is no winner, the round is simply out of numbers
        assert!(exhausted);
        assert!((FIRSTNUMBER..=LASTNUMBER).all(|n| game.is_called(n)));
        assert_eq!(game.state(), GameState::Active);
        assert!(!game.caller().is_active());
        assert!(tick(&mut game).is_empty());

        // Pausing and resuming an exhausted round does not announce it again
        assert_eq!(game.pause(), vec![GameEvent::StateChanged(GameState::Paused)]);
        assert_eq!(game.resume(), vec![GameEvent::StateChanged(GameState::Active)]);
    }

    #[test]
    fn test_switch_card_wraps() {
        let mut game = new_game(2, 22);
        assert_eq!(game.switch_card(1), 1);
        assert_eq!(game.switch_card(1), 0);
        assert_eq!(game.switch_card(-1), 1);

        let mut single = new_game(1, 22);
        assert_eq!(single.switch_card(-1), 0);
    }

    #[test]
    fn test_seeded_games_are_reproducible() {
        let first = new_game(2, 23);
        let second = new_game(2, 23);
        assert_eq!(first.cards(), second.cards());
        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn test_game_info() {
        let mut game = new_game(1, 24);
        game.start();
        let info = game.game_info();
        assert!(info.contains("Game[id="));
        assert!(info.contains("state=active"));
        assert!(info.contains("called=0"));
        assert!(info.contains("remaining=75"));
        assert!(info.contains(game.id()));
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut game = new_game(1, 25);
        game.start();
        tick(&mut game);

        let snapshot = game.snapshot();
        assert_eq!(snapshot.called.len(), 1);
        assert_eq!(snapshot.remaining, 74);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "Active");
        assert_eq!(json["cards"][0]["grid"][2][2]["value"], "Free");
        assert_eq!(json["winner"], serde_json::Value::Null);
    }

    #[test]
    fn test_snapshot_round_trip_after_win() {
        let mut game = new_game(1, 26);
        game.start();
        let line = WinLine::Diagonal(Diagonal::Anti);
        let events = win_with(&mut game, 0, line);
        assert!(events.contains(&GameEvent::Won(Win { card: 0, line })));

        let snapshot = game.snapshot();
        let text = serde_json::to_string(&snapshot).unwrap();
        let restored: GameSnapshot = serde_json::from_str(&text).unwrap();

        assert_eq!(restored, snapshot);
        assert_eq!(restored.state, GameState::Won);
        assert_eq!(restored.winner, Some(Win { card: 0, line }));
        assert!(restored.cards[0].is_winning_line(line));
    }
}
