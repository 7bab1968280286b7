// src/card.rs
// This module handles bingo card generation and marking.

use crate::defs::{column_range, column_of, Number, CARDLAYOUT, FIRSTNUMBER, LASTNUMBER};
use crate::logging::log_warning;
use crate::win::WinLine;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    Number(Number),
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub value: CellValue,
    pub marked: bool,
}

impl Cell {
    fn free() -> Self {
        Cell { value: CellValue::Free, marked: true }
    }

    fn with_number(number: Number) -> Self {
        Cell { value: CellValue::Number(number), marked: false }
    }

    pub fn number(&self) -> Option<Number> {
        match self.value {
            CellValue::Number(number) => Some(number),
            CellValue::Free => None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.value == CellValue::Free
    }
}

// Indexed [column][row]
pub type Grid = [[Cell; CARDLAYOUT.rows]; CARDLAYOUT.columns];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    id: u64,
    grid: Grid,
}

impl Card {
    /// Generate a fresh card: every column is filled top to bottom by sampling
    /// its range without replacement, and the centre cell is FREE and marked.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut grid: Grid = [[Cell::free(); CARDLAYOUT.rows]; CARDLAYOUT.columns];

        for (col, column) in grid.iter_mut().enumerate() {
            let (low, high) = column_range(col);
            let mut available: Vec<Number> = (low..=high).collect();

            for (row, cell) in column.iter_mut().enumerate() {
                if col == CARDLAYOUT.free_col && row == CARDLAYOUT.free_row {
                    *cell = Cell::free();
                } else {
                    let random_index = rng.random_range(0..available.len());
                    *cell = Cell::with_number(available.remove(random_index));
                }
            }
        }

        let card = Card { id: card_id(&grid), grid };
        debug_assert!(card.validate(), "generated an invalid card: {card:?}");
        card
    }

    /// Throw the grid away and deal a new one.
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        *self = Card::generate(rng);
    }

    /// Mark the cell at (col, row) if it holds a number that `is_eligible`
    /// accepts and it is not marked yet. Returns whether the cell changed.
    pub fn mark<F>(&mut self, col: usize, row: usize, is_eligible: F) -> bool
    where
        F: Fn(Number) -> bool,
    {
        let Some(cell) = self.grid.get_mut(col).and_then(|column| column.get_mut(row)) else {
            return false;
        };
        if cell.marked {
            return false;
        }
        match cell.value {
            CellValue::Number(number) if is_eligible(number) => {
                cell.marked = true;
                true
            }
            _ => false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<&Cell> {
        self.grid.get(col).and_then(|column| column.get(row))
    }

    pub fn is_marked(&self, col: usize, row: usize) -> bool {
        self.cell(col, row).is_some_and(|cell| cell.marked)
    }

    pub fn is_winning_line(&self, line: WinLine) -> bool {
        line.cells().iter().all(|&(col, row)| self.grid[col][row].marked)
    }

    /// Position of a number on this card, if present.
    pub fn position_of(&self, number: Number) -> Option<(usize, usize)> {
        if !(FIRSTNUMBER..=LASTNUMBER).contains(&number) {
            return None;
        }
        let col = column_of(number);
        let column = self.grid.get(col)?;
        column
            .iter()
            .position(|cell| cell.number() == Some(number))
            .map(|row| (col, row))
    }

    /// Position of a freshly called number the player could still mark.
    pub fn highlight(&self, number: Number) -> Option<(usize, usize)> {
        self.position_of(number)
            .filter(|&(col, row)| !self.grid[col][row].marked)
    }

    pub fn marked_count(&self) -> usize {
        self.grid
            .iter()
            .flat_map(|column| column.iter())
            .filter(|cell| cell.marked)
            .count()
    }

    pub fn numbers(&self) -> Vec<Number> {
        self.grid
            .iter()
            .flat_map(|column| column.iter())
            .filter_map(Cell::number)
            .collect()
    }

    /// Check the card layout rules: one pre-marked FREE cell in the centre
    /// and five distinct in-range numbers in every other column slot.
    pub fn validate(&self) -> bool {
        let mut free_cells = 0;

        for (col, column) in self.grid.iter().enumerate() {
            let (low, high) = column_range(col);
            let mut seen = HashSet::new();

            for (row, cell) in column.iter().enumerate() {
                let is_centre = col == CARDLAYOUT.free_col && row == CARDLAYOUT.free_row;
                match cell.value {
                    CellValue::Free => {
                        if !is_centre || !cell.marked {
                            return false;
                        }
                        free_cells += 1;
                    }
                    CellValue::Number(number) => {
                        if is_centre || number < low || number > high || !seen.insert(number) {
                            return false;
                        }
                    }
                }
            }
        }

        free_cells == 1
    }
}

fn card_id(grid: &Grid) -> u64 {
    let mut hasher = DefaultHasher::new();

    for column in grid {
        for cell in column {
            hasher.write_u8(cell.number().unwrap_or(0));
        }
    }

    hasher.finish()
}

/// Deal `count` cards with pairwise distinct ids.
pub fn generate_cards<R: Rng>(rng: &mut R, count: usize) -> Vec<Card> {
    const MAX_RETRIES: usize = 100;
    let mut cards: Vec<Card> = Vec::with_capacity(count);
    let mut seen_ids = HashSet::new();

    while cards.len() < count {
        let mut attempt = 0;
        let card = loop {
            attempt += 1;
            let card = Card::generate(rng);
            if !seen_ids.contains(&card.id()) {
                break card;
            }
            if attempt >= MAX_RETRIES {
                log_warning(&format!("Could not deal a card with a unique ID after {MAX_RETRIES} attempts"));
                break card;
            }
        };
        seen_ids.insert(card.id());
        cards.push(card);
    }

    cards
}
