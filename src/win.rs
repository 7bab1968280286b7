// src/win.rs
// This module handles line detection on a bingo card.

use crate::card::Card;
use crate::defs::{CARDLAYOUT, LETTERS};

use serde::{Deserialize, Serialize};
use std::fmt;

const SIZE: usize = CARDLAYOUT.columns;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagonal {
    /// Top-left to bottom-right.
    Main,
    /// Top-right to bottom-left.
    Anti,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinLine {
    Row(usize),
    Column(usize),
    Diagonal(Diagonal),
}

impl WinLine {
    /// Every line of a card in detection order.
    pub fn all() -> impl Iterator<Item = WinLine> {
        (0..SIZE)
            .map(WinLine::Row)
            .chain((0..SIZE).map(WinLine::Column))
            .chain([WinLine::Diagonal(Diagonal::Main), WinLine::Diagonal(Diagonal::Anti)])
    }

    /// The five (column, row) positions making up this line.
    pub fn cells(&self) -> [(usize, usize); SIZE] {
        std::array::from_fn(|i| match *self {
            WinLine::Row(row) => (i, row),
            WinLine::Column(col) => (col, i),
            WinLine::Diagonal(Diagonal::Main) => (i, i),
            WinLine::Diagonal(Diagonal::Anti) => (i, SIZE - 1 - i),
        })
    }

    pub fn contains(&self, col: usize, row: usize) -> bool {
        self.cells().contains(&(col, row))
    }
}

impl fmt::Display for WinLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinLine::Row(row) => write!(f, "Row {}", row + 1),
            WinLine::Column(col) => write!(f, "Column {}", LETTERS[*col]),
            WinLine::Diagonal(_) => write!(f, "Diagonal"),
        }
    }
}

/// First fully marked line of `card`: rows, then columns, then diagonals.
pub fn detect_win(card: &Card) -> Option<WinLine> {
    WinLine::all().find(|&line| card.is_winning_line(line))
}
