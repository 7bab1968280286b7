// src/board.rs
// The ordered record of called numbers.

use crate::defs::{Number, FIRSTNUMBER, LASTNUMBER};

#[derive(Debug, Clone, Default)]
pub struct CalledNumbers(Vec<Number>);

impl CalledNumbers {
    pub fn new() -> Self {
        CalledNumbers(Vec::new())
    }

    /// Record a newly called number. Numbers outside the game range or
    /// already recorded are refused.
    pub fn push(&mut self, number: Number) -> bool {
        if !(FIRSTNUMBER..=LASTNUMBER).contains(&number) || self.contains(number) {
            return false;
        }
        self.0.push(number);
        true
    }

    pub fn contains(&self, number: Number) -> bool {
        self.0.contains(&number)
    }

    pub fn numbers(&self) -> &[Number] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<Number> {
        self.0.last().copied()
    }

    /// The last `n` calls, oldest first.
    pub fn recent(&self, n: usize) -> &[Number] {
        let start = self.0.len().saturating_sub(n);
        &self.0[start..]
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
