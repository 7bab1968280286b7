// src/pouch.rs
// The pool of numbers that have not been called yet.

use crate::defs::{Number, FIRSTNUMBER, LASTNUMBER};

use rand::Rng;

#[derive(Debug, Clone)]
pub struct Pouch {
    pub numbers: Vec<Number>,
}

impl Pouch {
    pub fn new() -> Self {
        Pouch {
            numbers: (FIRSTNUMBER..=LASTNUMBER).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    fn remove(&mut self, index: usize) -> Number {
        self.numbers.remove(index)
    }

    /// Take one remaining number uniformly at random, `None` once empty.
    pub fn extract<R: Rng>(&mut self, rng: &mut R) -> Option<Number> {
        if self.is_empty() {
            None
        } else {
            let random_index = rng.random_range(0..self.len());
            Some(self.remove(random_index))
        }
    }
}

impl Default for Pouch {
    fn default() -> Self {
        Self::new()
    }
}
