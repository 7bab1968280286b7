// src/caller.rs
// The number caller: draws numbers from the pouch, records them in call
// order and keeps one timer pending while it is running.

use std::time::Duration;

use rand::Rng;

use crate::board::CalledNumbers;
use crate::defs::Number;
use crate::logging::log_debug;
use crate::pouch::Pouch;
use crate::scheduler::{Scheduler, TimerId};

pub const DEFAULT_MIN_DELAY_MS: u64 = 3000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// What a call attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Called(Number),
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct NumberCaller {
    called: CalledNumbers,
    pouch: Pouch,
    active: bool,
    pending: Option<TimerId>,
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl NumberCaller {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        assert!(min_delay_ms <= max_delay_ms, "min delay above max delay");
        Self {
            called: CalledNumbers::new(),
            pouch: Pouch::new(),
            active: false,
            pending: None,
            min_delay_ms,
            max_delay_ms,
        }
    }

    /// Draw one number that has not been called yet, uniformly at random.
    /// Returns `None` once every number has been called.
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<Number> {
        let number = self.pouch.extract(rng)?;
        let recorded = self.called.push(number);
        debug_assert!(recorded, "number {number} drawn twice");
        Some(number)
    }

    pub fn is_called(&self, number: Number) -> bool {
        self.called.contains(number)
    }

    /// Begin calling. The first number comes when the first timer fires.
    pub fn start<R: Rng, S: Scheduler>(&mut self, rng: &mut R, scheduler: &mut S) {
        self.active = true;
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
        if !self.is_exhausted() {
            self.pending = Some(scheduler.schedule(self.next_delay(rng)));
        }
    }

    /// Stop calling but keep what was called so far.
    pub fn pause<S: Scheduler>(&mut self, scheduler: &mut S) {
        self.active = false;
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
    }

    /// Call one number immediately and go back to timed calls. An exhausted
    /// caller stays idle.
    pub fn resume<R: Rng, S: Scheduler>(&mut self, rng: &mut R, scheduler: &mut S) -> Option<Call> {
        if self.is_exhausted() {
            return None;
        }
        self.active = true;
        self.call_next(rng, scheduler)
    }

    pub fn stop<S: Scheduler>(&mut self, scheduler: &mut S) {
        self.pause(scheduler);
    }

    /// Stop and forget every called number.
    pub fn reset<S: Scheduler>(&mut self, scheduler: &mut S) {
        self.stop(scheduler);
        self.called.clear();
        self.pouch = Pouch::new();
    }

    /// Handle a fired timer. Only the currently pending timer of an active
    /// caller produces a call; anything else is stale and ignored.
    pub fn on_timer<R: Rng, S: Scheduler>(
        &mut self,
        id: TimerId,
        rng: &mut R,
        scheduler: &mut S,
    ) -> Option<Call> {
        if !self.active || self.pending != Some(id) {
            log_debug(&format!("Ignoring stale timer {id:?}"));
            return None;
        }
        self.pending = None;
        self.call_next(rng, scheduler)
    }

    fn call_next<R: Rng, S: Scheduler>(&mut self, rng: &mut R, scheduler: &mut S) -> Option<Call> {
        if !self.active {
            return None;
        }
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }

        match self.draw(rng) {
            Some(number) => {
                let delay = self.next_delay(rng);
                self.pending = Some(scheduler.schedule(delay));
                log_debug(&format!(
                    "Called {number} ({} left), next call in {} ms",
                    self.pouch.len(),
                    delay.as_millis()
                ));
                Some(Call::Called(number))
            }
            None => {
                self.active = false;
                log_debug("All numbers have been called");
                Some(Call::Exhausted)
            }
        }
    }

    fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_millis(rng.random_range(self.min_delay_ms..=self.max_delay_ms))
    }

    pub fn called(&self) -> &CalledNumbers {
        &self.called
    }

    pub fn last_called(&self) -> Option<Number> {
        self.called.last()
    }

    pub fn remaining(&self) -> usize {
        self.pouch.len()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_exhausted(&self) -> bool {
        self.pouch.is_empty()
    }

    pub fn has_pending_call(&self) -> bool {
        self.pending.is_some()
    }
}

impl Default for NumberCaller {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY_MS, DEFAULT_MAX_DELAY_MS)
    }
}
