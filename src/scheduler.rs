// src/scheduler.rs
// Cancellable one-shot timers used to pace number calls.
//
// The game core never sleeps. It asks a Scheduler for a timer and is later
// handed back the TimerId when the timer fires; ids that were cancelled or
// superseded are simply ignored by their owner.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

pub trait Scheduler {
    /// Arrange for a fire notification after `delay`.
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Make sure `id` never fires. Unknown or already fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

/// Virtual clock scheduler. Time only moves when `advance` is called.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: Vec<(Duration, TimerId)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().map(|&(deadline, _)| deadline).min()
    }

    /// Move the clock forward and return the timers that became due, in firing order.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        self.now += by;
        let now = self.now;

        let (mut due, pending): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|&(deadline, _)| deadline <= now);
        self.pending = pending;

        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Jump straight to the next deadline, if any.
    pub fn advance_to_next(&mut self) -> Vec<TimerId> {
        match self.next_deadline() {
            Some(deadline) => self.advance(deadline.saturating_sub(self.now)),
            None => Vec::new(),
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push((self.now + delay, id));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|&(_, pending_id)| pending_id != id);
    }
}

/// Scheduler backed by the tokio timer. Fired ids are delivered on the
/// receiver returned by `new`; it must be used inside a tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    next_id: u64,
    tasks: HashMap<TimerId, JoinHandle<()>>,
    sender: UnboundedSender<TimerId>,
}

impl TokioScheduler {
    pub fn new() -> (Self, UnboundedReceiver<TimerId>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = TokioScheduler {
            next_id: 0,
            tasks: HashMap::new(),
            sender,
        };
        (scheduler, receiver)
    }

    /// Forget the task of a timer whose id came out of the receiver.
    pub fn fired(&mut self, id: TimerId) {
        self.tasks.remove(&id);
    }

    pub fn pending_len(&self) -> usize {
        self.tasks.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let sender = self.sender.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver is gone only while shutting down
            let _ = sender.send(id);
        });
        self.tasks.insert(id, handle);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.tasks.remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}
