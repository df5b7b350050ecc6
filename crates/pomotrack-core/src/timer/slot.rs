//! Single pending one-shot timer.
//!
//! Arming the slot spawns a tokio task that sleeps and then hands its
//! generation number to a callback. The callback must not touch shared state
//! directly; it should post the generation to the owner, which redeems it
//! through [`TimerSlot::accept`].
//!
//! Cancellation aborts the sleeping task and retires its generation. If the
//! task had already woken and posted, the stale generation is refused by
//! `accept`, so a cancelled timer never takes effect.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::task::TaskId;

/// What a pending timer will do when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Complete the given task.
    Work(TaskId),
    /// End the current break.
    Break,
}

#[derive(Debug)]
struct Pending {
    kind: TimerKind,
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<Pending>,
    generation: u64,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire after `after`, replacing any pending timer.
    ///
    /// Must be called from within a tokio runtime. Returns the generation the
    /// callback will receive.
    pub fn arm<F>(&mut self, kind: TimerKind, after: Duration, on_fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            on_fire(generation);
        });
        self.pending = Some(Pending {
            kind,
            generation,
            handle,
        });
        generation
    }

    /// Cancel the pending timer, if any. Idempotent.
    pub fn cancel(&mut self) -> Option<TimerKind> {
        let pending = self.pending.take()?;
        pending.handle.abort();
        Some(pending.kind)
    }

    /// Cancel only if the pending timer is `kind`.
    pub fn cancel_if(&mut self, kind: TimerKind) -> bool {
        if self.pending() == Some(kind) {
            self.cancel();
            true
        } else {
            false
        }
    }

    /// Redeem a fired generation. Returns the timer's kind only if it is
    /// still the pending one; stale generations yield `None`.
    pub fn accept(&mut self, generation: u64) -> Option<TimerKind> {
        match &self.pending {
            Some(p) if p.generation == generation => self.pending.take().map(|p| p.kind),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<TimerKind> {
        self.pending.as_ref().map(|p| p.kind)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
