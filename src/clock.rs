//! Monotonic time sources for gating the run and its status reports.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use std::time::Instant;

pub trait Clock {
    /// Time since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    fn stopwatch(&self) -> Stopwatch<'_, Self>
    where
        Self: Sized,
    {
        Stopwatch::start(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

pub struct Stopwatch<'c, C: Clock> {
    clock: &'c C,
    started: Duration,
}

impl<'c, C: Clock> Stopwatch<'c, C> {
    pub fn start(clock: &'c C) -> Self {
        Self {
            clock,
            started: clock.now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.started)
    }
}
