//! Countdown and elapsed-time tracking, advanced one second per tick.
use serde::{Deserialize, Serialize};

/// Result of advancing a clock by one second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// Nothing advanced: the clock is stopped or the session is not running.
    Idle,
    /// Time advanced and the countdown, if any, has time left.
    Running,
    /// The countdown reached zero on this tick.
    Expired,
}

/// A countdown that never goes below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Countdown {
    start: u32,
    remaining: u32,
    running: bool,
}

impl Countdown {
    #[must_use]
    pub const fn new(start: u32) -> Self {
        Self {
            start,
            remaining: start,
            running: false,
        }
    }

    pub const fn start(&mut self) {
        if self.remaining > 0 {
            self.running = true;
        }
    }

    pub const fn stop(&mut self) {
        self.running = false;
    }

    pub const fn reset(&mut self) {
        self.remaining = self.start;
        self.running = false;
    }

    pub const fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            TickOutcome::Expired
        } else {
            TickOutcome::Running
        }
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub const fn initial(&self) -> u32 {
        self.start
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }
}

/// Counts seconds while running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopwatch {
    elapsed: u32,
    running: bool,
}

impl Stopwatch {
    pub const fn start(&mut self) {
        self.running = true;
    }

    pub const fn stop(&mut self) {
        self.running = false;
    }

    pub const fn reset(&mut self) {
        self.elapsed = 0;
        self.running = false;
    }

    pub const fn tick(&mut self) -> bool {
        if self.running {
            self.elapsed = self.elapsed.saturating_add(1);
        }
        self.running
    }

    #[must_use]
    pub const fn elapsed(&self) -> u32 {
        self.elapsed
    }
}

/// Session clock: an always-present stopwatch plus an optional countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    stopwatch: Stopwatch,
    countdown: Option<Countdown>,
}

impl Clock {
    #[must_use]
    pub const fn new(countdown: Option<u32>) -> Self {
        Self {
            stopwatch: Stopwatch {
                elapsed: 0,
                running: false,
            },
            countdown: match countdown {
                Some(seconds) => Some(Countdown::new(seconds)),
                None => None,
            },
        }
    }

    pub const fn start(&mut self) {
        self.stopwatch.start();
        if let Some(countdown) = &mut self.countdown {
            countdown.start();
        }
    }

    pub const fn stop(&mut self) {
        self.stopwatch.stop();
        if let Some(countdown) = &mut self.countdown {
            countdown.stop();
        }
    }

    pub const fn reset(&mut self) {
        self.stopwatch.reset();
        if let Some(countdown) = &mut self.countdown {
            countdown.reset();
        }
    }

    pub const fn tick(&mut self) -> TickOutcome {
        if !self.stopwatch.tick() {
            return TickOutcome::Idle;
        }
        match &mut self.countdown {
            Some(countdown) => match countdown.tick() {
                TickOutcome::Expired => {
                    self.stopwatch.stop();
                    TickOutcome::Expired
                }
                _ => TickOutcome::Running,
            },
            None => TickOutcome::Running,
        }
    }

    #[must_use]
    pub const fn elapsed(&self) -> u32 {
        self.stopwatch.elapsed()
    }

    #[must_use]
    pub const fn remaining(&self) -> Option<u32> {
        match &self.countdown {
            Some(countdown) => Some(countdown.remaining()),
            None => None,
        }
    }
}
