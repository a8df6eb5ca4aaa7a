/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Debounce and interval timers driven by explicit `poll(now)` calls.

use std::time::{Duration, Instant};

/// Trailing-edge debouncer holding at most one pending deadline.
///
/// Scheduling while a deadline is pending replaces it, so a burst of events
/// inside the window collapses into one firing `delay` after the last event.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    fired: u64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            fired: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Number of times this debouncer has fired.
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    /// Returns `true` exactly once when the pending deadline has passed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.fired += 1;
                true
            },
            _ => false,
        }
    }
}

/// Fixed-period tick. The first poll arms the timer without firing.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    period: Duration,
    last: Option<Instant>,
}

impl IntervalTimer {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn reset(&mut self, now: Instant) {
        self.last = Some(now);
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last {
            None => {
                self.last = Some(now);
                false
            },
            Some(last) if now.duration_since(last) >= self.period => {
                self.last = Some(now);
                true
            },
            Some(_) => false,
        }
    }
}
