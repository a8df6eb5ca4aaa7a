/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Rolling frame-rate and render-time sampling.

use std::rc::Rc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::services::{EventBus, IntervalTimer};

/// Advisory telemetry for one sampling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PerformanceMetrics {
    /// Frames observed in the last window.
    pub frame_rate: u32,
    /// Time spent in the last layout or visibility pass.
    pub render_time: Duration,
    pub node_count: usize,
    pub visible_node_count: usize,
}

#[derive(Debug)]
pub struct PerformanceSampler {
    interval: IntervalTimer,
    frames: u32,
    last_render_time: Duration,
    latest: PerformanceMetrics,
    events: Rc<EventBus<PerformanceMetrics>>,
}

impl PerformanceSampler {
    pub fn new(period: Duration) -> Self {
        Self {
            interval: IntervalTimer::new(period),
            frames: 0,
            last_render_time: Duration::ZERO,
            latest: PerformanceMetrics::default(),
            events: Rc::new(EventBus::new()),
        }
    }

    pub fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    pub fn record_pass(&mut self, elapsed: Duration) {
        self.last_render_time = elapsed;
    }

    /// Emits a sample once per period. The first call only starts the window.
    pub fn tick(
        &mut self,
        now: Instant,
        node_count: usize,
        visible_node_count: usize,
    ) -> Option<PerformanceMetrics> {
        if !self.interval.poll(now) {
            return None;
        }
        let sample = PerformanceMetrics {
            frame_rate: self.frames,
            render_time: self.last_render_time,
            node_count,
            visible_node_count,
        };
        self.frames = 0;
        self.latest = sample;
        self.events.publish(&sample);
        Some(sample)
    }

    pub fn latest(&self) -> PerformanceMetrics {
        self.latest
    }

    pub fn events(&self) -> Rc<EventBus<PerformanceMetrics>> {
        Rc::clone(&self.events)
    }
}
