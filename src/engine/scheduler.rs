use rand::rngs::StdRng;

use crate::{
    engine::tasks::{Task, TaskHandle, TaskQueue},
    mood::EffectiveSettings,
    synth::factory::uniform,
    LOOKAHEAD,
};

/*
Event Scheduling on a Virtual Timeline
======================================

The scheduler never trusts the timer. It keeps its own cursor,
`next_event_instant`, and every cycle is placed relative to that cursor:

    scheduled = next_event_instant + interval
    interval  ~ Uniform(interval_min, interval_max) / max(0.1, density)

The task armed for `scheduled` carries `scheduled` with it. When it fires
(some time at or after `scheduled`, depending on how often the host pumps)
the cursor moves to `scheduled`, the intended instant, not to the fire
time. Timer lateness therefore never accumulates into drift.

    cursor ──interval──▶ scheduled ──interval──▶ scheduled' ...
                            ▲ fired late here, cursor still lands on `scheduled`

Lookahead
---------

By the time a cycle fires, `scheduled` may already be in the past. Committing
automation at an elapsed instant makes parameters snap, so each voice starts
at `now + LOOKAHEAD (+ its cluster offset)` instead. A small constant latency
buys glitch-free starts.

Stopping
--------

`stop` cancels the armed task and bumps `generation`. A cycle armed under an
older generation that still reaches `fire` (because someone else held a copy
of it) is rejected, so no voice is ever produced after a stop.
*/

/// Minimum divisor applied to drawn intervals.
pub const MIN_DENSITY: f64 = 0.1;
/// Shortest gap between two cycles.
pub const MIN_INTERVAL: f64 = 0.01;

/// Timing bounds the scheduler reads from the effective settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleBounds {
    pub interval_min: f64,
    pub interval_max: f64,
    pub density: f64,
    pub cluster_min: u32,
    pub cluster_max: u32,
    pub cluster_spread: f64,
}

impl From<&EffectiveSettings> for ScheduleBounds {
    fn from(s: &EffectiveSettings) -> Self {
        Self {
            interval_min: s.interval_min,
            interval_max: s.interval_max,
            density: s.density,
            cluster_min: s.cluster_min,
            cluster_max: s.cluster_max,
            cluster_spread: s.cluster_spread,
        }
    }
}

impl ScheduleBounds {
    /// Draw the gap to the next event.
    pub fn draw_interval(&self, rng: &mut StdRng) -> f64 {
        let raw = uniform(rng, self.interval_min.max(0.0), self.interval_max.max(0.0));
        (raw / self.density.max(MIN_DENSITY)).max(MIN_INTERVAL)
    }

    /// Offsets of the voices in one cluster, sorted ascending.
    pub fn plan_cluster(&self, rng: &mut StdRng) -> Vec<f64> {
        let count = uniform(rng, self.cluster_min, self.cluster_max);
        let mut offsets: Vec<f64> = (0..count)
            .map(|_| uniform(rng, 0.0, self.cluster_spread.max(0.0)))
            .collect();
        offsets.sort_by(f64::total_cmp);
        offsets
    }
}

/// Effective synthesis start of a voice created at `now`.
#[inline]
pub fn effective_start(now: f64, offset: f64) -> f64 {
    now + LOOKAHEAD + offset.max(0.0)
}

#[derive(Debug, Default)]
pub struct EventScheduler {
    next_event_instant: f64,
    active: bool,
    generation: u64,
    pending: Option<TaskHandle>,
}

impl EventScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn next_event_instant(&self) -> f64 {
        self.next_event_instant
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin producing events. The cursor only ever moves forward.
    /// Returns `false` if already active.
    pub fn start(&mut self, now: f64, requested: f64) -> bool {
        if self.active {
            return false;
        }
        self.next_event_instant = self.next_event_instant.max(now).max(requested);
        self.active = true;
        true
    }

    /// Arm the next cycle; returns its intended instant.
    pub fn arm(&mut self, queue: &mut TaskQueue, rng: &mut StdRng, bounds: &ScheduleBounds) -> f64 {
        let scheduled = self.next_event_instant + bounds.draw_interval(rng);
        let handle = queue.schedule(
            scheduled,
            Task::Cycle {
                scheduled,
                generation: self.generation,
            },
        );
        if let Some(stale) = self.pending.replace(handle) {
            queue.cancel(stale);
        }
        scheduled
    }

    /// Accept a fired cycle. Returns `false` (the caller must do nothing) when
    /// the scheduler has been stopped or the cycle belongs to an older run.
    pub fn fire(&mut self, scheduled: f64, generation: u64) -> bool {
        if !self.active || generation != self.generation {
            return false;
        }
        self.pending = None;
        self.next_event_instant = self.next_event_instant.max(scheduled);
        true
    }

    /// Move the cursor forward to `instant` without emitting anything.
    pub fn skip_to(&mut self, instant: f64) {
        self.next_event_instant = self.next_event_instant.max(instant);
    }

    /// Cancel the armed cycle and invalidate any copies of it.
    pub fn stop(&mut self, queue: &mut TaskQueue) {
        if let Some(handle) = self.pending.take() {
            queue.cancel(handle);
        }
        self.active = false;
        self.generation += 1;
    }
}
