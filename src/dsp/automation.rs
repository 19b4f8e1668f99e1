/*
Parameter Automation
====================

Every continuously varying control in the render graph (oscillator
frequency, gain, pan) is a `ParamTimeline`: a list of events on the audio
clock that together describe the value at any instant. The control thread
commits events ahead of the render point; the render thread only evaluates.

Event kinds
-----------

  SetValue    Jump to `value` at `at`.

  LinearRamp  Straight line from the previous event's value/time to `value`
              at `end`. With no previous event the ramp is a step at `end`.

  SetTarget   Exponential approach towards `target` starting at `start`:

                  v(t) = target + (v0 - target) * e^(-(t - start) / tau)

              It never reaches the target; the curve keeps running until the
              next event.

  HoldAt      Cancel every event at or after `at` and pin the value the
              curve had at `at`. Issue this before a new ramp when the
              current value is unknown (mid-envelope, mid-transition).

Settling
--------

Events only ever get appended, so a long-lived parameter (a module's output
stage sees two events per play, stop and mood change) would otherwise keep
its whole history. The render thread calls `settle(t)` at the top of every
block: everything at or before `t` folds into a single anchor at `t` (plus
the exponential approach still running, if any). The curve from `t` on is
unchanged, and evaluation cost stays proportional to pending events only.

The Time Constant Convention
----------------------------

An exponential approach covers ~95% of the distance after 3 time constants,
so "ramp over T seconds" is spelled `SetTarget { time_constant: T / 3 }`
throughout the crate. See `time_constant`.
*/

/// One scheduled change on a parameter timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    SetValue { at: f64, value: f32 },
    LinearRamp { end: f64, value: f32 },
    SetTarget { start: f64, target: f32, time_constant: f64 },
    HoldAt(f64),
}

/// Exponential time constant that covers a ramp of `ramp_time` seconds.
#[inline]
pub fn time_constant(ramp_time: f64) -> f64 {
    (ramp_time / 3.0).max(crate::MIN_TIME)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    Set { at: f64, value: f32 },
    Ramp { end: f64, value: f32 },
    Target { start: f64, target: f32, tau: f64 },
}

impl Event {
    fn time(&self) -> f64 {
        match *self {
            Event::Set { at, .. } => at,
            Event::Ramp { end, .. } => end,
            Event::Target { start, .. } => start,
        }
    }
}

/// Value of a parameter over audio-clock time.
#[derive(Debug, Clone)]
pub struct ParamTimeline {
    default: f32,
    events: Vec<Event>,
}

impl ParamTimeline {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            events: Vec::new(),
        }
    }

    pub fn apply(&mut self, change: ParamChange) {
        match change {
            ParamChange::SetValue { at, value } => self.insert(Event::Set { at, value }),
            ParamChange::LinearRamp { end, value } => self.insert(Event::Ramp { end, value }),
            ParamChange::SetTarget {
                start,
                target,
                time_constant,
            } => self.insert(Event::Target {
                start,
                target,
                tau: time_constant.max(crate::MIN_TIME),
            }),
            ParamChange::HoldAt(at) => {
                let value = self.value_at(at);
                self.cancel_after(at);
                self.insert(Event::Set { at, value });
            }
        }
    }

    /// Evaluate the curve at `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        let mut anchor_time = f64::NEG_INFINITY;
        let mut anchor_value = self.default;
        let mut approach: Option<(f32, f64)> = None;

        for event in &self.events {
            match *event {
                Event::Set { at, value } => {
                    if at > t {
                        break;
                    }
                    anchor_time = at;
                    anchor_value = value;
                    approach = None;
                }
                Event::Target { start, target, tau } => {
                    if start > t {
                        break;
                    }
                    anchor_value = approach_value(anchor_value, anchor_time, approach, start);
                    anchor_time = start;
                    approach = Some((target, tau));
                }
                Event::Ramp { end, value } => {
                    if end <= t {
                        anchor_time = end;
                        anchor_value = value;
                        approach = None;
                        continue;
                    }
                    // Ramp in progress at `t`: interpolate from the previous
                    // anchor. A ramp with no anchor is a step at `end`.
                    if anchor_time.is_finite() && t >= anchor_time && end > anchor_time {
                        let from = approach_value(anchor_value, anchor_time, approach, anchor_time);
                        let progress = ((t - anchor_time) / (end - anchor_time)) as f32;
                        return from + (value - from) * progress;
                    }
                    break;
                }
            }
        }

        approach_value(anchor_value, anchor_time, approach, t)
    }

    /// Fold every event at or before `t` into one anchor at `t`.
    pub fn settle(&mut self, t: f64) {
        let settled = self.events.partition_point(|e| e.time() <= t);
        if settled <= 1 {
            return;
        }

        let value = self.value_at(t);
        let anchor = Event::Set { at: t, value };
        match self.events[settled - 1] {
            Event::Target { target, tau, .. } => {
                let approach = Event::Target {
                    start: t,
                    target,
                    tau,
                };
                self.events.splice(..settled, [anchor, approach]);
            }
            _ => {
                self.events.splice(..settled, [anchor]);
            }
        }
    }

    /// Number of events still on the timeline.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn insert(&mut self, event: Event) {
        let time = event.time();
        let idx = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(idx, event);
    }

    fn cancel_after(&mut self, at: f64) {
        self.events.retain(|e| e.time() < at);
    }
}

#[inline]
fn approach_value(value: f32, since: f64, approach: Option<(f32, f64)>, t: f64) -> f32 {
    match approach {
        Some((target, tau)) if t > since => {
            target + (value - target) * (-(t - since) / tau).exp() as f32
        }
        _ => value,
    }
}
