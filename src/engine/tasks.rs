//! Cancellable deferred tasks keyed by audio-clock instant.
//!
//! This is the module's only notion of a timer. The host pumps the queue once
//! per frame (`pop_due`), so a task fires at the first pump at or after its
//! due instant: coarse and late by up to one frame, never early. Callers must
//! therefore carry the *intended* instant inside the task and not rely on the
//! pump time.

use std::{cmp::Ordering, collections::BTreeMap};

use crate::synth::voice::VoiceId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Task {
    /// A scheduler cycle intended for `scheduled`, armed under `generation`.
    Cycle { scheduled: f64, generation: u64 },
    /// Natural end of a voice: dispose it.
    Release(VoiceId),
}

#[derive(Debug, Clone, Copy)]
struct TaskKey {
    due: f64,
    seq: u64,
}

impl PartialEq for TaskKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TaskKey {}

impl PartialOrd for TaskKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .total_cmp(&other.due)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Ticket for a scheduled task. Cancelling is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(TaskKey);

impl TaskHandle {
    pub fn due(&self) -> f64 {
        self.0.due
    }
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: BTreeMap<TaskKey, Task>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: f64, task: Task) -> TaskHandle {
        let key = TaskKey {
            due,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.tasks.insert(key, task);
        TaskHandle(key)
    }

    /// Returns `true` if the task was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.tasks.remove(&handle.0).is_some()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.contains_key(&handle.0)
    }

    /// Earliest task due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(TaskHandle, Task)> {
        let (key, _) = self.tasks.first_key_value()?;
        if key.due > now {
            return None;
        }
        self.tasks
            .pop_first()
            .map(|(key, task)| (TaskHandle(key), task))
    }

    pub fn next_due(&self) -> Option<f64> {
        self.tasks.first_key_value().map(|(key, _)| key.due)
    }

    /// Drop every task; returns how many were pending.
    pub fn clear(&mut self) -> usize {
        let pending = self.tasks.len();
        self.tasks.clear();
        pending
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
