//! Live voice bookkeeping.
//!
//! Every voice a module creates is registered here under a monotonic id
//! together with the handle of its natural-release task. Releasing a voice
//! cancels that task and disposes the voice in one step, so a voice is freed
//! exactly once no matter whether its own release, a module stop or a full
//! dispose gets there first.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::{
    engine::tasks::{Task, TaskHandle, TaskQueue},
    error::AmbientError,
    io::RenderTarget,
    synth::voice::{Voice, VoiceId},
};

/// Lifetime counters. `registered == disposed` once the module is idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub registered: u64,
    pub disposed: u64,
}

impl RegistryStats {
    pub fn live(&self) -> u64 {
        self.registered - self.disposed
    }
}

#[derive(Debug)]
struct Entry {
    voice: Voice,
    release: Option<TaskHandle>,
}

#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: BTreeMap<VoiceId, Entry>,
    next_id: u64,
    stats: RegistryStats,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unused id. Ids are never handed out twice by the same registry.
    pub fn allocate_id(&mut self) -> VoiceId {
        self.next_id += 1;
        VoiceId(self.next_id)
    }

    /// Take ownership of `voice` and arm its natural release at its teardown
    /// instant. A voice whose id is already live is disposed on the spot and
    /// rejected.
    pub fn register(
        &mut self,
        mut voice: Voice,
        target: &dyn RenderTarget,
        queue: &mut TaskQueue,
    ) -> Result<VoiceId, AmbientError> {
        let id = voice.id();
        if self.voices.contains_key(&id) {
            warn!(voice = %id, "voice id already registered, dropping the newcomer");
            voice.dispose(target);
            return Err(AmbientError::DuplicateVoice(id));
        }

        let release = queue.schedule(voice.teardown_at(), Task::Release(id));
        self.voices.insert(
            id,
            Entry {
                voice,
                release: Some(release),
            },
        );
        self.stats.registered += 1;
        Ok(id)
    }

    /// Move the natural release of `id` to `due`, e.g. after a forced decay.
    pub fn reschedule_release(&mut self, id: VoiceId, due: f64, queue: &mut TaskQueue) -> bool {
        let Some(entry) = self.voices.get_mut(&id) else {
            return false;
        };
        if let Some(old) = entry.release.take() {
            queue.cancel(old);
        }
        entry.release = Some(queue.schedule(due, Task::Release(id)));
        true
    }

    /// Dispose and forget `id`. Returns `false` if it was not live.
    pub fn release_one(
        &mut self,
        id: VoiceId,
        target: &dyn RenderTarget,
        queue: &mut TaskQueue,
    ) -> bool {
        let Some(mut entry) = self.voices.remove(&id) else {
            return false;
        };
        if let Some(handle) = entry.release.take() {
            queue.cancel(handle);
        }
        if entry.voice.dispose(target) {
            self.stats.disposed += 1;
        }
        debug!(voice = %id, live = self.voices.len(), "voice released");
        true
    }

    /// Dispose every live voice; returns how many there were.
    pub fn release_all(&mut self, target: &dyn RenderTarget, queue: &mut TaskQueue) -> usize {
        let ids: Vec<VoiceId> = self.voices.keys().copied().collect();
        ids.into_iter()
            .filter(|id| self.release_one(*id, target, queue))
            .count()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        self.voices.contains_key(&id)
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(&id).map(|entry| &entry.voice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.values().map(|entry| &entry.voice)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.voices.values_mut().map(|entry| &mut entry.voice)
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }
}
