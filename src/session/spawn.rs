use std::collections::VecDeque;

use tracing::warn;

use crate::chart::{NoteEvent, NoteKind};
use crate::pool::{ObjectPool, PoolHandle, Poolable};

/// Pooled instance backing one on-screen note.
#[derive(Debug, Clone, Copy)]
pub struct ActiveNote {
    pub event: NoteEvent,
    pub visible: bool,
}

impl Default for ActiveNote {
    fn default() -> Self {
        Self {
            event: NoteEvent {
                kind: NoteKind::Tap,
                time_ms: 0.0,
                lane: 0,
                duration: 0.0,
            },
            visible: false,
        }
    }
}

impl Poolable for ActiveNote {
    fn on_acquire(&mut self) {
        self.visible = true;
    }
    fn on_release(&mut self) {
        self.visible = false;
    }
}

/// Normalized travel position for a note instance: 1 at the lane origin,
/// 0 at the judgment line, negative past it. Unclamped so reaped-late notes
/// keep moving visibly.
pub fn progress(note_time_ms: f64, current_ms: f64, lead_time_ms: f64) -> f64 {
    (note_time_ms - current_ms) / lead_time_ms
}

/// Converts chart data plus lead time into spawned note instances, feeding
/// per-lane FIFO queues and a dense active list.
pub struct SpawnScheduler {
    next_spawn_index: usize,
    lanes: Vec<VecDeque<PoolHandle>>,
    active: Vec<PoolHandle>,
}

impl SpawnScheduler {
    pub fn new(lane_count: usize) -> Self {
        Self {
            next_spawn_index: 0,
            lanes: (0..lane_count).map(|_| VecDeque::new()).collect(),
            active: Vec::new(),
        }
    }

    pub fn next_spawn_index(&self) -> usize {
        self.next_spawn_index
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Lane queue accessors; `None` for an out-of-range lane.
    pub fn lane(&self, lane: usize) -> Option<&VecDeque<PoolHandle>> {
        self.lanes.get(lane)
    }

    pub fn lane_mut(&mut self, lane: usize) -> Option<&mut VecDeque<PoolHandle>> {
        self.lanes.get_mut(lane)
    }

    /// Instances currently alive, in spawn order.
    pub fn active(&self) -> &[PoolHandle] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn all_spawned(&self, total_notes: usize) -> bool {
        self.next_spawn_index >= total_notes
    }

    /// Spawn every note due at `current_ms`, in strict index order. A note
    /// is due once `current_ms + lead_time_ms` reaches its trigger time.
    /// A failed pool acquire skips that spawn with a warning; the index
    /// still advances so later notes are not blocked.
    pub fn update(
        &mut self,
        notes: &[NoteEvent],
        current_ms: f64,
        lead_time_ms: f64,
        pool: &mut ObjectPool<ActiveNote>,
    ) {
        while self.next_spawn_index < notes.len()
            && current_ms + lead_time_ms >= notes[self.next_spawn_index].time_ms
        {
            let note = notes[self.next_spawn_index];
            match pool.acquire(note.kind.pool_kind()) {
                Ok(handle) => {
                    if let Some(instance) = pool.get_mut(handle) {
                        instance.event = note;
                    }
                    self.lanes[note.lane].push_back(handle);
                    self.active.push(handle);
                }
                Err(err) => {
                    warn!(index = self.next_spawn_index, %err, "spawn skipped");
                }
            }
            self.next_spawn_index += 1;
        }
    }

    /// Drop active entries whose instance was judged away, and return any
    /// still-checked-out instance that went invisible to the pool.
    pub fn reap(&mut self, pool: &mut ObjectPool<ActiveNote>) {
        self.active.retain(|&handle| match pool.get(handle) {
            Some(instance) if instance.visible => true,
            Some(_) => {
                pool.release(handle);
                false
            }
            None => false,
        });
    }

    /// Drain everything back to the pool and rewind the spawn index. Shared
    /// by session finish and abort.
    pub fn reset(&mut self, pool: &mut ObjectPool<ActiveNote>) {
        for handle in self.active.drain(..) {
            pool.release(handle);
        }
        for lane in &mut self.lanes {
            lane.clear();
        }
        self.next_spawn_index = 0;
    }
}
