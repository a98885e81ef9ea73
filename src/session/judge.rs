use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pool::{ObjectPool, PoolHandle};

use super::spawn::ActiveNote;

/// One accuracy bracket. Tiers are configured strictest (narrowest window)
/// first; the Miss tier is held separately and only applies on timeout or
/// under the `EarlyMiss` policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeTier {
    pub name: String,
    pub threshold_ms: f64,
    /// Contribution to accuracy, in [0, 1]. The Miss tier carries 0.
    pub accuracy_weight: f64,
    pub display_color: String,
}

/// Policy for an input that lands outside every graded window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum OffWindowPolicy {
    /// The input has no effect; the note stays queued until it times out.
    #[default]
    Ignore,
    /// The input consumes the note as an early miss.
    EarlyMiss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JudgeConfig {
    /// Graded tiers, strictest first.
    pub tiers: Vec<JudgeTier>,
    pub miss: JudgeTier,
    pub off_window: OffWindowPolicy,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            tiers: vec![
                JudgeTier {
                    name: "Perfect".to_string(),
                    threshold_ms: 50.0,
                    accuracy_weight: 1.0,
                    display_color: "#ffd700".to_string(),
                },
                JudgeTier {
                    name: "Good".to_string(),
                    threshold_ms: 120.0,
                    accuracy_weight: 0.5,
                    display_color: "#40c080".to_string(),
                },
            ],
            miss: JudgeTier {
                name: "Miss".to_string(),
                threshold_ms: 200.0,
                accuracy_weight: 0.0,
                display_color: "#d04040".to_string(),
            },
            off_window: OffWindowPolicy::Ignore,
        }
    }
}

/// One judged note, surfaced to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgment {
    pub tier_name: String,
    pub display_color: String,
    pub lane: usize,
    /// Signed offset (note time − input time); negative means late. Miss
    /// sweeps report the overshoot the same way.
    pub diff_ms: f64,
    pub combo: u32,
    pub is_miss: bool,
}

/// Aggregate outcome of one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub total_accuracy: f64,
    pub max_combo: u32,
    pub miss_count: u32,
}

/// Scores inputs and timeouts against the configured tiers and keeps the
/// running combo/accuracy aggregates.
pub struct JudgmentEngine {
    config: JudgeConfig,
    weight_sum: f64,
    combo: u32,
    max_combo: u32,
    miss_count: u32,
}

impl JudgmentEngine {
    pub fn new(config: JudgeConfig) -> Self {
        debug_assert!(
            config
                .tiers
                .windows(2)
                .all(|w| w[0].threshold_ms <= w[1].threshold_ms),
            "judge tiers must be ordered strictest first"
        );
        Self {
            config,
            weight_sum: 0.0,
            combo: 0,
            max_combo: 0,
            miss_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.weight_sum = 0.0;
        self.combo = 0;
        self.max_combo = 0;
        self.miss_count = 0;
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn miss_threshold_ms(&self) -> f64 {
        self.config.miss.threshold_ms
    }

    /// Judge an input against the head of a lane queue. Returns the applied
    /// judgment, or `None` when the queue is empty or the input falls
    /// outside every graded window under the `Ignore` policy.
    pub fn process_input(
        &mut self,
        lane: usize,
        current_ms: f64,
        queue: &mut VecDeque<PoolHandle>,
        pool: &mut ObjectPool<ActiveNote>,
    ) -> Option<Judgment> {
        let head = *queue.front()?;
        let Some(note) = pool.get(head) else {
            // Handle went stale without passing through judgment.
            warn!(lane, "dropping lane head with no live pool instance");
            queue.pop_front();
            return None;
        };
        let diff = note.event.time_ms - current_ms;

        let tier = self
            .config
            .tiers
            .iter()
            .find(|tier| diff.abs() <= tier.threshold_ms);
        match tier {
            Some(tier) => {
                let tier = tier.clone();
                Some(self.apply(&tier, lane, diff, queue, pool))
            }
            None => match self.config.off_window {
                OffWindowPolicy::Ignore => None,
                OffWindowPolicy::EarlyMiss => {
                    let miss = self.config.miss.clone();
                    Some(self.apply(&miss, lane, diff, queue, pool))
                }
            },
        }
    }

    /// Reap lane heads that aged past the Miss window. Runs every tick per
    /// lane so missed notes are consumed even without input.
    pub fn miss_sweep(
        &mut self,
        lane: usize,
        current_ms: f64,
        queue: &mut VecDeque<PoolHandle>,
        pool: &mut ObjectPool<ActiveNote>,
    ) -> Vec<Judgment> {
        let mut judgments = Vec::new();
        while let Some(&head) = queue.front() {
            let Some(note) = pool.get(head) else {
                queue.pop_front();
                continue;
            };
            let diff = note.event.time_ms - current_ms;
            if current_ms - note.event.time_ms <= self.config.miss.threshold_ms {
                break;
            }
            let miss = self.config.miss.clone();
            judgments.push(self.apply(&miss, lane, diff, queue, pool));
        }
        judgments
    }

    fn apply(
        &mut self,
        tier: &JudgeTier,
        lane: usize,
        diff_ms: f64,
        queue: &mut VecDeque<PoolHandle>,
        pool: &mut ObjectPool<ActiveNote>,
    ) -> Judgment {
        self.weight_sum += tier.accuracy_weight;
        let is_miss = tier.accuracy_weight <= 0.0;
        if is_miss {
            self.combo = 0;
            self.miss_count += 1;
        } else {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }

        if let Some(head) = queue.pop_front() {
            pool.release(head);
        }
        debug!(tier = %tier.name, lane, diff_ms, combo = self.combo, "judged");

        Judgment {
            tier_name: tier.name.clone(),
            display_color: tier.display_color.clone(),
            lane,
            diff_ms,
            combo: self.combo,
            is_miss,
        }
    }

    /// Final aggregate; recomputed only here, never partially exposed.
    pub fn finalize(&self, total_notes: usize) -> SessionResult {
        SessionResult {
            total_accuracy: if total_notes > 0 {
                self.weight_sum / total_notes as f64
            } else {
                0.0
            },
            max_combo: self.max_combo,
            miss_count: self.miss_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{NoteEvent, NoteKind};
    use crate::pool::PoolConfig;

    fn note_pool() -> ObjectPool<ActiveNote> {
        ObjectPool::new(
            &[PoolConfig {
                kind: 0,
                default_capacity: 8,
                max_size: 32,
            }],
            Box::new(|_| ActiveNote::default()),
        )
    }

    fn enqueue(
        pool: &mut ObjectPool<ActiveNote>,
        queue: &mut VecDeque<PoolHandle>,
        time_ms: f64,
    ) -> PoolHandle {
        let handle = pool.acquire(0).unwrap();
        pool.get_mut(handle).unwrap().event = NoteEvent {
            kind: NoteKind::Tap,
            time_ms,
            lane: 0,
            duration: 0.0,
        };
        queue.push_back(handle);
        handle
    }

    #[test]
    fn strictest_matching_tier_wins() {
        let mut engine = JudgmentEngine::new(JudgeConfig::default());
        let mut pool = note_pool();
        let mut queue = VecDeque::new();

        enqueue(&mut pool, &mut queue, 1000.0);
        let judgment = engine.process_input(0, 1040.0, &mut queue, &mut pool).unwrap();
        assert_eq!(judgment.tier_name, "Perfect");
        assert_eq!(judgment.combo, 1);

        enqueue(&mut pool, &mut queue, 2000.0);
        let judgment = engine.process_input(0, 2080.0, &mut queue, &mut pool).unwrap();
        assert_eq!(judgment.tier_name, "Good");
    }

    #[test]
    fn off_window_input_is_ignored_by_default() {
        let mut engine = JudgmentEngine::new(JudgeConfig::default());
        let mut pool = note_pool();
        let mut queue = VecDeque::new();

        enqueue(&mut pool, &mut queue, 1000.0);
        // 150 ms early: outside Good (120 ms) but inside the Miss window.
        assert!(engine.process_input(0, 850.0, &mut queue, &mut pool).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(pool.outstanding(0), 1);
    }

    #[test]
    fn off_window_input_can_consume_as_early_miss() {
        let config = JudgeConfig {
            off_window: OffWindowPolicy::EarlyMiss,
            ..JudgeConfig::default()
        };
        let mut engine = JudgmentEngine::new(config);
        let mut pool = note_pool();
        let mut queue = VecDeque::new();

        enqueue(&mut pool, &mut queue, 1000.0);
        let judgment = engine.process_input(0, 400.0, &mut queue, &mut pool).unwrap();
        assert!(judgment.is_miss);
        assert!(queue.is_empty());
    }

    #[test]
    fn empty_queue_is_a_no_op() {
        let mut engine = JudgmentEngine::new(JudgeConfig::default());
        let mut pool = note_pool();
        let mut queue = VecDeque::new();
        assert!(engine.process_input(0, 0.0, &mut queue, &mut pool).is_none());
    }

    #[test]
    fn miss_sweep_reaps_overdue_heads_only() {
        let mut engine = JudgmentEngine::new(JudgeConfig::default());
        let mut pool = note_pool();
        let mut queue = VecDeque::new();

        enqueue(&mut pool, &mut queue, 1000.0);
        enqueue(&mut pool, &mut queue, 1100.0);
        enqueue(&mut pool, &mut queue, 2000.0);

        // At 1150: the first note is 150 ms old, within the 200 ms window.
        assert!(engine.miss_sweep(0, 1150.0, &mut queue, &mut pool).is_empty());

        // At 1350: notes at 1000 and 1100 both aged out.
        let missed = engine.miss_sweep(0, 1350.0, &mut queue, &mut pool);
        assert_eq!(missed.len(), 2);
        assert!(missed.iter().all(|j| j.is_miss));
        assert_eq!(queue.len(), 1);
        assert_eq!(pool.outstanding(0), 1);
    }

    #[test]
    fn combo_resets_on_miss_and_max_is_retained() {
        let mut engine = JudgmentEngine::new(JudgeConfig::default());
        let mut pool = note_pool();
        let mut queue = VecDeque::new();

        for time in [1000.0, 1200.0, 1400.0] {
            enqueue(&mut pool, &mut queue, time);
            engine.process_input(0, time, &mut queue, &mut pool).unwrap();
        }
        assert_eq!(engine.combo(), 3);

        enqueue(&mut pool, &mut queue, 1600.0);
        let missed = engine.miss_sweep(0, 1900.0, &mut queue, &mut pool);
        assert_eq!(missed.len(), 1);
        assert_eq!(engine.combo(), 0);

        let result = engine.finalize(4);
        assert_eq!(result.max_combo, 3);
        assert_eq!(result.miss_count, 1);
        assert_eq!(result.total_accuracy, 0.75);
    }

    #[test]
    fn finalize_on_empty_chart_is_zero() {
        let engine = JudgmentEngine::new(JudgeConfig::default());
        let result = engine.finalize(0);
        assert_eq!(result.total_accuracy, 0.0);
        assert_eq!(result.max_combo, 0);
    }

    #[test]
    fn accuracy_stays_within_unit_interval() {
        let mut engine = JudgmentEngine::new(JudgeConfig::default());
        let mut pool = note_pool();
        let mut queue = VecDeque::new();

        for i in 0..10 {
            let time = 1000.0 + i as f64 * 300.0;
            enqueue(&mut pool, &mut queue, time);
            engine.process_input(0, time, &mut queue, &mut pool).unwrap();
        }
        let result = engine.finalize(10);
        assert!(result.total_accuracy >= 0.0 && result.total_accuracy <= 1.0);
        assert_eq!(result.total_accuracy, 1.0);
    }
}
