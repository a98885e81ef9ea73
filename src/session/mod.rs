pub mod audio;
pub mod judge;
pub mod spawn;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::chart::{Chart, ChartError, LANE_COUNT};
use crate::pool::{ObjectPool, PoolConfig};
use crate::timing::{SessionClock, TimeSource};

pub use audio::{AudioSink, NullAudio};
pub use judge::{JudgeConfig, JudgeTier, Judgment, JudgmentEngine, OffWindowPolicy, SessionResult};
pub use spawn::{ActiveNote, SpawnScheduler, progress};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session cancelled")]
    Cancelled,
    #[error("a session is already active")]
    AlreadyActive,
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error("audio scheduling failed")]
    Audio(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Loading,
    Playing,
    Paused,
    Finished,
    Aborted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Interval between a note's spawn and its judgment-line arrival.
    pub lead_time_ms: f64,
    /// Audio pre-roll before chart time zero.
    pub pre_roll_ms: f64,
    pub pool: Vec<PoolConfig>,
    pub judge: JudgeConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lead_time_ms: 1500.0,
            pre_roll_ms: 1500.0,
            pool: vec![
                PoolConfig {
                    kind: 0,
                    default_capacity: 16,
                    max_size: 64,
                },
                PoolConfig {
                    kind: 1,
                    default_capacity: 8,
                    max_size: 32,
                },
            ],
            judge: JudgeConfig::default(),
        }
    }
}

/// What one frame advance produced.
#[derive(Debug, Default)]
pub struct TickReport {
    pub judgments: Vec<Judgment>,
    pub finished: bool,
}

/// One run of the rhythm minigame: composes the clock, pool, spawn
/// scheduler and judgment engine behind a
/// Idle → Loading → Playing ⇄ Paused → Finished | Aborted lifecycle.
pub struct MinigameSession {
    config: SessionConfig,
    clock: SessionClock,
    pool: ObjectPool<ActiveNote>,
    scheduler: SpawnScheduler,
    judge: JudgmentEngine,
    audio: Box<dyn AudioSink>,
    chart: Option<Chart>,
    total_notes: usize,
    phase: SessionPhase,
    result: Option<SessionResult>,
}

impl MinigameSession {
    pub fn new(config: SessionConfig, time: Box<dyn TimeSource>, audio: Box<dyn AudioSink>) -> Self {
        let pool = ObjectPool::new(&config.pool, Box::new(|_| ActiveNote::default()));
        let judge = JudgmentEngine::new(config.judge.clone());
        Self {
            config,
            clock: SessionClock::new(time),
            pool,
            scheduler: SpawnScheduler::new(LANE_COUNT),
            judge,
            audio,
            chart: None,
            total_notes: 0,
            phase: SessionPhase::Idle,
            result: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_ms(&self) -> f64 {
        self.clock.current_ms()
    }

    /// Result of the last finished session. Cleared when a new one starts.
    pub fn result(&self) -> Option<SessionResult> {
        self.result
    }

    pub fn next_spawn_index(&self) -> usize {
        self.scheduler.next_spawn_index()
    }

    pub fn active_count(&self) -> usize {
        self.scheduler.active_count()
    }

    pub fn lane_len(&self, lane: usize) -> usize {
        self.scheduler.lane(lane).map_or(0, |queue| queue.len())
    }

    /// Load the chart and enter Playing. A chart that fails validation or
    /// audio that fails to schedule is fatal for the session and leaves it
    /// Idle.
    pub fn start(&mut self, chart: Chart) -> Result<(), SessionError> {
        if matches!(
            self.phase,
            SessionPhase::Loading | SessionPhase::Playing | SessionPhase::Paused
        ) {
            return Err(SessionError::AlreadyActive);
        }
        self.phase = SessionPhase::Loading;
        self.result = None;

        if let Err(err) = chart.validate() {
            error!(%err, title = %chart.title, "chart rejected");
            self.phase = SessionPhase::Idle;
            return Err(err.into());
        }

        self.scheduler.reset(&mut self.pool);
        self.judge.reset();
        for pool_config in self.config.pool.clone() {
            if let Err(err) = self.pool.prewarm(pool_config.kind, pool_config.default_capacity) {
                warn!(%err, "prewarm skipped");
            }
        }
        self.total_notes = chart.note_count();

        if let Err(err) = self.audio.schedule(chart.audio_offset_ms) {
            error!(%err, "audio scheduling failed");
            self.phase = SessionPhase::Idle;
            return Err(SessionError::Audio(err));
        }

        info!(title = %chart.title, notes = self.total_notes, "session start");
        self.chart = Some(chart);
        self.clock.start(self.config.pre_roll_ms);
        self.phase = SessionPhase::Playing;
        Ok(())
    }

    /// Advance one frame: spawn due notes, judge the frame's inputs, sweep
    /// missed heads, reap dead instances, and check the end condition.
    /// `hits` are the lanes struck since the previous tick.
    pub fn tick(&mut self, hits: &[usize]) -> TickReport {
        let mut report = TickReport::default();
        if self.phase != SessionPhase::Playing {
            return report;
        }
        let Some(chart) = self.chart.as_ref() else {
            return report;
        };

        let now = self.clock.current_ms();
        self.scheduler
            .update(&chart.notes, now, self.config.lead_time_ms, &mut self.pool);

        for &lane in hits {
            let Some(queue) = self.scheduler.lane_mut(lane) else {
                warn!(lane, "input on unknown lane ignored");
                continue;
            };
            if let Some(judgment) = self.judge.process_input(lane, now, queue, &mut self.pool) {
                report.judgments.push(judgment);
            }
        }

        for lane in 0..self.scheduler.lane_count() {
            let Some(queue) = self.scheduler.lane_mut(lane) else {
                continue;
            };
            report
                .judgments
                .extend(self.judge.miss_sweep(lane, now, queue, &mut self.pool));
        }

        self.scheduler.reap(&mut self.pool);

        let notes_done = self.scheduler.all_spawned(chart.notes.len());
        if notes_done && self.scheduler.active_count() == 0 && self.audio.is_finished() {
            // Cleanup must complete before the result is surfaced, or the
            // next session starts with a stale spawn index and queues.
            let result = self.judge.finalize(self.total_notes);
            self.cleanup();
            self.phase = SessionPhase::Finished;
            self.result = Some(result);
            report.finished = true;
            info!(
                accuracy = result.total_accuracy,
                max_combo = result.max_combo,
                misses = result.miss_count,
                "session finished"
            );
        }
        report
    }

    /// Freeze the clock and scheduled audio. Queues and indices are
    /// untouched.
    pub fn pause(&mut self) {
        if self.phase == SessionPhase::Playing {
            self.clock.pause();
            self.audio.pause();
            self.phase = SessionPhase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == SessionPhase::Paused {
            self.clock.resume();
            self.audio.resume();
            self.phase = SessionPhase::Playing;
        }
    }

    /// Forced end: runs the same cleanup as a normal finish but yields no
    /// result.
    pub fn abort(&mut self) {
        if matches!(
            self.phase,
            SessionPhase::Loading | SessionPhase::Playing | SessionPhase::Paused
        ) {
            warn!("session aborted");
            self.cleanup();
            self.phase = SessionPhase::Aborted;
        }
    }

    fn cleanup(&mut self) {
        self.audio.stop();
        self.scheduler.reset(&mut self.pool);
        self.chart = None;
    }
}
