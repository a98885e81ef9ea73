use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lanes available to multi-lane (defense) sessions. Attack charts use
/// lane 0 only.
pub const LANE_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart {0:?} not found")]
    NotFound(String),
    #[error("failed to read chart {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse chart {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("note {index} lane {lane} out of range (0..{LANE_COUNT})")]
    LaneOutOfRange { index: usize, lane: usize },
    #[error("lane {lane} notes out of chronological order at note {index}")]
    OutOfOrder { lane: usize, index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum NoteKind {
    Tap,
    Hold,
}

impl NoteKind {
    /// Pool kind id for instances of this note.
    pub fn pool_kind(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u8> for NoteKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Tap),
            1 => Ok(Self::Hold),
            other => Err(format!("unknown note type {other}")),
        }
    }
}

impl From<NoteKind> for u8 {
    fn from(kind: NoteKind) -> Self {
        kind as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub time_ms: f64,
    pub lane: usize,
    /// Hold length; 0 for taps.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BpmEvent {
    pub time_ms: f64,
    pub bpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedEvent {
    pub time_ms: f64,
    pub multiplier: f64,
}

/// Immutable chart data for one rhythm session.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Chart {
    pub title: String,
    pub artist: String,
    pub audio_offset_ms: f64,
    pub bpm_events: Vec<BpmEvent>,
    pub speed_events: Vec<SpeedEvent>,
    pub notes: Vec<NoteEvent>,
}

impl Chart {
    /// Build a single-lane attack chart from a start margin and relative
    /// hit timings.
    pub fn from_pattern(title: &str, start_margin_ms: f64, relative_timings_ms: &[f64]) -> Self {
        let notes = relative_timings_ms
            .iter()
            .map(|&rel| NoteEvent {
                kind: NoteKind::Tap,
                time_ms: start_margin_ms + rel,
                lane: 0,
                duration: 0.0,
            })
            .collect();
        Self {
            title: title.to_string(),
            ..Default::default()
        }
        .with_notes(notes)
    }

    fn with_notes(mut self, notes: Vec<NoteEvent>) -> Self {
        self.notes = notes;
        self
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Time at which the last note (including hold tails) resolves.
    pub fn end_time_ms(&self) -> f64 {
        self.notes
            .iter()
            .map(|n| n.time_ms + n.duration)
            .fold(0.0, f64::max)
    }

    /// Lanes in range and per-lane chronological order. Spawning and the
    /// judgment queues both rely on this.
    pub fn validate(&self) -> Result<(), ChartError> {
        let mut last_per_lane = [f64::NEG_INFINITY; LANE_COUNT];
        for (index, note) in self.notes.iter().enumerate() {
            if note.lane >= LANE_COUNT {
                return Err(ChartError::LaneOutOfRange {
                    index,
                    lane: note.lane,
                });
            }
            if note.time_ms < last_per_lane[note.lane] {
                return Err(ChartError::OutOfOrder {
                    lane: note.lane,
                    index,
                });
            }
            last_per_lane[note.lane] = note.time_ms;
        }
        Ok(())
    }
}

/// Resolves chart ids for the orchestrator.
pub trait ChartSource {
    fn load(&self, id: &str) -> Result<Chart, ChartError>;
}

/// Loads `<root>/<id>.json` chart files.
pub struct FsChartSource {
    root: PathBuf,
}

impl FsChartSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn chart_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }
}

impl ChartSource for FsChartSource {
    fn load(&self, id: &str) -> Result<Chart, ChartError> {
        let path = self.chart_path(id);
        if !path.exists() {
            return Err(ChartError::NotFound(id.to_string()));
        }
        let content = fs::read_to_string(&path).map_err(|source| ChartError::Io {
            path: path.clone(),
            source,
        })?;
        let chart: Chart =
            serde_json::from_str(&content).map_err(|source| ChartError::Parse { path, source })?;
        chart.validate()?;
        Ok(chart)
    }
}

/// In-memory chart registry for tests and embedded setups.
#[derive(Default)]
pub struct ChartLibrary {
    charts: HashMap<String, Chart>,
}

impl ChartLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, chart: Chart) {
        self.charts.insert(id.to_string(), chart);
    }

    pub fn with(mut self, id: &str, chart: Chart) -> Self {
        self.insert(id, chart);
        self
    }
}

impl ChartSource for ChartLibrary {
    fn load(&self, id: &str) -> Result<Chart, ChartError> {
        self.charts
            .get(id)
            .cloned()
            .ok_or_else(|| ChartError::NotFound(id.to_string()))
    }
}

pub fn load_chart_file(path: &Path) -> Result<Chart, ChartError> {
    let content = fs::read_to_string(path).map_err(|source| ChartError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let chart: Chart = serde_json::from_str(&content).map_err(|source| ChartError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    chart.validate()?;
    Ok(chart)
}
