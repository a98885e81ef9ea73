use anyhow::Result;

/// Scheduling seam for the session's backing track. Decoding and device
/// playback live outside the engine; the session only drives lifecycle.
pub trait AudioSink: Send {
    /// Schedule playback so the track's first beat lands at session time
    /// `offset_ms`. Called once while the session is loading.
    fn schedule(&mut self, offset_ms: f64) -> Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
    /// Whether scheduled playback has run to completion. Sessions wait for
    /// this before finishing.
    fn is_finished(&self) -> bool;
}

/// Sink for chartered-but-silent sessions and tests: scheduling succeeds
/// and playback is always complete.
#[derive(Debug, Default)]
pub struct NullAudio {
    playing: bool,
}

impl AudioSink for NullAudio {
    fn schedule(&mut self, _offset_ms: f64) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn stop(&mut self) {
        self.playing = false;
    }

    fn is_finished(&self) -> bool {
        true
    }
}
