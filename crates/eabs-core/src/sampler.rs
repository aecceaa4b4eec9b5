use model::FrameSnapshot;
use sim_core::{ActorSource, SimError};

/// Deduplicates backend snapshots by frame id so no simulated instant is
/// processed twice. Frames may be skipped when the loop falls behind; the
/// published status always reflects the latest state.
#[derive(Default)]
pub struct FrameSampler {
    last_frame: Option<u64>,
}

impl FrameSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Ok(None)` while the backend still reports the last processed frame;
    /// the caller waits briefly and retries.
    pub fn poll(
        &mut self,
        source: &mut dyn ActorSource,
    ) -> Result<Option<FrameSnapshot>, SimError> {
        let snapshot = source.snapshot()?;
        if self.last_frame == Some(snapshot.frame_id) {
            return Ok(None);
        }
        self.last_frame = Some(snapshot.frame_id);
        Ok(Some(snapshot))
    }
}
