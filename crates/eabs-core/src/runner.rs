use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use model::{ActorId, ActorState, Status, ThresholdConfig};
use sim_core::{ActorSource, Clock};
use telemetry::MetricPublisher;
use tracing::{debug, info, warn};

use crate::channel::{ChannelError, StatusChannel};
use crate::locator::{EgoLocator, VEHICLE_PATTERN};
use crate::sampler::FrameSampler;

/// Event tag carrying per-frame assessment latency in nanoseconds.
pub const PROCESSING_TIME_EVENT: &str = "eabs_processing_time";

#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// `role_name` attribute of the monitored vehicle.
    pub role_name: String,
    pub thresholds: ThresholdConfig,
    /// Nearest-neighbor candidates considered per frame.
    pub max_neighbors: usize,
    /// Pause while the backend still reports the current frame.
    pub frame_wait: Duration,
    /// Pause between scans while the monitored vehicle is not in the world.
    pub acquire_wait: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            role_name: "hero".into(),
            thresholds: ThresholdConfig::default(),
            max_neighbors: 5,
            frame_wait: Duration::from_millis(1),
            acquire_wait: Duration::from_millis(500),
        }
    }
}

/// What one loop iteration did. `run` picks the matching pause; tests drive
/// `step` directly and assert on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Backend still on the last processed frame.
    FramePending,
    /// No vehicle carries the configured role name; frame consumed.
    AwaitingEgo,
    /// The held ego handle failed its state read and was dropped.
    EgoInvalidated,
    /// A backend query failed; data unavailable this frame.
    Unavailable,
    /// Assessment ran and the status was published.
    Assessed(Status),
}

/// Single-threaded assessment loop. Every step borrows the caller's
/// [`ActorSource`], and nothing is shared with the publisher beyond the
/// non-blocking enqueue.
pub struct MonitorLoop<C> {
    clock: C,
    cfg: MonitorConfig,
    sampler: FrameSampler,
    locator: EgoLocator,
    channel: StatusChannel,
    publisher: Arc<MetricPublisher>,
}

impl<C: Clock> MonitorLoop<C> {
    /// Sets up the status channel as part of construction; an unavailable
    /// channel degrades writes but never blocks monitoring.
    pub fn new(
        source: &mut dyn ActorSource,
        clock: C,
        publisher: Arc<MetricPublisher>,
        cfg: MonitorConfig,
    ) -> Self {
        let channel = StatusChannel::attach(source);
        let locator = EgoLocator::new(&cfg.role_name);
        Self {
            clock,
            cfg,
            sampler: FrameSampler::new(),
            locator,
            channel,
            publisher,
        }
    }

    pub fn channel(&self) -> &StatusChannel {
        &self.channel
    }

    /// One loop iteration against the current world state.
    pub fn step(&mut self, source: &mut dyn ActorSource) -> StepOutcome {
        let snapshot = match self.sampler.poll(source) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return StepOutcome::FramePending,
            Err(err) => {
                warn!(%err, "snapshot query failed");
                return StepOutcome::Unavailable;
            }
        };

        let ego_id = match self.locator.ensure(source) {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!(role = %self.cfg.role_name, "waiting for ego vehicle");
                return StepOutcome::AwaitingEgo;
            }
            Err(err) => {
                warn!(%err, "actor scan failed");
                return StepOutcome::Unavailable;
            }
        };

        let started_ns = self.clock.now_ns();

        // This read doubles as the per-frame validity check of the handle.
        let ego = match source.actor_state(ego_id) {
            Ok(state) => state,
            Err(err) => {
                info!(%err, "ego vehicle invalid or destroyed, dropping handle");
                self.locator.invalidate();
                return StepOutcome::EgoInvalidated;
            }
        };

        let others = gather_vehicle_states(source, ego_id);
        if others.is_empty() {
            debug!(
                frame = snapshot.frame_id,
                timestamp = snapshot.platform_timestamp,
                "no other vehicles in the world"
            );
        }
        let neighbors: Vec<ActorState> = assess::nearest_vehicles(&ego, &others, self.cfg.max_neighbors)
            .into_iter()
            .map(|(state, _)| state)
            .collect();
        let lane_width = source.lane_width_at(ego.position);
        let assessment = assess::classify(&ego, &neighbors, lane_width, &self.cfg.thresholds);

        let elapsed_ns = self.clock.now_ns() - started_ns;
        self.publisher.record(PROCESSING_TIME_EVENT, elapsed_ns);

        match self.channel.write(source, assessment.status.code()) {
            Ok(()) => {}
            Err(ChannelError::Unavailable) => {
                debug!("status channel unavailable, write skipped")
            }
            Err(err) => warn!(%err, "status write failed"),
        }

        info!(
            frame = snapshot.frame_id,
            status = %assessment.status,
            min_ttc = ?assessment.min_ttc,
            elapsed_ns,
            "frame assessed"
        );
        StepOutcome::Assessed(assessment.status)
    }

    /// Drive [`step`](Self::step) with its documented pauses until `stop` is
    /// set. Backend failures inside a step are transient; nothing here is
    /// fatal.
    pub fn run(&mut self, source: &mut dyn ActorSource, stop: &AtomicBool) {
        info!(role = %self.cfg.role_name, "monitor loop started");
        while !stop.load(Ordering::Relaxed) {
            match self.step(source) {
                StepOutcome::FramePending | StepOutcome::Unavailable => {
                    self.clock.sleep(self.cfg.frame_wait)
                }
                StepOutcome::AwaitingEgo => self.clock.sleep(self.cfg.acquire_wait),
                StepOutcome::EgoInvalidated | StepOutcome::Assessed(_) => {}
            }
        }
        info!("monitor loop stopped");
    }

    /// Destroy the channel carrier if this process owns it.
    pub fn shutdown(&mut self, source: &mut dyn ActorSource) {
        self.channel.teardown(source);
    }
}

fn gather_vehicle_states(source: &mut dyn ActorSource, ego_id: ActorId) -> Vec<ActorState> {
    let ids = match source.actors(VEHICLE_PATTERN) {
        Ok(ids) => ids,
        Err(err) => {
            warn!(%err, "vehicle enumeration failed");
            return Vec::new();
        }
    };
    let mut states = Vec::with_capacity(ids.len());
    for id in ids {
        if id == ego_id {
            continue;
        }
        // Actors can die between enumeration and the state read.
        if let Ok(state) = source.actor_state(id) {
            states.push(state);
        }
    }
    states
}
