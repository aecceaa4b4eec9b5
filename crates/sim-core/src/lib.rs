//! Capability surface over the simulation backend, shared by the monitor
//! loop and its tests. Real backend clients live out of tree; the in-tree
//! [`ScriptedWorld`] is a deterministic stand-in.

mod clock;
mod scripted;

pub use clock::{Clock, SystemClock};
pub use scripted::ScriptedWorld;

use model::{ActorId, ActorState, FrameSnapshot, Vec3};

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("actor {0} is gone or invalid")]
    InvalidActor(ActorId),
    #[error("blueprint '{0}' not found")]
    MissingBlueprint(String),
    #[error("backend unavailable: {0}")]
    Backend(String),
}

/// Synchronous query interface over world state owned by the simulation
/// backend.
///
/// Every call can fail independently; callers treat failures as "data
/// unavailable this frame" rather than aborting.
pub trait ActorSource {
    /// Latest world snapshot, one per simulation tick.
    fn snapshot(&mut self) -> Result<FrameSnapshot, SimError>;

    /// Ids of live actors whose type id matches `pattern`. A trailing `*`
    /// makes the pattern a prefix match (`"vehicle.*"`), otherwise it is
    /// compared exactly.
    fn actors(&mut self, pattern: &str) -> Result<Vec<ActorId>, SimError>;

    fn actor_state(&mut self, id: ActorId) -> Result<ActorState, SimError>;

    /// Named actor attribute such as `role_name`; `Ok(None)` when the actor
    /// carries no attribute of that name.
    fn actor_attribute(&mut self, id: ActorId, name: &str)
        -> Result<Option<String>, SimError>;

    fn spawn(&mut self, template: &str, position: Vec3) -> Result<ActorId, SimError>;

    fn destroy(&mut self, id: ActorId) -> Result<(), SimError>;

    fn position(&mut self, id: ActorId) -> Result<Vec3, SimError>;

    fn set_position(&mut self, id: ActorId, position: Vec3) -> Result<(), SimError>;

    /// Lane width of the map at `position`, when the backend knows it.
    fn lane_width_at(&mut self, position: Vec3) -> Option<f64>;
}
