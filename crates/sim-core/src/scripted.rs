use std::collections::BTreeMap;
use std::time::Instant;

use model::{ActorId, ActorState, FrameSnapshot, Orientation, Vec3};

use crate::{ActorSource, SimError};

const DEFAULT_TICK_S: f64 = 0.05;

struct ScriptedActor {
    type_id: String,
    state: ActorState,
    attributes: Vec<(String, String)>,
}

/// In-memory world with straight-line kinematics.
///
/// Manual mode (`new`) only advances when [`tick`](ScriptedWorld::tick) is
/// called, which keeps tests deterministic. Self-ticking mode advances with
/// wall time so repeated snapshot polls see the same frame id until the next
/// scripted tick falls due, matching how a live backend behaves.
pub struct ScriptedWorld {
    frame: u64,
    sim_time: f64,
    dt: f64,
    self_tick: Option<Instant>,
    actors: BTreeMap<ActorId, ScriptedActor>,
    next_id: ActorId,
    lane_width: Option<f64>,
    refuse_spawns: bool,
    spawned: usize,
}

impl ScriptedWorld {
    pub fn new() -> Self {
        Self {
            frame: 0,
            sim_time: 0.0,
            dt: DEFAULT_TICK_S,
            self_tick: None,
            actors: BTreeMap::new(),
            next_id: 1,
            lane_width: None,
            refuse_spawns: false,
            spawned: 0,
        }
    }

    /// World that advances itself: one tick of `dt` simulated seconds per
    /// `dt` wall seconds, starting at the first snapshot query.
    pub fn self_ticking(dt: f64) -> Self {
        let mut world = Self::new();
        world.dt = dt;
        world.self_tick = Some(Instant::now());
        world
    }

    /// Advance one frame and integrate actor motion.
    pub fn tick(&mut self) {
        self.frame += 1;
        self.sim_time += self.dt;
        for actor in self.actors.values_mut() {
            let s = &mut actor.state;
            s.position.x += s.velocity.x * self.dt;
            s.position.y += s.velocity.y * self.dt;
            s.position.z += s.velocity.z * self.dt;
        }
    }

    pub fn add_vehicle(
        &mut self,
        type_id: &str,
        role_name: Option<&str>,
        position: Vec3,
        velocity: Vec3,
        orientation: Orientation,
    ) -> ActorId {
        let mut attributes = Vec::new();
        if let Some(role) = role_name {
            attributes.push(("role_name".to_string(), role.to_string()));
        }
        self.insert(type_id, attributes, position, velocity, orientation)
    }

    pub fn add_prop(&mut self, template: &str, position: Vec3) -> ActorId {
        self.insert(
            template,
            Vec::new(),
            position,
            Vec3::default(),
            Orientation::default(),
        )
    }

    /// Simulate the backend destroying an actor out from under us.
    pub fn remove(&mut self, id: ActorId) {
        self.actors.remove(&id);
    }

    pub fn set_velocity(&mut self, id: ActorId, velocity: Vec3) {
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.state.velocity = velocity;
        }
    }

    pub fn set_lane_width(&mut self, width: Option<f64>) {
        self.lane_width = width;
    }

    /// Make future spawn requests fail as if the template were missing.
    pub fn refuse_spawns(&mut self, refuse: bool) {
        self.refuse_spawns = refuse;
    }

    /// Number of actors created through the `spawn` capability.
    pub fn spawned_count(&self) -> usize {
        self.spawned
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    fn insert(
        &mut self,
        type_id: &str,
        attributes: Vec<(String, String)>,
        position: Vec3,
        velocity: Vec3,
        orientation: Orientation,
    ) -> ActorId {
        let id = self.next_id;
        self.next_id += 1;
        self.actors.insert(
            id,
            ScriptedActor {
                type_id: type_id.to_string(),
                state: ActorState {
                    id,
                    position,
                    velocity,
                    orientation,
                },
                attributes,
            },
        );
        id
    }

    fn get(&self, id: ActorId) -> Result<&ScriptedActor, SimError> {
        self.actors.get(&id).ok_or(SimError::InvalidActor(id))
    }

    fn get_mut(&mut self, id: ActorId) -> Result<&mut ScriptedActor, SimError> {
        self.actors.get_mut(&id).ok_or(SimError::InvalidActor(id))
    }
}

impl Default for ScriptedWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn type_matches(pattern: &str, type_id: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => type_id.starts_with(prefix),
        None => type_id == pattern,
    }
}

impl ActorSource for ScriptedWorld {
    fn snapshot(&mut self) -> Result<FrameSnapshot, SimError> {
        if let Some(started) = self.self_tick {
            let due = (started.elapsed().as_secs_f64() / self.dt) as u64;
            while self.frame < due {
                self.tick();
            }
        }
        Ok(FrameSnapshot {
            frame_id: self.frame,
            platform_timestamp: self.sim_time,
        })
    }

    fn actors(&mut self, pattern: &str) -> Result<Vec<ActorId>, SimError> {
        Ok(self
            .actors
            .iter()
            .filter(|(_, a)| type_matches(pattern, &a.type_id))
            .map(|(id, _)| *id)
            .collect())
    }

    fn actor_state(&mut self, id: ActorId) -> Result<ActorState, SimError> {
        Ok(self.get(id)?.state)
    }

    fn actor_attribute(
        &mut self,
        id: ActorId,
        name: &str,
    ) -> Result<Option<String>, SimError> {
        let actor = self.get(id)?;
        Ok(actor
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone()))
    }

    fn spawn(&mut self, template: &str, position: Vec3) -> Result<ActorId, SimError> {
        if self.refuse_spawns {
            return Err(SimError::MissingBlueprint(template.to_string()));
        }
        self.spawned += 1;
        Ok(self.add_prop(template, position))
    }

    fn destroy(&mut self, id: ActorId) -> Result<(), SimError> {
        self.actors
            .remove(&id)
            .map(|_| ())
            .ok_or(SimError::InvalidActor(id))
    }

    fn position(&mut self, id: ActorId) -> Result<Vec3, SimError> {
        Ok(self.get(id)?.state.position)
    }

    fn set_position(&mut self, id: ActorId, position: Vec3) -> Result<(), SimError> {
        self.get_mut(id)?.state.position = position;
        Ok(())
    }

    fn lane_width_at(&mut self, _position: Vec3) -> Option<f64> {
        self.lane_width
    }
}
