use model::ActorId;
use sim_core::{ActorSource, SimError};
use tracing::info;

/// Type pattern all candidate vehicles match.
pub const VEHICLE_PATTERN: &str = "vehicle.*";

/// Finds the monitored vehicle by its `role_name` attribute and hands the
/// handle back until the loop reports it stale.
pub struct EgoLocator {
    role_name: String,
    ego: Option<ActorId>,
}

impl EgoLocator {
    pub fn new(role_name: &str) -> Self {
        Self {
            role_name: role_name.to_string(),
            ego: None,
        }
    }

    pub fn current(&self) -> Option<ActorId> {
        self.ego
    }

    /// Held handle, or a fresh scan of the world. `Ok(None)` means the
    /// vehicle is not in the world yet and the caller should pace retries.
    /// Validity of a held handle is proven by the caller's next state read;
    /// a failed read comes back as [`invalidate`](Self::invalidate).
    pub fn ensure(
        &mut self,
        source: &mut dyn ActorSource,
    ) -> Result<Option<ActorId>, SimError> {
        if self.ego.is_some() {
            return Ok(self.ego);
        }
        for id in source.actors(VEHICLE_PATTERN)? {
            match source.actor_attribute(id, "role_name") {
                Ok(Some(role)) if role == self.role_name => {
                    info!(id, role = %self.role_name, "ego vehicle acquired");
                    self.ego = Some(id);
                    return Ok(self.ego);
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Drop a stale handle so the next frame rescans.
    pub fn invalidate(&mut self) {
        self.ego = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Orientation, Vec3};
    use sim_core::ScriptedWorld;

    fn world_with_roles() -> (ScriptedWorld, ActorId) {
        let mut world = ScriptedWorld::new();
        world.add_vehicle(
            "vehicle.other.a",
            None,
            Vec3::default(),
            Vec3::default(),
            Orientation::default(),
        );
        world.add_vehicle(
            "vehicle.other.b",
            Some("npc"),
            Vec3::default(),
            Vec3::default(),
            Orientation::default(),
        );
        let hero = world.add_vehicle(
            "vehicle.test.car",
            Some("hero"),
            Vec3::default(),
            Vec3::default(),
            Orientation::default(),
        );
        (world, hero)
    }

    #[test]
    fn finds_vehicle_by_role_name() {
        let (mut world, hero) = world_with_roles();
        let mut locator = EgoLocator::new("hero");
        assert_eq!(locator.ensure(&mut world).unwrap(), Some(hero));
        // Held handle is returned without rescanning.
        assert_eq!(locator.ensure(&mut world).unwrap(), Some(hero));
    }

    #[test]
    fn missing_role_is_not_an_error() {
        let (mut world, _) = world_with_roles();
        let mut locator = EgoLocator::new("stunt-double");
        assert_eq!(locator.ensure(&mut world).unwrap(), None);
        assert_eq!(locator.current(), None);
    }

    #[test]
    fn invalidate_forces_a_rescan() {
        let (mut world, hero) = world_with_roles();
        let mut locator = EgoLocator::new("hero");
        locator.ensure(&mut world).unwrap();
        world.remove(hero);
        locator.invalidate();
        assert_eq!(locator.ensure(&mut world).unwrap(), None);
    }
}
