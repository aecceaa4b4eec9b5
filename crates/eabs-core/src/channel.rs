use model::{ActorId, Vec3};
use sim_core::{ActorSource, SimError};
use tracing::{info, warn};

/// Template kind of the shared data-carrier object.
pub const CARRIER_TEMPLATE: &str = "static.prop.box01";

/// The carrier parks far below the drivable world, which marks it as a
/// non-physical channel object.
pub const SENTINEL_Z: f64 = -1000.0;

/// Any carrier-kind actor below this depth is an existing channel to reuse.
const REUSE_BELOW_Z: f64 = -900.0;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Setup failed to find or spawn a carrier. Permanent until restart.
    #[error("status channel unavailable")]
    Unavailable,
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// Out-of-band status signal: a small integer encoded into the position of
/// a world object that any observer with world access can decode.
pub struct StatusChannel {
    carrier: Option<ActorId>,
    owned: bool,
    current: i64,
}

impl StatusChannel {
    /// Reuse an existing carrier below the sentinel depth or spawn a fresh
    /// one. A failed spawn leaves the channel permanently unavailable; it is
    /// never retried.
    pub fn attach(source: &mut dyn ActorSource) -> Self {
        match Self::setup(source) {
            Ok((carrier, owned)) => {
                if owned {
                    info!(carrier, "status channel carrier spawned");
                } else {
                    info!(carrier, "reusing existing status channel carrier");
                }
                Self {
                    carrier: Some(carrier),
                    owned,
                    current: 0,
                }
            }
            Err(err) => {
                warn!(%err, "status channel setup failed; writes disabled");
                Self {
                    carrier: None,
                    owned: false,
                    current: 0,
                }
            }
        }
    }

    fn setup(source: &mut dyn ActorSource) -> Result<(ActorId, bool), SimError> {
        for id in source.actors(CARRIER_TEMPLATE)? {
            if let Ok(pos) = source.position(id) {
                if pos.z < REUSE_BELOW_Z {
                    return Ok((id, false));
                }
            }
        }
        let id = source.spawn(CARRIER_TEMPLATE, Vec3::new(0.0, 0.0, SENTINEL_Z))?;
        Ok((id, true))
    }

    pub fn is_available(&self) -> bool {
        self.carrier.is_some()
    }

    /// Encode `code` into the carrier's x position, clamped to `[0, 999]`.
    /// Backend failures pass through; the carrier is kept for the next try.
    pub fn write(
        &mut self,
        source: &mut dyn ActorSource,
        code: i64,
    ) -> Result<(), ChannelError> {
        let Some(carrier) = self.carrier else {
            return Err(ChannelError::Unavailable);
        };
        let clamped = code.clamp(0, 999);
        source.set_position(carrier, Vec3::new(clamped as f64, 0.0, SENTINEL_Z))?;
        if clamped != self.current {
            info!(from = self.current, to = clamped, "status updated");
            self.current = clamped;
        }
        Ok(())
    }

    /// Decode the carrier's x position modulo 1000, normalized non-negative.
    /// Returns 0 when unavailable or when the read fails.
    pub fn read(&self, source: &mut dyn ActorSource) -> i64 {
        let Some(carrier) = self.carrier else {
            return 0;
        };
        match source.position(carrier) {
            Ok(pos) => (pos.x as i64).rem_euclid(1000),
            Err(_) => 0,
        }
    }

    /// Destroy the carrier, but only if this process spawned it.
    pub fn teardown(&mut self, source: &mut dyn ActorSource) {
        if let Some(carrier) = self.carrier.take() {
            if self.owned {
                match source.destroy(carrier) {
                    Ok(()) => info!(carrier, "status channel carrier destroyed"),
                    Err(err) => warn!(%err, "status channel teardown failed"),
                }
            }
        }
    }
}
