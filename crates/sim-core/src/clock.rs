use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Injectable time source. The monitor loop only ever sleeps through this,
/// so its pacing stays auditable and tests can compress time.
pub trait Clock {
    /// Nanoseconds since the Unix epoch.
    fn now_ns(&self) -> i64;

    fn sleep(&self, d: Duration);
}

/// Wall clock with real sleeps.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0)
    }

    fn sleep(&self, d: Duration) {
        thread::sleep(d);
    }
}
