//! The per-frame threat-assessment loop: frame deduplication, ego
//! acquisition, neighbor assessment, and the out-of-band status channel.

mod channel;
mod locator;
mod runner;
mod sampler;

pub use channel::{ChannelError, StatusChannel, CARRIER_TEMPLATE, SENTINEL_Z};
pub use locator::{EgoLocator, VEHICLE_PATTERN};
pub use runner::{MonitorConfig, MonitorLoop, StepOutcome, PROCESSING_TIME_EVENT};
pub use sampler::FrameSampler;
