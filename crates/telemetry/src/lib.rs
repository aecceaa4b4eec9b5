//! Asynchronous diagnostic-event publishing: a bounded queue drained by one
//! background worker that owns the broker session. Producers never block and
//! never see broker failures.

mod publisher;
mod tcp;

pub use publisher::{MetricPublisher, PublisherConfig};
pub use tcp::TcpJsonSession;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("keepalive failed: {0}")]
    Keepalive(String),
}

/// Capability interface over the broker client library.
///
/// One value is handed to the worker thread per [`MetricPublisher::start`]
/// call; the worker is its only caller, so implementations need no internal
/// locking.
pub trait BrokerSession {
    fn connect(&mut self) -> Result<(), BrokerError>;

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Periodic keepalive while connected; called at least every drain wait.
    fn tick(&mut self) -> Result<(), BrokerError>;

    fn disconnect(&mut self);
}
