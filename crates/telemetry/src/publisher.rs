use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use model::MetricEvent;

use crate::{BrokerError, BrokerSession};

/// Queue capacity and worker pacing.
///
/// The three waits are the worker's only suspension points; tests shrink
/// them to compress time.
#[derive(Clone, Debug)]
pub struct PublisherConfig {
    /// Topic every [`MetricPublisher::record`] event is published under.
    pub topic: String,
    pub max_queue: usize,
    /// Pause between initial connection attempts.
    pub connect_retry: Duration,
    /// Bounded wait for new work; also the keepalive cadence when idle.
    pub drain_wait: Duration,
    /// Pause before re-connecting after a broker failure.
    pub reconnect_wait: Duration,
}

impl PublisherConfig {
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            topic: format!("{namespace}/events"),
            max_queue: 1024,
            connect_retry: Duration::from_secs(1),
            drain_wait: Duration::from_millis(100),
            reconnect_wait: Duration::from_millis(500),
        }
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self::for_namespace("eabs/nxp")
    }
}

/// JSON shape on the wire: `{"ts":…,"event":…,"value":…}`.
#[derive(Serialize)]
struct WirePayload<'a> {
    ts: i64,
    event: &'a str,
    value: i64,
}

/// Bounded producer/consumer event queue with one worker thread.
///
/// `enqueue` never blocks: events are dropped (newest first) when the
/// publisher is stopped or the queue is full. Delivery is at-most-once;
/// whatever is still queued when `stop` finishes joining is discarded.
pub struct MetricPublisher {
    cfg: PublisherConfig,
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    producer: Mutex<Option<Sender<MetricEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MetricPublisher {
    pub fn new(cfg: PublisherConfig) -> Self {
        Self {
            cfg,
            running: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicU64::new(0)),
            producer: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Launch the worker with a fresh broker session. No-op when already
    /// running.
    pub fn start<S>(&self, session: S)
    where
        S: BrokerSession + Send + 'static,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let (tx, rx) = bounded(self.cfg.max_queue);
        *self.producer.lock() = Some(tx);
        let running = Arc::clone(&self.running);
        let cfg = self.cfg.clone();
        *self.worker.lock() = Some(thread::spawn(move || {
            worker_loop(session, rx, running, cfg)
        }));
    }

    /// Non-blocking enqueue. Dropped silently when stopped; dropped and
    /// counted when the queue is full.
    pub fn enqueue(&self, event: MetricEvent) {
        if !self.running.load(Ordering::Relaxed) {
            return;
        }
        let producer = self.producer.lock();
        let Some(tx) = producer.as_ref() else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Stamp `tag` with the wall clock and enqueue it under the configured
    /// topic.
    pub fn record(&self, tag: &str, value: i64) {
        self.enqueue(MetricEvent {
            topic: self.cfg.topic.clone(),
            timestamp_ns: now_ns(),
            event: tag.to_string(),
            value,
        });
    }

    /// Signal the worker and wait for it to finish. No-op when stopped.
    /// There is no timeout: a wedged broker call delays shutdown.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        // Dropping the producer ends the worker's drain once the queue is
        // empty.
        self.producer.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    /// Events discarded under backpressure since construction.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for MetricPublisher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

fn publish_event<S: BrokerSession>(
    session: &mut S,
    event: &MetricEvent,
) -> Result<(), BrokerError> {
    let payload = serde_json::to_vec(&WirePayload {
        ts: event.timestamp_ns,
        event: &event.event,
        value: event.value,
    })
    .map_err(|e| BrokerError::Publish(e.to_string()))?;
    session.publish(&event.topic, &payload)
}

fn worker_loop<S: BrokerSession>(
    mut session: S,
    rx: Receiver<MetricEvent>,
    running: Arc<AtomicBool>,
    cfg: PublisherConfig,
) {
    let mut connected = false;

    // Initial connection, paced. Events enqueued meanwhile stay buffered up
    // to the queue capacity.
    while running.load(Ordering::SeqCst) && !connected {
        match session.connect() {
            Ok(()) => {
                connected = true;
                info!("telemetry broker connected");
            }
            Err(err) => {
                warn!(%err, "telemetry broker connect failed, retrying");
                thread::sleep(cfg.connect_retry);
            }
        }
    }

    loop {
        let item = match rx.recv_timeout(cfg.drain_wait) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            // Producer dropped by stop() and the queue is drained.
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if let Some(event) = item {
            if connected {
                if let Err(err) = publish_event(&mut session, &event) {
                    // The event is lost, not requeued.
                    warn!(%err, "telemetry publish failed");
                    connected = false;
                }
            }
        }

        if connected {
            if let Err(err) = session.tick() {
                warn!(%err, "telemetry keepalive failed");
                connected = false;
            }
        }

        let work_remains = running.load(Ordering::SeqCst) || !rx.is_empty();
        if !connected && work_remains {
            thread::sleep(cfg.reconnect_wait);
            match session.connect() {
                Ok(()) => {
                    connected = true;
                    info!("telemetry broker reconnected");
                }
                Err(err) => warn!(%err, "telemetry broker reconnect failed"),
            }
        }
    }

    if connected {
        session.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_payload_shape() {
        let payload = serde_json::to_string(&WirePayload {
            ts: 1_700_000_000_000_000_000,
            event: "eabs_processing_time",
            value: 42,
        })
        .unwrap();
        assert_eq!(
            payload,
            r#"{"ts":1700000000000000000,"event":"eabs_processing_time","value":42}"#
        );
    }
}
