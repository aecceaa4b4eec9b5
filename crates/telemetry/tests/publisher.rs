use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use model::MetricEvent;
use telemetry::{BrokerError, BrokerSession, MetricPublisher, PublisherConfig};

#[derive(Default)]
struct SessionState {
    connects: usize,
    fail_first_connects: usize,
    refuse_all_connects: bool,
    published: Vec<(String, String)>,
    fail_next_publishes: usize,
    ticks: usize,
    disconnects: usize,
}

#[derive(Clone, Default)]
struct FakeSession(Arc<Mutex<SessionState>>);

impl BrokerSession for FakeSession {
    fn connect(&mut self) -> Result<(), BrokerError> {
        let mut s = self.0.lock();
        s.connects += 1;
        if s.refuse_all_connects {
            return Err(BrokerError::Connect("refused".into()));
        }
        if s.fail_first_connects > 0 {
            s.fail_first_connects -= 1;
            return Err(BrokerError::Connect("refused".into()));
        }
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let mut s = self.0.lock();
        if s.fail_next_publishes > 0 {
            s.fail_next_publishes -= 1;
            return Err(BrokerError::Publish("broken pipe".into()));
        }
        s.published
            .push((topic.to_string(), String::from_utf8_lossy(payload).into_owned()));
        Ok(())
    }

    fn tick(&mut self) -> Result<(), BrokerError> {
        self.0.lock().ticks += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.0.lock().disconnects += 1;
    }
}

fn fast_config(max_queue: usize) -> PublisherConfig {
    PublisherConfig {
        topic: "test/events".into(),
        max_queue,
        connect_retry: Duration::from_millis(5),
        drain_wait: Duration::from_millis(5),
        reconnect_wait: Duration::from_millis(5),
    }
}

fn event(tag: &str) -> MetricEvent {
    MetricEvent {
        topic: "test/events".into(),
        timestamp_ns: 1,
        event: tag.into(),
        value: 0,
    }
}

fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn overflow_drops_are_counted_exactly() {
    // The worker never connects, so it never drains the queue.
    let session = FakeSession::default();
    session.0.lock().refuse_all_connects = true;

    let publisher = MetricPublisher::new(fast_config(4));
    publisher.start(session.clone());
    for i in 0..10 {
        publisher.enqueue(event(&format!("e{i}")));
    }
    assert_eq!(publisher.dropped_events(), 6);
    publisher.stop();
    // Undelivered events are discarded, not published.
    assert!(session.0.lock().published.is_empty());
}

#[test]
fn buffered_events_survive_initial_connect_failures() {
    let session = FakeSession::default();
    session.0.lock().fail_first_connects = 3;

    let publisher = MetricPublisher::new(fast_config(16));
    publisher.start(session.clone());
    publisher.enqueue(event("a"));
    publisher.enqueue(event("b"));
    publisher.enqueue(event("c"));

    wait_until("all three events to publish", || {
        session.0.lock().published.len() == 3
    });
    let s = session.0.lock();
    assert!(s.connects >= 4);
    let tags: Vec<&str> = s
        .published
        .iter()
        .map(|(_, payload)| {
            if payload.contains("\"a\"") {
                "a"
            } else if payload.contains("\"b\"") {
                "b"
            } else {
                "c"
            }
        })
        .collect();
    assert_eq!(tags, vec!["a", "b", "c"]);
    drop(s);
    publisher.stop();
}

#[test]
fn publish_failure_loses_item_and_reconnects() {
    let session = FakeSession::default();
    session.0.lock().fail_next_publishes = 1;

    let publisher = MetricPublisher::new(fast_config(16));
    publisher.start(session.clone());
    wait_until("initial connect", || session.0.lock().connects == 1);

    publisher.enqueue(event("lost"));
    wait_until("reconnect after failed publish", || {
        session.0.lock().connects == 2
    });

    publisher.enqueue(event("kept"));
    wait_until("second event to publish", || {
        !session.0.lock().published.is_empty()
    });

    let s = session.0.lock();
    assert_eq!(s.published.len(), 1);
    assert!(s.published[0].1.contains("\"kept\""));
    assert_eq!(s.published[0].0, "test/events");
    drop(s);
    publisher.stop();
}

#[test]
fn keepalive_ticks_while_idle() {
    let session = FakeSession::default();
    let publisher = MetricPublisher::new(fast_config(16));
    publisher.start(session.clone());
    wait_until("a few idle keepalives", || session.0.lock().ticks >= 3);
    publisher.stop();
    let s = session.0.lock();
    assert!(s.published.is_empty());
    assert_eq!(s.disconnects, 1);
}

#[test]
fn lifecycle_is_idempotent() {
    let session = FakeSession::default();
    let publisher = MetricPublisher::new(fast_config(4));

    publisher.start(session.clone());
    publisher.start(session.clone()); // no-op, must not spawn a second worker
    wait_until("first connect", || session.0.lock().connects >= 1);
    publisher.stop();
    publisher.stop(); // no-op
    assert_eq!(session.0.lock().connects, 1);

    publisher.start(session.clone());
    publisher.enqueue(event("again"));
    wait_until("event after restart", || {
        session.0.lock().published.len() == 1
    });
    publisher.stop();
    assert_eq!(session.0.lock().disconnects, 2);
}

#[test]
fn enqueue_on_stopped_publisher_is_a_silent_no_op() {
    let publisher = MetricPublisher::new(fast_config(4));
    publisher.enqueue(event("nowhere"));
    assert_eq!(publisher.dropped_events(), 0);
    publisher.stop();
}
