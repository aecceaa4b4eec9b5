use std::io::{BufWriter, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{BrokerError, BrokerSession};

/// Newline-delimited JSON over a plain TCP stream.
///
/// Each published event becomes one `<topic> <payload>` line, and a
/// heartbeat line goes out when the link has been idle for the keepalive
/// interval. This keeps the broker protocol out of tree: anything that
/// accepts a TCP connection and reads lines can collect the feed.
pub struct TcpJsonSession {
    addr: String,
    client_id: String,
    keepalive: Duration,
    stream: Option<BufWriter<TcpStream>>,
    last_write: Instant,
}

impl TcpJsonSession {
    /// `client_id` gets a unique suffix so concurrent monitor instances are
    /// distinguishable on the collector side.
    pub fn new(host: &str, port: u16, client_id: &str, keepalive: Duration) -> Self {
        Self {
            addr: format!("{host}:{port}"),
            client_id: format!("{client_id}-{}", Uuid::new_v4().simple()),
            keepalive,
            stream: None,
            last_write: Instant::now(),
        }
    }
}

impl BrokerSession for TcpJsonSession {
    fn connect(&mut self) -> Result<(), BrokerError> {
        let stream =
            TcpStream::connect(&self.addr).map_err(|e| BrokerError::Connect(e.to_string()))?;
        stream.set_nodelay(true).ok();
        let mut writer = BufWriter::new(stream);
        let hello = json!({ "client_id": self.client_id });
        writeln!(writer, "{hello}").map_err(|e| BrokerError::Connect(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| BrokerError::Connect(e.to_string()))?;
        info!(addr = %self.addr, "telemetry session open");
        self.stream = Some(writer);
        self.last_write = Instant::now();
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let Some(writer) = self.stream.as_mut() else {
            return Err(BrokerError::Publish("not connected".into()));
        };
        let line = String::from_utf8_lossy(payload);
        if let Err(e) = writeln!(writer, "{topic} {line}") {
            self.stream = None;
            return Err(BrokerError::Publish(e.to_string()));
        }
        self.last_write = Instant::now();
        Ok(())
    }

    fn tick(&mut self) -> Result<(), BrokerError> {
        let idle = self.last_write.elapsed() >= self.keepalive;
        let Some(writer) = self.stream.as_mut() else {
            return Err(BrokerError::Keepalive("not connected".into()));
        };
        if idle {
            let ping = json!({ "ping": self.client_id });
            if let Err(e) = writeln!(writer, "{ping}") {
                self.stream = None;
                return Err(BrokerError::Keepalive(e.to_string()));
            }
        }
        if let Err(e) = writer.flush() {
            self.stream = None;
            return Err(BrokerError::Keepalive(e.to_string()));
        }
        if idle {
            self.last_write = Instant::now();
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut writer) = self.stream.take() {
            let _ = writer.flush();
        }
    }
}
