use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

use model::ThresholdConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Collision-threat monitor for a simulated ego vehicle")]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "monitor.toml")]
    pub config: String,

    /// Simulation backend host
    #[arg(long)]
    pub host: Option<String>,

    /// Simulation backend port
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// role_name attribute of the monitored vehicle
    #[arg(long)]
    pub role_name: Option<String>,

    /// Telemetry broker host
    #[arg(long)]
    pub broker_host: Option<String>,

    /// Telemetry broker port
    #[arg(long)]
    pub broker_port: Option<u16>,

    /// TTC warning threshold, seconds
    #[arg(long)]
    pub ttc_warning: Option<f64>,

    /// TTC mild-braking threshold, seconds
    #[arg(long)]
    pub ttc_mild: Option<f64>,

    /// TTC strong-braking threshold, seconds
    #[arg(long)]
    pub ttc_strong: Option<f64>,

    /// Log filter, e.g. "info" or "eabs_core=debug"
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default = "SimConfig::default_host")]
    pub host: String,
    #[serde(default = "SimConfig::default_port")]
    pub port: u16,
    #[serde(default = "SimConfig::default_role_name")]
    pub role_name: String,
    /// Backend implementation. Only `scripted` is built in; real clients
    /// implement the `ActorSource` trait out of tree.
    #[serde(default = "SimConfig::default_backend")]
    pub backend: String,
}

impl SimConfig {
    fn default_host() -> String {
        "localhost".into()
    }
    fn default_port() -> u16 {
        2000
    }
    fn default_role_name() -> String {
        "hero".into()
    }
    fn default_backend() -> String {
        "scripted".into()
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            role_name: Self::default_role_name(),
            backend: Self::default_backend(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "BrokerConfig::default_host")]
    pub host: String,
    #[serde(default = "BrokerConfig::default_port")]
    pub port: u16,
    #[serde(default = "BrokerConfig::default_client_id")]
    pub client_id: String,
    /// Events publish under `<namespace>/events`.
    #[serde(default = "BrokerConfig::default_namespace")]
    pub namespace: String,
    #[serde(default = "BrokerConfig::default_max_queue")]
    pub max_queue: usize,
    #[serde(default = "BrokerConfig::default_keepalive_secs")]
    pub keepalive_secs: u64,
}

impl BrokerConfig {
    fn default_host() -> String {
        "localhost".into()
    }
    fn default_port() -> u16 {
        1883
    }
    fn default_client_id() -> String {
        "eabs-monitor".into()
    }
    fn default_namespace() -> String {
        "eabs/nxp".into()
    }
    fn default_max_queue() -> usize {
        1024
    }
    fn default_keepalive_secs() -> u64 {
        60
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            client_id: Self::default_client_id(),
            namespace: Self::default_namespace(),
            max_queue: Self::default_max_queue(),
            keepalive_secs: Self::default_keepalive_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".into()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// Everything the process needs, merged once at startup and immutable from
/// then on.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub sim: SimConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Defaults when the file does not exist; a file that exists but fails
    /// to parse is a startup error.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        toml::from_str(&text).with_context(|| format!("parsing config {path}"))
    }

    pub fn apply_overrides(&mut self, args: &Args) {
        if let Some(host) = &args.host {
            self.sim.host = host.clone();
        }
        if let Some(port) = args.port {
            self.sim.port = port;
        }
        if let Some(role_name) = &args.role_name {
            self.sim.role_name = role_name.clone();
        }
        if let Some(host) = &args.broker_host {
            self.broker.host = host.clone();
        }
        if let Some(port) = args.broker_port {
            self.broker.port = port;
        }
        if let Some(ttc) = args.ttc_warning {
            self.thresholds.ttc_warning = ttc;
        }
        if let Some(ttc) = args.ttc_mild {
            self.thresholds.ttc_mild_braking = ttc;
        }
        if let Some(ttc) = args.ttc_strong {
            self.thresholds.ttc_strong_braking = ttc;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [sim]
            role_name = "stunt"

            [thresholds]
            ttc_warning = 3.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sim.role_name, "stunt");
        assert_eq!(cfg.sim.port, 2000);
        assert_eq!(cfg.sim.backend, "scripted");
        assert_eq!(cfg.thresholds.ttc_warning, 3.0);
        assert_eq!(cfg.thresholds.ttc_mild_braking, 2.0);
        assert_eq!(cfg.broker.port, 1883);
        assert_eq!(cfg.broker.max_queue, 1024);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn cli_overrides_beat_the_file() {
        let mut cfg = AppConfig::default();
        let args = Args {
            config: "monitor.toml".into(),
            host: Some("sim.example".into()),
            port: Some(3000),
            role_name: Some("stunt".into()),
            broker_host: None,
            broker_port: Some(9001),
            ttc_warning: Some(4.0),
            ttc_mild: None,
            ttc_strong: None,
            log_level: Some("debug".into()),
        };
        cfg.apply_overrides(&args);
        assert_eq!(cfg.sim.host, "sim.example");
        assert_eq!(cfg.sim.port, 3000);
        assert_eq!(cfg.sim.role_name, "stunt");
        assert_eq!(cfg.broker.host, "localhost");
        assert_eq!(cfg.broker.port, 9001);
        assert_eq!(cfg.thresholds.ttc_warning, 4.0);
        assert_eq!(cfg.thresholds.ttc_mild_braking, 2.0);
        assert_eq!(cfg.logging.level, "debug");
    }
}
