mod config;

use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use config::{AppConfig, Args};
use eabs_core::{MonitorConfig, MonitorLoop};
use model::{Orientation, Vec3};
use sim_core::{ScriptedWorld, SystemClock};
use telemetry::{MetricPublisher, PublisherConfig, TcpJsonSession};

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fatal: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let mut cfg = AppConfig::load(&args.config)?;
    cfg.apply_overrides(&args);

    tracing_subscriber::fmt()
        .with_env_filter(cfg.logging.level.as_str())
        .init();

    info!(
        sim_host = %cfg.sim.host,
        sim_port = cfg.sim.port,
        backend = %cfg.sim.backend,
        role_name = %cfg.sim.role_name,
        broker_host = %cfg.broker.host,
        broker_port = cfg.broker.port,
        ttc_warning = cfg.thresholds.ttc_warning,
        ttc_mild = cfg.thresholds.ttc_mild_braking,
        ttc_strong = cfg.thresholds.ttc_strong_braking,
        "monitor starting"
    );

    let mut world = build_backend(&cfg)?;

    let publisher = Arc::new(MetricPublisher::new(PublisherConfig {
        max_queue: cfg.broker.max_queue,
        ..PublisherConfig::for_namespace(&cfg.broker.namespace)
    }));
    publisher.start(TcpJsonSession::new(
        &cfg.broker.host,
        cfg.broker.port,
        &cfg.broker.client_id,
        Duration::from_secs(cfg.broker.keepalive_secs),
    ));

    let monitor_cfg = MonitorConfig {
        role_name: cfg.sim.role_name.clone(),
        thresholds: cfg.thresholds,
        ..MonitorConfig::default()
    };
    let mut monitor = MonitorLoop::new(
        &mut world,
        SystemClock,
        Arc::clone(&publisher),
        monitor_cfg,
    );

    let stop = AtomicBool::new(false);
    monitor.run(&mut world, &stop);

    monitor.shutdown(&mut world);
    publisher.stop();
    info!(
        dropped = publisher.dropped_events(),
        "telemetry publisher stopped"
    );
    Ok(())
}

fn build_backend(cfg: &AppConfig) -> Result<ScriptedWorld> {
    match cfg.sim.backend.as_str() {
        "scripted" => Ok(scripted_scenario(&cfg.sim.role_name)),
        other => bail!("unknown sim backend '{other}' (only 'scripted' is built in)"),
    }
}

/// Deterministic demo world: the monitored vehicle closing on slower
/// traffic in its own lane, with a faster neighbor one lane over that never
/// becomes a threat.
fn scripted_scenario(role_name: &str) -> ScriptedWorld {
    let mut world = ScriptedWorld::self_ticking(0.05);
    world.set_lane_width(Some(3.5));
    world.add_vehicle(
        "vehicle.lincoln.mkz",
        Some(role_name),
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(20.0, 0.0, 0.0),
        Orientation::default(),
    );
    world.add_vehicle(
        "vehicle.audi.tt",
        None,
        Vec3::new(120.0, 0.0, 0.0),
        Vec3::new(8.0, 0.0, 0.0),
        Orientation::default(),
    );
    world.add_vehicle(
        "vehicle.nissan.micra",
        None,
        Vec3::new(30.0, 4.0, 0.0),
        Vec3::new(20.0, 0.0, 0.0),
        Orientation::default(),
    );
    world
}
