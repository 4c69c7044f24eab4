use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::Mutex;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use drive_agent::net::start_websocket_server;
use drive_agent::{PhysicsWorld, ServerConfig, SharedState};

/// Fixed-tick driving server for manual and agent-controlled cars.
#[derive(Parser, Debug)]
#[command(name = "drive-agent-server")]
struct Cli {
    /// JSON config file; missing fields fall back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Websocket bind address, overrides the config file.
    #[arg(long)]
    bind: Option<String>,

    /// Simulation rate in Hz, overrides the config file.
    #[arg(long)]
    tick_hz: Option<u32>,

    /// Attach debug rays to every observation.
    #[arg(long)]
    debug_rays: bool,
}

fn build_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut cfg = ServerConfig::load(cli.config.as_deref())
        .with_context(|| format!("loading config {:?}", cli.config))?;

    if let Some(bind) = &cli.bind {
        cfg.bind = bind.clone();
    }
    if let Some(hz) = cli.tick_hz {
        cfg.tick_hz = hz;
    }
    cfg.debug_rays |= cli.debug_rays;

    cfg.validate()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = build_config(&cli)?;
    info!(bind = %cfg.bind, tick_hz = cfg.tick_hz, "starting drive agent server");

    let state = Arc::new(Mutex::new(SharedState::new()));
    let physics = Arc::new(Mutex::new(PhysicsWorld::new(&cfg)));

    let server = tokio::spawn(start_websocket_server(
        cfg.bind.clone(),
        Arc::clone(&state),
        Arc::clone(&physics),
    ));

    let dt = cfg.dt();
    let mut ticker = interval(Duration::from_secs_f32(dt));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if server.is_finished() {
            break;
        }
        ticker.tick().await;

        let mut phys = physics.lock().await;
        let mut game = state.lock().await;

        // Controls go in before the step; observations come out after it.
        game.apply_controls(&mut phys);
        phys.step(dt);

        game.tick += 1;
        if game.tick % cfg.decision_period == 0 {
            game.send_observations(&mut phys, cfg.debug_rays);
        }
        game.broadcast_snapshot(&phys);
    }

    match server.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => {
            error!(error = %err, "websocket server stopped");
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
