//! Runs an emulated LIFX bulb on the local network.
//!
//! The LIFX app (or anything else that speaks the LAN protocol) will discover it like any other
//! bulb.  Light changes are logged.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use lifx_emu_core::light::{LightActuator, LightOutput};
use lifx_emu_core::{header_timestamp, Emulator, MAX_DATAGRAM_SIZE};
use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod host;

use config::{Config, LightMode};
use host::{FileStore, LogActuator, StaticIdentity, SystemClock};
use lifx_emu_core::host::TimeSource;

#[derive(Parser)]
#[command(name = "lifx-emu")]
#[command(about = "Pretend to be a LIFX bulb")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the config file
    #[arg(short, long)]
    bind: Option<std::net::IpAddr>,

    /// Bulb label, overriding the config file
    #[arg(short, long)]
    label: Option<String>,

    /// Log filter, e.g. "debug" or "lifx_emu_core=trace".  Defaults to RUST_LOG, then "info".
    #[arg(long)]
    log_level: Option<String>,
}

fn light_output(mode: LightMode) -> Result<LightOutput> {
    let light = |name: &str| -> Option<Box<dyn LightActuator>> {
        Some(Box::new(LogActuator::new(name)))
    };
    let output = match mode {
        LightMode::Combined => LightOutput::from_parts(light("rgbww"), None, None),
        LightMode::Dual => LightOutput::from_parts(None, light("white"), light("color")),
    };
    Ok(output?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }
    if let Some(label) = cli.label {
        config.label = label;
    }
    debug!("{:?}", config);

    let clock = SystemClock;
    let defaults = config.device_defaults(header_timestamp(clock.utcnow()))?;
    let identity = StaticIdentity {
        mac: config.mac_bytes()?,
        rssi: config.rssi,
    };
    let store = FileStore {
        path: config.state_file.clone(),
    };
    let mut emulator = Emulator::new(
        &defaults,
        light_output(config.light)?,
        Box::new(store),
        Box::new(clock),
        Box::new(identity),
    );

    let addr = SocketAddr::new(config.bind, config.port);
    let socket = UdpSocket::bind(addr)
        .await
        .with_context(|| format!("unable to bind {}", addr))?;
    socket
        .set_broadcast(true)
        .context("unable to enable broadcast")?;
    info!("Listening on {}", addr);

    let start = Instant::now();
    let now_ms = || start.elapsed().as_millis() as u64;

    let mut ticker = tokio::time::interval(Duration::from_millis(config.tick_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // one byte more than the largest datagram we accept, so oversized ones are seen as such
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE + 1];
    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, peer) = match received {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Receive failed: {}", e);
                        continue;
                    }
                };
                debug!("{} bytes from {}", len, peer);
                for reply in emulator.handle_datagram(&buf[..len], now_ms()) {
                    if let Err(e) = socket.send_to(&reply, peer).await {
                        warn!("Unable to send to {}: {}", peer, e);
                    }
                }
            }
            _ = ticker.tick() => {
                emulator.tick(now_ms());
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
