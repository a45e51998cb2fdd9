pub mod config;
pub mod controller;
pub mod encoding;
pub mod link;
pub mod pipeline;
#[cfg(test)]
mod test_support;

use std::time::Duration;

use color_eyre::{eyre::eyre, Result};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::config::PadlinkConfig;
use crate::controller::{InputSampler, SamplerSettings};
use crate::link::{TransmitterHandle, TransmitterSettings, UartSession};
use crate::pipeline::{FrameTick, PipelineHandle};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    if let Err(e) = PadlinkConfig::ensure_default() {
        warn!("Could not write default configuration: {}", e);
    }
    let config = PadlinkConfig::load_or_default();
    info!("Active encoding policy: {}", config.encoder.policy);

    // A host without device polling is fatal for the feature; reported once,
    // the pipeline never starts.
    let sampler = InputSampler::create(Some(SamplerSettings {
        deadzone: config.sampler.deadzone,
    }))
    .map_err(|e| eyre!("Cannot start input pipeline: {}", e))?;
    let sampler = sampler.initialize();
    if sampler.is_device_connected() {
        info!(
            "Using controller: {}",
            sampler.device_name().unwrap_or_default()
        );
    }

    // Pairing and service discovery for the bridge module happened out of
    // band; opening its serial port is all that is left. A failed open
    // degrades to a detached transmitter - commands are dropped until the
    // user reconnects and restarts.
    let mut transmitter_handle =
        match UartSession::open(&config.link.uart_device, config.link.baud_rate) {
            Ok(session) => TransmitterHandle::spawn(
                Box::new(session),
                TransmitterSettings {
                    min_interval: Duration::from_millis(config.transmitter.min_interval_ms),
                },
            ),
            Err(e) => {
                warn!("No link session established: {}", e);
                TransmitterHandle::detached()
            }
        };

    // Stand-in for the display's per-frame callback: a ticker at the
    // configured refresh rate. Capacity 1 so a slow frame coalesces ticks
    // instead of queueing them.
    let (frame_tx, frame_rx) = mpsc::channel(1);
    let frame_rate = config.pipeline.frame_rate_hz.max(1);
    let ticker = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(frame_rate)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if frame_tx.send(FrameTick).await.is_err() {
                break;
            }
        }
    });

    let mut pipeline_handle = PipelineHandle::spawn(
        Box::new(sampler),
        config.encoder.policy,
        transmitter_handle.transmitter(),
        frame_rx,
    );

    // Display surface stand-in: human feedback only, nothing feeds back into
    // the pipeline.
    let mut snapshot_rx = pipeline_handle.subscribe();
    let display = tokio::spawn(async move {
        if snapshot_rx.wait_for(|snapshot| snapshot.is_some()).await.is_ok() {
            info!("Controller input live");
        }
    });

    info!("padlink running at {} frames/s; ctrl-c to stop", frame_rate);
    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    ticker.abort();
    display.abort();
    if let Err(e) = pipeline_handle.shutdown().await {
        warn!("Pipeline shutdown reported: {}", e);
    }
    transmitter_handle.shutdown().await;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
