//! Inkbadge host
//!
//! Polls Home Assistant once a minute, renders the readings into the
//! configured grid and streams the packed bitmap to the badge over its
//! serial link.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use inkbadge_core::{Canvas, DirectoryIconSource, GridRenderer, LinkTransmitter, SensorSnapshot};
use log::{error, info, warn};

mod schedule;
mod settings;
mod sources;

use crate::schedule::next_tick_delay;
use crate::settings::{config_path, Settings};
use crate::sources::{HomeAssistantSource, SensorSource};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    info!("Inkbadge host starting...");

    let settings = Settings::load(config_path(std::env::args().nth(1)).as_deref())?;
    if settings.home_assistant.token.is_none() {
        warn!("HA_TOKEN not set, requests will be unauthenticated");
    }

    let port = serialport::new(&settings.link.port, settings.link.baud_rate)
        .timeout(Duration::from_millis(settings.link.timeout_ms))
        .open()
        .with_context(|| {
            format!(
                "failed to open {}. Make sure nothing else holds the port",
                settings.link.port
            )
        })?;
    info!(
        "Connected to {} at {} baud",
        settings.link.port, settings.link.baud_rate
    );

    // Registered once so a Ctrl-C during a fetch or the settle wait is kept
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // The badge resets when the port opens
    let settle = tokio::time::sleep(Duration::from_millis(settings.link.settle_ms));
    if or_shutdown(settle, shutdown.as_mut()).await.is_none() {
        drop(port);
        info!("Serial link closed");
        return Ok(());
    }

    let source = HomeAssistantSource::new(&settings.home_assistant, settings.remote_sensors())?;
    let display = &settings.layout.display;
    let icons = DirectoryIconSource::new(&display.icons_dir, &display.icons_dir_inverted);
    let mut renderer = GridRenderer::new(settings.layout.clone(), icons);
    let mut link = LinkTransmitter::new(port);

    loop {
        let Some(snapshot) = or_shutdown(source.fetch(), shutdown.as_mut()).await else {
            break;
        };
        info!("{}", summary(&snapshot));

        match send_canvas(&mut link, &renderer.render(&snapshot)) {
            Ok(len) => info!("Sent {} byte image frame", len),
            Err(e) => error!("Failed to send frame: {:#}", e),
        }

        let delay = next_tick_delay(&Local::now(), &settings.schedule);
        if or_shutdown(tokio::time::sleep(delay), shutdown.as_mut())
            .await
            .is_none()
        {
            break;
        }
    }

    if let Err(e) = link.flush() {
        warn!("Flush on shutdown failed: {}", e);
    }
    drop(link.into_inner());
    info!("Serial link closed");
    Ok(())
}

/// Run `task` unless `shutdown` completes first
///
/// `shutdown` is polled before `task`, so a signal already delivered wins.
async fn or_shutdown<T, S>(task: impl Future<Output = T>, shutdown: Pin<&mut S>) -> Option<T>
where
    S: Future<Output = io::Result<()>>,
{
    tokio::select! {
        biased;
        result = shutdown => {
            match result {
                Ok(()) => info!("Interrupted, shutting down"),
                Err(e) => warn!("Ctrl-C handler failed: {}", e),
            }
            None
        }
        value = task => Some(value),
    }
}

/// Pack `canvas` and send it as one image frame
fn send_canvas<W: io::Write>(link: &mut LinkTransmitter<W>, canvas: &Canvas) -> Result<usize> {
    let packed = canvas
        .pack()
        .map_err(|e| anyhow!("failed to pack canvas: {:?}", e))?;
    Ok(link.send_image(&packed)?)
}

/// One-line `key: value` summary of a snapshot
fn summary(snapshot: &SensorSnapshot) -> String {
    snapshot
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join(" | ")
}
