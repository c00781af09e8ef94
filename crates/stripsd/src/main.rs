use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use stripsd::engine::TransportSender;
use stripsd::host::memory::MemoryDevice;
use stripsd::host::memory::MemoryFlows;
use stripsd::Config;
use stripsd::DeviceEvent;
use stripsd::Driver;
use stripsd::HostServices;
use stripsd::StripsDevice;
use stripsd::TransportEvent;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncRead;
use tokio::io::BufReader;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Strips Z-Wave sensor driver against an in-memory host
#[derive(Debug, Parser)]
#[command(name = "stripsd", version)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "stripsd.toml")]
    config: PathBuf,

    /// JSON-lines file of transport events; reads stdin when omitted
    #[arg(short, long)]
    events: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(config.logging.targets())
        .init();

    info!("stripsd starting");
    info!("Loaded config from: {}", args.config.display());

    let flows = Arc::new(MemoryFlows::new());
    let (mut driver, events_tx) = Driver::new();

    let mut hosts = Vec::new();
    for (id, device_config) in &config.devices {
        let settings = device_config
            .settings()
            .with_context(|| format!("invalid settings for device {}", id))?;
        let memory = Arc::new(MemoryDevice::new(settings));
        let host = HostServices::in_memory(memory.clone(), flows.clone());
        driver.add_device(StripsDevice::new(id.clone(), device_config.variant, host));
        hosts.push((id.clone(), memory));
    }

    for (id, device_config) in &config.devices {
        let init = TransportEvent {
            device: id.clone(),
            event: DeviceEvent::Init {
                node: device_config.node(),
            },
        };
        if let Err(e) = driver.handle_event(init).await {
            error!("Failed to initialize device: {}", e);
        }
    }

    let ready_delay = Duration::from_millis(config.host.ready_delay_ms);
    tokio::spawn({
        let flows = flows.clone();
        async move {
            tokio::time::sleep(ready_delay).await;
            flows.mark_ready();
            info!("Flow triggers ready");
        }
    });

    let reader = tokio::spawn(read_events(args.events, events_tx));

    driver.run().await;
    reader.await.context("event reader task failed")??;
    driver.drain_scene_tasks().await;

    for (id, memory) in &hosts {
        info!(device = %id, capabilities = %memory.snapshot().await, "final state");
    }

    info!("stripsd shutdown complete");

    Ok(())
}

/// Forward JSON-lines transport events to the driver
///
/// Blank lines and lines starting with `#` are skipped. Malformed events are
/// logged and skipped.
async fn read_events(path: Option<PathBuf>, tx: TransportSender) -> anyhow::Result<()> {
    let input: Box<dyn AsyncRead + Unpin + Send> = match &path {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open events {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let mut lines = BufReader::new(input).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("failed to read events")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match serde_json::from_str::<TransportEvent>(line) {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    warn!("Driver stopped, dropping remaining events");
                    break;
                }
            }
            Err(e) => warn!(line = line_no, "Skipping malformed event: {}", e),
        }
    }

    Ok(())
}
