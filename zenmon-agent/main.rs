use anyhow::{bail, Context};
use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use clap::Parser;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use zenmon_raw::current_arch::thm::TdieMode;

use zenmon::common::pci::SYSFS_PCI_DEVICES;
use zenmon::common::{select_transport, CPU_IDENTITY};
use zenmon::config::{parse_node_list, DEFAULT_LISTEN};
use zenmon::profile::TopologyContext;
use zenmon::sensors::{DebugDump, SensorChannel};
use zenmon::{ExportConfig, MetricCollector, SensorMetricExporter, ZenDevice};

#[derive(Parser, Debug)]
#[command(name = "zenmon")]
#[command(about = "Temperature, voltage, current and power sensors for AMD Zen CPUs")]
struct Args {
    #[arg(
        long = "node",
        help = "Data Fabric nodes to monitor (can be specified multiple times, supports ranges: --node 0 --node 1 or --node 0-1)",
        action = clap::ArgAction::Append
    )]
    nodes: Vec<String>,

    #[arg(long, default_value_t = 1000, help = "Collection interval in milliseconds")]
    interval_ms: u64,

    #[arg(long, default_value_t = DEFAULT_LISTEN, help = "HTTP listen address")]
    listen: SocketAddr,

    #[arg(long, help = "Force the bus-indexed SMN window on the first host bridge")]
    legacy_smn: bool,

    #[arg(long, help = "Swap core and SoC SVI2 planes (for boards that wire them reversed)")]
    swap_core_soc: bool,

    #[arg(long, help = "Report Tdie as a signed difference instead of flooring at 0")]
    tdie_signed: bool,

    #[arg(long, help = "Print debug registers and current readings, then exit")]
    dump: bool,

    #[arg(
        short,
        long,
        help = "Enable verbose logging (shows all SMN register reads)"
    )]
    verbose: bool,
}

struct AppState {
    exporter: Arc<SensorMetricExporter>,
    devices: Vec<Arc<ZenDevice>>,
}

#[derive(Serialize)]
struct ChannelReading {
    #[serde(flatten)]
    channel: SensorChannel,
    value: Option<i64>,
    max: Option<i64>,
}

#[derive(Serialize)]
struct NodeChannels {
    node: u32,
    package: u32,
    generation: &'static str,
    channels: Vec<ChannelReading>,
}

fn node_channels(device: &ZenDevice) -> NodeChannels {
    let channels = device
        .list_channels()
        .iter()
        .map(|channel| ChannelReading {
            channel: channel.clone(),
            value: device.read_channel(channel.kind, channel.index).ok(),
            max: device.max_temperature(channel.kind, channel.index).ok(),
        })
        .collect();

    NodeChannels {
        node: device.node_id(),
        package: device.topology().package_index,
        generation: device.profile().generation.name(),
        channels,
    }
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    zenmon::gather_metrics!(buffer, encoder, state.exporter, "sensor");

    let content_type = encoder.format_type().to_string();
    (
        [("Content-Type", content_type)],
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

/// Run register reads over every device on the blocking pool
async fn read_devices<T, F>(devices: &[Arc<ZenDevice>], read: F) -> Result<Vec<T>, StatusCode>
where
    T: Send + 'static,
    F: Fn(&ZenDevice) -> T + Send + 'static,
{
    let devices = devices.to_vec();
    tokio::task::spawn_blocking(move || devices.iter().map(|d| read(d.as_ref())).collect())
        .await
        .map_err(|e| {
            tracing::error!("Device read task failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn channels_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<NodeChannels>>, StatusCode> {
    read_devices(&state.devices, node_channels).await.map(Json)
}

async fn debug_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DebugDump>>, StatusCode> {
    read_devices(&state.devices, ZenDevice::dump_debug_registers)
        .await
        .map(Json)
}

fn check_permissions() {
    // Extended PCI config space under /proc/bus/pci is root-only
    if !nix::unistd::Uid::effective().is_root() {
        eprintln!("\n⚠️  ERROR: zenmon needs root to access PCI configuration space\n\nRun with: sudo zenmon\n");
        std::process::exit(1);
    }
}

fn build_config(args: &Args) -> anyhow::Result<ExportConfig> {
    let mut config = ExportConfig::auto_detect(Path::new(SYSFS_PCI_DEVICES));

    if !args.nodes.is_empty() {
        let nodes = parse_node_list(&args.nodes).context("Invalid --node argument")?;
        config = config.with_nodes(nodes)?;
    }

    config.tdie_mode = if args.tdie_signed {
        TdieMode::Signed
    } else {
        TdieMode::Clamped
    };
    config.swap_planes = args.swap_core_soc;
    config.force_legacy = args.legacy_smn;
    config.interval = Duration::from_millis(args.interval_ms.max(1));
    config.listen = args.listen;

    Ok(config)
}

fn init_devices(config: &ExportConfig) -> anyhow::Result<Vec<Arc<ZenDevice>>> {
    let identity = &*CPU_IDENTITY;
    let context = TopologyContext::new(identity.node_id_leaf, config.node_count)?;
    let transport = select_transport(
        Path::new(SYSFS_PCI_DEVICES),
        config.node_count as usize,
        config.force_legacy,
    )
    .context("No SMN transport available")?;

    let mut devices = Vec::new();
    for &node in &config.nodes {
        match ZenDevice::new(
            Arc::clone(&transport),
            &context,
            identity,
            node,
            config.device_options(),
        ) {
            Ok(device) => devices.push(Arc::new(device)),
            Err(e) => tracing::error!("Failed to initialize node {}: {}", node, e),
        }
    }

    if devices.is_empty() {
        bail!("No sensor device could be initialized");
    }

    Ok(devices)
}

fn print_dump(devices: &[Arc<ZenDevice>]) {
    for device in devices {
        print!("{}", device.dump_debug_registers());
        for channel in device.list_channels().iter().filter(|c| c.visible) {
            let name = format!("{} ({}{})", channel.label, channel.kind.name(), channel.index);
            match device.read_channel(channel.kind, channel.index) {
                Ok(value) => println!("{name} = {value}"),
                Err(e) => println!("{name} = <{e}>"),
            }
        }
        println!();
    }
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    tracing::info!("Installing signal handlers...");

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Ctrl+C received!");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("SIGTERM received!");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::warn!("Shutdown triggered by Ctrl+C");
        },
        _ = terminate => {
            tracing::warn!("Shutdown triggered by SIGTERM");
        },
    }

    tracing::warn!("Shutdown signal received, initiating graceful shutdown...");
    cancel_token.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    check_permissions();

    let identity = &*CPU_IDENTITY;
    tracing::info!(
        "Detected CPU: {} (family {:X}h model {:X}h, {})",
        identity.model_name,
        identity.family,
        identity.model,
        identity.generation().name()
    );
    if !identity.is_zen() {
        bail!(
            "{} family {:X}h is not an AMD Zen processor",
            identity.vendor,
            identity.family
        );
    }

    let config = build_config(&args)?;
    tracing::info!(
        "Monitoring nodes {:?} of {}",
        config.nodes,
        config.node_count
    );

    let devices = init_devices(&config)?;

    if args.dump {
        print_dump(&devices);
        return Ok(());
    }

    let exporter = Arc::new(
        SensorMetricExporter::new(devices.clone()).context("Failed to register metrics")?,
    );
    let cancel_token = CancellationToken::new();
    let collection_handle =
        MetricCollector::new(Arc::clone(&exporter), config.interval).start(cancel_token.clone());

    let app_state = Arc::new(AppState { exporter, devices });

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/channels", get(channels_handler))
        .route("/debug", get(debug_handler))
        .with_state(app_state);

    tracing::warn!("Starting HTTP server on {}", config.listen);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    tracing::info!("Server shutdown complete, waiting for collection loop to finish...");

    if let Err(e) = collection_handle.await {
        tracing::error!("Collection loop failed: {}", e);
    }

    tracing::info!("All tasks completed, exiting");

    Ok(())
}
