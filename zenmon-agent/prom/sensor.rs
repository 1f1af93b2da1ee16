use prometheus::{Gauge, IntCounter, Opts, Registry};
use std::sync::Arc;

use crate::error::{Result, ZenmonError};
use crate::sensors::{SensorKind, ZenDevice};

const MAX_METRIC_NAME: &str = "zen_temperature_max_millidegrees";
const READ_ERRORS_NAME: &str = "zen_read_errors_total";

struct ChannelGauge {
    kind: SensorKind,
    index: usize,
    gauge: Gauge,
    /// Failed reads; the gauge keeps its last good value meanwhile
    errors: IntCounter,
}

struct DeviceGauges {
    device: Arc<ZenDevice>,
    channels: Vec<ChannelGauge>,
}

/// Exports every visible channel of every node as a gauge
pub struct SensorMetricExporter {
    registry: Arc<Registry>,
    devices: Vec<DeviceGauges>,
}

impl SensorMetricExporter {
    pub fn new(devices: Vec<Arc<ZenDevice>>) -> Result<Self> {
        let registry = Arc::new(Registry::new());
        let mut exporter = Self {
            registry: Arc::clone(&registry),
            devices: Vec::with_capacity(devices.len()),
        };

        for device in devices {
            exporter.register_device(device)?;
        }

        Ok(exporter)
    }

    fn channel_opts(name: &str, help: String, device: &ZenDevice, label: &str) -> Opts {
        Opts::new(name, help)
            .const_label("node", device.node_id().to_string())
            .const_label("package", device.topology().package_index.to_string())
            .const_label("sensor", label)
    }

    fn register_device(&mut self, device: Arc<ZenDevice>) -> Result<()> {
        let mut channels = Vec::new();

        for channel in device.visible_channels() {
            let help = format!("Zen {} sensor reading", channel.kind.name());
            let name = channel.kind.metric_name();
            let opts = Self::channel_opts(name, help, &device, &channel.label);
            let gauge = Gauge::with_opts(opts)?;
            self.registry.register(Box::new(gauge.clone()))?;

            let help = "Failed sensor register reads".to_string();
            let opts = Self::channel_opts(READ_ERRORS_NAME, help, &device, &channel.label);
            let errors = IntCounter::with_opts(opts)?;
            self.registry.register(Box::new(errors.clone()))?;

            channels.push(ChannelGauge {
                kind: channel.kind,
                index: channel.index,
                gauge,
                errors,
            });

            match device.max_temperature(channel.kind, channel.index) {
                Ok(max) => {
                    let help = "Zen temperature threshold for display".to_string();
                    let opts =
                        Self::channel_opts(MAX_METRIC_NAME, help, &device, &channel.label);
                    let gauge = Gauge::with_opts(opts)?;
                    gauge.set(max as f64);
                    self.registry.register(Box::new(gauge))?;
                }
                Err(e) if e.is_not_supported() => {}
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            "Registered {} gauges for node {}",
            channels.len(),
            device.node_id()
        );

        self.devices.push(DeviceGauges { device, channels });
        Ok(())
    }

    /// Collect metrics once (called by orchestrator)
    ///
    /// Register reads block on config-space I/O, so they run on the
    /// blocking pool.
    pub async fn collect(self: &Arc<Self>) {
        let exporter = Arc::clone(self);
        if let Err(e) = tokio::task::spawn_blocking(move || exporter.collect_blocking()).await {
            tracing::error!("Sensor collection task failed: {}", e);
        }
    }

    /// Read every exported channel on the calling thread
    pub fn collect_blocking(&self) {
        for entry in &self.devices {
            for channel in &entry.channels {
                match entry.device.read_channel(channel.kind, channel.index) {
                    Ok(value) => channel.gauge.set(value as f64),
                    Err(ZenmonError::ComponentAbsent(msg)) => {
                        tracing::debug!("Skipping reading: {}", msg);
                    }
                    Err(e) => {
                        channel.errors.inc();
                        tracing::error!(
                            "Failed to read {}{} on node {}: {}",
                            channel.kind.name(),
                            channel.index,
                            entry.device.node_id(),
                            e
                        );
                    }
                }
            }
        }
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<ZenDevice>> {
        self.devices.iter().map(|entry| &entry.device)
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}
