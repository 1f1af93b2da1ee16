use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZenmonError {
    #[error("SMN operation failed: {0}")]
    SmnError(String),

    #[error("PCI operation failed: {0}")]
    PciError(#[from] zenmon_raw::PciError),

    #[error("{kind}{index} is not supported on node {node}")]
    NotSupported {
        kind: &'static str,
        index: usize,
        node: u32,
    },

    #[error("Component not installed: {0}")]
    ComponentAbsent(String),

    #[error("Topology error: {0}")]
    TopologyError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Prometheus error: {0}")]
    PrometheusError(#[from] prometheus::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported CPU: {0}")]
    UnsupportedCpu(String),
}

impl ZenmonError {
    /// True for per-request conditions that never invalidate the device
    pub fn is_not_supported(&self) -> bool {
        matches!(self, ZenmonError::NotSupported { .. })
    }
}

pub type Result<T> = std::result::Result<T, ZenmonError>;
