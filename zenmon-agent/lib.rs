// Macros (must be first for visibility)
#[macro_use]
pub mod macros;

pub mod common;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod profile;
pub mod prom;
pub mod sensors;

#[cfg(test)]
mod testing;

pub use config::ExportConfig;
pub use error::{Result, ZenmonError};
pub use orchestrator::MetricCollector;
pub use prom::SensorMetricExporter;
pub use sensors::{DeviceOptions, SensorKind, ZenDevice};
