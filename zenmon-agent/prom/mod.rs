pub mod sensor;

pub use sensor::SensorMetricExporter;
