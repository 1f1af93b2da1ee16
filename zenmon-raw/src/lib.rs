//! # zenmon-raw
//!
//! Register definitions and telemetry decoding for AMD Zen family sensors.
//!
//! This crate provides type-safe layouts for the SMN (System Management
//! Network) registers that carry temperature and SVI2 voltage regulator
//! telemetry, the fixed-point formulas that turn them into physical units,
//! and the raw PCI configuration-space primitive used to reach the SMN
//! index/data window.
//!
//! ## Features
//!
//! Select the target architecture via feature flags:
//! - `zen` (default) - family 17h/19h register definitions
//!
//! ## Usage
//!
//! ```ignore
//! use zenmon_raw::current_arch::svi::{self, FormulaVariant, SviTelemetry};
//! use zenmon_raw::RegisterLayout;
//!
//! let plane = SviTelemetry::from_smn_value(raw);
//! let millivolts = plane.voltage_mv();
//! let milliamps = plane.core_current_ma(FormulaVariant::Gen2);
//! ```

pub mod arch;
pub mod pci;
pub mod register;

// Re-export for convenience
pub use pci::{open_config_space, read_dword, write_dword, PciError, PciLocation, Result};
pub use register::{extract_bits, Register, RegisterLayout};

// Export current architecture based on feature flag
#[cfg(feature = "zen")]
pub use arch::zen as current_arch;
