//! AMD Zen (family 17h/19h) register definitions
//!
//! This module provides SMN register definitions for processors based on
//! the Zen microarchitectures, from Summit Ridge up to Vermeer and Cezanne.
//!
//! ## Register Blocks
//!
//! - **SMN** (System Management Network) - index/data window and PCI IDs
//! - **SVI** (Serial VID Interface 2) - core/SoC voltage regulator telemetry
//! - **THM** (Thermal) - reported control temperature and per-CCD sensors
//!
//! ## References
//!
//! - AMD Processor Programming Reference (PPR) for Family 17h, Models 01h/71h
//! - Linux `k10temp` and `amd_nb` drivers for the SMN access method
//!
//! SVI current coefficients are not documented publicly; they were fitted
//! against readings from known-good boards.

pub mod smn;
pub mod svi;
pub mod thm;
