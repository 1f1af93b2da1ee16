//! Architecture-specific register definitions
//!
//! Each AMD Zen silicon revision places its SVI2 telemetry planes at
//! different SMN addresses and uses different current coefficients. This
//! module provides the definitions organized by CPU family.
//!
//! ## Supported Architectures
//!
//! - **Zen** (`zen` feature) - family 17h (Zen, Zen+, Zen 2) and family 19h (Zen 3)

#[cfg(feature = "zen")]
pub mod zen;
