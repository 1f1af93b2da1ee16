pub mod calibration;
pub mod chip;
pub mod topology;

pub use calibration::tctl_offset;
pub use chip::{resolve_profile, ChipProfile};
pub use topology::{Topology, TopologyContext};
