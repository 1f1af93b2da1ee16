pub mod arch;
pub mod cpuid;
pub mod pci;
pub mod smn;

pub use arch::{CpuIdentity, ZenGeneration, CPU_IDENTITY};
pub use pci::PciHandle;
pub use smn::{select_transport, SmnTransport, TransportMode};
