pub mod channel;
pub mod device;
pub mod probe;

pub use channel::{ChannelSource, SensorChannel, SensorKind};
pub use device::{DebugDump, DeviceOptions, RegisterSample, ZenDevice};
pub use probe::CcdPresence;
