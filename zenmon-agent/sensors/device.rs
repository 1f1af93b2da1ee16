// One sensor device per data-fabric node

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use zenmon_raw::current_arch::smn::DEBUG_ADDRESSES;
use zenmon_raw::current_arch::svi::{FormulaVariant, SviTelemetry};
use zenmon_raw::current_arch::thm::{
    CcdTemperature, ReportedTempControl, TdieMode, TDIE_MAX_MILLIC,
};
use zenmon_raw::Register;

use crate::common::arch::CpuIdentity;
use crate::common::smn::SmnTransport;
use crate::error::{Result, ZenmonError};
use crate::profile::{resolve_profile, tctl_offset, ChipProfile, Topology, TopologyContext};
use crate::sensors::channel::{build_catalog, ChannelSource, SensorChannel, SensorKind};
use crate::sensors::probe::CcdPresence;

/// Per-host knobs applied to every device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceOptions {
    pub tdie_mode: TdieMode,
    pub swap_planes: bool,
}

/// Raw register values captured for troubleshooting
#[derive(Debug, Clone, Serialize)]
pub struct DebugDump {
    pub transport: &'static str,
    pub node_id: u32,
    pub nodes_per_package: u32,
    pub package_index: u32,
    pub registers: Vec<RegisterSample>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegisterSample {
    pub address: u32,
    /// `None` when the read failed
    pub value: Option<u32>,
}

impl fmt::Display for DebugDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SMN_TRANSPORT = {}", self.transport)?;
        writeln!(f, "NODE_ID = {}", self.node_id)?;
        writeln!(f, "NODES_PER_PACKAGE = {}", self.nodes_per_package)?;
        writeln!(f, "PACKAGE_INDEX = {}", self.package_index)?;
        for sample in &self.registers {
            match sample.value {
                Some(value) => writeln!(f, "SMN_0x{:08X} = 0x{:08X}", sample.address, value)?,
                None => writeln!(f, "SMN_0x{:08X} = <read failed>", sample.address)?,
            }
        }
        Ok(())
    }
}

/// Sensor device bound to one node
///
/// The channel list and its visibility are fixed at construction; later
/// read failures surface per request and never change what is exposed.
pub struct ZenDevice {
    transport: Arc<dyn SmnTransport>,
    topology: Topology,
    profile: ChipProfile,
    tctl_offset: i32,
    tdie_mode: TdieMode,
    channels: Vec<SensorChannel>,
}

impl ZenDevice {
    pub fn new(
        transport: Arc<dyn SmnTransport>,
        context: &TopologyContext,
        identity: &CpuIdentity,
        node_id: u32,
        options: DeviceOptions,
    ) -> Result<Self> {
        let topology = context.resolve(node_id)?;

        let mut profile = resolve_profile(identity.family, identity.model, &topology);
        if options.swap_planes {
            profile = profile.with_swapped_planes();
        }

        let tctl_offset = tctl_offset(identity.family, &identity.model_name);
        let ccd = CcdPresence::probe(transport.as_ref(), node_id, profile.ccd_probe_count)?;
        let channels = build_catalog(&profile, &ccd, &topology, context);

        tracing::info!(
            "Node {}: {} via {} SMN, {} CCDs, Tctl offset {} m°C, Tdie {}",
            node_id,
            profile.generation.name(),
            transport.mode().name(),
            ccd.present_count(),
            tctl_offset,
            options.tdie_mode.name()
        );
        tracing::debug!(
            "Node {}: package {}, node {} of {}",
            node_id,
            topology.package_index,
            topology.node_within_package,
            topology.nodes_per_package
        );

        Ok(Self {
            transport,
            topology,
            profile,
            tctl_offset,
            tdie_mode: options.tdie_mode,
            channels,
        })
    }

    pub fn node_id(&self) -> u32 {
        self.topology.node_id
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn profile(&self) -> &ChipProfile {
        &self.profile
    }

    pub fn tctl_offset(&self) -> i32 {
        self.tctl_offset
    }

    pub fn list_channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    pub fn visible_channels(&self) -> impl Iterator<Item = &SensorChannel> {
        self.channels.iter().filter(|c| c.visible)
    }

    pub fn channel(&self, kind: SensorKind, index: usize) -> Option<&SensorChannel> {
        self.channels
            .iter()
            .find(|c| c.kind == kind && c.index == index)
    }

    fn visible_channel(&self, kind: SensorKind, index: usize) -> Result<&SensorChannel> {
        self.channel(kind, index)
            .filter(|c| c.visible)
            .ok_or(ZenmonError::NotSupported {
                kind: kind.name(),
                index,
                node: self.topology.node_id,
            })
    }

    /// Read one channel
    ///
    /// Units: m°C, mV, mA, and µW for power.
    pub fn read_channel(&self, kind: SensorKind, index: usize) -> Result<i64> {
        let channel = self.visible_channel(kind, index)?;
        let address = channel.address.ok_or(ZenmonError::NotSupported {
            kind: kind.name(),
            index,
            node: self.topology.node_id,
        })?;

        let raw = self.transport.read(self.topology.node_id, address)?;
        let variant: FormulaVariant = self.profile.formula_variant;

        let value = match channel.source {
            ChannelSource::Tctl => {
                let reg = Register::<ReportedTempControl>::decode(address, raw);
                reg.layout.control_temp_millic() as i64
            }
            ChannelSource::Tdie => {
                let reg = Register::<ReportedTempControl>::decode(address, raw);
                self.tdie_mode
                    .apply(reg.layout.control_temp_millic(), self.tctl_offset) as i64
            }
            ChannelSource::Ccd { .. } => {
                let reg = Register::<CcdTemperature>::decode(address, raw);
                if !reg.layout.is_present() {
                    return Err(ZenmonError::ComponentAbsent(format!(
                        "{} on node {} reads zero",
                        channel.label, self.topology.node_id
                    )));
                }
                reg.layout.temp_millic() as i64
            }
            ChannelSource::Voltage(_) => {
                let reg = Register::<SviTelemetry>::decode(address, raw);
                reg.layout.voltage_mv() as i64
            }
            ChannelSource::Current(plane) => {
                let reg = Register::<SviTelemetry>::decode(address, raw);
                reg.layout.current_ma(plane, variant) as i64
            }
            ChannelSource::Power(plane) => {
                let reg = Register::<SviTelemetry>::decode(address, raw);
                reg.layout.power_uw(plane, variant)
            }
        };

        Ok(value)
    }

    /// Reported maximum; only Tdie carries one
    pub fn max_temperature(&self, kind: SensorKind, index: usize) -> Result<i64> {
        let channel = self.visible_channel(kind, index)?;
        match channel.source {
            ChannelSource::Tdie => Ok(TDIE_MAX_MILLIC as i64),
            _ => Err(ZenmonError::NotSupported {
                kind: kind.name(),
                index,
                node: self.topology.node_id,
            }),
        }
    }

    pub fn dump_debug_registers(&self) -> DebugDump {
        let node = self.topology.node_id;
        let registers = DEBUG_ADDRESSES
            .iter()
            .map(|&address| {
                let value = match self.transport.read(node, address) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(
                            "Node {}: debug read of 0x{:08X} failed: {}",
                            node,
                            address,
                            e
                        );
                        None
                    }
                };
                RegisterSample { address, value }
            })
            .collect();

        DebugDump {
            transport: self.transport.mode().name(),
            node_id: node,
            nodes_per_package: self.topology.nodes_per_package,
            package_index: self.topology.package_index,
            registers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSmn;
    use zenmon_raw::current_arch::svi::SVI_BASE;
    use zenmon_raw::current_arch::thm::{ccd_temp_address, MAX_CCD_SLOTS, REPORTED_TEMP_CTRL};

    const MATISSE_CORE: u32 = SVI_BASE + 0x10;
    const MATISSE_SOC: u32 = SVI_BASE + 0xC;

    fn device(
        smn: &Arc<FakeSmn>,
        identity: &CpuIdentity,
        leaf_nodes: (u32, u32),
        node: u32,
        options: DeviceOptions,
    ) -> Result<ZenDevice> {
        let context = TopologyContext::new(leaf_nodes.0, leaf_nodes.1)?;
        let transport: Arc<dyn SmnTransport> = smn.clone();
        ZenDevice::new(transport, &context, identity, node, options)
    }

    fn matisse() -> CpuIdentity {
        CpuIdentity::new(0x17, 0x71, "AMD Ryzen 9 3900X 12-Core Processor", 0)
    }

    #[test]
    fn test_matisse_readings() {
        let smn = Arc::new(
            FakeSmn::new()
                .with(0, REPORTED_TEMP_CTRL, 400 << 21) // 50 °C
                .with(0, ccd_temp_address(0), 0x0AF4)
                .with(0, ccd_temp_address(1), 0x0AF0)
                .with(0, MATISSE_CORE, 0x0030_0010)
                .with(0, MATISSE_SOC, 0x0050_0008),
        );
        let dev = device(&smn, &matisse(), (0, 1), 0, DeviceOptions::default()).unwrap();

        assert_eq!(dev.read_channel(SensorKind::Temperature, 0).unwrap(), 50_000);
        assert_eq!(dev.read_channel(SensorKind::Temperature, 1).unwrap(), 50_000);
        assert_eq!(dev.read_channel(SensorKind::Temperature, 2).unwrap(), 45_500);
        assert_eq!(dev.read_channel(SensorKind::Temperature, 3).unwrap(), 45_000);

        // vid 0x30: 1550 - 300 = 1250 mV; idd 16 with GEN2 core: 10541 mA
        assert_eq!(dev.read_channel(SensorKind::Voltage, 0).unwrap(), 1250);
        assert_eq!(dev.read_channel(SensorKind::Current, 0).unwrap(), 10_541);
        assert_eq!(
            dev.read_channel(SensorKind::Power, 0).unwrap(),
            10_541 * 1250
        );

        // vid 0x50: 1550 - 500 = 1050 mV; idd 8 with GEN2 SoC: 2354 mA
        assert_eq!(dev.read_channel(SensorKind::Voltage, 1).unwrap(), 1050);
        assert_eq!(dev.read_channel(SensorKind::Current, 1).unwrap(), 2354);

        assert_eq!(dev.max_temperature(SensorKind::Temperature, 0).unwrap(), 70_000);
        assert!(dev.max_temperature(SensorKind::Temperature, 1).is_err());
    }

    #[test]
    fn test_every_listed_channel_reads_back() {
        // (family, model, node id leaf, node count)
        let configs = [
            (0x17, 0x01, 0, 1),
            (0x17, 0x01, 0x0100, 2),
            (0x17, 0x01, 0x0300, 4),
            (0x17, 0x08, 0, 1),
            (0x17, 0x11, 0, 1),
            (0x17, 0x18, 0, 1),
            (0x17, 0x20, 0, 1),
            (0x17, 0x31, 0, 2),
            (0x17, 0x60, 0, 1),
            (0x17, 0x68, 0, 1),
            (0x17, 0x71, 0, 1),
            (0x19, 0x01, 0, 2),
            (0x19, 0x21, 0, 1),
            (0x19, 0x50, 0, 1),
            (0x17, 0x90, 0, 1),
        ];

        let mut generations = Vec::new();
        for (family, model, leaf, nodes) in configs {
            let identity = CpuIdentity::new(family, model, "AMD Ryzen 7 PRO 4750U", leaf);
            let smn = FakeSmn::new();
            for node in 0..nodes {
                smn.set(node, REPORTED_TEMP_CTRL, 400 << 21);
                for slot in (0..MAX_CCD_SLOTS).step_by(2) {
                    smn.set(node, ccd_temp_address(slot), 0x0AF4);
                }
            }
            let smn = Arc::new(smn);

            for node in 0..nodes {
                let dev = device(&smn, &identity, (leaf, nodes), node, DeviceOptions::default())
                    .unwrap();
                let generation = dev.profile().generation;
                if !generations.contains(&generation) {
                    generations.push(generation);
                }

                for channel in dev.list_channels() {
                    let result = dev.read_channel(channel.kind, channel.index);
                    if channel.visible {
                        assert!(
                            result.is_ok(),
                            "{:?} node {} {}: {:?}",
                            generation,
                            node,
                            channel.label,
                            result
                        );
                    } else {
                        assert!(result.unwrap_err().is_not_supported());
                    }
                }

                for kind in [
                    SensorKind::Temperature,
                    SensorKind::Voltage,
                    SensorKind::Current,
                    SensorKind::Power,
                ] {
                    let count = dev.list_channels().iter().filter(|c| c.kind == kind).count();
                    assert!(dev.read_channel(kind, count).unwrap_err().is_not_supported());
                }
            }
        }

        assert_eq!(generations.len(), 13);
    }

    #[test]
    fn test_invisible_channels_not_supported() {
        let smn = Arc::new(FakeSmn::new().with(0, ccd_temp_address(0), 0x0AF4));
        let dev = device(&smn, &matisse(), (0, 1), 0, DeviceOptions::default()).unwrap();

        let err = dev.read_channel(SensorKind::Temperature, 3).unwrap_err();
        assert!(err.is_not_supported());
        let err = dev.read_channel(SensorKind::Voltage, 2).unwrap_err();
        assert!(err.is_not_supported());
        assert!(dev.channel(SensorKind::Voltage, 2).is_none());
    }

    #[test]
    fn test_dali_hides_currents() {
        let identity = CpuIdentity::new(0x17, 0x20, "AMD Athlon Silver 3050U", 0);
        let smn = Arc::new(FakeSmn::new());
        let dev = device(&smn, &identity, (0, 1), 0, DeviceOptions::default()).unwrap();

        assert!(dev.read_channel(SensorKind::Voltage, 0).is_ok());
        assert!(dev.read_channel(SensorKind::Current, 0).unwrap_err().is_not_supported());
        assert!(dev.read_channel(SensorKind::Power, 1).unwrap_err().is_not_supported());
        assert_eq!(dev.visible_channels().count(), 4);
    }

    #[test]
    fn test_threadripper_split_planes() {
        let identity = CpuIdentity::new(0x17, 0x01, "AMD Ryzen Threadripper 1950X", 0x0100);
        let smn = Arc::new(FakeSmn::new().with(1, REPORTED_TEMP_CTRL, 560 << 21));

        let first = device(&smn, &identity, (0x0100, 2), 0, DeviceOptions::default()).unwrap();
        assert!(first.read_channel(SensorKind::Voltage, 0).is_ok());
        assert!(first.read_channel(SensorKind::Voltage, 1).is_err());

        let second = device(&smn, &identity, (0x0100, 2), 1, DeviceOptions::default()).unwrap();
        assert!(second.read_channel(SensorKind::Voltage, 0).is_err());
        assert!(second.read_channel(SensorKind::Voltage, 1).is_ok());

        // 70 °C Tctl minus the 27 °C Threadripper offset
        assert_eq!(second.tctl_offset(), 27_000);
        assert_eq!(second.read_channel(SensorKind::Temperature, 0).unwrap(), 43_000);
        assert_eq!(second.read_channel(SensorKind::Temperature, 1).unwrap(), 70_000);
    }

    #[test]
    fn test_multi_package_labels() {
        let identity = CpuIdentity::new(0x17, 0x31, "AMD EPYC 7742 64-Core Processor", 0);
        let smn = Arc::new(FakeSmn::new());
        let dev = device(&smn, &identity, (0, 2), 1, DeviceOptions::default()).unwrap();
        let tdie = dev.channel(SensorKind::Temperature, 0).unwrap();
        assert_eq!(tdie.label, "cpu1_Tdie");
    }

    #[test]
    fn test_probe_failure_aborts_init() {
        let smn = Arc::new(FakeSmn::new());
        smn.fail(ccd_temp_address(0));
        assert!(device(&smn, &matisse(), (0, 1), 0, DeviceOptions::default()).is_err());
    }

    #[test]
    fn test_read_failure_is_per_request() {
        let smn = Arc::new(
            FakeSmn::new()
                .with(0, ccd_temp_address(0), 0x0AF4)
                .with(0, MATISSE_CORE, 0x0030_0010),
        );
        let dev = device(&smn, &matisse(), (0, 1), 0, DeviceOptions::default()).unwrap();
        let before: Vec<bool> = dev.list_channels().iter().map(|c| c.visible).collect();

        smn.fail(MATISSE_CORE);
        assert!(matches!(
            dev.read_channel(SensorKind::Voltage, 0),
            Err(ZenmonError::SmnError(_))
        ));
        assert!(dev.read_channel(SensorKind::Temperature, 0).is_ok());

        smn.heal(MATISSE_CORE);
        assert_eq!(dev.read_channel(SensorKind::Voltage, 0).unwrap(), 1250);

        let after: Vec<bool> = dev.list_channels().iter().map(|c| c.visible).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_ccd_reading_zero_after_probe() {
        let smn = Arc::new(FakeSmn::new().with(0, ccd_temp_address(0), 0x0AF4));
        let dev = device(&smn, &matisse(), (0, 1), 0, DeviceOptions::default()).unwrap();

        smn.set(0, ccd_temp_address(0), 0);
        assert!(matches!(
            dev.read_channel(SensorKind::Temperature, 2),
            Err(ZenmonError::ComponentAbsent(_))
        ));
        assert!(dev.channel(SensorKind::Temperature, 2).unwrap().visible);
    }

    #[test]
    fn test_tdie_modes() {
        let identity = CpuIdentity::new(0x17, 0x01, "AMD Ryzen 7 1800X Eight-Core Processor", 0);
        // 15 °C Tctl, below the 20 °C offset
        let smn = Arc::new(FakeSmn::new().with(0, REPORTED_TEMP_CTRL, 120 << 21));

        let clamped = device(&smn, &identity, (0, 1), 0, DeviceOptions::default()).unwrap();
        assert_eq!(clamped.read_channel(SensorKind::Temperature, 0).unwrap(), 0);

        let options = DeviceOptions {
            tdie_mode: TdieMode::Signed,
            swap_planes: false,
        };
        let signed = device(&smn, &identity, (0, 1), 0, options).unwrap();
        assert_eq!(signed.read_channel(SensorKind::Temperature, 0).unwrap(), -5_000);
    }

    #[test]
    fn test_swap_planes() {
        let smn = Arc::new(
            FakeSmn::new()
                .with(0, MATISSE_CORE, 0x0030_0000)
                .with(0, MATISSE_SOC, 0x0050_0000),
        );
        let options = DeviceOptions {
            tdie_mode: TdieMode::Clamped,
            swap_planes: true,
        };
        let dev = device(&smn, &matisse(), (0, 1), 0, options).unwrap();
        assert_eq!(dev.read_channel(SensorKind::Voltage, 0).unwrap(), 1050);
        assert_eq!(dev.read_channel(SensorKind::Voltage, 1).unwrap(), 1250);
    }

    #[test]
    fn test_debug_dump() {
        let smn = Arc::new(FakeSmn::new().with(0, REPORTED_TEMP_CTRL, 0x1234_5678));
        smn.fail(SVI_BASE + 0x8);
        let dev = device(&smn, &matisse(), (0, 1), 0, DeviceOptions::default()).unwrap();

        let dump = dev.dump_debug_registers();
        assert_eq!(dump.transport, "node");
        assert_eq!(dump.registers.len(), DEBUG_ADDRESSES.len());
        assert_eq!(dump.registers[0].value, None);

        let text = dump.to_string();
        assert!(text.contains("NODE_ID = 0"));
        assert!(text.contains("SMN_0x0005A008 = <read failed>"));
    }
}
