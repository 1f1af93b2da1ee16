// Sensor channel catalog and labels

use serde::Serialize;
use zenmon_raw::current_arch::svi::Plane;
use zenmon_raw::current_arch::thm;

use crate::metric_enum;
use crate::profile::{ChipProfile, Topology, TopologyContext};
use crate::sensors::probe::CcdPresence;

metric_enum! {
    #[derive(Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SensorKind {
        Temperature => "temp",
        Voltage => "in",
        Current => "curr",
        Power => "power",
    }
}

impl SensorKind {
    /// Prometheus metric name for readings of this kind
    pub fn metric_name(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "zen_temperature_millidegrees",
            SensorKind::Voltage => "zen_voltage_millivolts",
            SensorKind::Current => "zen_current_milliamps",
            SensorKind::Power => "zen_power_microwatts",
        }
    }
}

/// Register and formula behind a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSource {
    /// Tctl minus the calibration offset
    Tdie,
    Tctl,
    Ccd { slot: usize },
    Voltage(Plane),
    Current(Plane),
    Power(Plane),
}

impl ChannelSource {
    pub fn kind(&self) -> SensorKind {
        match self {
            ChannelSource::Tdie | ChannelSource::Tctl | ChannelSource::Ccd { .. } => {
                SensorKind::Temperature
            }
            ChannelSource::Voltage(_) => SensorKind::Voltage,
            ChannelSource::Current(_) => SensorKind::Current,
            ChannelSource::Power(_) => SensorKind::Power,
        }
    }

    /// Label without any package prefix
    pub fn base_label(&self) -> String {
        match self {
            ChannelSource::Tdie => "Tdie".to_string(),
            ChannelSource::Tctl => "Tctl".to_string(),
            ChannelSource::Ccd { slot } => format!("Tccd{}", slot + 1),
            ChannelSource::Voltage(plane) => format!("SVI2_{}", plane.name()),
            ChannelSource::Current(plane) => format!("SVI2_C_{}", plane.name()),
            ChannelSource::Power(plane) => format!("SVI2_P_{}", plane.name()),
        }
    }
}

/// One exposed measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorChannel {
    pub kind: SensorKind,
    /// Zero-based position within `kind`
    pub index: usize,
    pub label: String,
    pub visible: bool,
    #[serde(skip)]
    pub source: ChannelSource,
    /// SMN register the value is read from; `None` when the node lacks it
    #[serde(skip)]
    pub address: Option<u32>,
}

/// Build the frozen channel list of a node
///
/// Order: temperatures (Tdie, Tctl, Tccd1..), voltages, currents, powers;
/// core before SoC within each SVI kind.
pub fn build_catalog(
    profile: &ChipProfile,
    ccd: &CcdPresence,
    topology: &Topology,
    context: &TopologyContext,
) -> Vec<SensorChannel> {
    let mut sources: Vec<(ChannelSource, Option<u32>, bool)> = vec![
        (ChannelSource::Tdie, Some(thm::REPORTED_TEMP_CTRL), true),
        (ChannelSource::Tctl, Some(thm::REPORTED_TEMP_CTRL), true),
    ];

    for slot in 0..profile.ccd_probe_count {
        sources.push((
            ChannelSource::Ccd { slot },
            Some(thm::ccd_temp_address(slot)),
            ccd.is_present(slot),
        ));
    }

    let planes = [Plane::Core, Plane::Soc];
    for plane in planes {
        let address = profile.plane_address(plane);
        sources.push((ChannelSource::Voltage(plane), address, address.is_some()));
    }
    for plane in planes {
        let address = profile.plane_address(plane);
        let visible = profile.currents_meaningful && address.is_some();
        sources.push((ChannelSource::Current(plane), address, visible));
    }
    for plane in planes {
        let address = profile.plane_address(plane);
        let visible = profile.currents_meaningful && address.is_some();
        sources.push((ChannelSource::Power(plane), address, visible));
    }

    let mut next_index = [0usize; 4];
    sources
        .into_iter()
        .map(|(source, address, visible)| {
            let kind = source.kind();
            let slot = &mut next_index[kind as usize];
            let index = *slot;
            *slot += 1;

            SensorChannel {
                kind,
                index,
                label: context.label(topology, &source.base_label()),
                visible,
                source,
                address,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::resolve_profile;
    use crate::testing::FakeSmn;

    fn catalog(
        family: u32,
        model: u32,
        ccd_raw: &[u32],
        leaf: u32,
        nodes: u32,
        node: u32,
    ) -> Vec<SensorChannel> {
        let context = TopologyContext::new(leaf, nodes).unwrap();
        let topology = context.resolve(node).unwrap();
        let profile = resolve_profile(family, model, &topology);
        let smn = FakeSmn::new();
        for (slot, &raw) in ccd_raw.iter().enumerate() {
            smn.set(node, thm::ccd_temp_address(slot), raw);
        }
        let ccd = CcdPresence::probe(&smn, node, profile.ccd_probe_count).unwrap();
        build_catalog(&profile, &ccd, &topology, &context)
    }

    fn find(channels: &[SensorChannel], kind: SensorKind, index: usize) -> &SensorChannel {
        channels
            .iter()
            .find(|c| c.kind == kind && c.index == index)
            .unwrap()
    }

    #[test]
    fn test_matisse_catalog() {
        let channels = catalog(0x17, 0x71, &[0x0AF4, 0x0AF0], 0x0000, 1, 0);
        // 2 + 8 temperatures, 2 each of voltage/current/power
        assert_eq!(channels.len(), 16);

        let labels: Vec<&str> = channels.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(&labels[..4], &["Tdie", "Tctl", "Tccd1", "Tccd2"]);
        assert_eq!(
            &labels[10..],
            &["SVI2_Core", "SVI2_SoC", "SVI2_C_Core", "SVI2_C_SoC", "SVI2_P_Core", "SVI2_P_SoC"]
        );

        assert!(find(&channels, SensorKind::Temperature, 2).visible);
        assert!(find(&channels, SensorKind::Temperature, 3).visible);
        assert!(!find(&channels, SensorKind::Temperature, 4).visible);
        assert!(find(&channels, SensorKind::Power, 1).visible);
    }

    #[test]
    fn test_voltage_indices_start_at_zero() {
        let channels = catalog(0x17, 0x11, &[], 0x0000, 1, 0);
        let core = find(&channels, SensorKind::Voltage, 0);
        assert_eq!(core.source, ChannelSource::Voltage(Plane::Core));
        let soc = find(&channels, SensorKind::Voltage, 1);
        assert_eq!(soc.source, ChannelSource::Voltage(Plane::Soc));
        assert!(!channels.iter().any(|c| c.kind == SensorKind::Voltage && c.index > 1));
    }

    #[test]
    fn test_currents_hidden_without_telemetry() {
        let channels = catalog(0x17, 0x20, &[], 0x0000, 1, 0);
        assert!(find(&channels, SensorKind::Voltage, 0).visible);
        for kind in [SensorKind::Current, SensorKind::Power] {
            for index in 0..2 {
                assert!(!find(&channels, kind, index).visible);
            }
        }
    }

    #[test]
    fn test_split_plane_visibility() {
        // Node 1 of a Threadripper 1950X owns only the SoC plane
        let channels = catalog(0x17, 0x01, &[], 0x0100, 2, 1);
        assert!(!find(&channels, SensorKind::Voltage, 0).visible);
        assert!(find(&channels, SensorKind::Voltage, 1).visible);
        assert!(!find(&channels, SensorKind::Current, 0).visible);
        assert!(find(&channels, SensorKind::Power, 1).visible);
        assert_eq!(find(&channels, SensorKind::Voltage, 0).address, None);
    }

    #[test]
    fn test_multi_package_labels() {
        // Two EPYC 7001 packages with four nodes each; node 5 is in package 1
        let channels = catalog(0x17, 0x01, &[], 0x0300, 8, 5);
        assert_eq!(find(&channels, SensorKind::Temperature, 0).label, "cpu1_Tdie");
        assert_eq!(find(&channels, SensorKind::Temperature, 2).label, "cpu1_Tccd1");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SensorKind::Voltage.name(), "in");
        assert_eq!(SensorKind::all().len(), 4);
        assert_eq!(SensorKind::Power.metric_name(), "zen_power_microwatts");
    }
}
