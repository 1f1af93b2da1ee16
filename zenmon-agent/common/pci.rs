use parking_lot::Mutex;
use std::fs::{self, File};
use std::path::Path;

use zenmon_raw::current_arch::smn::pci::{self as ids, AMD_VENDOR_ID, DF_DEVICE_BASE, DF_MAX_NODES};
use zenmon_raw::{open_config_space, read_dword, write_dword, PciLocation};

use crate::error::Result;

/// Default location of the sysfs PCI device directory
pub const SYSFS_PCI_DEVICES: &str = "/sys/bus/pci/devices";

/// Function number of the Data Fabric miscellaneous control function
const DF_MISC_FUNCTION: u8 = 3;

/// An open configuration-space file for one PCI function
pub struct PciHandle {
    file: Mutex<File>,
    location: PciLocation,
}

impl PciHandle {
    pub fn open(location: PciLocation) -> Result<Self> {
        let file = open_config_space(location)?;

        tracing::info!("Opened PCI config space of {}", location);

        Ok(Self {
            file: Mutex::new(file),
            location,
        })
    }

    pub fn location(&self) -> PciLocation {
        self.location
    }

    /// Write `index` to an index register and read the paired data register
    ///
    /// The handle stays locked across both accesses so that no other reader
    /// of this function can move the index in between.
    pub fn read_indexed(&self, index_offset: u32, data_offset: u32, index: u32) -> Result<u32> {
        let mut file = self.file.lock();
        write_dword(&mut *file, self.location, index_offset, index)?;
        Ok(read_dword(&mut *file, self.location, data_offset)?)
    }
}

/// Vendor and device ID of a function found under sysfs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciDeviceInfo {
    pub location: PciLocation,
    pub vendor: u16,
    pub device: u16,
}

fn parse_hex_id(s: &str) -> Option<u16> {
    let s = s.trim();
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u16::from_str_radix(digits, 16).ok()
}

/// List every PCI function under a sysfs devices directory
///
/// Entries whose name or ID files cannot be parsed are skipped.
pub fn scan_devices(root: &Path) -> Result<Vec<PciDeviceInfo>> {
    let mut devices = Vec::new();

    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(location) = name.to_str().and_then(|n| n.parse::<PciLocation>().ok()) else {
            continue;
        };

        let path = entry.path();
        let vendor = fs::read_to_string(path.join("vendor"))
            .ok()
            .and_then(|s| parse_hex_id(&s));
        let device = fs::read_to_string(path.join("device"))
            .ok()
            .and_then(|s| parse_hex_id(&s));

        if let (Some(vendor), Some(device)) = (vendor, device) {
            devices.push(PciDeviceInfo {
                location,
                vendor,
                device,
            });
        }
    }

    devices.sort_by_key(|d| d.location);
    Ok(devices)
}

/// Host bridges of AMD root complexes, one per node, in segment/bus order
pub fn find_root_complexes(root: &Path) -> Result<Vec<PciLocation>> {
    let roots = scan_devices(root)?
        .into_iter()
        .filter(|d| {
            d.vendor == AMD_VENDOR_ID
                && d.location.device == 0
                && d.location.function == 0
                && ids::is_root(d.device)
        })
        .map(|d| d.location)
        .collect();

    Ok(roots)
}

/// Data Fabric miscellaneous functions, one per node, in node order
pub fn find_df_nodes(root: &Path) -> Result<Vec<PciLocation>> {
    let nodes = scan_devices(root)?
        .into_iter()
        .filter(|d| {
            d.vendor == AMD_VENDOR_ID
                && d.location.segment == 0
                && d.location.bus == 0
                && (DF_DEVICE_BASE..DF_DEVICE_BASE + DF_MAX_NODES).contains(&d.location.device)
                && d.location.function == DF_MISC_FUNCTION
                && ids::is_df_f3(d.device)
        })
        .map(|d| d.location)
        .collect();

    Ok(nodes)
}
