//! SMN (System Management Network) access definitions
//!
//! SMN registers are not memory mapped. They are reached by writing the SMN
//! address to an index register in the host bridge configuration space and
//! reading the value back from the adjacent data register.

use super::{svi, thm};

/// Host bridge configuration offset of the SMN index register
pub const SMN_INDEX_OFFSET: u32 = 0x60;

/// Host bridge configuration offset of the SMN data register
pub const SMN_DATA_OFFSET: u32 = 0x64;

/// PCI identifiers used to locate nodes and their host bridges
pub mod pci {
    /// AMD PCI vendor ID
    pub const AMD_VENDOR_ID: u16 = 0x1022;

    /// First PCI device number of the Data Fabric functions on bus 0
    ///
    /// Node `n` exposes its Data Fabric at device `0x18 + n`.
    pub const DF_DEVICE_BASE: u8 = 0x18;

    /// Maximum number of Data Fabric nodes visible on bus 0
    pub const DF_MAX_NODES: u8 = 8;

    /// Data Fabric function 3 (miscellaneous control) device IDs
    pub const DF_F3_DEVICE_IDS: [u16; 7] = [
        0x1463, // 17h Models 00h-0Fh
        0x15EB, // 17h Models 10h-1Fh
        0x1493, // 17h Models 30h-3Fh
        0x144B, // 17h Models 60h-6Fh
        0x1443, // 17h Models 70h-7Fh
        0x1653, // 19h Models 00h-0Fh
        0x166D, // 19h Models 50h-5Fh
    ];

    /// Root complex (host bridge, function 00.0) device IDs
    pub const ROOT_DEVICE_IDS: [u16; 4] = [
        0x1450, // 17h Models 00h-0Fh
        0x15D0, // 17h Models 10h-1Fh
        0x1480, // 17h Models 30h-3Fh/70h-7Fh, 19h Models 00h-2Fh
        0x1630, // 17h Models 60h-6Fh, 19h Models 50h-5Fh
    ];

    pub fn is_df_f3(device_id: u16) -> bool {
        DF_F3_DEVICE_IDS.contains(&device_id)
    }

    pub fn is_root(device_id: u16) -> bool {
        ROOT_DEVICE_IDS.contains(&device_id)
    }
}

/// Registers included in the diagnostic dump, in output order
pub const DEBUG_ADDRESSES: [u32; 11] = [
    svi::SVI_BASE + 0x8,
    svi::SVI_BASE + 0xC,
    svi::SVI_BASE + 0x10,
    svi::SVI_BASE + 0x14,
    0x0005_98BC,
    0x0005_994C,
    thm::ccd_temp_address(0),
    thm::ccd_temp_address(1),
    0x0005_995C,
    svi::SVI_BASE_APU + 0x38,
    svi::SVI_BASE_APU + 0x3C,
];
