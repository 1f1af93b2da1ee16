//! PCI configuration-space read/write primitives
//!
//! This module provides low-level configuration-space access through
//! `/proc/bus/pci`. The SMN index/data window lives at offsets `0x60`/`0x64`
//! of each host bridge, which is beyond the first 64 bytes, so reads and
//! writes require root (CAP_SYS_ADMIN). For locked access use the
//! higher-level transports in zenmon-agent.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::str::FromStr;

pub type Result<T> = std::result::Result<T, PciError>;

/// Errors that can occur during configuration-space operations
#[derive(Debug, thiserror::Error)]
pub enum PciError {
    #[error("Failed to open PCI config space of {location}: {source}")]
    OpenFailed {
        location: PciLocation,
        source: std::io::Error,
    },

    #[error("Failed to read offset 0x{offset:02X} of {location}: {source}")]
    ReadFailed {
        location: PciLocation,
        offset: u32,
        source: std::io::Error,
    },

    #[error("Failed to write offset 0x{offset:02X} of {location}: {source}")]
    WriteFailed {
        location: PciLocation,
        offset: u32,
        source: std::io::Error,
    },

    #[error("Failed to seek to offset 0x{offset:02X} of {location}: {source}")]
    SeekFailed {
        location: PciLocation,
        offset: u32,
        source: std::io::Error,
    },

    #[error("Invalid PCI location '{0}'")]
    InvalidLocation(String),
}

/// Segment/bus/device/function of a PCI function
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PciLocation {
    pub segment: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl PciLocation {
    pub const fn new(segment: u16, bus: u8, device: u8, function: u8) -> Self {
        Self {
            segment,
            bus,
            device,
            function,
        }
    }

    /// Path of the configuration-space file under `/proc/bus/pci`
    ///
    /// Segment 0 devices live directly under the bus directory, others are
    /// prefixed with the segment number.
    pub fn proc_path(&self) -> PathBuf {
        let path = if self.segment > 0 {
            format!(
                "/proc/bus/pci/{:04x}:{:02x}/{:02x}.{}",
                self.segment, self.bus, self.device, self.function
            )
        } else {
            format!(
                "/proc/bus/pci/{:02x}/{:02x}.{}",
                self.bus, self.device, self.function
            )
        };
        PathBuf::from(path)
    }
}

impl fmt::Display for PciLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{}",
            self.segment, self.bus, self.device, self.function
        )
    }
}

/// Parses sysfs-style names such as `0000:00:18.3`
impl FromStr for PciLocation {
    type Err = PciError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PciError::InvalidLocation(s.to_string());

        let (rest, function) = s.rsplit_once('.').ok_or_else(invalid)?;
        let mut parts = rest.split(':');
        let segment = parts.next().ok_or_else(invalid)?;
        let bus = parts.next().ok_or_else(invalid)?;
        let device = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            segment: u16::from_str_radix(segment, 16).map_err(|_| invalid())?,
            bus: u8::from_str_radix(bus, 16).map_err(|_| invalid())?,
            device: u8::from_str_radix(device, 16).map_err(|_| invalid())?,
            function: function.parse().map_err(|_| invalid())?,
        })
    }
}

/// Open the configuration space of a function for reading and writing
///
/// Writes are synchronous so an index register update has reached the
/// device before the paired data register is read.
///
/// # Errors
///
/// Returns an error if the file does not exist or the caller lacks the
/// privileges for extended configuration space.
pub fn open_config_space(location: PciLocation) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_SYNC) // Ensure synchronous writes
        .open(location.proc_path())
        .map_err(|e| PciError::OpenFailed { location, source: e })
}

/// Read a 32-bit little-endian word at `offset`
///
/// # Example
///
/// ```ignore
/// use zenmon_raw::pci::{open_config_space, read_dword};
/// use zenmon_raw::PciLocation;
///
/// let location = PciLocation::new(0, 0, 0x18, 3);
/// let mut file = open_config_space(location)?;
/// let id = read_dword(&mut file, location, 0)?;
/// println!("vendor 0x{:04X}", id & 0xFFFF);
/// ```
pub fn read_dword<F: Read + Seek>(
    file: &mut F,
    location: PciLocation,
    offset: u32,
) -> Result<u32> {
    file.seek(SeekFrom::Start(offset as u64))
        .map_err(|e| PciError::SeekFailed {
            location,
            offset,
            source: e,
        })?;

    let mut buffer = [0u8; 4];
    file.read_exact(&mut buffer)
        .map_err(|e| PciError::ReadFailed {
            location,
            offset,
            source: e,
        })?;

    Ok(u32::from_le_bytes(buffer))
}

/// Write a 32-bit little-endian word at `offset`
///
/// Writing configuration space of a host bridge changes platform state.
/// The only register this workspace writes is the SMN index register.
pub fn write_dword<F: Write + Seek>(
    file: &mut F,
    location: PciLocation,
    offset: u32,
    value: u32,
) -> Result<()> {
    file.seek(SeekFrom::Start(offset as u64))
        .map_err(|e| PciError::SeekFailed {
            location,
            offset,
            source: e,
        })?;

    file.write_all(&value.to_le_bytes())
        .map_err(|e| PciError::WriteFailed {
            location,
            offset,
            source: e,
        })?;

    Ok(())
}
