//! THM (thermal) register definitions
//!
//! Tctl is the control temperature reported to the fan/boost logic. Some
//! parts report Tctl with a fixed offset above the real die temperature;
//! subtracting that offset yields Tdie. Zen 2 and later expose an extra
//! temperature register per CCD.

use crate::register::RegisterLayout;

/// Reported temperature control register (Tctl)
pub const REPORTED_TEMP_CTRL: u32 = 0x0005_9800;

/// Range-adjust flag: Tctl is reported on a -49 °C shifted scale
pub const TEMP_ADJUST_MASK: u32 = 0x8_0000;

/// Shift applied when the range-adjust flag is set
pub const TEMP_ADJUST_MILLIC: i32 = 49_000;

/// Temperature resolution of both sensor kinds (0.125 °C)
pub const TEMP_STEP_MILLIC: i32 = 125;

/// First CCD temperature register; slot `n` is at `CCD_TEMP_BASE + 4 * n`
pub const CCD_TEMP_BASE: u32 = 0x0005_9954;

/// Zero point of the CCD temperature scale
pub const CCD_TEMP_OFFSET_MILLIC: i32 = 305_000;

/// Number of CCD temperature slots the register block can hold
pub const MAX_CCD_SLOTS: usize = 8;

/// Fixed Tdie ceiling exported for threshold display
pub const TDIE_MAX_MILLIC: i32 = 70_000;

pub const fn ccd_temp_address(slot: usize) -> u32 {
    CCD_TEMP_BASE + (slot as u32) * 4
}

/// Reported temperature control register layout
///
/// ## Register Format
///
/// | Bits   | Field        | Description                            |
/// |--------|--------------|----------------------------------------|
/// | 0-18   | reserved     |                                        |
/// | 19     | range_adjust | Reading is shifted down by 49 °C       |
/// | 20     | reserved     |                                        |
/// | 21-31  | current_temp | Tctl in 0.125 °C steps                 |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportedTempControl {
    pub current_temp: u16,
    pub range_adjust: bool,
}

impl RegisterLayout for ReportedTempControl {
    fn to_smn_value(&self) -> u32 {
        ((self.current_temp as u32 & 0x7FF) << 21)
            | (if self.range_adjust { TEMP_ADJUST_MASK } else { 0 })
    }

    fn from_smn_value(value: u32) -> Self {
        Self {
            current_temp: (value >> 21) as u16,
            range_adjust: (value & TEMP_ADJUST_MASK) != 0,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.current_temp > 0x7FF {
            return Err("Current temperature must be <= 0x7FF (11 bits)");
        }
        Ok(())
    }
}

impl ReportedTempControl {
    /// Tctl in millidegrees Celsius
    pub fn control_temp_millic(&self) -> i32 {
        let temp = self.current_temp as i32 * TEMP_STEP_MILLIC;
        if self.range_adjust {
            temp - TEMP_ADJUST_MILLIC
        } else {
            temp
        }
    }
}

/// CCD temperature register layout
///
/// ## Register Format
///
/// | Bits   | Field    | Description                                |
/// |--------|----------|--------------------------------------------|
/// | 0-11   | reading  | (T + 305 °C) in 0.125 °C steps, 0 = absent |
/// | 12-31  | reserved |                                            |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CcdTemperature {
    pub reading: u16,
}

impl RegisterLayout for CcdTemperature {
    fn to_smn_value(&self) -> u32 {
        self.reading as u32 & 0xFFF
    }

    fn from_smn_value(value: u32) -> Self {
        Self {
            reading: (value & 0xFFF) as u16,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        if self.reading > 0xFFF {
            return Err("CCD reading must be <= 0xFFF (12 bits)");
        }
        Ok(())
    }
}

impl CcdTemperature {
    /// An unpopulated CCD slot reads back as zero
    pub fn is_present(&self) -> bool {
        self.reading != 0
    }

    /// CCD temperature in millidegrees Celsius
    ///
    /// Meaningless when [`is_present`](Self::is_present) is false.
    pub fn temp_millic(&self) -> i32 {
        self.reading as i32 * TEMP_STEP_MILLIC - CCD_TEMP_OFFSET_MILLIC
    }
}

/// How Tdie is derived from Tctl and the calibration offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TdieMode {
    /// Floor at 0 when the offset exceeds Tctl (unsigned hwmon encoding)
    #[default]
    Clamped,
    /// Plain difference, may go negative
    Signed,
}

impl TdieMode {
    pub fn name(&self) -> &'static str {
        match self {
            TdieMode::Clamped => "clamped",
            TdieMode::Signed => "signed",
        }
    }

    pub fn apply(self, tctl_millic: i32, offset_millic: i32) -> i32 {
        match self {
            TdieMode::Clamped if tctl_millic <= offset_millic => 0,
            _ => tctl_millic - offset_millic,
        }
    }
}

pub fn control_temp_millic(raw: u32) -> i32 {
    ReportedTempControl::from_smn_value(raw).control_temp_millic()
}

pub fn die_component_temp_millic(raw: u32) -> i32 {
    CcdTemperature::from_smn_value(raw).temp_millic()
}

pub fn tdie_millic(tctl_millic: i32, offset_millic: i32, mode: TdieMode) -> i32 {
    mode.apply(tctl_millic, offset_millic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_temp() {
        let raw = 600 << 21;
        assert_eq!(control_temp_millic(raw), 75_000);
        assert_eq!(control_temp_millic(raw | TEMP_ADJUST_MASK), 26_000);
        // Low bits are ignored
        assert_eq!(control_temp_millic(raw | 0x7FFFF), 75_000);
    }

    #[test]
    fn test_control_temp_adjust_below_zero() {
        // 40 °C on the shifted scale is -9 °C
        let raw = (320 << 21) | TEMP_ADJUST_MASK;
        assert_eq!(control_temp_millic(raw), -9_000);
    }

    #[test]
    fn test_ccd_temp() {
        assert_eq!(die_component_temp_millic(2500), 7_500);
        // 45.5 °C
        assert_eq!(die_component_temp_millic(0x0AF4), 45_500);
        assert!(die_component_temp_millic(0) <= 0);
        assert!(!CcdTemperature::from_smn_value(0xFFFF_F000).is_present());
        assert!(CcdTemperature::from_smn_value(1).is_present());
    }

    #[test]
    fn test_ccd_addresses() {
        assert_eq!(ccd_temp_address(0), 0x0005_9954);
        assert_eq!(ccd_temp_address(1), 0x0005_9958);
        assert_eq!(ccd_temp_address(MAX_CCD_SLOTS - 1), 0x0005_9970);
    }

    #[test]
    fn test_tdie_modes() {
        assert_eq!(tdie_millic(75_000, 20_000, TdieMode::Clamped), 55_000);
        assert_eq!(tdie_millic(75_000, 20_000, TdieMode::Signed), 55_000);
        assert_eq!(tdie_millic(15_000, 20_000, TdieMode::Clamped), 0);
        assert_eq!(tdie_millic(15_000, 20_000, TdieMode::Signed), -5_000);
        assert_eq!(tdie_millic(20_000, 20_000, TdieMode::Clamped), 0);
        assert_eq!(tdie_millic(30_000, 0, TdieMode::Clamped), 30_000);
    }

    #[test]
    fn test_temp_control_validate() {
        let ok = ReportedTempControl {
            current_temp: 0x7FF,
            range_adjust: true,
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ReportedTempControl::from_smn_value(ok.to_smn_value()), ok);

        let too_wide = ReportedTempControl {
            current_temp: 0x800,
            range_adjust: false,
        };
        assert!(too_wide.validate().is_err());
    }
}
