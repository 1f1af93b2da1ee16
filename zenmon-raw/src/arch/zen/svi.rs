//! SVI2 (Serial VID Interface 2) telemetry register definitions
//!
//! The voltage regulator reports, per power plane, the VID it is currently
//! driving and a scaled output current. Two planes are reported: the core
//! plane (VDDCR_CPU) and the SoC plane (VDDCR_SOC).
//!
//! Both planes live in the same register block, but the block base and the
//! slot assigned to each plane differ between silicon revisions.

use crate::register::RegisterLayout;

/// SVI telemetry block on desktop/server parts and Raven-class APUs
pub const SVI_BASE: u32 = 0x0005_A000;

/// SVI telemetry block on Renoir-class and later APUs
pub const SVI_BASE_APU: u32 = 0x0006_F000;

/// Top of the VID scale in millivolts (VID 0)
pub const VID_TOP_MV: i32 = 1550;

/// VID step in hundredths of a millivolt (6.25 mV)
pub const VID_STEP_CENTI_MV: i32 = 625;

/// SMN addresses of the core and SoC telemetry planes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    pub core: u32,
    pub soc: u32,
}

impl PlaneLayout {
    pub const fn new(core: u32, soc: u32) -> Self {
        Self { core, soc }
    }

    /// Exchange the core and SoC addresses
    pub const fn swapped(self) -> Self {
        Self {
            core: self.soc,
            soc: self.core,
        }
    }
}

/// Plane layouts per silicon revision
pub mod layout {
    use super::{PlaneLayout, SVI_BASE, SVI_BASE_APU};

    /// 17h Models 01h/08h/11h/18h/20h, and the default for unknown models
    pub const F17H_M01H: PlaneLayout = PlaneLayout::new(SVI_BASE + 0xC, SVI_BASE + 0x10);

    /// 17h Model 31h (Castle Peak, Rome)
    pub const F17H_M31H: PlaneLayout = PlaneLayout::new(SVI_BASE + 0x14, SVI_BASE + 0x10);

    /// 17h Models 60h/68h (Renoir, Lucienne)
    pub const F17H_M60H: PlaneLayout = PlaneLayout::new(SVI_BASE_APU + 0x38, SVI_BASE_APU + 0x3C);

    /// 17h Model 71h (Matisse)
    pub const F17H_M71H: PlaneLayout = PlaneLayout::new(SVI_BASE + 0x10, SVI_BASE + 0xC);

    /// 19h Models 00h-01h (Milan, Chagall)
    pub const F19H_M01H: PlaneLayout = PlaneLayout::new(SVI_BASE + 0x10, SVI_BASE + 0x14);

    /// 19h Model 21h (Vermeer)
    pub const F19H_M21H: PlaneLayout = PlaneLayout::new(SVI_BASE + 0x10, SVI_BASE + 0xC);

    /// 19h Models 50h-5Fh (Cezanne)
    pub const F19H_M50H: PlaneLayout = PlaneLayout::new(SVI_BASE_APU + 0x38, SVI_BASE_APU + 0x3C);
}

/// Power plane reported by an SVI telemetry register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {
    Core,
    Soc,
}

impl Plane {
    pub fn name(&self) -> &'static str {
        match self {
            Plane::Core => "Core",
            Plane::Soc => "SoC",
        }
    }
}

/// Current coefficient set
///
/// Gen1 covers Zen/Zen+ parts, Gen2 covers Zen 2 and later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormulaVariant {
    #[default]
    Gen1,
    Gen2,
}

impl FormulaVariant {
    /// Core plane milliamps per IDD step, scaled by 1000
    pub const fn core_coefficient(self) -> u32 {
        match self {
            FormulaVariant::Gen1 => 1_039_211,
            FormulaVariant::Gen2 => 658_823,
        }
    }

    /// SoC plane milliamps per IDD step, scaled by 1000
    pub const fn soc_coefficient(self) -> u32 {
        match self {
            FormulaVariant::Gen1 => 360_772,
            FormulaVariant::Gen2 => 294_300,
        }
    }

    pub const fn coefficient(self, plane: Plane) -> u32 {
        match plane {
            Plane::Core => self.core_coefficient(),
            Plane::Soc => self.soc_coefficient(),
        }
    }
}

/// SVI telemetry plane register layout
///
/// ## Register Format
///
/// | Bits   | Field    | Description                          |
/// |--------|----------|--------------------------------------|
/// | 0-7    | idd      | Output current, coefficient-scaled   |
/// | 8-15   | reserved |                                      |
/// | 16-23  | vid      | Voltage identifier (6.25 mV steps)   |
/// | 24-31  | reserved |                                      |
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SviTelemetry {
    pub idd: u8,
    pub vid: u8,
}

impl RegisterLayout for SviTelemetry {
    fn to_smn_value(&self) -> u32 {
        (self.idd as u32) | ((self.vid as u32) << 16)
    }

    fn from_smn_value(value: u32) -> Self {
        Self {
            idd: (value & 0xFF) as u8,
            vid: ((value >> 16) & 0xFF) as u8,
        }
    }
}

impl SviTelemetry {
    /// Plane voltage in millivolts: `1550 - 6.25 * vid`, truncated
    ///
    /// VIDs above 248 fall below zero; they never occur on real boards but
    /// the result stays monotonic instead of wrapping.
    pub fn voltage_mv(&self) -> i32 {
        VID_TOP_MV - (VID_STEP_CENTI_MV * self.vid as i32) / 100
    }

    pub fn core_current_ma(&self, variant: FormulaVariant) -> u32 {
        self.current_ma(Plane::Core, variant)
    }

    pub fn soc_current_ma(&self, variant: FormulaVariant) -> u32 {
        self.current_ma(Plane::Soc, variant)
    }

    /// Plane current in milliamps
    pub fn current_ma(&self, plane: Plane, variant: FormulaVariant) -> u32 {
        (variant.coefficient(plane) * self.idd as u32) / 1000
    }

    /// Product of plane current (mA) and voltage (mV), i.e. microwatts
    ///
    /// This is an estimate from two independently quantized fields, not a
    /// calibrated power reading.
    pub fn power_uw(&self, plane: Plane, variant: FormulaVariant) -> i64 {
        self.current_ma(plane, variant) as i64 * self.voltage_mv() as i64
    }
}

pub fn voltage_mv(raw: u32) -> i32 {
    SviTelemetry::from_smn_value(raw).voltage_mv()
}

pub fn core_current_ma(raw: u32, variant: FormulaVariant) -> u32 {
    SviTelemetry::from_smn_value(raw).core_current_ma(variant)
}

pub fn soc_current_ma(raw: u32, variant: FormulaVariant) -> u32 {
    SviTelemetry::from_smn_value(raw).soc_current_ma(variant)
}

pub fn power_uw(raw: u32, variant: FormulaVariant, plane: Plane) -> i64 {
    SviTelemetry::from_smn_value(raw).power_uw(plane, variant)
}
