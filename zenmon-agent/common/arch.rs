// CPU identity detection and Zen generation dispatch

use once_cell::sync::Lazy;
use serde::Serialize;
use zenmon_raw::current_arch::svi::{layout, FormulaVariant, PlaneLayout};

use crate::common::cpuid;

pub const FAMILY_17H: u32 = 0x17;
pub const FAMILY_19H: u32 = 0x19;

/// Identity of the running processor as reported by CPUID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuIdentity {
    pub vendor: String,
    pub family: u32,
    pub model: u32,
    pub stepping: u32,
    pub model_name: String,
    /// ECX of leaf 0x8000001E
    pub node_id_leaf: u32,
}

impl CpuIdentity {
    /// Build an identity from platform-supplied values
    pub fn new(family: u32, model: u32, model_name: impl Into<String>, node_id_leaf: u32) -> Self {
        Self {
            vendor: "AuthenticAMD".to_string(),
            family,
            model,
            stepping: 0,
            model_name: model_name.into(),
            node_id_leaf,
        }
    }

    pub fn is_amd(&self) -> bool {
        self.vendor == "AuthenticAMD"
    }

    pub fn is_zen(&self) -> bool {
        self.is_amd() && (self.family == FAMILY_17H || self.family == FAMILY_19H)
    }

    pub fn generation(&self) -> ZenGeneration {
        ZenGeneration::from_family_model(self.family, self.model)
    }
}

pub static CPU_IDENTITY: Lazy<CpuIdentity> = Lazy::new(detect_identity);

/// Split a leaf 1 EAX signature into display family, model and stepping
pub fn decode_signature(eax: u32) -> (u32, u32, u32) {
    let stepping = eax & 0xF;
    let model = (eax >> 4) & 0xF;
    let family = (eax >> 8) & 0xF;
    let extended_model = (eax >> 16) & 0xF;
    let extended_family = (eax >> 20) & 0xFF;

    let display_family = if family == 0xF {
        family + extended_family
    } else {
        family
    };

    let display_model = if family == 0x6 || family == 0xF {
        (extended_model << 4) + model
    } else {
        model
    };

    (display_family, display_model, stepping)
}

fn detect_identity() -> CpuIdentity {
    // CPUID leaf 1: Family, Model, Stepping
    let (eax, _ebx, _ecx, _edx) = cpuid::cpuid(1, 0);
    let (family, model, stepping) = decode_signature(eax);

    let identity = CpuIdentity {
        vendor: cpuid::vendor(),
        family,
        model,
        stepping,
        model_name: cpuid::brand_string(),
        node_id_leaf: cpuid::node_id_leaf(),
    };

    tracing::info!(
        "CPU: {} Family {:X}, Model {:X}, Stepping {:X} ({})",
        identity.vendor,
        family,
        model,
        stepping,
        identity.model_name
    );

    if !identity.is_zen() {
        tracing::warn!("Not an AMD family 17h/19h processor");
    }

    identity
}

/// Silicon revisions with known SVI telemetry placement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZenGeneration {
    Zen,
    ZenPlus,
    Raven,
    Picasso,
    Dali,
    Rome,
    Renoir,
    Lucienne,
    Matisse,
    Milan,
    Vermeer,
    Cezanne,
    Unknown,
}

impl ZenGeneration {
    pub fn from_family_model(family: u32, model: u32) -> Self {
        match (family, model) {
            (FAMILY_17H, 0x01) => ZenGeneration::Zen,
            (FAMILY_17H, 0x08) => ZenGeneration::ZenPlus,
            (FAMILY_17H, 0x11) => ZenGeneration::Raven,
            (FAMILY_17H, 0x18) => ZenGeneration::Picasso,
            (FAMILY_17H, 0x20) => ZenGeneration::Dali,
            (FAMILY_17H, 0x31) => ZenGeneration::Rome,
            (FAMILY_17H, 0x60) => ZenGeneration::Renoir,
            (FAMILY_17H, 0x68) => ZenGeneration::Lucienne,
            (FAMILY_17H, 0x71) => ZenGeneration::Matisse,
            (FAMILY_19H, 0x00..=0x01) => ZenGeneration::Milan,
            (FAMILY_19H, 0x21) => ZenGeneration::Vermeer,
            (FAMILY_19H, 0x50..=0x5F) => ZenGeneration::Cezanne,
            _ => ZenGeneration::Unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ZenGeneration::Zen => "Zen (Summit Ridge/Naples)",
            ZenGeneration::ZenPlus => "Zen+ (Pinnacle Ridge/Colfax)",
            ZenGeneration::Raven => "Raven Ridge",
            ZenGeneration::Picasso => "Picasso",
            ZenGeneration::Dali => "Dali",
            ZenGeneration::Rome => "Zen 2 (Rome/Castle Peak)",
            ZenGeneration::Renoir => "Renoir",
            ZenGeneration::Lucienne => "Lucienne",
            ZenGeneration::Matisse => "Zen 2 (Matisse)",
            ZenGeneration::Milan => "Zen 3 (Milan/Chagall)",
            ZenGeneration::Vermeer => "Zen 3 (Vermeer)",
            ZenGeneration::Cezanne => "Cezanne",
            ZenGeneration::Unknown => "Unknown",
        }
    }
}

// Generation-specific telemetry configuration
impl ZenGeneration {
    /// SMN addresses of the core and SoC SVI planes
    pub fn plane_layout(&self) -> PlaneLayout {
        match self {
            ZenGeneration::Zen
            | ZenGeneration::ZenPlus
            | ZenGeneration::Raven
            | ZenGeneration::Picasso
            | ZenGeneration::Dali
            | ZenGeneration::Unknown => layout::F17H_M01H,
            ZenGeneration::Rome => layout::F17H_M31H,
            ZenGeneration::Renoir | ZenGeneration::Lucienne => layout::F17H_M60H,
            ZenGeneration::Matisse => layout::F17H_M71H,
            ZenGeneration::Milan => layout::F19H_M01H,
            ZenGeneration::Vermeer => layout::F19H_M21H,
            ZenGeneration::Cezanne => layout::F19H_M50H,
        }
    }

    pub fn formula_variant(&self) -> FormulaVariant {
        match self {
            ZenGeneration::Zen
            | ZenGeneration::ZenPlus
            | ZenGeneration::Raven
            | ZenGeneration::Picasso
            | ZenGeneration::Dali
            | ZenGeneration::Unknown => FormulaVariant::Gen1,
            _ => FormulaVariant::Gen2,
        }
    }

    /// Whether the SVI current field carries meaningful data
    pub fn currents_meaningful(&self) -> bool {
        !matches!(self, ZenGeneration::Dali)
    }

    /// Number of CCD temperature slots worth probing
    pub fn ccd_slots(&self) -> usize {
        match self {
            ZenGeneration::Zen | ZenGeneration::ZenPlus => 4,
            ZenGeneration::Rome
            | ZenGeneration::Matisse
            | ZenGeneration::Milan
            | ZenGeneration::Vermeer => 8,
            _ => 0,
        }
    }

    /// Multi-die parts where each die reports only one of the two planes
    pub fn splits_planes_across_nodes(&self) -> bool {
        matches!(self, ZenGeneration::Zen | ZenGeneration::ZenPlus)
    }
}
