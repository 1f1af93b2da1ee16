// Tctl -> Tdie calibration offsets
//
// Some early parts report Tctl with a fixed offset above the die
// temperature. The offset is looked up by substring of the brand string,
// first match wins. Similar brand strings can match the wrong entry; the
// table order is what decides.

use crate::common::arch::FAMILY_17H;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TctlOffset {
    pub family: u32,
    pub model_name: &'static str,
    pub offset_millic: i32,
}

pub const TCTL_OFFSETS: [TctlOffset; 6] = [
    TctlOffset {
        family: FAMILY_17H,
        model_name: "AMD Ryzen 5 1600X",
        offset_millic: 20_000,
    },
    TctlOffset {
        family: FAMILY_17H,
        model_name: "AMD Ryzen 7 1700X",
        offset_millic: 20_000,
    },
    TctlOffset {
        family: FAMILY_17H,
        model_name: "AMD Ryzen 7 1800X",
        offset_millic: 20_000,
    },
    TctlOffset {
        family: FAMILY_17H,
        model_name: "AMD Ryzen 7 2700X",
        offset_millic: 10_000,
    },
    // 19{00,20,50}X
    TctlOffset {
        family: FAMILY_17H,
        model_name: "AMD Ryzen Threadripper 19",
        offset_millic: 27_000,
    },
    // 29{20,50,70,90}[W]X
    TctlOffset {
        family: FAMILY_17H,
        model_name: "AMD Ryzen Threadripper 29",
        offset_millic: 27_000,
    },
];

pub fn lookup(table: &[TctlOffset], family: u32, model_name: &str) -> i32 {
    table
        .iter()
        .find(|entry| entry.family == family && model_name.contains(entry.model_name))
        .map(|entry| entry.offset_millic)
        .unwrap_or(0)
}

/// Calibration offset in millidegrees for a processor, 0 if none applies
pub fn tctl_offset(family: u32, model_name: &str) -> i32 {
    let offset = lookup(&TCTL_OFFSETS, family, model_name);
    if offset != 0 {
        tracing::info!("Tctl offset for '{}': {} m°C", model_name, offset);
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_offsets() {
        assert_eq!(tctl_offset(0x17, "AMD Ryzen 7 1800X Eight-Core Processor"), 20_000);
        assert_eq!(tctl_offset(0x17, "AMD Ryzen 7 2700X Eight-Core Processor"), 10_000);
        assert_eq!(
            tctl_offset(0x17, "AMD Ryzen Threadripper 2990WX 32-Core Processor"),
            27_000
        );
    }

    #[test]
    fn test_no_match_defaults_to_zero() {
        assert_eq!(tctl_offset(0x17, "AMD Ryzen 7 1700 Eight-Core Processor"), 0);
        assert_eq!(tctl_offset(0x17, "AMD Ryzen 9 3900X 12-Core Processor"), 0);
        assert_eq!(tctl_offset(0x17, ""), 0);
    }

    #[test]
    fn test_family_must_match() {
        assert_eq!(tctl_offset(0x19, "AMD Ryzen 7 1800X Eight-Core Processor"), 0);
    }

    #[test]
    fn test_first_match_wins() {
        let table = [
            TctlOffset {
                family: 0x17,
                model_name: "Ryzen 7",
                offset_millic: 1_000,
            },
            TctlOffset {
                family: 0x17,
                model_name: "Ryzen 7 1800X",
                offset_millic: 2_000,
            },
        ];
        assert_eq!(lookup(&table, 0x17, "AMD Ryzen 7 1800X"), 1_000);
    }
}
