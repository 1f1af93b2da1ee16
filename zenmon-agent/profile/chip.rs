// Chip profile resolution: which registers exist on a node and how to decode them

use zenmon_raw::current_arch::svi::{FormulaVariant, Plane};

use crate::common::arch::ZenGeneration;
use crate::profile::topology::Topology;

/// Register addresses and decoding parameters for one node
///
/// A plane address is `None` when the node does not own that plane; SMN
/// address 0 is valid, so absence is never encoded as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipProfile {
    pub family: u32,
    pub model: u32,
    pub generation: ZenGeneration,
    pub core_plane_address: Option<u32>,
    pub soc_plane_address: Option<u32>,
    pub formula_variant: FormulaVariant,
    pub ccd_probe_count: usize,
    pub currents_meaningful: bool,
}

impl ChipProfile {
    pub fn plane_address(&self, plane: Plane) -> Option<u32> {
        match plane {
            Plane::Core => self.core_plane_address,
            Plane::Soc => self.soc_plane_address,
        }
    }

    /// Exchange core and SoC plane addresses, for boards that wire them
    /// the other way round
    pub fn with_swapped_planes(mut self) -> Self {
        std::mem::swap(&mut self.core_plane_address, &mut self.soc_plane_address);
        self
    }
}

/// Resolve the profile of a node
///
/// Unknown family/model pairs get the first-generation layout with
/// currents enabled and no CCD probing.
pub fn resolve_profile(family: u32, model: u32, topology: &Topology) -> ChipProfile {
    let generation = ZenGeneration::from_family_model(family, model);
    if generation == ZenGeneration::Unknown {
        tracing::warn!(
            "Unknown CPU family {:X}h model {:X}h, using generic SVI layout",
            family,
            model
        );
    }

    let layout = generation.plane_layout();

    // On multi-die Zen/Zen+ packages the first die reports the core plane
    // and the second the SoC plane; the rest report neither.
    let (core_plane_address, soc_plane_address) =
        if generation.splits_planes_across_nodes() && topology.is_multi_node() {
            match topology.node_within_package {
                0 => (Some(layout.core), None),
                1 => (None, Some(layout.soc)),
                _ => (None, None),
            }
        } else {
            (Some(layout.core), Some(layout.soc))
        };

    let profile = ChipProfile {
        family,
        model,
        generation,
        core_plane_address,
        soc_plane_address,
        formula_variant: generation.formula_variant(),
        ccd_probe_count: generation.ccd_slots(),
        currents_meaningful: generation.currents_meaningful(),
    };

    tracing::debug!("Resolved profile for node {}: {:?}", topology.node_id, profile);

    profile
}
