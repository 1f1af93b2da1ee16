// CCD presence probing, done once per device before channels are frozen

use zenmon_raw::current_arch::thm::{self, CcdTemperature, MAX_CCD_SLOTS};
use zenmon_raw::RegisterLayout;

use crate::common::smn::SmnTransport;
use crate::error::Result;

/// Which CCD temperature slots are populated on a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CcdPresence {
    slots: Vec<bool>,
}

impl CcdPresence {
    /// Read each of the first `count` slots in ascending order
    ///
    /// Any transport failure aborts the probe.
    pub fn probe(transport: &dyn SmnTransport, node: u32, count: usize) -> Result<Self> {
        if count > MAX_CCD_SLOTS {
            tracing::warn!(
                "Clamping CCD probe count {} to {} slots",
                count,
                MAX_CCD_SLOTS
            );
        }

        let mut slots = Vec::with_capacity(count.min(MAX_CCD_SLOTS));
        for slot in 0..count.min(MAX_CCD_SLOTS) {
            let raw = transport.read(node, thm::ccd_temp_address(slot))?;
            let present = CcdTemperature::from_smn_value(raw).is_present();
            tracing::debug!("Node {} CCD{} present: {}", node, slot + 1, present);
            slots.push(present);
        }

        Ok(Self { slots })
    }

    pub fn is_present(&self, slot: usize) -> bool {
        self.slots.get(slot).copied().unwrap_or(false)
    }

    /// Number of probed slots, present or not
    pub fn probed(&self) -> usize {
        self.slots.len()
    }

    pub fn present_count(&self) -> usize {
        self.slots.iter().filter(|&&p| p).count()
    }
}
