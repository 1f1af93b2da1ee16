// In-memory SMN transport for unit tests

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::common::smn::{SmnTransport, TransportMode};
use crate::error::{Result, ZenmonError};

/// Register file keyed by (node, address); unset registers read as 0
#[derive(Default)]
pub struct FakeSmn {
    registers: Mutex<HashMap<(u32, u32), u32>>,
    failing: Mutex<HashSet<u32>>,
    reads: AtomicUsize,
}

impl FakeSmn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, node: u32, address: u32, value: u32) -> Self {
        self.set(node, address, value);
        self
    }

    pub fn set(&self, node: u32, address: u32, value: u32) {
        self.registers.lock().insert((node, address), value);
    }

    /// Make every read of `address` fail, on any node
    pub fn fail(&self, address: u32) {
        self.failing.lock().insert(address);
    }

    pub fn heal(&self, address: u32) {
        self.failing.lock().remove(&address);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl SmnTransport for FakeSmn {
    fn read(&self, node: u32, address: u32) -> Result<u32> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.failing.lock().contains(&address) {
            return Err(ZenmonError::SmnError(format!(
                "injected failure at 0x{address:08x} on node {node}"
            )));
        }
        Ok(self
            .registers
            .lock()
            .get(&(node, address))
            .copied()
            .unwrap_or(0))
    }

    fn mode(&self) -> TransportMode {
        TransportMode::NodeIndexed
    }
}
