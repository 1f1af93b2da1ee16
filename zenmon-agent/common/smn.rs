use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use zenmon_raw::current_arch::smn::{SMN_DATA_OFFSET, SMN_INDEX_OFFSET};
use zenmon_raw::PciLocation;

use crate::common::pci::{self, PciHandle};
use crate::error::{Result, ZenmonError};

/// How SMN registers are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Index/data window of each node's own root complex
    NodeIndexed,
    /// Single index/data window on the first host bridge, shared by all nodes
    Legacy,
}

impl TransportMode {
    pub fn name(&self) -> &'static str {
        match self {
            TransportMode::NodeIndexed => "node",
            TransportMode::Legacy => "legacy",
        }
    }
}

/// Reads 32-bit SMN registers of a node
pub trait SmnTransport: Send + Sync {
    fn read(&self, node: u32, address: u32) -> Result<u32>;

    fn mode(&self) -> TransportMode;
}

/// Pick the host bridge that carries each node's SMN window
///
/// Some parts expose several root complexes per node (four on family 17h
/// model 31h and family 19h). The roots are split evenly between nodes in
/// segment/bus order and the first root of each group is used.
pub fn node_roots(roots: &[PciLocation], node_count: usize) -> Result<Vec<PciLocation>> {
    if node_count == 0 || roots.len() < node_count || roots.len() % node_count != 0 {
        return Err(ZenmonError::SmnError(format!(
            "{} root complexes cannot be split across {} nodes",
            roots.len(),
            node_count
        )));
    }

    let roots_per_node = roots.len() / node_count;
    Ok(roots.iter().step_by(roots_per_node).copied().collect())
}

/// Node-addressed transport: one host bridge per node
pub struct NodeSmn {
    roots: Vec<PciHandle>,
}

impl NodeSmn {
    /// Open one host bridge per node, indexed by node id
    pub fn new(locations: &[PciLocation]) -> Result<Self> {
        let roots = locations
            .iter()
            .map(|&location| PciHandle::open(location))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { roots })
    }

    /// Open the node root complexes found under a sysfs devices directory
    pub fn discover(sysfs_root: &Path, node_count: usize) -> Result<Self> {
        let roots = pci::find_root_complexes(sysfs_root)?;
        if roots.is_empty() {
            return Err(ZenmonError::SmnError(
                "No AMD root complex found".to_string(),
            ));
        }

        let locations = node_roots(&roots, node_count)?;
        tracing::info!(
            "Found {} AMD root complexes, {} per node",
            roots.len(),
            roots.len() / node_count
        );
        Self::new(&locations)
    }

    pub fn node_count(&self) -> usize {
        self.roots.len()
    }
}

impl SmnTransport for NodeSmn {
    fn read(&self, node: u32, address: u32) -> Result<u32> {
        let root = self.roots.get(node as usize).ok_or_else(|| {
            ZenmonError::SmnError(format!(
                "Node {} has no root complex ({} known)",
                node,
                self.roots.len()
            ))
        })?;

        let value = root.read_indexed(SMN_INDEX_OFFSET, SMN_DATA_OFFSET, address)?;
        tracing::debug!(
            "SMN read: node {} addr 0x{:08x} = 0x{:08x}",
            node,
            address,
            value
        );
        Ok(value)
    }

    fn mode(&self) -> TransportMode {
        TransportMode::NodeIndexed
    }
}

/// Process-wide guard for the legacy index/data pair
static LEGACY_INDEX_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Host bridge carrying the legacy index/data window
pub const LEGACY_HOST_BRIDGE: PciLocation = PciLocation::new(0, 0, 0, 0);

/// Bus-indexed fallback transport
///
/// Every node is read through the first host bridge, so readings on
/// multi-die parts may come from the wrong die.
pub struct LegacySmn {
    bridge: PciHandle,
}

impl LegacySmn {
    pub fn new() -> Result<Self> {
        Ok(Self {
            bridge: PciHandle::open(LEGACY_HOST_BRIDGE)?,
        })
    }
}

impl SmnTransport for LegacySmn {
    fn read(&self, node: u32, address: u32) -> Result<u32> {
        let _guard = LEGACY_INDEX_LOCK.lock();
        let value = self
            .bridge
            .read_indexed(SMN_INDEX_OFFSET, SMN_DATA_OFFSET, address)?;
        tracing::debug!(
            "SMN read (legacy): node {} addr 0x{:08x} = 0x{:08x}",
            node,
            address,
            value
        );
        Ok(value)
    }

    fn mode(&self) -> TransportMode {
        TransportMode::Legacy
    }
}

/// Pick the transport once for the lifetime of the process
///
/// The node-addressed transport is used when the root complexes split
/// evenly across the nodes; otherwise, or when forced, the legacy window is
/// used.
pub fn select_transport(
    sysfs_root: &Path,
    node_count: usize,
    force_legacy: bool,
) -> Result<Arc<dyn SmnTransport>> {
    if !force_legacy {
        match NodeSmn::discover(sysfs_root, node_count) {
            Ok(smn) => {
                tracing::info!(
                    "Using node-addressed SMN access for {} nodes",
                    smn.node_count()
                );
                return Ok(Arc::new(smn));
            }
            Err(e) => {
                tracing::warn!("Node-addressed SMN access unavailable: {}", e);
            }
        }
    }

    tracing::warn!("Using legacy SMN access through {}", LEGACY_HOST_BRIDGE);
    Ok(Arc::new(LegacySmn::new()?))
}
