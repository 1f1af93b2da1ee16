// Node/package topology derived from CPUID leaf 0x8000001E

use serde::Serialize;
use zenmon_raw::extract_bits;

use crate::error::{Result, ZenmonError};

/// NodesPerProcessor field of leaf 0x8000001E ECX, encoded as count - 1
const NODES_PER_PACKAGE_SHIFT: u32 = 8;
const NODES_PER_PACKAGE_WIDTH: u32 = 3;

pub fn nodes_per_package(node_id_leaf: u32) -> u32 {
    1 + extract_bits(node_id_leaf, NODES_PER_PACKAGE_SHIFT, NODES_PER_PACKAGE_WIDTH)
}

/// Position of one node within the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub node_id: u32,
    pub nodes_per_package: u32,
    pub package_index: u32,
    pub node_within_package: u32,
}

impl Topology {
    pub fn resolve(node_id: u32, node_id_leaf: u32) -> Self {
        let nodes_per_package = nodes_per_package(node_id_leaf);
        Self {
            node_id,
            nodes_per_package,
            package_index: node_id / nodes_per_package,
            node_within_package: node_id % nodes_per_package,
        }
    }

    /// More than one die shares this package
    pub fn is_multi_node(&self) -> bool {
        self.nodes_per_package > 1
    }
}

/// System-wide topology shared by every device instance
///
/// Built once by the host from the node count, so every device formats its
/// labels the same way no matter which one was initialized first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyContext {
    node_id_leaf: u32,
    nodes_per_package: u32,
    node_count: u32,
    package_count: u32,
}

impl TopologyContext {
    pub fn new(node_id_leaf: u32, node_count: u32) -> Result<Self> {
        if node_count == 0 {
            return Err(ZenmonError::TopologyError(
                "At least one node is required".to_string(),
            ));
        }

        let nodes_per_package = nodes_per_package(node_id_leaf);
        let package_count = node_count.div_ceil(nodes_per_package);

        tracing::info!(
            "Topology: {} nodes, {} per package, {} packages",
            node_count,
            nodes_per_package,
            package_count
        );

        Ok(Self {
            node_id_leaf,
            nodes_per_package,
            node_count,
            package_count,
        })
    }

    pub fn resolve(&self, node_id: u32) -> Result<Topology> {
        if node_id >= self.node_count {
            return Err(ZenmonError::TopologyError(format!(
                "Node {} out of range ({} nodes)",
                node_id, self.node_count
            )));
        }
        Ok(Topology::resolve(node_id, self.node_id_leaf))
    }

    pub fn nodes_per_package(&self) -> u32 {
        self.nodes_per_package
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn package_count(&self) -> u32 {
        self.package_count
    }

    pub fn is_multi_package(&self) -> bool {
        self.package_count > 1
    }

    /// Prefix `label` with the owning package when there is more than one
    pub fn label(&self, topology: &Topology, label: &str) -> String {
        if self.is_multi_package() {
            format!("cpu{}_{}", topology.package_index, label)
        } else {
            label.to_string()
        }
    }
}
