use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use zenmon_raw::current_arch::thm::TdieMode;

use crate::common::pci::find_df_nodes;
use crate::error::{Result, ZenmonError};
use crate::sensors::DeviceOptions;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_LISTEN: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED), 8080);

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Data Fabric nodes present in the system
    pub node_count: u32,
    /// Nodes to export, a subset of `0..node_count`
    pub nodes: Vec<u32>,
    pub tdie_mode: TdieMode,
    pub swap_planes: bool,
    pub force_legacy: bool,
    pub interval: Duration,
    pub listen: SocketAddr,
}

impl ExportConfig {
    /// Export every node of a system with `node_count` nodes
    pub fn new(node_count: u32) -> Self {
        Self {
            node_count,
            nodes: (0..node_count).collect(),
            tdie_mode: TdieMode::default(),
            swap_planes: false,
            force_legacy: false,
            interval: DEFAULT_INTERVAL,
            listen: DEFAULT_LISTEN,
        }
    }

    /// Auto-detect nodes from the PCI devices under `sysfs_root`
    pub fn auto_detect(sysfs_root: &Path) -> Self {
        let node_count = Self::detect_node_count(sysfs_root);
        tracing::info!("Auto-detected {} Data Fabric nodes", node_count);
        Self::new(node_count)
    }

    /// Count Data Fabric nodes, falling back to a single node
    pub fn detect_node_count(sysfs_root: &Path) -> u32 {
        match find_df_nodes(sysfs_root) {
            Ok(nodes) if !nodes.is_empty() => nodes.len() as u32,
            Ok(_) => {
                tracing::warn!("No Data Fabric nodes found, assuming 1");
                1
            }
            Err(e) => {
                tracing::warn!("Failed to scan for Data Fabric nodes ({}), assuming 1", e);
                1
            }
        }
    }

    /// Restrict export to `nodes`, all of which must exist
    pub fn with_nodes(mut self, nodes: Vec<u32>) -> Result<Self> {
        if nodes.is_empty() {
            return Err(ZenmonError::ConfigError("No nodes selected".to_string()));
        }
        if let Some(&bad) = nodes.iter().find(|&&n| n >= self.node_count) {
            return Err(ZenmonError::ConfigError(format!(
                "Node {} does not exist ({} nodes present)",
                bad, self.node_count
            )));
        }
        self.nodes = nodes;
        Ok(self)
    }

    pub fn device_options(&self) -> DeviceOptions {
        DeviceOptions {
            tdie_mode: self.tdie_mode,
            swap_planes: self.swap_planes,
        }
    }
}

/// Parse a list of range strings like ["0-3", "5"] or ["0,2"] into node ids
///
/// The result is sorted and deduplicated.
pub fn parse_node_list(inputs: &[String]) -> Result<Vec<u32>> {
    let mut result = Vec::new();

    for input in inputs {
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let parse = |s: &str| {
                s.trim()
                    .parse::<u32>()
                    .map_err(|_| ZenmonError::ParseError(format!("Invalid node id: {part}")))
            };

            if let Some((start, end)) = part.split_once('-') {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(ZenmonError::ParseError(format!("Empty node range: {part}")));
                }
                result.extend(start..=end);
            } else {
                result.push(parse(part)?);
            }
        }
    }

    result.sort_unstable();
    result.dedup();
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_node_list() {
        assert_eq!(parse_node_list(&strings(&["0"])).unwrap(), vec![0]);
        assert_eq!(
            parse_node_list(&strings(&["0-2", "5"])).unwrap(),
            vec![0, 1, 2, 5]
        );
        assert_eq!(
            parse_node_list(&strings(&["3,1", "1-2"])).unwrap(),
            vec![1, 2, 3]
        );
        assert!(parse_node_list(&strings(&[])).unwrap().is_empty());
    }

    #[test]
    fn test_parse_node_list_rejects_garbage() {
        assert!(parse_node_list(&strings(&["x"])).is_err());
        assert!(parse_node_list(&strings(&["3-1"])).is_err());
        assert!(parse_node_list(&strings(&["-1"])).is_err());
    }

    #[test]
    fn test_with_nodes() {
        let config = ExportConfig::new(4);
        assert_eq!(config.nodes, vec![0, 1, 2, 3]);

        let config = config.with_nodes(vec![1, 3]).unwrap();
        assert_eq!(config.nodes, vec![1, 3]);

        assert!(ExportConfig::new(2).with_nodes(vec![2]).is_err());
        assert!(ExportConfig::new(2).with_nodes(Vec::new()).is_err());
    }

    #[test]
    fn test_detect_node_count() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(ExportConfig::detect_node_count(tmp.path()), 1);

        for (name, device) in [("0000:00:18.3", "0x1463"), ("0000:00:19.3", "0x1463")] {
            let dir = tmp.path().join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("vendor"), "0x1022\n").unwrap();
            fs::write(dir.join("device"), format!("{device}\n")).unwrap();
        }
        assert_eq!(ExportConfig::detect_node_count(tmp.path()), 2);
        assert_eq!(ExportConfig::auto_detect(tmp.path()).nodes, vec![0, 1]);
    }

    #[test]
    fn test_device_options() {
        let mut config = ExportConfig::new(1);
        config.tdie_mode = TdieMode::Signed;
        config.swap_planes = true;
        let options = config.device_options();
        assert_eq!(options.tdie_mode, TdieMode::Signed);
        assert!(options.swap_planes);
    }
}
