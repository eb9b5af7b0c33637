//! HotplugRouter: classifies device notifications and updates the registry.
//!
//! The OS side (udev monitor socket, initial enumeration, attribute lookups)
//! lives in `infrastructure::udev_monitor`.  This module only decides what a
//! notification means:
//!
//! - `Added` – describe the node, find the model whose signature matches,
//!   and hand the node to that model's instance.
//! - `Removed` – the node is gone, so it can no longer be described; hand the
//!   path to the registry, which ignores paths it never knew.

use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use spotlight_core::{DeviceDescriptor, DeviceModel, DeviceNode};
use tracing::{debug, warn};

use super::registry::DeviceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugAction {
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotplugEvent {
    pub action: HotplugAction,
    pub path: PathBuf,
}

/// Out-of-band node description (the `udevadm info -a` of a node).
#[cfg_attr(test, automock)]
pub trait DescriptorSource: Send + Sync {
    fn describe(&self, path: &Path) -> Option<DeviceDescriptor>;
}

pub struct HotplugRouter {
    registry: Arc<DeviceRegistry>,
    source: Arc<dyn DescriptorSource>,
    models: Vec<DeviceModel>,
}

impl HotplugRouter {
    pub fn new(registry: Arc<DeviceRegistry>, source: Arc<dyn DescriptorSource>) -> Self {
        Self {
            registry,
            source,
            models: DeviceModel::ALL.to_vec(),
        }
    }

    /// Returns the model that owns `path`, if any.
    pub fn classify(&self, node: &DeviceNode) -> Option<DeviceModel> {
        let descriptor = self.source.describe(&node.path)?;
        self.models
            .iter()
            .copied()
            .find(|m| m.signature().matches(&descriptor, node.kind))
    }

    /// Applies one notification.  Returns the model it was routed to.
    pub fn handle(&self, event: &HotplugEvent) -> Option<DeviceModel> {
        match event.action {
            HotplugAction::Added => {
                let node = DeviceNode::from_path(&event.path)?;
                let model = self.classify(&node)?;
                match self.registry.add_path(model, node) {
                    Ok(_) => Some(model),
                    Err(e) => {
                        warn!(%model, "could not register node: {e}");
                        None
                    }
                }
            }
            HotplugAction::Removed => {
                if self.registry.remove_path(&event.path) {
                    debug!(path = %event.path.display(), "known node removed");
                }
                None
            }
        }
    }

    /// Classifies every node in `paths` as if it had just been added.
    /// Returns the number of nodes routed to a model.
    pub fn enumerate(&self, paths: impl IntoIterator<Item = PathBuf>) -> usize {
        paths
            .into_iter()
            .filter_map(|path| {
                self.handle(&HotplugEvent {
                    action: HotplugAction::Added,
                    path,
                })
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::registry::{KnownNodes, NodeMonitor};
    use spotlight_core::NodeKind;
    use std::sync::atomic::{AtomicBool, Ordering};
    use uuid::Uuid;

    struct IdleMonitor;

    impl NodeMonitor for IdleMonitor {
        fn run(&self, _nodes: KnownNodes, stop: Arc<AtomicBool>) {
            while !stop.load(Ordering::SeqCst) {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        }
    }

    fn registry() -> Arc<DeviceRegistry> {
        Arc::new(DeviceRegistry::new(Box::new(|_| {
            Arc::new(IdleMonitor) as Arc<dyn NodeMonitor>
        })))
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spotlight_dev_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_added_node_with_matching_descriptor_is_registered() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("hidraw4");
        std::fs::write(&path, b"").unwrap();
        let mut source = MockDescriptorSource::new();
        source
            .expect_describe()
            .returning(|_| Some(DeviceDescriptor::new("HID_ID=0003:0000ABC8:0000CA08", None)));
        let registry = registry();
        let router = HotplugRouter::new(Arc::clone(&registry), Arc::new(source));

        // Act
        let routed = router.handle(&HotplugEvent {
            action: HotplugAction::Added,
            path: path.clone(),
        });

        // Assert
        assert_eq!(routed, Some(DeviceModel::BaseusOrangeDotAi));
        let instance = registry.get(DeviceModel::BaseusOrangeDotAi).unwrap();
        assert!(instance.nodes().contains(&path));

        registry.shutdown();
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_unmatched_descriptor_is_ignored() {
        // Arrange
        let mut source = MockDescriptorSource::new();
        source
            .expect_describe()
            .returning(|_| Some(DeviceDescriptor::new("046d:c52b logitech", None)));
        let registry = registry();
        let router = HotplugRouter::new(Arc::clone(&registry), Arc::new(source));

        // Act
        let routed = router.handle(&HotplugEvent {
            action: HotplugAction::Added,
            path: PathBuf::from("/dev/input/event3"),
        });

        // Assert
        assert_eq!(routed, None);
        assert!(registry.get(DeviceModel::BaseusOrangeDotAi).is_none());
        assert!(registry.get(DeviceModel::GenericVrBox).is_none());
    }

    #[test]
    fn test_nodes_we_never_read_are_not_described() {
        // Arrange
        let mut source = MockDescriptorSource::new();
        source.expect_describe().never();
        let router = HotplugRouter::new(registry(), Arc::new(source));

        // Act
        let routed = router.handle(&HotplugEvent {
            action: HotplugAction::Added,
            path: PathBuf::from("/dev/input/mouse1"),
        });

        // Assert
        assert_eq!(routed, None);
    }

    #[test]
    fn test_removed_event_needs_no_descriptor() {
        // Arrange
        let dir = temp_dir();
        let path = dir.join("event7");
        std::fs::write(&path, b"").unwrap();
        let mut source = MockDescriptorSource::new();
        source.expect_describe().never();
        let registry = registry();
        registry
            .add_path(
                DeviceModel::GenericVrBox,
                DeviceNode::new(&path, NodeKind::Event),
            )
            .unwrap();
        let router = HotplugRouter::new(Arc::clone(&registry), Arc::new(source));

        // Act
        router.handle(&HotplugEvent {
            action: HotplugAction::Removed,
            path: path.clone(),
        });

        // Assert
        let instance = registry.get(DeviceModel::GenericVrBox).unwrap();
        assert!(instance.nodes().is_empty());

        registry.shutdown();
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_enumerate_counts_routed_nodes() {
        // Arrange
        let dir = temp_dir();
        let baseus = dir.join("hidraw1");
        let other = dir.join("hidraw2");
        std::fs::write(&baseus, b"").unwrap();
        std::fs::write(&other, b"").unwrap();
        let wanted = baseus.clone();
        let mut source = MockDescriptorSource::new();
        source.expect_describe().returning(move |p| {
            if p == wanted {
                Some(DeviceDescriptor::new("abc8 ca08", None))
            } else {
                Some(DeviceDescriptor::new("1234 5678", None))
            }
        });
        let registry = registry();
        let router = HotplugRouter::new(Arc::clone(&registry), Arc::new(source));

        // Act
        let routed = router.enumerate(vec![baseus, other]);

        // Assert
        assert_eq!(routed, 1);

        registry.shutdown();
        let _ = std::fs::remove_dir_all(dir);
    }
}
