//! Vendor/product matching of device nodes.
//!
//! A node is identified by scanning a textual descriptor of the node and all
//! of its ancestors (udev names, properties, sysfs attributes) for the
//! four-digit lowercase hex vendor and product ids.  This is the same test a
//! human would do by grepping `udevadm info -a` output.

use std::path::{Path, PathBuf};

/// Immutable identity of one supported device class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSignature {
    pub vendor_id: u16,
    pub product_id: u16,
    /// When set, raw nodes must also report this USB `bInterfaceProtocol`.
    /// Used for receivers that expose several HID interfaces.
    pub interface_protocol: Option<u8>,
}

impl DeviceSignature {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            interface_protocol: None,
        }
    }

    /// Returns `true` when `descriptor` belongs to this device class.
    pub fn matches(&self, descriptor: &DeviceDescriptor, kind: NodeKind) -> bool {
        let vendor = format!("{:04x}", self.vendor_id);
        let product = format!("{:04x}", self.product_id);
        if !descriptor.text.contains(&vendor) || !descriptor.text.contains(&product) {
            return false;
        }
        match (self.interface_protocol, kind) {
            (Some(expected), NodeKind::Raw) => descriptor.interface_protocol == Some(expected),
            _ => true,
        }
    }
}

/// Out-of-band description of a node, as gathered from the OS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Lowercased descriptor text.
    pub text: String,
    pub interface_protocol: Option<u8>,
}

impl DeviceDescriptor {
    pub fn new(text: impl AsRef<str>, interface_protocol: Option<u8>) -> Self {
        Self {
            text: text.as_ref().to_lowercase(),
            interface_protocol,
        }
    }
}

/// The two node flavours a presenter exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    /// `/dev/hidrawN` – raw HID reports.
    Raw,
    /// `/dev/input/eventN` – evdev key/motion events.
    Event,
}

impl NodeKind {
    /// Infers the kind from a device path; `None` for nodes we never read.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.starts_with("hidraw") {
            Some(NodeKind::Raw)
        } else if name.starts_with("event") {
            Some(NodeKind::Event)
        } else {
            None
        }
    }
}

/// A device node path together with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceNode {
    pub path: PathBuf,
    pub kind: NodeKind,
}

impl DeviceNode {
    pub fn new(path: impl Into<PathBuf>, kind: NodeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Builds a node from a path whose file name reveals its kind.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let kind = NodeKind::from_path(&path)?;
        Some(Self { path, kind })
    }

    /// Whether the node currently exists on disk.
    pub fn is_present(&self) -> bool {
        self.path.exists()
    }
}
