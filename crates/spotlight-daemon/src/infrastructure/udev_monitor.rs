//! udev adapters (Linux): node descriptors, enumeration, and the hotplug
//! monitor.
//!
//! # How nodes are identified (for beginners)
//!
//! `udevadm info -a -n /dev/hidraw3` prints the node and every ancestor up
//! to the USB root: names, properties such as
//! `HID_ID=0003:0000ABC8:0000CA08`, and sysfs attributes such as
//! `idVendor`.  [`UdevDescriptors`] gathers the same text through libudev so
//! a [`spotlight_core::DeviceSignature`] can search it for the vendor and
//! product ids.
//!
//! # Hotplug monitor
//!
//! [`start_hotplug_monitor`] opens a udev netlink socket filtered to the
//! `hidraw` and `input` subsystems on a background thread.  The socket is
//! opened before the function returns, so a caller that enumerates existing
//! nodes afterwards cannot miss a device plugged in between the two steps.
//! The thread polls the socket with a 500 ms timeout and checks the
//! `running` flag on every timeout.

use std::io;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use spotlight_core::{DeviceDescriptor, NodeKind};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::application::hotplug::{DescriptorSource, HotplugAction, HotplugEvent};

const SUBSYSTEMS: [&str; 2] = ["hidraw", "input"];
const MONITOR_POLL_MS: u16 = 500;

/// Error type for the hotplug monitor.
#[derive(Debug, Error)]
pub enum HotplugError {
    #[error("udev monitor could not be opened: {0}")]
    Monitor(#[source] io::Error),
    #[error("failed to spawn hotplug thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("hotplug thread exited during start-up")]
    Startup,
}

// ── Descriptors ───────────────────────────────────────────────────────────────

/// [`DescriptorSource`] backed by libudev.
pub struct UdevDescriptors;

impl DescriptorSource for UdevDescriptors {
    fn describe(&self, path: &Path) -> Option<DeviceDescriptor> {
        match describe_node(path) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                debug!(path = %path.display(), "no udev description: {e}");
                None
            }
        }
    }
}

fn subsystem_of(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Raw => "hidraw",
        NodeKind::Event => "input",
    }
}

fn describe_node(path: &Path) -> io::Result<DeviceDescriptor> {
    let kind = NodeKind::from_path(path)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not a hidraw or event node"))?;
    let sysname = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let device = udev::Device::from_subsystem_sysname(subsystem_of(kind).to_string(), sysname)?;

    let mut text = String::new();
    append_device(&mut text, &device);
    let mut ancestor = device.parent();
    while let Some(parent) = ancestor {
        append_device(&mut text, &parent);
        ancestor = parent.parent();
    }

    let interface_protocol = device
        .parent_with_subsystem_devtype("usb", "usb_interface")
        .ok()
        .flatten()
        .and_then(|interface| {
            interface
                .attribute_value("bInterfaceProtocol")
                .and_then(|v| parse_interface_protocol(&v.to_string_lossy()))
        });

    Ok(DeviceDescriptor::new(text, interface_protocol))
}

fn append_device(text: &mut String, device: &udev::Device) {
    text.push_str(&device.sysname().to_string_lossy());
    text.push('\n');
    for entry in device.properties() {
        if let Some(value) = device.property_value(entry.name()) {
            push_pair(text, &entry.name().to_string_lossy(), &value.to_string_lossy());
        }
    }
    for entry in device.attributes() {
        if let Some(value) = device.attribute_value(entry.name()) {
            push_pair(text, &entry.name().to_string_lossy(), &value.to_string_lossy());
        }
    }
}

fn push_pair(text: &mut String, name: &str, value: &str) {
    text.push_str(name);
    text.push('=');
    text.push_str(value);
    text.push('\n');
}

/// sysfs prints `bInterfaceProtocol` as two hex digits.
fn parse_interface_protocol(value: &str) -> Option<u8> {
    u8::from_str_radix(value.trim(), 16).ok()
}

// ── Enumeration ───────────────────────────────────────────────────────────────

/// Lists every existing hidraw and evdev node.
///
/// # Errors
///
/// Returns the libudev error if enumeration cannot be set up.
pub fn enumerate_nodes() -> io::Result<Vec<PathBuf>> {
    let mut nodes = Vec::new();
    for subsystem in SUBSYSTEMS {
        let mut enumerator = udev::Enumerator::new()?;
        enumerator.match_subsystem(subsystem)?;
        for device in enumerator.scan_devices()? {
            if let Some(node) = device.devnode() {
                if NodeKind::from_path(node).is_some() {
                    nodes.push(node.to_path_buf());
                }
            }
        }
    }
    Ok(nodes)
}

// ── Hotplug monitor ───────────────────────────────────────────────────────────

/// Opens the udev monitor socket and spawns the thread that reads it.
///
/// Returns a receiver of add/remove notifications for hidraw and evdev
/// nodes.
///
/// # Errors
///
/// Returns [`HotplugError::Monitor`] if the socket cannot be opened and
/// [`HotplugError::Spawn`] if the thread cannot be created.
pub fn start_hotplug_monitor(
    running: Arc<AtomicBool>,
) -> Result<mpsc::Receiver<HotplugEvent>, HotplugError> {
    let (tx, rx) = mpsc::channel(64);
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<io::Result<()>>();

    std::thread::Builder::new()
        .name("spotlight-hotplug".to_string())
        .spawn(move || {
            let socket = match open_monitor() {
                Ok(socket) => {
                    let _ = ready_tx.send(Ok(()));
                    socket
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            monitor_loop(&socket, &tx, &running);
        })
        .map_err(HotplugError::Spawn)?;

    match ready_rx.recv() {
        Ok(Ok(())) => {
            info!("hotplug monitor listening on {}", SUBSYSTEMS.join(", "));
            Ok(rx)
        }
        Ok(Err(e)) => Err(HotplugError::Monitor(e)),
        Err(_) => Err(HotplugError::Startup),
    }
}

fn open_monitor() -> io::Result<udev::MonitorSocket> {
    let mut builder = udev::MonitorBuilder::new()?;
    for subsystem in SUBSYSTEMS {
        builder = builder.match_subsystem(subsystem)?;
    }
    builder.listen()
}

fn monitor_loop(
    socket: &udev::MonitorSocket,
    tx: &mpsc::Sender<HotplugEvent>,
    running: &AtomicBool,
) {
    while running.load(Ordering::Relaxed) {
        // SAFETY: `socket` owns the fd and outlives the poll call.
        let mut fds = [PollFd::new(
            unsafe { BorrowedFd::borrow_raw(socket.as_raw_fd()) },
            PollFlags::POLLIN,
        )];
        match poll(&mut fds, PollTimeout::from(MONITOR_POLL_MS)) {
            Ok(0) | Err(Errno::EINTR) => continue,
            Ok(_) => {}
            Err(e) => {
                error!("hotplug poll failed: {e}");
                break;
            }
        }

        for event in socket.iter() {
            let action = match event.event_type() {
                udev::EventType::Add => HotplugAction::Added,
                udev::EventType::Remove => HotplugAction::Removed,
                _ => continue,
            };
            let Some(path) = event.devnode().map(Path::to_path_buf) else {
                continue;
            };
            if NodeKind::from_path(&path).is_none() {
                continue;
            }
            debug!(?action, path = %path.display(), "hotplug event");
            if tx.blocking_send(HotplugEvent { action, path }).is_err() {
                // Receiver dropped: the daemon is shutting down.
                return;
            }
        }
    }
    info!("hotplug monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_protocol_is_hex() {
        assert_eq!(parse_interface_protocol("02\n"), Some(2));
        assert_eq!(parse_interface_protocol("ff"), Some(255));
        assert_eq!(parse_interface_protocol(""), None);
    }

    #[test]
    fn test_nodes_map_to_their_udev_subsystem() {
        assert_eq!(subsystem_of(NodeKind::Raw), "hidraw");
        assert_eq!(subsystem_of(NodeKind::Event), "input");
    }

    #[test]
    fn test_describe_rejects_nodes_we_never_read() {
        assert!(UdevDescriptors.describe(Path::new("/dev/input/mouse0")).is_none());
    }
}
