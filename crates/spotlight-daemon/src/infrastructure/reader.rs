//! NodeReader: the body of a device instance's reader thread (Linux).
//!
//! One thread services every node of one device model.  Each iteration it:
//!
//! 1. re-syncs its open handles with the instance's [`KnownNodes`] (opening
//!    new paths, closing removed ones),
//! 2. waits up to 250 ms for any handle to become readable (`poll(2)`),
//! 3. reads what is ready and feeds it to the [`DevicePipeline`].
//!
//! The timeout bounds how long a raised stop flag goes unnoticed.
//!
//! # Node flavours
//!
//! - hidraw nodes are plain byte streams cut into packets by a
//!   [`PacketFramer`].
//! - evdev nodes are opened through the `evdev` crate and, when configured,
//!   grabbed so the remote's native key events stop reaching the desktop.
//!   Pointer motion and clicks from a grabbed node are re-emitted.
//!
//! A read error or end-of-file on a node means the device went away: the
//! node is dropped from the known set, in-flight gestures are discarded, and
//! the thread exits once no nodes remain.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use spotlight_core::{DeviceNode, NodeKind, PacketFramer, RawInputEvent};
use tracing::{debug, info, warn};

use crate::application::emulate_input::{EmulationError, VirtualInput};
use crate::application::pipeline::DevicePipeline;
use crate::application::registry::{KnownNodes, NodeMonitor};

const POLL_TIMEOUT_MS: u16 = 250;
const READ_CHUNK: usize = 64;

/// Creates a fresh virtual input device when the shared one is broken.
pub type DeviceProvisioner =
    Box<dyn Fn() -> Result<Arc<dyn VirtualInput>, EmulationError> + Send + Sync>;

enum Source {
    Raw { file: File, framer: PacketFramer },
    Event { device: evdev::Device, grabbed: bool },
}

struct OpenNode {
    path: PathBuf,
    source: Source,
}

impl OpenNode {
    fn raw_fd(&self) -> RawFd {
        match &self.source {
            Source::Raw { file, .. } => file.as_raw_fd(),
            Source::Event { device, .. } => device.as_raw_fd(),
        }
    }
}

pub struct NodeReader {
    pipeline: Arc<DevicePipeline>,
    grab: bool,
    provision: DeviceProvisioner,
}

impl NodeReader {
    pub fn new(pipeline: Arc<DevicePipeline>, grab: bool, provision: DeviceProvisioner) -> Self {
        Self {
            pipeline,
            grab,
            provision,
        }
    }

    fn open(&self, node: &DeviceNode) -> io::Result<OpenNode> {
        let source = match node.kind {
            NodeKind::Raw => {
                let framer = self.pipeline.new_framer().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Unsupported, "model has no raw protocol")
                })?;
                Source::Raw {
                    file: File::open(&node.path)?,
                    framer,
                }
            }
            NodeKind::Event => {
                let mut device = evdev::Device::open(&node.path)?;
                let grabbed = self.grab
                    && match device.grab() {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(path = %node.path.display(), "could not grab event node: {e}");
                            false
                        }
                    };
                Source::Event { device, grabbed }
            }
        };
        Ok(OpenNode {
            path: node.path.clone(),
            source,
        })
    }

    /// Opens newly known nodes and closes ones that are no longer known.
    /// Nodes that failed to open stay in `rejected` until they are removed.
    fn sync_open(
        &self,
        wanted: &[DeviceNode],
        open: &mut Vec<OpenNode>,
        rejected: &mut HashSet<PathBuf>,
    ) {
        let model = self.pipeline.model();
        open.retain(|o| {
            let keep = wanted.iter().any(|w| w.path == o.path);
            if !keep {
                debug!(%model, path = %o.path.display(), "closing node");
            }
            keep
        });
        rejected.retain(|p| wanted.iter().any(|w| &w.path == p));

        for node in wanted {
            if rejected.contains(&node.path) || open.iter().any(|o| o.path == node.path) {
                continue;
            }
            match self.open(node) {
                Ok(handle) => {
                    info!(%model, path = %node.path.display(), "node opened");
                    open.push(handle);
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    warn!(
                        %model,
                        path = %node.path.display(),
                        "permission denied; is the udev rule installed?"
                    );
                    rejected.insert(node.path.clone());
                }
                Err(e) if e.kind() == io::ErrorKind::Unsupported => {
                    debug!(%model, path = %node.path.display(), "node ignored: {e}");
                    rejected.insert(node.path.clone());
                }
                Err(e) => {
                    warn!(%model, path = %node.path.display(), "could not open node: {e}");
                    rejected.insert(node.path.clone());
                }
            }
        }
    }

    /// Reads whatever `node` has ready.  An error means the node is gone.
    fn service(&self, node: &mut OpenNode, buf: &mut [u8], now: Instant) -> io::Result<()> {
        match &mut node.source {
            Source::Raw { file, framer } => {
                let n = match file.read(buf) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
                    Err(e) => return Err(e),
                };
                if n == 0 {
                    return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "node closed"));
                }
                for packet in framer.extend(&buf[..n]) {
                    self.pipeline.handle_packet(&packet, now);
                }
            }
            Source::Event { device, grabbed } => {
                let events: Vec<RawInputEvent> = match device.fetch_events() {
                    Ok(events) => events
                        .map(|e| RawInputEvent::new(e.event_type().0, e.code(), e.value()))
                        .collect(),
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                    Err(e) => return Err(e),
                };
                self.pipeline.handle_input_events(&events, now, *grabbed);
            }
        }
        Ok(())
    }
}

/// Indices of the handles with something to read (or an error to report).
fn wait_readable(open: &[OpenNode]) -> nix::Result<Vec<usize>> {
    // SAFETY: every fd is owned by an `OpenNode` in `open`, which outlives
    // the poll call.
    let mut fds: Vec<PollFd<'_>> = open
        .iter()
        .map(|o| PollFd::new(unsafe { BorrowedFd::borrow_raw(o.raw_fd()) }, PollFlags::POLLIN))
        .collect();
    match poll(&mut fds, PollTimeout::from(POLL_TIMEOUT_MS)) {
        Ok(0) | Err(Errno::EINTR) => return Ok(Vec::new()),
        Ok(_) => {}
        Err(e) => return Err(e),
    }
    let wake = PollFlags::POLLIN | PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL;
    Ok(fds
        .iter()
        .enumerate()
        .filter(|(_, fd)| fd.revents().is_some_and(|r| r.intersects(wake)))
        .map(|(i, _)| i)
        .collect())
}

impl NodeMonitor for NodeReader {
    fn prepare(&self) {
        let emitter = self.pipeline.emitter();
        if !emitter.is_broken() {
            return;
        }
        match (self.provision)() {
            Ok(device) => {
                emitter.replace(device);
                info!("virtual input device re-created");
            }
            Err(e) => warn!("virtual input device still unavailable: {e}"),
        }
    }

    fn run(&self, nodes: KnownNodes, stop: Arc<AtomicBool>) {
        let model = self.pipeline.model();
        let mut open: Vec<OpenNode> = Vec::new();
        let mut rejected: HashSet<PathBuf> = HashSet::new();
        let mut buf = [0u8; READ_CHUNK];
        info!(%model, "reader started");

        while !stop.load(Ordering::SeqCst) {
            let wanted = nodes.snapshot();
            if wanted.is_empty() {
                break;
            }
            self.sync_open(&wanted, &mut open, &mut rejected);
            if open.is_empty() {
                std::thread::sleep(Duration::from_millis(u64::from(POLL_TIMEOUT_MS)));
                continue;
            }

            let ready = match wait_readable(&open) {
                Ok(ready) => ready,
                Err(e) => {
                    warn!(%model, "poll failed: {e}");
                    std::thread::sleep(Duration::from_millis(u64::from(POLL_TIMEOUT_MS)));
                    continue;
                }
            };

            let now = Instant::now();
            let mut lost = Vec::new();
            for index in ready {
                if let Err(e) = self.service(&mut open[index], &mut buf, now) {
                    warn!(%model, path = %open[index].path.display(), "device disconnected: {e}");
                    lost.push(index);
                }
            }
            for index in lost.into_iter().rev() {
                let gone = open.remove(index);
                nodes.remove(&gone.path);
                self.pipeline.disconnected();
            }
        }

        // Closing an evdev handle releases its grab.
        drop(open);
        self.pipeline.disconnected();
        info!(%model, "reader stopped");
    }
}
