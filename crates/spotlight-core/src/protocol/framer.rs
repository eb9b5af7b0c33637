//! Terminator-delimited packet framing for raw HID streams.
//!
//! # How framing works (for beginners)
//!
//! A hidraw node hands us bytes in whatever chunk sizes the kernel chooses.
//! The presenter protocols we support end every report with a fixed
//! terminator byte, so reassembly is simple: append each byte to a rolling
//! buffer and, as soon as the byte just appended equals the terminator, hand
//! the whole buffer out as one packet and start over.
//!
//! The framer is bounded.  If `limit` bytes arrive without a terminator
//! (another HID interface of the same receiver, or a desynchronised stream)
//! the buffer is discarded and framing restarts with the next byte.
//!
//! The framer does not look inside packets.  Whether a packet has the right
//! length or header is the job of [`crate::protocol::packet`].
//!
//! Two ways to drive it:
//!
//! - **Push** – [`PacketFramer::push`] / [`PacketFramer::extend`], for readers
//!   that already own the read loop (e.g. a `poll(2)` loop over several nodes).
//! - **Pull** – [`PacketFramer::packets`] wraps any [`std::io::Read`] into a
//!   lazy iterator of packets.

use std::io::{self, Read};

use thiserror::Error;
use tracing::trace;

/// Buffer bound used by [`PacketFramer::new`].
pub const DEFAULT_FRAME_LIMIT: usize = 256;

/// Errors surfaced by the pull-style packet iterator.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The underlying byte source failed.  No further packets follow.
    #[error("read from packet source failed: {0}")]
    Io(#[from] io::Error),
}

/// Rolling reassembly buffer for one byte stream.
#[derive(Debug, Clone)]
pub struct PacketFramer {
    terminator: u8,
    limit: usize,
    buffer: Vec<u8>,
}

impl PacketFramer {
    /// Creates an empty framer that splits on `terminator`, holding at most
    /// [`DEFAULT_FRAME_LIMIT`] bytes.
    pub fn new(terminator: u8) -> Self {
        Self::with_limit(terminator, DEFAULT_FRAME_LIMIT)
    }

    /// Creates an empty framer whose packets are at most `limit` bytes long,
    /// terminator included.
    pub fn with_limit(terminator: u8, limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            terminator,
            limit,
            buffer: Vec::with_capacity(limit.min(DEFAULT_FRAME_LIMIT)),
        }
    }

    /// The byte that closes a packet.
    pub fn terminator(&self) -> u8 {
        self.terminator
    }

    /// Longest packet this framer will assemble.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of bytes held for the packet currently being assembled.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends one byte; returns the completed packet when `byte` closes it.
    ///
    /// Reaching the limit without a terminator drops everything buffered.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        self.buffer.push(byte);
        if byte == self.terminator {
            return Some(std::mem::take(&mut self.buffer));
        }
        if self.buffer.len() >= self.limit {
            trace!(dropped = self.buffer.len(), "no terminator within frame limit, resyncing");
            self.buffer.clear();
        }
        None
    }

    /// Appends a chunk and returns every packet it completed, in order.
    pub fn extend(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        chunk.iter().filter_map(|&b| self.push(b)).collect()
    }

    /// Drops any partially assembled packet.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Turns `source` into a lazy, non-restartable packet sequence.
    pub fn packets<R: Read>(self, source: R) -> Packets<R> {
        Packets {
            framer: self,
            source,
            chunk: [0u8; 64],
            ready: std::collections::VecDeque::new(),
            finished: false,
        }
    }
}

/// Iterator returned by [`PacketFramer::packets`].
///
/// Yields `Ok(packet)` for each complete packet.  End of file ends the
/// sequence cleanly (a trailing partial packet is discarded).  A read error is
/// yielded once as `Err(FrameError::Io)` and the sequence ends after it.
pub struct Packets<R> {
    framer: PacketFramer,
    source: R,
    chunk: [u8; 64],
    ready: std::collections::VecDeque<Vec<u8>>,
    finished: bool,
}

impl<R: Read> Iterator for Packets<R> {
    type Item = Result<Vec<u8>, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(packet) = self.ready.pop_front() {
                return Some(Ok(packet));
            }
            if self.finished {
                return None;
            }
            match self.source.read(&mut self.chunk) {
                Ok(0) => {
                    self.finished = true;
                    self.framer.reset();
                }
                Ok(n) => {
                    let completed = self.framer.extend(&self.chunk[..n]);
                    self.ready.extend(completed);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(FrameError::Io(e)));
                }
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for Packets<R> {}
