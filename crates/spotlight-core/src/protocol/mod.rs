//! Wire-level handling of raw presenter reports.
//!
//! - [`framer`] – splits a byte stream into terminator-delimited packets.
//! - [`packet`] – checks a packet's fixed shape and extracts its status code.

pub mod framer;
pub mod packet;
