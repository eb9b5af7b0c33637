//! Fixed-shape packet validation and status-code extraction.

use thiserror::Error;

/// A device status code.  `0` means "every button released".
pub type StatusCode = u8;

/// The status code that reports all buttons released.
pub const STATUS_ALL_RELEASED: StatusCode = 0;

/// Why a framed packet was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("packet has {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
    #[error("header byte is {actual}, expected {expected}")]
    Header { expected: u8, actual: u8 },
    #[error("terminator byte is {actual}, expected {expected}")]
    Terminator { expected: u8, actual: u8 },
}

/// The fixed layout of one vendor's status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketShape {
    pub length: usize,
    pub header: u8,
    pub terminator: u8,
    /// Byte offset of the status code.
    pub status_offset: usize,
}

impl PacketShape {
    /// Validates `packet` and returns its status code.
    ///
    /// # Errors
    ///
    /// Returns a [`PacketError`] naming the first field that deviates from
    /// this shape.
    pub fn check(&self, packet: &[u8]) -> Result<StatusCode, PacketError> {
        if packet.len() != self.length {
            return Err(PacketError::Length {
                expected: self.length,
                actual: packet.len(),
            });
        }
        if packet[0] != self.header {
            return Err(PacketError::Header {
                expected: self.header,
                actual: packet[0],
            });
        }
        let last = packet[self.length - 1];
        if last != self.terminator {
            return Err(PacketError::Terminator {
                expected: self.terminator,
                actual: last,
            });
        }
        Ok(packet[self.status_offset])
    }

    /// Like [`check`](Self::check) but discards the rejection reason.
    pub fn classify(&self, packet: &[u8]) -> Option<StatusCode> {
        self.check(packet).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPE: PacketShape = PacketShape {
        length: 16,
        header: 10,
        terminator: 182,
        status_offset: 5,
    };

    fn packet(status: u8) -> Vec<u8> {
        let mut p = vec![0u8; 16];
        p[0] = 10;
        p[5] = status;
        p[15] = 182;
        p
    }

    #[test]
    fn test_well_formed_packet_yields_status() {
        assert_eq!(SHAPE.classify(&packet(97)), Some(97));
    }

    #[test]
    fn test_status_zero_is_accepted_not_rejected() {
        assert_eq!(SHAPE.check(&packet(0)), Ok(STATUS_ALL_RELEASED));
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        // Arrange
        let mut short = packet(97);
        short.remove(3);

        // Act
        let result = SHAPE.check(&short);

        // Assert
        assert_eq!(
            result,
            Err(PacketError::Length {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn test_wrong_header_is_rejected() {
        let mut p = packet(97);
        p[0] = 11;
        assert!(matches!(SHAPE.check(&p), Err(PacketError::Header { .. })));
    }

    #[test]
    fn test_wrong_terminator_is_rejected() {
        let mut p = packet(97);
        p[15] = 181;
        assert!(matches!(
            SHAPE.check(&p),
            Err(PacketError::Terminator { actual: 181, .. })
        ));
    }

    #[test]
    fn test_empty_packet_is_rejected_without_panicking() {
        assert_eq!(SHAPE.classify(&[]), None);
    }
}
