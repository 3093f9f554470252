//! Data and acknowledgment frame formats.
//!
//! Both frame kinds are fixed size and carry no type tag. Which one a
//! received buffer is depends on what the link currently expects: the
//! receiver only ever decodes data frames, the sender only ever decodes acks.
//!
//! # Wire Format
//!
//! ```text
//! Data frame: [sequence: 1 byte][payload: capacity bytes]
//! Ack frame:  [sequence: 1 byte][status: 1 byte]
//! ```
//!
//! Status values:
//! - `0`: DELIVERED - frame newly accepted
//! - `1`: DUPLICATE - sequence bit already accepted, payload not re-delivered
//! - `2`: BAD_LENGTH - frame length did not match the data frame size
//!
//! # Example
//!
//! ```
//! use lora_arq::arq::{AckStatus, Framer, SequenceBit};
//!
//! let framer = Framer::default();
//! let frame = framer.encode_data(SequenceBit::One, b"hello").unwrap();
//! let bytes = frame.to_bytes();
//! assert_eq!(bytes.len(), 32);
//! assert_eq!(bytes[0], 1);
//!
//! let decoded = framer.decode_data(&bytes).unwrap();
//! assert_eq!(&decoded.payload[..5], b"hello");
//!
//! let ack = framer.encode_ack(SequenceBit::One, AckStatus::Delivered);
//! assert_eq!(ack.to_bytes(), [1, 0]);
//! ```

use super::sequence::SequenceBit;
use std::fmt;

/// Default payload bytes per data frame.
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 31;

/// Sequence header size in bytes.
pub const DATA_HEADER_LEN: usize = 1;

/// Encoded ack frame size.
pub const ACK_FRAME_LEN: usize = 2;

/// Largest payload capacity that keeps a data frame within one LoRa FIFO
/// load (255 bytes).
pub const MAX_PAYLOAD_CAPACITY: usize = 254;

/// Delivery status carried in an ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckStatus {
    /// Newly accepted and handed to the application.
    Delivered,
    /// Already accepted under this sequence bit.
    Duplicate,
    /// Received frame had the wrong length.
    BadLength,
}

impl AckStatus {
    /// Wire value.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Delivered => 0,
            Self::Duplicate => 1,
            Self::BadLength => 2,
        }
    }

    /// Parse a wire value.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Delivered),
            1 => Some(Self::Duplicate),
            2 => Some(Self::BadLength),
            _ => None,
        }
    }

    /// Whether the sender may consider the frame delivered.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Delivered | Self::Duplicate)
    }
}

impl fmt::Display for AckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => write!(f, "DELIVERED"),
            Self::Duplicate => write!(f, "DUPLICATE"),
            Self::BadLength => write!(f, "BAD_LENGTH"),
        }
    }
}

/// A data frame with its payload already sized to the framer's capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub sequence: SequenceBit,
    pub payload: Vec<u8>,
}

impl DataFrame {
    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(DATA_HEADER_LEN + self.payload.len());
        bytes.push(self.sequence.as_byte());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        DATA_HEADER_LEN + self.payload.len()
    }

    /// Always false; a data frame has at least the sequence byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// An acknowledgment frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    pub sequence: SequenceBit,
    pub status: AckStatus,
}

impl AckFrame {
    pub fn new(sequence: SequenceBit, status: AckStatus) -> Self {
        Self { sequence, status }
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> [u8; ACK_FRAME_LEN] {
        [self.sequence.as_byte(), self.status.as_byte()]
    }
}

/// Frame encoding and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Payload does not fit the fixed capacity.
    PayloadTooLarge { size: usize, max: usize },
    /// Buffer length differs from the fixed frame size.
    BadLength { len: usize, expected: usize },
    /// Ack status byte is not a known status.
    UnknownStatus(u8),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { size, max } => {
                write!(f, "payload too large: {} bytes (max {})", size, max)
            }
            Self::BadLength { len, expected } => {
                write!(f, "bad frame length: {} bytes (expected {})", len, expected)
            }
            Self::UnknownStatus(status) => write!(f, "unknown ack status: {}", status),
        }
    }
}

impl std::error::Error for FrameError {}

/// Encodes and decodes frames for one fixed payload capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framer {
    payload_capacity: usize,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(DEFAULT_PAYLOAD_CAPACITY)
    }
}

impl Framer {
    /// Create a framer for the given payload capacity.
    ///
    /// # Panics
    ///
    /// Panics if `payload_capacity` is zero; capacities come from a
    /// validated [`ArqConfig`](super::ArqConfig).
    pub fn new(payload_capacity: usize) -> Self {
        assert!(payload_capacity > 0, "payload capacity must be greater than 0");
        Self { payload_capacity }
    }

    /// Payload bytes per data frame.
    pub fn payload_capacity(&self) -> usize {
        self.payload_capacity
    }

    /// Encoded data frame size.
    pub fn data_frame_len(&self) -> usize {
        DATA_HEADER_LEN + self.payload_capacity
    }

    /// Build a data frame. Short payloads are zero-padded to capacity.
    pub fn encode_data(
        &self,
        sequence: SequenceBit,
        payload: &[u8],
    ) -> Result<DataFrame, FrameError> {
        if payload.len() > self.payload_capacity {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.payload_capacity,
            });
        }
        let mut block = vec![0u8; self.payload_capacity];
        block[..payload.len()].copy_from_slice(payload);
        Ok(DataFrame {
            sequence,
            payload: block,
        })
    }

    /// Parse a data frame.
    pub fn decode_data(&self, bytes: &[u8]) -> Result<DataFrame, FrameError> {
        let expected = self.data_frame_len();
        if bytes.len() != expected {
            return Err(FrameError::BadLength {
                len: bytes.len(),
                expected,
            });
        }
        Ok(DataFrame {
            sequence: SequenceBit::from_byte(bytes[0]),
            payload: bytes[DATA_HEADER_LEN..].to_vec(),
        })
    }

    /// Build an ack frame.
    pub fn encode_ack(&self, sequence: SequenceBit, status: AckStatus) -> AckFrame {
        AckFrame::new(sequence, status)
    }

    /// Parse an ack frame.
    pub fn decode_ack(&self, bytes: &[u8]) -> Result<AckFrame, FrameError> {
        if bytes.len() != ACK_FRAME_LEN {
            return Err(FrameError::BadLength {
                len: bytes.len(),
                expected: ACK_FRAME_LEN,
            });
        }
        let status = AckStatus::from_byte(bytes[1]).ok_or(FrameError::UnknownStatus(bytes[1]))?;
        Ok(AckFrame::new(SequenceBit::from_byte(bytes[0]), status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sizes() {
        let framer = Framer::default();
        assert_eq!(framer.payload_capacity(), 31);
        assert_eq!(framer.data_frame_len(), 32);
        assert!(ACK_FRAME_LEN < framer.data_frame_len());
    }

    #[test]
    fn test_encode_data_layout() {
        let framer = Framer::default();
        let payload: Vec<u8> = (1..=31).collect();
        let bytes = framer.encode_data(SequenceBit::One, &payload).unwrap().to_bytes();

        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..], payload.as_slice());
    }

    #[test]
    fn test_encode_data_pads_short_payload() {
        let framer = Framer::default();
        let frame = framer.encode_data(SequenceBit::Zero, b"abc").unwrap();

        assert_eq!(frame.len(), 32);
        assert_eq!(&frame.payload[..3], b"abc");
        assert!(frame.payload[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_data_rejects_oversized_payload() {
        let framer = Framer::default();
        let result = framer.encode_data(SequenceBit::Zero, &[0u8; 32]);
        assert_eq!(result, Err(FrameError::PayloadTooLarge { size: 32, max: 31 }));
    }

    #[test]
    fn test_decode_data_bad_length() {
        let framer = Framer::default();
        assert_eq!(
            framer.decode_data(&[0u8; 10]),
            Err(FrameError::BadLength { len: 10, expected: 32 })
        );
        assert_eq!(
            framer.decode_data(&[0u8; 33]),
            Err(FrameError::BadLength { len: 33, expected: 32 })
        );
        assert!(framer.decode_data(&[]).is_err());
    }

    #[test]
    fn test_decode_data_masks_sequence_byte() {
        let framer = Framer::default();
        let mut bytes = vec![0u8; 32];
        bytes[0] = 0x81;
        bytes[1] = 0xAA;

        let frame = framer.decode_data(&bytes).unwrap();
        assert_eq!(frame.sequence, SequenceBit::One);
        assert_eq!(frame.payload.len(), 31);
        assert_eq!(frame.payload[0], 0xAA);
    }

    #[test]
    fn test_ack_wire_values() {
        let framer = Framer::default();
        assert_eq!(framer.encode_ack(SequenceBit::Zero, AckStatus::Delivered).to_bytes(), [0, 0]);
        assert_eq!(framer.encode_ack(SequenceBit::One, AckStatus::Duplicate).to_bytes(), [1, 1]);
        assert_eq!(framer.encode_ack(SequenceBit::Zero, AckStatus::BadLength).to_bytes(), [0, 2]);
    }

    #[test]
    fn test_decode_ack() {
        let framer = Framer::default();
        let ack = framer.decode_ack(&[1, 1]).unwrap();
        assert_eq!(ack.sequence, SequenceBit::One);
        assert_eq!(ack.status, AckStatus::Duplicate);

        assert_eq!(
            framer.decode_ack(&[1]),
            Err(FrameError::BadLength { len: 1, expected: 2 })
        );
        assert_eq!(framer.decode_ack(&[0, 7]), Err(FrameError::UnknownStatus(7)));
    }

    #[test]
    fn test_custom_capacity() {
        let framer = Framer::new(8);
        let frame = framer.encode_data(SequenceBit::One, b"12345678").unwrap();
        assert_eq!(frame.to_bytes().len(), 9);
        assert!(framer.decode_data(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_status_success() {
        assert!(AckStatus::Delivered.is_success());
        assert!(AckStatus::Duplicate.is_success());
        assert!(!AckStatus::BadLength.is_success());
        assert_eq!(AckStatus::from_byte(3), None);
    }

    #[test]
    #[should_panic(expected = "payload capacity must be greater than 0")]
    fn test_zero_capacity_panics() {
        Framer::new(0);
    }
}
