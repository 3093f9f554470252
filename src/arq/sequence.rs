//! Alternating sequence bit.

use std::fmt;

/// One-bit sequence number carried in byte 0 of every frame.
///
/// Only the low bit of the wire byte is significant; the rest is written as
/// zero and ignored on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SequenceBit {
    #[default]
    Zero,
    One,
}

impl SequenceBit {
    /// Decode from a wire byte, keeping only the low bit.
    pub fn from_byte(byte: u8) -> Self {
        if byte & 0x01 == 0 {
            Self::Zero
        } else {
            Self::One
        }
    }

    /// Wire representation (0 or 1).
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }

    /// The other bit.
    pub fn toggled(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    /// Flip in place.
    pub fn toggle(&mut self) {
        *self = self.toggled();
    }
}

impl From<SequenceBit> for u8 {
    fn from(bit: SequenceBit) -> Self {
        bit.as_byte()
    }
}

impl fmt::Display for SequenceBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_byte())
    }
}
