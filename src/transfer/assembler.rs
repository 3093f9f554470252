//! Rebuilding a file from accepted payloads.

use super::chunker::LENGTH_PREFIX_LEN;
use super::TransferError;
use log::debug;

/// Most bytes reserved up front from the announced length; the buffer grows
/// past this only as data actually arrives.
const MAX_INITIAL_RESERVE: usize = 64 * 1024;

/// Collects accepted payloads, in delivery order, into the original file.
///
/// The first payload announces the length; padding past it is discarded.
#[derive(Debug, Default)]
pub struct FileAssembler {
    expected_len: Option<usize>,
    data: Vec<u8>,
    chunks: usize,
}

impl FileAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next accepted payload.
    pub fn push(&mut self, payload: &[u8]) -> Result<(), TransferError> {
        let body = match self.expected_len {
            None => {
                let prefix: [u8; LENGTH_PREFIX_LEN] = payload
                    .get(..LENGTH_PREFIX_LEN)
                    .and_then(|p| p.try_into().ok())
                    .ok_or(TransferError::MissingLength { len: payload.len() })?;
                let len = u32::from_le_bytes(prefix) as usize;
                debug!("Expecting {} bytes", len);
                self.expected_len = Some(len);
                self.data.reserve(len.min(MAX_INITIAL_RESERVE));
                &payload[LENGTH_PREFIX_LEN..]
            }
            Some(_) => payload,
        };

        let room = self.remaining();
        self.data.extend_from_slice(&body[..body.len().min(room)]);
        self.chunks += 1;
        Ok(())
    }

    /// Length announced by the first payload.
    pub fn expected_len(&self) -> Option<usize> {
        self.expected_len
    }

    /// Bytes collected so far.
    pub fn received_len(&self) -> usize {
        self.data.len()
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn is_complete(&self) -> bool {
        self.expected_len == Some(self.data.len())
    }

    fn remaining(&self) -> usize {
        self.expected_len.unwrap_or(0).saturating_sub(self.data.len())
    }

    /// The reconstructed file, if every byte has arrived.
    pub fn into_bytes(self) -> Result<Vec<u8>, TransferError> {
        if self.is_complete() {
            Ok(self.data)
        } else {
            Err(TransferError::Incomplete {
                received: self.data.len(),
                expected: self.expected_len,
            })
        }
    }
}
