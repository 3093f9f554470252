//! Splitting a file into fixed-size link payloads.

use super::TransferError;

/// Bytes of the little-endian total length carried by the first chunk.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Split `data` into payloads of exactly `capacity` bytes.
///
/// The first payload starts with the file length as a little-endian `u32`,
/// followed by up to `capacity - 4` file bytes; later payloads carry
/// `capacity` file bytes each. The last payload is zero-padded. An empty file
/// still produces one chunk so the receiver learns its length.
pub fn chunk_file(data: &[u8], capacity: usize) -> Result<Vec<Vec<u8>>, TransferError> {
    if capacity <= LENGTH_PREFIX_LEN {
        return Err(TransferError::CapacityTooSmall { capacity });
    }
    let total = u32::try_from(data.len()).map_err(|_| TransferError::FileTooLarge {
        size: data.len(),
    })?;

    let first_len = data.len().min(capacity - LENGTH_PREFIX_LEN);
    let mut first = Vec::with_capacity(capacity);
    first.extend_from_slice(&total.to_le_bytes());
    first.extend_from_slice(&data[..first_len]);
    first.resize(capacity, 0);

    let mut chunks = vec![first];
    for piece in data[first_len..].chunks(capacity) {
        let mut chunk = piece.to_vec();
        chunk.resize(capacity, 0);
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Number of chunks [`chunk_file`] produces for a file of `len` bytes.
pub fn chunk_count(len: usize, capacity: usize) -> usize {
    let head = capacity.saturating_sub(LENGTH_PREFIX_LEN);
    if len <= head || capacity == 0 {
        1
    } else {
        1 + (len - head).div_ceil(capacity)
    }
}
