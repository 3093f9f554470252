//! Whole-file transfer on top of the stop-and-wait link.
//!
//! A file is cut into fixed-size payloads ([`chunk_file`]), sent one at a
//! time through a [`Sender`], and rebuilt on the far side from accepted
//! payloads ([`FileAssembler`]). The link guarantees in-order, exactly-once
//! delivery of each payload it confirms, so no per-chunk numbering is needed.

mod assembler;
mod chunker;

pub use assembler::FileAssembler;
pub use chunker::{chunk_count, chunk_file, LENGTH_PREFIX_LEN};

use crate::arq::{Clock, FrameError, Sender, Transceiver};
use log::{info, warn};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::time::Instant;

/// Summary of one [`send_file`] run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub chunks_total: usize,
    /// Chunks the sender started on, including a final failed one.
    pub chunks_attempted: usize,
    pub chunks_delivered: usize,
    /// Every chunk was confirmed.
    pub completed: bool,
    /// Total transmit attempts across all chunks.
    pub frames_sent: u64,
    pub elapsed_ms: u64,
    /// Hex SHA-256 of the source file.
    pub sha256: String,
}

/// File transfer error.
#[derive(Debug)]
pub enum TransferError {
    /// A chunk could not be framed.
    Frame(FrameError),
    /// Reading or writing the file failed.
    Io(io::Error),
    /// Payload capacity cannot hold the length prefix plus data.
    CapacityTooSmall { capacity: usize },
    /// File length does not fit the 32-bit length prefix.
    FileTooLarge { size: usize },
    /// First payload too short to carry the length prefix.
    MissingLength { len: usize },
    /// Reassembly ended before the announced length arrived.
    Incomplete {
        received: usize,
        expected: Option<usize>,
    },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "framing error: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::CapacityTooSmall { capacity } => write!(
                f,
                "payload capacity {} too small (need more than {})",
                capacity, LENGTH_PREFIX_LEN
            ),
            Self::FileTooLarge { size } => write!(f, "file too large: {} bytes", size),
            Self::MissingLength { len } => {
                write!(f, "first payload of {} bytes has no length prefix", len)
            }
            Self::Incomplete {
                received,
                expected: Some(expected),
            } => write!(f, "incomplete: {} of {} bytes", received, expected),
            Self::Incomplete {
                received,
                expected: None,
            } => write!(f, "incomplete: {} bytes, length unknown", received),
        }
    }
}

impl std::error::Error for TransferError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Frame(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FrameError> for TransferError {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

impl From<io::Error> for TransferError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Hex-encoded SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Send `data` chunk by chunk, stopping at the first chunk that fails.
///
/// A failed chunk is not an error: the report says how far the transfer got.
pub fn send_file<T, C>(
    sender: &mut Sender,
    radio: &mut T,
    clock: &C,
    data: &[u8],
) -> Result<TransferReport, TransferError>
where
    T: Transceiver + ?Sized,
    C: Clock + ?Sized,
{
    let started = Instant::now();
    let chunks = chunk_file(data, sender.framer().payload_capacity())?;
    let chunks_total = chunks.len();
    info!("Sending {} bytes in {} chunks", data.len(), chunks_total);

    let mut report = TransferReport {
        chunks_total,
        chunks_attempted: 0,
        chunks_delivered: 0,
        completed: false,
        frames_sent: 0,
        elapsed_ms: 0,
        sha256: sha256_hex(data),
    };

    for (index, chunk) in chunks.iter().enumerate() {
        report.chunks_attempted += 1;
        let outcome = sender.send(radio, clock, chunk)?;
        report.frames_sent += u64::from(outcome.attempts());
        if !outcome.is_delivered() {
            warn!("Chunk {}/{} failed, aborting transfer", index + 1, chunks_total);
            break;
        }
        report.chunks_delivered += 1;
    }

    report.completed = report.chunks_delivered == chunks_total;
    report.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        "Transfer {}: {}/{} chunks, {} frames sent",
        if report.completed { "complete" } else { "aborted" },
        report.chunks_delivered,
        chunks_total,
        report.frames_sent
    );
    Ok(report)
}
