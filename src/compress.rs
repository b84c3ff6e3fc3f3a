//! Compression hooks for message payloads.
//!
//! Compression is applied on the send path only when it shrinks the
//! payload; the header flag it sets is the single source of truth at
//! decode time, never a size heuristic.

use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::consts::MAX_MSGLEN;
use crate::error::{NetchanError, Result};

/// Deflates a payload, returning `None` when compression would not
/// reduce its size and the message should go out as-is.
pub fn compress_message(data: &[u8]) -> Option<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).ok()?;
    let compressed = encoder.finish().ok()?;

    if compressed.len() < data.len() {
        Some(compressed)
    } else {
        None
    }
}

/// Inflates a payload whose header carried the compressed flag. Corrupt
/// input, or output larger than any legal message, is a hard error; the
/// peer is desynchronized and the caller should drop the connection.
pub fn decompress_message(data: &[u8]) -> Result<Vec<u8>> {
    let decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .take(MAX_MSGLEN as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|_| NetchanError::DecompressionFailed)?;

    if out.len() > MAX_MSGLEN {
        return Err(NetchanError::DecompressionFailed);
    }
    Ok(out)
}
