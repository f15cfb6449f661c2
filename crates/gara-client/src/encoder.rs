//! Chunk extraction and text-safe encoding.
//!
//! Pure functions over the attachment buffer; the upload controller owns
//! all bookkeeping (offset advancement, bounds policy, end-of-transfer
//! detection).  Chunks carry no framing beyond base64 itself.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Byte count of the chunk starting at `offset`: the full `chunk_size`
/// except for the final, shorter chunk.  Zero at or beyond the end.
pub fn effective_len(total: usize, offset: usize, chunk_size: usize) -> usize {
    if offset >= total {
        return 0;
    }
    chunk_size.min(total - offset)
}

/// Encode the chunk at `offset` as base64.  Idempotent for a given
/// `(data, offset)` pair; an offset at or beyond the end yields an empty
/// payload.
pub fn encode_chunk(data: &[u8], offset: usize, chunk_size: usize) -> String {
    let len = effective_len(data.len(), offset, chunk_size);
    if len == 0 {
        return String::new();
    }
    STANDARD.encode(&data[offset..offset + len])
}
