//! Frame encode/decode around the injected codec.
//!
//! Adds what the seekable format needs on top of a plain Zstd codec: 32-bit
//! size bookkeeping for the seek table and the optional per-frame content
//! checksum (low 32 bits of XXH64, seed 0, over decompressed bytes).

use vassago_core::{Error, FrameDecoder, FrameEncoder, Result};
use xxhash_rust::xxh64::xxh64;

use crate::seek_table::SeekTableEntry;
use crate::MAX_FRAME_SIZE;

/// Per-frame content checksum.
#[inline]
pub(crate) fn content_checksum(data: &[u8]) -> u32 {
    xxh64(data, 0) as u32
}

/// Compress one frame payload and produce its seek-table entry.
///
/// Rejects payloads (and pathological compressed outputs) that do not fit
/// the format's 32-bit per-frame sizes rather than truncating them.
pub(crate) fn encode_frame<E: FrameEncoder>(
    encoder: &E,
    src: &[u8],
    with_checksum: bool,
) -> Result<(Vec<u8>, SeekTableEntry)> {
    if src.len() as u64 > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge { size: src.len() });
    }

    let compressed = encoder.encode_all(src)?;
    if compressed.len() as u64 > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge {
            size: compressed.len(),
        });
    }

    let entry = SeekTableEntry {
        compressed_size: compressed.len() as u32,
        decompressed_size: src.len() as u32,
        checksum: with_checksum.then(|| content_checksum(src)),
    };
    Ok((compressed, entry))
}

/// Decompress one frame and verify it against its seek-table entry.
///
/// The decoded length must match the entry exactly; when a checksum is
/// present it is verified after decoding. Both failures are corruption.
pub(crate) fn decode_frame<D: FrameDecoder>(
    decoder: &D,
    compressed: &[u8],
    expected_size: u32,
    expected_checksum: Option<u32>,
) -> Result<Vec<u8>> {
    let decompressed = decoder.decode_all(compressed, Some(expected_size as usize))?;

    if decompressed.len() != expected_size as usize {
        return Err(Error::corrupted(format!(
            "frame decoded to {} bytes, seek table promises {}",
            decompressed.len(),
            expected_size
        )));
    }
    if let Some(expected) = expected_checksum {
        let actual = content_checksum(&decompressed);
        if actual != expected {
            return Err(Error::checksum_mismatch(expected, actual));
        }
    }

    Ok(decompressed)
}
