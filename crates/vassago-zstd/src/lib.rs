//! # Vassago Zstd
//!
//! [`FrameEncoder`]/[`FrameDecoder`] implementations backed by the `zstd`
//! crate (libzstd bindings). Every `encode_all` call produces one
//! self-contained Zstd frame, which is exactly the unit the seekable format
//! indexes.
//!
//! ## Example
//!
//! ```
//! use vassago_core::{FrameDecoder, FrameEncoder};
//! use vassago_zstd::ZstdCodec;
//!
//! let codec = ZstdCodec::new();
//! let frame = codec.encode_all(b"Hello, World!").unwrap();
//! let original = codec.decode_all(&frame, Some(13)).unwrap();
//! assert_eq!(original, b"Hello, World!");
//! ```

use vassago_core::{Error, FrameDecoder, FrameEncoder, Result};

/// Zstandard codec with a fixed compression level.
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

impl ZstdCodec {
    /// Create a codec at the zstd default level (3).
    pub fn new() -> Self {
        Self {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Create a codec with the given compression level.
    ///
    /// Levels follow libzstd: 1 is fastest, 19 is the practical maximum,
    /// negative levels trade ratio for speed.
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }

    /// Get the configured compression level.
    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder for ZstdCodec {
    fn encode_all(&self, src: &[u8]) -> Result<Vec<u8>> {
        zstd::bulk::compress(src, self.level).map_err(Error::codec)
    }
}

impl FrameDecoder for ZstdCodec {
    fn decode_all(&self, src: &[u8], size_hint: Option<usize>) -> Result<Vec<u8>> {
        match size_hint {
            Some(capacity) => zstd::bulk::decompress(src, capacity).map_err(Error::codec),
            None => zstd::decode_all(src).map_err(Error::codec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let codec = ZstdCodec::new();
        let input = b"the quick brown fox jumps over the lazy dog";
        let frame = codec.encode_all(input).unwrap();
        let output = codec.decode_all(&frame, Some(input.len())).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_roundtrip_empty() {
        let codec = ZstdCodec::new();
        let frame = codec.encode_all(b"").unwrap();
        assert!(!frame.is_empty(), "empty payload still emits a frame");
        let output = codec.decode_all(&frame, Some(0)).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_decode_without_hint() {
        let codec = ZstdCodec::with_level(1);
        let input = vec![7u8; 4096];
        let frame = codec.encode_all(&input).unwrap();
        let output = codec.decode_all(&frame, None).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_garbage_input_is_codec_error() {
        let codec = ZstdCodec::new();
        let err = codec.decode_all(b"not a zstd frame", Some(64)).unwrap_err();
        assert_eq!(err.category(), "codec_error");
    }

    #[test]
    fn test_levels_change_output() {
        let input: Vec<u8> = (0u8..=255).cycle().take(1 << 14).collect();
        let fast = ZstdCodec::with_level(1).encode_all(&input).unwrap();
        let best = ZstdCodec::with_level(19).encode_all(&input).unwrap();
        assert!(best.len() <= fast.len());
    }
}
