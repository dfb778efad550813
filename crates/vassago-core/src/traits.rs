//! Injection-seam traits for the seekable format.
//!
//! ## Trait Layout
//!
//! ```text
//! FrameEncoder / FrameDecoder   (codec seam - one Zstd frame at a time)
//! BlockSink                     (writer output seam - append-only)
//! RandomAccessSource            (reader input seam - positioned reads)
//! ```
//!
//! The seekable writer and reader are generic over these traits. Anything
//! that can compress a byte slice into one self-contained Zstd frame works
//! as an encoder; anything with positioned reads and a known length works
//! as a source.

use crate::error::Result;

/// One-shot compression of a single frame payload.
///
/// Implementations must produce one valid, self-contained Zstd frame with
/// `src` as its payload: fully decompressible without reference to any
/// other frame. Implementations must be callable from multiple threads
/// (`&self`) so the writer may encode frames concurrently.
pub trait FrameEncoder {
    /// Compress `src` into a single self-contained frame.
    fn encode_all(&self, src: &[u8]) -> Result<Vec<u8>>;
}

/// One-shot decompression of a single frame.
pub trait FrameDecoder {
    /// Decompress one frame.
    ///
    /// # Arguments
    /// * `src` - One complete compressed frame
    /// * `size_hint` - Expected decompressed size, when the caller knows it;
    ///   implementations may use it to size the output buffer
    fn decode_all(&self, src: &[u8], size_hint: Option<usize>) -> Result<Vec<u8>>;
}

/// Append-only byte sink the writer emits frames and the seek table into.
pub trait BlockSink {
    /// Append one block of bytes.
    ///
    /// # Returns
    /// Number of bytes accepted. Returning fewer than `block.len()` is
    /// reported by the writer as a short-write error.
    fn append(&mut self, block: &[u8]) -> Result<usize>;
}

impl BlockSink for Vec<u8> {
    fn append(&mut self, block: &[u8]) -> Result<usize> {
        self.extend_from_slice(block);
        Ok(block.len())
    }
}

impl<S: BlockSink + ?Sized> BlockSink for &mut S {
    fn append(&mut self, block: &[u8]) -> Result<usize> {
        (**self).append(block)
    }
}

/// Adapter exposing any [`std::io::Write`] as a [`BlockSink`].
///
/// Uses `write_all`, so a well-behaved writer never produces a short write.
pub struct IoSink<W> {
    inner: W,
}

impl<W: std::io::Write> IoSink<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Get a reference to the inner writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the adapter and return the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: std::io::Write> BlockSink for IoSink<W> {
    fn append(&mut self, block: &[u8]) -> Result<usize> {
        self.inner.write_all(block)?;
        Ok(block.len())
    }
}

/// Byte source supporting positioned reads, consumed by the reader.
///
/// `read_at` is `&self` so a single source can serve concurrent readers.
pub trait RandomAccessSource {
    /// Read up to `len` bytes starting at `offset`.
    ///
    /// May return fewer bytes than requested at end of input; the seekable
    /// reader treats any shortfall inside a declared frame range as
    /// corruption.
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>>;

    /// Total size of the source in bytes.
    fn size(&self) -> Result<u64>;
}

impl RandomAccessSource for [u8] {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(self.len());
        let end = start.saturating_add(len).min(self.len());
        Ok(self[start..end].to_vec())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }
}

impl RandomAccessSource for Vec<u8> {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.as_slice().read_at(offset, len)
    }

    fn size(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }
}

impl<S: RandomAccessSource + ?Sized> RandomAccessSource for &S {
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        (**self).read_at(offset, len)
    }

    fn size(&self) -> Result<u64> {
        (**self).size()
    }
}

impl RandomAccessSource for std::fs::File {
    #[cfg(unix)]
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        use std::os::unix::fs::FileExt;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = FileExt::read_at(self, &mut buf[filled..], offset + filled as u64)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        use std::os::windows::fs::FileExt;

        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self.seek_read(&mut buf[filled..], offset + filled as u64)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    #[cfg(not(any(unix, windows)))]
    fn read_at(&self, _offset: u64, _len: usize) -> Result<Vec<u8>> {
        Err(crate::error::Error::invalid_config(
            "positioned file reads are not supported on this platform",
        ))
    }

    fn size(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_accepts_everything() {
        let mut sink = Vec::new();
        assert_eq!(BlockSink::append(&mut sink, b"abc").unwrap(), 3);
        assert_eq!(BlockSink::append(&mut sink, b"").unwrap(), 0);
        assert_eq!(sink, b"abc");
    }

    #[test]
    fn test_io_sink_roundtrip() {
        let mut sink = IoSink::new(Vec::new());
        sink.append(b"hello").unwrap();
        sink.append(b" world").unwrap();
        assert_eq!(sink.into_inner(), b"hello world");
    }

    #[test]
    fn test_slice_source_clamps_at_end() {
        let data = b"0123456789".as_slice();
        assert_eq!(data.read_at(0, 4).unwrap(), b"0123");
        assert_eq!(data.read_at(8, 10).unwrap(), b"89");
        assert_eq!(data.read_at(10, 1).unwrap(), b"");
        assert_eq!(data.read_at(u64::MAX, 1).unwrap(), b"");
        assert_eq!(data.size().unwrap(), 10);
    }

    #[test]
    fn test_file_source() {
        use std::io::Write;

        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"seekable bytes").unwrap();
        tmp.flush().unwrap();

        let file = tmp.reopen().unwrap();
        assert_eq!(file.size().unwrap(), 14);
        assert_eq!(file.read_at(9, 5).unwrap(), b"bytes");
        assert_eq!(file.read_at(9, 100).unwrap(), b"bytes");
    }
}
