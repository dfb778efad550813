//! Reader core: positioned and cursor reads over a seekable stream.
//!
//! Construction parses the trailing seek table, builds the offset index,
//! and allocates the frame cache. After that, [`SeekableReader::read_at`]
//! is re-entrant: concurrent callers share the cache behind one mutex and
//! decode outside it.

use std::io::{self, SeekFrom};
use std::num::NonZeroUsize;

use bytes::Bytes;
use tracing::{debug, trace};
use vassago_core::{Error, FrameDecoder, RandomAccessSource, Result};

use crate::cache::FrameCache;
use crate::frame::decode_frame;
use crate::index::{FrameIndex, FrameSpan};
use crate::seek_table::SeekTable;
use crate::DEFAULT_CACHE_FRAMES;

/// Reader configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Number of decoded frames to keep cached. Must be at least 1.
    pub cache_frames: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            cache_frames: DEFAULT_CACHE_FRAMES,
        }
    }
}

/// Random-access reader over a seekable Zstd stream.
///
/// Positioned reads ([`read_at`](Self::read_at)) take `&self` and may run
/// concurrently; the stateful cursor ([`read`](Self::read),
/// [`seek`](Self::seek)) needs `&mut self`. [`std::io::Read`] and
/// [`std::io::Seek`] are implemented on top of the cursor.
#[derive(Debug)]
pub struct SeekableReader<D, S> {
    decoder: D,
    source: S,
    index: FrameIndex,
    cache: FrameCache,
    position: u64,
    closed: bool,
}

impl<D: FrameDecoder, S: RandomAccessSource> SeekableReader<D, S> {
    /// Open a seekable stream with default options.
    pub fn new(source: S, decoder: D) -> Result<Self> {
        Self::with_options(source, decoder, ReaderOptions::default())
    }

    /// Open a seekable stream.
    ///
    /// Parses the seek table from the tail of `source`, builds the offset
    /// index, and verifies that the data frames exactly fill the bytes in
    /// front of the table.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] for a zero cache size;
    /// [`Error::CorruptedData`] or [`Error::Io`] when the table cannot be
    /// read.
    pub fn with_options(source: S, decoder: D, options: ReaderOptions) -> Result<Self> {
        let cache_frames = NonZeroUsize::new(options.cache_frames)
            .ok_or_else(|| Error::invalid_config("cache_frames must be at least 1"))?;

        let table = SeekTable::read_from(&source)?;
        let table_offset = source.size()? - table.serialized_size() as u64;
        let index = FrameIndex::from_seek_table(&table)?;
        if index.total_compressed_size() != table_offset {
            return Err(Error::corrupted(format!(
                "frames cover {} bytes but the seek table starts at offset {}",
                index.total_compressed_size(),
                table_offset
            )));
        }

        debug!(
            frames = index.frame_count(),
            compressed = index.total_compressed_size(),
            decompressed = index.total_decompressed_size(),
            "opened seekable stream"
        );

        Ok(Self {
            decoder,
            source,
            index,
            cache: FrameCache::new(cache_frames),
            position: 0,
            closed: false,
        })
    }

    /// Fill `buf` from decompressed position `offset`.
    ///
    /// Walks frames through the index, pulling each missing frame through
    /// the cache. Returns the number of bytes copied: `buf.len()` unless the
    /// stream ends first, in which case the count is short but at least 1.
    ///
    /// # Errors
    ///
    /// [`Error::EndOfStream`] when `offset` is at or past the end of the
    /// decompressed stream (no bytes available at all);
    /// [`Error::ReaderClosed`] after [`close`](Self::close); corruption or
    /// I/O errors from fetching frames.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if self.closed {
            return Err(Error::ReaderClosed);
        }
        if buf.is_empty() {
            return Ok(0);
        }
        let total = self.index.total_decompressed_size();
        if offset >= total {
            return Err(Error::EndOfStream);
        }

        let mut filled = 0;
        let mut position = offset;
        while filled < buf.len() && position < total {
            let Some((frame_id, span)) = self.index.locate(position) else {
                break;
            };
            let data = self.fetch_frame(frame_id, span)?;

            let in_frame = (position - span.decompressed_start) as usize;
            let n = (data.len() - in_frame).min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&data[in_frame..in_frame + n]);
            filled += n;
            position += n as u64;
        }

        Ok(filled)
    }

    /// Cursor read: [`read_at`](Self::read_at) from the current position,
    /// then advance by the bytes returned.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.read_at(buf, self.position)?;
        self.position += n as u64;
        Ok(n)
    }

    /// Move the cursor.
    ///
    /// The resulting position must land in `[0, total_decompressed_size]`;
    /// seeking exactly to the end is legal and the next read reports end of
    /// stream.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let total = self.index.total_decompressed_size();
        let target: i128 = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::Current(delta) => self.position as i128 + delta as i128,
            SeekFrom::End(delta) => total as i128 + delta as i128,
        };

        if target < 0 || target > total as i128 {
            return Err(Error::InvalidSeek {
                position: target.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
                length: total,
            });
        }
        self.position = target as u64;
        Ok(self.position)
    }

    /// Current cursor position in the decompressed stream.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Release cached frames. Idempotent; subsequent reads fail with
    /// [`Error::ReaderClosed`].
    pub fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.cache.clear();
            self.closed = true;
        }
        Ok(())
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total decompressed size of the stream.
    pub fn total_decompressed_size(&self) -> u64 {
        self.index.total_decompressed_size()
    }

    /// Number of frames in the stream, zero-length ones included.
    pub fn frame_count(&self) -> usize {
        self.index.frame_count()
    }

    /// The offset index built from the seek table.
    pub fn index(&self) -> &FrameIndex {
        &self.index
    }

    /// Get a reference to the source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Fetch one decoded frame, preferring the cache.
    ///
    /// On a miss the fetch and decode run outside the cache lock; two
    /// concurrent misses for the same frame decode twice and the later
    /// insert wins, with identical bytes either way.
    fn fetch_frame(&self, frame_id: usize, span: &FrameSpan) -> Result<Bytes> {
        if let Some(hit) = self.cache.get(frame_id) {
            trace!(frame = frame_id, "frame cache hit");
            return Ok(hit);
        }
        trace!(frame = frame_id, "frame cache miss");

        let compressed_size = span.entry.compressed_size as usize;
        let compressed = self.source.read_at(span.compressed_start, compressed_size)?;
        if compressed.len() != compressed_size {
            return Err(Error::corrupted_at(
                format!(
                    "frame read returned {} of {} bytes",
                    compressed.len(),
                    compressed_size
                ),
                span.compressed_start,
            ));
        }

        let decoded = decode_frame(
            &self.decoder,
            &compressed,
            span.entry.decompressed_size,
            span.entry.checksum,
        )?;
        let bytes = Bytes::from(decoded);
        self.cache.put(frame_id, bytes.clone());
        Ok(bytes)
    }
}

impl<D: FrameDecoder, S: RandomAccessSource> io::Read for SeekableReader<D, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match SeekableReader::read(self, buf) {
            Ok(n) => Ok(n),
            Err(Error::EndOfStream) => Ok(0),
            Err(other) => Err(other.into()),
        }
    }
}

impl<D: FrameDecoder, S: RandomAccessSource> io::Seek for SeekableReader<D, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        SeekableReader::seek(self, pos).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SeekableWriter;
    use vassago_core::FrameEncoder;

    // Length-prefix fake codec shared by writer and reader in these tests.
    #[derive(Debug)]
    struct StubCodec;

    impl FrameEncoder for StubCodec {
        fn encode_all(&self, src: &[u8]) -> Result<Vec<u8>> {
            let mut out = Vec::with_capacity(4 + src.len());
            out.extend_from_slice(&(src.len() as u32).to_le_bytes());
            out.extend_from_slice(src);
            Ok(out)
        }
    }

    impl FrameDecoder for StubCodec {
        fn decode_all(&self, src: &[u8], _size_hint: Option<usize>) -> Result<Vec<u8>> {
            if src.len() < 4 {
                return Err(Error::corrupted("frame shorter than its header"));
            }
            let len = u32::from_le_bytes(src[..4].try_into().unwrap()) as usize;
            if src.len() < 4 + len {
                return Err(Error::corrupted("frame truncated"));
            }
            Ok(src[4..4 + len].to_vec())
        }
    }

    fn stream_of(chunks: &[&[u8]]) -> Vec<u8> {
        let mut writer = SeekableWriter::new(Vec::new(), StubCodec);
        for chunk in chunks {
            writer.write(chunk).unwrap();
        }
        writer.close().unwrap();
        writer.into_inner()
    }

    fn reader_of(stream: &[u8]) -> SeekableReader<StubCodec, &[u8]> {
        SeekableReader::new(stream, StubCodec).unwrap()
    }

    #[test]
    fn test_read_at_within_one_frame() {
        let stream = stream_of(&[b"hello world"]);
        let reader = reader_of(&stream);

        let mut buf = [0u8; 5];
        assert_eq!(reader.read_at(&mut buf, 6).unwrap(), 5);
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn test_read_at_spanning_frames() {
        let stream = stream_of(&[b"hello", b" ", b"world"]);
        let reader = reader_of(&stream);

        let mut buf = [0u8; 11];
        assert_eq!(reader.read_at(&mut buf, 0).unwrap(), 11);
        assert_eq!(&buf, b"hello world");

        // Straddles all three frames.
        let mut buf = [0u8; 3];
        assert_eq!(reader.read_at(&mut buf, 4).unwrap(), 3);
        assert_eq!(&buf, b"o w");
    }

    #[test]
    fn test_read_at_frame_boundaries() {
        let stream = stream_of(&[b"abc", b"def"]);
        let reader = reader_of(&stream);

        // Starting exactly at a boundary.
        let mut buf = [0u8; 3];
        assert_eq!(reader.read_at(&mut buf, 3).unwrap(), 3);
        assert_eq!(&buf, b"def");

        // Ending exactly at a boundary.
        assert_eq!(reader.read_at(&mut buf, 0).unwrap(), 3);
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn test_read_at_short_at_stream_end() {
        let stream = stream_of(&[b"hello", b"world"]);
        let reader = reader_of(&stream);

        let mut buf = [0u8; 32];
        assert_eq!(reader.read_at(&mut buf, 8).unwrap(), 2);
        assert_eq!(&buf[..2], b"ld");
    }

    #[test]
    fn test_read_at_past_end() {
        let stream = stream_of(&[b"hello"]);
        let reader = reader_of(&stream);

        let mut buf = [0u8; 4];
        assert!(reader.read_at(&mut buf, 5).unwrap_err().is_end_of_stream());
        assert!(reader.read_at(&mut buf, 99).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_empty_buf_reads_nothing() {
        let stream = stream_of(&[b"hello"]);
        let reader = reader_of(&stream);

        // Even past the end: an empty destination never consults the index.
        assert_eq!(reader.read_at(&mut [], 999).unwrap(), 0);
    }

    #[test]
    fn test_empty_stream() {
        let stream = stream_of(&[]);
        let reader = reader_of(&stream);

        assert_eq!(reader.total_decompressed_size(), 0);
        assert_eq!(reader.frame_count(), 0);
        let mut buf = [0u8; 1];
        assert!(reader.read_at(&mut buf, 0).unwrap_err().is_end_of_stream());
    }

    #[test]
    fn test_zero_length_frames_are_transparent() {
        let stream = stream_of(&[b"", b"x", b"", b"yz"]);
        let reader = reader_of(&stream);

        assert_eq!(reader.frame_count(), 4);
        assert_eq!(reader.total_decompressed_size(), 3);

        let mut buf = [0u8; 3];
        assert_eq!(reader.read_at(&mut buf, 0).unwrap(), 3);
        assert_eq!(&buf, b"xyz");
    }

    #[test]
    fn test_cursor_read_and_seek() {
        let stream = stream_of(&[b"hello", b" ", b"world"]);
        let mut reader = reader_of(&stream);

        let mut buf = [0u8; 6];
        assert_eq!(reader.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf, b"hello ");
        assert_eq!(reader.position(), 6);

        let mut buf = [0u8; 5];
        assert_eq!(reader.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");

        assert!(reader.read(&mut buf).unwrap_err().is_end_of_stream());

        reader.seek(SeekFrom::Start(6)).unwrap();
        assert_eq!(reader.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");

        assert_eq!(reader.seek(SeekFrom::End(-5)).unwrap(), 6);
        assert_eq!(reader.seek(SeekFrom::Current(2)).unwrap(), 8);
    }

    #[test]
    fn test_seek_bounds() {
        let stream = stream_of(&[b"hello"]);
        let mut reader = reader_of(&stream);

        // Seeking exactly to the end is legal; the next read ends the stream.
        assert_eq!(reader.seek(SeekFrom::End(0)).unwrap(), 5);
        let mut buf = [0u8; 1];
        assert!(reader.read(&mut buf).unwrap_err().is_end_of_stream());

        assert_eq!(
            reader.seek(SeekFrom::End(1)).unwrap_err().category(),
            "invalid_seek"
        );
        assert_eq!(
            reader.seek(SeekFrom::Current(-6)).unwrap_err().category(),
            "invalid_seek"
        );
        // Failed seeks leave the cursor alone.
        assert_eq!(reader.position(), 5);
    }

    #[test]
    fn test_io_read_and_seek_impls() {
        use std::io::{Read, Seek};

        let stream = stream_of(&[b"hello", b" ", b"world"]);
        let mut reader = reader_of(&stream);

        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"hello world");

        // std::io convention: reading at the end returns Ok(0).
        let mut buf = [0u8; 4];
        assert_eq!(Read::read(&mut reader, &mut buf).unwrap(), 0);

        Seek::seek(&mut reader, SeekFrom::Start(6)).unwrap();
        let mut tail = String::new();
        reader.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "world");
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_reads() {
        let stream = stream_of(&[b"hello"]);
        let mut reader = reader_of(&stream);

        reader.close().unwrap();
        reader.close().unwrap();
        assert!(reader.is_closed());

        let mut buf = [0u8; 1];
        assert_eq!(
            reader.read_at(&mut buf, 0).unwrap_err().category(),
            "reader_closed"
        );
    }

    #[test]
    fn test_zero_cache_frames_is_invalid() {
        let stream = stream_of(&[b"hello"]);
        let err =
            SeekableReader::with_options(stream.as_slice(), StubCodec, ReaderOptions {
                cache_frames: 0,
            })
            .unwrap_err();
        assert_eq!(err.category(), "invalid_config");
    }

    #[test]
    fn test_single_frame_cache_still_spans_frames() {
        let chunks: Vec<Vec<u8>> = (0u8..20).map(|i| vec![i; 3]).collect();
        let chunk_refs: Vec<&[u8]> = chunks.iter().map(|c| c.as_slice()).collect();
        let stream = stream_of(&chunk_refs);

        let reader = SeekableReader::with_options(stream.as_slice(), StubCodec, ReaderOptions {
            cache_frames: 1,
        })
        .unwrap();

        let mut buf = vec![0u8; 60];
        assert_eq!(reader.read_at(&mut buf, 0).unwrap(), 60);
        let expected: Vec<u8> = chunks.concat();
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_repeated_reads_reuse_cached_frames() {
        let stream = stream_of(&[b"hello", b"world"]);
        let reader = reader_of(&stream);

        let mut buf = [0u8; 5];
        reader.read_at(&mut buf, 0).unwrap();
        assert_eq!(reader.cache.len(), 1);

        reader.read_at(&mut buf, 0).unwrap();
        assert_eq!(reader.cache.len(), 1, "second read reuses the cached frame");

        reader.read_at(&mut buf, 5).unwrap();
        assert_eq!(reader.cache.len(), 2);
    }

    #[test]
    fn test_stray_bytes_before_table_are_corruption() {
        let mut stream = vec![0xEE];
        stream.extend(stream_of(&[b"hello"]));

        let err = SeekableReader::new(stream.as_slice(), StubCodec).unwrap_err();
        assert!(err.is_corruption(), "{err}");
        assert!(err.to_string().contains("seek table starts"), "{err}");
    }

    #[test]
    fn test_frame_decoding_to_wrong_size_is_corruption() {
        let mut stream = stream_of(&[b"abc"]);
        // Shrink the stub frame's own length prefix; the seek table still
        // promises 3 decompressed bytes.
        stream[0] = 2;

        let reader = reader_of(&stream);
        let mut buf = [0u8; 3];
        let err = reader.read_at(&mut buf, 0).unwrap_err();
        assert!(err.is_corruption(), "{err}");
    }

    #[test]
    fn test_checksum_tamper_detected_on_read() {
        let stream = stream_of(&[b"hello", b"world"]);
        let mut tampered = stream.clone();
        // Flip a payload bit inside frame 1 (after its 4-byte stub prefix).
        tampered[9 + 4] ^= 0x01;

        // Construction only parses the table, so it still succeeds.
        let reader = reader_of(&tampered);
        let mut buf = [0u8; 5];
        assert_eq!(
            reader.read_at(&mut buf, 5).unwrap_err().category(),
            "checksum_mismatch"
        );

        // The untouched frame still reads fine.
        assert_eq!(reader.read_at(&mut buf, 0).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    /// Source that reports the full size but starves reads of the first
    /// frame by one byte.
    struct StarvingSource(Vec<u8>);

    impl RandomAccessSource for StarvingSource {
        fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
            let mut data = self.0.read_at(offset, len)?;
            if offset == 0 {
                data.pop();
            }
            Ok(data)
        }

        fn size(&self) -> Result<u64> {
            Ok(self.0.len() as u64)
        }
    }

    #[test]
    fn test_short_frame_fetch_is_corruption() {
        let stream = stream_of(&[b"hello"]);
        let reader = SeekableReader::new(StarvingSource(stream), StubCodec).unwrap();

        let mut buf = [0u8; 5];
        let err = reader.read_at(&mut buf, 0).unwrap_err();
        assert!(err.is_corruption(), "{err}");
        assert!(err.to_string().contains("frame read returned"), "{err}");
    }
}
