//! # Vassago
//!
//! Random access into Zstandard streams.
//!
//! Standard Zstd produces a single stream that must be decompressed from the
//! start to reach any offset. The seekable format instead emits a sequence of
//! independently-decompressible frames followed by a seek table in a trailing
//! skippable frame, so a reader can jump straight to the frame holding any
//! decompressed offset.
//!
//! ## Stream Structure
//!
//! ```text
//! +-------------+-------------+-----+-------------+--------------------+
//! | Zstd frame 0| Zstd frame 1| ... | Zstd frame N| skippable seek table|
//! +-------------+-------------+-----+-------------+--------------------+
//! ```
//!
//! A plain Zstd decompressor run over the whole stream reproduces the
//! original bytes - decoders skip the seek table. A seekable reader parses
//! the table from the end and serves positioned reads in the decompressed
//! coordinate space.
//!
//! ## Example
//!
//! ```
//! use vassago::{SeekableReader, SeekableWriter};
//! use vassago_zstd::ZstdCodec;
//!
//! let mut stream = Vec::new();
//! let mut writer = SeekableWriter::new(&mut stream, ZstdCodec::new());
//! writer.write(b"hello ")?;
//! writer.write(b"world")?;
//! writer.close()?;
//!
//! let reader = SeekableReader::new(stream.as_slice(), ZstdCodec::new())?;
//! let mut buf = [0u8; 5];
//! reader.read_at(&mut buf, 6)?;
//! assert_eq!(&buf, b"world");
//! # Ok::<(), vassago_core::Error>(())
//! ```
//!
//! ## Layering
//!
//! The codec and the byte source/sink are injected through the traits in
//! [`vassago_core`]; this crate owns only the format: the seek-table codec
//! ([`seek_table`]), the offset index ([`index`]), the frame cache, and the
//! writer/reader cores.

pub mod index;
pub mod reader;
pub mod seek_table;
pub mod writer;

mod cache;
mod frame;

pub use index::{FrameIndex, FrameSpan};
pub use reader::{ReaderOptions, SeekableReader};
pub use seek_table::{SeekTable, SeekTableEntry};
pub use writer::{SeekableWriter, WriteManyOptions, WriterOptions};

pub use vassago_core::{
    BlockSink, Error, FrameDecoder, FrameEncoder, IoSink, RandomAccessSource, Result,
};

/// Magic number of the skippable frame that carries the seek table
/// (variant `0xE` of the Zstd skippable range `0x184D2A50..=0x184D2A5F`).
pub const SKIPPABLE_MAGIC: u32 = 0x184D2A5E;

/// Magic number closing the seek-table footer.
pub const SEEKABLE_MAGIC: u32 = 0x8F92EAB1;

/// Size of the skippable frame header (magic + user-data length).
pub const SKIPPABLE_HEADER_SIZE: usize = 8;

/// Size of the seek-table footer (frame count + descriptor + magic).
pub const SEEK_TABLE_FOOTER_SIZE: usize = 9;

/// Largest payload a single frame can hold; per-frame sizes are 32-bit
/// on disk.
pub const MAX_FRAME_SIZE: u64 = u32::MAX as u64;

/// Default number of decoded frames the reader keeps cached.
pub const DEFAULT_CACHE_FRAMES: usize = 8;
